pub mod file_snapshot_writer;
pub mod sequential_batch_executor;
pub mod threaded_batch_executor;
