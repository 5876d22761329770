pub mod image_perceptual_hasher;
pub mod image_probe;
pub mod onnx_scene_embedder;
