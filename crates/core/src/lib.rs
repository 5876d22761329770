//! Photo intelligence core: per-photo feature extraction driven in
//! checkpointed batches, smart-crop geometry, and cross-photo clustering.

pub mod shared {
    pub mod atomic_write;
    pub mod bounding_box;
    pub mod constants;
    pub mod onnx_model;

    /// Error type returned by external collaborators (detectors, hashers,
    /// embedders). `Send + Sync` so failures can cross worker threads.
    pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
}

pub mod cropping {
    pub mod domain {
        pub mod aspect_ratio;
        pub mod crop_result;
        pub mod smart_crop;
    }
}

pub mod detection {
    pub mod domain {
        pub mod detection;
        pub mod face_detector;
        pub mod face_encoder;
        pub mod person_detector;
        pub mod quality;
    }
    pub mod infrastructure;
}

pub mod features {
    pub mod domain {
        pub mod image_inspector;
        pub mod monochrome;
        pub mod perceptual_hasher;
        pub mod photo_record;
        pub mod scene_embedder;
    }
    pub mod feature_extractor;
    pub mod infrastructure;
}

pub mod checkpoint {
    pub mod domain {
        pub mod checkpoint;
        pub mod checkpoint_store;
        pub mod photo_ledger;
    }
    pub mod infrastructure;
}

pub mod clustering {
    pub mod domain {
        pub mod cluster_error;
        pub mod cluster_report;
        pub mod dbscan;
        pub mod hash_distance;
        pub mod near_duplicate;
        pub mod people;
        pub mod scene;
        pub mod vector_math;
    }
    pub mod cluster_engine;
}

pub mod pipeline {
    pub mod batch_executor;
    pub mod file_discovery;
    pub mod infrastructure;
    pub mod pipeline_config;
    pub mod pipeline_logger;
    pub mod process_photos_use_case;
    pub mod snapshot_writer;
}
