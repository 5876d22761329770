/// Extensions accepted during discovery (compared lowercase).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tiff", "tif"];

/// Default crop targets: portrait 4:5, landscape 16:9, square 1:1.
pub const DEFAULT_ASPECT_RATIOS: &[&str] = &["4:5", "16:9", "1:1"];

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_HEADROOM_RATIO: f64 = 0.15;
pub const DEFAULT_PERSON_CONFIDENCE: f64 = 0.25;
pub const DEFAULT_FACE_CONFIDENCE: f64 = 0.5;
pub const MONOCHROME_SATURATION_THRESHOLD: f64 = 0.1;

/// Person detection runs when a photo has no faces or more than this many.
pub const GROUP_SHOT_FACE_COUNT: usize = 3;

pub const CHECKPOINT_FILENAME: &str = "checkpoint.json";
pub const PHOTOS_TABLE_FILENAME: &str = "photos.csv";
pub const PHOTOS_JSON_FILENAME: &str = "photos.json";
pub const CLUSTERS_JSON_FILENAME: &str = "clusters.json";
pub const PEOPLE_JSON_FILENAME: &str = "people.json";
