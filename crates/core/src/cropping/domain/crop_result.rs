use std::fmt;

use serde::{Deserialize, Serialize};

/// Which subject anchored a crop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropMethod {
    Face,
    Person,
    Saliency,
}

impl fmt::Display for CropMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CropMethod::Face => write!(f, "face"),
            CropMethod::Person => write!(f, "person"),
            CropMethod::Saliency => write!(f, "saliency"),
        }
    }
}

/// Integer crop rectangle, always inside the source image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropBox {
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CropResult {
    pub crop_box: CropBox,
    pub confidence: f64,
    pub method: CropMethod,
    pub reason: String,
}
