use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AspectRatioError {
    #[error("aspect ratio must look like W:H, got '{0}'")]
    Malformed(String),
    #[error("aspect ratio components must be positive, got '{0}'")]
    ZeroComponent(String),
}

/// Target crop shape, e.g. 4:5. Serialized as its `W:H` key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AspectRatio {
    width: u32,
    height: u32,
}

impl AspectRatio {
    pub fn new(width: u32, height: u32) -> Result<Self, AspectRatioError> {
        if width == 0 || height == 0 {
            return Err(AspectRatioError::ZeroComponent(format!("{width}:{height}")));
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Width divided by height.
    pub fn value(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Map key used for a record's `crops`, e.g. `"16:9"`.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = AspectRatioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| AspectRatioError::Malformed(s.to_string()))?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|_| AspectRatioError::Malformed(s.to_string()))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|_| AspectRatioError::Malformed(s.to_string()))?;
        Self::new(width, height).map_err(|_| AspectRatioError::ZeroComponent(s.to_string()))
    }
}

impl TryFrom<String> for AspectRatio {
    type Error = AspectRatioError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AspectRatio> for String {
    fn from(ratio: AspectRatio) -> Self {
        ratio.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case("4:5", 4, 5)]
    #[case("16:9", 16, 9)]
    #[case(" 1 : 1 ", 1, 1)]
    fn test_parse_valid(#[case] text: &str, #[case] w: u32, #[case] h: u32) {
        let ratio: AspectRatio = text.parse().unwrap();
        assert_eq!((ratio.width(), ratio.height()), (w, h));
    }

    #[rstest]
    #[case("16x9")]
    #[case("a:b")]
    #[case("")]
    #[case("4:")]
    fn test_parse_malformed(#[case] text: &str) {
        assert!(matches!(
            text.parse::<AspectRatio>(),
            Err(AspectRatioError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_zero_component() {
        assert!(matches!(
            "0:5".parse::<AspectRatio>(),
            Err(AspectRatioError::ZeroComponent(_))
        ));
    }

    #[test]
    fn test_value_and_key() {
        let ratio = AspectRatio::new(16, 9).unwrap();
        assert_relative_eq!(ratio.value(), 16.0 / 9.0);
        assert_eq!(ratio.key(), "16:9");
    }

    #[test]
    fn test_serde_uses_key() {
        let ratio = AspectRatio::new(4, 5).unwrap();
        let json = serde_json::to_string(&ratio).unwrap();
        assert_eq!(json, "\"4:5\"");
        let back: AspectRatio = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ratio);
    }
}
