//! ONNX Runtime session shared by the model-backed collaborators.
//!
//! `ort` sessions need `&mut` to run, so the session sits behind a mutex
//! and worker threads take turns on it.

use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;

use crate::shared::BoxError;

pub struct OnnxModel {
    session: Mutex<ort::session::Session>,
    input_size: Option<u32>,
}

/// First output of one inference, copied out of the session.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelOutput {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl OnnxModel {
    pub fn load(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?.commit_from_file(model_path)?;

        // NCHW: [1, 3, H, W]. Dynamic dimensions read as <= 0.
        let input_size = session.inputs().first().and_then(|input| {
            if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                if shape.len() >= 4 && shape[2] > 0 {
                    return Some(shape[2] as u32);
                }
            }
            None
        });
        log::info!("Loaded model {}", model_path.display());

        Ok(Self {
            session: Mutex::new(session),
            input_size,
        })
    }

    /// Square input side declared by the model, if static.
    pub fn input_size(&self) -> Option<u32> {
        self.input_size
    }

    pub fn run(&self, input: Array4<f32>) -> Result<ModelOutput, BoxError> {
        let input_value = ort::value::Tensor::from_array(input)?;
        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        Ok(ModelOutput {
            shape: tensor.shape().to_vec(),
            data: tensor.iter().copied().collect(),
        })
    }
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
