//! Burn inference backend for the plate and character detectors.
//!
//! This module provides a `BurnInference` that implements `Inference`
//! for detection networks built with the Burn framework.
//!
//! # Example
//!
//! ```ignore
//! use plate_stream::integration::{BurnInference, BurnModel};
//! use burn::backend::NdArray;
//!
//! // Implement BurnModel for your detection network
//! struct PlateYolo { /* ... */ }
//!
//! impl BurnModel<NdArray> for PlateYolo {
//!     fn forward(&self, input: burn::tensor::Tensor<NdArray, 4>) -> burn::tensor::Tensor<NdArray, 2> {
//!         // Run the network, one row per candidate
//!     }
//! }
//!
//! let model = PlateYolo::load("plate.bin");
//! let plates = BurnInference::new(model, Default::default());
//! ```

use burn::prelude::*;
use burn::tensor::Tensor;
use ndarray::{Array2, Array3};
use thiserror::Error;

use super::detector::{Inference, RAW_BOX_COLUMNS};

/// Error type for Burn inference failures.
#[derive(Debug, Clone, Error)]
pub enum BurnInferenceError {
    /// Input tensor does not match the network input.
    #[error("invalid input dimensions: expected {expected:?}, got {got:?}")]
    InvalidInputDimensions {
        expected: (usize, usize, usize),
        got: (usize, usize, usize),
    },
    /// Network output could not be read back as rows.
    #[error("invalid network output: {0}")]
    Output(String),
}

/// Trait for Burn-based detection networks.
///
/// Implement this trait for your specific model architecture.
pub trait BurnModel<B: Backend>: Send + Sync {
    /// Run forward pass on the input tensor.
    ///
    /// # Arguments
    /// * `input` - Input tensor of shape [1, 3, size, size], values in [0, 1]
    ///
    /// # Returns
    /// A `[candidates, 5 + classes]` tensor of `[cx, cy, w, h, objectness, class scores...]` rows.
    fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2>;

    /// Square input side the network was trained on.
    fn input_size(&self) -> usize {
        416
    }
}

/// Burn-based network implementing `Inference`.
pub struct BurnInference<B: Backend, M: BurnModel<B>> {
    model: M,
    device: B::Device,
}

impl<B: Backend, M: BurnModel<B>> BurnInference<B, M> {
    /// Create a new Burn inference backend with the given model and device.
    pub fn new(model: M, device: B::Device) -> Self {
        Self { model, device }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    fn to_input(&self, tensor: &Array3<f32>) -> Result<Tensor<B, 4>, BurnInferenceError> {
        let size = self.model.input_size();
        let got = tensor.dim();
        if got != (3, size, size) {
            return Err(BurnInferenceError::InvalidInputDimensions {
                expected: (3, size, size),
                got,
            });
        }

        let data: Vec<f32> = tensor.iter().copied().collect();
        Ok(Tensor::<B, 1>::from_floats(data.as_slice(), &self.device).reshape([1, 3, size, size]))
    }
}

impl<B: Backend, M: BurnModel<B>> Inference for BurnInference<B, M> {
    type Error = BurnInferenceError;

    fn infer(&mut self, tensor: &Array3<f32>) -> Result<Array2<f32>, Self::Error> {
        let input = self.to_input(tensor)?;
        let output = self.model.forward(input);

        let [rows, cols] = output.dims();
        if rows > 0 && cols <= RAW_BOX_COLUMNS {
            return Err(BurnInferenceError::Output(format!(
                "{cols} columns, need more than {RAW_BOX_COLUMNS}"
            )));
        }
        let values = output
            .into_data()
            .to_vec::<f32>()
            .map_err(|err| BurnInferenceError::Output(format!("{err:?}")))?;
        Array2::from_shape_vec((rows, cols), values)
            .map_err(|err| BurnInferenceError::Output(err.to_string()))
    }
}
