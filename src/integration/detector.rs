//! Trait for object detection inference backends, plus a replay backend.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use ndarray::{Array2, Array3};

use crate::error::LprError;

/// Number of leading box columns in a raw row: `cx, cy, w, h, objectness`.
pub const RAW_BOX_COLUMNS: usize = 5;

/// Trait for object detection inference backends.
///
/// Both the plate detector and the character detector are driven through this
/// trait; the model itself is opaque to the pipeline.
///
/// # Example
///
/// ```ignore
/// use plate_stream::integration::Inference;
///
/// struct MyDarknet {
///     // Your model here
/// }
///
/// impl Inference for MyDarknet {
///     type Error = std::io::Error;
///
///     fn infer(&mut self, tensor: &Array3<f32>) -> Result<Array2<f32>, Self::Error> {
///         // Run the network and return one row per candidate
///         Ok(Array2::zeros((0, 8)))
///     }
/// }
/// ```
pub trait Inference {
    /// Error type for inference failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Run the network on one letterboxed input.
    ///
    /// # Arguments
    /// * `tensor` - CHW image, values in `[0, 1]`, square side equal to the configured input size
    ///
    /// # Returns
    /// One row per candidate, `[cx, cy, w, h, objectness, class scores...]`, in tensor pixels.
    fn infer(&mut self, tensor: &Array3<f32>) -> Result<Array2<f32>, Self::Error>;
}

impl<T: Inference + ?Sized> Inference for Box<T> {
    type Error = T::Error;

    fn infer(&mut self, tensor: &Array3<f32>) -> Result<Array2<f32>, Self::Error> {
        (**self).infer(tensor)
    }
}

/// Replays recorded raw outputs, one inference call per recorded entry.
///
/// The file format is JSON lines: each line is an array of rows for one call,
/// e.g. `[[208, 120, 96, 30, 0.92, 0.88, 0.05, 0.07]]`. Blank lines are empty
/// results. Once exhausted, every call returns no candidates.
#[derive(Debug, Clone, Default)]
pub struct ReplayInference {
    outputs: VecDeque<Array2<f32>>,
}

impl ReplayInference {
    pub fn new(outputs: impl IntoIterator<Item = Array2<f32>>) -> Self {
        Self {
            outputs: outputs.into_iter().collect(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LprError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_lines(&text)
    }

    pub fn from_json_lines(text: &str) -> Result<Self, LprError> {
        let mut outputs = VecDeque::new();
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                outputs.push_back(Array2::zeros((0, RAW_BOX_COLUMNS)));
                continue;
            }
            let rows: Vec<Vec<f32>> = serde_json::from_str(line).map_err(|source| {
                LprError::Replay {
                    line: i + 1,
                    source,
                }
            })?;
            outputs.push_back(rows_to_array(&rows)?);
        }
        Ok(Self { outputs })
    }

    pub fn remaining(&self) -> usize {
        self.outputs.len()
    }
}

impl Inference for ReplayInference {
    type Error = std::convert::Infallible;

    fn infer(&mut self, _tensor: &Array3<f32>) -> Result<Array2<f32>, Self::Error> {
        Ok(self
            .outputs
            .pop_front()
            .unwrap_or_else(|| Array2::zeros((0, RAW_BOX_COLUMNS))))
    }
}

/// Stack equally sized rows into a raw detection matrix.
pub fn rows_to_array(rows: &[Vec<f32>]) -> Result<Array2<f32>, LprError> {
    let cols = rows.first().map_or(RAW_BOX_COLUMNS, Vec::len);
    if let Some(bad) = rows.iter().find(|r| r.len() != cols || r.len() < RAW_BOX_COLUMNS) {
        return Err(LprError::MalformedOutput {
            expected: cols.max(RAW_BOX_COLUMNS),
            got: bad.len(),
        });
    }
    let flat: Vec<f32> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), cols), flat)
        .map_err(|_| LprError::MalformedOutput {
            expected: cols,
            got: 0,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_in_call_order() {
        let text = "[[10, 10, 4, 4, 0.9, 1.0]]\n\n[[1, 2, 3, 4, 0.5, 0.2], [5, 6, 7, 8, 0.6, 0.9]]\n";
        let mut replay = ReplayInference::from_json_lines(text).unwrap();
        let input = Array3::zeros((3, 4, 4));

        assert_eq!(replay.infer(&input).unwrap().dim(), (1, 6));
        assert_eq!(replay.infer(&input).unwrap().nrows(), 0);
        let third = replay.infer(&input).unwrap();
        assert_eq!(third.dim(), (2, 6));
        assert_eq!(third[[1, 0]], 5.0);
        assert_eq!(replay.infer(&input).unwrap().nrows(), 0);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = ReplayInference::from_json_lines("[[1, 2, 3, 4, 0.5, 0.1], [1, 2, 3]]");
        assert!(matches!(err, Err(LprError::MalformedOutput { got: 3, .. })));
    }

    #[test]
    fn test_bad_json_reports_line() {
        let err = ReplayInference::from_json_lines("[]\nnot json");
        assert!(matches!(err, Err(LprError::Replay { line: 2, .. })));
    }
}
