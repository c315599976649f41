//! Constant-velocity Kalman filter over `(cx, cy, aspect, h)` box measurements.

use ndarray::{Array1, Array2};

use crate::geometry::Rect;

const NDIM: usize = 4;

/// Filter state: 8-dim mean (box plus velocities) and its covariance.
#[derive(Debug, Clone)]
pub struct KalmanState {
    pub mean: Array1<f64>,
    pub covariance: Array2<f64>,
}

impl KalmanState {
    /// Current box estimate.
    pub fn rect(&self) -> Rect {
        let (cx, cy, aspect, h) = (self.mean[0], self.mean[1], self.mean[2], self.mean[3]);
        let w = aspect * h;
        Rect::from_xywh(cx as f32, cy as f32, w as f32, h as f32)
    }
}

/// Box measurement as `[cx, cy, w / h, h]`.
pub fn measurement(rect: &Rect) -> [f64; NDIM] {
    let (cx, cy) = rect.center();
    let aspect = if rect.height > 0.0 {
        rect.width / rect.height
    } else {
        0.0
    };
    [cx as f64, cy as f64, aspect as f64, rect.height as f64]
}

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: Array2<f64>,
    update_mat: Array2<f64>,
    std_weight_position: f64,
    std_weight_velocity: f64,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl KalmanFilter {
    pub fn new() -> Self {
        let mut motion_mat = Array2::eye(2 * NDIM);
        for i in 0..NDIM {
            motion_mat[[i, NDIM + i]] = 1.0;
        }

        let mut update_mat = Array2::zeros((NDIM, 2 * NDIM));
        for i in 0..NDIM {
            update_mat[[i, i]] = 1.0;
        }

        Self {
            motion_mat,
            update_mat,
            std_weight_position: 1.0 / 20.0,
            std_weight_velocity: 1.0 / 160.0,
        }
    }

    fn diagonal(std: &[f64]) -> Array2<f64> {
        let mut m = Array2::zeros((std.len(), std.len()));
        for (i, s) in std.iter().enumerate() {
            m[[i, i]] = s * s;
        }
        m
    }

    /// Start a track from one measurement, with zero velocity.
    pub fn initiate(&self, z: [f64; NDIM]) -> KalmanState {
        let mut mean = Array1::zeros(2 * NDIM);
        for (i, v) in z.iter().enumerate() {
            mean[i] = *v;
        }

        let (p, v) = (self.std_weight_position * z[3], self.std_weight_velocity * z[3]);
        let covariance = Self::diagonal(&[
            2.0 * p,
            2.0 * p,
            1e-2,
            2.0 * p,
            10.0 * v,
            10.0 * v,
            1e-5,
            10.0 * v,
        ]);

        KalmanState { mean, covariance }
    }

    /// Advance one frame.
    pub fn predict(&self, state: &KalmanState) -> KalmanState {
        let h = state.mean[3];
        let (p, v) = (self.std_weight_position * h, self.std_weight_velocity * h);
        let motion_cov = Self::diagonal(&[p, p, 1e-2, p, v, v, 1e-5, v]);

        KalmanState {
            mean: self.motion_mat.dot(&state.mean),
            covariance: self.motion_mat.dot(&state.covariance).dot(&self.motion_mat.t())
                + motion_cov,
        }
    }

    fn project(&self, state: &KalmanState) -> (Array1<f64>, Array2<f64>) {
        let h = state.mean[3];
        let p = self.std_weight_position * h;
        let innovation_cov = Self::diagonal(&[p, p, 1e-1, p]);

        let mean = self.update_mat.dot(&state.mean);
        let covariance =
            self.update_mat.dot(&state.covariance).dot(&self.update_mat.t()) + innovation_cov;
        (mean, covariance)
    }

    /// Correct with a measurement. A singular innovation leaves the state as predicted.
    pub fn update(&self, state: &KalmanState, z: [f64; NDIM]) -> KalmanState {
        let (projected_mean, projected_cov) = self.project(state);
        let Some(s_inv) = invert_4x4(&projected_cov) else {
            return state.clone();
        };

        let innovation = Array1::from_vec(z.to_vec()) - projected_mean;

        // K = P * H^T * S^-1; H is [I 0] so P * H^T is the first four columns of P.
        let kalman_gain = state.covariance.dot(&self.update_mat.t()).dot(&s_inv);

        KalmanState {
            mean: &state.mean + &kalman_gain.dot(&innovation),
            covariance: &state.covariance
                - &kalman_gain.dot(&projected_cov).dot(&kalman_gain.t()),
        }
    }
}

/// 4x4 inverse through nalgebra, avoiding a BLAS/LAPACK dependency.
fn invert_4x4(m: &Array2<f64>) -> Option<Array2<f64>> {
    let nm = nalgebra::Matrix4::from_fn(|i, j| m[[i, j]]);
    let inv = nm.try_inverse()?;
    Some(Array2::from_shape_fn((NDIM, NDIM), |(i, j)| inv[(i, j)]))
}
