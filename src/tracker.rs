#[cfg(feature = "opencv-backend")]
mod kcf_tracker;
mod kalman_filter;
mod registry;
mod single_object;
mod template_tracker;
mod track_state;

#[cfg(feature = "opencv-backend")]
pub use kcf_tracker::KcfTracker;
pub use kalman_filter::{KalmanFilter, KalmanState};
pub use registry::{SlotId, SlotUpdate, TrackedPlate, TrackerRegistry};
pub use single_object::{SingleObjectTracker, TrackerFactory, TrackerUpdate};
pub use template_tracker::{TemplateTracker, TemplateTrackerConfig};
pub use track_state::TrackState;
