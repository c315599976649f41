/// Lifecycle of a tracked plate slot.
///
/// `Failed` is terminal: the registry evicts the slot in the same update that
/// observed the failure and never revives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackState {
    /// Tracker reported a usable box on its last update
    #[default]
    Active,
    /// Tracker lost the plate
    Failed,
}

impl TrackState {
    pub fn is_active(self) -> bool {
        self == TrackState::Active
    }
}
