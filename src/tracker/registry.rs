//! Owner of every live plate tracker.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::error::LprError;
use crate::frame::Frame;
use crate::geometry::BoundingBox;
use crate::integration::{PlateColor, PlateDetection};

use super::single_object::{SingleObjectTracker, TrackerFactory};
use super::track_state::TrackState;

/// Identity of one spawn event.
///
/// The serial grows monotonically for the lifetime of a registry, so ids are
/// never reused even when the number of plates per frame changes. Displays as
/// `"{serial}_{colour class}"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId {
    serial: u64,
    color: PlateColor,
}

impl SlotId {
    /// Plate colour the slot was spawned with; recognition on tracked frames uses it.
    pub fn color(&self) -> PlateColor {
        self.color
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.serial, self.color.class_id())
    }
}

/// A plate followed by a tracker.
#[derive(Debug)]
pub struct TrackedPlate<T> {
    slot_id: SlotId,
    tracker: T,
    last_box: BoundingBox,
    state: TrackState,
}

impl<T> TrackedPlate<T> {
    pub fn slot_id(&self) -> SlotId {
        self.slot_id
    }

    pub fn color(&self) -> PlateColor {
        self.slot_id.color
    }

    pub fn last_box(&self) -> BoundingBox {
        self.last_box
    }

    pub fn state(&self) -> TrackState {
        self.state
    }
}

/// Per-slot outcome of [`TrackerRegistry::update_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotUpdate {
    Active(BoundingBox),
    Failed,
}

/// Registry of plate trackers keyed by [`SlotId`].
///
/// Slots are `Active` until their tracker fails. A failed slot is reported once
/// by the `update_all` call that observed the failure and is gone when that call
/// returns.
pub struct TrackerRegistry<F: TrackerFactory> {
    factory: F,
    slots: BTreeMap<SlotId, TrackedPlate<F::Tracker>>,
    next_serial: u64,
}

impl<F: TrackerFactory> TrackerRegistry<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            slots: BTreeMap::new(),
            next_serial: 0,
        }
    }

    /// Start tracking `detection` from `frame` under a fresh slot id.
    ///
    /// Nothing is registered if the tracker fails to initialise; the serial is
    /// consumed either way.
    pub fn spawn(&mut self, detection: &PlateDetection, frame: &Frame) -> Result<SlotId, LprError> {
        let slot_id = SlotId {
            serial: self.next_serial,
            color: detection.color,
        };
        self.next_serial += 1;

        let mut tracker = self.factory.create();
        tracker.init(frame, detection.bbox)?;

        debug!(slot = %slot_id, bbox = ?detection.bbox, frame = frame.index(), "spawned tracker");
        self.slots.insert(
            slot_id,
            TrackedPlate {
                slot_id,
                tracker,
                last_box: detection.bbox,
                state: TrackState::Active,
            },
        );
        Ok(slot_id)
    }

    /// Step every tracker on `frame` and evict the ones that failed.
    ///
    /// A box that clips to nothing inside the frame counts as a failure.
    pub fn update_all(&mut self, frame: &Frame) -> BTreeMap<SlotId, SlotUpdate> {
        let (width, height) = (frame.width(), frame.height());
        let mut updates = BTreeMap::new();

        for (slot_id, plate) in self.slots.iter_mut() {
            let update = plate.tracker.update(frame);
            let bbox = if update.is_failure() {
                None
            } else {
                BoundingBox::clipped(&update.rect, width, height)
            };

            let outcome = match bbox {
                Some(bbox) => {
                    plate.last_box = bbox;
                    SlotUpdate::Active(bbox)
                }
                None => {
                    plate.state = TrackState::Failed;
                    SlotUpdate::Failed
                }
            };
            updates.insert(*slot_id, outcome);
        }

        self.slots.retain(|slot_id, plate| {
            let keep = plate.state.is_active();
            if !keep {
                debug!(slot = %slot_id, frame = frame.index(), "evicted failed tracker");
            }
            keep
        });
        updates
    }

    pub fn get(&self, slot_id: &SlotId) -> Option<&TrackedPlate<F::Tracker>> {
        self.slots.get(slot_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedPlate<F::Tracker>> {
        self.slots.values()
    }

    /// Drop every tracker. Serials keep counting.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::tracker::TrackerUpdate;
    use image::RgbImage;
    use std::collections::VecDeque;

    /// Replays scripted updates, then fails.
    struct Scripted(VecDeque<TrackerUpdate>);

    impl SingleObjectTracker for Scripted {
        fn init(&mut self, _frame: &Frame, _bbox: BoundingBox) -> Result<(), LprError> {
            Ok(())
        }

        fn update(&mut self, _frame: &Frame) -> TrackerUpdate {
            self.0.pop_front().unwrap_or_else(TrackerUpdate::failure)
        }
    }

    fn detection(x1: i32, color: PlateColor) -> PlateDetection {
        PlateDetection {
            bbox: BoundingBox::new(x1, 10, x1 + 40, 25),
            color,
            objectness: 0.9,
            class_confidence: 0.9,
        }
    }

    fn frame() -> Frame {
        Frame::new(0, RgbImage::new(100, 50))
    }

    #[test]
    fn test_slot_ids_are_unique_across_clears() {
        let mut registry = TrackerRegistry::new(|| Scripted(VecDeque::new()));
        let a = registry.spawn(&detection(0, PlateColor::White), &frame()).unwrap();
        registry.clear();
        let b = registry.spawn(&detection(0, PlateColor::White), &frame()).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "0_0");
        assert_eq!(b.to_string(), "1_0");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_failed_slot_evicted_in_same_call() {
        let ok = TrackerUpdate::success(Rect::new(5.0, 10.0, 40.0, 15.0));
        let mut scripts = VecDeque::from([
            VecDeque::from([ok, ok]),
            VecDeque::from([TrackerUpdate::success(Rect::default())]),
        ]);
        let mut registry =
            TrackerRegistry::new(move || Scripted(scripts.pop_front().unwrap_or_default()));
        let keep = registry.spawn(&detection(0, PlateColor::White), &frame()).unwrap();
        let lose = registry.spawn(&detection(50, PlateColor::Yellow), &frame()).unwrap();

        let updates = registry.update_all(&frame());
        assert_eq!(updates[&keep], SlotUpdate::Active(BoundingBox::new(5, 10, 45, 25)));
        assert_eq!(updates[&lose], SlotUpdate::Failed);
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&lose).is_none());
        assert_eq!(registry.get(&keep).unwrap().last_box(), BoundingBox::new(5, 10, 45, 25));

        let updates = registry.update_all(&frame());
        assert_eq!(updates.len(), 1);
        assert!(!updates.contains_key(&lose));
    }

    #[test]
    fn test_box_outside_frame_is_failure() {
        let outside = TrackerUpdate::success(Rect::new(150.0, 10.0, 40.0, 15.0));
        let mut registry = TrackerRegistry::new(move || Scripted(VecDeque::from([outside])));
        let slot = registry.spawn(&detection(0, PlateColor::Green), &frame()).unwrap();
        assert_eq!(registry.update_all(&frame())[&slot], SlotUpdate::Failed);
        assert!(registry.is_empty());
    }
}
