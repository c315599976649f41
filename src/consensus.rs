//! Temporal majority voting over a short window of frame results.
//!
//! Plates are aligned across frames by their left-to-right rank only. Each
//! rank is a voting slot; after `window_len` non-empty frames every slot
//! reports its most frequent reading and the window starts over.

use tracing::debug;

use crate::config::PipelineConfig;
use crate::integration::FrameResult;

/// The winning reading for one plate slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedPlate {
    /// Left-to-right rank, `0..max_slots`.
    pub slot: usize,
    pub text: String,
    /// Frames that read exactly `text` at this rank.
    pub votes: usize,
    /// Frames that had any reading at this rank.
    pub total: usize,
}

/// Fixed-capacity buffer of per-frame readings.
#[derive(Debug, Clone)]
pub struct ConsensusWindow {
    frames: Vec<Vec<String>>,
    window_len: usize,
    max_slots: usize,
    stale_reset_frames: u32,
    empty_streak: u32,
}

impl ConsensusWindow {
    pub fn new(window_len: usize, max_slots: usize, stale_reset_frames: u32) -> Self {
        Self {
            frames: Vec::with_capacity(window_len),
            window_len,
            max_slots,
            stale_reset_frames,
            empty_streak: 0,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.window_len,
            config.max_slots,
            config.stale_reset_frames,
        )
    }

    /// Buffer one frame's readings.
    ///
    /// Empty frames are ignored. The append that fills the window runs the
    /// vote, clears the buffer and returns the confirmed readings.
    pub fn push(&mut self, result: &FrameResult) -> Option<Vec<ConfirmedPlate>> {
        if result.is_empty() {
            return None;
        }

        let mut texts: Vec<String> = result.readings().iter().map(|r| r.text()).collect();
        if texts.len() > self.max_slots {
            debug!(
                plates = texts.len(),
                max_slots = self.max_slots,
                "ignoring plates beyond the last voting slot"
            );
            texts.truncate(self.max_slots);
        }
        self.frames.push(texts);

        if self.frames.len() < self.window_len {
            return None;
        }
        let confirmed = self.vote();
        self.frames.clear();
        Some(confirmed)
    }

    fn vote(&self) -> Vec<ConfirmedPlate> {
        (0..self.max_slots)
            .filter_map(|slot| {
                // (text, votes) in first-seen order so ties go to the earlier reading
                let mut tally: Vec<(&str, usize)> = Vec::new();
                for text in self.frames.iter().filter_map(|f| f.get(slot)) {
                    match tally.iter_mut().find(|(t, _)| *t == text.as_str()) {
                        Some((_, count)) => *count += 1,
                        None => tally.push((text.as_str(), 1)),
                    }
                }

                let total: usize = tally.iter().map(|(_, n)| n).sum();
                let mut best: Option<(&str, usize)> = None;
                for &(text, votes) in &tally {
                    if best.is_none_or(|(_, b)| votes > b) {
                        best = Some((text, votes));
                    }
                }
                best.map(|(text, votes)| ConfirmedPlate {
                    slot,
                    text: text.to_string(),
                    votes,
                    total,
                })
            })
            .collect()
    }

    /// Feed the stale-window rule with this frame's registry state.
    ///
    /// Returns `true` when `stale_reset_frames` consecutive empty frames have
    /// been seen; the buffer is then cleared whatever its fill level and the
    /// streak starts again.
    pub fn observe_registry(&mut self, registry_empty: bool) -> bool {
        if !registry_empty {
            self.empty_streak = 0;
            return false;
        }
        self.empty_streak += 1;
        if self.empty_streak < self.stale_reset_frames {
            return false;
        }
        debug!(discarded = self.frames.len(), "stale window reset");
        self.frames.clear();
        self.empty_streak = 0;
        true
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.empty_streak = 0;
    }
}

impl Default for ConsensusWindow {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;
    use crate::integration::{CharacterResult, PlateColor, PlateReading};

    fn frame(texts: &[&str]) -> FrameResult {
        FrameResult::new(
            texts
                .iter()
                .enumerate()
                .map(|(i, text)| PlateReading {
                    bbox: BoundingBox::new(100 * i as i32, 0, 100 * i as i32 + 80, 20),
                    characters: CharacterResult::from_text(PlateColor::White, text).unwrap(),
                    slot_id: None,
                })
                .collect(),
        )
    }

    #[test]
    fn test_vote_fires_on_seventh_frame() {
        let mut window = ConsensusWindow::default();
        for _ in 0..6 {
            assert!(window.push(&frame(&["12가3456"])).is_none());
        }
        assert_eq!(window.len(), 6);

        let confirmed = window.push(&frame(&["12가3455"])).unwrap();
        assert!(window.is_empty());
        assert_eq!(
            confirmed,
            vec![ConfirmedPlate {
                slot: 0,
                text: "12가3456".into(),
                votes: 6,
                total: 7
            }]
        );
    }

    #[test]
    fn test_empty_frames_do_not_count() {
        let mut window = ConsensusWindow::default();
        for _ in 0..10 {
            assert!(window.push(&FrameResult::default()).is_none());
        }
        assert!(window.is_empty());
    }

    #[test]
    fn test_slots_vote_independently() {
        let mut window = ConsensusWindow::new(3, 5, 5);
        window.push(&frame(&["12가3456", "34나5678"]));
        window.push(&frame(&["12가3456"]));
        let confirmed = window.push(&frame(&["12가3455", "34나5679"])).unwrap();

        assert_eq!(confirmed.len(), 2);
        assert_eq!(confirmed[0].text, "12가3456");
        assert_eq!((confirmed[0].votes, confirmed[0].total), (2, 3));
        // one vote each: the first-seen reading wins
        assert_eq!(confirmed[1].text, "34나5678");
        assert_eq!((confirmed[1].votes, confirmed[1].total), (1, 2));
    }

    #[test]
    fn test_plates_past_last_slot_ignored() {
        let mut window = ConsensusWindow::new(1, 2, 5);
        let confirmed = window
            .push(&frame(&["11가1111", "22가2222", "33가3333"]))
            .unwrap();
        assert_eq!(confirmed.len(), 2);
        assert!(confirmed.iter().all(|c| c.slot < 2));
    }

    #[test]
    fn test_stale_reset_after_five_empty_frames() {
        let mut window = ConsensusWindow::default();
        for _ in 0..3 {
            window.push(&frame(&["12가3456"]));
        }
        for _ in 0..4 {
            assert!(!window.observe_registry(true));
        }
        assert_eq!(window.len(), 3);
        assert!(window.observe_registry(true));
        assert!(window.is_empty());
    }

    #[test]
    fn test_stale_streak_broken_by_tracked_frame() {
        let mut window = ConsensusWindow::default();
        window.push(&frame(&["12가3456"]));
        for _ in 0..4 {
            window.observe_registry(true);
        }
        assert!(!window.observe_registry(false));
        for _ in 0..4 {
            assert!(!window.observe_registry(true));
        }
        assert_eq!(window.len(), 1);
    }
}
