//  _____       ______   ____
// |_   _|     |  ____|/ ____|  Institute of Embedded Systems
//   | |  _ __ | |__  | (___    Zurich University of Applied Sciences
//   | | | '_ \|  __|  \___ \   8401 Winterthur, Switzerland
//  _| |_| | | | |____ ____) |
// |_____|_| |_|______|_____/
//
// Copyright 2025 Institute of Embedded Systems at Zurich University of Applied Sciences.
// All rights reserved.
// SPDX-License-Identifier: MIT

//! Slot timing derived from the GPS pulse per second

use crate::*;

/// Slot counted since the UTC epoch: `frame number * slots per frame + slot index`
///
/// Frames start at UTC seconds divisible by the frame length, so all synchronised stations agree
/// on slot numbers.
pub type SlotNumber = u64;

/// Reference between local time and the UTC frame grid, renewed on every PPS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrameSync {
    pub(crate) frame_number: u64,
    /// Time into the frame at the last PPS
    frame_offset: TimeUs,
    pub(crate) last_pps: TimeUs,
    slots_per_frame: u16,
    frame_duration: TimeUs,
}

impl FrameSync {
    pub(crate) fn from_pps(timestamp: TimeUs, utc_second: u64, tuning: &Tuning) -> Self {
        let frame_seconds = tuning.frame_seconds.max(1) as u64;
        Self {
            frame_number: utc_second / frame_seconds,
            frame_offset: utc_second % frame_seconds * US_PER_S,
            last_pps: timestamp,
            slots_per_frame: tuning.slots_per_frame.max(1),
            frame_duration: frame_seconds * US_PER_S,
        }
    }

    /// Slot the given local time falls into
    pub(crate) fn slot_at(&self, time: TimeUs) -> SlotNumber {
        let spf = self.slots_per_frame as u64;
        let base = self.frame_number * spf;
        // the frame may have started before local time zero
        match (time + self.frame_offset).checked_sub(self.last_pps) {
            Some(elapsed) => base + elapsed * spf / self.frame_duration,
            None => {
                // timestamps of interrupts that fired shortly before the PPS
                let before = self.last_pps - self.frame_offset - time;
                base.saturating_sub((before * spf).div_ceil(self.frame_duration))
            }
        }
    }

    pub(crate) fn index(&self, slot: SlotNumber) -> SlotIndex {
        slot_index(slot, self.slots_per_frame)
    }

    /// Whether the last PPS is older than `timeout_s`
    pub(crate) fn is_stale(&self, time: TimeUs, timeout_s: u8) -> bool {
        time.saturating_sub(self.last_pps) > timeout_s as TimeUs * US_PER_S
    }
}

pub(crate) fn slot_index(slot: SlotNumber, slots_per_frame: u16) -> SlotIndex {
    (slot % slots_per_frame.max(1) as u64) as SlotIndex
}

/// First slot with the given index at or after `earliest`
pub(crate) fn next_occurrence(
    earliest: SlotNumber,
    index: SlotIndex,
    slots_per_frame: u16,
) -> SlotNumber {
    let spf = slots_per_frame.max(1) as u64;
    let candidate = earliest / spf * spf + (index as u64 % spf);
    if candidate < earliest {
        candidate + spf
    } else {
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_of_an_ais_frame() {
        let tuning = Tuning::default();
        // PPS at UTC second 125 arrives at local time 7s, frame 2 started at UTC second 120
        let sync = FrameSync::from_pps(7_000_000, 125, &tuning);
        assert_eq!(sync.frame_number, 2);
        assert_eq!(sync.slot_at(2_000_000), 4500);
        assert_eq!(sync.index(sync.slot_at(2_000_000)), 0);
        // 26.67ms slots
        assert_eq!(sync.index(sync.slot_at(2_026_666)), 0);
        assert_eq!(sync.index(sync.slot_at(2_026_667)), 1);
        assert_eq!(sync.index(sync.slot_at(7_000_000)), 187);
        // next frame
        assert_eq!(sync.slot_at(62_000_000), 6750);
    }

    #[test]
    fn interrupt_before_frame_start() {
        let tuning = Tuning::default();
        let sync = FrameSync::from_pps(60_000_000, 120, &tuning);
        assert_eq!(sync.slot_at(60_000_000), 4500);
        assert_eq!(sync.slot_at(59_990_000), 4499);
        assert_eq!(sync.index(sync.slot_at(59_990_000)), 2249);
    }

    #[test]
    fn frame_started_before_power_up() {
        let tuning = Tuning::default();
        // first PPS half a minute into the frame, one second after power up
        let sync = FrameSync::from_pps(1_000_000, 150, &tuning);
        assert_eq!(sync.frame_number, 2);
        assert_eq!(sync.slot_at(1_000_000), 4500 + 1125);
        assert_eq!(sync.slot_at(0), 4500 + 1087);
        assert_eq!(sync.slot_at(31_000_000), 6750);
    }

    #[test]
    fn stale_after_timeout() {
        let sync = FrameSync::from_pps(1_000_000, 0, &Tuning::default());
        assert!(!sync.is_stale(4_000_000, 3));
        assert!(sync.is_stale(4_000_001, 3));
    }

    #[test]
    fn next_occurrence_of_slot_index() {
        assert_eq!(next_occurrence(1002, 5, 10), 1005);
        assert_eq!(next_occurrence(1002, 2, 10), 1002);
        assert_eq!(next_occurrence(1002, 1, 10), 1011);
    }
}
