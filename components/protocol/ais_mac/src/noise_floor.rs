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

use heapless::HistoryBuffer;

use crate::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NoiseSample {
    pub channel: Channel,
    pub rssi: Rssi,
    pub timestamp: TimeUs,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    sample: NoiseSample,
    /// Mean over this and the preceding samples
    average: Rssi,
}

/// Clear channel assessment from periodic RSSI samples
///
/// Each sample is smoothed with the few samples before it that lie within the guard window. A
/// channel is clear only if the samples cover the guard window and every smoothed sample inside
/// it is below the threshold.
pub struct NoiseFloorDetector {
    history: [HistoryBuffer<Entry, NOISE_HISTORY_LEN>; 2],
    guard_window: TimeUs,
    /// Expected time between two samples
    sample_interval: TimeUs,
}

impl NoiseFloorDetector {
    pub fn new(guard_window_us: u32, sample_interval: TimeUs) -> Self {
        Self {
            history: [HistoryBuffer::new(), HistoryBuffer::new()],
            guard_window: guard_window_us as TimeUs,
            sample_interval,
        }
    }

    pub fn set_timing(&mut self, guard_window_us: u32, sample_interval: TimeUs) {
        self.guard_window = guard_window_us as TimeUs;
        self.sample_interval = sample_interval;
    }

    /// Read the RSSI of a channel from the radio and record it
    pub fn sample<R: Rfic>(
        &mut self,
        radio: &mut RadioManager<R>,
        channel: Channel,
        vhf: VhfChannel,
        timestamp: TimeUs,
    ) -> Result<NoiseSample, Error> {
        let rssi = radio.read_rssi(vhf)?;
        let sample = NoiseSample {
            channel,
            rssi,
            timestamp,
        };
        self.record(sample);
        Ok(sample)
    }

    pub fn record(&mut self, sample: NoiseSample) {
        let history = &mut self.history[sample.channel.index()];
        let oldest = sample.timestamp.saturating_sub(self.guard_window);
        let previous = history.len().min(NOISE_AVERAGE_LEN - 1);
        let (count, sum) = history
            .oldest_ordered()
            .skip(history.len() - previous)
            .filter(|e| e.sample.timestamp >= oldest)
            .fold((1, sample.rssi as i32), |(count, sum), e| {
                (count + 1, sum + e.sample.rssi as i32)
            });
        history.write(Entry {
            sample,
            average: (sum / count) as Rssi,
        });
    }

    /// Whether the channel stayed below `threshold` during the whole guard window
    ///
    /// The window ends at the latest sample. It counts as observed if the earliest sample in it
    /// is at most one sample interval after the window start.
    pub fn is_clear(&self, channel: Channel, threshold: Rssi) -> bool {
        let history = &self.history[channel.index()];
        let Some(latest) = history.recent() else {
            return false;
        };
        let latest = latest.sample.timestamp;
        let start = latest.saturating_sub(self.guard_window);
        let mut in_window = history
            .oldest_ordered()
            .filter(|e| e.sample.timestamp >= start)
            .peekable();
        let covered = in_window.peek().is_some_and(|e| {
            latest - e.sample.timestamp + self.sample_interval >= self.guard_window
        });
        covered && in_window.all(|e| e.average < threshold)
    }

    /// Smoothed RSSI of the latest sample
    pub fn rolling_average(&self, channel: Channel) -> Option<Rssi> {
        self.history[channel.index()].recent().map(|e| e.average)
    }

    /// Lowest smoothed RSSI in the history
    pub fn noise_floor(&self, channel: Channel) -> Option<Rssi> {
        self.history[channel.index()]
            .oldest_ordered()
            .map(|e| e.average)
            .min()
    }

    pub fn reset(&mut self) {
        self.history = [HistoryBuffer::new(), HistoryBuffer::new()];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(rssi: Rssi, timestamp: TimeUs) -> NoiseSample {
        NoiseSample {
            channel: Channel::A,
            rssi,
            timestamp,
        }
    }

    #[test]
    fn quiet_channel_is_clear() {
        let mut detector = NoiseFloorDetector::new(50_000, 20_000);
        assert!(!detector.is_clear(Channel::A, -100));
        for t in 0..5 {
            detector.record(sample(-115, t * 20_000));
        }
        assert!(detector.is_clear(Channel::A, -100));
        assert_eq!(detector.rolling_average(Channel::A), Some(-115));
        assert_eq!(detector.noise_floor(Channel::A), Some(-115));
        assert!(!detector.is_clear(Channel::B, -100));
    }

    #[test]
    fn spike_in_guard_window_blocks() {
        let mut detector = NoiseFloorDetector::new(50_000, 20_000);
        for t in 0..8 {
            detector.record(sample(-120, t * 20_000));
        }
        detector.record(sample(-20, 160_000));
        detector.record(sample(-120, 180_000));
        // smoothed values at 160ms and 180ms are both -86
        assert!(!detector.is_clear(Channel::A, -100));
        for t in 10..15 {
            detector.record(sample(-120, t * 20_000));
        }
        // spike has left the averaging and the guard window
        assert!(detector.is_clear(Channel::A, -100));
    }

    #[test]
    fn clear_needs_whole_window_below_threshold() {
        let mut detector = NoiseFloorDetector::new(100_000, 20_000);
        for t in 0..4 {
            detector.record(sample(-90, t * 20_000));
        }
        // latest samples are quiet but the beginning of the window is not
        detector.record(sample(-130, 80_000));
        detector.record(sample(-130, 100_000));
        assert!(!detector.is_clear(Channel::A, -100));
    }

    #[test]
    fn busy_start_of_window_blocks() {
        let mut detector = NoiseFloorDetector::new(250_000, 100_000);
        detector.record(sample(-50, 1_000_000));
        detector.record(sample(-120, 1_100_000));
        detector.record(sample(-120, 1_200_000));
        assert!(!detector.is_clear(Channel::A, -100));
        detector.record(sample(-120, 1_300_000));
        detector.record(sample(-120, 1_400_000));
        // smoothed value at 1.2s still contains the loud sample
        assert!(!detector.is_clear(Channel::A, -100));
        detector.record(sample(-120, 1_500_000));
        assert!(detector.is_clear(Channel::A, -100));
    }

    #[test]
    fn window_must_be_observed() {
        let mut detector = NoiseFloorDetector::new(250_000, 100_000);
        detector.record(sample(-120, 1_000_000));
        assert!(!detector.is_clear(Channel::A, -100));
        detector.record(sample(-120, 1_100_000));
        assert!(!detector.is_clear(Channel::A, -100));
        detector.record(sample(-120, 1_200_000));
        assert!(detector.is_clear(Channel::A, -100));
    }

    #[test]
    fn old_samples_are_not_averaged() {
        let mut detector = NoiseFloorDetector::new(50_000, 20_000);
        for t in 0..4 {
            detector.record(sample(-60, t * 20_000));
        }
        assert_eq!(detector.rolling_average(Channel::A), Some(-60));
        // minutes later, the loud samples are still in the history
        for t in 0..3 {
            detector.record(sample(-120, 120_000_000 + t * 20_000));
        }
        assert_eq!(detector.rolling_average(Channel::A), Some(-120));
        assert!(detector.is_clear(Channel::A, -100));
        assert_eq!(detector.noise_floor(Channel::A), Some(-120));
    }

    #[test]
    fn reset_forgets_samples() {
        let mut detector = NoiseFloorDetector::new(100_000, 20_000);
        detector.record(sample(-120, 0));
        detector.reset();
        assert_eq!(detector.rolling_average(Channel::A), None);
        assert!(!detector.is_clear(Channel::A, -100));
    }
}
