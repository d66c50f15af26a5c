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

//! Entry points for interrupt handlers
//!
//! Everything here only pushes into the queues. It never blocks, allocates or touches scheduler
//! state.

use crate::*;

/// Frame received from another station
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxFrame {
    pub channel: Channel,
    pub source: StationId,
    /// Frames the sender keeps its slot, 0 if it gives the slot up
    pub slot_timeout: u8,
    pub rssi: Rssi,
    /// Start of reception, determines the slot the sender used
    pub received_at: TimeUs,
    pub payload: Payload,
}

/// Producer side of the station queues, owned by the interrupt handlers
pub struct InterruptContext<'a> {
    events: EventPoster<'a, EVENT_QUEUE_SIZE>,
    frames: QueueProducer<'a, RxFrame, RX_QUEUE_SIZE>,
}

impl<'a> InterruptContext<'a> {
    pub fn new(
        events: EventPoster<'a, EVENT_QUEUE_SIZE>,
        frames: QueueProducer<'a, RxFrame, RX_QUEUE_SIZE>,
    ) -> Self {
        Self { events, frames }
    }

    pub fn on_slot_timer(&mut self, timestamp: TimeUs) -> bool {
        self.events.post_event(EventKind::SlotTick, timestamp)
    }

    pub fn on_pps(&mut self, timestamp: TimeUs) -> bool {
        self.events.post_event(EventKind::GpsSecond, timestamp)
    }

    pub fn on_carrier_detected(&mut self, timestamp: TimeUs) -> bool {
        self.events.post_event(EventKind::CarrierDetected, timestamp)
    }

    /// Queue a received frame
    ///
    /// The event is posted even if the frame was dropped so the radio state follows the hardware.
    pub fn on_rx_done(&mut self, timestamp: TimeUs, frame: RxFrame) -> bool {
        let queued = self.frames.try_push(frame);
        self.events.post_event(EventKind::PacketReceived, timestamp) && queued
    }

    pub fn on_tx_done(&mut self, timestamp: TimeUs) -> bool {
        self.events.post_event(EventKind::TxDone, timestamp)
    }

    pub fn on_radio_ready(&mut self, timestamp: TimeUs) -> bool {
        self.events.post_event(EventKind::RadioReady, timestamp)
    }

    pub fn on_position_fix(&mut self, timestamp: TimeUs, speed_dkn: u16) -> bool {
        self.events
            .post_event(EventKind::PositionFix { speed_dkn }, timestamp)
    }

    pub fn on_interrogation(
        &mut self,
        timestamp: TimeUs,
        report: ReportKind,
        channel: Channel,
    ) -> bool {
        self.events
            .post_event(EventKind::Interrogation { report, channel }, timestamp)
    }

    pub fn events_dropped(&self) -> u32 {
        self.events.overflow_count()
    }

    pub fn frames_dropped(&self) -> u32 {
        self.frames.dropped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_is_queued_before_its_event() {
        let mut events = StationEventQueue::new();
        let mut frames = RxQueue::new();
        let (poster, mut drain) = events.split();
        let (producer, mut consumer) = frames.split();
        let mut irq = InterruptContext::new(poster, producer);
        let frame = RxFrame {
            channel: Channel::B,
            source: 7,
            slot_timeout: 2,
            rssi: -70,
            received_at: 5,
            payload: Payload::new(),
        };
        assert!(irq.on_rx_done(5, frame.clone()));
        let event = drain.drain_events().next().unwrap();
        assert_eq!(event.kind, EventKind::PacketReceived);
        assert_eq!(consumer.try_pop(), Some(frame));
    }

    #[test]
    fn full_frame_queue_still_posts_event() {
        let mut events = StationEventQueue::new();
        let mut frames = RxQueue::new();
        let (poster, mut drain) = events.split();
        let (producer, _consumer) = frames.split();
        let mut irq = InterruptContext::new(poster, producer);
        for t in 0..RX_QUEUE_SIZE as TimeUs {
            let frame = RxFrame {
                channel: Channel::A,
                source: 1,
                slot_timeout: 0,
                rssi: -70,
                received_at: t,
                payload: Payload::new(),
            };
            irq.on_rx_done(t, frame);
        }
        assert_eq!(irq.frames_dropped(), 1);
        assert_eq!(drain.drain_events().count(), RX_QUEUE_SIZE);
        assert_eq!(irq.events_dropped(), 0);
    }
}
