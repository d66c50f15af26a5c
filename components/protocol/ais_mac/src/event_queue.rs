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

use crate::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventKind {
    /// Slot timer interrupt
    SlotTick,
    /// GPS pulse per second, marks the start of a UTC second
    GpsSecond,
    /// Radio received a frame, the frame is waiting in the RX queue
    PacketReceived,
    /// Radio detected a carrier
    CarrierDetected,
    TxDone,
    /// Radio IC finished (re)configuration
    RadioReady,
    /// New position fix
    PositionFix {
        /// Speed over ground in 0.1 knots
        speed_dkn: u16,
    },
    /// Another station requested a report
    Interrogation { report: ReportKind, channel: Channel },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Event {
    pub kind: EventKind,
    /// Time the interrupt fired
    pub timestamp: TimeUs,
}

/// Bounded event storage between interrupt handlers and the station loop
///
/// Posting into a full queue drops the new event and counts it. Events are drained in arrival
/// order.
pub struct EventQueue<const N: usize> {
    queue: CircularQueue<Event, N>,
}

impl<const N: usize> EventQueue<N> {
    pub const fn new() -> Self {
        Self {
            queue: CircularQueue::new(),
        }
    }

    pub fn split(&mut self) -> (EventPoster<'_, N>, EventDrain<'_, N>) {
        let (producer, consumer) = self.queue.split();
        (EventPoster { producer }, EventDrain { consumer })
    }

    pub const fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}

impl<const N: usize> Default for EventQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Interrupt side of the event queue
pub struct EventPoster<'a, const N: usize> {
    producer: QueueProducer<'a, Event, N>,
}

impl<const N: usize> EventPoster<'_, N> {
    /// Returns false if the event was dropped because the queue is full
    pub fn post_event(&mut self, kind: EventKind, timestamp: TimeUs) -> bool {
        self.producer.try_push(Event { kind, timestamp })
    }

    pub fn overflow_count(&self) -> u32 {
        self.producer.dropped()
    }
}

/// Station loop side of the event queue
pub struct EventDrain<'a, const N: usize> {
    consumer: QueueConsumer<'a, Event, N>,
}

impl<'a, const N: usize> EventDrain<'a, N> {
    /// Pops events until the queue is empty
    ///
    /// Events posted while draining are returned as well.
    pub fn drain_events(&mut self) -> Drain<'_, 'a, N> {
        Drain {
            consumer: &mut self.consumer,
        }
    }

    pub fn pending(&self) -> usize {
        self.consumer.len()
    }

    pub fn overflow_count(&self) -> u32 {
        self.consumer.dropped()
    }
}

pub struct Drain<'d, 'a, const N: usize> {
    consumer: &'d mut QueueConsumer<'a, Event, N>,
}

impl<const N: usize> Iterator for Drain<'_, '_, N> {
    type Item = Event;

    fn next(&mut self) -> Option<Self::Item> {
        self.consumer.try_pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drained_in_arrival_order() {
        let mut queue = EventQueue::<8>::new();
        let (mut poster, mut drain) = queue.split();
        assert!(poster.post_event(EventKind::GpsSecond, 10));
        assert!(poster.post_event(EventKind::SlotTick, 30));
        // late tick, queue order is kept, timestamps are not sorted
        assert!(poster.post_event(EventKind::SlotTick, 20));
        assert_eq!(drain.pending(), 3);
        let timestamps: std::vec::Vec<_> = drain.drain_events().map(|e| e.timestamp).collect();
        assert_eq!(timestamps, [10, 30, 20]);
        assert_eq!(drain.drain_events().count(), 0);
    }

    #[test]
    fn overflow_drops_newest_and_counts() {
        let mut queue = EventQueue::<4>::new();
        let (mut poster, mut drain) = queue.split();
        for t in 0..5 {
            poster.post_event(EventKind::SlotTick, t);
        }
        assert_eq!(poster.overflow_count(), 2);
        assert_eq!(drain.overflow_count(), 2);
        let timestamps: std::vec::Vec<_> = drain.drain_events().map(|e| e.timestamp).collect();
        assert_eq!(timestamps, [0, 1, 2]);
        // room again after draining
        assert!(poster.post_event(EventKind::TxDone, 6));
        assert_eq!(
            drain.drain_events().next(),
            Some(Event {
                kind: EventKind::TxDone,
                timestamp: 6
            })
        );
    }
}
