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

/// Main loop side of a transponder
///
/// ```ignore
/// static mut EVENTS: StationEventQueue = StationEventQueue::new();
/// static mut FRAMES: RxQueue = RxQueue::new();
///
/// let (poster, drain) = EVENTS.split();
/// let (producer, consumer) = FRAMES.split();
/// let irq = InterruptContext::new(poster, producer); // moved to the interrupt handlers
/// let mut station = Station::new(rfic, gps, config, encoder, drain, consumer);
/// station.init()?;
/// loop {
///     station.poll(&mut rng);
/// }
/// ```
pub struct Station<'a, R, G, C, E> {
    events: EventDrain<'a, EVENT_QUEUE_SIZE>,
    frames: QueueConsumer<'a, RxFrame, RX_QUEUE_SIZE>,
    scheduler: TxScheduler<R, G, C, E>,
}

impl<'a, R: Rfic, G: Gps, C: Configuration, E: ReportEncoder> Station<'a, R, G, C, E> {
    pub fn new(
        rfic: R,
        gps: G,
        config: C,
        encoder: E,
        events: EventDrain<'a, EVENT_QUEUE_SIZE>,
        frames: QueueConsumer<'a, RxFrame, RX_QUEUE_SIZE>,
    ) -> Self {
        Self {
            events,
            frames,
            scheduler: TxScheduler::new(rfic, gps, config, encoder),
        }
    }

    pub fn init(&mut self) -> Result<(), Error> {
        self.scheduler.init()
    }

    /// Handle all pending events, returns the number of events handled
    pub fn poll(&mut self, mut rng: impl RngCore) -> usize {
        let mut handled = 0;
        for event in self.events.drain_events() {
            self.scheduler.process(event, &mut self.frames, &mut rng);
            handled += 1;
        }
        handled
    }

    pub fn queue_transmission(
        &mut self,
        payload: &[u8],
        channel: Channel,
        priority: Priority,
        fixed_slot: Option<SlotIndex>,
    ) -> Result<(), Error> {
        self.scheduler
            .queue_transmission(payload, channel, priority, fixed_slot)
    }

    pub fn take_received(&mut self) -> Option<RxFrame> {
        self.scheduler.take_received()
    }

    pub fn set_tx_enabled(&mut self, enabled: bool) {
        self.scheduler.set_tx_enabled(enabled);
    }

    pub fn reconfigure(&mut self) {
        self.scheduler.reconfigure();
    }

    pub fn current_slot(&self) -> Result<SlotIndex, Error> {
        self.scheduler.current_slot()
    }

    pub fn tx_status(&self) -> TxStatus {
        self.scheduler.tx_status()
    }

    pub fn status(&self) -> StationStatus {
        let mut status = self.scheduler.status();
        status.counters.events_dropped = self.events.overflow_count();
        status.counters.frames_dropped = self.frames.dropped();
        status
    }

    pub fn scheduler(&self) -> &TxScheduler<R, G, C, E> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut TxScheduler<R, G, C, E> {
        &mut self.scheduler
    }
}
