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

use core::cmp::Ordering;

use crate::*;

impl<R: Rfic, G: Gps, C: Configuration, E: ReportEncoder> TxScheduler<R, G, C, E> {
    /// Get next state
    ///
    /// Events that do not concern the current state leave it unchanged.
    #[must_use]
    pub(crate) fn next<const N: usize>(
        &mut self,
        state: State,
        event: Event,
        frames: &mut QueueConsumer<'_, RxFrame, N>,
        rng: &mut impl RngCore,
    ) -> State {
        let time = event.timestamp;
        if let EventKind::SlotTick = event.kind {
            self.supervise_reception(time);
        }
        match (state, event.kind) {
            (state, EventKind::GpsSecond) => self.synchronise(state, time),

            (State::WaitingForFrameSync, EventKind::SlotTick) => State::WaitingForFrameSync,
            (transmitting @ State::Transmitting { .. }, EventKind::SlotTick) => {
                self.supervise_transmission(transmitting, time)
            }
            (state, EventKind::SlotTick) if self.is_sync_stale(time) => self.lose_sync(state, time),
            (State::SlotIdle { planned: None }, EventKind::SlotTick) => {
                self.update_slot(time);
                self.plan(time, rng)
            }
            (
                State::SlotIdle {
                    planned: Some(planned),
                },
                EventKind::SlotTick,
            ) => {
                self.update_slot(time);
                self.approach(planned, time, rng)
            }
            // assessed right after this returns
            (State::PendingTransmit { planned }, EventKind::SlotTick) => {
                State::PendingTransmit { planned }
            }

            (state, EventKind::TxDone) => self.finish_transmission(state),
            (state, EventKind::PacketReceived) => self.receive(state, frames, time, rng),
            (state, EventKind::CarrierDetected) => {
                if let Err(error) = self.context.radio.on_carrier_detected(time) {
                    debug!("carrier ignored: {}", error);
                }
                state
            }
            (state, EventKind::RadioReady) => {
                self.context.radio.on_ready();
                state
            }
            (state, EventKind::PositionFix { speed_dkn }) => {
                self.context.reports.update_speed(speed_dkn);
                state
            }
            (state, EventKind::Interrogation { report, channel }) => {
                info!("interrogated on channel {}", channel);
                self.queue_report(report, channel, Priority::High);
                state
            }
        }
    }

    /// Renew the frame sync from a PPS
    fn synchronise(&mut self, state: State, time: TimeUs) -> State {
        if !self.gps.has_fix() {
            return if self.context.sync.is_some() {
                warn!("GPS fix lost");
                self.lose_sync(state, time)
            } else {
                state
            };
        }
        let utc_second = self.gps.current_utc_second();
        let sync = FrameSync::from_pps(time, utc_second, &self.context.tuning);
        match self.context.sync {
            None => {
                info!("frame sync acquired at UTC second {}", utc_second);
                event_log_sync!(time, self.log_id(), true);
                self.context.channels.init();
            }
            Some(previous) if sync.frame_number < previous.frame_number => {
                warn!("UTC went backwards, reservations dropped");
                self.context.channels.init();
            }
            Some(previous) => {
                let frames_crossed = sync.frame_number - previous.frame_number;
                if frames_crossed > u8::MAX as u64 {
                    self.context.channels.init();
                } else {
                    for _ in 0..frames_crossed {
                        self.context.channels.rollover_frame();
                    }
                }
            }
        }
        self.context.sync = Some(sync);
        self.queue_due_reports(utc_second);
        match state {
            State::WaitingForFrameSync => State::SlotIdle { planned: None },
            state => state,
        }
    }

    pub(crate) fn lose_sync(&mut self, state: State, time: TimeUs) -> State {
        self.context.counters.sync_lost += 1;
        warn!("frame sync lost");
        event_log_sync!(time, self.log_id(), false);
        self.context.sync = None;
        self.context.current_slot = None;
        self.context.noise.reset();
        match state {
            // the transmission in progress is completed
            transmitting @ State::Transmitting { .. } => transmitting,
            State::SlotIdle {
                planned: Some(planned),
            }
            | State::PendingTransmit { planned } => {
                self.unplan(planned);
                State::WaitingForFrameSync
            }
            _ => State::WaitingForFrameSync,
        }
    }

    fn is_sync_stale(&self, time: TimeUs) -> bool {
        self.context
            .sync
            .is_some_and(|sync| sync.is_stale(time, self.context.tuning.sync_timeout_s))
    }

    fn update_slot(&mut self, time: TimeUs) {
        self.context.current_slot = self.context.sync.map(|sync| sync.slot_at(time));
    }

    fn idle_state(&self) -> State {
        if self.context.sync.is_some() {
            State::SlotIdle { planned: None }
        } else {
            State::WaitingForFrameSync
        }
    }

    /// Take the oldest ready packet and give it a slot
    ///
    /// The channel is sampled from here on until the slot is reached.
    fn plan(&mut self, time: TimeUs, rng: &mut impl RngCore) -> State {
        if self.context.ready.is_empty()
            || !self.is_tx_allowed()
            || !self.context.radio.is_operational()
        {
            return State::SlotIdle { planned: None };
        }
        let handle = self.context.ready.remove(0);
        let packet = self.context.pool.get(&handle);
        let (channel, fixed_slot) = (packet.channel, packet.fixed_slot);
        self.context.sample_noise(channel, time);
        self.assign_slot(handle, channel, fixed_slot, rng)
    }

    fn assign_slot(
        &mut self,
        handle: PacketHandle,
        channel: Channel,
        fixed_slot: Option<SlotIndex>,
        rng: &mut impl RngCore,
    ) -> State {
        match self.select_slot(channel, fixed_slot, rng) {
            Some(slot) => {
                let index = self.context.slot_index(slot);
                let ttl = self.context.tuning.reservation_timeout.max(1);
                self.context.channels.reserve_self(channel, index, ttl);
                self.context.pool.get_mut(&handle).slot = Some(slot);
                debug!(
                    "packet {} planned for slot {} on channel {}",
                    handle.index(),
                    index,
                    channel
                );
                State::SlotIdle {
                    planned: Some(PlannedTx {
                        handle,
                        slot,
                        channel,
                    }),
                }
            }
            None => {
                self.context.counters.no_free_slot += 1;
                warn!("no free slot on channel {}", channel);
                self.context.requeue_front(handle);
                State::SlotIdle { planned: None }
            }
        }
    }

    /// Fixed slot, else a slot already reserved for this station, else a random free one
    fn select_slot(
        &self,
        channel: Channel,
        fixed_slot: Option<SlotIndex>,
        rng: &mut impl RngCore,
    ) -> Option<SlotNumber> {
        let current = self.context.current_slot?;
        let tuning = self.context.tuning;
        let earliest = current + tuning.min_slot_offset.max(1) as SlotNumber;
        if let Some(index) = fixed_slot {
            return Some(next_occurrence(earliest, index, tuning.slots_per_frame));
        }
        let candidates = earliest
            ..earliest + tuning.selection_interval.min(tuning.slots_per_frame).max(1) as SlotNumber;
        let channels = &self.context.channels;
        channels
            .self_assigned_in(channel, candidates.clone(), tuning.slots_per_frame)
            .or_else(|| channels.select_free(channel, candidates, tuning.slots_per_frame, rng))
    }

    /// Give up the planned slot and plan the packet again, ignoring a fixed slot
    fn replan(&mut self, planned: PlannedTx, rng: &mut impl RngCore) -> State {
        let index = self.context.slot_index(planned.slot);
        self.context.channels.release_self(planned.channel, index);
        self.assign_slot(planned.handle, planned.channel, None, rng)
    }

    /// Give up the planned slot and put the packet back into the ready queue
    fn unplan(&mut self, planned: PlannedTx) {
        let index = self.context.slot_index(planned.slot);
        self.context.channels.release_self(planned.channel, index);
        self.context.pool.get_mut(&planned.handle).slot = None;
        self.context.requeue_front(planned.handle);
    }

    /// Sample the channel while waiting for the planned slot
    fn approach(&mut self, planned: PlannedTx, time: TimeUs, rng: &mut impl RngCore) -> State {
        if !self.is_tx_allowed() || !self.context.radio.is_operational() {
            info!("transmission not allowed, packet {} waits", planned.handle.index());
            self.unplan(planned);
            return State::SlotIdle { planned: None };
        }
        self.context.sample_noise(planned.channel, time);
        let Some(current) = self.context.current_slot else {
            self.unplan(planned);
            return self.idle_state();
        };
        match current.cmp(&planned.slot) {
            Ordering::Less => State::SlotIdle {
                planned: Some(planned),
            },
            Ordering::Equal => State::PendingTransmit { planned },
            Ordering::Greater => {
                self.context.counters.missed_slots += 1;
                warn!("missed slot {}", self.context.slot_index(planned.slot));
                self.replan(planned, rng)
            }
        }
    }

    /// Transmit if the channel was clear during the guard window, defer otherwise
    pub(crate) fn clear_channel_assessment(
        &mut self,
        planned: PlannedTx,
        time: TimeUs,
        rng: &mut impl RngCore,
    ) -> State {
        let tuning = self.context.tuning;
        if !self.context.noise.is_clear(planned.channel, tuning.rssi_threshold) {
            self.context.counters.deferred_collisions += 1;
            let packet = self.context.pool.get_mut(&planned.handle);
            packet.retries = packet.retries.saturating_add(1);
            let retries = packet.retries;
            event_log_defer!(
                time,
                self.log_id(),
                planned.channel,
                self.context.slot_index(planned.slot),
                retries
            );
            if retries > tuning.max_retries {
                warn!("channel {} stays busy, packet dropped", planned.channel);
                let index = self.context.slot_index(planned.slot);
                self.context.channels.release_self(planned.channel, index);
                self.context.drop_packet(planned.handle);
                return State::SlotIdle { planned: None };
            }
            return self.replan(planned, rng);
        }

        let PlannedTx {
            handle,
            slot,
            channel,
        } = planned;
        let vhf = self.context.channels.vhf(channel);
        let packet = self.context.pool.get(&handle);
        match self
            .context
            .radio
            .transmit(handle, packet, vhf, tuning.reservation_timeout, time)
        {
            Ok(()) => {
                event_log_tx!(time, self.log_id(), channel, self.context.slot_index(slot));
                State::Transmitting { channel, slot }
            }
            Err((Error::Busy, handle)) => {
                self.context.counters.radio_busy += 1;
                debug!("radio busy in slot {}", self.context.slot_index(slot));
                self.replan(
                    PlannedTx {
                        handle,
                        slot,
                        channel,
                    },
                    rng,
                )
            }
            Err((error, handle)) => {
                error!("transmission failed: {}", error);
                self.unplan(PlannedTx {
                    handle,
                    slot,
                    channel,
                });
                State::SlotIdle { planned: None }
            }
        }
    }

    fn supervise_transmission(&mut self, state: State, time: TimeUs) -> State {
        if let Some(handle) = self.context.radio.check_tx_timeout(time) {
            if self.context.radio.is_operational() {
                self.context.counters.tx_timeouts += 1;
                self.context.release(handle);
            } else {
                self.context.drop_packet(handle);
            }
            return self.idle_state();
        }
        if self.is_sync_stale(time) {
            return self.lose_sync(state, time);
        }
        state
    }

    /// Return to idle if a detected carrier never produced a frame
    fn supervise_reception(&mut self, time: TimeUs) {
        let slot_duration = self.context.tuning.slot_duration_us();
        if self.context.radio.check_rx_timeout(time, slot_duration) {
            self.context.counters.rx_timeouts += 1;
        }
    }

    fn finish_transmission(&mut self, state: State) -> State {
        if let Some(handle) = self.context.radio.on_tx_done() {
            self.context.counters.transmitted += 1;
            self.context.release(handle);
        }
        match state {
            State::Transmitting { .. } => self.idle_state(),
            state => state,
        }
    }

    /// Record reservations announced in received frames and hand the frames to the application
    fn receive<const N: usize>(
        &mut self,
        state: State,
        frames: &mut QueueConsumer<'_, RxFrame, N>,
        time: TimeUs,
        rng: &mut impl RngCore,
    ) -> State {
        if let Err(error) = self.context.radio.on_rx_done() {
            debug!("RX done ignored: {}", error);
        }
        let mut state = state;
        while let Some(frame) = frames.try_pop() {
            self.context.counters.received += 1;
            if let Some(sync) = self.context.sync {
                let index = sync.index(sync.slot_at(frame.received_at));
                event_log_rx!(time, self.log_id(), frame.source, frame.channel, index);
                if frame.slot_timeout > 0 {
                    self.context.channels.mark_reserved(
                        frame.channel,
                        index,
                        frame.source,
                        frame.slot_timeout,
                    );
                    state = self.resolve_conflict(state, frame.channel, index, rng);
                }
            }
            if self.context.received.is_full() {
                self.context.received.pop_front();
                self.context.counters.received_overwritten += 1;
            }
            // room was made above
            let _ = self.context.received.push_back(frame);
        }
        state
    }

    /// Cancel the planned transmission if another station announced the same slot
    fn resolve_conflict(
        &mut self,
        state: State,
        channel: Channel,
        index: SlotIndex,
        rng: &mut impl RngCore,
    ) -> State {
        match state {
            State::SlotIdle {
                planned: Some(planned),
            } if planned.channel == channel && self.context.slot_index(planned.slot) == index => {
                self.context.counters.cancelled += 1;
                info!("slot {} on channel {} taken, replanning", index, channel);
                self.replan(planned, rng)
            }
            state => state,
        }
    }
}
