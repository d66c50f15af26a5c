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

use core::mem;

use crate::*;

/// Transmit scheduler of one station
///
/// Owns the radio, the packet pool and the reservation map. All methods run in the station loop,
/// never in interrupt context.
pub struct TxScheduler<R, G, C, E> {
    pub(crate) id: Option<StationId>,
    pub(crate) state: State,
    pub(crate) context: Context<R>,
    pub(crate) gps: G,
    pub(crate) config: C,
    pub(crate) encoder: E,
}

impl<R: Rfic, G: Gps, C: Configuration, E: ReportEncoder> TxScheduler<R, G, C, E> {
    pub fn new(rfic: R, gps: G, config: C, encoder: E) -> Self {
        let mut scheduler = Self {
            id: None,
            state: State::default(),
            context: Context::new(rfic),
            gps,
            config,
            encoder,
        };
        scheduler.load_configuration();
        scheduler
    }

    /// Bring up the radio, transmissions start once frame sync is acquired
    pub fn init(&mut self) -> Result<(), Error> {
        self.load_configuration();
        self.context.channels.init();
        let receive_channel = self.context.channels.vhf(Channel::A);
        self.context.radio.init(receive_channel)
    }

    /// Re-read the configuration store
    ///
    /// Changed slot timing invalidates the frame sync, it is acquired again with the next PPS.
    pub fn reconfigure(&mut self) {
        let previous_tuning = self.context.tuning;
        self.load_configuration();
        if self.context.tuning != previous_tuning && self.context.sync.is_some() {
            info!("slot timing changed, waiting for next PPS");
            let state = mem::take(&mut self.state);
            self.state = self.lose_sync(state, 0);
        }
    }

    pub(crate) fn load_configuration(&mut self) {
        self.id = self.config.station_id();
        self.context.permission.enabled = self.config.is_tx_enabled();
        self.context.permission.hardware_disabled = self.config.is_tx_hardware_disabled();
        let tuning = self.config.tuning();
        self.context
            .noise
            .set_timing(tuning.guard_window_us, tuning.slot_duration_us());
        self.context.tuning = tuning;
        if self.id.is_none() {
            warn!("station not provisioned, transmitter disabled");
        }
    }

    /// Runtime transmit switch, independent of the configuration store
    pub fn set_tx_enabled(&mut self, enabled: bool) {
        info!("transmitter {}", if enabled { "enabled" } else { "disabled" });
        self.context.permission.override_enabled = enabled;
    }

    pub fn is_tx_allowed(&self) -> bool {
        let permission = self.context.permission;
        !permission.hardware_disabled
            && permission.enabled
            && permission.override_enabled
            && self.id.is_some()
    }

    pub fn tx_status(&self) -> TxStatus {
        let permission = self.context.permission;
        TxStatus {
            hardware_switch_on: !permission.hardware_disabled,
            software_switch_on: permission.enabled,
            station_provisioned: self.id.is_some(),
            tx_allowed: self.is_tx_allowed(),
        }
    }

    /// Queue a payload for transmission
    ///
    /// With `fixed_slot` the packet is sent in the next slot with that index, otherwise a free slot
    /// is selected. If the pool is exhausted the oldest packet of lower priority is dropped to
    /// make room.
    pub fn queue_transmission(
        &mut self,
        payload: &[u8],
        channel: Channel,
        priority: Priority,
        fixed_slot: Option<SlotIndex>,
    ) -> Result<(), Error> {
        if payload.len() > MAX_PAYLOAD_LEN {
            warn!("payload of {} bytes too long", payload.len());
            return Err(Error::ResourceExhausted);
        }
        let handle = match self.context.pool.acquire() {
            Some(handle) => handle,
            None => match self.evict_for(priority) {
                Some(handle) => handle,
                None => {
                    self.context.counters.packets_dropped += 1;
                    return Err(Error::ResourceExhausted);
                }
            },
        };
        let packet = self.context.pool.get_mut(&handle);
        // length checked above
        let _ = packet.payload.extend_from_slice(payload);
        packet.channel = channel;
        packet.priority = priority;
        packet.fixed_slot = fixed_slot;
        debug!("packet {} queued for channel {}", handle.index(), channel);
        if let Err(handle) = self.context.ready.push(handle) {
            self.context.drop_packet(handle);
            return Err(Error::ResourceExhausted);
        }
        Ok(())
    }

    /// Drop the oldest of the lowest priority packets below `priority` and take its buffer
    fn evict_for(&mut self, priority: Priority) -> Option<PacketHandle> {
        let (position, _) = self
            .context
            .ready
            .iter()
            .enumerate()
            .map(|(i, handle)| (i, self.context.pool.get(handle).priority))
            .filter(|(_, p)| *p < priority)
            .min_by_key(|(_, p)| *p)?;
        let victim = self.context.ready.remove(position);
        info!("packet pool exhausted, dropping packet {}", victim.index());
        self.context.drop_packet(victim);
        self.context.pool.acquire()
    }

    /// Encode and queue one of the station's own reports
    pub(crate) fn queue_report(&mut self, kind: ReportKind, channel: Channel, priority: Priority) {
        let Some(id) = self.id else {
            return;
        };
        if !self.is_tx_allowed() {
            return;
        }
        let mut payload = Payload::new();
        if !self.encoder.encode(kind, id, &mut payload) {
            debug!("report not available");
            return;
        }
        if let Err(error) = self.queue_transmission(&payload, channel, priority, None) {
            warn!("report not queued: {}", error);
        }
    }

    pub(crate) fn queue_due_reports(&mut self, utc_second: u64) {
        if !self.is_tx_allowed() {
            return;
        }
        for (kind, channel) in self.context.reports.due(utc_second) {
            self.queue_report(kind, channel, Priority::Normal);
        }
    }

    /// Handle one event
    pub(crate) fn process<const N: usize>(
        &mut self,
        event: Event,
        frames: &mut QueueConsumer<'_, RxFrame, N>,
        rng: &mut impl RngCore,
    ) {
        let state = mem::take(&mut self.state);
        let previous = state.state_as_string();
        let next_state = match self.next(state, event, frames, rng) {
            State::PendingTransmit { planned } => {
                event_log_state!(event.timestamp, self.log_id(), "PendingTransmit");
                self.clear_channel_assessment(planned, event.timestamp, rng)
            }
            next_state => next_state,
        };
        if next_state.state_as_string() != previous {
            event_log_state!(event.timestamp, self.log_id(), next_state.state_as_string());
        }
        self.state = next_state;
        self.context.counters.reservations_evicted = self.context.channels.evicted_count();
    }

    /// Slot index of the current slot, fails without frame sync
    pub fn current_slot(&self) -> Result<SlotIndex, Error> {
        match (self.context.sync, self.context.current_slot) {
            (Some(_), Some(slot)) => Ok(self.context.slot_index(slot)),
            _ => Err(Error::SyncLost),
        }
    }

    pub fn planned_slot(&self) -> Option<SlotNumber> {
        self.state.planned_slot()
    }

    /// Oldest received frame not yet picked up
    pub fn take_received(&mut self) -> Option<RxFrame> {
        self.context.received.pop_front()
    }

    pub fn status(&self) -> StationStatus {
        StationStatus {
            station_id: self.id,
            state: self.state.state_as_string(),
            radio: self.context.radio.state(),
            current_slot: self.current_slot().ok(),
            planned_slot: self.planned_slot(),
            free_packets: self.context.pool.free_count(),
            ready_packets: self.context.ready.len(),
            reservations: self.context.channels.reservation_count(),
            noise_floor: [
                self.context.noise.noise_floor(Channel::A),
                self.context.noise.noise_floor(Channel::B),
            ],
            counters: self.context.counters,
        }
    }

    pub fn channels(&self) -> &ChannelManager {
        &self.context.channels
    }

    pub fn channels_mut(&mut self) -> &mut ChannelManager {
        &mut self.context.channels
    }

    pub fn radio(&self) -> &RadioManager<R> {
        &self.context.radio
    }

    pub fn noise(&self) -> &NoiseFloorDetector {
        &self.context.noise
    }

    pub(crate) fn log_id(&self) -> StationId {
        self.id.unwrap_or(0)
    }
}
