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

use heapless::{Deque, Vec};

use crate::*;

/// Transmit switches, all of them must allow transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TxPermission {
    pub(crate) hardware_disabled: bool,
    /// Software switch of the configuration store
    pub(crate) enabled: bool,
    /// Runtime switch of the application
    pub(crate) override_enabled: bool,
}

/// Everything the scheduler keeps between events
pub(crate) struct Context<R> {
    pub(crate) pool: PacketPool<PACKET_POOL_SIZE>,
    /// Packets waiting to be planned, oldest first
    pub(crate) ready: Vec<PacketHandle, PACKET_POOL_SIZE>,
    pub(crate) channels: ChannelManager,
    pub(crate) noise: NoiseFloorDetector,
    pub(crate) radio: RadioManager<R>,
    pub(crate) sync: Option<FrameSync>,
    pub(crate) current_slot: Option<SlotNumber>,
    pub(crate) reports: ReportTimer,
    pub(crate) tuning: Tuning,
    pub(crate) permission: TxPermission,
    pub(crate) counters: Counters,
    pub(crate) received: Deque<RxFrame, RECEIVED_BUFFER_SIZE>,
}

impl<R: Rfic> Context<R> {
    pub(crate) fn new(rfic: R) -> Self {
        let tuning = Tuning::default();
        Self {
            pool: PacketPool::new(),
            ready: Vec::new(),
            channels: ChannelManager::new(),
            noise: NoiseFloorDetector::new(tuning.guard_window_us, tuning.slot_duration_us()),
            radio: RadioManager::new(rfic),
            sync: None,
            current_slot: None,
            reports: ReportTimer::new(),
            tuning,
            permission: TxPermission {
                hardware_disabled: false,
                enabled: false,
                override_enabled: true,
            },
            counters: Counters::default(),
            received: Deque::new(),
        }
    }

    pub(crate) fn slot_index(&self, slot: SlotNumber) -> SlotIndex {
        slot_index(slot, self.tuning.slots_per_frame)
    }

    /// Put a packet back at the head of the ready queue
    pub(crate) fn requeue_front(&mut self, handle: PacketHandle) {
        if let Err(handle) = self.ready.insert(0, handle) {
            // every live handle has room in the ready queue, this is a bookkeeping error
            error!("ready queue full, dropping packet {}", handle.index());
            self.drop_packet(handle);
        }
    }

    /// Discard a packet that will not be sent
    pub(crate) fn drop_packet(&mut self, handle: PacketHandle) {
        self.counters.packets_dropped += 1;
        self.release(handle);
    }

    pub(crate) fn release(&mut self, handle: PacketHandle) {
        if let Err(error) = self.pool.release(handle) {
            error!("releasing packet failed: {}", error);
        }
    }

    /// Sample the RSSI of a channel into the noise floor history
    pub(crate) fn sample_noise(&mut self, channel: Channel, now: TimeUs) {
        let vhf = self.channels.vhf(channel);
        if let Err(error) = self.noise.sample(&mut self.radio, channel, vhf, now) {
            debug!("no RSSI sample on channel {}: {}", channel, error);
        }
    }
}
