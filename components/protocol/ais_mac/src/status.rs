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

use serde::Serialize;

use crate::*;

/// Diagnostic counters, they only ever count up
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Counters {
    /// Events lost because the event queue was full
    pub events_dropped: u32,
    /// Received frames lost because the RX queue was full
    pub frames_dropped: u32,
    pub received: u32,
    /// Received frames the application did not pick up in time
    pub received_overwritten: u32,
    pub transmitted: u32,
    /// Transmissions ended because TX done did not arrive in time
    pub tx_timeouts: u32,
    /// Transmissions postponed because the channel was not clear
    pub deferred_collisions: u32,
    /// Transmissions postponed because the radio was not idle
    pub radio_busy: u32,
    /// Carriers detected without a frame following within one slot
    pub rx_timeouts: u32,
    pub missed_slots: u32,
    /// Planned slots given up because another station announced them
    pub cancelled: u32,
    pub packets_dropped: u32,
    pub no_free_slot: u32,
    pub sync_lost: u32,
    pub reservations_evicted: u32,
}

/// Transmit switches as reported to the operator
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxStatus {
    pub hardware_switch_on: bool,
    pub software_switch_on: bool,
    pub station_provisioned: bool,
    /// All of the above and not turned off at runtime
    pub tx_allowed: bool,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StationStatus {
    pub station_id: Option<StationId>,
    pub state: &'static str,
    pub radio: RadioState,
    pub current_slot: Option<SlotIndex>,
    pub planned_slot: Option<SlotNumber>,
    pub free_packets: usize,
    pub ready_packets: usize,
    pub reservations: usize,
    /// Noise floor of channel A and B
    pub noise_floor: [Option<Rssi>; 2],
    pub counters: Counters,
}
