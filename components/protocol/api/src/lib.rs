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

//! Contracts between the AIS medium access core and the rest of the transponder
//!
//! The core only ever talks to the radio IC, the GPS receiver and the configuration store through
//! the traits in this crate.

#![cfg_attr(not(test), no_std)]

use serde::{Deserialize, Serialize};

mod channels;

pub use crate::channels::VhfChannel;

/// Monotonic time in microseconds since start
pub type TimeUs = u64;
/// Station identifier (MMSI)
pub type StationId = u32;
/// Received signal strength in dBm
pub type Rssi = i16;
/// Slot index within a frame
pub type SlotIndex = u16;

pub const MAX_PAYLOAD_LEN: usize = 64;
pub type Payload = heapless::Vec<u8, MAX_PAYLOAD_LEN>;

pub const US_PER_S: TimeUs = 1_000_000;

/// Modulation profile the radio IC is configured with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioProfile {
    /// GMSK, 9600 bit/s, 25 kHz channel spacing
    Ais,
}

/// A frame handed to the radio for transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxFrame<'a> {
    pub channel: VhfChannel,
    pub payload: &'a [u8],
    /// Number of frames the sender keeps using the slot, announced to other stations
    pub slot_timeout: u8,
}

/// Radio transceiver IC
///
/// Transmit and receive are asynchronous: completion is signalled through interrupts which the
/// firmware turns into events for the scheduler.
pub trait Rfic {
    type Error;

    fn configure(&mut self, profile: RadioProfile) -> Result<(), Self::Error>;

    /// Key the transmitter
    fn start_transmit(&mut self, frame: TxFrame<'_>) -> Result<(), Self::Error>;

    fn start_receive(&mut self, channel: VhfChannel) -> Result<(), Self::Error>;

    fn read_rssi(&mut self, channel: VhfChannel) -> Rssi;

    fn is_responsive(&mut self) -> bool;
}

/// Time reference
pub trait Gps {
    fn current_utc_second(&self) -> u64;

    fn has_fix(&self) -> bool;
}

/// Station configuration store
///
/// Read once at initialisation and again on explicit reconfiguration.
pub trait Configuration {
    /// Station identity, `None` if not provisioned
    fn station_id(&self) -> Option<StationId>;

    /// Software transmit switch
    fn is_tx_enabled(&self) -> bool;

    /// Hardware transmit switch
    fn is_tx_hardware_disabled(&self) -> bool {
        false
    }

    fn tuning(&self) -> Tuning;
}

/// Periodic reports a station sends on its own
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportKind {
    /// Position report (message 18)
    Position,
    /// Static data report part A (message 24A)
    StaticDataA,
    /// Static data report part B (message 24B)
    StaticDataB,
}

/// Produces the payload bytes of a report
pub trait ReportEncoder {
    /// Returns false if the report cannot be produced (e.g. missing station data)
    fn encode(&mut self, kind: ReportKind, station: StationId, payload: &mut Payload) -> bool;
}

/// Medium access tuning parameters
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tuning {
    /// Number of slots per frame and channel
    pub slots_per_frame: u16,
    /// Frame length in seconds, frames start at UTC seconds divisible by this value
    pub frame_seconds: u16,
    /// The channel must be clear for this long before the transmitter is keyed
    pub guard_window_us: u32,
    /// Clear channel threshold in dBm
    pub rssi_threshold: Rssi,
    /// Number of candidate slots considered when selecting a slot
    pub selection_interval: u16,
    /// Minimum distance in slots between the current slot and a newly selected slot
    pub min_slot_offset: u16,
    /// Clear channel assessment failures after which a packet is discarded
    pub max_retries: u8,
    /// Number of frames a slot stays reserved without being announced again
    pub reservation_timeout: u8,
    /// Frame synchronisation is lost if no PPS was seen for this long
    pub sync_timeout_s: u8,
}

impl Tuning {
    pub fn frame_duration_us(&self) -> TimeUs {
        self.frame_seconds as TimeUs * US_PER_S
    }

    /// Length of one slot, rounded down
    pub fn slot_duration_us(&self) -> TimeUs {
        self.frame_duration_us() / self.slots_per_frame.max(1) as TimeUs
    }
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            slots_per_frame: 2250,
            frame_seconds: 60,
            guard_window_us: 60_000,
            rssi_threshold: -100,
            selection_interval: 150,
            min_slot_offset: 2,
            max_retries: 3,
            reservation_timeout: 5,
            sync_timeout_s: 3,
        }
    }
}
