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

//! Slotted medium access for an AIS transponder
//!
//! Interrupt handlers feed timestamped events and received frames into lock-free queues through an
//! [`InterruptContext`]. The [`Station`] drains them in its main loop, keeps the slot timing
//! synchronised to GPS, tracks slot reservations of other stations and keys the transmitter only
//! in its own slot and only after a clear channel assessment.

#![cfg_attr(not(test), no_std)]

use rand_core::RngCore;

use transponder_api::*;

mod channel_manager;
mod circular_queue;
mod context;
mod error;
mod event_log;
mod event_queue;
mod interrupts;
mod noise_floor;
mod packet_pool;
mod radio_manager;
mod reports;
mod scheduler;
mod slot_clock;
mod state_machine;
mod states;
mod station;
mod status;

#[cfg(test)]
mod mock;

use crate::context::*;
use crate::reports::*;
use crate::slot_clock::*;
use crate::states::*;

pub use crate::{
    channel_manager::{Channel, ChannelManager, SlotState},
    circular_queue::{CircularQueue, QueueConsumer, QueueProducer},
    error::Error,
    event_queue::{Drain, Event, EventDrain, EventKind, EventPoster, EventQueue},
    interrupts::{InterruptContext, RxFrame},
    noise_floor::{NoiseFloorDetector, NoiseSample},
    packet_pool::{PacketHandle, PacketPool, Priority, TxPacket},
    radio_manager::{RadioManager, RadioState},
    scheduler::TxScheduler,
    slot_clock::SlotNumber,
    station::Station,
    status::{Counters, StationStatus, TxStatus},
};

#[cfg(feature = "defmt")]
#[allow(unused_imports)]
use defmt::{debug, error, info, warn};

#[cfg(not(feature = "defmt"))]
#[allow(unused_imports)]
use log::{debug, error, info, warn};

/// Number of transmit buffers
pub const PACKET_POOL_SIZE: usize = 8;
/// Storage of the event queue, holds one event less
pub const EVENT_QUEUE_SIZE: usize = 32;
/// Storage of the received frame queue, holds one frame less
pub const RX_QUEUE_SIZE: usize = 8;
/// Received frames kept for the application
const RECEIVED_BUFFER_SIZE: usize = 16;
/// RSSI samples kept per channel
const NOISE_HISTORY_LEN: usize = 16;
/// Number of samples averaged to smooth out spikes
const NOISE_AVERAGE_LEN: usize = 4;
/// Slot reservations tracked for both channels together
const MAX_RESERVATIONS: usize = 256;
/// An AIS transmission lasts one slot, a missing TX done after this long indicates a radio fault
const TX_DONE_TIMEOUT_US: TimeUs = 150_000;

pub type StationEventQueue = EventQueue<EVENT_QUEUE_SIZE>;
pub type RxQueue = CircularQueue<RxFrame, RX_QUEUE_SIZE>;
