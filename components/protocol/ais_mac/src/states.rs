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

/// Packet waiting for its slot
#[derive(Debug, PartialEq)]
pub(crate) struct PlannedTx {
    pub(crate) handle: PacketHandle,
    pub(crate) slot: SlotNumber,
    pub(crate) channel: Channel,
}

/// Scheduler state
///
/// A state owns the packet handle it is working on, a packet is therefore either in the ready
/// queue, in the state or on air.
#[derive(Debug, PartialEq, Default)]
pub(crate) enum State {
    #[default]
    WaitingForFrameSync,
    SlotIdle {
        planned: Option<PlannedTx>,
    },
    /// Planned slot has started, clear channel assessment is next
    PendingTransmit {
        planned: PlannedTx,
    },
    Transmitting {
        channel: Channel,
        slot: SlotNumber,
    },
}

impl State {
    pub(crate) fn planned_slot(&self) -> Option<SlotNumber> {
        match self {
            State::SlotIdle {
                planned: Some(planned),
            }
            | State::PendingTransmit { planned } => Some(planned.slot),
            _ => None,
        }
    }

    pub(crate) fn state_as_string(&self) -> &'static str {
        match self {
            State::WaitingForFrameSync => "WaitingForFrameSync",
            State::SlotIdle { .. } => "SlotIdle",
            State::PendingTransmit { .. } => "PendingTransmit",
            State::Transmitting { .. } => "Transmitting",
        }
    }
}

impl core::fmt::Display for State {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(fmt, "{}", self.state_as_string())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for State {
    fn format(&self, fmt: defmt::Formatter) {
        use defmt::write;
        write!(fmt, "{}", self.state_as_string())
    }
}
