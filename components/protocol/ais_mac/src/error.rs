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

use core::fmt::Display;

/// Medium access errors
///
/// `Busy` and `ResourceExhausted` are transient and retried on the next scheduling cycle.
/// `ConfigError` is permanent for the radio instance. `SyncLost` lasts until the GPS fix is back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Pool or queue full
    ResourceExhausted,
    /// Radio not in the state required for the operation
    Busy,
    /// Radio IC failed to initialise or stopped responding
    ConfigError,
    /// No valid time reference
    SyncLost,
    /// Packet handle released twice or not owned by the pool
    InvalidHandle,
}

impl Display for Error {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let description = match self {
            Error::ResourceExhausted => "resource exhausted",
            Error::Busy => "radio busy",
            Error::ConfigError => "radio configuration error",
            Error::SyncLost => "frame synchronisation lost",
            Error::InvalidHandle => "invalid packet handle",
        };
        write!(fmt, "{}", description)
    }
}
