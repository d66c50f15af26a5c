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

use serde::{Deserialize, Serialize};

const BASE_FREQUENCY_HZ: u32 = 161_500_000;
const CHANNEL_SPACING_HZ: u32 = 25_000;

/// Maritime VHF channels a transponder can be tuned to
///
/// Discriminants are the radio IC's channel ordinals, i.e. the 25 kHz steps above 161.500 MHz.
#[repr(u8)]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VhfChannel {
    Ch18 = 0,
    Ch78,
    Ch19,
    Ch79,
    Ch20,
    Ch80,
    Ch21,
    Ch81,
    Ch22,
    Ch82,
    Ch23,
    Ch83,
    Ch24,
    Ch84,
    Ch25,
    Ch85,
    Ch26,
    Ch86,
    Ch27,
    /// Default AIS channel A
    Ch87,
    Ch28,
    /// Default AIS channel B
    Ch88,
}

impl VhfChannel {
    const ALL: [VhfChannel; 22] = [
        VhfChannel::Ch18,
        VhfChannel::Ch78,
        VhfChannel::Ch19,
        VhfChannel::Ch79,
        VhfChannel::Ch20,
        VhfChannel::Ch80,
        VhfChannel::Ch21,
        VhfChannel::Ch81,
        VhfChannel::Ch22,
        VhfChannel::Ch82,
        VhfChannel::Ch23,
        VhfChannel::Ch83,
        VhfChannel::Ch24,
        VhfChannel::Ch84,
        VhfChannel::Ch25,
        VhfChannel::Ch85,
        VhfChannel::Ch26,
        VhfChannel::Ch86,
        VhfChannel::Ch27,
        VhfChannel::Ch87,
        VhfChannel::Ch28,
        VhfChannel::Ch88,
    ];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.get(ordinal as usize).copied()
    }

    /// ITU channel number
    pub fn itu(self) -> u8 {
        let ordinal = self.ordinal();
        if ordinal % 2 == 0 {
            18 + ordinal / 2
        } else {
            78 + ordinal / 2
        }
    }

    pub fn from_itu(itu: u8) -> Option<Self> {
        match itu {
            18..=28 => Self::from_ordinal((itu - 18) * 2),
            78..=88 => Self::from_ordinal((itu - 78) * 2 + 1),
            _ => None,
        }
    }

    pub fn frequency_hz(self) -> u32 {
        BASE_FREQUENCY_HZ + self.ordinal() as u32 * CHANNEL_SPACING_HZ
    }
}

impl core::fmt::Display for VhfChannel {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(fmt, "{}", self.itu())
    }
}
