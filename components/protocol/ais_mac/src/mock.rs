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

//! Test doubles for the hardware and configuration traits

use crate::*;

pub(crate) const STATION_ID: StationId = 244_000_001;
/// Slot length with [`test_tuning`]
pub(crate) const SLOT_US: TimeUs = 100_000;

/// Ten 100ms slots per one second frame
pub(crate) fn test_tuning() -> Tuning {
    Tuning {
        slots_per_frame: 10,
        frame_seconds: 1,
        guard_window_us: 250_000,
        rssi_threshold: -100,
        selection_interval: 5,
        min_slot_offset: 2,
        max_retries: 2,
        reservation_timeout: 3,
        sync_timeout_s: 3,
    }
}

#[derive(Debug)]
pub(crate) struct MockRfic {
    pub(crate) transmissions: std::vec::Vec<(VhfChannel, std::vec::Vec<u8>, u8)>,
    pub(crate) receiving: Option<VhfChannel>,
    pub(crate) rssi: Rssi,
    pub(crate) responsive: bool,
    pub(crate) configure_fails: bool,
}

impl Default for MockRfic {
    fn default() -> Self {
        Self {
            transmissions: std::vec::Vec::new(),
            receiving: None,
            rssi: -120,
            responsive: true,
            configure_fails: false,
        }
    }
}

impl Rfic for MockRfic {
    type Error = ();

    fn configure(&mut self, _profile: RadioProfile) -> Result<(), Self::Error> {
        if self.configure_fails {
            Err(())
        } else {
            Ok(())
        }
    }

    fn start_transmit(&mut self, frame: TxFrame<'_>) -> Result<(), Self::Error> {
        self.transmissions
            .push((frame.channel, frame.payload.to_vec(), frame.slot_timeout));
        self.receiving = None;
        Ok(())
    }

    fn start_receive(&mut self, channel: VhfChannel) -> Result<(), Self::Error> {
        self.receiving = Some(channel);
        Ok(())
    }

    fn read_rssi(&mut self, _channel: VhfChannel) -> Rssi {
        self.rssi
    }

    fn is_responsive(&mut self) -> bool {
        self.responsive
    }
}

#[derive(Debug)]
pub(crate) struct MockGps {
    pub(crate) utc_second: u64,
    pub(crate) fix: bool,
}

impl Default for MockGps {
    fn default() -> Self {
        Self {
            utc_second: 100,
            fix: true,
        }
    }
}

impl Gps for MockGps {
    fn current_utc_second(&self) -> u64 {
        self.utc_second
    }

    fn has_fix(&self) -> bool {
        self.fix
    }
}

#[derive(Debug)]
pub(crate) struct MockConfig {
    pub(crate) station_id: Option<StationId>,
    pub(crate) tx_enabled: bool,
    pub(crate) tx_hardware_disabled: bool,
    pub(crate) tuning: Tuning,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            station_id: Some(STATION_ID),
            tx_enabled: true,
            tx_hardware_disabled: false,
            tuning: test_tuning(),
        }
    }
}

impl Configuration for MockConfig {
    fn station_id(&self) -> Option<StationId> {
        self.station_id
    }

    fn is_tx_enabled(&self) -> bool {
        self.tx_enabled
    }

    fn is_tx_hardware_disabled(&self) -> bool {
        self.tx_hardware_disabled
    }

    fn tuning(&self) -> Tuning {
        self.tuning
    }
}

/// Encodes a report as its kind followed by the station id
#[derive(Debug, Default)]
pub(crate) struct MockEncoder {
    pub(crate) encoded: std::vec::Vec<ReportKind>,
}

impl ReportEncoder for MockEncoder {
    fn encode(&mut self, kind: ReportKind, station: StationId, payload: &mut Payload) -> bool {
        self.encoded.push(kind);
        let kind = match kind {
            ReportKind::Position => 18,
            ReportKind::StaticDataA => 24,
            ReportKind::StaticDataB => 25,
        };
        payload.push(kind).is_ok() && payload.extend_from_slice(&station.to_be_bytes()).is_ok()
    }
}
