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

//! Timing of the autonomous position and static data reports

use heapless::Vec;

use crate::*;

const POSITION_INTERVAL_SLOW_S: u64 = 180;
const POSITION_INTERVAL_FAST_S: u64 = 30;
const STATIC_DATA_INTERVAL_S: u64 = 360;
/// 2 knots
const SLOW_SPEED_DKN: f32 = 20.0;
const SPEED_SMOOTHING: f32 = 0.2;

pub(crate) type DueReports = Vec<(ReportKind, Channel), 3>;

#[derive(Debug)]
pub(crate) struct ReportTimer {
    /// UTC second of the last position report, `None` until the first UTC second was seen
    last_position: Option<u64>,
    last_static_data: Option<u64>,
    /// Exponential moving average of the speed over ground in 0.1 knots
    average_speed_dkn: f32,
    position_channel: Channel,
    static_data_channel: Channel,
}

impl ReportTimer {
    pub(crate) fn new() -> Self {
        Self {
            last_position: None,
            last_static_data: None,
            average_speed_dkn: 0.0,
            position_channel: Channel::A,
            static_data_channel: Channel::A,
        }
    }

    pub(crate) fn update_speed(&mut self, speed_dkn: u16) {
        self.average_speed_dkn =
            self.average_speed_dkn * (1.0 - SPEED_SMOOTHING) + speed_dkn as f32 * SPEED_SMOOTHING;
    }

    pub(crate) fn position_interval(&self) -> u64 {
        if self.average_speed_dkn < SLOW_SPEED_DKN {
            POSITION_INTERVAL_SLOW_S
        } else {
            POSITION_INTERVAL_FAST_S
        }
    }

    /// Reports due at the given UTC second and the channel to send each on
    ///
    /// The first call starts both timers half an interval in the past, spreading the first reports
    /// of stations that are switched on together.
    pub(crate) fn due(&mut self, utc_second: u64) -> DueReports {
        let mut due = DueReports::new();
        let last_position = *self
            .last_position
            .get_or_insert(utc_second.saturating_sub(POSITION_INTERVAL_SLOW_S / 2));
        let last_static_data = *self
            .last_static_data
            .get_or_insert(utc_second.saturating_sub(STATIC_DATA_INTERVAL_S / 2));

        if utc_second.saturating_sub(last_position) > self.position_interval() {
            let _ = due.push((ReportKind::Position, self.position_channel));
            self.position_channel = self.position_channel.other();
            self.last_position = Some(utc_second);
        }
        if utc_second.saturating_sub(last_static_data) > STATIC_DATA_INTERVAL_S {
            let _ = due.push((ReportKind::StaticDataA, self.static_data_channel));
            let _ = due.push((ReportKind::StaticDataB, self.static_data_channel));
            self.static_data_channel = self.static_data_channel.other();
            self.last_static_data = Some(utc_second);
        }
        due
    }
}
