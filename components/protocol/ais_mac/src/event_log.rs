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

//! Macros for generating parseable event log messages
//!
//! Lines start with `$` followed by `uptime;station;kind;content`, content is JSON.

use crate::*;

/// Content of an event log line
#[derive(Debug, Clone, Copy)]
pub(crate) enum LogContent {
    State(&'static str),
    Sync {
        synced: bool,
    },
    Transmit {
        channel: Channel,
        slot: SlotIndex,
    },
    Defer {
        channel: Channel,
        slot: SlotIndex,
        retries: u8,
    },
    Receive {
        source: StationId,
        channel: Channel,
        slot: SlotIndex,
    },
}

impl core::fmt::Display for LogContent {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LogContent::State(state) => write!(fmt, "\"{}\"", state),
            LogContent::Sync { synced } => write!(fmt, "{{\"synced\":{}}}", synced),
            LogContent::Transmit { channel, slot } => {
                write!(fmt, "{{\"channel\":\"{}\",\"slot\":{}}}", channel, slot)
            }
            LogContent::Defer {
                channel,
                slot,
                retries,
            } => write!(
                fmt,
                "{{\"channel\":\"{}\",\"slot\":{},\"retries\":{}}}",
                channel, slot, retries
            ),
            LogContent::Receive {
                source,
                channel,
                slot,
            } => write!(
                fmt,
                "{{\"source\":{},\"channel\":\"{}\",\"slot\":{}}}",
                source, channel, slot
            ),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for LogContent {
    fn format(&self, fmt: defmt::Formatter) {
        use defmt::write;
        match self {
            LogContent::State(state) => write!(fmt, "\"{}\"", state),
            LogContent::Sync { synced } => write!(fmt, "{{\"synced\":{}}}", synced),
            LogContent::Transmit { channel, slot } => {
                write!(fmt, "{{\"channel\":\"{}\",\"slot\":{}}}", channel, slot)
            }
            LogContent::Defer {
                channel,
                slot,
                retries,
            } => write!(
                fmt,
                "{{\"channel\":\"{}\",\"slot\":{},\"retries\":{}}}",
                channel,
                slot,
                retries
            ),
            LogContent::Receive {
                source,
                channel,
                slot,
            } => write!(
                fmt,
                "{{\"source\":{},\"channel\":\"{}\",\"slot\":{}}}",
                source,
                channel,
                slot
            ),
        }
    }
}

#[macro_export]
macro_rules! event_log {
    ($uptime:expr,$station:expr,$kind:expr,$content:expr) => {
        info!("${};{};{};{}", $uptime, $station, $kind, $content);
    };
}

#[macro_export]
macro_rules! event_log_state {
    ($uptime:expr,$station:expr,$new_state:expr) => {
        event_log!(
            $uptime,
            $station,
            "state",
            $crate::event_log::LogContent::State($new_state)
        );
    };
}

#[macro_export]
macro_rules! event_log_sync {
    ($uptime:expr,$station:expr,$synced:expr) => {
        event_log!(
            $uptime,
            $station,
            "sync",
            $crate::event_log::LogContent::Sync { synced: $synced }
        );
    };
}

#[macro_export]
macro_rules! event_log_tx {
    ($uptime:expr,$station:expr,$channel:expr,$slot:expr) => {
        event_log!(
            $uptime,
            $station,
            "transmit",
            $crate::event_log::LogContent::Transmit {
                channel: $channel,
                slot: $slot,
            }
        );
    };
}

#[macro_export]
macro_rules! event_log_defer {
    ($uptime:expr,$station:expr,$channel:expr,$slot:expr,$retries:expr) => {
        event_log!(
            $uptime,
            $station,
            "defer",
            $crate::event_log::LogContent::Defer {
                channel: $channel,
                slot: $slot,
                retries: $retries,
            }
        );
    };
}

#[macro_export]
macro_rules! event_log_rx {
    ($uptime:expr,$station:expr,$source:expr,$channel:expr,$slot:expr) => {
        event_log!(
            $uptime,
            $station,
            "receive",
            $crate::event_log::LogContent::Receive {
                source: $source,
                channel: $channel,
                slot: $slot,
            }
        );
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_json() {
        assert_eq!(format!("{}", LogContent::State("SlotIdle")), "\"SlotIdle\"");
        assert_eq!(
            format!("{}", LogContent::Sync { synced: false }),
            "{\"synced\":false}"
        );
        assert_eq!(
            format!(
                "{}",
                LogContent::Defer {
                    channel: Channel::B,
                    slot: 42,
                    retries: 2,
                }
            ),
            "{\"channel\":\"B\",\"slot\":42,\"retries\":2}"
        );
        assert_eq!(
            format!(
                "{}",
                LogContent::Receive {
                    source: 7,
                    channel: Channel::A,
                    slot: 1,
                }
            ),
            "{\"source\":7,\"channel\":\"A\",\"slot\":1}"
        );
    }
}
