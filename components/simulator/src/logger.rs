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

//! Prints log messages but also extracts medium access events and writes them to a file

use log::{Level, Metadata, Record, SetLoggerError};
use std::{io, sync::Mutex};

use event_log_writer::{EventFileWriter, EVENT_INDICATOR_CHAR};

const LOG_COLOR_CODE_DEFAULT: &str = "\x1B[0m";
const LOG_COLOR_CODE_RED: &str = "\x1B[1;31m";
const LOG_COLOR_CODE_GREEN: &str = "\x1B[1;32m";
const LOG_COLOR_CODE_YELLOW: &str = "\x1B[1;33m";
const LOG_COLOR_CODE_BLUE: &str = "\x1B[1;34m";

pub struct SimLogger {
    max_level: Level,
    /// Print non-event messages to stdout
    verbose: bool,
    event_writer: Option<Mutex<EventFileWriter>>,
}

impl log::Log for SimLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let msg = record.args().to_string();

        if msg.starts_with(EVENT_INDICATOR_CHAR) {
            if let Some(writer) = self.event_writer.as_ref() {
                let result = match writer.lock() {
                    Ok(mut writer) => writer.write_event(&msg),
                    Err(_) => return,
                };
                if let Err(error) = result {
                    eprintln!("could not write event: {error}");
                }
            }
            if !self.verbose {
                return;
            }
        } else if !self.verbose && record.level() > Level::Warn {
            return;
        }

        let color = match record.level() {
            Level::Error => LOG_COLOR_CODE_RED,
            Level::Warn => LOG_COLOR_CODE_YELLOW,
            Level::Info => LOG_COLOR_CODE_GREEN,
            Level::Debug => LOG_COLOR_CODE_BLUE,
            Level::Trace => "",
        };

        println!(
            "[{}] {}{}{}",
            record.target(),
            color,
            msg,
            LOG_COLOR_CODE_DEFAULT
        );
    }

    fn flush(&self) {
        if let Some(writer) = self.event_writer.as_ref() {
            if let Ok(mut writer) = writer.lock() {
                if let Err(error) = writer.flush() {
                    eprintln!("could not flush event file: {error}");
                }
            }
        }
    }
}

#[derive(Debug)]
pub enum InitError {
    EventFile(io::Error),
    Logger(SetLoggerError),
}

impl std::fmt::Display for InitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InitError::EventFile(error) => write!(f, "could not create event file: {error}"),
            InitError::Logger(error) => write!(f, "{error}"),
        }
    }
}

pub fn init(
    max_level: Level,
    verbose: bool,
    output_file_path: Option<&str>,
) -> Result<(), InitError> {
    let event_writer = output_file_path
        .map(EventFileWriter::create)
        .transpose()
        .map_err(InitError::EventFile)?;
    let logger = Box::new(SimLogger {
        max_level,
        verbose,
        event_writer: event_writer.map(Mutex::new),
    });
    log::set_logger(Box::leak(logger)).map_err(InitError::Logger)?;
    log::set_max_level(max_level.to_level_filter());
    Ok(())
}
