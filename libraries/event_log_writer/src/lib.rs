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

//! Writes the `$` prefixed event lines of the medium access log to a CSV file

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

pub const EVENT_INDICATOR_CHAR: char = '$';

const FILE_HEADER: &str = "uptime_us;station;kind;content";

pub struct EventFileWriter<W: Write = BufWriter<File>> {
    out: W,
}

impl EventFileWriter {
    pub fn create(output_file_path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(output_file_path)?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> EventFileWriter<W> {
    pub fn new(mut out: W) -> io::Result<Self> {
        writeln!(out, "{FILE_HEADER}")?;
        Ok(Self { out })
    }

    /// Write one event, returns false for log lines that are not events
    pub fn write_event(&mut self, line: &str) -> io::Result<bool> {
        let Some(event) = line.strip_prefix(EVENT_INDICATOR_CHAR) else {
            return Ok(false);
        };
        writeln!(self.out, "{event}")?;
        Ok(true)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_events_are_written() {
        let mut writer = EventFileWriter::new(Vec::new()).unwrap();
        assert!(writer
            .write_event("$1000;244000001;sync;{\"synced\":true}")
            .unwrap());
        assert!(!writer.write_event("radio not responding").unwrap());
        let written = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(
            written,
            "uptime_us;station;kind;content\n1000;244000001;sync;{\"synced\":true}\n"
        );
    }
}
