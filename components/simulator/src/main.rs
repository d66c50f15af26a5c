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

//! Runs a number of AIS stations sharing one pair of radio channels

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use rand::{RngCore, SeedableRng};
use std::env;

use transponder_api::Tuning;

mod logger;
mod sim;

use crate::sim::*;

const EVENT_FILE_PATH: &str = "/tmp/ais_mac_events.csv";
const SIMULATION_METADATA_FILE_PATH: &str = "/tmp/ais_mac_sim_meta.json";

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut rng_seed: u64 = 0;
    let mut scenario = Scenario::default();
    let mut verbose = false;

    for chunk in args[1..].chunks_exact(2) {
        let (arg, val) = (&chunk[0], &chunk[1]);
        match arg.as_str() {
            "--seed" => {
                rng_seed = val.parse().expect("invalid rng seed");
            }
            "--stations" => {
                scenario.stations = val.parse().expect("invalid number of stations");
            }
            "--time_min" => {
                scenario.minutes = val.parse().expect("invalid number of simulation minutes");
            }
            "--startup_s" => {
                scenario.startup_delay_s = val.parse().expect("invalid startup delay");
            }
            "--speed_kn" => {
                let knots: u16 = val.parse().expect("invalid speed");
                scenario.speed_dkn = knots.saturating_mul(10);
            }
            "--messages_per_min" => {
                scenario.messages_per_minute = val.parse().expect("invalid message rate");
            }
            "--slots_per_frame" => {
                scenario.tuning.slots_per_frame = val.parse().expect("invalid slots per frame");
            }
            "--verbose" => {
                verbose = val.parse().expect("invalid verbose flag, use true or false");
            }
            _ => panic!("unknown argument: {}", arg),
        }
    }

    assert!(scenario.stations > 0, "need at least one station");
    assert!(
        scenario.tuning.slots_per_frame > 0,
        "need at least one slot per frame"
    );

    if let Err(e) = logger::init(log::Level::Info, verbose, Some(EVENT_FILE_PATH)) {
        eprintln!("{e}");
        return;
    }

    let outcome = run(&scenario, get_rng(rng_seed));
    log::Log::flush(log::logger());

    if let Err(e) = write_metadata_to_file(&scenario, &outcome, SIMULATION_METADATA_FILE_PATH) {
        eprintln!("could not write simulation metadata: {e}");
    }

    print_summary(&scenario.tuning, &outcome);
}

fn get_rng(rng_seed: u64) -> impl RngCore {
    println!("RNG seed: {rng_seed:#x}");
    rand_chacha::ChaCha8Rng::seed_from_u64(rng_seed)
}

fn print_summary(tuning: &Tuning, outcome: &Outcome) {
    println!(
        "{} slots per {}s frame: {} transmissions, {} collisions, {} deliveries, {} messages rejected",
        tuning.slots_per_frame,
        tuning.frame_seconds,
        outcome.transmissions,
        outcome.collisions,
        outcome.deliveries,
        outcome.rejected
    );
    for station in &outcome.stations {
        let counters = &station.status.counters;
        println!(
            "{}: sent {:>4} received {:>5} deferred {:>3} cancelled {:>3} missed {:>3} dropped {:>3}",
            station.id,
            station.sent,
            station.received,
            counters.deferred_collisions,
            counters.cancelled,
            counters.missed_slots,
            counters.packets_dropped
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::*;

    fn scenario(stations: usize, minutes: u64) -> Scenario {
        Scenario {
            stations,
            minutes,
            startup_delay_s: 30,
            ..Default::default()
        }
    }

    #[test]
    fn single_station_sends_reports() {
        // logger::init(log::Level::Trace, true, Some(EVENT_FILE_PATH)).unwrap();
        let scenario = Scenario {
            startup_delay_s: 0,
            ..scenario(1, 7)
        };
        let outcome = run(&scenario, get_rng(0));
        // position reports after 91s and 272s, static data parts A and B after 181s
        let station = &outcome.stations[0];
        assert_eq!(station.sent, 4);
        assert_eq!(station.status.counters.transmitted, 4);
        assert_eq!(outcome.collisions, 0);
        assert_eq!(outcome.deliveries, 0);
    }

    #[test]
    fn moving_station_reports_more_often() {
        let slow = Scenario {
            startup_delay_s: 0,
            ..scenario(1, 7)
        };
        let fast = Scenario {
            speed_dkn: 140,
            ..slow.clone()
        };
        let slow = run(&slow, get_rng(0));
        let fast = run(&fast, get_rng(0));
        assert!(fast.stations[0].sent >= 12);
        assert!(fast.stations[0].sent > 2 * slow.stations[0].sent);
    }

    #[test]
    fn two_stations_hear_each_other() {
        let outcome = run(&scenario(2, 8), get_rng(0));
        for station in &outcome.stations {
            assert!(station.sent > 0);
            assert!(station.received > 0);
            assert_eq!(station.status.counters.sync_lost, 0);
        }
        assert_eq!(
            outcome.deliveries,
            outcome.stations[0].received + outcome.stations[1].received
        );
    }

    #[test]
    fn busy_channels_stay_usable() {
        let scenario = Scenario {
            messages_per_minute: 6,
            ..scenario(20, 10)
        };
        let outcome = run(&scenario, get_rng(1));
        assert!(outcome.transmissions > 800);
        assert!(outcome.deliveries > 0);
        assert!(outcome.collisions * 5 < outcome.transmissions);
        for station in &outcome.stations {
            assert!(station.sent > 0);
        }
    }

    #[test]
    fn same_seed_same_outcome() {
        let scenario = Scenario {
            messages_per_minute: 2,
            ..scenario(4, 5)
        };
        let a = run(&scenario, get_rng(7));
        let b = run(&scenario, get_rng(7));
        assert_eq!(a.transmissions, b.transmissions);
        assert_eq!(a.collisions, b.collisions);
        assert_eq!(a.deliveries, b.deliveries);
        for (a, b) in a.stations.iter().zip(&b.stations) {
            assert_eq!(a.status, b.status);
        }
    }
}
