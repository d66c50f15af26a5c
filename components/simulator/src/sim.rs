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

use std::{
    cell::{Cell, RefCell},
    fs::File,
    io::{self, Write},
    rc::Rc,
};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use rand::RngCore;

use ais_mac::{Channel, InterruptContext, Priority, RxFrame, Station, StationStatus};
use transponder_api::*;

/// UTC second the simulation starts at, 2025-01-01 00:00:00, a frame boundary
pub const UTC_START: u64 = 1_735_689_600;
/// Identifier of the first station, the others count up from here
pub const FIRST_STATION_ID: StationId = 244_000_001;
/// Received signal strength of every frame, all stations are in range of each other
pub const SIGNAL_RSSI: Rssi = -60;
pub const NOISE_RSSI: Rssi = -120;
/// Preamble and start flag are received shortly after the slot started
const CARRIER_DELAY_US: TimeUs = 2_000;
/// 256 bits at 9600 bit/s
const TIME_ON_AIR_US: TimeUs = 26_000;
/// Filler for the payload of application messages
const MESSAGE_FILL: u8 = 0xa5;
const MESSAGE_LEN: usize = 16;

/// Simulation time in microseconds, shared by all stations
#[derive(Debug, Clone, Default)]
pub struct Clock(Rc<Cell<TimeUs>>);

impl Clock {
    pub fn now(&self) -> TimeUs {
        self.0.get()
    }

    fn set(&self, time: TimeUs) {
        self.0.set(time);
    }
}

/// A transmission in the current slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnAir {
    pub sender: usize,
    pub source: StationId,
    pub channel: VhfChannel,
    pub slot_timeout: u8,
    pub payload: Payload,
}

/// The radio channels all stations share
#[derive(Debug, Default)]
pub struct Medium {
    on_air: Vec<OnAir>,
}

impl Medium {
    pub fn rssi(&self, channel: VhfChannel) -> Rssi {
        if self.on_air.iter().any(|t| t.channel == channel) {
            SIGNAL_RSSI
        } else {
            NOISE_RSSI
        }
    }

    fn take_on_air(&mut self) -> Vec<OnAir> {
        std::mem::take(&mut self.on_air)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RficError {
    FrameTooLong,
}

/// Radio IC attached to the shared medium
#[derive(Debug)]
pub struct SimRfic {
    index: usize,
    station_id: StationId,
    medium: Rc<RefCell<Medium>>,
    receiving: Option<VhfChannel>,
}

impl SimRfic {
    pub fn new(index: usize, station_id: StationId, medium: Rc<RefCell<Medium>>) -> Self {
        Self {
            index,
            station_id,
            medium,
            receiving: None,
        }
    }

    pub fn receiving(&self) -> Option<VhfChannel> {
        self.receiving
    }
}

impl Rfic for SimRfic {
    type Error = RficError;

    fn configure(&mut self, _profile: RadioProfile) -> Result<(), Self::Error> {
        Ok(())
    }

    fn start_transmit(&mut self, frame: TxFrame<'_>) -> Result<(), Self::Error> {
        let payload = Payload::from_slice(frame.payload).map_err(|_| RficError::FrameTooLong)?;
        self.medium.borrow_mut().on_air.push(OnAir {
            sender: self.index,
            source: self.station_id,
            channel: frame.channel,
            slot_timeout: frame.slot_timeout,
            payload,
        });
        self.receiving = None;
        Ok(())
    }

    fn start_receive(&mut self, channel: VhfChannel) -> Result<(), Self::Error> {
        self.receiving = Some(channel);
        Ok(())
    }

    fn read_rssi(&mut self, channel: VhfChannel) -> Rssi {
        self.medium.borrow().rssi(channel)
    }

    fn is_responsive(&mut self) -> bool {
        true
    }
}

#[derive(Debug)]
pub struct SimGps {
    clock: Clock,
}

impl Gps for SimGps {
    fn current_utc_second(&self) -> u64 {
        UTC_START + self.clock.now() / US_PER_S
    }

    fn has_fix(&self) -> bool {
        true
    }
}

#[derive(Debug)]
pub struct SimConfig {
    station_id: StationId,
    tuning: Tuning,
}

impl Configuration for SimConfig {
    fn station_id(&self) -> Option<StationId> {
        Some(self.station_id)
    }

    fn is_tx_enabled(&self) -> bool {
        true
    }

    fn tuning(&self) -> Tuning {
        self.tuning
    }
}

/// Message id followed by the station id, position reports carry the speed as well
#[derive(Debug)]
pub struct SimEncoder {
    speed_dkn: u16,
}

impl ReportEncoder for SimEncoder {
    fn encode(&mut self, kind: ReportKind, station: StationId, payload: &mut Payload) -> bool {
        let message_id = match kind {
            ReportKind::Position => 18,
            ReportKind::StaticDataA | ReportKind::StaticDataB => 24,
        };
        if payload.push(message_id).is_err()
            || payload.extend_from_slice(&station.to_be_bytes()).is_err()
        {
            return false;
        }
        match kind {
            ReportKind::Position => payload
                .extend_from_slice(&self.speed_dkn.to_be_bytes())
                .is_ok(),
            ReportKind::StaticDataA => payload.push(0).is_ok(),
            ReportKind::StaticDataB => payload.push(1).is_ok(),
        }
    }
}

pub type SimStationImpl<'a> = Station<'a, SimRfic, SimGps, SimConfig, SimEncoder>;

/// A station and its interrupt side
pub struct SimStation<'a> {
    pub station: SimStationImpl<'a>,
    irq: InterruptContext<'a>,
    pub id: StationId,
    /// Simulation time the station is switched on, its local time starts there
    pub powered_at: TimeUs,
    powered: bool,
    speed_dkn: u16,
    pub sent: u32,
    pub received: u32,
}

impl SimStation<'_> {
    fn local(&self, time: TimeUs) -> TimeUs {
        time - self.powered_at
    }

    fn rfic(&self) -> &SimRfic {
        self.station.scheduler().radio().rfic()
    }

    fn power_up(&mut self) {
        self.powered = true;
        if let Err(e) = self.station.init() {
            error!("station {} failed to start: {}", self.id, e);
        }
    }

    /// Channel of the station's channel pair the radio is tuned to
    fn ais_channel(&self, channel: VhfChannel) -> Option<Channel> {
        let channels = self.station.scheduler().channels();
        [Channel::A, Channel::B]
            .into_iter()
            .find(|c| channels.vhf(*c) == channel)
    }
}

/// Parameters of one simulation run
#[derive(Debug, Clone)]
pub struct Scenario {
    pub stations: usize,
    pub minutes: u64,
    pub tuning: Tuning,
    /// Stations are switched on at a random time within this many seconds
    pub startup_delay_s: u64,
    pub speed_dkn: u16,
    /// Application messages queued per station and minute on top of the reports
    pub messages_per_minute: u32,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            stations: 10,
            minutes: 30,
            tuning: Tuning::default(),
            startup_delay_s: 60,
            speed_dkn: 0,
            messages_per_minute: 0,
        }
    }
}

#[derive(Debug, Default)]
pub struct Outcome {
    pub transmissions: u32,
    /// Transmissions lost because another station used the same slot and channel
    pub collisions: u32,
    /// Frames handed to a receiving station
    pub deliveries: u32,
    /// Application messages the stations refused to queue
    pub rejected: u32,
    pub stations: Vec<StationSummary>,
}

#[derive(Debug)]
pub struct StationSummary {
    pub id: StationId,
    pub powered_at: TimeUs,
    pub sent: u32,
    pub received: u32,
    pub status: StationStatus,
}

/// Start of a slot in simulation time, rounded up so the slot clock of a station maps it back to
/// the same slot
pub fn slot_start(slot: u64, tuning: &Tuning) -> TimeUs {
    (slot * tuning.frame_duration_us()).div_ceil(tuning.slots_per_frame as u64)
}

pub fn run(scenario: &Scenario, mut rng: impl RngCore) -> Outcome {
    let clock = Clock::default();
    let medium = Rc::new(RefCell::new(Medium::default()));
    let tuning = scenario.tuning;

    let mut events: Vec<ais_mac::StationEventQueue> = (0..scenario.stations)
        .map(|_| ais_mac::StationEventQueue::new())
        .collect();
    let mut frames: Vec<ais_mac::RxQueue> = (0..scenario.stations)
        .map(|_| ais_mac::RxQueue::new())
        .collect();

    let startup_range = scenario.startup_delay_s * US_PER_S + 1;
    let mut stations: Vec<SimStation> = events
        .iter_mut()
        .zip(frames.iter_mut())
        .enumerate()
        .map(|(index, (events, frames))| {
            let (poster, drain) = events.split();
            let (producer, consumer) = frames.split();
            let id = FIRST_STATION_ID + index as StationId;
            let station = Station::new(
                SimRfic::new(index, id, medium.clone()),
                SimGps {
                    clock: clock.clone(),
                },
                SimConfig {
                    station_id: id,
                    tuning,
                },
                SimEncoder {
                    speed_dkn: scenario.speed_dkn,
                },
                drain,
                consumer,
            );
            SimStation {
                station,
                irq: InterruptContext::new(poster, producer),
                id,
                powered_at: rng.next_u64() % startup_range,
                powered: false,
                speed_dkn: scenario.speed_dkn,
                sent: 0,
                received: 0,
            }
        })
        .collect();

    let mut outcome = Outcome::default();
    let slots_per_minute =
        60 * US_PER_S * tuning.slots_per_frame as u64 / tuning.frame_duration_us().max(1);
    let total_slots = scenario.minutes * slots_per_minute;

    for slot in 0..total_slots {
        let start = slot_start(slot, &tuning);
        let end = slot_start(slot + 1, &tuning);
        let second = start.div_ceil(US_PER_S) * US_PER_S;
        let pps = (second < end).then_some(second);

        if start % (60 * US_PER_S) == 0 {
            info!(
                "{:=^60}",
                format!(" {}min (slot {}) ", start / (60 * US_PER_S), slot)
            );
        }

        clock.set(pps.unwrap_or(start));

        for station in stations.iter_mut() {
            if !station.powered && station.powered_at <= start {
                station.power_up();
            }
            if !station.powered {
                continue;
            }
            if let Some(pps) = pps.filter(|pps| *pps == start) {
                post_pps(station, pps);
            }
            station.irq.on_slot_timer(station.local(start));
            if let Some(pps) = pps.filter(|pps| *pps > start) {
                post_pps(station, pps);
            }
            if scenario.messages_per_minute > 0
                && rng.next_u64() % slots_per_minute < scenario.messages_per_minute as u64
            {
                let channel = if rng.next_u32() % 2 == 0 {
                    Channel::A
                } else {
                    Channel::B
                };
                let message = [MESSAGE_FILL; MESSAGE_LEN];
                if let Err(e) =
                    station
                        .station
                        .queue_transmission(&message, channel, Priority::Low, None)
                {
                    debug!("station {}: message rejected: {}", station.id, e);
                    outcome.rejected += 1;
                }
            }
            station.station.poll(&mut rng);
        }

        let on_air = medium.borrow_mut().take_on_air();
        if on_air.is_empty() {
            continue;
        }
        deliver(&on_air, start, &mut stations, &mut outcome);

        for station in stations.iter_mut().filter(|s| s.powered) {
            station.station.poll(&mut rng);
            while station.station.take_received().is_some() {
                station.received += 1;
            }
        }
    }

    outcome.stations = stations
        .iter()
        .map(|s| StationSummary {
            id: s.id,
            powered_at: s.powered_at,
            sent: s.sent,
            received: s.received,
            status: s.station.status(),
        })
        .collect();
    outcome
}

fn post_pps(station: &mut SimStation, pps: TimeUs) {
    let local = station.local(pps);
    station.irq.on_pps(local);
    let speed_dkn = station.speed_dkn;
    station.irq.on_position_fix(local, speed_dkn);
}

/// Hand the frames sent in a slot to the stations listening on their channel
///
/// Frames sharing slot and channel destroy each other.
fn deliver(on_air: &[OnAir], start: TimeUs, stations: &mut [SimStation], outcome: &mut Outcome) {
    for transmission in on_air {
        outcome.transmissions += 1;
        stations[transmission.sender].sent += 1;

        let colliding = on_air
            .iter()
            .filter(|t| t.channel == transmission.channel)
            .count();
        if colliding > 1 {
            warn!(
                "collision on channel {}: frame from {} lost",
                transmission.channel, transmission.source
            );
            outcome.collisions += 1;
            continue;
        }

        for (index, station) in stations.iter_mut().enumerate() {
            if index == transmission.sender
                || !station.powered
                || station.rfic().receiving() != Some(transmission.channel)
            {
                continue;
            }
            let Some(channel) = station.ais_channel(transmission.channel) else {
                continue;
            };
            let frame = RxFrame {
                channel,
                source: transmission.source,
                slot_timeout: transmission.slot_timeout,
                rssi: SIGNAL_RSSI,
                received_at: station.local(start),
                payload: transmission.payload.clone(),
            };
            station
                .irq
                .on_carrier_detected(station.local(start + CARRIER_DELAY_US));
            station
                .irq
                .on_rx_done(station.local(start + TIME_ON_AIR_US), frame);
            outcome.deliveries += 1;
        }
    }

    for transmission in on_air {
        let sender = &mut stations[transmission.sender];
        let done = sender.local(start + TIME_ON_AIR_US);
        sender.irq.on_tx_done(done);
    }
}

pub fn write_metadata_to_file(
    scenario: &Scenario,
    outcome: &Outcome,
    file_path: &str,
) -> io::Result<()> {
    let mut file = File::create(file_path)?;
    let tuning = &scenario.tuning;
    writeln!(
        file,
        "{{\n\"slots_per_frame\":{},\n\"frame_seconds\":{},\n\"utc_start\":{},",
        tuning.slots_per_frame, tuning.frame_seconds, UTC_START
    )?;
    writeln!(file, "\"stations\":\n[")?;
    let mut station_iter = outcome.stations.iter().peekable();
    while let Some(station) = station_iter.next() {
        write!(
            file,
            "{{\"id\":{},\"powered_at\":{},\"sent\":{},\"received\":{}}}",
            station.id, station.powered_at, station.sent, station.received
        )?;
        if station_iter.peek().is_some() {
            write!(file, ",")?;
        }
        writeln!(file)?;
    }
    writeln!(file, "]\n}}")?;
    Ok(())
}
