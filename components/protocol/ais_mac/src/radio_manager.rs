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

use serde::Serialize;

use crate::*;

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioState {
    #[default]
    Uninitialized,
    Idle,
    Receiving,
    Transmitting,
    /// Radio IC failed, terminal until the radio manager is recreated
    ConfigError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RadioInput {
    InitOk,
    InitFailed,
    Transmit,
    TxDone,
    CarrierDetected,
    RxDone,
    /// Carrier disappeared without a complete frame
    CarrierLost,
    Fault,
}

impl RadioState {
    /// Allowed transitions, `None` if the input is not valid in the current state
    pub(crate) fn next(self, input: RadioInput) -> Option<RadioState> {
        match (self, input) {
            (RadioState::ConfigError, _) => None,
            (_, RadioInput::Fault) => Some(RadioState::ConfigError),
            (RadioState::Uninitialized, RadioInput::InitOk) => Some(RadioState::Idle),
            (RadioState::Uninitialized, RadioInput::InitFailed) => Some(RadioState::ConfigError),
            (RadioState::Idle, RadioInput::Transmit) => Some(RadioState::Transmitting),
            (RadioState::Idle, RadioInput::CarrierDetected) => Some(RadioState::Receiving),
            (RadioState::Receiving, RadioInput::RxDone | RadioInput::CarrierLost) => {
                Some(RadioState::Idle)
            }
            (RadioState::Transmitting, RadioInput::TxDone) => Some(RadioState::Idle),
            _ => None,
        }
    }
}

/// Owns the radio IC and keeps track of what it is doing
///
/// The IC listens on the receive channel whenever it is not transmitting. A transmission can only
/// be started from `Idle`.
pub struct RadioManager<R> {
    pub(crate) rfic: R,
    state: RadioState,
    /// Packet on air and the time the transmitter was keyed
    in_flight: Option<(PacketHandle, TimeUs)>,
    /// Time the carrier of the frame being received was detected
    carrier_since: Option<TimeUs>,
    receive_channel: VhfChannel,
}

impl<R: Rfic> RadioManager<R> {
    pub fn new(rfic: R) -> Self {
        Self {
            rfic,
            state: RadioState::Uninitialized,
            in_flight: None,
            carrier_since: None,
            receive_channel: VhfChannel::Ch87,
        }
    }

    /// Configure the radio IC and start listening
    pub fn init(&mut self, receive_channel: VhfChannel) -> Result<(), Error> {
        self.receive_channel = receive_channel;
        let configured = self.rfic.configure(RadioProfile::Ais).is_ok()
            && self.rfic.is_responsive()
            && self.rfic.start_receive(receive_channel).is_ok();
        if configured {
            self.transition(RadioInput::InitOk)?;
            info!("radio listening on channel {}", receive_channel);
            Ok(())
        } else {
            error!("radio configuration failed");
            self.transition(RadioInput::InitFailed)?;
            Err(Error::ConfigError)
        }
    }

    pub fn state(&self) -> RadioState {
        self.state
    }

    /// Whether a transmission may be started now
    pub fn is_tx_allowed(&self) -> bool {
        self.state == RadioState::Idle
    }

    pub fn is_operational(&self) -> bool {
        !matches!(
            self.state,
            RadioState::Uninitialized | RadioState::ConfigError
        )
    }

    /// Key the transmitter, on failure the handle is handed back
    pub fn transmit(
        &mut self,
        handle: PacketHandle,
        packet: &TxPacket,
        channel: VhfChannel,
        slot_timeout: u8,
        now: TimeUs,
    ) -> Result<(), (Error, PacketHandle)> {
        if let Err(error) = self.check(RadioInput::Transmit) {
            return Err((error, handle));
        }
        let frame = TxFrame {
            channel,
            payload: &packet.payload,
            slot_timeout,
        };
        if self.rfic.start_transmit(frame).is_err() {
            return if self.rfic.is_responsive() {
                warn!("radio rejected transmission");
                Err((Error::Busy, handle))
            } else {
                error!("radio not responding");
                self.fault();
                Err((Error::ConfigError, handle))
            };
        }
        self.state = RadioState::Transmitting;
        self.in_flight = Some((handle, now));
        Ok(())
    }

    /// Transmission finished, returns the packet that was on air
    pub fn on_tx_done(&mut self) -> Option<PacketHandle> {
        if let Err(error) = self.transition(RadioInput::TxDone) {
            warn!("unexpected TX done in state {}: {}", self.state, error);
            return None;
        }
        self.listen();
        self.in_flight.take().map(|(handle, _)| handle)
    }

    pub fn on_carrier_detected(&mut self, now: TimeUs) -> Result<(), Error> {
        self.transition(RadioInput::CarrierDetected)?;
        self.carrier_since = Some(now);
        Ok(())
    }

    pub fn on_rx_done(&mut self) -> Result<(), Error> {
        self.transition(RadioInput::RxDone)?;
        self.carrier_since = None;
        self.listen();
        Ok(())
    }

    /// Give up a reception that did not complete within `max_duration`
    ///
    /// Returns true if the radio went back to `Idle`.
    pub fn check_rx_timeout(&mut self, now: TimeUs, max_duration: TimeUs) -> bool {
        let Some(since) = self.carrier_since else {
            return false;
        };
        if now.saturating_sub(since) <= max_duration {
            return false;
        }
        self.carrier_since = None;
        if self.transition(RadioInput::CarrierLost).is_err() {
            return false;
        }
        debug!("carrier lost without a frame");
        self.listen();
        true
    }

    /// Radio IC signalled it is ready again after a reconfiguration
    pub fn on_ready(&mut self) {
        if self.state == RadioState::Idle {
            self.listen();
        }
    }

    /// End a transmission whose TX done did not arrive in time
    ///
    /// Returns the packet that was on air. If the radio IC still responds the transmission is
    /// taken as complete and the radio listens again, otherwise the radio is in `ConfigError`.
    pub fn check_tx_timeout(&mut self, now: TimeUs) -> Option<PacketHandle> {
        let (_, started) = self.in_flight.as_ref()?;
        if now.saturating_sub(*started) <= TX_DONE_TIMEOUT_US {
            return None;
        }
        if self.rfic.is_responsive() && self.transition(RadioInput::TxDone).is_ok() {
            warn!("TX done overdue, transmission taken as complete");
            self.listen();
        } else {
            error!("radio not responding during transmission");
            self.fault();
        }
        self.in_flight.take().map(|(handle, _)| handle)
    }

    pub fn read_rssi(&mut self, channel: VhfChannel) -> Result<Rssi, Error> {
        match self.state {
            RadioState::Idle | RadioState::Receiving => Ok(self.rfic.read_rssi(channel)),
            RadioState::Transmitting => Err(Error::Busy),
            RadioState::Uninitialized | RadioState::ConfigError => Err(Error::ConfigError),
        }
    }

    pub fn rfic(&self) -> &R {
        &self.rfic
    }

    fn check(&self, input: RadioInput) -> Result<RadioState, Error> {
        self.state.next(input).ok_or(match self.state {
            RadioState::Uninitialized | RadioState::ConfigError => Error::ConfigError,
            _ => Error::Busy,
        })
    }

    fn transition(&mut self, input: RadioInput) -> Result<(), Error> {
        self.state = self.check(input)?;
        Ok(())
    }

    fn fault(&mut self) {
        self.state = RadioState::ConfigError;
    }

    fn listen(&mut self) {
        if self.rfic.start_receive(self.receive_channel).is_err() && !self.rfic.is_responsive() {
            error!("radio not responding");
            self.fault();
        }
    }
}

impl core::fmt::Display for RadioState {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            RadioState::Uninitialized => "Uninitialized",
            RadioState::Idle => "Idle",
            RadioState::Receiving => "Receiving",
            RadioState::Transmitting => "Transmitting",
            RadioState::ConfigError => "ConfigError",
        };
        write!(fmt, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::*;

    fn packet(pool: &mut PacketPool<2>) -> PacketHandle {
        let handle = pool.acquire().unwrap();
        pool.get_mut(&handle).payload.extend_from_slice(&[1, 2]).unwrap();
        handle
    }

    #[test]
    fn transitions() {
        use RadioInput::*;
        use RadioState::*;
        assert_eq!(Uninitialized.next(InitOk), Some(Idle));
        assert_eq!(Uninitialized.next(Transmit), None);
        assert_eq!(Idle.next(Transmit), Some(Transmitting));
        assert_eq!(Receiving.next(Transmit), None);
        assert_eq!(Transmitting.next(CarrierDetected), None);
        assert_eq!(Transmitting.next(TxDone), Some(Idle));
        assert_eq!(Receiving.next(Fault), Some(ConfigError));
        assert_eq!(Receiving.next(CarrierLost), Some(Idle));
        assert_eq!(Idle.next(CarrierLost), None);
        for input in [
            InitOk,
            InitFailed,
            Transmit,
            TxDone,
            CarrierDetected,
            RxDone,
            CarrierLost,
            Fault,
        ] {
            assert_eq!(ConfigError.next(input), None);
        }
    }

    #[test]
    fn transmit_only_from_idle() {
        let mut pool = PacketPool::<2>::new();
        let mut radio = RadioManager::new(MockRfic::default());
        let handle = packet(&mut pool);
        let packet = pool.get(&handle).clone();
        let (error, handle) = radio
            .transmit(handle, &packet, VhfChannel::Ch87, 3, 0)
            .unwrap_err();
        assert_eq!(error, Error::ConfigError);

        radio.init(VhfChannel::Ch87).unwrap();
        assert_eq!(radio.rfic().receiving, Some(VhfChannel::Ch87));
        radio.on_carrier_detected(0).unwrap();
        assert_eq!(radio.read_rssi(VhfChannel::Ch87), Ok(-120));
        let (error, handle) = radio
            .transmit(handle, &packet, VhfChannel::Ch87, 3, 0)
            .unwrap_err();
        assert_eq!(error, Error::Busy);
        radio.on_rx_done().unwrap();

        radio
            .transmit(handle, &packet, VhfChannel::Ch88, 3, 10)
            .unwrap();
        assert_eq!(radio.state(), RadioState::Transmitting);
        assert_eq!(radio.read_rssi(VhfChannel::Ch87), Err(Error::Busy));
        assert_eq!(
            radio.rfic().transmissions,
            [(VhfChannel::Ch88, std::vec![1, 2], 3)]
        );
        let handle = radio.on_tx_done().unwrap();
        assert_eq!(radio.state(), RadioState::Idle);
        assert!(radio.on_tx_done().is_none());
        pool.release(handle).unwrap();
    }

    #[test]
    fn failed_configuration_is_terminal() {
        let mut radio = RadioManager::new(MockRfic {
            configure_fails: true,
            ..Default::default()
        });
        assert_eq!(radio.init(VhfChannel::Ch87), Err(Error::ConfigError));
        assert_eq!(radio.state(), RadioState::ConfigError);
        assert_eq!(radio.on_carrier_detected(0), Err(Error::ConfigError));
        assert_eq!(radio.read_rssi(VhfChannel::Ch87), Err(Error::ConfigError));
        assert!(!radio.is_operational());
    }

    #[test]
    fn unresponsive_radio_returns_packet_on_timeout() {
        let mut pool = PacketPool::<2>::new();
        let mut radio = RadioManager::new(MockRfic::default());
        radio.init(VhfChannel::Ch87).unwrap();
        let handle = packet(&mut pool);
        let packet = pool.get(&handle).clone();
        radio.transmit(handle, &packet, VhfChannel::Ch87, 0, 0).unwrap();
        radio.rfic.responsive = false;
        assert!(radio.check_tx_timeout(TX_DONE_TIMEOUT_US).is_none());
        let handle = radio.check_tx_timeout(TX_DONE_TIMEOUT_US + 1).unwrap();
        assert_eq!(radio.state(), RadioState::ConfigError);
        assert!(!radio.is_operational());
        pool.release(handle).unwrap();
    }

    #[test]
    fn overdue_tx_done_ends_transmission() {
        let mut pool = PacketPool::<2>::new();
        let mut radio = RadioManager::new(MockRfic::default());
        radio.init(VhfChannel::Ch88).unwrap();
        let handle = packet(&mut pool);
        let packet = pool.get(&handle).clone();
        radio.transmit(handle, &packet, VhfChannel::Ch87, 0, 1_000).unwrap();
        assert_eq!(radio.rfic().receiving, None);
        assert!(radio.check_tx_timeout(1_000 + TX_DONE_TIMEOUT_US).is_none());
        let handle = radio.check_tx_timeout(1_001 + TX_DONE_TIMEOUT_US).unwrap();
        assert_eq!(radio.state(), RadioState::Idle);
        assert_eq!(radio.rfic().receiving, Some(VhfChannel::Ch88));
        assert!(radio.is_tx_allowed());
        // a late TX done changes nothing
        assert!(radio.on_tx_done().is_none());
        assert!(radio.check_tx_timeout(10 * TX_DONE_TIMEOUT_US).is_none());
        pool.release(handle).unwrap();
    }

    #[test]
    fn carrier_without_frame_times_out() {
        let mut radio = RadioManager::new(MockRfic::default());
        radio.init(VhfChannel::Ch87).unwrap();
        assert!(!radio.check_rx_timeout(50_000, 30_000));
        radio.on_carrier_detected(10_000).unwrap();
        radio.rfic.receiving = None;
        assert!(!radio.check_rx_timeout(40_000, 30_000));
        assert_eq!(radio.state(), RadioState::Receiving);
        assert!(radio.check_rx_timeout(40_001, 30_000));
        assert_eq!(radio.state(), RadioState::Idle);
        assert_eq!(radio.rfic().receiving, Some(VhfChannel::Ch87));
        assert!(!radio.check_rx_timeout(100_000, 30_000));

        // a completed frame stops the timeout
        radio.on_carrier_detected(200_000).unwrap();
        radio.on_rx_done().unwrap();
        assert!(!radio.check_rx_timeout(300_000, 30_000));
        assert_eq!(radio.state(), RadioState::Idle);
    }
}
