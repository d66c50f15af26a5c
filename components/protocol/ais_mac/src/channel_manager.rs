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

use core::ops::Range;
use heapless::Vec;
use serde::Serialize;

use crate::*;

/// One of the two AIS channels a transponder alternates between
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    #[default]
    A,
    B,
}

impl Channel {
    pub fn index(self) -> usize {
        match self {
            Channel::A => 0,
            Channel::B => 1,
        }
    }

    /// The channel to alternate to
    pub fn other(self) -> Self {
        match self {
            Channel::A => Channel::B,
            Channel::B => Channel::A,
        }
    }
}

impl core::fmt::Display for Channel {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Channel::A => write!(fmt, "A"),
            Channel::B => write!(fmt, "B"),
        }
    }
}

/// Occupancy of a slot index as announced by the stations around
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotState {
    Free,
    Reserved { station: StationId },
    SelfAssigned,
}

#[derive(Debug, Clone, Copy)]
struct Reservation {
    channel: Channel,
    slot: SlotIndex,
    /// `None` for own reservations
    station: Option<StationId>,
    /// Remaining frames
    ttl: u8,
}

/// Slot reservation map of both channels
///
/// A reservation covers the same slot index in every frame until its time to live, counted in
/// frames, has run out.
#[derive(Debug)]
pub struct ChannelManager {
    reservations: Vec<Reservation, MAX_RESERVATIONS>,
    vhf: [VhfChannel; 2],
    evicted: u32,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self {
            reservations: Vec::new(),
            vhf: [VhfChannel::Ch87, VhfChannel::Ch88],
            evicted: 0,
        }
    }

    /// Forget all reservations, the channel pair is kept
    pub fn init(&mut self) {
        self.reservations.clear();
    }

    pub fn set_channel_pair(&mut self, a: VhfChannel, b: VhfChannel) {
        if a == b {
            warn!("channel pair with identical channels {}", a);
        }
        self.vhf = [a, b];
    }

    /// Radio channel a logical channel is currently mapped to
    pub fn vhf(&self, channel: Channel) -> VhfChannel {
        self.vhf[channel.index()]
    }

    pub fn state(&self, channel: Channel, slot: SlotIndex) -> SlotState {
        match self.find(channel, slot).map(|i| self.reservations[i].station) {
            None => SlotState::Free,
            Some(None) => SlotState::SelfAssigned,
            Some(Some(station)) => SlotState::Reserved { station },
        }
    }

    pub fn is_free(&self, channel: Channel, slot: SlotIndex) -> bool {
        self.find(channel, slot).is_none()
    }

    /// Record a slot announced by another station
    ///
    /// The latest announcement for a slot wins. Returns true if an own reservation was overridden.
    pub fn mark_reserved(
        &mut self,
        channel: Channel,
        slot: SlotIndex,
        station: StationId,
        ttl: u8,
    ) -> bool {
        let overridden = self.state(channel, slot) == SlotState::SelfAssigned;
        self.insert(Reservation {
            channel,
            slot,
            station: Some(station),
            ttl,
        });
        overridden
    }

    pub fn reserve_self(&mut self, channel: Channel, slot: SlotIndex, ttl: u8) {
        self.insert(Reservation {
            channel,
            slot,
            station: None,
            ttl,
        });
    }

    /// Drop an own reservation, reservations of other stations are kept
    pub fn release_self(&mut self, channel: Channel, slot: SlotIndex) {
        self.reservations
            .retain(|r| !(r.channel == channel && r.slot == slot && r.station.is_none()));
    }

    /// Earliest slot in `candidates` whose index is reserved for this station
    pub fn self_assigned_in(
        &self,
        channel: Channel,
        candidates: Range<SlotNumber>,
        slots_per_frame: u16,
    ) -> Option<SlotNumber> {
        self.reservations
            .iter()
            .filter(|r| r.channel == channel && r.station.is_none())
            .map(|r| next_occurrence(candidates.start, r.slot, slots_per_frame))
            .filter(|slot| candidates.contains(slot))
            .min()
    }

    /// Pick one of the free slots in `candidates` at random
    pub fn select_free(
        &self,
        channel: Channel,
        candidates: Range<SlotNumber>,
        slots_per_frame: u16,
        mut rng: impl RngCore,
    ) -> Option<SlotNumber> {
        let mut free_slots =
            candidates.filter(|s| self.is_free(channel, slot_index(*s, slots_per_frame)));
        let num_free_slots = free_slots.clone().count();
        if num_free_slots == 0 {
            return None;
        }
        free_slots.nth(rng.next_u32() as usize % num_free_slots)
    }

    /// Age all reservations by one frame and drop the expired ones
    pub fn rollover_frame(&mut self) {
        for reservation in self.reservations.iter_mut() {
            reservation.ttl = reservation.ttl.saturating_sub(1);
        }
        self.reservations.retain(|r| r.ttl > 0);
    }

    pub fn reservation_count(&self) -> usize {
        self.reservations.len()
    }

    /// Reservations dropped because the map was full
    pub fn evicted_count(&self) -> u32 {
        self.evicted
    }

    fn find(&self, channel: Channel, slot: SlotIndex) -> Option<usize> {
        self.reservations
            .iter()
            .position(|r| r.channel == channel && r.slot == slot)
    }

    fn insert(&mut self, reservation: Reservation) {
        if let Some(i) = self.find(reservation.channel, reservation.slot) {
            self.reservations[i] = reservation;
            return;
        }
        if reservation.ttl == 0 {
            return;
        }
        if self.reservations.is_full() {
            // make room by dropping the reservation closest to expiry
            if let Some(i) = self
                .reservations
                .iter()
                .enumerate()
                .min_by_key(|(_, r)| r.ttl)
                .map(|(i, _)| i)
            {
                debug!("reservation map full, dropping slot {}", self.reservations[i].slot);
                self.reservations.swap_remove(i);
                self.evicted += 1;
            }
        }
        // cannot fail, room was made above
        let _ = self.reservations.push(reservation);
    }
}

impl Default for ChannelManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng as Rng;

    #[test]
    fn reservation_expires_after_ttl_frames() {
        let mut channels = ChannelManager::new();
        channels.mark_reserved(Channel::A, 5, 42, 3);
        assert_eq!(
            channels.state(Channel::A, 5),
            SlotState::Reserved { station: 42 }
        );
        assert!(channels.is_free(Channel::B, 5));
        channels.rollover_frame();
        channels.rollover_frame();
        assert!(!channels.is_free(Channel::A, 5));
        channels.rollover_frame();
        assert!(channels.is_free(Channel::A, 5));
        assert_eq!(channels.reservation_count(), 0);
    }

    #[test]
    fn announcement_overrides_own_reservation() {
        let mut channels = ChannelManager::new();
        channels.reserve_self(Channel::B, 7, 3);
        assert_eq!(channels.state(Channel::B, 7), SlotState::SelfAssigned);
        assert!(channels.mark_reserved(Channel::B, 7, 1, 2));
        assert!(!channels.mark_reserved(Channel::B, 7, 1, 2));
        // releasing does not touch the other station's reservation
        channels.release_self(Channel::B, 7);
        assert_eq!(
            channels.state(Channel::B, 7),
            SlotState::Reserved { station: 1 }
        );
    }

    #[test]
    fn random_free_slot() {
        let mut channels = ChannelManager::new();
        for slot in [2, 4, 5] {
            channels.mark_reserved(Channel::A, slot, 9, 1);
        }
        for _ in 0..100 {
            let slot = channels
                .select_free(Channel::A, 1011..1016, 10, Rng::default())
                .unwrap();
            assert!([1011, 1013].contains(&slot));
        }
        for slot in [1, 3] {
            channels.mark_reserved(Channel::A, slot, 9, 1);
        }
        assert_eq!(channels.select_free(Channel::A, 1011..1016, 10, Rng::default()), None);
        assert!(channels
            .select_free(Channel::B, 1011..1016, 10, Rng::default())
            .is_some());
    }

    #[test]
    fn own_reservation_is_found_in_next_frame() {
        let mut channels = ChannelManager::new();
        channels.reserve_self(Channel::A, 3, 2);
        assert_eq!(channels.self_assigned_in(Channel::A, 1005..1015, 10), Some(1013));
        assert_eq!(channels.self_assigned_in(Channel::A, 1004..1008, 10), None);
        assert_eq!(channels.self_assigned_in(Channel::B, 1005..1015, 10), None);
    }

    #[test]
    fn full_map_evicts_reservation_closest_to_expiry() {
        let mut channels = ChannelManager::new();
        for slot in 0..MAX_RESERVATIONS as SlotIndex {
            channels.mark_reserved(Channel::A, slot, 1, if slot == 17 { 1 } else { 5 });
        }
        channels.mark_reserved(Channel::B, 0, 2, 5);
        assert_eq!(channels.evicted_count(), 1);
        assert!(channels.is_free(Channel::A, 17));
        assert!(!channels.is_free(Channel::B, 0));
        assert_eq!(channels.reservation_count(), MAX_RESERVATIONS);
    }

    #[test]
    fn default_channel_pair() {
        let mut channels = ChannelManager::new();
        assert_eq!(channels.vhf(Channel::A).itu(), 87);
        assert_eq!(channels.vhf(Channel::B).itu(), 88);
        assert_eq!(Channel::A.other(), Channel::B);
        channels.set_channel_pair(VhfChannel::Ch78, VhfChannel::Ch18);
        assert_eq!(channels.vhf(Channel::B), VhfChannel::Ch18);
    }
}
