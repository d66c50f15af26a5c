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

use heapless::Vec;
use serde::Serialize;

use crate::*;

/// Value of a packet, used to decide what to drop when the pool runs out of buffers
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// Exclusive reference to a buffer of a [`PacketPool`]
///
/// Neither `Clone` nor `Copy`: whoever holds the handle owns the buffer until it is handed back
/// with [`PacketPool::release`].
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PacketHandle(u8);

impl PacketHandle {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Transmit buffer
#[derive(Debug, Clone, Default)]
pub struct TxPacket {
    pub payload: Payload,
    pub channel: Channel,
    /// Slot index requested by the application, `None` for self-organised slot selection
    pub fixed_slot: Option<SlotIndex>,
    /// Slot assigned by the scheduler
    pub slot: Option<SlotNumber>,
    pub priority: Priority,
    /// Number of failed clear channel assessments
    pub retries: u8,
    pub valid: bool,
}

/// Fixed number of transmit buffers, allocated once
#[derive(Debug)]
pub struct PacketPool<const N: usize> {
    packets: [TxPacket; N],
    /// Stack of free buffer indices
    free: Vec<u8, N>,
    live: [bool; N],
}

impl<const N: usize> PacketPool<N> {
    pub fn new() -> Self {
        const {
            assert!(N > 0 && N <= u8::MAX as usize + 1);
        }
        Self {
            packets: core::array::from_fn(|_| TxPacket::default()),
            // reversed so the lowest index is handed out first
            free: (0..N).rev().map(|i| i as u8).collect(),
            live: [false; N],
        }
    }

    /// Take a free buffer, `None` if all buffers are in use
    pub fn acquire(&mut self) -> Option<PacketHandle> {
        let index = self.free.pop()?;
        self.live[index as usize] = true;
        self.packets[index as usize] = TxPacket {
            valid: true,
            ..Default::default()
        };
        Some(PacketHandle(index))
    }

    /// Hand a buffer back to the pool
    pub fn release(&mut self, handle: PacketHandle) -> Result<(), Error> {
        let index = handle.index();
        if index >= N || !self.live[index] {
            error!("release of packet {} which is not in use", index);
            return Err(Error::InvalidHandle);
        }
        self.live[index] = false;
        self.packets[index] = TxPacket::default();
        self.free
            .push(handle.0)
            .map_err(|_| Error::InvalidHandle)
    }

    pub fn get(&self, handle: &PacketHandle) -> &TxPacket {
        &self.packets[handle.index()]
    }

    pub fn get_mut(&mut self, handle: &PacketHandle) -> &mut TxPacket {
        &mut self.packets[handle.index()]
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for PacketPool<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, RngCore, SeedableRng};

    #[test]
    fn exhaustion() {
        let mut pool = PacketPool::<3>::new();
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        let c = pool.acquire().unwrap();
        assert_eq!(pool.free_count(), 0);
        assert!(pool.acquire().is_none());
        pool.release(b).unwrap();
        assert_eq!(pool.free_count(), 1);
        let d = pool.acquire().unwrap();
        assert_eq!(d.index(), 1);
        for handle in [a, c, d] {
            pool.release(handle).unwrap();
        }
        assert_eq!(pool.free_count(), pool.capacity());
    }

    #[test]
    fn double_release_is_reported() {
        let mut pool = PacketPool::<2>::new();
        let handle = pool.acquire().unwrap();
        let index = handle.index() as u8;
        pool.release(handle).unwrap();
        assert_eq!(pool.release(PacketHandle(index)), Err(Error::InvalidHandle));
        assert_eq!(pool.release(PacketHandle(7)), Err(Error::InvalidHandle));
        assert_eq!(pool.free_count(), 2);
    }

    #[test]
    fn released_packet_is_reset() {
        let mut pool = PacketPool::<1>::new();
        let handle = pool.acquire().unwrap();
        pool.get_mut(&handle).retries = 2;
        pool.get_mut(&handle).payload.push(0xaa).unwrap();
        pool.release(handle).unwrap();
        let handle = pool.acquire().unwrap();
        assert_eq!(pool.get(&handle).retries, 0);
        assert!(pool.get(&handle).payload.is_empty());
        assert!(pool.get(&handle).valid);
    }

    #[test]
    fn live_handles_never_alias() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut pool = PacketPool::<8>::new();
        let mut handles: std::vec::Vec<PacketHandle> = std::vec::Vec::new();
        for _ in 0..10_000 {
            if rng.next_u32() % 2 == 0 {
                if let Some(handle) = pool.acquire() {
                    handles.push(handle);
                } else {
                    assert_eq!(handles.len(), 8);
                }
            } else if !handles.is_empty() {
                let i = rng.next_u32() as usize % handles.len();
                pool.release(handles.swap_remove(i)).unwrap();
            }
            let mut seen = [false; 8];
            for handle in &handles {
                assert!(!seen[handle.index()], "two live handles for one buffer");
                seen[handle.index()] = true;
            }
            assert_eq!(pool.free_count() + handles.len(), 8);
        }
    }
}
