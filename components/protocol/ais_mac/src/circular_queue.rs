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

//! Lock-free ring buffer between interrupt handlers and the station loop
//!
//! The push side may run in interrupt context while the pop side runs in the main loop. There is
//! exactly one producer and one consumer; `heapless::spsc` publishes the head and tail indices with
//! release/acquire ordering so an item is fully written before the consumer can see it.

use core::sync::atomic::{AtomicU32, Ordering};
use heapless::spsc::{Consumer, Producer, Queue};

/// Single producer single consumer ring buffer holding up to `N - 1` items
pub struct CircularQueue<T, const N: usize> {
    queue: Queue<T, N>,
    /// Pushes rejected because the queue was full
    dropped: AtomicU32,
}

impl<T, const N: usize> CircularQueue<T, N> {
    pub const fn new() -> Self {
        Self {
            queue: Queue::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Split into the producer (interrupt) and consumer (main loop) halves
    pub fn split(&mut self) -> (QueueProducer<'_, T, N>, QueueConsumer<'_, T, N>) {
        let (producer, consumer) = self.queue.split();
        (
            QueueProducer {
                inner: producer,
                dropped: &self.dropped,
            },
            QueueConsumer {
                inner: consumer,
                dropped: &self.dropped,
            },
        )
    }

    pub const fn capacity(&self) -> usize {
        N - 1
    }
}

impl<T, const N: usize> Default for CircularQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct QueueProducer<'a, T, const N: usize> {
    inner: Producer<'a, T, N>,
    dropped: &'a AtomicU32,
}

impl<T, const N: usize> QueueProducer<'_, T, N> {
    /// Append an item, never blocks
    ///
    /// Returns false and counts the item as dropped if the queue is full. An unread item is never
    /// overwritten.
    pub fn try_push(&mut self, item: T) -> bool {
        match self.inner.enqueue(item) {
            Ok(()) => true,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Whether there is room for at least one more item
    pub fn is_safe_to_write(&self) -> bool {
        self.inner.ready()
    }

    pub fn free_slots(&self) -> usize {
        N - 1 - self.inner.len()
    }

    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

pub struct QueueConsumer<'a, T, const N: usize> {
    inner: Consumer<'a, T, N>,
    dropped: &'a AtomicU32,
}

impl<T, const N: usize> QueueConsumer<'_, T, N> {
    /// Take the oldest item, never blocks
    pub fn try_pop(&mut self) -> Option<T> {
        self.inner.dequeue()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.inner.ready()
    }

    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}
