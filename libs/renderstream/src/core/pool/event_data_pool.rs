// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! EventDataPool - stable addresses for render-thread payloads.
//!
//! Payloads handed to the render thread are read at some later point the main
//! thread never observes. The pool keeps each one in place for a fixed number
//! of frame boundaries, which must cover the deepest pipelining the driver
//! can introduce, and then reuses the slot.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr::NonNull;

/// Slots per pool.
pub const EVENT_DATA_POOL_CAPACITY: usize = 64;

/// Frame boundaries a payload outlives by default. One pipelined render frame
/// can be in flight, so two main-thread frames are kept.
pub const DEFAULT_FRAMES_TO_KEEP_ALIVE: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SlotState {
    Free,
    InUse { age: u32 },
}

/// Statistics about pool usage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventDataPoolStats {
    pub capacity: usize,
    pub in_use: usize,
    pub available: usize,
    pub exhausted_acquires: u64,
}

/// Fixed-capacity slot allocator for `T`.
///
/// Bookkeeping (`&mut self`) stays on the main thread. Payloads live in a
/// separate boxed slice whose addresses never change, so the render thread can
/// read a handed-out pointer while the main thread keeps acquiring.
pub struct EventDataPool<T: Copy> {
    payloads: Box<[UnsafeCell<MaybeUninit<T>>]>,
    slots: Vec<SlotState>,
    frames_to_keep_alive: u32,
    exhausted_acquires: u64,
}

// Payloads are plain `Copy` data written only by the owning thread; the
// render thread reads through raw pointers it was given.
unsafe impl<T: Copy + Send> Send for EventDataPool<T> {}

impl<T: Copy> EventDataPool<T> {
    pub fn new() -> Self {
        Self::with_frames_to_keep_alive(DEFAULT_FRAMES_TO_KEEP_ALIVE)
    }

    /// A window below one frame would free payloads the render thread has not
    /// read yet, so it is clamped to at least 1.
    pub fn with_frames_to_keep_alive(frames: u32) -> Self {
        let payloads = (0..EVENT_DATA_POOL_CAPACITY)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();
        Self {
            payloads,
            slots: vec![SlotState::Free; EVENT_DATA_POOL_CAPACITY],
            frames_to_keep_alive: frames.max(1),
            exhausted_acquires: 0,
        }
    }

    /// Copies `data` into the first free slot and returns its address, or
    /// `None` if every slot is in use. Never blocks or grows.
    ///
    /// The address stays valid and unmodified until the slot ages out in
    /// [`EventDataPool::on_frame_boundary`].
    pub fn try_acquire(&mut self, data: T) -> Option<NonNull<T>> {
        let Some(index) = self.slots.iter().position(|s| *s == SlotState::Free) else {
            self.exhausted_acquires += 1;
            return None;
        };

        let cell = &self.payloads[index];
        // The slot is free, so no handed-out pointer refers to it.
        let ptr = unsafe {
            let payload = &mut *cell.get();
            payload.write(data);
            NonNull::new_unchecked(payload.as_mut_ptr())
        };
        self.slots[index] = SlotState::InUse { age: 0 };
        Some(ptr)
    }

    /// Ages every in-use slot and frees those that reached the keep-alive
    /// window. Call once per frame, after the frame's acquires.
    pub fn on_frame_boundary(&mut self) {
        let keep = self.frames_to_keep_alive;
        for slot in &mut self.slots {
            if let SlotState::InUse { age } = slot {
                *age += 1;
                if *age >= keep {
                    *slot = SlotState::Free;
                }
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn in_use(&self) -> usize {
        self.slots.iter().filter(|s| **s != SlotState::Free).count()
    }

    pub fn available(&self) -> usize {
        self.capacity() - self.in_use()
    }

    pub fn frames_to_keep_alive(&self) -> u32 {
        self.frames_to_keep_alive
    }

    pub fn stats(&self) -> EventDataPoolStats {
        EventDataPoolStats {
            capacity: self.capacity(),
            in_use: self.in_use(),
            available: self.available(),
            exhausted_acquires: self.exhausted_acquires,
        }
    }
}

impl<T: Copy> Default for EventDataPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> std::fmt::Debug for EventDataPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDataPool")
            .field("capacity", &self.capacity())
            .field("in_use", &self.in_use())
            .field("frames_to_keep_alive", &self.frames_to_keep_alive)
            .finish()
    }
}
