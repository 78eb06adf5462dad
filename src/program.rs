//! DMA-330 program buffers
//!
//! A [`Program`] is the byte code one channel thread executes. Instructions
//! are appended through the encoder methods in [`instruction`](crate::instruction).
//!
//! The byte after the last instruction is always `DMAEND`. If a thread runs
//! off the end of what we've written, it stops.

use alloc::vec::Vec;

use crate::{instruction::op, Error, Result};

/// Number of hardware loop counters available to a channel thread.
pub const LOOP_COUNTERS: u8 = 2;

/// A channel program
pub struct Program {
    /// `capacity + 1` bytes. The extra byte holds the end marker.
    buffer: Vec<u8>,
    /// Bytes of valid instructions.
    len: usize,
    /// Open loop nesting depth.
    loops: u8,
    /// Bit `n` set means loop counter `n` is open.
    counters: u8,
    nonsecure: bool,
    auto_free: bool,
}

/// The outcome of [`free`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freed {
    /// The program was dropped.
    Released,
    /// The program isn't auto-free, so it was kept.
    Skipped,
    /// There was nothing to free.
    Empty,
}

impl Program {
    /// Allocate a program that can hold `capacity` bytes of instructions.
    ///
    /// `auto_free` programs are dropped by the driver once the channel they're
    /// attached to completes, or is aborted.
    pub fn new(capacity: usize, auto_free: bool) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::TooSmall);
        }
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(capacity + 1)
            .map_err(|_| Error::NoMemory)?;
        buffer.resize(capacity + 1, op::END);
        Ok(Program {
            buffer,
            len: 0,
            loops: 0,
            counters: 0,
            nonsecure: false,
            auto_free,
        })
    }

    /// Run the program in the non-secure state
    pub fn nonsecure(mut self, nonsecure: bool) -> Self {
        self.nonsecure = nonsecure;
        self
    }

    /// Discard all instructions, keeping the allocation.
    pub fn reinitialise(&mut self) {
        self.len = 0;
        self.loops = 0;
        self.counters = 0;
        self.buffer[0] = op::END;
    }

    /// Maximum number of instruction bytes.
    pub fn capacity(&self) -> usize {
        self.buffer.len() - 1
    }

    /// Number of instruction bytes written so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current loop nesting depth.
    pub fn loop_depth(&self) -> u8 {
        self.loops
    }

    /// Bitmask of open loop counters.
    pub fn open_counters(&self) -> u8 {
        self.counters
    }

    pub fn is_nonsecure(&self) -> bool {
        self.nonsecure
    }

    pub fn is_auto_free(&self) -> bool {
        self.auto_free
    }

    /// The instruction bytes, not including the end marker.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    /// The byte following the last instruction.
    pub(crate) fn end_marker(&self) -> u8 {
        self.buffer[self.len]
    }

    /// Bus address of the first instruction.
    ///
    /// HPS bus addresses are 32 bits wide. A buffer the controller can't
    /// reach is [`Error::OutOfRange`].
    pub fn address(&self) -> Result<u32> {
        bus_address(self.buffer.as_ptr() as usize, cfg!(test))
    }

    /// Check that the program can be attached to a channel.
    pub fn validate(&self) -> Result<()> {
        if self.len == 0 {
            return Err(Error::Empty);
        }
        if self.len > self.capacity() {
            return Err(Error::NoSpace);
        }
        if self.end_marker() != op::END {
            return Err(Error::NoEnd);
        }
        if self.loops != 0 || self.counters != 0 {
            return Err(Error::Unterminated);
        }
        Ok(())
    }

    /// Append `bytes` as one instruction.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Result<()> {
        let end = self.len + bytes.len();
        if end > self.capacity() {
            return Err(Error::NoSpace);
        }
        self.buffer[self.len..end].copy_from_slice(bytes);
        self.buffer[end] = op::END;
        self.len = end;
        Ok(())
    }

    /// Insert `bytes` as one instruction at `offset`.
    ///
    /// Moves `[offset, len]` forward by `bytes.len()`. The moved range
    /// includes the end marker, so it stays in place after the last
    /// instruction.
    pub(crate) fn insert(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        if offset > self.len {
            return Err(Error::OutOfRange);
        }
        let count = bytes.len();
        if self.len + count > self.capacity() {
            return Err(Error::NoSpace);
        }
        self.buffer
            .copy_within(offset..=self.len, offset + count);
        self.buffer[offset..offset + count].copy_from_slice(bytes);
        self.len += count;
        Ok(())
    }

    pub(crate) fn open_counter(&mut self, counter: u8) -> Result<()> {
        if counter >= LOOP_COUNTERS {
            return Err(Error::BadId);
        }
        if self.counters & (1 << counter) != 0 {
            return Err(Error::InUse);
        }
        self.counters |= 1 << counter;
        self.loops += 1;
        Ok(())
    }

    pub(crate) fn close_counter(&mut self, counter: u8) -> Result<()> {
        if counter >= LOOP_COUNTERS || self.counters & (1 << counter) == 0 {
            return Err(Error::BadId);
        }
        self.counters &= !(1 << counter);
        self.loops -= 1;
        Ok(())
    }
}

impl core::fmt::Debug for Program {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Program")
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .field("loops", &self.loops)
            .field("nonsecure", &self.nonsecure)
            .field("auto_free", &self.auto_free)
            .finish()
    }
}

/// Drop the program held in `slot`.
///
/// With `only_if_auto`, programs that weren't allocated as auto-free are
/// left in the slot.
pub fn free(slot: &mut Option<Program>, only_if_auto: bool) -> Freed {
    match slot {
        None => Freed::Empty,
        Some(program) if only_if_auto && !program.auto_free => Freed::Skipped,
        Some(_) => {
            *slot = None;
            Freed::Released
        }
    }
}

/// The 32-bit bus address of `pointer`.
///
/// Host tests hand addresses to fake registers, which keep the low 32 bits.
fn bus_address(pointer: usize, truncate: bool) -> Result<u32> {
    match u32::try_from(pointer) {
        Ok(address) => Ok(address),
        Err(_) if truncate => Ok(pointer as u32),
        Err(_) => Err(Error::OutOfRange),
    }
}
