//! DMA channel parameters and the channel state machine
//!
//! Every call that depends on channel state starts with a [`poll`](Dma::poll),
//! so the software state never lags the hardware by more than one call.

use crate::{
    error::Fault,
    program::{self, Program},
    ral::{self, dma330::CHANNELS},
    status::ThreadState,
    Dma, Error, Result,
};

/// Where a transfer reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Incrementing memory addresses.
    Memory,
    /// A fixed register address.
    Register,
    /// No source; the destination is filled with zeros.
    Zero,
    /// A peripheral request interface. Not supported.
    Peripheral,
}

/// Where a transfer writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Incrementing memory addresses.
    Memory,
    /// A fixed register address.
    Register,
    /// A peripheral request interface. Not supported.
    Peripheral,
}

/// Transfer word size
///
/// The discriminant is the `log2` of the size in bytes, as encoded in
/// the channel control register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum WordSize {
    Byte = 0,
    HalfWord = 1,
    Word = 2,
    DoubleWord = 3,
    QuadWord = 4,
}

impl WordSize {
    /// Size in bytes.
    pub const fn bytes(self) -> u32 {
        1 << self as u32
    }
}

/// Endian swap applied to the data as it's stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EndianSwap {
    None = 0,
    Swap16 = 1,
    Swap32 = 2,
    Swap64 = 3,
    Swap128 = 4,
}

impl EndianSwap {
    /// Width of the swapped unit in bytes. `None` swaps nothing.
    pub const fn bytes(self) -> u32 {
        match self {
            EndianSwap::None => 0,
            _ => 1 << self as u32,
        }
    }
}

/// Describes one transfer
///
/// The protection and cache fields are the raw AXI `ARPROT` / `ARCACHE`
/// (and `AW*`) codes. Only the low three bits are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelParams {
    pub source: Source,
    pub destination: Destination,
    pub source_protection: u8,
    pub source_cache: u8,
    pub destination_protection: u8,
    pub destination_cache: u8,
    pub word_size: WordSize,
    pub endian_swap: EndianSwap,
    /// Channel that runs the transfer, `0..8`.
    pub channel: usize,
    /// Transfer one word at a time instead of in bursts.
    pub burst_disable: bool,
    /// End the program with a barrier and the channel's event.
    pub signal_complete: bool,
    /// Drop the program once the channel is done with it.
    pub auto_free: bool,
}

impl ChannelParams {
    /// Memory-to-memory transfer on `channel`.
    pub const fn new(channel: usize) -> Self {
        ChannelParams {
            source: Source::Memory,
            destination: Destination::Memory,
            source_protection: 0,
            source_cache: 0,
            destination_protection: 0,
            destination_cache: 0,
            word_size: WordSize::Word,
            endian_swap: EndianSwap::None,
            channel,
            burst_disable: false,
            signal_complete: true,
            auto_free: true,
        }
    }
}

impl Default for ChannelParams {
    fn default() -> Self {
        ChannelParams::new(0)
    }
}

/// Software view of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Nothing attached.
    Free,
    /// Program attached, not started.
    Ready,
    /// Executing.
    Busy,
    /// Finished. Acknowledge with [`completed`](Dma::completed).
    Done,
    /// The channel faulted. Sticky until the next setup.
    Error,
    /// Killed or reset. Acknowledge with [`aborted`](Dma::aborted).
    Aborted,
}

pub(crate) struct Slot {
    pub(crate) state: ChannelState,
    pub(crate) fault: Option<Fault>,
    pub(crate) program: Option<Program>,
}

impl Slot {
    pub(crate) const fn new() -> Self {
        Slot {
            state: ChannelState::Free,
            fault: None,
            program: None,
        }
    }

    /// Back to free, dropping an auto-free program.
    fn release(&mut self) {
        self.state = ChannelState::Free;
        program::free(&mut self.program, true);
    }
}

/// The manager fault that showed up between two reads of the fault registers.
///
/// The manager's fault bit is latched, so only a change counts.
fn new_fault(before: Option<Fault>, after: Option<Fault>) -> Option<Fault> {
    match after {
        Some(fault) if before != after => Some(fault),
        _ => None,
    }
}

pub(crate) fn check(index: usize) -> Result<()> {
    if index < CHANNELS {
        Ok(())
    } else {
        Err(Error::BadId)
    }
}

impl Dma {
    /// Update every channel's state from the hardware.
    ///
    /// Only channels with a program waiting or running follow their thread.
    /// A faulting channel moves to [`ChannelState::Error`] no matter what
    /// its status says. Nothing is read while the controller is held in
    /// reset.
    pub fn poll(&mut self) {
        if self.reset.is_asserted() {
            return;
        }
        let faulting = self.registers.FSRC.read();
        for index in 0..CHANNELS {
            let thread = self.thread_status(index).state;
            let slot = &mut self.channels[index];
            let live = matches!(slot.state, ChannelState::Ready | ChannelState::Busy);
            let mut next = match thread {
                ThreadState::Stopped if slot.state == ChannelState::Busy => {
                    if self.abort_pending {
                        ChannelState::Aborted
                    } else {
                        ChannelState::Done
                    }
                }
                ThreadState::Killing if live => ChannelState::Aborted,
                ThreadState::Stopped | ThreadState::Killing => slot.state,
                _ if live => ChannelState::Busy,
                _ => slot.state,
            };
            if faulting & (1 << index) != 0 {
                let fault = Fault::new(self.registers.FTR[index].read());
                if slot.fault != Some(fault) {
                    log::warn!("channel {index} fault: {fault}");
                }
                slot.fault = Some(fault);
                next = ChannelState::Error;
            }
            if next != slot.state {
                log::debug!("channel {index}: {:?} -> {:?}", slot.state, next);
                slot.state = next;
            }
        }

        if let Some(fault) = self.manager_fault_status() {
            if self.manager_fault != Some(fault) {
                log::warn!("manager fault: {fault}");
            }
            self.manager_fault = Some(fault);
        }
    }

    /// Attach `program` to channel `index`.
    ///
    /// Fails with [`Error::InUse`] if the channel already has a program
    /// waiting, or [`Error::Busy`] if it's executing. While an abort is
    /// pending, every setup is [`Error::Busy`]; clear the abort with
    /// [`Abort::None`](crate::Abort::None) first. With `auto_start`, the
    /// transfer starts right away; if that fails, the channel goes back to
    /// free and the error is returned.
    ///
    /// A non-auto-free program stays with the channel after it's done. Get it
    /// back with [`take_program`](Dma::take_program).
    pub fn setup_transfer(&mut self, index: usize, program: Program, auto_start: bool) -> Result<()> {
        self.poll();
        check(index)?;
        if self.reset.is_asserted() || self.abort_pending {
            return Err(Error::Busy);
        }
        match self.channels[index].state {
            ChannelState::Ready => return Err(Error::InUse),
            ChannelState::Busy => return Err(Error::Busy),
            _ => {}
        }
        program.validate()?;

        let slot = &mut self.channels[index];
        log::debug!("channel {index}: attach {:?}", program);
        slot.program = Some(program);
        slot.fault = None;
        slot.state = ChannelState::Ready;
        self.clear_interrupts(1 << index);

        if auto_start {
            if let Err(err) = self.start_transfer(index) {
                if err != Error::NotReady {
                    self.channels[index].release();
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Start the program waiting on channel `index`.
    pub fn start_transfer(&mut self, index: usize) -> Result<()> {
        self.poll();
        check(index)?;
        if self.reset.is_asserted() {
            return Err(Error::Busy);
        }
        let slot = &self.channels[index];
        let (address, nonsecure) = match (&slot.state, &slot.program) {
            (ChannelState::Ready, Some(program)) => (program.address()?, program.is_nonsecure()),
            _ => return Err(Error::NotReady),
        };

        // Program bytes must land before the controller fetches them.
        core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
        let before = self.manager_fault_status();
        self.debug_go(index, address, nonsecure)?;
        self.wait_debug_idle()?;

        let after = self.manager_fault_status();
        if let Some(fault) = new_fault(before, after) {
            log::warn!("DMAGO for channel {index} faulted: {fault}");
            self.manager_fault = Some(fault);
            return Err(Error::Io(fault));
        }

        log::debug!("channel {index}: Ready -> Busy");
        self.channels[index].state = ChannelState::Busy;
        Ok(())
    }

    /// The manager's fault, if the manager thread is faulting.
    fn manager_fault_status(&self) -> Option<Fault> {
        if ral::read_reg!(ral::dma330, self.registers, FSRD, FS_MGR == 1) {
            Some(Fault::new(self.registers.FTRD.read()))
        } else {
            None
        }
    }

    /// Start every channel that has a program waiting.
    pub fn start_ready(&mut self) -> Result<()> {
        for index in 0..CHANNELS {
            if self.channels[index].state == ChannelState::Ready {
                self.start_transfer(index)?;
            }
        }
        Ok(())
    }

    /// Acknowledge a finished transfer.
    ///
    /// Returns `Ok` once per completion, freeing the channel. A faulted
    /// channel reports its fault. Anything else is [`Error::Busy`].
    pub fn completed(&mut self, index: usize) -> Result<()> {
        self.poll();
        check(index)?;
        let slot = &mut self.channels[index];
        match slot.state {
            ChannelState::Done => {
                slot.release();
                Ok(())
            }
            ChannelState::Error => Err(Error::Io(slot.fault.unwrap_or(Fault::new(0)))),
            _ => Err(Error::Busy),
        }
    }

    /// Acknowledge an aborted transfer.
    ///
    /// Returns `Ok` once per abort, freeing the channel. Anything else is
    /// [`Error::Busy`].
    pub fn aborted(&mut self, index: usize) -> Result<()> {
        self.poll();
        check(index)?;
        let slot = &mut self.channels[index];
        if slot.state == ChannelState::Aborted {
            slot.release();
            Ok(())
        } else {
            Err(Error::Busy)
        }
    }

    /// Returns `true` while channel `index` is executing.
    pub fn busy(&mut self, index: usize) -> Result<bool> {
        self.poll();
        check(index)?;
        Ok(self.channels[index].state == ChannelState::Busy)
    }

    /// The channel state as of the last poll.
    pub fn state(&self, index: usize) -> Result<ChannelState> {
        check(index)?;
        Ok(self.channels[index].state)
    }

    /// The last fault observed on channel `index`.
    pub fn fault(&self, index: usize) -> Result<Option<Fault>> {
        check(index)?;
        Ok(self.channels[index].fault)
    }

    /// Remove the program held by channel `index`.
    ///
    /// Not allowed while the program may still run.
    pub fn take_program(&mut self, index: usize) -> Result<Option<Program>> {
        check(index)?;
        let slot = &mut self.channels[index];
        match slot.state {
            ChannelState::Ready | ChannelState::Busy => Err(Error::Busy),
            _ => Ok(slot.program.take()),
        }
    }
}
