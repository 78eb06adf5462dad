//! DMA-330 driver for the Cyclone V and Arria 10 SoC FPGA hard processor
//! system (HPS).
//!
//! `hps-dma` provides
//!
//! - an assembler for DMA-330 channel programs.
//! - a memcpy program synthesizer that handles any alignment of the source
//!   and destination.
//! - a driver for the eight channel threads, with polled completion, fault
//!   reporting, and abort.
//!
//! # Getting started
//!
//! Create a [`Dma`] from the controller and reset manager addresses, or use
//! [`Dma::hps`] for the addresses of the device selected by the crate
//! features (`cyclone-v`, the default, or `arria10`). Then take the
//! controller out of reset with [`init`](Dma::init).
//!
//! ```no_run
//! use hps_dma::{channel::ChannelParams, Dma, Error};
//!
//! // Safety: this is the only driver for the HPS DMA controller.
//! let mut dma = unsafe { Dma::hps() }.unwrap();
//! dma.init();
//!
//! let params = ChannelParams::new(0);
//! dma.memcpy(0x0010_0000, 0x0020_0000, 4096, &params, true).unwrap();
//! loop {
//!     match dma.completed(0) {
//!         Ok(()) => break,
//!         Err(Error::Busy) => continue,
//!         Err(err) => panic!("{err}"),
//!     }
//! }
//! ```
//!
//! For anything memcpy doesn't cover, assemble a [`Program`] yourself and
//! attach it with [`setup_transfer`](Dma::setup_transfer).
//!
//! The driver allocates program buffers, so it needs a global allocator.
//! It uses [`critical-section`](https://docs.rs/critical-section) to guard
//! shared register updates, and [`log`](https://docs.rs/log) for state
//! transitions and faults.
//!
//! ### License
//!
//! Licensed under either of
//!
//! - [Apache License, Version 2.0](http://www.apache.org/licenses/LICENSE-2.0) ([LICENSE-APACHE](./LICENSE-APACHE))
//! - [MIT License](http://opensource.org/licenses/MIT) ([LICENSE-MIT](./LICENSE-MIT))
//!
//! at your option.
//!
//! Unless you explicitly state otherwise, any contribution intentionally submitted
//! for inclusion in the work by you, as defined in the Apache-2.0 license, shall be
//! dual licensed as above, without any additional terms or conditions.

#![no_std]

extern crate alloc;

pub mod channel;
mod debug;
mod error;
pub mod instruction;
mod interrupt;
pub mod memcpy;
pub mod program;
mod ral;
#[cfg(test)]
mod sim;
mod status;

pub use channel::{ChannelParams, ChannelState};
pub use error::{Error, Fault};
pub use interrupt::ABORT_IRQ;
pub use program::Program;
pub use status::{ChannelRegisters, ChannelStatus, Configuration, ManagerStatus, ThreadState};

use channel::Slot;
use ral::{
    dma330::{self, CHANNELS},
    rstmgr::{self, ResetLine},
    Static,
};

/// A DMA result
pub type Result<T> = core::result::Result<T, Error>;

/// How to [`abort`](Dma::abort)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Abort {
    /// Leave the aborted state, releasing the controller from reset.
    None,
    /// Kill every channel thread. Channels report
    /// [`Aborted`](ChannelState::Aborted) once they stop.
    Safe,
    /// Hold the controller in reset. Every channel is aborted right away.
    Force,
}

/// A DMA-330 driver.
///
/// `Dma` owns the controller registers, the reset line that holds the
/// controller in reset, and the programs attached to its channels.
/// Dropping the driver puts the controller back into reset.
pub struct Dma {
    registers: Static<dma330::RegisterBlock>,
    reset: ResetLine,
    channels: [Slot; CHANNELS],
    manager_fault: Option<Fault>,
    abort_pending: bool,
    /// Staging buffer for debug instructions.
    debug: Program,
    watchdog: Option<fn()>,
}

// Safety: the driver has exclusive use of the controller, and all access
// goes through `&mut self` or a critical section.
unsafe impl Send for Dma {}

impl Dma {
    /// Create the DMA driver.
    ///
    /// The controller is left as it is. Call [`init`](Dma::init) before
    /// setting up transfers.
    ///
    /// # Safety
    ///
    /// Caller must make sure that `controller` is a pointer to the start of
    /// the DMA-330 register block, and that `reset` points to the reset
    /// manager register holding the controller's reset bit, `reset_mask`.
    /// There must be no other driver for the controller.
    pub unsafe fn new(controller: *const (), reset: *const (), reset_mask: u32) -> Result<Self> {
        Ok(Dma {
            registers: Static(controller.cast()),
            reset: ResetLine::new(reset, reset_mask),
            channels: core::array::from_fn(|_| Slot::new()),
            manager_fault: None,
            abort_pending: false,
            debug: Program::new(debug::DEBUG_CAPACITY, false)?,
            watchdog: None,
        })
    }

    /// Create the driver for the HPS's secure DMA-330.
    ///
    /// # Safety
    ///
    /// There must be no other driver for the controller.
    pub unsafe fn hps() -> Result<Self> {
        Self::new(
            rstmgr::DMA_BASE as *const (),
            rstmgr::MODRST as *const (),
            rstmgr::DMA_MASK,
        )
    }

    /// Feed a watchdog while the driver waits on the hardware.
    pub fn set_watchdog(&mut self, watchdog: Option<fn()>) {
        self.watchdog = watchdog;
    }

    /// Release the controller from reset and quiet its interrupts.
    pub fn init(&mut self) {
        self.reset.deassert();
        critical_section::with(|_| self.registers.INTEN.write(0));
        self.registers.INTCLR.write(u32::MAX);
        self.poll();
        log::debug!("DMA-330 ready");
    }

    /// The last fault observed on the manager thread.
    pub fn manager_fault(&self) -> Option<Fault> {
        self.manager_fault
    }

    /// Returns `true` while the controller is held in reset.
    pub fn is_held_in_reset(&self) -> bool {
        self.reset.is_asserted()
    }

    /// Abort transfers, or recover from an abort.
    ///
    /// A safe abort kills every channel thread. Waiting programs report
    /// [`Aborted`](ChannelState::Aborted) right away, and running ones once
    /// their thread stops. A forced abort reports every channel aborted and
    /// can't fail. Either way, no new transfer can be set up until the abort
    /// is cleared with [`Abort::None`].
    pub fn abort(&mut self, abort: Abort) -> Result<()> {
        match abort {
            Abort::None => {
                self.abort_pending = false;
                self.reset.deassert();
                self.poll();
            }
            Abort::Safe => {
                if self.reset.is_asserted() {
                    return Err(Error::Busy);
                }
                self.abort_pending = true;
                for index in 0..CHANNELS {
                    self.debug_kill(debug::Thread::Channel(index))?;
                }
                for slot in &mut self.channels {
                    if slot.state == ChannelState::Ready {
                        slot.state = ChannelState::Aborted;
                    }
                }
                self.poll();
            }
            Abort::Force => {
                self.abort_pending = true;
                self.reset.assert();
                for slot in &mut self.channels {
                    slot.state = ChannelState::Aborted;
                }
                log::warn!("DMA-330 held in reset");
            }
        }
        Ok(())
    }
}

impl Drop for Dma {
    fn drop(&mut self) {
        self.reset.assert();
    }
}
