//! Event interrupts
//!
//! Each of the 32 events either wakes waiting threads, or raises an interrupt.
//! `INTEN` chooses. Synthesized programs signal the event numbered after
//! their channel, so bit `n` of a mask usually means channel `n`.

use crate::{
    instruction::ABORT_EVENT,
    ral::{self, dma330},
    Dma,
};

/// The abort event's interrupt bit.
pub const ABORT_IRQ: u32 = 1 << ABORT_EVENT;

impl Dma {
    /// Route the events in `mask` to interrupts.
    pub fn enable_interrupts(&mut self, mask: u32) {
        critical_section::with(|_| {
            ral::modify_reg!(dma330, self.registers, INTEN, |inten| inten | mask);
        });
    }

    /// Route the events in `mask` back to waiting threads.
    pub fn disable_interrupts(&mut self, mask: u32) {
        critical_section::with(|_| {
            ral::modify_reg!(dma330, self.registers, INTEN, |inten| inten & !mask);
        });
    }

    /// The events currently routed to interrupts.
    pub fn interrupt_enables(&self) -> u32 {
        self.registers.INTEN.read()
    }

    /// Pending interrupts.
    pub fn interrupt_flags(&self) -> u32 {
        self.registers.INTMIS.read()
    }

    /// Event status, regardless of what's enabled.
    pub fn raw_events(&self) -> u32 {
        self.registers.INT_EVENT_RIS.read()
    }

    /// Clear the pending interrupts in `mask`.
    pub fn clear_interrupts(&mut self, mask: u32) {
        self.registers.INTCLR.write(mask);
    }

    /// Handle a DMA interrupt.
    ///
    /// Clears every pending flag, then polls the channels so that their
    /// state reflects what raised the interrupt. Returns the flags that
    /// were pending.
    pub fn on_interrupt(&mut self) -> u32 {
        let flags = self.interrupt_flags();
        if flags != 0 {
            self.clear_interrupts(flags);
        }
        self.poll();
        flags
    }
}
