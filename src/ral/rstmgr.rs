//! Reset manager module reset line for the DMA controller
//!
//! The DMA-330 has no software reset of its own. Holding it in reset is done
//! through the HPS reset manager's peripheral module reset register.

use super::{RWRegister, Static};

cfg_if::cfg_if! {
    if #[cfg(feature = "arria10")] {
        /// Secure DMA-330 register base.
        pub const DMA_BASE: usize = 0xFFDA_1000;
        /// Reset manager PER0MODRST register.
        pub const MODRST: usize = 0xFFD0_5024;
        /// DMA bit in PER0MODRST.
        pub const DMA_MASK: u32 = 1 << 16;
    } else {
        /// Secure DMA-330 register base.
        pub const DMA_BASE: usize = 0xFFE0_1000;
        /// Reset manager PERMODRST register.
        pub const MODRST: usize = 0xFFD0_5014;
        /// DMA bit in PERMODRST.
        pub const DMA_MASK: u32 = 1 << 28;
    }
}

/// One bit in a module reset register.
#[derive(Clone, Copy)]
pub(crate) struct ResetLine {
    register: Static<RWRegister<u32>>,
    mask: u32,
}

impl ResetLine {
    pub(crate) const fn new(register: *const (), mask: u32) -> Self {
        ResetLine {
            register: Static(register.cast()),
            mask,
        }
    }

    /// Hold the module in reset.
    pub(crate) fn assert(&self) {
        critical_section::with(|_| {
            let value = self.register.read();
            self.register.write(value | self.mask);
        });
    }

    /// Release the module from reset.
    pub(crate) fn deassert(&self) {
        critical_section::with(|_| {
            let value = self.register.read();
            self.register.write(value & !self.mask);
        });
    }

    pub(crate) fn is_asserted(&self) -> bool {
        self.register.read() & self.mask != 0
    }
}
