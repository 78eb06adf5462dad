//! A RAL-like module to support DMA-330 register access
//!
//! There's no vendor RAL for the HPS DMA controller that we'd like to pull in.
//! The channel thread status and channel register clusters are conveniently
//! represented as arrays of structs, so that's what we do here.
//!
//! The field modules follow the RAL layout, so the RAL macros work on them.

#![allow(
    non_snake_case, // Compatibility with RAL
)]

pub use ral_registers::{modify_reg, read_reg, write_reg};
use ral_registers::{RORegister, RWRegister, WORegister};

/// Define RAL field modules for a 32-bit register.
///
/// Each `NAME: offset, width` entry becomes a module with the `offset` and
/// `mask` constants that the RAL macros expect.
macro_rules! fields {
    ($($(#[$attr:meta])* $name:ident: $offset:expr, $width:expr;)*) => {
        $(
            $(#[$attr])*
            #[allow(non_upper_case_globals, non_snake_case, dead_code)]
            pub mod $name {
                pub const offset: u32 = $offset;
                pub const mask: u32 = (((1u64 << $width) - 1) as u32) << offset;
                pub mod R {}
                pub mod W {}
                pub mod RW {}
            }
        )*
    };
}

pub mod dma330;
pub mod rstmgr;

//
// Helper types for static memory
//
// Similar to the RAL's `Instance` type, but more copy.
//

pub(crate) struct Static<T>(pub(crate) *const T);
impl<T> core::ops::Deref for Static<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        // Safety: pointer points to static memory (peripheral memory)
        unsafe { &*self.0 }
    }
}
impl<T> Clone for Static<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Static<T> {}

/// Heap-backed register memory for host tests.
///
/// Reads return whatever was last written, so tests play the part of the
/// hardware by poking status registers.
#[cfg(test)]
pub(crate) mod fake {
    extern crate std;
    use std::boxed::Box;

    pub(crate) struct Page {
        words: *mut u32,
        len: usize,
    }

    impl Page {
        pub(crate) fn new(bytes: usize) -> Self {
            let len = bytes / 4;
            let words = Box::into_raw(std::vec![0u32; len].into_boxed_slice()) as *mut u32;
            Page { words, len }
        }
        pub(crate) fn base(&self) -> *const () {
            self.words as *const ()
        }
        pub(crate) fn read(&self, offset: usize) -> u32 {
            assert!(offset / 4 < self.len);
            // Safety: in bounds of our allocation.
            unsafe { self.words.add(offset / 4).read_volatile() }
        }
        pub(crate) fn write(&self, offset: usize, value: u32) {
            assert!(offset / 4 < self.len);
            // Safety: in bounds of our allocation.
            unsafe { self.words.add(offset / 4).write_volatile(value) }
        }
    }

    impl Drop for Page {
        fn drop(&mut self) {
            // Safety: pointer and length came from the boxed slice in `new`.
            unsafe {
                drop(Box::from_raw(core::ptr::slice_from_raw_parts_mut(
                    self.words, self.len,
                )))
            };
        }
    }
}
