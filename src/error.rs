//! DMA errors and fault status

use core::fmt::{self, Debug, Display};

/// A DMA driver error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Not enough room left in the program buffer.
    NoSpace,
    /// The program buffer could not be allocated.
    NoMemory,
    /// A program needs at least one byte of capacity.
    TooSmall,
    /// The program holds no instructions.
    Empty,
    /// The program isn't terminated by an end instruction.
    NoEnd,
    /// The program still has open loops.
    Unterminated,
    /// A value doesn't fit its encoding, like a loop jump or an iteration count.
    OutOfRange,
    /// The channel, or loop counter, already has something attached.
    InUse,
    /// The channel is executing, or hasn't reached the requested state.
    Busy,
    /// The channel has no program waiting to be started.
    NotReady,
    /// Invalid channel, event, or loop counter identifier.
    BadId,
    /// An address or length isn't aligned when strict alignment is required.
    Alignment,
    /// The requested source or destination kind isn't supported.
    WrongMode,
    /// The hardware reported a fault.
    Io(Fault),
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoSpace => f.write_str("program buffer is full"),
            Error::NoMemory => f.write_str("cannot allocate program buffer"),
            Error::TooSmall => f.write_str("program capacity is zero"),
            Error::Empty => f.write_str("program is empty"),
            Error::NoEnd => f.write_str("program is missing its end marker"),
            Error::Unterminated => f.write_str("program has unterminated loops"),
            Error::OutOfRange => f.write_str("value out of range"),
            Error::InUse => f.write_str("resource already in use"),
            Error::Busy => f.write_str("channel busy"),
            Error::NotReady => f.write_str("channel has no program ready"),
            Error::BadId => f.write_str("invalid identifier"),
            Error::Alignment => f.write_str("misaligned transfer"),
            Error::WrongMode => f.write_str("unsupported transfer mode"),
            Error::Io(fault) => write!(f, "hardware fault: {fault}"),
        }
    }
}

/// A wrapper around a DMA fault type value
///
/// The wrapper contains a copy of a thread's fault type register at the
/// point the fault was observed. Channel threads report through `FTRn`,
/// the manager through `FTRD`. Both share the bit positions decoded by
/// `Display`; bits that don't exist for the manager read as zero.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Fault {
    /// The raw fault type
    ftr: u32,
}

impl Fault {
    pub(crate) const fn new(ftr: u32) -> Self {
        Fault { ftr }
    }
    /// Returns the raw fault type value
    pub const fn raw(self) -> u32 {
        self.ftr
    }
}

impl Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DMA_FTR({:#010X})", self.ftr)
    }
}

impl Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,
             "DMA_FTR: LOCKUP {lockup} DBG {dbg} RD {rd} WR {wr} FETCH {fetch} ST_DATA {st_data} MFIFO {mfifo} RDWR {rdwr} PERIPH {periph} EVNT {evnt} DMAGO {dmago} OPERAND {operand} UNDEF {undef}",
             lockup = (self.ftr >> 31) & 0x1,
             dbg = (self.ftr >> 30) & 0x1,
             rd = (self.ftr >> 18) & 0x1,
             wr = (self.ftr >> 17) & 0x1,
             fetch = (self.ftr >> 16) & 0x1,
             st_data = (self.ftr >> 13) & 0x1,
             mfifo = (self.ftr >> 12) & 0x1,
             rdwr = (self.ftr >> 7) & 0x1,
             periph = (self.ftr >> 6) & 0x1,
             evnt = (self.ftr >> 5) & 0x1,
             dmago = (self.ftr >> 4) & 0x1,
             operand = (self.ftr >> 1) & 0x1,
             undef = self.ftr & 0x1
         )
    }
}
