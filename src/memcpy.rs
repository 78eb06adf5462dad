//! DMA-powered memcpy
//!
//! [`synthesize`] turns a transfer description into a channel program.
//! The program is shaped around the addresses' alignment to the word size:
//!
//! 1. a byte-granular load that brings the read address onto a word boundary,
//! 2. full bursts of words, under one or two loop counters,
//! 3. one shorter burst for the words left over,
//! 4. a byte-granular load of the trailing bytes,
//! 5. byte-granular stores of whatever the destination is still owed.
//!
//! When the read and write addresses aren't equally misaligned, the first
//! word-sized store lands short of a full burst. The destination catches up in
//! the final stores.

use crate::{
    channel::{self, ChannelParams, Destination, EndianSwap, Source},
    instruction::{Condition, Register, MAX_LOOP_ITERATIONS},
    program::Program,
    ral::dma330::channel::CCR,
    Dma, Error, Result,
};

/// Capacity of a synthesized program.
pub const PROGRAM_CAPACITY: usize = 256;

/// Most beats in one burst.
pub const MAX_BURST_LEN: u32 = 16;

/// One side of a channel control register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Burst {
    /// `log2` of the beat size.
    size: u8,
    /// Beats per burst, `1..=16`.
    len: u32,
    increment: bool,
}

impl Burst {
    const fn bytes(size: u8, len: u32, increment: bool) -> Self {
        Burst {
            size,
            len,
            increment,
        }
    }
}

macro_rules! ccr_field {
    ($field:ident: $value:expr) => {
        (($value as u32) << CCR::$field::offset) & CCR::$field::mask
    };
}

/// Channel control register value for a pair of bursts.
fn ccr(params: &ChannelParams, src: Burst, dst: Burst) -> u32 {
    ccr_field!(SRC_INC: src.increment)
        | ccr_field!(SRC_BURST_SIZE: src.size)
        | ccr_field!(SRC_BURST_LEN: src.len - 1)
        | ccr_field!(SRC_PROT_CTRL: params.source_protection)
        | ccr_field!(SRC_CACHE_CTRL: params.source_cache)
        | ccr_field!(DST_INC: dst.increment)
        | ccr_field!(DST_BURST_SIZE: dst.size)
        | ccr_field!(DST_BURST_LEN: dst.len - 1)
        | ccr_field!(DST_PROT_CTRL: params.destination_protection)
        | ccr_field!(DST_CACHE_CTRL: params.destination_cache)
        | ccr_field!(ENDIAN_SWAP_SIZE: params.endian_swap as u8)
}

/// Program builder state.
struct Synth<'a> {
    program: Program,
    params: &'a ChannelParams,
    /// Last CCR value moved into the channel.
    control: Option<u32>,
    /// Fill with zeros instead of copying.
    zero: bool,
}

impl Synth<'_> {
    fn set_bursts(&mut self, src: Burst, dst: Burst) -> Result<()> {
        let value = ccr(self.params, src, dst);
        if self.control != Some(value) {
            self.program.mov(Register::Control, value)?;
            self.control = Some(value);
        }
        Ok(())
    }

    /// One load and store pair, or a zero store.
    fn transfer(&mut self) -> Result<()> {
        if self.zero {
            self.program.store_zero()
        } else {
            self.program.load(Condition::Always)?;
            self.program.store(Condition::Always)
        }
    }

    /// Repeat [`transfer`](Synth::transfer) `count` times.
    ///
    /// Up to 256 repetitions fit one loop. Beyond that, blocks of 256 are
    /// wrapped by an outer loop on the second counter, which is inserted in
    /// front of the inner loop once it's written.
    fn repeat(&mut self, count: u32) -> Result<()> {
        let block = MAX_LOOP_ITERATIONS as u32;
        let mut blocks = count / block;
        while blocks > 0 {
            let outer = blocks.min(block);
            let start = self.program.len();
            self.counted(block)?;
            if outer > 1 {
                let body = self.program.insert_loop_start(start, outer as u16, 1)?;
                self.program.loop_end(body, false, 1)?;
            }
            blocks -= outer;
        }
        match count % block {
            0 => Ok(()),
            rest => self.counted(rest),
        }
    }

    fn counted(&mut self, iterations: u32) -> Result<()> {
        let body = self.program.loop_start(iterations as u16, 0)?;
        self.transfer()?;
        self.program.loop_end(body, false, 0)
    }
}

/// Build a program that moves `len` bytes from `read` to `write`.
///
/// The program is allocated with [`PROGRAM_CAPACITY`] bytes. Bulk data moves
/// in blocks of 256 × 256 bursts, and each block takes 10 bytes of program.
/// That caps a byte-wide copy at about 22 MiB, or about 1.4 MiB with bursts
/// disabled. Wider words raise the cap in proportion. Longer transfers fail
/// with [`Error::NoSpace`]; split them across several programs.
pub fn synthesize(read: u32, write: u32, len: u32, params: &ChannelParams) -> Result<Program> {
    channel::check(params.channel)?;
    if params.source == Source::Peripheral || params.destination == Destination::Peripheral {
        return Err(Error::WrongMode);
    }
    let word = params.word_size.bytes();
    if params.endian_swap.bytes() > word {
        return Err(Error::WrongMode);
    }

    let zero = params.source == Source::Zero;
    // A zero fill has only one side. Aliasing the read address keeps the
    // alignment math identical for both.
    let read = if zero { write } else { read };
    let src_inc = params.source != Source::Register;
    let dst_inc = params.destination != Destination::Register;
    let strict = params.endian_swap != EndianSwap::None
        || params.source == Source::Register
        || params.destination == Destination::Register;

    let read_initial = ((word - read % word) % word).min(len);
    let write_gap = (word - write % word) % word;
    let write_initial = write_gap.min(len);
    if strict && (read_initial != 0 || write_initial != 0 || len % word != 0) {
        return Err(Error::Alignment);
    }

    let mut synth = Synth {
        program: Program::new(PROGRAM_CAPACITY, params.auto_free)?,
        params,
        control: None,
        zero,
    };
    synth.program.mov(Register::Source, read)?;
    synth.program.mov(Register::Destination, write)?;

    let size = params.word_size as u8;
    // Bytes loaded but not yet stored.
    let mut owed = 0;
    // Bytes between the write address and the next word boundary.
    let mut write_gap = write_gap;

    if read_initial > 0 {
        let bytes = Burst::bytes(0, read_initial, true);
        if zero {
            synth.set_bursts(bytes, bytes)?;
            synth.program.store_zero()?;
        } else {
            synth.set_bursts(bytes, Burst::bytes(size, 1, true))?;
            synth.program.load(Condition::Always)?;
            owed += read_initial;
            // A single word store at a misaligned address only reaches the
            // next boundary. Do it now if the load covered that much.
            if write_gap > 0 && write_gap <= read_initial {
                synth.program.store(Condition::Always)?;
                owed -= write_gap;
                write_gap = 0;
            }
        }
    }

    let remaining = len - read_initial;
    let words = remaining / word;
    let tail = remaining % word;
    let burst_len = if params.burst_disable { 1 } else { MAX_BURST_LEN };

    for (count, beats) in [(words / burst_len, burst_len), (1, words % burst_len)] {
        if count == 0 || beats == 0 {
            continue;
        }
        synth.set_bursts(
            Burst::bytes(size, beats, src_inc),
            Burst::bytes(size, beats, dst_inc),
        )?;
        if beats == burst_len {
            synth.repeat(count)?;
        } else {
            synth.transfer()?;
        }
        // The first store stopped short at the word boundary.
        if !zero && write_gap > 0 {
            owed += word - write_gap;
            write_gap = 0;
        }
    }

    if tail > 0 {
        let bytes = Burst::bytes(0, tail, true);
        if zero {
            synth.set_bursts(bytes, bytes)?;
            synth.program.store_zero()?;
        } else {
            owed += tail;
            synth.set_bursts(bytes, Burst::bytes(0, owed.min(MAX_BURST_LEN), true))?;
            synth.program.load(Condition::Always)?;
        }
    }

    // Same source side as the tail load.
    let src = Burst::bytes(0, tail.max(1), true);
    while owed > 0 {
        let chunk = owed.min(MAX_BURST_LEN);
        synth.set_bursts(src, Burst::bytes(0, chunk, true))?;
        synth.program.store(Condition::Always)?;
        owed -= chunk;
    }

    if params.signal_complete {
        if params.source == Source::Memory && params.destination == Destination::Memory {
            synth.program.write_barrier()?;
        }
        synth.program.send_event(params.channel as u8)?;
    }
    synth.program.end()?;
    Ok(synth.program)
}

impl Dma {
    /// Copy `len` bytes from `read` to `write` on `params.channel`.
    ///
    /// Synthesizes the program and attaches it to the channel. See
    /// [`setup_transfer`](Dma::setup_transfer) for `auto_start`.
    pub fn memcpy(&mut self, read: u32, write: u32, len: u32, params: &ChannelParams, auto_start: bool) -> Result<()> {
        let fits = |address: u32| address.checked_add(len).is_some();
        // Zero fills never read.
        let read_fits = params.source == Source::Zero || fits(read);
        if !read_fits || !fits(write) {
            return Err(Error::OutOfRange);
        }
        let program = synthesize(read, write, len, params)?;
        self.setup_transfer(params.channel, program, auto_start)
    }
}
