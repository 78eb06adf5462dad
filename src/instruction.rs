//! DMA-330 instruction encoder
//!
//! Each method appends one instruction to a [`Program`]. Immediates are
//! little endian. When there's no room left for the instruction (and the
//! end marker that follows it) the method returns [`Error::NoSpace`] and
//! leaves the program untouched.

use crate::{
    program::{Program, LOOP_COUNTERS},
    Error, Result,
};

/// Instruction opcodes.
pub mod op {
    pub const END: u8 = 0x00;
    pub const KILL: u8 = 0x01;
    pub const LD: u8 = 0x04;
    pub const ST: u8 = 0x08;
    pub const STZ: u8 = 0x0C;
    pub const RMB: u8 = 0x12;
    pub const WMB: u8 = 0x13;
    pub const NOP: u8 = 0x18;
    pub const LP: u8 = 0x20;
    pub const LPEND: u8 = 0x28;
    pub const SEV: u8 = 0x34;
    pub const WFE: u8 = 0x36;
    pub const GO: u8 = 0xA0;
    pub const MOV: u8 = 0xBC;

    /// Loop end "not forever" flag.
    pub const LPEND_NF: u8 = 1 << 4;
    /// Loop counter select, for DMALP.
    pub const LP_LC_SHIFT: u8 = 1;
    /// Loop counter select, for DMALPEND.
    pub const LPEND_LC_SHIFT: u8 = 2;
    /// DMAGO non-secure flag.
    pub const GO_NS: u8 = 1 << 1;
}

/// Highest event number a program may signal or wait on.
///
/// Event 31 is reserved for the abort interrupt.
pub const MAX_EVENT: u8 = 30;

/// The abort interrupt.
pub const ABORT_EVENT: u8 = 31;

/// Most iterations a single loop counter supports.
pub const MAX_LOOP_ITERATIONS: u16 = 256;

/// Longest backward jump a loop end can express.
pub const MAX_LOOP_JUMP: usize = 255;

/// Request type condition for loads and stores
///
/// Conditional instructions only execute when the last peripheral request
/// matches. Memory-to-memory programs use `Always`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Always,
    Single,
    Burst,
}

impl Condition {
    /// The `bs` and `x` bits.
    const fn bits(self) -> u8 {
        match self {
            Condition::Always => 0b00,
            Condition::Single => 0b01,
            Condition::Burst => 0b11,
        }
    }
}

/// DMAMOV destination register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    /// Source address register (SAR)
    Source = 0,
    /// Channel control register (CCR)
    Control = 1,
    /// Destination address register (DAR)
    Destination = 2,
}

fn check_event(event: u8) -> Result<()> {
    if event > MAX_EVENT {
        return Err(Error::BadId);
    }
    Ok(())
}

impl Program {
    /// `DMAMOV`: write `value` into one of the channel's registers.
    pub fn mov(&mut self, register: Register, value: u32) -> Result<()> {
        let [b0, b1, b2, b3] = value.to_le_bytes();
        self.push(&[op::MOV, register as u8, b0, b1, b2, b3])
    }

    /// `DMALD`: load a burst into the FIFO.
    pub fn load(&mut self, condition: Condition) -> Result<()> {
        self.push(&[op::LD | condition.bits()])
    }

    /// `DMAST`: store a burst from the FIFO.
    pub fn store(&mut self, condition: Condition) -> Result<()> {
        self.push(&[op::ST | condition.bits()])
    }

    /// `DMASTZ`: store a burst of zeros.
    pub fn store_zero(&mut self) -> Result<()> {
        self.push(&[op::STZ])
    }

    /// `DMALP`: open a counted loop at the end of the program.
    ///
    /// Returns the offset of the first instruction in the loop body. Pass
    /// that to [`loop_end`](Program::loop_end).
    pub fn loop_start(&mut self, iterations: u16, counter: u8) -> Result<usize> {
        let offset = self.len();
        self.insert_loop_start(offset, iterations, counter)
    }

    /// `DMALP`, inserted at `offset` in front of instructions that are
    /// already in the program.
    ///
    /// Everything from `offset` moves two bytes forward. Returns the offset
    /// of the first instruction in the loop body.
    pub fn insert_loop_start(&mut self, offset: usize, iterations: u16, counter: u8) -> Result<usize> {
        if !(1..=MAX_LOOP_ITERATIONS).contains(&iterations) {
            return Err(Error::OutOfRange);
        }
        if counter >= LOOP_COUNTERS {
            return Err(Error::BadId);
        }
        if self.open_counters() & (1 << counter) != 0 {
            return Err(Error::InUse);
        }
        let encoded = [op::LP | (counter << op::LP_LC_SHIFT), (iterations - 1) as u8];
        self.insert(offset, &encoded)?;
        self.open_counter(counter)?;
        Ok(offset + encoded.len())
    }

    /// `DMALPEND` / `DMALPFE`: close the loop whose body starts at `body_start`.
    pub fn loop_end(&mut self, body_start: usize, forever: bool, counter: u8) -> Result<()> {
        if counter >= LOOP_COUNTERS || self.open_counters() & (1 << counter) == 0 {
            return Err(Error::BadId);
        }
        if body_start > self.len() {
            return Err(Error::OutOfRange);
        }
        let jump = self.len() - body_start;
        if jump > MAX_LOOP_JUMP {
            return Err(Error::OutOfRange);
        }
        let nf = if forever { 0 } else { op::LPEND_NF };
        self.push(&[op::LPEND | nf | (counter << op::LPEND_LC_SHIFT), jump as u8])?;
        self.close_counter(counter)
    }

    /// `DMASEV`: signal `event`.
    pub fn send_event(&mut self, event: u8) -> Result<()> {
        check_event(event)?;
        self.push(&[op::SEV, event << 3])
    }

    /// `DMAWFE`: wait for `event`, optionally invalidating the instruction cache.
    pub fn wait_for_event(&mut self, event: u8, invalidate: bool) -> Result<()> {
        check_event(event)?;
        self.push(&[op::WFE, (event << 3) | ((invalidate as u8) << 1)])
    }

    /// `DMARMB`
    pub fn read_barrier(&mut self) -> Result<()> {
        self.push(&[op::RMB])
    }

    /// `DMAWMB`
    pub fn write_barrier(&mut self) -> Result<()> {
        self.push(&[op::WMB])
    }

    /// `DMANOP`
    pub fn nop(&mut self) -> Result<()> {
        self.push(&[op::NOP])
    }

    /// `DMAEND`
    pub fn end(&mut self) -> Result<()> {
        self.push(&[op::END])
    }

    /// `DMAKILL`. Only valid through the debug interface.
    pub fn kill(&mut self) -> Result<()> {
        self.push(&[op::KILL])
    }

    /// `DMAGO`: start `channel` at `address`. Only valid on the manager thread.
    pub fn go(&mut self, channel: usize, address: u32, nonsecure: bool) -> Result<()> {
        if channel >= crate::ral::dma330::CHANNELS {
            return Err(Error::BadId);
        }
        let ns = if nonsecure { op::GO_NS } else { 0 };
        let [b0, b1, b2, b3] = address.to_le_bytes();
        self.push(&[op::GO | ns, channel as u8, b0, b1, b2, b3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program() -> Program {
        Program::new(64, false).unwrap()
    }

    #[test]
    fn single_byte_encodings() {
        let mut p = program();
        p.load(Condition::Always).unwrap();
        p.load(Condition::Single).unwrap();
        p.load(Condition::Burst).unwrap();
        p.store(Condition::Always).unwrap();
        p.store(Condition::Single).unwrap();
        p.store(Condition::Burst).unwrap();
        p.store_zero().unwrap();
        p.read_barrier().unwrap();
        p.write_barrier().unwrap();
        p.nop().unwrap();
        p.kill().unwrap();
        p.end().unwrap();
        assert_eq!(
            p.as_bytes(),
            &[0x04, 0x05, 0x07, 0x08, 0x09, 0x0B, 0x0C, 0x12, 0x13, 0x18, 0x01, 0x00]
        );
    }

    #[test]
    fn move_is_little_endian() {
        let mut p = program();
        p.mov(Register::Source, 0x1234_5678).unwrap();
        p.mov(Register::Control, 0).unwrap();
        p.mov(Register::Destination, 0xFFFF_0001).unwrap();
        assert_eq!(
            p.as_bytes(),
            &[
                0xBC, 0, 0x78, 0x56, 0x34, 0x12, //
                0xBC, 1, 0, 0, 0, 0, //
                0xBC, 2, 0x01, 0x00, 0xFF, 0xFF,
            ]
        );
    }

    #[test]
    fn events() {
        let mut p = program();
        p.send_event(0).unwrap();
        p.send_event(7).unwrap();
        p.wait_for_event(30, true).unwrap();
        assert_eq!(p.as_bytes(), &[0x34, 0x00, 0x34, 0x38, 0x36, 0xF2]);
        assert_eq!(p.send_event(ABORT_EVENT).unwrap_err(), Error::BadId);
        assert_eq!(p.wait_for_event(31, false).unwrap_err(), Error::BadId);
        assert_eq!(p.len(), 6);
    }

    #[test]
    fn go_encoding() {
        let mut p = program();
        p.go(3, 0x0010_0000, true).unwrap();
        p.go(0, 0xAABB_CCDD, false).unwrap();
        assert_eq!(
            p.as_bytes(),
            &[0xA2, 3, 0x00, 0x00, 0x10, 0x00, 0xA0, 0, 0xDD, 0xCC, 0xBB, 0xAA]
        );
        assert_eq!(p.go(8, 0, false).unwrap_err(), Error::BadId);
    }

    #[test]
    fn counted_loop() {
        let mut p = program();
        let body = p.loop_start(256, 1).unwrap();
        assert_eq!(body, 2);
        p.load(Condition::Always).unwrap();
        p.store(Condition::Always).unwrap();
        p.loop_end(body, false, 1).unwrap();
        assert_eq!(p.as_bytes(), &[0x22, 0xFF, 0x04, 0x08, 0x3C, 0x02]);
        assert_eq!(p.loop_depth(), 0);
        assert_eq!(p.open_counters(), 0);
    }

    #[test]
    fn forever_loop() {
        let mut p = program();
        let body = p.loop_start(1, 0).unwrap();
        p.nop().unwrap();
        p.loop_end(body, true, 0).unwrap();
        assert_eq!(p.as_bytes(), &[0x20, 0x00, 0x18, 0x28, 0x01]);
    }

    #[test]
    fn loop_arguments_checked() {
        let mut p = program();
        assert_eq!(p.loop_start(0, 0).unwrap_err(), Error::OutOfRange);
        assert_eq!(p.loop_start(257, 0).unwrap_err(), Error::OutOfRange);
        assert_eq!(p.loop_start(2, 2).unwrap_err(), Error::BadId);
        p.loop_start(2, 0).unwrap();
        assert_eq!(p.loop_start(2, 0).unwrap_err(), Error::InUse);
        assert_eq!(p.loop_end(2, false, 1).unwrap_err(), Error::BadId);
        assert_eq!(p.loop_end(3, false, 0).unwrap_err(), Error::OutOfRange);
        assert_eq!(p.loop_depth(), 1);
        assert_eq!(p.validate().unwrap_err(), Error::Unterminated);
    }

    #[test]
    fn loop_jump_limit() {
        let mut p = Program::new(300, false).unwrap();
        let body = p.loop_start(2, 0).unwrap();
        for _ in 0..MAX_LOOP_JUMP {
            p.nop().unwrap();
        }
        // Exactly 255 bytes back is fine...
        let mut q = Program::new(300, false).unwrap();
        let q_body = q.loop_start(2, 0).unwrap();
        for _ in 0..MAX_LOOP_JUMP {
            q.nop().unwrap();
        }
        q.loop_end(q_body, false, 0).unwrap();
        // ...but one more isn't.
        p.nop().unwrap();
        assert_eq!(p.loop_end(body, false, 0).unwrap_err(), Error::OutOfRange);
        assert_eq!(p.loop_depth(), 1);
    }

    #[test]
    fn inserted_loop_wraps_existing_body() {
        let mut p = program();
        p.mov(Register::Control, 0).unwrap();
        let start = p.len();
        p.load(Condition::Always).unwrap();
        p.store(Condition::Always).unwrap();
        let body = p.insert_loop_start(start, 4, 0).unwrap();
        assert_eq!(body, start + 2);
        p.loop_end(body, false, 0).unwrap();
        assert_eq!(&p.as_bytes()[start..], &[0x20, 0x03, 0x04, 0x08, 0x38, 0x02]);
    }

    #[test]
    fn full_program_rejects_without_side_effects() {
        let mut p = Program::new(3, false).unwrap();
        p.nop().unwrap();
        assert_eq!(p.mov(Register::Source, 0).unwrap_err(), Error::NoSpace);
        assert_eq!(p.loop_start(1, 0).unwrap(), 3);
        assert_eq!(p.loop_start(1, 1).unwrap_err(), Error::NoSpace);
        assert_eq!(p.open_counters(), 0b01);
        assert_eq!(p.len(), 3);
    }

    #[test]
    fn end_marker_follows_every_append() {
        let mut p = program();
        let ops: [&dyn Fn(&mut Program) -> Result<()>; 6] = [
            &|p: &mut Program| p.mov(Register::Destination, 0xFFFF_FFFF),
            &|p: &mut Program| p.load(Condition::Burst),
            &|p: &mut Program| p.send_event(5),
            &|p: &mut Program| p.write_barrier(),
            &|p: &mut Program| p.go(1, u32::MAX, true),
            &|p: &mut Program| p.store(Condition::Single),
        ];
        for append in ops {
            append(&mut p).unwrap();
            assert_eq!(p.end_marker(), op::END);
        }
    }
}

