//! A channel thread interpreter for tests
//!
//! Runs channel programs against a flat byte array. Only the memory-to-memory
//! subset is modelled: no peripherals, no endian swap, and no FIFO depth limit.

extern crate std;

use std::{collections::VecDeque, vec, vec::Vec};

use crate::{instruction::op, ral::dma330::channel::CCR};

/// Instructions executed before the interpreter gives up.
const BUDGET: usize = 1 << 24;

macro_rules! field {
    ($value:expr, $field:ident) => {
        ($value & CCR::$field::mask) >> CCR::$field::offset
    };
}

pub struct Machine {
    memory: Vec<u8>,
    sar: u32,
    dar: u32,
    ccr: u32,
    lc: [u8; 2],
    fifo: VecDeque<u8>,
    events: Vec<u8>,
}

/// One side of the channel control register.
struct Side {
    beat: u32,
    beats: u32,
    increment: bool,
}

impl Machine {
    pub fn new(size: usize) -> Self {
        Machine {
            memory: vec![0; size],
            sar: 0,
            dar: 0,
            ccr: 0,
            lc: [0; 2],
            fifo: VecDeque::new(),
            events: Vec::new(),
        }
    }

    /// Fill memory with bytes that don't repeat on any small period.
    pub fn fill_pattern(&mut self) {
        for (index, byte) in self.memory.iter_mut().enumerate() {
            *byte = ((index as u32).wrapping_mul(0x9E37_79B1) >> 24) as u8;
        }
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn fifo_len(&self) -> usize {
        self.fifo.len()
    }

    /// Events signalled so far, in order.
    pub fn events(&self) -> &[u8] {
        &self.events
    }

    fn source(&self) -> Side {
        Side {
            beat: 1 << field!(self.ccr, SRC_BURST_SIZE),
            beats: field!(self.ccr, SRC_BURST_LEN) + 1,
            increment: field!(self.ccr, SRC_INC) != 0,
        }
    }

    fn destination(&self) -> Side {
        Side {
            beat: 1 << field!(self.ccr, DST_BURST_SIZE),
            beats: field!(self.ccr, DST_BURST_LEN) + 1,
            increment: field!(self.ccr, DST_INC) != 0,
        }
    }

    /// Byte addresses touched by one burst starting at `address`.
    ///
    /// An unaligned incrementing burst is cut short by the misalignment.
    /// Returns the addresses and the updated address register.
    fn burst(side: &Side, address: u32) -> (Vec<u32>, u32) {
        if side.increment {
            let count = side.beats * side.beat - address % side.beat;
            ((address..address + count).collect(), address + count)
        } else {
            assert_eq!(address % side.beat, 0, "unaligned fixed address {address:#x}");
            let addresses = (0..side.beats)
                .flat_map(|_| address..address + side.beat)
                .collect();
            (addresses, address)
        }
    }

    fn load(&mut self) {
        let (addresses, next) = Self::burst(&self.source(), self.sar);
        for address in addresses {
            self.fifo.push_back(self.memory[address as usize]);
        }
        self.sar = next;
    }

    fn store(&mut self, zero: bool) {
        let (addresses, next) = Self::burst(&self.destination(), self.dar);
        for address in addresses {
            let byte = if zero {
                0
            } else {
                self.fifo
                    .pop_front()
                    .unwrap_or_else(|| panic!("FIFO underflow storing to {address:#x}"))
            };
            self.memory[address as usize] = byte;
        }
        self.dar = next;
    }

    /// Execute `program` until `DMAEND`.
    pub fn run(&mut self, program: &[u8]) {
        let imm32 = |at: usize| u32::from_le_bytes([program[at], program[at + 1], program[at + 2], program[at + 3]]);
        let mut pc = 0;
        for _ in 0..BUDGET {
            let byte = program[pc];
            match byte {
                op::END => return,
                op::MOV => {
                    let value = imm32(pc + 2);
                    match program[pc + 1] {
                        0 => self.sar = value,
                        1 => self.ccr = value,
                        2 => self.dar = value,
                        other => panic!("DMAMOV to register {other}"),
                    }
                    pc += 6;
                }
                b if b & !0b11 == op::LD => {
                    self.load();
                    pc += 1;
                }
                b if b & !0b11 == op::ST => {
                    self.store(false);
                    pc += 1;
                }
                op::STZ => {
                    self.store(true);
                    pc += 1;
                }
                op::RMB | op::WMB | op::NOP => pc += 1,
                op::SEV => {
                    self.events.push(program[pc + 1] >> 3);
                    pc += 2;
                }
                b if b & !(1 << op::LP_LC_SHIFT) == op::LP => {
                    let counter = (b >> op::LP_LC_SHIFT) & 1;
                    self.lc[counter as usize] = program[pc + 1];
                    pc += 2;
                }
                b if b & !(op::LPEND_NF | (1 << op::LPEND_LC_SHIFT)) == op::LPEND => {
                    let counter = ((b >> op::LPEND_LC_SHIFT) & 1) as usize;
                    let jump = program[pc + 1] as usize;
                    if b & op::LPEND_NF == 0 {
                        pc -= jump;
                    } else if self.lc[counter] == 0 {
                        pc += 2;
                    } else {
                        self.lc[counter] -= 1;
                        pc -= jump;
                    }
                }
                other => panic!("unsupported instruction {other:#04x} at {pc}"),
            }
        }
        panic!("program didn't end");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        instruction::{Condition, Register},
        program::Program,
    };

    #[test]
    fn nested_loops_multiply() {
        let mut p = Program::new(64, false).unwrap();
        p.mov(Register::Source, 0).unwrap();
        p.mov(Register::Destination, 0x100).unwrap();
        // One byte per burst, both sides incrementing.
        p.mov(Register::Control, 1 | (1 << 14)).unwrap();
        let outer = p.loop_start(3, 1).unwrap();
        let inner = p.loop_start(5, 0).unwrap();
        p.load(Condition::Always).unwrap();
        p.store(Condition::Always).unwrap();
        p.loop_end(inner, false, 0).unwrap();
        p.loop_end(outer, false, 1).unwrap();
        p.send_event(4).unwrap();
        p.end().unwrap();

        let mut machine = Machine::new(0x200);
        machine.fill_pattern();
        machine.run(p.as_bytes());
        let memory = machine.memory();
        assert_eq!(&memory[0x100..0x10F], &memory[..15]);
        assert_ne!(memory[0x10F], memory[15]);
        assert_eq!(machine.events(), &[4]);
    }

    #[test]
    fn unaligned_store_is_cut_short() {
        let mut p = Program::new(64, false).unwrap();
        p.mov(Register::Source, 0).unwrap();
        p.mov(Register::Destination, 0x103).unwrap();
        // Four beats of four bytes on both sides.
        p.mov(Register::Control, 1 | (2 << 1) | (3 << 4) | (1 << 14) | (2 << 15) | (3 << 18))
            .unwrap();
        p.load(Condition::Always).unwrap();
        p.store(Condition::Always).unwrap();
        p.end().unwrap();

        let mut machine = Machine::new(0x200);
        machine.run(p.as_bytes());
        assert_eq!(machine.fifo_len(), 3);
    }
}
