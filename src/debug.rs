//! Debug interface commands
//!
//! The CPU can't write into a thread's instruction stream. Instead, it hands
//! the DMA-330 one instruction at a time through the debug registers. That's
//! how channels are started (`DMAGO` on the manager), killed, and how the CPU
//! signals events.
//!
//! The instruction is staged in the `Dma`'s debug buffer before it's packed
//! into `DBGINST0` and `DBGINST1`.

use crate::{
    channel,
    ral::{self, dma330},
    Dma, Error, Result,
};

/// Debug command buffer capacity. The longest instruction is six bytes.
pub(crate) const DEBUG_CAPACITY: usize = 8;

/// Debug status polls before giving up on an idle interface.
const IDLE_POLLS: u32 = 1_000_000;

/// The thread that executes a debug instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Thread {
    Manager,
    Channel(usize),
}

impl Dma {
    /// Spin until the debug interface can take an instruction.
    ///
    /// The watchdog is fed on every poll.
    pub(crate) fn wait_debug_idle(&self) -> Result<()> {
        for _ in 0..IDLE_POLLS {
            if !ral::read_reg!(dma330, self.registers, DBGSTATUS, DBGSTATUS == 1) {
                return Ok(());
            }
            if let Some(feed) = self.watchdog {
                feed();
            }
            core::hint::spin_loop();
        }
        log::warn!("debug interface stuck busy");
        Err(Error::Busy)
    }

    /// Execute the instruction in the debug buffer on `thread`.
    fn issue(&mut self, thread: Thread) -> Result<()> {
        let (channel_thread, channel) = match thread {
            Thread::Manager => (0, 0),
            Thread::Channel(index) => {
                channel::check(index)?;
                (1, index as u32)
            }
        };
        let mut bytes = [0u8; 6];
        let instruction = self.debug.as_bytes();
        bytes[..instruction.len()].copy_from_slice(instruction);

        self.wait_debug_idle()?;
        ral::write_reg!(
            dma330,
            self.registers,
            DBGINST0,
            DEBUG_THREAD: channel_thread,
            CHANNEL_NUMBER: channel,
            INSTRUCTION_BYTE0: bytes[0] as u32,
            INSTRUCTION_BYTE1: bytes[1] as u32
        );
        self.registers
            .DBGINST1
            .write(u32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]));
        self.registers.DBGCMD.write(0);
        Ok(())
    }

    /// `DMAGO` on the manager thread.
    pub(crate) fn debug_go(&mut self, index: usize, address: u32, nonsecure: bool) -> Result<()> {
        self.debug.reinitialise();
        self.debug.go(index, address, nonsecure)?;
        self.issue(Thread::Manager)
    }

    /// `DMAKILL` on `thread`.
    pub(crate) fn debug_kill(&mut self, thread: Thread) -> Result<()> {
        self.debug.reinitialise();
        self.debug.kill()?;
        self.issue(thread)
    }

    /// Signal `event` from the manager thread.
    ///
    /// Wakes channels waiting on the event, or raises the matching interrupt
    /// if it's enabled.
    pub fn send_event(&mut self, event: u8) -> Result<()> {
        self.debug.reinitialise();
        self.debug.send_event(event)?;
        self.issue(Thread::Manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        instruction::op,
        testing::{Hardware, DBGCMD, DBGINST0, DBGINST1, DBGSTATUS},
    };

    #[test]
    fn kill_on_channel_thread() {
        let hw = Hardware::new();
        let mut dma = hw.dma();
        hw.dma.write(DBGCMD, 0xFFFF_FFFF);
        dma.debug_kill(Thread::Channel(6)).unwrap();
        assert_eq!(hw.dma.read(DBGINST0), (op::KILL as u32) << 16 | 6 << 8 | 1);
        assert_eq!(hw.dma.read(DBGINST1), 0);
        assert_eq!(hw.dma.read(DBGCMD), 0);
    }

    #[test]
    fn kill_on_manager() {
        let hw = Hardware::new();
        let mut dma = hw.dma();
        dma.debug_kill(Thread::Manager).unwrap();
        assert_eq!(hw.dma.read(DBGINST0), (op::KILL as u32) << 16);
    }

    #[test]
    fn event_from_manager() {
        let hw = Hardware::new();
        let mut dma = hw.dma();
        dma.send_event(9).unwrap();
        assert_eq!(hw.dma.read(DBGINST0), (9 << 3) << 24 | (op::SEV as u32) << 16);
        assert_eq!(dma.send_event(31).unwrap_err(), Error::BadId);
    }

    #[test]
    fn go_packs_address() {
        let hw = Hardware::new();
        let mut dma = hw.dma();
        dma.debug_go(2, 0x1234_5678, false).unwrap();
        assert_eq!(hw.dma.read(DBGINST0), 2 << 24 | (op::GO as u32) << 16);
        assert_eq!(hw.dma.read(DBGINST1), 0x1234_5678);
    }

    #[test]
    fn bad_thread() {
        let hw = Hardware::new();
        let mut dma = hw.dma();
        assert_eq!(dma.debug_kill(Thread::Channel(8)).unwrap_err(), Error::BadId);
    }

    #[test]
    fn busy_interface_feeds_watchdog() {
        use core::sync::atomic::{AtomicU32, Ordering};
        static FEEDS: AtomicU32 = AtomicU32::new(0);
        fn feed() {
            FEEDS.fetch_add(1, Ordering::Relaxed);
        }

        let hw = Hardware::new();
        let mut dma = hw.dma();
        dma.set_watchdog(Some(feed));
        hw.dma.write(DBGSTATUS, 1);
        assert_eq!(dma.send_event(0).unwrap_err(), Error::Busy);
        assert_eq!(FEEDS.load(Ordering::Relaxed), IDLE_POLLS);
    }
}
