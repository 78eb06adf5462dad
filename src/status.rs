//! Thread status and configuration decoding

use crate::{
    channel,
    ral::{self, dma330},
    Dma, Result,
};

/// Execution state of a DMA-330 thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Stopped,
    Executing,
    CacheMiss,
    UpdatingPc,
    WaitingForEvent,
    AtBarrier,
    WaitingForPeripheral,
    Killing,
    Completing,
    FaultingCompleting,
    Faulting,
    /// A status code this driver doesn't know.
    Unknown(u8),
}

impl ThreadState {
    pub fn from_raw(status: u8) -> Self {
        match status {
            0x0 => ThreadState::Stopped,
            0x1 => ThreadState::Executing,
            0x2 => ThreadState::CacheMiss,
            0x3 => ThreadState::UpdatingPc,
            0x4 => ThreadState::WaitingForEvent,
            0x5 => ThreadState::AtBarrier,
            0x7 => ThreadState::WaitingForPeripheral,
            0x8 => ThreadState::Killing,
            0x9 => ThreadState::Completing,
            0xE => ThreadState::FaultingCompleting,
            0xF => ThreadState::Faulting,
            other => ThreadState::Unknown(other),
        }
    }
}

/// Decoded channel status register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStatus {
    pub state: ThreadState,
    /// Event or peripheral the channel is waiting on.
    pub wakeup: u8,
    /// The last `DMAWFP` used the burst operand.
    pub dmawfp_burst: bool,
    /// The last `DMAWFP` used the periph operand.
    pub dmawfp_periph: bool,
    pub nonsecure: bool,
}

/// Decoded manager status register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerStatus {
    pub state: ThreadState,
    /// Event the manager is waiting on.
    pub wakeup: u8,
    pub nonsecure: bool,
}

/// A snapshot of a channel's execution registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelRegisters {
    pub source: u32,
    pub destination: u32,
    pub control: u32,
    pub loop_counters: [u8; 2],
    pub program_counter: u32,
}

/// Controller configuration, fixed when the HPS was synthesized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configuration {
    pub channels: u8,
    /// Peripheral request interfaces. Zero if there are none.
    pub peripherals: u8,
    pub events: u8,
    /// The manager boots from `boot_address` when released from reset.
    pub boot_enabled: bool,
    pub boot_address: u32,
    /// The manager starts in the non-secure state.
    pub manager_nonsecure: bool,
    /// Bit `n` set means event `n` is non-secure.
    pub event_nonsecure: u32,
    /// Bit `n` set means peripheral `n` is non-secure.
    pub peripheral_nonsecure: u32,
    pub icache_line_bytes: u16,
    pub icache_lines: u8,
    /// AXI data width in bits.
    pub data_width: u16,
    pub write_issuing: u8,
    pub write_queue_depth: u8,
    pub read_issuing: u8,
    pub read_queue_depth: u8,
    /// MFIFO lines.
    pub buffer_depth: u16,
}

impl Dma {
    /// Decode channel `index`'s status register.
    pub fn channel_status(&self, index: usize) -> Result<ChannelStatus> {
        channel::check(index)?;
        Ok(self.thread_status(index))
    }

    pub(crate) fn thread_status(&self, index: usize) -> ChannelStatus {
        let thread = &self.registers.THREAD[index];
        let (state, wakeup, burst, periph, nonsecure) = ral::read_reg!(
            dma330::thread,
            thread,
            CSR,
            STATUS,
            WAKEUP_NUMBER,
            DMAWFP_B_NS,
            DMAWFP_PERIPH,
            CNS
        );
        ChannelStatus {
            state: ThreadState::from_raw(state as u8),
            wakeup: wakeup as u8,
            dmawfp_burst: burst != 0,
            dmawfp_periph: periph != 0,
            nonsecure: nonsecure != 0,
        }
    }

    /// Decode the manager status register.
    pub fn manager_status(&self) -> ManagerStatus {
        let (state, wakeup, nonsecure) =
            ral::read_reg!(dma330, self.registers, DSR, DMA_STATUS, WAKEUP_EVENT, DNS);
        ManagerStatus {
            state: ThreadState::from_raw(state as u8),
            wakeup: wakeup as u8,
            nonsecure: nonsecure != 0,
        }
    }

    /// Snapshot channel `index`'s address, control, and loop registers.
    pub fn channel_registers(&self, index: usize) -> Result<ChannelRegisters> {
        channel::check(index)?;
        let channel = &self.registers.CHANNEL[index];
        Ok(ChannelRegisters {
            source: channel.SAR.read(),
            destination: channel.DAR.read(),
            control: channel.CCR.read(),
            loop_counters: [channel.LC0.read() as u8, channel.LC1.read() as u8],
            program_counter: self.registers.THREAD[index].CPC.read(),
        })
    }

    /// Read the configuration registers.
    pub fn configuration(&self) -> Configuration {
        let (periph_req, boot_en, mgr_ns, channels, peripherals, events) = ral::read_reg!(
            dma330,
            self.registers,
            CR0,
            PERIPH_REQ,
            BOOT_EN,
            MGR_NS_AT_RST,
            NUM_CHNLS,
            NUM_PERIPH_REQ,
            NUM_EVENTS
        );
        let (line_len, lines) = ral::read_reg!(dma330, self.registers, CR1, I_CACHE_LEN, NUM_I_CACHE_LINES);
        let (width, wr_cap, wr_q, rd_cap, rd_q, buffer) = ral::read_reg!(
            dma330,
            self.registers,
            CRD,
            DATA_WIDTH,
            WR_CAP,
            WR_Q_DEP,
            RD_CAP,
            RD_Q_DEP,
            DATA_BUFFER_DEP
        );
        Configuration {
            channels: channels as u8 + 1,
            peripherals: if periph_req != 0 { peripherals as u8 + 1 } else { 0 },
            events: events as u8 + 1,
            boot_enabled: boot_en != 0,
            boot_address: self.registers.CR2.read(),
            manager_nonsecure: mgr_ns != 0,
            event_nonsecure: self.registers.CR3.read(),
            peripheral_nonsecure: self.registers.CR4.read(),
            icache_line_bytes: 1 << line_len,
            icache_lines: lines as u8 + 1,
            data_width: 8 << width,
            write_issuing: wr_cap as u8 + 1,
            write_queue_depth: wr_q as u8 + 1,
            read_issuing: rd_cap as u8 + 1,
            read_queue_depth: rd_q as u8 + 1,
            buffer_depth: buffer as u16 + 1,
        }
    }
}
