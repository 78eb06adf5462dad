//! DMA-330 register block and fields

use super::{RORegister, RWRegister, WORegister};

/// Number of channel threads implemented in the HPS DMA-330.
pub const CHANNELS: usize = 8;

/// Channel thread status registers.
pub mod thread {
    use super::RORegister;

    #[repr(C)]
    pub struct RegisterBlock {
        /// Channel Status Register
        pub CSR: RORegister<u32>,
        /// Channel Program Counter Register
        pub CPC: RORegister<u32>,
    }

    pub mod CSR {
        fields! {
            /// Channel status nibble.
            STATUS: 0, 4;
            /// Event or peripheral number the thread waits on.
            WAKEUP_NUMBER: 4, 5;
            /// DMAWFP executed with the burst operand.
            DMAWFP_B_NS: 14, 1;
            /// DMAWFP executed with the periph operand.
            DMAWFP_PERIPH: 15, 1;
            /// Channel runs in the non-secure state.
            CNS: 21, 1;
        }
    }
}

/// Channel execution registers (AXI status and loop counters).
pub mod channel {
    use super::RORegister;

    #[repr(C)]
    pub struct RegisterBlock {
        /// Source Address Register
        pub SAR: RORegister<u32>,
        /// Destination Address Register
        pub DAR: RORegister<u32>,
        /// Channel Control Register
        pub CCR: RORegister<u32>,
        /// Loop Counter 0 Register
        pub LC0: RORegister<u32>,
        /// Loop Counter 1 Register
        pub LC1: RORegister<u32>,
        _reserved: [u32; 3],
    }

    pub mod CCR {
        fields! {
            SRC_INC: 0, 1;
            /// `log2` of the source beat size.
            SRC_BURST_SIZE: 1, 3;
            /// Source beats per burst, minus one.
            SRC_BURST_LEN: 4, 4;
            SRC_PROT_CTRL: 8, 3;
            SRC_CACHE_CTRL: 11, 3;
            DST_INC: 14, 1;
            /// `log2` of the destination beat size.
            DST_BURST_SIZE: 15, 3;
            /// Destination beats per burst, minus one.
            DST_BURST_LEN: 18, 4;
            DST_PROT_CTRL: 22, 3;
            DST_CACHE_CTRL: 25, 3;
            ENDIAN_SWAP_SIZE: 28, 3;
        }
    }
}

/// DMA-330 registers.
#[repr(C)]
pub struct RegisterBlock {
    /// DMA Manager Status Register
    pub DSR: RORegister<u32>,
    /// DMA Program Counter Register
    pub DPC: RORegister<u32>,
    _reserved0: [u32; 6],
    /// Interrupt Enable Register
    pub INTEN: RWRegister<u32>,
    /// Event-Interrupt Raw Status Register
    pub INT_EVENT_RIS: RORegister<u32>,
    /// Interrupt Status Register
    pub INTMIS: RORegister<u32>,
    /// Interrupt Clear Register
    pub INTCLR: WORegister<u32>,
    /// Fault Status DMA Manager Register
    pub FSRD: RORegister<u32>,
    /// Fault Status DMA Channel Register
    pub FSRC: RORegister<u32>,
    /// Fault Type DMA Manager Register
    pub FTRD: RORegister<u32>,
    _reserved1: [u32; 1],
    /// Fault Type DMA Channel Registers
    pub FTR: [RORegister<u32>; CHANNELS],
    _reserved2: [u32; 40],
    /// Channel thread status
    pub THREAD: [thread::RegisterBlock; CHANNELS],
    _reserved3: [u32; 176],
    /// Channel AXI status and loop counters
    pub CHANNEL: [channel::RegisterBlock; CHANNELS],
    _reserved4: [u32; 512],
    /// Debug Status Register
    pub DBGSTATUS: RORegister<u32>,
    /// Debug Command Register
    pub DBGCMD: WORegister<u32>,
    /// Debug Instruction-0 Register
    pub DBGINST0: WORegister<u32>,
    /// Debug Instruction-1 Register
    pub DBGINST1: WORegister<u32>,
    _reserved5: [u32; 60],
    /// Configuration Register 0
    pub CR0: RORegister<u32>,
    /// Configuration Register 1
    pub CR1: RORegister<u32>,
    /// Configuration Register 2
    pub CR2: RORegister<u32>,
    /// Configuration Register 3
    pub CR3: RORegister<u32>,
    /// Configuration Register 4
    pub CR4: RORegister<u32>,
    /// DMA Configuration Register
    pub CRD: RORegister<u32>,
    _reserved6: [u32; 26],
    /// Watchdog Register
    pub WD: RWRegister<u32>,
    _reserved7: [u32; 87],
    /// Peripheral Identification Registers
    pub PERIPH_ID: [RORegister<u32>; 4],
    /// Component Identification Registers
    pub PCELL_ID: [RORegister<u32>; 4],
}

const _: () = assert!(core::mem::offset_of!(RegisterBlock, INTEN) == 0x020);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, FTR) == 0x040);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, THREAD) == 0x100);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, CHANNEL) == 0x400);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, DBGSTATUS) == 0xD00);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, CR0) == 0xE00);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, WD) == 0xE80);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, PERIPH_ID) == 0xFE0);
const _: () = assert!(core::mem::size_of::<RegisterBlock>() == 0x1000);

pub mod DSR {
    fields! {
        /// Manager thread status nibble.
        DMA_STATUS: 0, 4;
        /// Event the manager waits on.
        WAKEUP_EVENT: 4, 5;
        /// Manager runs in the non-secure state.
        DNS: 9, 1;
    }
}

pub mod FSRD {
    fields! {
        /// Manager thread is faulting.
        FS_MGR: 0, 1;
    }
}

pub mod DBGSTATUS {
    fields! {
        /// Debug interface is busy.
        DBGSTATUS: 0, 1;
    }
}

pub mod DBGINST0 {
    fields! {
        /// Thread the instruction executes on. 0 is the manager.
        DEBUG_THREAD: 0, 1;
        /// Channel number for a channel thread.
        CHANNEL_NUMBER: 8, 3;
        /// First instruction byte.
        INSTRUCTION_BYTE0: 16, 8;
        /// Second instruction byte.
        INSTRUCTION_BYTE1: 24, 8;
    }
}

pub mod CR0 {
    fields! {
        PERIPH_REQ: 0, 1;
        BOOT_EN: 1, 1;
        MGR_NS_AT_RST: 2, 1;
        NUM_CHNLS: 4, 3;
        NUM_PERIPH_REQ: 12, 5;
        NUM_EVENTS: 17, 5;
    }
}

pub mod CR1 {
    fields! {
        I_CACHE_LEN: 0, 3;
        NUM_I_CACHE_LINES: 4, 4;
    }
}

pub mod CRD {
    fields! {
        DATA_WIDTH: 0, 3;
        WR_CAP: 4, 3;
        WR_Q_DEP: 8, 4;
        RD_CAP: 12, 3;
        RD_Q_DEP: 16, 4;
        DATA_BUFFER_DEP: 20, 10;
    }
}
