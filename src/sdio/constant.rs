#![allow(unused)]

use bitflags::bitflags;

// SDHCI register offsets
pub const SDHCI_BLOCK_SIZE: u32 = 0x04;
pub const SDHCI_BLOCK_COUNT: u32 = 0x06;
pub const SDHCI_ARGUMENT: u32 = 0x08;
pub const SDHCI_TRANSFER_MODE: u32 = 0x0C;
pub const SDHCI_COMMAND: u32 = 0x0E;
pub const SDHCI_BUFFER: u32 = 0x20;
pub const SDHCI_PRESENT_STATE: u32 = 0x24;
pub const SDHCI_HOST_CONTROL: u32 = 0x28;
pub const SDHCI_CLOCK_CONTROL: u32 = 0x2C;
pub const SDHCI_SOFTWARE_RESET: u32 = 0x2F;
pub const SDHCI_INT_STATUS: u32 = 0x30;
pub const SDHCI_INT_ENABLE: u32 = 0x34;
pub const SDHCI_SIGNAL_ENABLE: u32 = 0x38;
pub const SDHCI_HOST_CONTROL2: u32 = 0x3E;
pub const SDHCI_HOST_VERSION: u32 = 0xFE;

// The vendor driver clears this offset (the buffer data port) before a tuning pass.
pub const SDHCI_CMD_DATA: u32 = SDHCI_BUFFER;

// SDHCI command register flags
pub const SDHCI_CMD_RESP_SHORT: u16 = 0x02;
pub const SDHCI_CMD_CRC: u16 = 0x08;
pub const SDHCI_CMD_INDEX: u16 = 0x10;
pub const SDHCI_CMD_DATA_PRESENT: u16 = 0x20;

// SDHCI transfer mode flags
pub const SDHCI_TRNS_BLK_CNT_EN: u16 = 0x02;
pub const SDHCI_TRNS_READ: u16 = 0x10;

// SDHCI present state flags
pub const SDHCI_DATA_INHIBIT: u32 = 0x00000001;
pub const SDHCI_CMD_INHIBIT: u32 = 0x00000002;
pub const SDHCI_DATA_AVAILABLE: u32 = 0x00000800;

// SDHCI host control flags
pub const SDHCI_CTRL_4BITBUS: u8 = 0x02;
pub const SDHCI_CTRL_8BITBUS: u8 = 0x20;
pub const SDHCI_CTRL_CDTEST_INS: u8 = 0x40;
pub const SDHCI_CTRL_CDTEST_EN: u8 = 0x80;

// SDHCI host control 2 flags
pub const SDHCI_CTRL_EXEC_TUNING: u16 = 0x0040;
pub const SDHCI_CTRL_TUNED_CLK: u16 = 0x0080;

bitflags! {
    /// SDHCI clock control register (16-bit).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClockControl: u16 {
        const INT_EN = 0x0001;
        const INT_STABLE = 0x0002;
        const CARD_EN = 0x0004;
        const PROG_CLOCK_MODE = 0x0020;
    }
}

bitflags! {
    /// SDHCI software reset register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResetMask: u8 {
        const ALL = 0x01;
        const CMD = 0x02;
        const DATA = 0x04;
    }
}

bitflags! {
    /// Controller integration quirks, supplied by the platform.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct EswinQuirks: u32 {
        /// Card detect is not wired; force card-inserted through the test bits.
        const FORCE_CDTEST = 1 << 0;
        /// Internal clock reports stable before it is.
        const CLOCK_UNSTABLE = 1 << 1;
    }
}

// SDHCI interrupt flags
pub const SDHCI_INT_RESPONSE: u32 = 0x00000001;
pub const SDHCI_INT_DATA_END: u32 = 0x00000002;
pub const SDHCI_INT_DATA_AVAIL: u32 = 0x00000020;
pub const SDHCI_INT_ERROR: u32 = 0x00008000;
pub const SDHCI_INT_TIMEOUT: u32 = 0x00010000;
pub const SDHCI_INT_CRC: u32 = 0x00020000;
pub const SDHCI_INT_END_BIT: u32 = 0x00040000;
pub const SDHCI_INT_INDEX: u32 = 0x00080000;
pub const SDHCI_INT_DATA_TIMEOUT: u32 = 0x00100000;
pub const SDHCI_INT_DATA_CRC: u32 = 0x00200000;
pub const SDHCI_INT_DATA_END_BIT: u32 = 0x00400000;
pub const SDHCI_INT_BUS_POWER: u32 = 0x00800000;
pub const SDHCI_INT_AUTO_CMD_ERR: u32 = 0x01000000;
pub const SDHCI_INT_ADMA_ERROR: u32 = 0x02000000;

pub const SDHCI_INT_ERROR_MASK: u32 = 0xFFFF8000;
pub const SDHCI_INT_CMD_MASK: u32 = SDHCI_INT_RESPONSE | SDHCI_INT_TIMEOUT | SDHCI_INT_CRC | SDHCI_INT_END_BIT | SDHCI_INT_INDEX | SDHCI_INT_AUTO_CMD_ERR;
pub const SDHCI_INT_DATA_MASK: u32 = SDHCI_INT_DATA_END | SDHCI_INT_DATA_TIMEOUT | SDHCI_INT_DATA_CRC | SDHCI_INT_DATA_END_BIT | SDHCI_INT_ADMA_ERROR;
pub const SDHCI_INT_ALL_MASK: u32 = SDHCI_INT_CMD_MASK | SDHCI_INT_DATA_MASK | SDHCI_INT_DATA_AVAIL;

// Tuning commands
pub const MMC_SEND_TUNING_BLOCK: u8 = 19;
pub const MMC_SEND_TUNING_BLOCK_HS200: u8 = 21;

// DWC MSHC PHY registers
pub const PHY_CNFG_R: u32 = 0x300;
pub const PHY_CMDPAD_CNFG_R: u32 = 0x304;
pub const PHY_DATAPAD_CNFG_R: u32 = 0x306;
pub const PHY_CLKPAD_CNFG_R: u32 = 0x308;
pub const PHY_STBPAD_CNFG_R: u32 = 0x30A;
pub const PHY_RSTNPAD_CNFG_R: u32 = 0x30C;
pub const PHY_SDCLKDL_CNFG_R: u32 = 0x31D;
pub const PHY_SDCLKDL_DC_R: u32 = 0x31E;

// Vendor auto-tuning registers
pub const VENDOR_AT_CTRL_R: u32 = 0x540;
pub const VENDOR_AT_SATA_R: u32 = 0x544;

pub const SW_TUNE_ENABLE: u32 = 1 << 4;

// PHY_CNFG_R fields
pub const PHY_RSTN: u32 = 1 << 0;
pub const PHY_PAD_SP_DRIVE_SHIFT: u32 = 16;

// Pad configuration fields
pub const PHY_PAD_RXSEL_0: u16 = 0x0;
pub const PHY_PAD_RXSEL_1: u16 = 0x1;
pub const PHY_PULL_BIT_SHIFT: u16 = 3;
pub const PHY_PULL_UP: u16 = 0x1;
pub const PHY_TX_SLEW_CTRL_P_BIT_SHIFT: u16 = 5;
pub const PHY_TX_SLEW_CTRL_N_BIT_SHIFT: u16 = 9;
pub const PHY_SLEW_2: u16 = 0x2;

// Drive strength codes
pub const PHYCTRL_DR_33OHM: u32 = 0xee;
pub const PHYCTRL_DR_40OHM: u32 = 0xcc;
pub const PHYCTRL_DR_50OHM: u32 = 0x88;
pub const PHYCTRL_DR_66OHM: u32 = 0x44;
pub const PHYCTRL_DR_100OHM: u32 = 0x00;

// Delay line
pub const PHY_UPDATE_DELAY_CODE: u8 = 0x10;
pub const PHY_CLK_MAX_DELAY_MASK: u8 = 0x7f;
pub const PHY_DELAY_CODE_MAX: u8 = 0x7f;

pub const MAX_PHASE_CODE: u16 = 0xff;

/// A closed delay window wider than this ends the sweep early.
pub const DELAY_RANGE_THRESHOLD: u8 = 20;
pub const TUNING_SETTLE_US: u32 = 200;

// Core clock register
pub const MSHC_CORE_CLK_ENABLE: u32 = 1 << 16;
pub const MSHC_CORE_CLK_FREQ_BIT_SHIFT: u32 = 4;
pub const MSHC_CORE_CLK_FREQ_BIT_MASK: u32 = 0xfff;
pub const MSHC_CORE_CLK_SEL_BIT: u32 = 1 << 0;
pub const MAX_CORE_CLK_DIV: u32 = 0xfff;

pub const SDHCI_CLK_208M: u32 = 208_000_000;
pub const SDHCI_CLK_200M: u32 = 200_000_000;

pub const CLOCK_UNSTABLE_SETTLE_US: u32 = 20_000;
