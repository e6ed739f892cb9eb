use log::{debug, trace};

use crate::err::SdError;

use super::{constant::*, SdioHost};

pub const TUNING_BLK_PATTERN_4BIT: [u8; 64] = [
    0xff, 0x0f, 0xff, 0x00, 0xff, 0xcc, 0xc3, 0xcc,
    0xc3, 0x3c, 0xcc, 0xff, 0xfe, 0xff, 0xfe, 0xef,
    0xff, 0xdf, 0xff, 0xdd, 0xff, 0xfb, 0xff, 0xfb,
    0xbf, 0xff, 0x7f, 0xff, 0x77, 0xf7, 0xbd, 0xef,
    0xff, 0xf0, 0xff, 0xf0, 0x0f, 0xfc, 0xcc, 0x3c,
    0xcc, 0x33, 0xcc, 0xcf, 0xff, 0xef, 0xff, 0xee,
    0xff, 0xfd, 0xff, 0xfd, 0xdf, 0xff, 0xbf, 0xff,
    0xbb, 0xff, 0xf7, 0xff, 0xf7, 0x7f, 0x7b, 0xde,
];

pub const TUNING_BLK_PATTERN_8BIT: [u8; 128] = [
    0xff, 0xff, 0x00, 0xff, 0xff, 0xff, 0x00, 0x00,
    0xff, 0xff, 0xcc, 0xcc, 0xcc, 0x33, 0xcc, 0xcc,
    0xcc, 0x33, 0x33, 0xcc, 0xcc, 0xcc, 0xff, 0xff,
    0xff, 0xee, 0xff, 0xff, 0xff, 0xee, 0xee, 0xff,
    0xff, 0xff, 0xdd, 0xff, 0xff, 0xff, 0xdd, 0xdd,
    0xff, 0xff, 0xff, 0xbb, 0xff, 0xff, 0xff, 0xbb,
    0xbb, 0xff, 0xff, 0xff, 0x77, 0xff, 0xff, 0xff,
    0x77, 0x77, 0xff, 0x77, 0xbb, 0xdd, 0xee, 0xff,
    0xff, 0xff, 0xff, 0x00, 0xff, 0xff, 0xff, 0x00,
    0x00, 0xff, 0xff, 0xcc, 0xcc, 0xcc, 0x33, 0xcc,
    0xcc, 0xcc, 0x33, 0x33, 0xcc, 0xcc, 0xcc, 0xff,
    0xff, 0xff, 0xee, 0xff, 0xff, 0xff, 0xee, 0xee,
    0xff, 0xff, 0xff, 0xdd, 0xff, 0xff, 0xff, 0xdd,
    0xdd, 0xff, 0xff, 0xff, 0xbb, 0xff, 0xff, 0xff,
    0xbb, 0xbb, 0xff, 0xff, 0xff, 0x77, 0xff, 0xff,
    0xff, 0x77, 0x77, 0xff, 0x77, 0xbb, 0xdd, 0xee,
];

/// Expected tuning block for `opcode` on a bus of `bus_width` bits.
pub fn tuning_pattern(opcode: u8, bus_width: u8) -> &'static [u8] {
    if opcode == MMC_SEND_TUNING_BLOCK_HS200 && bus_width == 8 {
        &TUNING_BLK_PATTERN_8BIT
    } else {
        &TUNING_BLK_PATTERN_4BIT
    }
}

/// Map error bits of the interrupt status register to an error.
pub fn int_status_error(int_status: u32) -> Option<SdError> {
    if int_status & SDHCI_INT_ERROR_MASK == 0 {
        return None;
    }

    let err = if int_status & SDHCI_INT_TIMEOUT != 0 {
        SdError::Timeout
    } else if int_status & SDHCI_INT_CRC != 0 {
        SdError::Crc
    } else if int_status & SDHCI_INT_END_BIT != 0 {
        SdError::EndBit
    } else if int_status & SDHCI_INT_INDEX != 0 {
        SdError::Index
    } else if int_status & SDHCI_INT_DATA_TIMEOUT != 0 {
        SdError::DataTimeout
    } else if int_status & SDHCI_INT_DATA_CRC != 0 {
        SdError::DataCrc
    } else if int_status & SDHCI_INT_DATA_END_BIT != 0 {
        SdError::DataEndBit
    } else if int_status & SDHCI_INT_BUS_POWER != 0 {
        SdError::BusPower
    } else if int_status & SDHCI_INT_AUTO_CMD_ERR != 0 {
        SdError::Acmd12Error
    } else if int_status & SDHCI_INT_ADMA_ERROR != 0 {
        SdError::AdmaError
    } else {
        SdError::CommandError
    };

    Some(err)
}

impl<V> SdioHost<V> {
    pub fn bus_width(&self) -> u8 {
        let ctrl = self.read_reg8(SDHCI_HOST_CONTROL);
        if ctrl & SDHCI_CTRL_8BITBUS != 0 {
            8
        } else if ctrl & SDHCI_CTRL_4BITBUS != 0 {
            4
        } else {
            1
        }
    }

    // Poll the interrupt status until one of `mask` is raised or an error shows up
    fn wait_for_int(&self, mask: u32, mut timeout: u32, on_timeout: SdError) -> Result<u32, SdError> {
        loop {
            let int_status = self.read_reg(SDHCI_INT_STATUS);
            if let Some(err) = int_status_error(int_status) {
                self.write_reg(SDHCI_INT_STATUS, int_status);
                return Err(err);
            }
            if int_status & mask != 0 {
                self.write_reg(SDHCI_INT_STATUS, int_status & mask);
                return Ok(int_status);
            }
            if timeout == 0 {
                return Err(on_timeout);
            }
            timeout -= 1;
        }
    }

    /// Send CMD19/CMD21 and compare the returned block with the tuning pattern.
    ///
    /// Command and data state are not reset here on failure.
    pub fn send_tuning_block(&mut self, opcode: u8) -> Result<(), SdError> {
        // Check if command or data lines are busy
        let mut timeout = 100000;
        while (self.read_reg(SDHCI_PRESENT_STATE) & (SDHCI_CMD_INHIBIT | SDHCI_DATA_INHIBIT)) != 0 {
            if timeout == 0 {
                return Err(SdError::Timeout);
            }
            timeout -= 1;
        }

        let pattern = tuning_pattern(opcode, self.bus_width());

        // Clear pending command and data status (write 1 to clear)
        let pending = self.read_reg(SDHCI_INT_STATUS) & SDHCI_INT_ALL_MASK;
        self.write_reg(SDHCI_INT_STATUS, pending);

        self.write_reg16(SDHCI_BLOCK_SIZE, pattern.len() as u16);
        self.write_reg16(SDHCI_BLOCK_COUNT, 1);
        self.write_reg16(SDHCI_TRANSFER_MODE, SDHCI_TRNS_BLK_CNT_EN | SDHCI_TRNS_READ);
        self.write_reg(SDHCI_ARGUMENT, 0);

        let command = ((opcode as u16) << 8)
            | SDHCI_CMD_RESP_SHORT
            | SDHCI_CMD_CRC
            | SDHCI_CMD_INDEX
            | SDHCI_CMD_DATA_PRESENT;
        trace!("sdio{}: tuning command {:#x}", self.id, command);
        self.write_reg16(SDHCI_COMMAND, command);

        self.wait_for_int(SDHCI_INT_RESPONSE, 100000, SdError::Timeout)?;
        self.wait_for_int(SDHCI_INT_DATA_AVAIL, 100000, SdError::DataTimeout)?;

        let mut block = [0u8; 128];
        let block = &mut block[..pattern.len()];
        for chunk in block.chunks_exact_mut(4) {
            chunk.copy_from_slice(&self.read_reg(SDHCI_BUFFER).to_le_bytes());
        }

        self.wait_for_int(SDHCI_INT_DATA_END, 1000000, SdError::DataTimeout)?;

        if block[..] != pattern[..] {
            debug!("sdio{}: tuning block mismatch", self.id);
            return Err(SdError::TuningPatternMismatch);
        }

        Ok(())
    }
}
