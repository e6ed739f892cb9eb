use log::{debug, error, warn};

use crate::delay_us;
use super::{constant::*, SdioHost};

/// Map a drive impedance in ohms to the PHY drive strength code.
pub fn drive_impedance_code(ohm: u32) -> u32 {
    match ohm {
        100 => PHYCTRL_DR_100OHM,
        66 => PHYCTRL_DR_66OHM,
        50 => PHYCTRL_DR_50OHM,
        40 => PHYCTRL_DR_40OHM,
        33 => PHYCTRL_DR_33OHM,
        _ => {
            warn!("Invalid value {} for drive-impedance-ohm.", ohm);
            PHYCTRL_DR_50OHM
        }
    }
}

impl<V> SdioHost<V> {
    /// Program the SD clock delay line. The card clock must be off.
    pub fn set_phy_delay(&self, delay: u8) {
        let delay = delay & PHY_CLK_MAX_DELAY_MASK;

        self.write_reg8(PHY_SDCLKDL_CNFG_R, PHY_UPDATE_DELAY_CODE);
        self.write_reg8(PHY_SDCLKDL_DC_R, delay);
        self.write_reg8(PHY_SDCLKDL_CNFG_R, 0);
    }

    /// Program the sampling phase register. The card clock must be off.
    pub fn set_phase_code(&self, code: u16) {
        self.write_reg16(VENDOR_AT_SATA_R, code);
    }

    pub fn phase_code(&self) -> u16 {
        self.read_reg16(VENDOR_AT_SATA_R)
    }

    pub fn phy_delay(&self) -> u8 {
        self.read_reg8(PHY_SDCLKDL_DC_R)
    }

    /// Reset the PHY and program its pads and the static delay code.
    ///
    /// A full controller reset clears all of this, so it has to be redone
    /// after every `ResetMask::ALL`.
    pub fn config_phy(&mut self) {
        let drv = self.phy.drive_impedance << PHY_PAD_SP_DRIVE_SHIFT;
        debug!("sdio{}: phy drv={:#x}", self.id, drv);

        self.disable_card_clock();

        // hold the PHY in reset while the pads are configured
        self.write_reg(PHY_CNFG_R, drv & !PHY_RSTN);

        let slew = (PHY_SLEW_2 << PHY_TX_SLEW_CTRL_P_BIT_SHIFT) | (PHY_SLEW_2 << PHY_TX_SLEW_CTRL_N_BIT_SHIFT);

        let val = slew | ((self.phy.enable_cmd_pullup as u16) << PHY_PULL_BIT_SHIFT) | PHY_PAD_RXSEL_1;
        self.write_reg16(PHY_CMDPAD_CNFG_R, val);
        debug!("sdio{}: phy cmd={:#x}", self.id, val);

        let val = slew | ((self.phy.enable_data_pullup as u16) << PHY_PULL_BIT_SHIFT) | PHY_PAD_RXSEL_1;
        self.write_reg16(PHY_DATAPAD_CNFG_R, val);
        debug!("sdio{}: phy data={:#x}", self.id, val);

        let val = slew | PHY_PAD_RXSEL_0;
        self.write_reg16(PHY_CLKPAD_CNFG_R, val);
        debug!("sdio{}: phy clk={:#x}", self.id, val);
        delay_us(2000);

        let val = slew | (PHY_PULL_UP << PHY_PULL_BIT_SHIFT) | PHY_PAD_RXSEL_1;
        self.write_reg16(PHY_RSTNPAD_CNFG_R, val);

        self.write_reg(PHY_CNFG_R, drv | PHY_RSTN);

        self.set_phy_delay(self.phy.delay_code);

        if let Err(err) = self.enable_card_clock() {
            error!("sdio{}: phy config left card clock off: {}", self.id, err);
        }
    }
}
