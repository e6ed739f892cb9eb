use log::{debug, error, warn};

use crate::{delay_us, err::SdError};
use super::{config::{ClkPhase, Timing}, constant::*, SdioHost};

/// Core clock divider and source for a requested card clock.
///
/// Returns `(divide, use_208m)`, or `None` for 0 Hz. The 208 MHz source is
/// used when it divides the request exactly.
pub fn core_clock_divisor(clock: u32) -> Option<(u32, bool)> {
    if clock == 0 {
        return None;
    }

    let (max_clk, use_208m) = if SDHCI_CLK_208M % clock == 0 {
        (SDHCI_CLK_208M, true)
    } else {
        (SDHCI_CLK_200M, false)
    };

    let div = (1..=MAX_CORE_CLK_DIV)
        .find(|div| max_clk / div <= clock)
        .unwrap_or(MAX_CORE_CLK_DIV + 1)
        - 1;

    let divide = if div <= 1 { 2 } else { (div + 1) * 2 };

    Some((divide, use_208m))
}

impl<V> SdioHost<V> {
    pub fn disable_card_clock(&mut self) {
        let clk = ClockControl::from_bits_retain(self.read_reg16(SDHCI_CLOCK_CONTROL));
        self.write_reg16(SDHCI_CLOCK_CONTROL, (clk - ClockControl::CARD_EN).bits());
    }

    pub fn enable_card_clock(&mut self) -> Result<(), SdError> {
        let mut clk = ClockControl::from_bits_retain(self.read_reg16(SDHCI_CLOCK_CONTROL));
        clk |= ClockControl::INT_EN;
        self.write_reg16(SDHCI_CLOCK_CONTROL, clk.bits());

        // Wait max 150 ms
        let mut timeout = 15000;
        loop {
            clk = ClockControl::from_bits_retain(self.read_reg16(SDHCI_CLOCK_CONTROL));
            if clk.contains(ClockControl::INT_STABLE) {
                break;
            }
            if timeout == 0 {
                error!("sdio{}: Internal clock never stabilised.", self.id);
                return Err(SdError::ClockUnstable);
            }
            timeout -= 1;
            delay_us(10);
        }

        clk |= ClockControl::CARD_EN;
        self.write_reg16(SDHCI_CLOCK_CONTROL, clk.bits());
        delay_us(1000);

        Ok(())
    }

    pub fn is_clock_stable(&self) -> bool {
        ClockControl::from_bits_retain(self.read_reg16(SDHCI_CLOCK_CONTROL))
            .contains(ClockControl::INT_STABLE)
    }

    /// Reprogram the MSHC core clock for `clock` Hz; 0 turns it off.
    pub fn set_core_clock(&mut self, clock: u32) -> Result<(), SdError> {
        let Some(reg) = self.core_clk_reg else {
            warn!("sdio{}: core clock register not mapped", self.id);
            return Err(SdError::InvalidConfig("core-clk-reg not mapped"));
        };

        let Some((divide, use_208m)) = core_clock_divisor(clock) else {
            let val = self.read_core_clk(reg) & !MSHC_CORE_CLK_ENABLE;
            self.write_core_clk(reg, val);
            return Ok(());
        };
        debug!(
            "sdio{}: clock:{} timing:{:?} divide:{} sel_208m:{}",
            self.id, clock, self.timing, divide, use_208m
        );

        self.disable_card_clock();
        self.core_clock_config(reg, divide, use_208m);
        self.enable_card_clock()?;
        delay_us(2000);

        if self.quirks.contains(EswinQuirks::CLOCK_UNSTABLE) {
            delay_us(CLOCK_UNSTABLE_SETTLE_US);
        }

        Ok(())
    }

    /// Switch to `timing` and `clock` Hz.
    ///
    /// Returns the sample and card clock phases configured for `timing`; the
    /// platform clock provider owns those clocks and applies them.
    pub fn set_clock(&mut self, clock: u32, timing: Timing) -> Result<ClkPhase, SdError> {
        self.timing = timing;
        let phase = self.clk_phases.get(timing);
        debug!("sdio{}: {:?} clock phase in:{} out:{}", self.id, timing, phase.input, phase.output);

        self.set_core_clock(clock)?;

        Ok(phase)
    }

    fn core_clock_config(&self, reg: usize, divide: u32, use_208m: bool) {
        let mut val = self.read_core_clk(reg);
        val &= !MSHC_CORE_CLK_ENABLE;
        self.write_core_clk(reg, val);
        delay_us(100);

        val &= !(MSHC_CORE_CLK_FREQ_BIT_MASK << MSHC_CORE_CLK_FREQ_BIT_SHIFT);
        val |= (divide & MSHC_CORE_CLK_FREQ_BIT_MASK) << MSHC_CORE_CLK_FREQ_BIT_SHIFT;
        val &= !MSHC_CORE_CLK_SEL_BIT;
        if use_208m {
            val |= MSHC_CORE_CLK_SEL_BIT;
        }
        self.write_core_clk(reg, val);
        delay_us(100);

        val |= MSHC_CORE_CLK_ENABLE;
        self.write_core_clk(reg, val);
        delay_us(1000);
    }
}
