mod clock;
mod cmd;
mod config;
mod phy;
mod regs;

pub mod constant;

use core::fmt::Display;

use constant::*;
use log::{debug, info, warn};

use crate::{
    delay_us,
    err::SdError,
    tuning::{SdhciVariant, SdioVariant, TuningOps, TuningOutcome},
};

pub use clock::core_clock_divisor;
pub use cmd::{int_status_error, tuning_pattern, TUNING_BLK_PATTERN_4BIT, TUNING_BLK_PATTERN_8BIT};
pub use config::{ClkPhase, ClkPhaseMap, PhyConfig, PropertySource, SdioConfig, Timing};
pub use phy::drive_impedance_code;

/// Host shared between contexts; hold the lock for a whole tuning pass.
pub type SharedSdioHost<V = SdioVariant> = spin::Mutex<SdioHost<V>>;

// ESWIN SDHCI-SDIO host controller
#[derive(Debug)]
pub struct SdioHost<V = SdioVariant> {
    base_addr: usize,
    core_clk_reg: Option<usize>,
    id: u32,
    phy: PhyConfig,
    clk_phases: ClkPhaseMap,
    timing: Timing,
    quirks: EswinQuirks,
    ier: u32,
    version: u16,
    variant: V,
}

impl<V: SdhciVariant> Display for SdioHost<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "SDIO Controller {{ id: {}, variant: {}, base_addr: {:#x}, version: {:#x} }}",
            self.id,
            self.variant.name(),
            self.base_addr,
            self.version
        )
    }
}

impl SdioHost<SdioVariant> {
    /// The core clock register in `config` is not mapped here; attach it
    /// with [`with_core_clock`](Self::with_core_clock) before changing clocks.
    ///
    /// # Safety
    ///
    /// `base_addr` must map the controller's whole register window for the
    /// lifetime of the host, and nothing else may access it.
    pub unsafe fn from_config(base_addr: usize, config: &SdioConfig) -> Self {
        let variant = SdioVariant::new(config.policy, config.phy.delay_code);
        unsafe { Self::new(base_addr, config, variant) }
    }
}

impl<V: SdhciVariant> SdioHost<V> {
    /// # Safety
    ///
    /// `base_addr` must map the controller's whole register window for the
    /// lifetime of the host, and nothing else may access it.
    pub unsafe fn new(base_addr: usize, config: &SdioConfig, variant: V) -> Self {
        let mut host = Self {
            base_addr,
            core_clk_reg: None,
            id: config.sdio_id,
            phy: config.phy,
            clk_phases: config.clk_phases,
            timing: Timing::Legacy,
            quirks: config.quirks,
            ier: SDHCI_INT_ALL_MASK,
            version: 0,
            variant,
        };

        host.version = host.read_reg16(SDHCI_HOST_VERSION);

        info!("SDIO Controller created: {}", host);

        host
    }

    /// Attach the mapped core clock register.
    ///
    /// # Safety
    ///
    /// `addr` must be the mapped address of this controller's core clock register.
    pub unsafe fn with_core_clock(mut self, addr: usize) -> Self {
        self.core_clk_reg = Some(addr);
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn variant(&self) -> &V {
        &self.variant
    }

    pub fn phy(&self) -> &PhyConfig {
        &self.phy
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn quirks(&self) -> EswinQuirks {
        self.quirks
    }

    // Initialize the host controller
    pub fn init(&mut self) -> Result<(), SdError> {
        info!("Init SDIO Controller {}", self.id);

        self.reset(ResetMask::ALL)?;

        self.write_reg(SDHCI_INT_ENABLE, self.ier);
        self.write_reg(SDHCI_SIGNAL_ENABLE, self.ier);

        info!("SDIO Controller {} ready", self.id);
        Ok(())
    }

    /// Software reset. Interrupts are masked while it runs and a full reset
    /// reprograms the PHY. Interrupt enables and the card-detect test bits
    /// are restored even if the reset times out.
    pub fn reset(&mut self, mask: ResetMask) -> Result<(), SdError> {
        self.write_reg(SDHCI_INT_ENABLE, 0);
        self.write_reg(SDHCI_SIGNAL_ENABLE, 0);

        self.write_reg8(SDHCI_SOFTWARE_RESET, mask.bits());

        let mut timeout = 100;
        let result = loop {
            if self.read_reg8(SDHCI_SOFTWARE_RESET) & mask.bits() == 0 {
                break Ok(());
            }
            if timeout == 0 {
                warn!("sdio{}: reset {:?} never completed", self.id, mask);
                break Err(SdError::Timeout);
            }
            timeout -= 1;
            delay_us(10);
        };

        self.write_reg(SDHCI_INT_ENABLE, self.ier);
        self.write_reg(SDHCI_SIGNAL_ENABLE, self.ier);

        if self.quirks.contains(EswinQuirks::FORCE_CDTEST) {
            let ctrl = self.read_reg8(SDHCI_HOST_CONTROL) | SDHCI_CTRL_CDTEST_INS | SDHCI_CTRL_CDTEST_EN;
            self.write_reg8(SDHCI_HOST_CONTROL, ctrl);
        }

        result?;

        if mask.contains(ResetMask::ALL) {
            self.config_phy();
        }

        Ok(())
    }

    /// Platform tuning hook called when the MMC core asks for (re)tuning.
    pub fn platform_execute_tuning(&mut self, opcode: u8) -> Result<TuningOutcome, SdError> {
        debug!("sdio{}: execute tuning, opcode {}", self.id, opcode);
        let variant = self.variant.clone();
        variant.platform_execute_tuning(self, opcode)
    }
}

impl<V: SdhciVariant> TuningOps for SdioHost<V> {
    fn host_id(&self) -> u32 {
        self.id
    }

    fn disable_card_clk(&mut self) {
        self.disable_card_clock();
    }

    fn enable_card_clk(&mut self) {
        if let Err(err) = self.enable_card_clock() {
            debug!("sdio{}: card clock enable failed: {}", self.id, err);
        }
    }

    fn config_phy_delay(&mut self, delay: u8) {
        self.set_phy_delay(delay);
    }

    fn write_phase_code(&mut self, code: u16) {
        self.set_phase_code(code);
    }

    fn arm_sw_tuning(&mut self) {
        let ctrl = self.read_reg16(SDHCI_HOST_CONTROL2) & !SDHCI_CTRL_TUNED_CLK;
        self.write_reg16(SDHCI_HOST_CONTROL2, ctrl);

        let val = self.read_reg(VENDOR_AT_CTRL_R) | SW_TUNE_ENABLE;
        self.write_reg16(VENDOR_AT_CTRL_R, val as u16);
    }

    fn clear_cmd_data(&mut self) {
        self.write_reg16(SDHCI_CMD_DATA, 0);
    }

    fn send_tuning(&mut self, opcode: u8) -> Result<(), SdError> {
        self.send_tuning_block(opcode)
    }

    fn reset_cmd_data(&mut self) {
        if let Err(err) = self.reset(ResetMask::CMD | ResetMask::DATA) {
            warn!("sdio{}: cmd/data reset failed: {}", self.id, err);
        }
    }
}

/// Run a tuning pass on a shared host, holding its lock throughout.
pub fn retune<V: SdhciVariant>(shared: &SharedSdioHost<V>, opcode: u8) -> Result<TuningOutcome, SdError> {
    let mut host = shared.lock();
    host.platform_execute_tuning(opcode)
}
