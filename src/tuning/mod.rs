//! Software delay-line and sampling-phase tuning.
//!
//! The engine only talks to hardware through [`TuningOps`], so it runs the
//! same against the real controller and against a test double.

mod window;

pub use window::ScanWindow;

use log::{debug, error, info};

use crate::{
    delay_us,
    err::SdError,
    sdio::constant::{DELAY_RANGE_THRESHOLD, MAX_PHASE_CODE, PHY_DELAY_CODE_MAX, TUNING_SETTLE_US},
};

/// Controller primitives the tuning engine drives.
///
/// Tuning registers must only be written while the card clock is gated off.
pub trait TuningOps {
    fn host_id(&self) -> u32;
    fn disable_card_clk(&mut self);
    fn enable_card_clk(&mut self);
    /// Program the PHY SD clock delay line.
    fn config_phy_delay(&mut self, delay: u8);
    /// Program the sampling phase register.
    fn write_phase_code(&mut self, code: u16);
    /// Clear the tuned-clock flag and hand sampling control to software.
    fn arm_sw_tuning(&mut self);
    fn clear_cmd_data(&mut self);
    /// Send one tuning block command and check the returned pattern.
    fn send_tuning(&mut self, opcode: u8) -> Result<(), SdError>;
    fn reset_cmd_data(&mut self);
}

/// Software tuning settings fixed at attach time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoftwareTuningPolicy {
    pub enabled: bool,
    pub static_phase_code: Option<u16>,
}

/// Inclusive upper bounds of the two sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TuningRange {
    pub delay_max: u8,
    pub phase_max: u16,
}

impl Default for TuningRange {
    fn default() -> Self {
        Self {
            delay_max: PHY_DELAY_CODE_MAX,
            phase_max: MAX_PHASE_CODE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuningOutcome {
    /// Software tuning disabled; the configured phase (if any) was applied.
    Static { phase: Option<u16> },
    /// Both sweeps succeeded and their codes are committed.
    Tuned { delay: u8, phase: u16 },
    /// The variant leaves tuning to the standard SDHCI procedure.
    Deferred,
}

/// Per-variant tuning hook, chosen when the host is constructed.
pub trait SdhciVariant: Clone {
    fn name(&self) -> &'static str;

    fn platform_execute_tuning<H: TuningOps + ?Sized>(
        &self,
        host: &mut H,
        opcode: u8,
    ) -> Result<TuningOutcome, SdError>;
}

/// ESWIN SDIO controller: delay-line sweep followed by a phase sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SdioVariant {
    pub policy: SoftwareTuningPolicy,
    pub fallback_delay: u8,
    pub range: TuningRange,
}

impl SdioVariant {
    pub fn new(policy: SoftwareTuningPolicy, fallback_delay: u8) -> Self {
        Self {
            policy,
            fallback_delay,
            range: TuningRange::default(),
        }
    }

    pub fn with_range(mut self, range: TuningRange) -> Self {
        self.range = range;
        self
    }
}

impl SdhciVariant for SdioVariant {
    fn name(&self) -> &'static str {
        "eswin,sdhci-sdio"
    }

    fn platform_execute_tuning<H: TuningOps + ?Sized>(
        &self,
        host: &mut H,
        opcode: u8,
    ) -> Result<TuningOutcome, SdError> {
        if !self.policy.enabled {
            if let Some(phase) = self.policy.static_phase_code {
                debug!("sdio{}: static phase_code:{:#x}", host.host_id(), phase);
                set_phase_gated(host, phase);
            }
            return Ok(TuningOutcome::Static {
                phase: self.policy.static_phase_code,
            });
        }

        host.disable_card_clk();
        host.arm_sw_tuning();
        host.write_phase_code(0);
        host.enable_card_clk();

        host.clear_cmd_data();

        let delay = delay_code_tuning(host, opcode, self.range.delay_max, self.fallback_delay)?;
        let phase = phase_code_tuning(host, opcode, self.range.phase_max)?;

        Ok(TuningOutcome::Tuned { delay, phase })
    }
}

/// Variant without a platform hook; the SDHCI core runs its own tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenericVariant;

impl SdhciVariant for GenericVariant {
    fn name(&self) -> &'static str {
        "generic-sdhci"
    }

    fn platform_execute_tuning<H: TuningOps + ?Sized>(
        &self,
        _host: &mut H,
        _opcode: u8,
    ) -> Result<TuningOutcome, SdError> {
        Ok(TuningOutcome::Deferred)
    }
}

pub fn set_delay_gated<H: TuningOps + ?Sized>(host: &mut H, delay: u8) {
    host.disable_card_clk();
    host.config_phy_delay(delay);
    host.enable_card_clk();
}

pub fn set_phase_gated<H: TuningOps + ?Sized>(host: &mut H, phase: u16) {
    host.disable_card_clk();
    host.write_phase_code(phase);
    host.enable_card_clk();
}

/// Sends one tuning command. A failed probe leaves the controller reset and
/// settled so the next probe starts clean.
pub fn issue_tuning_probe<H: TuningOps + ?Sized>(host: &mut H, opcode: u8) -> Result<(), SdError> {
    host.send_tuning(opcode).inspect_err(|err| {
        debug!("sdio{}: tuning probe failed: {}", host.host_id(), err);
        host.reset_cmd_data();
        delay_us(TUNING_SETTLE_US);
    })
}

/// Sweeps the delay line and commits the middle of the widest passing window.
///
/// The sweep stops as soon as a closed window wider than
/// `DELAY_RANGE_THRESHOLD` codes has been recorded. A window still open at
/// `max_code` is never considered. On failure the line is put back to
/// `fallback`.
pub fn delay_code_tuning<H: TuningOps + ?Sized>(
    host: &mut H,
    opcode: u8,
    max_code: u8,
    fallback: u8,
) -> Result<u8, SdError> {
    let mut window = ScanWindow::Unset;
    // (width, midpoint)
    let mut best: Option<(u16, u16)> = None;

    for code in 0..=max_code {
        set_delay_gated(host, code);

        if issue_tuning_probe(host, opcode).is_ok() {
            window = window.pass(code as u16);
            continue;
        }

        if let (Some(width), Some(mid)) = (window.width(), window.midpoint()) {
            if best.is_none_or(|(best_width, _)| width > best_width) {
                best = Some((width, mid));
                if width > DELAY_RANGE_THRESHOLD as u16 {
                    break;
                }
            }
        }
        window = ScanWindow::Unset;
    }

    let Some((_, delay)) = best else {
        error!("sdio{}: delay code tuning failed!", host.host_id());
        set_delay_gated(host, fallback);
        return Err(SdError::DelayTuningFailed);
    };

    let delay = delay as u8;
    info!("sdio{}: set delay:{:#x}", host.host_id(), delay);
    set_delay_gated(host, delay);

    Ok(delay)
}

/// Sweeps the sampling phase and commits the middle of the first window that
/// spans at least two codes. Falls back to phase 0 on failure.
pub fn phase_code_tuning<H: TuningOps + ?Sized>(
    host: &mut H,
    opcode: u8,
    max_code: u16,
) -> Result<u16, SdError> {
    let mut window = ScanWindow::Unset;

    for phase in 0..=max_code {
        set_phase_gated(host, phase);

        if issue_tuning_probe(host, opcode).is_ok() {
            window = window.pass(phase);
            continue;
        }

        if window.bounds().is_some() {
            break;
        }
        window = ScanWindow::Unset;
    }

    let Some(phase) = window.midpoint() else {
        error!("sdio{}: phase code tuning failed!", host.host_id());
        set_phase_gated(host, 0);
        return Err(SdError::PhaseTuningFailed);
    };

    info!("sdio{}: set phase_code:{:#x}", host.host_id(), phase);
    set_phase_gated(host, phase);

    Ok(phase)
}
