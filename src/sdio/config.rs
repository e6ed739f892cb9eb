use log::{debug, warn};

use crate::{err::SdError, tuning::SoftwareTuningPolicy};

use super::{constant::*, phy::drive_impedance_code};

/// Read access to the properties of a controller's device-tree node.
pub trait PropertySource {
    fn read_u32(&self, name: &str) -> Option<u32>;
    /// First two cells of a property, `None` if it has fewer.
    fn read_u32_pair(&self, name: &str) -> Option<(u32, u32)>;
    fn read_bool(&self, name: &str) -> bool;
}

impl PropertySource for fdt_parser::Node<'_> {
    fn read_u32(&self, name: &str) -> Option<u32> {
        self.find_property(name)?.u32_list().next()
    }

    fn read_u32_pair(&self, name: &str) -> Option<(u32, u32)> {
        let prop = self.find_property(name)?;
        let mut cells = prop.u32_list();
        Some((cells.next()?, cells.next()?))
    }

    fn read_bool(&self, name: &str) -> bool {
        self.find_property(name).is_some()
    }
}

/// Bus timing modes, in MMC core order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Timing {
    #[default]
    Legacy,
    MmcHs,
    SdHs,
    UhsSdr12,
    UhsSdr25,
    UhsSdr50,
    UhsSdr104,
    UhsDdr50,
    MmcDdr52,
    MmcHs200,
    MmcHs400,
}

impl Timing {
    pub const ALL: [Timing; 11] = [
        Timing::Legacy,
        Timing::MmcHs,
        Timing::SdHs,
        Timing::UhsSdr12,
        Timing::UhsSdr25,
        Timing::UhsSdr50,
        Timing::UhsSdr104,
        Timing::UhsDdr50,
        Timing::MmcDdr52,
        Timing::MmcHs200,
        Timing::MmcHs400,
    ];

    /// Device-tree property holding the clock phases for this timing.
    pub fn clk_phase_property(self) -> &'static str {
        match self {
            Timing::Legacy => "clk-phase-legacy",
            Timing::MmcHs => "clk-phase-mmc-hs",
            Timing::SdHs => "clk-phase-sd-hs",
            Timing::UhsSdr12 => "clk-phase-uhs-sdr12",
            Timing::UhsSdr25 => "clk-phase-uhs-sdr25",
            Timing::UhsSdr50 => "clk-phase-uhs-sdr50",
            Timing::UhsSdr104 => "clk-phase-uhs-sdr104",
            Timing::UhsDdr50 => "clk-phase-uhs-ddr50",
            Timing::MmcDdr52 => "clk-phase-mmc-ddr52",
            Timing::MmcHs200 => "clk-phase-mmc-hs200",
            Timing::MmcHs400 => "clk-phase-mmc-hs400",
        }
    }
}

/// Sample (input) and card (output) clock phases in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClkPhase {
    pub input: u32,
    pub output: u32,
}

/// Clock phases per bus timing. Timings without a property keep 0/0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClkPhaseMap([ClkPhase; Timing::ALL.len()]);

impl ClkPhaseMap {
    pub fn from_properties<P: PropertySource + ?Sized>(props: &P) -> Self {
        let mut map = Self::default();
        for timing in Timing::ALL {
            let prop = timing.clk_phase_property();
            match props.read_u32_pair(prop) {
                Some((input, output)) => map.set(timing, ClkPhase { input, output }),
                None => debug!("Using predefined clock phase for {} = {:?}", prop, map.get(timing)),
            }
        }
        map
    }

    pub fn get(&self, timing: Timing) -> ClkPhase {
        self.0[timing as usize]
    }

    pub fn set(&mut self, timing: Timing, phase: ClkPhase) {
        self.0[timing as usize] = phase;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhyConfig {
    pub drive_impedance: u32,
    pub enable_cmd_pullup: bool,
    pub enable_data_pullup: bool,
    /// Static delay line code, also the fallback when delay tuning fails.
    pub delay_code: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SdioConfig {
    pub sdio_id: u32,
    /// Physical address of the MSHC core clock register. The host does not
    /// map it; callers map it and pass the mapping to
    /// [`SdioHost::with_core_clock`](super::SdioHost::with_core_clock).
    pub core_clk_reg: u32,
    pub phy: PhyConfig,
    pub policy: SoftwareTuningPolicy,
    pub clk_phases: ClkPhaseMap,
    /// Not described in the device tree; set from platform data.
    pub quirks: EswinQuirks,
}

impl SdioConfig {
    pub fn from_properties<P: PropertySource + ?Sized>(props: &P) -> Result<Self, SdError> {
        let core_clk_reg = props
            .read_u32("core-clk-reg")
            .ok_or(SdError::InvalidConfig("core-clk-reg missing"))?;
        let sdio_id = props
            .read_u32("sdio-id")
            .ok_or(SdError::InvalidConfig("sdio-id missing"))?;

        let mut phy = PhyConfig::default();
        if let Some(delay) = props.read_u32("delay_code") {
            if delay > PHY_DELAY_CODE_MAX as u32 {
                warn!("sdio{}: delay_code {:#x} masked to the delay line width", sdio_id, delay);
            }
            phy.delay_code = (delay & PHY_CLK_MAX_DELAY_MASK as u32) as u8;
        }
        if let Some(ohm) = props.read_u32("drive-impedance-ohm") {
            phy.drive_impedance = drive_impedance_code(ohm);
        }
        phy.enable_cmd_pullup = props.read_bool("enable-cmd-pullup");
        phy.enable_data_pullup = props.read_bool("enable-data-pullup");

        let static_phase_code = match props.read_u32("phase_code") {
            Some(code) if code > MAX_PHASE_CODE as u32 => {
                return Err(SdError::InvalidConfig("phase_code out of range"));
            }
            Some(code) => Some(code as u16),
            None => None,
        };

        let policy = SoftwareTuningPolicy {
            enabled: props.read_bool("enable_sw_tuning"),
            static_phase_code,
        };

        debug!("sdio{}: phy {:?}, tuning {:?}", sdio_id, phy, policy);

        Ok(Self {
            sdio_id,
            core_clk_reg,
            phy,
            policy,
            clk_phases: ClkPhaseMap::from_properties(props),
            quirks: EswinQuirks::empty(),
        })
    }
}
