// ===== Types and Structures =====

use core::fmt;

const EIO: i32 = 5;
const EINVAL: i32 = 22;
const EILSEQ: i32 = 84;
const ETIMEDOUT: i32 = 110;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdError {
    Timeout,
    Crc,
    EndBit,
    Index,
    DataTimeout,
    DataCrc,
    DataEndBit,
    BusPower,
    Acmd12Error,
    AdmaError,
    IoError,
    CommandError,
    ClockUnstable,
    TuningPatternMismatch,
    DelayTuningFailed,
    PhaseTuningFailed,
    InvalidConfig(&'static str),
}

impl SdError {
    /// Negative errno reported to the MMC core.
    pub fn errno(&self) -> i32 {
        match self {
            SdError::Timeout | SdError::DataTimeout | SdError::ClockUnstable => -ETIMEDOUT,
            SdError::Crc | SdError::EndBit | SdError::DataCrc | SdError::DataEndBit => -EILSEQ,
            SdError::InvalidConfig(_) => -EINVAL,
            _ => -EIO,
        }
    }
}

impl fmt::Display for SdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdError::Timeout => write!(f, "Command timeout error"),
            SdError::Crc => write!(f, "Command CRC error"),
            SdError::EndBit => write!(f, "Command end bit error"),
            SdError::Index => write!(f, "Command index error"),
            SdError::DataTimeout => write!(f, "Data timeout error"),
            SdError::DataCrc => write!(f, "Data CRC error"),
            SdError::DataEndBit => write!(f, "Data end bit error"),
            SdError::BusPower => write!(f, "Bus power error"),
            SdError::Acmd12Error => write!(f, "ACMD12 error"),
            SdError::AdmaError => write!(f, "ADMA error"),
            SdError::IoError => write!(f, "I/O error"),
            SdError::CommandError => write!(f, "Command error"),
            SdError::ClockUnstable => write!(f, "Internal clock never stabilised"),
            SdError::TuningPatternMismatch => write!(f, "Tuning block pattern mismatch"),
            SdError::DelayTuningFailed => write!(f, "Delay code tuning failed"),
            SdError::PhaseTuningFailed => write!(f, "Phase code tuning failed"),
            SdError::InvalidConfig(desc) => write!(f, "Invalid configuration: {}", desc),
        }
    }
}
