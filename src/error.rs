//! Error types shared by every delivery system.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::diseqc::SecError;
use crate::lnb::LnbError;
use crate::psi::PsiError;
use crate::request::FrontendType;

pub type Result<T> = std::result::Result<T, TuneError>;

/// Tuning parameter that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Inversion,
    Modulation,
    Fec,
    FecHp,
    FecLp,
    Bandwidth,
    GuardInterval,
    TransmissionMode,
    Hierarchy,
    SatelliteNumber,
    SymbolRate,
    VideoPid,
    AudioPid,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Inversion => "inversion",
            Field::Modulation => "modulation",
            Field::Fec => "fec",
            Field::FecHp => "fec_hp",
            Field::FecLp => "fec_lp",
            Field::Bandwidth => "bandwidth",
            Field::GuardInterval => "guard_interval",
            Field::TransmissionMode => "transmission_mode",
            Field::Hierarchy => "hierarchy",
            Field::SatelliteNumber => "satellite_number",
            Field::SymbolRate => "symbol_rate",
            Field::VideoPid => "video_pid",
            Field::AudioPid => "audio_pid",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {field}: {value}")]
    InvalidParameter { field: Field, value: String },
}

impl ValidationError {
    pub fn field(&self) -> Field {
        match self {
            ValidationError::InvalidParameter { field, .. } => *field,
        }
    }
}

/// Resource acquisition step, in the order the steps run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Frontend,
    PatDemux,
    PatFilter,
    PmtDemux,
    PmtFilter,
    VideoDemux,
    VideoFilter,
    AudioDemux,
    AudioFilter,
}

impl Stage {
    fn code(self) -> i32 {
        match self {
            Stage::Frontend => -3,
            Stage::PatDemux => -8,
            Stage::PatFilter => -9,
            Stage::PmtDemux => -11,
            Stage::PmtFilter => -12,
            Stage::VideoDemux => -13,
            Stage::VideoFilter => -14,
            Stage::AudioDemux => -15,
            Stage::AudioFilter => -16,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Frontend => "opening frontend",
            Stage::PatDemux => "opening PAT demux",
            Stage::PatFilter => "setting PAT filter",
            Stage::PmtDemux => "opening PMT demux",
            Stage::PmtFilter => "setting PMT filter",
            Stage::VideoDemux => "opening video demux",
            Stage::VideoFilter => "setting video filter",
            Stage::AudioDemux => "opening audio demux",
            Stage::AudioFilter => "setting audio filter",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum TuneError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("bad LNB specification: {0}")]
    Lnb(#[from] LnbError),

    #[error("{stage} failed: {source}")]
    Resource {
        stage: Stage,
        #[source]
        source: io::Error,
    },

    #[error("FE_GET_INFO failed: {0}")]
    FrontendInfo(#[source] io::Error),

    #[error("frontend reports type {found}, expected {expected}")]
    WrongDeliverySystem { expected: FrontendType, found: u32 },

    #[error(transparent)]
    Sec(#[from] SecError),

    #[error("FE_SET_PROPERTY failed: {0}")]
    SetFrontend(#[source] io::Error),

    #[error("no PMT PID for service 0x{service_id:04x}: {source}")]
    PmtResolution {
        service_id: u16,
        #[source]
        source: PsiError,
    },
}

impl TuneError {
    /// Stable session result code. The same failure maps to the same code
    /// for every delivery system; 0 is never returned.
    pub fn code(&self) -> i32 {
        match self {
            TuneError::Validation(_) => -1,
            TuneError::Lnb(_) => -2,
            TuneError::Resource { stage, .. } => stage.code(),
            TuneError::FrontendInfo(_) => -4,
            TuneError::WrongDeliverySystem { .. } => -5,
            TuneError::Sec(_) => -6,
            TuneError::SetFrontend(_) => -7,
            TuneError::PmtResolution { .. } => -10,
        }
    }

    pub(crate) fn resource(stage: Stage) -> impl FnOnce(io::Error) -> TuneError {
        move |source| TuneError::Resource { stage, source }
    }
}
