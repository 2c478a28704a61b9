use std::fmt;
use std::path::PathBuf;

use crate::params::{
    Bandwidth, CodeRate, GuardInterval, Hierarchy, Inversion, Modulation, Polarization,
    TransmissionMode,
};

/// Highest valid 13-bit packet identifier; also the null-packet PID.
pub const NULL_PID: u16 = 0x1FFF;

/// Physical device set of one DVB adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TunerDescriptor {
    pub adapter: u32,
    pub frontend: u32,
    pub demux: u32,
}

impl TunerDescriptor {
    pub fn frontend_path(&self) -> PathBuf {
        PathBuf::from(format!(
            "/dev/dvb/adapter{}/frontend{}",
            self.adapter, self.frontend
        ))
    }

    pub fn demux_path(&self) -> PathBuf {
        PathBuf::from(format!("/dev/dvb/adapter{}/demux{}", self.adapter, self.demux))
    }

    /// The audio decoder shares the demux index.
    pub fn audio_path(&self) -> PathBuf {
        PathBuf::from(format!("/dev/dvb/adapter{}/audio{}", self.adapter, self.demux))
    }
}

impl fmt::Display for TunerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "adapter{}/frontend{}+demux{}",
            self.adapter, self.frontend, self.demux
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliverySystem {
    Satellite,
    Cable,
    Terrestrial,
    Atsc,
}

impl fmt::Display for DeliverySystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeliverySystem::Satellite => "DVB-S",
            DeliverySystem::Cable => "DVB-C",
            DeliverySystem::Terrestrial => "DVB-T",
            DeliverySystem::Atsc => "ATSC",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum FrontendType {
    Qpsk = 0,
    Qam = 1,
    Ofdm = 2,
    Atsc = 3,
}

impl FrontendType {
    pub fn raw(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for FrontendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrontendType::Qpsk => "FE_QPSK",
            FrontendType::Qam => "FE_QAM",
            FrontendType::Ofdm => "FE_OFDM",
            FrontendType::Atsc => "FE_ATSC",
        };
        f.write_str(name)
    }
}

/// Where the demux delivers filtered packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Straight into the on-card decoder (`DMX_OUT_DECODER`).
    #[default]
    Decoder,
    /// Multiplexed onto the dvr device for an external demultiplexer
    /// (`DMX_OUT_TS_TAP`).
    TsTap,
}

/// DVB-S request. Frequencies are the downlink frequency in kHz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SatelliteRequest {
    pub frequency: u32,
    pub polarization: Polarization,
    pub sat_no: u32,
    pub symbol_rate: u32,
    pub video_pid: u16,
    pub audio_pid: u16,
    pub service_id: u16,
}

/// DVB-C request. Frequency in Hz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CableRequest {
    pub frequency: u32,
    pub inversion: Inversion,
    pub symbol_rate: u32,
    pub modulation: Modulation,
    pub fec: CodeRate,
    pub video_pid: u16,
    pub audio_pid: u16,
    pub service_id: u16,
}

/// DVB-T request. Frequency in Hz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrestrialRequest {
    pub frequency: u32,
    pub inversion: Inversion,
    pub bandwidth: Bandwidth,
    pub fec_hp: CodeRate,
    pub fec_lp: CodeRate,
    pub modulation: Modulation,
    pub transmission_mode: TransmissionMode,
    pub guard_interval: GuardInterval,
    pub hierarchy: Hierarchy,
    pub video_pid: u16,
    pub audio_pid: u16,
    pub service_id: u16,
}

/// ATSC over-air request. Frequency in Hz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtscRequest {
    pub frequency: u32,
    pub modulation: Modulation,
    pub video_pid: u16,
    pub audio_pid: u16,
    pub service_id: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TuneRequest {
    Satellite(SatelliteRequest),
    Cable(CableRequest),
    Terrestrial(TerrestrialRequest),
    Atsc(AtscRequest),
}

impl TuneRequest {
    pub fn delivery_system(&self) -> DeliverySystem {
        match self {
            TuneRequest::Satellite(_) => DeliverySystem::Satellite,
            TuneRequest::Cable(_) => DeliverySystem::Cable,
            TuneRequest::Terrestrial(_) => DeliverySystem::Terrestrial,
            TuneRequest::Atsc(_) => DeliverySystem::Atsc,
        }
    }

    pub fn video_pid(&self) -> u16 {
        match self {
            TuneRequest::Satellite(r) => r.video_pid,
            TuneRequest::Cable(r) => r.video_pid,
            TuneRequest::Terrestrial(r) => r.video_pid,
            TuneRequest::Atsc(r) => r.video_pid,
        }
    }

    pub fn audio_pid(&self) -> u16 {
        match self {
            TuneRequest::Satellite(r) => r.audio_pid,
            TuneRequest::Cable(r) => r.audio_pid,
            TuneRequest::Terrestrial(r) => r.audio_pid,
            TuneRequest::Atsc(r) => r.audio_pid,
        }
    }

    pub fn service_id(&self) -> u16 {
        match self {
            TuneRequest::Satellite(r) => r.service_id,
            TuneRequest::Cable(r) => r.service_id,
            TuneRequest::Terrestrial(r) => r.service_id,
            TuneRequest::Atsc(r) => r.service_id,
        }
    }
}
