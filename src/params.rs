//! Tuning parameter enumerations.
//!
//! Discriminants are the Linux DVB kernel values (`linux/dvb/frontend.h`), so a
//! parsed value can go straight into a `dtv_property`. Symbolic names follow the
//! zap `channels.conf` spelling.

use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind}: {value}")]
pub struct ParseParamError {
    kind: &'static str,
    value: String,
}

fn unknown(kind: &'static str, s: &str) -> ParseParamError {
    ParseParamError {
        kind,
        value: s.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Inversion {
    Off = 0,
    On = 1,
    Auto = 2,
}

impl Inversion {
    pub fn raw(self) -> u32 {
        self as u32
    }
}

impl FromStr for Inversion {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INVERSION_OFF" => Ok(Inversion::Off),
            "INVERSION_ON" => Ok(Inversion::On),
            "INVERSION_AUTO" => Ok(Inversion::Auto),
            _ => Err(unknown("inversion", s)),
        }
    }
}

/// Forward error correction code rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CodeRate {
    None = 0,
    Fec1_2 = 1,
    Fec2_3 = 2,
    Fec3_4 = 3,
    Fec4_5 = 4,
    Fec5_6 = 5,
    Fec6_7 = 6,
    Fec7_8 = 7,
    Fec8_9 = 8,
    Auto = 9,
    Fec3_5 = 10,
    Fec9_10 = 11,
    Fec2_5 = 12,
}

impl CodeRate {
    pub fn raw(self) -> u32 {
        self as u32
    }
}

impl FromStr for CodeRate {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FEC_NONE" => Ok(CodeRate::None),
            "FEC_1_2" => Ok(CodeRate::Fec1_2),
            "FEC_2_3" => Ok(CodeRate::Fec2_3),
            "FEC_3_4" => Ok(CodeRate::Fec3_4),
            "FEC_4_5" => Ok(CodeRate::Fec4_5),
            "FEC_5_6" => Ok(CodeRate::Fec5_6),
            "FEC_6_7" => Ok(CodeRate::Fec6_7),
            "FEC_7_8" => Ok(CodeRate::Fec7_8),
            "FEC_8_9" => Ok(CodeRate::Fec8_9),
            "FEC_AUTO" => Ok(CodeRate::Auto),
            "FEC_3_5" => Ok(CodeRate::Fec3_5),
            "FEC_9_10" => Ok(CodeRate::Fec9_10),
            "FEC_2_5" => Ok(CodeRate::Fec2_5),
            _ => Err(unknown("FEC", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Modulation {
    Qpsk = 0,
    Qam16 = 1,
    Qam32 = 2,
    Qam64 = 3,
    Qam128 = 4,
    Qam256 = 5,
    QamAuto = 6,
    Vsb8 = 7,
    Vsb16 = 8,
    Psk8 = 9,
    Apsk16 = 10,
    Apsk32 = 11,
    Dqpsk = 12,
}

impl Modulation {
    pub fn raw(self) -> u32 {
        self as u32
    }
}

impl FromStr for Modulation {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QPSK" => Ok(Modulation::Qpsk),
            "QAM_16" => Ok(Modulation::Qam16),
            "QAM_32" => Ok(Modulation::Qam32),
            "QAM_64" => Ok(Modulation::Qam64),
            "QAM_128" => Ok(Modulation::Qam128),
            "QAM_256" => Ok(Modulation::Qam256),
            "QAM_AUTO" => Ok(Modulation::QamAuto),
            // azap channel files spell VSB with the order first
            "8VSB" | "VSB_8" => Ok(Modulation::Vsb8),
            "16VSB" | "VSB_16" => Ok(Modulation::Vsb16),
            "PSK_8" => Ok(Modulation::Psk8),
            "APSK_16" => Ok(Modulation::Apsk16),
            "APSK_32" => Ok(Modulation::Apsk32),
            "DQPSK" => Ok(Modulation::Dqpsk),
            _ => Err(unknown("modulation", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bandwidth {
    Mhz1_712,
    Mhz5,
    Mhz6,
    Mhz7,
    Mhz8,
    Mhz10,
    Auto,
}

impl Bandwidth {
    /// Value for `DTV_BANDWIDTH_HZ`; zero lets the driver pick.
    pub fn hz(self) -> u32 {
        match self {
            Bandwidth::Mhz1_712 => 1_712_000,
            Bandwidth::Mhz5 => 5_000_000,
            Bandwidth::Mhz6 => 6_000_000,
            Bandwidth::Mhz7 => 7_000_000,
            Bandwidth::Mhz8 => 8_000_000,
            Bandwidth::Mhz10 => 10_000_000,
            Bandwidth::Auto => 0,
        }
    }
}

impl FromStr for Bandwidth {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BANDWIDTH_6_MHZ" => Ok(Bandwidth::Mhz6),
            "BANDWIDTH_7_MHZ" => Ok(Bandwidth::Mhz7),
            "BANDWIDTH_8_MHZ" => Ok(Bandwidth::Mhz8),
            "BANDWIDTH_5_MHZ" => Ok(Bandwidth::Mhz5),
            "BANDWIDTH_10_MHZ" => Ok(Bandwidth::Mhz10),
            "BANDWIDTH_1_712_MHZ" => Ok(Bandwidth::Mhz1_712),
            "BANDWIDTH_AUTO" => Ok(Bandwidth::Auto),
            _ => Err(unknown("bandwidth", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TransmissionMode {
    Mode2k = 0,
    Mode8k = 1,
    Auto = 2,
    Mode4k = 3,
    Mode1k = 4,
    Mode16k = 5,
    Mode32k = 6,
}

impl TransmissionMode {
    pub fn raw(self) -> u32 {
        self as u32
    }
}

impl FromStr for TransmissionMode {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TRANSMISSION_MODE_2K" => Ok(TransmissionMode::Mode2k),
            "TRANSMISSION_MODE_8K" => Ok(TransmissionMode::Mode8k),
            "TRANSMISSION_MODE_AUTO" => Ok(TransmissionMode::Auto),
            "TRANSMISSION_MODE_4K" => Ok(TransmissionMode::Mode4k),
            "TRANSMISSION_MODE_1K" => Ok(TransmissionMode::Mode1k),
            "TRANSMISSION_MODE_16K" => Ok(TransmissionMode::Mode16k),
            "TRANSMISSION_MODE_32K" => Ok(TransmissionMode::Mode32k),
            _ => Err(unknown("transmission mode", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum GuardInterval {
    G1_32 = 0,
    G1_16 = 1,
    G1_8 = 2,
    G1_4 = 3,
    Auto = 4,
    G1_128 = 5,
    G19_128 = 6,
    G19_256 = 7,
}

impl GuardInterval {
    pub fn raw(self) -> u32 {
        self as u32
    }
}

impl FromStr for GuardInterval {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GUARD_INTERVAL_1_32" => Ok(GuardInterval::G1_32),
            "GUARD_INTERVAL_1_16" => Ok(GuardInterval::G1_16),
            "GUARD_INTERVAL_1_8" => Ok(GuardInterval::G1_8),
            "GUARD_INTERVAL_1_4" => Ok(GuardInterval::G1_4),
            "GUARD_INTERVAL_AUTO" => Ok(GuardInterval::Auto),
            "GUARD_INTERVAL_1_128" => Ok(GuardInterval::G1_128),
            "GUARD_INTERVAL_19_128" => Ok(GuardInterval::G19_128),
            "GUARD_INTERVAL_19_256" => Ok(GuardInterval::G19_256),
            _ => Err(unknown("guard interval", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Hierarchy {
    None = 0,
    H1 = 1,
    H2 = 2,
    H4 = 3,
    Auto = 4,
}

impl Hierarchy {
    pub fn raw(self) -> u32 {
        self as u32
    }
}

impl FromStr for Hierarchy {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HIERARCHY_NONE" => Ok(Hierarchy::None),
            "HIERARCHY_1" => Ok(Hierarchy::H1),
            "HIERARCHY_2" => Ok(Hierarchy::H2),
            "HIERARCHY_4" => Ok(Hierarchy::H4),
            "HIERARCHY_AUTO" => Ok(Hierarchy::Auto),
            _ => Err(unknown("hierarchy", s)),
        }
    }
}

/// LNB feed polarization. Circular polarizations share the same supply
/// voltages (right = vertical, left = horizontal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarization {
    Vertical,
    Horizontal,
}

impl FromStr for Polarization {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v" | "V" | "r" | "R" => Ok(Polarization::Vertical),
            "h" | "H" | "l" | "L" => Ok(Polarization::Horizontal),
            _ => Err(unknown("polarization", s)),
        }
    }
}
