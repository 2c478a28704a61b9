//! zap-style `channels.conf` reading.
//!
//! One line per service, colon separated, with a layout per delivery system:
//!
//! ```text
//! DVB-S:  name:freq_mhz:pol:sat_no:symbol_rate_ksym:vpid:apid:sid
//! DVB-C:  name:freq_hz:INVERSION:symbol_rate:FEC:MODULATION:vpid:apid:sid
//! DVB-T:  name:freq_hz:INVERSION:BANDWIDTH:FEC_HP:FEC_LP:MODULATION:
//!         TRANSMISSION_MODE:GUARD_INTERVAL:HIERARCHY:vpid:apid:sid
//! ATSC:   name:freq_hz:MODULATION:vpid:apid:sid
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::request::{
    AtscRequest, CableRequest, DeliverySystem, SatelliteRequest, TerrestrialRequest, TuneRequest,
};

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Line {line}: expected {expected} fields for {system}, got {found}")]
    FieldCount {
        line: usize,
        system: DeliverySystem,
        expected: usize,
        found: usize,
    },
    #[error("Line {line}: invalid {what} '{value}'")]
    BadValue {
        line: usize,
        what: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub name: String,
    pub request: TuneRequest,
}

fn field_count(system: DeliverySystem) -> usize {
    match system {
        DeliverySystem::Satellite => 8,
        DeliverySystem::Cable => 9,
        DeliverySystem::Terrestrial => 13,
        DeliverySystem::Atsc => 6,
    }
}

struct Fields<'a> {
    line: usize,
    values: Vec<&'a str>,
}

impl Fields<'_> {
    fn get<T: FromStr>(&self, index: usize, what: &'static str) -> Result<T, ChannelError> {
        let raw = self.values[index].trim();
        raw.parse::<T>().map_err(|_| ChannelError::BadValue {
            line: self.line,
            what,
            value: raw.to_string(),
        })
    }

    /// Integer field scaled by `factor`, e.g. MHz to kHz.
    fn scaled(&self, index: usize, what: &'static str, factor: u32) -> Result<u32, ChannelError> {
        let value: u32 = self.get(index, what)?;
        value.checked_mul(factor).ok_or_else(|| ChannelError::BadValue {
            line: self.line,
            what,
            value: self.values[index].trim().to_string(),
        })
    }
}

/// Parse one non-comment line. `line` is the 1-based line number used in
/// errors.
pub fn parse_channel_line(
    text: &str,
    line: usize,
    system: DeliverySystem,
) -> Result<Channel, ChannelError> {
    let values: Vec<&str> = text.split(':').collect();
    let expected = field_count(system);
    if values.len() != expected {
        return Err(ChannelError::FieldCount {
            line,
            system,
            expected,
            found: values.len(),
        });
    }
    let f = Fields { line, values };
    let name = f.values[0].trim().to_string();

    let request = match system {
        DeliverySystem::Satellite => TuneRequest::Satellite(SatelliteRequest {
            frequency: f.scaled(1, "frequency", 1000)?,
            polarization: f.get(2, "polarization")?,
            sat_no: f.get(3, "satellite number")?,
            symbol_rate: f.scaled(4, "symbol rate", 1000)?,
            video_pid: f.get(5, "video PID")?,
            audio_pid: f.get(6, "audio PID")?,
            service_id: f.get(7, "service ID")?,
        }),
        DeliverySystem::Cable => TuneRequest::Cable(CableRequest {
            frequency: f.get(1, "frequency")?,
            inversion: f.get(2, "inversion")?,
            symbol_rate: f.get(3, "symbol rate")?,
            fec: f.get(4, "FEC")?,
            modulation: f.get(5, "modulation")?,
            video_pid: f.get(6, "video PID")?,
            audio_pid: f.get(7, "audio PID")?,
            service_id: f.get(8, "service ID")?,
        }),
        DeliverySystem::Terrestrial => TuneRequest::Terrestrial(TerrestrialRequest {
            frequency: f.get(1, "frequency")?,
            inversion: f.get(2, "inversion")?,
            bandwidth: f.get(3, "bandwidth")?,
            fec_hp: f.get(4, "FEC HP")?,
            fec_lp: f.get(5, "FEC LP")?,
            modulation: f.get(6, "modulation")?,
            transmission_mode: f.get(7, "transmission mode")?,
            guard_interval: f.get(8, "guard interval")?,
            hierarchy: f.get(9, "hierarchy")?,
            video_pid: f.get(10, "video PID")?,
            audio_pid: f.get(11, "audio PID")?,
            service_id: f.get(12, "service ID")?,
        }),
        DeliverySystem::Atsc => TuneRequest::Atsc(AtscRequest {
            frequency: f.get(1, "frequency")?,
            modulation: f.get(2, "modulation")?,
            video_pid: f.get(3, "video PID")?,
            audio_pid: f.get(4, "audio PID")?,
            service_id: f.get(5, "service ID")?,
        }),
    };

    Ok(Channel { name, request })
}

pub fn parse_channels_conf(
    path: &Path,
    system: DeliverySystem,
) -> Result<Vec<Channel>, ChannelError> {
    let content = fs::read_to_string(path).map_err(|source| ChannelError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut channels = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        channels.push(parse_channel_line(line, line_num + 1, system)?);
    }

    Ok(channels)
}

/// First channel whose name matches exactly, else the first one matching
/// case-insensitively.
pub fn find_channel<'a>(channels: &'a [Channel], name: &str) -> Option<&'a Channel> {
    channels
        .iter()
        .find(|c| c.name == name)
        .or_else(|| channels.iter().find(|c| c.name.eq_ignore_ascii_case(name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{
        Bandwidth, CodeRate, GuardInterval, Hierarchy, Inversion, Modulation, Polarization,
        TransmissionMode,
    };

    fn write_conf(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("channels.conf");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_parse_satellite_line() {
        let ch = parse_channel_line(
            "Das Erste:11837:h:0:27500:101:102:28106",
            1,
            DeliverySystem::Satellite,
        )
        .unwrap();
        assert_eq!(ch.name, "Das Erste");
        assert_eq!(
            ch.request,
            TuneRequest::Satellite(SatelliteRequest {
                frequency: 11_837_000,
                polarization: Polarization::Horizontal,
                sat_no: 0,
                symbol_rate: 27_500_000,
                video_pid: 101,
                audio_pid: 102,
                service_id: 28106,
            })
        );
    }

    #[test]
    fn test_parse_cable_line() {
        let ch = parse_channel_line(
            "arte:394000000:INVERSION_AUTO:6900000:FEC_NONE:QAM_256:401:402:28724",
            1,
            DeliverySystem::Cable,
        )
        .unwrap();
        match ch.request {
            TuneRequest::Cable(r) => {
                assert_eq!(r.frequency, 394_000_000);
                assert_eq!(r.inversion, Inversion::Auto);
                assert_eq!(r.symbol_rate, 6_900_000);
                assert_eq!(r.fec, CodeRate::None);
                assert_eq!(r.modulation, Modulation::Qam256);
                assert_eq!(r.service_id, 28724);
            }
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[test]
    fn test_parse_terrestrial_line() {
        let ch = parse_channel_line(
            "CTV:533000000:INVERSION_AUTO:BANDWIDTH_6_MHZ:FEC_AUTO:FEC_AUTO:QAM_AUTO:\
             TRANSMISSION_MODE_AUTO:GUARD_INTERVAL_AUTO:HIERARCHY_AUTO:0:0:1",
            1,
            DeliverySystem::Terrestrial,
        )
        .unwrap();
        assert_eq!(
            ch.request,
            TuneRequest::Terrestrial(TerrestrialRequest {
                frequency: 533_000_000,
                inversion: Inversion::Auto,
                bandwidth: Bandwidth::Mhz6,
                fec_hp: CodeRate::Auto,
                fec_lp: CodeRate::Auto,
                modulation: Modulation::QamAuto,
                transmission_mode: TransmissionMode::Auto,
                guard_interval: GuardInterval::Auto,
                hierarchy: Hierarchy::Auto,
                video_pid: 0,
                audio_pid: 0,
                service_id: 1,
            })
        );
    }

    #[test]
    fn test_parse_atsc_line() {
        let ch = parse_channel_line("KQED:189000000:8VSB:49:52:3", 1, DeliverySystem::Atsc)
            .unwrap();
        match ch.request {
            TuneRequest::Atsc(r) => {
                assert_eq!(r.modulation, Modulation::Vsb8);
                assert_eq!(r.video_pid, 49);
            }
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[test]
    fn test_field_count_mismatch() {
        let err = parse_channel_line("KQED:189000000:8VSB:49:52", 4, DeliverySystem::Atsc)
            .unwrap_err();
        assert_eq!(err.to_string(), "Line 4: expected 6 fields for ATSC, got 5");
    }

    #[test]
    fn test_bad_symbolic_value() {
        let err = parse_channel_line(
            "x:394000000:INVERSION_MAYBE:6900000:FEC_NONE:QAM_256:1:2:3",
            2,
            DeliverySystem::Cable,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Line 2: invalid inversion 'INVERSION_MAYBE'");
    }

    #[test]
    fn test_satellite_frequency_overflow() {
        let err = parse_channel_line("x:9999999:v:0:27500:1:2:3", 1, DeliverySystem::Satellite)
            .unwrap_err();
        assert!(matches!(err, ChannelError::BadValue { what: "frequency", .. }));
    }

    #[test]
    fn test_parse_channels_conf_skips_comments() {
        let (_dir, path) = write_conf(
            "# ATSC channels\n\
             \n\
             KQED:189000000:8VSB:49:52:3\n\
             KTVU:177000000:8VSB:49:52:1\n",
        );
        let channels = parse_channels_conf(&path, DeliverySystem::Atsc).unwrap();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[1].name, "KTVU");
    }

    #[test]
    fn test_parse_channels_conf_reports_line_number() {
        let (_dir, path) = write_conf("KQED:189000000:8VSB:49:52:3\n# ok\nbroken\n");
        let err = parse_channels_conf(&path, DeliverySystem::Atsc).unwrap_err();
        assert!(err.to_string().starts_with("Line 3:"));
    }

    #[test]
    fn test_parse_channels_conf_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.conf");
        let err = parse_channels_conf(&path, DeliverySystem::Cable).unwrap_err();
        assert!(matches!(err, ChannelError::Read { .. }));
    }

    #[test]
    fn test_find_channel() {
        let (_dir, path) = write_conf(
            "KQED:189000000:8VSB:49:52:3\n\
             kqed:177000000:8VSB:49:52:1\n\
             KTVU:177000000:8VSB:49:52:1\n",
        );
        let channels = parse_channels_conf(&path, DeliverySystem::Atsc).unwrap();
        assert_eq!(find_channel(&channels, "kqed").unwrap().request.service_id(), 1);
        assert_eq!(find_channel(&channels, "ktvu").unwrap().name, "KTVU");
        assert!(find_channel(&channels, "KRON").is_none());
    }
}
