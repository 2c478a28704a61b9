//! Per-standard parameter checks.
//!
//! Every enumerated field is matched against the values its standard allows;
//! the first offender is reported. Nothing here touches hardware.

use std::fmt::Debug;

use crate::error::{Field, ValidationError};
use crate::params::{
    Bandwidth, CodeRate, GuardInterval, Hierarchy, Inversion, Modulation, TransmissionMode,
};
use crate::request::{
    AtscRequest, CableRequest, NULL_PID, SatelliteRequest, TerrestrialRequest, TuneRequest,
};

const INVERSIONS: &[Inversion] = &[Inversion::Off, Inversion::On, Inversion::Auto];

const CABLE_FEC: &[CodeRate] = &[
    CodeRate::Fec1_2,
    CodeRate::Fec2_3,
    CodeRate::Fec3_4,
    CodeRate::Fec4_5,
    CodeRate::Fec5_6,
    CodeRate::Fec6_7,
    CodeRate::Fec7_8,
    CodeRate::Fec8_9,
    CodeRate::Auto,
    CodeRate::None,
];

const CABLE_MODULATIONS: &[Modulation] = &[
    Modulation::Qam16,
    Modulation::Qam32,
    Modulation::Qam64,
    Modulation::Qam128,
    Modulation::Qam256,
    Modulation::QamAuto,
];

const TERRESTRIAL_BANDWIDTHS: &[Bandwidth] = &[Bandwidth::Mhz6, Bandwidth::Mhz7, Bandwidth::Mhz8];

// Checked after FEC_NONE has been folded into FEC_AUTO.
const TERRESTRIAL_FEC: &[CodeRate] = &[
    CodeRate::Auto,
    CodeRate::Fec1_2,
    CodeRate::Fec2_3,
    CodeRate::Fec3_4,
    CodeRate::Fec5_6,
    CodeRate::Fec7_8,
];

const TERRESTRIAL_MODULATIONS: &[Modulation] = &[
    Modulation::Qpsk,
    Modulation::Qam16,
    Modulation::Qam32,
    Modulation::Qam64,
    Modulation::Qam128,
    Modulation::Qam256,
    Modulation::QamAuto,
];

const TERRESTRIAL_TRANSMISSION_MODES: &[TransmissionMode] = &[
    TransmissionMode::Mode2k,
    TransmissionMode::Mode8k,
    TransmissionMode::Auto,
];

const TERRESTRIAL_GUARD_INTERVALS: &[GuardInterval] = &[
    GuardInterval::G1_32,
    GuardInterval::G1_16,
    GuardInterval::G1_8,
    GuardInterval::G1_4,
    GuardInterval::Auto,
];

const TERRESTRIAL_HIERARCHIES: &[Hierarchy] = &[
    Hierarchy::None,
    Hierarchy::H1,
    Hierarchy::H2,
    Hierarchy::H4,
    Hierarchy::Auto,
];

const ATSC_MODULATIONS: &[Modulation] = &[
    Modulation::Vsb8,
    Modulation::Vsb16,
    Modulation::Qam64,
    Modulation::Qam256,
];

/// Highest DiSEqC committed-switch position (two address bits).
pub const MAX_SAT_NO: u32 = 3;

fn one_of<T: PartialEq + Debug>(field: Field, value: T, legal: &[T]) -> Result<(), ValidationError> {
    if legal.contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, value))
    }
}

fn invalid(field: Field, value: impl Debug) -> ValidationError {
    ValidationError::InvalidParameter {
        field,
        value: format!("{value:?}"),
    }
}

fn check_pids(video_pid: u16, audio_pid: u16) -> Result<(), ValidationError> {
    if video_pid > NULL_PID {
        return Err(invalid(Field::VideoPid, video_pid));
    }
    if audio_pid > NULL_PID {
        return Err(invalid(Field::AudioPid, audio_pid));
    }
    Ok(())
}

/// DVB-T accepts "no FEC" as a request for automatic detection.
fn normalize_terrestrial_fec(fec: CodeRate) -> CodeRate {
    match fec {
        CodeRate::None => CodeRate::Auto,
        other => other,
    }
}

fn validate_satellite(req: &SatelliteRequest) -> Result<SatelliteRequest, ValidationError> {
    if req.sat_no > MAX_SAT_NO {
        return Err(invalid(Field::SatelliteNumber, req.sat_no));
    }
    if req.symbol_rate == 0 {
        return Err(invalid(Field::SymbolRate, req.symbol_rate));
    }
    check_pids(req.video_pid, req.audio_pid)?;

    // PID 0 means "none" here; the null PID keeps the filter from matching
    let mut normalized = req.clone();
    if normalized.video_pid == 0 {
        normalized.video_pid = NULL_PID;
    }
    if normalized.audio_pid == 0 {
        normalized.audio_pid = NULL_PID;
    }
    Ok(normalized)
}

fn validate_cable(req: &CableRequest) -> Result<CableRequest, ValidationError> {
    one_of(Field::Inversion, req.inversion, INVERSIONS)?;
    one_of(Field::Fec, req.fec, CABLE_FEC)?;
    one_of(Field::Modulation, req.modulation, CABLE_MODULATIONS)?;
    if req.symbol_rate == 0 {
        return Err(invalid(Field::SymbolRate, req.symbol_rate));
    }
    check_pids(req.video_pid, req.audio_pid)?;
    Ok(req.clone())
}

fn validate_terrestrial(req: &TerrestrialRequest) -> Result<TerrestrialRequest, ValidationError> {
    let mut normalized = req.clone();
    normalized.fec_hp = normalize_terrestrial_fec(req.fec_hp);
    normalized.fec_lp = normalize_terrestrial_fec(req.fec_lp);

    one_of(Field::Inversion, normalized.inversion, INVERSIONS)?;
    one_of(Field::Bandwidth, normalized.bandwidth, TERRESTRIAL_BANDWIDTHS)?;
    one_of(Field::FecHp, normalized.fec_hp, TERRESTRIAL_FEC)?;
    one_of(Field::FecLp, normalized.fec_lp, TERRESTRIAL_FEC)?;
    one_of(Field::Modulation, normalized.modulation, TERRESTRIAL_MODULATIONS)?;
    one_of(
        Field::TransmissionMode,
        normalized.transmission_mode,
        TERRESTRIAL_TRANSMISSION_MODES,
    )?;
    one_of(
        Field::GuardInterval,
        normalized.guard_interval,
        TERRESTRIAL_GUARD_INTERVALS,
    )?;
    one_of(Field::Hierarchy, normalized.hierarchy, TERRESTRIAL_HIERARCHIES)?;
    check_pids(normalized.video_pid, normalized.audio_pid)?;
    Ok(normalized)
}

fn validate_atsc(req: &AtscRequest) -> Result<AtscRequest, ValidationError> {
    one_of(Field::Modulation, req.modulation, ATSC_MODULATIONS)?;
    check_pids(req.video_pid, req.audio_pid)?;
    Ok(req.clone())
}

/// Check a request against its standard and return the normalized request
/// the rest of the session works from.
pub fn validate(request: &TuneRequest) -> Result<TuneRequest, ValidationError> {
    match request {
        TuneRequest::Satellite(r) => validate_satellite(r).map(TuneRequest::Satellite),
        TuneRequest::Cable(r) => validate_cable(r).map(TuneRequest::Cable),
        TuneRequest::Terrestrial(r) => validate_terrestrial(r).map(TuneRequest::Terrestrial),
        TuneRequest::Atsc(r) => validate_atsc(r).map(TuneRequest::Atsc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Polarization;

    const ALL_FEC: &[CodeRate] = &[
        CodeRate::None,
        CodeRate::Fec1_2,
        CodeRate::Fec2_3,
        CodeRate::Fec3_4,
        CodeRate::Fec4_5,
        CodeRate::Fec5_6,
        CodeRate::Fec6_7,
        CodeRate::Fec7_8,
        CodeRate::Fec8_9,
        CodeRate::Auto,
        CodeRate::Fec3_5,
        CodeRate::Fec9_10,
        CodeRate::Fec2_5,
    ];

    const ALL_MODULATIONS: &[Modulation] = &[
        Modulation::Qpsk,
        Modulation::Qam16,
        Modulation::Qam32,
        Modulation::Qam64,
        Modulation::Qam128,
        Modulation::Qam256,
        Modulation::QamAuto,
        Modulation::Vsb8,
        Modulation::Vsb16,
        Modulation::Psk8,
        Modulation::Apsk16,
        Modulation::Apsk32,
        Modulation::Dqpsk,
    ];

    fn cable() -> CableRequest {
        CableRequest {
            frequency: 346_000_000,
            inversion: Inversion::Auto,
            symbol_rate: 6_900_000,
            modulation: Modulation::Qam256,
            fec: CodeRate::None,
            video_pid: 1011,
            audio_pid: 1012,
            service_id: 28006,
        }
    }

    fn terrestrial() -> TerrestrialRequest {
        TerrestrialRequest {
            frequency: 557_000_000,
            inversion: Inversion::Auto,
            bandwidth: Bandwidth::Mhz6,
            fec_hp: CodeRate::Fec2_3,
            fec_lp: CodeRate::Auto,
            modulation: Modulation::Qam64,
            transmission_mode: TransmissionMode::Mode8k,
            guard_interval: GuardInterval::G1_8,
            hierarchy: Hierarchy::None,
            video_pid: 4097,
            audio_pid: 4098,
            service_id: 1,
        }
    }

    fn satellite() -> SatelliteRequest {
        SatelliteRequest {
            frequency: 12_500_000,
            polarization: Polarization::Vertical,
            sat_no: 0,
            symbol_rate: 27_500_000,
            video_pid: 100,
            audio_pid: 200,
            service_id: 1,
        }
    }

    fn atsc() -> AtscRequest {
        AtscRequest {
            frequency: 189_000_000,
            modulation: Modulation::Vsb8,
            video_pid: 49,
            audio_pid: 52,
            service_id: 3,
        }
    }

    fn field_of(req: TuneRequest) -> Field {
        validate(&req).unwrap_err().field()
    }

    #[test]
    fn test_valid_requests_pass() {
        assert!(validate(&TuneRequest::Cable(cable())).is_ok());
        assert!(validate(&TuneRequest::Terrestrial(terrestrial())).is_ok());
        assert!(validate(&TuneRequest::Satellite(satellite())).is_ok());
        assert!(validate(&TuneRequest::Atsc(atsc())).is_ok());
    }

    #[test]
    fn test_cable_modulation_set() {
        for &m in ALL_MODULATIONS {
            let mut req = cable();
            req.modulation = m;
            let result = validate(&TuneRequest::Cable(req));
            assert_eq!(result.is_ok(), CABLE_MODULATIONS.contains(&m), "{m:?}");
            if let Err(e) = result {
                assert_eq!(e.field(), Field::Modulation);
            }
        }
    }

    #[test]
    fn test_cable_fec_set() {
        for &fec in ALL_FEC {
            let mut req = cable();
            req.fec = fec;
            let ok = validate(&TuneRequest::Cable(req)).is_ok();
            assert_eq!(ok, CABLE_FEC.contains(&fec), "{fec:?}");
        }
    }

    #[test]
    fn test_cable_fec_none_passes_through() {
        let normalized = validate(&TuneRequest::Cable(cable())).unwrap();
        let TuneRequest::Cable(req) = normalized else {
            panic!("variant changed");
        };
        assert_eq!(req.fec, CodeRate::None);
    }

    #[test]
    fn test_terrestrial_fec_none_becomes_auto() {
        let mut req = terrestrial();
        req.fec_hp = CodeRate::None;
        req.fec_lp = CodeRate::None;
        let TuneRequest::Terrestrial(none) = validate(&TuneRequest::Terrestrial(req)).unwrap()
        else {
            panic!("variant changed");
        };

        let mut req = terrestrial();
        req.fec_hp = CodeRate::Auto;
        req.fec_lp = CodeRate::Auto;
        let TuneRequest::Terrestrial(auto) = validate(&TuneRequest::Terrestrial(req)).unwrap()
        else {
            panic!("variant changed");
        };

        assert_eq!(none, auto);
    }

    #[test]
    fn test_terrestrial_fec_set() {
        for &fec in ALL_FEC {
            let mut req = terrestrial();
            req.fec_hp = fec;
            let ok = validate(&TuneRequest::Terrestrial(req)).is_ok();
            let expected = fec == CodeRate::None || TERRESTRIAL_FEC.contains(&fec);
            assert_eq!(ok, expected, "fec_hp {fec:?}");

            let mut req = terrestrial();
            req.fec_lp = fec;
            let result = validate(&TuneRequest::Terrestrial(req));
            assert_eq!(result.is_ok(), expected, "fec_lp {fec:?}");
            if let Err(e) = result {
                assert_eq!(e.field(), Field::FecLp);
            }
        }
    }

    #[test]
    fn test_terrestrial_rejections_name_field() {
        let mut req = terrestrial();
        req.bandwidth = Bandwidth::Mhz5;
        assert_eq!(field_of(TuneRequest::Terrestrial(req)), Field::Bandwidth);

        let mut req = terrestrial();
        req.bandwidth = Bandwidth::Auto;
        assert_eq!(field_of(TuneRequest::Terrestrial(req)), Field::Bandwidth);

        let mut req = terrestrial();
        req.modulation = Modulation::Vsb8;
        assert_eq!(field_of(TuneRequest::Terrestrial(req)), Field::Modulation);

        let mut req = terrestrial();
        req.transmission_mode = TransmissionMode::Mode4k;
        assert_eq!(field_of(TuneRequest::Terrestrial(req)), Field::TransmissionMode);

        let mut req = terrestrial();
        req.guard_interval = GuardInterval::G1_128;
        assert_eq!(field_of(TuneRequest::Terrestrial(req)), Field::GuardInterval);
    }

    #[test]
    fn test_terrestrial_first_offender_reported() {
        let mut req = terrestrial();
        req.bandwidth = Bandwidth::Mhz10;
        req.modulation = Modulation::Vsb16;
        assert_eq!(field_of(TuneRequest::Terrestrial(req)), Field::Bandwidth);
    }

    #[test]
    fn test_atsc_modulation_set() {
        for &m in ALL_MODULATIONS {
            let mut req = atsc();
            req.modulation = m;
            let ok = validate(&TuneRequest::Atsc(req)).is_ok();
            assert_eq!(ok, ATSC_MODULATIONS.contains(&m), "{m:?}");
        }
    }

    #[test]
    fn test_satellite_position_range() {
        for sat_no in 0..=MAX_SAT_NO {
            let mut req = satellite();
            req.sat_no = sat_no;
            assert!(validate(&TuneRequest::Satellite(req)).is_ok());
        }
        let mut req = satellite();
        req.sat_no = 4;
        assert_eq!(field_of(TuneRequest::Satellite(req)), Field::SatelliteNumber);
    }

    #[test]
    fn test_satellite_zero_pids_become_null_pid() {
        let mut req = satellite();
        req.video_pid = 0;
        req.audio_pid = 0;
        let normalized = validate(&TuneRequest::Satellite(req)).unwrap();
        assert_eq!(normalized.video_pid(), NULL_PID);
        assert_eq!(normalized.audio_pid(), NULL_PID);
    }

    #[test]
    fn test_pid_out_of_range() {
        let mut req = atsc();
        req.video_pid = 0x2000;
        assert_eq!(field_of(TuneRequest::Atsc(req)), Field::VideoPid);

        let mut req = cable();
        req.audio_pid = 0xFFFF;
        assert_eq!(field_of(TuneRequest::Cable(req)), Field::AudioPid);
    }

    #[test]
    fn test_validation_is_repeatable() {
        let req = TuneRequest::Terrestrial(terrestrial());
        assert_eq!(validate(&req), validate(&req));
    }
}
