use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;

use libc::c_int;
use log::{debug, info};

use crate::diseqc::{DiseqcCommand, MiniBurst, SecControl, Tone, Voltage};
use crate::error::TuneError;
use crate::params::{
    Bandwidth, CodeRate, GuardInterval, Hierarchy, Inversion, Modulation, TransmissionMode,
};
use crate::request::{AtscRequest, CableRequest, FrontendType, TerrestrialRequest};

// DVB v5 API property command IDs
pub const DTV_TUNE: u32 = 1;
pub const DTV_CLEAR: u32 = 2;
pub const DTV_FREQUENCY: u32 = 3;
pub const DTV_MODULATION: u32 = 4;
pub const DTV_BANDWIDTH_HZ: u32 = 5;
pub const DTV_INVERSION: u32 = 6;
pub const DTV_SYMBOL_RATE: u32 = 8;
pub const DTV_INNER_FEC: u32 = 9;
pub const DTV_DELIVERY_SYSTEM: u32 = 17;
pub const DTV_CODE_RATE_HP: u32 = 36;
pub const DTV_CODE_RATE_LP: u32 = 37;
pub const DTV_GUARD_INTERVAL: u32 = 38;
pub const DTV_TRANSMISSION_MODE: u32 = 39;
pub const DTV_HIERARCHY: u32 = 40;

// Delivery systems (fe_delivery_system_t)
const SYS_DVBC_ANNEX_A: u32 = 1;
const SYS_DVBC_ANNEX_B: u32 = 2;
const SYS_DVBT: u32 = 3;
const SYS_DVBS: u32 = 5;
const SYS_ATSC: u32 = 11;

/// Subset of `struct dvb_frontend_info` the tuner cares about.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrontendInfo {
    pub name: String,
    pub fe_type: u32,
    pub frequency_min: u32,
    pub frequency_max: u32,
    pub symbol_rate_min: u32,
    pub symbol_rate_max: u32,
    pub caps: u32,
}

/// `fe_status_t` bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeStatus(pub u32);

impl FeStatus {
    pub const HAS_SIGNAL: u32 = 0x01;
    pub const HAS_CARRIER: u32 = 0x02;
    pub const HAS_VITERBI: u32 = 0x04;
    pub const HAS_SYNC: u32 = 0x08;
    pub const HAS_LOCK: u32 = 0x10;

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn has_lock(self) -> bool {
        self.0 & Self::HAS_LOCK != 0
    }
}

/// One letter per acquired stage, as the zap tools print it.
impl fmt::Display for FeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            (Self::HAS_SIGNAL, 'S'),
            (Self::HAS_CARRIER, 'C'),
            (Self::HAS_VITERBI, 'V'),
            (Self::HAS_SYNC, 'Y'),
            (Self::HAS_LOCK, 'L'),
        ];
        for (bit, c) in flags {
            write!(f, "{}", if self.0 & bit != 0 { c } else { ' ' })?;
        }
        Ok(())
    }
}

/// Normalized parameters for one `FE_SET_PROPERTY` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontendParams {
    Qpsk {
        /// Intermediate frequency in kHz.
        frequency: u32,
        symbol_rate: u32,
    },
    Qam {
        frequency: u32,
        inversion: Inversion,
        symbol_rate: u32,
        modulation: Modulation,
        fec: CodeRate,
    },
    Ofdm {
        frequency: u32,
        inversion: Inversion,
        bandwidth: Bandwidth,
        fec_hp: CodeRate,
        fec_lp: CodeRate,
        modulation: Modulation,
        transmission_mode: TransmissionMode,
        guard_interval: GuardInterval,
        hierarchy: Hierarchy,
    },
    Vsb {
        frequency: u32,
        modulation: Modulation,
    },
}

impl FrontendParams {
    pub fn frontend_type(&self) -> FrontendType {
        match self {
            FrontendParams::Qpsk { .. } => FrontendType::Qpsk,
            FrontendParams::Qam { .. } => FrontendType::Qam,
            FrontendParams::Ofdm { .. } => FrontendType::Ofdm,
            FrontendParams::Vsb { .. } => FrontendType::Atsc,
        }
    }

    /// `(command, value)` pairs: a clear, the delivery system, the
    /// parameters, then the tune trigger.
    pub fn properties(&self) -> Vec<(u32, u32)> {
        let mut props = vec![(DTV_CLEAR, 0)];
        match *self {
            FrontendParams::Qpsk {
                frequency,
                symbol_rate,
            } => props.extend([
                (DTV_DELIVERY_SYSTEM, SYS_DVBS),
                (DTV_FREQUENCY, frequency),
                (DTV_INVERSION, Inversion::Auto.raw()),
                (DTV_SYMBOL_RATE, symbol_rate),
                (DTV_INNER_FEC, CodeRate::Auto.raw()),
            ]),
            FrontendParams::Qam {
                frequency,
                inversion,
                symbol_rate,
                modulation,
                fec,
            } => props.extend([
                (DTV_DELIVERY_SYSTEM, SYS_DVBC_ANNEX_A),
                (DTV_FREQUENCY, frequency),
                (DTV_INVERSION, inversion.raw()),
                (DTV_SYMBOL_RATE, symbol_rate),
                (DTV_MODULATION, modulation.raw()),
                (DTV_INNER_FEC, fec.raw()),
            ]),
            FrontendParams::Ofdm {
                frequency,
                inversion,
                bandwidth,
                fec_hp,
                fec_lp,
                modulation,
                transmission_mode,
                guard_interval,
                hierarchy,
            } => props.extend([
                (DTV_DELIVERY_SYSTEM, SYS_DVBT),
                (DTV_FREQUENCY, frequency),
                (DTV_BANDWIDTH_HZ, bandwidth.hz()),
                (DTV_MODULATION, modulation.raw()),
                (DTV_CODE_RATE_HP, fec_hp.raw()),
                (DTV_CODE_RATE_LP, fec_lp.raw()),
                (DTV_INVERSION, inversion.raw()),
                (DTV_TRANSMISSION_MODE, transmission_mode.raw()),
                (DTV_GUARD_INTERVAL, guard_interval.raw()),
                (DTV_HIERARCHY, hierarchy.raw()),
            ]),
            FrontendParams::Vsb {
                frequency,
                modulation,
            } => props.extend([
                (DTV_DELIVERY_SYSTEM, atsc_delivery_system(modulation)),
                (DTV_FREQUENCY, frequency),
                (DTV_MODULATION, modulation.raw()),
            ]),
        }
        props.push((DTV_TUNE, 0));
        props
    }
}

/// An ATSC frontend carries both 8/16-VSB broadcast and North American
/// cable, which the kernel knows as DVB-C Annex B.
fn atsc_delivery_system(modulation: Modulation) -> u32 {
    match modulation {
        Modulation::Qam64 | Modulation::Qam256 => SYS_DVBC_ANNEX_B,
        _ => SYS_ATSC,
    }
}

impl From<&CableRequest> for FrontendParams {
    fn from(r: &CableRequest) -> Self {
        FrontendParams::Qam {
            frequency: r.frequency,
            inversion: r.inversion,
            symbol_rate: r.symbol_rate,
            modulation: r.modulation,
            fec: r.fec,
        }
    }
}

impl From<&TerrestrialRequest> for FrontendParams {
    fn from(r: &TerrestrialRequest) -> Self {
        FrontendParams::Ofdm {
            frequency: r.frequency,
            inversion: r.inversion,
            bandwidth: r.bandwidth,
            fec_hp: r.fec_hp,
            fec_lp: r.fec_lp,
            modulation: r.modulation,
            transmission_mode: r.transmission_mode,
            guard_interval: r.guard_interval,
            hierarchy: r.hierarchy,
        }
    }
}

impl From<&AtscRequest> for FrontendParams {
    fn from(r: &AtscRequest) -> Self {
        FrontendParams::Vsb {
            frequency: r.frequency,
            modulation: r.modulation,
        }
    }
}

/// An open frontend device.
pub trait Frontend: SecControl {
    fn info(&mut self) -> io::Result<FrontendInfo>;
    fn set_params(&mut self, params: &FrontendParams) -> io::Result<()>;
    fn read_status(&mut self) -> io::Result<FeStatus>;
    fn read_signal_strength(&mut self) -> io::Result<u16>;
    fn read_snr(&mut self) -> io::Result<u16>;
    fn read_ber(&mut self) -> io::Result<u32>;
    fn read_uncorrected_blocks(&mut self) -> io::Result<u32>;
}

/// Check the frontend serves the requested standard, then program it.
/// No retries; a rejected tune fails the call.
pub fn tune<F: Frontend + ?Sized>(fe: &mut F, params: &FrontendParams) -> Result<(), TuneError> {
    let info = fe.info().map_err(TuneError::FrontendInfo)?;
    let expected = params.frontend_type();
    if info.fe_type != expected.raw() {
        return Err(TuneError::WrongDeliverySystem {
            expected,
            found: info.fe_type,
        });
    }
    info!("Using frontend '{}'", info.name);
    debug!(
        "Frontend range {}-{}, symbol rate {}-{}, caps {:#010x}",
        info.frequency_min,
        info.frequency_max,
        info.symbol_rate_min,
        info.symbol_rate_max,
        info.caps
    );
    debug!("Tuning with {params:?}");

    fe.set_params(params).map_err(TuneError::SetFrontend)
}

// Kernel struct: dtv_property (76 bytes, packed)
//   cmd: u32, reserved: [u32; 3], u: union(56 bytes), result: i32
#[repr(C, packed)]
struct DtvProperty {
    cmd: u32,
    reserved: [u32; 3],
    data: u32,
    _padding: [u8; 52], // remaining union space (56 - 4)
    result: i32,
}

impl DtvProperty {
    fn new(cmd: u32, data: u32) -> Self {
        DtvProperty {
            cmd,
            reserved: [0; 3],
            data,
            _padding: [0; 52],
            result: 0,
        }
    }
}

// Kernel struct: dtv_properties (16 bytes on 64-bit)
//   num: u32, (4 bytes padding), props: *mut DtvProperty
#[repr(C)]
struct DtvProperties {
    num: u32,
    props: *mut DtvProperty,
}

// Kernel struct: dvb_frontend_info
#[repr(C)]
struct DvbFrontendInfo {
    name: [u8; 128],
    fe_type: u32,
    frequency_min: u32,
    frequency_max: u32,
    frequency_stepsize: u32,
    frequency_tolerance: u32,
    symbol_rate_min: u32,
    symbol_rate_max: u32,
    symbol_rate_tolerance: u32,
    notifier_delay: u32,
    caps: u32,
}

// Kernel struct: dvb_diseqc_master_cmd
#[repr(C)]
struct DvbDiseqcMasterCmd {
    msg: [u8; 6],
    msg_len: u8,
}

// ioctl declarations
nix::ioctl_read!(fe_get_info, b'o', 61, DvbFrontendInfo);
nix::ioctl_write_ptr!(fe_diseqc_send_master_cmd, b'o', 63, DvbDiseqcMasterCmd);
nix::ioctl_write_int_bad!(fe_diseqc_send_burst, nix::request_code_none!(b'o', 65));
nix::ioctl_write_int_bad!(fe_set_tone, nix::request_code_none!(b'o', 66));
nix::ioctl_write_int_bad!(fe_set_voltage, nix::request_code_none!(b'o', 67));
nix::ioctl_read!(fe_read_status, b'o', 69, u32);
nix::ioctl_read!(fe_read_ber, b'o', 70, u32);
nix::ioctl_read!(fe_read_signal_strength, b'o', 71, u16);
nix::ioctl_read!(fe_read_snr, b'o', 72, u16);
nix::ioctl_read!(fe_read_uncorrected_blocks, b'o', 73, u32);
nix::ioctl_write_ptr!(fe_set_property, b'o', 82, DtvProperties);

/// `/dev/dvb/adapterN/frontendM`, opened read-write.
pub struct LinuxFrontend {
    fe_file: File,
}

impl LinuxFrontend {
    pub fn open(path: &Path) -> io::Result<Self> {
        let fe_file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(LinuxFrontend { fe_file })
    }

    fn fd(&self) -> RawFd {
        self.fe_file.as_raw_fd()
    }
}

impl SecControl for LinuxFrontend {
    fn set_tone(&mut self, tone: Tone) -> io::Result<()> {
        unsafe { fe_set_tone(self.fd(), tone.raw() as c_int) }?;
        Ok(())
    }

    fn set_voltage(&mut self, voltage: Voltage) -> io::Result<()> {
        unsafe { fe_set_voltage(self.fd(), voltage.raw() as c_int) }?;
        Ok(())
    }

    fn send_master_cmd(&mut self, cmd: &DiseqcCommand) -> io::Result<()> {
        let raw = DvbDiseqcMasterCmd {
            msg: cmd.msg,
            msg_len: cmd.len,
        };
        unsafe { fe_diseqc_send_master_cmd(self.fd(), &raw) }?;
        Ok(())
    }

    fn send_burst(&mut self, burst: MiniBurst) -> io::Result<()> {
        unsafe { fe_diseqc_send_burst(self.fd(), burst.raw() as c_int) }?;
        Ok(())
    }
}

impl Frontend for LinuxFrontend {
    fn info(&mut self) -> io::Result<FrontendInfo> {
        let mut raw = DvbFrontendInfo {
            name: [0; 128],
            fe_type: 0,
            frequency_min: 0,
            frequency_max: 0,
            frequency_stepsize: 0,
            frequency_tolerance: 0,
            symbol_rate_min: 0,
            symbol_rate_max: 0,
            symbol_rate_tolerance: 0,
            notifier_delay: 0,
            caps: 0,
        };
        unsafe { fe_get_info(self.fd(), &mut raw) }?;

        let name_len = raw.name.iter().position(|b| *b == 0).unwrap_or(raw.name.len());
        Ok(FrontendInfo {
            name: String::from_utf8_lossy(&raw.name[..name_len]).into_owned(),
            fe_type: raw.fe_type,
            frequency_min: raw.frequency_min,
            frequency_max: raw.frequency_max,
            symbol_rate_min: raw.symbol_rate_min,
            symbol_rate_max: raw.symbol_rate_max,
            caps: raw.caps,
        })
    }

    fn set_params(&mut self, params: &FrontendParams) -> io::Result<()> {
        let mut props: Vec<DtvProperty> = params
            .properties()
            .into_iter()
            .map(|(cmd, data)| DtvProperty::new(cmd, data))
            .collect();

        let dtv_props = DtvProperties {
            num: props.len() as u32,
            props: props.as_mut_ptr(),
        };

        unsafe { fe_set_property(self.fd(), &dtv_props) }?;
        Ok(())
    }

    fn read_status(&mut self) -> io::Result<FeStatus> {
        let mut status: u32 = 0;
        unsafe { fe_read_status(self.fd(), &mut status) }?;
        Ok(FeStatus(status))
    }

    fn read_signal_strength(&mut self) -> io::Result<u16> {
        let mut signal: u16 = 0;
        unsafe { fe_read_signal_strength(self.fd(), &mut signal) }?;
        Ok(signal)
    }

    fn read_snr(&mut self) -> io::Result<u16> {
        let mut snr: u16 = 0;
        unsafe { fe_read_snr(self.fd(), &mut snr) }?;
        Ok(snr)
    }

    fn read_ber(&mut self) -> io::Result<u32> {
        let mut ber: u32 = 0;
        unsafe { fe_read_ber(self.fd(), &mut ber) }?;
        Ok(ber)
    }

    fn read_uncorrected_blocks(&mut self) -> io::Result<u32> {
        let mut blocks: u32 = 0;
        unsafe { fe_read_uncorrected_blocks(self.fd(), &mut blocks) }?;
        Ok(blocks)
    }
}
