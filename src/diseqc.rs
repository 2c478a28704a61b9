//! DiSEqC 1.0 committed-switch control for satellite reception.
//!
//! Eutelsat's specification: the master command selects position, polarization
//! and band; a tone burst picks the A/B input of simple toneburst switches; the
//! 22 kHz continuous tone finally selects the LNB band.

use std::fmt;
use std::io;
use std::thread;
use std::time::Duration;

use log::{debug, warn};
use thiserror::Error;

use crate::params::Polarization;

/// Bus settle time between SEC operations.
pub const SETTLE_DELAY: Duration = Duration::from_millis(15);

/// Framing byte, address byte ("any LNB, switcher or SMATV") and the
/// "write port group 0" command.
const FRAMING: u8 = 0xe0;
const ADDRESS: u8 = 0x10;
const WRITE_N0: u8 = 0x38;

/// LNB supply voltage (`fe_sec_voltage_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Voltage {
    V13 = 0,
    V18 = 1,
    Off = 2,
}

impl Voltage {
    pub fn raw(self) -> u32 {
        self as u32
    }
}

/// Continuous 22 kHz tone (`fe_sec_tone_mode_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Tone {
    On = 0,
    Off = 1,
}

impl Tone {
    pub fn raw(self) -> u32 {
        self as u32
    }
}

/// Tone burst (`fe_sec_mini_cmd_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MiniBurst {
    A = 0,
    B = 1,
}

impl MiniBurst {
    pub fn raw(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiseqcCommand {
    pub msg: [u8; 6],
    pub len: u8,
    /// Time the bus needs after this command, on top of the settle delay.
    pub wait: Duration,
}

impl DiseqcCommand {
    /// "Write N0" command: the data byte's high nibble clears and the low
    /// nibble sets the option, position, polarization and band bits.
    pub fn committed_switch(sat_no: u32, polarization: Polarization, high_band: bool) -> Self {
        let data = 0xf0 | switch_bits(sat_no, polarization, high_band);
        DiseqcCommand {
            msg: [FRAMING, ADDRESS, WRITE_N0, data, 0x00, 0x00],
            len: 4,
            wait: SETTLE_DELAY * 4,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.msg[..self.len as usize]
    }
}

/// Low nibble of the committed-switch data byte.
pub fn switch_bits(sat_no: u32, polarization: Polarization, high_band: bool) -> u8 {
    let position = ((sat_no * 4) & 0x0f) as u8;
    let band = if high_band { 1 } else { 0 };
    let pol = match polarization {
        Polarization::Vertical => 0,
        Polarization::Horizontal => 2,
    };
    position | band | pol
}

/// Operations on the satellite equipment control bus of a frontend.
pub trait SecControl {
    fn set_tone(&mut self, tone: Tone) -> io::Result<()>;
    fn set_voltage(&mut self, voltage: Voltage) -> io::Result<()>;
    fn send_master_cmd(&mut self, cmd: &DiseqcCommand) -> io::Result<()>;
    fn send_burst(&mut self, burst: MiniBurst) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecStep {
    ToneOff,
    Voltage,
    MasterCommand,
    Burst,
    Tone,
}

impl fmt::Display for SecStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SecStep::ToneOff | SecStep::Tone => "FE_SET_TONE",
            SecStep::Voltage => "FE_SET_VOLTAGE",
            SecStep::MasterCommand => "FE_DISEQC_SEND_MASTER_CMD",
            SecStep::Burst => "FE_DISEQC_SEND_BURST",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[error("{step} failed: {source}")]
pub struct SecError {
    pub step: SecStep,
    #[source]
    pub source: io::Error,
}

/// What to do when a SEC operation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecPolicy {
    /// Log the failure and carry on with the remaining steps.
    #[default]
    Tolerant,
    /// Stop at the first failure and fail the session.
    Strict,
}

/// Failures absorbed while running the switch sequence.
#[derive(Debug, Default)]
pub struct SecReport {
    pub failures: Vec<SecError>,
}

impl SecReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

struct Sequence<'a, S: SecControl> {
    sec: &'a mut S,
    policy: SecPolicy,
    report: SecReport,
}

impl<S: SecControl> Sequence<'_, S> {
    fn step(
        &mut self,
        step: SecStep,
        op: impl FnOnce(&mut S) -> io::Result<()>,
    ) -> Result<(), SecError> {
        match op(&mut *self.sec) {
            Ok(()) => Ok(()),
            Err(source) => {
                let err = SecError { step, source };
                match self.policy {
                    SecPolicy::Strict => Err(err),
                    SecPolicy::Tolerant => {
                        warn!("{err}");
                        self.report.failures.push(err);
                        Ok(())
                    }
                }
            }
        }
    }
}

/// Point the dish feed at `sat_no` with the given polarization and band.
///
/// Runs tone off, voltage, master command, tone burst, tone, with the bus
/// settle delays in between.
pub fn select_lnb<S: SecControl>(
    sec: &mut S,
    sat_no: u32,
    polarization: Polarization,
    high_band: bool,
    policy: SecPolicy,
) -> Result<SecReport, SecError> {
    let cmd = DiseqcCommand::committed_switch(sat_no, polarization, high_band);
    let voltage = match polarization {
        Polarization::Vertical => Voltage::V13,
        Polarization::Horizontal => Voltage::V18,
    };
    let burst = if sat_no % 2 == 1 {
        MiniBurst::B
    } else {
        MiniBurst::A
    };
    let tone = if high_band { Tone::On } else { Tone::Off };

    debug!(
        "DiSEqC: sat {sat_no}, {polarization:?}, {} band, cmd {:02x?}",
        if high_band { "high" } else { "low" },
        cmd.bytes()
    );

    let mut seq = Sequence {
        sec,
        policy,
        report: SecReport::default(),
    };

    seq.step(SecStep::ToneOff, |s| s.set_tone(Tone::Off))?;
    seq.step(SecStep::Voltage, |s| s.set_voltage(voltage))?;
    thread::sleep(SETTLE_DELAY);
    seq.step(SecStep::MasterCommand, |s| s.send_master_cmd(&cmd))?;
    thread::sleep(cmd.wait);
    thread::sleep(SETTLE_DELAY);
    seq.step(SecStep::Burst, |s| s.send_burst(burst))?;
    thread::sleep(SETTLE_DELAY);
    seq.step(SecStep::Tone, |s| s.set_tone(tone))?;

    Ok(seq.report)
}
