//! Device backend: opens the handles a tuning session needs.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::Path;

use libc::c_int;

use crate::dmx::{Demux, LinuxDemux};
use crate::frontend::{Frontend, LinuxFrontend};
use crate::psi::{self, PsiError};
use crate::request::TunerDescriptor;

nix::ioctl_write_int_bad!(audio_set_bypass_mode, nix::request_code_none!(b'o', 8));

/// An open audio decoder device.
pub trait AudioDecoder {
    /// Pass the compressed audio stream through to the digital output.
    fn set_bypass_mode(&mut self, bypass: bool) -> io::Result<()>;
}

/// Source of device handles for one adapter.
///
/// Every handle is owned by the caller and closed when dropped.
pub trait DvbBackend {
    type Frontend: Frontend;
    type Demux: Demux;
    type Audio: AudioDecoder;

    fn open_frontend(&mut self, tuner: &TunerDescriptor) -> io::Result<Self::Frontend>;
    fn open_demux(&mut self, tuner: &TunerDescriptor) -> io::Result<Self::Demux>;
    fn open_audio(&mut self, tuner: &TunerDescriptor) -> io::Result<Self::Audio>;

    /// PMT PID of `service_id` on the multiplex the frontend is locked to.
    fn resolve_pmt_pid(&mut self, tuner: &TunerDescriptor, service_id: u16)
    -> Result<u16, PsiError>;
}

/// `/dev/dvb/adapterN/audioM`.
pub struct LinuxAudio {
    audio_file: File,
}

impl LinuxAudio {
    pub fn open(path: &Path) -> io::Result<Self> {
        let audio_file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(LinuxAudio { audio_file })
    }
}

impl AudioDecoder for LinuxAudio {
    fn set_bypass_mode(&mut self, bypass: bool) -> io::Result<()> {
        unsafe { audio_set_bypass_mode(self.audio_file.as_raw_fd(), bypass as c_int) }?;
        Ok(())
    }
}

/// The Linux DVB character devices.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxDvb;

impl DvbBackend for LinuxDvb {
    type Frontend = LinuxFrontend;
    type Demux = LinuxDemux;
    type Audio = LinuxAudio;

    fn open_frontend(&mut self, tuner: &TunerDescriptor) -> io::Result<LinuxFrontend> {
        LinuxFrontend::open(&tuner.frontend_path())
    }

    fn open_demux(&mut self, tuner: &TunerDescriptor) -> io::Result<LinuxDemux> {
        LinuxDemux::open(&tuner.demux_path())
    }

    fn open_audio(&mut self, tuner: &TunerDescriptor) -> io::Result<LinuxAudio> {
        LinuxAudio::open(&tuner.audio_path())
    }

    fn resolve_pmt_pid(
        &mut self,
        tuner: &TunerDescriptor,
        service_id: u16,
    ) -> Result<u16, PsiError> {
        psi::resolve_pmt_pid(&tuner.demux_path(), service_id)
    }
}
