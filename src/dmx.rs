use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::unix::io::{AsFd, AsRawFd, BorrowedFd};
use std::path::Path;

use libc::c_int;
use log::{debug, warn};

use crate::request::{NULL_PID, OutputMode};

pub const DMX_FILTER_SIZE: usize = 16;
pub const DMX_CHECK_CRC: u32 = 1;
pub const DMX_IMMEDIATE_START: u32 = 4;

const DMX_IN_FRONTEND: u32 = 0;
const DMX_OUT_DECODER: u32 = 0;
const DMX_OUT_TS_TAP: u32 = 2;

/// Demux buffer used when packets go to the dvr device.
pub const TS_TAP_BUFFER_SIZE: u32 = 64 * 1024;

#[repr(C)]
pub struct DmxFilter {
    pub filter: [u8; DMX_FILTER_SIZE],
    pub mask: [u8; DMX_FILTER_SIZE],
    pub mode: [u8; DMX_FILTER_SIZE],
}

#[repr(C)]
pub struct DmxSctFilterParams {
    pub pid: u16,
    pub filter: DmxFilter,
    pub timeout: u32,
    pub flags: u32,
}

#[repr(C)]
pub struct DmxPesFilterParams {
    pub pid: u16,
    pub input: u32,
    pub output: u32,
    pub pes_type: u32,
    pub flags: u32,
}

nix::ioctl_write_ptr!(dmx_set_filter, b'o', 43, DmxSctFilterParams);
nix::ioctl_write_ptr!(dmx_set_pes_filter, b'o', 44, DmxPesFilterParams);
nix::ioctl_write_int_bad!(dmx_set_buffer_size, nix::request_code_none!(b'o', 45));

/// Elementary stream kind of a PES filter (`dmx_pes_type_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum StreamKind {
    Audio = 0,
    Video = 1,
    Other = 20,
}

impl StreamKind {
    pub fn raw(self) -> u32 {
        self as u32
    }
}

/// An open demux device that can carry one PES filter.
pub trait Demux {
    fn set_buffer_size(&mut self, size: u32) -> io::Result<()>;
    fn set_pes_filter(&mut self, params: &DmxPesFilterParams) -> io::Result<()>;
}

/// Start a PES filter for `pid` on `dmx`.
///
/// Returns `Ok(false)` without touching the device for PIDs that carry no
/// stream: the null PID, and PID 0 for anything but the PAT passthrough.
pub fn install_filter<D: Demux + ?Sized>(
    dmx: &mut D,
    pid: u16,
    kind: StreamKind,
    output: OutputMode,
) -> io::Result<bool> {
    if pid >= NULL_PID || (pid == 0 && kind != StreamKind::Other) {
        debug!("No {kind:?} filter for PID 0x{pid:04x}");
        return Ok(false);
    }

    if output == OutputMode::TsTap {
        if let Err(e) = dmx.set_buffer_size(TS_TAP_BUFFER_SIZE) {
            warn!("DMX_SET_BUFFER_SIZE failed: {e}");
        }
    }

    let params = DmxPesFilterParams {
        pid,
        input: DMX_IN_FRONTEND,
        output: match output {
            OutputMode::Decoder => DMX_OUT_DECODER,
            OutputMode::TsTap => DMX_OUT_TS_TAP,
        },
        pes_type: kind.raw(),
        flags: DMX_IMMEDIATE_START,
    };
    dmx.set_pes_filter(&params)?;
    debug!("{kind:?} filter on PID 0x{pid:04x} ({output:?})");
    Ok(true)
}

/// `/dev/dvb/adapterN/demuxM`; every open gets its own filter slot.
pub struct LinuxDemux {
    demux_file: File,
}

impl LinuxDemux {
    pub fn open(path: &Path) -> io::Result<Self> {
        let demux_file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(LinuxDemux { demux_file })
    }

    /// Open a demux and start a CRC-checked section filter for `table_id` on
    /// `pid`.
    pub fn open_section_filter(path: &Path, pid: u16, table_id: u8) -> io::Result<Self> {
        let demux = LinuxDemux::open(path)?;

        let mut filter = DmxFilter {
            filter: [0u8; DMX_FILTER_SIZE],
            mask: [0u8; DMX_FILTER_SIZE],
            mode: [0u8; DMX_FILTER_SIZE],
        };
        filter.filter[0] = table_id;
        filter.mask[0] = 0xff;

        let params = DmxSctFilterParams {
            pid,
            filter,
            timeout: 0,
            flags: DMX_IMMEDIATE_START | DMX_CHECK_CRC,
        };

        unsafe { dmx_set_filter(demux.demux_file.as_raw_fd(), &params) }?;
        Ok(demux)
    }
}

impl Demux for LinuxDemux {
    fn set_buffer_size(&mut self, size: u32) -> io::Result<()> {
        unsafe { dmx_set_buffer_size(self.demux_file.as_raw_fd(), size as c_int) }?;
        Ok(())
    }

    fn set_pes_filter(&mut self, params: &DmxPesFilterParams) -> io::Result<()> {
        unsafe { dmx_set_pes_filter(self.demux_file.as_raw_fd(), params) }?;
        Ok(())
    }
}

impl Read for LinuxDemux {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.demux_file.read(buf)
    }
}

impl AsFd for LinuxDemux {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.demux_file.as_fd()
    }
}
