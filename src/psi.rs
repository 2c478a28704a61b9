//! PMT PID lookup through the Program Association Table.

use std::collections::HashMap;
use std::io::{self, Read};
use std::os::unix::io::AsFd;
use std::path::Path;
use std::time::{Duration, Instant};

use log::{debug, warn};
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use thiserror::Error;

use crate::dmx::LinuxDemux;

pub const PAT_PID: u16 = 0x0000;
pub const PAT_TABLE_ID: u8 = 0x00;

/// How long to wait for a complete PAT before giving up.
pub const PAT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum PsiError {
    #[error("timed out waiting for PAT")]
    Timeout,
    #[error("service 0x{0:04x} is not in the PAT")]
    ServiceNotFound(u16),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatEntry {
    pub service_id: u16,
    pub pmt_pid: u16,
}

/// Program entries of one PAT section. The network PID entry
/// (program_number 0) is not a service and is left out.
pub fn parse_pat_section(data: &[u8]) -> Vec<PatEntry> {
    let mut entries = Vec::new();
    if data.len() < 12 {
        return entries;
    }

    let section_length = (((data[1] & 0x0F) as usize) << 8) | data[2] as usize;
    let section_end = 3 + section_length;
    if data.len() < section_end || section_end < 12 {
        return entries;
    }

    let entries_end = section_end - 4; // exclude CRC
    let mut pos = 8; // after 8-byte header

    while pos + 4 <= entries_end {
        let program_number = u16::from_be_bytes([data[pos], data[pos + 1]]);
        let pid = ((data[pos + 2] & 0x1F) as u16) << 8 | data[pos + 3] as u16;
        if program_number != 0 {
            entries.push(PatEntry {
                service_id: program_number,
                pmt_pid: pid,
            });
        }
        pos += 4;
    }

    entries
}

pub fn find_pmt_pid(sections: &[Vec<u8>], service_id: u16) -> Option<u16> {
    sections
        .iter()
        .flat_map(|s| parse_pat_section(s))
        .find(|e| e.service_id == service_id)
        .map(|e| e.pmt_pid)
}

/// Collect every section of the current PAT, sorted by section_number.
fn read_pat_sections(demux_path: &Path, timeout: Duration) -> Result<Vec<Vec<u8>>, PsiError> {
    let mut demux = LinuxDemux::open_section_filter(demux_path, PAT_PID, PAT_TABLE_ID)?;

    let mut buf = [0u8; 4096];
    let start = Instant::now();
    let mut sections: HashMap<u8, Vec<u8>> = HashMap::new();

    while start.elapsed() < timeout {
        let remaining_ms = timeout
            .checked_sub(start.elapsed())
            .unwrap_or_default()
            .as_millis() as i32;
        if remaining_ms <= 0 {
            break;
        }

        let poll_ms = remaining_ms.min(1000);
        let poll_timeout = PollTimeout::try_from(poll_ms).unwrap_or(PollTimeout::NONE);
        let nfds = {
            let poll_fd = PollFd::new(demux.as_fd(), PollFlags::POLLIN);
            poll(&mut [poll_fd], poll_timeout).map_err(io::Error::from)?
        };
        if nfds == 0 {
            continue;
        }

        // EOVERFLOW just means the demux buffer wrapped; the next read is good
        let n = match demux.read(&mut buf) {
            Ok(n) => n,
            Err(e) => {
                debug!("PAT read: {e}");
                continue;
            }
        };

        if n < 8 || buf[0] != PAT_TABLE_ID {
            continue;
        }

        let section_number = buf[6];
        let last_section_number = buf[7];
        sections
            .entry(section_number)
            .or_insert_with(|| buf[..n].to_vec());

        if sections.len() > last_section_number as usize {
            break;
        }
    }

    if sections.is_empty() {
        return Err(PsiError::Timeout);
    }

    let mut result: Vec<(u8, Vec<u8>)> = sections.into_iter().collect();
    result.sort_by_key(|(num, _)| *num);
    Ok(result.into_iter().map(|(_, data)| data).collect())
}

/// Look up the PMT PID of `service_id` on the multiplex the frontend is
/// currently locked to.
pub fn resolve_pmt_pid(demux_path: &Path, service_id: u16) -> Result<u16, PsiError> {
    let sections = read_pat_sections(demux_path, PAT_TIMEOUT)?;
    match find_pmt_pid(&sections, service_id) {
        Some(pid) => {
            debug!("Service 0x{service_id:04x} has PMT PID 0x{pid:04x}");
            Ok(pid)
        }
        None => {
            warn!(
                "Service 0x{service_id:04x} missing from PAT ({} sections)",
                sections.len()
            );
            Err(PsiError::ServiceNotFound(service_id))
        }
    }
}
