//! In-memory DVB backend for tests. Every open, close and ioctl lands in a
//! shared event log; faults make individual operations fail.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use crate::device::{AudioDecoder, DvbBackend};
use crate::diseqc::{DiseqcCommand, MiniBurst, SecControl, Tone, Voltage};
use crate::dmx::{Demux, DmxPesFilterParams};
use crate::frontend::{FeStatus, Frontend, FrontendInfo, FrontendParams};
use crate::psi::PsiError;
use crate::request::{FrontendType, TunerDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    Frontend,
    /// Demux handles are numbered in open order.
    Demux(usize),
    Audio,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Open(Handle),
    Close(Handle),
    Tone(Tone),
    Voltage(Voltage),
    MasterCmd(Vec<u8>),
    Burst(MiniBurst),
    SetParams(FrontendParams),
    BufferSize(usize),
    PesFilter { demux: usize, pid: u16, pes_type: u32 },
    ResolvePmt(u16),
    Bypass(bool),
    ReadStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    OpenFrontend,
    /// The n-th demux open.
    OpenDemux(usize),
    /// PES filter on the n-th demux.
    PesFilter(usize),
    ResolvePmt,
    /// Resolver "succeeds" with PID 0.
    PmtPidZero,
    OpenAudio,
    Bypass,
    Info,
    SetParams,
    Voltage,
    ReadSnr,
}

struct Shared {
    events: Vec<Event>,
    faults: Vec<Fault>,
    demuxes_opened: usize,
    fe_type: FrontendType,
    status: u32,
    pmt_pid: u16,
}

type State = Rc<RefCell<Shared>>;

fn record(state: &State, event: Event) {
    state.borrow_mut().events.push(event);
}

fn faulty(state: &State, fault: Fault) -> bool {
    state.borrow().faults.contains(&fault)
}

fn check(state: &State, fault: Fault) -> io::Result<()> {
    if faulty(state, fault) {
        Err(io::Error::from_raw_os_error(libc::EIO))
    } else {
        Ok(())
    }
}

#[derive(Clone)]
pub struct MockDvb {
    state: State,
}

impl MockDvb {
    /// A backend whose frontend reports `fe_type` and a locked status.
    pub fn new(fe_type: FrontendType) -> Self {
        MockDvb {
            state: Rc::new(RefCell::new(Shared {
                events: Vec::new(),
                faults: Vec::new(),
                demuxes_opened: 0,
                fe_type,
                status: 0x1f,
                pmt_pid: 0x0100,
            })),
        }
    }

    pub fn with_fault(self, fault: Fault) -> Self {
        self.state.borrow_mut().faults.push(fault);
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.borrow().events.clone()
    }

    pub fn opened(&self) -> Vec<Handle> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Open(h) => Some(h),
                _ => None,
            })
            .collect()
    }

    pub fn closed(&self) -> Vec<Handle> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Close(h) => Some(h),
                _ => None,
            })
            .collect()
    }
}

pub struct MockFrontend {
    state: State,
}

impl Drop for MockFrontend {
    fn drop(&mut self) {
        record(&self.state, Event::Close(Handle::Frontend));
    }
}

impl SecControl for MockFrontend {
    fn set_tone(&mut self, tone: Tone) -> io::Result<()> {
        record(&self.state, Event::Tone(tone));
        Ok(())
    }

    fn set_voltage(&mut self, voltage: Voltage) -> io::Result<()> {
        record(&self.state, Event::Voltage(voltage));
        check(&self.state, Fault::Voltage)
    }

    fn send_master_cmd(&mut self, cmd: &DiseqcCommand) -> io::Result<()> {
        record(&self.state, Event::MasterCmd(cmd.bytes().to_vec()));
        Ok(())
    }

    fn send_burst(&mut self, burst: MiniBurst) -> io::Result<()> {
        record(&self.state, Event::Burst(burst));
        Ok(())
    }
}

impl Frontend for MockFrontend {
    fn info(&mut self) -> io::Result<FrontendInfo> {
        check(&self.state, Fault::Info)?;
        Ok(FrontendInfo {
            name: "Mock DVB frontend".to_string(),
            fe_type: self.state.borrow().fe_type.raw(),
            ..Default::default()
        })
    }

    fn set_params(&mut self, params: &FrontendParams) -> io::Result<()> {
        check(&self.state, Fault::SetParams)?;
        record(&self.state, Event::SetParams(params.clone()));
        Ok(())
    }

    fn read_status(&mut self) -> io::Result<FeStatus> {
        record(&self.state, Event::ReadStatus);
        Ok(FeStatus(self.state.borrow().status))
    }

    fn read_signal_strength(&mut self) -> io::Result<u16> {
        Ok(0xb000)
    }

    fn read_snr(&mut self) -> io::Result<u16> {
        check(&self.state, Fault::ReadSnr)?;
        Ok(0x8000)
    }

    fn read_ber(&mut self) -> io::Result<u32> {
        Ok(0)
    }

    fn read_uncorrected_blocks(&mut self) -> io::Result<u32> {
        Ok(0)
    }
}

pub struct MockDemux {
    id: usize,
    state: State,
}

impl Drop for MockDemux {
    fn drop(&mut self) {
        record(&self.state, Event::Close(Handle::Demux(self.id)));
    }
}

impl Demux for MockDemux {
    fn set_buffer_size(&mut self, _size: u32) -> io::Result<()> {
        record(&self.state, Event::BufferSize(self.id));
        Ok(())
    }

    fn set_pes_filter(&mut self, params: &DmxPesFilterParams) -> io::Result<()> {
        check(&self.state, Fault::PesFilter(self.id))?;
        record(
            &self.state,
            Event::PesFilter {
                demux: self.id,
                pid: params.pid,
                pes_type: params.pes_type,
            },
        );
        Ok(())
    }
}

pub struct MockAudio {
    state: State,
}

impl Drop for MockAudio {
    fn drop(&mut self) {
        record(&self.state, Event::Close(Handle::Audio));
    }
}

impl AudioDecoder for MockAudio {
    fn set_bypass_mode(&mut self, bypass: bool) -> io::Result<()> {
        record(&self.state, Event::Bypass(bypass));
        check(&self.state, Fault::Bypass)
    }
}

impl DvbBackend for MockDvb {
    type Frontend = MockFrontend;
    type Demux = MockDemux;
    type Audio = MockAudio;

    fn open_frontend(&mut self, _tuner: &TunerDescriptor) -> io::Result<MockFrontend> {
        check(&self.state, Fault::OpenFrontend)?;
        record(&self.state, Event::Open(Handle::Frontend));
        Ok(MockFrontend {
            state: self.state.clone(),
        })
    }

    fn open_demux(&mut self, _tuner: &TunerDescriptor) -> io::Result<MockDemux> {
        let id = self.state.borrow().demuxes_opened;
        check(&self.state, Fault::OpenDemux(id))?;
        self.state.borrow_mut().demuxes_opened += 1;
        record(&self.state, Event::Open(Handle::Demux(id)));
        Ok(MockDemux {
            id,
            state: self.state.clone(),
        })
    }

    fn open_audio(&mut self, _tuner: &TunerDescriptor) -> io::Result<MockAudio> {
        check(&self.state, Fault::OpenAudio)?;
        record(&self.state, Event::Open(Handle::Audio));
        Ok(MockAudio {
            state: self.state.clone(),
        })
    }

    fn resolve_pmt_pid(
        &mut self,
        _tuner: &TunerDescriptor,
        service_id: u16,
    ) -> Result<u16, PsiError> {
        record(&self.state, Event::ResolvePmt(service_id));
        if faulty(&self.state, Fault::ResolvePmt) {
            return Err(PsiError::Timeout);
        }
        if faulty(&self.state, Fault::PmtPidZero) {
            return Ok(0);
        }
        Ok(self.state.borrow().pmt_pid)
    }
}
