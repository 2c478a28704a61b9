//! Device handles held by one tuning session.

use log::{debug, warn};

use crate::device::{AudioDecoder, DvbBackend};
use crate::dmx::{StreamKind, install_filter};
use crate::error::{Result, Stage, TuneError};
use crate::psi::{PAT_PID, PsiError};
use crate::request::{OutputMode, TunerDescriptor};

/// What to open on the demux once the frontend is tuned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamPlan {
    pub video_pid: u16,
    pub audio_pid: u16,
    pub service_id: u16,
    pub output: OutputMode,
    /// Pass PAT and PMT through alongside the elementary streams.
    pub psi: bool,
    /// Switch the audio decoder to bypass (digital passthrough) mode.
    pub audio_bypass: bool,
}

/// Open handles of a session. Dropping it closes everything still held,
/// newest first, with the frontend last.
pub struct SessionResources<B: DvbBackend> {
    frontend: B::Frontend,
    pat_demux: Option<B::Demux>,
    pmt_demux: Option<B::Demux>,
    video_demux: Option<B::Demux>,
    audio_demux: Option<B::Demux>,
    audio: Option<B::Audio>,
}

impl<B: DvbBackend> SessionResources<B> {
    pub fn new(frontend: B::Frontend) -> Self {
        SessionResources {
            frontend,
            pat_demux: None,
            pmt_demux: None,
            video_demux: None,
            audio_demux: None,
            audio: None,
        }
    }

    pub fn frontend_mut(&mut self) -> &mut B::Frontend {
        &mut self.frontend
    }

    /// Open the demux filters of `plan` in order: PAT, PMT, video, audio,
    /// then the optional audio decoder. A failing step leaves the handles
    /// opened so far in `self`; dropping `self` closes them.
    pub fn acquire_streams(
        &mut self,
        backend: &mut B,
        tuner: &TunerDescriptor,
        plan: &StreamPlan,
    ) -> Result<()> {
        if plan.psi {
            let mut pat = backend
                .open_demux(tuner)
                .map_err(TuneError::resource(Stage::PatDemux))?;
            debug!("Opened PAT demux");
            let installed = install_filter(&mut pat, PAT_PID, StreamKind::Other, plan.output);
            self.pat_demux = Some(pat);
            installed.map_err(TuneError::resource(Stage::PatFilter))?;

            let pmt_pid = resolve_pmt(backend, tuner, plan.service_id)?;

            let mut pmt = backend
                .open_demux(tuner)
                .map_err(TuneError::resource(Stage::PmtDemux))?;
            debug!("Opened PMT demux");
            let installed = install_filter(&mut pmt, pmt_pid, StreamKind::Other, plan.output);
            self.pmt_demux = Some(pmt);
            installed.map_err(TuneError::resource(Stage::PmtFilter))?;
        }

        let mut video = backend
            .open_demux(tuner)
            .map_err(TuneError::resource(Stage::VideoDemux))?;
        debug!("Opened video demux");
        let installed = install_filter(&mut video, plan.video_pid, StreamKind::Video, plan.output);
        self.video_demux = Some(video);
        installed.map_err(TuneError::resource(Stage::VideoFilter))?;

        let mut audio = backend
            .open_demux(tuner)
            .map_err(TuneError::resource(Stage::AudioDemux))?;
        debug!("Opened audio demux");
        let installed = install_filter(&mut audio, plan.audio_pid, StreamKind::Audio, plan.output);
        self.audio_demux = Some(audio);
        installed.map_err(TuneError::resource(Stage::AudioFilter))?;

        if plan.audio_bypass && plan.output == OutputMode::Decoder {
            match backend.open_audio(tuner) {
                Ok(mut decoder) => {
                    if let Err(e) = decoder.set_bypass_mode(true) {
                        warn!("AUDIO_SET_BYPASS_MODE failed: {e}");
                    }
                    self.audio = Some(decoder);
                }
                Err(e) => debug!("No audio decoder for bypass: {e}"),
            }
        }

        Ok(())
    }
}

fn resolve_pmt<B: DvbBackend>(
    backend: &mut B,
    tuner: &TunerDescriptor,
    service_id: u16,
) -> Result<u16> {
    let pmt_pid = backend
        .resolve_pmt_pid(tuner, service_id)
        .map_err(|source| TuneError::PmtResolution { service_id, source })?;
    if pmt_pid == 0 {
        return Err(TuneError::PmtResolution {
            service_id,
            source: PsiError::ServiceNotFound(service_id),
        });
    }
    debug!("PMT PID 0x{pmt_pid:04x} for service 0x{service_id:04x}");
    Ok(pmt_pid)
}

fn release<T>(slot: &mut Option<T>, name: &str) {
    if let Some(handle) = slot.take() {
        drop(handle);
        debug!("Closed {name}");
    }
}

impl<B: DvbBackend> Drop for SessionResources<B> {
    fn drop(&mut self) {
        release(&mut self.audio, "audio decoder");
        release(&mut self.audio_demux, "audio demux");
        release(&mut self.video_demux, "video demux");
        release(&mut self.pmt_demux, "PMT demux");
        release(&mut self.pat_demux, "PAT demux");
        // the frontend field is dropped right after this
        debug!("Closing frontend");
    }
}
