//! Tuning sessions: validate, steer the dish, tune, open filters, then poll
//! status until told to stop.

use std::time::Duration;

use log::{info, warn};

use crate::device::DvbBackend;
use crate::diseqc::{SecPolicy, select_lnb};
use crate::error::{Result, Stage, TuneError};
use crate::frontend::{self, FrontendParams};
use crate::lnb::LnbProfile;
use crate::monitor::{CancellationToken, DEFAULT_POLL_INTERVAL, StatusReceiver, monitor};
use crate::request::{
    AtscRequest, CableRequest, OutputMode, SatelliteRequest, TerrestrialRequest, TuneRequest,
    TunerDescriptor,
};
use crate::session::{SessionResources, StreamPlan};
use crate::validate::validate;

/// Per-session knobs that are not part of the channel itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub output: OutputMode,
    /// PAT/PMT passthrough. Forces [`OutputMode::TsTap`].
    pub psi: bool,
    pub interval: Duration,
    /// Satellite only; ignored unless output goes to the decoder.
    pub audio_bypass: bool,
    pub sec_policy: SecPolicy,
    pub lnb: LnbProfile,
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions {
            output: OutputMode::Decoder,
            psi: false,
            interval: DEFAULT_POLL_INTERVAL,
            audio_bypass: false,
            sec_policy: SecPolicy::default(),
            lnb: LnbProfile::default(),
        }
    }
}

/// Run one session for `request` on `tuner`.
///
/// Returns once the receiver stops or `token` is cancelled. Every handle
/// opened along the way is closed before this returns, on success and on
/// failure alike.
pub fn run_session<B, R>(
    backend: &mut B,
    tuner: &TunerDescriptor,
    request: &TuneRequest,
    options: &SessionOptions,
    receiver: &mut R,
    token: &CancellationToken,
) -> Result<()>
where
    B: DvbBackend,
    R: StatusReceiver + ?Sized,
{
    let request = validate(request)?;
    run_validated(backend, tuner, &request, options, receiver, token)
}

fn run_validated<B, R>(
    backend: &mut B,
    tuner: &TunerDescriptor,
    request: &TuneRequest,
    options: &SessionOptions,
    receiver: &mut R,
    token: &CancellationToken,
) -> Result<()>
where
    B: DvbBackend,
    R: StatusReceiver + ?Sized,
{
    let output = if options.psi {
        OutputMode::TsTap
    } else {
        options.output
    };
    let plan = StreamPlan {
        video_pid: request.video_pid(),
        audio_pid: request.audio_pid(),
        service_id: request.service_id(),
        output,
        psi: options.psi,
        audio_bypass: options.audio_bypass && matches!(request, TuneRequest::Satellite(_)),
    };

    info!("Tuning {} on {tuner}", request.delivery_system());
    let fe = backend
        .open_frontend(tuner)
        .map_err(TuneError::resource(Stage::Frontend))?;
    let mut session = SessionResources::<B>::new(fe);

    let params = match request {
        TuneRequest::Satellite(r) => {
            let band = options.lnb.select(r.frequency);
            info!(
                "{} band, IF {} kHz ({})",
                if band.high_band { "High" } else { "Low" },
                band.intermediate_frequency,
                options.lnb
            );
            let report = select_lnb(
                session.frontend_mut(),
                r.sat_no,
                r.polarization,
                band.high_band,
                options.sec_policy,
            )?;
            if !report.is_clean() {
                warn!("DiSEqC sequence had {} failed steps", report.failures.len());
            }
            FrontendParams::Qpsk {
                frequency: band.intermediate_frequency,
                symbol_rate: r.symbol_rate,
            }
        }
        TuneRequest::Cable(r) => FrontendParams::from(r),
        TuneRequest::Terrestrial(r) => FrontendParams::from(r),
        TuneRequest::Atsc(r) => FrontendParams::from(r),
    };
    frontend::tune(session.frontend_mut(), &params)?;

    session.acquire_streams(backend, tuner, &plan)?;

    monitor(session.frontend_mut(), receiver, token, options.interval);
    drop(session);
    info!("Session on {tuner} finished");
    Ok(())
}

/// DVB-S entry point. `lnb` is a profile name or `low[,high[,switch]]` in
/// MHz and replaces `options.lnb` when given.
pub fn tune_satellite<B, R>(
    backend: &mut B,
    tuner: &TunerDescriptor,
    request: &SatelliteRequest,
    lnb: Option<&str>,
    options: &SessionOptions,
    receiver: &mut R,
    token: &CancellationToken,
) -> Result<()>
where
    B: DvbBackend,
    R: StatusReceiver + ?Sized,
{
    let request = validate(&TuneRequest::Satellite(request.clone()))?;
    let mut options = options.clone();
    if let Some(text) = lnb {
        options.lnb = text.parse()?;
    }
    run_validated(backend, tuner, &request, &options, receiver, token)
}

pub fn tune_cable<B, R>(
    backend: &mut B,
    tuner: &TunerDescriptor,
    request: &CableRequest,
    options: &SessionOptions,
    receiver: &mut R,
    token: &CancellationToken,
) -> Result<()>
where
    B: DvbBackend,
    R: StatusReceiver + ?Sized,
{
    let request = TuneRequest::Cable(request.clone());
    run_session(backend, tuner, &request, options, receiver, token)
}

pub fn tune_terrestrial<B, R>(
    backend: &mut B,
    tuner: &TunerDescriptor,
    request: &TerrestrialRequest,
    options: &SessionOptions,
    receiver: &mut R,
    token: &CancellationToken,
) -> Result<()>
where
    B: DvbBackend,
    R: StatusReceiver + ?Sized,
{
    let request = TuneRequest::Terrestrial(request.clone());
    run_session(backend, tuner, &request, options, receiver, token)
}

pub fn tune_atsc<B, R>(
    backend: &mut B,
    tuner: &TunerDescriptor,
    request: &AtscRequest,
    options: &SessionOptions,
    receiver: &mut R,
    token: &CancellationToken,
) -> Result<()>
where
    B: DvbBackend,
    R: StatusReceiver + ?Sized,
{
    let request = TuneRequest::Atsc(request.clone());
    run_session(backend, tuner, &request, options, receiver, token)
}

/// `0` for a session that ended normally, the stable negative error code
/// otherwise.
pub fn result_code(result: &Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => e.code(),
    }
}
