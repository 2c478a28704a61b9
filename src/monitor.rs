//! Frontend status polling.

use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::{info, warn};

use crate::frontend::{FeStatus, Frontend};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Value a [`RawReceiver`] sees for a telemetry register that could not be read.
pub const UNAVAILABLE_U16: u16 = 0xFFFE;
pub const UNAVAILABLE_U32: u32 = 0xFFFF_FFFE;

/// Shared stop request. Clones observe the same flag, so a signal handler
/// or timer thread can hold one while the session polls another.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Re-arm the token before reusing it for another session.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// One poll of the frontend registers. `None` marks a register whose read
/// failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusSample {
    pub status: FeStatus,
    pub signal: Option<u16>,
    pub snr: Option<u16>,
    pub ber: Option<u32>,
    pub uncorrected_blocks: Option<u32>,
    pub locked: bool,
}

impl StatusSample {
    pub fn read<F: Frontend + ?Sized>(fe: &mut F) -> Self {
        let status = fe.read_status().unwrap_or_else(|e| {
            warn!("FE_READ_STATUS failed: {e}");
            FeStatus::default()
        });
        let signal = absorb("FE_READ_SIGNAL_STRENGTH", fe.read_signal_strength());
        let snr = absorb("FE_READ_SNR", fe.read_snr());
        let ber = absorb("FE_READ_BER", fe.read_ber());
        let uncorrected_blocks = absorb("FE_READ_UNCORRECTED_BLOCKS", fe.read_uncorrected_blocks());

        StatusSample {
            status,
            signal,
            snr,
            ber,
            uncorrected_blocks,
            locked: status.has_lock(),
        }
    }
}

fn absorb<T>(ioctl: &str, result: std::io::Result<T>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("{ioctl} failed: {e}");
            None
        }
    }
}

struct Hex<T>(Option<T>, usize);

impl<T: fmt::LowerHex> fmt::Display for Hex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(v) => write!(f, "{:0width$x}", v, width = self.1),
            None => f.write_str("----"),
        }
    }
}

/// The czap/szap status line.
impl fmt::Display for StatusSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "status {:02x} | signal {} | snr {} | ber {} | unc {} | ",
            self.status.bits(),
            Hex(self.signal, 4),
            Hex(self.snr, 4),
            Hex(self.ber, 8),
            Hex(self.uncorrected_blocks, 8),
        )?;
        if self.locked {
            f.write_str("FE_HAS_LOCK")?;
        }
        Ok(())
    }
}

/// Consumer of status samples. Returning `Break` ends the session.
pub trait StatusReceiver {
    fn receive(&mut self, sample: &StatusSample) -> ControlFlow<()>;
}

impl<F> StatusReceiver for F
where
    F: FnMut(&StatusSample) -> ControlFlow<()>,
{
    fn receive(&mut self, sample: &StatusSample) -> ControlFlow<()> {
        self(sample)
    }
}

/// Adapter for callbacks taking
/// `(status, signal, snr, ber, uncorrected_blocks, locked)` and returning
/// zero to stop, any other value to keep polling.
///
/// Unreadable registers are passed as [`UNAVAILABLE_U16`] / [`UNAVAILABLE_U32`].
pub struct RawReceiver<F>(pub F);

impl<F> RawReceiver<F>
where
    F: FnMut(u32, u16, u16, u32, u32, bool) -> i32,
{
    pub fn new(callback: F) -> Self {
        RawReceiver(callback)
    }
}

impl<F> StatusReceiver for RawReceiver<F>
where
    F: FnMut(u32, u16, u16, u32, u32, bool) -> i32,
{
    fn receive(&mut self, sample: &StatusSample) -> ControlFlow<()> {
        let keep_going = (self.0)(
            sample.status.bits(),
            sample.signal.unwrap_or(UNAVAILABLE_U16),
            sample.snr.unwrap_or(UNAVAILABLE_U16),
            sample.ber.unwrap_or(UNAVAILABLE_U32),
            sample.uncorrected_blocks.unwrap_or(UNAVAILABLE_U32),
            sample.locked,
        );
        if keep_going == 0 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

/// Poll `fe` every `interval` until the receiver stops or `token` is
/// cancelled. The token is checked once per cycle, before the registers are
/// read. Returns the number of samples delivered.
pub fn monitor<F, R>(
    fe: &mut F,
    receiver: &mut R,
    token: &CancellationToken,
    interval: Duration,
) -> usize
where
    F: Frontend + ?Sized,
    R: StatusReceiver + ?Sized,
{
    let mut samples = 0;
    loop {
        if token.is_cancelled() {
            info!("Cancelled after {samples} status samples");
            break;
        }

        let sample = StatusSample::read(fe);
        samples += 1;
        if receiver.receive(&sample).is_break() {
            info!("Receiver stopped after {samples} status samples");
            break;
        }

        thread::sleep(interval);
    }
    samples
}
