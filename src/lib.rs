pub mod channel;
pub mod device;
pub mod diseqc;
pub mod dmx;
pub mod engine;
pub mod error;
pub mod frontend;
pub mod lnb;
pub mod monitor;
pub mod params;
pub mod psi;
pub mod request;
pub mod session;
pub mod validate;

#[cfg(test)]
mod mock;

pub use engine::{
    SessionOptions, result_code, run_session, tune_atsc, tune_cable, tune_satellite,
    tune_terrestrial,
};
pub use error::{Result, TuneError, ValidationError};
pub use monitor::{CancellationToken, RawReceiver, StatusReceiver, StatusSample};
pub use request::{OutputMode, TuneRequest, TunerDescriptor};
