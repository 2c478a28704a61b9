use std::ops::ControlFlow;
use std::path::PathBuf;
use std::process;
use std::thread;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use log::{error, info, warn};

use dvbzap::channel;
use dvbzap::device::LinuxDvb;
use dvbzap::diseqc::SecPolicy;
use dvbzap::lnb::LnbProfile;
use dvbzap::request::DeliverySystem;
use dvbzap::{
    CancellationToken, OutputMode, SessionOptions, StatusSample, TuneRequest, TunerDescriptor,
    run_session, tune_satellite,
};

#[derive(Debug, Parser)]
#[clap(name = "dvbzap")]
#[clap(about = "Tune a DVB-S/C/T or ATSC frontend and keep the service's demux filters open", long_about = None)]
#[clap(version)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Tune a DVB-S service.
    Sat {
        #[clap(flatten)]
        common: CommonArgs,

        /// LNB type or `low[,high[,switch]]` in MHz (default UNIVERSAL).
        #[clap(short, long)]
        lnb: Option<String>,

        /// Override the satellite number (0-3) from the channel list.
        #[clap(short, long)]
        sat: Option<u32>,

        /// Put the audio decoder into bypass mode.
        #[clap(long)]
        audio_bypass: bool,

        /// Abort when a DiSEqC step fails instead of carrying on.
        #[clap(long)]
        strict_sec: bool,
    },
    /// Tune a DVB-C service.
    Cable {
        #[clap(flatten)]
        common: CommonArgs,
    },
    /// Tune a DVB-T service.
    Terr {
        #[clap(flatten)]
        common: CommonArgs,
    },
    /// Tune an ATSC service.
    Atsc {
        #[clap(flatten)]
        common: CommonArgs,
    },
    /// List the built-in LNB types.
    LnbTypes,
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Service name as listed in the channels file.
    channel: String,

    #[clap(short, long, default_value_t = 0)]
    adapter: u32,

    #[clap(short, long, default_value_t = 0)]
    frontend: u32,

    #[clap(short, long, default_value_t = 0)]
    demux: u32,

    /// zap-format channel list (default ~/.Xzap/channels.conf).
    #[clap(short, long, value_name = "FILE")]
    channels: Option<PathBuf>,

    /// Route the streams to the dvr device instead of the decoder.
    #[clap(short, long)]
    record: bool,

    /// Also pass PAT and PMT through (implies --record).
    #[clap(short, long)]
    psi: bool,

    /// Stop after this many seconds.
    #[clap(long, value_name = "SECONDS")]
    duration: Option<u64>,

    /// Status poll interval.
    #[clap(long, value_name = "MS", default_value_t = 1000)]
    interval_ms: u64,
}

/// Optional satellite-only settings.
#[derive(Debug, Default)]
struct SatSettings {
    lnb: Option<String>,
    sat: Option<u32>,
    audio_bypass: bool,
    strict_sec: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Sat {
            common,
            lnb,
            sat,
            audio_bypass,
            strict_sec,
        } => {
            let settings = SatSettings {
                lnb,
                sat,
                audio_bypass,
                strict_sec,
            };
            cmd_zap(DeliverySystem::Satellite, &common, &settings)
        }
        Commands::Cable { common } => {
            cmd_zap(DeliverySystem::Cable, &common, &SatSettings::default())
        }
        Commands::Terr { common } => {
            cmd_zap(DeliverySystem::Terrestrial, &common, &SatSettings::default())
        }
        Commands::Atsc { common } => cmd_zap(DeliverySystem::Atsc, &common, &SatSettings::default()),
        Commands::LnbTypes => {
            cmd_lnb_types();
            0
        }
    };
    process::exit(code);
}

fn cmd_lnb_types() {
    for (name, description) in LnbProfile::known() {
        println!("{name:<10} {description}");
    }
}

/// `~/.szap/channels.conf` and friends, as the zap tools use them.
fn default_channels_path(system: DeliverySystem) -> PathBuf {
    let dir = match system {
        DeliverySystem::Satellite => ".szap",
        DeliverySystem::Cable => ".czap",
        DeliverySystem::Terrestrial => ".tzap",
        DeliverySystem::Atsc => ".azap",
    };
    let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
    home.join(dir).join("channels.conf")
}

fn session_options(common: &CommonArgs, sat: &SatSettings) -> SessionOptions {
    SessionOptions {
        output: if common.record {
            OutputMode::TsTap
        } else {
            OutputMode::Decoder
        },
        psi: common.psi,
        interval: Duration::from_millis(common.interval_ms),
        audio_bypass: sat.audio_bypass,
        sec_policy: if sat.strict_sec {
            SecPolicy::Strict
        } else {
            SecPolicy::Tolerant
        },
        ..Default::default()
    }
}

/// Trip `token` on Ctrl-C / SIGTERM and, if asked, after `duration` seconds.
fn arm_cancellation(token: &CancellationToken, duration: Option<u64>) {
    let on_signal = token.clone();
    if let Err(e) = ctrlc::set_handler(move || on_signal.cancel()) {
        warn!("Failed to install signal handler: {e}");
    }

    if let Some(secs) = duration {
        let on_timer = token.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(secs));
            info!("{secs} s elapsed, stopping");
            on_timer.cancel();
        });
    }
}

/// Acquisition flags first (`SCVYL`), then the register dump.
fn status_line(sample: &StatusSample) -> String {
    format!("{} | {sample}", sample.status)
}

fn cmd_zap(system: DeliverySystem, common: &CommonArgs, sat: &SatSettings) -> i32 {
    let path = common
        .channels
        .clone()
        .unwrap_or_else(|| default_channels_path(system));
    info!("Reading channels from {}", path.display());

    let channels = match channel::parse_channels_conf(&path, system) {
        Ok(channels) => channels,
        Err(e) => {
            eprintln!("Error parsing channels.conf: {e}");
            return 1;
        }
    };
    let Some(ch) = channel::find_channel(&channels, &common.channel) else {
        eprintln!("Channel '{}' not found in {}", common.channel, path.display());
        return 1;
    };

    let mut request = ch.request.clone();
    if let (Some(sat_no), TuneRequest::Satellite(r)) = (sat.sat, &mut request) {
        r.sat_no = sat_no;
    }
    println!("Tuning to '{}' ({system})", ch.name);

    let tuner = TunerDescriptor {
        adapter: common.adapter,
        frontend: common.frontend,
        demux: common.demux,
    };
    let options = session_options(common, sat);
    let token = CancellationToken::new();
    arm_cancellation(&token, common.duration);

    let mut receiver = |sample: &StatusSample| {
        println!("{}", status_line(sample));
        ControlFlow::Continue(())
    };
    let mut backend = LinuxDvb;
    let result = match &request {
        TuneRequest::Satellite(r) => tune_satellite(
            &mut backend,
            &tuner,
            r,
            sat.lnb.as_deref(),
            &options,
            &mut receiver,
            &token,
        ),
        other => run_session(&mut backend, &tuner, other, &options, &mut receiver, &token),
    };

    match result {
        Ok(()) => 0,
        Err(e) => {
            error!("{e} (code {})", e.code());
            1
        }
    }
}
