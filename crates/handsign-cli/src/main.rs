//! handsign CLI — classify hand gestures locally or on the accelerator.

mod config;
mod error;
mod image_loader;
mod session;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Args, Parser, Subcommand, ValueEnum};
use handsign_core::{FrameReport, PipelineParams, RgbImage, analyze};
use handsign_link::Channel;
use serde::Serialize;

use config::AppConfig;
use error::CliError;
use session::CaptureSession;

#[derive(Parser)]
#[command(name = "handsign")]
#[command(about = "Count raised fingers in a hand image, on the host or on the accelerator")]
#[command(version)]
struct Cli {
    /// Print reports as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// JSON file overriding pipeline thresholds.
    #[arg(long, global = true)]
    params: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline on the host.
    Local {
        /// Path to the input image.
        #[arg(long)]
        image: PathBuf,
    },

    /// Send the frame to the accelerator and read back its report.
    Offload(OffloadArgs),

    /// Run both paths on the same frame and report side by side.
    Compare(OffloadArgs),
}

#[derive(Debug, Clone, Args)]
struct OffloadArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// spidev device node (default: $HANDSIGN_SPI_DEVICE or /dev/spidev0.0).
    #[arg(long)]
    device: Option<PathBuf>,

    /// Talk to an in-process simulated accelerator instead of hardware.
    #[arg(long)]
    simulate: bool,

    /// Download this channel after the run.
    #[arg(long, value_enum, requires = "dump_path")]
    dump_plane: Option<ChannelArg>,

    /// PNG file the downloaded plane is written to.
    #[arg(long, requires = "dump_plane")]
    dump_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ChannelArg {
    R,
    G,
    B,
}

impl From<ChannelArg> for Channel {
    fn from(arg: ChannelArg) -> Self {
        match arg {
            ChannelArg::R => Channel::Red,
            ChannelArg::G => Channel::Green,
            ChannelArg::B => Channel::Blue,
        }
    }
}

#[derive(Serialize)]
struct Comparison<'a> {
    local: &'a FrameReport,
    accelerator: &'a FrameReport,
    agree: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let abort = Arc::new(AtomicBool::new(false));

    // The session blocks on bus I/O; Ctrl-C raises the abort flag it polls.
    let worker_abort = Arc::clone(&abort);
    let mut worker = tokio::task::spawn_blocking(move || run(cli, worker_abort));
    let outcome = tokio::select! {
        joined = &mut worker => joined,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupt received, stopping");
            abort.store(true, Ordering::Relaxed);
            worker.await
        }
    };

    match outcome {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(e)) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("worker failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, abort: Arc<AtomicBool>) -> Result<(), CliError> {
    let device = match &cli.command {
        Commands::Offload(args) | Commands::Compare(args) => args.device.clone(),
        Commands::Local { .. } => None,
    };
    let config = AppConfig::from_overrides(cli.params.as_deref(), device, cli.json)?;

    match cli.command {
        Commands::Local { image } => {
            let frame = load(&image)?;
            let report = run_local(&frame, &config.params, &abort)?;
            print_report("local", &report, config.json)
        }
        Commands::Offload(args) => {
            let frame = load(&args.image)?;
            let report = run_offload(&frame, &args, &config, abort)?;
            print_report("accelerator", &report, config.json)
        }
        Commands::Compare(args) => {
            let frame = load(&args.image)?;
            let local = run_local(&frame, &config.params, &abort)?;
            let accelerator = run_offload(&frame, &args, &config, abort)?;
            print_comparison(&local, &accelerator, config.json)
        }
    }
}

fn load(path: &std::path::Path) -> Result<RgbImage, CliError> {
    tracing::info!("Loading image: {}", path.display());
    Ok(image_loader::load_frame(path)?)
}

fn run_local(frame: &RgbImage, params: &PipelineParams, abort: &AtomicBool) -> Result<FrameReport, CliError> {
    if abort.load(Ordering::Relaxed) {
        return Err(CliError::Interrupted);
    }
    Ok(analyze(frame, params))
}

fn run_offload(
    frame: &RgbImage,
    args: &OffloadArgs,
    config: &AppConfig,
    abort: Arc<AtomicBool>,
) -> Result<FrameReport, CliError> {
    let mut session = CaptureSession::open(config, args.simulate, abort)?;
    let report = session.classify(frame)?;

    if let (Some(channel), Some(path)) = (args.dump_plane, &args.dump_path) {
        let plane = session.fetch_plane(channel.into())?;
        image_loader::save_plane(&plane, path)?;
    }
    Ok(report)
}

fn print_report(source: &str, report: &FrameReport, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", to_json(report)?);
        return Ok(());
    }
    println!("{source}: {}", report.label);
    println!("  area:      {}", report.area);
    println!("  perimeter: {}", report.perimeter);
    println!("  peaks:     {}", report.peak_count);
    if let Some(failure) = &report.failure {
        println!("  failure:   {failure}");
    }
    Ok(())
}

fn print_comparison(local: &FrameReport, accelerator: &FrameReport, json: bool) -> Result<(), CliError> {
    let agree = local.area == accelerator.area
        && local.perimeter == accelerator.perimeter
        && local.peak_count == accelerator.peak_count
        && local.label == accelerator.label;

    if json {
        let comparison = Comparison {
            local,
            accelerator,
            agree,
        };
        println!("{}", to_json(&comparison)?);
        return Ok(());
    }

    println!("{:<12}{:>18}{:>18}", "", "local", "accelerator");
    println!("{:<12}{:>18}{:>18}", "label", local.label.to_string(), accelerator.label.to_string());
    println!("{:<12}{:>18}{:>18}", "area", local.area, accelerator.area);
    println!("{:<12}{:>18}{:>18}", "perimeter", local.perimeter, accelerator.perimeter);
    println!("{:<12}{:>18}{:>18}", "peaks", local.peak_count, accelerator.peak_count);
    if agree {
        tracing::info!("Local and accelerator results agree");
    } else {
        tracing::warn!("Local and accelerator results differ");
    }
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(|e| CliError::Io(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_offload_flags() {
        let cli = Cli::try_parse_from([
            "handsign",
            "offload",
            "--image",
            "hand.png",
            "--simulate",
            "--dump-plane",
            "r",
            "--dump-path",
            "mask.png",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        let Commands::Offload(args) = cli.command else {
            panic!("expected offload");
        };
        assert!(args.simulate);
        assert!(matches!(args.dump_plane, Some(ChannelArg::R)));
        assert_eq!(args.dump_path, Some(PathBuf::from("mask.png")));
    }

    #[test]
    fn test_dump_plane_requires_path() {
        assert!(
            Cli::try_parse_from(["handsign", "offload", "--image", "a.png", "--dump-plane", "g"])
                .is_err()
        );
    }

    #[test]
    fn test_interrupt_before_local_run() {
        let frame = RgbImage::from_fn(4, 4, |_, _| [0, 0, 0]);
        let abort = AtomicBool::new(true);
        assert!(matches!(
            run_local(&frame, &PipelineParams::default(), &abort),
            Err(CliError::Interrupted)
        ));
    }
}
