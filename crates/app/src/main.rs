mod relay;
mod replay;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{ArgGroup, Parser};

#[derive(Parser, Debug)]
#[command(name = "cir-bridge")]
#[command(about = "Bridge radar CIR frames, live or from saved captures, to the inference device")]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["log_folder", "radar"]),
))]
struct Cli {
    /// Folder containing previously saved capture logs
    #[arg(short = 'L', long, requires = "frequency")]
    log_folder: Option<PathBuf>,

    /// Serial port the radar is connected to
    #[arg(short = 'R', long)]
    radar: Option<String>,

    /// Serial port of the microcontroller running the inference model
    #[arg(short = 'M', long)]
    model: String,

    /// Frequency (Hz) at which replayed frames are sent (required with --log-folder)
    #[arg(short = 'F', long)]
    frequency: Option<f64>,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let running = Arc::new(AtomicBool::new(true));
    {
        let r = Arc::clone(&running);
        if let Err(e) = ctrlc::set_handler(move || r.store(false, Ordering::Relaxed)) {
            eprintln!("failed to install interrupt handler: {}", e);
            std::process::exit(1);
        }
    }

    let result = if let Some(ref folder) = cli.log_folder {
        match cli.frequency {
            Some(f) => replay::run(folder, f, &cli.model, &running),
            // clap's `requires` enforces this; keep the startup error typed anyway
            None => Err("--frequency is required when using --log-folder".to_string()),
        }
    } else if let Some(ref radar) = cli.radar {
        relay::run(radar, &cli.model, &running)
    } else {
        unreachable!("clap requires one of --log-folder / --radar");
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
