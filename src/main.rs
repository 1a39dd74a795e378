use anyhow::{bail, Context, Result};
use log::error;
use std::env;
use std::sync::{Arc, Mutex};

use spectre::app::{App, Config};
use spectre::audio::AudioDeviceManager;
use spectre::ui::run_tui;

fn print_usage() {
    eprintln!("spectre - terminal microphone spectrum visualizer");
    eprintln!();
    eprintln!("Usage: spectre [options]");
    eprintln!("  --config <path>     load configuration from a key=value file");
    eprintln!("  --smoothing <0..1>  analyser smoothing constant (default 0.6)");
    eprintln!("  --device <name>     capture device (default: host default input)");
    eprintln!("  --list-devices      print capture devices and exit");
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let mut config = Config::default();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config requires a path")?;
                config = Config::load(&path)?;
            }
            "--smoothing" => {
                let value = args.next().context("--smoothing requires a value")?;
                config.smoothing = value
                    .parse()
                    .with_context(|| format!("invalid smoothing value: {}", value))?;
            }
            "--device" => {
                config.input_device = Some(args.next().context("--device requires a name")?);
            }
            "--list-devices" => {
                for device in AudioDeviceManager::input_devices() {
                    println!("{}", device);
                }
                return Ok(());
            }
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            other => bail!("unknown argument: {} (try --help)", other),
        }
    }

    let app = Arc::new(Mutex::new(App::with_config(config)));

    if let Err(e) = run_tui(Arc::clone(&app)).await {
        error!("TUI error: {}", e);
    }

    // Terminal is restored at this point; release the capture stream.
    app.lock().unwrap().shutdown().await?;

    Ok(())
}
