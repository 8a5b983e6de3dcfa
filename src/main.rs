use sensorgate::{
    config::GateConfig,
    device::{DeviceLabel, TEMP_TOPIC},
    gate, AppResult,
};
use std::path::Path;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    // A missing .env is fine; the config files and environment still apply.
    let _ = dotenvy::dotenv();

    // Initialize logging first
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sensorgate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

/// Gate startup, then report the approved broker endpoint.
fn run() -> AppResult<()> {
    info!("Starting sensorgate v{}", env!("CARGO_PKG_VERSION"));

    let config = match std::env::args_os().nth(1) {
        Some(path) => GateConfig::load_from(Path::new(&path))?,
        None => GateConfig::load()?,
    };
    config.validate()?;
    info!("Configuration loaded");

    let descriptor = gate::bootstrap(&config)?;

    if let Some(label) = &config.device.label {
        let label = DeviceLabel::parse(label)?;
        info!(client_id = %label.client_id(), topic = TEMP_TOPIC, "device label accepted");
    }

    // The transport glue connects with these; the password stays in memory only.
    println!("{}:{}", descriptor.host, descriptor.port);
    Ok(())
}
