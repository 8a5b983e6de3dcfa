mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sensorgate-admin")]
#[command(about = "Provisioning utilities for sensorgate devices")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt broker credentials into a secrets blob
    Seal(commands::SealArgs),
    /// Check one artifact against its detached signature
    Verify(commands::VerifyArgs),
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sensorgate=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Seal(args) => {
            let summary = commands::seal(&args)?;
            println!("{summary}");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Verify(args) => {
            if commands::verify(&args)? {
                println!("PASS {}", args.artifact.display());
                Ok(ExitCode::SUCCESS)
            } else {
                println!("FAIL {}", args.artifact.display());
                Ok(ExitCode::from(2))
            }
        }
    }
}
