use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dhcpd_leases::{Config, LeaseStream, MalformedPolicy, Result};

#[derive(Parser)]
#[command(name = "dhcpd-leases")]
#[command(author, version, about = "Convert ISC dhcpd lease databases to JSON", long_about = None)]
struct Cli {
    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Drop malformed leases instead of stopping at the first one.
    #[arg(long)]
    skip_malformed: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a dhcpd.leases file.
    V4(Files),
    /// Parse a dhcpd6.leases file.
    V6(Files),
}

#[derive(clap::Args)]
struct Files {
    /// Lease file to read (stdin if omitted).
    #[arg(short = 'f', long)]
    file: Option<PathBuf>,

    /// File to write JSON lines to (stdout if omitted).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Files {
    fn input(&self) -> Result<Box<dyn Read + Send>> {
        Ok(match &self.file {
            Some(path) => Box::new(File::open(path)?),
            None => Box::new(io::stdin()),
        })
    }

    fn output(&self) -> Result<Box<dyn Write>> {
        Ok(match &self.output {
            Some(path) => Box::new(BufWriter::new(File::create(path)?)),
            None => Box::new(BufWriter::new(io::stdout())),
        })
    }
}

fn load_config(path: Option<&Path>, skip_malformed: bool) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if skip_malformed {
        config.on_malformed = MalformedPolicy::Skip;
    }
    Ok(config)
}

/// Writes each record as one JSON line, returning how many were written.
async fn write_leases<T: Serialize + Send + 'static>(
    mut leases: LeaseStream<T>,
    output: &mut dyn Write,
) -> Result<usize> {
    let mut count = 0;
    while let Some(lease) = leases.next().await {
        let lease = match lease {
            Ok(lease) => lease,
            Err(error) => {
                output.flush()?;
                return Err(error);
            }
        };
        serde_json::to_writer(&mut *output, &lease)?;
        output.write_all(b"\n")?;
        count += 1;
    }
    output.flush()?;
    Ok(count)
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref(), cli.skip_malformed)?;

    let count = match &cli.command {
        Commands::V4(files) => {
            let mut output = files.output()?;
            let leases = LeaseStream::v4(files.input()?, config);
            write_leases(leases, &mut output).await?
        }
        Commands::V6(files) => {
            let mut output = files.output()?;
            let leases = LeaseStream::v6(files.input()?, config);
            write_leases(leases, &mut output).await?
        }
    };

    info!("Wrote {} lease(s)", count);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!("{}", error);
            ExitCode::FAILURE
        }
    }
}
