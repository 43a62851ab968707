use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::error;
use udp_roots::client::{polynomial_from, Client};
use udp_roots::config::{Config, Overrides, CLIENT_LOG_FILE};
use udp_roots::logging;

#[derive(Parser, Debug)]
#[command(name = "client")]
#[command(about = "Sends equation coefficients to the solver server and prints the roots")]
struct Args {
    /// a b c for a quadratic, a b c d for a cubic
    #[arg(required = true, num_args = 3..=4, allow_negative_numbers = true)]
    coefficients: Vec<f64>,

    /// Log file (appended, defaults to client.log)
    #[arg(short = 'l', long = "log")]
    log_file: Option<PathBuf>,

    /// Seconds to wait for the reply (0 = forever)
    #[arg(short, long)]
    timeout: Option<u64>,

    #[arg(short, long)]
    verbose: bool,

    /// Server address
    #[arg(long)]
    addr: Option<String>,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let polynomial = polynomial_from(&args.coefficients)?;
    let config = Config::load(
        args.config.as_deref(),
        Overrides {
            addr: args.addr,
            log_file: args.log_file,
            timeout_secs: args.timeout,
            verbose: args.verbose,
            discriminant_epsilon: None,
        },
    )?;
    logging::init(config.log_file_or(CLIENT_LOG_FILE), config.verbose)?;

    let client = Client::connect(&config).await.inspect_err(|e| error!("{e}"))?;
    let reply = client.request(&polynomial).await.inspect_err(|e| error!("{e}"))?;
    println!("{reply}");

    Ok(())
}
