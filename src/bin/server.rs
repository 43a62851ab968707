use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, error, info};
use udp_roots::config::{Config, Overrides, SERVER_LOG_FILE};
use udp_roots::logging;
use udp_roots::server::{Server, ShutdownSignals};

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Solves quadratic and cubic equations received over UDP")]
struct Args {
    /// Log file (appended, defaults to server.log)
    #[arg(short = 'l', long = "log")]
    log_file: Option<PathBuf>,

    /// Stop after this many seconds without a request (0 = never)
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Log decoded requests and discriminants
    #[arg(short, long)]
    verbose: bool,

    /// Address to listen on
    #[arg(long)]
    addr: Option<String>,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Relative tolerance for treating a discriminant as zero
    #[arg(long)]
    epsilon: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(
        args.config.as_deref(),
        Overrides {
            addr: args.addr,
            log_file: args.log_file,
            timeout_secs: args.timeout,
            verbose: args.verbose,
            discriminant_epsilon: args.epsilon,
        },
    )?;
    logging::init(config.log_file_or(SERVER_LOG_FILE), config.verbose)?;
    debug!("config {}", serde_json::to_string(&config)?);

    let startup = async {
        let signals = ShutdownSignals::install()?;
        let server = Server::bind(&config).await?;
        Ok::<_, udp_roots::Error>((signals, server))
    };
    let (mut signals, server) = match startup.await {
        Ok(started) => started,
        Err(e) => {
            error!("{e}");
            return Err(e.into());
        }
    };

    /* SIGINT / SIGTERM は処理中のリクエストを待たずに終了する */
    match server.run_until(signals.recv()).await {
        Ok(stop) => {
            info!("{stop}, shutting down");
            Ok(())
        }
        Err(e) if e.is_clean_shutdown() => {
            info!("{e}, shutting down");
            Ok(())
        }
        Err(e) => {
            error!("{e}");
            Err(e.into())
        }
    }
}
