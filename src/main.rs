mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pelorus", version, about = "Multi-source NMEA 0183 ingestion and fix dispatch engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest live sentences from one or more UDP sources
    Run {
        /// UDP port to listen on; repeat the flag for multiple sources
        #[arg(long = "udp", value_name = "PORT")]
        udp_ports: Vec<u16>,

        /// Append serialized fixes to this JSONL track log
        #[arg(long, value_name = "PATH")]
        track_log: Option<PathBuf>,

        /// Expose Prometheus metrics on this port
        #[arg(long, value_name = "PORT")]
        metrics_port: Option<u16>,
    },
    /// Replay a recorded sentence log through the pipeline
    Replay {
        /// Line-per-sentence recording to replay
        file: PathBuf,

        /// Append serialized fixes to this JSONL track log
        #[arg(long, value_name = "PATH")]
        track_log: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    pelorus::telemetry::init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            udp_ports,
            track_log,
            metrics_port,
        } => commands::handle_run(udp_ports, track_log, metrics_port).await,
        Command::Replay { file, track_log } => commands::handle_replay(file, track_log).await,
    }
}
