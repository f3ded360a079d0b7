//! Meridian CLI
//!
//! Drives the relay core: loads configuration, initializes logging, and
//! runs the polling forward loop that shuttles datagrams between the
//! north and south peers, shaping them through the condition simulator.

mod config;

use clap::{Parser, Subcommand};
use meridian_relay::{Condition, Direction, Relay, RelayError};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use config::Config;

/// How long to sleep when a poll pass moved nothing.
const IDLE_SLEEP: Duration = Duration::from_micros(500);

/// Meridian - bidirectional UDP relay with link-condition simulation
#[derive(Parser)]
#[command(name = "meridian")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay until interrupted
    Run {
        /// Relay listening port (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate the configuration and exit
    Check,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load_or_default(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(if cli.verbose {
            "debug".to_string()
        } else {
            config.logging.level.clone()
        })
        .init();

    match cli.command {
        Commands::Run { port } => {
            let mut relay_config = config.relay_config();
            if let Some(port) = port {
                relay_config.relay_port = port;
            }
            let relay = Relay::new(relay_config)?;
            let condition = Condition::new(config.condition_config())
                .map_err(|e| RelayError::InvalidConfig(e.to_string()))?;
            run(relay, condition)
        }
        Commands::Check => {
            config.relay_config().validate()?;
            config
                .condition_config()
                .validate()
                .map_err(|e| RelayError::InvalidConfig(e.to_string()))?;
            println!("configuration ok");
            Ok(())
        }
    }
}

/// A datagram held back by the latency draw, waiting for its deadline.
struct Delayed {
    due: Instant,
    dest: Direction,
    payload: Vec<u8>,
}

/// The polling forward loop.
///
/// Each pass drains both directions, shapes every datagram through the
/// condition simulator, flushes whatever delayed traffic has come due, and
/// sleeps briefly when nothing moved. The delay queue stays FIFO even when
/// the latency draw shrinks mid-flight: a single path does not reorder.
fn run(mut relay: Relay, mut condition: Condition) -> anyhow::Result<()> {
    relay.start()?;
    tracing::info!(
        addr = %relay.local_addr()?,
        north_port = relay.config().north_port,
        south_port = relay.config().south_port,
        "relay running"
    );

    let mut delayed: VecDeque<Delayed> = VecDeque::new();

    loop {
        let mut busy = false;

        for dir in [Direction::North, Direction::South] {
            while let Some(payload) = relay.recv(dir)? {
                busy = true;
                shape(payload, dir.opposite(), &mut condition, &mut delayed);
            }
        }

        let now = Instant::now();
        while delayed.front().is_some_and(|d| d.due <= now) {
            let Some(datagram) = delayed.pop_front() else {
                break;
            };
            busy = true;
            match relay.send(datagram.dest, &datagram.payload) {
                Ok(()) => {}
                Err(RelayError::SendBufferFull) => {
                    // Retry on the next pass; the OS buffer needs to drain.
                    delayed.push_front(datagram);
                    break;
                }
                Err(e) => {
                    tracing::warn!(dest = %datagram.dest, error = %e, "forward failed");
                }
            }
        }

        if !busy {
            std::thread::sleep(IDLE_SLEEP);
        }
    }
}

/// Apply the condition draws to one datagram headed for `dest`.
fn shape(
    payload: Vec<u8>,
    dest: Direction,
    condition: &mut Condition,
    delayed: &mut VecDeque<Delayed>,
) {
    if payload.len() > condition.mtu() {
        tracing::trace!(dest = %dest, len = payload.len(), "dropped: over mtu");
        return;
    }
    if condition.check_loss() {
        tracing::trace!(dest = %dest, "dropped: simulated loss");
        return;
    }
    if !condition.use_bandwidth(payload.len()) {
        tracing::trace!(dest = %dest, "dropped: bandwidth budget spent");
        return;
    }
    delayed.push_back(Delayed {
        due: Instant::now() + condition.added_latency(),
        dest,
        payload,
    });
}
