//! Binary entrypoint for the pumprelay CLI.
//!
//! Commands:
//! - `start [--radio-port <path>] [--serial-port <path>] [--dry-run]` - run the relay
//! - `init` - write a starter `config.toml`
//! - `parse <line>` - parse one operator line and print the result as JSON
//! - `addresses` - print the logical id to mesh address table
//!
//! See the library crate docs for module-level details: `pumprelay::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use std::time::Duration;

use pumprelay::command::parse_command;
use pumprelay::config::Config;
use pumprelay::mesh::{MockNetwork, NetworkTransport};
use pumprelay::relay::{Bridge, RelayEngine};
use pumprelay::serial::{SerialLink, StdioSerial};

#[derive(Parser)]
#[command(name = "pumprelay")]
#[command(about = "Serial to mesh relay for pump actuators")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay
    Start {
        /// Radio modem port (overrides config)
        #[arg(long)]
        radio_port: Option<String>,

        /// Operator serial port (overrides config; stdin/stdout when neither is set)
        #[arg(long)]
        serial_port: Option<String>,

        /// Do not open the radio; log every send instead
        #[arg(long)]
        dry_run: bool,
    },
    /// Write a default configuration file
    Init,
    /// Parse one operator line and print the command it produces
    Parse {
        /// Line such as "S;G;t=3;s=250.0;p=1500"
        line: String,
    },
    /// Print the logical id to mesh address table
    Addresses,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Init runs before a config exists; everything else reads it first
    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Start {
            radio_port,
            serial_port,
            dry_run,
        } => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load(&cli.config).await?,
            };
            info!("Starting pumprelay v{}", env!("CARGO_PKG_VERSION"));

            let this_node = config.this_node()?;
            let engine = RelayEngine::new(config.address_table()?, config.relay.settings(), 0);
            let network = open_network(&config, radio_port, dry_run, this_node).await?;
            let serial = open_serial(&config, serial_port).await?;
            let poll = Duration::from_millis(config.relay.poll_interval_ms);

            info!("Relay node {} (id {}) ready", this_node, config.relay.node_id);
            let mut bridge = Bridge::new(engine, network, serial, poll);
            let stats = bridge.run().await?;
            info!(
                "Relay stopped: {} sent, {} failed, {} records relayed",
                stats.commands_sent, stats.send_failures, stats.records_relayed
            );
        }
        Commands::Init => {
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Parse { line } => match parse_command(line.as_bytes()) {
            Ok(cmd) => println!("{}", serde_json::to_string_pretty(&cmd)?),
            Err(fault) => {
                println!("{}", fault);
                std::process::exit(1);
            }
        },
        Commands::Addresses => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load_or_default(&cli.config).await?,
            };
            let table = config.address_table()?;
            for (id, addr) in table.iter() {
                let marker = if id == config.relay.node_id { "  (this node)" } else { "" };
                println!("{:>2}  {}{}", id, addr, marker);
            }
        }
    }

    Ok(())
}

async fn open_network(
    config: &Config,
    cli_port: Option<String>,
    dry_run: bool,
    this_node: pumprelay::mesh::MeshAddress,
) -> Result<Box<dyn NetworkTransport>> {
    let port = cli_port.unwrap_or_else(|| config.radio.port.clone());
    if dry_run || port.is_empty() {
        info!("No radio port configured; running in dry-run mode");
        return Ok(Box::new(MockNetwork::dry_run()));
    }

    #[cfg(feature = "serial")]
    {
        let link = pumprelay::mesh::radio::RadioLink::open(
            &port,
            config.radio.baud_rate,
            config.radio.channel,
            this_node,
        )
        .await?;
        Ok(Box::new(link))
    }

    #[cfg(not(feature = "serial"))]
    {
        let _ = this_node;
        Err(anyhow::anyhow!(
            "radio port {} requested but serial support is not compiled in (enable feature 'serial')",
            port
        ))
    }
}

async fn open_serial(config: &Config, cli_port: Option<String>) -> Result<Box<dyn SerialLink>> {
    let Some(port) = cli_port.or_else(|| config.serial.port.clone()) else {
        info!("Operator link on stdin/stdout");
        return Ok(Box::new(StdioSerial::spawn()));
    };

    #[cfg(feature = "serial")]
    {
        let link = pumprelay::serial::PortSerial::open(&port, config.serial.baud_rate).await?;
        Ok(Box::new(link))
    }

    #[cfg(not(feature = "serial"))]
    {
        log::warn!("serial support not compiled in; ignoring operator port {}", port);
        Err(anyhow::anyhow!("operator port {} requires feature 'serial'", port))
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity wins over the configured level
    let base_level = match (verbosity, config) {
        (0, Some(cfg)) => cfg.logging.level_filter(),
        (0, None) => log::LevelFilter::Info,
        (1, _) => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    // Log to stderr so stdout stays a clean operator channel
    builder.target(env_logger::Target::Stderr);

    let log_file = config.as_ref().and_then(|c| c.logging.file.clone());
    match log_file.map(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| (path, e))
    }) {
        Some(Ok(f)) => {
            let file = std::sync::Mutex::new(f);
            let is_tty = atty::is(atty::Stream::Stderr);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = file.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                // Attached to a terminal: mirror to the console as well
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        other => {
            if let Some(Err((path, e))) = other {
                eprintln!("Cannot open log file {}: {} (logging to stderr)", path, e);
            }
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}
