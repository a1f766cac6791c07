//! # pumprelay - Serial to Mesh Relay for Pump Actuators
//!
//! pumprelay is the master node of a small radio mesh of pump actuators. It takes
//! text commands from an operator over a serial line, paces them out onto the mesh,
//! and relays the telemetry the pumps send back.
//!
//! ## Features
//!
//! - **Compact Command Protocol**: `S;G;t=3;s=250.0;p=1500` style lines, one command each.
//! - **Logical Addressing**: pumps are named 0-15; a fixed table maps ids to mesh addresses.
//! - **Paced Queues**: bounded outbound and inbound queues drained at fixed cadences.
//! - **Fault Reporting**: every local or remote fault becomes one fixed operator line.
//! - **Radio Modem Link**: SLIP framed, CRC checked serial link to the radio (feature `serial`).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pumprelay::config::Config;
//! use pumprelay::mesh::MockNetwork;
//! use pumprelay::relay::{Bridge, RelayEngine};
//! use pumprelay::serial::StdioSerial;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let engine = RelayEngine::new(config.address_table()?, config.relay.settings(), 0);
//!     let poll = std::time::Duration::from_millis(config.relay.poll_interval_ms);
//!     let mut bridge = Bridge::new(engine, MockNetwork::dry_run(), StdioSerial::spawn(), poll);
//!     bridge.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`command`] - command types and the operator line parser
//! - [`mesh`] - address table, wire formats and network transports
//! - [`relay`] - the relay engine, its queues, throttles and poll loop
//! - [`serial`] - operator link implementations
//! - [`fault`] - fault taxonomy and serial error reporting
//! - [`config`] - TOML configuration
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐        ┌─────────────────┐
//! │  Operator link  │ ◄────► │  Relay engine   │
//! │  (SerialLink)   │        │ queues/throttles│
//! └─────────────────┘        └─────────────────┘
//!                                     │
//!                            ┌─────────────────┐
//!                            │  Mesh transport │
//!                            │(NetworkTransport)│
//!                            └─────────────────┘
//! ```

pub mod command;
pub mod config;
pub mod fault;
pub mod logutil;
pub mod mesh;
pub mod relay;
pub mod serial;
