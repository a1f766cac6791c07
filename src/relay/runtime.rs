//! Cooperative poll loop that drives a [`RelayEngine`] against real transports.

use anyhow::Result;
use log::{debug, info};
use std::future::Future;
use tokio::time::{Duration, MissedTickBehavior};

use super::{MonotonicClock, RelayEngine, RelayStats};
use crate::mesh::NetworkTransport;
use crate::serial::SerialLink;

/// Engine plus the transports and clock it runs against.
pub struct Bridge<N, S> {
    engine: RelayEngine,
    network: N,
    serial: S,
    clock: MonotonicClock,
    poll_interval: Duration,
}

impl<N: NetworkTransport, S: SerialLink> Bridge<N, S> {
    /// The engine's throttles should have been started at tick 0; the bridge clock
    /// starts counting here.
    pub fn new(engine: RelayEngine, network: N, serial: S, poll_interval: Duration) -> Self {
        Self {
            engine,
            network,
            serial,
            clock: MonotonicClock::new(),
            poll_interval,
        }
    }

    /// Run until Ctrl-C.
    pub async fn run(&mut self) -> Result<RelayStats> {
        self.run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await
    }

    /// Poll until `shutdown` completes.
    pub async fn run_until<F: Future<Output = ()>>(&mut self, shutdown: F) -> Result<RelayStats> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            "relay running: poll every {:?}, network throttle {} ms, serial throttle {} ms",
            self.poll_interval,
            self.engine.settings().network_throttle_ms,
            self.engine.settings().serial_throttle_ms
        );
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = self.clock.now();
                    self.engine.poll(now, &mut self.network, &mut self.serial);
                }
                _ = &mut shutdown => break,
            }
        }

        let stats = self.engine.stats();
        debug!("relay loop terminated");
        stats.log(self.engine.outbound_len(), self.engine.inbound_len());
        Ok(stats)
    }

    pub fn engine(&self) -> &RelayEngine {
        &self.engine
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    pub fn serial(&self) -> &S {
        &self.serial
    }

    pub fn serial_mut(&mut self) -> &mut S {
        &mut self.serial
    }
}
