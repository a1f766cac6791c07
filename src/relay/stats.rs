//! Relay counters.

use log::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub commands_queued: u64,
    pub commands_sent: u64,
    pub send_failures: u64,
    /// Rejected at enqueue (queue full) or at dispatch (unresolvable destination).
    pub commands_dropped: u64,
    pub records_queued: u64,
    pub records_relayed: u64,
    pub records_dropped: u64,
    pub remote_faults: u64,
    pub header_errors: u64,
}

impl RelayStats {
    pub fn log(&self, outbound_len: usize, inbound_len: usize) {
        debug!(
            "relay stats: outbound={} inbound={} queued={} sent={} failed={} dropped={} records_queued={} relayed={} records_dropped={} remote_faults={} header_errors={}",
            outbound_len,
            inbound_len,
            self.commands_queued,
            self.commands_sent,
            self.send_failures,
            self.commands_dropped,
            self.records_queued,
            self.records_relayed,
            self.records_dropped,
            self.remote_faults,
            self.header_errors
        );
    }
}
