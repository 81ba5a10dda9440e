//! Round-trip time synchronization and connection liveness.
//!
//! The node periodically sends an empty time probe; the device answers
//! with its current clock. Half the round-trip latency is added to the
//! reported time to estimate the remote epoch at the moment the answer
//! landed. A link counts as connected only while syncs keep completing.

use crate::messages::{TimeStamp, WireMessage};
use crate::protocol::{CONNECTION_TIMEOUT_MS, SYNC_PERIOD_MS};

/// Observable connection lifecycle, derived from the sync state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No completed handshake, none in flight.
    Disconnected,
    /// A sync probe is in flight and no connection is up yet.
    Syncing { started_at_ms: u64 },
    /// At least one handshake completed recently.
    Connected { last_sync_ms: u64 },
}

/// What the owner must do after a housekeeping tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickAction {
    None,
    /// Transmit a sync probe; a request was just recorded.
    SendSyncRequest,
    /// The connection timed out; flush any half-parsed inbound frame.
    ConnectionLost,
}

/// Time-sync handshake state and the synchronized clock it produces.
pub(crate) struct TimeSync {
    /// Local millis when the in-flight probe went out, if any.
    pending_since_ms: Option<u64>,
    /// Local millis of the last completed handshake.
    last_sync_ms: u64,
    connected: bool,
    /// Remote wall clock at `last_sync_ms`.
    remote_epoch: TimeStamp,
}

impl TimeSync {
    pub fn new() -> Self {
        Self {
            pending_since_ms: None,
            last_sync_ms: 0,
            connected: false,
            remote_epoch: TimeStamp::default(),
        }
    }

    /// Record a new sync request. Returns true when the caller should
    /// transmit the probe; a request already in flight makes this a no-op.
    pub fn begin_request(&mut self, now_ms: u64) -> bool {
        if self.pending_since_ms.is_some() {
            return false;
        }
        self.pending_since_ms = Some(now_ms);
        true
    }

    /// Complete the handshake from a time frame payload.
    ///
    /// Unsolicited frames (no probe in flight) are ignored; a malformed
    /// payload leaves the probe in flight in case the peer answers again.
    /// Returns true when the handshake completed.
    pub fn complete(&mut self, payload: &[u8], now_ms: u64) -> bool {
        let Some(started_ms) = self.pending_since_ms else {
            log::debug!("Ignoring unsolicited time frame");
            return false;
        };
        let Some(remote) = TimeStamp::decode(payload) else {
            log::warn!("Malformed time frame ({} bytes)", payload.len());
            return false;
        };

        // The reply reports the remote clock at roughly the midpoint of
        // the round trip.
        let offset_ms = (now_ms - started_ms) / 2;
        self.remote_epoch = remote.add_millis(offset_ms);
        self.last_sync_ms = now_ms;
        self.pending_since_ms = None;

        if !self.connected {
            log::info!("Time sync complete, connection up");
        }
        self.connected = true;
        log::debug!(
            "Synced time: {}.{:09}",
            self.remote_epoch.sec,
            self.remote_epoch.nsec
        );
        true
    }

    /// Periodic housekeeping: liveness timeout and sync refresh.
    pub fn tick(&mut self, now_ms: u64) -> TickAction {
        if !self.connected {
            return TickAction::None;
        }

        if now_ms - self.last_sync_ms > CONNECTION_TIMEOUT_MS {
            log::warn!(
                "No time sync for {}ms, dropping connection",
                now_ms - self.last_sync_ms
            );
            self.disconnect();
            return TickAction::ConnectionLost;
        }

        if now_ms - self.last_sync_ms > SYNC_PERIOD_MS && self.begin_request(now_ms) {
            return TickAction::SendSyncRequest;
        }

        TickAction::None
    }

    /// Drop the connection and any in-flight probe.
    pub fn disconnect(&mut self) {
        self.connected = false;
        self.pending_since_ms = None;
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn state(&self) -> LinkState {
        if self.connected {
            LinkState::Connected {
                last_sync_ms: self.last_sync_ms,
            }
        } else if let Some(started_at_ms) = self.pending_since_ms {
            LinkState::Syncing { started_at_ms }
        } else {
            LinkState::Disconnected
        }
    }

    /// Peer-epoch wall clock: remote epoch plus local time elapsed since
    /// the last completed sync.
    pub fn now(&self, now_ms: u64) -> TimeStamp {
        self.remote_epoch.add_millis(now_ms - self.last_sync_ms)
    }
}
