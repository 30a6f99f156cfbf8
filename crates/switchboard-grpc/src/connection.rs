// ABOUTME: Connection handle wrapping a tonic channel with self-reported health.
// ABOUTME: tonic does not expose channel connectivity, so callers mark state transitions explicitly.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use switchboard_core::{Connection, HealthState};
use tonic::transport::Channel;

const STATE_IDLE: u8 = 0;
const STATE_CONNECTING: u8 = 1;
const STATE_READY: u8 = 2;
const STATE_TRANSIENT_FAILURE: u8 = 3;
const STATE_SHUTDOWN: u8 = 4;

/// A ready gRPC channel paired with the address it was dialed against.
///
/// Clones share the underlying channel and health state. tonic channels
/// multiplex requests internally, so one handle per address is enough.
#[derive(Clone)]
pub struct GrpcConnection {
    channel: Channel,
    address: String,
    state: Arc<AtomicU8>,
}

impl GrpcConnection {
    pub(crate) fn new(channel: Channel, address: String) -> Self {
        Self {
            channel,
            address,
            state: Arc::new(AtomicU8::new(STATE_READY)),
        }
    }

    /// The tonic channel, for constructing generated client stubs.
    pub fn channel(&self) -> Channel {
        self.channel.clone()
    }

    /// The address this connection was dialed against.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Report that a call over this channel failed at the transport level.
    ///
    /// Routing skips the connection until [`mark_ready`](Self::mark_ready)
    /// is called or the pool replaces it.
    pub fn mark_failed(&self) {
        self.transition(STATE_TRANSIENT_FAILURE);
    }

    /// Report that the channel is serving calls again.
    pub fn mark_ready(&self) {
        self.transition(STATE_READY);
    }

    fn transition(&self, target: u8) {
        // Shutdown is terminal.
        let _ = self
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                if current == STATE_SHUTDOWN {
                    None
                } else {
                    Some(target)
                }
            });
    }
}

impl Connection for GrpcConnection {
    fn health(&self) -> HealthState {
        match self.state.load(Ordering::SeqCst) {
            STATE_IDLE => HealthState::Idle,
            STATE_CONNECTING => HealthState::Connecting,
            STATE_READY => HealthState::Ready,
            STATE_TRANSIENT_FAILURE => HealthState::TransientFailure,
            _ => HealthState::Shutdown,
        }
    }

    fn close(&self) {
        self.state.store(STATE_SHUTDOWN, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for GrpcConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrpcConnection")
            .field("address", &self.address)
            .field("health", &self.health())
            .finish_non_exhaustive()
    }
}
