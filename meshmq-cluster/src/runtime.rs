//! Node-level lifecycle for the relay fabric.
//!
//! Startup order matters: the server must be listening before the node
//! announces itself via gossip, otherwise peers may race the first call.
//! Shutdown reverses it: graceful server drain, then pool teardown; the
//! inbound channel closes once the runtime is dropped.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::membership::Membership;
use crate::message::Message;
use crate::metrics::{RelayMetrics, RelayMetricsSnapshot};
use crate::pool::PeerPool;
use crate::relay::RelayClient;
use crate::server::RelayServer;

/// Owns the relay server, the peer pool and the outbound client of a node.
pub struct RelayRuntime {
    config: Arc<RelayConfig>,
    pool: Arc<PeerPool>,
    client: RelayClient,
    server: RelayServer,
    metrics: Arc<RelayMetrics>,
}

impl RelayRuntime {
    /// Builds the fabric and hands back the consumer half of the inbound
    /// message channel for the node's router.
    pub fn new(
        config: RelayConfig,
        membership: Arc<dyn Membership>,
    ) -> (Self, mpsc::Receiver<Message>) {
        let config = Arc::new(config);
        let (incoming_tx, incoming_rx) = mpsc::channel(config.incoming_capacity.max(1));
        let metrics = Arc::new(RelayMetrics::new());
        let pool = Arc::new(PeerPool::new(Arc::clone(&membership), &config));
        let client = RelayClient::new(
            Arc::clone(&config),
            membership,
            Arc::clone(&pool),
            Arc::clone(&metrics),
        );
        let server = RelayServer::new(Arc::clone(&config), incoming_tx, Arc::clone(&metrics));

        let runtime = Self {
            config,
            pool,
            client,
            server,
            metrics,
        };
        (runtime, incoming_rx)
    }

    /// Starts the relay server. Must complete before the node gossips its
    /// presence. The pool starts empty and dials on demand.
    pub async fn start(&self) -> Result<(), RelayError> {
        self.server.start().await
    }

    /// Gracefully stops the server, then closes every pooled connection.
    ///
    /// In-flight inbound calls drain before this returns; in-flight
    /// outbound calls hit their own deadlines. Idempotent.
    pub async fn stop(&self) {
        self.server.stop().await;
        self.pool.clear().await;
    }

    /// Outbound relay operations.
    #[must_use]
    pub fn client(&self) -> &RelayClient {
        &self.client
    }

    /// The per-peer connection pool, for membership-departure eviction.
    #[must_use]
    pub fn pool(&self) -> &PeerPool {
        &self.pool
    }

    /// The configuration the fabric was built with.
    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Address the relay server is listening on, once started.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.local_addr()
    }

    /// Point-in-time relay traffic counters.
    #[must_use]
    pub fn metrics_snapshot(&self) -> RelayMetricsSnapshot {
        self.metrics.snapshot()
    }
}
