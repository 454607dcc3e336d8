//! Lazy per-peer connection pool.
//!
//! Clients are dialed on first demand and held for the life of the peer's
//! membership. A single mutex covers the map and the dial itself: peer
//! count is bounded by cluster size and dials are rare, so coarse locking
//! beats per-entry locks here. Transient call failures never evict an
//! entry; transport keepalive and call retries recover under the same
//! connection, and explicit [`PeerPool::remove`] handles departures.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use meshmq_proto::relays_client::RelaysClient;
use tokio::sync::Mutex;
use tonic::transport::{Channel, Endpoint};

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::keepalive::ClientKeepalive;
use crate::membership::Membership;

/// A pooled peer connection and its typed stub.
#[derive(Debug, Clone)]
pub struct PeerClient {
    node_id: String,
    channel: Channel,
    stub: RelaysClient<Channel>,
}

impl PeerClient {
    /// Node id this client was cached under.
    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// The underlying transport, for subsystems that need raw channels.
    #[must_use]
    pub fn channel(&self) -> Channel {
        self.channel.clone()
    }

    /// A stub bound to the pooled connection.
    #[must_use]
    pub fn stub(&self) -> RelaysClient<Channel> {
        self.stub.clone()
    }
}

/// Lazily dialed, membership-keyed client pool.
pub struct PeerPool {
    membership: Arc<dyn Membership>,
    keepalive: ClientKeepalive,
    dial_timeout: Duration,
    clients: Mutex<HashMap<String, PeerClient>>,
}

impl PeerPool {
    /// Creates an empty pool resolving addresses through `membership`.
    pub fn new(membership: Arc<dyn Membership>, config: &RelayConfig) -> Self {
        Self {
            membership,
            keepalive: ClientKeepalive::default(),
            dial_timeout: config.dial_timeout(),
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached client for `node_id`, dialing on first use.
    ///
    /// A failed dial leaves no cache entry; the next call re-dials.
    pub async fn get(&self, node_id: &str) -> Result<PeerClient, RelayError> {
        let mut clients = self.clients.lock().await;
        if let Some(existing) = clients.get(node_id) {
            return Ok(existing.clone());
        }

        let addr = self
            .membership
            .member(node_id)
            .and_then(|member| member.grpc_addr())
            .ok_or_else(|| RelayError::NodeNotFound(node_id.to_string()))?;

        let endpoint = Endpoint::from_shared(format!("http://{addr}"))
            .map_err(|error| RelayError::Dial {
                node_id: node_id.to_string(),
                error,
            })?
            .connect_timeout(self.dial_timeout);
        let endpoint = self.keepalive.configure(endpoint);

        let channel = match tokio::time::timeout(self.dial_timeout, endpoint.connect()).await {
            Ok(Ok(channel)) => channel,
            Ok(Err(error)) => {
                return Err(RelayError::Dial {
                    node_id: node_id.to_string(),
                    error,
                });
            }
            Err(_) => {
                return Err(RelayError::DialTimeout {
                    node_id: node_id.to_string(),
                });
            }
        };

        let entry = PeerClient {
            node_id: node_id.to_string(),
            stub: RelaysClient::new(channel.clone()),
            channel,
        };
        clients.insert(node_id.to_string(), entry.clone());
        Ok(entry)
    }

    /// Evicts and closes the connection for `node_id`; silent when absent.
    pub async fn remove(&self, node_id: &str) {
        self.clients.lock().await.remove(node_id);
    }

    /// Closes every pooled connection. Used during node shutdown.
    pub async fn clear(&self) {
        self.clients.lock().await.clear();
    }

    /// Number of pooled peer clients.
    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Returns true when no peers are pooled.
    pub async fn is_empty(&self) -> bool {
        self.clients.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::{GRPC_PORT_TAG, Member, StaticMembership};

    fn pool_with(directory: StaticMembership) -> PeerPool {
        let membership: Arc<dyn Membership> = Arc::new(directory);
        PeerPool::new(
            membership,
            &RelayConfig {
                request_timeout: Duration::from_millis(100),
                ..RelayConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn unknown_node_is_not_found() {
        let pool = pool_with(StaticMembership::new());
        match pool.get("node-x").await {
            Err(RelayError::NodeNotFound(id)) => assert_eq!(id, "node-x"),
            other => panic!("expected NodeNotFound, got {other:?}"),
        }
        assert!(pool.is_empty().await);
    }

    #[tokio::test]
    async fn member_without_relay_port_is_not_found() {
        let directory = StaticMembership::new();
        directory.upsert(Member::new("node-a", "127.0.0.1"));
        let pool = pool_with(directory);
        assert!(matches!(
            pool.get("node-a").await,
            Err(RelayError::NodeNotFound(_))
        ));
    }

    #[tokio::test]
    async fn member_with_empty_host_is_not_found() {
        let directory = StaticMembership::new();
        directory.upsert(Member::new("node-a", "").with_tag(GRPC_PORT_TAG, "17946"));
        let pool = pool_with(directory);
        assert!(matches!(
            pool.get("node-a").await,
            Err(RelayError::NodeNotFound(_))
        ));
    }

    #[tokio::test]
    async fn failed_dial_leaves_no_entry() {
        let directory = StaticMembership::new();
        let port = portpicker::pick_unused_port().expect("no free ports");
        directory.upsert(
            Member::new("node-a", "127.0.0.1").with_tag(GRPC_PORT_TAG, port.to_string()),
        );
        let pool = pool_with(directory);

        let result = pool.get("node-a").await;
        assert!(matches!(
            result,
            Err(RelayError::Dial { .. }) | Err(RelayError::DialTimeout { .. })
        ));
        assert!(pool.is_empty().await);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let pool = pool_with(StaticMembership::new());
        pool.remove("node-a").await;
        pool.remove("node-a").await;
        assert_eq!(pool.len().await, 0);
    }
}
