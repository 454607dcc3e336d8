//! Inter-node relay fabric for a clustered MQTT broker.
//!
//! Each node runs an RPC server accepting calls from peers and a lazily
//! dialed client pool for placing calls to peers. Inbound calls are lifted
//! into a single bounded channel consumed by the node's message router;
//! outbound relays are best-effort under per-call deadlines, with durability
//! left to the replicated log.

/// Relay configuration passed in by the host at construction time.
pub mod config;
/// Error types surfaced by the relay fabric.
pub mod error;
/// Transport keepalive parameter blocks.
pub mod keepalive;
/// Membership directory interface consumed from the gossip layer.
pub mod membership;
/// Neutral message record exchanged between the server and the router.
pub mod message;
/// Relay traffic counters.
pub mod metrics;
/// Lazy per-peer connection pool.
pub mod pool;
/// Typed relay call methods and broadcast helpers.
pub mod relay;
/// Start/stop lifecycle tying server, pool and channel together.
pub mod runtime;
/// RPC server lifting inbound calls onto the local message channel.
pub mod server;

pub use config::RelayConfig;
pub use error::RelayError;
pub use keepalive::{ClientKeepalive, EnforcementPolicy, ServerKeepalive};
pub use membership::{GRPC_PORT_TAG, Member, Membership, StaticMembership};
pub use message::{Message, MessageKind, apply_action};
pub use metrics::{RelayMetrics, RelayMetricsSnapshot};
pub use pool::{PeerClient, PeerPool};
pub use relay::RelayClient;
pub use runtime::RelayRuntime;
pub use server::RelayServer;
