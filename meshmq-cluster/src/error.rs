use thiserror::Error;

/// Errors surfaced by the relay fabric.
///
/// Relay operations are best-effort: everything except [`RelayError::Bind`]
/// is logged by the caller and swallowed. A bind failure is fatal and must
/// abort node startup.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Peer id unknown to membership, or its relay address is unset.
    #[error("node {0} not found")]
    NodeNotFound(String),
    /// Transport could not establish a connection to the peer.
    #[error("dialing node {node_id} failed: {error}")]
    Dial {
        /// Remote node identifier.
        node_id: String,
        /// Underlying transport error.
        error: tonic::transport::Error,
    },
    /// The dial did not complete within the dial deadline.
    #[error("dialing node {node_id} timed out")]
    DialTimeout {
        /// Remote node identifier.
        node_id: String,
    },
    /// A dialed call failed or exceeded its deadline.
    #[error("rpc to node {node_id} failed: {status}")]
    Rpc {
        /// Remote node identifier.
        node_id: String,
        /// Status returned by the peer or synthesized at the deadline.
        status: tonic::Status,
    },
    /// The relay listener could not be bound.
    #[error("failed to bind relay listener on {addr}: {error}")]
    Bind {
        /// Listen address that was requested.
        addr: String,
        /// Underlying socket error.
        error: std::io::Error,
    },
}
