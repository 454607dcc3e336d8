//! Protocol buffer definitions for the meshmq inter-node relay service.
//!
//! Four unary methods under one `Relays` service, all answering with the same
//! [`Ack`]. The field-numbered encoding is the cluster's compatibility
//! contract: servers accept and ignore unknown trailing fields, so nodes can
//! be upgraded one at a time.

// Include the generated protobuf code
tonic::include_proto!("meshmq.v1");

impl Ack {
    /// Positive acknowledgement returned by every relay handler.
    #[must_use]
    pub fn accepted() -> Self {
        Self { ok: true }
    }
}

impl JoinRequest {
    /// Replication endpoint of the joining node as an ASCII `host:port`.
    #[must_use]
    pub fn raft_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}
