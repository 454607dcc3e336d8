//! Neutral message record passed from the relay server to the router.
//!
//! Handlers convert each inbound call into a [`Message`] and enqueue it;
//! the kind is fixed by the RPC method, never by request content, so an
//! untrusted peer cannot rename an action on the wire.

use meshmq_proto::{ApplyRequest, ConnectRequest, JoinRequest, PublishRequest};

/// Subscription-table mutation kinds carried by leader-apply relays.
///
/// Both ends of the relay agree on these values; the relay itself treats
/// the action as opaque.
pub mod apply_action {
    /// Add a topic-filter subscription for a node.
    pub const SUBSCRIBE: u32 = 1;
    /// Remove a topic-filter subscription for a node.
    pub const UNSUBSCRIBE: u32 = 2;
}

/// What an inbound relay call is asking the local node to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// A raw MQTT PUBLISH packet to route to local subscribers.
    Publish,
    /// A client connected at the origin node; evict any duplicate session.
    Connect,
    /// A state-machine mutation to apply through the replicated log.
    LeaderApply,
    /// A node asking to join the replicated log membership.
    RaftJoin,
}

/// The record emitted by the RPC server onto the local message channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Operation requested, fixed by the RPC method that carried it.
    pub kind: MessageKind,
    /// Peer that initiated the call.
    pub origin_node_id: String,
    /// MQTT client id, for publish and connect relays.
    pub client_id: String,
    /// MQTT protocol version byte of the publishing session.
    pub protocol_version: u8,
    /// Opaque bytes: a PUBLISH packet, a subscription record, or the ASCII
    /// `host:port` of a joining node's replication endpoint.
    pub payload: Vec<u8>,
    /// Mutation kind, for leader-apply relays only.
    pub action: u32,
}

impl Message {
    /// A PUBLISH packet relayed from `origin`.
    pub fn publish(
        origin: impl Into<String>,
        client_id: impl Into<String>,
        protocol_version: u8,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            kind: MessageKind::Publish,
            origin_node_id: origin.into(),
            client_id: client_id.into(),
            protocol_version,
            payload,
            action: 0,
        }
    }

    /// A connect notification from `origin`.
    pub fn connect(origin: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Connect,
            origin_node_id: origin.into(),
            client_id: client_id.into(),
            protocol_version: 0,
            payload: Vec::new(),
            action: 0,
        }
    }

    /// A subscription-table mutation headed for the leader.
    pub fn leader_apply(action: u32, origin: impl Into<String>, filter: Vec<u8>) -> Self {
        Self {
            kind: MessageKind::LeaderApply,
            origin_node_id: origin.into(),
            client_id: String::new(),
            protocol_version: 0,
            payload: filter,
            action,
        }
    }

    /// A join request from `origin` whose replication endpoint is `raft_addr`.
    pub fn raft_join(origin: impl Into<String>, raft_addr: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::RaftJoin,
            origin_node_id: origin.into(),
            client_id: String::new(),
            protocol_version: 0,
            payload: raft_addr.into().into_bytes(),
            action: 0,
        }
    }
}

impl From<PublishRequest> for Message {
    fn from(req: PublishRequest) -> Self {
        Self::publish(
            req.node_id,
            req.client_id,
            req.protocol_version as u8,
            req.payload,
        )
    }
}

impl From<ConnectRequest> for Message {
    fn from(req: ConnectRequest) -> Self {
        Self::connect(req.node_id, req.client_id)
    }
}

impl From<ApplyRequest> for Message {
    fn from(req: ApplyRequest) -> Self {
        Self::leader_apply(req.action, req.node_id, req.filter)
    }
}

impl From<JoinRequest> for Message {
    fn from(req: JoinRequest) -> Self {
        let raft_addr = req.raft_addr();
        Self::raft_join(req.node_id, raft_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_request_lifts_losslessly() {
        let msg = Message::from(PublishRequest {
            node_id: "node-a".to_string(),
            client_id: "c1".to_string(),
            protocol_version: 5,
            payload: vec![0xDE, 0xAD, 0xBE, 0xEF],
        });
        assert_eq!(msg.kind, MessageKind::Publish);
        assert_eq!(msg.origin_node_id, "node-a");
        assert_eq!(msg.client_id, "c1");
        assert_eq!(msg.protocol_version, 5);
        assert_eq!(msg.payload, vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn connect_request_lifts_losslessly() {
        let msg = Message::from(ConnectRequest {
            node_id: "node-a".to_string(),
            client_id: "c2".to_string(),
        });
        assert_eq!(msg.kind, MessageKind::Connect);
        assert_eq!(msg.origin_node_id, "node-a");
        assert_eq!(msg.client_id, "c2");
        assert!(msg.payload.is_empty());
    }

    #[test]
    fn apply_request_preserves_action_and_filter() {
        let msg = Message::from(ApplyRequest {
            action: apply_action::SUBSCRIBE,
            node_id: "node-b".to_string(),
            filter: b"sensors/+/temperature".to_vec(),
        });
        assert_eq!(msg.kind, MessageKind::LeaderApply);
        assert_eq!(msg.action, apply_action::SUBSCRIBE);
        assert_eq!(msg.origin_node_id, "node-b");
        assert_eq!(msg.payload, b"sensors/+/temperature".to_vec());
    }

    #[test]
    fn join_request_payload_is_ascii_host_port() {
        let msg = Message::from(JoinRequest {
            node_id: "node-d".to_string(),
            addr: "10.0.0.4".to_string(),
            port: 8946,
        });
        assert_eq!(msg.kind, MessageKind::RaftJoin);
        assert_eq!(msg.origin_node_id, "node-d");
        assert_eq!(msg.payload, b"10.0.0.4:8946".to_vec());
    }
}
