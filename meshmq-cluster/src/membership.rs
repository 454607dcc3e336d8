//! Membership directory consumed from the gossip layer.
//!
//! The relay never runs gossip itself; it reads a directory maintained by
//! the membership service. [`Membership`] is the seam the host implements,
//! [`StaticMembership`] is a concurrent-map-backed directory for hosts
//! without gossip and for tests.

use std::collections::HashMap;

use dashmap::DashMap;

/// Gossip tag carrying the port of a member's relay endpoint.
pub const GRPC_PORT_TAG: &str = "grpc-port";

/// A cluster member as advertised by the membership service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Stable node id assigned by the membership layer; never parsed here.
    pub name: String,
    /// Host the member advertised via gossip.
    pub addr: String,
    /// Opaque gossip tags attached to the member record.
    pub tags: HashMap<String, String>,
}

impl Member {
    /// Creates a member record with no tags.
    pub fn new(name: impl Into<String>, addr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addr: addr.into(),
            tags: HashMap::new(),
        }
    }

    /// Attaches a gossip tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Projects the member record to its relay `host:port` endpoint.
    ///
    /// Returns `None` when the member does not advertise a relay port or the
    /// advertised host is empty; callers treat that the same as an unknown
    /// node.
    #[must_use]
    pub fn grpc_addr(&self) -> Option<String> {
        let port = self.tags.get(GRPC_PORT_TAG)?;
        if self.addr.is_empty() || port.is_empty() {
            return None;
        }
        Some(format!("{}:{}", self.addr, port))
    }
}

/// Read-only view of the cluster membership.
pub trait Membership: Send + Sync {
    /// Snapshot of all current members, including the local node.
    fn members(&self) -> Vec<Member>;

    /// Looks up a single member by node id.
    fn member(&self, node_id: &str) -> Option<Member>;
}

/// Membership directory backed by a concurrent map, maintained by the host.
#[derive(Debug, Default)]
pub struct StaticMembership {
    members: DashMap<String, Member>,
}

impl StaticMembership {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a member record.
    pub fn upsert(&self, member: Member) {
        self.members.insert(member.name.clone(), member);
    }

    /// Removes a member; silent when absent.
    pub fn remove(&self, node_id: &str) {
        self.members.remove(node_id);
    }

    /// Number of tracked members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true when no members are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl Membership for StaticMembership {
    fn members(&self) -> Vec<Member> {
        self.members
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn member(&self, node_id: &str) -> Option<Member> {
        self.members.get(node_id).map(|entry| entry.value().clone())
    }
}
