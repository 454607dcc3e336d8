//! Typed relay calls and broadcast helpers.
//!
//! Every operation is best-effort: it issues at most one RPC under a
//! deadline, logs a single structured event on failure, and never surfaces
//! the error to the caller. Durability belongs to the replicated log; a
//! peer that is unreachable at relay time simply misses that message.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use meshmq_proto::relays_client::RelaysClient;
use meshmq_proto::{Ack, ApplyRequest, ConnectRequest, JoinRequest, PublishRequest};
use rand::Rng;
use tokio::time::sleep;
use tonic::transport::Channel;
use tonic::{Code, Request, Status};
use tracing::{debug, error};

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::membership::Membership;
use crate::message::Message;
use crate::metrics::RelayMetrics;
use crate::pool::PeerPool;

/// Attempt cap for a single relay call, including the first try.
const MAX_CALL_ATTEMPTS: u32 = 3;
/// Initial backoff between retry attempts.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);
/// Ceiling for the exponential retry backoff.
const RETRY_MAX_DELAY: Duration = Duration::from_secs(1);

/// Outbound half of the relay fabric.
pub struct RelayClient {
    config: Arc<RelayConfig>,
    membership: Arc<dyn Membership>,
    pool: Arc<PeerPool>,
    metrics: Arc<RelayMetrics>,
}

impl RelayClient {
    /// Creates a client placing calls through `pool`.
    pub fn new(
        config: Arc<RelayConfig>,
        membership: Arc<dyn Membership>,
        pool: Arc<PeerPool>,
        metrics: Arc<RelayMetrics>,
    ) -> Self {
        Self {
            config,
            membership,
            pool,
            metrics,
        }
    }

    /// Forwards a PUBLISH packet to the node hosting matching subscribers.
    pub async fn relay_publish(&self, node_id: &str, msg: &Message) {
        let req = PublishRequest {
            node_id: msg.origin_node_id.clone(),
            client_id: msg.client_id.clone(),
            protocol_version: u32::from(msg.protocol_version),
            payload: msg.payload.clone(),
        };
        let deadline = self.config.request_timeout;
        if let Err(err) = self
            .dispatch(node_id, deadline, req, |mut client, req| async move {
                client.publish_packet(Request::new(req)).await
            })
            .await
        {
            error!(node = %node_id, client = %msg.client_id, error = %err, "relay publish packet");
        }
    }

    /// Tells `node_id` that `client_id` has connected locally.
    pub async fn notify_connect(&self, node_id: &str, client_id: &str) {
        let req = ConnectRequest {
            node_id: self.config.node_name.clone(),
            client_id: client_id.to_string(),
        };
        debug!(node = %node_id, client = %client_id, "outbound connect notification");
        let deadline = self.config.request_timeout;
        if let Err(err) = self
            .dispatch(node_id, deadline, req, |mut client, req| async move {
                client.connect_notify(Request::new(req)).await
            })
            .await
        {
            error!(node = %node_id, client = %client_id, error = %err, "connect notification");
        }
    }

    /// Announces a local connect to every member except self.
    pub async fn notify_connect_others(&self, msg: &Message) {
        for member in self.membership.members() {
            if member.name == self.config.node_name {
                continue;
            }
            self.notify_connect(&member.name, &msg.client_id).await;
        }
    }

    /// Ships a subscription-table mutation to `node_id`, normally the leader.
    pub async fn relay_apply(&self, node_id: &str, msg: &Message) {
        let req = ApplyRequest {
            action: msg.action,
            node_id: msg.origin_node_id.clone(),
            filter: msg.payload.clone(),
        };
        let deadline = self.config.apply_timeout();
        if let Err(err) = self
            .dispatch(node_id, deadline, req, |mut client, req| async move {
                client.leader_apply(Request::new(req)).await
            })
            .await
        {
            error!(
                node = %node_id,
                origin = %msg.origin_node_id,
                action = msg.action,
                error = %err,
                "to leader do apply"
            );
        }
    }

    /// Ships a mutation to every member except self, for when the leader is
    /// not known locally.
    pub async fn relay_apply_others(&self, msg: &Message) {
        for member in self.membership.members() {
            if member.name == self.config.node_name {
                continue;
            }
            self.relay_apply(&member.name, msg).await;
        }
    }

    /// Asks `node_id` to add this node to the replicated log membership.
    pub async fn relay_join(&self, node_id: &str) {
        let req = JoinRequest {
            node_id: self.config.node_name.clone(),
            addr: self.config.bind_addr.clone(),
            port: u32::from(self.config.raft_port),
        };
        let deadline = self.config.request_timeout;
        if let Err(err) = self
            .dispatch(node_id, deadline, req, |mut client, req| async move {
                client.raft_join(Request::new(req)).await
            })
            .await
        {
            error!(node = %node_id, addr = %self.config.raft_addr(), error = %err, "raft join");
        }
    }

    /// Offers this node's replication endpoint to every member except self.
    pub async fn relay_join_others(&self) {
        for member in self.membership.members() {
            if member.name == self.config.node_name {
                continue;
            }
            self.relay_join(&member.name).await;
        }
    }

    /// Places one call under `deadline`, retrying transient unavailability.
    async fn dispatch<R, F, Fut>(
        &self,
        node_id: &str,
        deadline: Duration,
        request: R,
        invoke: F,
    ) -> Result<Ack, RelayError>
    where
        R: Clone,
        F: Fn(RelaysClient<Channel>, R) -> Fut + Copy,
        Fut: Future<Output = Result<tonic::Response<Ack>, Status>>,
    {
        self.metrics.record_relay();
        let outcome = self.try_dispatch(node_id, deadline, request, invoke).await;
        if outcome.is_err() {
            self.metrics.record_relay_failure();
        }
        outcome
    }

    /// The dial carries its own deadline inside the pool; `deadline` bounds
    /// the attempts and the backoff between them and is never reset by a
    /// retry. Only `Unavailable` is retried: a deadline expiry means the
    /// caller's time is spent, not that the peer is flaky.
    async fn try_dispatch<R, F, Fut>(
        &self,
        node_id: &str,
        deadline: Duration,
        request: R,
        invoke: F,
    ) -> Result<Ack, RelayError>
    where
        R: Clone,
        F: Fn(RelaysClient<Channel>, R) -> Fut + Copy,
        Fut: Future<Output = Result<tonic::Response<Ack>, Status>>,
    {
        let peer = self.pool.get(node_id).await?;

        let attempts = async {
            let mut delay = RETRY_BASE_DELAY;
            let mut attempt = 1;
            loop {
                match invoke(peer.stub(), request.clone()).await {
                    Ok(ack) => return Ok(ack.into_inner()),
                    Err(status)
                        if status.code() == Code::Unavailable && attempt < MAX_CALL_ATTEMPTS =>
                    {
                        attempt += 1;
                        sleep(jitter(delay)).await;
                        delay = std::cmp::min(delay * 2, RETRY_MAX_DELAY);
                    }
                    Err(status) => return Err(status),
                }
            }
        };

        match tokio::time::timeout(deadline, attempts).await {
            Ok(Ok(ack)) => Ok(ack),
            Ok(Err(status)) => Err(RelayError::Rpc {
                node_id: node_id.to_string(),
                status,
            }),
            Err(_) => Err(RelayError::Rpc {
                node_id: node_id.to_string(),
                status: Status::deadline_exceeded("relay deadline exceeded"),
            }),
        }
    }
}

fn jitter(base: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let factor: f64 = rng.r#gen();
    let millis = (base.as_millis() as f64 * factor) as u64;
    Duration::from_millis(millis.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_within_base() {
        let base = Duration::from_millis(200);
        for _ in 0..32 {
            let jittered = jitter(base);
            assert!(jittered >= Duration::from_millis(1));
            assert!(jittered <= base);
        }
    }
}
