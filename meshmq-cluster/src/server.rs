//! Inbound half of the relay fabric.
//!
//! The server owns its listening socket, converts every inbound call into a
//! [`Message`] and pushes it onto the node's bounded message channel. A full
//! channel blocks the handler; peers only ever see an error once the channel
//! has been closed by shutdown, so routing backlog is never mistaken for a
//! peer fault.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use meshmq_proto::relays_server::{Relays, RelaysServer};
use meshmq_proto::{Ack, ApplyRequest, ConnectRequest, JoinRequest, PublishRequest};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use tracing::{debug, error};

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::keepalive::ServerKeepalive;
use crate::message::Message;
use crate::metrics::RelayMetrics;

/// RPC server accepting relay calls from peers.
pub struct RelayServer {
    config: Arc<RelayConfig>,
    keepalive: ServerKeepalive,
    incoming: mpsc::Sender<Message>,
    metrics: Arc<RelayMetrics>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    serve_task: Mutex<Option<JoinHandle<()>>>,
    bound: Mutex<Option<SocketAddr>>,
}

impl RelayServer {
    /// Creates a server that will lift inbound calls onto `incoming`.
    pub fn new(
        config: Arc<RelayConfig>,
        incoming: mpsc::Sender<Message>,
        metrics: Arc<RelayMetrics>,
    ) -> Self {
        Self {
            config,
            keepalive: ServerKeepalive::default(),
            incoming,
            metrics,
            shutdown: Mutex::new(None),
            serve_task: Mutex::new(None),
            bound: Mutex::new(None),
        }
    }

    /// Binds the configured listen address and begins serving in the
    /// background.
    ///
    /// Bind errors are returned synchronously and no task is spawned; they
    /// are the one fatal error of the fabric. Serve errors after startup
    /// are logged.
    pub async fn start(&self) -> Result<(), RelayError> {
        let addr = self.config.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|error| RelayError::Bind {
                addr: addr.clone(),
                error,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|error| RelayError::Bind { addr, error })?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handlers = RelayHandlers {
            incoming: self.incoming.clone(),
            metrics: Arc::clone(&self.metrics),
        };
        let router = self
            .keepalive
            .configure(Server::builder())
            .add_service(RelaysServer::new(handlers));
        let task = tokio::spawn(async move {
            let served = router
                .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async {
                    shutdown_rx.await.ok();
                })
                .await;
            if let Err(error) = served {
                error!(error = %error, "relay server terminated");
            }
        });

        *self.bound.lock().unwrap() = Some(local_addr);
        *self.shutdown.lock().unwrap() = Some(shutdown_tx);
        *self.serve_task.lock().unwrap() = Some(task);
        debug!(addr = %local_addr, "relay server listening");
        Ok(())
    }

    /// Address the listener is bound to, once started. With a configured
    /// port of zero this is the only way to learn the assigned port.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.bound.lock().unwrap()
    }

    /// Stops accepting new RPCs, waits for in-flight calls to drain and
    /// releases the listener. Idempotent; safe on a never-started server.
    pub async fn stop(&self) {
        let shutdown = self.shutdown.lock().unwrap().take();
        if let Some(tx) = shutdown {
            let _ = tx.send(());
        }
        let task = self.serve_task.lock().unwrap().take();
        if let Some(task) = task {
            if let Err(error) = task.await {
                error!(error = %error, "relay server task join");
            }
        }
        self.bound.lock().unwrap().take();
    }
}

/// Handler set registered with the tonic server.
///
/// Each handler fixes the message kind from the RPC method, never from
/// request content, and owns its `Message` outright: nothing borrows the
/// request buffer past the enqueue.
struct RelayHandlers {
    incoming: mpsc::Sender<Message>,
    metrics: Arc<RelayMetrics>,
}

impl RelayHandlers {
    async fn forward(&self, message: Message) -> Result<Response<Ack>, Status> {
        self.incoming
            .send(message)
            .await
            .map_err(|_| Status::unavailable("message channel closed"))?;
        self.metrics.record_inbound();
        Ok(Response::new(Ack::accepted()))
    }
}

#[tonic::async_trait]
impl Relays for RelayHandlers {
    async fn publish_packet(
        &self,
        request: Request<PublishRequest>,
    ) -> Result<Response<Ack>, Status> {
        self.forward(Message::from(request.into_inner())).await
    }

    async fn connect_notify(
        &self,
        request: Request<ConnectRequest>,
    ) -> Result<Response<Ack>, Status> {
        let req = request.into_inner();
        debug!(origin = %req.node_id, client = %req.client_id, "inbound connect notification");
        self.forward(Message::from(req)).await
    }

    async fn leader_apply(&self, request: Request<ApplyRequest>) -> Result<Response<Ack>, Status> {
        self.forward(Message::from(request.into_inner())).await
    }

    async fn raft_join(&self, request: Request<JoinRequest>) -> Result<Response<Ack>, Status> {
        self.forward(Message::from(request.into_inner())).await
    }
}
