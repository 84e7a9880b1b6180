//! Resource task and its client handle.
//!
//! One task owns the [`ObservableResource`] and processes inbound requests,
//! delivery reports and the notify timer strictly one at a time. Clients talk
//! to it through a cloneable [`ResourceHandle`].

use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use super::engine::ObservableResource;
use super::notifier::DeliveryReport;
use super::properties::{Properties, Units};
use super::validation::UpdateCommand;
use crate::error::{DaemonError, Result};

/// Default request queue depth.
pub const REQUEST_BUFFER: usize = 32;

#[derive(Debug)]
pub enum ResourceRequest {
    Retrieve {
        observe: Option<bool>,
        units: Option<Units>,
        reply: oneshot::Sender<Properties>,
    },
    Update {
        command: UpdateCommand,
        reply: oneshot::Sender<Result<Properties>>,
    },
}

/// Cloneable client side of a resource task.
#[derive(Clone, Debug)]
pub struct ResourceHandle {
    identifier: String,
    requests: mpsc::Sender<ResourceRequest>,
}

impl ResourceHandle {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub async fn retrieve(&self, observe: Option<bool>) -> Result<Properties> {
        self.retrieve_with(observe, None).await
    }

    /// Retrieve with the temperature translated into `units`.
    pub async fn retrieve_in(&self, observe: Option<bool>, units: Units) -> Result<Properties> {
        self.retrieve_with(observe, Some(units)).await
    }

    async fn retrieve_with(&self, observe: Option<bool>, units: Option<Units>) -> Result<Properties> {
        let (reply, response) = oneshot::channel();
        self.send(ResourceRequest::Retrieve {
            observe,
            units,
            reply,
        })
        .await?;
        response.await.map_err(|_| self.closed())
    }

    pub async fn update(&self, command: UpdateCommand) -> Result<Properties> {
        let (reply, response) = oneshot::channel();
        self.send(ResourceRequest::Update { command, reply }).await?;
        response.await.map_err(|_| self.closed())?
    }

    async fn send(&self, request: ResourceRequest) -> Result<()> {
        self.requests
            .send(request)
            .await
            .map_err(|_| self.closed())
    }

    fn closed(&self) -> DaemonError {
        DaemonError::ResourceClosed(self.identifier.clone())
    }
}

pub struct ResourceServer {
    engine: ObservableResource,
    requests: mpsc::Receiver<ResourceRequest>,
    reports: mpsc::UnboundedReceiver<DeliveryReport>,
}

impl ResourceServer {
    pub fn new(
        engine: ObservableResource,
        reports: mpsc::UnboundedReceiver<DeliveryReport>,
        buffer: usize,
    ) -> (Self, ResourceHandle) {
        let (tx, rx) = mpsc::channel(buffer);
        let handle = ResourceHandle {
            identifier: engine.identifier().to_string(),
            requests: tx,
        };
        (
            Self {
                engine,
                requests: rx,
                reports,
            },
            handle,
        )
    }

    /// Serve until `shutdown` fires or every handle is dropped, then drive the
    /// hardware safe. Returns the engine for inspection.
    pub async fn run(mut self, shutdown: CancellationToken) -> ObservableResource {
        info!("[Resource] {} serving", self.engine.identifier());

        loop {
            let deadline = self.engine.next_deadline();

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    debug!("[Resource] {} shutdown requested", self.engine.identifier());
                    break;
                }
                Some(report) = self.reports.recv() => {
                    self.engine.on_delivery_report(report);
                }
                request = self.requests.recv() => match request {
                    Some(request) => self.dispatch(request),
                    None => {
                        debug!("[Resource] {} has no clients left", self.engine.identifier());
                        break;
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.engine.notify_tick();
                }
            }
        }

        if let Err(e) = self.engine.shutdown() {
            warn!(
                "[Resource] {} failed to reach safe state: {}",
                self.engine.identifier(),
                e
            );
        }
        info!("[Resource] {} stopped", self.engine.identifier());
        self.engine
    }

    fn dispatch(&mut self, request: ResourceRequest) {
        match request {
            ResourceRequest::Retrieve {
                observe,
                units,
                reply,
            } => {
                let properties = match units {
                    Some(units) => self.engine.handle_retrieve_in(observe, units),
                    None => self.engine.handle_retrieve(observe),
                };
                if reply.send(properties).is_err() {
                    debug!("[Resource] retrieve requester went away");
                }
            }
            ResourceRequest::Update { command, reply } => {
                let result = self.engine.handle_update(command);
                if let Err(e) = &result {
                    info!("[Resource] {} rejected update: {}", self.engine.identifier(), e);
                }
                if reply.send(result).is_err() {
                    debug!("[Resource] update requester went away");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::resource::notifier::notify_channel;
    use crate::resource::{PropertyValue, ResourceKind};
    use crate::sensors::simulated_adapter;

    fn server(kind: ResourceKind) -> (ResourceServer, ResourceHandle) {
        let (sink, _rx) = notify_channel();
        let (_reports_tx, reports_rx) = mpsc::unbounded_channel();
        let engine =
            ObservableResource::new(kind, kind.to_string(), simulated_adapter(kind), Box::new(sink))
                .unwrap();
        ResourceServer::new(engine, reports_rx, REQUEST_BUFFER)
    }

    #[tokio::test]
    async fn test_handle_round_trip() {
        let (server, handle) = server(ResourceKind::Led);
        let task = tokio::spawn(server.run(CancellationToken::new()));

        let props = handle.update(UpdateCommand::Switch(true)).await.unwrap();
        assert_eq!(props.value, PropertyValue::Binary { value: true });
        let props = handle.retrieve(None).await.unwrap();
        assert_eq!(props.value, PropertyValue::Binary { value: true });

        drop(handle);
        let engine = task.await.unwrap();
        // the task drives the LED off on exit
        assert_eq!(engine.properties().value, PropertyValue::Binary { value: false });
    }

    #[tokio::test]
    async fn test_validation_error_reaches_client() {
        let (server, handle) = server(ResourceKind::Button);
        tokio::spawn(server.run(CancellationToken::new()));

        let err = handle.update(UpdateCommand::Switch(true)).await.unwrap_err();
        assert!(matches!(
            err,
            DaemonError::Validation(ValidationError::ReadOnly("button"))
        ));
    }

    #[tokio::test]
    async fn test_closed_after_shutdown() {
        let (server, handle) = server(ResourceKind::Gas);
        let token = CancellationToken::new();
        let task = tokio::spawn(server.run(token.clone()));

        token.cancel();
        task.await.unwrap();
        assert!(matches!(
            handle.retrieve(None).await,
            Err(DaemonError::ResourceClosed(id)) if id == "gas"
        ));
    }
}
