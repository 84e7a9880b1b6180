//! MQTT transport for one resource.
//!
//! The event loop task owns the rumqttc [`EventLoop`], forwards requests to a
//! worker that talks to the resource task, and publishes notifications handed
//! off by the engine. Delivery outcomes go back to the engine as
//! [`DeliveryReport`]s.

use std::time::Duration;

use log::{debug, error, info, warn};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{RequestTopic, ResourceTopics, answer};
use crate::config::MqttConfig;
use crate::device_info::ResourceDescriptor;
use crate::error::Result;
use crate::resource::{DeliveryReport, Notification, ResourceHandle, ResourceKind};

const RECONNECT_DELAY: Duration = Duration::from_secs(5);
/// How long shutdown waits for the unregister publish to be acknowledged.
const UNREGISTER_TIMEOUT: Duration = Duration::from_millis(500);

/// Message received from the broker.
#[derive(Debug, Clone)]
struct MqttMessage {
    request: RequestTopic,
    payload: String,
}

pub struct MqttTransport {
    client: AsyncClient,
    event_loop: EventLoop,
    topics: ResourceTopics,
    kind: ResourceKind,
    handle: ResourceHandle,
    descriptor: String,
    notifications: mpsc::UnboundedReceiver<Notification>,
    reports: mpsc::UnboundedSender<DeliveryReport>,
    connected: bool,
}

impl MqttTransport {
    pub fn new(
        config: &MqttConfig,
        kind: ResourceKind,
        topics: ResourceTopics,
        handle: ResourceHandle,
        descriptor: &ResourceDescriptor,
        notifications: mpsc::UnboundedReceiver<Notification>,
        reports: mpsc::UnboundedSender<DeliveryReport>,
    ) -> Result<Self> {
        let mut options =
            MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
        options.set_keep_alive(Duration::from_secs(30));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(options, 100);

        Ok(Self {
            client,
            event_loop,
            topics,
            kind,
            handle,
            descriptor: serde_json::to_string(descriptor)?,
            notifications,
            reports,
            connected: false,
        })
    }

    /// Spawn the transport; it unregisters and disconnects once `shutdown` fires.
    pub fn start(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn run(mut self, shutdown: CancellationToken) {
        let (msg_tx, msg_rx) = mpsc::channel::<MqttMessage>(64);
        let worker = tokio::spawn(serve_requests(
            self.client.clone(),
            self.handle.clone(),
            self.kind,
            self.topics.response(),
            msg_rx,
        ));

        info!("[MQTT] Serving {} on {}", self.kind, self.topics.notify());

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                Some(notification) = self.notifications.recv() => {
                    self.publish_notification(notification);
                }
                event = self.event_loop.poll() => match event {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("[MQTT] Connected");
                        self.connected = true;
                        self.register();
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let Some(request) = self.topics.classify(&publish.topic) else {
                            continue;
                        };
                        let payload = match String::from_utf8(publish.payload.to_vec()) {
                            Ok(s) => s,
                            Err(e) => {
                                warn!("[MQTT] Invalid UTF-8 in payload: {}", e);
                                continue;
                            }
                        };
                        debug!("[MQTT] Received {} on {}: {}", self.kind, publish.topic, payload);
                        if msg_tx.send(MqttMessage { request, payload }).await.is_err() {
                            error!("[MQTT] Request worker stopped");
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        if self.connected {
                            error!("[MQTT] Connection error: {:?}", e);
                        }
                        self.connected = false;
                        if !reconnect_backoff(&shutdown).await {
                            break;
                        }
                    }
                }
            }
        }

        worker.abort();
        self.unregister().await;
    }

    /// Subscribe to the request topics and publish the retained descriptor.
    /// Runs on every (re)connect because the session is not persistent.
    fn register(&self) {
        for topic in [self.topics.get(), self.topics.set()] {
            if let Err(e) = self.client.try_subscribe(&topic, QoS::AtLeastOnce) {
                warn!("[MQTT] Failed to subscribe to {}: {:?}", topic, e);
            }
        }
        match self.client.try_publish(
            self.topics.link(),
            QoS::AtLeastOnce,
            true,
            self.descriptor.as_bytes(),
        ) {
            Ok(()) => info!("[MQTT] Registered {}", self.topics.notify()),
            Err(e) => warn!("[MQTT] Failed to register: {:?}", e),
        }
    }

    fn publish_notification(&mut self, notification: Notification) {
        let sequence = notification.sequence;
        let report = if !self.connected {
            debug!("[MQTT] Not connected, notification {} dropped", sequence);
            DeliveryReport::Failed {
                sequence,
                remaining_observers: 0,
            }
        } else {
            match serde_json::to_vec(&notification.properties) {
                Ok(body) => match self.client.try_publish(
                    self.topics.notify(),
                    QoS::AtMostOnce,
                    false,
                    body,
                ) {
                    Ok(()) => DeliveryReport::Delivered { sequence },
                    Err(e) => {
                        warn!("[MQTT] Failed to publish notification {}: {:?}", sequence, e);
                        DeliveryReport::Failed {
                            sequence,
                            remaining_observers: 0,
                        }
                    }
                },
                Err(e) => {
                    error!("[MQTT] Failed to encode notification {}: {}", sequence, e);
                    DeliveryReport::Failed {
                        sequence,
                        remaining_observers: 0,
                    }
                }
            }
        };

        if self.reports.send(report).is_err() {
            debug!("[MQTT] Resource task gone, report {} dropped", sequence);
        }
    }

    /// Clear the retained descriptor and disconnect.
    async fn unregister(mut self) {
        if !self.connected {
            return;
        }

        let cleared = self
            .client
            .try_publish(self.topics.link(), QoS::AtLeastOnce, true, Vec::new());
        if let Err(e) = cleared {
            warn!("[MQTT] Failed to unregister: {:?}", e);
            return;
        }

        let acked = tokio::time::timeout(UNREGISTER_TIMEOUT, async {
            loop {
                match self.event_loop.poll().await {
                    Ok(Event::Incoming(Packet::PubAck(_))) => break true,
                    Ok(_) => {}
                    Err(_) => break false,
                }
            }
        })
        .await;

        match acked {
            Ok(true) => info!("[MQTT] Unregistered {}", self.topics.notify()),
            _ => warn!("[MQTT] Unregister of {} not confirmed", self.topics.notify()),
        }

        if let Err(e) = self.client.try_disconnect() {
            debug!("[MQTT] Disconnect failed: {:?}", e);
        }
        let _ = tokio::time::timeout(UNREGISTER_TIMEOUT, self.event_loop.poll()).await;
    }
}

/// Wait before the next connection attempt. Returns `false` once shutdown
/// fires.
async fn reconnect_backoff(shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(RECONNECT_DELAY) => true,
    }
}

/// Answer requests strictly in arrival order.
async fn serve_requests(
    client: AsyncClient,
    handle: ResourceHandle,
    kind: ResourceKind,
    response_topic: String,
    mut requests: mpsc::Receiver<MqttMessage>,
) {
    while let Some(message) = requests.recv().await {
        let reply = answer(&handle, kind, message.request, &message.payload).await;
        debug!("[MQTT] Reply on {}: {}", response_topic, reply);
        if let Err(e) = client
            .publish(&response_topic, QoS::AtLeastOnce, false, reply.to_string())
            .await
        {
            warn!("[MQTT] Failed to publish reply: {:?}", e);
        }
    }
}
