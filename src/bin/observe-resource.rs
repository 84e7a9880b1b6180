//! Observe a resource served by a device daemon.
//!
//! Usage:
//!   cargo run --bin observe-resource -- /a/temperature --units F
//!   cargo run --bin observe-resource -- /a/led --set '{"value": true}'
//!
//! Registers as an observer, logs every notification and reply, and cancels
//! the observation on Ctrl+C.

use std::time::Duration;

use clap::Parser;
use log::{error, info, warn};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde_json::json;

use smarthome_devices::config::{self, Config};
use smarthome_devices::transport::ResourceTopics;

#[derive(Parser)]
#[command(name = "observe-resource")]
#[command(about = "Observe a smart home resource over MQTT")]
struct Cli {
    /// Resource path, e.g. /a/ledKitchen
    path: String,

    /// Temperature units for retrieve replies (C, F or K)
    #[arg(long)]
    units: Option<String>,

    /// Send this JSON update once connected
    #[arg(long)]
    set: Option<String>,
}

#[tokio::main]
async fn main() {
    config::load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let topics = ResourceTopics::new(&config.transport.topic_prefix, &cli.path);

    let mut options = MqttOptions::new(
        format!("{}-observer", config.mqtt.client_id),
        &config.mqtt.broker_host,
        config.mqtt.broker_port,
    );
    options.set_keep_alive(Duration::from_secs(30));
    if let (Some(username), Some(password)) = (&config.mqtt.username, &config.mqtt.password) {
        options.set_credentials(username, password);
    }
    let (client, mut event_loop) = AsyncClient::new(options, 100);

    info!(
        "Observing {} via {}:{}",
        topics.notify(),
        config.mqtt.broker_host,
        config.mqtt.broker_port
    );

    let cancel = cancel_payload();
    let mut reconnect = false;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Cancelling observation");
                if let Err(e) = client.publish(topics.get(), QoS::AtLeastOnce, false, cancel.clone()).await {
                    warn!("Failed to cancel observation: {:?}", e);
                }
                // Let the cancel go out
                let _ = tokio::time::timeout(Duration::from_millis(500), event_loop.poll()).await;
                break;
            }
            event = event_loop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    for topic in [topics.notify().to_string(), topics.response()] {
                        if let Err(e) = client.try_subscribe(topic, QoS::AtMostOnce) {
                            warn!("Failed to subscribe: {:?}", e);
                        }
                    }
                    for payload in observe_requests(cli.units.as_deref(), reconnect) {
                        if let Err(e) = client.try_publish(topics.get(), QoS::AtLeastOnce, false, payload) {
                            warn!("Failed to register as observer: {:?}", e);
                        }
                    }
                    // the update is sent once, not on every reconnect
                    if !reconnect
                        && let Some(update) = &cli.set
                        && let Err(e) = client.try_publish(topics.set(), QoS::AtLeastOnce, false, update.clone())
                    {
                        warn!("Failed to send update: {:?}", e);
                    }
                    reconnect = true;
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let payload = String::from_utf8_lossy(&publish.payload);
                    if publish.topic == topics.response() {
                        info!(">>> reply: {}", payload);
                    } else {
                        info!(">>> notification: {}", payload);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    error!("MQTT connection error: {:?}", e);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }
}

fn cancel_payload() -> String {
    json!({ "observe": false }).to_string()
}

/// Retrieve requests to send on connect. After a reconnect the earlier
/// registration may still be counted by the daemon, so it is cancelled first.
fn observe_requests(units: Option<&str>, reconnect: bool) -> Vec<String> {
    let observe = json!({ "observe": true, "units": units }).to_string();
    if reconnect {
        vec![cancel_payload(), observe]
    } else {
        vec![observe]
    }
}
