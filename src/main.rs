use std::time::Duration;

use clap::Parser;
use log::{error, info, warn};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use smarthome_devices::config::{self, Cli, Config, ResourceSettings};
use smarthome_devices::device_info::ResourceDescriptor;
use smarthome_devices::error::Result;
use smarthome_devices::instance_lock::InstanceLock;
use smarthome_devices::provisioning;
use smarthome_devices::resource::{
    ObservableResource, REQUEST_BUFFER, ResourceServer, notify_channel,
};
use smarthome_devices::sensors::open_adapter;
use smarthome_devices::transport::{MqttTransport, ResourceTopics};

/// Time given to the transport to flush the unregister before exiting.
const EXIT_GRACE: Duration = Duration::from_secs(1);

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    // Before the runtime spawns any threads
    config::load_dotenv();
    init_logger();

    let settings = ResourceSettings::from(Cli::parse());
    let config = Config::from_env().for_resource(&settings);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(settings, config)) {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(settings: ResourceSettings, config: Config) -> Result<()> {
    let kind = settings.kind;
    let path = settings.resource_path();
    info!("Starting Smart Home {} on {}", kind.display_name(), path);

    let _lock = InstanceLock::acquire(&path)?;

    if settings.secure {
        info!("Running in secure mode");
        provisioning::provision(&config.provisioning.dir, &settings)?;
    }

    let adapter = open_adapter(kind, settings.pin, settings.simulation);
    let simulated = adapter.is_simulated();
    if !simulated {
        info!("  Pin: {}", settings.pin_label());
    }

    let (sink, notifications) = notify_channel();
    let (reports_tx, reports_rx) = mpsc::unbounded_channel();
    let engine = ObservableResource::new(kind, settings.identifier(), adapter, Box::new(sink))?;
    let (server, handle) = ResourceServer::new(engine, reports_rx, REQUEST_BUFFER);

    let resource_token = CancellationToken::new();
    let resource_task = tokio::spawn(server.run(resource_token.clone()));

    let topics = ResourceTopics::new(&config.transport.topic_prefix, &path);
    info!(
        "Connecting to MQTT broker at {}:{}",
        config.mqtt.broker_host, config.mqtt.broker_port
    );
    let transport = MqttTransport::new(
        &config.mqtt,
        kind,
        topics,
        handle,
        &ResourceDescriptor::new(&settings, simulated),
        notifications,
        reports_tx,
    )?;
    let transport_token = CancellationToken::new();
    let transport_task = transport.start(transport_token.clone());

    info!("{} is running, press Ctrl+C to exit", path);
    wait_for_shutdown().await;

    // Stop the resource first so actuators are safe before we unregister
    resource_token.cancel();
    if let Err(e) = resource_task.await {
        warn!("Resource task ended abnormally: {}", e);
    }

    transport_token.cancel();
    if let Err(e) = transport_task.await {
        warn!("Transport task ended abnormally: {}", e);
    }

    tokio::time::sleep(EXIT_GRACE).await;
    info!("{} stopped", path);
    Ok(())
}

async fn wait_for_shutdown() {
    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => Some(stream),
        Err(e) => {
            warn!("Failed to listen for SIGTERM: {}", e);
            None
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("Received SIGINT"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        },
        _ = async {
            match terminate.as_mut() {
                Some(stream) => {
                    stream.recv().await;
                }
                None => std::future::pending::<()>().await,
            }
        } => info!("Received SIGTERM"),
    }
}
