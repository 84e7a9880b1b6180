//! End-to-end behaviour of a resource task driven through its handle.

use std::time::Duration;

use smarthome_devices::error::DaemonError;
use smarthome_devices::resource::{
    DeliveryReport, Notification, ObservableResource, PropertyValue, REQUEST_BUFFER,
    ResourceHandle, ResourceKind, ResourceServer, UpdateCommand, notify_channel,
};
use smarthome_devices::sensors::simulated_adapter;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

struct Harness {
    handle: ResourceHandle,
    notifications: UnboundedReceiver<Notification>,
    reports: UnboundedSender<DeliveryReport>,
    shutdown: CancellationToken,
    task: JoinHandle<ObservableResource>,
}

fn spawn(kind: ResourceKind) -> Harness {
    let (sink, notifications) = notify_channel();
    let (reports, reports_rx) = mpsc::unbounded_channel();
    let engine = ObservableResource::new(
        kind,
        kind.to_string(),
        simulated_adapter(kind),
        Box::new(sink),
    )
    .unwrap();
    let (server, handle) = ResourceServer::new(engine, reports_rx, REQUEST_BUFFER);
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(server.run(shutdown.clone()));
    Harness {
        handle,
        notifications,
        reports,
        shutdown,
        task,
    }
}

fn drain(rx: &mut UnboundedReceiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push(n);
    }
    out
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn observed_button_notifies_on_schedule() {
    let mut h = spawn(ResourceKind::Button);

    assert_ok!(h.handle.retrieve(Some(true)).await);
    sleep_ms(150).await;
    assert!(drain(&mut h.notifications).is_empty());

    // first notification 200 ms after observe
    sleep_ms(100).await;
    let first = drain(&mut h.notifications);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].sequence, 1);
    assert_eq!(first[0].properties.rt, "oic.r.button");

    // then once per second while the simulated button keeps changing
    sleep_ms(3000).await;
    let later = drain(&mut h.notifications);
    assert_eq!(later.len(), 3);
    assert_eq!(
        later.iter().map(|n| n.sequence).collect::<Vec<_>>(),
        vec![2, 3, 4]
    );
}

#[tokio::test(start_paused = true)]
async fn failed_delivery_with_no_observers_stops_the_loop() {
    let mut h = spawn(ResourceKind::Motion);

    assert_ok!(h.handle.retrieve(Some(true)).await);
    sleep_ms(250).await;
    assert_eq!(drain(&mut h.notifications).len(), 1);

    h.reports
        .send(DeliveryReport::Failed {
            sequence: 1,
            remaining_observers: 0,
        })
        .unwrap();
    sleep_ms(10_000).await;
    assert!(drain(&mut h.notifications).is_empty());

    // a new observer restarts it
    assert_ok!(h.handle.retrieve(Some(true)).await);
    sleep_ms(250).await;
    assert_eq!(drain(&mut h.notifications).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancelling_the_last_observer_stops_the_loop() {
    let mut h = spawn(ResourceKind::Gas);

    assert_ok!(h.handle.retrieve(Some(true)).await);
    assert_ok!(h.handle.retrieve(Some(true)).await);
    sleep_ms(2300).await;
    assert_eq!(drain(&mut h.notifications).len(), 2);

    assert_ok!(h.handle.retrieve(Some(false)).await);
    sleep_ms(2000).await;
    assert_eq!(drain(&mut h.notifications).len(), 1);

    assert_ok!(h.handle.retrieve(Some(false)).await);
    // extra cancels are clamped
    assert_ok!(h.handle.retrieve(Some(false)).await);
    sleep_ms(10_000).await;
    assert!(drain(&mut h.notifications).is_empty());
}

#[tokio::test(start_paused = true)]
async fn update_is_pushed_to_observers() {
    let mut h = spawn(ResourceKind::Led);

    assert_ok!(h.handle.retrieve(Some(true)).await);
    sleep_ms(250).await;
    let initial = drain(&mut h.notifications);
    assert_eq!(initial.len(), 1);
    assert_eq!(
        initial[0].properties.value,
        PropertyValue::Binary { value: false }
    );

    // the LED is now clean and polled every 2 s; an update pulls the push in
    sleep_ms(500).await;
    let reply = assert_ok!(h.handle.update(UpdateCommand::Switch(true)).await);
    assert_eq!(reply.value, PropertyValue::Binary { value: true });
    sleep_ms(250).await;
    let pushed = drain(&mut h.notifications);
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0].properties.value, PropertyValue::Binary { value: true });

    // nothing changes afterwards, so nothing more is pushed
    sleep_ms(6000).await;
    assert!(drain(&mut h.notifications).is_empty());
}

#[tokio::test(start_paused = true)]
async fn rejected_update_keeps_previous_value() {
    let h = spawn(ResourceKind::RgbLed);

    assert_ok!(
        h.handle
            .update(UpdateCommand::Colour([10.0, 20.0, 30.0]))
            .await
    );
    let err = assert_err!(
        h.handle
            .update(UpdateCommand::Colour([10.0, f64::NAN, 30.0]))
            .await
    );
    assert!(matches!(err, DaemonError::Validation(_)));

    let current = assert_ok!(h.handle.retrieve(None).await);
    assert_eq!(current.value, PropertyValue::colour([10, 20, 30]));
}

#[tokio::test(start_paused = true)]
async fn shutdown_drives_actuator_off() {
    let h = spawn(ResourceKind::Fan);

    assert_ok!(h.handle.update(UpdateCommand::Switch(true)).await);
    assert_ok!(h.handle.retrieve(Some(true)).await);

    h.shutdown.cancel();
    let engine = h.task.await.unwrap();
    assert_eq!(engine.properties().value, PropertyValue::Binary { value: false });
    assert!(engine.notify_timer().is_none());

    assert!(matches!(
        h.handle.retrieve(None).await,
        Err(DaemonError::ResourceClosed(_))
    ));
}
