//! Observable resource engine.
//!
//! Owns the [`ResourceState`] of one resource together with its sensor adapter
//! and notification sink, and implements retrieve, update and the notify
//! loop. The engine is synchronous; [`super::server::ResourceServer`] drives
//! it from a single task and sleeps until [`ObservableResource::next_deadline`].
//!
//! Notify loop rules:
//! - the loop runs while `observer_count > 0` and is driven by a single timer,
//! - the first notification after an observe or update fires after
//!   [`INITIAL_NOTIFY_DELAY`], later ones after the kind's poll interval,
//! - a tick only hands off a notification when the state is dirty.

use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::Instant;

use super::kind::{INITIAL_NOTIFY_DELAY, ResourceKind};
use super::notifier::{DeliveryReport, Notification, NotifySink};
use super::properties::{Properties, Units};
use super::state::{NotifyTimer, ResourceState};
use super::validation::{Command, UpdateCommand, validate};
use crate::error::{DaemonError, HardwareError};
use crate::sensors::SensorAdapter;

pub struct ObservableResource {
    kind: ResourceKind,
    poll_interval: Duration,
    state: ResourceState,
    adapter: Box<dyn SensorAdapter>,
    sink: Box<dyn NotifySink>,
    next_sequence: u64,
}

impl ObservableResource {
    /// Create the engine with an initial sample from `adapter`.
    pub fn new(
        kind: ResourceKind,
        identifier: impl Into<String>,
        mut adapter: Box<dyn SensorAdapter>,
        sink: Box<dyn NotifySink>,
    ) -> Result<Self, HardwareError> {
        let initial = adapter.read()?;
        let state = ResourceState::new(kind, identifier, initial);
        info!(
            "[Engine] {} ready ({}{})",
            state.identifier(),
            state.resource_type(),
            if adapter.is_simulated() { ", simulated" } else { "" }
        );
        Ok(Self {
            kind,
            poll_interval: kind.poll_interval(),
            state,
            adapter,
            sink,
            next_sequence: 1,
        })
    }

    /// Override the steady-state poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn identifier(&self) -> &str {
        self.state.identifier()
    }

    pub fn properties(&self) -> Properties {
        self.state.properties()
    }

    pub fn observer_count(&self) -> u32 {
        self.state.observer_count()
    }

    pub fn is_dirty(&self) -> bool {
        self.state.is_dirty()
    }

    pub fn notify_timer(&self) -> Option<&NotifyTimer> {
        self.state.notify_timer()
    }

    /// When the pending notification is due, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.state.notify_timer().map(NotifyTimer::deadline)
    }

    pub fn is_simulated(&self) -> bool {
        self.adapter.is_simulated()
    }

    /// Take a fresh sample. A failing adapter keeps the last snapshot.
    fn sample(&mut self) {
        match self.adapter.read() {
            Ok(value) => {
                let reportable = self.adapter.should_report(&value);
                if self.state.record(value, reportable) {
                    debug!(
                        "[Engine] {} changed (reportable: {})",
                        self.state.identifier(),
                        reportable
                    );
                }
            }
            Err(e) => warn!(
                "[Engine] {}: sampling failed, keeping last value: {}",
                self.state.identifier(),
                e
            ),
        }
    }

    /// Serve a retrieve, optionally registering or cancelling an observer.
    pub fn handle_retrieve(&mut self, wants_observe: Option<bool>) -> Properties {
        self.sample();

        match wants_observe {
            Some(true) => {
                let count = self.state.add_observer();
                self.state.mark_dirty();
                info!("[Engine] {}: observer added ({})", self.state.identifier(), count);
                if self.state.notify_timer().is_none() {
                    self.state.arm_notify(INITIAL_NOTIFY_DELAY);
                }
            }
            Some(false) => {
                let count = self.state.remove_observer();
                info!("[Engine] {}: observer removed ({})", self.state.identifier(), count);
                if count == 0 && self.state.cancel_notify().is_some() {
                    debug!("[Engine] {}: notify loop stopped", self.state.identifier());
                }
            }
            None => {}
        }

        self.state.properties()
    }

    /// Retrieve with the temperature expressed in `units`. Other kinds ignore
    /// the units.
    pub fn handle_retrieve_in(&mut self, wants_observe: Option<bool>, units: Units) -> Properties {
        let properties = self.handle_retrieve(wants_observe);
        if self.kind == ResourceKind::Temperature {
            properties.in_units(units)
        } else {
            properties
        }
    }

    /// Validate and apply an update.
    ///
    /// A rejected update, or one the pin fails to apply, leaves the state
    /// untouched and is reported to the requester.
    pub fn handle_update(&mut self, input: UpdateCommand) -> Result<Properties, DaemonError> {
        let reply_units = match input {
            UpdateCommand::Setpoint { units, .. } => Some(units),
            _ => None,
        };
        let command = validate(self.kind, input)?;

        if let Err(e) = self.adapter.write(command) {
            warn!(
                "[Engine] {}: failed to apply {:?}: {}",
                self.state.identifier(),
                command,
                e
            );
            return Err(e.into());
        }

        match self.adapter.read() {
            Ok(value) => {
                if self.state.record(value, true) {
                    debug!("[Engine] {}: update applied", self.state.identifier());
                }
            }
            Err(e) => warn!(
                "[Engine] {}: failed to read back update: {}",
                self.state.identifier(),
                e
            ),
        }

        if let Command::Setpoint { celsius } = command {
            info!("[Engine] {}: setpoint {} C", self.state.identifier(), celsius);
        }

        if self.state.observer_count() > 0 {
            self.state.arm_notify(INITIAL_NOTIFY_DELAY);
        }

        let properties = self.state.properties();
        Ok(match reply_units {
            Some(units) => properties.in_units(units),
            None => properties,
        })
    }

    /// Timer expiry: re-sample, push the snapshot if dirty and re-arm while
    /// observed.
    pub fn notify_tick(&mut self) {
        self.state.cancel_notify();
        self.sample();

        if self.state.is_dirty() {
            let notification = Notification {
                sequence: self.next_sequence,
                properties: self.state.properties(),
            };
            self.next_sequence += 1;

            match self.sink.hand_off(notification) {
                Ok(()) => {
                    debug!(
                        "[Engine] {}: notification {} handed off",
                        self.state.identifier(),
                        self.next_sequence - 1
                    );
                    self.state.clear_dirty();
                }
                Err(e) => {
                    warn!(
                        "[Engine] {}: failed to hand off notification: {}",
                        self.state.identifier(),
                        e
                    );
                    self.on_notify_failure(0);
                    return;
                }
            }
        }

        if self.state.observer_count() > 0 {
            self.state.arm_notify(self.poll_interval);
        }
    }

    /// A notification failed; `remaining_observers` is how many the transport
    /// can still reach.
    pub fn on_notify_failure(&mut self, remaining_observers: u32) {
        if remaining_observers == 0 {
            info!(
                "[Engine] {}: no observers left, stopping notifications",
                self.state.identifier()
            );
            self.state.reset_observers();
            self.state.cancel_notify();
        } else {
            warn!(
                "[Engine] {}: notification failed, {} observer(s) still reachable",
                self.state.identifier(),
                remaining_observers
            );
        }
    }

    pub fn on_delivery_report(&mut self, report: DeliveryReport) {
        match report {
            DeliveryReport::Delivered { sequence } => {
                debug!(
                    "[Engine] {}: notification {} delivered",
                    self.state.identifier(),
                    sequence
                );
            }
            DeliveryReport::Failed {
                sequence,
                remaining_observers,
            } => {
                warn!(
                    "[Engine] {}: notification {} failed",
                    self.state.identifier(),
                    sequence
                );
                self.on_notify_failure(remaining_observers);
            }
        }
    }

    /// Stop notifying and drive the hardware to its safe state.
    pub fn shutdown(&mut self) -> Result<(), HardwareError> {
        self.state.cancel_notify();
        self.adapter.safe_state()?;
        if self.kind.is_actuator() {
            let value = self.adapter.read()?;
            self.state.record(value, false);
        }
        Ok(())
    }
}
