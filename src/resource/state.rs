//! Per-resource state owned by the observable resource engine.

use std::time::Duration;

use log::warn;
use tokio::time::Instant;

use super::kind::ResourceKind;
use super::properties::{Properties, PropertyValue};

/// The single pending notification of a resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NotifyTimer {
    deadline: Instant,
    delay: Duration,
}

impl NotifyTimer {
    fn after(delay: Duration) -> Self {
        Self {
            deadline: Instant::now() + delay,
            delay,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Delay the timer was armed with.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// Last published snapshot, dirty flag, observers and the notify timer.
///
/// Invariants:
/// - the observer count never underflows (decrements at zero are clamped),
/// - at most one [`NotifyTimer`] exists,
/// - `dirty` is only cleared by [`ResourceState::clear_dirty`], which the
///   engine calls after handing a notification to the transport.
#[derive(Debug)]
pub struct ResourceState {
    resource_type: &'static str,
    identifier: String,
    value: PropertyValue,
    dirty: bool,
    observer_count: u32,
    notify_timer: Option<NotifyTimer>,
}

impl ResourceState {
    pub fn new(kind: ResourceKind, identifier: impl Into<String>, initial: PropertyValue) -> Self {
        Self {
            resource_type: kind.resource_type(),
            identifier: identifier.into(),
            value: initial,
            dirty: false,
            observer_count: 0,
            notify_timer: None,
        }
    }

    pub fn resource_type(&self) -> &'static str {
        self.resource_type
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    pub fn properties(&self) -> Properties {
        Properties {
            rt: self.resource_type,
            id: self.identifier.clone(),
            value: self.value.clone(),
        }
    }

    /// Store a fresh sample. Marks the state dirty when the value changed and
    /// the sample is reportable. Returns whether the value changed.
    pub fn record(&mut self, value: PropertyValue, reportable: bool) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        if reportable {
            self.dirty = true;
        }
        true
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn observer_count(&self) -> u32 {
        self.observer_count
    }

    /// Returns the new observer count.
    pub fn add_observer(&mut self) -> u32 {
        self.observer_count += 1;
        self.observer_count
    }

    /// Returns the new observer count, clamped at zero.
    pub fn remove_observer(&mut self) -> u32 {
        if self.observer_count == 0 {
            warn!(
                "[State] {}: observe cancel with no observers registered",
                self.identifier
            );
        } else {
            self.observer_count -= 1;
        }
        self.observer_count
    }

    pub fn reset_observers(&mut self) {
        self.observer_count = 0;
    }

    pub fn notify_timer(&self) -> Option<&NotifyTimer> {
        self.notify_timer.as_ref()
    }

    /// Arm the notify timer `delay` from now.
    ///
    /// An already pending timer that fires sooner is kept, so there is never
    /// more than one. Returns whether the timer changed.
    pub fn arm_notify(&mut self, delay: Duration) -> bool {
        let timer = NotifyTimer::after(delay);
        match self.notify_timer {
            Some(pending) if pending.deadline <= timer.deadline => false,
            _ => {
                self.notify_timer = Some(timer);
                true
            }
        }
    }

    /// Drop the pending timer, returning it if there was one.
    pub fn cancel_notify(&mut self) -> Option<NotifyTimer> {
        self.notify_timer.take()
    }
}
