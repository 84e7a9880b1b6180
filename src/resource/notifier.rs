//! Notification hand-off between the engine and the transport.
//!
//! The engine never waits on delivery. It hands a [`Notification`] to a
//! [`NotifySink`] and carries on; the transport later reports the outcome as a
//! [`DeliveryReport`] on a separate channel.

use tokio::sync::mpsc;

use super::properties::Properties;
use crate::error::DeliveryFailure;

/// One outgoing change notification.
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    /// Monotonic per resource; lets the transport and logs correlate reports.
    pub sequence: u64,
    pub properties: Properties,
}

/// Outcome of a notification, reported back by the transport.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeliveryReport {
    Delivered { sequence: u64 },
    /// Delivery failed; `remaining_observers` is how many observers the
    /// transport can still reach.
    Failed {
        sequence: u64,
        remaining_observers: u32,
    },
}

/// Non-blocking outbound side of the transport.
pub trait NotifySink: Send {
    /// Hand the notification over for delivery. Success only means the
    /// transport accepted it; the delivery outcome arrives as a report.
    fn hand_off(&mut self, notification: Notification) -> Result<(), DeliveryFailure>;
}

/// [`NotifySink`] backed by an unbounded channel.
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Notification>,
}

impl NotifySink for ChannelNotifier {
    fn hand_off(&mut self, notification: Notification) -> Result<(), DeliveryFailure> {
        self.sender
            .send(notification)
            .map_err(|_| DeliveryFailure::ChannelClosed)
    }
}

/// Create a channel notifier and the receiver the transport drains.
pub fn notify_channel() -> (ChannelNotifier, mpsc::UnboundedReceiver<Notification>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (ChannelNotifier { sender }, receiver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::PropertyValue;

    fn notification(sequence: u64) -> Notification {
        Notification {
            sequence,
            properties: Properties {
                rt: "oic.r.led",
                id: "led".into(),
                value: PropertyValue::Binary { value: true },
            },
        }
    }

    #[test]
    fn test_hand_off_preserves_order() {
        let (mut sink, mut rx) = notify_channel();
        sink.hand_off(notification(1)).unwrap();
        sink.hand_off(notification(2)).unwrap();
        assert_eq!(rx.try_recv().unwrap().sequence, 1);
        assert_eq!(rx.try_recv().unwrap().sequence, 2);
    }

    #[test]
    fn test_hand_off_fails_when_transport_gone() {
        let (mut sink, rx) = notify_channel();
        drop(rx);
        assert_eq!(
            sink.hand_off(notification(1)),
            Err(DeliveryFailure::ChannelClosed)
        );
    }
}
