//! Observable resources: state, change tracking and the notify loop.

pub mod engine;
pub mod kind;
pub mod notifier;
pub mod properties;
pub mod server;
pub mod state;
pub mod validation;

pub use engine::ObservableResource;
pub use kind::{INITIAL_NOTIFY_DELAY, PinKind, ResourceKind};
pub use notifier::{ChannelNotifier, DeliveryReport, Notification, NotifySink, notify_channel};
pub use properties::{Properties, PropertyValue, Units};
pub use server::{REQUEST_BUFFER, ResourceHandle, ResourceRequest, ResourceServer};
pub use state::{NotifyTimer, ResourceState};
pub use validation::{Command, UpdateCommand, validate};
