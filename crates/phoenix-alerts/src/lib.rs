//! Alert delivery for the Phoenix Vision pipeline.
//!
//! Camera workers never wait on the network: they hand an [`AlertJob`] to
//! an [`AlertOutbox`], and the [`AlertDispatcher`] task writes the snapshot,
//! notifies, and records the event in the background.

pub mod dispatcher;
pub mod error;
pub mod event_store;
pub mod notifier;

pub use dispatcher::{AlertDispatcher, AlertJob, AlertOutbox, ChannelOutbox};
pub use error::{AlertError, AlertResult};
pub use event_store::{EventStore, JsonlEventStore, MemoryEventStore};
pub use notifier::{LogNotifier, Notifier, TelegramNotifier};
