//! Shared foundation for the mudlark Slack front-end.
//!
//! The DM service owns the game simulation; this workspace only shuttles
//! player input to it and fans game events back out to chat users. This
//! crate holds what every member needs:
//!
//! - **Configuration** (`config`) - layered TOML + env config with validation
//! - **Event envelopes** (`events`) - the notification wire format published
//!   by the DM service
//! - **Event bus** (`bus`) - the pub/sub collaborator contract plus an
//!   in-memory implementation for tests and local runs

pub mod bus;
pub mod config;
pub mod events;

pub use bus::{BusError, EventBus, InMemoryEventBus, NoopEventBus};
pub use events::{ClientType, NotificationMessage, Priority, Recipient, Role};
