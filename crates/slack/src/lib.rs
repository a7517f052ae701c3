//! Slack delivery pipeline for mudlark game notifications.
//!
//! The DM service publishes [`mudlark_core::NotificationMessage`] envelopes
//! on the event bus; this crate fans each one out to the Slack users it
//! addresses. One delivery is: resolve the workspace's bot token, fetch a
//! pooled Web API client for it, open (or reuse) the player's DM channel,
//! shape the payload to Slack's structural limits, post.
//!
//! # Key Types
//!
//! - `NotificationService` - owns the subscribe/dispatch lifecycle and the
//!   per-recipient failure isolation policy
//! - `CredentialResolver` - `(team, user)` → bot token, with a static
//!   fallback for single-tenant and local deployments
//! - `ClientPool` - one Web API client per distinct token
//! - `payload::shape` - total, idempotent payload truncation
//! - `GuildCrierFormatter` - pluggable per-event content override
//!
//! Per-recipient failures never escape the pipeline: every layer downgrades
//! its own errors to a log entry plus a skip, so one broken workspace never
//! starves the rest of a fan-out.

pub mod api;
pub mod credentials;
pub mod crier;
pub mod notify;
pub mod payload;
pub mod pool;

pub use api::{ChatApi, ChatApiError, ClientFactory, SlackWebApi, WebApiFactory};
pub use credentials::{CredentialResolver, CredentialResult, Installation, InstallationStore};
pub use crier::{FormattedContent, GuildCrierFormatter, RecipientFormatter};
pub use notify::{NotificationService, NotifyError};
pub use pool::ClientPool;
