//! Presence orchestration on top of the desktop IPC client.
//!
//! [`PresenceService`] owns the connection through a dedicated worker thread,
//! gates host ticks by the configured update interval, and only pushes an
//! activity when the sampled [`PresenceSnapshot`] changed. The
//! [`identity`] module maps server addresses and MOTDs to display names and
//! icon keys.

pub mod clock;
pub mod config;
pub mod error;
pub mod identity;
pub mod sampler;
pub mod service;
pub mod snapshot;

mod worker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    Config, ConfigStore, SharedConfig, DEFAULT_CONFIG_FILE, PLACEHOLDER_APPLICATION_ID,
};
pub use error::{ConfigError, Result};
pub use identity::{resolve_display_name, resolve_host, resolve_icon_key};
pub use sampler::{Dimension, HostState, ServerSession, StateSampler, Team, UnknownDimension};
pub use service::{PresenceOptions, PresenceService, WORKER_THREAD_NAME};
pub use snapshot::PresenceSnapshot;
