//! Emergency ("SOS") episode state machine.
//!
//! ```text
//!            trigger()                 cancel()
//! Inactive ───────────▶ Active ───────────▶ Inactive
//!    ▲  │ cancel(): no-op   │ trigger(): no-op
//!    └──┘                   └──┘
//! ```
//!
//! The episode is a per-session singleton owned by `EmergencySessionManager`.
//! Transitions never fail: invalid ones are no-ops. Geolocation and notification
//! dispatch run in the background after `trigger()` has already returned.

mod alerts;
mod episode;
mod events;
mod manager;
mod notifier;

pub use alerts::{AlertFeed, AlertRecord, AlertStatus};
pub use episode::{EmergencyEpisode, Recipient};
pub use events::{EmergencyEvent, EpisodeObserver};
pub use manager::EmergencySessionManager;
pub use notifier::{
    AlertKind, DispatchError, EmergencyAlert, NotificationDispatcher, NullDispatcher,
    TracingDispatcher,
};
