//! Raksha personal-safety core.
//!
//! - `contacts`: trusted contacts and the emergency subset
//! - `emergency`: the SOS episode state machine and its observers
//! - `gesture`: press-and-hold confirmation driving the episode
//! - `geolocation`: single-shot position lookups with a timeout
//! - `session`: per-user context wiring the above together
//!
//! Hosts attach through `runtime::RakshaRuntime`; the `cli` feature provides a
//! headless terminal host.

#[cfg(feature = "cli")]
pub mod cli;
pub mod contacts;
pub mod emergency;
pub mod error;
pub mod geolocation;
pub mod gesture;
pub mod runtime;
pub mod session;
pub mod settings;

pub use error::{RakshaError, Result};
pub use session::{SessionBuilder, SessionContext, SessionUser};
