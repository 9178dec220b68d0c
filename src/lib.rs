//! TokenTally Rust SDK.
//!
//! This crate provides a client library for reporting AI API token usage to
//! the TokenTally cost-accounting service.
//!
//! # Example
//!
//! ```no_run
//! use tokentally::{TokenTallyClient, UsageEvent};
//!
//! # fn example() -> tokentally::Result<()> {
//! let client = TokenTallyClient::new("tt_your_api_key")?;
//!
//! // Report usage directly
//! let result = client.track(
//!     &UsageEvent::new(100, 200, "claude-3-5-sonnet").with_provider("anthropic"),
//! )?;
//! println!("cost: ${}", result.cost_usd);
//!
//! // Or let a session measure the call duration
//! let mut session = client.track_usage("claude-3-5-sonnet");
//! // ... call the model ...
//! session.set_usage(100, 200)?;
//! let result = session.finish()?;
//! println!("cost: ${}", result.cost_usd);
//! # Ok(())
//! # }
//! ```
//!
//! The service is authoritative for pricing; the SDK performs no local cost
//! computation, no queuing, and no automatic retries.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod session;
mod types;

pub use client::{ClientOptions, TokenTallyClient, DEFAULT_BASE_URL};
pub use error::{Result, TokenTallyError};
pub use session::TrackingSession;
pub use types::{Metadata, MetadataValue, TrackResult, UsageEvent};
