//! # palisade-provider: Policy cache with hot reload
//!
//! Serves the active policy for one storage location while bounding both
//! staleness and redundant I/O.
//!
//! ```text
//! get() ──► within min_check_interval? ──yes──► cached policy
//!                  │ no
//!                  ▼
//!            probe revision ──fail──► io_error (cache not served)
//!                  │
//!          unchanged? ──yes──► cached policy
//!                  │ no
//!                  ▼
//!         read + validate ──fail──► validation_error (previous cache kept)
//!                  │
//!                  ▼
//!         swap cache, return new policy
//! ```
//!
//! # Example
//!
//! ```no_run
//! use palisade_provider::{PolicyProvider, ProviderConfig};
//! use std::time::Duration;
//!
//! let provider = PolicyProvider::new(
//!     ProviderConfig::new("/etc/palisade/policy.json")
//!         .with_min_check_interval(Duration::from_secs(1)),
//! );
//! let policy = provider.get()?;
//! println!("serving {} v{}", policy.id(), policy.version());
//! # Ok::<(), palisade_provider::ProviderError>(())
//! ```

mod error;
mod provider;
mod store;

pub use error::{ProviderError, Result};
pub use provider::{DEFAULT_MIN_CHECK_INTERVAL, PolicyProvider, ProviderConfig};
pub use store::{FileStore, PolicyStore, Revision};
