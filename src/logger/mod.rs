//! Logging bootstrap plus the `tracing` macros the rest of the crate uses.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
