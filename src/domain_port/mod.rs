mod notifier;
mod revocation_store;

pub use notifier::*;
pub use revocation_store::*;
