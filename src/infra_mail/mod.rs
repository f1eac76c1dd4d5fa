mod notifier_log;
mod notifier_smtp;

pub use notifier_log::*;
pub use notifier_smtp::*;
