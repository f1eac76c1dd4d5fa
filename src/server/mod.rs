mod alert_dispatcher;
mod server;

pub use alert_dispatcher::*;
pub use server::*;
