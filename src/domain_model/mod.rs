mod alert;
mod record;
mod subject;
mod token;

pub use alert::*;
pub use record::*;
pub use subject::*;
pub use token::*;
