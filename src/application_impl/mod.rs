mod secret_hasher_argon2;
mod token_service_fake;
mod token_service_impl;
mod token_signer_jwt;

pub use secret_hasher_argon2::*;
pub use token_service_fake::*;
pub use token_service_impl::*;
pub use token_signer_jwt::*;
