//! Secret handling for credentials supplied by the caller.

pub mod credentials;

pub use credentials::{AuthHeaders, SecretString};
