//! Authorization collaborator for oaikit.
//!
//! [`Authorization`] is the read-only view a dispatch call needs: headers,
//! proxies, proxy credentials and a timeout. [`Authorizer`] is the shipped
//! implementation, built once and shared by reference.

pub mod authorization;
mod authorizer;
pub mod error;

pub use authorization::{AuthSnapshot, Authorization, Proxies, ProxyAuth};
pub use authorizer::{Authorizer, DEFAULT_MAX_TIMEOUT};
pub use error::Error;
