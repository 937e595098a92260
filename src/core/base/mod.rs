//! Minimal models of the collaborators owned by the registry and client modules:
//! the providers a consumer routes calls to, and the consumer configuration.
//! The fault tolerance module is a permitted mutator of provider weight and status,
//! but never the owner of a provider.

mod consumer_config;
mod provider_info;
mod weight_manager;

pub use consumer_config::*;
pub use provider_info::*;
pub use weight_manager::*;
