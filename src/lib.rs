#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(docsrs, allow(unused_attributes))]

//! # Adaptive Fault Tolerance
//!
//! AFT is a client-side feedback-control loop for RPC consumers. It keeps invocation
//! statistics for every (application, service, provider) dimension, periodically
//! measures each provider against its peers of the same service, and regulates the
//! load-balancing weight of providers which behave abnormally:
//! abnormal providers are **degraded**, and they are gradually **recovered** once
//! they are measured healthy again.
//!
//! Generally, there are several steps when using AFT:
//! 1. Build and install a `FaultToleranceModule`.
//! 2. Push the fault tolerance configuration of your applications.
//! 3. Report the outcome of each invocation to the module's `FaultToleranceSubscriber`.
//! 4. Let your load balancer consult `ProviderInfo::weight()` when selecting a target.
//!
//! ## Add Dependency
//!
//! ```toml
//! [dependencies]
//! aft-core = { version = "0.1.0" }
//! ```
//!
//! Optional features lists:
//! - logger_env: Use `env_logger` to initialize logging.
//! - logger_log4rs: Use `log4rs` to initialize logging.
//!
//! ## General Configurations and Initialization
//!
//! The `api` module provides following interfaces:
//!
//! - `init_default()`: Load configurations from environment variable. For undefined configurations, use default values.
//! - `init_with_config_file(config_path: &mut String)`: Load configurations from a YAML file.
//! - `init_with_config(config_entity: ConfigEntity)`: Use hand-crafted `ConfigEntity` to initialize the module.
//!
//! Example:
//!
//! ```rust
//! use aft_core::{base::*, config::FaultToleranceConfig, init_default, logging};
//! use std::sync::Arc;
//!
//! let module = init_default().unwrap();
//! module.config_manager().put_app_config(
//!     "my-app",
//!     Some(FaultToleranceConfig {
//!         regulation_effective: true,
//!         degrade_effective: true,
//!         ..Default::default()
//!     }),
//! ).unwrap_or_else(|err| logging::error!("{:?}", err));
//!
//! let consumer = Arc::new(ConsumerConfig::new("my-app", "com.example.EchoService"));
//! let provider = Arc::new(ProviderInfo::new("10.0.0.1", 12200, 100));
//! // after each invocation
//! module.subscriber().on_response(&consumer, &provider, None);
//! // on shutdown
//! module.uninstall();
//! ```

/// AFT API
pub mod api;
/// Core implementations of AFT, including the invocation statistics,
/// the measure and regulation strategies, the time window regulator,
/// and the configuration management.
pub mod core;
/// Adapters for different logging crates.
pub mod logging;
// Utility functions for AFT.
pub mod utils;

// re-export precludes
pub use crate::core::*;
pub use api::*;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
