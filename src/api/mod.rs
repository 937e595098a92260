//! mod `api` provides the topmost APIs for the users of AFT.
//! AFT lives in a `FaultToleranceModule`, which can be built in three ways:
//!
//!  1. `init_default()`, using the system environment and the default config.
//!  2. `init_with_config(config_entity: ConfigEntity)`, using a customized `ConfigEntity`.
//!  3. `init_with_config_file(config_path: &mut String)`, using a YAML file.
//!
//! The returned module is installed. To plug in custom strategies, build the module with
//! `FaultToleranceModule::new()`, register the generators on its `registry()`, then `install()` it.

mod init;
mod module;

pub use init::*;
pub use module::*;
