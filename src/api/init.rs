//! Initialization resolves the configuration, from a hand-crafted entity, a YAML file or
//! the system environment, initializes the logger, and installs a new `FaultToleranceModule`.

use super::FaultToleranceModule;
use crate::{config, config::ConfigEntity, Result};

/// `init_default` initializes AFT using the configuration from the system
/// environment and the default values.
#[inline]
pub fn init_default() -> Result<FaultToleranceModule> {
    init_aft(&mut String::new())
}

/// `init_with_config` initializes AFT using the given config.
#[inline]
pub fn init_with_config(mut config_entity: ConfigEntity) -> Result<FaultToleranceModule> {
    config_entity.check()?;
    config::override_items_from_system_env(&mut config_entity)?;
    config::init_log(&config_entity);
    install_module(config_entity)
}

/// `init_with_config_file` loads the configuration from the given YAML file
/// and initializes AFT.
#[inline]
pub fn init_with_config_file(config_path: &mut String) -> Result<FaultToleranceModule> {
    init_aft(config_path)
}

#[inline]
fn init_aft(config_path: &mut String) -> Result<FaultToleranceModule> {
    let config_entity = config::load_config_with_yaml(config_path)?;
    config::init_log(&config_entity);
    install_module(config_entity)
}

fn install_module(config_entity: ConfigEntity) -> Result<FaultToleranceModule> {
    let module = FaultToleranceModule::new(config_entity)?;
    module.install()?;
    Ok(module)
}
