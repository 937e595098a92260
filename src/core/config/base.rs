use super::{constant::*, ConfigEntity};
use crate::{logging, utils, Error, Result};
use serde_yaml;
use std::env;
use std::fs::File;
use std::io::prelude::*;
use std::path::Path;

// load_config_with_yaml loads the general configuration from the YAML file under provided path,
// then overrides it with the system environment.
pub fn load_config_with_yaml(config_path: &mut String) -> Result<ConfigEntity> {
    // Priority: system environment > YAML file > default config
    if utils::is_blank(config_path) {
        // If the config file path is absent, try to resolve it from the system env.
        *config_path = env::var(CONF_FILE_PATH_ENV_KEY).unwrap_or_else(|_| CONFIG_FILENAME.into());
    }
    let mut entity = load_config_from_yaml_file(config_path)?;
    override_items_from_system_env(&mut entity)?;
    Ok(entity)
}

fn load_config_from_yaml_file(path_str: &str) -> Result<ConfigEntity> {
    if path_str == CONFIG_FILENAME {
        return Ok(ConfigEntity::new());
    }
    let path = Path::new(path_str);
    if !path.exists() {
        return Err(Error::msg("AFT YAML configuration file does not exist!"));
    }
    let mut file = File::open(path)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    let entity: ConfigEntity = serde_yaml::from_str(&content)?;
    entity.check()?;
    logging::info!(
        "[Config] Resolving fault tolerance config from file, file {}",
        path_str
    );
    Ok(entity)
}

pub fn override_items_from_system_env(entity: &mut ConfigEntity) -> Result<()> {
    if let Ok(app_name) = env::var(APP_NAME_ENV_KEY) {
        if !utils::is_blank(&app_name) {
            entity.config.app.app_name = app_name;
        }
    }
    if let Ok(interval) = env::var(MEASURE_INTERVAL_ENV_KEY) {
        match interval.trim().parse::<u64>() {
            Ok(interval) => entity.config.regulator.measure_interval_ms = interval,
            Err(err) => logging::warn!(
                "[Config] Ignoring illegal {}: {}, reason: {:?}",
                MEASURE_INTERVAL_ENV_KEY,
                interval,
                err
            ),
        }
    }
    entity.check()
}

pub fn init_log(entity: &ConfigEntity) {
    logging::logger_init(Some(entity.config.log.config_file.clone()));
    logging::info!(
        "[Config] App name resolved, appName {}",
        entity.config.app.app_name
    );
    logging::info!(
        "[Config] Print effective global config, globalConfig {}",
        entity
    );
}
