use super::constant::*;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json;
use std::collections::HashMap;
use std::fmt;

/// `FaultToleranceConfig` holds the tunable parameters of one application.
/// A config is immutable once handed to the `FaultToleranceConfigManager`,
/// changes are made by putting a new one.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FaultToleranceConfig {
    /// `time_window` is the measurement window, counted in regulator ticks (seconds by default).
    pub time_window: u64,
    /// `least_call_count` is the least amount of calls a whole service must receive
    /// in a window for its providers to be measured.
    pub least_call_count: u64,
    /// `least_window_count` is the least amount of calls a single provider must receive
    /// in a window for it to be measured. It is scaled down for degraded providers.
    pub least_window_count: u64,
    /// A provider is abnormal when its exception rate reaches
    /// `least_window_exception_rate_multiple` times the average rate of its service.
    pub least_window_exception_rate_multiple: f64,
    /// `regulation_effective` switches the statistics and measurement on.
    pub regulation_effective: bool,
    /// `weight_degrade_rate` is multiplied into the weight of a degraded provider.
    pub weight_degrade_rate: f64,
    /// Without `degrade_effective`, abnormal providers are only logged.
    pub degrade_effective: bool,
    /// `degrade_least_weight` is the floor of a degraded weight.
    pub degrade_least_weight: i32,
    /// `weight_recover_rate` is multiplied into the weight of a recovering provider.
    pub weight_recover_rate: f64,
    /// `degrade_max_ip_count` caps the amount of degraded providers per service.
    pub degrade_max_ip_count: usize,
}

impl Default for FaultToleranceConfig {
    fn default() -> Self {
        FaultToleranceConfig {
            time_window: DEFAULT_TIME_WINDOW,
            least_call_count: DEFAULT_LEAST_CALL_COUNT,
            least_window_count: DEFAULT_LEAST_WINDOW_COUNT,
            least_window_exception_rate_multiple: DEFAULT_LEAST_WINDOW_EXCEPTION_RATE_MULTIPLE,
            regulation_effective: false,
            weight_degrade_rate: DEFAULT_WEIGHT_DEGRADE_RATE,
            degrade_effective: false,
            degrade_least_weight: DEFAULT_DEGRADE_LEAST_WEIGHT,
            weight_recover_rate: DEFAULT_WEIGHT_RECOVER_RATE,
            degrade_max_ip_count: DEFAULT_DEGRADE_MAX_IP_COUNT,
        }
    }
}

impl FaultToleranceConfig {
    pub fn check(&self) -> Result<()> {
        if self.time_window == 0 {
            return Err(Error::msg("time_window must be greater than 0"));
        }
        if !(self.weight_degrade_rate > 0.0 && self.weight_degrade_rate <= 1.0) {
            return Err(Error::msg("weight_degrade_rate must be in (0, 1]"));
        }
        if !(self.weight_recover_rate > 1.0) {
            return Err(Error::msg("weight_recover_rate must be greater than 1"));
        }
        if !(self.least_window_exception_rate_multiple > 0.0) {
            return Err(Error::msg(
                "least_window_exception_rate_multiple must be greater than 0",
            ));
        }
        if self.degrade_least_weight < 0 {
            return Err(Error::msg("negative degrade_least_weight"));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AppConfig {
    // app_name represents the name of current running application.
    pub app_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            app_name: DEFAULT_APP_NAME.into(),
        }
    }
}

// RegulatorConfig represents the settings of the time window regulator,
// the strategies are resolved by their aliases once the regulator is initialized.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct RegulatorConfig {
    // measure_interval_ms is the interval between two ticks of the measurement scheduler.
    pub measure_interval_ms: u64,
    pub measure_strategy: String,
    pub regulation_strategy: String,
    pub degrade_strategy: String,
    pub recover_strategy: String,
}

impl Default for RegulatorConfig {
    fn default() -> Self {
        RegulatorConfig {
            measure_interval_ms: DEFAULT_MEASURE_INTERVAL_MS,
            measure_strategy: DEFAULT_MEASURE_STRATEGY.into(),
            regulation_strategy: DEFAULT_REGULATION_STRATEGY.into(),
            degrade_strategy: DEFAULT_DEGRADE_STRATEGY.into(),
            recover_strategy: DEFAULT_RECOVER_STRATEGY.into(),
        }
    }
}

// LogConfig represent the configuration of logging.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub config_file: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            config_file: LOG_CONFIG_FILE.into(),
        }
    }
}

// AftConfig represent the general configuration of the module.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct AftConfig {
    pub app: AppConfig,
    pub log: LogConfig,
    pub regulator: RegulatorConfig,
    // default_fault_tolerance is used by the applications without their own config.
    pub default_fault_tolerance: FaultToleranceConfig,
    // apps holds the initial fault tolerance configs, keyed by the application name.
    pub apps: HashMap<String, FaultToleranceConfig>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ConfigEntity {
    pub version: String,
    pub config: AftConfig,
}

impl Default for ConfigEntity {
    fn default() -> Self {
        ConfigEntity {
            version: AFT_VERSION.into(),
            config: AftConfig::default(),
        }
    }
}

impl ConfigEntity {
    pub fn new() -> Self {
        ConfigEntity::default()
    }

    pub fn check(&self) -> Result<()> {
        if self.version.is_empty() {
            return Err(Error::msg("empty version"));
        }
        if self.config.app.app_name.is_empty() {
            return Err(Error::msg("empty app name"));
        }
        let regulator = &self.config.regulator;
        if regulator.measure_interval_ms == 0 {
            return Err(Error::msg(
                "illegal regulator configuration: measure_interval_ms == 0",
            ));
        }
        if regulator.measure_strategy.is_empty()
            || regulator.regulation_strategy.is_empty()
            || regulator.degrade_strategy.is_empty()
            || regulator.recover_strategy.is_empty()
        {
            return Err(Error::msg(
                "illegal regulator configuration: empty strategy alias",
            ));
        }
        self.config.default_fault_tolerance.check()?;
        for (app_name, config) in &self.config.apps {
            if app_name.is_empty() {
                return Err(Error::msg("empty app name in fault tolerance configs"));
            }
            config
                .check()
                .map_err(|err| Error::msg(format!("app {}: {}", app_name, err)))?;
        }
        Ok(())
    }
}

impl fmt::Display for ConfigEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmtted = serde_json::to_string_pretty(self).map_err(|_| fmt::Error)?;
        write!(f, "{}", fmtted)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = FaultToleranceConfig::default();
        assert_eq!(10, config.time_window);
        assert_eq!(100, config.least_call_count);
        assert_eq!(10, config.least_window_count);
        assert!((config.least_window_exception_rate_multiple - 6.0).abs() < f64::EPSILON);
        assert!(!config.regulation_effective);
        assert!((config.weight_degrade_rate - 0.05).abs() < f64::EPSILON);
        assert!(!config.degrade_effective);
        assert_eq!(1, config.degrade_least_weight);
        assert!((config.weight_recover_rate - 2.0).abs() < f64::EPSILON);
        assert_eq!(2, config.degrade_max_ip_count);
        assert!(config.check().is_ok());
    }

    #[test]
    fn invalid_config() {
        let config = FaultToleranceConfig {
            time_window: 0,
            ..Default::default()
        };
        assert!(config.check().is_err());
        let config = FaultToleranceConfig {
            weight_degrade_rate: 1.5,
            ..Default::default()
        };
        assert!(config.check().is_err());
        let config = FaultToleranceConfig {
            weight_recover_rate: 1.0,
            ..Default::default()
        };
        assert!(config.check().is_err());
    }

    #[test]
    fn entity_from_yaml() {
        let yaml = r#"
version: v1
config:
  app:
    app_name: yaml-app
  regulator:
    measure_interval_ms: 200
  apps:
    order-app:
      time_window: 5
      regulation_effective: true
"#;
        let entity: ConfigEntity = serde_yaml::from_str(yaml).unwrap();
        assert!(entity.check().is_ok());
        assert_eq!("yaml-app", entity.config.app.app_name);
        assert_eq!(200, entity.config.regulator.measure_interval_ms);
        assert_eq!(DEFAULT_MEASURE_STRATEGY, entity.config.regulator.measure_strategy);
        let order = &entity.config.apps["order-app"];
        assert_eq!(5, order.time_window);
        assert!(order.regulation_effective);
        assert_eq!(DEFAULT_LEAST_WINDOW_COUNT, order.least_window_count);
    }

    #[test]
    fn invalid_entity() {
        let mut entity = ConfigEntity::new();
        entity.config.regulator.degrade_strategy = String::new();
        assert!(entity.check().is_err());
        let mut entity = ConfigEntity::new();
        entity.config.apps.insert(
            "bad-app".into(),
            FaultToleranceConfig {
                time_window: 0,
                ..Default::default()
            },
        );
        assert!(entity.check().is_err());
    }
}
