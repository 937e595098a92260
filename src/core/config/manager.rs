use super::FaultToleranceConfig;
use crate::{logging, utils, Result};
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, RwLock,
};

/// `FaultToleranceConfigManager` holds one `FaultToleranceConfig` per application.
/// Applications without their own config share the default one, so that a lookup never fails.
#[derive(Debug)]
pub struct FaultToleranceConfigManager {
    default_config: Arc<FaultToleranceConfig>,
    app_configs: RwLock<HashMap<String, Arc<FaultToleranceConfig>>>,
    /// `aft_enable` is true iff any held config has `regulation_effective` set,
    /// it is recomputed on each mutation.
    aft_enable: AtomicBool,
}

impl Default for FaultToleranceConfigManager {
    fn default() -> Self {
        FaultToleranceConfigManager::new(FaultToleranceConfig::default())
    }
}

impl FaultToleranceConfigManager {
    pub fn new(default_config: FaultToleranceConfig) -> Self {
        let aft_enable = default_config.regulation_effective;
        FaultToleranceConfigManager {
            default_config: Arc::new(default_config),
            app_configs: RwLock::new(HashMap::new()),
            aft_enable: AtomicBool::new(aft_enable),
        }
    }

    /// `put_app_config` replaces the config of `app_name`, or removes it when `config` is `None`,
    /// so that the application falls back to the default config.
    /// An invalid config is rejected and the previous one is kept.
    pub fn put_app_config(&self, app_name: &str, config: Option<FaultToleranceConfig>) -> Result<()> {
        if utils::is_blank(app_name) {
            logging::warn!("[FaultToleranceConfig] App name is blank, the config is ignored");
            return Ok(());
        }
        let mut app_configs = self.app_configs.write().unwrap();
        match config {
            Some(config) => {
                if let Err(err) = config.check() {
                    logging::warn!(
                        "[FaultToleranceConfig] Ignoring invalid config of app {}: {:?}, reason: {:?}",
                        app_name,
                        config,
                        err
                    );
                    return Err(err);
                }
                logging::info!(
                    "[FaultToleranceConfig] Config of app {} was updated: {:?}",
                    app_name,
                    config
                );
                app_configs.insert(app_name.to_owned(), Arc::new(config));
            }
            None => {
                if app_configs.remove(app_name).is_some() {
                    logging::info!(
                        "[FaultToleranceConfig] Config of app {} was removed",
                        app_name
                    );
                }
            }
        }
        self.calc_enable(&app_configs);
        Ok(())
    }

    fn calc_enable(&self, app_configs: &HashMap<String, Arc<FaultToleranceConfig>>) {
        let enable = self.default_config.regulation_effective
            || app_configs.values().any(|c| c.regulation_effective);
        self.aft_enable.store(enable, Ordering::SeqCst);
    }

    /// `get_config` returns the config of `app_name`, or the default config.
    pub fn get_config(&self, app_name: &str) -> Arc<FaultToleranceConfig> {
        if app_name.is_empty() {
            return Arc::clone(&self.default_config);
        }
        self.app_configs
            .read()
            .unwrap()
            .get(app_name)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.default_config))
    }

    pub fn default_config(&self) -> Arc<FaultToleranceConfig> {
        Arc::clone(&self.default_config)
    }

    /// `app_configs` lists the applications which have their own config.
    pub fn app_configs(&self) -> Vec<(String, Arc<FaultToleranceConfig>)> {
        self.app_configs
            .read()
            .unwrap()
            .iter()
            .map(|(app, config)| (app.clone(), Arc::clone(config)))
            .collect()
    }

    /// `is_enable` is the fast path consulted by the call sites
    /// before they pay for any statistics.
    #[inline]
    pub fn is_enable(&self) -> bool {
        self.aft_enable.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn is_regulation_effective(&self, app_name: &str) -> bool {
        self.get_config(app_name).regulation_effective
    }

    #[inline]
    pub fn is_degrade_effective(&self, app_name: &str) -> bool {
        self.get_config(app_name).degrade_effective
    }

    #[inline]
    pub fn time_window(&self, app_name: &str) -> u64 {
        self.get_config(app_name).time_window
    }

    #[inline]
    pub fn least_call_count(&self, app_name: &str) -> u64 {
        self.get_config(app_name).least_call_count
    }

    #[inline]
    pub fn least_window_count(&self, app_name: &str) -> u64 {
        self.get_config(app_name).least_window_count
    }

    #[inline]
    pub fn least_window_exception_rate_multiple(&self, app_name: &str) -> f64 {
        self.get_config(app_name)
            .least_window_exception_rate_multiple
    }

    #[inline]
    pub fn weight_degrade_rate(&self, app_name: &str) -> f64 {
        self.get_config(app_name).weight_degrade_rate
    }

    #[inline]
    pub fn degrade_least_weight(&self, app_name: &str) -> i32 {
        self.get_config(app_name).degrade_least_weight
    }

    #[inline]
    pub fn weight_recover_rate(&self, app_name: &str) -> f64 {
        self.get_config(app_name).weight_recover_rate
    }

    #[inline]
    pub fn degrade_max_ip_count(&self, app_name: &str) -> usize {
        self.get_config(app_name).degrade_max_ip_count
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn effective() -> FaultToleranceConfig {
        FaultToleranceConfig {
            regulation_effective: true,
            ..Default::default()
        }
    }

    #[test]
    fn fallback_to_default() {
        let manager = FaultToleranceConfigManager::default();
        assert_eq!(*manager.get_config("unknown"), FaultToleranceConfig::default());
        assert_eq!(*manager.get_config(""), FaultToleranceConfig::default());
        assert_eq!(10, manager.time_window("unknown"));
        assert!(!manager.is_enable());
    }

    #[test]
    fn put_and_remove() {
        let manager = FaultToleranceConfigManager::default();
        manager
            .put_app_config(
                "app",
                Some(FaultToleranceConfig {
                    time_window: 3,
                    ..Default::default()
                }),
            )
            .unwrap();
        assert_eq!(3, manager.time_window("app"));
        assert_eq!(10, manager.time_window("other"));
        assert_eq!(1, manager.app_configs().len());
        manager.put_app_config("app", None).unwrap();
        assert_eq!(10, manager.time_window("app"));
        assert!(manager.app_configs().is_empty());
    }

    #[test]
    fn enable_follows_configs() {
        let manager = FaultToleranceConfigManager::default();
        manager.put_app_config("a", Some(effective())).unwrap();
        assert!(manager.is_enable());
        manager
            .put_app_config("b", Some(FaultToleranceConfig::default()))
            .unwrap();
        assert!(manager.is_enable());
        manager
            .put_app_config("a", Some(FaultToleranceConfig::default()))
            .unwrap();
        assert!(!manager.is_enable());
        manager.put_app_config("b", Some(effective())).unwrap();
        assert!(manager.is_enable());
        manager.put_app_config("b", None).unwrap();
        assert!(!manager.is_enable());
    }

    #[test]
    fn enable_with_effective_default() {
        let manager = FaultToleranceConfigManager::new(effective());
        assert!(manager.is_enable());
        assert!(manager.is_regulation_effective("any"));
    }

    #[test]
    fn invalid_config_kept_out() {
        let manager = FaultToleranceConfigManager::default();
        manager.put_app_config("app", Some(effective())).unwrap();
        let invalid = FaultToleranceConfig {
            time_window: 0,
            regulation_effective: false,
            ..Default::default()
        };
        assert!(manager.put_app_config("app", Some(invalid)).is_err());
        assert!(manager.is_enable());
        assert_eq!(10, manager.time_window("app"));
    }

    #[test]
    fn blank_app_name_ignored() {
        let manager = FaultToleranceConfigManager::default();
        manager.put_app_config(" ", Some(effective())).unwrap();
        assert!(!manager.is_enable());
        assert!(manager.app_configs().is_empty());
    }

    #[test]
    fn concurrent_put_and_get() {
        let manager = Arc::new(FaultToleranceConfigManager::default());
        let mut handlers = Vec::new();
        for i in 0..8 {
            let manager = Arc::clone(&manager);
            handlers.push(std::thread::spawn(move || {
                let app = format!("app-{}", i);
                for j in 0..100 {
                    let config = FaultToleranceConfig {
                        time_window: j % 5 + 1,
                        regulation_effective: j % 2 == 0,
                        ..Default::default()
                    };
                    manager.put_app_config(&app, Some(config)).unwrap();
                    assert!(manager.time_window(&app) >= 1);
                }
                // the last put has `regulation_effective == false`
            }));
        }
        for h in handlers {
            h.join().expect("Couldn't join on the associated thread");
        }
        assert_eq!(8, manager.app_configs().len());
        assert!(!manager.is_enable());
    }
}
