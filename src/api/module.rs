use crate::{
    config::{ConfigEntity, FaultToleranceConfigManager},
    logging,
    regulation::{StrategyContext, StrategyRegistry, TimeWindowRegulator},
    stat::InvocationStatFactory,
    subscriber::FaultToleranceSubscriber,
    Result,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// `FaultToleranceModule` owns everything AFT needs in a process:
/// the config manager, the stat factory, the strategy registry, the regulator and the subscriber.
pub struct FaultToleranceModule {
    app_name: String,
    config: Arc<FaultToleranceConfigManager>,
    stats: Arc<InvocationStatFactory>,
    registry: Arc<StrategyRegistry>,
    regulator: Arc<TimeWindowRegulator>,
    subscriber: FaultToleranceSubscriber,
    installed: AtomicBool,
}

impl FaultToleranceModule {
    /// `new` builds a module which is not installed yet.
    pub fn new(config_entity: ConfigEntity) -> Result<Self> {
        config_entity.check()?;
        let aft_config = config_entity.config;
        let config = Arc::new(FaultToleranceConfigManager::new(
            aft_config.default_fault_tolerance,
        ));
        for (app_name, app_config) in aft_config.apps {
            config.put_app_config(&app_name, Some(app_config))?;
        }
        let stats = Arc::new(InvocationStatFactory::new());
        let registry = Arc::new(StrategyRegistry::new());
        let regulator = Arc::new(TimeWindowRegulator::new(
            StrategyContext {
                config: Arc::clone(&config),
                stats: Arc::clone(&stats),
            },
            Arc::clone(&registry),
            aft_config.regulator,
        ));
        let subscriber = FaultToleranceSubscriber::new(Arc::clone(&config), Arc::clone(&stats));
        Ok(FaultToleranceModule {
            app_name: aft_config.app.app_name,
            config,
            stats,
            registry,
            regulator,
            subscriber,
            installed: AtomicBool::new(false),
        })
    }

    /// `install` initializes the regulator. The strategies are resolved at this point,
    /// so custom generators must be registered before.
    pub fn install(&self) -> Result<()> {
        if self
            .installed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }
        if let Err(err) = self.regulator.init() {
            self.installed.store(false, Ordering::SeqCst);
            logging::error!(
                "[FaultToleranceModule] Failed to install, app: {}, error: {:?}",
                self.app_name,
                err
            );
            return Err(err);
        }
        logging::info!("[FaultToleranceModule] Installed, app: {}", self.app_name);
        Ok(())
    }

    pub fn uninstall(&self) {
        if self
            .installed
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        self.regulator.destroy();
        logging::info!("[FaultToleranceModule] Uninstalled, app: {}", self.app_name);
    }

    #[inline]
    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::SeqCst)
    }

    /// `is_enable` tells whether regulation is effective for any application.
    #[inline]
    pub fn is_enable(&self) -> bool {
        self.config.is_enable()
    }

    #[inline]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    #[inline]
    pub fn config_manager(&self) -> &Arc<FaultToleranceConfigManager> {
        &self.config
    }

    #[inline]
    pub fn stat_factory(&self) -> &Arc<InvocationStatFactory> {
        &self.stats
    }

    #[inline]
    pub fn registry(&self) -> &Arc<StrategyRegistry> {
        &self.registry
    }

    #[inline]
    pub fn regulator(&self) -> &Arc<TimeWindowRegulator> {
        &self.regulator
    }

    #[inline]
    pub fn subscriber(&self) -> &FaultToleranceSubscriber {
        &self.subscriber
    }
}

impl Drop for FaultToleranceModule {
    fn drop(&mut self) {
        self.uninstall();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{FaultToleranceConfig, DEFAULT_DEGRADE_STRATEGY};
    use crate::regulation::{DegradeStrategy, LogPrintDegradeStrategy};

    fn gen_quiet_degrade(_: &StrategyContext) -> Arc<dyn DegradeStrategy> {
        Arc::new(LogPrintDegradeStrategy::new())
    }

    #[test]
    fn install_twice() {
        let module = FaultToleranceModule::new(ConfigEntity::new()).unwrap();
        assert!(!module.is_installed());
        module.install().unwrap();
        module.install().unwrap();
        assert!(module.is_installed());
        assert!(!module.is_enable());
        module.uninstall();
        module.uninstall();
        assert!(!module.is_installed());
    }

    #[test]
    fn apps_from_entity() {
        let mut entity = ConfigEntity::new();
        entity.config.apps.insert(
            "order-app".into(),
            FaultToleranceConfig {
                time_window: 4,
                regulation_effective: true,
                ..Default::default()
            },
        );
        let module = FaultToleranceModule::new(entity).unwrap();
        assert!(module.is_enable());
        assert_eq!(4, module.config_manager().time_window("order-app"));
        assert_eq!(10, module.config_manager().time_window("other-app"));
    }

    #[test]
    fn custom_strategy_before_install() {
        let mut entity = ConfigEntity::new();
        entity.config.regulator.degrade_strategy = "quiet".into();
        let module = FaultToleranceModule::new(entity).unwrap();
        assert!(module.install().is_err());
        assert!(!module.is_installed());

        module
            .registry()
            .set_degrade_strategy_generator("quiet", Box::new(gen_quiet_degrade))
            .unwrap();
        assert!(module
            .registry()
            .set_degrade_strategy_generator(DEFAULT_DEGRADE_STRATEGY, Box::new(gen_quiet_degrade))
            .is_err());
        module.install().unwrap();
        assert!(module.regulator().is_initialized());
    }
}
