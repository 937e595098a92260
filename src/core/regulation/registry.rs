use super::*;
use crate::{
    config::{
        FaultToleranceConfigManager, DEFAULT_DEGRADE_STRATEGY, DEFAULT_MEASURE_STRATEGY,
        DEFAULT_RECOVER_STRATEGY, DEFAULT_REGULATION_STRATEGY,
    },
    measure::{MeasureStrategy, ServiceHorizontalMeasureStrategy},
    stat::InvocationStatFactory,
    Error,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// `LOG_DEGRADE_STRATEGY` is the alias of the degrade strategy which only logs.
pub const LOG_DEGRADE_STRATEGY: &str = "log";

/// `StrategyContext` is what a strategy generator may build its strategy upon.
#[derive(Clone)]
pub struct StrategyContext {
    pub config: Arc<FaultToleranceConfigManager>,
    pub stats: Arc<InvocationStatFactory>,
}

pub type StrategyGenFn<S> = dyn Send + Sync + Fn(&StrategyContext) -> Arc<S>;

pub type MeasureGenFn = StrategyGenFn<dyn MeasureStrategy>;
pub type RegulationGenFn = StrategyGenFn<dyn RegulationStrategy>;
pub type DegradeGenFn = StrategyGenFn<dyn DegradeStrategy>;
pub type RecoverGenFn = StrategyGenFn<dyn RecoverStrategy>;

use gen_fns::*;
mod gen_fns {
    use super::*;

    pub(crate) fn gen_service_horizontal(ctx: &StrategyContext) -> Arc<dyn MeasureStrategy> {
        Arc::new(ServiceHorizontalMeasureStrategy::new(
            Arc::clone(&ctx.config),
            Arc::clone(&ctx.stats),
        ))
    }

    pub(crate) fn gen_time_window(ctx: &StrategyContext) -> Arc<dyn RegulationStrategy> {
        Arc::new(TimeWindowRegulationStrategy::new(Arc::clone(&ctx.config)))
    }

    pub(crate) fn gen_log_degrade(_: &StrategyContext) -> Arc<dyn DegradeStrategy> {
        Arc::new(LogPrintDegradeStrategy::new())
    }

    pub(crate) fn gen_weight_degrade(ctx: &StrategyContext) -> Arc<dyn DegradeStrategy> {
        Arc::new(WeightDegradeStrategy::new(Arc::clone(&ctx.config)))
    }

    pub(crate) fn gen_weight_recover(ctx: &StrategyContext) -> Arc<dyn RecoverStrategy> {
        Arc::new(WeightRecoverStrategy::new(Arc::clone(&ctx.config)))
    }
}

/// `GeneratorMap` maps the aliases of one kind of strategy to their generators.
/// The generators registered on creation are the built-in ones, they cannot be modified.
struct GeneratorMap<S: ?Sized> {
    kind: &'static str,
    builtin: Vec<&'static str>,
    generators: RwLock<HashMap<String, Box<StrategyGenFn<S>>>>,
}

impl<S: ?Sized> GeneratorMap<S> {
    fn new(kind: &'static str, builtin: Vec<(&'static str, Box<StrategyGenFn<S>>)>) -> Self {
        let aliases = builtin.iter().map(|(alias, _)| *alias).collect();
        let generators = builtin
            .into_iter()
            .map(|(alias, generator)| (alias.to_owned(), generator))
            .collect();
        GeneratorMap {
            kind,
            builtin: aliases,
            generators: RwLock::new(generators),
        }
    }

    fn set(&self, alias: &str, generator: Box<StrategyGenFn<S>>) -> Result<()> {
        self.check_modifiable(alias)?;
        self.generators
            .write()
            .unwrap()
            .insert(alias.to_owned(), generator);
        Ok(())
    }

    fn remove(&self, alias: &str) -> Result<()> {
        self.check_modifiable(alias)?;
        self.generators.write().unwrap().remove(alias);
        Ok(())
    }

    fn contains(&self, alias: &str) -> bool {
        self.generators.read().unwrap().contains_key(alias)
    }

    fn generate(&self, alias: &str, ctx: &StrategyContext) -> Result<Arc<S>> {
        match self.generators.read().unwrap().get(alias) {
            Some(generator) => Ok(generator(ctx)),
            None => Err(Error::msg(format!(
                "Unsupported {} strategy: {}",
                self.kind, alias
            ))),
        }
    }

    fn check_modifiable(&self, alias: &str) -> Result<()> {
        if self.builtin.iter().any(|builtin| *builtin == alias) {
            return Err(Error::msg(format!(
                "Default {} strategies are not allowed to be modified.",
                self.kind
            )));
        }
        Ok(())
    }
}

/// `StrategyRegistry` resolves the strategies of the regulator by their aliases.
/// Custom strategies are registered under new aliases.
pub struct StrategyRegistry {
    measure: GeneratorMap<dyn MeasureStrategy>,
    regulation: GeneratorMap<dyn RegulationStrategy>,
    degrade: GeneratorMap<dyn DegradeStrategy>,
    recover: GeneratorMap<dyn RecoverStrategy>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        StrategyRegistry {
            measure: GeneratorMap::new(
                "measure",
                vec![(
                    DEFAULT_MEASURE_STRATEGY,
                    Box::new(gen_service_horizontal) as Box<MeasureGenFn>,
                )],
            ),
            regulation: GeneratorMap::new(
                "regulation",
                vec![(
                    DEFAULT_REGULATION_STRATEGY,
                    Box::new(gen_time_window) as Box<RegulationGenFn>,
                )],
            ),
            degrade: GeneratorMap::new(
                "degrade",
                vec![
                    (
                        LOG_DEGRADE_STRATEGY,
                        Box::new(gen_log_degrade) as Box<DegradeGenFn>,
                    ),
                    (
                        DEFAULT_DEGRADE_STRATEGY,
                        Box::new(gen_weight_degrade) as Box<DegradeGenFn>,
                    ),
                ],
            ),
            recover: GeneratorMap::new(
                "recover",
                vec![(
                    DEFAULT_RECOVER_STRATEGY,
                    Box::new(gen_weight_recover) as Box<RecoverGenFn>,
                )],
            ),
        }
    }
}

impl StrategyRegistry {
    pub fn new() -> Self {
        StrategyRegistry::default()
    }

    pub fn set_measure_strategy_generator(
        &self,
        alias: &str,
        generator: Box<MeasureGenFn>,
    ) -> Result<()> {
        self.measure.set(alias, generator)
    }

    pub fn remove_measure_strategy_generator(&self, alias: &str) -> Result<()> {
        self.measure.remove(alias)
    }

    pub fn set_regulation_strategy_generator(
        &self,
        alias: &str,
        generator: Box<RegulationGenFn>,
    ) -> Result<()> {
        self.regulation.set(alias, generator)
    }

    pub fn remove_regulation_strategy_generator(&self, alias: &str) -> Result<()> {
        self.regulation.remove(alias)
    }

    pub fn set_degrade_strategy_generator(
        &self,
        alias: &str,
        generator: Box<DegradeGenFn>,
    ) -> Result<()> {
        self.degrade.set(alias, generator)
    }

    pub fn remove_degrade_strategy_generator(&self, alias: &str) -> Result<()> {
        self.degrade.remove(alias)
    }

    pub fn set_recover_strategy_generator(
        &self,
        alias: &str,
        generator: Box<RecoverGenFn>,
    ) -> Result<()> {
        self.recover.set(alias, generator)
    }

    pub fn remove_recover_strategy_generator(&self, alias: &str) -> Result<()> {
        self.recover.remove(alias)
    }

    pub fn has_measure_strategy(&self, alias: &str) -> bool {
        self.measure.contains(alias)
    }

    pub fn has_regulation_strategy(&self, alias: &str) -> bool {
        self.regulation.contains(alias)
    }

    pub fn has_degrade_strategy(&self, alias: &str) -> bool {
        self.degrade.contains(alias)
    }

    pub fn has_recover_strategy(&self, alias: &str) -> bool {
        self.recover.contains(alias)
    }

    pub fn new_measure_strategy(
        &self,
        alias: &str,
        ctx: &StrategyContext,
    ) -> Result<Arc<dyn MeasureStrategy>> {
        self.measure.generate(alias, ctx)
    }

    pub fn new_regulation_strategy(
        &self,
        alias: &str,
        ctx: &StrategyContext,
    ) -> Result<Arc<dyn RegulationStrategy>> {
        self.regulation.generate(alias, ctx)
    }

    pub fn new_degrade_strategy(
        &self,
        alias: &str,
        ctx: &StrategyContext,
    ) -> Result<Arc<dyn DegradeStrategy>> {
        self.degrade.generate(alias, ctx)
    }

    pub fn new_recover_strategy(
        &self,
        alias: &str,
        ctx: &StrategyContext,
    ) -> Result<Arc<dyn RecoverStrategy>> {
        self.recover.generate(alias, ctx)
    }
}
