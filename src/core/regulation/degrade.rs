use super::DegradeStrategy;
use crate::{
    base::{ProviderInfoWeightManager, ProviderStatus},
    config::FaultToleranceConfigManager,
    logging,
    measure::MeasureResultDetail,
    utils, Result,
};
use std::sync::Arc;

/// `LogPrintDegradeStrategy` only records the abnormal provider.
#[derive(Debug, Default)]
pub struct LogPrintDegradeStrategy;

impl LogPrintDegradeStrategy {
    pub fn new() -> Self {
        LogPrintDegradeStrategy
    }

    fn log(detail: &MeasureResultDetail) {
        logging::info!(
            "[LogPrintDegradeStrategy] app: {}, service: {}, ip: {} is abnormal, window count: {}, abnormal rate: {}, average abnormal rate: {}, log only: {}",
            detail.app_name(),
            detail.dimension.service(),
            detail.dimension.ip(),
            detail.window_count,
            detail.abnormal_rate,
            detail.average_abnormal_rate,
            detail.log_only
        );
    }
}

impl DegradeStrategy for LogPrintDegradeStrategy {
    fn degrade(&self, detail: &MeasureResultDetail) -> Result<()> {
        LogPrintDegradeStrategy::log(detail);
        Ok(())
    }
}

/// `WeightDegradeStrategy` lowers the weight of the abnormal provider by
/// `weight_degrade_rate`, never below `degrade_least_weight`.
pub struct WeightDegradeStrategy {
    config: Arc<FaultToleranceConfigManager>,
}

impl WeightDegradeStrategy {
    pub fn new(config: Arc<FaultToleranceConfigManager>) -> Self {
        WeightDegradeStrategy { config }
    }
}

impl DegradeStrategy for WeightDegradeStrategy {
    fn degrade(&self, detail: &MeasureResultDetail) -> Result<()> {
        LogPrintDegradeStrategy::log(detail);
        if detail.log_only {
            return Ok(());
        }
        let provider = match detail.dimension.provider() {
            Some(provider) => provider,
            None => return Ok(()),
        };
        if provider.status() == ProviderStatus::WarmingUp {
            return Ok(());
        }
        let app_name = detail.app_name();
        let current_weight = provider.weight();
        let degraded_weight = std::cmp::max(
            utils::multiply(current_weight, self.config.weight_degrade_rate(app_name)),
            self.config.degrade_least_weight(app_name),
        );
        ProviderInfoWeightManager::degrade_weight(&provider, degraded_weight);
        logging::info!(
            "[WeightDegradeStrategy] app: {}, service: {}, ip: {} is degraded, weight from {} to {}",
            app_name,
            detail.dimension.service(),
            detail.dimension.ip(),
            current_weight,
            degraded_weight
        );
        Ok(())
    }
}
