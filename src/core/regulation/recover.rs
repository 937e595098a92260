use super::RecoverStrategy;
use crate::{
    base::{ProviderInfoWeightManager, ProviderStatus},
    config::FaultToleranceConfigManager,
    logging,
    measure::MeasureResultDetail,
    utils, Result,
};
use std::sync::Arc;

/// `WeightRecoverStrategy` multiplies the weight of a degraded provider by `weight_recover_rate`
/// on each healthy window, until it reaches the origin weight again.
/// Each step raises the weight by at least one, so small weights and small rates still recover.
pub struct WeightRecoverStrategy {
    config: Arc<FaultToleranceConfigManager>,
}

impl WeightRecoverStrategy {
    pub fn new(config: Arc<FaultToleranceConfigManager>) -> Self {
        WeightRecoverStrategy { config }
    }
}

impl RecoverStrategy for WeightRecoverStrategy {
    fn recover(&self, detail: &mut MeasureResultDetail) -> Result<()> {
        let provider = match detail.dimension.provider() {
            Some(provider) => provider,
            None => return Ok(()),
        };
        if provider.status() == ProviderStatus::WarmingUp {
            return Ok(());
        }
        let current_weight = ProviderInfoWeightManager::get_weight(Some(&*provider));
        if current_weight == -1 {
            return Ok(());
        }
        let app_name = detail.app_name().to_owned();
        let origin_weight = detail.dimension.origin_weight();
        let recover_weight = std::cmp::max(
            utils::multiply(current_weight, self.config.weight_recover_rate(&app_name)),
            current_weight.saturating_add(1),
        );
        if recover_weight >= origin_weight {
            ProviderInfoWeightManager::recover_origin_weight(&provider, origin_weight);
            detail.recovered_origin_weight = true;
            logging::info!(
                "[WeightRecoverStrategy] app: {}, service: {}, ip: {} is recovered to its origin weight {}",
                app_name,
                detail.dimension.service(),
                detail.dimension.ip(),
                origin_weight
            );
        } else {
            ProviderInfoWeightManager::recover_weight(&provider, recover_weight);
            logging::info!(
                "[WeightRecoverStrategy] app: {}, service: {}, ip: {} is recovering, weight from {} to {}",
                app_name,
                detail.dimension.service(),
                detail.dimension.ip(),
                current_weight,
                recover_weight
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::{ConsumerConfig, ProviderInfo};
    use crate::config::FaultToleranceConfig;
    use crate::measure::MeasureState;
    use crate::stat::InvocationStatDimension;

    fn detail(provider: &Arc<ProviderInfo>) -> MeasureResultDetail {
        let dimension = InvocationStatDimension::new(
            provider,
            Arc::new(ConsumerConfig::new("app", "com.example.EchoService")),
        );
        MeasureResultDetail::new(Arc::new(dimension), MeasureState::Healthy)
    }

    #[test]
    fn recover_step_by_step() {
        let strategy = WeightRecoverStrategy::new(Arc::new(FaultToleranceConfigManager::default()));
        let provider = Arc::new(ProviderInfo::new("10.0.0.1", 12200, 100));
        let mut detail = detail(&provider);
        ProviderInfoWeightManager::degrade_weight(&provider, 5);

        for expected in [10, 20, 40, 80] {
            strategy.recover(&mut detail).unwrap();
            assert_eq!(expected, provider.weight());
            assert_eq!(ProviderStatus::Recovering, provider.status());
            assert!(!detail.recovered_origin_weight);
        }
        strategy.recover(&mut detail).unwrap();
        assert_eq!(100, provider.weight());
        assert_eq!(ProviderStatus::Available, provider.status());
        assert!(detail.recovered_origin_weight);
    }

    #[test]
    fn small_rate_still_recovers() {
        let manager = Arc::new(FaultToleranceConfigManager::default());
        manager
            .put_app_config(
                "app",
                Some(FaultToleranceConfig {
                    weight_recover_rate: 1.2,
                    ..Default::default()
                }),
            )
            .unwrap();
        let strategy = WeightRecoverStrategy::new(manager);
        let provider = Arc::new(ProviderInfo::new("10.0.0.1", 12200, 5));
        let mut detail = detail(&provider);
        ProviderInfoWeightManager::degrade_weight(&provider, 0);

        // 0 -> 1 -> 2 -> 3 -> 4 (round(3 * 1.2) = 4) -> 5
        for expected in [1, 2, 3, 4] {
            strategy.recover(&mut detail).unwrap();
            assert_eq!(expected, provider.weight());
            assert_eq!(ProviderStatus::Recovering, provider.status());
        }
        strategy.recover(&mut detail).unwrap();
        assert_eq!(5, provider.weight());
        assert_eq!(ProviderStatus::Available, provider.status());
        assert!(detail.recovered_origin_weight);
    }

    #[test]
    fn skip_warming_up_and_missing() {
        let strategy = WeightRecoverStrategy::new(Arc::new(FaultToleranceConfigManager::default()));
        let provider = Arc::new(
            ProviderInfo::new("10.0.0.1", 12200, 100).with_status(ProviderStatus::WarmingUp),
        );
        provider.set_weight(5);
        let mut warming_up = detail(&provider);
        strategy.recover(&mut warming_up).unwrap();
        assert_eq!(5, provider.weight());
        assert_eq!(ProviderStatus::WarmingUp, provider.status());

        let gone = Arc::new(ProviderInfo::new("10.0.0.2", 12200, 100));
        let mut missing = detail(&gone);
        drop(gone);
        strategy.recover(&mut missing).unwrap();
        assert!(!missing.recovered_origin_weight);
    }
}
