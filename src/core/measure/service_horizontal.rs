use super::*;
use crate::{
    base::ProviderInfoWeightManager,
    config::FaultToleranceConfigManager,
    logging,
    stat::{InvocationStatDimension, InvocationStatFactory, InvocationStatSnapshot},
    utils,
};
use std::collections::{hash_map::Entry, HashMap};
use std::sync::RwLock;

/// The least window count is never below `LEGAL_LEAST_WINDOW_COUNT`.
pub const LEGAL_LEAST_WINDOW_COUNT: i64 = 2;

/// `ServiceHorizontalMeasureStrategy` measures each provider against the other providers
/// of the same service: a provider is abnormal when its exception rate reaches
/// `least_window_exception_rate_multiple` times the average rate of the service.
pub struct ServiceHorizontalMeasureStrategy {
    config: Arc<FaultToleranceConfigManager>,
    stats: Arc<InvocationStatFactory>,
    /// models keyed by the dimension key `app_name:service`
    app_service_models: RwLock<HashMap<String, Arc<MeasureModel>>>,
}

impl ServiceHorizontalMeasureStrategy {
    pub fn new(config: Arc<FaultToleranceConfigManager>, stats: Arc<InvocationStatFactory>) -> Self {
        ServiceHorizontalMeasureStrategy {
            config,
            stats,
            app_service_models: RwLock::new(HashMap::new()),
        }
    }

    /// `window_snapshots` takes the snapshots of the stats which saw calls in this window,
    /// the others are one cycle closer to being released.
    fn window_snapshots(&self, stats: &[Arc<InvocationStat>]) -> Vec<InvocationStatSnapshot> {
        let mut snapshots = Vec::with_capacity(stats.len());
        for stat in stats {
            let snapshot = stat.snapshot();
            if snapshot.invoke_count() <= 0 {
                stat.incr_useless_cycle();
                self.stats.release_if_useless(stat);
            } else {
                stat.reset_useless_cycle();
                snapshots.push(snapshot);
            }
        }
        snapshots
    }

    fn log_measure_result(&self, result: &MeasureResult, least_window_count: i64) {
        let model = result.model();
        let counts = result.state_counts();
        logging::debug!(
            "[ServiceHorizontalMeasureStrategy] app: {}, service: {}, window ending {}, least window count: {}, abnormal: {}, healthy: {}, ignore: {}",
            model.app_name(),
            model.service(),
            utils::format_time_millis(result.timestamp_ms()),
            least_window_count,
            counts[MeasureState::Abnormal],
            counts[MeasureState::Healthy],
            counts[MeasureState::Ignore]
        );
        for detail in result.details() {
            logging::trace!(
                "[ServiceHorizontalMeasureStrategy] app: {}, service: {}, ip: {}, state: {}, window count: {}, least window count: {}, abnormal rate: {}, average abnormal rate: {}, multiple: {}",
                model.app_name(),
                model.service(),
                detail.dimension.ip(),
                detail.measure_state,
                detail.window_count,
                detail.least_window_count,
                detail.abnormal_rate,
                detail.average_abnormal_rate,
                detail.least_abnormal_rate_multiple
            );
        }
    }
}

impl MeasureStrategy for ServiceHorizontalMeasureStrategy {
    fn measure(&self, model: &Arc<MeasureModel>) -> Result<MeasureResult> {
        let mut result = MeasureResult::new(Arc::clone(model));
        let stats = model.invocation_stats();
        if stats.is_empty() {
            return Ok(result);
        }
        let snapshots = self.window_snapshots(&stats);
        let config = self.config.get_config(model.app_name());
        let least_window_count =
            std::cmp::max(config.least_window_count as i64, LEGAL_LEAST_WINDOW_COUNT);
        let multiple = config.least_window_exception_rate_multiple;

        let total_count: i64 = snapshots.iter().map(|s| s.invoke_count()).sum();
        let average_exception_rate = if total_count < config.least_call_count as i64 {
            -1.0
        } else {
            calculate_average_exception_rate(&snapshots, least_window_count)
        };

        for snapshot in &snapshots {
            let dimension = snapshot.dimension();
            let window_count = snapshot.invoke_count();
            let provider = dimension.provider();
            let invocation_least_window_count = calculate_invocation_least_window_count(
                dimension,
                ProviderInfoWeightManager::get_weight(provider.as_deref()),
                least_window_count,
            );
            let exception_rate = snapshot.exception_rate();

            let state = if average_exception_rate < 0.0
                || invocation_least_window_count < 0
                || window_count < invocation_least_window_count
            {
                MeasureState::Ignore
            } else if average_exception_rate == 0.0 {
                MeasureState::Healthy
            } else if utils::divide(exception_rate, average_exception_rate) >= multiple {
                MeasureState::Abnormal
            } else {
                MeasureState::Healthy
            };

            let mut detail = MeasureResultDetail::new(Arc::clone(dimension), state);
            detail.time_window = config.time_window;
            detail.window_count = window_count;
            detail.least_window_count = invocation_least_window_count;
            detail.abnormal_rate = exception_rate;
            detail.average_abnormal_rate = average_exception_rate;
            detail.least_abnormal_rate_multiple = multiple;
            result.add_measure_detail(detail);
        }

        self.log_measure_result(&result, least_window_count);
        self.stats.update_invocation_stats(&snapshots);
        Ok(result)
    }

    fn build_measure_model(&self, stat: Arc<InvocationStat>) -> Option<Arc<MeasureModel>> {
        let dimension = Arc::clone(stat.dimension());
        let mut models = self.app_service_models.write().unwrap();
        match models.entry(dimension.dimension_key().to_owned()) {
            Entry::Occupied(e) => {
                e.get().add_invocation_stat(stat);
                None
            }
            Entry::Vacant(e) => {
                let model = Arc::new(MeasureModel::new(dimension.app_name(), dimension.service()));
                model.add_invocation_stat(stat);
                e.insert(Arc::clone(&model));
                Some(model)
            }
        }
    }

    fn remove_measure_model(&self, stat: &Arc<InvocationStat>) {
        let models = self.app_service_models.read().unwrap();
        if let Some(model) = models.get(stat.dimension().dimension_key()) {
            model.remove_invocation_stat(stat);
        }
    }
}

/// `calculate_average_exception_rate` averages over the providers which saw enough calls,
/// it is -1 if there are none.
fn calculate_average_exception_rate(
    snapshots: &[InvocationStatSnapshot],
    least_window_count: i64,
) -> f64 {
    let mut sum_exception = 0;
    let mut sum_call = 0;
    for snapshot in snapshots {
        if snapshot.invoke_count() >= least_window_count {
            sum_exception += snapshot.exception_count();
            sum_call += snapshot.invoke_count();
        }
    }
    if sum_call == 0 {
        return -1.0;
    }
    utils::divide(sum_exception as f64, sum_call as f64)
}

/// `calculate_invocation_least_window_count` scales the least window count by
/// `current weight / origin weight`, so that a degraded provider, receiving less traffic,
/// can still be measured.
fn calculate_invocation_least_window_count(
    dimension: &InvocationStatDimension,
    weight: i32,
    least_window_count: i64,
) -> i64 {
    let origin_weight = dimension.origin_weight();
    if origin_weight == 0 {
        logging::error!(
            "[ServiceHorizontalMeasureStrategy] The origin weight of {} is 0, it cannot be measured",
            dimension
        );
        return -1;
    }
    if weight < 0 {
        return least_window_count;
    }
    let rate = utils::divide(weight as f64, origin_weight as f64);
    let count = (least_window_count as f64 * rate).round() as i64;
    std::cmp::max(count, LEGAL_LEAST_WINDOW_COUNT)
}
