use crate::{
    stat::{InvocationStat, InvocationStatDimension},
    utils,
};
use enum_map::{Enum, EnumMap};
use std::fmt;
use std::sync::{Arc, RwLock};

/// `MeasureState` is the classification of a provider in one measurement window.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Enum)]
pub enum MeasureState {
    /// The provider fails notably more than its peers.
    Abnormal,
    Healthy,
    /// Too few calls to tell.
    Ignore,
}

impl fmt::Display for MeasureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// `MeasureModel` groups the stats measured against each other,
/// i.e. all the providers of one service of one application.
#[derive(Debug)]
pub struct MeasureModel {
    app_name: String,
    service: String,
    invocation_stats: RwLock<Vec<Arc<InvocationStat>>>,
}

impl MeasureModel {
    pub fn new<A: Into<String>, S: Into<String>>(app_name: A, service: S) -> Self {
        MeasureModel {
            app_name: app_name.into(),
            service: service.into(),
            invocation_stats: RwLock::new(Vec::new()),
        }
    }

    #[inline]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    #[inline]
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn add_invocation_stat(&self, stat: Arc<InvocationStat>) {
        let mut stats = self.invocation_stats.write().unwrap();
        if !stats.iter().any(|s| Arc::ptr_eq(s, &stat)) {
            stats.push(stat);
        }
    }

    pub fn remove_invocation_stat(&self, stat: &Arc<InvocationStat>) -> bool {
        let mut stats = self.invocation_stats.write().unwrap();
        let len = stats.len();
        stats.retain(|s| !Arc::ptr_eq(s, stat));
        stats.len() != len
    }

    pub fn invocation_stats(&self) -> Vec<Arc<InvocationStat>> {
        self.invocation_stats.read().unwrap().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.invocation_stats.read().unwrap().is_empty()
    }
}

/// `MeasureResultDetail` is the measurement of one provider in one window.
#[derive(Debug, Clone)]
pub struct MeasureResultDetail {
    pub dimension: Arc<InvocationStatDimension>,
    pub measure_state: MeasureState,
    pub time_window: u64,
    pub window_count: i64,
    /// `least_window_count` is the least window count applied to this provider, -1 if unknown.
    pub least_window_count: i64,
    pub abnormal_rate: f64,
    pub average_abnormal_rate: f64,
    pub least_abnormal_rate_multiple: f64,
    /// `log_only` is set by the regulator when degrade is not effective for the application.
    pub log_only: bool,
    /// `recovered_origin_weight` is set by the recover strategy
    /// once the provider is back to its origin weight.
    pub recovered_origin_weight: bool,
}

impl MeasureResultDetail {
    pub fn new(dimension: Arc<InvocationStatDimension>, measure_state: MeasureState) -> Self {
        MeasureResultDetail {
            dimension,
            measure_state,
            time_window: 0,
            window_count: 0,
            least_window_count: -1,
            abnormal_rate: -1.0,
            average_abnormal_rate: -1.0,
            least_abnormal_rate_multiple: 0.0,
            log_only: true,
            recovered_origin_weight: false,
        }
    }

    #[inline]
    pub fn app_name(&self) -> &str {
        self.dimension.app_name()
    }
}

/// `MeasureResult` is produced fresh by each measurement of a model.
#[derive(Debug)]
pub struct MeasureResult {
    model: Arc<MeasureModel>,
    details: Vec<MeasureResultDetail>,
    timestamp_ms: u64,
}

impl MeasureResult {
    pub fn new(model: Arc<MeasureModel>) -> Self {
        MeasureResult {
            model,
            details: Vec::new(),
            timestamp_ms: utils::curr_time_millis(),
        }
    }

    #[inline]
    pub fn model(&self) -> &Arc<MeasureModel> {
        &self.model
    }

    #[inline]
    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    pub fn add_measure_detail(&mut self, detail: MeasureResultDetail) {
        self.details.push(detail);
    }

    pub fn details(&self) -> &[MeasureResultDetail] {
        &self.details
    }

    pub fn details_mut(&mut self) -> &mut [MeasureResultDetail] {
        &mut self.details
    }

    /// `state_counts` counts the details of each state.
    pub fn state_counts(&self) -> EnumMap<MeasureState, usize> {
        let mut counts = EnumMap::default();
        for detail in &self.details {
            counts[detail.measure_state] += 1;
        }
        counts
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::{ConsumerConfig, ProviderInfo};

    fn new_stat(provider: &Arc<ProviderInfo>) -> Arc<InvocationStat> {
        let dimension = InvocationStatDimension::new(
            provider,
            Arc::new(ConsumerConfig::new("app", "com.example.EchoService")),
        );
        Arc::new(InvocationStat::new(Arc::new(dimension)))
    }

    #[test]
    fn model_membership() {
        let provider = Arc::new(ProviderInfo::new("10.0.0.1", 12200, 100));
        let model = MeasureModel::new("app", "com.example.EchoService");
        let stat = new_stat(&provider);
        model.add_invocation_stat(Arc::clone(&stat));
        model.add_invocation_stat(Arc::clone(&stat));
        assert_eq!(1, model.invocation_stats().len());
        assert!(model.remove_invocation_stat(&stat));
        assert!(!model.remove_invocation_stat(&stat));
        assert!(model.is_empty());
    }

    #[test]
    fn counts_of_states() {
        let provider = Arc::new(ProviderInfo::new("10.0.0.1", 12200, 100));
        let stat = new_stat(&provider);
        let mut result = MeasureResult::new(Arc::new(MeasureModel::new(
            "app",
            "com.example.EchoService",
        )));
        for state in [
            MeasureState::Abnormal,
            MeasureState::Healthy,
            MeasureState::Healthy,
        ] {
            result.add_measure_detail(MeasureResultDetail::new(
                Arc::clone(stat.dimension()),
                state,
            ));
        }
        let counts = result.state_counts();
        assert_eq!(1, counts[MeasureState::Abnormal]);
        assert_eq!(2, counts[MeasureState::Healthy]);
        assert_eq!(0, counts[MeasureState::Ignore]);
    }
}
