use super::RegulationStrategy;
use crate::{
    config::FaultToleranceConfigManager, measure::MeasureResultDetail, stat::InvocationStatDimension,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

/// `TimeWindowRegulationStrategy` caps the number of providers degraded at the same time
/// in each service, by the `degrade_max_ip_count` of the application.
pub struct TimeWindowRegulationStrategy {
    config: Arc<FaultToleranceConfigManager>,
    /// degraded ips keyed by the dimension key, each set behind its own lock
    degrade_ips: RwLock<HashMap<String, Arc<Mutex<HashSet<String>>>>>,
}

impl TimeWindowRegulationStrategy {
    pub fn new(config: Arc<FaultToleranceConfigManager>) -> Self {
        TimeWindowRegulationStrategy {
            config,
            degrade_ips: RwLock::new(HashMap::new()),
        }
    }

    fn occupy(&self, ips: &mut HashSet<String>, detail: &MeasureResultDetail) -> bool {
        let ip = detail.dimension.ip();
        if ips.contains(ip) {
            return false;
        }
        if ips.len() < self.config.degrade_max_ip_count(detail.app_name()) {
            ips.insert(ip.to_owned());
            return false;
        }
        true
    }

    // empty sets are dropped under the write lock of the map,
    // so an ip is never added to a set which is no longer in the map
    fn remove_ip(&self, dimension_key: &str, ip: &str) {
        let mut degrade_ips = self.degrade_ips.write().unwrap();
        let now_empty = match degrade_ips.get(dimension_key) {
            Some(ips) => {
                let mut ips = ips.lock().unwrap();
                ips.remove(ip);
                ips.is_empty()
            }
            None => false,
        };
        if now_empty {
            degrade_ips.remove(dimension_key);
        }
    }

    /// `degraded_ips` lists the providers currently degraded under `dimension_key`.
    pub fn degraded_ips(&self, dimension_key: &str) -> Vec<String> {
        match self.degrade_ips.read().unwrap().get(dimension_key) {
            Some(ips) => ips.lock().unwrap().iter().cloned().collect(),
            None => Vec::new(),
        }
    }
}

impl RegulationStrategy for TimeWindowRegulationStrategy {
    fn is_degrade_effective(&self, detail: &MeasureResultDetail) -> bool {
        let app_name = detail.app_name();
        self.config.is_regulation_effective(app_name) && self.config.is_degrade_effective(app_name)
    }

    fn is_reach_max_degrade_ip_count(&self, detail: &MeasureResultDetail) -> bool {
        let key = detail.dimension.dimension_key();
        if let Some(ips) = self.degrade_ips.read().unwrap().get(key) {
            return self.occupy(&mut ips.lock().unwrap(), detail);
        }
        let mut degrade_ips = self.degrade_ips.write().unwrap();
        let ips = degrade_ips.entry(key.to_owned()).or_default();
        let reached = self.occupy(&mut ips.lock().unwrap(), detail);
        reached
    }

    fn is_exist_in_the_degrade_list(&self, detail: &MeasureResultDetail) -> bool {
        match self
            .degrade_ips
            .read()
            .unwrap()
            .get(detail.dimension.dimension_key())
        {
            Some(ips) => ips.lock().unwrap().contains(detail.dimension.ip()),
            None => false,
        }
    }

    fn remove_from_degrade_list(&self, detail: &MeasureResultDetail) {
        self.remove_ip(detail.dimension.dimension_key(), detail.dimension.ip());
    }

    fn remove_dimension(&self, dimension: &InvocationStatDimension) {
        self.remove_ip(dimension.dimension_key(), dimension.ip());
    }
}
