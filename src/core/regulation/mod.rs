//! Regulation turns the measure results into actions on the providers:
//! abnormal providers are degraded, healthy degraded providers are recovered step by step.
//!
//! Each concern is a trait resolved by alias from the [`StrategyRegistry`],
//! the [`TimeWindowRegulator`] drives them.

mod degrade;
mod recover;
mod registry;
mod regulator;
mod time_window;

pub use degrade::*;
pub use recover::*;
pub use registry::*;
pub use regulator::*;
pub use time_window::*;

use crate::{measure::MeasureResultDetail, stat::InvocationStatDimension, Result};

/// `RegulationStrategy` decides whether a provider may be degraded,
/// and keeps track of the providers degraded per service.
pub trait RegulationStrategy: Send + Sync {
    /// `is_degrade_effective` tells whether degrading really changes weights for the application,
    /// otherwise the degrade strategy only logs.
    fn is_degrade_effective(&self, detail: &MeasureResultDetail) -> bool;
    /// `is_reach_max_degrade_ip_count` registers the provider as degraded unless
    /// the service already has as many degraded providers as allowed.
    fn is_reach_max_degrade_ip_count(&self, detail: &MeasureResultDetail) -> bool;
    fn is_exist_in_the_degrade_list(&self, detail: &MeasureResultDetail) -> bool;
    fn remove_from_degrade_list(&self, detail: &MeasureResultDetail);
    /// `remove_dimension` forgets the provider of a stat which has been removed,
    /// releasing its place in the degrade list of the service.
    fn remove_dimension(&self, dimension: &InvocationStatDimension);
}

/// `DegradeStrategy` acts on an abnormal provider.
pub trait DegradeStrategy: Send + Sync {
    fn degrade(&self, detail: &MeasureResultDetail) -> Result<()>;
}

/// `RecoverStrategy` acts on a healthy provider which has been degraded.
/// It sets `recovered_origin_weight` on the detail once the provider is fully recovered.
pub trait RecoverStrategy: Send + Sync {
    fn recover(&self, detail: &mut MeasureResultDetail) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use mockall::*;

    mock! {
        pub(crate) RegulationStrategy {}
        impl RegulationStrategy for RegulationStrategy {
            fn is_degrade_effective(&self, detail: &MeasureResultDetail) -> bool;
            fn is_reach_max_degrade_ip_count(&self, detail: &MeasureResultDetail) -> bool;
            fn is_exist_in_the_degrade_list(&self, detail: &MeasureResultDetail) -> bool;
            fn remove_from_degrade_list(&self, detail: &MeasureResultDetail);
            fn remove_dimension(&self, dimension: &InvocationStatDimension);
        }
    }

    mock! {
        pub(crate) DegradeStrategy {}
        impl DegradeStrategy for DegradeStrategy {
            fn degrade(&self, detail: &MeasureResultDetail) -> Result<()>;
        }
    }

    mock! {
        pub(crate) RecoverStrategy {}
        impl RecoverStrategy for RecoverStrategy {
            fn recover(&self, detail: &mut MeasureResultDetail) -> Result<()>;
        }
    }
}
