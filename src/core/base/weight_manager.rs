use super::{ProviderInfo, ProviderStatus};

/// `ProviderInfoWeightManager` is the single point where regulation mutates a provider.
/// Each method stores the status and the weight, no business logic lives here.
/// The returned flag is always `true` for now.
pub struct ProviderInfoWeightManager;

impl ProviderInfoWeightManager {
    pub fn degrade_weight(provider: &ProviderInfo, weight: i32) -> bool {
        provider.set_status(ProviderStatus::Degraded);
        provider.set_weight(weight);
        true
    }

    pub fn recover_weight(provider: &ProviderInfo, weight: i32) -> bool {
        provider.set_status(ProviderStatus::Recovering);
        provider.set_weight(weight);
        true
    }

    pub fn recover_origin_weight(provider: &ProviderInfo, origin_weight: i32) -> bool {
        provider.set_status(ProviderStatus::Available);
        provider.set_weight(origin_weight);
        true
    }

    /// `get_weight` returns -1 for a missing provider.
    pub fn get_weight(provider: Option<&ProviderInfo>) -> i32 {
        match provider {
            Some(provider) => provider.weight(),
            None => -1,
        }
    }
}
