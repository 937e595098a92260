use crate::base::{ConsumerConfig, ProviderInfo, DEFAULT_WEIGHT};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock, Weak};

/// `InvocationStatDimension` is the identity statistics are kept per:
/// which service of which application calls which provider.
/// The provider is only referred to, it may be removed from the registry at any time.
pub struct InvocationStatDimension {
    provider: Weak<ProviderInfo>,
    consumer: Arc<ConsumerConfig>,
    service: String,
    ip: String,
    dimension_key: OnceLock<String>,
    origin_weight: OnceLock<i32>,
}

impl InvocationStatDimension {
    pub fn new(provider: &Arc<ProviderInfo>, consumer: Arc<ConsumerConfig>) -> Self {
        InvocationStatDimension {
            provider: Arc::downgrade(provider),
            service: consumer.service_unique_name(),
            ip: provider.address(),
            consumer,
            dimension_key: OnceLock::new(),
            origin_weight: OnceLock::new(),
        }
    }

    /// `provider` returns the provider if it still exists.
    #[inline]
    pub fn provider(&self) -> Option<Arc<ProviderInfo>> {
        self.provider.upgrade()
    }

    /// `provider_id` identifies the provider instance, also after it has been dropped.
    #[inline]
    pub(crate) fn provider_id(&self) -> usize {
        self.provider.as_ptr() as usize
    }

    #[inline]
    pub fn consumer(&self) -> &Arc<ConsumerConfig> {
        &self.consumer
    }

    #[inline]
    pub fn app_name(&self) -> &str {
        &self.consumer.app_name
    }

    #[inline]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// `ip` is the `host:port` of the provider, kept after the provider is gone.
    #[inline]
    pub fn ip(&self) -> &str {
        &self.ip
    }

    /// `dimension_key` is `app_name:service`, statistics of the same key are measured together.
    pub fn dimension_key(&self) -> &str {
        self.dimension_key
            .get_or_init(|| format!("{}:{}", self.app_name(), self.service))
    }

    /// `origin_weight` is the weight the provider was registered with, before any degrade.
    /// It is resolved on first use and cached.
    pub fn origin_weight(&self) -> i32 {
        *self.origin_weight.get_or_init(|| match self.provider() {
            Some(provider) => provider.static_weight(),
            None => DEFAULT_WEIGHT,
        })
    }
}

impl PartialEq for InvocationStatDimension {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.provider, &other.provider) && self.consumer == other.consumer
    }
}

impl Eq for InvocationStatDimension {}

impl Hash for InvocationStatDimension {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.provider_id().hash(state);
        self.consumer.hash(state);
    }
}

impl fmt::Debug for InvocationStatDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationStatDimension")
            .field("app_name", &self.app_name())
            .field("service", &self.service)
            .field("ip", &self.ip)
            .finish()
    }
}

impl fmt::Display for InvocationStatDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.dimension_key(), self.ip)
    }
}
