use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI32, AtomicU8, Ordering};

/// `DEFAULT_WEIGHT` is the weight of a provider registered without one.
pub const DEFAULT_WEIGHT: i32 = 100;

/// `ProviderStatus` is the lifecycle status of a provider as seen by the load balancer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ProviderStatus {
    Available = 0,
    /// During warm up the weight follows its own ramp-up curve,
    /// it is never touched by degrade or recover.
    WarmingUp = 1,
    Degraded = 2,
    Recovering = 3,
}

impl Default for ProviderStatus {
    fn default() -> ProviderStatus {
        ProviderStatus::Available
    }
}

impl From<u8> for ProviderStatus {
    fn from(v: u8) -> Self {
        match v {
            1 => ProviderStatus::WarmingUp,
            2 => ProviderStatus::Degraded,
            3 => ProviderStatus::Recovering,
            _ => ProviderStatus::Available,
        }
    }
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// `ProviderInfo` is one provider instance a consumer can route calls to.
/// Weight and status are independent atomics, so that the load balancer reading them
/// on every request never waits on a regulation in progress.
#[derive(Debug)]
pub struct ProviderInfo {
    host: String,
    port: u16,
    /// `static_weight` is the weight the provider was registered with.
    static_weight: i32,
    weight: AtomicI32,
    status: AtomicU8,
}

impl ProviderInfo {
    pub fn new<H: Into<String>>(host: H, port: u16, weight: i32) -> Self {
        ProviderInfo {
            host: host.into(),
            port,
            static_weight: weight,
            weight: AtomicI32::new(weight),
            status: AtomicU8::new(ProviderStatus::Available as u8),
        }
    }

    pub fn with_status(self, status: ProviderStatus) -> Self {
        self.set_status(status);
        self
    }

    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// `address` formats the provider as `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[inline]
    pub fn static_weight(&self) -> i32 {
        self.static_weight
    }

    #[inline]
    pub fn weight(&self) -> i32 {
        self.weight.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn set_weight(&self, weight: i32) {
        self.weight.store(weight, Ordering::SeqCst);
    }

    #[inline]
    pub fn status(&self) -> ProviderStatus {
        self.status.load(Ordering::SeqCst).into()
    }

    #[inline]
    pub fn set_status(&self, status: ProviderStatus) {
        self.status.store(status as u8, Ordering::SeqCst);
    }
}

impl fmt::Display for ProviderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}(weight: {}, status: {})",
            self.host,
            self.port,
            self.weight(),
            self.status()
        )
    }
}
