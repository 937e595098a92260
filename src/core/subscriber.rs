//! The call sites report the outcome of each invocation to the `FaultToleranceSubscriber`.

use crate::{
    base::{ConsumerConfig, ProviderInfo},
    config::FaultToleranceConfigManager,
    stat::InvocationStatFactory,
};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// `RpcErrorType` classifies the errors an invocation may end with.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RpcErrorType {
    ClientTimeout,
    ClientRouter,
    ClientSerialize,
    ClientUndeclared,
    ServerBusy,
    ServerDeserialize,
    ServerUndeclared,
    /// Errors thrown by the business logic of the service.
    ServerBiz,
    Unknown,
}

impl RpcErrorType {
    /// `is_endpoint_fault` tells whether the error is evidence of an unhealthy provider.
    /// Business errors and errors raised before any provider is called are not.
    pub fn is_endpoint_fault(&self) -> bool {
        matches!(self, RpcErrorType::ClientTimeout | RpcErrorType::ServerBusy)
    }
}

#[derive(Debug, Clone)]
pub struct RpcError {
    error_type: RpcErrorType,
    message: String,
}

impl RpcError {
    pub fn new<M: Into<String>>(error_type: RpcErrorType, message: M) -> Self {
        RpcError {
            error_type,
            message: message.into(),
        }
    }

    #[inline]
    pub fn error_type(&self) -> RpcErrorType {
        self.error_type
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.error_type, self.message)
    }
}

impl StdError for RpcError {}

/// `FaultToleranceSubscriber` records the outcome of each invocation into its `InvocationStat`.
/// It is a no-op while fault tolerance is disabled for every application.
pub struct FaultToleranceSubscriber {
    config: Arc<FaultToleranceConfigManager>,
    stats: Arc<InvocationStatFactory>,
}

impl FaultToleranceSubscriber {
    pub fn new(config: Arc<FaultToleranceConfigManager>, stats: Arc<InvocationStatFactory>) -> Self {
        FaultToleranceSubscriber { config, stats }
    }

    pub fn on_response(
        &self,
        consumer: &Arc<ConsumerConfig>,
        provider: &Arc<ProviderInfo>,
        error: Option<&RpcError>,
    ) {
        if !self.config.is_enable() {
            return;
        }
        let stat = self.stats.get_invocation_stat(consumer, provider);
        stat.invoke();
        if let Some(error) = error {
            if error.error_type().is_endpoint_fault() {
                stat.catch_exception();
            }
        }
    }
}
