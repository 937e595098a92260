use serde::{Deserialize, Serialize};

/// `ConsumerConfig` identifies the consumer side of an invocation:
/// the calling application and the service it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct ConsumerConfig {
    pub app_name: String,
    pub interface_id: String,
    /// `unique_id` tells apart several references to the same interface.
    pub unique_id: String,
}

impl ConsumerConfig {
    pub fn new<A: Into<String>, I: Into<String>>(app_name: A, interface_id: I) -> Self {
        ConsumerConfig {
            app_name: app_name.into(),
            interface_id: interface_id.into(),
            unique_id: String::new(),
        }
    }

    pub fn with_unique_id<U: Into<String>>(mut self, unique_id: U) -> Self {
        self.unique_id = unique_id.into();
        self
    }

    /// `service_unique_name` is the interface id, suffixed by the unique id if there is one.
    pub fn service_unique_name(&self) -> String {
        if self.unique_id.is_empty() {
            self.interface_id.clone()
        } else {
            format!("{}:{}", self.interface_id, self.unique_id)
        }
    }
}
