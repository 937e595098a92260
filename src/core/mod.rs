// endpoint and consumer models, the weight manager
pub mod base;
pub mod config;
// invocation statistics and their factory
pub mod stat;
// measurement of the statistics
pub mod measure;
// regulation of the provider weights
pub mod regulation;
// call site
pub mod subscriber;
