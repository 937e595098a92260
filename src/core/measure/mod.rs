//! Measurement groups the invocation stats into models,
//! and classifies each provider of a model once its time window has elapsed.

mod model;
mod service_horizontal;

pub use model::*;
pub use service_horizontal::*;

use crate::{stat::InvocationStat, Result};
use std::sync::Arc;

/// `MeasureStrategy` is the trait of measure strategies.
/// `measure()` is only ever called from the measurement scheduler, never concurrently with itself,
/// while the model building methods are called on changes of the stat set.
pub trait MeasureStrategy: Send + Sync {
    /// `measure` classifies every provider of the model in the elapsed window.
    fn measure(&self, model: &Arc<MeasureModel>) -> Result<MeasureResult>;

    /// `build_measure_model` adds the new stat to its model.
    /// A model is only returned when it has been newly created for the stat.
    fn build_measure_model(&self, stat: Arc<InvocationStat>) -> Option<Arc<MeasureModel>>;

    /// `remove_measure_model` drops the stat from its model.
    fn remove_measure_model(&self, stat: &Arc<InvocationStat>);
}
