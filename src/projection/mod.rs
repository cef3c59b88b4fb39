//! Earnings timeline, discounting, and aggregation into the final result

mod discount;
mod timeline;
mod results;

pub use discount::{discount_factor, DiscountCurve};
pub use timeline::{TimelineBuilder, TimelineInputs};
pub use results::{LossSummary, PipelineResult, TimelineEntry};
