pub mod aggregator;
pub mod dispatcher;

pub use aggregator::{BatchAggregator, RecordOutcome};
pub use dispatcher::Dispatcher;
