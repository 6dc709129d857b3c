pub mod config_sink;
pub mod resource_policy;

pub use config_sink::{ConfigSink, RecordingSink, TracingSink};
pub use resource_policy::{ResourcePolicy, StandardPolicy};
