pub mod broker;
pub mod config;
pub mod error;
pub mod granularity;
pub mod types;

pub use broker::BrokerClient;
pub use config::Config;
pub use error::{Error, Result};
pub use granularity::granularity_to_duration;
pub use types::*;
