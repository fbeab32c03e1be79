pub mod http;
pub mod metrics;
pub mod tracing_setup;

pub use http::*;
pub use metrics::*;
pub use tracing_setup::*;
