//! Payment processor implementations.

pub mod http;
pub mod mock;

pub use http::HttpProcessor;
pub use mock::MockProcessor;
