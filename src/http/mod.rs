pub mod charset;
pub mod httpcache;
pub mod request;
pub mod response;

// Re-exports for convenience
pub use request::{PoolRequest, PoolRequestBuilder};
pub use response::PoolResponse;
