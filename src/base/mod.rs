//! Base types and error handling.
//!
//! - [`NetError`](neterror::NetError): Network error codes matching Chromium's `net_error_list.h`,
//!   plus the pool's own codes
//! - [`context`]: IO error to `NetError` mapping

pub mod context;
pub mod neterror;
