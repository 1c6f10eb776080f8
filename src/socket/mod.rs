//! Socket and connection management for the network transport.
//!
//! - [`connectjob`]: DNS → TCP → TLS connection flow
//! - [`client`]: TCP / TLS socket wrapper

pub mod client;
pub mod connectjob;
