pub mod commands;
pub mod connection_string;
pub mod error;
pub mod provisioning;
pub mod sas;
pub mod telemetry;
pub mod topics;

pub use commands::*;
pub use connection_string::*;
pub use error::*;
pub use provisioning::*;
pub use telemetry::*;
