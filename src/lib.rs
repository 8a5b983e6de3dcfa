pub mod config;
pub mod device;
pub mod error;
pub mod gate;
pub mod integrity;
pub mod vault;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::GateConfig;
pub use error::{AppError, AppResult, Halt};
pub use gate::{bootstrap, BootstrapGate};
pub use vault::ConnectionDescriptor;
