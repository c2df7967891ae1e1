//! Common types shared by the policy engine and the simulator driver.

pub mod error;

pub use error::{SimulatorError, SimulatorResult};
