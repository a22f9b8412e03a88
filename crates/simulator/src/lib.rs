//! Block Simulator
//!
//! Ready-made scenarios on top of `blocksim-simulation`.
//!
//! # Architecture
//!
//! - **Configuration**: [`SimulatorConfig`] describes a scenario, its layout
//!   and its network parameters
//! - **Block codes**: [`RelayCode`] floods over point-to-point links and
//!   [`BeaconCode`] broadcasts periodic beacons
//! - **Reports**: [`SimulationReport`] gathers scheduler, network and
//!   per-block results, printable or as JSON
//!
//! # Example
//!
//! ```ignore
//! use blocksim_simulator::{Scenario, Simulator, SimulatorConfig};
//!
//! let config = SimulatorConfig::new(Scenario::Flood, 16).with_seed(42);
//! let report = Simulator::new(config)?.run()?;
//!
//! println!("reached {} blocks by {}", report.reached(), report.final_time);
//! ```

pub mod codes;
pub mod config;
pub mod error;
pub mod report;
pub mod runner;

pub use codes::{BeaconCode, RelayCode, Trigger};
pub use config::{Scenario, SimulatorConfig};
pub use error::SimulatorError;
pub use report::{BlockReport, SimulationReport};
pub use runner::Simulator;
