//! trackcast Scenario Harness
//!
//! Drives the view engine against recording map and chart surfaces:
//! - **Scenarios**: named end-to-end checks over scripted and generated data
//! - **Generator**: seeded routes and weather, including gaps and bad values
//! - **Replay**: recorded server pushes from a JSON file, or a generated ride
//!
//! # Usage
//!
//! ```ignore
//! use trackcast_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let runner = ScenarioRunner::new(42).with_points(120);
//! let result = runner.run(ScenarioId::ChartActivation);
//! assert!(result.passed);
//! ```

mod error;
mod generator;
mod replay;
mod runner;
pub mod scenarios;

pub use error::SimError;
pub use generator::RouteGenerator;
pub use replay::{generate_replay, parse_replay, replay, replay_file, ReplayEntry, ReplaySummary};
pub use runner::{Harness, ScenarioMetrics, ScenarioResult, ScenarioRunner};
