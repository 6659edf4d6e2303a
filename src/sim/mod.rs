/*!
 * Scenario Driver
 * Seeded synthetic MAC, scenario files and allocation traces
 */

mod driver;
mod scenario;
mod trace;

pub use driver::Simulation;
pub use scenario::{RachEvent, Scenario, TrafficModel, UeScenario};
pub use trace::{AllocationTrace, SimulationReport, TtiRecord, UeReport};
