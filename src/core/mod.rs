mod engine;
mod error;
mod types;

pub use engine::{MONTHS_PER_YEAR, project, project_with_rates};
pub use error::InvalidInput;
pub use types::{
    CoinsuranceRates, CoveragePhase, DrugCost, MonthRecord, PhaseSummary, PlanParameters,
    SimulationResult,
};
