use serde::Serialize;

/// Payer-responsibility phase of a plan year. Phases only ever move forward.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoveragePhase {
    Initial,
    Gap,
    Catastrophic,
}

impl CoveragePhase {
    pub const ALL: [CoveragePhase; 3] = [
        CoveragePhase::Initial,
        CoveragePhase::Gap,
        CoveragePhase::Catastrophic,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugCost {
    pub name: String,
    pub monthly_cost: f64,
}

impl DrugCost {
    pub fn new(name: impl Into<String>, monthly_cost: f64) -> Self {
        Self {
            name: name.into(),
            monthly_cost,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanParameters {
    pub initial_coverage_limit: f64,
    pub catastrophic_coverage_limit: f64,
    /// Percent in [0, 100].
    pub coverage_gap_discount_percent: f64,
}

/// Patient coinsurance fractions for the phases whose rate is not derived
/// from the gap discount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoinsuranceRates {
    pub initial: f64,
    pub catastrophic: f64,
}

impl Default for CoinsuranceRates {
    fn default() -> Self {
        Self {
            initial: 0.25,
            catastrophic: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthRecord {
    pub month: u32,
    pub phase: CoveragePhase,
    pub out_of_pocket_this_month: f64,
    pub plan_paid_this_month: f64,
    /// Retail spend to date, including this month's fills.
    pub cumulative_retail_spend: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseSummary {
    pub phase: CoveragePhase,
    pub months: u32,
    pub out_of_pocket: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub total_monthly_cost: f64,
    pub monthly_record: Vec<MonthRecord>,
    pub gap_entry_month: Option<u32>,
    pub catastrophic_entry_month: Option<u32>,
    pub annual_out_of_pocket: f64,
    pub annual_plan_paid: f64,
    pub annual_retail_cost: f64,
    pub phase_summaries: Vec<PhaseSummary>,
}
