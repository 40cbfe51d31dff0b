use thiserror::Error;

/// Rejected projector input. Raised before any month is simulated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidInput {
    #[error("at least one drug is required")]
    NoDrugs,

    #[error("drug #{index} has an empty name")]
    EmptyDrugName { index: usize },

    #[error("monthly cost for {name} must be a positive finite number, got {value}")]
    InvalidMonthlyCost { name: String, value: f64 },

    #[error("combined cost of all drugs is not finite over a plan year")]
    TotalCostOverflow,

    #[error("{field} must be a positive finite number, got {value}")]
    InvalidCoverageLimit { field: &'static str, value: f64 },

    #[error("coverage gap discount must be between 0 and 100 percent, got {0}")]
    DiscountOutOfRange(f64),

    #[error("{field} coinsurance must be between 0 and 1, got {value}")]
    InvalidCoinsuranceRate { field: &'static str, value: f64 },
}
