use super::error::InvalidInput;
use super::types::{
    CoinsuranceRates, CoveragePhase, DrugCost, MonthRecord, PhaseSummary, PlanParameters,
    SimulationResult,
};

pub const MONTHS_PER_YEAR: u32 = 12;

pub fn project(
    drugs: &[DrugCost],
    plan: &PlanParameters,
) -> Result<SimulationResult, InvalidInput> {
    project_with_rates(drugs, plan, &CoinsuranceRates::default())
}

/// Projects one plan year of out-of-pocket drug spending.
///
/// A month is priced by the phase reached at the end of the previous month
/// (`balance >= limit`), while the entry-month markers fire on the month
/// whose fills push the running total past a limit (`balance > limit`). A
/// marker therefore lands one month before the first month priced in the new
/// phase, or on that same month when the balance hits the limit exactly.
///
/// The ordering of the two limits is not checked here.
pub fn project_with_rates(
    drugs: &[DrugCost],
    plan: &PlanParameters,
    rates: &CoinsuranceRates,
) -> Result<SimulationResult, InvalidInput> {
    let total_monthly_cost = validate_drugs(drugs)?;
    validate_plan(plan)?;
    validate_rates(rates)?;

    let mut cumulative_retail_spend = 0.0;
    let mut gap_entry_month = None;
    let mut catastrophic_entry_month = None;
    let mut monthly_record = Vec::with_capacity(MONTHS_PER_YEAR as usize);

    for month in 1..=MONTHS_PER_YEAR {
        let phase = phase_for_balance(cumulative_retail_spend, plan);
        let out_of_pocket = total_monthly_cost * coinsurance_for_phase(phase, plan, rates);

        let projected_spend = cumulative_retail_spend + total_monthly_cost;
        if gap_entry_month.is_none() && projected_spend > plan.initial_coverage_limit {
            gap_entry_month = Some(month);
        }
        if catastrophic_entry_month.is_none()
            && projected_spend > plan.catastrophic_coverage_limit
        {
            catastrophic_entry_month = Some(month);
        }
        cumulative_retail_spend = projected_spend;

        monthly_record.push(MonthRecord {
            month,
            phase,
            out_of_pocket_this_month: out_of_pocket,
            plan_paid_this_month: (total_monthly_cost - out_of_pocket).max(0.0),
            cumulative_retail_spend,
        });
    }

    let annual_out_of_pocket = monthly_record
        .iter()
        .map(|record| record.out_of_pocket_this_month)
        .sum::<f64>();
    let annual_plan_paid = monthly_record
        .iter()
        .map(|record| record.plan_paid_this_month)
        .sum::<f64>();
    let phase_summaries = summarize_phases(&monthly_record);

    log::debug!(
        "projected {} drug(s) at {total_monthly_cost}/month: gap entry {gap_entry_month:?}, catastrophic entry {catastrophic_entry_month:?}",
        drugs.len()
    );

    Ok(SimulationResult {
        total_monthly_cost,
        monthly_record,
        gap_entry_month,
        catastrophic_entry_month,
        annual_out_of_pocket,
        annual_plan_paid,
        annual_retail_cost: total_monthly_cost * f64::from(MONTHS_PER_YEAR),
        phase_summaries,
    })
}

fn validate_drugs(drugs: &[DrugCost]) -> Result<f64, InvalidInput> {
    if drugs.is_empty() {
        return Err(InvalidInput::NoDrugs);
    }

    for (index, drug) in drugs.iter().enumerate() {
        if drug.name.trim().is_empty() {
            return Err(InvalidInput::EmptyDrugName { index });
        }
        if !drug.monthly_cost.is_finite() || drug.monthly_cost <= 0.0 {
            return Err(InvalidInput::InvalidMonthlyCost {
                name: drug.name.clone(),
                value: drug.monthly_cost,
            });
        }
    }

    let total = drugs.iter().map(|drug| drug.monthly_cost).sum::<f64>();
    if !total.is_finite() || !(total * f64::from(MONTHS_PER_YEAR)).is_finite() {
        return Err(InvalidInput::TotalCostOverflow);
    }
    Ok(total)
}

fn validate_plan(plan: &PlanParameters) -> Result<(), InvalidInput> {
    for (field, value) in [
        ("initial coverage limit", plan.initial_coverage_limit),
        ("catastrophic coverage limit", plan.catastrophic_coverage_limit),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(InvalidInput::InvalidCoverageLimit { field, value });
        }
    }

    if !(0.0..=100.0).contains(&plan.coverage_gap_discount_percent) {
        return Err(InvalidInput::DiscountOutOfRange(
            plan.coverage_gap_discount_percent,
        ));
    }
    Ok(())
}

fn validate_rates(rates: &CoinsuranceRates) -> Result<(), InvalidInput> {
    for (field, value) in [
        ("initial", rates.initial),
        ("catastrophic", rates.catastrophic),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(InvalidInput::InvalidCoinsuranceRate { field, value });
        }
    }
    Ok(())
}

fn phase_for_balance(balance: f64, plan: &PlanParameters) -> CoveragePhase {
    if balance >= plan.catastrophic_coverage_limit {
        CoveragePhase::Catastrophic
    } else if balance >= plan.initial_coverage_limit {
        CoveragePhase::Gap
    } else {
        CoveragePhase::Initial
    }
}

fn coinsurance_for_phase(
    phase: CoveragePhase,
    plan: &PlanParameters,
    rates: &CoinsuranceRates,
) -> f64 {
    match phase {
        CoveragePhase::Initial => rates.initial,
        CoveragePhase::Gap => 1.0 - plan.coverage_gap_discount_percent / 100.0,
        CoveragePhase::Catastrophic => rates.catastrophic,
    }
}

fn summarize_phases(records: &[MonthRecord]) -> Vec<PhaseSummary> {
    CoveragePhase::ALL
        .iter()
        .filter_map(|&phase| {
            let (months, out_of_pocket) = records
                .iter()
                .filter(|record| record.phase == phase)
                .fold((0u32, 0.0), |(months, total), record| {
                    (months + 1, total + record.out_of_pocket_this_month)
                });
            (months > 0).then_some(PhaseSummary {
                phase,
                months,
                out_of_pocket,
            })
        })
        .collect()
}
