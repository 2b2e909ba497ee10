use super::types::{FireMetrics, PlannedFireMetrics, Scenario, ScenarioSet};

const MONTHS_PER_YEAR: f64 = 12.0;
const DAYS_PER_YEAR: f64 = 365.0;

/// Net worth needed to fund `annual_expenses` at `withdrawal_rate` percent.
/// Zero when the rate is zero.
pub fn fire_number(annual_expenses: f64, withdrawal_rate: f64) -> f64 {
    if withdrawal_rate == 0.0 {
        return 0.0;
    }
    annual_expenses / (withdrawal_rate / 100.0)
}

fn progress_to_fi(net_worth: f64, fire_number: f64) -> f64 {
    if fire_number == 0.0 {
        return 0.0;
    }
    net_worth / fire_number * 100.0
}

pub fn calculate_fire_metrics(
    net_worth: f64,
    annual_expenses: f64,
    withdrawal_rate: f64,
) -> FireMetrics {
    let fire_number = fire_number(annual_expenses, withdrawal_rate);
    let annual_allowance = net_worth * (withdrawal_rate / 100.0);
    let current_wr = if net_worth == 0.0 {
        0.0
    } else {
        annual_expenses / net_worth * 100.0
    };
    let years_of_expenses = if current_wr == 0.0 {
        0.0
    } else {
        1.0 / (current_wr / 100.0)
    };

    FireMetrics {
        current_net_worth: net_worth,
        annual_expenses,
        withdrawal_rate,
        fire_number,
        progress_to_fi: progress_to_fi(net_worth, fire_number),
        annual_allowance,
        monthly_allowance: annual_allowance / MONTHS_PER_YEAR,
        daily_allowance: annual_allowance / DAYS_PER_YEAR,
        current_wr,
        years_of_expenses,
    }
}

/// FIRE number and progress against a hypothetical post-retirement spending level.
pub fn calculate_planned_fire_metrics(
    net_worth: f64,
    planned_annual_expenses: f64,
    withdrawal_rate: f64,
) -> PlannedFireMetrics {
    let planned_fire_number = fire_number(planned_annual_expenses, withdrawal_rate);
    PlannedFireMetrics {
        planned_fire_number,
        planned_progress_to_fi: progress_to_fi(net_worth, planned_fire_number),
    }
}

pub fn default_scenarios() -> ScenarioSet {
    ScenarioSet {
        bear: Scenario {
            name: "bear".to_string(),
            growth_rate: 4.0,
            inflation_rate: 3.5,
        },
        base: Scenario {
            name: "base".to_string(),
            growth_rate: 7.0,
            inflation_rate: 2.5,
        },
        bull: Scenario {
            name: "bull".to_string(),
            growth_rate: 10.0,
            inflation_rate: 1.5,
        },
    }
}
