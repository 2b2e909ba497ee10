use tracing::debug;

use super::error::{EngineError, ensure_finite};
use super::metrics::fire_number;
use super::types::{ProjectionResult, ProjectionYear, Scenario, ScenarioSet, ScenarioYear};

/// Years kept after the slowest scenario reaches FIRE before the run stops early.
pub const POST_FIRE_TAIL_YEARS: u32 = 5;

/// Running state of one scenario across simulated years.
#[derive(Copy, Clone, Debug)]
struct ScenarioState {
    growth: f64,
    inflation: f64,
    net_worth: f64,
    expenses: f64,
    years_to_fire: Option<u32>,
}

impl ScenarioState {
    fn new(scenario: &Scenario, initial_net_worth: f64, initial_expenses: f64) -> Self {
        Self {
            growth: scenario.growth_rate / 100.0,
            inflation: scenario.inflation_rate / 100.0,
            net_worth: initial_net_worth,
            expenses: initial_expenses,
            years_to_fire: None,
        }
    }

    fn advance(&mut self, year: u32, annual_savings: f64, withdrawal_rate: f64) -> ScenarioYear {
        self.net_worth *= 1.0 + self.growth;
        if self.years_to_fire.is_none() {
            self.net_worth += annual_savings;
        }
        self.expenses *= 1.0 + self.inflation;

        let fire_number = fire_number(self.expenses, withdrawal_rate);
        if self.years_to_fire.is_none() && self.net_worth >= fire_number {
            self.years_to_fire = Some(year);
        }

        ScenarioYear {
            net_worth: self.net_worth,
            expenses: self.expenses,
            fire_number,
            fire_reached: self.years_to_fire.is_some(),
        }
    }
}

fn validate_projection_inputs(
    initial_net_worth: f64,
    initial_expenses: f64,
    annual_savings: f64,
    withdrawal_rate: f64,
    scenarios: &ScenarioSet,
) -> Result<(), EngineError> {
    ensure_finite("initialNetWorth", initial_net_worth)?;
    ensure_finite("initialExpenses", initial_expenses)?;
    ensure_finite("annualSavings", annual_savings)?;
    ensure_finite("withdrawalRate", withdrawal_rate)?;
    if withdrawal_rate < 0.0 {
        return Err(EngineError::validation("withdrawalRate", "must be >= 0"));
    }

    for scenario in scenarios.iter() {
        ensure_finite("scenarios.growthRate", scenario.growth_rate)?;
        ensure_finite("scenarios.inflationRate", scenario.inflation_rate)?;
        if scenario.growth_rate <= -100.0 {
            return Err(EngineError::validation(
                "scenarios.growthRate",
                format!("{} growth rate must be > -100", scenario.name),
            ));
        }
        if scenario.inflation_rate <= -100.0 {
            return Err(EngineError::validation(
                "scenarios.inflationRate",
                format!("{} inflation rate must be > -100", scenario.name),
            ));
        }
    }
    Ok(())
}

/// Year-by-year net worth projection under the bear, base and bull scenarios.
///
/// Savings stop flowing into a scenario once it has reached FIRE. The run ends
/// early once every scenario has reached FIRE and the slowest one is
/// [`POST_FIRE_TAIL_YEARS`] years behind the current year.
pub fn calculate_fire_projection(
    initial_net_worth: f64,
    initial_expenses: f64,
    annual_savings: f64,
    withdrawal_rate: f64,
    scenarios: &ScenarioSet,
    horizon_years: u32,
) -> Result<ProjectionResult, EngineError> {
    validate_projection_inputs(
        initial_net_worth,
        initial_expenses,
        annual_savings,
        withdrawal_rate,
        scenarios,
    )?;

    let mut bear = ScenarioState::new(&scenarios.bear, initial_net_worth, initial_expenses);
    let mut base = ScenarioState::new(&scenarios.base, initial_net_worth, initial_expenses);
    let mut bull = ScenarioState::new(&scenarios.bull, initial_net_worth, initial_expenses);

    let mut yearly_data = Vec::with_capacity(horizon_years as usize);
    for year in 1..=horizon_years {
        yearly_data.push(ProjectionYear {
            year,
            bear: bear.advance(year, annual_savings, withdrawal_rate),
            base: base.advance(year, annual_savings, withdrawal_rate),
            bull: bull.advance(year, annual_savings, withdrawal_rate),
        });

        if let (Some(a), Some(b), Some(c)) =
            (bear.years_to_fire, base.years_to_fire, bull.years_to_fire)
        {
            let slowest = a.max(b).max(c);
            if year >= slowest + POST_FIRE_TAIL_YEARS {
                debug!(year, slowest, horizon_years, "projection stopped early");
                break;
            }
        }
    }

    Ok(ProjectionResult {
        yearly_data,
        bear_years_to_fire: bear.years_to_fire,
        base_years_to_fire: base.years_to_fire,
        bull_years_to_fire: bull.years_to_fire,
        annual_savings,
        initial_net_worth,
        initial_expenses,
        withdrawal_rate,
        horizon_years,
        scenarios: scenarios.clone(),
    })
}
