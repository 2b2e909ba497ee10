use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Growth and inflation assumptions for one projection branch. Rates are in percent units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub name: String,
    pub growth_rate: f64,
    pub inflation_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSet {
    pub bear: Scenario,
    pub base: Scenario,
    pub bull: Scenario,
}

impl ScenarioSet {
    /// True when bull grows fastest with the lowest inflation and bear the reverse.
    pub fn is_ordered(&self) -> bool {
        self.bull.growth_rate > self.base.growth_rate
            && self.base.growth_rate > self.bear.growth_rate
            && self.bear.inflation_rate > self.base.inflation_rate
            && self.base.inflation_rate > self.bull.inflation_rate
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        [&self.bear, &self.base, &self.bull].into_iter()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FireMetrics {
    pub current_net_worth: f64,
    pub annual_expenses: f64,
    pub withdrawal_rate: f64,
    pub fire_number: f64,
    #[serde(rename = "progressToFI")]
    pub progress_to_fi: f64,
    pub annual_allowance: f64,
    pub monthly_allowance: f64,
    pub daily_allowance: f64,
    #[serde(rename = "currentWR")]
    pub current_wr: f64,
    pub years_of_expenses: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedFireMetrics {
    pub planned_fire_number: f64,
    #[serde(rename = "plannedProgressToFI")]
    pub planned_progress_to_fi: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioYear {
    pub net_worth: f64,
    pub expenses: f64,
    pub fire_number: f64,
    /// Set once the scenario has reached its FIRE number in this or an earlier year.
    pub fire_reached: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionYear {
    pub year: u32,
    pub bear: ScenarioYear,
    pub base: ScenarioYear,
    pub bull: ScenarioYear,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub yearly_data: Vec<ProjectionYear>,
    #[serde(rename = "bearYearsToFIRE")]
    pub bear_years_to_fire: Option<u32>,
    #[serde(rename = "baseYearsToFIRE")]
    pub base_years_to_fire: Option<u32>,
    #[serde(rename = "bullYearsToFIRE")]
    pub bull_years_to_fire: Option<u32>,
    pub annual_savings: f64,
    pub initial_net_worth: f64,
    pub initial_expenses: f64,
    pub withdrawal_rate: f64,
    pub horizon_years: u32,
    pub scenarios: ScenarioSet,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendRecord {
    pub asset_id: String,
    pub ex_date: NaiveDate,
    pub gross_amount: f64,
    pub net_amount: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub quantity: f64,
    pub current_price: f64,
    pub average_purchase_price: f64,
}

impl Asset {
    pub fn cost_basis(&self) -> f64 {
        self.quantity * self.average_purchase_price
    }

    pub fn market_value(&self) -> f64 {
        self.quantity * self.current_price
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum YieldBasis {
    CostBasis,
    MarketValue,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YieldMetrics {
    pub basis: YieldBasis,
    pub yield_gross: f64,
    pub yield_net: f64,
    pub dividends_gross: f64,
    pub dividends_net: f64,
    pub cost_basis_or_market_value: f64,
    pub asset_count: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub number_of_months: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetWorthPoint {
    pub year: i32,
    pub month: u32,
    pub net_worth: f64,
}

impl NetWorthPoint {
    pub(crate) fn month_index(&self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }

    pub(crate) fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DoublingMode {
    #[default]
    Geometric,
    Threshold,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    /// The baseline multiple (2, 4, 8, ...) in geometric mode, the absolute level in
    /// threshold mode.
    pub threshold_or_multiplier: f64,
    pub start_value: f64,
    pub end_value: f64,
    pub start: NetWorthPoint,
    pub end: NetWorthPoint,
    pub period_label: String,
    pub duration_months: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneInProgress {
    pub threshold_or_multiplier: f64,
    pub target: f64,
    pub start_value: f64,
    pub current_value: f64,
    pub months_elapsed: u32,
    pub progress_percentage: f64,
}

#[derive(Clone, Debug, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoublingTimeSummary {
    pub mode: DoublingMode,
    pub milestones: Vec<Milestone>,
    pub fastest_doubling: Option<Milestone>,
    pub average_months: Option<f64>,
    pub total_doublings: usize,
    pub current_doubling_in_progress: Option<MilestoneInProgress>,
}
