use std::collections::HashSet;

use chrono::NaiveDate;

use super::error::{EngineError, ensure_finite};
use super::types::{Asset, DividendRecord, YieldBasis, YieldMetrics};

const MONTHS_PER_YEAR: f64 = 12.0;

/// Annualized dividend yield against the cost basis of the dividend-paying assets.
pub fn calculate_yoc_metrics(
    dividends: &[DividendRecord],
    assets: &[Asset],
    start_date: NaiveDate,
    end_date: NaiveDate,
    number_of_months: u32,
) -> Result<YieldMetrics, EngineError> {
    calculate_yield(
        YieldBasis::CostBasis,
        dividends,
        assets,
        start_date,
        end_date,
        number_of_months,
    )
}

/// Annualized dividend yield against the market value of the dividend-paying assets.
pub fn calculate_current_yield_metrics(
    dividends: &[DividendRecord],
    assets: &[Asset],
    start_date: NaiveDate,
    end_date: NaiveDate,
    number_of_months: u32,
) -> Result<YieldMetrics, EngineError> {
    calculate_yield(
        YieldBasis::MarketValue,
        dividends,
        assets,
        start_date,
        end_date,
        number_of_months,
    )
}

fn calculate_yield(
    basis: YieldBasis,
    dividends: &[DividendRecord],
    assets: &[Asset],
    start_date: NaiveDate,
    end_date: NaiveDate,
    number_of_months: u32,
) -> Result<YieldMetrics, EngineError> {
    if end_date < start_date {
        return Err(EngineError::validation(
            "endDate",
            "must not be before startDate",
        ));
    }
    if number_of_months == 0 {
        return Err(EngineError::validation("numberOfMonths", "must be > 0"));
    }
    for asset in assets {
        ensure_finite("assets.quantity", asset.quantity)?;
        ensure_finite("assets.currentPrice", asset.current_price)?;
        ensure_finite("assets.averagePurchasePrice", asset.average_purchase_price)?;
    }
    for dividend in dividends {
        ensure_finite("dividends.grossAmount", dividend.gross_amount)?;
        ensure_finite("dividends.netAmount", dividend.net_amount)?;
    }

    let known: HashSet<&str> = assets.iter().map(|a| a.id.as_str()).collect();
    let mut paying: HashSet<&str> = HashSet::new();
    let mut dividends_gross = 0.0;
    let mut dividends_net = 0.0;
    for dividend in dividends {
        if dividend.ex_date < start_date || dividend.ex_date > end_date {
            continue;
        }
        let Some(&asset_id) = known.get(dividend.asset_id.as_str()) else {
            continue;
        };
        dividends_gross += dividend.gross_amount;
        dividends_net += dividend.net_amount;
        paying.insert(asset_id);
    }

    let mut denominator = 0.0;
    let mut asset_count = 0;
    for asset in assets.iter().filter(|a| paying.contains(a.id.as_str())) {
        denominator += match basis {
            YieldBasis::CostBasis => asset.cost_basis(),
            YieldBasis::MarketValue => asset.market_value(),
        };
        asset_count += 1;
    }
    ensure_finite("dividendsGross", dividends_gross)?;
    ensure_finite("dividendsNet", dividends_net)?;
    ensure_finite("costBasisOrMarketValue", denominator)?;

    Ok(YieldMetrics {
        basis,
        yield_gross: annualized_yield(dividends_gross, number_of_months, denominator),
        yield_net: annualized_yield(dividends_net, number_of_months, denominator),
        dividends_gross,
        dividends_net,
        cost_basis_or_market_value: denominator,
        asset_count,
        start_date,
        end_date,
        number_of_months,
    })
}

fn annualized_yield(dividends: f64, number_of_months: u32, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    dividends / f64::from(number_of_months) * MONTHS_PER_YEAR / denominator * 100.0
}
