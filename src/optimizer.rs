use crate::config::OptimizerConfig;
use crate::error::{ReportError, Result};
use crate::regression::build_regressor;
use crate::reports::group_by_key;
use crate::types::{DemandCurveSample, OptimizationResult, SalesRecord, SalesTable};
use crate::util::{average, linspace};
use std::collections::HashSet;
use tracing::{debug, info};

/// The product with the most transaction rows; ties go to the first one seen.
pub fn select_product(table: &SalesTable) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for (key, rows) in group_by_key(table) {
        if best.map_or(true, |(_, n)| rows.len() > n) {
            best = Some((key, rows.len()));
        }
    }
    best.map(|(key, _)| key.to_string())
}

/// First grid index holding the maximum profit.
fn argmax_first(samples: &[DemandCurveSample]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, s) in samples.iter().enumerate() {
        match best {
            Some(b) if s.profit <= samples[b].profit => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Fit a demand curve for `key` and grid-search the profit-maximizing price.
pub fn optimize_price(
    table: &SalesTable,
    key: &str,
    cfg: &OptimizerConfig,
) -> Result<OptimizationResult> {
    cfg.validate()?;
    let rows: Vec<&SalesRecord> = table.rows_for(key).collect();
    if rows.is_empty() {
        return Err(ReportError::MalformedInput(format!(
            "product {} has no sales rows",
            key
        )));
    }
    if !table.has_cost {
        return Err(ReportError::MalformedInput(format!(
            "price optimization for {} needs the Costo column",
            key
        )));
    }

    let prices: Vec<f64> = rows.iter().map(|r| r.unit_price).collect();
    let quantities: Vec<f64> = rows.iter().map(|r| r.quantity).collect();
    let distinct_prices = prices
        .iter()
        .map(|p| (p + 0.0).to_bits())
        .collect::<HashSet<_>>()
        .len();
    if distinct_prices < 2 {
        return Err(ReportError::InsufficientData {
            key: key.to_string(),
            distinct_prices,
        });
    }

    let costs: Vec<f64> = rows.iter().filter_map(|r| r.unit_cost).collect();
    let average_cost = average(&costs);

    let mut model = build_regressor(&cfg.regressor);
    model.fit(&prices, &quantities);
    debug!(key, rows = rows.len(), distinct_prices, "demand model fitted");

    let min_p = prices.iter().copied().fold(f64::INFINITY, f64::min);
    let max_p = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let grid = linspace(
        min_p * cfg.low_multiplier,
        max_p * cfg.high_multiplier,
        cfg.grid_size,
    );
    let demand = model.predict_many(&grid);

    let curve: Vec<DemandCurveSample> = grid
        .iter()
        .zip(demand)
        .map(|(&price, predicted_quantity)| DemandCurveSample {
            price,
            predicted_quantity,
            profit: (price - average_cost) * predicted_quantity,
        })
        .collect();

    let best = argmax_first(&curve).ok_or_else(|| ReportError::InsufficientData {
        key: key.to_string(),
        distinct_prices,
    })?;
    let optimal = curve[best];
    info!(
        key,
        optimal_price = optimal.price,
        max_profit = optimal.profit,
        "price optimization complete"
    );

    Ok(OptimizationResult {
        key: key.to_string(),
        average_cost,
        optimal_price: optimal.price,
        max_profit: optimal.profit,
        curve,
    })
}

/// Optimize the explicitly requested product, or the busiest one.
pub fn optimize(
    table: &SalesTable,
    key: Option<&str>,
    cfg: &OptimizerConfig,
) -> Result<OptimizationResult> {
    let key = match key {
        Some(k) => k.to_string(),
        None => select_product(table).ok_or_else(|| {
            ReportError::EmptyInput("price optimization needs at least one sales row".to_string())
        })?,
    };
    optimize_price(table, &key, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegressorKind;
    use chrono::NaiveDate;

    fn rec(key: &str, qty: f64, price: f64, cost: f64) -> SalesRecord {
        SalesRecord {
            key: key.to_string(),
            description: String::new(),
            line: String::new(),
            date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            quantity: qty,
            unit_price: price,
            unit_margin: price - cost,
            unit_cost: Some(cost),
            total: qty * price,
        }
    }

    fn demand_table() -> SalesTable {
        SalesTable::new(
            vec![
                rec("Y", 1.0, 50.0, 5.0),
                rec("X", 100.0, 10.0, 6.0),
                rec("X", 80.0, 12.0, 6.0),
                rec("X", 60.0, 14.0, 6.0),
                rec("X", 40.0, 16.0, 6.0),
                rec("X", 20.0, 18.0, 6.0),
            ],
            true,
        )
    }

    #[test]
    fn selects_product_with_most_rows() {
        assert_eq!(select_product(&demand_table()).as_deref(), Some("X"));
        let tie = SalesTable::new(vec![rec("B", 1.0, 1.0, 0.5), rec("A", 1.0, 1.0, 0.5)], true);
        assert_eq!(select_product(&tie).as_deref(), Some("B"));
        assert_eq!(select_product(&SalesTable::default()), None);
    }

    #[test]
    fn single_price_is_insufficient() {
        let table = SalesTable::new(vec![rec("S", 3.0, 9.0, 4.0), rec("S", 5.0, 9.0, 4.0)], true);
        let err = optimize_price(&table, "S", &OptimizerConfig::default()).unwrap_err();
        match err {
            ReportError::InsufficientData {
                key,
                distinct_prices,
            } => {
                assert_eq!(key, "S");
                assert_eq!(distinct_prices, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn signed_zero_prices_count_once() {
        let table = SalesTable::new(vec![rec("Z", 3.0, 0.0, 1.0), rec("Z", 5.0, -0.0, 1.0)], true);
        assert!(matches!(
            optimize_price(&table, "Z", &OptimizerConfig::default()),
            Err(ReportError::InsufficientData { distinct_prices: 1, .. })
        ));
    }

    #[test]
    fn optimal_price_lies_in_grid_range() {
        let table = demand_table();
        let cfg = OptimizerConfig::default();
        let res = optimize(&table, None, &cfg).unwrap();
        assert_eq!(res.key, "X");
        assert_eq!(res.curve.len(), 100);
        assert!((res.average_cost - 6.0).abs() < 1e-12);
        assert!(res.optimal_price >= 10.0 * 0.8 - 1e-9);
        assert!(res.optimal_price <= 18.0 * 1.2 + 1e-9);
        assert!((res.curve[0].price - 8.0).abs() < 1e-9);
        assert!((res.curve[99].price - 21.6).abs() < 1e-9);
        let top = res.curve.iter().map(|s| s.profit).fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(res.max_profit, top);
    }

    #[test]
    fn linear_model_finds_interior_optimum() {
        // q = 150 - 5p, cost 6 => profit peaks at p = 18
        let rows = (0..5)
            .map(|i| {
                let p = 10.0 + 2.0 * i as f64;
                rec("L", 150.0 - 5.0 * p, p, 6.0)
            })
            .collect();
        let table = SalesTable::new(rows, true);
        let cfg = OptimizerConfig {
            regressor: RegressorKind::Linear,
            grid_size: 1001,
            ..OptimizerConfig::default()
        };
        let res = optimize_price(&table, "L", &cfg).unwrap();
        assert!((res.optimal_price - 18.0).abs() < 0.05);
    }

    #[test]
    fn ties_pick_lowest_price() {
        let flat = vec![
            DemandCurveSample { price: 1.0, predicted_quantity: 1.0, profit: 5.0 },
            DemandCurveSample { price: 2.0, predicted_quantity: 1.0, profit: 7.0 },
            DemandCurveSample { price: 3.0, predicted_quantity: 1.0, profit: 7.0 },
        ];
        assert_eq!(argmax_first(&flat), Some(1));
    }

    #[test]
    fn missing_cost_column_is_reported() {
        let mut table = demand_table();
        table.has_cost = false;
        assert!(matches!(
            optimize_price(&table, "X", &OptimizerConfig::default()),
            Err(ReportError::MalformedInput(_))
        ));
    }

    #[test]
    fn unknown_key_is_reported() {
        assert!(matches!(
            optimize(&demand_table(), Some("NOPE"), &OptimizerConfig::default()),
            Err(ReportError::MalformedInput(_))
        ));
    }
}
