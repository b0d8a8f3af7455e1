//! Data series behind the report charts: articles per ABC class, and the
//! daily revenue/quantity/margin lines of one class-A article, one line per month.

use crate::types::{
    AbcClass, AbcClassification, ArticleDaily, ChartData, ClassCount, DailyPoint, MonthSeries,
    SalesTable,
};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use tracing::debug;

/// Article counts for A, B and C, always in that order.
pub fn class_counts(classification: &AbcClassification) -> Vec<ClassCount> {
    AbcClass::ALL
        .iter()
        .map(|&class| ClassCount {
            class,
            count: classification
                .products
                .iter()
                .filter(|p| p.class == class)
                .count(),
        })
        .collect()
}

/// Pick a class-A article at random, or any article when class A is empty.
pub fn pick_article<R: Rng + ?Sized>(
    classification: &AbcClassification,
    rng: &mut R,
) -> Option<String> {
    let class_a: Vec<&str> = classification
        .products
        .iter()
        .filter(|p| p.class == AbcClass::A)
        .map(|p| p.key.as_str())
        .collect();
    let pool: Vec<&str> = if class_a.is_empty() {
        classification.products.iter().map(|p| p.key.as_str()).collect()
    } else {
        class_a
    };
    pool.choose(rng).map(|k| k.to_string())
}

/// Daily sums for one article, grouped by calendar month.
/// Months keep their order of first appearance; days run ascending.
pub fn article_daily(table: &SalesTable, key: &str, description: &str) -> ArticleDaily {
    let mut months: Vec<(String, BTreeMap<NaiveDate, DailyPoint>)> = Vec::new();
    for r in table.rows_for(key) {
        let month = r.date.format("%Y-%m").to_string();
        let slot = match months.iter().position(|(m, _)| *m == month) {
            Some(i) => i,
            None => {
                months.push((month, BTreeMap::new()));
                months.len() - 1
            }
        };
        let day = months[slot].1.entry(r.date).or_insert(DailyPoint {
            date: r.date,
            total: 0.0,
            quantity: 0.0,
            margin: 0.0,
        });
        day.total += r.total;
        day.quantity += r.quantity;
        day.margin += r.unit_margin;
    }

    ArticleDaily {
        key: key.to_string(),
        description: description.to_string(),
        months: months
            .into_iter()
            .map(|(month, days)| MonthSeries {
                month,
                days: days.into_values().collect(),
            })
            .collect(),
    }
}

pub fn build_chart_data(
    table: &SalesTable,
    classification: &AbcClassification,
    seed: Option<u64>,
) -> ChartData {
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let article = pick_article(classification, &mut rng).map(|key| {
        let description = classification
            .products
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.description.as_str())
            .unwrap_or_default();
        debug!(key = %key, "charting daily series");
        article_daily(table, &key, description)
    });
    ChartData {
        class_counts: class_counts(classification),
        article,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AbcThresholds;
    use crate::reports::classify_abc;
    use crate::types::SalesRecord;

    fn rec(key: &str, ymd: (i32, u32, u32), qty: f64, total: f64, margin: f64) -> SalesRecord {
        SalesRecord {
            key: key.to_string(),
            description: format!("{} desc", key),
            line: "L".to_string(),
            date: NaiveDate::from_ymd_opt(ymd.0, ymd.1, ymd.2).unwrap(),
            quantity: qty,
            unit_price: 1.0,
            unit_margin: margin,
            unit_cost: None,
            total,
        }
    }

    fn table() -> SalesTable {
        SalesTable::new(
            vec![
                rec("A1", (2024, 2, 10), 2.0, 900.0, 1.0),
                rec("A1", (2024, 1, 5), 1.0, 50.0, 0.5),
                rec("A1", (2024, 2, 3), 4.0, 20.0, 2.0),
                rec("A1", (2024, 2, 10), 1.0, 30.0, 1.5),
                rec("C1", (2024, 1, 7), 1.0, 10.0, 0.1),
            ],
            false,
        )
    }

    #[test]
    fn counts_list_every_class() {
        let abc = classify_abc(&table(), &AbcThresholds::default()).unwrap();
        let counts = class_counts(&abc);
        let pairs: Vec<(AbcClass, usize)> = counts.iter().map(|c| (c.class, c.count)).collect();
        assert_eq!(pairs, vec![(AbcClass::A, 0), (AbcClass::B, 0), (AbcClass::C, 2)]);
    }

    #[test]
    fn falls_back_to_all_articles_without_class_a() {
        let abc = classify_abc(&table(), &AbcThresholds::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let picked = pick_article(&abc, &mut rng).unwrap();
        assert!(picked == "A1" || picked == "C1");
    }

    #[test]
    fn picks_only_class_a_when_present() {
        let thresholds = AbcThresholds { a: 0.995, b: 0.999 };
        let abc = classify_abc(&table(), &thresholds).unwrap();
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            assert_eq!(pick_article(&abc, &mut rng).as_deref(), Some("A1"));
        }
    }

    #[test]
    fn daily_series_group_by_month() {
        let daily = article_daily(&table(), "A1", "A1 desc");
        let months: Vec<&str> = daily.months.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, vec!["2024-02", "2024-01"]);
        let feb = &daily.months[0].days;
        assert_eq!(feb.len(), 2);
        assert_eq!(feb[0].date, NaiveDate::from_ymd_opt(2024, 2, 3).unwrap());
        assert_eq!(feb[1].total, 930.0);
        assert_eq!(feb[1].quantity, 3.0);
        assert_eq!(feb[1].margin, 2.5);
    }

    #[test]
    fn seeded_charts_are_reproducible() {
        let t = table();
        let abc = classify_abc(&t, &AbcThresholds::default()).unwrap();
        let first = build_chart_data(&t, &abc, Some(42));
        let second = build_chart_data(&t, &abc, Some(42));
        assert_eq!(
            first.article.map(|a| a.key),
            second.article.map(|a| a.key)
        );
    }
}
