use crate::config::AbcThresholds;
use crate::error::{ReportError, Result};
use crate::types::{
    AbcClass, AbcClassification, AbcPreviewRow, ClassSummary, DetailPreviewRow, DetailRow,
    PriceExtremeRecord, PricePoint, ProductAggregate, ReportWorkbook, SalesRecord, SalesTable,
    SummaryStats,
};
use crate::util::{average, format_number, format_opt, format_pct, safe_ratio};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, info};

/// Group rows by product key, keeping groups in order of first appearance.
pub fn group_by_key(table: &SalesTable) -> Vec<(&str, Vec<&SalesRecord>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<&SalesRecord>)> = Vec::new();
    for r in &table.records {
        let slot = *index.entry(r.key.as_str()).or_insert_with(|| {
            groups.push((r.key.as_str(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(r);
    }
    groups
}

/// Bracket a cumulative share. Each upper bound is inclusive.
pub fn classify_share(cumulative_share: f64, thresholds: &AbcThresholds) -> AbcClass {
    if cumulative_share <= thresholds.a {
        AbcClass::A
    } else if cumulative_share <= thresholds.b {
        AbcClass::B
    } else {
        AbcClass::C
    }
}

/// ABC classification by cumulative revenue share.
///
/// Description and line come from the first row seen for each product.
/// Products with equal revenue keep their input order.
pub fn classify_abc(table: &SalesTable, thresholds: &AbcThresholds) -> Result<AbcClassification> {
    if table.is_empty() {
        return Err(ReportError::EmptyInput(
            "ABC classification needs at least one sales row".to_string(),
        ));
    }

    let mut products: Vec<ProductAggregate> = group_by_key(table)
        .into_iter()
        .map(|(key, rows)| {
            let first = rows[0];
            ProductAggregate {
                key: key.to_string(),
                total: rows.iter().map(|r| r.total).sum(),
                quantity: rows.iter().map(|r| r.quantity).sum(),
                description: first.description.clone(),
                line: first.line.clone(),
                share: 0.0,
                cumulative_share: 0.0,
                class: AbcClass::C,
            }
        })
        .collect();

    // `sort_by` is stable, so ties stay in first-appearance order.
    products.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(Ordering::Equal));

    let grand_total: f64 = products.iter().map(|p| p.total).sum();
    if grand_total <= 0.0 {
        return Err(ReportError::EmptyInput(format!(
            "ABC classification needs positive total revenue, got {}",
            grand_total
        )));
    }

    let mut running = 0.0;
    for p in &mut products {
        running += p.total;
        p.share = p.total / grand_total;
        p.cumulative_share = running / grand_total;
        p.class = classify_share(p.cumulative_share, thresholds);
    }

    info!(
        products = products.len(),
        grand_total, "ABC classification complete"
    );
    Ok(AbcClassification {
        products,
        grand_total,
    })
}

/// Quantity, margin and cost over every row of one product sold at exactly `price`.
fn price_point(rows: &[&SalesRecord], price: f64, has_cost: bool) -> PricePoint {
    let matching: Vec<&SalesRecord> = rows
        .iter()
        .copied()
        .filter(|r| r.unit_price == price)
        .collect();
    let quantity: f64 = matching.iter().map(|r| r.quantity).sum();
    let total_margin: f64 = matching.iter().map(|r| r.unit_margin * r.quantity).sum();
    let avg_cost = if has_cost {
        let costs: Vec<f64> = matching.iter().filter_map(|r| r.unit_cost).collect();
        (!costs.is_empty()).then(|| average(&costs))
    } else {
        None
    };
    PricePoint {
        price,
        quantity,
        total_margin,
        margin_pct: safe_ratio(total_margin, price * quantity),
        avg_cost,
    }
}

/// Per-product quantity, margin and average cost at the lowest and highest
/// observed unit price. Rows sharing the extreme price are combined.
pub fn analyze_price_extremes(table: &SalesTable) -> Vec<PriceExtremeRecord> {
    group_by_key(table)
        .into_iter()
        .map(|(key, rows)| {
            let min_price = rows.iter().map(|r| r.unit_price).fold(f64::INFINITY, f64::min);
            let max_price = rows
                .iter()
                .map(|r| r.unit_price)
                .fold(f64::NEG_INFINITY, f64::max);
            let min = price_point(&rows, min_price, table.has_cost);
            let max = price_point(&rows, max_price, table.has_cost);
            if min.margin_pct.is_none() || max.margin_pct.is_none() {
                debug!(key, "margin percentage unavailable at an extreme price");
            }
            PriceExtremeRecord {
                key: key.to_string(),
                min,
                max,
            }
        })
        .collect()
}

/// Left join of the classification with the price extremes on product key.
/// Every classified product yields exactly one row.
pub fn assemble_detail(
    classification: &AbcClassification,
    extremes: &[PriceExtremeRecord],
) -> Vec<DetailRow> {
    let by_key: HashMap<&str, &PriceExtremeRecord> =
        extremes.iter().map(|e| (e.key.as_str(), e)).collect();

    classification
        .products
        .iter()
        .map(|p| {
            let ext = by_key.get(p.key.as_str()).copied();
            DetailRow {
                key: p.key.clone(),
                description: p.description.clone(),
                line: p.line.clone(),
                class: p.class,
                quantity: p.quantity,
                total: p.total,
                share: p.share,
                cumulative_share: p.cumulative_share,
                min_price: ext.map(|e| e.min.price),
                quantity_at_min: ext.map(|e| e.min.quantity),
                max_price: ext.map(|e| e.max.price),
                quantity_at_max: ext.map(|e| e.max.quantity),
                margin_total_min: ext.map(|e| e.min.total_margin),
                margin_total_max: ext.map(|e| e.max.total_margin),
                margin_pct_min: ext.and_then(|e| e.min.margin_pct),
                margin_pct_max: ext.and_then(|e| e.max.margin_pct),
                avg_cost_min: ext.and_then(|e| e.min.avg_cost),
                avg_cost_max: ext.and_then(|e| e.max.avg_cost),
            }
        })
        .collect()
}

/// Split into the three class sheets plus the combined detail sheet.
pub fn build_workbook(
    classification: &AbcClassification,
    detail: Vec<DetailRow>,
    has_cost: bool,
) -> ReportWorkbook {
    let of_class = |class: AbcClass| -> Vec<ProductAggregate> {
        classification
            .products
            .iter()
            .filter(|p| p.class == class)
            .cloned()
            .collect()
    };
    ReportWorkbook {
        a: of_class(AbcClass::A),
        b: of_class(AbcClass::B),
        c: of_class(AbcClass::C),
        all: detail,
        has_cost,
    }
}

/// Classify, analyze price extremes, join, and partition.
pub fn generate_report(
    table: &SalesTable,
    thresholds: &AbcThresholds,
) -> Result<(AbcClassification, ReportWorkbook)> {
    let classification = classify_abc(table, thresholds)?;
    let extremes = analyze_price_extremes(table);
    let detail = assemble_detail(&classification, &extremes);
    let workbook = build_workbook(&classification, detail, table.has_cost);
    info!(
        a = workbook.a.len(),
        b = workbook.b.len(),
        c = workbook.c.len(),
        "report workbook assembled"
    );
    Ok((classification, workbook))
}

pub fn generate_summary(table: &SalesTable, classification: &AbcClassification) -> SummaryStats {
    let classes = AbcClass::ALL
        .iter()
        .map(|&class| {
            let members = classification.products.iter().filter(|p| p.class == class);
            let (products, revenue) = members.fold((0usize, 0.0), |(n, sum), p| (n + 1, sum + p.total));
            ClassSummary {
                class,
                products,
                revenue,
            }
        })
        .collect();
    SummaryStats {
        total_rows: table.len(),
        total_products: classification.products.len(),
        grand_total: classification.grand_total,
        classes,
    }
}

pub fn abc_preview(products: &[ProductAggregate]) -> Vec<AbcPreviewRow> {
    products
        .iter()
        .map(|p| AbcPreviewRow {
            key: p.key.clone(),
            description: p.description.clone(),
            class: p.class.to_string(),
            total: format_number(p.total, 2),
            cumulative_share: format_pct(p.cumulative_share),
        })
        .collect()
}

pub fn detail_preview(rows: &[DetailRow]) -> Vec<DetailPreviewRow> {
    rows.iter()
        .map(|r| DetailPreviewRow {
            key: r.key.clone(),
            class: r.class.to_string(),
            min_price: format_opt(r.min_price, 2),
            quantity_at_min: format_opt(r.quantity_at_min, 0),
            max_price: format_opt(r.max_price, 2),
            quantity_at_max: format_opt(r.quantity_at_max, 0),
            margin_pct_min: r.margin_pct_min.map(format_pct).unwrap_or_default(),
            margin_pct_max: r.margin_pct_max.map(format_pct).unwrap_or_default(),
        })
        .collect()
}
