use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::Tabled;

/// One CSV row exactly as read, before validation.
#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Clave")]
    pub clave: Option<String>,
    #[serde(rename = "Des")]
    pub des: Option<String>,
    #[serde(rename = "Linea")]
    pub linea: Option<String>,
    #[serde(rename = "Fecha")]
    pub fecha: Option<String>,
    #[serde(rename = "Cantidad")]
    pub cantidad: Option<String>,
    #[serde(rename = "PrecioUnit")]
    pub precio_unit: Option<String>,
    #[serde(rename = "Margen")]
    pub margen: Option<String>,
    #[serde(rename = "Costo", default)]
    pub costo: Option<String>,
    #[serde(rename = "Total")]
    pub total: Option<String>,
}

/// A validated sales row.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub key: String,
    pub description: String,
    pub line: String,
    pub date: NaiveDate,
    pub quantity: f64,
    pub unit_price: f64,
    pub unit_margin: f64,
    /// `None` only when the input had no `Costo` column.
    pub unit_cost: Option<f64>,
    pub total: f64,
}

/// The normalized table, rows in input order.
#[derive(Debug, Clone, Default)]
pub struct SalesTable {
    pub records: Vec<SalesRecord>,
    pub has_cost: bool,
}

impl SalesTable {
    pub fn new(records: Vec<SalesRecord>, has_cost: bool) -> Self {
        Self { records, has_cost }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows of one product, in input order.
    pub fn rows_for<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a SalesRecord> + 'a {
        self.records.iter().filter(move |r| r.key == key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbcClass {
    A,
    B,
    C,
}

impl AbcClass {
    pub const ALL: [AbcClass; 3] = [AbcClass::A, AbcClass::B, AbcClass::C];

    pub fn as_str(&self) -> &'static str {
        match self {
            AbcClass::A => "A",
            AbcClass::B => "B",
            AbcClass::C => "C",
        }
    }
}

impl fmt::Display for AbcClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-product revenue aggregate with its ABC class. Serialized as a class sheet row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductAggregate {
    #[serde(rename = "Clave")]
    pub key: String,
    #[serde(rename = "Total")]
    pub total: f64,
    #[serde(rename = "Cantidad")]
    pub quantity: f64,
    #[serde(rename = "Des")]
    pub description: String,
    #[serde(rename = "Linea")]
    pub line: String,
    #[serde(rename = "%_individual")]
    pub share: f64,
    #[serde(rename = "%_acumulado")]
    pub cumulative_share: f64,
    #[serde(rename = "ABC")]
    pub class: AbcClass,
}

#[derive(Debug, Clone)]
pub struct AbcClassification {
    /// Sorted by total revenue, descending.
    pub products: Vec<ProductAggregate>,
    pub grand_total: f64,
}

/// Quantity, margin and cost observed at one extreme unit price of a product.
#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub price: f64,
    pub quantity: f64,
    pub total_margin: f64,
    /// `None` when the quantity or price is zero.
    pub margin_pct: Option<f64>,
    /// `None` when the input had no `Costo` column.
    pub avg_cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceExtremeRecord {
    pub key: String,
    pub min: PricePoint,
    pub max: PricePoint,
}

/// One row of the combined ("Todos") report table.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailRow {
    pub key: String,
    pub description: String,
    pub line: String,
    pub class: AbcClass,
    pub quantity: f64,
    pub total: f64,
    pub share: f64,
    pub cumulative_share: f64,
    pub min_price: Option<f64>,
    pub quantity_at_min: Option<f64>,
    pub max_price: Option<f64>,
    pub quantity_at_max: Option<f64>,
    pub margin_total_min: Option<f64>,
    pub margin_total_max: Option<f64>,
    pub margin_pct_min: Option<f64>,
    pub margin_pct_max: Option<f64>,
    pub avg_cost_min: Option<f64>,
    pub avg_cost_max: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ReportWorkbook {
    pub a: Vec<ProductAggregate>,
    pub b: Vec<ProductAggregate>,
    pub c: Vec<ProductAggregate>,
    pub all: Vec<DetailRow>,
    pub has_cost: bool,
}

impl ReportWorkbook {
    pub fn class_sheet(&self, class: AbcClass) -> &[ProductAggregate] {
        match class {
            AbcClass::A => &self.a,
            AbcClass::B => &self.b,
            AbcClass::C => &self.c,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassSummary {
    pub class: AbcClass,
    pub products: usize,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryStats {
    pub total_rows: usize,
    pub total_products: usize,
    pub grand_total: f64,
    pub classes: Vec<ClassSummary>,
}

/// One point of the demand/profit curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DemandCurveSample {
    #[serde(rename = "Precio")]
    pub price: f64,
    #[serde(rename = "DemandaPredicha")]
    pub predicted_quantity: f64,
    #[serde(rename = "Utilidad")]
    pub profit: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    pub key: String,
    pub average_cost: f64,
    pub optimal_price: f64,
    pub max_profit: f64,
    pub curve: Vec<DemandCurveSample>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassCount {
    pub class: AbcClass,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub total: f64,
    pub quantity: f64,
    pub margin: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthSeries {
    pub month: String,
    pub days: Vec<DailyPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticleDaily {
    pub key: String,
    pub description: String,
    pub months: Vec<MonthSeries>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartData {
    pub class_counts: Vec<ClassCount>,
    pub article: Option<ArticleDaily>,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct AbcPreviewRow {
    #[tabled(rename = "Clave")]
    pub key: String,
    #[tabled(rename = "Des")]
    pub description: String,
    #[tabled(rename = "ABC")]
    pub class: String,
    #[tabled(rename = "Total")]
    pub total: String,
    #[tabled(rename = "%_acumulado")]
    pub cumulative_share: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DetailPreviewRow {
    #[tabled(rename = "Clave")]
    pub key: String,
    #[tabled(rename = "ABC")]
    pub class: String,
    #[tabled(rename = "PrecioMinimo")]
    pub min_price: String,
    #[tabled(rename = "CantidadVendidaMin")]
    pub quantity_at_min: String,
    #[tabled(rename = "PrecioMaximo")]
    pub max_price: String,
    #[tabled(rename = "CantidadVendidaMax")]
    pub quantity_at_max: String,
    #[tabled(rename = "PctMargenMin")]
    pub margin_pct_min: String,
    #[tabled(rename = "PctMargenMax")]
    pub margin_pct_max: String,
}
