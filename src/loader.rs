use crate::error::{ReportError, Result};
use crate::types::{RawRow, SalesRecord, SalesTable};
use crate::util::{parse_date_yyyymmdd, parse_f64_safe};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Columns that must be present in the header row. `Costo` is optional.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "Clave",
    "Total",
    "Cantidad",
    "Des",
    "Linea",
    "Fecha",
    "PrecioUnit",
    "Margen",
];
pub const COST_COLUMN: &str = "Costo";

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_rows: usize,
    pub distinct_products: usize,
    pub has_cost: bool,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

pub fn load_sales_file<P: AsRef<Path>>(path: P) -> Result<(SalesTable, LoadReport)> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| {
        ReportError::MalformedInput(format!("cannot open '{}': {}", path.display(), e))
    })?;
    load_sales(file)
}

/// Parse and validate sales rows. Any schema violation aborts the whole load.
pub fn load_sales<R: Read>(reader: R) -> Result<(SalesTable, LoadReport)> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let present: HashSet<&str> = headers.iter().collect();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !present.contains(c))
        .collect();
    if !missing.is_empty() {
        return Err(ReportError::MalformedInput(format!(
            "missing required column(s): {}",
            missing.join(", ")
        )));
    }
    let has_cost = present.contains(COST_COLUMN);

    let mut records = Vec::new();
    for (idx, result) in rdr.deserialize::<RawRow>().enumerate() {
        // header is line 1
        let line_no = idx + 2;
        let raw = result.map_err(|e| {
            ReportError::MalformedInput(format!("CSV parse error at line {}: {}", line_no, e))
        })?;
        records.push(validate_row(raw, line_no, has_cost)?);
    }

    let distinct_products = records
        .iter()
        .map(|r| r.key.as_str())
        .collect::<HashSet<_>>()
        .len();
    let first_date = records.iter().map(|r| r.date).min();
    let last_date = records.iter().map(|r| r.date).max();
    info!(
        rows = records.len(),
        products = distinct_products,
        has_cost,
        "sales table loaded"
    );

    let report = LoadReport {
        total_rows: records.len(),
        distinct_products,
        has_cost,
        first_date,
        last_date,
    };
    Ok((SalesTable::new(records, has_cost), report))
}

fn validate_row(row: RawRow, line_no: usize, has_cost: bool) -> Result<SalesRecord> {
    let malformed = |column: &str, detail: &str| {
        ReportError::MalformedInput(format!("line {}: column {} {}", line_no, column, detail))
    };

    let key = row
        .clave
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| malformed("Clave", "is empty"))?;

    let date = parse_date_yyyymmdd(row.fecha.as_deref())
        .ok_or_else(|| malformed("Fecha", "is not a valid YYYYMMDD date"))?;

    let number = |value: Option<&str>, column: &str| {
        parse_f64_safe(value).ok_or_else(|| malformed(column, "is not a number"))
    };
    let quantity = number(row.cantidad.as_deref(), "Cantidad")?;
    let unit_price = number(row.precio_unit.as_deref(), "PrecioUnit")?;
    let unit_margin = number(row.margen.as_deref(), "Margen")?;
    let total = number(row.total.as_deref(), "Total")?;
    let unit_cost = if has_cost {
        Some(number(row.costo.as_deref(), "Costo")?)
    } else {
        None
    };

    if quantity < 0.0 {
        return Err(malformed("Cantidad", "is negative"));
    }
    if unit_price < 0.0 {
        return Err(malformed("PrecioUnit", "is negative"));
    }
    if total < 0.0 {
        return Err(malformed("Total", "is negative"));
    }
    debug!(line = line_no, key = %key, "row accepted");

    Ok(SalesRecord {
        key,
        description: row.des.unwrap_or_default().trim().to_string(),
        line: row.linea.unwrap_or_default().trim().to_string(),
        date,
        // `+ 0.0` folds `-0` into `0` so equal prices compare equal bitwise too.
        quantity: quantity + 0.0,
        unit_price: unit_price + 0.0,
        unit_margin,
        unit_cost,
        total: total + 0.0,
    })
}
