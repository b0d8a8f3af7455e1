use crate::error::Result;
use crate::types::{AbcClass, DetailRow, ReportWorkbook};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

pub const DETAIL_SHEET: &str = "Todos";

const DETAIL_HEADERS: [&str; 16] = [
    "Clave",
    "Des",
    "Linea",
    "ABC",
    "Cantidad",
    "Total",
    "%_individual",
    "%_acumulado",
    "PrecioMinimo",
    "CantidadVendidaMin",
    "PrecioMaximo",
    "CantidadVendidaMax",
    "MargenTotalMin",
    "MargenTotalMax",
    "PctMargenMin",
    "PctMargenMax",
];
/// Column names of a class sheet, matching the serde renames on `ProductAggregate`.
pub const CLASS_HEADERS: [&str; 8] = [
    "Clave",
    "Total",
    "Cantidad",
    "Des",
    "Linea",
    "%_individual",
    "%_acumulado",
    "ABC",
];
const COST_HEADERS: [&str; 2] = ["cto_prom_minimo", "cto_prom_maximo"];

pub fn write_csv<T: Serialize, P: AsRef<Path>>(path: P, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    fs::write(path, s)?;
    Ok(())
}

fn cell(v: Option<f64>) -> String {
    v.map(|n| n.to_string()).unwrap_or_default()
}

fn detail_record(r: &DetailRow, has_cost: bool) -> Vec<String> {
    let mut rec = vec![
        r.key.clone(),
        r.description.clone(),
        r.line.clone(),
        r.class.to_string(),
        r.quantity.to_string(),
        r.total.to_string(),
        r.share.to_string(),
        r.cumulative_share.to_string(),
        cell(r.min_price),
        cell(r.quantity_at_min),
        cell(r.max_price),
        cell(r.quantity_at_max),
        cell(r.margin_total_min),
        cell(r.margin_total_max),
        cell(r.margin_pct_min),
        cell(r.margin_pct_max),
    ];
    if has_cost {
        rec.push(cell(r.avg_cost_min));
        rec.push(cell(r.avg_cost_max));
    }
    rec
}

/// Write the combined sheet. Null fields become empty cells; the cost
/// columns exist only when the input carried costs.
pub fn write_detail_csv<P: AsRef<Path>>(path: P, rows: &[DetailRow], has_cost: bool) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    let mut headers: Vec<&str> = DETAIL_HEADERS.to_vec();
    if has_cost {
        headers.extend(COST_HEADERS);
    }
    wtr.write_record(&headers)?;
    for r in rows {
        wtr.write_record(detail_record(r, has_cost))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Export the workbook as one CSV per sheet: `A.csv`, `B.csv`, `C.csv`, `Todos.csv`.
pub fn export_workbook<P: AsRef<Path>>(dir: P, workbook: &ReportWorkbook) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for class in AbcClass::ALL {
        let path = dir.join(format!("{}.csv", class));
        let rows = workbook.class_sheet(class);
        if rows.is_empty() {
            // `serialize` only emits headers alongside a first row.
            let mut wtr = csv::Writer::from_path(&path)?;
            wtr.write_record(CLASS_HEADERS)?;
            wtr.flush()?;
        } else {
            write_csv(&path, rows)?;
        }
        written.push(path);
    }
    let path = dir.join(format!("{}.csv", DETAIL_SHEET));
    write_detail_csv(&path, &workbook.all, workbook.has_cost)?;
    written.push(path);
    info!(dir = %dir.display(), sheets = written.len(), "workbook exported");
    Ok(written)
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
