use abc_report::config::{OptimizerConfig, ReportConfig};
use abc_report::types::AbcClass;
use abc_report::{charts, loader, optimizer, output, reports, ReportError};
use std::fs;

const SALES_CSV: &str = "\
Clave,Des,Linea,Fecha,Cantidad,PrecioUnit,Margen,Costo,Total
X1,Taladro,HER,20240103,5,10,2,8,50
X1,Taladro rojo,HER,20240110,3,10,2,8,30
X1,Taladro,HER,20240212,1,20,9,11,20
Y2,Pinza,HER,20240105,4,5,1,4,20
";

#[test]
fn extremes_combine_rows_at_the_same_price() {
    let (table, _) = loader::load_sales(SALES_CSV.as_bytes()).unwrap();
    let ext = reports::analyze_price_extremes(&table);
    let x1 = ext.iter().find(|e| e.key == "X1").unwrap();
    assert_eq!(x1.min.price, 10.0);
    assert_eq!(x1.min.quantity, 8.0);
    assert_eq!(x1.max.price, 20.0);
    assert_eq!(x1.max.quantity, 1.0);
    assert_eq!(x1.min.total_margin, 16.0);
    assert_eq!(x1.max.margin_pct, Some(0.45));
    assert_eq!(x1.min.avg_cost, Some(8.0));
}

#[test]
fn two_product_revenue_split_lands_on_a_and_c() {
    let csv_data = "\
Clave,Des,Linea,Fecha,Cantidad,PrecioUnit,Margen,Total
P1,Uno,L,20240101,80,10,1,800
P2,Dos,L,20240101,20,10,1,200
";
    let (table, _) = loader::load_sales(csv_data.as_bytes()).unwrap();
    let (abc, workbook) = reports::generate_report(&table, &ReportConfig::default().thresholds).unwrap();
    assert_eq!(abc.grand_total, 1000.0);
    let classes: Vec<(f64, AbcClass)> = abc
        .products
        .iter()
        .map(|p| (p.cumulative_share, p.class))
        .collect();
    assert_eq!(classes, vec![(0.8, AbcClass::A), (1.0, AbcClass::C)]);
    assert!(workbook.b.is_empty());
    assert_eq!(workbook.all.len(), 2);
}

#[test]
fn workbook_export_writes_every_sheet() {
    let (table, _) = loader::load_sales(SALES_CSV.as_bytes()).unwrap();
    let (abc, workbook) = reports::generate_report(&table, &ReportConfig::default().thresholds).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let written = output::export_workbook(dir.path(), &workbook).unwrap();
    assert_eq!(written.len(), 4);

    let todos = fs::read_to_string(dir.path().join("Todos.csv")).unwrap();
    let mut lines = todos.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("Clave,Des,Linea,ABC"));
    assert!(header.ends_with("cto_prom_minimo,cto_prom_maximo"));
    assert_eq!(lines.count(), abc.products.len());
    // first-seen description survives aggregation
    assert!(todos.contains("X1,Taladro,HER"));

    let a_sheet = fs::read_to_string(dir.path().join("A.csv")).unwrap();
    assert!(a_sheet.starts_with("Clave,Total,Cantidad,Des,Linea,%_individual,%_acumulado,ABC"));
    let b_sheet = fs::read_to_string(dir.path().join("B.csv")).unwrap();
    assert_eq!(b_sheet.lines().count(), 1 + workbook.b.len());

    let charts = charts::build_chart_data(&table, &abc, Some(1));
    output::write_json(dir.path().join("charts.json"), &charts).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("charts.json")).unwrap()).unwrap();
    assert_eq!(json["class_counts"].as_array().unwrap().len(), 3);
}

#[test]
fn optimizer_runs_on_busiest_product() {
    let (table, _) = loader::load_sales(SALES_CSV.as_bytes()).unwrap();
    let res = optimizer::optimize(&table, None, &OptimizerConfig::default()).unwrap();
    assert_eq!(res.key, "X1");
    assert!(res.optimal_price >= 8.0 - 1e-9 && res.optimal_price <= 24.0 + 1e-9);
    assert_eq!(res.curve.len(), 100);
}

#[test]
fn optimizer_refuses_a_single_price_history() {
    let (table, _) = loader::load_sales(SALES_CSV.as_bytes()).unwrap();
    let err = optimizer::optimize(&table, Some("Y2"), &OptimizerConfig::default()).unwrap_err();
    assert!(matches!(err, ReportError::InsufficientData { ref key, distinct_prices: 1 } if key == "Y2"));
}
