// Entry point and high-level CLI flow.
//
// - Option [1] loads and validates the sales CSV, printing diagnostics.
// - Option [2] builds the ABC workbook, the summary and the chart series.
// - Option [3] runs the demand-curve price optimization for one product.
// With `--batch` all three run once and the program exits.
use abc_report::config::{load_config, ReportConfig};
use abc_report::types::{AbcClass, SalesTable};
use abc_report::{charts, loader, optimizer, output, reports, util, Result};
use clap::Parser;
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "abc_report")]
#[command(about = "ABC inventory classification and price optimization for sales CSVs")]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sales CSV (overrides the config file)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory receiving the exported sheets (overrides the config file)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Product key to optimize instead of the one with most transactions
    #[arg(long)]
    sku: Option<String>,

    /// Load, report and optimize once, without the menu
    #[arg(long)]
    batch: bool,
}

// Loaded once, reported on as many times as the user asks.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { data: None }));

struct AppState {
    data: Option<SalesTable>,
}

fn state() -> MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Ask whether to return to the menu. `true` for `Y`, `false` for `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Report Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        io::stdin().read_line(&mut buf).ok();
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn loaded_table() -> Option<SalesTable> {
    let data = state().data.clone();
    if data.is_none() {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
    }
    data
}

/// Option [1]: load and validate the CSV into `APP_STATE`.
fn handle_load(cfg: &ReportConfig) -> Result<()> {
    let (table, load_report) = loader::load_sales_file(&cfg.input_path)?;
    println!(
        "Processing dataset... ({} rows loaded, {} products)",
        util::format_int(load_report.total_rows as i64),
        util::format_int(load_report.distinct_products as i64)
    );
    if let (Some(first), Some(last)) = (load_report.first_date, load_report.last_date) {
        println!("Date range: {} to {}", first, last);
    }
    if !load_report.has_cost {
        println!("Note: no Costo column; average-cost fields are omitted.");
    }
    println!();
    state().data = Some(table);
    Ok(())
}

/// Option [2]: classify, export the sheets, the summary and the chart data.
fn handle_generate_report(table: &SalesTable, cfg: &ReportConfig) -> Result<()> {
    println!("Generating ABC report...");
    let (classification, workbook) = reports::generate_report(table, &cfg.thresholds)?;
    let written = output::export_workbook(&cfg.output_dir, &workbook)?;

    for class in AbcClass::ALL {
        let rows = workbook.class_sheet(class);
        println!("Class {} ({} products)\n", class, util::format_int(rows.len() as i64));
        output::preview_table_rows(&reports::abc_preview(rows), 3);
    }
    println!("Price extremes and margins ({})\n", output::DETAIL_SHEET);
    output::preview_table_rows(&reports::detail_preview(&workbook.all), 5);
    println!("(Sheets exported to {})\n", cfg.output_dir.display());
    for path in &written {
        println!("  {}", path.display());
    }

    let summary = reports::generate_summary(table, &classification);
    output::write_json(cfg.output_dir.join("summary.json"), &summary)?;
    let chart_data = charts::build_chart_data(table, &classification, cfg.chart_seed);
    output::write_json(cfg.output_dir.join("charts.json"), &chart_data)?;

    println!("\nSummary Stats (summary.json):");
    for c in &summary.classes {
        println!(
            "  {}: {} products, revenue {}",
            c.class,
            util::format_int(c.products as i64),
            util::format_number(c.revenue, 2)
        );
    }
    if let Some(article) = &chart_data.article {
        println!(
            "Daily chart series (charts.json): article {} ({}), {} month(s)",
            article.key,
            article.description,
            article.months.len()
        );
    }
    println!();
    Ok(())
}

/// Option [3]: demand-curve price optimization.
fn handle_optimize(table: &SalesTable, cfg: &ReportConfig, sku: Option<&str>) -> Result<()> {
    let result = optimizer::optimize(table, sku, &cfg.optimizer)?;
    std::fs::create_dir_all(&cfg.output_dir)?;
    let path = cfg
        .output_dir
        .join(format!("optimizacion_{}.csv", result.key));
    output::write_csv(&path, &result.curve)?;

    println!("Price optimization for SKU {}", result.key);
    println!("Optimal price from estimated demand: {:.2}", util::round2(result.optimal_price));
    println!("Maximum estimated profit: {:.2}", util::round2(result.max_profit));
    println!("(Profit curve exported to {})\n", path.display());
    Ok(())
}

fn report_failure(stage: &str, r: Result<()>) -> bool {
    match r {
        Ok(()) => true,
        Err(e) => {
            error!(stage, error = %e, "stage failed");
            eprintln!("{} failed: {}\n", stage, e);
            false
        }
    }
}

fn run_batch(cfg: &ReportConfig, sku: Option<&str>) -> Result<()> {
    handle_load(cfg)?;
    let Some(table) = loaded_table() else {
        return Ok(());
    };
    handle_generate_report(&table, cfg)?;
    // A product without enough price variety must not hide the report.
    report_failure("Price optimization", handle_optimize(&table, cfg, sku));
    Ok(())
}

fn build_config(args: &Args) -> Result<ReportConfig> {
    let mut cfg = match &args.config {
        Some(path) => load_config(path)?,
        None => ReportConfig::default(),
    };
    if let Some(input) = &args.input {
        cfg.input_path = input.clone();
    }
    if let Some(dir) = &args.output_dir {
        cfg.output_dir = dir.clone();
    }
    cfg.validate()?;
    Ok(cfg)
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Logs go to stderr so they never interleave with the menu and previews.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let cfg = match build_config(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(2);
        }
    };
    let sku = args.sku.as_deref();

    if args.batch {
        if let Err(e) = run_batch(&cfg, sku) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        return;
    }

    loop {
        println!("ABC Classification");
        println!("[1] Load the file ({})", cfg.input_path.display());
        println!("[2] Generate ABC Report");
        println!("[3] Optimize Price\n");
        match read_choice().as_str() {
            "1" => {
                report_failure("Load", handle_load(&cfg));
            }
            choice @ ("2" | "3") => {
                let Some(table) = loaded_table() else {
                    continue;
                };
                println!();
                if choice == "2" {
                    report_failure("Report", handle_generate_report(&table, &cfg));
                } else {
                    report_failure("Price optimization", handle_optimize(&table, &cfg, sku));
                }
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1, 2 or 3.\n");
            }
        }
    }
}
