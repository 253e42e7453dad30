// Entry point and high-level CLI flow.
//
// - `--export <file>` renders every panel with its default selection,
//   writes the outcomes as JSON and exits.
// - Otherwise an interactive menu lets the user load the data files,
//   render one panel with hand-picked selections, or render them all.
use clap::Parser;
use migration_dashboard::config::{DimensionConfig, SelectMode};
use migration_dashboard::filter::{filter, Selection, Selector};
use migration_dashboard::output::{preview_rows, render_outcome, write_json};
use migration_dashboard::util::format_int;
use migration_dashboard::{load_dashboard_config, CellValue, Dashboard, DashboardError, Panel, TableCache};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;

// Tables stay loaded for the whole session so re-rendering a panel after a
// selection change never re-reads its file.
static CACHE: Lazy<TableCache> = Lazy::new(TableCache::new);

#[derive(Parser, Debug)]
#[command(name = "migration_dashboard")]
#[command(about = "Migration statistics dashboard over spreadsheet exports", long_about = None)]
struct Args {
    /// Dashboard configuration file (extension optional)
    #[arg(long, default_value = "config/dashboard")]
    config: String,

    /// Directory holding the data files (overrides the configuration)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Render all panels with default selections into this JSON file and exit
    #[arg(long)]
    export: Option<PathBuf>,
}

/// Read a single line of input after printing `prompt`.
fn read_line(prompt: &str) -> String {
    print!("{prompt}");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Ask a Y/N question until the answer is one of the two.
fn prompt_yes_no(question: &str) -> bool {
    loop {
        match read_line(&format!("{question} (Y/N): ")).to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Option [1]: load every panel's file, reporting each one separately.
fn handle_load(dashboard: &Dashboard) {
    for panel in dashboard.panels() {
        match panel.load(&CACHE) {
            Ok(table) => {
                let report = table.report();
                println!(
                    "[{}] {} rows, {} columns from {} ({} empty cells, {} percentages)",
                    panel.id(),
                    format_int(report.total_rows),
                    table.columns().len(),
                    panel.path().display(),
                    format_int(report.empty_cells),
                    format_int(report.percentage_cells)
                );
            }
            Err(e) => eprintln!("[{}] Failed to load file: {}", panel.id(), e),
        }
    }
    println!();
}

/// Ask for one dimension's value(s). An empty answer keeps the default.
fn prompt_dimension(dim: &DimensionConfig, options: &[CellValue], default: Option<&Selector>) -> Option<Selector> {
    println!("{}:", dim.name);
    for (idx, value) in options.iter().enumerate() {
        println!("  [{}] {}", idx + 1, value);
    }
    let hint = match dim.mode {
        SelectMode::Single => "Choose one (Enter for default): ",
        SelectMode::Multi => "Choose several, comma separated (Enter for default): ",
    };
    loop {
        let answer = read_line(hint);
        if answer.is_empty() {
            return default.cloned();
        }
        let picked: Option<Vec<CellValue>> = answer
            .split(',')
            .map(|tok| {
                tok.trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| options.get(i).cloned())
            })
            .collect();
        match (picked, dim.mode) {
            (Some(mut values), SelectMode::Single) if values.len() == 1 => {
                return values.pop().map(Selector::One)
            }
            (Some(values), SelectMode::Multi) => return Some(Selector::AnyOf(values)),
            _ => println!("Invalid choice."),
        }
    }
}

/// Option [2]: pick a panel, pick its selections, render it.
fn handle_render_one(dashboard: &Dashboard) {
    let panels = dashboard.panels();
    for (idx, panel) in panels.iter().enumerate() {
        println!("[{}] {}", idx + 1, panel.title());
    }
    let Some(panel) = read_line("Enter choice: ")
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| panels.get(i))
    else {
        println!("Invalid choice.\n");
        return;
    };

    let table = match panel.load(&CACHE) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("Failed to load file: {}\n", e);
            return;
        }
    };
    let defaults = panel.default_selection(&table);
    let mut selection = Selection::new();
    for dim in &panel.config().dimensions {
        let options = panel.options(&table, dim);
        if let Some(selector) = prompt_dimension(dim, &options, defaults.get(&dim.name)) {
            selection.insert(dim.name.clone(), selector);
        }
    }

    println!("\n{}", render_outcome(&panel.render(&CACHE, &selection)));
    if prompt_yes_no("Show raw data") {
        show_raw(panel, &selection);
    }
}

fn show_raw(panel: &Panel<'_>, selection: &Selection) {
    match panel.load(&CACHE) {
        Ok(table) => {
            let subset = filter(&table, &panel.row_selection(selection));
            println!("{}\n", preview_rows(&subset, 20));
        }
        Err(e) => eprintln!("Failed to load file: {}\n", e),
    }
}

/// Option [3]: every panel with its defaults.
fn handle_render_all(dashboard: &Dashboard) {
    for outcome in dashboard.render_all(&CACHE, &HashMap::new()) {
        println!("{}", render_outcome(&outcome));
    }
}

fn main() -> Result<(), DashboardError> {
    env_logger::init();
    let args = Args::parse();

    let mut config = load_dashboard_config(&args.config)?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    let dashboard = Dashboard::new(config);

    if let Some(path) = args.export {
        let outcomes = dashboard.render_all(&CACHE, &HashMap::new());
        for outcome in &outcomes {
            println!("{}", render_outcome(outcome));
        }
        write_json(&path, &outcomes)?;
        println!("Outputs saved to {}", path.display());
        return Ok(());
    }

    loop {
        println!("Migration Dashboard");
        println!("[1] Load the data files");
        println!("[2] Render a panel");
        println!("[3] Render all panels");
        println!("[4] Reload the data files");
        println!("[5] Exit\n");
        match read_line("Enter choice: ").as_str() {
            "1" => handle_load(&dashboard),
            "2" => handle_render_one(&dashboard),
            "3" => handle_render_all(&dashboard),
            "4" => {
                CACHE.clear();
                handle_load(&dashboard);
            }
            "5" => {
                println!("Exiting the program.");
                return Ok(());
            }
            _ => println!("Invalid choice. Please enter 1 to 5.\n"),
        }
    }
}
