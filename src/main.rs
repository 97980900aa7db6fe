use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, ValueEnum, ArgAction, CommandFactory};
use clap_complete::Shell;
use comfy_table::{Table, ContentArrangement};
use serde::{Deserialize, Serialize};
use is_terminal::IsTerminal;

use masst_tables::html::{self, Theme};
use masst_tables::visibility::{self, DisplayState, Visibility};
use masst_tables::{cell, markdown, rows, template, tree};
use masst_tables::{Layout, Report, RowKind, TableBuilder};

static ENABLE_COLOR: OnceLock<bool> = OnceLock::new();

#[derive(Clone, Copy, Debug, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum OutputFmt { Text, Json }

#[derive(Clone, Copy, Debug, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LogLevel { Error, Warn, Info, Debug, Trace }

#[derive(Clone, Copy, Debug, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LogFormat { Text, Json }

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Container { Library, Matches, Datasets, Params }

impl Container {
    fn id(self) -> &'static str {
        match self { Container::Library => visibility::LIBRARY_TABLE, Container::Matches => visibility::MATCH_TABLE, Container::Datasets => visibility::DATASET_TABLE, Container::Params => visibility::PARAMS }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "masst-tables",
    version,
    about = "Render MASST result trees and library matches as interactive HTML tables",
    long_about = None
)]
struct Args {
    #[arg(long, short = 't', help = "Annotated result tree (JSON)")]
    tree: Option<String>,
    #[arg(long, short = 'l', help = "Library matches: JSON file or inline JSON array")]
    library: Option<String>,
    #[arg(long, short = 'u', help = "Input USI, enables mirror links for spectrum matches")]
    usi: Option<String>,
    #[arg(long)]
    input_label: Option<String>,
    #[arg(long, help = "Search parameters: file or literal text")]
    params: Option<String>,
    #[arg(long)]
    title: Option<String>,
    #[arg(long, value_enum, default_value = "summary")]
    rows: RowKind,
    #[arg(long, default_value_t = false, help = "Skip the per-match dataset table")]
    no_datasets: bool,
    #[arg(long, default_value = "Cosine")]
    sort_by: String,
    #[arg(long, default_value_t = false)]
    ascending: bool,
    #[arg(long, help = "Sort column of the match table (defaults to Matches, or --sort-by for per-match rows)")]
    match_sort_by: Option<String>,
    #[arg(long, num_args = 0.., value_delimiter = ',')]
    library_exclude: Vec<String>,
    #[arg(long, num_args = 0.., value_delimiter = ',')]
    match_exclude: Vec<String>,
    #[arg(long, num_args = 0.., value_delimiter = ',')]
    dataset_exclude: Vec<String>,
    #[arg(long, value_enum, num_args = 0.., value_delimiter = ',', help = "Containers collapsed on load")]
    hide: Vec<Container>,
    #[arg(long, short = 'H')]
    html: Option<String>,
    #[arg(long, help = "HTML template with placeholders to fill instead of the built-in page")]
    template: Option<String>,
    #[arg(long, help = "Directory with jquery/DataTables files to inline")]
    assets: Option<String>,
    #[arg(long, value_enum, default_value = "light")]
    theme: Theme,
    #[arg(long, short = 'j')]
    json_path: Option<String>,
    #[arg(long)]
    csv_path: Option<String>,
    #[arg(long)]
    tsv_path: Option<String>,
    #[arg(long)]
    md_path: Option<String>,
    #[arg(long, short = 'o', value_enum, default_value = "text")]
    output: OutputFmt,
    #[arg(long, default_value_t = 40)]
    cell_width: usize,
    #[arg(long, default_value_t = false)]
    open: bool,
    #[arg(long)]
    config: Option<String>,
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
    #[arg(short = 'q', long, default_value_t = false)]
    quiet: bool,
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
    #[arg(long)]
    log_path: Option<String>,
    #[arg(long, default_value_t = false)]
    no_color: bool,
    #[arg(long, default_value_t = false)]
    force_color: bool,
    #[arg(long, value_enum)]
    completions: Option<Shell>,
    #[arg(long)]
    completions_out: Option<String>,
}

impl Default for Args {
    fn default() -> Self {
        Args {
            tree: None,
            library: None,
            usi: None,
            input_label: None,
            params: None,
            title: None,
            rows: RowKind::Summary,
            no_datasets: false,
            sort_by: "Cosine".to_string(),
            ascending: false,
            match_sort_by: None,
            library_exclude: vec![],
            match_exclude: vec![],
            dataset_exclude: vec![],
            hide: vec![],
            html: None,
            template: None,
            assets: None,
            theme: Theme::Light,
            json_path: None,
            csv_path: None,
            tsv_path: None,
            md_path: None,
            output: OutputFmt::Text,
            cell_width: 40,
            open: false,
            config: None,
            verbose: 0,
            quiet: false,
            log_level: None,
            log_format: None,
            log_path: None,
            no_color: false,
            force_color: false,
            completions: None,
            completions_out: None,
        }
    }
}

#[derive(Deserialize, Default)]
struct AppConfig {
    tree: Option<String>,
    library: Option<String>,
    usi: Option<String>,
    input_label: Option<String>,
    params: Option<String>,
    title: Option<String>,
    rows: Option<RowKind>,
    no_datasets: Option<bool>,
    sort_by: Option<String>,
    ascending: Option<bool>,
    match_sort_by: Option<String>,
    library_exclude: Option<Vec<String>>,
    match_exclude: Option<Vec<String>>,
    dataset_exclude: Option<Vec<String>>,
    hide: Option<Vec<Container>>,
    html: Option<String>,
    template: Option<String>,
    assets: Option<String>,
    theme: Option<Theme>,
    json_path: Option<String>,
    csv_path: Option<String>,
    tsv_path: Option<String>,
    md_path: Option<String>,
    output: Option<OutputFmt>,
    log_format: Option<LogFormat>,
    log_path: Option<String>,
}

const DEFAULT_LIBRARY_EXCLUDE: [&str; 2] = ["Dataset", "Status"];
const DEFAULT_CONFIG: &str = "masst-tables.toml";

/// Logging is not up yet when the config is read, so problems go to stderr.
/// A missing file is only reported when it was asked for explicitly.
fn read_config(path: &str, explicit: bool) -> Option<AppConfig> {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            if explicit { eprintln!("masst-tables: cannot read config {}: {}", path, e); }
            return None;
        }
    };
    match toml::from_str::<AppConfig>(&text) {
        Ok(cfg) => Some(cfg),
        Err(e) => { eprintln!("masst-tables: ignoring invalid config {}: {}", path, e); None }
    }
}

fn main() {
    let mut args = Args::parse();
    if let Some(sh) = args.completions {
        let mut cmd = Args::command();
        if let Some(path) = args.completions_out.as_ref() {
            if let Ok(mut f) = std::fs::File::create(path) { clap_complete::generate(sh, &mut cmd, "masst-tables", &mut f); } else { clap_complete::generate(sh, &mut cmd, "masst-tables", &mut std::io::stdout()); }
        } else {
            clap_complete::generate(sh, &mut cmd, "masst-tables", &mut std::io::stdout());
        }
        return;
    }
    let cfg = args.config.as_deref().and_then(|p| read_config(p, true)).or_else(|| read_config(DEFAULT_CONFIG, false));
    if let Some(cfg) = cfg { apply_config(&mut args, cfg); }
    init_logging(&args);
    let term = std::env::var("TERM").unwrap_or_default();
    let no_color_env = std::env::var_os("NO_COLOR").is_some();
    let color_default = std::io::stdout().is_terminal() && !no_color_env && term != "dumb";
    let enable_color = if args.force_color { true } else { color_default && !args.no_color };
    let _ = ENABLE_COLOR.set(enable_color);
    if let Err(e) = run(&args) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(args: &Args) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
    if args.quiet {
        builder.filter_level(log::LevelFilter::Error);
    } else if let Some(lvl) = args.log_level {
        let f = match lvl { LogLevel::Error => log::LevelFilter::Error, LogLevel::Warn => log::LevelFilter::Warn, LogLevel::Info => log::LevelFilter::Info, LogLevel::Debug => log::LevelFilter::Debug, LogLevel::Trace => log::LevelFilter::Trace };
        builder.filter_level(f);
    } else if args.verbose > 0 {
        let f = if args.verbose >= 3 { log::LevelFilter::Trace } else if args.verbose == 2 { log::LevelFilter::Debug } else { log::LevelFilter::Info };
        builder.filter_level(f);
    }
    if let Some(fmt) = args.log_format {
        match fmt {
            LogFormat::Json => {
                builder.format(|buf, record| {
                    use std::io::Write;
                    let ts = chrono::Local::now().to_rfc3339();
                    let obj = serde_json::json!({
                        "ts": ts,
                        "level": record.level().to_string(),
                        "target": record.target(),
                        "msg": record.args().to_string(),
                    });
                    writeln!(buf, "{}", obj)
                });
            }
            LogFormat::Text => {
                builder.format(|buf, record| {
                    use std::io::Write;
                    let ts = chrono::Local::now().format("%H:%M:%S");
                    writeln!(buf, "[{:<5} {}] {}", record.level(), ts, record.args())
                });
            }
        }
    }
    if let Some(path) = args.log_path.as_ref() {
        match std::fs::File::create(path) {
            Ok(f) => { builder.target(env_logger::Target::Pipe(Box::new(f))); }
            Err(e) => { eprintln!("Failed to open log file {}: {}", path, e); }
        }
    }
    builder.init();
}

fn run(args: &Args) -> Result<()> {
    let tree_path = args.tree.as_deref().context("no result tree given, use --tree or set tree in masst-tables.toml")?;
    let tree_text = std::fs::read_to_string(tree_path).with_context(|| format!("failed to read tree {}", tree_path))?;
    let root = tree::parse_tree(&tree_text).with_context(|| format!("failed to parse tree {}", tree_path))?;
    let library_text = args.library.as_deref().map(template::resolve_value).unwrap_or_default();
    let report = build_report(args, &root, &library_text);
    log::info!("Rows: {} library, {} matches{}", report.library.len(), report.matches.len(), report.datasets.as_ref().map(|d| format!(", {} datasets", d.len())).unwrap_or_default());

    if let Some(path) = args.html.as_ref() {
        match render_report_html(args, &report, &tree_text, &library_text) {
            Ok(html) => match std::fs::write(path, html) {
                Ok(_) => {
                    if args.open { open_file_default(PathBuf::from(path)); }
                    if !args.quiet { println!("{}", paint(&format!("HTML generated: {}", path), "1;36")); }
                }
                Err(e) => log::error!("HTML write failed for {}: {}", path, e),
            },
            Err(e) => log::error!("HTML render failed: {:#}", e),
        }
    }
    if let Some(p) = args.csv_path.as_ref() {
        if let Err(e) = write_csv(p, &report.match_table()) { log::error!("CSV write failed for {}: {}", p, e); } else if !args.quiet { println!("{}", paint(&format!("CSV written: {}", p), "1;36")); }
    }
    if let Some(p) = args.tsv_path.as_ref() {
        if let Err(e) = write_tsv(p, &report.match_table()) { log::error!("TSV write failed for {}: {}", p, e); } else if !args.quiet { println!("{}", paint(&format!("TSV written: {}", p), "1;36")); }
    }
    if let Some(p) = args.md_path.as_ref() {
        match std::fs::write(p, markdown::render_markdown(&report)) {
            Ok(_) => { if !args.quiet { println!("{}", paint(&format!("Markdown written: {}", p), "1;36")); } }
            Err(e) => { log::error!("Markdown write failed for {}: {}", p, e); }
        }
    }
    match args.output {
        OutputFmt::Text => {
            if !args.quiet { print_text_table(&report, args.cell_width); }
        }
        OutputFmt::Json => {
            let body = serde_json::to_vec_pretty(&report).context("failed to serialize report")?;
            if let Some(p) = args.json_path.as_ref() {
                match std::fs::write(p, body) {
                    Ok(_) => { if !args.quiet { println!("{}", paint(&format!("JSON written: {}", p), "1;36")); } },
                    Err(e) => log::error!("JSON write failed for {}: {}", p, e),
                }
            } else {
                println!("{}", String::from_utf8_lossy(&body));
            }
        }
    }
    Ok(())
}

fn build_report(args: &Args, root: &tree::Node, library_text: &str) -> Report {
    let library = rows::parse_rows(library_text);
    let matches = rows::flatten(root, args.rows);
    let datasets = if args.no_datasets || args.rows == RowKind::Matches { None } else { Some(rows::match_rows(root)) };
    let match_sort_by = args.match_sort_by.clone().unwrap_or_else(|| if args.rows == RowKind::Matches { args.sort_by.clone() } else { "Matches".to_string() });
    let library_exclude = if args.library_exclude.is_empty() { DEFAULT_LIBRARY_EXCLUDE.iter().map(|s| s.to_string()).collect() } else { args.library_exclude.clone() };
    let mut vis = Visibility::new();
    for c in [Container::Library, Container::Matches, Container::Datasets] { vis = vis.with(c.id(), DisplayState::Block); }
    vis = vis.with(visibility::PARAMS, DisplayState::None);
    for c in &args.hide { vis = vis.with(c.id(), DisplayState::None); }
    Report {
        title: args.title.clone().unwrap_or_else(|| "MASST Results".to_string()),
        input_label: args.input_label.clone().unwrap_or_default(),
        usi: args.usi.clone().filter(|u| !u.is_empty()),
        params: args.params.as_deref().map(template::resolve_value).unwrap_or_default(),
        generated: Local::now(),
        row_kind: args.rows,
        library,
        matches,
        datasets,
        layout: Layout { library_exclude, match_exclude: args.match_exclude.clone(), dataset_exclude: args.dataset_exclude.clone(), sort_by: args.sort_by.clone(), match_sort_by, ascending: args.ascending },
        visibility: vis,
    }
}

fn render_report_html(args: &Args, report: &Report, tree_text: &str, library_text: &str) -> Result<String> {
    let assets = match args.assets.as_ref() {
        Some(dir) => template::Assets::load(Path::new(dir))?,
        None => template::Assets::default(),
    };
    match args.template.as_ref() {
        Some(t) => {
            let library_json = if library_text.trim().is_empty() { "[]".to_string() } else { library_text.to_string() };
            let replacements = [
                (template::TREE_PLACEHOLDER, tree_text.to_string()),
                (template::LIBRARY_PLACEHOLDER, library_json),
                (template::INPUT_LABEL_PLACEHOLDER, cell::html_escape(&report.input_label)),
                (template::USI_LABEL_PLACEHOLDER, cell::html_escape(report.usi.as_deref().unwrap_or_default())),
                (template::PARAMS_PLACEHOLDER, cell::html_escape(&report.params)),
                (template::TABLES_PLACEHOLDER, html::render_tables(report)),
            ];
            template::fill_template_file(Path::new(t), &assets, &replacements)
        }
        None => Ok(html::render_html(report, args.theme, &assets)),
    }
}

fn table_records(t: &TableBuilder) -> (Vec<String>, Vec<Vec<String>>) {
    let cols = t.columns();
    let recs = t.data().iter().map(|r| cols.iter().map(|c| r.get(c).map(cell::display_text).unwrap_or_default()).collect()).collect();
    (cols, recs)
}

fn write_csv(path: &str, t: &TableBuilder) -> Result<(), std::io::Error> {
    let mut wtr = csv::Writer::from_path(path)?;
    let (cols, recs) = table_records(t);
    wtr.write_record(&cols)?;
    for r in recs { wtr.write_record(&r)?; }
    wtr.flush()?;
    Ok(())
}

fn write_tsv(path: &str, t: &TableBuilder) -> Result<(), std::io::Error> {
    let mut wtr = csv::WriterBuilder::new().delimiter(b'\t').from_path(path)?;
    let (cols, recs) = table_records(t);
    wtr.write_record(&cols)?;
    for r in recs { wtr.write_record(&r)?; }
    wtr.flush()?;
    Ok(())
}

fn print_text_table(rep: &Report, width: usize) {
    if !rep.input_label.is_empty() { println!("{}", paint(&format!("Input: {}", rep.input_label), "1;36")); }
    if let Some(u) = rep.usi.as_ref() { println!("{}", paint(&format!("USI: {}", u), "1;36")); }
    for sec in rep.sections() {
        println!("{}", paint(&format!("{} ({})", sec.heading, sec.table.data().len()), "1"));
        if sec.table.data().is_empty() { println!("{}", paint("(none)", "2")); continue; }
        let (cols, recs) = table_records(&sec.table);
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(cols.iter().map(|c| paint(c, "1")).collect::<Vec<_>>());
        for r in recs { table.add_row(r.iter().map(|v| truncate(v, width)).collect::<Vec<_>>()); }
        println!("{}", table);
    }
}

fn apply_config(args: &mut Args, cfg: AppConfig) {
    if args.tree.is_none() && let Some(v) = cfg.tree { args.tree = Some(v); }
    if args.library.is_none() && let Some(v) = cfg.library { args.library = Some(v); }
    if args.usi.is_none() && let Some(v) = cfg.usi { args.usi = Some(v); }
    if args.input_label.is_none() && let Some(v) = cfg.input_label { args.input_label = Some(v); }
    if args.params.is_none() && let Some(v) = cfg.params { args.params = Some(v); }
    if args.title.is_none() && let Some(v) = cfg.title { args.title = Some(v); }
    if args.rows == RowKind::Summary && let Some(v) = cfg.rows { args.rows = v; }
    if let Some(v) = cfg.no_datasets { args.no_datasets = args.no_datasets || v; }
    if args.sort_by == "Cosine" && let Some(v) = cfg.sort_by { args.sort_by = v; }
    if let Some(v) = cfg.ascending { args.ascending = args.ascending || v; }
    if args.match_sort_by.is_none() && let Some(v) = cfg.match_sort_by { args.match_sort_by = Some(v); }
    if args.library_exclude.is_empty() && let Some(v) = cfg.library_exclude { args.library_exclude = v; }
    if args.match_exclude.is_empty() && let Some(v) = cfg.match_exclude { args.match_exclude = v; }
    if args.dataset_exclude.is_empty() && let Some(v) = cfg.dataset_exclude { args.dataset_exclude = v; }
    if args.hide.is_empty() && let Some(v) = cfg.hide { args.hide = v; }
    if args.html.is_none() && let Some(v) = cfg.html { args.html = Some(v); }
    if args.template.is_none() && let Some(v) = cfg.template { args.template = Some(v); }
    if args.assets.is_none() && let Some(v) = cfg.assets { args.assets = Some(v); }
    if let Some(v) = cfg.theme { args.theme = v; }
    if args.json_path.is_none() && let Some(v) = cfg.json_path { args.json_path = Some(v); }
    if args.csv_path.is_none() && let Some(v) = cfg.csv_path { args.csv_path = Some(v); }
    if args.tsv_path.is_none() && let Some(v) = cfg.tsv_path { args.tsv_path = Some(v); }
    if args.md_path.is_none() && let Some(v) = cfg.md_path { args.md_path = Some(v); }
    if let Some(v) = cfg.output { args.output = v; }
    if args.log_format.is_none() && let Some(v) = cfg.log_format { args.log_format = Some(v); }
    if args.log_path.is_none() && let Some(v) = cfg.log_path { args.log_path = Some(v); }
}

fn truncate(s: &str, n: usize) -> String {
    let mut out: String = s.chars().take(n).collect();
    if s.chars().count() > n { out.push_str("..."); }
    out
}

fn paint(s: &str, code: &str) -> String {
    if *ENABLE_COLOR.get().unwrap_or(&true) { format!("\x1b[{}m{}\x1b[0m", code, s) } else { s.to_string() }
}

#[cfg(target_os = "windows")]
fn open_file_default(p: PathBuf) {
    let s = p.to_string_lossy().into_owned();
    let _ = std::process::Command::new("cmd").args(["/C", "start", "", &s]).spawn().map_err(|e| log::error!("Failed to open file {}: {}", s, e));
}

#[cfg(not(target_os = "windows"))]
fn open_file_default(p: PathBuf) {
    let s = p.to_string_lossy().into_owned();
    let _ = std::process::Command::new("xdg-open").arg(&s).spawn().map_err(|e| log::error!("Failed to open file {}: {}", s, e));
}
