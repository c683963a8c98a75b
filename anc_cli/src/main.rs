use anc_core::*;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "anc")]
#[command(about = "Antenatal care decision support (WHO DAK ANC module)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to $XDG_CONFIG_HOME/anc/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// External guideline catalog (TOML) instead of the built-in one
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Decision-support alerts for every visit in a case file
    Alerts {
        /// Patient case JSON ({"pregnancy": {...}, "visits": [...]})
        case: PathBuf,

        /// Output format (json, text)
        #[arg(long)]
        format: Option<OutputFormat>,
    },

    /// Recommend the next scheduled ANC contact
    NextVisit {
        case: PathBuf,

        /// Output format (json, text)
        #[arg(long)]
        format: Option<OutputFormat>,
    },

    /// Alerts, next contact and indicators for one case
    Evaluate {
        case: PathBuf,

        /// Output format (json, text)
        #[arg(long)]
        format: Option<OutputFormat>,
    },

    /// Quality indicators over the visits of one or more cases
    Indicators {
        #[arg(required = true)]
        cases: Vec<PathBuf>,

        /// Output format (json, text, csv)
        #[arg(long)]
        format: Option<OutputFormat>,
    },

    /// Validate and summarize the active guideline catalog
    Catalog {
        /// Write the catalog as TOML to this path
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Show the effective configuration
    Config {
        /// Save it to the config path
        #[arg(long)]
        write: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Initialize logging
    if cli.verbose {
        anc_core::logging::init_with_level("debug");
    } else {
        anc_core::logging::init_with_level(&config.logging.level);
    }

    match cli.command {
        Commands::Alerts { case, format } => {
            let catalog = load_catalog(cli.catalog.as_deref(), &config)?;
            let case = read_case(&case)?;
            let alerts = Engine::new(&catalog).generate_alerts(&case.pregnancy, &case.visits);
            match single_case_format(format, &config)? {
                OutputFormat::Text => display_alerts(&alerts),
                _ => print_json(&alerts)?,
            }
            Ok(())
        }
        Commands::NextVisit { case, format } => {
            let catalog = load_catalog(cli.catalog.as_deref(), &config)?;
            let case = read_case(&case)?;
            let rec = Engine::new(&catalog).recommend_next_visit(&case.pregnancy, &case.visits);
            match single_case_format(format, &config)? {
                OutputFormat::Text => display_recommendation(&rec),
                _ => print_json(&rec)?,
            }
            Ok(())
        }
        Commands::Evaluate { case, format } => {
            let catalog = load_catalog(cli.catalog.as_deref(), &config)?;
            let case = read_case(&case)?;
            let evaluation = Engine::new(&catalog).evaluate(&case.pregnancy, &case.visits);
            match single_case_format(format, &config)? {
                OutputFormat::Text => {
                    display_alerts(&evaluation.alerts);
                    display_recommendation(&evaluation.recommendation);
                    display_indicators(&evaluation.indicators);
                }
                _ => print_json(&evaluation)?,
            }
            Ok(())
        }
        Commands::Indicators { cases, format } => {
            let catalog = load_catalog(cli.catalog.as_deref(), &config)?;
            cmd_indicators(&catalog, &cases, format.unwrap_or(config.output.format))
        }
        Commands::Catalog { export } => {
            let catalog = load_catalog(cli.catalog.as_deref(), &config)?;
            cmd_catalog(&catalog, export.as_deref())
        }
        Commands::Config { write } => cmd_config(&config, cli.config.as_deref(), write),
    }
}

/// Catalog source: `--catalog`, then the config file, then the built-in guideline
fn load_catalog(cli_path: Option<&Path>, config: &Config) -> Result<Catalog> {
    match cli_path.or(config.catalog.path.as_deref()) {
        Some(path) => Catalog::load_from(path),
        None => Ok(get_default_catalog().clone()),
    }
}

/// Read a patient case, rejecting a `visits` value that is not a list
fn read_case(path: &Path) -> Result<PatientCase> {
    let contents = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&contents)?;

    match value.get("visits") {
        Some(serde_json::Value::Array(_)) => {}
        Some(_) => {
            return Err(Error::Input(format!(
                "{}: 'visits' must be a list of visit records",
                path.display()
            )))
        }
        None => {
            return Err(Error::Input(format!(
                "{}: missing 'visits' list",
                path.display()
            )))
        }
    }

    let case: PatientCase = serde_json::from_value(value)?;
    tracing::info!("Read {} visits from {:?}", case.visits.len(), path);
    Ok(case)
}

/// CSV only applies to indicators; a configured CSV default falls back to JSON
fn single_case_format(requested: Option<OutputFormat>, config: &Config) -> Result<OutputFormat> {
    match requested {
        Some(OutputFormat::Csv) => Err(Error::Input(
            "CSV output is only available for the indicators command".into(),
        )),
        Some(format) => Ok(format),
        None if config.output.format == OutputFormat::Csv => Ok(OutputFormat::Json),
        None => Ok(config.output.format),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_indicators(catalog: &Catalog, cases: &[PathBuf], format: OutputFormat) -> Result<()> {
    let mut visits = Vec::new();
    for path in cases {
        visits.extend(read_case(path)?.visits);
    }

    let results = Engine::new(catalog).compute_indicators(&visits);

    match format {
        OutputFormat::Json => print_json(&results)?,
        OutputFormat::Text => display_indicators(&results),
        OutputFormat::Csv => write_indicators_csv(&results, std::io::stdout().lock())?,
    }

    Ok(())
}

fn cmd_catalog(catalog: &Catalog, export: Option<&Path>) -> Result<()> {
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid catalog".into()));
    }

    println!("Guideline catalog {}", catalog.version);
    println!(
        "  {} decision points, {} scheduled contacts, {} indicators",
        catalog.decision_points.len(),
        catalog.contacts.len(),
        catalog.indicators.len()
    );
    println!();
    for point in catalog.decision_points.values() {
        println!("  {:<10} {:<7} {}", point.id, point.priority, point.name);
    }
    println!();
    for contact in &catalog.contacts {
        println!(
            "  {:<10} {:>2}-{:<2} wks  {}",
            contact.id, contact.window.min, contact.window.max, contact.name
        );
    }

    if let Some(path) = export {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, catalog.to_toml_string()?)?;
        println!();
        println!("✓ Exported catalog to {}", path.display());
    }

    Ok(())
}

fn cmd_config(config: &Config, config_path: Option<&Path>, write: bool) -> Result<()> {
    print!("{}", config.to_toml_string()?);

    if write {
        let path = match config_path {
            Some(path) => {
                config.save_to(path)?;
                path.to_path_buf()
            }
            None => {
                config.save()?;
                Config::default_config_path()
            }
        };
        println!();
        println!("✓ Saved config to {}", path.display());
    }

    Ok(())
}

fn display_alerts(alerts: &[Alert]) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  DECISION SUPPORT ALERTS ({})", alerts.len());
    println!("╰─────────────────────────────────────────╯");
    println!();

    if alerts.is_empty() {
        println!("  No alerts - all assessments documented");
    }

    let mut current_visit = None;
    for alert in alerts {
        if current_visit != Some(alert.visit_number) {
            current_visit = Some(alert.visit_number);
            match alert.visit_number {
                Some(n) => println!("  Visit {}", n),
                None => println!("  Visit (unnumbered)"),
            }
        }
        println!("    [{:<6}] {}", alert.priority, alert.message);
        println!("             {} → {}", alert.code, alert.action);
    }

    println!();
}

fn display_recommendation(rec: &VisitRecommendation) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  NEXT ANC CONTACT: visit {}", rec.visit_number);
    println!("╰─────────────────────────────────────────╯");
    println!();

    match &rec.schedule {
        Some(contact) => {
            println!("  {} ({}) - priority {}", contact.name, contact.id, rec.priority);
            if let Some(weeks) = rec.recommended_gestational_age {
                println!("  → Target: {} weeks", weeks);
            }
            match rec.recommended_date {
                Some(date) => println!("  → Date: {}", date),
                None => println!("  → Date: unknown (no LMP recorded)"),
            }
            println!("  → Required: {}", rec.required_assessments.join(", "));
        }
        None => println!("  Scheduled contacts complete"),
    }

    println!("  Current gestational age: {} weeks", rec.current_gestational_age);
    if rec.overdue {
        println!("  ⚠ Contact overdue");
    }

    println!();
}

fn display_indicators(results: &[IndicatorResult]) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  ANC INDICATORS");
    println!("╰─────────────────────────────────────────╯");
    println!();

    for r in results {
        println!(
            "  {:<11} {:<32} {:>3}/{:<3} {:>6.1}% (target {}) {}",
            r.id, r.name, r.numerator, r.denominator, r.percentage, r.target, r.status
        );
    }

    println!();
}
