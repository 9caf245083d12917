use anyhow::{bail, Context, Result};
use std::env;
use std::path::Path;

// Use library instead of local modules
use meter_readings::{dry_run, load_csv, process_batch, Config, SqliteStore, UploadReport};

const USAGE: &str = "Usage:
  meter-readings validate <file.csv>   Validate a batch without storing it
  meter-readings import <file.csv>     Validate a batch and store it if every reading passes
  meter-readings accounts              List known customer accounts
  meter-readings count                 Count stored meter readings";

fn main() -> Result<()> {
    meter_readings::init_tracing();

    let args: Vec<String> = env::args().collect();
    let config = Config::from_env().context("Failed to read configuration")?;

    match args.get(1).map(String::as_str) {
        Some("validate") => run_batch(&config, csv_arg(&args)?, false),
        Some("import") => run_batch(&config, csv_arg(&args)?, true),
        Some("accounts") => run_accounts(&config),
        Some("count") => run_count(&config),
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    }
}

fn csv_arg(args: &[String]) -> Result<&Path> {
    match args.get(2) {
        Some(path) => Ok(Path::new(path)),
        None => bail!("missing CSV path\n\n{USAGE}"),
    }
}

fn open_store(config: &Config) -> Result<SqliteStore> {
    let store = SqliteStore::open(&config.database_path)
        .with_context(|| format!("Failed to open database {:?}", config.database_path))?;

    if config.seed_accounts {
        store.seed_default_accounts().context("Failed to seed accounts")?;
    }

    Ok(store)
}

fn run_batch(config: &Config, csv_path: &Path, persist: bool) -> Result<()> {
    println!("📂 Loading {}...", csv_path.display());
    let candidates = load_csv(csv_path)
        .with_context(|| format!("Failed to parse {}", csv_path.display()))?;
    println!("✓ Loaded {} reading(s)", candidates.len());

    let store = open_store(config)?;

    let report = if persist {
        process_batch(&store, &candidates)?
    } else {
        dry_run(&store, &candidates)?
    };

    print_report(&report);

    if persist && report.success {
        let total = store.count_readings()?;
        println!("✓ Database contains {} reading(s)", total);
    }

    if !report.success {
        std::process::exit(1);
    }

    Ok(())
}

fn print_report(report: &UploadReport) {
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    let marker = if report.success { "✅" } else { "❌" };
    println!("{} {}", marker, report.message);

    for (rule, count) in &report.rejections {
        println!("   {:<16} {}", rule.as_str(), count);
    }
}

fn run_accounts(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let accounts = store.get_accounts()?;

    for account in &accounts {
        println!("{:>6}  {} {}", account.id, account.first_name, account.last_name);
    }
    println!("✓ {} account(s)", accounts.len());

    Ok(())
}

fn run_count(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    println!("✓ Database contains {} reading(s)", store.count_readings()?);
    Ok(())
}
