use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use ratekeeper::{conf, Conf, Ratekeeper};
use std::{
    env,
    fs::OpenOptions,
    path::Path,
    sync::Mutex,
};
use tracing::{error, info, warn, Level};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv_override().ok();

    let data_dir = conf::data_dir()?;
    let conf = Conf::load(&data_dir);
    let log_file = match &conf {
        Ok(conf) => conf.log_path(),
        Err(_) => data_dir.join("ratekeeper_update.log"),
    };
    init_logging(&log_file)?;

    let conf = conf.map_err(|e| {
        error!(%e, "Unable to load configuration");
        e
    })?;

    let args: Vec<String> = env::args().skip(1).collect();
    cli(&conf, &args).await
}

fn init_logging(log_file: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Unable to open log file {}", log_file.display()))?;

    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();

    Ok(())
}

async fn cli(conf: &Conf, args: &[String]) -> Result<()> {
    let rates = Ratekeeper::from_conf(conf)?;
    rates.initialize()?;

    match args.first().map(String::as_str) {
        None => update(&rates, &conf.currencies).await,
        Some("update") if args.len() == 1 => update(&rates, &conf.currencies).await,
        Some("update") => update(&rates, &args[1..]).await,
        Some("latest") if args.len() == 2 => {
            match rates.find_latest(&args[1])? {
                Some(quote) => println!("{}", serde_json::to_string(&quote)?),
                None => warn!(code = %args[1], "No quotes stored"),
            }
            Ok(())
        }
        Some("history") if (2..=4).contains(&args.len()) => {
            let start_date = args.get(2).map(|it| parse_date(it)).transpose()?;
            let end_date = args.get(3).map(|it| parse_date(it)).transpose()?;
            for quote in rates.find(&args[1], start_date, end_date)? {
                println!("{}", serde_json::to_string(&quote)?);
            }
            Ok(())
        }
        _ => {
            error!(?args, "Unknown arguments");
            bail!("Usage: ratekeeper [update [CODE...] | latest CODE | history CODE [START [END]]]")
        }
    }
}

async fn update(rates: &Ratekeeper, codes: &[String]) -> Result<()> {
    let report = rates.update(Some(codes)).await?;
    info!(
        fetched = report.fetched,
        duplicates = report.duplicates,
        inserted = report.inserted,
        failed = report.failures.len(),
        "Update finished"
    );
    Ok(())
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("Invalid date {}", s))
}
