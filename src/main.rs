use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mixset_catalog::config::Config;
use mixset_catalog::export::Exporter;
use mixset_catalog::filter::{apply_filters, name_list, tag_vocabulary, DatasetBounds, FilterCriteria};
use mixset_catalog::{load_dataset_csv, Dataset, ScrapePipeline};

fn cli() -> Command {
    Command::new("Mixset Catalog")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Scrape DJ mix sets into a typed, filterable catalog")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("scrape")
                .about("Scrape a profile and its sets")
                .arg(
                    Arg::new("profile-url")
                        .value_name("PROFILE_URL")
                        .help("Profile page, e.g. https://www.mixcloud.com/<name>/")
                        .required(true),
                )
                .arg(
                    Arg::new("sample-size")
                        .short('n')
                        .long("sample-size")
                        .value_name("NUM")
                        .help("Number of sets to visit; 0 or negative visits all")
                        .allow_negative_numbers(true)
                        .value_parser(clap::value_parser!(i64)),
                )
                .arg(
                    Arg::new("scroll-count")
                        .short('s')
                        .long("scroll-count")
                        .value_name("NUM")
                        .help("Times to scroll the profile page")
                        .value_parser(clap::value_parser!(u32)),
                )
                .arg(
                    Arg::new("headful")
                        .long("headful")
                        .help("Show the browser window")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("output-dir")
                        .short('o')
                        .long("output-dir")
                        .value_name("DIR")
                        .help("Output directory for results"),
                )
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("FILE")
                        .help("Configuration file"),
                ),
        )
        .subcommand(
            Command::new("filter")
                .about("Filter a scraped sets table")
                .arg(
                    Arg::new("sets-csv")
                        .value_name("SETS_CSV")
                        .required(true),
                )
                .arg(
                    Arg::new("name")
                        .long("name")
                        .value_name("NAME")
                        .help("Keep sets by this creator (repeatable)")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("tag")
                        .long("tag")
                        .value_name("TAG")
                        .help("Keep sets with any of these tags (repeatable)")
                        .action(ArgAction::Append),
                )
                .arg(Arg::new("from").long("from").value_name("DATE").help("Uploaded on or after (YYYY-MM-DD)"))
                .arg(Arg::new("to").long("to").value_name("DATE").help("Uploaded on or before (YYYY-MM-DD)"))
                .arg(Arg::new("plays").long("plays").value_name("LO:HI"))
                .arg(Arg::new("favs").long("favs").value_name("LO:HI"))
                .arg(Arg::new("energy").long("energy").value_name("LO:HI"))
                .arg(Arg::new("bpm").long("bpm").value_name("LO:HI")),
        )
        .subcommand(
            Command::new("tags")
                .about("List tag vocabulary and creator names of a sets table")
                .arg(
                    Arg::new("sets-csv")
                        .value_name("SETS_CSV")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Write the default configuration")
                .arg(
                    Arg::new("write")
                        .long("write")
                        .value_name("FILE")
                        .default_value("mixset-catalog.toml"),
                ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let verbose = matches.get_flag("verbose");

    let default_filter = if verbose {
        "mixset_catalog=debug,info"
    } else {
        "mixset_catalog=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match matches.subcommand() {
        Some(("scrape", sub)) => run_scrape(sub, verbose).await,
        Some(("filter", sub)) => run_filter(sub),
        Some(("tags", sub)) => run_tags(sub),
        Some(("config", sub)) => run_config(sub),
        _ => Err(anyhow!("no subcommand given")),
    }
}

async fn run_scrape(matches: &ArgMatches, verbose: bool) -> Result<()> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::load_from(Path::new(path))
            .with_context(|| format!("failed to load config {}", path))?,
        None => Config::load().unwrap_or_else(|e| {
            warn!("Failed to load config, using defaults: {}", e);
            Config::default()
        }),
    };
    if let Some(dir) = matches.get_one::<String>("output-dir") {
        config.output.output_dir = PathBuf::from(dir);
    }

    let profile_url = matches
        .get_one::<String>("profile-url")
        .ok_or_else(|| anyhow!("PROFILE_URL is required"))?;
    let sample_size = matches
        .get_one::<i64>("sample-size")
        .copied()
        .unwrap_or(config.scrape.sample_size);
    let scroll_count = matches
        .get_one::<u32>("scroll-count")
        .copied()
        .unwrap_or(config.scrape.scroll_count);
    let headless = !matches.get_flag("headful") && config.browser.headless;

    info!("🚀 Mixset Catalog starting...");
    if verbose {
        info!("{}", config.summary());
    }

    let exporter = Exporter::from_config(&config.output);
    let output = config.output.clone();
    let pipeline = ScrapePipeline::new(config)?;

    let outcome = match pipeline
        .scrape_profile(profile_url, sample_size, scroll_count, headless, verbose)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("❌ Scrape failed: {}", e);
            return Err(e.into());
        }
    };

    let stem = output.file_stem(&outcome.profile_slug());
    let written = exporter
        .export(&stem, &outcome.profile, &outcome.dataset)
        .await
        .context("failed to write output")?;

    info!(
        "✅ {} set(s) for '{}' written to {} file(s) in {}",
        outcome.dataset.len(),
        outcome.profile.name,
        written.len(),
        exporter.output_dir().display()
    );
    Ok(())
}

fn run_filter(matches: &ArgMatches) -> Result<()> {
    let path = required_path(matches, "sets-csv")?;
    let dataset = load_dataset_csv(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;

    let mut builder = FilterCriteria::builder();
    if let Some(names) = matches.get_many::<String>("name") {
        builder = builder.with_names(names.cloned());
    }
    if let Some(tags) = matches.get_many::<String>("tag") {
        builder = builder.with_tags(tags.cloned());
    }

    let from = optional_date(matches, "from")?;
    let to = optional_date(matches, "to")?;
    if from.is_some() || to.is_some() {
        let bounds = DatasetBounds::from_dataset(&dataset);
        let (first, last) = bounds.uploaded.unwrap_or((NaiveDate::MIN, NaiveDate::MAX));
        builder = builder.uploaded_between(from.unwrap_or(first), to.unwrap_or(last));
    }
    if let Some((lo, hi)) = optional_range::<u64>(matches, "plays")? {
        builder = builder.plays_between(lo, hi);
    }
    if let Some((lo, hi)) = optional_range::<u64>(matches, "favs")? {
        builder = builder.favs_between(lo, hi);
    }
    if let Some((lo, hi)) = optional_range::<u32>(matches, "energy")? {
        builder = builder.energy_overlapping(lo, hi);
    }
    if let Some((lo, hi)) = optional_range::<u32>(matches, "bpm")? {
        builder = builder.bpm_overlapping(lo, hi);
    }

    let criteria = builder.build();
    let filtered = apply_filters(&dataset, &criteria);
    info!("🔍 {} of {} set(s) match", filtered.len(), dataset.len());
    print_rows(&filtered);
    Ok(())
}

fn run_tags(matches: &ArgMatches) -> Result<()> {
    let path = required_path(matches, "sets-csv")?;
    let dataset = load_dataset_csv(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;

    println!("Tags:");
    for tag in tag_vocabulary(&dataset) {
        println!("  {}", tag);
    }
    println!("Names:");
    for name in name_list(&dataset) {
        println!("  {}", name);
    }
    Ok(())
}

fn run_config(matches: &ArgMatches) -> Result<()> {
    let path = required_path(matches, "write")?;
    Config::default().save(&path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn required_path(matches: &ArgMatches, id: &str) -> Result<PathBuf> {
    matches
        .get_one::<String>(id)
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("missing argument {}", id))
}

fn optional_date(matches: &ArgMatches, id: &str) -> Result<Option<NaiveDate>> {
    matches
        .get_one::<String>(id)
        .map(|value| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .with_context(|| format!("--{} expects YYYY-MM-DD, got '{}'", id, value))
        })
        .transpose()
}

fn optional_range<T>(matches: &ArgMatches, id: &str) -> Result<Option<(T, T)>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let Some(value) = matches.get_one::<String>(id) else {
        return Ok(None);
    };
    let (lo, hi) = value
        .split_once(':')
        .ok_or_else(|| anyhow!("--{} expects LO:HI, got '{}'", id, value))?;
    Ok(Some((
        lo.trim().parse().with_context(|| format!("--{} lower bound", id))?,
        hi.trim().parse().with_context(|| format!("--{} upper bound", id))?,
    )))
}

fn print_rows(dataset: &Dataset) {
    for record in dataset.iter() {
        println!(
            "{} | {} | plays {} | favs {} | {} | energy {} | bpm {} | {}",
            record.name,
            record.title.as_deref().unwrap_or("-"),
            display(record.play_count),
            display(record.fav_count),
            record
                .date_uploaded
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
            record
                .energy()
                .map(|r| format!("{}-{}", r.min, r.max))
                .unwrap_or_else(|| "-".to_string()),
            record
                .bpm()
                .map(|r| format!("{}-{}", r.min, r.max))
                .unwrap_or_else(|| "-".to_string()),
            record.show_url,
        );
    }
}

fn display<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
