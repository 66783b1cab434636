//! # eyla CLI
//!
//! The `eyla` binary runs the advert curation pipeline and exposes its
//! building blocks for spot checks.
//!
//! ## Usage
//!
//! ```bash
//! eyla --config ./config/eyla.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `eyla run` | Run the full pipeline and write the curated tables |
//! | `eyla sources` | List configured input tables and whether they exist |
//! | `eyla extract "<text>"` | Show the qualification level found in a description |
//! | `eyla reclassify <code>` | Show the coarse region for a NUTS3/ITL3 code |
//! | `eyla inflate <salary> <year>` | Express a salary in target-year prices |
//! | `eyla patterns` | Print the active qualification table |
//!
//! ## Examples
//!
//! ```bash
//! # Quick iteration on ten descriptions, single-threaded
//! eyla run --sample --serial --config ./config/eyla.toml
//!
//! # Machine-readable progress for CI logs
//! eyla run --progress json
//!
//! # Check what the matcher makes of a description
//! eyla extract "Level 3 in Childcare or NNEB required"
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use eyla::config::{self, Config, InflationConfig, QualificationsConfig};
use eyla::geography::{self, GeographyReference};
use eyla::inflation::InflationTable;
use eyla::models::RuralUrbanRecord;
use eyla::pipeline;
use eyla::progress::ProgressMode;
use eyla::qualification::{QualificationMatcher, QualificationTable};
use eyla::sources;
use eyla::tables::read_table;

/// eyla: qualification-level extraction and enrichment for early-years
/// job advert analysis.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/eyla.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "eyla",
    about = "Qualification-level extraction and enrichment for early-years job advert analysis",
    version,
    long_about = "eyla joins raw job adverts with salary, location and skill tables, extracts a \
    normalized qualification level from each description, classifies geography and writes a \
    curated, de-duplicated, inflation-adjusted advert table with monthly summaries."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/eyla.toml`. Input tables, output directory,
    /// batching, cleaning rules, inflation rates and the qualification
    /// table are read from this file.
    #[arg(long, global = true, default_value = "./config/eyla.toml")]
    config: PathBuf,

    /// Progress output on stderr. Defaults to `human` on a terminal,
    /// `off` otherwise.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline.
    ///
    /// Loads every input table, scores cohort descriptions in chunks,
    /// classifies geography, cleans and inflates, then writes
    /// curated_adverts.csv, curated_skills.csv and the monthly summaries
    /// into the output directory.
    Run {
        /// Score only the first `batch.sample_size` distinct descriptions.
        #[arg(long)]
        sample: bool,

        /// Score chunks on the current thread instead of in parallel.
        #[arg(long)]
        serial: bool,
    },

    /// List configured input tables and their status.
    Sources,

    /// Extract the qualification level from a piece of description text.
    ///
    /// Prints the normalized text, every recognised mention and the
    /// resulting (minimum) level. Uses the configured table when the
    /// config file loads, otherwise the built-in one.
    Extract {
        /// Raw description text.
        text: String,
    },

    /// Reclassify a fine-grained geography code.
    Reclassify {
        /// NUTS3 (`UK...`) or ITL3 (`TL...`) code.
        code: String,
    },

    /// Inflate a nominal salary observed in `year` to target-year prices.
    Inflate {
        salary: f64,
        year: i32,

        /// Override `inflation.target_year`.
        #[arg(long)]
        target_year: Option<i32>,
    },

    /// Print the active qualification table.
    Patterns,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let progress = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);

    // Commands that work without a config file
    match &cli.command {
        Commands::Extract { text } => {
            let matcher = QualificationMatcher::new(qualification_table(&cli.config)?)?;
            run_extract(&matcher, text);
            return Ok(());
        }
        Commands::Reclassify { code } => {
            run_reclassify(&cli.config, code)?;
            return Ok(());
        }
        Commands::Inflate {
            salary,
            year,
            target_year,
        } => {
            let mut table = inflation_table(&cli.config)?;
            if let Some(target) = target_year {
                table.target_year = *target;
            }
            match table.adjust(Some(*salary), *year) {
                Some(adjusted) => println!("{:.2}", adjusted),
                None => println!("none"),
            }
            return Ok(());
        }
        Commands::Patterns => {
            print_patterns(&qualification_table(&cli.config)?);
            return Ok(());
        }
        _ => {}
    }

    let mut cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Run { sample, serial } => {
            if sample {
                cfg.batch.production = false;
            }
            if serial {
                cfg.batch.parallel = false;
            }
            let reporter = progress.reporter();
            let output = pipeline::run_from_files(&cfg, reporter.as_ref())?;
            output.summary.print();
            println!("  Output:                {}", cfg.output.dir.display());
        }
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Extract { .. }
        | Commands::Reclassify { .. }
        | Commands::Inflate { .. }
        | Commands::Patterns => {
            // Handled above (before config loading)
        }
    }

    Ok(())
}

/// The config at `path`, or `None` when no file exists there. A file that
/// exists but does not load is an error.
fn optional_config(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }
    config::load_config(path).map(Some)
}

fn qualification_table(path: &Path) -> Result<QualificationTable> {
    match optional_config(path)? {
        Some(cfg) => cfg.qualifications.table(),
        None => QualificationsConfig::default().table(),
    }
}

fn inflation_table(path: &Path) -> Result<InflationTable> {
    match optional_config(path)? {
        Some(cfg) => cfg.inflation.table(),
        None => InflationConfig::default().table(),
    }
}

fn run_extract(matcher: &QualificationMatcher, text: &str) {
    let normalized = eyla::normalize::normalize(text);
    println!("table:      {}", matcher.version());
    println!("normalized: {}", normalized);
    for m in matcher.matches(&normalized) {
        let levels: Vec<String> = m.levels.iter().map(|l| l.to_string()).collect();
        println!("  match: {:<36} levels: {}", m.span, levels.join(", "));
    }
    match matcher.level_of(&normalized) {
        Some(level) => println!("level:      {}", level),
        None => println!("level:      none"),
    }
}

fn run_reclassify(config_path: &Path, code: &str) -> Result<()> {
    let reference = match optional_config(config_path)? {
        Some(cfg) => {
            let rows = read_table::<RuralUrbanRecord>(&cfg.inputs.rural_urban, "rural_urban")?;
            Some(GeographyReference::build(rows)?)
        }
        None => None,
    };

    let reclassified = match &reference {
        Some(reference) => reference.reclassify(code),
        None => geography::coarse_code(code).map(|coarse| geography::Reclassified {
            region_name: (coarse == geography::LONDON_CODE)
                .then(|| geography::LONDON_NAME.to_string()),
            coarse_code: coarse,
        }),
    };

    match reclassified {
        Some(r) => {
            println!("code:   {}", r.coarse_code);
            println!("region: {}", r.region_name.as_deref().unwrap_or("unknown"));
            println!("nation: {}", geography::nation_of(Some(r.coarse_code.as_str())));
            if let Some(class) = reference.as_ref().and_then(|g| g.class_of(&r.coarse_code)) {
                println!("ruc:    {}", class.broad_ruc.as_deref().unwrap_or("unknown"));
            }
        }
        None => println!("no code given"),
    }
    Ok(())
}

fn print_patterns(table: &QualificationTable) {
    println!("Qualification table {}", table.version);
    println!();
    let keywords: Vec<&str> = table.numbered.iter().map(|k| k.word()).collect();
    println!("  Numbered keywords: {}", keywords.join(", "));
    println!();
    println!("  {:<34} {:>5}   PHRASES", "TOKEN", "LEVEL");
    println!("  {}", "-".repeat(72));
    for (token, level) in &table.levels {
        println!(
            "  {:<34} {:>5}   {}",
            token.name(),
            level.get(),
            token.phrases().join(" | ")
        );
    }
}
