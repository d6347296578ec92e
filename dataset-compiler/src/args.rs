//! Command-line arguments.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDateTime;
use clap::builder::BoolishValueParser;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use ephemeris::Mission;
use fiction::Franchise;
use shared::time::parse_horizons_time;

/// Parse duration string with units (e.g., "1.5s", "150ms", "2000us", "1h", "30m")
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    let (num_str, unit) = if let Some(n) = s.strip_suffix("ms") {
        (n, "ms")
    } else if let Some(n) = s.strip_suffix("us") {
        (n, "us")
    } else if let Some(n) = s.strip_suffix('s') {
        (n, "s")
    } else if let Some(n) = s.strip_suffix('h') {
        (n, "h")
    } else if let Some(n) = s.strip_suffix('m') {
        (n, "m")
    } else {
        // Bare numbers are seconds
        (s, "s")
    };

    let value: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid numeric value: {num_str}"))?;

    if !value.is_finite() || value < 0.0 {
        return Err("Duration must be a non-negative number".to_string());
    }

    let seconds = match unit {
        "us" => value / 1_000_000.0,
        "ms" => value / 1000.0,
        "s" => value,
        "m" => value * 60.0,
        "h" => value * 3600.0,
        _ => return Err(format!("Unknown time unit: {unit}")),
    };
    Duration::try_from_secs_f64(seconds).map_err(|e| format!("Duration out of range: {s}: {e}"))
}

/// Duration argument such as `120s`, `500ms` or `2m`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationArg(pub Duration);

impl std::str::FromStr for DurationArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_duration(s).map(DurationArg)
    }
}

impl std::fmt::Display for DurationArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let duration = self.0;
        let total_ms = duration.as_millis();

        if total_ms >= 1000 && total_ms % 1000 == 0 {
            write!(f, "{}s", total_ms / 1000)
        } else if total_ms >= 1000 {
            write!(f, "{:.3}s", duration.as_secs_f64())
        } else {
            write!(f, "{total_ms}ms")
        }
    }
}

/// Horizons `START_TIME`/`STOP_TIME` style instant.
fn parse_instant(s: &str) -> Result<NaiveDateTime, String> {
    parse_horizons_time(s).ok_or_else(|| format!("expected \"YYYY-MM-DD HH:MM:SS\", got {s:?}"))
}

/// Seconds as a float, e.g. `0.15`.
fn parse_seconds(s: &str) -> Result<Duration, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number of seconds: {s}"))?;
    Duration::try_from_secs_f64(value).map_err(|e| format!("Invalid number of seconds {s}: {e}"))
}

/// Dataset compiler for the Star Exploration viewer
#[derive(Parser, Debug)]
#[command(name = "compile-datasets")]
#[command(about = "Fetch public astronomy sources and compile the viewer's JSON datasets")]
#[command(version)]
pub struct Args {
    /// User-Agent for every request (defaults to a per-source bot name)
    #[arg(long, global = true)]
    pub user_agent: Option<String>,

    /// Whole-request HTTP timeout
    #[arg(long, global = true, default_value = "120s")]
    pub http_timeout: DurationArg,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// JPL Horizons feeds and manifest for one mission
    Ephemeris(EphemerisArgs),

    /// NASA Exoplanet Archive catalog
    Exoplanets(ExoplanetArgs),

    /// Comets (JPL SBDB) and meteorite landings (NASA Open Data)
    StellarObjects(StellarObjectArgs),

    /// Fictional star-system catalogs from fan wikis
    Fiction(FictionArgs),

    /// Convert a CSV or TSV file to a JSON array of objects
    CsvToJson {
        /// Delimited input file
        input: PathBuf,

        /// JSON output file
        output: PathBuf,
    },
}

impl Command {
    /// Job name used in failure messages.
    pub fn job_name(&self) -> String {
        match self {
            Command::Ephemeris(args) => format!("ephemeris ({})", args.mission),
            Command::Exoplanets(_) => "exoplanets".to_string(),
            Command::StellarObjects(_) => "stellar-objects".to_string(),
            Command::Fiction(_) => "fiction".to_string(),
            Command::CsvToJson { .. } => "csv-to-json".to_string(),
        }
    }
}

#[derive(ClapArgs, Debug)]
pub struct EphemerisArgs {
    /// voyager1, voyager2 or parker
    #[arg(long)]
    pub mission: Mission,

    /// Repository root the mission's output directory is relative to
    #[arg(long, default_value = ".")]
    pub repo_root: PathBuf,

    /// Write here instead of the mission's output directory
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Feed end, "YYYY-MM-DD HH:MM:SS" UTC (default: today 00:00)
    #[arg(long, value_parser = parse_instant)]
    pub stop: Option<NaiveDateTime>,

    /// Keep existing encounter-window files instead of refetching them
    #[arg(long)]
    pub skip_windows: bool,

    /// Pause between Horizons calls
    #[arg(long, default_value = "250ms")]
    pub call_delay: DurationArg,
}

#[derive(ClapArgs, Debug)]
pub struct ExoplanetArgs {
    /// Row limit for the planetary-systems table
    #[arg(long)]
    pub ps_maxrec: u32,

    /// Row limit for the stellar-hosts table
    #[arg(long)]
    pub sh_maxrec: u32,

    /// Catalog JSON to write
    #[arg(long)]
    pub output: PathBuf,

    /// Planets kept per system
    #[arg(long, default_value_t = 16)]
    pub planet_cap: usize,

    /// Gaia source ids per TAP query
    #[arg(long, default_value_t = exoplanets::gaia::DEFAULT_CHUNK_SIZE)]
    pub gaia_chunk: usize,

    /// Skip Gaia DR3 astrometry for companion stars
    #[arg(long)]
    pub no_gaia: bool,
}

#[derive(ClapArgs, Debug)]
pub struct StellarObjectArgs {
    /// Document JSON to write
    #[arg(long)]
    pub output: PathBuf,

    /// SBDB rows per page (at least 100)
    #[arg(long, default_value_t = 5000)]
    pub comet_page_size: usize,

    /// Look up discovery circumstances of numbered comets (1/0)
    #[arg(long, default_value = "1", action = clap::ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub enrich_numbered_comet_discovery: bool,

    /// Include comet fragments (1/0)
    #[arg(long, default_value = "0", action = clap::ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub include_comet_fragments: bool,
}

/// Which franchise catalogs to build.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FranchiseChoice {
    All,
    StarTrek,
    StarWars,
}

impl FranchiseChoice {
    pub fn franchises(self) -> Vec<Franchise> {
        match self {
            FranchiseChoice::All => Franchise::ALL.to_vec(),
            FranchiseChoice::StarTrek => vec![Franchise::StarTrek],
            FranchiseChoice::StarWars => vec![Franchise::StarWars],
        }
    }
}

#[derive(ClapArgs, Debug)]
pub struct FictionArgs {
    /// Directory holding the committed catalogs
    #[arg(long, default_value = "Fictional Stars/catalogs")]
    pub catalogs_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = FranchiseChoice::All)]
    pub franchise: FranchiseChoice,

    /// User-Agent for wiki requests
    #[arg(long, env = "CATALOG_BOT_UA")]
    pub bot_user_agent: Option<String>,

    /// Titles per wiki query
    #[arg(long, env = "CATALOG_BATCH_SIZE", default_value_t = 20)]
    pub batch_size: usize,

    /// Pause between wiki requests, seconds
    #[arg(long, env = "CATALOG_THROTTLE_S", default_value = "0.15", value_parser = parse_seconds)]
    pub throttle: Duration,

    /// Wiki request timeout, seconds
    #[arg(long, env = "CATALOG_HTTP_TIMEOUT_S", default_value_t = 120)]
    pub wiki_timeout_s: u64,

    /// Attempts per wiki request
    #[arg(long, env = "CATALOG_HTTP_RETRIES", default_value_t = 6)]
    pub wiki_retries: u32,

    #[arg(long, env = "STARTREK_FETCH_PLANET_WIKITEXT", default_value = "1", value_parser = BoolishValueParser::new())]
    pub startrek_fetch_planet_wikitext: bool,

    #[arg(long, env = "STARWARS_FETCH_PLANET_WIKITEXT", default_value = "1", value_parser = BoolishValueParser::new())]
    pub starwars_fetch_planet_wikitext: bool,

    #[arg(long, env = "STARWARS_INCLUDE_MOONS", default_value = "1", value_parser = BoolishValueParser::new())]
    pub starwars_include_moons: bool,

    #[arg(long, env = "STARTREK_MAX_CATEGORIES", default_value_t = 8000)]
    pub startrek_max_categories: usize,

    #[arg(long, env = "STARWARS_MAX_CATEGORIES", default_value_t = 8000)]
    pub starwars_max_categories: usize,

    /// Keep only the first N planet pages (0 keeps all)
    #[arg(long, env = "STARTREK_MAX_BODIES", default_value_t = 0)]
    pub startrek_max_bodies: usize,

    /// Keep only the first N planet and moon pages (0 keeps all)
    #[arg(long, env = "STARWARS_MAX_BODIES", default_value_t = 0)]
    pub starwars_max_bodies: usize,
}
