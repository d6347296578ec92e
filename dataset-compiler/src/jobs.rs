//! One runner per subcommand: build the HTTP clients, call the library, report.

use std::time::Duration;

use anyhow::{Context, Result};
use ephemeris::{compile_mission, CompileOptions, HorizonsClient};
use exoplanets::{compile_catalog, CatalogOptions};
use fiction::{compile_franchise, FranchiseOptions, WikiClient};
use log::info;
use shared::{DatasetStore, HttpClient, HttpConfig, RetryPolicy};
use small_bodies::{compile_stellar_objects, CometOptions, SbdbClient};

use crate::args::{Args, EphemerisArgs, ExoplanetArgs, FictionArgs, StellarObjectArgs};

const EPHEMERIS_UA: &str = "MCS-Education-EphemerisBot/1.2";
const ARCHIVE_UA: &str = "MCS-Education-NASA-Archive-Updater/1.1";
const STELLAR_OBJECTS_UA: &str = "MCS-Education-Stellar-Objects-Updater/1.0";
const CATALOG_UA: &str = "MCS-Education-CatalogBot/1.0";

/// `prop=revisions` batches are large; their timeout never drops below this.
const WIKITEXT_MIN_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for wikitext batches given the configured wiki timeout.
pub fn wikitext_timeout(configured: Duration) -> Duration {
    configured.max(WIKITEXT_MIN_TIMEOUT)
}

/// Settings common to every job.
pub struct Globals {
    pub user_agent: Option<String>,
    pub http_timeout: Duration,
}

impl Globals {
    pub fn from_args(args: &Args) -> Self {
        Self {
            user_agent: args.user_agent.clone(),
            http_timeout: args.http_timeout.0,
        }
    }

    fn client(&self, default_ua: &str, retry: RetryPolicy) -> Result<HttpClient> {
        let ua = self.user_agent.as_deref().unwrap_or(default_ua);
        let config = HttpConfig::new(ua)
            .with_timeout(self.http_timeout)
            .with_retry(retry);
        HttpClient::new(config).context("building HTTP client")
    }
}

pub fn ephemeris(globals: &Globals, args: &EphemerisArgs) -> Result<()> {
    let plan = args.mission.plan();
    let root = args
        .output_dir
        .clone()
        .unwrap_or_else(|| args.repo_root.join(&plan.output_dir));

    let http = globals.client(EPHEMERIS_UA, RetryPolicy::horizons())?;
    let client = HorizonsClient::new(http).with_call_delay(args.call_delay.0);
    let options = CompileOptions {
        output_root: Some(root.clone()),
        stop: args.stop,
        skip_windows: args.skip_windows,
    };

    info!("Compiling {} into {}", plan.id, root.display());
    let report = compile_mission(&client, &plan, &options)
        .with_context(|| format!("compiling {}", args.mission))?;
    info!(
        "Done: {} feeds, manifest {}",
        report.files.len(),
        report.manifest.display()
    );
    Ok(())
}

pub fn exoplanets(globals: &Globals, args: &ExoplanetArgs) -> Result<()> {
    let archive = globals.client(ARCHIVE_UA, RetryPolicy::archive())?;
    let gaia = if args.no_gaia {
        None
    } else {
        Some(globals.client(ARCHIVE_UA, RetryPolicy::gaia())?)
    };
    let options = CatalogOptions {
        ps_maxrec: args.ps_maxrec,
        sh_maxrec: args.sh_maxrec,
        planet_cap: args.planet_cap,
        gaia_chunk: args.gaia_chunk,
        gaia_retry: RetryPolicy::gaia(),
    };

    compile_catalog(&archive, gaia.as_ref(), &options, &args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    Ok(())
}

pub fn stellar_objects(globals: &Globals, args: &StellarObjectArgs) -> Result<()> {
    let http = globals.client(STELLAR_OBJECTS_UA, RetryPolicy::sbdb())?;
    let sbdb = SbdbClient::new(&http);
    let options = CometOptions {
        page_size: args.comet_page_size,
        enrich_discovery: args.enrich_numbered_comet_discovery,
        include_fragments: args.include_comet_fragments,
    };

    compile_stellar_objects(&sbdb, &&http, &options, &args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    Ok(())
}

pub fn fiction(globals: &Globals, args: &FictionArgs) -> Result<()> {
    let ua = args
        .bot_user_agent
        .as_deref()
        .or(globals.user_agent.as_deref())
        .unwrap_or(CATALOG_UA);
    let timeout = Duration::from_secs(args.wiki_timeout_s);
    let config = HttpConfig::new(ua)
        .with_accept("application/json")
        .with_timeout(timeout)
        .with_retry(RetryPolicy::mediawiki().with_attempts(args.wiki_retries));
    let http = HttpClient::new(config.clone()).context("building HTTP client")?;
    let wikitext_http = HttpClient::new(config.with_timeout(wikitext_timeout(timeout)))
        .context("building wikitext HTTP client")?;
    let store = DatasetStore::new(&args.catalogs_dir);

    for franchise in args.franchise.franchises() {
        let client = WikiClient::new(&http, franchise.api_url())
            .with_batch_size(args.batch_size)
            .with_throttle(args.throttle)
            .with_wikitext_fetch(&wikitext_http);
        let options = match franchise {
            fiction::Franchise::StarTrek => FranchiseOptions {
                fetch_wikitext: args.startrek_fetch_planet_wikitext,
                include_moons: false,
                max_categories: args.startrek_max_categories,
                max_bodies: args.startrek_max_bodies,
            },
            fiction::Franchise::StarWars => FranchiseOptions {
                fetch_wikitext: args.starwars_fetch_planet_wikitext,
                include_moons: args.starwars_include_moons,
                max_categories: args.starwars_max_categories,
                max_bodies: args.starwars_max_bodies,
            },
        };

        info!("Building {franchise} catalog");
        compile_franchise(&client, franchise, &options, &store)
            .with_context(|| format!("building {franchise} catalog"))?;
    }

    let catalogs = store
        .list("json")
        .with_context(|| format!("listing {}", args.catalogs_dir.display()))?;
    info!("{} now holds: {}", args.catalogs_dir.display(), catalogs.join(", "));
    Ok(())
}

pub fn csv_to_json(input: &std::path::Path, output: &std::path::Path) -> Result<()> {
    let rows = shared::tabular::convert_file(input, output)
        .with_context(|| format!("converting {}", input.display()))?;
    info!("Wrote {} ({rows} rows)", output.display());
    Ok(())
}
