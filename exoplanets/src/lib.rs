//! NASA Exoplanet Archive catalog.
//!
//! Joins the archive's planetary-systems (`ps`) table with its `stellarhosts`
//! table, optionally places companion stars on the sky using Gaia DR3
//! astrometry, and writes one compact JSON catalog of systems.

pub mod archive;
pub mod catalog;
pub mod gaia;
pub mod names;
pub mod physics;
pub mod stellar;

use std::path::Path;

use log::info;
use shared::time::now_iso_z;
use shared::{write_json_atomic, Fetch, JsonStyle, RetryPolicy};

pub use archive::{ArchiveError, ArchiveResult};
pub use catalog::{Catalog, CatalogMeta, GaiaEnrichment, Planet, Star, System};
pub use gaia::{Astrometry, AstrometryMap};
pub use stellar::StellarMaps;

use crate::archive::{fetch_rows, ps_url, stellarhosts_url};
use crate::catalog::{ingest_rows, IngestContext, SOURCE_NAME};

/// Knobs for one catalog build.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogOptions {
    pub ps_maxrec: u32,
    pub sh_maxrec: u32,
    /// Planets kept per system
    pub planet_cap: usize,
    pub gaia_chunk: usize,
    /// Re-asks for Gaia chunks whose answer is not CSV
    pub gaia_retry: RetryPolicy,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            ps_maxrec: 50_000,
            sh_maxrec: 50_000,
            planet_cap: 16,
            gaia_chunk: gaia::DEFAULT_CHUNK_SIZE,
            gaia_retry: RetryPolicy::gaia(),
        }
    }
}

/// Fetch both archive tables and assemble the catalog.
///
/// `gaia` is the Gaia TAP client; pass `None` to skip astrometry, in which
/// case no star gets `posAU`.
///
/// # Errors
///
/// Fails when either archive table cannot be fetched or is not an array of
/// rows. Gaia failures only reduce enrichment.
pub fn build_catalog<A: Fetch, G: Fetch>(
    archive: &A,
    gaia: Option<&G>,
    options: &CatalogOptions,
) -> ArchiveResult<Catalog> {
    let ps_url = ps_url(options.ps_maxrec);
    let sh_url = stellarhosts_url(options.sh_maxrec);

    info!("[1/4] Fetching planetary systems (maxrec {})", options.ps_maxrec);
    let ps_rows = fetch_rows(archive, &ps_url)?;
    info!("      {} rows", ps_rows.len());

    info!("[2/4] Fetching stellar hosts (maxrec {})", options.sh_maxrec);
    let sh_rows = fetch_rows(archive, &sh_url)?;
    let stellar = StellarMaps::build(&sh_rows);
    info!(
        "      {} rows, {} multi-star systems, {} Gaia ids",
        sh_rows.len(),
        stellar.stars_by_system.len(),
        stellar.gaia_ids.len()
    );

    let astrometry = match gaia {
        Some(fetch) => {
            info!("[3/4] Resolving Gaia DR3 astrometry");
            gaia::fetch_astrometry(
                fetch,
                &stellar.gaia_ids,
                options.gaia_chunk,
                &options.gaia_retry,
            )
        }
        None => {
            info!("[3/4] Gaia enrichment disabled");
            AstrometryMap::new()
        }
    };

    info!("[4/4] Building systems");
    let source_label = format!("TAP/ps default_flag maxrec {}", options.ps_maxrec);
    let generated_at = now_iso_z();
    let ctx = IngestContext {
        stellar: &stellar,
        gaia: &astrometry,
        planet_cap: options.planet_cap,
        source_label: &source_label,
        retrieved_at: &generated_at,
    };
    let systems = ingest_rows(&ps_rows, &ctx);
    info!("      {} systems", systems.len());

    Ok(Catalog {
        meta: CatalogMeta {
            source: SOURCE_NAME.to_string(),
            generated_at,
            ps_maxrec: options.ps_maxrec,
            stellar_hosts_maxrec: options.sh_maxrec,
            ps_url,
            stellar_hosts_url: sh_url,
            dataset_version: source_label,
            gaia_enrichment: GaiaEnrichment {
                enabled: gaia.is_some(),
                unique_source_ids: stellar.gaia_ids.len(),
                resolved: astrometry.len(),
            },
        },
        systems,
    })
}

/// [`build_catalog`] and write the result compactly to `output`.
pub fn compile_catalog<A: Fetch, G: Fetch>(
    archive: &A,
    gaia: Option<&G>,
    options: &CatalogOptions,
    output: &Path,
) -> ArchiveResult<Catalog> {
    let catalog = build_catalog(archive, gaia, options)?;
    write_json_atomic(output, &catalog, JsonStyle::Compact)?;
    info!("Wrote {} ({} systems)", output.display(), catalog.systems.len());
    Ok(catalog)
}
