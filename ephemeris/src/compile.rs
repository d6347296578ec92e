//! Mission feed compilation.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use log::info;
use shared::time::{format_horizons_time, now_iso_seconds, today_midnight_utc};
use shared::{write_json_atomic, Fetch, OutputError};
use thiserror::Error;

use crate::client::HorizonsClient;
use crate::dataset::{
    FeedObject, Frame, Manifest, ManifestEntry, MultiFeed, MultiMeta, ObjectRef, SingleFeed,
    SingleMeta, Source, WindowMeta, SCHEMA_MANIFEST, SCHEMA_MULTI, SCHEMA_SINGLE,
};
use crate::mission::{EncounterWindow, MissionPlan, ObjectKeying};
use crate::parse::{HorizonsError, VectorTable};

/// JD agreement required between bodies sharing one feed.
const GRID_TOLERANCE: f64 = 1e-10;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("{dataset}: {source}")]
    Horizons {
        dataset: String,
        #[source]
        source: HorizonsError,
    },

    /// A body came back on a different time grid than the first one.
    #[error("time grid mismatch for {body}; refusing to write multi-body feed")]
    GridMismatch { body: String },

    #[error(transparent)]
    Output(#[from] OutputError),
}

pub type CompileResult<T> = Result<T, CompileError>;

/// Run-time choices layered on top of a [`MissionPlan`].
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Output root; defaults to the plan's directory under the current directory
    pub output_root: Option<PathBuf>,
    /// Feed end; defaults to today 00:00 UTC
    pub stop: Option<NaiveDateTime>,
    pub skip_windows: bool,
}

/// What a run wrote.
#[derive(Debug, Clone, Default)]
pub struct CompileReport {
    pub files: Vec<PathBuf>,
    pub manifest: PathBuf,
}

fn same_grid(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= GRID_TOLERANCE)
}

fn fetch_for<F: Fetch>(
    client: &HorizonsClient<F>,
    dataset: &str,
    command: i64,
    start: NaiveDateTime,
    stop: NaiveDateTime,
    step: crate::query::StepSize,
) -> CompileResult<VectorTable> {
    client
        .vectors(command, start, stop, step)
        .map_err(|source| CompileError::Horizons {
            dataset: dataset.to_string(),
            source,
        })
}

fn source_for<F: Fetch>(client: &HorizonsClient<F>) -> Source {
    Source {
        service: client.url().to_string(),
        ..Source::default()
    }
}

/// Fetch every body in the plan onto one grid and build the multi-body feed.
pub fn build_planets_feed<F: Fetch>(
    client: &HorizonsClient<F>,
    plan: &MissionPlan,
    stop: NaiveDateTime,
) -> CompileResult<MultiFeed> {
    let dataset = plan.planets_id();
    let mut grid: Option<Vec<f64>> = None;
    let mut objects = Vec::with_capacity(plan.bodies.len());
    let mut signature = serde_json::Map::new();

    for body in &plan.bodies {
        info!("  - {} (COMMAND={})", body.name, body.spkid);
        let table = fetch_for(client, &dataset, body.spkid, plan.launch, stop, plan.planet_step)?;

        match &grid {
            None => grid = Some(table.t_jd.clone()),
            Some(reference) if !same_grid(reference, &table.t_jd) => {
                return Err(CompileError::GridMismatch {
                    body: body.name.clone(),
                })
            }
            Some(_) => {}
        }
        if signature.is_empty() {
            signature = table.signature;
        }

        let (key, spkid) = match plan.keying {
            ObjectKeying::ByName => (body.name.clone(), Some(body.spkid)),
            ObjectKeying::BySpkId => (body.spkid.to_string(), None),
        };
        objects.push((
            key,
            FeedObject {
                name: body.name.clone(),
                spkid,
                pv: table.pv,
            },
        ));
    }

    Ok(MultiFeed {
        schema: SCHEMA_MULTI,
        t_jd: grid.unwrap_or_default(),
        objects,
        meta: MultiMeta {
            generated_at: now_iso_seconds(),
            source: source_for(client),
            frame: Frame::default(),
            signature,
        },
    })
}

/// Spacecraft feed over `[start, stop]`, optionally tagged with its window.
pub fn build_spacecraft_feed<F: Fetch>(
    client: &HorizonsClient<F>,
    plan: &MissionPlan,
    dataset: &str,
    start: NaiveDateTime,
    stop: NaiveDateTime,
    window: Option<&EncounterWindow>,
) -> CompileResult<SingleFeed> {
    let step = window.map_or(plan.daily_step, |w| w.step);
    let table = fetch_for(client, dataset, plan.spacecraft.spkid, start, stop, step)?;

    Ok(SingleFeed {
        schema: SCHEMA_SINGLE,
        t_jd: table.t_jd,
        pv: table.pv,
        meta: SingleMeta {
            object: ObjectRef {
                name: plan.spacecraft.name.clone(),
                spkid: plan.spacecraft.spkid,
            },
            window: window.map(|w| WindowMeta {
                start: format_horizons_time(&w.start),
                stop: format_horizons_time(&w.stop),
                step: w.step.to_string(),
            }),
            generated_at: now_iso_seconds(),
            source: source_for(client),
            frame: Frame::default(),
            signature: table.signature,
        },
    })
}

/// Fetch and write every feed of `plan`, then its manifest.
///
/// With `skip_windows`, window feeds are not fetched; windows already on disk
/// stay listed in the manifest.
pub fn compile_mission<F: Fetch>(
    client: &HorizonsClient<F>,
    plan: &MissionPlan,
    options: &CompileOptions,
) -> CompileResult<CompileReport> {
    let root = options
        .output_root
        .clone()
        .unwrap_or_else(|| plan.output_dir.clone());
    let stop = options.stop.unwrap_or_else(today_midnight_utc);
    let launch = format_horizons_time(&plan.launch);
    let until = format_horizons_time(&stop);
    let path_of = |id: &str| root.join(plan.manifest_file(id));

    let mut report = CompileReport::default();
    let mut datasets = Vec::new();

    info!(
        "[1/3] Fetching major bodies ({}) from {launch} to {until}",
        plan.planet_step
    );
    let planets_id = plan.planets_id();
    let planets = build_planets_feed(client, plan, stop)?;
    write_feed(&path_of(&planets_id), &planets, plan, &mut report)?;
    datasets.push(ManifestEntry {
        file: plan.manifest_file(&planets_id),
        id: planets_id,
        description: Some(plan.planets_description()),
    });

    info!(
        "[2/3] Fetching {} ({}) from {launch} to {until}",
        plan.spacecraft.name, plan.daily_step
    );
    let daily_id = plan.daily_id();
    let daily = build_spacecraft_feed(client, plan, &daily_id, plan.launch, stop, None)?;
    write_feed(&path_of(&daily_id), &daily, plan, &mut report)?;
    datasets.push(ManifestEntry {
        file: plan.manifest_file(&daily_id),
        id: daily_id,
        description: Some(plan.daily_description()),
    });

    if options.skip_windows {
        info!("[3/3] Skipping hi-res windows");
    } else {
        info!("[3/3] Fetching hi-res windows");
    }
    for window in &plan.windows {
        let id = plan.window_id(window);
        let path = path_of(&id);
        if options.skip_windows {
            if !path.exists() {
                continue;
            }
        } else {
            info!(
                "  - {id}: {} to {}",
                format_horizons_time(&window.start),
                format_horizons_time(&window.stop)
            );
            let feed =
                build_spacecraft_feed(client, plan, &id, window.start, window.stop, Some(window))?;
            write_feed(&path, &feed, plan, &mut report)?;
        }
        datasets.push(ManifestEntry {
            file: plan.manifest_file(&id),
            id,
            description: Some(window.description.clone()),
        });
    }

    let manifest = Manifest {
        schema: SCHEMA_MANIFEST,
        generated_at: now_iso_seconds(),
        source: source_for(client),
        frame: Frame::default(),
        datasets,
    };
    let manifest_path = root.join("manifest.json");
    write_json_atomic(&manifest_path, &manifest, plan.style)?;
    report.manifest = manifest_path;

    info!(
        "Done. Wrote {} feeds and manifest under {}",
        report.files.len(),
        root.display()
    );
    Ok(report)
}

fn write_feed<T: serde::Serialize>(
    path: &Path,
    feed: &T,
    plan: &MissionPlan,
    report: &mut CompileReport,
) -> CompileResult<()> {
    write_json_atomic(path, feed, plan.style)?;
    report.files.push(path.to_path_buf());
    Ok(())
}
