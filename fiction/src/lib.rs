//! Fictional star-system catalogs built from fan wikis.
//!
//! Each franchise catalog lists star systems and the planets (and, for Star
//! Wars, moons) the wiki places in them. Bodies whose system cannot be derived
//! are kept in a catch-all system so that no body page is dropped.

pub mod catalog;
pub mod markup;
pub mod wiki;

pub use catalog::{
    attach_bodies, build_catalog, compile_franchise, AttachRules, CatalogError, CatalogResult,
    FictionCatalog, FictionSystem, Franchise, FranchiseOptions, PlanetEnrichment, SystemIndex,
    SINK_NAME,
};
pub use wiki::{WikiClient, WikiError, WikiResult};
