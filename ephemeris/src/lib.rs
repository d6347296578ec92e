//! JPL Horizons state-vector feeds.
//!
//! The crate turns Horizons `VECTORS` queries into the `mcs-ephem-*` JSON
//! documents the viewer animates: one multi-body feed for the Sun and planets,
//! a daily feed for the spacecraft, and high-resolution encounter windows.

pub mod client;
pub mod compile;
pub mod dataset;
pub mod mission;
pub mod parse;
pub mod query;

pub use client::HorizonsClient;
pub use compile::{compile_mission, CompileError, CompileOptions, CompileReport};
pub use mission::{Body, EncounterWindow, Mission, MissionPlan, ObjectKeying};
pub use parse::{HorizonsError, HorizonsResult, VectorTable};
pub use query::{StepSize, StepUnit, VectorQuery};
