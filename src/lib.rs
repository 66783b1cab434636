//! # eyla
//!
//! Qualification-level extraction and enrichment for early-years labour
//! market analysis.
//!
//! eyla takes raw online job adverts and their free-text descriptions and
//! produces a curated, de-duplicated, inflation-adjusted advert table in
//! which every advert carries a normalized qualification level, a coarse
//! geography classification and its skill associations.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌────────────┐   ┌───────────┐   ┌──────────┐
//! │ Adverts  │──▶│  Enrich  │──▶│  Chunked   │──▶│ Geography │──▶│  Clean   │
//! │ CSV in   │   │ sal+loc  │   │  scoring   │   │  classify │   │ +inflate │
//! └──────────┘   └──────────┘   └────────────┘   └───────────┘   └────┬─────┘
//!                                                                     │
//!                                              ┌──────────────────────┤
//!                                              ▼                      ▼
//!                                        ┌──────────┐          ┌──────────┐
//!                                        │ Curated  │          │ Monthly  │
//!                                        │ CSV out  │          │ summary  │
//!                                        └──────────┘          └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! eyla sources                     # check input tables
//! eyla run                         # full run
//! eyla run --sample                # score only a few descriptions
//! eyla extract "NVQ Level 3 required"
//! eyla reclassify UKI31
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`normalize`] | Description text normalization |
//! | [`qualification`] | Versioned pattern table and matcher |
//! | [`geography`] | Coarse region and rural/urban classification |
//! | [`enrich`] | Keyed side tables and non-fan-out joins |
//! | [`chunk`] | Description partitioning, scoring and reassembly |
//! | [`checkpoint`] | Resumable chunk outputs on disk |
//! | [`clean`] | De-duplication, filters and qualification ceiling |
//! | [`inflation`] | Real-terms salary adjustment |
//! | [`summary`] | Monthly summary tables and run report |
//! | [`pipeline`] | Run orchestration |
//! | [`progress`] | Progress reporting on stderr |
//! | [`sources`] | Input table health listing |
//! | [`error`] | Structural pipeline errors |
//! | [`config`] | TOML configuration parsing |
//! | [`tables`] | CSV input and output |
//! | [`models`] | Core data types |

pub mod checkpoint;
pub mod chunk;
pub mod clean;
pub mod config;
pub mod enrich;
pub mod error;
pub mod geography;
pub mod inflation;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod qualification;
pub mod sources;
pub mod summary;
pub mod tables;
