//! docweave: merge same-titled chapters of many structured documents into one restructured
//! document.
//!
//! Each input document is split into level-1 modules by configured titles
//! ([`segment`]), each module gets a title index of its numbered headings ([`title_index`]),
//! same-named modules across documents are gathered and their colliding headings disambiguated
//! ([`dedup`]), a new outline proposed by the generation service is parsed ([`outline`]) and its
//! provenance resolved through a cross-document [`source_index`] ([`enrich`]), and finally the
//! original spans are fused into new section text ([`recompose`]). [`pipeline`] drives the
//! stages with resumable per-artifact status records ([`stage`]).
#![allow(clippy::multiple_crate_versions)]

pub mod artifact;
pub mod config;
pub mod dedup;
pub mod enrich;
pub mod error;
pub mod formats;
pub mod generator;
pub mod outline;
pub mod pipeline;
pub mod progress;
pub mod recompose;
pub mod section;
pub mod segment;
pub mod source_index;
pub mod stage;
pub mod summarize;
pub mod title_index;
