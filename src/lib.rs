//! Brand image extraction for site onboarding.
//!
//! Drives a headless Chrome page through lazy-load scrolling, snapshots every
//! image-bearing element in one round trip, and turns the raw facts into
//! de-duplicated, role-labelled [`ImageCandidate`]s.

pub mod api;
pub mod browser;
pub mod candidate;
pub mod classify;
pub mod config;
pub mod fetch;
pub mod lazy_load;
pub mod noise;
pub mod normalize;
pub mod pipeline;
pub mod snapshot;
pub mod strategies;
pub mod vendor;

pub use browser::{ChromeBrowser, ChromePage, PageSession};
pub use candidate::{CandidateSource, ImageCandidate, Role};
pub use config::ExtractorConfig;
pub use pipeline::{extract_from_html, extract_images, ExtractionReport};
