//! Image candidate records produced by one extraction run.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Advisory label assigned by the role classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Logo,
    Hero,
    Photo,
    Other,
}

impl Default for Role {
    fn default() -> Self {
        Role::Other
    }
}

/// Which extraction strategy discovered the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum CandidateSource {
    /// `<img>` tags and `<picture>`/`<source>` markup
    #[serde(rename = "html-img")]
    HtmlImg,
    /// Computed `background-image` of an image block
    #[serde(rename = "css-bg")]
    CssBg,
}

/// A provisional, unreviewed image reference harvested from a page.
///
/// `url` is absolute and unique within a run. `role` and the dimensions are
/// best-effort annotations; the onboarding flow decides what to keep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageCandidate {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub role: Role,
    pub source: CandidateSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_class: Option<String>,
}
