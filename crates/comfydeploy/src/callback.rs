//! Typed run payloads sent by the provider.
//!
//! The same shape arrives two ways: pushed to our webhook when a run changes
//! state, and returned by `GET /api/run?run_id=...` when we poll. Only the
//! run id and the first output image URL matter here; everything else is
//! ignored.

use serde::Deserialize;

/// A run state update from the provider.
///
/// Webhooks carry `run_id`; the status endpoint calls it `id`.
#[derive(Debug, Clone, Deserialize)]
pub struct RunUpdate {
    #[serde(alias = "id")]
    pub run_id: Option<String>,
    pub status: Option<String>,
    /// Flat image URL, accepted for relays that pre-extract it.
    pub image_url: Option<String>,
    pub outputs: Option<Vec<RunOutput>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunOutput {
    pub data: Option<OutputData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputData {
    pub images: Option<Vec<OutputImage>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputImage {
    pub url: Option<String>,
    pub filename: Option<String>,
}

impl RunUpdate {
    /// Non-empty run id, if present.
    pub fn run_id(&self) -> Option<&str> {
        non_empty(self.run_id.as_deref())
    }

    /// The result image: `image_url` if set, else the first output image.
    pub fn image_url(&self) -> Option<&str> {
        if let Some(url) = non_empty(self.image_url.as_deref()) {
            return Some(url);
        }
        self.outputs
            .iter()
            .flatten()
            .filter_map(|o| o.data.as_ref())
            .filter_map(|d| d.images.as_ref())
            .flatten()
            .find_map(|img| non_empty(img.url.as_deref()))
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}
