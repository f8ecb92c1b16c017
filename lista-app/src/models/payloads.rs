//! Request payloads accepted by the HTTP API

use serde::Deserialize;
use serde_json::{Map, Value};

/// POST /api/pending/undo request
#[derive(Debug, Clone, Deserialize)]
pub struct UndoPayload {
    /// Relative ad directory, e.g. `IMG_0001`
    pub dir: String,
}

/// Normalized crop rectangle, every field in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SelectionCrop {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// One selected image and its crop
#[derive(Debug, Clone, Deserialize)]
pub struct ImageSelection {
    /// Media URL as served to the UI, e.g. `/media/IMG_0001/IMG_0002.jpg`
    pub url: String,
    pub crop: SelectionCrop,
}

/// POST /api/items/:id/submit request
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitPayload {
    /// Loose ad metadata as edited in the UI
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub selections: Vec<ImageSelection>,
    #[serde(default)]
    pub audio_id: Option<String>,
    /// Full image URL order as seen in the UI
    #[serde(default)]
    pub image_order: Option<Vec<String>>,
}

impl SubmitPayload {
    /// Selections in client order
    ///
    /// With an `image_order`, selections follow that order and any selection
    /// whose URL is not listed is dropped.
    pub fn ordered_selections(&self) -> Vec<ImageSelection> {
        match &self.image_order {
            Some(order) if !order.is_empty() => order
                .iter()
                .filter_map(|url| self.selections.iter().rev().find(|s| &s.url == url))
                .cloned()
                .collect(),
            _ => self.selections.clone(),
        }
    }
}
