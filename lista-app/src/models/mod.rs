//! Data models for lista-app
//!
//! - Items: per-product photo folders under the input root
//! - Ads: ad definition files, drafts and pending listings
//! - Payloads: request bodies accepted by the HTTP API

pub mod ad;
pub mod item;
pub mod payloads;

pub use ad::{AdDefinition, Contact, Draft, PendingAd};
pub use item::{Item, IMAGE_EXTENSIONS};
pub use payloads::{ImageSelection, SelectionCrop, SubmitPayload, UndoPayload};
