//! Service modules for the listing workflow
//!
//! Filesystem bookkeeping (segmentation, archive, ad folders) is synchronous;
//! collaborators reached over the network or a subprocess sit behind async
//! traits so tests can swap them out.

pub mod ad_store;
pub mod audio_preprocessor;
pub mod image_cropper;
pub mod inbox_segmenter;
pub mod input_archive;
pub mod item_repository;
pub mod listing_drafter;
pub mod publisher;
pub mod separator_detector;

pub use ad_store::{find_ad_files, slugify, AdStore, PromoteReport};
pub use audio_preprocessor::{AudioError, AudioPreprocessor, FfmpegSilenceStripper};
pub use image_cropper::{crop_selections, CropError};
pub use inbox_segmenter::{InboxSegmenter, SegmentError, SegmentReport};
pub use input_archive::{ArchiveOutcome, InputArchive};
pub use item_repository::ItemRepository;
pub use listing_drafter::{DraftError, GeminiDrafter, ListingDrafter};
pub use publisher::{AdPublisher, CliPublisher, PublishError, PublishOutcome};
pub use separator_detector::{DetectError, FrameStats, SeparatorClassifier, SeparatorDetector};
