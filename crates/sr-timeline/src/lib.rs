//! # sr-timeline
//!
//! The timeline data model of the studio.
//!
//! This crate provides:
//!
//! - **[`Asset`] / [`AssetCatalog`]** -- immutable content records and the
//!   catalog that owns them, including derived versions.
//! - **[`TimelineSegment`]** -- one asset placed on one [`Track`](sr_core::Track)
//!   for a half-open frame range, with an optional soft link to a partner
//!   segment and optional overlay placement.
//! - **[`SegmentStore`]** -- the ordered collection every UI mutation goes
//!   through (add, update with link cascade, remove, unlink, drop placement).
//! - **[`materialize_storyboard`]** -- turns an approved storyboard into
//!   back-to-back segments in one call.
//! - **[`Project`]** -- the JSON document holding catalog and segments.

pub mod asset;
pub mod project;
pub mod segment;
pub mod store;
pub mod storyboard;

pub use asset::{Asset, AssetCatalog};
pub use project::Project;
pub use segment::{OverlayPlacement, SegmentPatch, TimelineSegment};
pub use store::{Placement, SegmentStore};
pub use storyboard::{materialize_storyboard, StoryboardShot};
