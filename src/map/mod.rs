//! Map module - the ceiling-marker graph and its fusion engine.
//!
//! This module contains:
//! - [`Marker`] - mapped ceiling fiducials with absolute floor poses
//! - [`Observation`] - pairwise relative measurements between markers
//! - [`HeightTable`] - id-range to pixel-scale resolution
//! - [`MarkerMap`] - container managing all of the above, ingesting
//!   detection pairs and propagating absolute poses
//!
//! # Architecture
//!
//! Markers and observations reference each other symmetrically; both are
//! owned by the [`MarkerMap`], and the cross-references are ids (markers)
//! and arena handles (observations) resolved through it. Each unordered
//! marker pair has at most one observation, holding the best measurement
//! seen so far for that pair.

pub mod height;
pub mod map;
pub mod marker;
pub mod observation;
pub mod types;

pub use height::{HeightEntry, HeightTable};
pub use map::{AnnounceFn, MarkerAnnouncement, MarkerMap};
pub use marker::Marker;
pub use observation::{CameraDetection, Observation, UNMEASURED_GOODNESS};
pub use types::{MarkerId, ObservationId};
