// core/src/error.rs
use thiserror::Error;

use crate::models::{Channel, TourSide};

/// Feil fra merge-kjernen. Ingen av disse er fatale for vertsprosessen,
/// kallere viser dem som advarsler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    #[error("{side} tour has an empty time serie")]
    EmptyInput { side: TourSide },

    #[error("{side} {channel} serie has {actual} values, time serie has {expected}")]
    LengthMismatch {
        side: TourSide,
        channel: Channel,
        expected: usize,
        actual: usize,
    },

    #[error(
        "source [{source_start}, {source_end}] does not overlap target [{target_start}, {target_end}]"
    )]
    NoOverlap {
        source_start: i64,
        source_end: i64,
        target_start: i64,
        target_end: i64,
    },
}

/// Feil fra én enkelt re-import. Samles i `ReimportReport::failed`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReimportError {
    #[error("import file for tour {tour_id} not found: {path}")]
    FileNotFound { tour_id: i64, path: String },

    #[error("re-import of tour {tour_id} failed: {reason}")]
    Failed { tour_id: i64, reason: String },

    #[error("re-import of tour {tour_id} panicked")]
    Panicked { tour_id: i64 },
}
