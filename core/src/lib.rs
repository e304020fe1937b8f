pub mod api;
pub mod error;
pub mod merge;
pub mod metrics;
pub mod models;
pub mod reimport;
pub mod session;
pub mod storage;
pub mod types;

#[cfg(feature = "python")]
mod py;

pub use api::{merge_tours_json, MergeRequest};
pub use error::{MergeError, ReimportError};
pub use merge::{compute_merged_data, compute_speed_time_serie, interpolate, saturating_index};
pub use models::{AltitudeUpDown, Channel, Tour, TourSide};
pub use reimport::{
    CancelHandle, CountDownLatch, ReimportConfig, ReimportJob, ReimportPart, ReimportReport, ReimportRequest,
    ReimportStatus, TourReimporter,
};
pub use session::{CommitSummary, MergeSession, TourBackup};
pub use storage::{load_params, load_reimport_config, load_tour, save_params, save_tour};
pub use types::{AltitudeDiffRate, MergeChannel, MergeParams, MergeResult};
