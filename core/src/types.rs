use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::Tour;

/// Kanaler som kan flettes fra kilde-turen inn i mål-turen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeChannel {
    Cadence,
    Pulse,
    Temperature,
    Speed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MergeParams {
    pub time_offset_seconds: i32,
    pub altitude_offset: i32,
    pub use_source_altitude: bool,
    pub use_linear_interpolation: bool,
    pub synchronize_start_time: bool,
    pub merge_channels: BTreeSet<MergeChannel>,
    /// Sluttindeks for utjevning av høydeforskjellen fra start (None = av).
    pub adjust_altitude_from_start: Option<usize>,
    /// Commit skriver justert høyde inn i mål-turen.
    pub merge_altitude: bool,
    /// Turtype som settes på kilde-turen ved commit (None = behold).
    pub set_tour_type: Option<String>,
}

impl MergeParams {
    pub fn with_channel(mut self, channel: MergeChannel) -> Self {
        self.merge_channels.insert(channel);
        self
    }

    pub fn is_merged(&self, channel: MergeChannel) -> bool {
        self.merge_channels.contains(&channel)
    }

    pub fn is_linear_interpolation(&self) -> bool {
        self.use_source_altitude && self.use_linear_interpolation
    }

    /// Effektiv x-forskyvning (sek) for kildens tidsakse.
    pub fn x_offset(&self, source: &Tour, target: &Tour) -> i32 {
        if self.synchronize_start_time {
            source.start_offset_to(target)
        } else {
            self.time_offset_seconds
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct AltitudeDiffRate {
    pub per_minute: f32, // m/min
    pub per_km: f32,     // m/km
}

/// Resultat av én merge. Alle serier har lengden til den ledende tidsaksen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MergeResult {
    pub x_offset: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_time: Option<Vec<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_altitude: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_diff: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjusted_target_altitude: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cadence: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulse: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_diff_rate: Option<AltitudeDiffRate>,
}

impl MergeResult {
    /// Flettede verdier for en kanal. Speed har ingen verdiserie, kun ny tidsakse.
    pub fn channel(&self, channel: MergeChannel) -> Option<&[f32]> {
        match channel {
            MergeChannel::Cadence => self.cadence.as_deref(),
            MergeChannel::Pulse => self.pulse.as_deref(),
            MergeChannel::Temperature => self.temperature.as_deref(),
            MergeChannel::Speed => None,
        }
    }
}
