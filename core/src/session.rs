// core/src/session.rs
use log::{debug, info};

use crate::error::MergeError;
use crate::merge::compute_merged_data;
use crate::models::{AltitudeUpDown, Channel, Tour, TourSide};
use crate::types::{MergeChannel, MergeParams, MergeResult};

/// Kanaler med egne verdiserier som kan flettes inn i mål-turen.
const VALUE_CHANNELS: [(MergeChannel, Channel); 3] = [
    (MergeChannel::Pulse, Channel::Pulse),
    (MergeChannel::Temperature, Channel::Temperature),
    (MergeChannel::Cadence, Channel::Cadence),
];

/// Dyp kopi av alt en merge-økt kan endre på de to turene.
#[derive(Debug, Clone, PartialEq)]
pub struct TourBackup {
    source_time: Vec<i32>,
    source_distance: Option<Vec<f32>>,
    source_altitude: Option<Vec<f32>>,
    source_tour_type: Option<String>,
    source_merge_target_tour_id: Option<i64>,
    source_merge_source_tour_id: Option<i64>,

    target_time: Vec<i32>,
    target_altitude: Option<Vec<f32>>,
    target_pulse: Option<Vec<f32>>,
    target_temperature: Option<Vec<f32>>,
    target_cadence: Option<Vec<f32>>,
    target_time_offset: i32,
    target_altitude_offset: i32,
    target_merge_source_tour_id: Option<i64>,
}

impl TourBackup {
    pub fn capture(source: &Tour, target: &Tour) -> Self {
        Self {
            source_time: source.time_serie.clone(),
            source_distance: source.distance_serie.clone(),
            source_altitude: source.altitude_serie.clone(),
            source_tour_type: source.tour_type.clone(),
            source_merge_target_tour_id: source.merge_target_tour_id,
            source_merge_source_tour_id: source.merge_source_tour_id,

            target_time: target.time_serie.clone(),
            target_altitude: target.altitude_serie.clone(),
            target_pulse: target.pulse_serie.clone(),
            target_temperature: target.temperature_serie.clone(),
            target_cadence: target.cadence_serie.clone(),
            target_time_offset: target.merged_time_offset,
            target_altitude_offset: target.merged_altitude_offset,
            target_merge_source_tour_id: target.merge_source_tour_id,
        }
    }

    fn target_channel(&self, channel: Channel) -> Option<&Vec<f32>> {
        match channel {
            Channel::Pulse => self.target_pulse.as_ref(),
            Channel::Temperature => self.target_temperature.as_ref(),
            Channel::Cadence => self.target_cadence.as_ref(),
            Channel::Altitude => self.target_altitude.as_ref(),
            Channel::Distance => None,
        }
    }

    fn restore(&self, source: &mut Tour, target: &mut Tour) {
        source.time_serie = self.source_time.clone();
        source.distance_serie = self.source_distance.clone();
        source.altitude_serie = self.source_altitude.clone();
        source.tour_type = self.source_tour_type.clone();
        source.merge_target_tour_id = self.source_merge_target_tour_id;
        source.merge_source_tour_id = self.source_merge_source_tour_id;

        target.time_serie = self.target_time.clone();
        target.altitude_serie = self.target_altitude.clone();
        target.pulse_serie = self.target_pulse.clone();
        target.temperature_serie = self.target_temperature.clone();
        target.cadence_serie = self.target_cadence.clone();
        target.merged_time_offset = self.target_time_offset;
        target.merged_altitude_offset = self.target_altitude_offset;
        target.merge_source_tour_id = self.target_merge_source_tour_id;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommitSummary {
    pub merged_channels: Vec<MergeChannel>,
    pub altitude_merged: bool,
    pub altitude_up_down: Option<AltitudeUpDown>,
}

/// Redigeringsøkt rundt gjentatte merges.
///
/// Snapshot tas i `begin`. `commit` skriver valgte serier inn i mål-turen,
/// `cancel` legger tilbake snapshotet. Blir økten droppet uten noen av dem
/// (tidlig retur, `?`, panikk) gjenopprettes turene også.
pub struct MergeSession<'a> {
    source: &'a mut Tour,
    target: &'a mut Tour,
    backup: TourBackup,
    finished: bool,
}

impl<'a> MergeSession<'a> {
    pub fn begin(source: &'a mut Tour, target: &'a mut Tour) -> Result<Self, MergeError> {
        source.validate(TourSide::Source)?;
        target.validate(TourSide::Target)?;

        let backup = TourBackup::capture(source, target);
        debug!(
            "merge session started: source={:?} target={:?}",
            source.tour_id, target.tour_id
        );

        Ok(Self {
            source,
            target,
            backup,
            finished: false,
        })
    }

    pub fn source(&self) -> &Tour {
        self.source
    }

    pub fn target(&self) -> &Tour {
        self.target
    }

    pub fn backup(&self) -> &TourBackup {
        &self.backup
    }

    /// Beregner merge og viser valgte kanaler på mål-turen. Kanaler som ikke
    /// er valgt får tilbake verdiene fra snapshotet.
    pub fn preview(&mut self, params: &MergeParams) -> Result<MergeResult, MergeError> {
        let result = compute_merged_data(self.source, self.target, params)?;
        self.apply_value_channels(params, &result);
        Ok(result)
    }

    /// Nullstiller turene til snapshotet; økten forblir åpen.
    pub fn reset_values(&mut self) {
        self.backup.restore(self.source, self.target);
    }

    pub fn commit(mut self, params: &MergeParams) -> Result<CommitSummary, MergeError> {
        // Feil her dropper økten, og Drop gjenoppretter turene
        let mut result = compute_merged_data(self.source, self.target, params)?;

        let mut merged_channels = self.apply_value_channels(params, &result);

        let mut altitude_merged = false;
        if params.merge_altitude {
            if let Some(adjusted) = result.adjusted_target_altitude.take() {
                self.target.altitude_serie = Some(adjusted);
                altitude_merged = true;
            }
        } else {
            self.target.altitude_serie = self.backup.target_altitude.clone();
        }

        if params.is_merged(MergeChannel::Speed) {
            if let Some(time) = result.target_time.take() {
                self.target.time_serie = time;
                merged_channels.push(MergeChannel::Speed);
            }
        }

        self.target.merged_time_offset = result.x_offset;
        self.target.merged_altitude_offset = params.altitude_offset;
        self.target.merge_source_tour_id = self.source.tour_id;

        self.source.merge_target_tour_id = self.target.tour_id;
        self.source.merge_source_tour_id = None;
        self.source.tour_type = match &params.set_tour_type {
            Some(tour_type) => Some(tour_type.clone()),
            None => self.backup.source_tour_type.clone(),
        };

        let altitude_up_down = if altitude_merged {
            self.target.compute_altitude_up_down()
        } else {
            None
        };

        self.finished = true;

        info!(
            "merged tour {:?} into {:?}: channels={:?} altitude={}",
            self.source.tour_id, self.target.tour_id, merged_channels, altitude_merged
        );

        Ok(CommitSummary {
            merged_channels,
            altitude_merged,
            altitude_up_down,
        })
    }

    pub fn cancel(mut self) {
        self.backup.restore(self.source, self.target);
        self.finished = true;
        debug!("merge session cancelled, tours restored");
    }

    fn apply_value_channels(&mut self, params: &MergeParams, result: &MergeResult) -> Vec<MergeChannel> {
        let mut applied = Vec::new();
        for (merge_channel, channel) in VALUE_CHANNELS {
            match result.channel(merge_channel) {
                Some(values) if params.is_merged(merge_channel) => {
                    self.target.set_channel(channel, Some(values.to_vec()));
                    applied.push(merge_channel);
                }
                _ => {
                    let original = self.backup.target_channel(channel).cloned();
                    self.target.set_channel(channel, original);
                }
            }
        }
        applied
    }
}

impl Drop for MergeSession<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.backup.restore(self.source, self.target);
            debug!("merge session dropped without commit, tours restored");
        }
    }
}
