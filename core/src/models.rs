use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::MergeError;

/// Navngitt verdiserie i en tur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Distance,
    Altitude,
    Pulse,
    Cadence,
    Temperature,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Distance,
        Channel::Altitude,
        Channel::Pulse,
        Channel::Cadence,
        Channel::Temperature,
    ];
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::Distance => "distance",
            Channel::Altitude => "altitude",
            Channel::Pulse => "pulse",
            Channel::Cadence => "cadence",
            Channel::Temperature => "temperature",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TourSide {
    Source,
    Target,
}

impl fmt::Display for TourSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TourSide::Source => f.write_str("source"),
            TourSide::Target => f.write_str("target"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AltitudeUpDown {
    pub up: f32,   // meter
    pub down: f32, // meter, positiv verdi
}

/// En registrert økt: tidsakse + parallelle verdiserier (indeks for indeks).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tour {
    #[serde(default)]
    pub tour_id: Option<i64>,
    pub start_time: DateTime<Utc>,
    pub time_serie: Vec<i32>, // sek fra start, ikke-synkende

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_serie: Option<Vec<f32>>, // meter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_serie: Option<Vec<f32>>, // meter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulse_serie: Option<Vec<f32>>, // bpm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cadence_serie: Option<Vec<f32>>, // rpm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_serie: Option<Vec<f32>>, // °C

    #[serde(default)]
    pub merged_time_offset: i32,
    #[serde(default)]
    pub merged_altitude_offset: i32,
    #[serde(default)]
    pub merge_source_tour_id: Option<i64>,
    #[serde(default)]
    pub merge_target_tour_id: Option<i64>,
    #[serde(default)]
    pub tour_type: Option<String>,
}

impl Tour {
    pub fn new(start_time: DateTime<Utc>, time_serie: Vec<i32>) -> Self {
        Self {
            tour_id: None,
            start_time,
            time_serie,
            distance_serie: None,
            altitude_serie: None,
            pulse_serie: None,
            cadence_serie: None,
            temperature_serie: None,
            merged_time_offset: 0,
            merged_altitude_offset: 0,
            merge_source_tour_id: None,
            merge_target_tour_id: None,
            tour_type: None,
        }
    }

    pub fn with_id(mut self, tour_id: i64) -> Self {
        self.tour_id = Some(tour_id);
        self
    }

    pub fn with_channel(mut self, channel: Channel, values: Vec<f32>) -> Self {
        self.set_channel(channel, Some(values));
        self
    }

    pub fn channel(&self, channel: Channel) -> Option<&[f32]> {
        let serie = match channel {
            Channel::Distance => &self.distance_serie,
            Channel::Altitude => &self.altitude_serie,
            Channel::Pulse => &self.pulse_serie,
            Channel::Cadence => &self.cadence_serie,
            Channel::Temperature => &self.temperature_serie,
        };
        serie.as_deref()
    }

    pub fn set_channel(&mut self, channel: Channel, values: Option<Vec<f32>>) {
        let slot = match channel {
            Channel::Distance => &mut self.distance_serie,
            Channel::Altitude => &mut self.altitude_serie,
            Channel::Pulse => &mut self.pulse_serie,
            Channel::Cadence => &mut self.cadence_serie,
            Channel::Temperature => &mut self.temperature_serie,
        };
        *slot = values;
    }

    /// Tom tidsakse eller serier med feil lengde avvises før merge.
    pub fn validate(&self, side: TourSide) -> Result<(), MergeError> {
        let expected = self.time_serie.len();
        if expected == 0 {
            return Err(MergeError::EmptyInput { side });
        }
        for channel in Channel::ALL {
            if let Some(values) = self.channel(channel) {
                if values.len() != expected {
                    return Err(MergeError::LengthMismatch {
                        side,
                        channel,
                        expected,
                        actual: values.len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Klokkeforskjell i hele sekunder: `self.start_time - other.start_time`.
    pub fn start_offset_to(&self, other: &Tour) -> i32 {
        let secs = (self.start_time - other.start_time).num_seconds();
        secs.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }

    /// Sum av stigning og fall langs høydeserien.
    pub fn compute_altitude_up_down(&self) -> Option<AltitudeUpDown> {
        let altitude = self.altitude_serie.as_deref()?;
        let mut up = 0.0f32;
        let mut down = 0.0f32;
        for pair in altitude.windows(2) {
            let delta = pair[1] - pair[0];
            if delta > 0.0 {
                up += delta;
            } else {
                down -= delta;
            }
        }
        Some(AltitudeUpDown { up, down })
    }
}
