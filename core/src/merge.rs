// core/src/merge.rs
use log::{debug, warn};

use crate::error::MergeError;
use crate::metrics;
use crate::models::{Tour, TourSide};
use crate::types::{AltitudeDiffRate, MergeChannel, MergeParams, MergeResult};

/// Indeks klemt til siste gyldige posisjon i en serie med lengde `len`.
/// `len == 0` gir 0; kalleren må ha validert at serien ikke er tom.
#[inline]
pub fn saturating_index(index: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        index.min(len - 1)
    }
}

/// Lineær interpolasjon: y2 = (x2-x1)(y3-y1)/(x3-x1) + y1.
/// Sammenfallende støttepunkter (x3 == x1) gir y1.
#[inline]
pub fn interpolate(x1: f64, x2: f64, x3: f64, y1: f64, y3: f64) -> f64 {
    let x_diff = x3 - x1;
    if x_diff == 0.0 {
        return y1;
    }
    (x2 - x1) * (y3 - y1) / x_diff + y1
}

/// Ny tidsakse for mål-turen avledet av kildens distanse→tid-forhold.
///
/// For hver måldistanse flyttes en kildepeker fram (aldri tilbake) til første
/// sample med `distance >= måldistanse`, og kildetiden interpoleres mellom de to
/// omsluttende samplene. Resultatet er forskjøvet med `x_offset` inn i
/// mål-turens klokke. `None` når en av turene mangler distanse, eller når
/// distanse og tid ikke har samme lengde.
pub fn compute_speed_time_serie(source: &Tour, target: &Tour, x_offset: i32) -> Option<Vec<i32>> {
    let source_distance = source.distance_serie.as_deref()?;
    let target_distance = target.distance_serie.as_deref()?;
    let source_time = &source.time_serie;

    if source_distance.len() != source_time.len() || target_distance.len() != target.time_serie.len() {
        debug!(
            "speed time axis skipped: distance/time length mismatch (source {}/{}, target {}/{})",
            source_distance.len(),
            source_time.len(),
            target_distance.len(),
            target.time_serie.len()
        );
        return None;
    }

    let last = source_distance.len().checked_sub(1)?;
    let mut k = 0usize;
    let mut out = Vec::with_capacity(target_distance.len());

    for &distance in target_distance {
        while k < last && source_distance[k] < distance {
            k += 1;
        }

        let time = if k == 0 || source_distance[k] < distance {
            // før første eller etter siste kildedistanse: ingen ekstrapolering
            source_time[k] as f64
        } else {
            interpolate(
                source_distance[k - 1] as f64,
                distance as f64,
                source_distance[k] as f64,
                source_time[k - 1] as f64,
                source_time[k] as f64,
            )
        };

        let shifted = time.round() as i64 + x_offset as i64;
        out.push(shifted.clamp(i32::MIN as i64, i32::MAX as i64) as i32);
    }

    Some(out)
}

fn check_overlap(source_time: &[i32], target_time: &[i32], x_offset: i32) -> Result<(), MergeError> {
    let (Some(&s0), Some(&s1)) = (source_time.first(), source_time.last()) else {
        return Err(MergeError::EmptyInput { side: TourSide::Source });
    };
    let (Some(&t0), Some(&t1)) = (target_time.first(), target_time.last()) else {
        return Err(MergeError::EmptyInput { side: TourSide::Target });
    };

    let source_start = s0 as i64 + x_offset as i64;
    let source_end = s1 as i64 + x_offset as i64;
    let target_start = t0 as i64;
    let target_end = t1 as i64;

    if source_end < target_start || source_start > target_end {
        return Err(MergeError::NoOverlap {
            source_start,
            source_end,
            target_start,
            target_end,
        });
    }
    Ok(())
}

/// Fletter kildens kanaler inn på mål-turens tidsakse.
///
/// Ren funksjon: ingen av turene endres, og samme input gir alltid samme
/// resultat. Backup/restore rundt gjentatte kall håndteres av `MergeSession`.
pub fn compute_merged_data(
    source: &Tour,
    target: &Tour,
    params: &MergeParams,
) -> Result<MergeResult, MergeError> {
    metrics::merge_total().inc();
    let result = merge_inner(source, target, params);
    if let Err(e) = &result {
        metrics::merge_errors_total().inc();
        warn!("merge skipped: {e}");
    }
    result
}

fn merge_inner(source: &Tour, target: &Tour, params: &MergeParams) -> Result<MergeResult, MergeError> {
    source.validate(TourSide::Source)?;
    target.validate(TourSide::Target)?;

    let x_offset = params.x_offset(source, target);
    let y_offset = params.altitude_offset as f32;

    let speed_time = if params.is_merged(MergeChannel::Speed) {
        let serie = compute_speed_time_serie(source, target, x_offset);
        if serie.is_none() {
            debug!("speed merge without distance on both tours, keeping target time axis");
        }
        serie
    } else {
        None
    };

    // mål-turen er den ledende tidsaksen
    let target_time: &[i32] = speed_time.as_deref().unwrap_or(&target.time_serie);
    let source_time = &source.time_serie;

    check_overlap(source_time, target_time, x_offset)?;

    let serie_len = target_time.len();
    let source_len = source_time.len();
    let last_source_index = source_len - 1;
    let is_linear = params.is_linear_interpolation();

    let source_altitude = source.altitude_serie.as_deref();
    let target_altitude = target.altitude_serie.as_deref();

    let mut new_source_altitude = source_altitude.map(|_| Vec::with_capacity(serie_len));
    let mut altitude_diff = match (source_altitude, target_altitude) {
        (Some(_), Some(_)) => Some(Vec::with_capacity(serie_len)),
        _ => None,
    };

    let source_pulse = source.pulse_serie.as_deref();
    let source_cadence = source.cadence_serie.as_deref();
    let source_temperature = source.temperature_serie.as_deref();

    let mut new_pulse = source_pulse.map(|_| Vec::with_capacity(serie_len));
    let mut new_cadence = source_cadence.map(|_| Vec::with_capacity(serie_len));
    let mut new_temperature = source_temperature.map(|_| Vec::with_capacity(serie_len));

    let shifted = |index: usize| source_time[index] as i64 + x_offset as i64;

    // i = siste kildesample med forskjøvet tid <= måltid (eller 0)
    let mut i = 0usize;

    for (j, &time) in target_time.iter().enumerate() {
        let time = time as i64;

        while i < last_source_index && shifted(i + 1) <= time {
            i += 1;
        }
        let next = saturating_index(i + 1, source_len);

        if let (Some(altitude), Some(out)) = (source_altitude, new_source_altitude.as_mut()) {
            let y1 = altitude[i] + y_offset;

            let value = if is_linear && next != i && shifted(i) <= time {
                let y3 = altitude[next] + y_offset;
                interpolate(
                    shifted(i) as f64,
                    time as f64,
                    shifted(next) as f64,
                    y1 as f64,
                    y3 as f64,
                ) as f32
            } else {
                // hold siste verdi
                y1
            };

            out.push(value);

            if let (Some(target_alt), Some(diff)) = (target_altitude, altitude_diff.as_mut()) {
                diff.push(value - target_alt[j]);
            }
        }

        if let (Some(src), Some(out)) = (source_pulse, new_pulse.as_mut()) {
            out.push(src[i]);
        }
        if let (Some(src), Some(out)) = (source_cadence, new_cadence.as_mut()) {
            out.push(src[i]);
        }
        if let (Some(src), Some(out)) = (source_temperature, new_temperature.as_mut()) {
            out.push(src[i]);
        }
    }

    let mut adjusted_target_altitude = None;
    let mut altitude_diff_rate = None;

    if let Some(new_alt) = new_source_altitude.as_deref() {
        let from_start = match (
            params.adjust_altitude_from_start,
            target_altitude,
            target.distance_serie.as_deref(),
            altitude_diff.as_mut(),
        ) {
            (Some(end_index), Some(target_alt), Some(target_distance), Some(diff)) => Some(
                adjust_altitude_from_start(target_alt, target_distance, target_time, new_alt, diff, end_index),
            ),
            _ => None,
        };

        if let Some((adjusted, rate)) = from_start {
            adjusted_target_altitude = Some(adjusted);
            altitude_diff_rate = Some(rate);
        } else if params.use_source_altitude {
            adjusted_target_altitude = Some(new_alt.to_vec());
        }
    }

    debug!(
        "merged {} target samples from {} source samples (x_offset={}s, y_offset={}m, linear={})",
        serie_len, source_len, x_offset, params.altitude_offset, is_linear
    );

    Ok(MergeResult {
        x_offset,
        target_time: speed_time,
        source_altitude: new_source_altitude,
        altitude_diff,
        adjusted_target_altitude,
        cadence: new_cadence,
        pulse: new_pulse,
        temperature: new_temperature,
        altitude_diff_rate,
    })
}

/// Forskyver målhøyden med startdifferansen og skalerer den lineært over
/// distansen ned til 0 ved `end_index`. Fra `end_index` beholdes målhøyden.
fn adjust_altitude_from_start(
    target_altitude: &[f32],
    target_distance: &[f32],
    target_time: &[i32],
    new_source_altitude: &[f32],
    altitude_diff: &mut [f32],
    end_index: usize,
) -> (Vec<f32>, AltitudeDiffRate) {
    let len = target_altitude.len();
    let end = saturating_index(end_index, len);

    let start_diff = altitude_diff.first().copied().unwrap_or(0.0);
    let end_distance = target_distance[end];

    let mut adjusted = Vec::with_capacity(len);
    for k in 0..len {
        if k < end {
            let scale = if end_distance == 0.0 {
                0.0
            } else {
                1.0 - target_distance[k] / end_distance
            };
            let new_altitude = target_altitude[k] + start_diff * scale;
            adjusted.push(new_altitude);
            altitude_diff[k] = new_source_altitude[k] - new_altitude;
        } else {
            adjusted.push(target_altitude[k]);
        }
    }

    let end_time = target_time[end];
    let rate = AltitudeDiffRate {
        per_minute: if end_time == 0 { 0.0 } else { start_diff / end_time as f32 * 60.0 },
        per_km: if end_distance == 0.0 { 0.0 } else { start_diff * 1000.0 / end_distance },
    };

    (adjusted, rate)
}
