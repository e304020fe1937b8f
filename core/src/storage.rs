use anyhow::{Context, Result};
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

use crate::models::Tour;
use crate::reimport::ReimportConfig;
use crate::types::MergeParams;

fn load_or_default<T: DeserializeOwned + Default>(path: &Path, what: &str) -> Result<T> {
    if !path.exists() {
        warn!("{} not found at {}, using defaults", what, path.display());
        return Ok(T::default());
    }
    let contents = std::fs::read_to_string(path).with_context(|| format!("reading {what} from {}", path.display()))?;
    let value = serde_json::from_str(&contents).with_context(|| format!("parsing {what} in {}", path.display()))?;
    info!("{} loaded from {}", what, path.display());
    Ok(value)
}

fn save_pretty<T: Serialize>(value: &T, path: &Path, what: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(value).with_context(|| format!("serializing {what}"))?;
    std::fs::write(path, json).with_context(|| format!("writing {what} to {}", path.display()))?;
    info!("{} saved to {}", what, path.display());
    Ok(())
}

/// Leser merge-parametre (JSON). Mangler filen, returneres standardverdier.
pub fn load_params(path: impl AsRef<Path>) -> Result<MergeParams> {
    load_or_default(path.as_ref(), "merge params")
}

pub fn save_params(params: &MergeParams, path: impl AsRef<Path>) -> Result<()> {
    save_pretty(params, path.as_ref(), "merge params")
}

/// Leser re-import-oppsett (JSON). Mangler filen, returneres standardverdier.
pub fn load_reimport_config(path: impl AsRef<Path>) -> Result<ReimportConfig> {
    load_or_default(path.as_ref(), "re-import config")
}

pub fn load_tour(path: impl AsRef<Path>) -> Result<Tour> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).with_context(|| format!("reading tour from {}", path.display()))?;
    let tour: Tour = serde_json::from_str(&contents).with_context(|| format!("parsing tour in {}", path.display()))?;
    info!("tour {:?} loaded from {} ({} samples)", tour.tour_id, path.display(), tour.time_serie.len());
    Ok(tour)
}

pub fn save_tour(tour: &Tour, path: impl AsRef<Path>) -> Result<()> {
    save_pretty(tour, path.as_ref(), "tour")
}
