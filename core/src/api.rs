use serde::Deserialize;
use serde_json as json;
use serde_path_to_error as spte;

use crate::merge::compute_merged_data;
use crate::models::Tour;
use crate::types::MergeParams;

/// JSON-inngang: { source, target, params? }
#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub source: Tour,
    pub target: Tour,
    #[serde(default)]
    pub params: MergeParams,
}

pub fn parse_merge_request(json_in: &str) -> Result<MergeRequest, String> {
    let mut de = json::Deserializer::from_str(json_in);
    spte::deserialize(&mut de).map_err(|e| format!("merge request parse at {}: {}", e.path(), e.inner()))
}

/// Kjører merge fra JSON og returnerer `MergeResult` som JSON.
pub fn merge_tours_json(json_in: &str) -> Result<String, String> {
    let req = parse_merge_request(json_in)?;
    let result = compute_merged_data(&req.source, &req.target, &req.params).map_err(|e| e.to_string())?;
    json::to_string(&result).map_err(|e| format!("serialize: {e}"))
}
