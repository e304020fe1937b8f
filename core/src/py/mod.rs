// Python-binding (maturin --features python). Tynn adapter over `api`.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::wrap_pyfunction;

use crate::api;

// ──────────────────────────────────────────────────────────────────────────────
// HJELPERE
// ──────────────────────────────────────────────────────────────────────────────

// Tillater både str og dict/objekt; alt annet serialiseres med Python sin json.dumps
fn payload_to_json(py: Python<'_>, payload: &PyAny) -> PyResult<String> {
    if let Ok(s) = payload.extract::<&str>() {
        return Ok(s.to_owned());
    }
    let json_mod = py
        .import("json")
        .map_err(|e| PyValueError::new_err(format!("failed to import json: {e}")))?;
    json_mod
        .call_method1("dumps", (payload,))
        .and_then(|o| o.extract::<String>())
        .map_err(|e| PyValueError::new_err(format!("failed to serialize payload with json.dumps: {e}")))
}

// ──────────────────────────────────────────────────────────────────────────────
// PyO3-MODUL
// ──────────────────────────────────────────────────────────────────────────────

/// JSON inn (str) → JSON ut (str).
#[pyfunction]
fn merge_tours_json(json_str: &str) -> PyResult<String> {
    api::merge_tours_json(json_str).map_err(PyValueError::new_err)
}

/// dict/str inn → dict ut (via json.loads, unngår pyo3 serde-feature).
#[pyfunction]
fn merge_tours(py: Python<'_>, payload: &PyAny) -> PyResult<PyObject> {
    let json_in = payload_to_json(py, payload)?;
    let out = api::merge_tours_json(&json_in).map_err(PyValueError::new_err)?;

    let json_mod = py
        .import("json")
        .map_err(|e| PyValueError::new_err(format!("failed to import json: {e}")))?;
    let obj = json_mod
        .call_method1("loads", (out.as_str(),))
        .map_err(|e| PyValueError::new_err(format!("internal JSON parse error via json.loads: {e}")))?;
    Ok(obj.into_py(py))
}

/// Prometheus tekstformat for kjernens tellere.
#[pyfunction]
fn metrics_text() -> String {
    crate::metrics::gather_text()
}

#[pymodule]
fn tourmerge_core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(merge_tours, m)?)?;
    m.add_function(wrap_pyfunction!(merge_tours_json, m)?)?;
    m.add_function(wrap_pyfunction!(metrics_text, m)?)?;
    Ok(())
}
