use chrono::{TimeZone, Utc};
use std::fs;

use tourmerge_core::{
    load_params, load_reimport_config, load_tour, save_params, save_tour, Channel, MergeChannel, MergeParams,
    ReimportPart, Tour,
};

#[test]
fn test_save_and_load_params() {
    let path = "tests/tmp_merge_params.json";
    let _ = fs::remove_file(path);

    let params = MergeParams {
        time_offset_seconds: -12,
        altitude_offset: 4,
        use_source_altitude: true,
        use_linear_interpolation: true,
        adjust_altitude_from_start: Some(120),
        ..Default::default()
    }
    .with_channel(MergeChannel::Pulse);

    save_params(&params, path).expect("kunne ikke lagre parametre");
    let loaded = load_params(path).expect("kunne ikke laste parametre");
    assert_eq!(loaded, params);

    fs::remove_file(path).ok();
}

#[test]
fn test_missing_files_give_defaults() {
    let params = load_params("tests/does_not_exist_params.json").expect("default params");
    assert_eq!(params, MergeParams::default());

    let cfg = load_reimport_config("tests/does_not_exist_reimport.json").expect("default config");
    assert!(cfg.parts.is_empty());
    assert!(!cfg.single_threaded);
}

#[test]
fn test_load_reimport_config() {
    let path = "tests/tmp_reimport.json";
    fs::write(path, r#"{"parallelism": 2, "parts": ["altitude", "tour_timer_pauses"]}"#).unwrap();

    let cfg = load_reimport_config(path).expect("kunne ikke laste oppsett");
    assert_eq!(cfg.worker_count(), 2);
    assert_eq!(cfg.parts, vec![ReimportPart::Altitude, ReimportPart::TourTimerPauses]);

    fs::remove_file(path).ok();
}

#[test]
fn test_save_and_load_tour() {
    let path = "tests/tmp_tour.json";
    let _ = fs::remove_file(path);

    let tour = Tour::new(Utc.with_ymd_and_hms(2023, 9, 3, 7, 30, 0).unwrap(), vec![0, 1, 2])
        .with_id(77)
        .with_channel(Channel::Altitude, vec![10.0, 11.5, 12.0])
        .with_channel(Channel::Pulse, vec![100.0, 101.0, 102.0]);

    save_tour(&tour, path).expect("kunne ikke lagre tur");
    let loaded = load_tour(path).expect("kunne ikke laste tur");
    assert_eq!(loaded, tour);
    assert!(loaded.cadence_serie.is_none());

    fs::remove_file(path).ok();
}

#[test]
fn test_broken_json_is_an_error() {
    let path = "tests/tmp_broken_params.json";
    fs::write(path, "{ not json").unwrap();

    let err = load_params(path).unwrap_err();
    assert!(format!("{err:#}").contains("parsing merge params"));

    fs::remove_file(path).ok();
}
