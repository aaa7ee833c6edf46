//! Configuration loading from files.

use std::io::Write;
use std::path::{Path, PathBuf};

use mc_common::config::ConfigError;
use mc_control_unit::config::load_config;
use tempfile::NamedTempFile;

fn write_config(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn shipped_config_is_valid() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/controller.toml");
    let loaded = load_config(&path).unwrap();
    assert_eq!(loaded.axes.len(), 2);
    assert_eq!(loaded.axes[0].name, "X");
    assert_eq!(loaded.axes[1].limits.max_jerk, Some(5.0));
    assert_eq!(loaded.machine.shared.service_name, "mc-sim-01");
    assert!((loaded.period_s() - 0.001).abs() < 1e-12);
}

#[test]
fn loads_minimal_file_with_defaults() {
    let file = write_config("[[axes]]\naxis_id = 3\nmax_velocity = 1.0\nmax_acceleration = 2.0\n");
    let loaded = load_config(file.path()).unwrap();
    assert_eq!(loaded.machine.controller.cycle_time_us, 1000);
    assert!(loaded.machine.safety.limit_switch_blocks_reset);
    assert_eq!(loaded.axes[0].index, 0);
}

#[test]
fn missing_file_is_reported() {
    let path = Path::new("/nonexistent/controller.toml");
    assert_eq!(
        load_config(path).unwrap_err(),
        ConfigError::FileNotFound(path.to_path_buf())
    );
}

#[test]
fn invalid_values_are_rejected() {
    let cases = [
        // no axes
        "axes = []\n",
        // axis id out of range
        "[[axes]]\naxis_id = 0\nmax_velocity = 1.0\nmax_acceleration = 1.0\n",
        // non-positive velocity limit
        "[[axes]]\naxis_id = 1\nmax_velocity = 0.0\nmax_acceleration = 1.0\n",
        // overspeed factor below 1
        "[safety]\noverspeed_factor = 0.5\n[[axes]]\naxis_id = 1\nmax_velocity = 1.0\nmax_acceleration = 1.0\n",
        // zero queue capacity
        "[controller]\nqueue_capacity = 0\n[[axes]]\naxis_id = 1\nmax_velocity = 1.0\nmax_acceleration = 1.0\n",
    ];
    for text in cases {
        let file = write_config(text);
        assert!(
            matches!(load_config(file.path()), Err(ConfigError::Validation(_))),
            "accepted: {text}"
        );
    }
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let file = write_config("[[axes]\naxis_id = 1\n");
    assert!(matches!(
        load_config(file.path()),
        Err(ConfigError::Parse(_))
    ));
}
