//! JSON configuration round trips and error reporting.

use std::path::PathBuf;

use droplets::{generate_samples, Command, SimError, SimParams, Simulator, TerrainConfig, Vec3};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("droplets_{}_{}.json", name, std::process::id()))
}

#[test]
fn params_survive_save_and_load() {
    let path = temp_path("params");
    let params = SimParams {
        dt: 0.005,
        terrain_restitution: 0.3,
        terrain_friction: 0.1,
        solver_iterations: 6,
        ..Default::default()
    };
    params.save_json(&path).unwrap();
    let loaded = SimParams::load_json(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    assert_eq!(loaded, params);
}

#[test]
fn partial_params_file_takes_defaults() {
    let path = temp_path("partial");
    std::fs::write(&path, r#"{ "gravity": -3.0 }"#).unwrap();
    let loaded = SimParams::load_json(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    assert_eq!(loaded.gravity, -3.0);
    assert_eq!(loaded.dt, SimParams::default().dt);
}

#[test]
fn invalid_params_file_is_rejected() {
    let path = temp_path("bad_dt");
    std::fs::write(&path, r#"{ "dt": -0.1 }"#).unwrap();
    let result = SimParams::load_json(&path);
    let _ = std::fs::remove_file(&path);
    assert!(matches!(result, Err(SimError::InvalidDeltaTime(_))));
}

#[test]
fn missing_or_garbled_files_report_their_cause() {
    let missing = SimParams::load_json(&temp_path("does_not_exist"));
    assert!(matches!(missing, Err(SimError::Io(_))));

    let path = temp_path("garbled");
    std::fs::write(&path, "not json").unwrap();
    let garbled = SimParams::load_json(&path);
    let _ = std::fs::remove_file(&path);
    assert!(matches!(garbled, Err(SimError::Json(_))));
}

#[test]
fn terrain_config_round_trips_through_json() {
    let config = TerrainConfig {
        res_x: 10,
        res_z: 6,
        seed: 99,
        ..Default::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    let back: TerrainConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
    assert_eq!(generate_samples(&back), generate_samples(&config));
}

#[test]
fn scripted_commands_drive_simulator() {
    let script = r#"[
        { "SetDeltaTime": 0.01 },
        { "RegisterParticles": { "centers": [[0.0, 2.0, 0.0], [3.0, 2.0, 0.0]], "radius": 0.5 } },
        { "SpawnParticle": { "center": [-3.0, 2.0, 0.0] } },
        "TogglePause"
    ]"#;
    let commands: Vec<Command> = serde_json::from_str(script).unwrap();

    let mut sim = Simulator::new(SimParams::default()).unwrap();
    sim.set_terrain(&generate_samples(&TerrainConfig {
        res_x: 8,
        res_z: 8,
        width: 20.0,
        length: 20.0,
        height_multiplier: 0.0,
        base_elevation: 0.0,
        ..Default::default()
    }))
    .unwrap();

    for command in &commands {
        sim.apply(command).unwrap();
    }
    assert_eq!(sim.particle_count(), 3);
    assert_eq!(sim.delta_time(), 0.01);
    assert!(sim.is_paused());

    let before: Vec<Vec3> = sim.particles().iter().map(|p| p.position).collect();
    sim.step().unwrap();
    let after: Vec<Vec3> = sim.particles().iter().map(|p| p.position).collect();
    assert_eq!(before, after);
}
