use std::{io::Write, path::PathBuf};

use landshift::{ConfigLoader, Model, ScenarioKind};
use tempfile::NamedTempFile;

fn loader() -> ConfigLoader {
    ConfigLoader::new(env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn bundled_scenarios_load_and_run() {
    for (file, scenario) in [
        ("scenarios/basic.yaml", ScenarioKind::Basic),
        ("scenarios/b2_reserve.yaml", ScenarioKind::B2),
        ("scenarios/a1_growth.yaml", ScenarioKind::A1),
    ] {
        let config = loader().load(PathBuf::from(file)).expect("fixture parses");
        assert_eq!(config.scenario, scenario);
        let mut model = Model::from_config(&config).unwrap();
        model.run(3).unwrap();
        assert_eq!(model.history().len(), 4);
        assert!(model.world().ownership_consistent());
    }
}

#[test]
fn growth_override_reaches_the_scenario_table() {
    let config = loader().load("scenarios/a1_growth.yaml").unwrap();
    assert_eq!(config.index_growth, Some(0.25));
    assert_eq!(config.scenario_params().index_growth, 0.25);
    assert_eq!(config.display_name(), "a1_market_growth");
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn basic_fixture_matches_cli_defaults() {
    let config = loader().load("scenarios/basic.yaml").unwrap();
    assert_eq!(config.seed, 42);
    assert_eq!(config.ticks(None), 30);
    assert_eq!(config.ticks(Some(5)), 5);
}

#[test]
fn unknown_scenario_is_a_parse_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "scenario: C3\nseed: 1").unwrap();
    let loader = ConfigLoader::new(file.path().parent().unwrap());
    let err = loader.load(file.path().file_name().unwrap()).unwrap_err();
    assert!(err.to_string().contains("failed to parse config"));
}

#[test]
fn legacy_reserve_pressure_disables_the_b2_modifier() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "scenario: B2\nseed: 4\nlegacy_reserve_pressure: true\nwidth: 3\nheight: 3\ninitial_landholders: 2"
    )
    .unwrap();
    let loader = ConfigLoader::new(file.path().parent().unwrap());
    let config = loader.load(file.path().file_name().unwrap()).unwrap();
    assert_eq!(config.scenario_params().reserve_pressure, 0.0);
    assert!(ScenarioKind::B2.params().reserve_pressure > 0.0);
}
