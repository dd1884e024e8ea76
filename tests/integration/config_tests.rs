use figment::providers::{Env, Serialized};
use figment::Figment;
use rotodupe::cli::{Cli, Commands};
use rotodupe::config::{Config, ConfigError, ENV_PREFIX};
use rotodupe::duplicates::MatchMode;
use rotodupe::error::ExitCode;
use std::fs;
use tempfile::tempdir;

use clap::Parser;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.hash_size, 8);
    assert_eq!(config.match_mode, MatchMode::Aligned);
}

#[test]
fn test_config_load_from_env() {
    std::env::set_var("ROTODUPE_TEST_ENV_MATCH_MODE", "rotated");
    std::env::set_var("ROTODUPE_TEST_ENV_MAX_DIMENSION", "4096");

    let figment = Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed(&format!("{ENV_PREFIX}TEST_ENV_")).split("__"));
    let config: Config = figment.extract().unwrap();

    assert_eq!(config.match_mode, MatchMode::Rotated);
    assert_eq!(config.max_dimension, 4096);
    assert_eq!(config.hash_size, 8);

    std::env::remove_var("ROTODUPE_TEST_ENV_MATCH_MODE");
    std::env::remove_var("ROTODUPE_TEST_ENV_MAX_DIMENSION");
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let toml_content = r#"
hash_size = 16
highfreq_factor = 2
threshold = 0.05
match_mode = "rotated"
extensions = ["png", ".JPG"]
ignore_patterns = ["thumbs/"]
hash_timeout_secs = 10
"#;
    fs::write(&config_path, toml_content).unwrap();

    let config = Config::load(Some(&config_path)).unwrap();
    assert_eq!(config.hash_size, 16);
    assert_eq!(config.highfreq_factor, 2);
    assert_eq!(config.threshold, 0.05);
    assert_eq!(config.match_mode, MatchMode::Rotated);
    assert_eq!(config.ignore_patterns, vec!["thumbs/"]);
    assert_eq!(config.hash_timeout().unwrap().as_secs(), 10);
    assert!(config.validate().is_ok());

    let walker = config.walker_config();
    assert_eq!(walker.extensions, vec!["png", "jpg"]);
}

#[test]
fn test_config_invalid_toml_type() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "hash_size = \"large\"\n").unwrap();

    assert!(matches!(
        Config::load_from_path(&config_path),
        Err(ConfigError::Load(_))
    ));
}

#[test]
fn test_config_validation_catches_odd_hash_size() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "hash_size = 9\n").unwrap();

    let config = Config::load_from_path(&config_path).unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_cli_flags_override_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "threshold = 0.3\nskip_hidden = true\n").unwrap();

    let mut config = Config::load_from_path(&config_path).unwrap();
    let cli = Cli::try_parse_from(["rotodupe", "scan", ".", "--threshold", "0.02"]).unwrap();
    let Commands::Scan(args) = cli.command else {
        panic!("Expected Scan command");
    };
    args.apply(&mut config);

    assert_eq!(config.threshold, 0.02);
    assert!(config.skip_hidden);
}

#[test]
fn test_config_init_writes_loadable_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("nested").join("rotodupe.toml");
    let path_arg = config_path.to_str().unwrap();

    let cli = Cli::try_parse_from(["rotodupe", "--config", path_arg, "config", "init"]).unwrap();
    assert_eq!(rotodupe::run_app(cli).unwrap(), ExitCode::Success);
    assert!(config_path.exists());

    let loaded = Config::load_from_path(&config_path).unwrap();
    assert_eq!(loaded, Config::default());

    let cli = Cli::try_parse_from(["rotodupe", "--config", path_arg, "config", "init"]).unwrap();
    assert!(rotodupe::run_app(cli).is_err());

    let cli = Cli::try_parse_from(["rotodupe", "--config", path_arg, "config", "init", "--force"])
        .unwrap();
    assert_eq!(rotodupe::run_app(cli).unwrap(), ExitCode::Success);
}

#[test]
fn test_missing_explicit_config_fails() {
    let cli = Cli::try_parse_from([
        "rotodupe",
        "--config",
        "/no/such/dir/rotodupe.toml",
        "config",
        "show",
    ])
    .unwrap();
    assert!(rotodupe::run_app(cli).is_err());
}
