//! Configuration loading tests
//!
//! Tests that touch TELEGRAM_BOT_TOKEN are marked #[serial] so they never
//! race on the process environment.

use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use vfx_common::config::{
    bot_token_from_env, load_toml_config, BotConfig, ConfigOverrides, TomlConfig, TOKEN_ENV_VAR,
};

#[test]
fn test_missing_config_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_toml_config(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(config.scratch_dir, PathBuf::from("temp_audio"));
    assert_eq!(config.page_size, 8);
    assert_eq!(config.status_port, 5000);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_partial_config_file_fills_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
scratch_dir = "/srv/vfx/scratch"
transform_timeout_secs = 15

[logging]
level = "debug"
"#
    )
    .unwrap();

    let toml = load_toml_config(file.path()).unwrap();
    let config = BotConfig::resolve(toml, ConfigOverrides::default()).unwrap();

    assert_eq!(config.scratch_dir, PathBuf::from("/srv/vfx/scratch"));
    assert_eq!(config.transform_timeout, Duration::from_secs(15));
    assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
    assert_eq!(config.page_size, 8);
    assert_eq!(config.log_level, "debug");
}

#[test]
fn test_malformed_config_file_is_fatal() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "page_size = \"eight\"").unwrap();

    assert!(load_toml_config(file.path()).is_err());
}

#[test]
fn test_cli_overrides_beat_file() {
    let toml = TomlConfig {
        scratch_dir: PathBuf::from("from_file"),
        status_port: 6000,
        ..TomlConfig::default()
    };
    let overrides = ConfigOverrides {
        scratch_dir: Some(PathBuf::from("from_cli")),
        ffmpeg_path: Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg")),
        ..ConfigOverrides::default()
    };

    let config = BotConfig::resolve(toml, overrides).unwrap();
    assert_eq!(config.scratch_dir, PathBuf::from("from_cli"));
    assert_eq!(config.ffmpeg_path, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
    assert_eq!(config.status_port, 6000);
}

#[test]
#[serial]
fn test_token_required() {
    env::remove_var(TOKEN_ENV_VAR);
    assert!(bot_token_from_env().is_err());

    env::set_var(TOKEN_ENV_VAR, "   ");
    assert!(bot_token_from_env().is_err());

    env::remove_var(TOKEN_ENV_VAR);
}

#[test]
#[serial]
fn test_token_from_env_trimmed() {
    env::set_var(TOKEN_ENV_VAR, " 123456:ABC-DEF \n");
    assert_eq!(bot_token_from_env().unwrap(), "123456:ABC-DEF");
    env::remove_var(TOKEN_ENV_VAR);
}
