// tests/config_loading.rs

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use sitepipe::config::loader::{config_root_dir, default_config_path};
use sitepipe::config::{load_and_validate, load_or_default, PipelineConfig};
use sitepipe::errors::PipelineError;
use sitepipe::types::OpenMode;
use sitepipe_test_utils::builders::PipelineConfigBuilder;
use sitepipe_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn write_config(dir: &TempDir, contents: &str) -> Result<PathBuf, Box<dyn Error>> {
    let path = dir.path().join("Sitepipe.toml");
    fs::write(&path, contents)?;
    Ok(path)
}

#[test]
fn defaults_match_the_classic_layout() {
    let cfg = PipelineConfig::defaults();

    assert_eq!(cfg.markup().src_dir, PathBuf::from("src/pug"));
    assert_eq!(cfg.markup().out_dir, PathBuf::from("dist"));
    assert_eq!(cfg.markup().partial_prefix, "_");
    assert!(cfg.markup().pretty);

    assert_eq!(cfg.styles().entry, PathBuf::from("src/scss/style.scss"));
    assert_eq!(cfg.styles().out_dir, PathBuf::from("dist/css"));
    assert_eq!(cfg.styles().browsers, vec!["last 2 versions", "ie >= 11"]);

    assert_eq!(cfg.images().src_dir, PathBuf::from("src/img"));
    assert_eq!(cfg.images().out_dir, PathBuf::from("dist/img"));
    assert_eq!(cfg.images().quality, 80);

    assert_eq!(cfg.server().base_dir, PathBuf::from("./"));
    assert_eq!(cfg.server().start_path, "dist/top.html");
    assert_eq!(cfg.server().open, OpenMode::External);
    assert!(cfg.server().reload_on_restart);

    assert_eq!(cfg.watch().debounce_ms, 100);
    assert_eq!(default_config_path(), PathBuf::from("Sitepipe.toml"));
}

#[test]
fn missing_file_falls_back_to_defaults() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let cfg = load_or_default(dir.path().join("Sitepipe.toml"))?;

    assert_eq!(cfg.root(), dir.path());
    assert_eq!(cfg.images().quality, 80);
    Ok(())
}

#[test]
fn partial_file_overrides_only_given_keys() -> TestResult {
    let dir = TempDir::new()?;
    let path = write_config(
        &dir,
        r#"
[markup]
pretty = false

[images]
quality = 65

[server]
open = "local"
port = 8080
"#,
    )?;

    let cfg = load_and_validate(&path)?;
    assert!(!cfg.markup().pretty);
    assert_eq!(cfg.markup().src_dir, PathBuf::from("src/pug"));
    assert_eq!(cfg.images().quality, 65);
    assert_eq!(cfg.server().open, OpenMode::Local);
    assert_eq!(cfg.server().port, 8080);
    assert_eq!(cfg.server().start_path, "dist/top.html");
    Ok(())
}

#[test]
fn paths_resolve_against_config_directory() -> TestResult {
    let dir = TempDir::new()?;
    let path = write_config(&dir, "")?;

    let cfg = load_and_validate(&path)?;
    assert_eq!(
        cfg.resolve(Path::new("src/pug")),
        dir.path().join("src/pug")
    );
    Ok(())
}

#[test]
fn bare_file_name_roots_at_working_directory() {
    assert_eq!(config_root_dir(Path::new("Sitepipe.toml")), PathBuf::from("."));
    assert_eq!(
        config_root_dir(Path::new("site/Sitepipe.toml")),
        PathBuf::from("site")
    );

    let cfg = PipelineConfig::defaults();
    assert_eq!(cfg.resolve(Path::new("src/pug")), PathBuf::from("src/pug"));
}

#[test]
fn quality_out_of_range_is_rejected() -> TestResult {
    let dir = TempDir::new()?;
    let path = write_config(&dir, "[images]\nquality = 0\n")?;

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, PipelineError::ConfigError(ref m) if m.contains("quality")));
    Ok(())
}

#[test]
fn invalid_glob_is_rejected() {
    let raw = PipelineConfigBuilder::new().markup_watch(&["src/pug/[*.pug"]).raw();
    let err = PipelineConfig::try_from(raw).unwrap_err();
    assert!(matches!(err, PipelineError::ConfigError(ref m) if m.contains("[markup].watch")));
}

#[test]
fn empty_browser_list_is_rejected() {
    let raw = PipelineConfigBuilder::new().browsers(&["  "]).raw();
    assert!(PipelineConfig::try_from(raw).is_err());
}

#[test]
fn absolute_start_path_is_rejected() -> TestResult {
    let dir = TempDir::new()?;
    let path = write_config(&dir, "[server]\nstart_path = \"/dist/top.html\"\n")?;
    assert!(load_and_validate(&path).is_err());
    Ok(())
}

#[test]
fn malformed_toml_is_a_toml_error() -> TestResult {
    let dir = TempDir::new()?;
    let path = write_config(&dir, "[images\nquality = 3")?;

    let err = load_or_default(&path).unwrap_err();
    assert!(matches!(err, PipelineError::TomlError(_)));
    Ok(())
}

#[test]
fn unknown_open_mode_is_rejected() -> TestResult {
    let dir = TempDir::new()?;
    let path = write_config(&dir, "[server]\nopen = \"sometimes\"\n")?;
    assert!(load_and_validate(&path).is_err());
    Ok(())
}

#[test]
fn open_mode_parses_from_cli_strings() {
    assert_eq!("external".parse::<OpenMode>(), Ok(OpenMode::External));
    assert_eq!("Local".parse::<OpenMode>(), Ok(OpenMode::Local));
    assert_eq!("false".parse::<OpenMode>(), Ok(OpenMode::None));
    assert!("maybe".parse::<OpenMode>().is_err());
}
