// tests/pipeline.rs

use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use tempfile::TempDir;

use sitepipe::engine::run_initial_build;
use sitepipe::errors::PipelineError;
use sitepipe::fs::RealFileSystem;
use sitepipe::start_watch_phase;
use sitepipe::tasks::TaskSet;
use sitepipe::types::TaskKind;
use sitepipe_test_utils::builders::PipelineConfigBuilder;
use sitepipe_test_utils::fakes::RecordingReloader;
use sitepipe_test_utils::{init_tracing, wait_until, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn write(root: &Path, rel: &str, contents: impl AsRef<[u8]>) -> Result<(), Box<dyn Error>> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

fn photo() -> Result<Vec<u8>, Box<dyn Error>> {
    let img = RgbImage::from_fn(40, 30, |x, y| {
        image::Rgb([(x * 6) as u8, (y * 8) as u8, ((x ^ y) * 5) as u8])
    });
    let mut bytes = Vec::new();
    img.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, 100))?;
    Ok(bytes)
}

fn project() -> Result<TempDir, Box<dyn Error>> {
    let dir = TempDir::new()?;
    let root = dir.path();
    write(
        root,
        "src/pug/_layout.pug",
        "doctype html\nhtml\n  head\n    link(rel=\"stylesheet\" href=\"css/style.css\")\n  body\n    block content\n",
    )?;
    write(root, "src/pug/top.pug", "extends _layout\nblock content\n  h1 Welcome\n")?;
    write(root, "src/scss/_colors.scss", "$accent: #336699;\n")?;
    write(
        root,
        "src/scss/style.scss",
        "@import \"colors\";\nh1 { color: $accent; user-select: none; }\n",
    )?;
    write(root, "src/img/photo.jpg", photo()?)?;
    Ok(dir)
}

#[tokio::test]
async fn initial_build_produces_the_site() -> TestResult {
    init_tracing();
    let dir = project()?;
    let root = dir.path();
    let cfg = PipelineConfigBuilder::new().root(root).build();
    let tasks = TaskSet::from_config(&cfg, Arc::new(RealFileSystem))?;

    let reports = with_timeout(run_initial_build(&tasks)).await?;
    assert_eq!(reports.len(), 3);

    let top = fs::read_to_string(root.join("dist/top.html"))?;
    assert!(top.starts_with("<!DOCTYPE html>\n<html>"), "{top}");
    assert!(top.contains("<link rel=\"stylesheet\" href=\"css/style.css\">"), "{top}");
    assert!(top.contains("<h1>Welcome</h1>"), "{top}");
    assert!(!root.join("dist/_layout.html").exists());

    let css = fs::read_to_string(root.join("dist/css/style.css"))?;
    assert!(css.contains("-ms-user-select: none"), "{css}");

    assert!(root.join("dist/img/photo.jpg").is_file());
    Ok(())
}

#[tokio::test]
async fn broken_template_stops_the_initial_build() -> TestResult {
    init_tracing();
    let dir = project()?;
    let root = dir.path();
    write(root, "src/pug/bad.pug", "each x in items\n  p= x\n")?;
    let cfg = PipelineConfigBuilder::new().root(root).build();
    let tasks = TaskSet::from_config(&cfg, Arc::new(RealFileSystem))?;

    let err = with_timeout(run_initial_build(&tasks)).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InitialBuild {
            kind: TaskKind::Markup,
            ..
        }
    ));
    // Later categories never ran.
    assert!(!root.join("dist/css/style.css").exists());
    assert!(!root.join("dist/img").exists());
    Ok(())
}

#[tokio::test]
async fn editing_a_partial_rebuilds_and_reloads() -> TestResult {
    init_tracing();
    let dir = project()?;
    let root = dir.path();
    let cfg = PipelineConfigBuilder::new().root(root).debounce_ms(50).build();
    let tasks = TaskSet::from_config(&cfg, Arc::new(RealFileSystem))?;
    with_timeout(run_initial_build(&tasks)).await?;

    let reloader = Arc::new(RecordingReloader::new());
    let _watcher = start_watch_phase(&cfg, &tasks, reloader.clone())?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    write(root, "src/scss/_colors.scss", "$accent: #ff0000;\n")?;

    wait_until(|| reloader.reloads().contains(&TaskKind::Styles)).await;
    let css = fs::read_to_string(root.join("dist/css/style.css"))?;
    assert!(css.contains("red") || css.contains("#f00"), "{css}");
    assert!(!reloader.reloads().contains(&TaskKind::Markup));
    Ok(())
}

#[tokio::test]
async fn template_change_rebuilds_only_markup() -> TestResult {
    init_tracing();
    let dir = project()?;
    let root = dir.path();
    let cfg = PipelineConfigBuilder::new().root(root).debounce_ms(50).build();
    let tasks = TaskSet::from_config(&cfg, Arc::new(RealFileSystem))?;
    with_timeout(run_initial_build(&tasks)).await?;

    let css_before = fs::metadata(root.join("dist/css/style.css"))?.modified()?;
    let img_before = fs::metadata(root.join("dist/img/photo.jpg"))?.modified()?;

    let reloader = Arc::new(RecordingReloader::new());
    let _watcher = start_watch_phase(&cfg, &tasks, reloader.clone())?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    write(root, "src/pug/top.pug", "extends _layout\nblock content\n  h1 Hello again\n")?;

    wait_until(|| !reloader.reloads().is_empty()).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(reloader.reloads(), vec![TaskKind::Markup]);
    let top = fs::read_to_string(root.join("dist/top.html"))?;
    assert!(top.contains("<h1>Hello again</h1>"), "{top}");
    assert_eq!(fs::metadata(root.join("dist/css/style.css"))?.modified()?, css_before);
    assert_eq!(fs::metadata(root.join("dist/img/photo.jpg"))?.modified()?, img_before);
    Ok(())
}
