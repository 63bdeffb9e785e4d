// tests/styles_task.rs

use std::error::Error;
use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use sitepipe::errors::PipelineError;
use sitepipe::fs::RealFileSystem;
use sitepipe::tasks::styles::{add_vendor_prefixes, compile_scss};
use sitepipe::tasks::{BuildTask, StylesTask};
use sitepipe_test_utils::builders::PipelineConfigBuilder;
use sitepipe_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn project(files: &[(&str, &str)]) -> Result<TempDir, Box<dyn Error>> {
    let dir = TempDir::new()?;
    for (rel, contents) in files {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
    }
    Ok(dir)
}

#[test]
fn compiles_entry_with_partials_to_expanded_css() -> TestResult {
    init_tracing();
    let dir = project(&[
        ("src/scss/_vars.scss", "$gap: 8px;\n"),
        (
            "src/scss/style.scss",
            "@import \"vars\";\n.box {\n  display: flex;\n  .inner { margin: $gap * 2; }\n}\n",
        ),
    ])?;
    let cfg = PipelineConfigBuilder::new().root(dir.path()).build();
    let task = StylesTask::from_config(&cfg, Arc::new(RealFileSystem));

    let report = task.run()?;
    let out = dir.path().join("dist/css/style.css");
    assert_eq!(report.written, vec![out.clone()]);

    let css = fs::read_to_string(out)?;
    assert!(css.contains("display: flex"), "{css}");
    assert!(css.contains(".box .inner"), "{css}");
    assert!(css.contains("margin: 16px"), "{css}");
    // Expanded output: one declaration per line.
    assert!(css.contains("{\n  "), "{css}");
    Ok(())
}

#[test]
fn prefixes_for_old_internet_explorer() -> TestResult {
    let dir = project(&[(
        "src/scss/style.scss",
        ".btn {\n  user-select: none;\n}\n",
    )])?;
    let cfg = PipelineConfigBuilder::new().root(dir.path()).build();

    StylesTask::from_config(&cfg, Arc::new(RealFileSystem)).run()?;
    let css = fs::read_to_string(dir.path().join("dist/css/style.css"))?;
    assert!(css.contains("-ms-user-select: none"), "{css}");
    assert!(css.contains("user-select: none"), "{css}");
    Ok(())
}

#[test]
fn flex_rule_is_kept_expanded_and_output_is_stable() -> TestResult {
    let dir = project(&[("src/scss/style.scss", ".a { display: flex; }\n")])?;
    let cfg = PipelineConfigBuilder::new().root(dir.path()).build();
    let task = StylesTask::from_config(&cfg, Arc::new(RealFileSystem));
    let out = dir.path().join("dist/css/style.css");

    task.run()?;
    let first = fs::read(&out)?;
    let css = String::from_utf8(first.clone())?;
    assert!(css.contains(".a {\n"), "{css}");
    assert!(css.contains("display: flex;"), "{css}");

    task.run()?;
    assert_eq!(fs::read(&out)?, first);
    Ok(())
}

#[test]
fn output_file_follows_entry_name() -> TestResult {
    let dir = project(&[("assets/main.scss", "a { color: red; }\n")])?;
    let cfg = PipelineConfigBuilder::new()
        .root(dir.path())
        .styles_entry("assets/main.scss")
        .styles_out("public/css")
        .build();
    let task = StylesTask::from_config(&cfg, Arc::new(RealFileSystem));

    assert_eq!(task.output_path(), dir.path().join("public/css/main.css"));
    task.run()?;
    assert!(dir.path().join("public/css/main.css").is_file());
    Ok(())
}

#[test]
fn missing_entry_is_a_stylesheet_error() -> TestResult {
    let dir = TempDir::new()?;
    let cfg = PipelineConfigBuilder::new().root(dir.path()).build();

    let err = StylesTask::from_config(&cfg, Arc::new(RealFileSystem))
        .run()
        .unwrap_err();
    assert!(matches!(err, PipelineError::Stylesheet { ref message, .. } if message.contains("not found")));
    Ok(())
}

#[test]
fn syntax_error_fails_without_writing() -> TestResult {
    let dir = project(&[("src/scss/style.scss", ".a {\n  color: $undefined;\n}\n")])?;
    let cfg = PipelineConfigBuilder::new().root(dir.path()).build();

    let err = StylesTask::from_config(&cfg, Arc::new(RealFileSystem))
        .run()
        .unwrap_err();
    assert!(matches!(err, PipelineError::Stylesheet { .. }));
    assert!(!dir.path().join("dist/css/style.css").exists());
    Ok(())
}

#[test]
fn compile_scss_reads_through_the_filesystem_seam() -> TestResult {
    let dir = project(&[("main.scss", "$c: blue;\np { color: $c; }\n")])?;
    let css = compile_scss(&RealFileSystem, &dir.path().join("main.scss"))?;
    assert!(css.contains("color: blue"), "{css}");
    Ok(())
}

fn browsers() -> Vec<String> {
    vec!["last 2 versions".to_string(), "ie >= 11".to_string()]
}

#[test]
fn prefixing_keeps_rules_values_and_comments_as_written() -> TestResult {
    let css = "/* header */
.a {
  color: #ffffff;
  margin: 0px 0px 0px 0px;
}

.b {
  color: red;
}

.c {
  color: red;
}
";
    assert_eq!(add_vendor_prefixes(css, &browsers())?, css);
    Ok(())
}

#[test]
fn prefixed_copies_go_above_the_original_declaration() -> TestResult {
    let css = ".btn {\n  color: #ffffff;\n  user-select: none;\n  cursor: pointer;\n}\n";
    let out = add_vendor_prefixes(css, &browsers())?;

    let color = out.find("  color: #ffffff;\n").ok_or("color line missing")?;
    let ms = out
        .find("  -ms-user-select: none;\n")
        .ok_or("-ms- copy missing")?;
    let plain = out
        .find("\n  user-select: none;\n")
        .ok_or("original line missing")?;
    let cursor = out.find("  cursor: pointer;\n").ok_or("cursor line missing")?;
    assert!(color < ms && ms < plain && plain < cursor, "{out}");
    assert!(out.starts_with(".btn {\n") && out.ends_with("}\n"), "{out}");
    Ok(())
}

#[test]
fn existing_prefixes_are_not_repeated() -> TestResult {
    let css = ".a {\n  -ms-user-select: none;\n  user-select: none;\n}\n";
    let out = add_vendor_prefixes(css, &browsers())?;
    assert_eq!(out.matches("-ms-user-select").count(), 1, "{out}");
    Ok(())
}

#[test]
fn sass_comments_survive_the_whole_task() -> TestResult {
    let dir = project(&[(
        "src/scss/style.scss",
        "/* site styles */\n.b { color: red; }\n.c { color: red; }\n",
    )])?;
    let cfg = PipelineConfigBuilder::new().root(dir.path()).build();

    StylesTask::from_config(&cfg, Arc::new(RealFileSystem)).run()?;
    let css = fs::read_to_string(dir.path().join("dist/css/style.css"))?;
    assert!(css.contains("/* site styles */"), "{css}");
    let b = css.find(".b {").ok_or(".b missing")?;
    let c = css.find(".c {").ok_or(".c missing")?;
    assert!(b < c, "{css}");
    Ok(())
}

#[test]
fn invalid_browser_query_is_reported() {
    let err = add_vendor_prefixes("a { color: red; }", &["not a real browser 99".to_string()])
        .unwrap_err();
    assert!(err.contains("browser"), "{err}");
}
