// tests/pug_compiler.rs

use std::error::Error;
use std::path::{Path, PathBuf};

use sitepipe::fs::mock::MockFileSystem;
use sitepipe::pug::{compile_file, compile_str, PugError, PugOptions};

type TestResult = Result<(), Box<dyn Error>>;

fn options() -> PugOptions {
    PugOptions {
        pretty: true,
        basedir: PathBuf::from("src/pug"),
    }
}

fn compile(source: &str) -> Result<String, PugError> {
    let fs = MockFileSystem::new();
    compile_str(&fs, source, Path::new("src/pug/index.pug"), &options())
}

#[test]
fn renders_a_basic_page() -> TestResult {
    let html = compile(
        "doctype html
html(lang=\"ja\")
  head
    meta(charset=\"utf-8\")
    title Top
  body
    h1.title#main Hello
    p
      | line one
      | line two
",
    )?;

    assert_eq!(
        html,
        "<!DOCTYPE html>
<html lang=\"ja\">
  <head>
    <meta charset=\"utf-8\">
    <title>Top</title>
  </head>
  <body>
    <h1 id=\"main\" class=\"title\">Hello</h1>
    <p>
      line one
      line two
    </p>
  </body>
</html>
"
    );
    Ok(())
}

#[test]
fn compact_output_has_no_whitespace() -> TestResult {
    let fs = MockFileSystem::new();
    let opts = PugOptions {
        pretty: false,
        ..options()
    };
    let html = compile_str(&fs, "div\n  p a\n  p b\n", Path::new("src/pug/x.pug"), &opts)?;
    assert_eq!(html, "<div><p>a</p><p>b</p></div>");
    Ok(())
}

#[test]
fn bare_shorthand_is_a_div() -> TestResult {
    assert_eq!(compile(".card#one\n")?, "<div id=\"one\" class=\"card\"></div>\n");
    Ok(())
}

#[test]
fn attributes_escape_merge_and_drop_false() -> TestResult {
    let html = compile(
        "a(href=\"/x?a=1&b=2\", target='_blank' disabled data-n=3 hidden=false)\n\
         div(data-raw!=\"<b>\")\n\
         .a(class=\"b c\")\n",
    )?;

    assert_eq!(
        html,
        "<a href=\"/x?a=1&amp;b=2\" target=\"_blank\" disabled=\"disabled\" data-n=\"3\"></a>
<div data-raw=\"<b>\"></div>
<div class=\"a b c\"></div>
"
    );
    Ok(())
}

#[test]
fn html_doctype_uses_terse_attributes() -> TestResult {
    let html = compile("doctype html\ninput(type=\"checkbox\" checked)\nbr\n")?;
    assert_eq!(
        html,
        "<!DOCTYPE html>\n<input type=\"checkbox\" checked><br>\n"
    );
    Ok(())
}

#[test]
fn attribute_lists_may_span_lines() -> TestResult {
    let html = compile("a(\n  href=\"/\"\n  title=\"Home\"\n) Home\n")?;
    assert_eq!(html, "<a href=\"/\" title=\"Home\">Home</a>\n");
    Ok(())
}

#[test]
fn dotted_text_block_keeps_relative_indentation() -> TestResult {
    let html = compile("script.\n  if (a < b) {\n    go();\n  }\n")?;
    assert_eq!(html, "<script>\n  if (a < b) {\n    go();\n  }\n</script>\n");
    Ok(())
}

#[test]
fn buffered_and_silent_comments() -> TestResult {
    let html = compile("div\n  // note\n  //- hidden\n    still hidden\n  p x\n")?;
    assert_eq!(html, "<div>\n  <!-- note-->\n  <p>x</p>\n</div>\n");
    Ok(())
}

#[test]
fn inline_tag_interpolation() -> TestResult {
    let html = compile("p Click #[a(href=\"/\") here] now, \\#[not a tag]\n")?;
    assert_eq!(
        html,
        "<p>Click <a href=\"/\">here</a> now, #[not a tag]</p>\n"
    );
    Ok(())
}

#[test]
fn block_expansion_nests_elements() -> TestResult {
    let html = compile("ul\n  li: a(href=\"/\") Home\n")?;
    assert_eq!(html, "<ul>\n  <li><a href=\"/\">Home</a></li>\n</ul>\n");

    let html = compile("nav: ul: li.item: a(href=\"/\") Top\n")?;
    assert_eq!(
        html,
        "<nav>\n  <ul>\n    <li class=\"item\"><a href=\"/\">Top</a></li>\n  </ul>\n</nav>\n"
    );
    Ok(())
}

#[test]
fn inline_elements_stay_on_the_text_line() -> TestResult {
    let html = compile("p\n  | Hello\n  strong world\n  | !\n")?;
    assert_eq!(html, "<p>Hello<strong>world</strong>!</p>\n");

    let html = compile("p\n  a(href=\"/\") Home\n  | , then more\n")?;
    assert_eq!(html, "<p><a href=\"/\">Home</a>, then more</p>\n");

    let html = compile("div\n  span a\n  em b\n  p c\n")?;
    assert_eq!(html, "<div><span>a</span><em>b</em>\n  <p>c</p>\n</div>\n");
    Ok(())
}

#[test]
fn shorthand_may_follow_attributes() -> TestResult {
    let html = compile("a(href='/').btn Go\n")?;
    assert_eq!(html, "<a class=\"btn\" href=\"/\">Go</a>\n");

    let html = compile("div(data-a=\"1\")#main(data-b=\"2\").wide\n")?;
    assert_eq!(
        html,
        "<div id=\"main\" class=\"wide\" data-a=\"1\" data-b=\"2\"></div>\n"
    );

    let err = compile("p#a(title=\"x\")#b\n").unwrap_err();
    assert!(err.message.contains("#id"), "{err}");
    Ok(())
}

#[test]
fn namespaced_tags_keep_their_colon() -> TestResult {
    assert_eq!(compile("svg:rect\n")?, "<svg:rect></svg:rect>\n");
    Ok(())
}

#[test]
fn literal_html_and_self_closing_tags() -> TestResult {
    let html = compile("div\n  <span>raw</span>\n  foo/\n")?;
    assert_eq!(html, "<div><span>raw</span>\n  <foo/>\n</div>\n");
    Ok(())
}

#[test]
fn includes_partials_relative_to_the_file() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("src/pug/_header.pug", "header\n  nav Menu\n");
    fs.add_file("src/pug/index.pug", "body\n  include _header\n  main Content\n");

    let html = compile_file(&fs, Path::new("src/pug/index.pug"), &options())?;
    assert_eq!(
        html,
        "<body>\n  <header>\n    <nav>Menu</nav>\n  </header>\n  <main>Content</main>\n</body>\n"
    );
    Ok(())
}

#[test]
fn absolute_includes_resolve_against_basedir() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("src/pug/partials/_nav.pug", "nav Site\n");
    fs.add_file("src/pug/sub/page.pug", "include /partials/_nav\n");

    let html = compile_file(&fs, Path::new("src/pug/sub/page.pug"), &options())?;
    assert_eq!(html, "<nav>Site</nav>\n");
    Ok(())
}

#[test]
fn non_pug_includes_are_inserted_raw() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("src/pug/inline.css", "a { color: red; }\n");
    fs.add_file("src/pug/index.pug", "style\n  include inline.css\n");

    let html = compile_file(&fs, Path::new("src/pug/index.pug"), &options())?;
    assert_eq!(html, "<style>a { color: red; }</style>\n");
    Ok(())
}

#[test]
fn extends_replaces_and_appends_blocks() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file(
        "src/pug/_layout.pug",
        "doctype html
html
  head
    block title
      title Default
  body
    block content
",
    );
    fs.add_file(
        "src/pug/page.pug",
        "extends _layout

block title
  title Page

block append content
  p Hello
",
    );

    let html = compile_file(&fs, Path::new("src/pug/page.pug"), &options())?;
    assert_eq!(
        html,
        "<!DOCTYPE html>
<html>
  <head>
    <title>Page</title>
  </head>
  <body>
    <p>Hello</p>
  </body>
</html>
"
    );
    Ok(())
}

#[test]
fn extends_chains_through_several_layouts() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("src/pug/_base.pug", "html\n  body\n    block content\n      p base\n");
    fs.add_file(
        "src/pug/_mid.pug",
        "extends _base\nblock content\n  section\n    block inner\n",
    );
    fs.add_file("src/pug/page.pug", "extends _mid\nblock inner\n  p inner\n");

    let html = compile_file(&fs, Path::new("src/pug/page.pug"), &options())?;
    assert_eq!(
        html,
        "<html>\n  <body>\n    <section>\n      <p>inner</p>\n    </section>\n  </body>\n</html>\n"
    );
    Ok(())
}

#[test]
fn prepend_puts_content_first() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("src/pug/_layout.pug", "ul\n  block items\n    li b\n");
    fs.add_file("src/pug/page.pug", "extends _layout\nprepend items\n  li a\n");

    let html = compile_file(&fs, Path::new("src/pug/page.pug"), &options())?;
    assert_eq!(html, "<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>\n");
    Ok(())
}

#[test]
fn code_and_control_flow_are_rejected() {
    let err = compile("div\n  - var x = 1\n").unwrap_err();
    assert_eq!(err.line, 2);
    assert!(err.message.contains("code"), "{err}");

    let err = compile("each item in items\n  li= item\n").unwrap_err();
    assert!(err.message.contains("each"), "{err}");

    let err = compile("+card()\n").unwrap_err();
    assert!(err.message.contains("mixin"), "{err}");

    let err = compile("p Hello #{name}\n").unwrap_err();
    assert!(err.message.contains("interpolation"), "{err}");

    let err = compile("a(href=url)\n").unwrap_err();
    assert!(err.message.contains("attribute expression"), "{err}");
}

#[test]
fn inconsistent_indentation_is_an_error() {
    let err = compile("div\n    p a\n  p b\n").unwrap_err();
    assert_eq!(err.line, 3);
    assert!(err.message.contains("indentation"), "{err}");

    let err = compile("div\n  p a\n\tp b\n").unwrap_err();
    assert!(err.message.contains("tab"), "{err}");
}

#[test]
fn void_elements_cannot_have_content() {
    let err = compile("br text\n").unwrap_err();
    assert!(err.message.contains("br"), "{err}");
}

#[test]
fn include_cycles_are_detected() {
    let fs = MockFileSystem::new();
    fs.add_file("src/pug/_a.pug", "include _b\n");
    fs.add_file("src/pug/_b.pug", "include _a\n");
    fs.add_file("src/pug/index.pug", "include _a\n");

    let err = compile_file(&fs, Path::new("src/pug/index.pug"), &options()).unwrap_err();
    assert!(err.message.contains("cycle"), "{err}");
    assert_eq!(err.path, PathBuf::from("src/pug/_b.pug"));
}

#[test]
fn missing_include_names_the_target() {
    let fs = MockFileSystem::new();
    fs.add_file("src/pug/index.pug", "div\n  include _missing\n");

    let err = compile_file(&fs, Path::new("src/pug/index.pug"), &options()).unwrap_err();
    assert_eq!(err.path, PathBuf::from("src/pug/index.pug"));
    assert_eq!(err.line, 2);
    assert!(err.message.contains("_missing.pug"), "{err}");
}

#[test]
fn unknown_block_in_child_is_an_error() {
    let fs = MockFileSystem::new();
    fs.add_file("src/pug/_layout.pug", "body\n  block content\n");
    fs.add_file("src/pug/page.pug", "extends _layout\nblock sidebar\n  p x\n");

    let err = compile_file(&fs, Path::new("src/pug/page.pug"), &options()).unwrap_err();
    assert!(err.message.contains("sidebar"), "{err}");
}

#[test]
fn error_display_has_location() {
    let err = compile("div\n  if x\n").unwrap_err();
    assert_eq!(err.to_string(), format!("src/pug/index.pug:2: {}", err.message));
}
