// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::OpenMode;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [markup]
/// src_dir = "src/pug"
/// out_dir = "dist"
///
/// [styles]
/// entry = "src/scss/style.scss"
/// browsers = ["last 2 versions", "ie >= 11"]
///
/// [images]
/// quality = 80
///
/// [server]
/// start_path = "dist/top.html"
/// open = "external"
/// ```
///
/// All sections are optional; a missing file is equivalent to an empty one.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawPipelineConfig {
    #[serde(default)]
    pub markup: MarkupSection,

    #[serde(default)]
    pub styles: StylesSection,

    #[serde(default)]
    pub images: ImagesSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub watch: WatchSection,
}

/// Validated configuration.
///
/// Constructed via `PipelineConfig::try_from(RawPipelineConfig)` (see
/// `validate.rs`) so that the rest of the crate can rely on its invariants.
/// Relative paths are resolved against [`PipelineConfig::root`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    root: PathBuf,
    markup: MarkupSection,
    styles: StylesSection,
    images: ImagesSection,
    server: ServerSection,
    watch: WatchSection,
}

impl PipelineConfig {
    pub(crate) fn new_unchecked(raw: RawPipelineConfig) -> Self {
        Self {
            root: PathBuf::from("."),
            markup: raw.markup,
            styles: raw.styles,
            images: raw.images,
            server: raw.server,
            watch: raw.watch,
        }
    }

    /// Built-in defaults, equivalent to an empty config file.
    pub fn defaults() -> Self {
        Self::new_unchecked(RawPipelineConfig::default())
    }

    /// Re-root all relative paths at `root` (usually the config file's directory).
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn markup(&self) -> &MarkupSection {
        &self.markup
    }

    pub fn styles(&self) -> &StylesSection {
        &self.styles
    }

    pub fn images(&self) -> &ImagesSection {
        &self.images
    }

    pub fn server(&self) -> &ServerSection {
        &self.server
    }

    pub fn watch(&self) -> &WatchSection {
        &self.watch
    }

    /// Resolve a configured path against the project root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() || self.root.as_os_str().is_empty() || self.root == Path::new(".") {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// `[markup]` section: Pug templates -> HTML.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkupSection {
    #[serde(default = "default_markup_src")]
    pub src_dir: PathBuf,

    /// Globs, relative to `src_dir`, selecting templates to compile.
    #[serde(default = "default_markup_include")]
    pub include: Vec<String>,

    /// Files whose name starts with this prefix are include-only fragments.
    #[serde(default = "default_partial_prefix")]
    pub partial_prefix: String,

    #[serde(default = "default_markup_out")]
    pub out_dir: PathBuf,

    /// Indent the generated HTML.
    #[serde(default = "default_true")]
    pub pretty: bool,

    /// Globs, relative to the project root, that trigger a markup rebuild.
    #[serde(default = "default_markup_watch")]
    pub watch: Vec<String>,
}

fn default_markup_src() -> PathBuf {
    PathBuf::from("src/pug")
}

fn default_markup_include() -> Vec<String> {
    vec!["**/*.pug".to_string()]
}

fn default_partial_prefix() -> String {
    "_".to_string()
}

fn default_markup_out() -> PathBuf {
    PathBuf::from("dist")
}

fn default_markup_watch() -> Vec<String> {
    vec!["src/pug/**/*.pug".to_string()]
}

impl Default for MarkupSection {
    fn default() -> Self {
        Self {
            src_dir: default_markup_src(),
            include: default_markup_include(),
            partial_prefix: default_partial_prefix(),
            out_dir: default_markup_out(),
            pretty: true,
            watch: default_markup_watch(),
        }
    }
}

/// `[styles]` section: one SCSS entry -> prefixed CSS.
#[derive(Debug, Clone, Deserialize)]
pub struct StylesSection {
    #[serde(default = "default_styles_entry")]
    pub entry: PathBuf,

    #[serde(default = "default_styles_out")]
    pub out_dir: PathBuf,

    /// Browserslist queries used for vendor prefixing.
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,

    #[serde(default = "default_styles_watch")]
    pub watch: Vec<String>,
}

fn default_styles_entry() -> PathBuf {
    PathBuf::from("src/scss/style.scss")
}

fn default_styles_out() -> PathBuf {
    PathBuf::from("dist/css")
}

fn default_browsers() -> Vec<String> {
    vec!["last 2 versions".to_string(), "ie >= 11".to_string()]
}

fn default_styles_watch() -> Vec<String> {
    vec!["src/scss/**/*.scss".to_string()]
}

impl Default for StylesSection {
    fn default() -> Self {
        Self {
            entry: default_styles_entry(),
            out_dir: default_styles_out(),
            browsers: default_browsers(),
            watch: default_styles_watch(),
        }
    }
}

/// `[images]` section: JPEG re-encoding.
#[derive(Debug, Clone, Deserialize)]
pub struct ImagesSection {
    #[serde(default = "default_images_src")]
    pub src_dir: PathBuf,

    #[serde(default = "default_images_include")]
    pub include: Vec<String>,

    #[serde(default = "default_images_out")]
    pub out_dir: PathBuf,

    /// JPEG quality, 1..=100.
    #[serde(default = "default_quality")]
    pub quality: u8,

    #[serde(default = "default_images_watch")]
    pub watch: Vec<String>,
}

fn default_images_src() -> PathBuf {
    PathBuf::from("src/img")
}

fn default_images_include() -> Vec<String> {
    vec!["**/*.jpg".to_string(), "**/*.jpeg".to_string()]
}

fn default_images_out() -> PathBuf {
    PathBuf::from("dist/img")
}

fn default_quality() -> u8 {
    80
}

fn default_images_watch() -> Vec<String> {
    vec!["src/img/**".to_string()]
}

impl Default for ImagesSection {
    fn default() -> Self {
        Self {
            src_dir: default_images_src(),
            include: default_images_include(),
            out_dir: default_images_out(),
            quality: default_quality(),
            watch: default_images_watch(),
        }
    }
}

/// `[server]` section: dev server and live reload.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    /// Directory served as `/`.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Page opened in the browser, relative to `base_dir`.
    #[serde(default = "default_start_path")]
    pub start_path: String,

    #[serde(default)]
    pub open: OpenMode,

    /// Reload connected pages when they reconnect to a restarted server.
    #[serde(default = "default_true")]
    pub reload_on_restart: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("./")
}

fn default_start_path() -> String {
    "dist/top.html".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            start_path: default_start_path(),
            open: OpenMode::default(),
            reload_on_restart: true,
            host: default_host(),
            port: default_port(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Quiet period per path before a change is acted on.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    100
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}
