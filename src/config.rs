use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::{env, fs, io};

use serde::Deserialize;

use crate::content::markdown_renderer::ContentMode;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Paths {
    pub intake_dir: PathBuf,
    pub archive_dir: PathBuf,
    pub records_dir: PathBuf,
    pub index_file: PathBuf,
    pub images_dir: PathBuf,
    pub pages_dir: Option<PathBuf>,
    pub page_template: Option<PathBuf>,
}

impl Default for Paths {
    fn default() -> Self {
        Paths {
            intake_dir: PathBuf::from("blog-drafts/new"),
            archive_dir: PathBuf::from("blog-drafts/processed"),
            records_dir: PathBuf::from("blog-data"),
            index_file: PathBuf::from("blog-index.json"),
            images_dir: PathBuf::from("images/blog"),
            pages_dir: None,
            page_template: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Publish {
    pub images_url_root: String,
    pub content_mode: ContentMode,
    pub site_url: String,
    pub site_name: String,
    pub pages_url_root: String,
}

impl Default for Publish {
    fn default() -> Self {
        Publish {
            images_url_root: "/images/blog".to_string(),
            content_mode: ContentMode::Blocks,
            site_url: String::new(),
            site_name: String::new(),
            pages_url_root: "/blog".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Defaults {
    /// Markdown files in the intake directory that are not drafts.
    pub ignore: Vec<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Defaults {
            ignore: vec!["README.md".to_string(), "blog-post-template.md".to_string()],
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct Log {
    pub level: LogLevel,
    #[serde(default)]
    pub log_to_console: bool,
    pub location: Option<PathBuf>,
}

/// Ordered from least to most verbose.
#[derive(Deserialize, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Critical = 0,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub paths: Paths,
    pub publish: Publish,
    pub defaults: Defaults,
    pub log: Option<Log>,
}

fn parse_path(path: PathBuf) -> PathBuf {
    let Some(str_path) = path.to_str() else {
        return path;
    };
    if !str_path.starts_with("${exe_dir}") {
        return path;
    }

    match env::current_exe().ok().as_deref().and_then(Path::parent) {
        Some(exe_dir) => PathBuf::from(str_path.replace("${exe_dir}", &exe_dir.to_string_lossy())),
        None => path,
    }
}

impl Config {
    fn resolve_paths(mut self) -> Config {
        let paths = self.paths;
        self.paths = Paths {
            intake_dir: parse_path(paths.intake_dir),
            archive_dir: parse_path(paths.archive_dir),
            records_dir: parse_path(paths.records_dir),
            index_file: parse_path(paths.index_file),
            images_dir: parse_path(paths.images_dir),
            pages_dir: paths.pages_dir.map(parse_path),
            page_template: paths.page_template.map(parse_path),
        };
        if let Some(mut log) = self.log.take() {
            log.location = log.location.map(parse_path);
            self.log = Some(log);
        }
        self
    }
}

pub fn parse_config(cfg_content: &str) -> io::Result<Config> {
    match toml::from_str::<Config>(cfg_content) {
        Ok(cfg) => Ok(cfg.resolve_paths()),
        Err(e) => Err(io::Error::new(
            ErrorKind::InvalidData, format!("Error parsing configuration file: {}", e))),
    }
}

pub fn read_config(cfg_path: &Path) -> io::Result<Config> {
    let cfg_content = match fs::read_to_string(cfg_path) {
        Ok(content) => content,
        Err(e) => return Err(io::Error::new(e.kind(), format!("Error opening configuration file {}: {}", cfg_path.display(), e))),
    };

    parse_config(&cfg_content)
}
