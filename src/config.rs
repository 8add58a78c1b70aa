use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::videos::{default_urls, is_video_url};

pub const DEFAULT_VIDEOS_FILE: &str = "videos.txt";
pub const DEFAULT_QUIT_KEYWORD: &str = "quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub videos_file: PathBuf,
    pub default_urls: Vec<String>,
    pub quit_keyword: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            videos_file: PathBuf::from(DEFAULT_VIDEOS_FILE),
            default_urls: default_urls(),
            quit_keyword: DEFAULT_QUIT_KEYWORD.to_string(),
        }
    }
}

pub fn load_app_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read config file {}", path.display()))?;
    parse_app_config_text(&content)
}

pub fn parse_app_config_text(content: &str) -> Result<AppConfig> {
    let raw = serde_json::from_str::<AppConfigFile>(content).map_err(|err| {
        let line = err.line();
        let column = err.column();
        anyhow::anyhow!("invalid JSON at line {line}, column {column}: {err}")
    })?;

    if raw.version != 1 {
        bail!(
            "unsupported config version {}; expected version 1",
            raw.version
        );
    }

    let defaults = AppConfig::default();

    let default_urls = match raw.default_urls {
        Some(urls) => {
            if urls.is_empty() {
                bail!("default_urls must contain at least one URL");
            }
            if let Some(bad) = urls.iter().find(|url| !is_video_url(url.trim())) {
                bail!("default_urls entry '{bad}' is not a video link");
            }
            urls.into_iter().map(|url| url.trim().to_string()).collect()
        }
        None => defaults.default_urls,
    };

    let quit_keyword = match raw.quit_keyword {
        Some(keyword) if keyword.trim().is_empty() => bail!("quit_keyword must not be blank"),
        Some(keyword) => keyword.trim().to_string(),
        None => defaults.quit_keyword,
    };

    Ok(AppConfig {
        videos_file: raw.videos_file.unwrap_or(defaults.videos_file),
        default_urls,
        quit_keyword,
    })
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AppConfigFile {
    version: u32,
    #[serde(default)]
    videos_file: Option<PathBuf>,
    #[serde(default)]
    default_urls: Option<Vec<String>>,
    #[serde(default)]
    quit_keyword: Option<String>,
}
