use std::env;
use std::io;
use std::process::{Command, Stdio};

use rand::Rng;
use rand::seq::IndexedRandom;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::videos::is_video_url;

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("no valid video URLs found")]
    NoValidUrls,
    #[error("browser command is empty")]
    EmptyCommand,
    #[error("browser command '{program}' exited with {status}")]
    OpenerFailed { program: String, status: String },
}

impl From<VideoError> for io::Error {
    fn from(err: VideoError) -> Self {
        let kind = match err {
            VideoError::NoValidUrls => io::ErrorKind::NotFound,
            VideoError::EmptyCommand => io::ErrorKind::InvalidInput,
            VideoError::OpenerFailed { .. } => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

pub trait BrowserOpener: Send + Sync {
    fn open_new_tab(&self, url: &str) -> io::Result<()>;
}

const BROWSER_LIST_SEPARATOR: char = if cfg!(windows) { ';' } else { ':' };

#[derive(Debug, Clone, Default)]
pub struct SystemBrowser {
    commands: Vec<String>,
}

impl SystemBrowser {
    pub fn new(command: Option<String>) -> Self {
        Self {
            commands: command
                .filter(|value| !value.trim().is_empty())
                .into_iter()
                .collect(),
        }
    }

    pub fn from_env(command: Option<String>) -> Self {
        match command {
            Some(command) => Self::new(Some(command)),
            None => Self {
                commands: env::var("BROWSER")
                    .map(|value| parse_browser_list(&value))
                    .unwrap_or_default(),
            },
        }
    }

    fn launch(command: &mut Command) -> io::Result<()> {
        debug!(?command, "launching browser");
        let status = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        if !status.success() {
            return Err(VideoError::OpenerFailed {
                program: command.get_program().to_string_lossy().into_owned(),
                status: status.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

// `$BROWSER` holds alternatives separated like PATH entries, tried in order.
pub fn parse_browser_list(value: &str) -> Vec<String> {
    value
        .split(BROWSER_LIST_SEPARATOR)
        .map(str::trim)
        .filter(|command| !command.is_empty())
        .map(str::to_string)
        .collect()
}

impl BrowserOpener for SystemBrowser {
    fn open_new_tab(&self, url: &str) -> io::Result<()> {
        if self.commands.is_empty() {
            return Self::launch(&mut platform_default_command(url));
        }

        let mut last_err = None;
        for custom in &self.commands {
            let (program, args) = expand_browser_command(custom, url)?;
            let mut command = Command::new(program);
            command.args(args);
            match Self::launch(&mut command) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    warn!(command = %custom, error = %err, "browser command failed, trying next");
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| VideoError::EmptyCommand.into()))
    }
}

pub fn expand_browser_command(command: &str, url: &str) -> io::Result<(String, Vec<String>)> {
    let mut parts = command.split_whitespace().map(str::to_string);
    let program = parts.next().ok_or(VideoError::EmptyCommand)?;
    let mut args = parts.collect::<Vec<_>>();

    let mut substituted = false;
    for arg in &mut args {
        if arg.contains("%s") {
            *arg = arg.replace("%s", url);
            substituted = true;
        }
    }
    if !substituted {
        args.push(url.to_string());
    }
    Ok((program, args))
}

#[cfg(target_os = "macos")]
fn platform_default_command(url: &str) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(url);
    cmd
}

#[cfg(target_os = "windows")]
fn platform_default_command(url: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", "start", "", url]);
    cmd
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn platform_default_command(url: &str) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(url);
    cmd
}

pub fn open_random_video<R>(
    urls: &[String],
    opener: &dyn BrowserOpener,
    rng: &mut R,
) -> io::Result<String>
where
    R: Rng + ?Sized,
{
    let valid = urls
        .iter()
        .filter(|url| is_video_url(url))
        .collect::<Vec<_>>();
    let chosen = valid.choose(rng).ok_or(VideoError::NoValidUrls)?;
    opener.open_new_tab(chosen)?;
    info!(url = %chosen, "opened video");
    Ok((*chosen).clone())
}
