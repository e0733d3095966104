//! Console configuration.
//!
//! Read from `<config dir>/recall/config.toml`, e.g. `~/.config/recall/config.toml`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where the command history is loaded from and saved to.
    pub history_file: Option<PathBuf>,
    pub history_size: usize,
    pub mark_ring_size: usize,
    /// Directories put on the load path at startup.
    pub load_path: Vec<PathBuf>,
    /// Percentage step for `volume up` / `volume down`.
    pub volume_step: u8,
    /// Default directory for `screenshot` without a file name.
    pub screenshot_dir: Option<PathBuf>,
    pub utilities: Utilities,
}

/// Argument templates for the external tools. `{}` is replaced with the
/// command's normalized argument.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Utilities {
    pub volume: Vec<String>,
    pub transparency: Vec<String>,
    pub lock: Vec<String>,
    pub screenshot: Vec<String>,
    pub pdf: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_file: None,
            history_size: 500,
            mark_ring_size: 16,
            load_path: Vec::new(),
            volume_step: 5,
            screenshot_dir: None,
            utilities: Utilities::default(),
        }
    }
}

impl Default for Utilities {
    fn default() -> Self {
        fn argv(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }
        Self {
            volume: argv(&["amixer", "-q", "set", "Master", "{}"]),
            transparency: argv(&["transset", "--actual", "{}"]),
            lock: argv(&["slock"]),
            screenshot: argv(&["scrot", "--overwrite", "{}"]),
            pdf: argv(&["libreoffice", "--headless", "--convert-to", "pdf", "{}"]),
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("recall").join("config.toml"))
    }

    /// Loads `explicit` if given, which must exist. Otherwise the default
    /// location is tried and a missing file yields the defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    debug!("no config file, using defaults");
                    Self::default()
                }
            },
        };
        if let Some(histfile) = std::env::var_os("HISTFILE") {
            config.history_file = Some(PathBuf::from(histfile));
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text)?;
        for (name, template) in config.utilities.named() {
            if template.is_empty() {
                anyhow::bail!("utilities.{} must name a program", name);
            }
        }
        if config.volume_step == 0 || config.volume_step > 100 {
            anyhow::bail!("volume_step must be between 1 and 100");
        }
        Ok(config)
    }

    /// Initial load path entries that exist; missing ones are skipped.
    pub fn existing_load_path(&self) -> impl Iterator<Item = &Path> {
        self.load_path.iter().map(PathBuf::as_path).filter(|dir| {
            let ok = dir.is_dir();
            if !ok {
                warn!(dir = %dir.display(), "load_path entry does not exist, skipping");
            }
            ok
        })
    }
}

impl Utilities {
    fn named(&self) -> [(&'static str, &Vec<String>); 5] {
        [
            ("volume", &self.volume),
            ("transparency", &self.transparency),
            ("lock", &self.lock),
            ("screenshot", &self.screenshot),
            ("pdf", &self.pdf),
        ]
    }
}
