// utilities.rs

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use crate::config::Config;
use crate::error::CommandError;
use crate::process::ProcessRunner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeChange {
    Up,
    Down,
    Mute,
    Set(u8),
}

impl VolumeChange {
    pub fn parse(arg: &str) -> Result<Self, CommandError> {
        match arg {
            "up" | "+" => Ok(Self::Up),
            "down" | "-" => Ok(Self::Down),
            "mute" | "toggle" => Ok(Self::Mute),
            other => parse_percent("volume", other).map(Self::Set),
        }
    }

    /// The mixer argument, in `amixer` syntax.
    fn mixer_arg(self, step: u8) -> String {
        match self {
            Self::Up => format!("{}%+", step),
            Self::Down => format!("{}%-", step),
            Self::Mute => "toggle".to_string(),
            Self::Set(n) => format!("{}%", n),
        }
    }

    fn status(self, step: u8) -> String {
        match self {
            Self::Up => format!("Volume up {}%", step),
            Self::Down => format!("Volume down {}%", step),
            Self::Mute => "Volume mute toggled".to_string(),
            Self::Set(n) => format!("Volume set to {}%", n),
        }
    }
}

fn parse_percent(command: &'static str, arg: &str) -> Result<u8, CommandError> {
    let invalid = |reason: &str| CommandError::InvalidArgument {
        command,
        value: arg.to_string(),
        reason: reason.to_string(),
    };
    let n: u8 = arg
        .trim_end_matches('%')
        .parse()
        .map_err(|_| invalid("expected a percentage"))?;
    if n > 100 {
        return Err(invalid("must be between 0 and 100"));
    }
    Ok(n)
}

/// Fills `{}` in a template. Without an argument, elements that are only
/// `{}` are dropped.
pub fn expand(template: &[String], arg: Option<&str>) -> Option<(String, Vec<String>)> {
    let mut words = template.iter().filter_map(|word| match arg {
        Some(value) => Some(word.replace("{}", value)),
        None if word == "{}" => None,
        None => Some(word.replace("{}", "")),
    });
    let program = words.next()?;
    Some((program, words.collect()))
}

fn run_template(
    runner: &mut dyn ProcessRunner,
    name: &'static str,
    template: &[String],
    arg: Option<&str>,
) -> Result<(), CommandError> {
    let (program, args) = expand(template, arg).ok_or(CommandError::InvalidArgument {
        command: name,
        value: String::new(),
        reason: "no program configured".into(),
    })?;
    info!(utility = name, %program, "running utility");
    runner.invoke(&program, &args)?.check(&program)?;
    Ok(())
}

pub fn volume(runner: &mut dyn ProcessRunner, config: &Config, arg: &str) -> Result<String, CommandError> {
    let change = VolumeChange::parse(arg)?;
    let step = config.volume_step;
    run_template(runner, "volume", &config.utilities.volume, Some(change.mixer_arg(step).as_str()))?;
    Ok(change.status(step))
}

/// `percent` is the opacity, 100 meaning fully opaque.
pub fn transparency(runner: &mut dyn ProcessRunner, config: &Config, percent: &str) -> Result<String, CommandError> {
    let n = parse_percent("transparency", percent)?;
    let opacity = format!("{:.2}", f64::from(n) / 100.0);
    run_template(runner, "transparency", &config.utilities.transparency, Some(opacity.as_str()))?;
    Ok(format!("Opacity set to {}", opacity))
}

pub fn lock(runner: &mut dyn ProcessRunner, config: &Config) -> Result<String, CommandError> {
    run_template(runner, "lock", &config.utilities.lock, None)?;
    Ok("Screen unlocked".to_string())
}

pub fn default_screenshot_path(dir: Option<&Path>, now: DateTime<Local>) -> PathBuf {
    let name = format!("screenshot-{}.png", now.format("%Y%m%d-%H%M%S"));
    match dir {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

pub fn screenshot(
    runner: &mut dyn ProcessRunner,
    config: &Config,
    file: Option<&str>,
) -> Result<String, CommandError> {
    let target = match file {
        Some(f) => PathBuf::from(f),
        None => default_screenshot_path(config.screenshot_dir.as_deref(), Local::now()),
    };
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            return Err(CommandError::DirectoryNotFound(parent.to_path_buf()));
        }
    }
    let target_str = target.to_string_lossy();
    run_template(runner, "screenshot", &config.utilities.screenshot, Some(&*target_str))?;
    Ok(format!("Saved screenshot to {}", target.display()))
}

/// Converts `file` to PDF. The converter writes `<stem>.pdf` into the
/// current directory.
pub fn pdf(runner: &mut dyn ProcessRunner, config: &Config, file: &str) -> Result<String, CommandError> {
    let source = Path::new(file);
    if !source.is_file() {
        return Err(CommandError::FileNotFound(source.to_path_buf()));
    }
    run_template(runner, "pdf", &config.utilities.pdf, Some(file))?;
    let written = source
        .file_stem()
        .map(|stem| PathBuf::from(stem).with_extension("pdf"))
        .unwrap_or_else(|| PathBuf::from("out.pdf"));
    Ok(format!("Wrote {}", written.display()))
}
