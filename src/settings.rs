use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::handwriting::DEFAULT_DEBOUNCE;
use crate::languages::TargetLanguages;
use crate::paths;
use crate::segments::RubyStyle;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub languages: TargetLanguages,
    pub model: Option<String>,
    pub debounce: Duration,
    pub ruby_style: RubyStyle,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            languages: TargetLanguages::default(),
            model: None,
            debounce: DEFAULT_DEBOUNCE,
            ruby_style: RubyStyle::Plain,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    system: Option<SystemSettings>,
    model: Option<ModelSettings>,
    handwriting: Option<HandwritingSettings>,
    output: Option<OutputSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct SystemSettings {
    languages: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct ModelSettings {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct HandwritingSettings {
    debounce_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct OutputSettings {
    ruby: Option<String>,
}

/// Built-in defaults, then `settings.toml`/`settings.local.toml` in the
/// working directory and the base dir, then `extra_path`.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile =
        toml::from_str(DEFAULT_SETTINGS_TOML).with_context(|| "failed to parse default settings")?;
    settings.merge(defaults)?;

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(dir) = paths::settings_dir() {
        ordered_paths.push(dir.join("settings.toml"));
        ordered_paths.push(dir.join("settings.local.toml"));
    }
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            merge_file(&mut settings, &path)?;
        }
    }
    Ok(settings)
}

fn merge_file(settings: &mut Settings, path: &Path) -> Result<()> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings: {}", path.display()))?;
    let parsed: SettingsFile = toml::from_str(&content)
        .with_context(|| format!("failed to parse settings: {}", path.display()))?;
    settings
        .merge(parsed)
        .with_context(|| format!("invalid settings: {}", path.display()))
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) -> Result<()> {
        if let Some(system) = incoming.system {
            if let Some(languages) = system.languages {
                self.languages = TargetLanguages::parse_list(&languages.join(","))?;
            }
        }
        if let Some(model) = incoming.model {
            if let Some(name) = model.name {
                if !name.trim().is_empty() {
                    self.model = Some(name.trim().to_string());
                }
            }
        }
        if let Some(handwriting) = incoming.handwriting {
            if let Some(ms) = handwriting.debounce_ms {
                if ms > 0 {
                    self.debounce = Duration::from_millis(ms);
                }
            }
        }
        if let Some(output) = incoming.output {
            if let Some(ruby) = output.ruby {
                self.ruby_style = parse_ruby_style(&ruby)?;
            }
        }
        Ok(())
    }
}

fn parse_ruby_style(value: &str) -> Result<RubyStyle> {
    match value.trim().to_lowercase().as_str() {
        "plain" | "text" => Ok(RubyStyle::Plain),
        "html" => Ok(RubyStyle::Html),
        other => Err(anyhow!(
            "unsupported ruby output '{}' (expected plain or html)",
            other
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::LangCode;
    use tempfile::tempdir;

    #[test]
    fn defaults_come_from_embedded_file() {
        let mut settings = Settings::default();
        settings
            .merge(toml::from_str(DEFAULT_SETTINGS_TOML).unwrap())
            .unwrap();
        assert_eq!(settings.languages.codes(), &[LangCode::En, LangCode::Jp]);
        assert_eq!(settings.model.as_deref(), Some("gemini-2.5-flash"));
        assert_eq!(settings.debounce, Duration::from_millis(800));
        assert_eq!(settings.ruby_style, RubyStyle::Plain);
    }

    #[test]
    fn later_files_override_earlier_ones() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("extra.toml");
        fs::write(
            &path,
            "[system]\nlanguages = [\"zh\", \"vi\", \"en\"]\n[output]\nruby = \"html\"\n",
        )
        .unwrap();
        let mut settings = Settings::default();
        merge_file(&mut settings, &path).unwrap();
        assert_eq!(
            settings.languages.codes(),
            &[LangCode::Zh, LangCode::Vi, LangCode::En]
        );
        assert_eq!(settings.ruby_style, RubyStyle::Html);
        assert_eq!(settings.debounce, DEFAULT_DEBOUNCE);
    }

    #[test]
    fn invalid_language_list_is_rejected() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[system]\nlanguages = [\"en\"]\n").unwrap();
        assert!(merge_file(&mut Settings::default(), &path).is_err());
    }

    #[test]
    fn missing_extra_file_is_an_error() {
        let dir = tempdir().expect("tempdir");
        assert!(load_settings(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
