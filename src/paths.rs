use std::path::{Path, PathBuf};

const BASE_DIR_ENV: &str = "RUBY_TRANSLATOR_DIR";
const BASE_DIR_NAME: &str = ".ruby-translator";

/// Directory holding user settings files.
pub(crate) fn settings_dir() -> Option<PathBuf> {
    if let Some(dir) = base_dir_override() {
        return Some(dir);
    }
    home_join(BASE_DIR_NAME)
}

/// Directory holding the persisted cache and history blobs.
pub(crate) fn data_dir() -> PathBuf {
    if let Some(dir) = base_dir_override() {
        return dir.join(".cache");
    }
    home_join(BASE_DIR_NAME)
        .map(|dir| dir.join(".cache"))
        .unwrap_or_else(|| PathBuf::from(BASE_DIR_NAME).join(".cache"))
}

fn base_dir_override() -> Option<PathBuf> {
    std::env::var(BASE_DIR_ENV)
        .ok()
        .and_then(|value| normalize_dir(&value))
}

fn home_join(suffix: &str) -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(suffix))
        }
    })
}

fn normalize_dir(value: &str) -> Option<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(PathBuf::from(expand_tilde(trimmed)))
}

fn expand_tilde(value: &str) -> String {
    if value == "~" || value.starts_with("~/") {
        if let Ok(home) = std::env::var("HOME") {
            let home = home.trim();
            if home.is_empty() {
                return value.to_string();
            }
            if value == "~" {
                return home.to_string();
            }
            return format!("{}{}", home, &value[1..]);
        }
    }
    value.to_string()
}
