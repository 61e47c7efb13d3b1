use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_TARGETS: usize = 2;
pub const MAX_TARGETS: usize = 3;

/// Language codes understood by the translator. The codes are the wire
/// names used in the model schema and in persisted results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LangCode {
    En,
    Jp,
    Zh,
    Mm,
    Vi,
}

/// Kind of phonetic annotation carried by a language's segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    Furigana,
    Pinyin,
}

impl LangCode {
    pub const ALL: [LangCode; 5] = [
        LangCode::En,
        LangCode::Jp,
        LangCode::Zh,
        LangCode::Mm,
        LangCode::Vi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LangCode::En => "en",
            LangCode::Jp => "jp",
            LangCode::Zh => "zh",
            LangCode::Mm => "mm",
            LangCode::Vi => "vi",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            LangCode::En => "English",
            LangCode::Jp => "Japanese",
            LangCode::Zh => "Traditional Chinese",
            LangCode::Mm => "Myanmar",
            LangCode::Vi => "Vietnamese",
        }
    }

    pub fn reading(&self) -> Option<Reading> {
        match self {
            LangCode::Jp => Some(Reading::Furigana),
            LangCode::Zh => Some(Reading::Pinyin),
            _ => None,
        }
    }
}

impl fmt::Display for LangCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LangCode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "en" | "eng" | "english" => Ok(LangCode::En),
            "jp" | "ja" | "jpn" | "japanese" => Ok(LangCode::Jp),
            "zh" | "zh-hant" | "zh-tw" | "zho-hant" | "chinese" => Ok(LangCode::Zh),
            "mm" | "my" | "mya" | "myanmar" | "burmese" => Ok(LangCode::Mm),
            "vi" | "vie" | "vietnamese" => Ok(LangCode::Vi),
            other => Err(anyhow!(
                "unsupported language code '{}' (expected en, jp, zh, mm, vi)",
                other
            )),
        }
    }
}

/// Ordered set of 2 to 3 distinct target languages, kept in selection order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetLanguages(Vec<LangCode>);

impl TargetLanguages {
    pub fn new(codes: Vec<LangCode>) -> Result<Self> {
        let mut seen = Vec::with_capacity(codes.len());
        for code in codes {
            if seen.contains(&code) {
                return Err(anyhow!("target language '{}' selected twice", code));
            }
            seen.push(code);
        }
        if seen.len() < MIN_TARGETS || seen.len() > MAX_TARGETS {
            return Err(anyhow!(
                "select {} to {} target languages (got {})",
                MIN_TARGETS,
                MAX_TARGETS,
                seen.len()
            ));
        }
        Ok(Self(seen))
    }

    /// Parses a comma separated list such as `en,jp`.
    pub fn parse_list(value: &str) -> Result<Self> {
        let codes = value
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(LangCode::from_str)
            .collect::<Result<Vec<_>>>()?;
        Self::new(codes)
    }

    pub fn codes(&self) -> &[LangCode] {
        &self.0
    }

    pub fn contains(&self, code: LangCode) -> bool {
        self.0.contains(&code)
    }

    /// Codes sorted lexicographically and comma joined; independent of
    /// selection order.
    pub fn sorted_csv(&self) -> String {
        let mut codes = self.0.iter().map(|code| code.as_str()).collect::<Vec<_>>();
        codes.sort_unstable();
        codes.join(",")
    }
}

impl Default for TargetLanguages {
    fn default() -> Self {
        Self(vec![LangCode::En, LangCode::Jp])
    }
}

impl fmt::Display for TargetLanguages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes = self.0.iter().map(|code| code.as_str()).collect::<Vec<_>>();
        f.write_str(&codes.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        assert_eq!("ja".parse::<LangCode>().unwrap(), LangCode::Jp);
        assert_eq!(" MY ".parse::<LangCode>().unwrap(), LangCode::Mm);
        assert!("fr".parse::<LangCode>().is_err());
    }

    #[test]
    fn target_set_bounds() {
        assert!(TargetLanguages::parse_list("en").is_err());
        assert!(TargetLanguages::parse_list("en,jp,zh,vi").is_err());
        assert!(TargetLanguages::parse_list("en,en").is_err());
        let targets = TargetLanguages::parse_list("vi, jp ,en").unwrap();
        assert_eq!(targets.codes(), &[LangCode::Vi, LangCode::Jp, LangCode::En]);
        assert_eq!(targets.sorted_csv(), "en,jp,vi");
        assert_eq!(targets.to_string(), "vi,jp,en");
    }
}
