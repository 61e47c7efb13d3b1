use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Parenthesised runs, ASCII or full-width, that the model sometimes leaves
/// inside the base text (`日本語(にほんご)`).
static READING_ARTIFACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[(（][^()（）]*[)）]").expect("valid reading regex"));

/// One run of base glyphs with an optional phonetic reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneticSegment {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ruby: Option<String>,
}

impl PhoneticSegment {
    pub fn new(text: impl Into<String>, ruby: Option<&str>) -> Self {
        Self {
            text: text.into(),
            ruby: ruby.map(|value| value.to_string()),
        }
    }

    /// Reading with surrounding whitespace removed; `None` when blank.
    pub fn reading(&self) -> Option<&str> {
        self.ruby
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RubyStyle {
    #[default]
    Plain,
    Html,
}

/// Removes bracketed readings from `text`; `ruby` is left as is.
pub fn strip_reading_artifacts(segments: Vec<PhoneticSegment>) -> Vec<PhoneticSegment> {
    segments
        .into_iter()
        .map(|segment| PhoneticSegment {
            text: strip_brackets(&segment.text),
            ruby: segment.ruby,
        })
        .collect()
}

/// The pattern only matches innermost pairs, so nested runs need repeated
/// passes until nothing changes.
fn strip_brackets(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = READING_ARTIFACT.replace_all(&current, "").into_owned();
        if next == current {
            return next;
        }
        current = next;
    }
}

/// Base text of the utterance without any annotation.
pub fn base_text(segments: &[PhoneticSegment]) -> String {
    segments.iter().map(|segment| segment.text.as_str()).collect()
}

pub fn render(segments: &[PhoneticSegment], style: RubyStyle) -> String {
    match style {
        RubyStyle::Plain => render_plain(segments),
        RubyStyle::Html => render_html(segments),
    }
}

/// Terminal rendering: `工業《こうぎょう》は`.
pub fn render_plain(segments: &[PhoneticSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        out.push_str(&segment.text);
        if let Some(reading) = segment.reading()
            && reading != segment.text
        {
            out.push('《');
            out.push_str(reading);
            out.push('》');
        }
    }
    out
}

/// `<ruby>` markup with the reading in `<rt>`; segments without a reading
/// are emitted as escaped text.
pub fn render_html(segments: &[PhoneticSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment.reading() {
            Some(reading) if reading != segment.text => {
                out.push_str("<ruby>");
                out.push_str(&escape_html(&segment.text));
                out.push_str("<rt>");
                out.push_str(&escape_html(reading));
                out.push_str("</rt></ruby>");
            }
            _ => out.push_str(&escape_html(&segment.text)),
        }
    }
    out
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<PhoneticSegment> {
        vec![
            PhoneticSegment::new("工業", Some("こうぎょう")),
            PhoneticSegment::new("は", None),
            PhoneticSegment::new("大切", Some("たいせつ")),
            PhoneticSegment::new("です", Some("")),
        ]
    }

    #[test]
    fn strips_ascii_and_fullwidth_readings() {
        let cleaned = strip_reading_artifacts(vec![
            PhoneticSegment::new("日本語(にほんご)", Some("にほんご")),
            PhoneticSegment::new("漢字（かんじ）", Some("かんじ")),
            PhoneticSegment::new("中文 (zhōngwén)", Some("zhōngwén")),
        ]);
        assert_eq!(cleaned[0], PhoneticSegment::new("日本語", Some("にほんご")));
        assert_eq!(cleaned[1], PhoneticSegment::new("漢字", Some("かんじ")));
        assert_eq!(cleaned[2], PhoneticSegment::new("中文 ", Some("zhōngwén")));
    }

    #[test]
    fn strips_nested_readings() {
        let cleaned = strip_reading_artifacts(vec![
            PhoneticSegment::new("工業(こう(ぎょう))", Some("こうぎょう")),
            PhoneticSegment::new("日本語（にほんご(nihongo)）", Some("にほんご")),
        ]);
        assert_eq!(cleaned[0].text, "工業");
        assert_eq!(cleaned[1].text, "日本語");
    }

    #[test]
    fn base_text_concatenates() {
        assert_eq!(base_text(&sample()), "工業は大切です");
    }

    #[test]
    fn plain_rendering_skips_blank_readings() {
        assert_eq!(render_plain(&sample()), "工業《こうぎょう》は大切《たいせつ》です");
    }

    #[test]
    fn html_rendering_snapshot() {
        let mut segments = sample();
        segments.push(PhoneticSegment::new("<&>", None));
        insta::assert_snapshot!(render_html(&segments));
    }

    #[test]
    fn missing_ruby_is_not_serialized() {
        let json = serde_json::to_string(&PhoneticSegment::new("は", None)).unwrap();
        assert_eq!(json, r#"{"text":"は"}"#);
    }
}
