use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tera::{Context as TeraContext, Tera};

use crate::languages::{LangCode, TargetLanguages};
use crate::providers::ToolSpec;
use crate::segments::{self, PhoneticSegment, RubyStyle};

pub const TOOL_NAME: &str = "deliver_translation";

const SYSTEM_PROMPT: &str = include_str!("prompts/system_prompt.tera");
const HANDWRITING_PROMPT: &str = include_str!("prompts/handwriting_prompt.tera");

/// Translations keyed by language. Only the requested languages are
/// present; the others stay `None` and are not serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    pub detected_language: LangCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jp: Option<Vec<PhoneticSegment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zh: Option<Vec<PhoneticSegment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vi: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LangText<'a> {
    Plain(&'a str),
    Segments(&'a [PhoneticSegment]),
}

impl TranslationResult {
    pub fn get(&self, code: LangCode) -> Option<LangText<'_>> {
        match code {
            LangCode::En => self.en.as_deref().map(LangText::Plain),
            LangCode::Mm => self.mm.as_deref().map(LangText::Plain),
            LangCode::Vi => self.vi.as_deref().map(LangText::Plain),
            LangCode::Jp => self.jp.as_deref().map(LangText::Segments),
            LangCode::Zh => self.zh.as_deref().map(LangText::Segments),
        }
    }

    pub fn languages(&self) -> Vec<LangCode> {
        LangCode::ALL
            .into_iter()
            .filter(|code| self.get(*code).is_some())
            .collect()
    }

    pub fn render(&self, code: LangCode, style: RubyStyle) -> Option<String> {
        self.get(code).map(|text| match text {
            LangText::Plain(value) => value.to_string(),
            LangText::Segments(list) => segments::render(list, style),
        })
    }

    /// Removes bracketed readings that leaked into segment text.
    pub fn cleaned(mut self) -> Self {
        self.jp = self.jp.map(segments::strip_reading_artifacts);
        self.zh = self.zh.map(segments::strip_reading_artifacts);
        self
    }
}

pub fn tool_spec(tool_name: &str, targets: &TargetLanguages) -> ToolSpec {
    let segment_list = json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "text": {"type": "string"},
                "ruby": {"type": "string"}
            },
            "required": ["text"]
        }
    });
    let mut properties = serde_json::Map::new();
    properties.insert(
        "detectedLanguage".to_string(),
        json!({
            "type": "string",
            "enum": LangCode::ALL.iter().map(|code| code.as_str()).collect::<Vec<_>>()
        }),
    );
    for code in targets.codes() {
        let schema = if code.reading().is_some() {
            segment_list.clone()
        } else {
            json!({"type": "string"})
        };
        properties.insert(code.as_str().to_string(), schema);
    }

    ToolSpec {
        name: tool_name.to_string(),
        description: "Return the translations for every requested language.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": Value::Object(properties),
            "required": ["detectedLanguage"]
        }),
    }
}

pub fn render_system_prompt(targets: &TargetLanguages, tool_name: &str) -> Result<String> {
    let mut context = TeraContext::new();
    let names = targets
        .codes()
        .iter()
        .map(|code| format!("{} ({})", code.display_name(), code.as_str()))
        .collect::<Vec<_>>();
    let codes = targets
        .codes()
        .iter()
        .map(|code| code.as_str())
        .collect::<Vec<_>>();
    let rules = targets
        .codes()
        .iter()
        .map(|code| language_rule(*code))
        .collect::<Vec<_>>();
    context.insert("targets", &names.join(", "));
    context.insert("codes", &codes.join(", "));
    context.insert("rules", &rules);
    context.insert("tool_name", tool_name);

    render_template(SYSTEM_PROMPT, &context).with_context(|| "failed to render system prompt")
}

pub(crate) fn render_handwriting_prompt(tool_name: &str, max_candidates: usize) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("tool_name", tool_name);
    context.insert("max_candidates", &max_candidates);
    render_template(HANDWRITING_PROMPT, &context)
        .with_context(|| "failed to render handwriting prompt")
}

fn render_template(template: &str, context: &TeraContext) -> Result<String> {
    let rendered = Tera::one_off(template, context, false)?;
    Ok(rendered.trim().to_string())
}

fn language_rule(code: LangCode) -> &'static str {
    match code {
        LangCode::En => "English (en): a natural, fluent translation as a plain string.",
        LangCode::Jp => {
            "Japanese (jp): an ordered array of segments covering the whole sentence. Give every segment containing Kanji its furigana in hiragana as ruby; kana-only segments omit ruby."
        }
        LangCode::Zh => {
            "Traditional Chinese (zh): an ordered array of segments in Traditional characters, each with its Hanyu Pinyin with tone marks as ruby. Use vocabulary idiomatic in Chinese and never reuse Japanese-coined words (Wasei-Kango), even where the Han characters are shared."
        }
        LangCode::Mm => "Myanmar (mm): a plain string written in correct Myanmar script.",
        LangCode::Vi => {
            "Vietnamese (vi): a plain string with every diacritic and tone mark correct."
        }
    }
}

/// Decodes the model's tool arguments, keeping only the requested
/// languages. Any shape problem is an error.
pub fn parse_tool_args(value: Value, targets: &TargetLanguages) -> Result<TranslationResult> {
    let args: ToolArgs =
        serde_json::from_value(value).with_context(|| "malformed translation response")?;
    let detected_language = args
        .detected_language
        .parse::<LangCode>()
        .with_context(|| "invalid detectedLanguage in translation response")?;

    let result = TranslationResult {
        detected_language,
        en: keep_if(targets, LangCode::En, args.en),
        jp: keep_if(targets, LangCode::Jp, args.jp),
        zh: keep_if(targets, LangCode::Zh, args.zh),
        mm: keep_if(targets, LangCode::Mm, args.mm),
        vi: keep_if(targets, LangCode::Vi, args.vi),
    };
    validate_result(&result, targets)?;
    Ok(result)
}

fn keep_if<T>(targets: &TargetLanguages, code: LangCode, value: Option<T>) -> Option<T> {
    if targets.contains(code) { value } else { None }
}

fn validate_result(result: &TranslationResult, targets: &TargetLanguages) -> Result<()> {
    for code in targets.codes() {
        match result.get(*code) {
            None => {
                return Err(anyhow!(
                    "translation response is missing requested language '{}'",
                    code
                ));
            }
            Some(LangText::Plain(value)) if value.trim().is_empty() => {
                return Err(anyhow!("translation for '{}' is empty", code));
            }
            Some(LangText::Segments(list))
                if list.iter().all(|segment| segment.text.trim().is_empty()) =>
            {
                return Err(anyhow!("translation for '{}' has no segments", code));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolArgs {
    detected_language: String,
    #[serde(default)]
    en: Option<String>,
    #[serde(default)]
    jp: Option<Vec<PhoneticSegment>>,
    #[serde(default)]
    zh: Option<Vec<PhoneticSegment>>,
    #[serde(default)]
    mm: Option<String>,
    #[serde(default)]
    vi: Option<String>,
}
