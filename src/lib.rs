use anyhow::{Result, anyhow};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

pub mod cache;
pub mod data;
pub mod debounce;
pub mod error;
pub mod handwriting;
pub mod history;
pub mod languages;
pub mod logging;
mod paths;
pub mod providers;
pub mod segments;
pub mod settings;
pub mod store;
pub mod translations;
mod translator;

pub use cache::{ResponseCache, cache_key};
pub use error::{ErrorKind, TranslateError};
pub use history::{HistoryItem, HistoryLog};
pub use languages::{LangCode, TargetLanguages};
pub use providers::{Gemini, Provider};
pub use segments::{PhoneticSegment, RubyStyle};
pub use translations::TranslationResult;
pub use translator::{TranslationOutcome, Translator};

use data::DataAttachment;
use handwriting::{DEFAULT_DEBOUNCE, HandwritingPad};
use store::{BlobStore, FileStore};

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub lang: Option<String>,
    pub model: Option<String>,
    pub key: Option<String>,
    pub html: bool,
    pub settings_path: Option<String>,
    pub show_histories: bool,
    pub delete_history: Option<String>,
    /// Already confirmed by the caller.
    pub clear_histories: bool,
    pub handwriting: Option<String>,
}

/// One translator with its cache and history, created once per process and
/// shared by every request of that process.
pub struct Session<P: Provider + Clone> {
    translator: Translator<P>,
    cache: ResponseCache,
    history: HistoryLog,
    targets: TargetLanguages,
    ruby_style: RubyStyle,
    debounce: Duration,
}

impl Session<Gemini> {
    pub fn open(config: &Config) -> Result<Self> {
        let settings = settings::load_settings(config.settings_path.as_deref().map(Path::new))?;
        let targets = match config.lang.as_deref() {
            Some(list) => TargetLanguages::parse_list(list)?,
            None => settings.languages.clone(),
        };
        let ruby_style = if config.html {
            RubyStyle::Html
        } else {
            settings.ruby_style
        };
        let model = config.model.clone().or(settings.model.clone());
        let mut provider = Gemini::new(providers::resolve_key(config.key.as_deref()));
        if let Some(model) = model {
            provider = provider.with_model(model);
        }
        let store: Arc<dyn BlobStore> = Arc::new(FileStore::new(paths::data_dir()));
        Ok(Session::new(Translator::new(provider), store, targets, ruby_style)
            .with_debounce(settings.debounce))
    }
}

impl<P: Provider + Clone> Session<P> {
    pub fn new(
        translator: Translator<P>,
        store: Arc<dyn BlobStore>,
        targets: TargetLanguages,
        ruby_style: RubyStyle,
    ) -> Self {
        Self {
            translator,
            cache: ResponseCache::load(store.clone()),
            history: HistoryLog::load(store),
            targets,
            ruby_style,
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn targets(&self) -> &TargetLanguages {
        &self.targets
    }

    pub fn set_targets(&mut self, targets: TargetLanguages) {
        self.targets = targets;
    }

    pub fn ruby_style(&self) -> RubyStyle {
        self.ruby_style
    }

    pub fn set_ruby_style(&mut self, style: RubyStyle) {
        self.ruby_style = style;
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Translates into the current targets and records the result in
    /// history.
    pub async fn translate(&mut self, text: &str) -> Result<TranslationOutcome, TranslateError> {
        let outcome = self
            .translator
            .translate_and_analyze(&mut self.cache, text, &self.targets)
            .await?;
        self.history
            .append(HistoryItem::new(text.trim(), outcome.result.clone()));
        Ok(outcome)
    }

    pub async fn recognize(&self, image: DataAttachment) -> Vec<String> {
        handwriting::recognize_handwriting(&self.translator, image).await
    }

    /// A drawing pad sharing this session's provider, debounced by the
    /// configured delay.
    pub fn handwriting_pad(&self) -> HandwritingPad<P>
    where
        P: 'static,
    {
        HandwritingPad::new(self.translator.clone(), self.debounce)
    }

    pub fn delete_history(&mut self, id: &str) -> bool {
        self.history.remove(id)
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn format_outcome(&self, outcome: &TranslationOutcome) -> String {
        format_outcome(outcome, &self.targets, self.ruby_style)
    }

    pub fn format_histories(&self) -> String {
        format_histories(self.history.items(), self.ruby_style)
    }
}

pub async fn run(config: Config, input: Option<String>) -> Result<String> {
    let mut session = Session::open(&config)?;
    dispatch(&mut session, &config, input).await
}

async fn dispatch<P: Provider + Clone>(
    session: &mut Session<P>,
    config: &Config,
    input: Option<String>,
) -> Result<String> {
    if config.show_histories {
        return Ok(session.format_histories());
    }
    if let Some(id) = config.delete_history.as_deref() {
        if session.delete_history(id.trim()) {
            return Ok(format!("deleted {}", id.trim()));
        }
        return Err(anyhow!("history entry '{}' not found", id.trim()));
    }
    if config.clear_histories {
        session.clear_history();
        return Ok("history cleared".to_string());
    }
    if let Some(source) = config.handwriting.as_deref() {
        let image = handwriting_image(source, input.as_deref())?;
        let candidates = session.recognize(image).await;
        if candidates.is_empty() {
            return Ok("no candidates".to_string());
        }
        return Ok(candidates.join("\n"));
    }

    let input = input.unwrap_or_default();
    let input = input.trim();
    if input.is_empty() {
        return Err(anyhow!("stdin is empty"));
    }
    let outcome = session.translate(input).await.map_err(into_report)?;
    Ok(session.format_outcome(&outcome))
}

/// `--handwriting` takes a `data:` URL, `-` for a data URL on stdin, or an
/// image file path.
fn handwriting_image(source: &str, stdin: Option<&str>) -> Result<DataAttachment> {
    let source = source.trim();
    if source == "-" {
        let payload = stdin.unwrap_or_default();
        if payload.trim().is_empty() {
            return Err(anyhow!("stdin is empty"));
        }
        return DataAttachment::from_data_url(payload);
    }
    if source.starts_with("data:") {
        return DataAttachment::from_data_url(source);
    }
    DataAttachment::load_image(Path::new(source))
}

/// Turns a translation failure into the message shown to the user.
pub fn into_report(err: TranslateError) -> anyhow::Error {
    anyhow!("[{}] {}", err.kind().as_str(), err.user_message())
}

pub fn format_outcome(
    outcome: &TranslationOutcome,
    targets: &TargetLanguages,
    style: RubyStyle,
) -> String {
    let mut lines = format_results(&outcome.result, targets.codes(), style);
    let mut meta = format!("detected: {}", outcome.result.detected_language);
    if outcome.from_cache {
        meta.push_str(" (cached)");
    }
    lines.push(meta);
    lines.join("\n")
}

fn format_results(result: &TranslationResult, order: &[LangCode], style: RubyStyle) -> Vec<String> {
    order
        .iter()
        .filter_map(|code| {
            result
                .render(*code, style)
                .map(|text| format!("{}: {}", code.display_name(), text))
        })
        .collect()
}

fn format_histories(items: &[HistoryItem], style: RubyStyle) -> String {
    if items.is_empty() {
        return "no histories".to_string();
    }
    items
        .iter()
        .map(|item| {
            let mut lines = vec![
                format!(
                    "[{}] {} ({})",
                    item.id,
                    format_timestamp(item.timestamp),
                    item.source_lang
                ),
                format!("  {}", item.original_text),
            ];
            lines.extend(
                format_results(&item.results, &item.results.languages(), style)
                    .into_iter()
                    .map(|line| format!("  {}", line)),
            );
            lines.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_timestamp(millis: u64) -> String {
    let nanos = i128::from(millis) * 1_000_000;
    let Ok(datetime) = OffsetDateTime::from_unix_timestamp_nanos(nanos) else {
        return millis.to_string();
    };
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    datetime
        .to_offset(offset)
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .unwrap_or_else(|_| millis.to_string())
}
