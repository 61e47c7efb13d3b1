use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

use crate::Translator;
use crate::data::DataAttachment;
use crate::debounce::Debouncer;
use crate::providers::{Provider, ToolSpec};
use crate::translations::render_handwriting_prompt;

const TOOL_NAME: &str = "deliver_candidates";
pub const MAX_CANDIDATES: usize = 5;
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(800);

#[derive(Debug, Default, Deserialize)]
struct CandidateResponse {
    #[serde(default)]
    candidates: Vec<String>,
}

/// Best-effort: any failure yields an empty list.
pub async fn recognize_handwriting<P: Provider + Clone>(
    translator: &Translator<P>,
    image: DataAttachment,
) -> Vec<String> {
    match request_candidates(translator, image).await {
        Ok(candidates) => candidates,
        Err(err) => {
            warn!("handwriting recognition failed: {:#}", err);
            Vec::new()
        }
    }
}

async fn request_candidates<P: Provider + Clone>(
    translator: &Translator<P>,
    image: DataAttachment,
) -> Result<Vec<String>> {
    let prompt = render_handwriting_prompt(TOOL_NAME, MAX_CANDIDATES)?;
    let response = translator
        .call_tool_with_data(
            tool_spec(),
            prompt,
            "Which characters are drawn here?".to_string(),
            Some(image),
        )
        .await?;
    let parsed: CandidateResponse = serde_json::from_value(response.args)
        .with_context(|| "failed to parse handwriting candidates")?;
    Ok(normalize_candidates(parsed.candidates))
}

fn tool_spec() -> ToolSpec {
    ToolSpec {
        name: TOOL_NAME.to_string(),
        description: "Return the most likely handwritten characters, best first.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "candidates": {
                    "type": "array",
                    "items": { "type": "string" },
                    "maxItems": MAX_CANDIDATES
                }
            },
            "required": ["candidates"]
        }),
    }
}

fn normalize_candidates(candidates: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for candidate in candidates {
        let trimmed = candidate.trim();
        if trimmed.is_empty() || out.iter().any(|existing| existing == trimmed) {
            continue;
        }
        out.push(trimmed.to_string());
        if out.len() >= MAX_CANDIDATES {
            break;
        }
    }
    out
}

/// Drawing-surface side of recognition: every completed stroke reschedules
/// a recognition of the latest snapshot, and only the newest result is kept.
pub struct HandwritingPad<P: Provider + Clone + 'static> {
    translator: Translator<P>,
    debouncer: Debouncer,
    generation: Arc<AtomicU64>,
    candidates: Arc<Mutex<Vec<String>>>,
}

impl<P: Provider + Clone + 'static> HandwritingPad<P> {
    pub fn new(translator: Translator<P>, delay: Duration) -> Self {
        Self {
            translator,
            debouncer: Debouncer::new(delay),
            generation: Arc::new(AtomicU64::new(0)),
            candidates: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn stroke_completed(&mut self, snapshot: DataAttachment) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = self.generation.clone();
        let slot = self.candidates.clone();
        let translator = self.translator.clone();
        self.debouncer.schedule(async move {
            let found = recognize_handwriting(&translator, snapshot).await;
            if current.load(Ordering::SeqCst) != generation {
                debug!("discarding superseded handwriting result");
                return;
            }
            if let Ok(mut slot) = slot.lock() {
                *slot = found;
            }
        });
    }

    pub fn candidates(&self) -> Vec<String> {
        self.candidates
            .lock()
            .map(|slot| slot.clone())
            .unwrap_or_default()
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Cancels pending recognition and forgets the candidates.
    pub fn clear(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.debouncer.cancel();
        if let Ok(mut slot) = self.candidates.lock() {
            slot.clear();
        }
    }
}
