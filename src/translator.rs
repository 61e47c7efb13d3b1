use tracing::{debug, info};

use crate::cache::{ResponseCache, cache_key};
use crate::data::DataAttachment;
use crate::error::TranslateError;
use crate::languages::TargetLanguages;
use crate::providers::{Provider, ProviderResponse, ToolSpec};
use crate::translations::{self, TOOL_NAME, TranslationResult, tool_spec};

#[derive(Debug, Clone)]
pub struct Translator<P: Provider + Clone> {
    provider: P,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationOutcome {
    pub result: TranslationResult,
    pub from_cache: bool,
    pub model: Option<String>,
}

impl<P: Provider + Clone> Translator<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub async fn call_tool_with_data(
        &self,
        tool: ToolSpec,
        system_prompt: String,
        user_input: String,
        data: Option<DataAttachment>,
    ) -> anyhow::Result<ProviderResponse> {
        let tool_name = tool.name.clone();
        let mut provider = self
            .provider
            .clone()
            .register_tool(tool)
            .append_system_input(system_prompt);
        if let Some(data) = data {
            provider = provider.append_user_data(data);
        }
        provider
            .append_user_input(user_input)
            .call_tool(&tool_name)
            .await
    }

    /// Serves identical normalized requests from `cache`; otherwise asks the
    /// model, cleans the segments and stores the result.
    pub async fn translate_and_analyze(
        &self,
        cache: &mut ResponseCache,
        text: &str,
        targets: &TargetLanguages,
    ) -> Result<TranslationOutcome, TranslateError> {
        if text.trim().is_empty() {
            return Err(TranslateError::Failure("input text is empty".to_string()));
        }
        let key = cache_key(text, targets);
        if let Some(result) = cache.get(&key) {
            debug!("cache hit: {}", key);
            return Ok(TranslationOutcome {
                result: result.clone(),
                from_cache: true,
                model: None,
            });
        }
        debug!("cache miss: {}", key);

        let system_prompt = translations::render_system_prompt(targets, TOOL_NAME)
            .map_err(|err| TranslateError::Failure(format!("{:#}", err)))?;
        let response = self
            .call_tool_with_data(
                tool_spec(TOOL_NAME, targets),
                system_prompt,
                text.to_string(),
                None,
            )
            .await
            .map_err(TranslateError::classify)?;

        let result = translations::parse_tool_args(response.args, targets)
            .map_err(|err| TranslateError::Failure(format!("{:#}", err)))?
            .cleaned();
        info!(
            "translated into {} (detected {})",
            targets, result.detected_language
        );
        cache.put(key, result.clone());

        Ok(TranslationOutcome {
            result,
            from_cache: false,
            model: response.model,
        })
    }
}
