use thiserror::Error;

use crate::providers::MissingCredential;

const RATE_LIMIT_MARKERS: [&str; 7] = [
    "429",
    "quota",
    "rate limit",
    "rate_limit",
    "too many requests",
    "resource_exhausted",
    "limit",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RateLimit,
    Configuration,
    TranslationFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::RateLimit => "RATE_LIMIT",
            ErrorKind::Configuration => "CONFIGURATION",
            ErrorKind::TranslationFailure => "TRANSLATION_FAILURE",
        }
    }
}

/// Failures surfaced by the translation flow. None of them is retried.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("rate limited: {0}")]
    RateLimit(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("translation failed: {0}")]
    Failure(String),
}

impl TranslateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TranslateError::RateLimit(_) => ErrorKind::RateLimit,
            TranslateError::Configuration(_) => ErrorKind::Configuration,
            TranslateError::Failure(_) => ErrorKind::TranslationFailure,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            TranslateError::RateLimit(_) => {
                "The translation service is rate limited. Please wait a moment and try again."
                    .to_string()
            }
            TranslateError::Configuration(detail) => {
                format!("The translator is not set up: {}.", detail)
            }
            TranslateError::Failure(detail) => format!("Translation failed: {}", detail),
        }
    }

    /// Maps a provider failure onto the taxonomy.
    pub fn classify(err: anyhow::Error) -> Self {
        if let Some(missing) = err.downcast_ref::<MissingCredential>() {
            return TranslateError::Configuration(missing.to_string());
        }
        let message = format!("{:#}", err);
        if is_rate_limit_message(&message) {
            return TranslateError::RateLimit(message);
        }
        TranslateError::Failure(message)
    }
}

pub(crate) fn is_rate_limit_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    RATE_LIMIT_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn classifies_rate_limits() {
        let err = TranslateError::classify(anyhow!(
            "Gemini API error (429 Too Many Requests): Resource has been exhausted"
        ));
        assert_eq!(err.kind(), ErrorKind::RateLimit);
        assert_eq!(err.kind().as_str(), "RATE_LIMIT");
        let err = TranslateError::classify(anyhow!("daily Quota exceeded"));
        assert_eq!(err.kind(), ErrorKind::RateLimit);
    }

    #[test]
    fn classifies_missing_credential_through_context() {
        let err = anyhow::Error::new(MissingCredential::new()).context("calling model");
        let err = TranslateError::classify(err);
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.kind().as_str(), "CONFIGURATION");
    }

    #[test]
    fn other_failures_keep_message() {
        let err = TranslateError::classify(anyhow!("connection reset"));
        assert_eq!(err.kind().as_str(), "TRANSLATION_FAILURE");
        assert!(err.user_message().contains("connection reset"));
    }
}
