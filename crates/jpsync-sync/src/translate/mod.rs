//! Source-language to store-language text translation.
//!
//! [`Translator`] wraps a pluggable [`TranslationBackend`] with an in-run
//! memo keyed on `(SHA-256 of text, target language)` and the output
//! clean-up the store needs: leftover kana removed, whitespace collapsed,
//! brand name in front of every translated title.

mod openai;

use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, PoisonError};

use async_trait::async_trait;
use jpsync_core::{AppConfig, ProductRecord, TranslatorProvider};
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::error::TranslateError;

pub use openai::OpenAiBackend;

/// Language the vendor sites publish in.
pub const SOURCE_LANG: &str = "ja";

static KANA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\u{3040}-\u{309F}\u{30A0}-\u{30FF}\u{FF66}-\u{FF9F}]+").expect("valid regex")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// A machine-translation service.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Translates `text` from `source_lang` to `target_lang`.
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslateError>;
}

/// Backend for `TRANSLATOR_PROVIDER=none`: every call is unavailable, so
/// callers keep the source text.
pub struct NoBackend;

#[async_trait]
impl TranslationBackend for NoBackend {
    async fn translate(&self, _: &str, _: &str, _: &str) -> Result<String, TranslateError> {
        Err(TranslateError::Unavailable {
            reason: "no translation provider configured".to_owned(),
        })
    }
}

pub struct Translator {
    backend: Box<dyn TranslationBackend>,
    target_lang: String,
    cache: Mutex<HashMap<String, String>>,
}

impl Translator {
    #[must_use]
    pub fn new(backend: Box<dyn TranslationBackend>, target_lang: impl Into<String>) -> Self {
        Self {
            backend,
            target_lang: target_lang.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Builds the translator selected by `TRANSLATOR_PROVIDER`.
    ///
    /// # Errors
    ///
    /// Returns [`TranslateError::Unavailable`] when the provider is `openai`
    /// without a key, or [`TranslateError::Http`] if the HTTP client cannot
    /// be built.
    pub fn from_app_config(cfg: &AppConfig) -> Result<Self, TranslateError> {
        let backend: Box<dyn TranslationBackend> = match cfg.translator_provider {
            TranslatorProvider::None => Box::new(NoBackend),
            TranslatorProvider::OpenAi => {
                let key = cfg
                    .translator_key
                    .as_deref()
                    .ok_or_else(|| TranslateError::Unavailable {
                        reason: "TRANSLATOR_KEY is not set".to_owned(),
                    })?;
                Box::new(OpenAiBackend::new(
                    key,
                    &cfg.translator_model,
                    cfg.request_timeout(),
                )?)
            }
        };
        tracing::info!(provider = %cfg.translator_provider, target = %cfg.translator_target_lang, "translator ready");
        Ok(Self::new(backend, cfg.translator_target_lang.clone()))
    }

    #[must_use]
    pub fn target_lang(&self) -> &str {
        &self.target_lang
    }

    /// Drops memoized translations. The orchestrator calls this at the start
    /// of every job so the memo never outlives a run.
    pub fn reset(&self) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Translates `text`, returning a memoized result for a repeated input.
    /// Text without Japanese script is returned unchanged.
    ///
    /// # Errors
    ///
    /// Any backend failure, or a result that is empty once kana are removed,
    /// comes back as a [`TranslateError`]; callers keep the source text.
    pub async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslateError> {
        if !needs_translation(text) {
            return Ok(text.to_owned());
        }
        let key = cache_key(text, target_lang);
        let cached = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        if let Some(hit) = cached {
            return Ok(hit);
        }

        let raw = self
            .backend
            .translate(text, source_lang, target_lang)
            .await?;
        let cleaned = strip_kana(&raw);
        if cleaned.is_empty() {
            return Err(TranslateError::Unavailable {
                reason: "translation was empty after kana removal".to_owned(),
            });
        }

        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, cleaned.clone());
        Ok(cleaned)
    }

    /// Fills `title_tgt` and `description_tgt`. A field whose translation
    /// fails stays `None` and its error is returned so the caller can record
    /// a warning.
    pub async fn translate_record(&self, record: &mut ProductRecord) -> Vec<TranslateError> {
        let mut warnings = Vec::new();
        let brand = record.vendor.brand();

        match self
            .translate(&record.title_src, SOURCE_LANG, &self.target_lang)
            .await
        {
            Ok(title) => {
                record.title_tgt = Some(with_brand_prefix(&collapse_whitespace(&title), brand));
            }
            Err(e) => {
                tracing::warn!(source_id = %record.source_id, field = "title", error = %e, "keeping source title");
                warnings.push(e);
            }
        }

        if !record.description_src.trim().is_empty() {
            match self
                .translate(&record.description_src, SOURCE_LANG, &self.target_lang)
                .await
            {
                Ok(description) => record.description_tgt = Some(description),
                Err(e) => {
                    tracing::warn!(source_id = %record.source_id, field = "description", error = %e, "keeping source description");
                    warnings.push(e);
                }
            }
        }
        warnings
    }
}

/// Memo key: hex SHA-256 of the text, then the target language.
#[must_use]
pub fn cache_key(text: &str, target_lang: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    format!("{hex}:{target_lang}")
}

/// `true` when `text` contains kana or CJK ideographs.
#[must_use]
pub fn needs_translation(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c,
            '\u{3040}'..='\u{30FF}' | '\u{4E00}'..='\u{9FFF}' | '\u{FF66}'..='\u{FF9F}')
    })
}

/// Removes hiragana and katakana (full and half width) and trims.
#[must_use]
pub fn strip_kana(text: &str) -> String {
    KANA_RE.replace_all(text, "").trim().to_owned()
}

#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// Prefixes `brand` unless the title already starts with it, ignoring case.
#[must_use]
pub fn with_brand_prefix(title: &str, brand: &str) -> String {
    let starts_with_brand = title
        .get(..brand.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(brand));
    if starts_with_brand {
        title.to_owned()
    } else {
        format!("{brand} {title}")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use chrono::Utc;
    use jpsync_core::Vendor;

    use super::*;

    struct Counting {
        calls: Arc<AtomicU32>,
        reply: &'static str,
    }

    #[async_trait]
    impl TranslationBackend for Counting {
        async fn translate(&self, _: &str, _: &str, _: &str) -> Result<String, TranslateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.to_owned())
        }
    }

    fn counting(reply: &'static str) -> (Translator, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let backend = Counting {
            calls: Arc::clone(&calls),
            reply,
        };
        (Translator::new(Box::new(backend), "zh-TW"), calls)
    }

    fn record(title: &str) -> ProductRecord {
        ProductRecord {
            source_id: "2300012345".to_owned(),
            source_url: "https://workman.jp/shop/g/g2300012345/".to_owned(),
            vendor: Vendor::Workman,
            title_src: title.to_owned(),
            title_tgt: None,
            description_src: String::new(),
            description_tgt: None,
            images: vec![],
            variants: vec![],
            categories: BTreeSet::new(),
            fetched_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn repeated_input_hits_the_memo() {
        let (translator, calls) = counting("防寒外套");
        let a = translator.translate("防寒ジャケット", "ja", "zh-TW").await.unwrap();
        let b = translator.translate("防寒ジャケット", "ja", "zh-TW").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn memo_is_keyed_by_target_language() {
        let (translator, calls) = counting("jacket");
        translator.translate("防寒ジャケット", "ja", "zh-TW").await.unwrap();
        translator.translate("防寒ジャケット", "ja", "en").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn reset_clears_the_memo() {
        let (translator, calls) = counting("防寒外套");
        translator.translate("防寒ジャケット", "ja", "zh-TW").await.unwrap();
        translator.reset();
        translator.translate("防寒ジャケット", "ja", "zh-TW").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn latin_text_skips_the_backend() {
        let (translator, calls) = counting("unused");
        let out = translator
            .translate("SHARK FULL ZIP HOODIE", "ja", "zh-TW")
            .await
            .unwrap();
        assert_eq!(out, "SHARK FULL ZIP HOODIE");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn record_title_gets_brand_prefix_and_kana_removed() {
        let (translator, _) = counting("  防寒 ジャケット 外套  ");
        let mut r = record("防寒ジャケット");
        let warnings = translator.translate_record(&mut r).await;
        assert!(warnings.is_empty());
        assert_eq!(r.title_tgt.as_deref(), Some("WORKMAN 防寒 外套"));
        assert!(r.description_tgt.is_none());
    }

    #[tokio::test]
    async fn no_backend_keeps_source_text() {
        let translator = Translator::new(Box::new(NoBackend), "zh-TW");
        let mut r = record("防寒ジャケット");
        let warnings = translator.translate_record(&mut r).await;
        assert_eq!(warnings.len(), 1);
        assert!(r.title_tgt.is_none());
        assert_eq!(r.display_title(), "防寒ジャケット");
    }

    #[tokio::test]
    async fn kana_only_result_is_unavailable() {
        let (translator, _) = counting("ジャケット");
        let err = translator
            .translate("防寒ジャケット", "ja", "zh-TW")
            .await
            .unwrap_err();
        assert!(matches!(err, TranslateError::Unavailable { .. }));
    }

    #[test]
    fn brand_prefix_is_case_insensitive() {
        assert_eq!(with_brand_prefix("Human Made T恤", "HUMAN MADE"), "Human Made T恤");
        assert_eq!(with_brand_prefix("T恤", "HUMAN MADE"), "HUMAN MADE T恤");
        assert_eq!(with_brand_prefix("鯊", "BAPE"), "BAPE 鯊");
    }

    #[test]
    fn cache_key_is_stable_and_language_scoped() {
        assert_eq!(cache_key("a", "zh-TW"), cache_key("a", "zh-TW"));
        assert_ne!(cache_key("a", "zh-TW"), cache_key("a", "en"));
        assert!(cache_key("a", "zh-TW").ends_with(":zh-TW"));
    }
}
