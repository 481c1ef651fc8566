//! Custom language models: corpora, words and grammars.

use bytes::Bytes;
use reqwest::Method;
use reqwest::multipart::Form;
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use super::models::{
    Corpora, Corpus, CustomWord, Grammar, Grammars, LanguageModel, LanguageModels,
    TrainingResponse, Word, Words,
};
use super::{SpeechToTextV1, op};
use crate::core::error::{WatsonError, WatsonResult};
use crate::core::request::file_part;
use crate::core::service::DetailedResponse;

/// Grammar formats the service accepts.
const GRAMMAR_CONTENT_TYPES: [&str; 2] = ["application/srgs", "application/srgs+xml"];

// =============================================================================
// Options
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CreateLanguageModelOptions {
    pub name: String,
    pub base_model_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CreateLanguageModelOptions {
    pub fn new(name: impl Into<String>, base_model_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_model_name: base_model_name.into(),
            dialect: None,
            description: None,
        }
    }

    pub fn with_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.dialect = Some(dialect.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Which words training uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordTypeToAdd {
    All,
    User,
}

impl WordTypeToAdd {
    fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::User => "user",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrainLanguageModelOptions {
    pub word_type_to_add: Option<WordTypeToAdd>,
    pub customization_weight: Option<f64>,
    /// Fail instead of warning when some corpora or grammars are invalid.
    pub strict: Option<bool>,
}

impl TrainLanguageModelOptions {
    pub fn with_word_type_to_add(mut self, word_type: WordTypeToAdd) -> Self {
        self.word_type_to_add = Some(word_type);
        self
    }

    pub fn with_customization_weight(mut self, weight: f64) -> Self {
        self.customization_weight = Some(weight);
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }
}

#[derive(Debug, Clone)]
pub struct AddCorpusOptions {
    pub corpus_name: String,
    /// Plain text, one sentence per line.
    pub corpus_file: Bytes,
    pub allow_overwrite: Option<bool>,
}

impl AddCorpusOptions {
    pub fn new(corpus_name: impl Into<String>, corpus_file: impl Into<Bytes>) -> Self {
        Self {
            corpus_name: corpus_name.into(),
            corpus_file: corpus_file.into(),
            allow_overwrite: None,
        }
    }

    pub fn with_allow_overwrite(mut self, allow: bool) -> Self {
        self.allow_overwrite = Some(allow);
        self
    }
}

#[derive(Debug, Clone)]
pub struct AddGrammarOptions {
    pub grammar_name: String,
    pub grammar_file: Bytes,
    /// `application/srgs` (ABNF) or `application/srgs+xml`.
    pub content_type: String,
    pub allow_overwrite: Option<bool>,
}

impl AddGrammarOptions {
    pub fn new(
        grammar_name: impl Into<String>,
        grammar_file: impl Into<Bytes>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            grammar_name: grammar_name.into(),
            grammar_file: grammar_file.into(),
            content_type: content_type.into(),
            allow_overwrite: None,
        }
    }

    pub fn with_allow_overwrite(mut self, allow: bool) -> Self {
        self.allow_overwrite = Some(allow);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordType {
    All,
    User,
    Corpora,
    Grammars,
}

impl WordType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::User => "user",
            Self::Corpora => "corpora",
            Self::Grammars => "grammars",
        }
    }
}

/// Ordering of `list_words`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordSort {
    Alphabetical,
    AlphabeticalDescending,
    Count,
    CountDescending,
}

impl WordSort {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Alphabetical => "alphabetical",
            Self::AlphabeticalDescending => "-alphabetical",
            Self::Count => "count",
            Self::CountDescending => "-count",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListWordsOptions {
    pub word_type: Option<WordType>,
    pub sort: Option<WordSort>,
}

impl ListWordsOptions {
    pub fn with_word_type(mut self, word_type: WordType) -> Self {
        self.word_type = Some(word_type);
        self
    }

    pub fn with_sort(mut self, sort: WordSort) -> Self {
        self.sort = Some(sort);
        self
    }
}

fn log_training_warnings(operation: &str, response: &TrainingResponse) {
    for warning in &response.warnings {
        warn!(
            operation,
            code = %warning.code,
            message = %warning.message,
            "Training warning"
        );
    }
}

// =============================================================================
// Language models
// =============================================================================

impl SpeechToTextV1 {
    pub async fn create_language_model(
        &self,
        options: CreateLanguageModelOptions,
    ) -> WatsonResult<DetailedResponse<LanguageModel>> {
        WatsonError::require("name", &options.name)?;
        WatsonError::require("base_model_name", &options.base_model_name)?;
        let builder = self
            .service
            .request(
                Method::POST,
                "/v1/customizations",
                &[],
                op("CreateLanguageModel"),
            )?
            .json(&options)?;
        self.service.send_json(builder).await
    }

    /// List custom language models, optionally only those for `language`.
    pub async fn list_language_models(
        &self,
        language: Option<&str>,
    ) -> WatsonResult<DetailedResponse<LanguageModels>> {
        let builder = self
            .service
            .request(Method::GET, "/v1/customizations", &[], op("ListLanguageModels"))?
            .query_opt("language", language);
        self.service.send_json(builder).await
    }

    pub async fn get_language_model(
        &self,
        customization_id: &str,
    ) -> WatsonResult<DetailedResponse<LanguageModel>> {
        let builder = self.service.request(
            Method::GET,
            "/v1/customizations/{customization_id}",
            &[("customization_id", customization_id)],
            op("GetLanguageModel"),
        )?;
        self.service.send_json(builder).await
    }

    pub async fn delete_language_model(
        &self,
        customization_id: &str,
    ) -> WatsonResult<DetailedResponse<()>> {
        let builder = self.service.request(
            Method::DELETE,
            "/v1/customizations/{customization_id}",
            &[("customization_id", customization_id)],
            op("DeleteLanguageModel"),
        )?;
        self.service.send_empty(builder).await
    }

    /// Start training. Invalid resources are reported as warnings unless `strict`.
    pub async fn train_language_model(
        &self,
        customization_id: &str,
        options: TrainLanguageModelOptions,
    ) -> WatsonResult<DetailedResponse<TrainingResponse>> {
        if let Some(weight) = options.customization_weight
            && !(0.0..=1.0).contains(&weight)
        {
            return Err(WatsonError::invalid(
                "customization_weight",
                "must be between 0.0 and 1.0",
            ));
        }
        let builder = self
            .service
            .request(
                Method::POST,
                "/v1/customizations/{customization_id}/train",
                &[("customization_id", customization_id)],
                op("TrainLanguageModel"),
            )?
            .query_opt("word_type_to_add", options.word_type_to_add.map(|w| w.as_str()))
            .query_opt("customization_weight", options.customization_weight)
            .query_opt("strict", options.strict);
        let response = self.service.send_json::<TrainingResponse>(builder).await?;
        log_training_warnings("TrainLanguageModel", &response.result);
        Ok(response)
    }

    pub async fn reset_language_model(
        &self,
        customization_id: &str,
    ) -> WatsonResult<DetailedResponse<()>> {
        let builder = self.service.request(
            Method::POST,
            "/v1/customizations/{customization_id}/reset",
            &[("customization_id", customization_id)],
            op("ResetLanguageModel"),
        )?;
        self.service.send_empty(builder).await
    }

    /// Upgrade to the latest version of the base model.
    pub async fn upgrade_language_model(
        &self,
        customization_id: &str,
    ) -> WatsonResult<DetailedResponse<()>> {
        let builder = self.service.request(
            Method::POST,
            "/v1/customizations/{customization_id}/upgrade_model",
            &[("customization_id", customization_id)],
            op("UpgradeLanguageModel"),
        )?;
        self.service.send_empty(builder).await
    }

    // =========================================================================
    // Corpora
    // =========================================================================

    pub async fn list_corpora(
        &self,
        customization_id: &str,
    ) -> WatsonResult<DetailedResponse<Corpora>> {
        let builder = self.service.request(
            Method::GET,
            "/v1/customizations/{customization_id}/corpora",
            &[("customization_id", customization_id)],
            op("ListCorpora"),
        )?;
        self.service.send_json(builder).await
    }

    /// Upload a text corpus (multipart field `corpus_file`).
    pub async fn add_corpus(
        &self,
        customization_id: &str,
        options: AddCorpusOptions,
    ) -> WatsonResult<DetailedResponse<()>> {
        if options.corpus_file.is_empty() {
            return Err(WatsonError::missing("corpus_file"));
        }
        let form = Form::new().part(
            "corpus_file",
            file_part(
                "corpus_file",
                options.corpus_file,
                Some(&options.corpus_name),
                Some("text/plain"),
            )?,
        );
        let builder = self
            .service
            .request(
                Method::POST,
                "/v1/customizations/{customization_id}/corpora/{corpus_name}",
                &[
                    ("customization_id", customization_id),
                    ("corpus_name", options.corpus_name.as_str()),
                ],
                op("AddCorpus"),
            )?
            .query_opt("allow_overwrite", options.allow_overwrite)
            .multipart(form);
        self.service.send_empty(builder).await
    }

    pub async fn get_corpus(
        &self,
        customization_id: &str,
        corpus_name: &str,
    ) -> WatsonResult<DetailedResponse<Corpus>> {
        let builder = self.service.request(
            Method::GET,
            "/v1/customizations/{customization_id}/corpora/{corpus_name}",
            &[
                ("customization_id", customization_id),
                ("corpus_name", corpus_name),
            ],
            op("GetCorpus"),
        )?;
        self.service.send_json(builder).await
    }

    pub async fn delete_corpus(
        &self,
        customization_id: &str,
        corpus_name: &str,
    ) -> WatsonResult<DetailedResponse<()>> {
        let builder = self.service.request(
            Method::DELETE,
            "/v1/customizations/{customization_id}/corpora/{corpus_name}",
            &[
                ("customization_id", customization_id),
                ("corpus_name", corpus_name),
            ],
            op("DeleteCorpus"),
        )?;
        self.service.send_empty(builder).await
    }

    // =========================================================================
    // Words
    // =========================================================================

    pub async fn list_words(
        &self,
        customization_id: &str,
        options: ListWordsOptions,
    ) -> WatsonResult<DetailedResponse<Words>> {
        let builder = self
            .service
            .request(
                Method::GET,
                "/v1/customizations/{customization_id}/words",
                &[("customization_id", customization_id)],
                op("ListWords"),
            )?
            .query_opt("word_type", options.word_type.map(|w| w.as_str()))
            .query_opt("sort", options.sort.map(|s| s.as_str()));
        self.service.send_json(builder).await
    }

    /// Add or replace several words; each must carry `word`.
    pub async fn add_words(
        &self,
        customization_id: &str,
        words: &[CustomWord],
    ) -> WatsonResult<DetailedResponse<()>> {
        if words.is_empty() {
            return Err(WatsonError::missing("words"));
        }
        if words
            .iter()
            .any(|w| w.word.as_deref().is_none_or(|word| word.trim().is_empty()))
        {
            return Err(WatsonError::invalid("words", "every entry needs a word"));
        }
        let builder = self
            .service
            .request(
                Method::POST,
                "/v1/customizations/{customization_id}/words",
                &[("customization_id", customization_id)],
                op("AddWords"),
            )?
            .json(&json!({ "words": words }))?;
        self.service.send_empty(builder).await
    }

    /// Add or replace one word. The word is taken from `word_name`.
    pub async fn add_word(
        &self,
        customization_id: &str,
        word_name: &str,
        definition: CustomWord,
    ) -> WatsonResult<DetailedResponse<()>> {
        WatsonError::require("word_name", word_name)?;
        let definition = CustomWord {
            word: Some(word_name.to_string()),
            ..definition
        };
        let builder = self
            .service
            .request(
                Method::PUT,
                "/v1/customizations/{customization_id}/words/{word_name}",
                &[
                    ("customization_id", customization_id),
                    ("word_name", word_name),
                ],
                op("AddWord"),
            )?
            .json(&definition)?;
        self.service.send_empty(builder).await
    }

    pub async fn get_word(
        &self,
        customization_id: &str,
        word_name: &str,
    ) -> WatsonResult<DetailedResponse<Word>> {
        let builder = self.service.request(
            Method::GET,
            "/v1/customizations/{customization_id}/words/{word_name}",
            &[
                ("customization_id", customization_id),
                ("word_name", word_name),
            ],
            op("GetWord"),
        )?;
        self.service.send_json(builder).await
    }

    pub async fn delete_word(
        &self,
        customization_id: &str,
        word_name: &str,
    ) -> WatsonResult<DetailedResponse<()>> {
        let builder = self.service.request(
            Method::DELETE,
            "/v1/customizations/{customization_id}/words/{word_name}",
            &[
                ("customization_id", customization_id),
                ("word_name", word_name),
            ],
            op("DeleteWord"),
        )?;
        self.service.send_empty(builder).await
    }

    // =========================================================================
    // Grammars
    // =========================================================================

    pub async fn list_grammars(
        &self,
        customization_id: &str,
    ) -> WatsonResult<DetailedResponse<Grammars>> {
        let builder = self.service.request(
            Method::GET,
            "/v1/customizations/{customization_id}/grammars",
            &[("customization_id", customization_id)],
            op("ListGrammars"),
        )?;
        self.service.send_json(builder).await
    }

    /// Upload a grammar as the raw request body.
    pub async fn add_grammar(
        &self,
        customization_id: &str,
        options: AddGrammarOptions,
    ) -> WatsonResult<DetailedResponse<()>> {
        if options.grammar_file.is_empty() {
            return Err(WatsonError::missing("grammar_file"));
        }
        if !GRAMMAR_CONTENT_TYPES.contains(&options.content_type.as_str()) {
            return Err(WatsonError::invalid(
                "content_type",
                format!("must be one of {}", GRAMMAR_CONTENT_TYPES.join(", ")),
            ));
        }
        let builder = self
            .service
            .request(
                Method::POST,
                "/v1/customizations/{customization_id}/grammars/{grammar_name}",
                &[
                    ("customization_id", customization_id),
                    ("grammar_name", options.grammar_name.as_str()),
                ],
                op("AddGrammar"),
            )?
            .query_opt("allow_overwrite", options.allow_overwrite)
            .bytes(options.grammar_file, options.content_type);
        self.service.send_empty(builder).await
    }

    pub async fn get_grammar(
        &self,
        customization_id: &str,
        grammar_name: &str,
    ) -> WatsonResult<DetailedResponse<Grammar>> {
        let builder = self.service.request(
            Method::GET,
            "/v1/customizations/{customization_id}/grammars/{grammar_name}",
            &[
                ("customization_id", customization_id),
                ("grammar_name", grammar_name),
            ],
            op("GetGrammar"),
        )?;
        self.service.send_json(builder).await
    }

    pub async fn delete_grammar(
        &self,
        customization_id: &str,
        grammar_name: &str,
    ) -> WatsonResult<DetailedResponse<()>> {
        let builder = self.service.request(
            Method::DELETE,
            "/v1/customizations/{customization_id}/grammars/{grammar_name}",
            &[
                ("customization_id", customization_id),
                ("grammar_name", grammar_name),
            ],
            op("DeleteGrammar"),
        )?;
        self.service.send_empty(builder).await
    }
}
