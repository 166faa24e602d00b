//! Text pipeline applied to step call input.
//!
//! The pipeline reads `text` plus optional knobs from the step's initial
//! input, then runs: punctuation removal (optional), the named operation,
//! truncation to `max_length` characters, and an optional timestamp prefix.
//! Unknown operation names fall back to uppercase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{ProcessingError, Result},
    models::JsonObject,
    time::format_timestamp,
};

/// Default upper bound on processed text length, in characters.
pub const DEFAULT_MAX_LENGTH: usize = 1000;

/// Supported text transformations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOperation {
    /// Convert to upper case.
    Uppercase,
    /// Convert to lower case.
    Lowercase,
    /// Reverse character order.
    Reverse,
    /// Upper-case the first letter of every word, lower-case the rest.
    Title,
    /// Upper-case the first character, lower-case the rest.
    Capitalize,
    /// Trim surrounding whitespace.
    Strip,
    /// Count whitespace-separated words.
    WordCount,
    /// Count characters.
    CharCount,
}

impl TextOperation {
    /// Resolves an operation name. Unknown names resolve to `Uppercase`.
    pub fn parse(name: &str) -> Self {
        match name {
            "lowercase" => Self::Lowercase,
            "reverse" => Self::Reverse,
            "title" => Self::Title,
            "capitalize" => Self::Capitalize,
            "strip" => Self::Strip,
            "word_count" => Self::WordCount,
            "char_count" => Self::CharCount,
            _ => Self::Uppercase,
        }
    }

    /// Applies the operation to `text`.
    pub fn apply(self, text: &str) -> String {
        match self {
            Self::Uppercase => text.to_uppercase(),
            Self::Lowercase => text.to_lowercase(),
            Self::Reverse => text.chars().rev().collect(),
            Self::Title => title_case(text),
            Self::Capitalize => capitalize(text),
            Self::Strip => text.trim().to_string(),
            Self::WordCount => text.split_whitespace().count().to_string(),
            Self::CharCount => text.chars().count().to_string(),
        }
    }
}

/// Optional knobs read from the step input, with their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOptions {
    /// Operation name; see [`TextOperation::parse`]. Non-string values,
    /// `null` included, resolve to uppercase and are echoed as given.
    #[serde(default = "default_operation")]
    pub operation: Value,
    /// Language tag, echoed as given.
    #[serde(default = "default_language")]
    pub language: Value,
    /// Output format, echoed as given.
    #[serde(default = "default_format")]
    pub format: Value,
    /// Text encoding, echoed as given.
    #[serde(default = "default_encoding")]
    pub encoding: Value,
    /// Maximum processed length in characters.
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    /// Echoed only; word counting always splits on whitespace runs.
    #[serde(default = "default_true")]
    pub preserve_spaces: bool,
    /// Strip ASCII punctuation before the operation runs.
    #[serde(default)]
    pub remove_punctuation: bool,
    /// Prefix the result with `[<timestamp>] `.
    #[serde(default = "default_true")]
    pub add_timestamp: bool,
    /// Echoed as given.
    #[serde(default = "default_delimiter")]
    pub custom_delimiter: Value,
    /// Caller metadata, echoed only.
    #[serde(default = "default_metadata")]
    pub metadata: Value,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            operation: default_operation(),
            language: default_language(),
            format: default_format(),
            encoding: default_encoding(),
            max_length: default_max_length(),
            preserve_spaces: true,
            remove_punctuation: false,
            add_timestamp: true,
            custom_delimiter: default_delimiter(),
            metadata: default_metadata(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TextRequest {
    #[serde(default)]
    text: Option<String>,
    #[serde(flatten)]
    options: TextOptions,
}

/// Options echoed under `processing_options` in the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingOptions {
    /// See [`TextOptions::max_length`].
    pub max_length: usize,
    /// See [`TextOptions::preserve_spaces`].
    pub preserve_spaces: bool,
    /// See [`TextOptions::remove_punctuation`].
    pub remove_punctuation: bool,
    /// See [`TextOptions::add_timestamp`].
    pub add_timestamp: bool,
    /// See [`TextOptions::custom_delimiter`].
    pub custom_delimiter: Value,
}

/// Result record of the text pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextResult {
    /// Input text as received.
    pub original_text: String,
    /// Output of the pipeline.
    pub processed_text: String,
    /// Operation name as requested.
    pub operation: Value,
    /// Echoed language tag.
    pub language: Value,
    /// Echoed format.
    pub format: Value,
    /// Echoed encoding.
    pub encoding: Value,
    /// Character length of `processed_text`.
    pub length: usize,
    /// Echoed caller metadata.
    pub metadata: Value,
    /// Echoed processing options.
    pub processing_options: ProcessingOptions,
}

impl TextResult {
    /// Converts the record into a JSON object for a step output.
    pub fn into_object(self) -> Result<JsonObject> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(ProcessingError::ResultEncoding(format!(
                "expected an object, got {other}"
            ))),
            Err(e) => Err(ProcessingError::ResultEncoding(e.to_string())),
        }
    }
}

/// Runs the text pipeline over a step's initial input.
///
/// # Errors
///
/// - [`ProcessingError::TextRequired`] when `text` is missing, null or empty
/// - [`ProcessingError::InvalidInput`] when a known key has the wrong type
pub fn process_text(input: &JsonObject, now: DateTime<Utc>) -> Result<TextResult> {
    let request: TextRequest = serde_json::from_value(Value::Object(input.clone()))
        .map_err(|e| ProcessingError::InvalidInput(e.to_string()))?;

    let text = request.text.filter(|t| !t.is_empty()).ok_or(ProcessingError::TextRequired)?;
    let options = request.options;

    let source = if options.remove_punctuation { strip_punctuation(&text) } else { text.clone() };
    let mut processed = TextOperation::parse(options.operation.as_str().unwrap_or_default()).apply(&source);

    if processed.chars().count() > options.max_length {
        processed = processed.chars().take(options.max_length).collect();
    }

    if options.add_timestamp {
        processed = format!("[{}] {processed}", format_timestamp(now));
    }

    Ok(TextResult {
        original_text: text,
        length: processed.chars().count(),
        processed_text: processed,
        operation: options.operation,
        language: options.language,
        format: options.format,
        encoding: options.encoding,
        metadata: options.metadata,
        processing_options: ProcessingOptions {
            max_length: options.max_length,
            preserve_spaces: options.preserve_spaces,
            remove_punctuation: options.remove_punctuation,
            add_timestamp: options.add_timestamp,
            custom_delimiter: options.custom_delimiter,
        },
    })
}

/// Removes ASCII punctuation characters.
pub fn strip_punctuation(text: &str) -> String {
    text.chars().filter(|c| !c.is_ascii_punctuation()).collect()
}

// A word starts at the first cased character after any uncased one.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_is_cased = false;
    for c in text.chars() {
        if previous_is_cased {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        previous_is_cased = c.is_lowercase() || c.is_uppercase();
    }
    out
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => {
            let rest = chars.as_str().to_lowercase();
            first.to_uppercase().chain(rest.chars()).collect()
        },
        None => String::new(),
    }
}

fn default_operation() -> Value {
    Value::from("uppercase")
}

fn default_language() -> Value {
    Value::from("en")
}

fn default_format() -> Value {
    Value::from("plain")
}

fn default_encoding() -> Value {
    Value::from("utf-8")
}

fn default_max_length() -> usize {
    DEFAULT_MAX_LENGTH
}

fn default_true() -> bool {
    true
}

fn default_delimiter() -> Value {
    Value::from(" ")
}

fn default_metadata() -> Value {
    Value::Object(JsonObject::new())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn input(value: Value) -> JsonObject {
        match value {
            Value::Object(map) => map,
            _ => panic!("test input must be an object"),
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
    }

    fn run(value: Value) -> TextResult {
        process_text(&input(value), fixed_now()).unwrap()
    }

    #[test]
    fn uppercase_is_default_operation() {
        let result = run(json!({"text": "hello world", "add_timestamp": false}));
        assert_eq!(result.processed_text, "HELLO WORLD");
        assert_eq!(result.operation, "uppercase");
    }

    #[test]
    fn reverse_reverses_characters() {
        let result = run(json!({"text": "Hello World", "operation": "reverse", "add_timestamp": false}));
        assert_eq!(result.processed_text, "dlroW olleH");
    }

    #[test]
    fn unknown_operation_falls_back_to_uppercase_but_echoes_name() {
        let result = run(json!({"text": "abc", "operation": "shout", "add_timestamp": false}));
        assert_eq!(result.processed_text, "ABC");
        assert_eq!(result.operation, "shout");
    }

    #[test]
    fn each_operation_transforms_as_named() {
        let cases = [
            ("lowercase", "Hello World", "hello world"),
            ("title", "hello wORLD it's 3rd", "Hello World It'S 3Rd"),
            ("capitalize", "hELLO World", "Hello world"),
            ("strip", "  padded \n", "padded"),
            ("word_count", " one  two\tthree ", "3"),
            ("char_count", "héllo", "5"),
        ];

        for (operation, text, expected) in cases {
            let result = run(json!({"text": text, "operation": operation, "add_timestamp": false}));
            assert_eq!(result.processed_text, expected, "operation {operation}");
        }
    }

    #[test]
    fn punctuation_removed_before_operation() {
        let result = run(json!({
            "text": "Hello, World!",
            "remove_punctuation": true,
            "operation": "char_count",
            "add_timestamp": false
        }));
        assert_eq!(result.processed_text, "11");
    }

    #[test]
    fn truncates_to_max_length_characters() {
        let result = run(json!({"text": "ééééé", "max_length": 3, "add_timestamp": false}));
        assert_eq!(result.processed_text, "ÉÉÉ");
        assert_eq!(result.length, 3);
    }

    #[test]
    fn timestamp_prefix_applied_after_truncation() {
        let result = run(json!({"text": "hello world", "max_length": 5}));
        assert_eq!(result.processed_text, "[2024-01-15T10:30:00.000000Z] HELLO");
        assert_eq!(result.length, result.processed_text.chars().count());
    }

    #[test]
    fn defaults_are_echoed() {
        let result = run(json!({"text": "x"}));
        assert_eq!(result.language, "en");
        assert_eq!(result.format, "plain");
        assert_eq!(result.encoding, "utf-8");
        assert_eq!(result.metadata, json!({}));
        assert_eq!(result.processing_options, ProcessingOptions {
            max_length: 1000,
            preserve_spaces: true,
            remove_punctuation: false,
            add_timestamp: true,
            custom_delimiter: json!(" "),
        });
    }

    #[test]
    fn missing_or_empty_text_is_rejected() {
        for value in [json!({}), json!({"text": ""}), json!({"text": null})] {
            let err = process_text(&input(value), fixed_now()).unwrap_err();
            assert!(matches!(err, ProcessingError::TextRequired));
        }
    }

    #[test]
    fn null_string_options_fall_back_and_echo_null() {
        let result = run(json!({
            "text": "hi",
            "operation": null,
            "language": null,
            "format": null,
            "encoding": null,
            "custom_delimiter": null,
            "add_timestamp": false
        }));
        assert_eq!(result.processed_text, "HI");
        assert_eq!(result.operation, Value::Null);
        assert_eq!(result.language, Value::Null);
        assert_eq!(result.format, Value::Null);
        assert_eq!(result.encoding, Value::Null);
        assert_eq!(result.processing_options.custom_delimiter, Value::Null);
    }

    #[test]
    fn non_string_operation_resolves_to_uppercase() {
        for operation in [json!(7), json!(["reverse"]), json!({"name": "reverse"})] {
            let result =
                run(json!({"text": "abc", "operation": operation.clone(), "add_timestamp": false}));
            assert_eq!(result.processed_text, "ABC");
            assert_eq!(result.operation, operation);
        }
    }

    #[test]
    fn title_case_breaks_words_on_uncased_characters() {
        assert_eq!(TextOperation::Title.apply("中a"), "中A");
        assert_eq!(TextOperation::Title.apply("x1y"), "X1Y");
    }

    #[test]
    fn wrongly_typed_option_is_invalid_input() {
        let err = process_text(&input(json!({"text": "x", "max_length": "ten"})), fixed_now())
            .unwrap_err();
        assert!(matches!(err, ProcessingError::InvalidInput(_)));
    }

    #[test]
    fn result_converts_to_object() {
        let object = run(json!({"text": "hi", "metadata": {"source": "test"}}))
            .into_object()
            .unwrap();
        assert_eq!(object["original_text"], "hi");
        assert_eq!(object["metadata"]["source"], "test");
        assert_eq!(object["processing_options"]["max_length"], 1000);
    }
}
