use itertools::Itertools;
use serde::{Deserialize, Deserializer, Serialize};

/// One record describing whether a single invoice passed validation.
///
/// PDF uploads come back keyed by `filename`, JSON submissions by
/// `invoice_id`. The service echoes the caller's invoice id verbatim, so it
/// may arrive as a number as well as a string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ValidationResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_invoice_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub invoice_id: Option<String>,
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn valid_invoice(invoice_id: &str) -> Self {
        Self {
            invoice_id: Some(invoice_id.to_string()),
            valid: true,
            ..Default::default()
        }
    }

    pub fn invalid_file(filename: &str, error: &str) -> Self {
        Self {
            filename: Some(filename.to_string()),
            valid: false,
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    /// `invoice_id` when present, otherwise `filename`, otherwise empty.
    pub fn display_id(&self) -> &str {
        self.invoice_id
            .as_deref()
            .or(self.filename.as_deref())
            .unwrap_or_default()
    }

    pub fn error_text(&self) -> &str {
        self.error.as_deref().unwrap_or_default()
    }
}

fn deserialize_invoice_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ErrorCount {
    pub message: String,
    pub count: usize,
}

/// Totals for one batch, computed from the records themselves.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub top_errors: Vec<ErrorCount>,
}

impl BatchSummary {
    pub fn from_results(results: &[ValidationResult]) -> Self {
        let valid = results.iter().filter(|r| r.valid).count();

        let counts = results
            .iter()
            .filter(|r| !r.valid)
            .filter_map(|r| r.error.as_deref())
            .filter(|e| !e.trim().is_empty())
            .counts();
        // ties keep first-seen order
        let order: Vec<&str> = results
            .iter()
            .filter_map(|r| r.error.as_deref())
            .unique()
            .collect();
        let mut top_errors: Vec<ErrorCount> = order
            .into_iter()
            .filter_map(|message| {
                counts.get(message).map(|count| ErrorCount {
                    message: message.to_string(),
                    count: *count,
                })
            })
            .collect();
        top_errors.sort_by(|a, b| b.count.cmp(&a.count));

        Self {
            total: results.len(),
            valid,
            invalid: results.len() - valid,
            top_errors,
        }
    }

    pub fn has_invalid(&self) -> bool {
        self.invalid > 0
    }
}
