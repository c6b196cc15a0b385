//! Strict interpretation of model output
//!
//! Model responses are untrusted text. Each adapter deserializes into a raw
//! shape, checks every field, and falls back to a low-confidence result when
//! the provider fails or answers with something unusable. Callers decide on
//! the confidence score, never on whether the call succeeded.

use ledger::money::major_to_cents;
use ledger::receipts::{EXTREME_AMOUNT_MAJOR, ReviewPolicy};
use ledger::splits::{NamedGroup, divide_among_groups, looks_overlapping};
use ledger::{Cents, SplitGroup};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::{ChatMessage, CompletionRequest, LanguageModel, ModelKind};

/// Confidence reported when the model could not be reached or said nothing
pub const DEGRADED_CONFIDENCE: f64 = 0.2;

/// Confidence reported when a receipt answer was not valid JSON
pub const UNPARSEABLE_RECEIPT_CONFIDENCE: f64 = 0.3;

/// Confidence assumed when a receipt answer omits its own
pub const DEFAULT_RECEIPT_CONFIDENCE: f64 = 0.5;

/// Confidence assumed when a text answer omits its own
pub const DEFAULT_TEXT_CONFIDENCE: f64 = 0.95;

const DEFAULT_DESCRIPTION: &str = "Expense";

const EXPENSE_PROMPT: &str = "You extract expense details from short chat messages. \
Return a JSON object with: amount (number, the money spent, no currency symbol), \
description (one or two words such as \"lunch\", \"uber\" or \"groceries\"), \
participants (array of names the expense was shared with, may be empty), \
payer (name of whoever paid, or null) and confidence (0.0 to 1.0).";

const RECEIPT_PROMPT: &str = "Read this receipt. The final total is the most important \
field: read every digit twice and watch for look-alike digits such as 2 and 7, 0 and 8, \
1 and 7, 3 and 8, 5 and 6. Return only a JSON object: \
{\"merchant\": string or null, \"date\": \"YYYY-MM-DD\" or null, \"subtotal\": number or null, \
\"service_fee\": number or null, \"tax\": number or null, \"tip\": number or null, \
\"total\": number or null, \"confidence\": 0.0-1.0}. \
Use a confidence of 0.95 or more only when every digit of the total is clearly legible, \
and below 0.9 whenever any digit of the total is uncertain.";

const SPLIT_PROMPT: &str = "The message describes one expense split across groups of people, \
and the same person may belong to several groups. Group names can look like \"Half 1\", \
\"half two\", \"first group\", \"Group A\" or \"h1\". Keep every participant name exactly \
as typed, including capitalization. Return a JSON object: \
{\"groups\": [{\"name\": string, \"participants\": [string]}]}. \
Example: \"Half 1: Boom Ken Jessi. Half 2: Boom Ann Gil\" gives \
{\"groups\": [{\"name\": \"Half 1\", \"participants\": [\"Boom\", \"Ken\", \"Jessi\"]}, \
{\"name\": \"Half 2\", \"participants\": [\"Boom\", \"Ann\", \"Gil\"]}]}.";

/// Remove markdown code fences some models wrap around JSON
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

fn clamp_confidence(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Accept plain numbers and numeric strings such as `"$12.50"`
fn amount_from(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_start_matches('$').replace(',', "").parse().ok(),
        _ => None,
    }?;
    (amount.is_finite() && amount >= 0.0).then_some(amount)
}

/// Result of parsing a free-text expense message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedExpense {
    pub amount_cents: Option<Cents>,
    pub description: String,
    pub confidence: f64,
    pub participants: Vec<String>,
    pub payer: Option<String>,
    pub needs_confirmation: bool,
}

impl ParsedExpense {
    fn degraded(policy: &ReviewPolicy) -> Self {
        Self {
            amount_cents: None,
            description: DEFAULT_DESCRIPTION.to_string(),
            confidence: DEGRADED_CONFIDENCE,
            participants: Vec::new(),
            payer: None,
            needs_confirmation: policy.needs_confirmation(DEGRADED_CONFIDENCE),
        }
    }
}

#[derive(Deserialize)]
struct RawExpense {
    #[serde(default)]
    amount: Option<Value>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    participants: Vec<String>,
    #[serde(default)]
    payer: Option<String>,
}

/// Interpret a text-model answer; `None` when it does not fit the schema
pub fn interpret_expense(content: &str, policy: &ReviewPolicy) -> Option<ParsedExpense> {
    let raw: RawExpense = serde_json::from_str(strip_code_fences(content)).ok()?;
    let confidence = clamp_confidence(raw.confidence.unwrap_or(DEFAULT_TEXT_CONFIDENCE));

    Some(ParsedExpense {
        amount_cents: raw.amount.as_ref().and_then(amount_from).map(major_to_cents),
        description: raw
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        confidence,
        participants: raw
            .participants
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect(),
        payer: raw.payer.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
        needs_confirmation: policy.needs_confirmation(confidence),
    })
}

/// Extract amount, description and people from a chat message
pub async fn parse_expense_text(
    model: &dyn LanguageModel,
    text: &str,
    policy: &ReviewPolicy,
) -> ParsedExpense {
    let request = CompletionRequest {
        model: ModelKind::Text,
        messages: vec![
            ChatMessage::system(EXPENSE_PROMPT),
            ChatMessage::user(format!("Extract the expense from: \"{}\"", text)),
        ],
        json_mode: true,
        temperature: Some(0.1),
        max_tokens: None,
    };

    match model.complete(request).await {
        Ok(Some(content)) => interpret_expense(&content, policy).unwrap_or_else(|| {
            warn!("Unparseable expense answer: {}", content);
            ParsedExpense::degraded(policy)
        }),
        Ok(None) => {
            warn!("Expense parsing returned no content");
            ParsedExpense::degraded(policy)
        }
        Err(e) => {
            warn!("Expense parsing failed: {}", e);
            ParsedExpense::degraded(policy)
        }
    }
}

/// Result of reading a receipt image
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrResult {
    pub merchant: Option<String>,
    pub date: Option<String>,
    pub subtotal_cents: Option<Cents>,
    pub total_cents: Option<Cents>,
    pub tax_cents: Option<Cents>,
    pub tip_cents: Option<Cents>,
    pub service_fee_cents: Option<Cents>,
    pub confidence: f64,
    pub needs_confirmation: bool,
    pub flagged_for_review: bool,
}

impl OcrResult {
    fn degraded(confidence: f64, policy: &ReviewPolicy) -> Self {
        Self {
            merchant: None,
            date: None,
            subtotal_cents: None,
            total_cents: None,
            tax_cents: None,
            tip_cents: None,
            service_fee_cents: None,
            confidence,
            needs_confirmation: policy.needs_confirmation(confidence),
            flagged_for_review: false,
        }
    }
}

fn text_field(object: &Value, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Only JSON numbers count; strings are not trusted as receipt amounts
fn cents_field(object: &Value, key: &str) -> Option<Cents> {
    object
        .get(key)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(major_to_cents)
}

/// Interpret a vision-model answer
pub fn interpret_receipt(content: Option<&str>, policy: &ReviewPolicy) -> OcrResult {
    let Some(content) = content.filter(|c| !c.trim().is_empty()) else {
        return OcrResult::degraded(DEGRADED_CONFIDENCE, policy);
    };

    let object = match serde_json::from_str::<Value>(strip_code_fences(content)) {
        Ok(value) if value.is_object() => value,
        _ => {
            warn!("Unparseable receipt answer: {}", content);
            return OcrResult::degraded(UNPARSEABLE_RECEIPT_CONFIDENCE, policy);
        }
    };

    let total_cents = object
        .get("total")
        .and_then(Value::as_f64)
        .filter(|total| {
            let plausible = total.is_finite() && *total >= 0.0 && *total <= EXTREME_AMOUNT_MAJOR;
            if !plausible {
                warn!("Discarding implausible receipt total {}", total);
            }
            plausible
        })
        .map(major_to_cents);

    let confidence = clamp_confidence(
        object
            .get("confidence")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_RECEIPT_CONFIDENCE),
    );
    let flagged_for_review = policy.is_suspicious(total_cents);

    if policy.needs_confirmation(confidence) {
        info!("Low confidence receipt: {}", confidence);
    }
    if flagged_for_review {
        warn!("Suspicious receipt total: {:?} cents", total_cents);
    }

    OcrResult {
        merchant: text_field(&object, "merchant"),
        date: text_field(&object, "date"),
        subtotal_cents: cents_field(&object, "subtotal"),
        total_cents,
        tax_cents: cents_field(&object, "tax"),
        tip_cents: cents_field(&object, "tip"),
        service_fee_cents: cents_field(&object, "service_fee"),
        confidence,
        needs_confirmation: policy.needs_confirmation(confidence),
        flagged_for_review,
    }
}

/// Read merchant, date and amounts from a receipt image
pub async fn process_receipt_ocr(
    model: &dyn LanguageModel,
    image_url: &str,
    policy: &ReviewPolicy,
) -> OcrResult {
    let request = CompletionRequest {
        model: ModelKind::Vision,
        messages: vec![ChatMessage::user_with_image(RECEIPT_PROMPT, image_url)],
        json_mode: false,
        temperature: None,
        max_tokens: Some(300),
    };

    match model.complete(request).await {
        Ok(content) => interpret_receipt(content.as_deref(), policy),
        Err(e) => {
            warn!("Receipt OCR failed: {}", e);
            OcrResult::degraded(DEGRADED_CONFIDENCE, policy)
        }
    }
}

/// Result of the overlapping split parser
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlappingSplit {
    pub is_overlapping: bool,
    pub split_groups: Vec<SplitGroup>,
}

impl OverlappingSplit {
    pub fn not_overlapping() -> Self {
        Self {
            is_overlapping: false,
            split_groups: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
struct RawGroups {
    #[serde(default)]
    groups: Vec<NamedGroup>,
}

/// Interpret a split-model answer and divide the total across its groups
pub fn interpret_split(content: &str, total_cents: Cents) -> OverlappingSplit {
    let Ok(raw) = serde_json::from_str::<RawGroups>(strip_code_fences(content)) else {
        warn!("Unparseable split answer: {}", content);
        return OverlappingSplit::not_overlapping();
    };

    let split_groups = divide_among_groups(total_cents, raw.groups);
    if split_groups.is_empty() {
        return OverlappingSplit::not_overlapping();
    }

    OverlappingSplit {
        is_overlapping: true,
        split_groups,
    }
}

/// Detect and resolve splits like "half 1: a b c, half 2: a d e"
///
/// The regex heuristic runs first; the model is only asked when the text
/// looks like an overlapping split.
pub async fn parse_overlapping_split_text(
    model: &dyn LanguageModel,
    text: &str,
    total_cents: Cents,
) -> OverlappingSplit {
    if !looks_overlapping(text) {
        return OverlappingSplit::not_overlapping();
    }

    info!("Detected overlapping split pattern");

    let request = CompletionRequest {
        model: ModelKind::Text,
        messages: vec![
            ChatMessage::system(SPLIT_PROMPT),
            ChatMessage::user(format!("Parse this overlapping split: \"{}\"", text)),
        ],
        json_mode: true,
        temperature: Some(0.1),
        max_tokens: None,
    };

    match model.complete(request).await {
        Ok(Some(content)) => interpret_split(&content, total_cents),
        Ok(None) => OverlappingSplit::not_overlapping(),
        Err(e) => {
            warn!("Overlapping split parsing failed: {}", e);
            OverlappingSplit::not_overlapping()
        }
    }
}
