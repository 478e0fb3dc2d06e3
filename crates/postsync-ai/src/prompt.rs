//! Prompt construction and reply parsing for caption enrichment.

use std::collections::BTreeMap;

use postsync_core::EnrichedContent;
use serde::Deserialize;

use crate::error::AiError;

/// Builds the translate-and-summarize prompt for one batch.
///
/// Each caption is listed as `id: "caption"`; the model is asked to answer
/// with an object keyed by the same ids.
#[must_use]
pub fn build_prompt(batch: &BTreeMap<String, String>) -> String {
    let items = batch
        .iter()
        .map(|(id, caption)| format!("{id}: \"{caption}\""))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Translate these social media post contents to English. For EACH item, provide a \
         concise title (max 80 chars) and a brief description. Return JSON only, no explanation.\n\
         \n\
         {items}\n\
         \n\
         Return format: {{\"0\": {{\"title\": \"...\", \"describe\": \"...\"}}, \
         \"1\": {{\"title\": \"...\", \"describe\": \"...\"}}, ...}}\n\
         Use the same numeric keys as the input. Both title and describe MUST be in English."
    )
}

/// Slice from the first `{` to the last `}`, which skips markdown fences and
/// any chatter around the object.
#[must_use]
pub fn extract_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}

#[derive(Debug, Deserialize)]
struct ReplyItem {
    #[serde(default)]
    title: String,
    #[serde(default, alias = "description")]
    describe: String,
}

/// Parses the model's reply into per-id content.
///
/// Entries that are not objects are skipped; the caller treats a missing id
/// as "use the fallback".
///
/// # Errors
///
/// Returns [`AiError::MissingJson`] when the reply has no object and
/// [`AiError::Deserialize`] when the object is not valid JSON.
pub fn parse_reply(content: &str) -> Result<BTreeMap<String, EnrichedContent>, AiError> {
    let json = extract_json_object(content).ok_or(AiError::MissingJson)?;
    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(json).map_err(|source| AiError::Deserialize {
            context: "enrichment reply",
            source,
        })?;

    Ok(object
        .into_iter()
        .filter_map(|(id, value)| {
            let item = serde_json::from_value::<ReplyItem>(value).ok()?;
            Some((
                id,
                EnrichedContent {
                    title: item.title.trim().to_string(),
                    description: item.describe.trim().to_string(),
                },
            ))
        })
        .collect())
}
