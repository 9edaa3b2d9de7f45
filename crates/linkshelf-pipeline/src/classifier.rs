//! The classification oracle behind an OpenAI-compatible chat endpoint.
//!
//! One call classifies a whole batch: the prompt lists the candidate
//! headings and the page excerpts, and the model answers one line per
//! link. The line protocol is deliberately rigid (`URLn: category |
//! annotation`) so parsing stays mechanical; anything that does not parse
//! degrades to an empty classification for that link rather than failing
//! the batch.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

/// One link to classify, with whatever page text could be fetched for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifyItem {
    pub url: String,
    pub excerpt: String,
}

/// Raw oracle output for one link, before heading resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawClassification {
    pub raw_category: String,
    pub annotation: String,
}

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("classifier request failed: {0}")]
    Http(String),
    #[error("classifier returned an unusable response: {0}")]
    InvalidResponse(String),
}

/// Maps batches of link texts to category/annotation pairs.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Returns one classification per item, in item order.
    async fn classify(
        &self,
        items: &[ClassifyItem],
        candidates: &[String],
    ) -> Result<Vec<RawClassification>, ClassifyError>;
}

/// Classifier backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatClassifier {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl ChatClassifier {
    pub fn new(api_key: String, base_url: String, model: String, timeout_secs: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            model,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl Classifier for ChatClassifier {
    async fn classify(
        &self,
        items: &[ClassifyItem],
        candidates: &[String],
    ) -> Result<Vec<RawClassification>, ClassifyError> {
        let request = serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": build_prompt(items, candidates),
            }],
        });

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ClassifyError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ClassifyError::InvalidResponse(format!(
                "API error ({status}): {error_text}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClassifyError::InvalidResponse(format!("failed to parse response: {e}")))?;
        let content = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| ClassifyError::InvalidResponse("no choices in response".to_string()))?;

        Ok(parse_batch_response(&content, items.len()))
    }
}

fn build_prompt(items: &[ClassifyItem], candidates: &[String]) -> String {
    let mut prompt = format!(
        "Given these categories:\n{}\n\n\
         Classify each content excerpt into exactly one of these categories, \
         using the exact text shown above. Do not create new categories or \
         modify the category names.\n\n\
         Return one line per URL in the form:\n\
         URL1: category | one-line summary of the content\n\
         URL2: category | one-line summary of the content\n\n\
         Content excerpts:\n",
        candidates.join(", ")
    );
    for (i, item) in items.iter().enumerate() {
        let excerpt = if item.excerpt.is_empty() {
            item.url.as_str()
        } else {
            item.excerpt.as_str()
        };
        prompt.push_str(&format!("URL{}: {}\n\n", i + 1, excerpt));
    }
    prompt
}

static RESPONSE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^URL(\d+):\s*([^|]*?)\s*(?:\|\s*(.*))?$").expect("response pattern"));

/// Parse the oracle's line-oriented answer into per-item classifications.
///
/// Lines that do not match the protocol, or that reference an index
/// outside the batch, are dropped with a warning; the affected items keep
/// an empty classification and resolve to the fallback heading downstream.
pub(crate) fn parse_batch_response(content: &str, expected: usize) -> Vec<RawClassification> {
    let mut results = vec![RawClassification::default(); expected];
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(caps) = RESPONSE_LINE.captures(line) else {
            tracing::warn!(line, "unparseable classifier line");
            continue;
        };
        let index: usize = match caps[1].parse::<usize>() {
            Ok(n) if (1..=expected).contains(&n) => n - 1,
            _ => {
                tracing::warn!(line, "classifier line references an unknown item");
                continue;
            }
        };
        results[index] = RawClassification {
            raw_category: caps[2].trim().to_string(),
            annotation: caps
                .get(3)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default(),
        };
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn items(n: usize) -> Vec<ClassifyItem> {
        (0..n)
            .map(|i| ClassifyItem {
                url: format!("https://example.com/{i}"),
                excerpt: format!("excerpt {i}"),
            })
            .collect()
    }

    #[test]
    fn parses_well_formed_lines() {
        let parsed = parse_batch_response(
            "URL1: Shipbuilding | Notes on hull plating.\nURL2: Robotics | Servo tuning guide.",
            2,
        );
        assert_eq!(
            parsed,
            vec![
                RawClassification {
                    raw_category: "Shipbuilding".into(),
                    annotation: "Notes on hull plating.".into(),
                },
                RawClassification {
                    raw_category: "Robotics".into(),
                    annotation: "Servo tuning guide.".into(),
                },
            ]
        );
    }

    #[test]
    fn lines_without_annotation_still_classify() {
        let parsed = parse_batch_response("URL1: Shipbuilding", 1);
        assert_eq!(parsed[0].raw_category, "Shipbuilding");
        assert_eq!(parsed[0].annotation, "");
    }

    #[test]
    fn reordered_lines_land_on_the_right_items() {
        let parsed = parse_batch_response("URL2: Robotics | b\nURL1: Shipbuilding | a", 2);
        assert_eq!(parsed[0].raw_category, "Shipbuilding");
        assert_eq!(parsed[1].raw_category, "Robotics");
    }

    #[test]
    fn garbage_and_out_of_range_lines_are_dropped() {
        let parsed = parse_batch_response(
            "here are your results:\nURL1: Shipbuilding | fine\nURL9: Robotics | nope\nnot a line",
            2,
        );
        assert_eq!(parsed[0].raw_category, "Shipbuilding");
        assert_eq!(parsed[1], RawClassification::default());
    }

    #[test]
    fn missing_lines_leave_empty_classifications() {
        let parsed = parse_batch_response("URL2: Robotics | b", 3);
        assert_eq!(parsed[0], RawClassification::default());
        assert_eq!(parsed[1].raw_category, "Robotics");
        assert_eq!(parsed[2], RawClassification::default());
    }

    #[test]
    fn prompt_lists_candidates_and_numbers_excerpts() {
        let prompt = build_prompt(
            &items(2),
            &["Shipbuilding".to_string(), "Robotics".to_string()],
        );
        assert!(prompt.contains("Shipbuilding, Robotics"));
        assert!(prompt.contains("URL1: excerpt 0"));
        assert!(prompt.contains("URL2: excerpt 1"));
    }

    #[test]
    fn prompt_falls_back_to_the_url_when_no_excerpt() {
        let prompt = build_prompt(
            &[ClassifyItem {
                url: "https://example.com/bare".into(),
                excerpt: String::new(),
            }],
            &["Shipbuilding".to_string()],
        );
        assert!(prompt.contains("URL1: https://example.com/bare"));
    }
}
