// Google Perspective API implementation.
//
// One `comments:analyze` call per text, requesting every configured
// attribute at once. Rate limiting, caching and timeouts live in the
// scoring client and governor, not here: this type is a bare transport.
//
// API docs: https://developers.perspectiveapi.com/s/about-the-api-methods

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{MalformedResponse, RawScores, ToxicityScorer};
use crate::output::truncate_chars;

pub const DEFAULT_API_URL: &str =
    "https://commentanalyzer.googleapis.com/v1alpha1/comments:analyze";

/// Perspective API toxicity scorer.
pub struct PerspectiveScorer {
    client: Client,
    api_key: String,
    api_url: String,
}

impl PerspectiveScorer {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_url,
        }
    }
}

#[async_trait]
impl ToxicityScorer for PerspectiveScorer {
    async fn score_text(&self, text: &str, attributes: &[String]) -> Result<RawScores> {
        let request = build_request(text, attributes);

        let response = self
            .client
            .post(&self.api_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .context("Failed to call Perspective API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Perspective API returned {}: {}", status, truncate_chars(&body, 200));
        }

        let body = response
            .text()
            .await
            .context("Failed to read Perspective API response")?;
        let scores = parse_response(&body)?;

        debug!(
            attributes = scores.len(),
            text_preview = %truncate_chars(text, 50),
            "Scored text"
        );

        Ok(scores)
    }

    fn name(&self) -> &'static str {
        "perspective"
    }
}

fn build_request(text: &str, attributes: &[String]) -> PerspectiveRequest {
    PerspectiveRequest {
        comment: Comment {
            text: text.to_string(),
        },
        requested_attributes: attributes
            .iter()
            .map(|a| (a.clone(), AttributeConfig {}))
            .collect(),
        languages: vec!["en".to_string()],
    }
}

/// Pull summary scores out of a response body. A body that isn't JSON, or
/// that carries no `attributeScores` at all, is malformed.
fn parse_response(body: &str) -> Result<RawScores> {
    let parsed: PerspectiveResponse = serde_json::from_str(body)
        .map_err(|e| anyhow::Error::new(MalformedResponse(format!("invalid JSON: {e}"))))?;

    let attribute_scores = parsed.attribute_scores.ok_or_else(|| {
        anyhow::Error::new(MalformedResponse(
            "response has no attributeScores".to_string(),
        ))
    })?;

    Ok(attribute_scores
        .into_iter()
        .map(|(attribute, score)| (attribute, score.summary_score.value))
        .collect())
}

// --- Perspective API request/response types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PerspectiveRequest {
    comment: Comment,
    requested_attributes: BTreeMap<String, AttributeConfig>,
    languages: Vec<String>,
}

#[derive(Serialize)]
struct Comment {
    text: String,
}

#[derive(Serialize)]
struct AttributeConfig {}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PerspectiveResponse {
    attribute_scores: Option<HashMap<String, AttributeScore>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttributeScore {
    summary_score: SummaryScore,
}

#[derive(Deserialize)]
struct SummaryScore {
    value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = build_request(
            "you are a slur",
            &["INSULT".to_string(), "TOXICITY".to_string()],
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["comment"]["text"], "you are a slur");
        assert_eq!(json["languages"][0], "en");
        assert!(json["requestedAttributes"]["INSULT"].is_object());
        assert!(json["requestedAttributes"]["TOXICITY"].is_object());
        assert_eq!(json["requestedAttributes"].as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_parse_summary_scores() {
        let body = r#"{
            "attributeScores": {
                "INSULT": {"summaryScore": {"value": 0.91, "type": "PROBABILITY"}, "spanScores": []},
                "TOXICITY": {"summaryScore": {"value": 0.42, "type": "PROBABILITY"}}
            },
            "languages": ["en"]
        }"#;
        let scores = parse_response(body).unwrap();
        assert_eq!(scores.len(), 2);
        assert!((scores["INSULT"] - 0.91).abs() < 1e-12);
        assert!((scores["TOXICITY"] - 0.42).abs() < 1e-12);
    }

    #[test]
    fn test_missing_attribute_scores_is_malformed() {
        let err = parse_response(r#"{"languages": ["en"]}"#).unwrap_err();
        assert!(err.downcast_ref::<MalformedResponse>().is_some());
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = parse_response("<html>bad gateway</html>").unwrap_err();
        assert!(err.downcast_ref::<MalformedResponse>().is_some());
    }
}
