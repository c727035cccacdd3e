//! Zero-shot classification through a Hugging Face compatible inference API.
//!
//! The endpoint runs an NLI model (by default `facebook/bart-large-mnli`)
//! with the candidate categories as hypotheses. Request body:
//!
//! ```json
//! {"inputs": "...", "parameters": {"candidate_labels": [...],
//!   "multi_label": false, "hypothesis_template": "This example is {}."}}
//! ```
//!
//! The answer is `{"labels": [...], "scores": [...]}`, sometimes wrapped in a
//! one-element array.

use std::time::Duration;

use serde::Deserialize;

use crate::classify::{Classifier, LabelScore, rank};
use crate::config::ClassifierSettings;
use crate::error::{ClassifyError, ClassifyResult};

/// Client for a remote zero-shot classification endpoint.
#[derive(Debug, Clone)]
pub struct RemoteZeroShotClassifier {
    endpoint: String,
    api_token: Option<String>,
    timeout_secs: u64,
    hypothesis_template: String,
}

#[derive(Debug, Deserialize)]
struct ZeroShotOutput {
    labels: Vec<String>,
    scores: Vec<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZeroShotResponse {
    Single(ZeroShotOutput),
    Batch(Vec<ZeroShotOutput>),
}

impl RemoteZeroShotClassifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_token: None,
            timeout_secs: 60,
            hypothesis_template: "This example is {}.".into(),
        }
    }

    pub fn from_settings(settings: &ClassifierSettings) -> Self {
        Self {
            endpoint: settings.resolved_endpoint(),
            api_token: settings.api_token.clone(),
            timeout_secs: settings.timeout_secs,
            hypothesis_template: settings.hypothesis_template.clone(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn backend_error(&self, message: impl Into<String>) -> ClassifyError {
        ClassifyError::Backend {
            url: self.endpoint.clone(),
            message: message.into(),
        }
    }

    fn map_transport(&self, err: ureq::Error) -> ClassifyError {
        match err {
            ureq::Error::Status(code, resp) => {
                let body = resp.into_string().unwrap_or_default();
                self.backend_error(format!("HTTP {code}: {}", body.trim()))
            }
            ureq::Error::Transport(t) => {
                let message = t.to_string();
                if message.contains("timed out") {
                    ClassifyError::Timeout {
                        timeout_secs: self.timeout_secs,
                    }
                } else {
                    self.backend_error(message)
                }
            }
        }
    }
}

impl Classifier for RemoteZeroShotClassifier {
    fn name(&self) -> &str {
        "remote"
    }

    fn score(&self, text: &str, labels: &[String]) -> ClassifyResult<Vec<LabelScore>> {
        if labels.is_empty() {
            return Err(ClassifyError::EmptyLabels);
        }

        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build();

        let body = serde_json::json!({
            "inputs": text,
            "parameters": {
                "candidate_labels": labels,
                "multi_label": false,
                "hypothesis_template": self.hypothesis_template,
            },
        });
        let body_str = serde_json::to_string(&body).map_err(|e| {
            self.backend_error(format!("JSON serialize error: {e}"))
        })?;

        let mut request = agent
            .post(&self.endpoint)
            .set("Content-Type", "application/json");
        if let Some(token) = &self.api_token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }

        let resp = request
            .send_string(&body_str)
            .map_err(|e| self.map_transport(e))?;
        let resp_str = resp.into_string().map_err(|e| ClassifyError::InvalidResponse {
            message: e.to_string(),
        })?;

        parse_response(&resp_str, labels)
    }
}

/// Map a response onto the requested labels. Missing labels score 0,
/// unrequested ones are dropped.
fn parse_response(body: &str, labels: &[String]) -> ClassifyResult<Vec<LabelScore>> {
    let parsed: ZeroShotResponse =
        serde_json::from_str(body).map_err(|e| ClassifyError::InvalidResponse {
            message: e.to_string(),
        })?;
    let output = match parsed {
        ZeroShotResponse::Single(o) => o,
        ZeroShotResponse::Batch(mut v) if !v.is_empty() => v.swap_remove(0),
        ZeroShotResponse::Batch(_) => {
            return Err(ClassifyError::InvalidResponse {
                message: "empty result array".into(),
            });
        }
    };
    if output.labels.len() != output.scores.len() {
        return Err(ClassifyError::InvalidResponse {
            message: format!(
                "{} labels but {} scores",
                output.labels.len(),
                output.scores.len()
            ),
        });
    }

    let mut scores: Vec<LabelScore> = labels
        .iter()
        .map(|label| {
            let score = output
                .labels
                .iter()
                .position(|l| l == label)
                .map(|i| output.scores[i])
                .unwrap_or(0.0);
            LabelScore::new(label.clone(), score)
        })
        .collect();
    rank(&mut scores);
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn labels() -> Vec<String> {
        vec!["Legal Document".into(), "Other".into(), "Academic Paper".into()]
    }

    #[test]
    fn parses_single_object() {
        let body = r#"{"sequence":"x","labels":["Other","Legal Document","Academic Paper"],
                      "scores":[0.2,0.7,0.1]}"#;
        let scores = parse_response(body, &labels()).unwrap();
        assert_eq!(scores[0], LabelScore::new("Legal Document", 0.7));
        assert_eq!(scores[2], LabelScore::new("Academic Paper", 0.1));
    }

    #[test]
    fn parses_wrapped_array_and_fills_missing() {
        let body = r#"[{"labels":["Other","Surprise"],"scores":[0.9,0.1]}]"#;
        let scores = parse_response(body, &labels()).unwrap();
        assert_eq!(scores.len(), 3);
        assert_eq!(scores[0].label, "Other");
        assert!(scores.iter().all(|s| s.label != "Surprise"));
        assert_eq!(scores[1].score, 0.0);
    }

    #[test]
    fn rejects_malformed_responses() {
        assert!(matches!(
            parse_response(r#"{"error":"loading"}"#, &labels()),
            Err(ClassifyError::InvalidResponse { .. })
        ));
        assert!(matches!(
            parse_response("[]", &labels()),
            Err(ClassifyError::InvalidResponse { .. })
        ));
        assert!(matches!(
            parse_response(r#"{"labels":["Other"],"scores":[]}"#, &labels()),
            Err(ClassifyError::InvalidResponse { .. })
        ));
    }

    #[tokio::test]
    async fn sends_zero_shot_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/facebook/bart-large-mnli"))
            .and(header("authorization", "Bearer hf_test"))
            .and(body_partial_json(serde_json::json!({
                "inputs": "The parties agree.",
                "parameters": {
                    "multi_label": false,
                    "hypothesis_template": "This example is {}."
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "labels": ["Legal Document", "Academic Paper", "Other"],
                "scores": [0.91, 0.06, 0.03]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let classifier = RemoteZeroShotClassifier::new(format!(
            "{}/models/facebook/bart-large-mnli",
            server.uri()
        ))
        .with_token("hf_test");

        let scores = tokio::task::spawn_blocking(move || {
            classifier.score("The parties agree.", &labels())
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(scores[0].label, "Legal Document");
        assert_eq!(scores[0].score, 0.91);
    }

    #[tokio::test]
    async fn http_error_becomes_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(503).set_body_string(r#"{"error":"Model is loading"}"#),
            )
            .mount(&server)
            .await;

        let classifier = RemoteZeroShotClassifier::new(server.uri());
        let err = tokio::task::spawn_blocking(move || classifier.score("text", &labels()))
            .await
            .unwrap()
            .unwrap_err();
        match err {
            ClassifyError::Backend { message, .. } => {
                assert!(message.contains("503"));
                assert!(message.contains("Model is loading"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unreachable_endpoint_is_backend_error() {
        let classifier = RemoteZeroShotClassifier::new("http://127.0.0.1:9/zero-shot").with_timeout(2);
        let err = classifier.score("text", &labels()).unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::Backend { .. } | ClassifyError::Timeout { .. }
        ));
    }

    #[test]
    fn endpoint_derived_from_model() {
        let settings = ClassifierSettings::default();
        let c = RemoteZeroShotClassifier::from_settings(&settings);
        assert_eq!(
            c.endpoint(),
            "https://api-inference.huggingface.co/models/facebook/bart-large-mnli"
        );
    }
}
