use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use lesson_core::model::{OptionId, QuizId};
use lesson_core::quiz::{QuizContent, QuizOption};

use crate::client::{ApiError, CompletionAck, CompletionApi, QuizSource, SectionCompletionRequest};

/// HTTP implementation of the platform boundary.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    #[must_use]
    pub fn new(base: Url) -> Self {
        Self {
            client: Client::new(),
            base,
        }
    }

    /// Builds a backend from `LESSON_API_BASE_URL`, if set and valid.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let raw = env::var("LESSON_API_BASE_URL").ok()?;
        let base = Url::parse(raw.trim()).ok()?;
        Some(Self::new(base))
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

//
// ─── WIRE PAYLOADS ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
struct QuizPayload {
    question: String,
    options: Vec<OptionPayload>,
}

#[derive(Debug, Deserialize)]
struct OptionPayload {
    id: String,
    text: String,
}

impl QuizPayload {
    /// Convert the wire payload into validated domain content.
    ///
    /// The first option is the correct one by contract; order is preserved
    /// exactly as the backend sent it.
    fn into_quiz(self) -> Result<QuizContent, ApiError> {
        let options = self
            .options
            .into_iter()
            .map(|o| QuizOption {
                id: OptionId::new(o.id),
                text: o.text,
            })
            .collect();
        Ok(QuizContent::new(self.question, options)?)
    }
}

//
// ─── TRAIT IMPLS ───────────────────────────────────────────────────────────────
//

#[async_trait]
impl CompletionApi for HttpBackend {
    async fn complete_section(
        &self,
        request: SectionCompletionRequest,
    ) -> Result<CompletionAck, ApiError> {
        let url = self.endpoint(&format!(
            "courses/{}/sections/{}/complete",
            request.course_id, request.section_id
        ))?;
        log::info!("completing section {}", request.section_id);

        let response = self.client.post(url).json(&request).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound);
        }
        if !status.is_success() {
            log::warn!(
                "section completion rejected with status {} for {}",
                status,
                request.section_id
            );
            return Err(ApiError::Status(status.as_u16()));
        }
        Ok(response.json::<CompletionAck>().await?)
    }
}

#[async_trait]
impl QuizSource for HttpBackend {
    async fn fetch_quiz(&self, quiz: QuizId) -> Result<QuizContent, ApiError> {
        let url = self.endpoint(&format!("quizzes/{quiz}"))?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound);
        }
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        response.json::<QuizPayload>().await?.into_quiz()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiz_payload_maps_to_domain_content() {
        let payload: QuizPayload = serde_json::from_str(
            r#"{ "question": "Q?", "options": [
                { "id": "a", "text": "right" },
                { "id": "b", "text": "wrong" }
            ]}"#,
        )
        .unwrap();
        let quiz = payload.into_quiz().unwrap();
        assert_eq!(quiz.question(), "Q?");
        assert_eq!(quiz.canonical().text, "right");
    }

    #[test]
    fn quiz_payload_without_options_is_rejected() {
        let payload: QuizPayload =
            serde_json::from_str(r#"{ "question": "Q?", "options": [] }"#).unwrap();
        assert!(payload.into_quiz().is_err());
    }

    #[test]
    fn endpoint_joins_relative_paths() {
        let backend = HttpBackend::new(Url::parse("https://api.example.com/v1/").unwrap());
        let url = backend.endpoint("quizzes/abc").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/quizzes/abc");
    }
}
