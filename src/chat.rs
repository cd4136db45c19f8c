//! Chat orchestration: validate → fetch web evidence → compose → generate.
//!
//! Each request is independent; the corpus is only read (via a snapshot).

use crate::compose::compose;
use crate::corpus::CorpusStore;
use crate::generate::{AnswerGenerator, GenerationError};
use crate::search::EvidenceSource;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLink {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(rename = "response")]
    pub answer_text: String,
    pub sources: Vec<SourceLink>,
    /// Every label in the corpus at compose time, cited or not.
    #[serde(rename = "materialsUsed")]
    pub materials_referenced: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Message is required")]
    InvalidInput,

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

pub struct ChatOrchestrator {
    corpus: Arc<CorpusStore>,
    evidence: Arc<dyn EvidenceSource>,
    generator: Arc<dyn AnswerGenerator>,
}

impl ChatOrchestrator {
    pub fn new(
        corpus: Arc<CorpusStore>,
        evidence: Arc<dyn EvidenceSource>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self {
            corpus,
            evidence,
            generator,
        }
    }

    pub async fn handle(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        let message = request
            .message
            .filter(|m| !m.trim().is_empty())
            .ok_or(ChatError::InvalidInput)?;

        let web_results = self.evidence.fetch(&message).await;

        let materials = self.corpus.snapshot();
        let prompt = compose(&message, &materials, &web_results);
        tracing::debug!(
            materials = materials.len(),
            web_results = web_results.len(),
            prompt_chars = prompt.len(),
            "Prompt composed"
        );

        let answer_text = self.generator.generate(&prompt).await?;

        Ok(ChatResponse {
            answer_text,
            sources: web_results
                .into_iter()
                .map(|r| SourceLink {
                    title: r.title,
                    url: r.link,
                })
                .collect(),
            materials_referenced: materials.into_iter().map(|m| m.label).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchResult;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CannedEvidence {
        results: Vec<SearchResult>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EvidenceSource for CannedEvidence {
        async fn fetch(&self, _query: &str) -> Vec<SearchResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.results.clone()
        }
    }

    #[derive(Default)]
    struct RecordingGenerator {
        prompts: Mutex<Vec<String>>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl AnswerGenerator for RecordingGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            self.prompts.lock().push(prompt.to_string());
            match &self.fail_with {
                Some(reason) => Err(GenerationError::Http(reason.clone())),
                None => Ok("generated answer".into()),
            }
        }
    }

    fn evidence(results: Vec<SearchResult>) -> Arc<CannedEvidence> {
        Arc::new(CannedEvidence {
            results,
            calls: AtomicUsize::new(0),
        })
    }

    fn request(message: &str) -> ChatRequest {
        ChatRequest {
            message: Some(message.into()),
        }
    }

    #[tokio::test]
    async fn empty_message_is_rejected_before_any_call() {
        let ev = evidence(vec![]);
        let gen = Arc::new(RecordingGenerator::default());
        let chat = ChatOrchestrator::new(Arc::new(CorpusStore::new()), ev.clone(), gen.clone());

        for req in [request(""), request("   \n"), ChatRequest::default()] {
            assert!(matches!(chat.handle(req).await, Err(ChatError::InvalidInput)));
        }
        assert_eq!(ev.calls.load(Ordering::SeqCst), 0);
        assert!(gen.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn response_lists_sources_and_whole_corpus() {
        let corpus = Arc::new(CorpusStore::new());
        corpus.append("bio.txt", "Photosynthesis converts light to energy.");
        corpus.append("unrelated.pdf", "Medieval history.");
        let ev = evidence(vec![SearchResult {
            title: "Photosynthesis - Wiki".into(),
            snippet: "Process used by plants.".into(),
            link: "https://wiki.example/p".into(),
        }]);
        let gen = Arc::new(RecordingGenerator::default());
        let chat = ChatOrchestrator::new(corpus, ev, gen.clone());

        let resp = chat.handle(request("What is photosynthesis?")).await.unwrap();
        assert_eq!(resp.answer_text, "generated answer");
        assert_eq!(
            resp.sources,
            vec![SourceLink {
                title: "Photosynthesis - Wiki".into(),
                url: "https://wiki.example/p".into()
            }]
        );
        assert_eq!(resp.materials_referenced, vec!["bio.txt", "unrelated.pdf"]);

        let prompts = gen.prompts.lock();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Photosynthesis converts light to energy."));
        assert!(prompts[0].contains("Source: https://wiki.example/p"));
        assert!(prompts[0].contains("Student Question: What is photosynthesis?"));
    }

    #[tokio::test]
    async fn empty_evidence_is_not_an_error() {
        let chat = ChatOrchestrator::new(
            Arc::new(CorpusStore::new()),
            evidence(vec![]),
            Arc::new(RecordingGenerator::default()),
        );
        let resp = chat.handle(request("hello")).await.unwrap();
        assert!(resp.sources.is_empty());
        assert!(resp.materials_referenced.is_empty());
    }

    #[tokio::test]
    async fn generation_failure_propagates() {
        let gen = Arc::new(RecordingGenerator {
            fail_with: Some("quota exceeded".into()),
            ..Default::default()
        });
        let chat = ChatOrchestrator::new(Arc::new(CorpusStore::new()), evidence(vec![]), gen.clone());
        let err = chat.handle(request("hello")).await.unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");
        assert_eq!(gen.prompts.lock().len(), 1);
    }

    #[test]
    fn wire_shape() {
        let resp = ChatResponse {
            answer_text: "a".into(),
            sources: vec![],
            materials_referenced: vec!["m.txt".into()],
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "response": "a", "sources": [], "materialsUsed": ["m.txt"] })
        );
    }
}
