//! In-process provider that replays a scripted fragment sequence.
//!
//! Used to exercise the relay, the HTTP surface and the CLI without a
//! network. Every request is recorded so callers can assert on the model,
//! the system prompt and the message list that reached the provider.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{CompletionRequest, LlmError, LlmProvider};

/// One scripted upstream action.
#[derive(Debug, Clone)]
pub enum Step {
    /// Emit a text fragment.
    Text(String),
    /// Fail the call with this message.
    Fail(String),
    /// Emit nothing further and never complete.
    Hang,
}

pub struct ScriptedProvider {
    steps: Vec<Step>,
    delay: Option<Duration>,
    requests: Mutex<Vec<CompletionRequest>>,
    abandoned: Arc<AtomicBool>,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            delay: None,
            requests: Mutex::new(Vec::new()),
            abandoned: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stream `fragments` in order, then complete cleanly.
    pub fn fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(fragments.into_iter().map(|f| Step::Text(f.into())).collect())
    }

    /// Single reply for one-shot calls.
    pub fn replying(text: impl Into<String>) -> Self {
        Self::new(vec![Step::Text(text.into())])
    }

    /// Pause between steps, so consumers observe fragments arriving over time.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Whether a streaming call was dropped before it finished its script.
    pub fn was_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::SeqCst)
    }

    fn record(&self, request: CompletionRequest) {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);
    }
}

/// Flags the provider when a streaming future is dropped mid-script.
struct AbandonGuard {
    flag: Arc<AtomicBool>,
    finished: bool,
}

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.flag.store(true, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        self.record(request);
        let mut text = String::new();
        for step in &self.steps {
            match step {
                Step::Text(fragment) => text.push_str(fragment),
                Step::Fail(message) => {
                    return Err(LlmError::ApiRequest {
                        message: message.clone(),
                    })
                }
                Step::Hang => std::future::pending::<()>().await,
            }
        }
        Ok(text)
    }

    async fn complete_streaming(
        &self,
        request: CompletionRequest,
        tx: mpsc::Sender<String>,
    ) -> Result<(), LlmError> {
        self.record(request);
        let mut guard = AbandonGuard {
            flag: self.abandoned.clone(),
            finished: false,
        };

        for step in &self.steps {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match step {
                Step::Text(fragment) => {
                    if tx.send(fragment.clone()).await.is_err() {
                        return Err(LlmError::Cancelled);
                    }
                }
                Step::Fail(message) => {
                    guard.finished = true;
                    return Err(LlmError::Streaming {
                        message: message.clone(),
                    });
                }
                Step::Hang => std::future::pending::<()>().await,
            }
        }

        guard.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatTurn;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "fast".into(),
            system: "system".into(),
            messages: vec![ChatTurn::user("go")],
            max_tokens: 8,
        }
    }

    #[tokio::test]
    async fn test_streams_fragments_in_order_and_records_request() {
        let provider = ScriptedProvider::fragments(["a", "b", "c"]);
        let (tx, mut rx) = mpsc::channel(8);
        provider.complete_streaming(request(), tx).await.unwrap();

        let mut seen = Vec::new();
        while let Some(fragment) = rx.recv().await {
            seen.push(fragment);
        }
        assert_eq!(seen, vec!["a", "b", "c"]);
        assert_eq!(provider.requests().len(), 1);
        assert!(!provider.was_abandoned());
    }

    #[tokio::test]
    async fn test_dropped_receiver_reports_cancelled() {
        let provider = ScriptedProvider::fragments(["a", "b"]);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let err = provider.complete_streaming(request(), tx).await.unwrap_err();
        assert!(matches!(err, LlmError::Cancelled));
    }

    #[tokio::test]
    async fn test_complete_concatenates_script() {
        let provider = ScriptedProvider::fragments(["{\"a\":", "1}"]);
        assert_eq!(provider.complete(request()).await.unwrap(), "{\"a\":1}");
    }
}
