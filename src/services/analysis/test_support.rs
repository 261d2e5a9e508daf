// Scripted collaborators for unit tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::services::providers::{EmotionClassifier, ProviderError, TextClassifier, TextGenerator};

type GenerateFn = dyn Fn(&str, &str) -> Result<String, ProviderError> + Send + Sync;
type ClassifyFn = dyn Fn(&str) -> Result<bool, ProviderError> + Send + Sync;

pub fn upstream_error() -> ProviderError {
    ProviderError::ApiError {
        status: 503,
        message: "service unavailable".to_string(),
    }
}

pub struct FakeGenerator {
    reply: Box<GenerateFn>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn with<F>(reply: F) -> Self
    where
        F: Fn(&str, &str) -> Result<String, ProviderError> + Send + Sync + 'static,
    {
        Self {
            reply: Box::new(reply),
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(answer: &str) -> Self {
        let answer = answer.to_string();
        Self::with(move |_, _| Ok(answer.clone()))
    }

    pub fn failing() -> Self {
        Self::with(|_, _| Err(upstream_error()))
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, text: &str, system_instruction: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(text.to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.reply)(text, system_instruction)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

pub struct FakeClassifier {
    verdict: Box<ClassifyFn>,
    calls: AtomicUsize,
}

impl FakeClassifier {
    pub fn with<F>(verdict: F) -> Self
    where
        F: Fn(&str) -> Result<bool, ProviderError> + Send + Sync + 'static,
    {
        Self {
            verdict: Box::new(verdict),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(biased: bool) -> Self {
        Self::with(move |_| Ok(biased))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextClassifier for FakeClassifier {
    async fn classify(&self, text: &str, _system_instruction: &str) -> Result<bool, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.verdict)(text)
    }
}

pub struct FakeEmotions {
    scores: Option<Vec<(String, f64)>>,
    calls: AtomicUsize,
}

impl FakeEmotions {
    pub fn new(scores: &[(&str, f64)]) -> Self {
        Self {
            scores: Some(scores.iter().map(|(l, s)| (l.to_string(), *s)).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            scores: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmotionClassifier for FakeEmotions {
    async fn classify_emotions(&self, _text: &str) -> Result<Vec<(String, f64)>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.scores.clone().ok_or_else(upstream_error)
    }
}
