use std::sync::Arc;
use std::time::Duration;

use pictura_contracts::styles::{transformation_prompt, StyleSelection};
use pictura_contracts::validation::assess;

use crate::filters::filter_bytes;
use crate::gemini::{GeminiClient, GenerationError, GenerationOutcome, GenerationTransport};
use crate::media::ImagePart;
use crate::pacing::{Pacer, SleepPacer};
use crate::storage::{StoredImage, TransientStore};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Appended to the prompt after each rejected answer; repeats accumulate.
pub const ESCALATION_INSTRUCTION: &str = "\n\nPlease describe the transformation in more \
detail: write at least 3 paragraphs and at least 200 characters covering the specific colors, \
lines, textures and overall impression of the result.";

/// Anything that can answer a single prompt, optionally with an image.
pub trait TextGenerator {
    fn generate(&self, prompt: &str, image: Option<&ImagePart>) -> GenerationOutcome;
}

impl<T: GenerationTransport> TextGenerator for GeminiClient<T> {
    fn generate(&self, prompt: &str, image: Option<&ImagePart>) -> GenerationOutcome {
        GeminiClient::generate(self, prompt, image)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRequest {
    pub image_bytes: Vec<u8>,
    pub style: StyleSelection,
    pub custom_instruction: Option<String>,
}

impl TransformRequest {
    pub fn new(image_bytes: Vec<u8>, style: StyleSelection) -> Self {
        Self {
            image_bytes,
            style,
            custom_instruction: None,
        }
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        let instruction = instruction.into();
        self.custom_instruction = if instruction.trim().is_empty() {
            None
        } else {
            Some(instruction)
        };
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub response_chars: usize,
    pub accepted: bool,
    pub rejections: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub outcome: GenerationOutcome,
    /// Generator calls made; at least one.
    pub attempts: u32,
    pub accepted: bool,
    pub filtered_image: Option<StoredImage>,
    pub filter_warning: Option<String>,
    pub history: Vec<AttemptRecord>,
}

impl TransformResult {
    pub fn text(&self) -> Option<&str> {
        self.outcome.as_deref().ok()
    }

    pub fn error(&self) -> Option<&GenerationError> {
        self.outcome.as_ref().err()
    }

    /// Text shown to the user. Errors are passed through verbatim.
    pub fn display_text(&self) -> String {
        match &self.outcome {
            Ok(text) if self.attempts > 1 => {
                format!("{text}\n\n(generated after {} attempts)", self.attempts)
            }
            Ok(text) => text.clone(),
            Err(err) => err.message.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRetryPolicy {
    pub max_attempts: u32,
    pub pacing: Duration,
}

impl Default for ValidationRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            pacing: Duration::from_secs(1),
        }
    }
}

impl ValidationRetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    pub prompt: String,
    pub attempts: u32,
    pub max_attempts: u32,
}

impl RetryState {
    pub fn new(prompt: String, max_attempts: u32) -> Self {
        Self {
            prompt,
            attempts: 0,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn has_budget(&self) -> bool {
        self.attempts < self.max_attempts
    }

    pub fn escalate(&mut self) {
        self.prompt.push_str(ESCALATION_INSTRUCTION);
    }
}

/// Filters once, then asks for a description until one passes validation or
/// the attempt budget runs out.
#[derive(Clone)]
pub struct Orchestrator {
    policy: ValidationRetryPolicy,
    pacer: Arc<dyn Pacer>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(ValidationRetryPolicy::default())
    }
}

impl Orchestrator {
    pub fn new(policy: ValidationRetryPolicy) -> Self {
        Self {
            policy,
            pacer: Arc::new(SleepPacer),
        }
    }

    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn policy(&self) -> ValidationRetryPolicy {
        self.policy
    }

    pub fn run<G: TextGenerator + ?Sized>(
        &self,
        generator: &G,
        store: &TransientStore,
        request: &TransformRequest,
    ) -> TransformResult {
        let (filtered_image, filter_warning) = filter_and_store(store, request);

        let image = ImagePart::detect(request.image_bytes.clone());
        let prompt = transformation_prompt(&request.style, request.custom_instruction.as_deref());
        let mut state = RetryState::new(prompt, self.policy.max_attempts);
        let mut history = Vec::new();
        let mut last_text = None;

        while state.has_budget() {
            state.attempts += 1;
            let text = match generator.generate(&state.prompt, Some(&image)) {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(
                        attempt = state.attempts,
                        kind = %err.kind,
                        "generation failed, giving up"
                    );
                    return TransformResult {
                        outcome: Err(err),
                        attempts: state.attempts,
                        accepted: false,
                        filtered_image,
                        filter_warning,
                        history,
                    };
                }
            };

            let assessment = assess(&text, &request.style);
            let accepted = assessment.is_accepted();
            history.push(AttemptRecord {
                attempt: state.attempts,
                response_chars: text.chars().count(),
                accepted,
                rejections: assessment
                    .rejections
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            });
            if accepted {
                return TransformResult {
                    outcome: Ok(text),
                    attempts: state.attempts,
                    accepted: true,
                    filtered_image,
                    filter_warning,
                    history,
                };
            }

            tracing::info!(
                attempt = state.attempts,
                max_attempts = state.max_attempts,
                reasons = %assessment.summary(),
                "description rejected"
            );
            last_text = Some(text);
            if state.has_budget() {
                state.escalate();
                self.pacer.pause(self.policy.pacing);
            }
        }

        TransformResult {
            outcome: last_text
                .ok_or_else(|| GenerationError::unknown("no description was generated")),
            attempts: state.attempts,
            accepted: false,
            filtered_image,
            filter_warning,
            history,
        }
    }
}

/// Uses real one-second pacing between attempts.
pub fn transform_with_retry<G: TextGenerator + ?Sized>(
    generator: &G,
    store: &TransientStore,
    request: &TransformRequest,
    max_attempts: u32,
) -> TransformResult {
    Orchestrator::new(ValidationRetryPolicy::default().with_max_attempts(max_attempts))
        .run(generator, store, request)
}

fn filter_and_store(
    store: &TransientStore,
    request: &TransformRequest,
) -> (Option<StoredImage>, Option<String>) {
    let filtered = match filter_bytes(&request.image_bytes, &request.style) {
        Ok(filtered) => filtered,
        Err(err) => {
            tracing::warn!(error = %err, "filter step failed");
            return (None, Some(format!("Could not apply the style filter: {err}")));
        }
    };
    match store.save_filtered(&filtered, &request.image_bytes, &request.style.file_tag()) {
        Ok(stored) => (Some(stored), None),
        Err(err) => {
            tracing::warn!(error = %err, "could not store filtered image");
            (None, Some(format!("Could not save the filtered image: {err}")))
        }
    }
}
