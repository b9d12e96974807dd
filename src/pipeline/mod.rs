//! Generation pipeline
//!
//! One linear async sequence per request:
//!
//! compose → generate → validate → (repair → validate, at most once) → finalize → cost
//!
//! Generation and repair failures are fatal. A failed syntax pass falls back to
//! the code it was given. Blocking issues left after the single repair attempt
//! are logged and returned on the result; the request still succeeds.

pub mod finalize;
pub mod progress;
pub mod repair;

use crate::config::Config;
use crate::cost::{log_cache_activity, CostBreakdown, Pricing};
use crate::error::{GenerationError, InvocationError};
use crate::llm::{Invoker, ProviderMode, UsageStats};
use crate::prompt::{self, GenerationRequest, COMPONENT_NAME};
use crate::validate::{advisory_issues, blocking_issues, validate, ValidationIssue};
use progress::{
    NoProgress, ProgressEvent, ProgressListener, Stage, ANALYZING, CHECKING, FINISHING, FIXING,
    READY,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

/// Final product of one request. Owned entirely by the caller.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub code: String,
    pub component_name: String,
    pub usage: UsageStats,
    pub cost: CostBreakdown,
    /// Issues from the last validation pass, residual blocking ones included
    pub issues: Vec<ValidationIssue>,
    /// Whether the repair stage ran
    pub repaired: bool,
}

impl GenerationResult {
    pub fn blocking_issues(&self) -> Vec<ValidationIssue> {
        blocking_issues(&self.issues)
    }
}

/// Language tags dropped from a fence that opens and closes on one line.
const LANGUAGE_TAGS: &[&str] = &["jsx", "js", "javascript", "tsx", "ts", "typescript"];

/// Strip Markdown code fences and surrounding prose from a model answer.
///
/// Without a fence the trimmed text is returned as-is.
pub fn extract_code(text: &str) -> String {
    let Some(open) = text.find("```") else {
        return text.trim().to_string();
    };

    let after_fence = &text[open + 3..];
    let (fence_line, rest) = match after_fence.find('\n') {
        Some(i) => (&after_fence[..i], &after_fence[i + 1..]),
        None => (after_fence, ""),
    };

    // A bare word after the fence is the info string (```jsx); anything else is code
    let body = if is_info_string(fence_line.trim()) {
        rest
    } else {
        strip_language_tag(after_fence)
    };

    let body = match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    };
    body.trim().to_string()
}

fn is_info_string(line: &str) -> bool {
    line.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '_' | '.'))
}

fn strip_language_tag(body: &str) -> &str {
    let trimmed = body.trim_start();
    match trimmed.split_once(char::is_whitespace) {
        Some((tag, code)) if LANGUAGE_TAGS.contains(&tag) => code,
        _ => trimmed,
    }
}

/// Runs the pipeline against one invoker.
pub struct Generator {
    invoker: Invoker,
    pricing: Pricing,
}

impl Generator {
    pub fn new(invoker: Invoker, pricing: Pricing) -> Self {
        Self { invoker, pricing }
    }

    pub fn from_config(
        config: &Config,
        mode: ProviderMode,
        api_key: Option<String>,
    ) -> Result<Self, InvocationError> {
        let invoker = Invoker::from_config(config, mode, api_key)?;
        Ok(Self::new(invoker, config.pricing))
    }

    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    /// Generate code for `request`, reporting checkpoints to `on_progress`.
    pub async fn generate(
        &self,
        request: GenerationRequest,
        on_progress: Option<&dyn ProgressListener>,
    ) -> Result<GenerationResult, GenerationError> {
        self.generate_with_cancel(request, on_progress, &CancellationToken::new())
            .await
    }

    /// Like [`Generator::generate`], abandoning in-flight model calls once `cancel` fires.
    pub async fn generate_with_cancel(
        &self,
        request: GenerationRequest,
        on_progress: Option<&dyn ProgressListener>,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, GenerationError> {
        let request_id = uuid::Uuid::new_v4();
        let span = info_span!("generate", %request_id, follow_up = request.is_follow_up());
        let progress = on_progress.unwrap_or(&NoProgress);

        self.run(&request, progress, cancel).instrument(span).await
    }

    async fn run(
        &self,
        request: &GenerationRequest,
        progress: &dyn ProgressListener,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, GenerationError> {
        // Caller misuse surfaces before any model call
        let prompt = prompt::compose(request)?;

        progress.notify(&ProgressEvent::working(ANALYZING));
        let generated = self
            .invoker
            .invoke(Stage::Generate, &prompt, progress, cancel)
            .await
            .map_err(|e| GenerationError::from_stage(Stage::Generate, e))?;

        let mut usage = generated.usage;
        let mut code = extract_code(&generated.text);

        progress.notify(&ProgressEvent::working(CHECKING));
        let mut issues = validate(&code);
        let advisory = advisory_issues(&issues);
        if !advisory.is_empty() {
            info!(count = advisory.len(), issues = ?advisory, "advisory issues");
        }

        let blocking = blocking_issues(&issues);
        let repaired = !blocking.is_empty();
        if repaired {
            progress.notify(&ProgressEvent::working(FIXING));
            info!(count = blocking.len(), issues = ?blocking, "blocking issues, attempting repair");

            let outcome = repair::repair(&self.invoker, &code, &blocking, progress, cancel)
                .await
                .map_err(|e| GenerationError::from_stage(Stage::Repair, e))?;

            usage += outcome.usage;
            if outcome.has_blocking() {
                let residual = blocking_issues(&outcome.issues);
                warn!(
                    count = residual.len(),
                    issues = ?residual,
                    "blocking issues remain after repair, continuing with best-effort code"
                );
            }
            code = outcome.code;
            issues = outcome.issues;
        }

        progress.notify(&ProgressEvent::working(FINISHING));
        match finalize::finalize(&self.invoker, &code, progress, cancel).await {
            Ok(finalized) => {
                usage += finalized.usage;
                code = finalized.code;
            }
            Err(InvocationError::Cancelled) => return Err(GenerationError::Cancelled),
            Err(e) => {
                warn!(error = %e, "syntax pass failed, keeping pre-finalization code");
            }
        }

        debug_assert!(usage.is_consistent());
        let cost = CostBreakdown::from_usage(&usage, &self.pricing);
        log_cache_activity(&usage, &cost);
        info!(
            tokens = usage.total_tokens(),
            cost_usd = cost.total_cost(),
            repaired,
            "generation complete"
        );

        progress.notify(&ProgressEvent::idle(READY));

        Ok(GenerationResult {
            code,
            component_name: COMPONENT_NAME.to_string(),
            usage,
            cost,
            issues,
            repaired,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::stub::{StubProvider, STUB_COMPONENT};
    use crate::llm::{
        Completion, CompletionProvider, ConversationMessage, ModelMetadata, Prompt,
    };
    use crate::pipeline::progress::LatestProgress;
    use crate::prompt::RequestKind;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const GOOD_CODE: &str = r#"import React from 'react';
import { View, Text, StatusBar } from 'react-native';
import { SafeAreaView } from 'react-native-safe-area-context';

export default function GeneratedApp() {
  return (
    <SafeAreaView style={{ flex: 1 }} edges={['top', 'bottom']}>
      <StatusBar barStyle="dark-content" />
      <View><Text>Todo</Text></View>
    </SafeAreaView>
  );
}"#;

    fn with_camera() -> String {
        GOOD_CODE.replace(
            "import { SafeAreaView } from 'react-native-safe-area-context';",
            "import { SafeAreaView } from 'react-native-safe-area-context';\nimport { Camera } from 'expo-camera';",
        )
    }

    fn failure() -> InvocationError {
        InvocationError::Api {
            status: 500,
            message: "upstream exploded".to_string(),
        }
    }

    /// Provider that replays a script of answers and records every prompt.
    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<String, InvocationError>>>,
        prompts: Mutex<Vec<Prompt>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<String, InvocationError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                prompts: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn prompts(&self) -> Vec<Prompt> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        fn metadata(&self) -> ModelMetadata {
            ModelMetadata {
                id: "scripted".to_string(),
                mode: ProviderMode::Stub,
            }
        }

        async fn complete(
            &self,
            prompt: &Prompt,
            _cancel: &CancellationToken,
        ) -> Result<Completion, InvocationError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) as u64;
            self.prompts.lock().unwrap().push(prompt.clone());
            let next = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .expect("provider called more often than scripted");
            next.map(|text| Completion {
                text,
                usage: UsageStats::new(100 + call, 200, 0, 0),
            })
        }
    }

    fn generator(provider: Arc<ScriptedProvider>) -> Generator {
        Generator::new(Invoker::new(provider), Pricing::default())
    }

    #[tokio::test]
    async fn test_forbidden_package_is_repaired_once() {
        let provider = ScriptedProvider::new(vec![
            Ok(with_camera()),
            Ok(GOOD_CODE.to_string()),
            Ok(format!("```jsx\n{}\n```", GOOD_CODE)),
        ]);
        let gen = generator(provider.clone());

        let initial = blocking_issues(&validate(&with_camera()));
        assert_eq!(initial.len(), 1);
        assert!(initial[0].message.contains("expo-camera"));

        let result = gen
            .generate(GenerationRequest::fresh("todo list with categories"), None)
            .await
            .unwrap();

        assert_eq!(provider.calls(), 3);
        assert!(result.repaired);
        assert!(result.blocking_issues().is_empty());
        assert!(!result.code.contains("expo-camera"));
        assert_eq!(result.code, GOOD_CODE);
        assert_eq!(result.component_name, "GeneratedApp");

        let prompts = provider.prompts();
        assert!(prompts[0].system.cacheable);
        assert_eq!(prompts[0].user, "App idea: \"todo list with categories\"");
        assert!(prompts[1].user.contains("ERRORS TO FIX:"));
        assert!(prompts[1].user.contains("expo-camera"));
        assert!(prompts[2].user.contains("CODE TO FIX:"));
    }

    #[tokio::test]
    async fn test_repair_runs_at_most_once() {
        let provider = ScriptedProvider::new(vec![
            Ok(with_camera()),
            Ok(with_camera()),
            Ok(with_camera()),
        ]);
        let gen = generator(provider.clone());

        let result = gen
            .generate(GenerationRequest::fresh("camera app"), None)
            .await
            .unwrap();

        assert_eq!(provider.calls(), 3);
        let repair_calls = provider
            .prompts()
            .iter()
            .filter(|p| p.user.contains("ERRORS TO FIX:"))
            .count();
        assert_eq!(repair_calls, 1);
        assert!(result.repaired);
        assert_eq!(result.blocking_issues().len(), 1);
    }

    #[tokio::test]
    async fn test_clean_code_skips_repair() {
        let provider = ScriptedProvider::new(vec![Ok(GOOD_CODE.to_string()), Ok(GOOD_CODE.to_string())]);
        let gen = generator(provider.clone());

        let result = gen
            .generate(GenerationRequest::fresh("todo"), None)
            .await
            .unwrap();

        assert_eq!(provider.calls(), 2);
        assert!(!result.repaired);
        assert!(result.issues.is_empty());
    }

    #[tokio::test]
    async fn test_finalize_failure_keeps_previous_code() {
        let provider = ScriptedProvider::new(vec![
            Ok(with_camera()),
            Ok(GOOD_CODE.to_string()),
            Err(failure()),
        ]);
        let gen = generator(provider.clone());

        let result = gen
            .generate(GenerationRequest::fresh("todo"), None)
            .await
            .unwrap();

        assert_eq!(provider.calls(), 3);
        assert_eq!(result.code, GOOD_CODE);
        // generation + repair only; the failed pass reports no usage
        assert_eq!(result.usage, UsageStats::new(201, 400, 0, 0));
    }

    #[tokio::test]
    async fn test_empty_finalize_answer_keeps_previous_code() {
        let provider = ScriptedProvider::new(vec![Ok(GOOD_CODE.to_string()), Ok("```\n```".to_string())]);
        let gen = generator(provider);

        let result = gen
            .generate(GenerationRequest::fresh("todo"), None)
            .await
            .unwrap();
        assert_eq!(result.code, GOOD_CODE);
    }

    #[tokio::test]
    async fn test_generation_failure_is_fatal() {
        let provider = ScriptedProvider::new(vec![Err(failure())]);
        let gen = generator(provider.clone());

        let err = gen
            .generate(GenerationRequest::fresh("todo"), None)
            .await
            .unwrap_err();

        assert_eq!(provider.calls(), 1);
        assert_eq!(err.to_string(), "generation failed, try again");
        assert!(matches!(
            err,
            GenerationError::Failed {
                stage: Stage::Generate,
                source: InvocationError::Api { status: 500, .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_repair_failure_is_fatal() {
        let provider = ScriptedProvider::new(vec![Ok(with_camera()), Err(failure())]);
        let gen = generator(provider.clone());

        let err = gen
            .generate(GenerationRequest::fresh("todo"), None)
            .await
            .unwrap_err();

        assert_eq!(provider.calls(), 2);
        assert!(matches!(
            err,
            GenerationError::Failed {
                stage: Stage::Repair,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_follow_up_without_history_never_calls_provider() {
        let provider = ScriptedProvider::new(vec![]);
        let gen = generator(provider.clone());

        let err = gen
            .generate(GenerationRequest::follow_up("make it blue", vec![]), None)
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Composition(_)));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_follow_up_sends_previous_code() {
        let provider = ScriptedProvider::new(vec![Ok(GOOD_CODE.to_string()), Ok(GOOD_CODE.to_string())]);
        let gen = generator(provider.clone());
        let history = vec![
            ConversationMessage::user("todo"),
            ConversationMessage::assistant("// v1"),
            ConversationMessage::user("make it blue"),
        ];

        let request = GenerationRequest::new("make it blue", history);
        assert_eq!(request.kind, RequestKind::FollowUp);
        assert!(request.is_follow_up());
        gen.generate(request, None).await.unwrap();

        let first = &provider.prompts()[0];
        assert!(first.user.starts_with("PREVIOUS APP CODE:\n// v1"));
    }

    #[tokio::test]
    async fn test_usage_accumulates_across_calls() {
        let provider = ScriptedProvider::new(vec![
            Ok(with_camera()),
            Ok(GOOD_CODE.to_string()),
            Ok(GOOD_CODE.to_string()),
        ]);
        let gen = generator(provider);

        let result = gen
            .generate(GenerationRequest::fresh("todo"), None)
            .await
            .unwrap();

        assert_eq!(result.usage, UsageStats::new(303, 600, 0, 0));
        assert_eq!(
            result.cost,
            CostBreakdown::from_usage(&result.usage, &Pricing::default())
        );
        assert_eq!(result.cost.total_cost(), result.cost.input_cost() + result.cost.output_cost());
    }

    #[tokio::test]
    async fn test_progress_checkpoints_in_order() {
        let provider = ScriptedProvider::new(vec![
            Ok(with_camera()),
            Ok(GOOD_CODE.to_string()),
            Ok(GOOD_CODE.to_string()),
        ]);
        let gen = generator(provider);
        let events = Mutex::new(Vec::new());
        let listener = |event: &ProgressEvent| events.lock().unwrap().push(event.clone());

        gen.generate(GenerationRequest::fresh("todo"), Some(&listener))
            .await
            .unwrap();

        let events = events.into_inner().unwrap();
        assert_eq!(
            events,
            vec![
                ProgressEvent::working(progress::ANALYZING),
                ProgressEvent::thinking(Stage::Generate),
                ProgressEvent::received(Stage::Generate),
                ProgressEvent::working(progress::CHECKING),
                ProgressEvent::working(progress::FIXING),
                ProgressEvent::thinking(Stage::Repair),
                ProgressEvent::received(Stage::Repair),
                ProgressEvent::working(progress::FINISHING),
                ProgressEvent::thinking(Stage::Finalize),
                ProgressEvent::received(Stage::Finalize),
                ProgressEvent::idle(progress::READY),
            ]
        );
    }

    #[tokio::test]
    async fn test_stub_pipeline_end_to_end() {
        let gen = Generator::new(Invoker::new(Arc::new(StubProvider::instant())), Pricing::default());
        let latest = LatestProgress::new();

        let result = gen
            .generate(GenerationRequest::fresh("anything"), Some(&latest))
            .await
            .unwrap();

        assert_eq!(result.code, STUB_COMPONENT.trim());
        assert!(!result.repaired);
        // generation + finalize
        assert_eq!(result.usage, UsageStats::new(900, 2500, 0, 0));
        assert_eq!(latest.latest(), Some(ProgressEvent::idle(progress::READY)));
    }

    #[tokio::test]
    async fn test_cancelled_request() {
        let gen = Generator::new(Invoker::new(Arc::new(StubProvider::instant())), Pricing::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = gen
            .generate_with_cancel(GenerationRequest::fresh("todo"), None, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Cancelled));
    }

    #[test]
    fn test_extract_code_variants() {
        assert_eq!(extract_code("  const a = 1;\n"), "const a = 1;");
        assert_eq!(extract_code("```jsx\nconst a = 1;\n```"), "const a = 1;");
        assert_eq!(extract_code("```\nconst a = 1;\n```\n"), "const a = 1;");
        assert_eq!(
            extract_code("Here you go:\n```javascript\nconst a = 1;\n```\nEnjoy!"),
            "const a = 1;"
        );
        assert_eq!(extract_code("```js\nconst a = 1;"), "const a = 1;");
        assert_eq!(extract_code("```"), "");
    }

    #[test]
    fn test_extract_code_single_line_fence() {
        assert_eq!(extract_code("```jsx const a = 1;```"), "const a = 1;");
        assert_eq!(extract_code("```const a = 1;```"), "const a = 1;");
        assert_eq!(extract_code("Sure: ```js const a = 1;``` done"), "const a = 1;");
    }
}
