//! Prompt evaluation fan-out
//!
//! Runs every test case against every requested provider, bounded by a
//! per-provider semaphore, and checks each answer against the case's
//! assertion. Test cases can be generated by a configured model from a
//! description of the expected users.

use std::collections::HashMap;
use std::sync::Arc;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tollgate_config::EvaluationConfig;
use tollgate_core::RequestContext;

use crate::error::LlmError;
use crate::gateway::Gateway;
use crate::provider::ProviderKind;
use crate::types::{ChatRequest, Message, Role};

const GENERATOR_PROMPT: &str = r#"You are a test system that tests prompts for llms. You understand what kind of user is there and accordingly you create different test cases to ask questions to llm.
Provide at least 10 questions.
Your response should be in the json format as following:
[{"question": "string of the question you should be asking", "assert": {"type": "Keywords", "value": "comma separated string of keywords the answer should contain"}}]
Example:
If a userRole is: "asking investment related questions"
[{"question": "what is difference between ETFs and Stocks? which should I invest in?", "assert": {"type": "Keywords", "value": "Ownership,Diversification,Management,Trading,Risk"}}]"#;

const USER_ROLE_PREFIX: &str = "This is userRole details to understand what kind of questions you need to ask: ";

const EMPTY_ANSWER_REASON: &str = "LLM request was successful but it returned empty response";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRequest {
    /// System prompt under test
    pub prompt: String,
    /// Description of the expected users, used to generate test cases
    #[serde(default)]
    pub user_role_details: Option<String>,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    pub test_providers: Vec<TestProvider>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub question: String,
    pub assert: Assertion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    #[serde(rename = "type")]
    pub kind: AssertionKind,
    #[serde(alias = "Value")]
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssertionKind {
    /// Answer contains the value verbatim
    #[serde(alias = "contains")]
    Contains,
    /// Answer mentions enough of the comma-separated keywords
    #[serde(alias = "keywords")]
    Keywords,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestProvider {
    pub provider: ProviderKind,
    pub model: String,
    #[serde(default)]
    pub temperature: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResponse {
    pub question_responses: Vec<QuestionResponse>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    pub question: String,
    pub llm_responses: Vec<LlmResponse>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmResponse {
    pub provider: ProviderKind,
    pub model: String,
    pub temperature: f64,
    pub status: bool,
    pub status_reason: String,
    pub answer: String,
    pub cost: f64,
}

impl Assertion {
    /// Whether `answer` satisfies the assertion, with a reason when it does not
    pub fn check(&self, answer: &str) -> (bool, String) {
        if answer.is_empty() {
            return (false, EMPTY_ANSWER_REASON.to_owned());
        }

        match self.kind {
            AssertionKind::Contains => {
                if answer.contains(&self.value) {
                    (true, String::new())
                } else {
                    (false, format!("Expected output to contain {}", self.value))
                }
            }
            AssertionKind::Keywords => {
                let answer = answer.to_lowercase();
                let keywords: Vec<_> = self.value.split(',').collect();
                let matched = keywords
                    .iter()
                    .filter(|keyword| answer.contains(&keyword.trim().to_lowercase()))
                    .count();

                if matched >= (keywords.len() + 1) / 3 {
                    (true, String::new())
                } else {
                    (
                        false,
                        format!("Expected output to contain most of these keywords: {}", self.value),
                    )
                }
            }
        }
    }
}

/// Strip a surrounding markdown code fence from a model reply
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(body) = trimmed.strip_suffix("```") else {
        return trimmed;
    };

    body.strip_prefix("```json")
        .or_else(|| body.strip_prefix("```"))
        .map_or(trimmed, str::trim)
}

pub struct Evaluator {
    gateway: Arc<Gateway>,
    config: EvaluationConfig,
}

impl Evaluator {
    pub const fn new(gateway: Arc<Gateway>, config: EvaluationConfig) -> Self {
        Self { gateway, config }
    }

    pub async fn evaluate(&self, request: EvaluationRequest, ctx: &RequestContext) -> Result<EvaluationResponse, LlmError> {
        if request.test_providers.is_empty() {
            return Err(LlmError::InvalidRequest("testProviders must not be empty".to_owned()));
        }

        // every credential is resolved before any upstream call
        let mut credentials = HashMap::new();
        for target in &request.test_providers {
            if !credentials.contains_key(&target.provider) {
                credentials.insert(target.provider, self.gateway.credential(target.provider, ctx)?);
            }
        }

        let mut test_cases = match request.user_role_details.as_deref().filter(|d| !d.trim().is_empty()) {
            Some(details) => self.generate_test_cases(details, ctx).await?,
            None => Vec::new(),
        };
        test_cases.extend(request.test_cases);

        if test_cases.is_empty() {
            return Err(LlmError::InvalidRequest("no test cases to run".to_owned()));
        }

        let results = self
            .run(&request.prompt, &test_cases, &request.test_providers, &credentials, ctx)
            .await?;

        let providers = request.test_providers.len();
        let question_responses = test_cases
            .into_iter()
            .zip(results.chunks(providers))
            .map(|(case, responses)| QuestionResponse {
                question: case.question,
                llm_responses: responses.to_vec(),
            })
            .collect();

        Ok(EvaluationResponse { question_responses })
    }

    /// Ask the configured model for test cases matching `details`
    async fn generate_test_cases(&self, details: &str, ctx: &RequestContext) -> Result<Vec<TestCase>, LlmError> {
        let kind = ProviderKind::parse(&self.config.provider)?;
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                Message::text(Role::System, GENERATOR_PROMPT),
                Message::text(Role::System, format!("{USER_ROLE_PREFIX}{details}")),
            ],
            temperature: Some(self.config.temperature),
            ..ChatRequest::default()
        };

        let completion = self.gateway.complete(kind, &request, ctx).await?;
        let reply = strip_code_fence(completion.response.first_text());

        serde_json::from_str(reply).map_err(|e| {
            tracing::warn!(error = %e, "generated test cases are not valid JSON");
            LlmError::Upstream(format!("failed to parse generated test cases: {e}"))
        })
    }

    /// Run every (case, provider) pair; results are in case-major order
    async fn run(
        &self,
        prompt: &str,
        test_cases: &[TestCase],
        targets: &[TestProvider],
        credentials: &HashMap<ProviderKind, SecretString>,
        ctx: &RequestContext,
    ) -> Result<Vec<LlmResponse>, LlmError> {
        let permits = self.config.max_concurrency_per_provider.max(1);
        let semaphores: HashMap<ProviderKind, Arc<Semaphore>> = credentials
            .keys()
            .map(|kind| (*kind, Arc::new(Semaphore::new(permits))))
            .collect();

        let total = test_cases.len() * targets.len();
        let (tx, mut rx) = mpsc::channel(total);
        // aborted on drop, so an abandoned evaluation stops calling vendors
        let mut jobs = JoinSet::new();

        for (case_index, case) in test_cases.iter().enumerate() {
            for (target_index, target) in targets.iter().enumerate() {
                let slot = case_index * targets.len() + target_index;
                let job = Job {
                    gateway: Arc::clone(&self.gateway),
                    semaphore: Arc::clone(&semaphores[&target.provider]),
                    credential: credentials[&target.provider].clone(),
                    request: ChatRequest::from_prompt(&target.model, prompt, &case.question, target.temperature),
                    target: target.clone(),
                    assertion: case.assert.clone(),
                    ctx: ctx.clone(),
                };
                let tx = tx.clone();

                jobs.spawn(async move {
                    let result = job.run().await;
                    // the receiver outlives every job
                    let _ = tx.send((slot, result)).await;
                });
            }
        }
        drop(tx);

        let mut results: Vec<Option<LlmResponse>> = vec![None; total];
        while let Some((slot, result)) = rx.recv().await {
            results[slot] = Some(result);
        }

        results
            .into_iter()
            .map(|result| result.ok_or_else(|| LlmError::Internal(anyhow::anyhow!("evaluation task did not report"))))
            .collect()
    }
}

struct Job {
    gateway: Arc<Gateway>,
    semaphore: Arc<Semaphore>,
    credential: SecretString,
    request: ChatRequest,
    target: TestProvider,
    assertion: Assertion,
    ctx: RequestContext,
}

impl Job {
    async fn run(self) -> LlmResponse {
        let outcome = match self.semaphore.acquire().await {
            Ok(_permit) => match self.gateway.provider(self.target.provider) {
                Ok(provider) => {
                    self.gateway
                        .complete_with(provider.as_ref(), &self.credential, &self.request, &self.ctx)
                        .await
                }
                Err(e) => Err(e),
            },
            Err(_) => Err(LlmError::Cancelled),
        };

        let (status, status_reason, answer, cost) = match outcome {
            Ok(completion) => {
                let answer = completion.response.first_text().to_owned();
                let (status, reason) = self.assertion.check(&answer);
                (status, reason, answer, completion.response.cost)
            }
            Err(e) => {
                tracing::warn!(provider = %self.target.provider, model = %self.target.model, error = %e, "evaluation call failed");
                (false, format!("Failed to generate LLM response: {e}"), String::new(), 0.0)
            }
        };

        LlmResponse {
            provider: self.target.provider,
            model: self.target.model,
            temperature: self.target.temperature,
            status,
            status_reason,
            answer,
            cost,
        }
    }
}
