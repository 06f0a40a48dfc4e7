//! Consensus Engine
//!
//! Runs one consensus round: every model of the agent is queried in
//! parallel with its own retry loop, replies are parsed into decisions and
//! aggregated under the agent's quorum policy. The agreed decision is
//! recorded in every model's history.

use crate::config::RetryPolicy;
use crate::ports::conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger};
use crate::ports::model_gateway::ModelGateway;
use crate::use_cases::actor::ActorError;
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use quorum_domain::context::{build_conversation_messages, inject_field_prompts, update_token_usage};
use quorum_domain::{
    Action, AgentState, CacheControl, ConsensusRound, Decision, DomainError, FieldPrompts,
    HistoryEntry, Message, ModelId, ModelResponse, QueryOptions, QuorumPolicy, TimerToken,
    parse_decision,
};
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur during a consensus round
#[derive(Error, Debug)]
pub enum ConsensusError {
    #[error("No models configured")]
    NoModels,

    #[error("All models failed to respond")]
    AllModelsFailed,

    #[error("Quorum not reached: best agreement {best} of {total}, {required} required")]
    QuorumNotReached {
        best: usize,
        required: usize,
        total: usize,
    },

    #[error("Invalid decision: {0}")]
    InvalidDecision(String),

    #[error("Action dispatch failed: {0}")]
    Dispatch(#[from] ActorError),
}

impl ConsensusError {
    /// Whether running another round may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ConsensusError::AllModelsFailed
                | ConsensusError::QuorumNotReached { .. }
                | ConsensusError::InvalidDecision(_)
        )
    }
}

impl From<DomainError> for ConsensusError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NoModels => ConsensusError::NoModels,
            DomainError::AllModelsFailed => ConsensusError::AllModelsFailed,
            DomainError::QuorumNotReached {
                best,
                required,
                total,
            } => ConsensusError::QuorumNotReached {
                best,
                required,
                total,
            },
            DomainError::InvalidDecision(msg) | DomainError::InvalidModel(msg) => {
                ConsensusError::InvalidDecision(msg)
            }
        }
    }
}

/// Result of querying one model, after retries.
///
/// `discarded` holds replies that arrived but carried no usable decision;
/// their token usage is still accounted.
#[derive(Debug, Clone)]
pub enum ModelQueryOutcome {
    Decided {
        decision: Decision,
        response: ModelResponse,
        discarded: Vec<ModelResponse>,
    },
    Failed {
        model: ModelId,
        reason: String,
        discarded: Vec<ModelResponse>,
    },
}

impl ModelQueryOutcome {
    /// Every reply received from the gateway, usable or not.
    pub fn responses(&self) -> impl Iterator<Item = &ModelResponse> {
        let (decided, discarded) = match self {
            ModelQueryOutcome::Decided { response, discarded, .. } => (Some(response), discarded),
            ModelQueryOutcome::Failed { discarded, .. } => (None, discarded),
        };
        discarded.iter().chain(decided)
    }
}

/// Callbacks the engine uses to act on its decision.
///
/// The agent actor implements this; tests supply recording doubles.
#[async_trait]
pub trait ContinuationHooks: Send {
    /// Clean up the wait timer identified by `token`.
    fn cancel_timer(&mut self, state: &mut AgentState, token: TimerToken);

    /// Carry out the agreed action.
    async fn execute_action(&mut self, state: &mut AgentState, action: Action) -> Result<(), ActorError>;
}

/// Use case for running consensus rounds for one agent
pub struct ConsensusEngine {
    gateway: Arc<dyn ModelGateway>,
    policy: QuorumPolicy,
    retry: RetryPolicy,
    logger: Arc<dyn ConversationLogger>,
    test_mode: bool,
    rounds: u32,
}

impl ConsensusEngine {
    pub fn new(gateway: Arc<dyn ModelGateway>, policy: QuorumPolicy, retry: RetryPolicy) -> Self {
        Self {
            gateway,
            policy,
            retry,
            logger: Arc::new(NoConversationLogger),
            test_mode: false,
            rounds: 0,
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Rounds started so far.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Per-model request options. The caching hint is always set, in test and
    /// production mode alike.
    pub fn build_query_options(_model: &ModelId, base: &QueryOptions) -> QueryOptions {
        QueryOptions {
            cache_control: Some(CacheControl::Ephemeral),
            ..base.clone()
        }
    }

    fn assemble_messages(state: &AgentState, model: &ModelId) -> Vec<Message> {
        let prompts = FieldPrompts {
            system_prompt: state.system_prompt.clone(),
            user_prompt: None,
        };
        inject_field_prompts(build_conversation_messages(state, model), &prompts)
    }

    /// Query one model, retrying transient errors and unparseable replies.
    pub async fn query_single_model_with_retry(
        &self,
        state: &AgentState,
        model: &ModelId,
        options: &QueryOptions,
    ) -> ModelQueryOutcome {
        let messages = Self::assemble_messages(state, model);
        let mut last_error = String::from("no attempts made");
        let mut discarded = Vec::new();

        for attempt in 0..self.retry.max_attempts {
            if attempt > 0 {
                let delay = self.retry.delay_for(attempt - 1);
                debug!("Model {} retry {} after {:?}", model, attempt, delay);
                tokio::time::sleep(delay).await;
            }

            match self.gateway.query_model(model, &messages, options).await {
                Ok(response) => match parse_decision(&response.content) {
                    Ok(decision) => {
                        debug!("Model {} decided {}", model, decision.action);
                        return ModelQueryOutcome::Decided {
                            decision,
                            response,
                            discarded,
                        };
                    }
                    Err(e) => {
                        warn!("Model {} returned an unusable decision: {}", model, e);
                        last_error = e.to_string();
                        discarded.push(response);
                    }
                },
                Err(e) if e.is_transient() => {
                    warn!("Model {} failed (will retry after backoff): {}", model, e);
                    last_error = e.to_string();
                }
                Err(e) => {
                    warn!("Model {} failed: {}", model, e);
                    return ModelQueryOutcome::Failed {
                        model: model.clone(),
                        reason: e.to_string(),
                        discarded,
                    };
                }
            }
        }

        ModelQueryOutcome::Failed {
            model: model.clone(),
            reason: last_error,
            discarded,
        }
    }

    /// Run one full round and record the agreed decision on every model.
    pub async fn decide(&mut self, state: &mut AgentState) -> Result<Decision, ConsensusError> {
        if state.models.is_empty() {
            return Err(ConsensusError::NoModels);
        }

        self.rounds += 1;
        let round_no = self.rounds;
        let base = QueryOptions::default().with_test_mode(self.test_mode);
        let mut round = ConsensusRound::new(round_no, state.models.clone());
        let mut requests = Vec::with_capacity(state.models.len());
        for model in &state.models {
            let options = Self::build_query_options(model, &base);
            round = round.with_options(model.clone(), options.clone());
            requests.push((model.clone(), options));
        }

        info!(
            agent_id = %state.agent_id,
            round = round_no,
            "Consensus round {} across {} models",
            round_no,
            requests.len()
        );

        // Replies are collected in arrival order; that order feeds tie-breaking.
        let outcomes: Vec<ModelQueryOutcome> = {
            let snapshot: &AgentState = state;
            let mut pending: FuturesUnordered<_> = requests
                .iter()
                .map(|(model, options)| self.query_single_model_with_retry(snapshot, model, options))
                .collect();
            let mut outcomes = Vec::with_capacity(requests.len());
            while let Some(outcome) = pending.next().await {
                outcomes.push(outcome);
            }
            outcomes
        };

        for outcome in outcomes {
            for response in outcome.responses() {
                update_token_usage(state, response);
            }
            match outcome {
                ModelQueryOutcome::Decided { decision, response, .. } => {
                    round.record_decision(response.model, decision);
                }
                ModelQueryOutcome::Failed { model, reason, .. } => {
                    debug!("Model {} excluded from round {}: {}", model, round_no, reason);
                    round.record_failure(model);
                }
            }
        }

        let result = round.conclude(&self.policy);
        self.logger.log(ConversationEvent::new(
            "consensus_round",
            json!({
                "agent_id": state.agent_id.as_str(),
                "round": serde_json::to_value(&round).unwrap_or(Value::Null),
            }),
        ));

        let agreement = match result {
            Ok(agreement) => agreement,
            Err(e) => {
                warn!(
                    agent_id = %state.agent_id,
                    round = round_no,
                    "Round {} failed: {} ({} responded, {} failed)",
                    round_no,
                    e,
                    round.responded(),
                    round.failed.len()
                );
                return Err(e.into());
            }
        };

        info!(
            agent_id = %state.agent_id,
            round = round_no,
            "Consensus on '{}' ({}/{} models)",
            agreement.decision.action,
            agreement.agreeing(),
            agreement.total
        );
        state.append_to_all(HistoryEntry::decision(agreement.decision.clone()));
        Ok(agreement.decision)
    }

    /// Continuation after the wait timer `token` fired.
    ///
    /// Cancels the timer through `hooks`, marks the timeout in every history,
    /// then decides and executes. Context assembly happens inside [`decide`](Self::decide).
    pub async fn handle_wait_timeout<H: ContinuationHooks>(
        &mut self,
        state: &mut AgentState,
        token: TimerToken,
        hooks: &mut H,
    ) -> Result<Decision, ConsensusError> {
        hooks.cancel_timer(state, token);
        state.append_to_all(HistoryEntry::wait_timeout(token));
        self.decide_and_execute(state, hooks).await
    }

    /// Continuation triggered by anything other than a timer.
    pub async fn handle_consensus_continuation<H: ContinuationHooks>(
        &mut self,
        state: &mut AgentState,
        hooks: &mut H,
    ) -> Result<Decision, ConsensusError> {
        self.decide_and_execute(state, hooks).await
    }

    async fn decide_and_execute<H: ContinuationHooks>(
        &mut self,
        state: &mut AgentState,
        hooks: &mut H,
    ) -> Result<Decision, ConsensusError> {
        let decision = self.decide(state).await?;
        let action = decision.to_action()?;
        self.logger.log(ConversationEvent::new(
            "action_dispatched",
            json!({
                "agent_id": state.agent_id.as_str(),
                "action": decision.action,
                "params": decision.params,
            }),
        ));
        hooks.execute_action(state, action).await?;
        Ok(decision)
    }
}
