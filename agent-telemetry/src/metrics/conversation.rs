//! Conversation-oriented metrics for chat agents.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::operation::{Operations, Stamp};
use super::{ratio, Gate, OperationSnapshot, OutcomeMetrics, OutcomeSample};

/// Messages exchanged during one conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageCounts {
    /// Messages written by the user.
    pub user: u64,
    /// Messages written by the agent.
    pub agent: u64,
}

impl MessageCounts {
    /// A single user message answered by a single agent message.
    pub const EXCHANGE: Self = Self { user: 1, agent: 1 };

    const fn total(self) -> u64 {
        self.user + self.agent
    }
}

/// Metrics for agents that hold conversations.
///
/// When driven by the runtime, every submitted task counts as one
/// conversation made of a single [`MessageCounts::EXCHANGE`].
#[derive(Debug)]
pub struct ConversationMetrics {
    gate: Gate,
    operations: Operations,
    started: AtomicU64,
    completed: AtomicU64,
    abandoned: AtomicU64,
    active: AtomicU64,
    max_concurrent: AtomicU64,
    messages: AtomicU64,
    user_messages: AtomicU64,
    agent_messages: AtomicU64,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    last_started: Stamp,
    last_ended: Stamp,
}

impl Default for ConversationMetrics {
    fn default() -> Self {
        Self {
            gate: Gate::default(),
            operations: Operations::default(),
            started: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            abandoned: AtomicU64::new(0),
            active: AtomicU64::new(0),
            max_concurrent: AtomicU64::new(0),
            messages: AtomicU64::new(0),
            user_messages: AtomicU64::new(0),
            agent_messages: AtomicU64::new(0),
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
            last_started: Stamp::empty(),
            last_ended: Stamp::empty(),
        }
    }
}

impl ConversationMetrics {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a conversation and updates the concurrency high-water mark.
    pub fn record_conversation_started(&self) {
        let _gate = self.gate.shared();
        self.open();
    }

    /// Closes a conversation that ran to completion.
    pub fn record_conversation_completed(&self, messages: MessageCounts) {
        let _gate = self.gate.shared();
        self.complete(messages);
    }

    /// Closes a conversation that was given up.
    pub fn record_conversation_abandoned(&self) {
        let _gate = self.gate.shared();
        self.abandon();
    }

    /// Records a processed message and its token usage.
    pub fn record_message_processed(&self, elapsed: Duration, input_tokens: u64, output_tokens: u64) {
        let _gate = self.gate.shared();
        self.processed(elapsed, input_tokens, output_tokens);
    }

    /// Records a message that failed to process.
    pub fn record_message_failed(&self, elapsed: Duration, input_tokens: u64) {
        let _gate = self.gate.shared();
        self.message_failed(elapsed, input_tokens);
    }

    fn open(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
        let active = self.active.fetch_add(1, Ordering::Relaxed) + 1;
        self.max_concurrent.fetch_max(active, Ordering::Relaxed);
        self.last_started.mark_now();
    }

    fn complete(&self, messages: MessageCounts) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.messages.fetch_add(messages.total(), Ordering::Relaxed);
        self.user_messages.fetch_add(messages.user, Ordering::Relaxed);
        self.agent_messages.fetch_add(messages.agent, Ordering::Relaxed);
        self.close();
    }

    fn abandon(&self) {
        self.abandoned.fetch_add(1, Ordering::Relaxed);
        self.close();
    }

    fn processed(&self, elapsed: Duration, input_tokens: u64, output_tokens: u64) {
        self.operations.succeeded(elapsed);
        self.input_tokens.fetch_add(input_tokens, Ordering::Relaxed);
        self.output_tokens.fetch_add(output_tokens, Ordering::Relaxed);
    }

    fn message_failed(&self, elapsed: Duration, input_tokens: u64) {
        self.operations.failed(elapsed);
        self.input_tokens.fetch_add(input_tokens, Ordering::Relaxed);
    }

    fn close(&self) {
        let _ = self
            .active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some(n.saturating_sub(1)));
        self.last_ended.mark_now();
    }
}

impl OutcomeMetrics for ConversationMetrics {
    type Snapshot = ConversationSnapshot;

    fn record_started(&self) {
        let _gate = self.gate.shared();
        self.operations.started();
        self.open();
    }

    fn record_succeeded(&self, sample: &OutcomeSample) {
        let _gate = self.gate.shared();
        self.processed(sample.elapsed, sample.input_size, sample.output_size);
        self.complete(MessageCounts::EXCHANGE);
    }

    fn record_failed(&self, sample: &OutcomeSample) {
        let _gate = self.gate.shared();
        self.message_failed(sample.elapsed, sample.input_size);
        self.abandon();
    }

    fn reset(&self) {
        let _gate = self.gate.exclusive();
        self.operations.reset();
        for counter in [
            &self.started,
            &self.completed,
            &self.abandoned,
            &self.active,
            &self.max_concurrent,
            &self.messages,
            &self.user_messages,
            &self.agent_messages,
            &self.input_tokens,
            &self.output_tokens,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.last_started.clear();
        self.last_ended.clear();
        debug!("conversation metrics reset");
    }

    fn snapshot(&self) -> ConversationSnapshot {
        let _gate = self.gate.exclusive();
        ConversationSnapshot {
            operations: self.operations.snapshot(),
            started: self.started.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            active: self.active.load(Ordering::Relaxed),
            max_concurrent: self.max_concurrent.load(Ordering::Relaxed),
            messages: self.messages.load(Ordering::Relaxed),
            user_messages: self.user_messages.load(Ordering::Relaxed),
            agent_messages: self.agent_messages.load(Ordering::Relaxed),
            input_tokens: self.input_tokens.load(Ordering::Relaxed),
            output_tokens: self.output_tokens.load(Ordering::Relaxed),
            last_started_at: self.last_started.get(),
            last_ended_at: self.last_ended.get(),
        }
    }

    fn operations(&self) -> OperationSnapshot {
        let _gate = self.gate.exclusive();
        self.operations.snapshot()
    }
}

/// Point-in-time view of [`ConversationMetrics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationSnapshot {
    /// Shared operation counters.
    pub operations: OperationSnapshot,
    /// Conversations opened.
    pub started: u64,
    /// Conversations that ran to completion.
    pub completed: u64,
    /// Conversations given up.
    pub abandoned: u64,
    /// Conversations currently open.
    pub active: u64,
    /// Highest number of simultaneously open conversations.
    pub max_concurrent: u64,
    /// Messages in completed conversations.
    pub messages: u64,
    /// User messages in completed conversations.
    pub user_messages: u64,
    /// Agent messages in completed conversations.
    pub agent_messages: u64,
    /// Input tokens consumed.
    pub input_tokens: u64,
    /// Output tokens produced.
    pub output_tokens: u64,
    /// When the most recent conversation opened.
    pub last_started_at: Option<DateTime<Utc>>,
    /// When the most recent conversation closed.
    pub last_ended_at: Option<DateTime<Utc>>,
}

impl ConversationSnapshot {
    /// Input plus output tokens.
    #[must_use]
    pub const fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// `completed / started`.
    #[must_use]
    pub fn completion_rate(&self) -> f64 {
        ratio(self.completed, self.started)
    }

    /// `abandoned / started`.
    #[must_use]
    pub fn abandonment_rate(&self) -> f64 {
        ratio(self.abandoned, self.started)
    }

    /// Mean messages per completed conversation.
    #[must_use]
    pub fn average_messages_per_conversation(&self) -> f64 {
        ratio(self.messages, self.completed)
    }

    /// Mean input tokens per message.
    #[must_use]
    pub fn average_input_tokens_per_message(&self) -> f64 {
        ratio(self.input_tokens, self.messages)
    }

    /// Mean output tokens per message.
    #[must_use]
    pub fn average_output_tokens_per_message(&self) -> f64 {
        ratio(self.output_tokens, self.messages)
    }
}

impl fmt::Display for ConversationSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "conversations={}(started),{}(completed),{}(abandoned), completionRate={:.2}%, \
             active={}, maxConcurrent={}, messages={}(user:{},agent:{}), tokens={}(in:{},out:{}), \
             processed={}, successRate={:.2}%",
            self.started,
            self.completed,
            self.abandoned,
            self.completion_rate() * 100.0,
            self.active,
            self.max_concurrent,
            self.messages,
            self.user_messages,
            self.agent_messages,
            self.total_tokens(),
            self.input_tokens,
            self.output_tokens,
            self.operations.processed,
            self.operations.success_rate() * 100.0,
        )
    }
}
