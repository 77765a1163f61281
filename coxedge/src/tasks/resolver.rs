//! Await a submitted task until it reaches a terminal state
//!
//! Each [`TaskResolver::await_task`] call runs its own strictly sequential
//! polling loop:
//!
//! 1. stop if the context was cancelled or its deadline passed
//! 2. stop with [`TaskError::Timeout`] once the attempt or duration bound is hit
//! 3. query the task status
//! 4. SUCCESS resolves, FAILED fails immediately, anything else keeps polling
//! 5. sleep one poll interval (or whatever is left of the duration bound)
//!
//! Transient query errors are retried in place until
//! `max_consecutive_errors` of them happen in a row. A 404 from the status
//! endpoint and any other query error end the wait straight away.

use super::{TaskError, TaskId, TaskResult, TaskState, TaskStatusSource};
use crate::context::Context;
use std::time::Duration;
use tokio::time::{self, Instant};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(600);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 300;
pub const DEFAULT_MAX_CONSECUTIVE_ERRORS: u32 = 3;

/// Floor for the poll interval; a zero interval would spin.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwaitConfig {
    pub poll_interval: Duration,
    pub max_wait: Duration,
    pub max_attempts: u32,
    pub max_consecutive_errors: u32,
}

impl Default for AwaitConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_ERRORS,
        }
    }
}

impl AwaitConfig {
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_max_consecutive_errors(mut self, max_consecutive_errors: u32) -> Self {
        self.max_consecutive_errors = max_consecutive_errors;
        self
    }

    /// Raise or lower `max_attempts` so polling can run for all of
    /// `max_wait` at the configured interval.
    pub fn with_attempts_for_max_wait(mut self) -> Self {
        let interval = self.effective_poll_interval().as_millis().max(1);
        let attempts = self.max_wait.as_millis().div_ceil(interval) + 1;
        self.max_attempts = u32::try_from(attempts).unwrap_or(u32::MAX);
        self
    }

    fn effective_poll_interval(&self) -> Duration {
        self.poll_interval.max(MIN_POLL_INTERVAL)
    }
}

pub struct TaskResolver<S> {
    source: S,
    config: AwaitConfig,
}

impl<S: TaskStatusSource> TaskResolver<S> {
    /// Resolver using the provider-wide defaults
    pub fn new(source: S) -> Self {
        Self::with_config(source, AwaitConfig::default())
    }

    pub fn with_config(source: S, config: AwaitConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &AwaitConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Poll `task_id` until it resolves, fails, runs out of bounds, or `ctx`
    /// is cancelled.
    pub async fn await_task(
        &self,
        ctx: &Context,
        task_id: &TaskId,
    ) -> Result<TaskResult, TaskError> {
        if task_id.is_empty() {
            return Err(TaskError::EmptyTaskId);
        }

        let started = Instant::now();
        let mut deadline = started + self.config.max_wait;
        if let Some(ctx_deadline) = ctx.deadline() {
            deadline = deadline.min(ctx_deadline);
        }
        let poll_interval = self.config.effective_poll_interval();
        let max_errors = self.config.max_consecutive_errors.max(1);

        let mut attempts: u32 = 0;
        let mut consecutive_errors: u32 = 0;

        loop {
            if ctx.is_cancelled() {
                return Err(interrupted(ctx, task_id, attempts, started));
            }

            if attempts >= self.config.max_attempts || Instant::now() >= deadline {
                return Err(timed_out(task_id, attempts, started));
            }

            attempts += 1;
            let queried = tokio::select! {
                biased;
                _ = ctx.cancelled() => return Err(interrupted(ctx, task_id, attempts, started)),
                _ = time::sleep_until(deadline) => return Err(timed_out(task_id, attempts, started)),
                queried = self.source.task_status(task_id) => queried,
            };

            match queried {
                Ok(status) => {
                    consecutive_errors = 0;
                    match status.status {
                        TaskState::Success => {
                            tracing::info!(
                                "Task {} succeeded after {} status checks",
                                task_id,
                                attempts
                            );
                            return Ok(TaskResult {
                                task_id: task_id.clone(),
                                data: status.data.unwrap_or_default(),
                            });
                        }
                        TaskState::Failed => {
                            let message = status
                                .message
                                .filter(|m| !m.is_empty())
                                .unwrap_or_else(|| "task failed without a message".to_string());
                            tracing::info!("Task {} failed: {}", task_id, message);
                            return Err(TaskError::Failed {
                                task_id: task_id.clone(),
                                message,
                            });
                        }
                        state => {
                            tracing::debug!(
                                "Task {} is {} (status check {})",
                                task_id,
                                state,
                                attempts
                            );
                        }
                    }
                }
                Err(e) if e.is_not_found() => {
                    return Err(TaskError::NotFound {
                        task_id: task_id.clone(),
                    });
                }
                Err(e) if e.is_transient() => {
                    consecutive_errors += 1;
                    tracing::warn!(
                        "Status check {} for task {} failed ({}/{} consecutive): {}",
                        attempts,
                        task_id,
                        consecutive_errors,
                        max_errors,
                        e
                    );
                    if consecutive_errors >= max_errors {
                        return Err(TaskError::Unavailable {
                            task_id: task_id.clone(),
                            errors: consecutive_errors,
                            source: e,
                        });
                    }
                }
                Err(e) => {
                    return Err(TaskError::Query {
                        task_id: task_id.clone(),
                        source: e,
                    });
                }
            }

            let pause = poll_interval.min(deadline.saturating_duration_since(Instant::now()));
            tokio::select! {
                biased;
                _ = ctx.cancelled() => return Err(interrupted(ctx, task_id, attempts, started)),
                _ = time::sleep(pause) => {}
            }
        }
    }
}

fn timed_out(task_id: &TaskId, attempts: u32, started: Instant) -> TaskError {
    tracing::warn!(
        "Gave up waiting for task {} after {} status checks",
        task_id,
        attempts
    );
    TaskError::Timeout {
        task_id: task_id.clone(),
        attempts,
        elapsed: started.elapsed(),
    }
}

/// Outcome for a context that finished underneath the loop: a deadline that
/// passed is a timeout, anything else a cancellation.
fn interrupted(ctx: &Context, task_id: &TaskId, attempts: u32, started: Instant) -> TaskError {
    if ctx.deadline_exceeded() {
        TaskError::Timeout {
            task_id: task_id.clone(),
            attempts,
            elapsed: started.elapsed(),
        }
    } else {
        tracing::info!("Stopped waiting for task {}: cancelled", task_id);
        TaskError::Cancelled {
            task_id: task_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::tasks::{TaskErrorKind, TaskStatus};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    enum Step {
        Status(&'static str, Option<Value>, Option<&'static str>),
        Transient,
        NotFound,
        Unauthorized,
    }

    fn pending() -> Step {
        Step::Status("PENDING", None, None)
    }

    fn running() -> Step {
        Step::Status("RUNNING", None, None)
    }

    fn success(data: Value) -> Step {
        Step::Status("SUCCESS", Some(data), None)
    }

    fn failed(message: &'static str) -> Step {
        Step::Status("FAILED", None, Some(message))
    }

    /// Replays scripted steps; the last one repeats forever.
    struct ScriptedSource {
        steps: Mutex<VecDeque<Step>>,
        last: Mutex<Option<Step>>,
        queries: Mutex<Vec<Instant>>,
        response_delay: Duration,
    }

    impl ScriptedSource {
        fn new(steps: Vec<Step>) -> Arc<Self> {
            Self::with_delay(steps, Duration::ZERO)
        }

        fn with_delay(steps: Vec<Step>, response_delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into()),
                last: Mutex::new(None),
                queries: Mutex::new(Vec::new()),
                response_delay,
            })
        }

        fn query_times(&self) -> Vec<Instant> {
            self.queries.lock().unwrap().clone()
        }

        fn query_count(&self) -> usize {
            self.queries.lock().unwrap().len()
        }

        fn next_step(&self) -> Result<TaskStatus, ApiError> {
            let mut steps = self.steps.lock().unwrap();
            let mut last = self.last.lock().unwrap();
            if let Some(step) = steps.pop_front() {
                *last = Some(step);
            }
            match last.as_ref().expect("script must not be empty") {
                Step::Status(state, data, message) => Ok(TaskStatus {
                    id: "t-1".to_string(),
                    status: state.to_string().into(),
                    data: data.clone(),
                    message: message.map(str::to_string),
                }),
                Step::Transient => Err(ApiError::ServiceUnavailable),
                Step::NotFound => Err(ApiError::ApiError {
                    status: 404,
                    message: "no such task".to_string(),
                    details: None,
                }),
                Step::Unauthorized => Err(ApiError::AuthError),
            }
        }
    }

    #[async_trait]
    impl TaskStatusSource for ScriptedSource {
        async fn task_status(&self, _task_id: &TaskId) -> Result<TaskStatus, ApiError> {
            self.queries.lock().unwrap().push(Instant::now());
            if !self.response_delay.is_zero() {
                time::sleep(self.response_delay).await;
            }
            self.next_step()
        }
    }

    fn config() -> AwaitConfig {
        AwaitConfig::default()
            .with_poll_interval(Duration::from_secs(2))
            .with_max_wait(Duration::from_secs(60))
            .with_max_attempts(100)
            .with_max_consecutive_errors(3)
    }

    fn resolver(source: &Arc<ScriptedSource>) -> TaskResolver<Arc<ScriptedSource>> {
        TaskResolver::with_config(source.clone(), config())
    }

    #[test]
    fn default_config_matches_provider_defaults() {
        let config = AwaitConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.max_wait, Duration::from_secs(600));
        assert_eq!(config.max_attempts, 300);
        assert_eq!(config.max_consecutive_errors, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_after_pending_polls_spaced_by_interval() {
        let source = ScriptedSource::new(vec![
            pending(),
            pending(),
            success(json!({"id": "fw-42"})),
        ]);

        let result = resolver(&source)
            .await_task(&Context::new(), &"t-1".into())
            .await
            .unwrap();

        assert_eq!(result.data, json!({"id": "fw-42"}));
        assert_eq!(result.resource_id(), Some("fw-42"));

        let times = source.query_times();
        assert_eq!(times.len(), 3);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(2));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn running_twice_then_success_yields_payload() {
        let source = ScriptedSource::new(vec![
            running(),
            running(),
            success(json!({"id": "fw-42"})),
        ]);

        let result = resolver(&source)
            .await_task(&Context::new(), &"t-1".into())
            .await
            .unwrap();

        assert_eq!(result.task_id.as_str(), "t-1");
        assert_eq!(result.data, json!({"id": "fw-42"}));
    }

    #[tokio::test(start_paused = true)]
    async fn remote_failure_is_returned_immediately() {
        let source = ScriptedSource::new(vec![failed("quota exceeded"), success(json!({}))]);

        let err = resolver(&source)
            .await_task(&Context::new(), &"t-1".into())
            .await
            .unwrap_err();

        match err {
            TaskError::Failed { message, .. } => assert_eq!(message, "quota exceeded"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(source.query_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_after_progress_stops_polling() {
        let source = ScriptedSource::new(vec![running(), failed("disk full"), running()]);

        let err = resolver(&source)
            .await_task(&Context::new(), &"t-1".into())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), TaskErrorKind::RemoteFailure);
        assert_eq!(source.query_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_without_message_gets_placeholder() {
        let source = ScriptedSource::new(vec![Step::Status("FAILED", None, None)]);

        let err = resolver(&source)
            .await_task(&Context::new(), &"t-1".into())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("task failed without a message"));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_states_keep_polling() {
        let source = ScriptedSource::new(vec![
            Step::Status("QUEUED", None, None),
            Step::Status("PROVISIONING", None, None),
            success(json!({"id": "sc-1"})),
        ]);

        let result = resolver(&source)
            .await_task(&Context::new(), &"t-1".into())
            .await
            .unwrap();

        assert_eq!(result.resource_id(), Some("sc-1"));
        assert_eq!(source.query_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn max_wait_bounds_polling() {
        let source = ScriptedSource::new(vec![running()]);
        let resolver = TaskResolver::with_config(
            source.clone(),
            config().with_max_wait(Duration::from_secs(7)),
        );
        let started = Instant::now();

        let err = resolver
            .await_task(&Context::new(), &"t-1".into())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), TaskErrorKind::Timeout);
        // Queries at 0s, 2s, 4s and 6s; the bound hits at 7s.
        assert_eq!(source.query_count(), 4);
        let bound = started + Duration::from_secs(7);
        assert!(source.query_times().iter().all(|t| *t < bound));
        assert!(started.elapsed() < Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn max_wait_cuts_off_a_slow_query() {
        let source = ScriptedSource::with_delay(vec![running()], Duration::from_secs(30));
        let resolver = TaskResolver::with_config(
            source.clone(),
            config().with_max_wait(Duration::from_secs(7)),
        );
        let started = Instant::now();

        let err = resolver
            .await_task(&Context::new(), &"t-1".into())
            .await
            .unwrap_err();

        match err {
            TaskError::Timeout { attempts, elapsed, .. } => {
                assert_eq!(attempts, 1);
                assert_eq!(elapsed, Duration::from_secs(7));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(started.elapsed(), Duration::from_secs(7));
        assert_eq!(source.query_count(), 1);
    }

    #[test]
    fn attempts_follow_max_wait_and_interval() {
        let config = AwaitConfig::default()
            .with_max_wait(Duration::from_secs(3600))
            .with_attempts_for_max_wait();
        assert_eq!(config.max_attempts, 1801);

        let config = AwaitConfig::default()
            .with_poll_interval(Duration::from_secs(3))
            .with_max_wait(Duration::from_secs(10))
            .with_attempts_for_max_wait();
        assert_eq!(config.max_attempts, 5);

        let config = AwaitConfig::default()
            .with_poll_interval(Duration::ZERO)
            .with_max_wait(Duration::from_secs(1))
            .with_attempts_for_max_wait();
        assert_eq!(config.max_attempts, 21);
    }

    #[tokio::test(start_paused = true)]
    async fn max_attempts_bounds_polling() {
        let source = ScriptedSource::new(vec![pending()]);
        let resolver =
            TaskResolver::with_config(source.clone(), config().with_max_attempts(5));

        let err = resolver
            .await_task(&Context::new(), &"t-1".into())
            .await
            .unwrap_err();

        match err {
            TaskError::Timeout { attempts, .. } => assert_eq!(attempts, 5),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(source.query_count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn context_deadline_tightens_the_bound() {
        let source = ScriptedSource::new(vec![running()]);
        let ctx = Context::with_timeout(Duration::from_secs(5));

        let err = resolver(&source)
            .await_task(&ctx, &"t-1".into())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), TaskErrorKind::Timeout);
        assert_eq!(source.query_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_while_sleeping_returns_promptly() {
        let source = ScriptedSource::new(vec![running()]);
        let ctx = Context::new();
        let resolver = resolver(&source);

        let handle = tokio::spawn({
            let ctx = ctx.clone();
            async move { resolver.await_task(&ctx, &"t-1".into()).await }
        });

        // Polls at 0s and 2s, then sleeping towards 4s.
        time::sleep(Duration::from_millis(2500)).await;
        ctx.cancel();
        let cancelled_at = Instant::now();

        let err = handle.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
        assert!(cancelled_at.elapsed() <= Duration::from_secs(2));
        assert_eq!(source.query_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_in_flight_query() {
        let source = ScriptedSource::with_delay(vec![running()], Duration::from_secs(30));
        let ctx = Context::new();
        let resolver = resolver(&source);

        let handle = tokio::spawn({
            let ctx = ctx.clone();
            async move { resolver.await_task(&ctx, &"t-1".into()).await }
        });

        time::sleep(Duration::from_secs(1)).await;
        ctx.cancel();
        let cancelled_at = Instant::now();

        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), TaskErrorKind::Cancelled);
        assert!(cancelled_at.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn already_cancelled_context_issues_no_queries() {
        let source = ScriptedSource::new(vec![success(json!({}))]);
        let ctx = Context::new();
        ctx.cancel();

        let err = resolver(&source)
            .await_task(&ctx, &"t-1".into())
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(source.query_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_below_bound_are_absorbed() {
        let source = ScriptedSource::new(vec![
            Step::Transient,
            Step::Transient,
            running(),
            Step::Transient,
            Step::Transient,
            success(json!({"id": "fw-1"})),
        ]);

        let result = resolver(&source)
            .await_task(&Context::new(), &"t-1".into())
            .await
            .unwrap();

        assert_eq!(result.resource_id(), Some("fw-1"));
        assert_eq!(source.query_count(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_at_bound_escalate_to_unavailable() {
        let source = ScriptedSource::new(vec![
            running(),
            Step::Transient,
            Step::Transient,
            Step::Transient,
            success(json!({})),
        ]);

        let err = resolver(&source)
            .await_task(&Context::new(), &"t-1".into())
            .await
            .unwrap_err();

        match err {
            TaskError::Unavailable { errors, .. } => assert_eq!(errors, 3),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(source.query_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_still_wait_between_polls() {
        let source = ScriptedSource::new(vec![Step::Transient, Step::Transient, success(json!({}))]);

        resolver(&source)
            .await_task(&Context::new(), &"t-1".into())
            .await
            .unwrap();

        let times = source.query_times();
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(2));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_task_is_terminal() {
        let source = ScriptedSource::new(vec![Step::NotFound]);

        let err = resolver(&source)
            .await_task(&Context::new(), &"t-404".into())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), TaskErrorKind::NotFound);
        assert_eq!(source.query_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn non_transient_query_errors_are_terminal() {
        let source = ScriptedSource::new(vec![Step::Unauthorized]);

        let err = resolver(&source)
            .await_task(&Context::new(), &"t-1".into())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), TaskErrorKind::Query);
        assert_eq!(source.query_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_task_id_is_rejected_without_polling() {
        let source = ScriptedSource::new(vec![success(json!({}))]);

        let err = resolver(&source)
            .await_task(&Context::new(), &"".into())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), TaskErrorKind::InvalidTaskId);
        assert_eq!(source.query_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn awaiting_a_terminal_task_twice_is_stable() {
        let source = ScriptedSource::new(vec![success(json!({"id": "fw-42"}))]);
        let resolver = resolver(&source);
        let ctx = Context::new();

        let first = resolver.await_task(&ctx, &"t-1".into()).await.unwrap();
        let second = resolver.await_task(&ctx, &"t-1".into()).await.unwrap();
        assert_eq!(first, second);

        let failing = ScriptedSource::new(vec![failed("quota exceeded")]);
        let resolver = TaskResolver::with_config(failing, config());
        let first = resolver.await_task(&ctx, &"t-2".into()).await.unwrap_err();
        let second = resolver.await_task(&ctx, &"t-2".into()).await.unwrap_err();
        assert_eq!(first.to_string(), second.to_string());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_poll_interval_does_not_spin() {
        let source = ScriptedSource::new(vec![pending(), pending(), success(json!({}))]);
        let resolver = TaskResolver::with_config(
            source.clone(),
            config().with_poll_interval(Duration::ZERO),
        );

        resolver
            .await_task(&Context::new(), &"t-1".into())
            .await
            .unwrap();

        let times = source.query_times();
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= MIN_POLL_INTERVAL);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn independent_tasks_resolve_concurrently() {
        let slow = ScriptedSource::new(vec![running(), running(), success(json!({"id": "a"}))]);
        let fast = ScriptedSource::new(vec![success(json!({"id": "b"}))]);
        let slow_resolver = resolver(&slow);
        let fast_resolver = resolver(&fast);
        let ctx = Context::new();
        let started = Instant::now();

        let (a, b) = futures::future::join(
            slow_resolver.await_task(&ctx, &"t-a".into()),
            fast_resolver.await_task(&ctx, &"t-b".into()),
        )
        .await;

        assert_eq!(a.unwrap().resource_id(), Some("a"));
        assert_eq!(b.unwrap().resource_id(), Some("b"));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
