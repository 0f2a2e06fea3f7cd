/// Scenario tests for the dual-slot orchestrator.
///
/// These exercise whole runs against a scripted backend:
/// 1. Both slots settle independently, each tagged with its own language
/// 2. Incomplete input dispatches nothing at all
/// 3. Per-slot failures stay on their slot
/// 4. A slow slot never holds back or corrupts the other one
/// 5. Re-runs start from a clean aggregator
/// 6. A run dropped mid-flight leaves no slot stuck in flight

#[cfg(test)]
mod scenarios {
    use crate::client::{ExecutionBackend, RemoteExecutionClient, TRANSPORT_FAILURE_MESSAGE};
    use crate::config::ArenaConfig;
    use crate::error::ArenaError;
    use crate::orchestrator::{Orchestrator, INVALID_LANGUAGE_MESSAGE};
    use crate::request::ExecutionPayload;
    use crate::slot::{SlotState, SlotStatus};
    use crate::types::{ExecutionResult, Language, SlotId, SlotInput, SlotPair};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::Semaphore;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const WAIT: Duration = Duration::from_secs(5);

    /// Backend that echoes the code back as output.
    /// Languages can be held behind a gate or delayed.
    #[derive(Default)]
    struct ScriptedBackend {
        started: AtomicUsize,
        calls: Mutex<Vec<Language>>,
        gates: HashMap<Language, Arc<Semaphore>>,
        delays: HashMap<Language, Duration>,
        failing: Vec<Language>,
    }

    impl ScriptedBackend {
        fn gated(language: Language) -> (Self, Arc<Semaphore>) {
            let gate = Arc::new(Semaphore::new(0));
            let backend = Self {
                gates: HashMap::from([(language, gate.clone())]),
                ..Default::default()
            };
            (backend, gate)
        }

        fn calls(&self) -> Vec<Language> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ExecutionBackend for ScriptedBackend {
        async fn execute(&self, payload: &ExecutionPayload) -> ExecutionResult {
            self.started.fetch_add(1, Ordering::SeqCst);
            self.calls.lock().unwrap().push(payload.language);

            if let Some(gate) = self.gates.get(&payload.language) {
                gate.acquire().await.unwrap().forget();
            }
            if let Some(delay) = self.delays.get(&payload.language) {
                tokio::time::sleep(*delay).await;
            }

            let success = !self.failing.contains(&payload.language);
            ExecutionResult {
                language: payload.language.value().to_string(),
                output: String::from_utf8_lossy(&payload.code).into_owned(),
                success,
                execution_time: Some(0.01),
                error: (!success).then(|| "exit status 1".to_string()),
                ..Default::default()
            }
        }
    }

    fn python() -> SlotInput {
        SlotInput::new("print(1)", "python")
    }

    fn rust() -> SlotInput {
        SlotInput::new("fn main() { println!(\"1\"); }", "rust")
    }

    async fn wait_terminal<B: ExecutionBackend>(orchestrator: &Orchestrator<B>, slot: SlotId) {
        let mut rx = orchestrator.results().subscribe(slot);
        tokio::time::timeout(WAIT, rx.wait_for(|state| state.is_terminal()))
            .await
            .expect("slot did not settle in time")
            .unwrap();
    }

    #[tokio::test]
    async fn test_both_slots_complete_with_their_own_language() {
        let orchestrator = Orchestrator::new(ScriptedBackend::default());

        let report = orchestrator.run(python(), rust()).await.unwrap();

        assert!(report.results.first.success);
        assert_eq!(report.results.first.language, "python");
        assert_eq!(report.results.second.language, "rust");
        assert!(report.finished_at >= report.started_at);

        let slots = orchestrator.results().snapshot();
        assert_eq!(slots.first, SlotState::Completed(report.results.first.clone()));
        assert_eq!(slots.second, SlotState::Completed(report.results.second.clone()));
        assert!(orchestrator.results().all_terminal());
        assert!(!orchestrator.is_executing());
        assert_eq!(orchestrator.snapshot().run_id, Some(report.run_id));
    }

    #[tokio::test]
    async fn test_empty_snippet_dispatches_nothing() {
        let orchestrator = Orchestrator::new(ScriptedBackend::default());

        let err = orchestrator
            .run(python(), SlotInput::new("", "rust"))
            .await
            .unwrap_err();

        assert!(matches!(err, ArenaError::IncompleteInput));
        assert!(orchestrator.backend_calls().is_empty());
        assert_eq!(
            orchestrator.results().snapshot(),
            SlotPair::new(SlotState::Idle, SlotState::Idle)
        );
        assert!(!orchestrator.is_executing());
        // a rejected request never gets a run id
        assert_eq!(orchestrator.snapshot().run_id, None);
    }

    #[tokio::test]
    async fn test_incomplete_input_clears_previous_results() {
        let orchestrator = Orchestrator::new(ScriptedBackend::default());
        orchestrator.run(python(), rust()).await.unwrap();

        let err = orchestrator
            .run(SlotInput::new("", "python"), rust())
            .await
            .unwrap_err();

        assert!(matches!(err, ArenaError::IncompleteInput));
        assert!(orchestrator.results().result(SlotId::First).is_none());
        assert!(orchestrator.results().result(SlotId::Second).is_none());
        assert_eq!(orchestrator.snapshot().run_id, None);
        // only the first run reached the backend
        assert_eq!(orchestrator.backend_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_unsupported_language_fails_only_its_slot() {
        let orchestrator = Orchestrator::new(ScriptedBackend::default());

        let report = orchestrator
            .run(SlotInput::new("PRINT 1", "basic"), rust())
            .await
            .unwrap();

        let first = &report.results.first;
        assert!(!first.success);
        assert_eq!(first.language, "basic");
        assert_eq!(first.error.as_deref(), Some(INVALID_LANGUAGE_MESSAGE));
        assert_eq!(
            orchestrator.results().state(SlotId::First).status(),
            SlotStatus::Failed
        );

        assert!(report.results.second.success);
        assert_eq!(
            orchestrator.results().state(SlotId::Second).status(),
            SlotStatus::Completed
        );
        assert_eq!(orchestrator.backend_calls(), vec![Language::Rust]);
    }

    #[tokio::test]
    async fn test_remote_failure_is_a_failed_slot_not_an_error() {
        let backend = ScriptedBackend {
            failing: vec![Language::Cpp],
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(backend);

        let report = orchestrator
            .run(SlotInput::new("int main() {", "cpp"), python())
            .await
            .unwrap();

        assert_eq!(
            orchestrator.results().state(SlotId::First),
            SlotState::Failed(report.results.first.clone())
        );
        assert_eq!(report.results.first.error.as_deref(), Some("exit status 1"));
        assert!(report.results.second.success);
    }

    #[tokio::test]
    async fn test_first_slot_observable_while_second_is_held() {
        let (backend, gate) = ScriptedBackend::gated(Language::Rust);
        let orchestrator = Orchestrator::new(backend);

        let handle = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.run(python(), rust()).await })
        };

        wait_terminal(&orchestrator, SlotId::First).await;

        let first = orchestrator.results().result(SlotId::First).unwrap();
        assert!(first.success);
        assert_eq!(first.output, "print(1)");
        assert_eq!(
            orchestrator.results().state(SlotId::Second),
            SlotState::Running
        );
        assert!(orchestrator.is_executing());

        gate.add_permits(1);
        let report = handle.await.unwrap().unwrap();

        assert_eq!(report.results.first, first);
        assert!(!orchestrator.is_executing());
    }

    #[tokio::test]
    async fn test_delayed_second_slot_does_not_change_first_result() {
        let baseline = Orchestrator::new(ScriptedBackend::default())
            .run(python(), rust())
            .await
            .unwrap();

        let delayed = ScriptedBackend {
            delays: HashMap::from([(Language::Rust, Duration::from_millis(150))]),
            ..Default::default()
        };
        let report = Orchestrator::new(delayed)
            .run(python(), rust())
            .await
            .unwrap();

        assert_eq!(report.results.first, baseline.results.first);
        assert_eq!(report.results.second, baseline.results.second);
    }

    #[tokio::test]
    async fn test_both_calls_in_flight_at_once() {
        let gate = Arc::new(Semaphore::new(0));
        let backend = ScriptedBackend {
            gates: HashMap::from([
                (Language::Python, gate.clone()),
                (Language::Rust, gate.clone()),
            ]),
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(backend);

        let handle = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.run(python(), rust()).await })
        };

        // both slots reach the backend while neither has been released
        tokio::time::timeout(WAIT, async {
            while orchestrator.backend_started() < 2 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("second call never started");

        // started in slot order
        assert_eq!(
            orchestrator.backend_calls(),
            vec![Language::Python, Language::Rust]
        );

        gate.add_permits(2);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_rerun_starts_from_clean_slots() {
        let (backend, gate) = ScriptedBackend::gated(Language::Python);
        let orchestrator = Orchestrator::new(backend);

        gate.add_permits(1);
        let first_run = orchestrator.run(python(), rust()).await.unwrap();

        let pending = orchestrator
            .begin(python(), SlotInput::new("fn main() {}", "rust"))
            .unwrap();
        assert_ne!(pending.run_id(), first_run.run_id);
        assert_eq!(
            orchestrator.results().snapshot(),
            SlotPair::new(SlotState::Pending, SlotState::Pending)
        );

        let handle = tokio::spawn(pending.execute());
        wait_terminal(&orchestrator, SlotId::Second).await;

        // python is held: slot 1 shows no stale result from the previous run
        assert_eq!(
            orchestrator.results().state(SlotId::First),
            SlotState::Running
        );
        assert_eq!(
            orchestrator.results().result(SlotId::Second).unwrap().output,
            "fn main() {}"
        );

        gate.add_permits(1);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_second_run_rejected_while_executing() {
        let orchestrator = Orchestrator::new(ScriptedBackend::default());

        let pending = orchestrator.begin(python(), rust()).unwrap();
        assert!(orchestrator.is_executing());

        let err = orchestrator.run(rust(), python()).await.unwrap_err();
        assert!(matches!(err, ArenaError::RunInProgress));
        // the rejected attempt did not touch the slots
        assert_eq!(
            orchestrator.results().state(SlotId::First),
            SlotState::Pending
        );

        pending.execute().await.unwrap();
        assert!(!orchestrator.is_executing());
        orchestrator.run(rust(), python()).await.unwrap();
    }

    #[tokio::test]
    async fn test_dropped_pending_run_releases_slots() {
        let orchestrator = Orchestrator::new(ScriptedBackend::default());

        let pending = orchestrator.begin(python(), rust()).unwrap();
        assert_eq!(orchestrator.results().state(SlotId::Second), SlotState::Pending);
        drop(pending);

        let snapshot = orchestrator.snapshot();
        assert!(!snapshot.executing);
        assert_eq!(snapshot.slots, SlotPair::new(SlotState::Idle, SlotState::Idle));
        assert!(orchestrator.backend_calls().is_empty());

        // the orchestrator is usable again
        orchestrator.run(python(), rust()).await.unwrap();
    }

    #[tokio::test]
    async fn test_aborted_run_keeps_settled_slot_and_resets_the_other() {
        let (backend, _gate) = ScriptedBackend::gated(Language::Rust);
        let orchestrator = Orchestrator::new(backend);

        let handle = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.run(python(), rust()).await })
        };

        wait_terminal(&orchestrator, SlotId::First).await;
        assert_eq!(orchestrator.results().state(SlotId::Second), SlotState::Running);

        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());

        let snapshot = orchestrator.snapshot();
        assert!(!snapshot.executing);
        assert_eq!(snapshot.slots.first.status(), SlotStatus::Completed);
        assert_eq!(snapshot.slots.second, SlotState::Idle);
    }

    #[tokio::test]
    async fn test_no_cancellation_run_waits_for_slow_slot() {
        let backend = ScriptedBackend {
            delays: HashMap::from([(Language::Python, Duration::from_millis(200))]),
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(backend);

        let started = std::time::Instant::now();
        let report = orchestrator.run(python(), rust()).await.unwrap();

        // no per-call deadline: the slow slot still delivers its result
        assert!(started.elapsed() >= Duration::from_millis(200));
        assert!(report.results.first.success);
        assert!(orchestrator.results().all_terminal());
    }

    #[tokio::test]
    async fn test_transport_failure_stays_on_its_slot() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/execute"))
            .and(body_string_contains("filename=\"code.py\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "output": "1\n",
                "compilation_time": 0,
                "execution_time": 0.02,
                "success": true
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/execute"))
            .and(body_string_contains("filename=\"code.rs\""))
            .respond_with(
                ResponseTemplate::new(502)
                    .set_body_string("upstream down")
                    .set_delay(Duration::from_millis(100)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = ArenaConfig::default().with_service_url(mock_server.uri());
        let orchestrator = Orchestrator::new(RemoteExecutionClient::new(&config).unwrap());

        let report = orchestrator.run(python(), rust()).await.unwrap();

        assert!(report.results.first.success);
        assert_eq!(report.results.first.language, "python");
        assert_eq!(report.results.first.output, "1\n");

        assert_eq!(
            report.results.second,
            ExecutionResult::failure("rust", TRANSPORT_FAILURE_MESSAGE)
        );
        assert_eq!(
            orchestrator.results().state(SlotId::Second).status(),
            SlotStatus::Failed
        );
    }

    impl Orchestrator<ScriptedBackend> {
        fn backend_calls(&self) -> Vec<Language> {
            self.backend().calls()
        }

        fn backend_started(&self) -> usize {
            self.backend().started.load(Ordering::SeqCst)
        }
    }
}
