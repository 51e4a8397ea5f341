use crate::meter::EnergyMeter;
use crate::ollama::{InferenceService, OllamaClient};
use joulebench_core::{
    BenchmarkResult, EnergyBackend, EnergyReport, InferenceOutcome, JouleBenchError, Result,
    RunState, TimeBudget, TokenAccountant, TokenTally,
};
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BenchmarkEvent {
    Pulling { model: String },
    WarmedUp { model: String },
    MeasurementStarted { model: String, backend: EnergyBackend },
    Progress { processed: usize, remaining_secs: f64 },
    MeasurementStopped { processed: usize },
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub model: String,
    pub temperature: f32,
    /// `None` runs the whole corpus.
    pub budget: Option<Duration>,
    pub warmup_prompt: String,
}

#[derive(Debug, Clone)]
pub struct BenchmarkRun {
    pub model: String,
    pub backend: EnergyBackend,
    pub outcomes: Vec<InferenceOutcome>,
    pub tokens: TokenTally,
    pub report: EnergyReport,
}

impl BenchmarkRun {
    pub fn n_samples(&self) -> usize {
        self.outcomes.len()
    }

    pub fn into_result(self) -> Result<BenchmarkResult> {
        let n_samples = self.n_samples();
        BenchmarkResult::from_run(&self.model, self.backend, self.report, &self.tokens, n_samples)
    }
}

pub struct BenchmarkRunner<S = OllamaClient> {
    service: S,
}

impl BenchmarkRunner<OllamaClient> {
    pub fn new(ollama_host: &str) -> Self {
        Self::with_service(OllamaClient::new(ollama_host))
    }
}

impl<S: InferenceService> BenchmarkRunner<S> {
    pub fn with_service(service: S) -> Self {
        Self { service }
    }

    /// Pulls and warms the model, then sends prompts in order until the corpus
    /// is exhausted or the budget says the next query would overrun. The
    /// meter's window covers exactly the timed queries.
    pub async fn run<F>(
        &self,
        config: &RunConfig,
        prompts: &[String],
        meter: &mut dyn EnergyMeter,
        mut on_event: F,
    ) -> Result<BenchmarkRun>
    where
        F: FnMut(BenchmarkEvent),
    {
        if prompts.is_empty() {
            return Err(JouleBenchError::Dataset("corpus is empty".to_string()));
        }

        let model = config.model.as_str();
        let mut state = RunState::Warming;
        tracing::info!("Starting benchmark for model: {}", model);

        on_event(BenchmarkEvent::Pulling {
            model: model.to_string(),
        });
        self.service.pull(model).await?;
        self.service.chat(model, &config.warmup_prompt, None).await?;
        on_event(BenchmarkEvent::WarmedUp {
            model: model.to_string(),
        });

        let mut budget = TimeBudget::new(config.budget);
        let mut tokens = TokenAccountant::new();
        let mut outcomes = Vec::with_capacity(prompts.len());

        meter.start()?;
        state = transition(state, RunState::Running);
        on_event(BenchmarkEvent::MeasurementStarted {
            model: model.to_string(),
            backend: meter.backend(),
        });

        for prompt in prompts {
            let outcome = self.run_single(config, prompt).await?;
            if !outcome.has_token_counts() {
                tracing::debug!("Query {} reported incomplete token counts", outcomes.len() + 1);
            }

            tokens.record(&outcome);
            budget.record(Duration::from_secs_f64(outcome.latency_secs));
            outcomes.push(outcome);

            on_event(BenchmarkEvent::Progress {
                processed: outcomes.len(),
                remaining_secs: budget.remaining(),
            });

            if budget.should_stop() {
                tracing::info!("Time budget reached after {} queries", outcomes.len());
                break;
            }
        }

        state = transition(state, RunState::Stopped);
        let report = meter.stop()?;
        on_event(BenchmarkEvent::MeasurementStopped {
            processed: outcomes.len(),
        });
        debug_assert_eq!(state, RunState::Stopped);

        let n_samples = outcomes.len();
        Ok(BenchmarkRun {
            model: model.to_string(),
            backend: meter.backend(),
            outcomes,
            tokens: tokens.finalize(n_samples),
            report,
        })
    }

    async fn run_single(&self, config: &RunConfig, prompt: &str) -> Result<InferenceOutcome> {
        let start = Instant::now();

        let response = self
            .service
            .chat(&config.model, prompt, Some(config.temperature))
            .await?;

        Ok(InferenceOutcome {
            latency_secs: start.elapsed().as_secs_f64(),
            input_tokens: response.prompt_eval_count,
            output_tokens: response.eval_count,
            succeeded: response.done,
        })
    }
}

fn transition(from: RunState, to: RunState) -> RunState {
    tracing::debug!("Benchmark state {:?} -> {:?}", from, to);
    to
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ollama::{ChatResponse, ResponseMessage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const WARMUP: &str = "Can you answer questions?";

    /// Answers after a fixed latency. Every `drop_tokens_every`-th timed
    /// query omits token counts; `fail_on` makes that call fail.
    struct FakeService {
        latency: Duration,
        calls: Arc<AtomicUsize>,
        drop_tokens_every: Option<usize>,
        fail_on: Option<usize>,
    }

    impl FakeService {
        fn new(latency_secs: u64, calls: Arc<AtomicUsize>) -> Self {
            Self {
                latency: Duration::from_secs(latency_secs),
                calls,
                drop_tokens_every: None,
                fail_on: None,
            }
        }
    }

    #[async_trait]
    impl InferenceService for FakeService {
        async fn pull(&self, _model: &str) -> Result<()> {
            Ok(())
        }

        async fn chat(
            &self,
            _model: &str,
            prompt: &str,
            _temperature: Option<f32>,
        ) -> Result<ChatResponse> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on == Some(call) {
                return Err(JouleBenchError::OllamaError("model crashed".to_string()));
            }
            if prompt != WARMUP {
                tokio::time::sleep(self.latency).await;
            }

            let timed_index = call - 1;
            let omit = self
                .drop_tokens_every
                .is_some_and(|every| timed_index > 0 && timed_index % every == 0);
            Ok(ChatResponse {
                message: ResponseMessage {
                    role: "assistant".to_string(),
                    content: "ok".to_string(),
                },
                done: true,
                prompt_eval_count: (!omit).then_some(10),
                eval_count: (!omit).then_some(100),
            })
        }
    }

    /// Records how many chat calls had happened when the window opened and
    /// closed.
    struct FakeMeter {
        calls: Arc<AtomicUsize>,
        started_at: Option<usize>,
        stopped_at: Option<usize>,
    }

    impl FakeMeter {
        fn new(calls: Arc<AtomicUsize>) -> Self {
            Self {
                calls,
                started_at: None,
                stopped_at: None,
            }
        }
    }

    impl EnergyMeter for FakeMeter {
        fn backend(&self) -> EnergyBackend {
            EnergyBackend::SampleTrace
        }

        fn start(&mut self) -> Result<()> {
            self.started_at = Some(self.calls.load(Ordering::SeqCst));
            Ok(())
        }

        fn stop(&mut self) -> Result<EnergyReport> {
            self.stopped_at = Some(self.calls.load(Ordering::SeqCst));
            Ok(EnergyReport::new(60.0, 600.0))
        }
    }

    fn prompts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("question {}", i)).collect()
    }

    fn config(budget_secs: Option<u64>) -> RunConfig {
        RunConfig {
            model: "gemma3:1b".to_string(),
            temperature: 0.7,
            budget: budget_secs.map(Duration::from_secs),
            warmup_prompt: WARMUP.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_corpus_exhaustion_stops_with_budget_left() {
        let calls = Arc::new(AtomicUsize::new(0));
        let runner = BenchmarkRunner::with_service(FakeService::new(10, calls.clone()));
        let mut meter = FakeMeter::new(calls.clone());
        let mut events = Vec::new();

        let run = runner
            .run(&config(Some(100)), &prompts(6), &mut meter, |e| events.push(e))
            .await
            .unwrap();

        assert_eq!(run.n_samples(), 6);
        let remaining: Vec<f64> = events
            .iter()
            .filter_map(|e| match e {
                BenchmarkEvent::Progress { remaining_secs, .. } => Some(*remaining_secs),
                _ => None,
            })
            .collect();
        assert_eq!(remaining.len(), 6);
        assert!((remaining[3] - 60.0).abs() < 0.1);
        assert!((remaining[4] - 40.0).abs() < 0.1);
        assert!((remaining[5] - 30.0).abs() < 0.1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_stops_before_overrun() {
        let calls = Arc::new(AtomicUsize::new(0));
        let runner = BenchmarkRunner::with_service(FakeService::new(10, calls.clone()));
        let mut meter = FakeMeter::new(calls.clone());

        let run = runner
            .run(&config(Some(45)), &prompts(20), &mut meter, |_| {})
            .await
            .unwrap();

        assert_eq!(run.n_samples(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_warmup_outside_measurement_window() {
        let calls = Arc::new(AtomicUsize::new(0));
        let runner = BenchmarkRunner::with_service(FakeService::new(1, calls.clone()));
        let mut meter = FakeMeter::new(calls.clone());
        let mut events = Vec::new();

        let run = runner
            .run(&config(None), &prompts(4), &mut meter, |e| events.push(e))
            .await
            .unwrap();

        assert_eq!(meter.started_at, Some(1));
        assert_eq!(meter.stopped_at, Some(5));
        assert_eq!(run.n_samples(), 4);
        assert!(run.outcomes.iter().all(|o| o.succeeded));
        assert!(run.outcomes.iter().all(|o| (o.latency_secs - 1.0).abs() < 0.1));
        assert!(matches!(events.first(), Some(BenchmarkEvent::Pulling { .. })));
        assert!(matches!(
            events.last(),
            Some(BenchmarkEvent::MeasurementStopped { processed: 4 })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_tokens_imputed_into_result() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut service = FakeService::new(2, calls.clone());
        service.drop_tokens_every = Some(3);
        let runner = BenchmarkRunner::with_service(service);
        let mut meter = FakeMeter::new(calls.clone());

        let run = runner
            .run(&config(None), &prompts(6), &mut meter, |_| {})
            .await
            .unwrap();

        assert_eq!(run.outcomes.iter().filter(|o| !o.has_token_counts()).count(), 2);
        assert_eq!(run.tokens.input.len(), 6);
        assert_eq!(run.tokens.output.len(), 6);

        let result = run.into_result().unwrap();
        assert_eq!(result.n_tokens_in, 60.0);
        assert_eq!(result.n_tokens_out, 600.0);
        assert_eq!(result.running_time(), 10.0);
        assert_eq!(result.power_draw(), 100.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inference_failure_aborts_run() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut service = FakeService::new(1, calls.clone());
        service.fail_on = Some(3);
        let runner = BenchmarkRunner::with_service(service);
        let mut meter = FakeMeter::new(calls.clone());

        let result = runner
            .run(&config(None), &prompts(5), &mut meter, |_| {})
            .await;

        assert!(matches!(result, Err(JouleBenchError::OllamaError(_))));
        assert_eq!(meter.stopped_at, None);
    }

    #[tokio::test]
    async fn test_empty_corpus_rejected() {
        let calls = Arc::new(AtomicUsize::new(0));
        let runner = BenchmarkRunner::with_service(FakeService::new(0, calls.clone()));
        let mut meter = FakeMeter::new(calls.clone());

        let result = runner.run(&config(None), &[], &mut meter, |_| {}).await;
        assert!(matches!(result, Err(JouleBenchError::Dataset(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
