use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;
use yaraguard_common::{EventLog, LastDetection};

use crate::detection::derive_last_detection;

/// Face-recognition stage of the camera view.
///
/// The camera monitor only talks to this trait, so a real inference backend
/// can replace [`AiSimulator`] without touching the controller.
#[async_trait]
pub trait RecognitionPipeline: Send + Sync {
    /// Analyse the current frame of `bus_id`. `latest_event` is the newest
    /// event-log row already loaded for that bus, if any.
    async fn recognize(&self, bus_id: Uuid, latest_event: Option<&EventLog>) -> Option<LastDetection>;

    /// Whether a periodic poll should also run recognition.
    fn should_sample(&self) -> bool {
        true
    }

    fn processing(&self) -> watch::Receiver<ProcessingState>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessingState {
    outstanding: usize,
}

impl ProcessingState {
    pub fn is_processing(&self) -> bool {
        self.outstanding > 0
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SimulatorConfig {
    pub processing_delay_ms: u64,
    pub sample_probability: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            processing_delay_ms: 1500,
            sample_probability: 0.3,
        }
    }
}

impl SimulatorConfig {
    pub fn processing_delay(&self) -> Duration {
        Duration::from_millis(self.processing_delay_ms)
    }
}

/// Stand-in for a recognition backend: holds the processing flag up for a
/// fixed delay, then replays the newest event-log row as its result.
pub struct AiSimulator {
    delay: Duration,
    sample_probability: f64,
    state: watch::Sender<ProcessingState>,
}

impl AiSimulator {
    pub fn new(config: &SimulatorConfig) -> Self {
        let (state, _) = watch::channel(ProcessingState::default());
        Self {
            delay: config.processing_delay(),
            sample_probability: if config.sample_probability.is_nan() {
                0.0
            } else {
                config.sample_probability.clamp(0.0, 1.0)
            },
            state,
        }
    }

    pub fn is_processing(&self) -> bool {
        self.state.borrow().is_processing()
    }

    /// Raise the processing flag for the configured delay.
    ///
    /// Overlapping calls are counted; the flag drops only when the last one
    /// finishes or is cancelled.
    pub async fn simulate(&self) {
        let _call = self.begin();
        tokio::time::sleep(self.delay).await;
    }

    fn begin(&self) -> InFlight<'_> {
        self.state.send_modify(|state| state.outstanding += 1);
        InFlight { state: &self.state }
    }
}

struct InFlight<'a> {
    state: &'a watch::Sender<ProcessingState>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.state
            .send_modify(|state| state.outstanding = state.outstanding.saturating_sub(1));
    }
}

#[async_trait]
impl RecognitionPipeline for AiSimulator {
    async fn recognize(&self, bus_id: Uuid, latest_event: Option<&EventLog>) -> Option<LastDetection> {
        debug!("Simulating recognition for bus {}", bus_id);
        self.simulate().await;
        latest_event.and_then(derive_last_detection)
    }

    fn should_sample(&self) -> bool {
        rand::thread_rng().gen_bool(self.sample_probability)
    }

    fn processing(&self) -> watch::Receiver<ProcessingState> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;
    use tokio::time::{advance, Duration};
    use yaraguard_common::EventType;

    fn simulator(delay_ms: u64, sample_probability: f64) -> Arc<AiSimulator> {
        Arc::new(AiSimulator::new(&SimulatorConfig {
            processing_delay_ms: delay_ms,
            sample_probability,
        }))
    }

    // Let spawned tasks run up to their next await point.
    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn flag_rises_then_settles_after_delay() {
        let sim = simulator(1500, 0.3);
        let task = tokio::spawn({
            let sim = sim.clone();
            async move { sim.simulate().await }
        });
        settle().await;
        assert!(sim.is_processing());

        advance(Duration::from_millis(1499)).await;
        settle().await;
        assert!(sim.is_processing());

        advance(Duration::from_millis(2)).await;
        task.await.unwrap();
        assert!(!sim.is_processing());
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_calls_keep_flag_until_last_finishes() {
        let sim = simulator(1500, 0.3);
        let first = tokio::spawn({
            let sim = sim.clone();
            async move { sim.simulate().await }
        });
        settle().await;

        advance(Duration::from_millis(1000)).await;
        let second = tokio::spawn({
            let sim = sim.clone();
            async move { sim.simulate().await }
        });
        settle().await;
        assert_eq!(sim.processing().borrow().outstanding(), 2);

        // First call done at 1.5s, second still running.
        advance(Duration::from_millis(600)).await;
        first.await.unwrap();
        assert!(sim.is_processing());

        advance(Duration::from_millis(1000)).await;
        second.await.unwrap();
        assert!(!sim.is_processing());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_call_releases_flag() {
        let sim = simulator(1500, 0.3);
        let task = tokio::spawn({
            let sim = sim.clone();
            async move { sim.simulate().await }
        });
        settle().await;
        assert!(sim.is_processing());

        task.abort();
        let _ = task.await;
        assert!(!sim.is_processing());
    }

    #[tokio::test(start_paused = true)]
    async fn recognize_replays_latest_event() {
        let sim = simulator(1500, 0.3);
        let bus_id = Uuid::new_v4();
        let latest = EventLog {
            id: Uuid::new_v4(),
            bus_id,
            event_type: EventType::PersonIdentified,
            message: "Pessoa identificada: João Lima".to_string(),
            confidence_level: Some(91.0),
            suspect_id: None,
            camera_frame_url: None,
            metadata: serde_json::Value::Null,
            created_at: Utc::now(),
        };

        let detection = sim.recognize(bus_id, Some(&latest)).await.unwrap();
        assert_eq!(detection.person_name, "João Lima");
        assert!(sim.recognize(bus_id, None).await.is_none());
        assert!(!sim.is_processing());
    }

    #[test]
    fn sampling_respects_probability_bounds() {
        let never = AiSimulator::new(&SimulatorConfig {
            processing_delay_ms: 1500,
            sample_probability: 0.0,
        });
        let always = AiSimulator::new(&SimulatorConfig {
            processing_delay_ms: 1500,
            sample_probability: 1.0,
        });
        for _ in 0..50 {
            assert!(!never.should_sample());
            assert!(always.should_sample());
        }
    }
}
