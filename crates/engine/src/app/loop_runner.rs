use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use crate::{ContentPipelineError, StartupError};

use super::metrics::MetricsAccumulator;
use super::{InputSnapshot, MetricsHandle, Scene, SceneCommand};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    /// Sleep between frames so ticks land at `target_tps` wall-clock rate.
    pub pace_realtime: bool,
    pub max_ticks: Option<u64>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            pace_realtime: false,
            max_ticks: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to build or load level database: {0}")]
    ContentPipeline(#[from] ContentPipelineError),
}

/// Supplies one snapshot per fixed tick. `None` ends the run.
pub trait InputSource<C> {
    fn snapshot_for_tick(&mut self, tick: u64) -> Option<InputSnapshot<C>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStopReason {
    InputExhausted,
    SceneQuit,
    TickLimit,
}

impl LoopStopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            LoopStopReason::InputExhausted => "input_exhausted",
            LoopStopReason::SceneQuit => "scene_quit",
            LoopStopReason::TickLimit => "tick_limit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSummary {
    pub ticks_run: u64,
    pub stop_reason: LoopStopReason,
}

pub fn run_app<S, I>(config: LoopConfig, scene: &mut S, input: &mut I) -> LoopSummary
where
    S: Scene,
    I: InputSource<S::Command> + ?Sized,
{
    run_app_with_metrics(config, scene, input, MetricsHandle::default())
}

pub fn run_app_with_metrics<S, I>(
    config: LoopConfig,
    scene: &mut S,
    input: &mut I,
    metrics_handle: MetricsHandle,
) -> LoopSummary
where
    S: Scene,
    I: InputSource<S::Command> + ?Sized,
{
    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        pace_realtime = config.pace_realtime,
        max_ticks = ?config.max_ticks,
        "loop_config"
    );

    scene.load();
    info!(title = ?scene.debug_title(), "scene_loaded");

    let mut driver = TickDriver {
        fixed_dt_seconds: fixed_dt.as_secs_f32(),
        max_ticks: config.max_ticks,
        ticks_run: 0,
        metrics: MetricsAccumulator::new(metrics_log_interval),
        metrics_handle,
    };

    let stop_reason = if config.pace_realtime {
        driver.run_paced(scene, input, fixed_dt, max_frame_delta, max_ticks_per_frame)
    } else {
        driver.run_unpaced(scene, input)
    };

    let final_metrics = driver.metrics.final_snapshot(Instant::now());
    driver.metrics_handle.publish(final_metrics);

    scene.unload();
    info!(
        ticks_run = driver.ticks_run,
        reason = stop_reason.as_str(),
        "shutdown"
    );

    LoopSummary {
        ticks_run: driver.ticks_run,
        stop_reason,
    }
}

struct TickDriver {
    fixed_dt_seconds: f32,
    max_ticks: Option<u64>,
    ticks_run: u64,
    metrics: MetricsAccumulator,
    metrics_handle: MetricsHandle,
}

impl TickDriver {
    fn run_unpaced<S, I>(&mut self, scene: &mut S, input: &mut I) -> LoopStopReason
    where
        S: Scene,
        I: InputSource<S::Command> + ?Sized,
    {
        loop {
            if let Some(reason) = self.step(scene, input) {
                return reason;
            }
            self.maybe_log_metrics(scene);
        }
    }

    fn run_paced<S, I>(
        &mut self,
        scene: &mut S,
        input: &mut I,
        fixed_dt: Duration,
        max_frame_delta: Duration,
        max_ticks_per_frame: u32,
    ) -> LoopStopReason
    where
        S: Scene,
        I: InputSource<S::Command> + ?Sized,
    {
        let mut accumulator = Duration::ZERO;
        let mut last_frame_instant = Instant::now();

        loop {
            let now = Instant::now();
            let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
            last_frame_instant = now;

            let clamped_frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);
            accumulator = accumulator.saturating_add(clamped_frame_dt);
            let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
            for _ in 0..step_plan.ticks_to_run {
                if let Some(reason) = self.step(scene, input) {
                    return reason;
                }
            }
            accumulator = step_plan.remaining_accumulator;

            if step_plan.dropped_backlog > Duration::ZERO {
                warn!(
                    dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                    max_ticks_per_frame, "sim_clamp_triggered"
                );
            }

            self.maybe_log_metrics(scene);
            thread::sleep(fixed_dt.saturating_sub(accumulator));
        }
    }

    fn step<S, I>(&mut self, scene: &mut S, input: &mut I) -> Option<LoopStopReason>
    where
        S: Scene,
        I: InputSource<S::Command> + ?Sized,
    {
        if self.max_ticks.is_some_and(|limit| self.ticks_run >= limit) {
            return Some(LoopStopReason::TickLimit);
        }
        let snapshot = input.snapshot_for_tick(self.ticks_run)?;

        let started = Instant::now();
        let command = scene.update(self.fixed_dt_seconds, &snapshot);
        self.metrics.record_tick(started.elapsed());
        self.ticks_run = self.ticks_run.saturating_add(1);

        match command {
            SceneCommand::Quit => Some(LoopStopReason::SceneQuit),
            SceneCommand::None => None,
        }
    }

    fn maybe_log_metrics<S: Scene>(&mut self, scene: &S) {
        if let Some(snapshot) = self.metrics.maybe_snapshot(Instant::now()) {
            self.metrics_handle.publish(snapshot);
            info!(
                tps = snapshot.tps,
                tick_time_ms = snapshot.tick_time_ms,
                ticks_total = snapshot.ticks_total,
                title = ?scene.debug_title(),
                "loop_metrics"
            );
        }
    }
}

impl<C> InputSource<C> for std::vec::IntoIter<InputSnapshot<C>> {
    fn snapshot_for_tick(&mut self, _tick: u64) -> Option<InputSnapshot<C>> {
        self.next()
    }
}

struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        let dropped_backlog = accumulator;
        accumulator = Duration::ZERO;
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InputAction;

    #[derive(Default)]
    struct CountingScene {
        loads: u32,
        unloads: u32,
        updates: u32,
        commands_seen: Vec<u8>,
        quit_after: Option<u32>,
    }

    impl Scene for CountingScene {
        type Command = u8;

        fn load(&mut self) {
            self.loads += 1;
        }

        fn update(&mut self, _fixed_dt_seconds: f32, input: &InputSnapshot<u8>) -> SceneCommand {
            self.updates += 1;
            self.commands_seen.extend_from_slice(input.commands());
            if self.quit_after == Some(self.updates) {
                SceneCommand::Quit
            } else {
                SceneCommand::None
            }
        }

        fn unload(&mut self) {
            self.unloads += 1;
        }
    }

    fn scripted(count: usize) -> std::vec::IntoIter<InputSnapshot<u8>> {
        (0..count)
            .map(|index| {
                InputSnapshot::empty()
                    .with_action_down(InputAction::MoveUp, true)
                    .with_command(index as u8)
            })
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        let raw_frame_dt = Duration::from_millis(600);

        assert_eq!(
            clamp_frame_delta(raw_frame_dt, max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(48), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(120), fixed_dt, 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn zero_durations_fall_back_to_defaults() {
        let fallback = Duration::from_secs(1);
        assert_eq!(normalize_non_zero_duration(Duration::ZERO, fallback), fallback);
        assert_eq!(
            normalize_non_zero_duration(Duration::from_millis(5), fallback),
            Duration::from_millis(5)
        );
    }

    #[test]
    fn unpaced_run_consumes_every_snapshot_in_order() {
        let mut scene = CountingScene::default();
        let mut input = scripted(4);

        let summary = run_app(LoopConfig::default(), &mut scene, &mut input);

        assert_eq!(summary.ticks_run, 4);
        assert_eq!(summary.stop_reason, LoopStopReason::InputExhausted);
        assert_eq!(scene.commands_seen, vec![0, 1, 2, 3]);
        assert_eq!((scene.loads, scene.unloads), (1, 1));
    }

    #[test]
    fn quit_command_stops_before_input_runs_out() {
        let mut scene = CountingScene {
            quit_after: Some(2),
            ..CountingScene::default()
        };
        let mut input = scripted(10);

        let summary = run_app(LoopConfig::default(), &mut scene, &mut input);

        assert_eq!(summary.ticks_run, 2);
        assert_eq!(summary.stop_reason, LoopStopReason::SceneQuit);
        assert_eq!(scene.unloads, 1);
    }

    #[test]
    fn tick_limit_caps_run_and_publishes_final_metrics() {
        let mut scene = CountingScene::default();
        let mut input = scripted(10);
        let config = LoopConfig {
            max_ticks: Some(3),
            ..LoopConfig::default()
        };
        let metrics = MetricsHandle::default();

        let summary = run_app_with_metrics(config, &mut scene, &mut input, metrics.clone());

        assert_eq!(summary.ticks_run, 3);
        assert_eq!(summary.stop_reason, LoopStopReason::TickLimit);
        assert_eq!(metrics.snapshot().ticks_total, 3);
    }
}
