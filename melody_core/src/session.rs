use std::sync::Arc;

use crossbeam_channel::Receiver;
use lesson_schema::Lesson;
use parking_lot::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::chart::{Chart, Quality};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::events::{EventBus, GameEvent};
use crate::gameplay::collect::{CollectionSummary, WordCollector};
use crate::gameplay::difficulty::{DifficultyChange, DifficultyConfig, DifficultyLevel, DifficultyManager};
use crate::gameplay::judge::{JudgeMachine, JudgmentResult, MissResult};
use crate::gameplay::score::{ScoreLedger, Summary};
use crate::gameplay::spawner::NoteSpawner;
use crate::input::InputQueue;
use crate::lifecycle::{GameLifecycle, LifecycleState};
use crate::time::{BeatClock, Conductor, FrameTimer};

/// One play-through of one lesson: owns every engine component and runs
/// them in a fixed order on each driver tick.
///
/// Tick order: countdown, clock, reference sync, spawn, miss sweep, finish
/// check. Taps are applied between ticks, each one atomically.
#[derive(Debug)]
pub struct GameSession {
    config: EngineConfig,
    lifecycle: GameLifecycle,
    clock: BeatClock,
    frame: FrameTimer,
    conductor: Option<Conductor>,
    spawner: NoteSpawner,
    judge: JudgeMachine,
    score: ScoreLedger,
    difficulty: DifficultyManager,
    words: WordCollector,
    bus: EventBus,
    chart: Option<Chart>,
    all_spawned: bool,
}

impl GameSession {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let mut session = Self {
            lifecycle: GameLifecycle::new(config.countdown_seconds),
            clock: BeatClock::new().with_drift_threshold(config.drift_threshold_ms),
            frame: FrameTimer::new(config.max_frame_delta_ms),
            conductor: None,
            spawner: NoteSpawner::new(config.look_ahead_ms),
            judge: JudgeMachine::new(config.windows)?,
            score: ScoreLedger::new(config.score.clone()),
            difficulty: DifficultyManager::new(config.adaptive.clone())?,
            words: WordCollector::default(),
            bus: EventBus::default(),
            chart: None,
            all_spawned: false,
            config,
        };
        session.apply_difficulty(session.difficulty.config());
        Ok(session)
    }

    pub fn subscribe(&mut self) -> Receiver<GameEvent> {
        self.bus.subscribe()
    }

    /// Drift-corrects the song clock against `conductor` on every tick.
    pub fn attach_conductor(&mut self, conductor: Conductor) {
        self.conductor = Some(conductor);
    }

    pub fn detach_conductor(&mut self) -> Option<Conductor> {
        self.conductor.take()
    }

    /// Validates and installs a lesson. A malformed lesson moves the
    /// lifecycle to `Error` and leaves timing and score state untouched.
    pub fn load(&mut self, lesson: &Lesson, now_ms: f64) -> Result<()> {
        self.lifecycle.start_loading(now_ms)?;

        let chart = match Chart::from_lesson(lesson) {
            Ok(chart) => chart,
            Err(err) => {
                warn!(lesson = %lesson.meta.lesson_id, %err, "lesson rejected");
                self.lifecycle.loading_failed(now_ms)?;
                self.flush_lifecycle();
                return Err(err);
            }
        };

        if let Err(err) = self.install(&chart) {
            self.lifecycle.loading_failed(now_ms)?;
            self.flush_lifecycle();
            return Err(err);
        }

        info!(
            lesson = %chart.lesson_id,
            notes = chart.note_count(),
            bpm = chart.bpm,
            max_score = self.score.max_possible_score(),
            "lesson loaded"
        );
        self.chart = Some(chart);
        self.lifecycle.loading_complete(now_ms)?;
        self.flush_lifecycle();
        Ok(())
    }

    /// Replays the loaded lesson from the top once the previous run is
    /// over.
    pub fn retry(&mut self, now_ms: f64) -> Result<()> {
        let Some(chart) = self.chart.take() else {
            return Err(EngineError::InvalidLesson("no lesson loaded".to_string()));
        };
        let result = self
            .lifecycle
            .ready_again(now_ms)
            .and_then(|()| self.install(&chart));
        self.chart = Some(chart);
        self.flush_lifecycle();
        result
    }

    fn install(&mut self, chart: &Chart) -> Result<()> {
        self.clock.prepare(chart.bpm)?;
        self.frame.reset();
        self.spawner.load(chart.notes.iter().cloned());
        self.judge.clear();
        self.score.initialize(chart.note_count());
        self.words.initialize(chart.lesson_id.clone(), chart.world_id.clone());
        self.difficulty.reset();
        self.all_spawned = false;
        Ok(())
    }

    /// Starts the countdown; play begins when it runs out.
    pub fn start(&mut self, now_ms: f64) -> Result<()> {
        self.lifecycle.start_countdown(now_ms)?;
        if self.lifecycle.state() == LifecycleState::Playing {
            self.begin_play(now_ms);
        }
        self.flush_lifecycle();
        Ok(())
    }

    /// Skips the countdown.
    pub fn start_immediately(&mut self, now_ms: f64) -> Result<()> {
        self.lifecycle.start_playing(now_ms)?;
        self.begin_play(now_ms);
        self.flush_lifecycle();
        Ok(())
    }

    fn begin_play(&mut self, now_ms: f64) {
        self.clock.start(now_ms);
        self.frame.reset();
        self.frame.advance(now_ms);
        self.anchor_conductor(now_ms);
    }

    /// Audio and song clock stand still together while paused, so the
    /// reference restarts its extrapolation from `now_ms`.
    fn anchor_conductor(&mut self, now_ms: f64) {
        if let Some(conductor) = self.conductor.as_mut() {
            conductor.update(now_ms);
        }
    }

    /// Advances the session to wall-clock `now_ms`.
    pub fn tick(&mut self, now_ms: f64) -> Result<()> {
        if self.lifecycle.state() == LifecycleState::Countdown && self.lifecycle.update(now_ms)? {
            self.begin_play(now_ms);
        }

        if self.lifecycle.state().accepts_input() {
            let step = self.frame.advance(now_ms);
            self.clock.absorb_stall(step.stalled_ms);
            for edge in self.clock.tick(now_ms) {
                self.bus.publish(GameEvent::Beat(edge));
            }
            if let Some(conductor) = self.conductor.as_mut() {
                conductor.poll(now_ms);
                self.clock.sync_to_external_time(conductor.get_time(now_ms));
            }

            let song_time_ms = self.clock.song_time_ms();
            self.spawn_due(song_time_ms, now_ms)?;
            for miss in self.judge.sweep_misses(song_time_ms) {
                self.resolve_miss(miss);
            }

            if self.all_spawned && self.judge.live_count() == 0 {
                self.lifecycle.show_results(now_ms)?;
                self.clock.stop();
                let summary = self.score.summary();
                info!(score = summary.score, stars = summary.stars, max_combo = summary.max_combo, "song finished");
            }
        }

        self.flush_lifecycle();
        Ok(())
    }

    fn spawn_due(&mut self, song_time_ms: f64, now_ms: f64) -> Result<()> {
        let batch = self.spawner.update(song_time_ms);
        for note in batch.notes {
            self.bus.publish(GameEvent::NoteSpawned {
                id: note.id,
                lane: note.lane(),
                target_ms: note.target_time_ms(),
                word: note.word().map(str::to_string),
                kind: note.kind(),
            });
            self.judge.register_spawn(note);
        }
        if batch.all_spawned {
            self.all_spawned = true;
            self.bus.publish(GameEvent::AllSpawned);
            if self.lifecycle.state() == LifecycleState::Playing {
                self.lifecycle.start_finishing(now_ms)?;
            }
        }
        Ok(())
    }

    /// Applies one tap at song time `timestamp_ms`. Taps outside play, and
    /// taps that match no live note, resolve nothing.
    pub fn tap(&mut self, lane: u8, timestamp_ms: f64) -> Option<JudgmentResult> {
        if !self.lifecycle.state().accepts_input() {
            return None;
        }
        let Some(result) = self.judge.judge(lane, timestamp_ms) else {
            self.bus.publish(GameEvent::EmptyTap { lane, timestamp_ms });
            return None;
        };

        self.bus.publish(GameEvent::Judged {
            id: result.note.id,
            lane,
            quality: result.quality,
            offset_ms: result.offset_ms,
        });
        let update = self.score.record(result.quality);
        self.bus.publish_all(update.events.into_iter().map(GameEvent::Score));
        if let Some(word) = self.words.process_hit(&result.note, result.quality) {
            self.bus.publish(GameEvent::WordCollected(word));
        }
        self.record_for_difficulty(result.quality);
        Some(result)
    }

    /// Applies every queued tap in arrival order.
    pub fn drain_input(&mut self, queue: &InputQueue) -> Vec<JudgmentResult> {
        queue
            .drain()
            .filter_map(|tap| self.tap(tap.lane, tap.timestamp_ms))
            .collect()
    }

    fn resolve_miss(&mut self, miss: MissResult) {
        self.bus.publish(GameEvent::Missed {
            id: miss.note.id,
            lane: miss.note.lane(),
        });
        let update = self.score.on_miss();
        self.bus.publish_all(update.events.into_iter().map(GameEvent::Score));
        self.words.record_miss(&miss.note);
        self.record_for_difficulty(Quality::Miss);
    }

    fn record_for_difficulty(&mut self, quality: Quality) {
        if let Some(change) = self.difficulty.record_judgment(quality) {
            self.on_difficulty_change(change);
        }
    }

    fn on_difficulty_change(&mut self, change: DifficultyChange) {
        self.apply_difficulty(change.config);
        let config = change.config;
        self.bus.publish(GameEvent::DifficultyChanged(change));
        self.bus.publish(GameEvent::DifficultyConfigUpdated(config));
    }

    /// Retunes spawner speed and judge windows together for `config`.
    fn apply_difficulty(&mut self, config: DifficultyConfig) {
        let windows = self.config.windows.scaled(config.timing_multiplier);
        let speed = self.spawner.set_speed(config.note_speed);
        let judge = self.judge.set_windows(windows);
        if let Err(err) = speed.and(judge) {
            warn!(level = %config.level, %err, "difficulty config not applied");
        }
    }

    pub fn set_difficulty(&mut self, level: DifficultyLevel) {
        if let Some(change) = self.difficulty.set_level(level) {
            self.on_difficulty_change(change);
        }
    }

    pub fn set_difficulty_bounds(&mut self, min: DifficultyLevel, max: DifficultyLevel) -> Result<()> {
        if let Some(change) = self.difficulty.set_bounds(min, max)? {
            self.on_difficulty_change(change);
        }
        Ok(())
    }

    pub fn configure_for_age(&mut self, age: u32) {
        if let Some(change) = self.difficulty.configure_for_age(age) {
            self.on_difficulty_change(change);
        }
    }

    pub fn set_adaptive_enabled(&mut self, enabled: bool) {
        self.difficulty.set_adaptive_enabled(enabled);
    }

    pub fn pause(&mut self, now_ms: f64) -> Result<()> {
        self.lifecycle.pause(now_ms)?;
        self.clock.pause(now_ms);
        self.flush_lifecycle();
        Ok(())
    }

    pub fn resume(&mut self, now_ms: f64) -> Result<()> {
        self.lifecycle.resume(now_ms)?;
        if self.lifecycle.state() == LifecycleState::Playing && self.clock.resume(now_ms) {
            self.frame.reset();
            self.frame.advance(now_ms);
            self.anchor_conductor(now_ms);
        }
        self.flush_lifecycle();
        Ok(())
    }

    /// Abandons the run. Play and countdown are paused first so the quit
    /// goes through the regular transition table.
    pub fn quit(&mut self, now_ms: f64) -> Result<()> {
        if matches!(self.lifecycle.state(), LifecycleState::Playing | LifecycleState::Countdown) {
            self.pause(now_ms)?;
        }
        self.lifecycle.quit(now_ms)?;
        self.clock.stop();
        self.judge.clear();
        self.flush_lifecycle();
        Ok(())
    }

    pub fn fail(&mut self, now_ms: f64) -> Result<()> {
        self.lifecycle.fail(now_ms)?;
        self.clock.stop();
        self.flush_lifecycle();
        Ok(())
    }

    /// Ends play from a pause straight into results.
    pub fn show_results(&mut self, now_ms: f64) -> Result<bool> {
        let entered = self.lifecycle.show_results(now_ms)?;
        self.clock.stop();
        self.flush_lifecycle();
        Ok(entered)
    }

    /// Marks the results as consumed. Returns `Some(summary)` only on the
    /// first call, so the persistence layer submits once.
    pub fn complete(&mut self, now_ms: f64) -> Result<Option<Summary>> {
        let completed = self.lifecycle.complete(now_ms)?;
        self.flush_lifecycle();
        Ok(completed.then(|| self.score.summary()))
    }

    /// Back to `Idle` with a clean slate; the loaded lesson is dropped.
    pub fn reset(&mut self) {
        self.lifecycle.reset();
        self.clock.reset();
        self.frame.reset();
        self.spawner.clear();
        self.judge.clear();
        self.score.reset();
        self.words.initialize(String::new(), None);
        if let Some(change) = self.difficulty.full_reset() {
            self.on_difficulty_change(change);
        }
        self.chart = None;
        self.all_spawned = false;
        self.flush_lifecycle();
    }

    fn flush_lifecycle(&mut self) {
        let events = self.lifecycle.take_events();
        self.bus.publish_all(events.into_iter().map(GameEvent::Lifecycle));
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn lifecycle(&self) -> &GameLifecycle {
        &self.lifecycle
    }

    pub fn song_time_ms(&self) -> f64 {
        self.clock.song_time_ms()
    }

    pub fn clock(&self) -> &BeatClock {
        &self.clock
    }

    pub fn spawner(&self) -> &NoteSpawner {
        &self.spawner
    }

    pub fn judge(&self) -> &JudgeMachine {
        &self.judge
    }

    pub fn score(&self) -> &ScoreLedger {
        &self.score
    }

    pub fn difficulty(&self) -> &DifficultyManager {
        &self.difficulty
    }

    pub fn words(&self) -> &WordCollector {
        &self.words
    }

    pub fn chart(&self) -> Option<&Chart> {
        self.chart.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn summary(&self) -> Summary {
        self.score.summary()
    }

    pub fn word_summary(&self) -> CollectionSummary {
        self.words.summary()
    }
}

/// Shared handle for driving one session from a frame thread while an
/// input thread taps into it. Each call holds the lock for its whole
/// duration, so a tick never sees a half-applied tap.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<GameSession>>,
}

impl SessionHandle {
    pub fn new(session: GameSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub fn tick(&self, now_ms: f64) -> Result<()> {
        self.inner.lock().tick(now_ms)
    }

    pub fn tap(&self, lane: u8, timestamp_ms: f64) -> Option<JudgmentResult> {
        self.inner.lock().tap(lane, timestamp_ms)
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.lock().state()
    }

    pub fn lock(&self) -> MutexGuard<'_, GameSession> {
        self.inner.lock()
    }
}
