use std::mem;

use tracing::{info, warn};

use crate::config::DEFAULT_COUNTDOWN_SECONDS;
use crate::error::{EngineError, Result};

const COUNTDOWN_STEP_MS: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Idle,
    Loading,
    Ready,
    Countdown,
    Playing,
    Paused,
    Finishing,
    Results,
    Completed,
    Failed,
    Error,
}

impl LifecycleState {
    pub fn can_transition_to(self, to: LifecycleState) -> bool {
        use LifecycleState::*;
        match self {
            Idle => matches!(to, Loading | Ready),
            Loading => matches!(to, Ready | Error),
            Ready => matches!(to, Countdown | Playing),
            Countdown => matches!(to, Playing | Paused),
            Playing => matches!(to, Paused | Finishing | Results | Failed),
            Paused => matches!(to, Playing | Countdown | Results | Idle),
            Finishing => matches!(to, Results),
            Results => matches!(to, Idle | Ready | Completed),
            Completed | Failed => matches!(to, Idle | Ready),
            Error => matches!(to, Idle),
        }
    }

    /// States in which the song clock may advance.
    pub fn is_game_active(self) -> bool {
        matches!(
            self,
            LifecycleState::Countdown | LifecycleState::Playing | LifecycleState::Finishing
        )
    }

    pub fn is_game_over(self) -> bool {
        matches!(
            self,
            LifecycleState::Results | LifecycleState::Completed | LifecycleState::Failed
        )
    }

    /// Playing or Finishing: notes are spawned, judged and swept.
    pub fn accepts_input(self) -> bool {
        matches!(self, LifecycleState::Playing | LifecycleState::Finishing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    StateChanged {
        from: LifecycleState,
        to: LifecycleState,
    },
    CountdownTick(u32),
    GameStarted,
    GamePaused,
    GameResumed,
    GameEnded {
        completed: bool,
    },
}

/// Session state machine. Every change goes through the adjacency table in
/// [`LifecycleState::can_transition_to`]; rejected changes leave the state
/// untouched.
///
/// Wall-clock instants are supplied by the caller, as with the song clock.
#[derive(Debug, Clone)]
pub struct GameLifecycle {
    state: LifecycleState,
    previous: LifecycleState,
    state_entered_ms: f64,

    countdown_seconds: u32,
    countdown_remaining: u32,
    next_countdown_ms: f64,
    countdown_carry_ms: f64,

    play_started_ms: Option<f64>,
    play_ended_ms: Option<f64>,
    pause_started_ms: f64,
    paused_total_ms: f64,

    events: Vec<LifecycleEvent>,
}

impl Default for GameLifecycle {
    fn default() -> Self {
        Self::new(DEFAULT_COUNTDOWN_SECONDS)
    }
}

impl GameLifecycle {
    pub fn new(countdown_seconds: u32) -> Self {
        Self {
            state: LifecycleState::Idle,
            previous: LifecycleState::Idle,
            state_entered_ms: 0.0,
            countdown_seconds,
            countdown_remaining: 0,
            next_countdown_ms: 0.0,
            countdown_carry_ms: 0.0,
            play_started_ms: None,
            play_ended_ms: None,
            pause_started_ms: 0.0,
            paused_total_ms: 0.0,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn previous_state(&self) -> LifecycleState {
        self.previous
    }

    pub fn set_countdown_seconds(&mut self, seconds: u32) {
        self.countdown_seconds = seconds;
    }

    pub fn countdown_remaining(&self) -> u32 {
        self.countdown_remaining
    }

    /// Events produced since the last call, oldest first.
    pub fn take_events(&mut self) -> Vec<LifecycleEvent> {
        mem::take(&mut self.events)
    }

    /// Returns whether the state actually changed; a request for the
    /// current state is a no-op.
    fn transition_to(&mut self, to: LifecycleState, now_ms: f64) -> Result<bool> {
        let from = self.state;
        if from == to {
            return Ok(false);
        }
        if !from.can_transition_to(to) {
            warn!(?from, ?to, "rejected lifecycle transition");
            return Err(EngineError::InvalidTransition { from, to });
        }
        self.previous = from;
        self.state = to;
        self.state_entered_ms = now_ms;
        if to == LifecycleState::Ready {
            self.play_started_ms = None;
            self.play_ended_ms = None;
            self.paused_total_ms = 0.0;
        }
        info!(?from, ?to, "lifecycle transition");
        self.events.push(LifecycleEvent::StateChanged { from, to });
        Ok(true)
    }

    pub fn start_loading(&mut self, now_ms: f64) -> Result<()> {
        self.transition_to(LifecycleState::Loading, now_ms).map(drop)
    }

    pub fn loading_complete(&mut self, now_ms: f64) -> Result<()> {
        self.transition_to(LifecycleState::Ready, now_ms).map(drop)
    }

    pub fn loading_failed(&mut self, now_ms: f64) -> Result<()> {
        self.transition_to(LifecycleState::Error, now_ms).map(drop)
    }

    /// Back to `Ready` after a finished, completed or failed run.
    pub fn ready_again(&mut self, now_ms: f64) -> Result<()> {
        self.transition_to(LifecycleState::Ready, now_ms).map(drop)
    }

    pub fn start_countdown(&mut self, now_ms: f64) -> Result<()> {
        self.transition_to(LifecycleState::Countdown, now_ms)?;
        self.countdown_remaining = self.countdown_seconds;
        if self.countdown_remaining == 0 {
            return self.start_playing(now_ms);
        }
        self.next_countdown_ms = now_ms + COUNTDOWN_STEP_MS;
        self.events.push(LifecycleEvent::CountdownTick(self.countdown_remaining));
        Ok(())
    }

    /// One second of countdown elapsed; starts play when it reaches zero.
    pub fn tick_countdown(&mut self, now_ms: f64) -> Result<()> {
        if self.state != LifecycleState::Countdown {
            return Ok(());
        }
        self.countdown_remaining = self.countdown_remaining.saturating_sub(1);
        if self.countdown_remaining > 0 {
            self.events.push(LifecycleEvent::CountdownTick(self.countdown_remaining));
            Ok(())
        } else {
            self.start_playing(now_ms)
        }
    }

    /// Advances the countdown by wall-clock time. Returns true when this
    /// call moved the lifecycle into `Playing`.
    pub fn update(&mut self, now_ms: f64) -> Result<bool> {
        while self.state == LifecycleState::Countdown && now_ms >= self.next_countdown_ms {
            let due = self.next_countdown_ms;
            self.next_countdown_ms += COUNTDOWN_STEP_MS;
            self.tick_countdown(due)?;
            if self.state == LifecycleState::Playing {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn start_playing(&mut self, now_ms: f64) -> Result<()> {
        if self.transition_to(LifecycleState::Playing, now_ms)? {
            self.play_started_ms.get_or_insert(now_ms);
            self.play_ended_ms = None;
            self.events.push(LifecycleEvent::GameStarted);
        }
        Ok(())
    }

    /// Only valid while playing or counting down.
    pub fn pause(&mut self, now_ms: f64) -> Result<()> {
        if self.state == LifecycleState::Countdown {
            self.countdown_carry_ms = (self.next_countdown_ms - now_ms).max(0.0);
        }
        if self.transition_to(LifecycleState::Paused, now_ms)? {
            self.pause_started_ms = now_ms;
            self.events.push(LifecycleEvent::GamePaused);
        }
        Ok(())
    }

    /// Returns to the countdown if the pause interrupted it, otherwise to
    /// play. A no-op unless paused.
    pub fn resume(&mut self, now_ms: f64) -> Result<()> {
        if self.state != LifecycleState::Paused {
            return Ok(());
        }
        let paused_for = now_ms - self.pause_started_ms;
        let target = if self.previous == LifecycleState::Countdown {
            LifecycleState::Countdown
        } else {
            LifecycleState::Playing
        };
        self.transition_to(target, now_ms)?;
        if self.play_started_ms.is_some() {
            self.paused_total_ms += paused_for.max(0.0);
        }
        if target == LifecycleState::Countdown {
            self.next_countdown_ms = now_ms + self.countdown_carry_ms;
        }
        self.events.push(LifecycleEvent::GameResumed);
        Ok(())
    }

    pub fn start_finishing(&mut self, now_ms: f64) -> Result<()> {
        self.transition_to(LifecycleState::Finishing, now_ms).map(drop)
    }

    /// Moves to `Results` once; repeated calls after the game ended are
    /// no-ops. Returns whether results were entered by this call.
    pub fn show_results(&mut self, now_ms: f64) -> Result<bool> {
        if matches!(self.state, LifecycleState::Results | LifecycleState::Completed) {
            return Ok(false);
        }
        let was_paused = self.state == LifecycleState::Paused;
        self.transition_to(LifecycleState::Results, now_ms)?;
        self.end_play(if was_paused { self.pause_started_ms } else { now_ms });
        self.events.push(LifecycleEvent::GameEnded { completed: true });
        Ok(true)
    }

    /// Idempotent: a second call once completed does nothing and reports
    /// `false`, so results are only submitted once.
    pub fn complete(&mut self, now_ms: f64) -> Result<bool> {
        if self.state == LifecycleState::Completed {
            return Ok(false);
        }
        self.transition_to(LifecycleState::Completed, now_ms)
    }

    pub fn fail(&mut self, now_ms: f64) -> Result<()> {
        if self.transition_to(LifecycleState::Failed, now_ms)? {
            self.end_play(now_ms);
            self.events.push(LifecycleEvent::GameEnded { completed: false });
        }
        Ok(())
    }

    pub fn quit(&mut self, now_ms: f64) -> Result<()> {
        let was_paused = self.state == LifecycleState::Paused;
        if self.transition_to(LifecycleState::Idle, now_ms)? && was_paused {
            self.end_play(self.pause_started_ms);
            self.events.push(LifecycleEvent::GameEnded { completed: false });
        }
        Ok(())
    }

    /// Forces `Idle` without validation and clears all accounting.
    pub fn reset(&mut self) {
        *self = Self {
            events: mem::take(&mut self.events),
            ..Self::new(self.countdown_seconds)
        };
    }

    fn end_play(&mut self, at_ms: f64) {
        if self.play_started_ms.is_some() && self.play_ended_ms.is_none() {
            self.play_ended_ms = Some(at_ms);
        }
    }

    pub fn time_in_state_ms(&self, now_ms: f64) -> f64 {
        now_ms - self.state_entered_ms
    }

    /// Wall-clock time spent playing, excluding pauses.
    pub fn total_play_time_ms(&self, now_ms: f64) -> f64 {
        let Some(start) = self.play_started_ms else {
            return 0.0;
        };
        let end = match (self.play_ended_ms, self.state) {
            (Some(end), _) => end,
            (None, LifecycleState::Paused) => self.pause_started_ms,
            (None, _) => now_ms,
        };
        (end - start - self.paused_total_ms).max(0.0)
    }

    pub fn is_game_active(&self) -> bool {
        self.state.is_game_active()
    }

    pub fn is_game_over(&self) -> bool {
        self.state.is_game_over()
    }
}
