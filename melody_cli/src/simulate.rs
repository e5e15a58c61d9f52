use lesson_schema::Lesson;
use melody_core::events::GameEvent;
use melody_core::gameplay::collect::CollectionSummary;
use melody_core::gameplay::difficulty::DifficultyLevel;
use melody_core::gameplay::score::{ScoreEvent, Summary};
use melody_core::lifecycle::{LifecycleEvent, LifecycleState};
use melody_core::{EngineConfig, GameSession, InputQueue, TapEvent};
use serde::Serialize;

const FRAME_MS: f64 = 1000.0 / 60.0;
/// Extra wall-clock time allowed past the last note before giving up.
const TAIL_MS: f64 = 10_000.0;

#[derive(Debug, Clone)]
pub struct SimOptions {
    /// Added to every autoplay tap: negative is early.
    pub offset_ms: f64,
    /// Leave every Nth note untouched.
    pub miss_every: Option<usize>,
    pub print_timeline: bool,
}

#[derive(Debug, Serialize)]
pub struct SimReport {
    pub lesson_id: String,
    pub final_state: String,
    pub play_time_ms: f64,
    pub difficulty: DifficultyLevel,
    pub summary: Summary,
    pub words: CollectionSummary,
}

/// Plays `lesson` headless on a fixed 60Hz tick, tapping notes through the
/// input queue the way a touch thread would.
pub fn run_simulation(lesson: &Lesson, config: EngineConfig, opts: &SimOptions) -> anyhow::Result<SimReport> {
    let mut session = GameSession::new(config)?;
    let events = session.subscribe();
    session.load(lesson, 0.0)?;

    let mut taps: Vec<TapEvent> = session
        .chart()
        .map(|chart| {
            chart
                .notes
                .iter()
                .enumerate()
                .filter(|(i, _)| opts.miss_every.map_or(true, |n| n == 0 || (i + 1) % n != 0))
                .map(|(_, note)| TapEvent::new(note.lane, note.time_ms + opts.offset_ms))
                .collect()
        })
        .unwrap_or_default();
    taps.sort_by(|a, b| a.timestamp_ms.total_cmp(&b.timestamp_ms));
    let mut taps = taps.into_iter().peekable();

    if opts.print_timeline {
        println!("Simulation Start ({} notes, {:.1} bpm)", lesson.notes.len(), lesson.bpm);
        println!("  Song(ms) | Event");
        println!("-----------|------------------");
    }

    let queue = InputQueue::new();
    let deadline = session.config().countdown_seconds as f64 * 1000.0 + lesson.duration_ms() + TAIL_MS;
    let mut now = 0.0;
    session.start(now)?;

    while session.state() != LifecycleState::Results && now <= deadline {
        session.tick(now)?;
        let song_time = session.song_time_ms();
        if session.state().accepts_input() {
            while let Some(tap) = taps.next_if(|t| t.timestamp_ms <= song_time) {
                queue.push(tap);
            }
            session.drain_input(&queue);
        }
        if opts.print_timeline {
            for event in events.try_iter() {
                if let Some(line) = describe(&event) {
                    println!("{:>10.1} | {}", song_time, line);
                }
            }
        }
        now += FRAME_MS;
    }

    let play_time_ms = session.lifecycle().total_play_time_ms(now);
    let summary = match session.state() {
        LifecycleState::Results => session.complete(now)?.unwrap_or_else(|| session.summary()),
        _ => session.summary(),
    };
    let final_state = format!("{:?}", session.state());

    Ok(SimReport {
        lesson_id: lesson.meta.lesson_id.clone(),
        final_state,
        play_time_ms,
        difficulty: session.difficulty().level(),
        summary,
        words: session.word_summary(),
    })
}

fn describe(event: &GameEvent) -> Option<String> {
    let line = match event {
        GameEvent::Lifecycle(LifecycleEvent::StateChanged { from, to }) => format!("{from:?} -> {to:?}"),
        GameEvent::Lifecycle(LifecycleEvent::CountdownTick(n)) => format!("countdown {n}"),
        GameEvent::Judged {
            id,
            lane,
            quality,
            offset_ms,
        } => format!("{id} lane {lane} {} ({offset_ms:+.1}ms)", quality.label()),
        GameEvent::Missed { id, lane } => format!("{id} lane {lane} MISS"),
        GameEvent::Score(ScoreEvent::Milestone(m)) => format!("milestone {m:?}"),
        GameEvent::Score(ScoreEvent::ComboBroken { lost }) => format!("combo broken at {lost}"),
        GameEvent::DifficultyChanged(change) => format!("difficulty {} -> {}", change.from, change.to),
        GameEvent::WordCollected(word) => format!("collected \"{}\" ({:?})", word.word, word.rarity),
        _ => return None,
    };
    Some(line)
}
