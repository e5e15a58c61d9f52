use serde::{Deserialize, Serialize};

pub type Millis = f64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lesson {
    pub meta: LessonMeta,
    pub bpm: f64,
    pub notes: Vec<NoteEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LessonMeta {
    pub lesson_id: String,
    pub title: String,
    #[serde(default)]
    pub world_id: Option<String>,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub words: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteEvent {
    pub lane: u8,
    pub time_ms: Millis,
    #[serde(default)]
    pub word: Option<String>,
    #[serde(default)]
    pub kind: NoteKind,
    /// Solfege name ("do", "re", ...) used by the audio layer.
    #[serde(default)]
    pub pitch: Option<String>,
}

impl NoteEvent {
    pub fn tap(lane: u8, time_ms: Millis) -> Self {
        Self {
            lane,
            time_ms,
            word: None,
            kind: NoteKind::Basic,
            pitch: None,
        }
    }

    pub fn with_word(mut self, word: impl Into<String>) -> Self {
        self.word = Some(word.into());
        self
    }

    pub fn with_kind(mut self, kind: NoteKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn has_word(&self) -> bool {
        self.word.as_deref().is_some_and(|w| !w.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    #[default]
    Basic,
    Special,
    Golden,
}

impl Lesson {
    /// Time of the last authored note, or 0 for an empty lesson.
    pub fn duration_ms(&self) -> Millis {
        self.notes
            .iter()
            .map(|n| n.time_ms)
            .fold(0.0, f64::max)
    }

    pub fn lane_count(&self) -> usize {
        self.notes
            .iter()
            .map(|n| n.lane as usize + 1)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_kind_serializes_lowercase() {
        let note = NoteEvent::tap(2, 1500.0)
            .with_word("apple")
            .with_kind(NoteKind::Golden);

        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["kind"], "golden");
        assert_eq!(json["lane"], 2);
        assert_eq!(json["time_ms"], 1500.0);
        assert_eq!(json["word"], "apple");
    }

    #[test]
    fn optional_fields_default() {
        let v = serde_json::json!({
            "lane": 1,
            "time_ms": 250.0
        });

        let note: NoteEvent = serde_json::from_value(v).unwrap();
        assert_eq!(note.kind, NoteKind::Basic);
        assert!(note.word.is_none());
        assert!(note.pitch.is_none());
        assert!(!note.has_word());
    }

    #[test]
    fn empty_word_is_not_a_word() {
        let note = NoteEvent::tap(0, 0.0).with_word("");
        assert!(!note.has_word());
    }

    #[test]
    fn lesson_duration_and_lanes() {
        let lesson = Lesson {
            meta: LessonMeta {
                lesson_id: "w1_l1".to_string(),
                title: "Do Re Mi".to_string(),
                world_id: Some("forest".to_string()),
                level: 1,
                words: vec!["cat".to_string()],
            },
            bpm: 100.0,
            notes: vec![
                NoteEvent::tap(0, 600.0),
                NoteEvent::tap(2, 1800.0),
                NoteEvent::tap(1, 1200.0),
            ],
        };

        assert_eq!(lesson.duration_ms(), 1800.0);
        assert_eq!(lesson.lane_count(), 3);

        let json = serde_json::to_string(&lesson).unwrap();
        let back: Lesson = serde_json::from_str(&json).unwrap();
        assert_eq!(lesson, back);
    }
}
