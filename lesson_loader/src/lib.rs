use std::{fs, path::Path};

use anyhow::Context;
use lesson_schema::Lesson;

pub fn load_lesson_json_from_path(path: impl AsRef<Path>) -> anyhow::Result<Lesson> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("failed to read lesson: {}", path.display()))?;
    let lesson: Lesson = serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse lesson json: {}", path.display()))?;
    Ok(lesson)
}

pub fn load_lesson_json_from_str(json: &str) -> anyhow::Result<Lesson> {
    let lesson: Lesson = serde_json::from_str(json).context("failed to parse lesson json")?;
    Ok(lesson)
}
