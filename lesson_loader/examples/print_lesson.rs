use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
struct Args {
    path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let lesson = lesson_loader::load_lesson_json_from_path(args.path)?;
    println!("lesson_id={}", lesson.meta.lesson_id);
    println!("title={}", lesson.meta.title);
    println!("bpm={}", lesson.bpm);
    println!("notes={}", lesson.notes.len());
    println!("duration_ms={}", lesson.duration_ms());
    Ok(())
}
