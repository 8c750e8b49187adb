//! Terminal walkthrough of a course: binary glue only, all engine logic
//! lives in the services crate.

use std::fmt;
use std::io::{BufRead, Write as _};
use std::sync::Arc;
use std::time::Duration;

use lesson_core::Clock;
use lesson_core::dragdrop::SHAKE_MS;
use lesson_core::model::{ContentBlock, ContentItem, OptionId};
use lesson_core::quiz::{QUIZ_FLASH_MS, QuizContent, QuizOption, QuizVerdict};
use platform_api::{
    CompletionApi, CourseSnapshot, HttpBackend, InMemoryBackend, QuizSource,
};
use services::{Activation, BlockAssessment, LessonPlayer, PlayerError};
use url::Url;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidBaseUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidBaseUrl { raw } => write!(f, "invalid --base-url value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

struct Args {
    course_file: Option<String>,
    base_url: Option<Url>,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--course <file.json>] [--base-url <url>]");
    eprintln!();
    eprintln!("Without --course a built-in sample course is played against an");
    eprintln!("in-memory backend. With --base-url completions and quizzes go to");
    eprintln!("the platform API at that address.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LESSON_COURSE_FILE, LESSON_API_BASE_URL");
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut course_file = std::env::var("LESSON_COURSE_FILE").ok();
        let mut base_url = std::env::var("LESSON_API_BASE_URL")
            .ok()
            .and_then(|raw| Url::parse(raw.trim()).ok());

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--course" => {
                    course_file = Some(
                        args.next()
                            .ok_or(ArgsError::MissingValue { flag: "--course" })?,
                    );
                }
                "--base-url" => {
                    let raw = args
                        .next()
                        .ok_or(ArgsError::MissingValue { flag: "--base-url" })?;
                    base_url =
                        Some(Url::parse(raw.trim()).map_err(|_| ArgsError::InvalidBaseUrl {
                            raw: raw.clone(),
                        })?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            course_file,
            base_url,
        })
    }
}

//
// ─── SAMPLE COURSE ─────────────────────────────────────────────────────────────
//

const SAMPLE_QUIZ_ID: &str = "6f9619ff-8b86-4d01-b42d-00cf4fc964ff";

const SAMPLE_COURSE: &str = r#"{
    "course_id": "0d4a1cd9-8d3f-4b8e-9d6a-2f5f2b4b9f01",
    "sections": [
        {
            "id": "1d4a1cd9-8d3f-4b8e-9d6a-2f5f2b4b9f02",
            "title": "Assets and liabilities",
            "order": 0,
            "unlocked": true,
            "blocks": [
                {
                    "id": "2d4a1cd9-8d3f-4b8e-9d6a-2f5f2b4b9f03",
                    "title": "What is an asset?",
                    "order": 0,
                    "items": [
                        { "type": "text", "body": "An asset puts money in your pocket; a liability takes it out." }
                    ]
                },
                {
                    "id": "3d4a1cd9-8d3f-4b8e-9d6a-2f5f2b4b9f04",
                    "title": "Quick check",
                    "order": 1,
                    "items": [
                        { "type": "quiz", "quiz_id": "6f9619ff-8b86-4d01-b42d-00cf4fc964ff" }
                    ]
                }
            ]
        },
        {
            "id": "4d4a1cd9-8d3f-4b8e-9d6a-2f5f2b4b9f05",
            "title": "Sort it out",
            "order": 1,
            "blocks": [
                {
                    "id": "5d4a1cd9-8d3f-4b8e-9d6a-2f5f2b4b9f06",
                    "title": "Practice",
                    "order": 0,
                    "items": [
                        {
                            "type": "drag_drop",
                            "title": "Asset or liability?",
                            "instructions": "Place each entry in its column.",
                            "categories": "Asset (puts money in)\nLiability (takes money out)",
                            "items": "Rental property → Asset\nCar loan → Liability\nSavings account → Asset"
                        }
                    ]
                }
            ]
        }
    ]
}"#;

fn sample_backend() -> InMemoryBackend {
    let backend = InMemoryBackend::new();
    let quiz = QuizContent::new(
        "Which of these is an asset?",
        vec![
            QuizOption {
                id: OptionId::new("a"),
                text: "Rental property".to_string(),
            },
            QuizOption {
                id: OptionId::new("b"),
                text: "Car loan".to_string(),
            },
            QuizOption {
                id: OptionId::new("c"),
                text: "Credit card debt".to_string(),
            },
        ],
    )
    .expect("sample quiz is valid");
    backend.insert_quiz(
        SAMPLE_QUIZ_ID.parse().expect("sample quiz id is valid"),
        quiz,
    );
    backend
}

//
// ─── RENDERING ─────────────────────────────────────────────────────────────────
//

fn render_block(block: &ContentBlock, assessment: &BlockAssessment) {
    println!();
    println!("== {} ==", block.title());
    for item in block.items() {
        match item {
            ContentItem::Text { body } => println!("{body}"),
            ContentItem::Image { url, caption } => match caption {
                Some(caption) => println!("[image: {url} - {caption}]"),
                None => println!("[image: {url}]"),
            },
            ContentItem::Math { tex } => println!("[math: {tex}]"),
            ContentItem::Chart { .. } => println!("[chart]"),
            ContentItem::Table { .. } => println!("[table]"),
            ContentItem::Animation { url } => println!("[animation: {url}]"),
            ContentItem::Quiz { .. } => render_quiz(assessment),
            ContentItem::DragDrop { .. } => render_drag_drop(assessment),
        }
    }
}

fn render_quiz(assessment: &BlockAssessment) {
    let BlockAssessment::Quiz(slot) = assessment else {
        return;
    };
    let Some(content) = &slot.content else {
        println!("[quiz could not be loaded; press Enter to retry]");
        return;
    };
    println!("{}", content.question());
    for (number, option) in content.options().iter().enumerate() {
        println!("  {}) {}", number + 1, option.text);
    }
    println!("type an option number to select it");
}

fn render_drag_drop(assessment: &BlockAssessment) {
    match assessment {
        BlockAssessment::DragDrop(state) => {
            println!("{} - {}", state.title(), state.instructions());
            println!("categories:");
            for (number, category) in state.categories().iter().enumerate() {
                println!("  {}) {}", number + 1, category.label());
            }
            println!("items:");
            for (number, item) in state.items().iter().enumerate() {
                let placed = item.current_category().unwrap_or("unassigned");
                println!("  {}) {} [{placed}]", number + 1, item.text());
            }
            println!("type `<item> <category>` to place an item, `reset` to start over");
        }
        BlockAssessment::Broken(err) => {
            println!("[this exercise could not be rendered: {err}]");
        }
        _ => {}
    }
}

//
// ─── INPUT HANDLING ────────────────────────────────────────────────────────────
//

enum Command {
    Activate,
    SelectOption(usize),
    Place { item: usize, category: usize },
    Reset,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return Some(Command::Activate);
    }
    if line.eq_ignore_ascii_case("q") || line.eq_ignore_ascii_case("quit") {
        return Some(Command::Quit);
    }
    if line.eq_ignore_ascii_case("reset") {
        return Some(Command::Reset);
    }
    let mut parts = line.split_whitespace();
    let first: usize = parts.next()?.parse().ok()?;
    match parts.next() {
        None => Some(Command::SelectOption(first)),
        Some(second) => {
            let category: usize = second.parse().ok()?;
            Some(Command::Place {
                item: first,
                category,
            })
        }
    }
}

/// One-based menu lookup; `0` and out-of-range numbers yield `None`.
fn nth<T>(slice: &[T], number: usize) -> Option<&T> {
    number.checked_sub(1).and_then(|i| slice.get(i))
}

fn apply_command(player: &mut LessonPlayer, command: &Command) -> Result<(), PlayerError> {
    match command {
        Command::SelectOption(number) => {
            let id = match player.assessment() {
                BlockAssessment::Quiz(slot) => slot
                    .content
                    .as_ref()
                    .and_then(|c| nth(c.options(), *number))
                    .map(|o| o.id.clone()),
                _ => None,
            };
            match id {
                Some(id) => player.select_option(id),
                None => {
                    println!("no such option");
                    Ok(())
                }
            }
        }
        Command::Place { item, category } => {
            let ids = match player.assessment() {
                BlockAssessment::DragDrop(state) => {
                    let item_id = nth(state.items(), *item).map(|i| i.id());
                    let name = nth(state.categories(), *category).map(|c| c.name().to_string());
                    item_id.zip(name)
                }
                _ => None,
            };
            match ids {
                Some((item_id, name)) => player.place_item(item_id, Some(&name)),
                None => {
                    println!("no such item or category");
                    Ok(())
                }
            }
        }
        Command::Reset => {
            let ids: Vec<_> = match player.assessment() {
                BlockAssessment::DragDrop(state) => state.items().iter().map(|i| i.id()).collect(),
                _ => Vec::new(),
            };
            for id in ids {
                player.place_item(id, None)?;
            }
            Ok(())
        }
        Command::Activate | Command::Quit => Ok(()),
    }
}

//
// ─── MAIN LOOP ─────────────────────────────────────────────────────────────────
//

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).map_err(|e| {
        print_usage();
        e
    })?;

    let raw = match &args.course_file {
        Some(path) => std::fs::read_to_string(path)?,
        None => SAMPLE_COURSE.to_string(),
    };
    let path = CourseSnapshot::from_json(&raw)?.into_course_path()?;
    log::info!(
        "opening course {} ({} section(s))",
        path.course_id(),
        path.len()
    );

    let (api, quizzes): (Arc<dyn CompletionApi>, Arc<dyn QuizSource>) = match args.base_url {
        Some(base) => {
            let backend = HttpBackend::new(base);
            (Arc::new(backend.clone()), Arc::new(backend))
        }
        None => {
            let backend = sample_backend();
            (Arc::new(backend.clone()), Arc::new(backend))
        }
    };

    let mut player = LessonPlayer::open(path, api, quizzes, Clock::default_clock()).await?;

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    let mut redraw = true;

    loop {
        if redraw {
            let block = player.revealed_blocks().last().cloned();
            if let Some(block) = block {
                render_block(&block, player.assessment());
            }
            redraw = false;
        }
        let progress = player.progress();
        print!(
            "({}/{}) [{}] > ",
            progress.completed,
            progress.total,
            player.control_label()
        );
        std::io::stdout().flush()?;

        let Some(line) = lines.next().transpose()? else {
            return Ok(());
        };
        let Some(command) = parse_command(&line) else {
            println!("did not understand that; Enter activates, `q` quits");
            continue;
        };
        if matches!(command, Command::Quit) {
            return Ok(());
        }

        if !matches!(command, Command::Activate) {
            if let Err(err) = apply_command(&mut player, &command) {
                eprintln!("{err}");
            }
            redraw = true;
            continue;
        }

        match player.activate().await {
            Ok(Activation::Rejected { message }) => println!("{message}"),
            Ok(Activation::QuizChecked(QuizVerdict::Correct)) => {
                println!("correct!");
                redraw = true;
            }
            Ok(Activation::QuizChecked(QuizVerdict::Incorrect)) => {
                println!("not quite - try again");
                tokio::time::sleep(Duration::from_millis(QUIZ_FLASH_MS as u64)).await;
                player.poll_feedback();
            }
            Ok(Activation::ExerciseChecked(report)) => {
                if report.completed {
                    println!("all sorted!");
                } else {
                    println!("{} item(s) in the wrong place", report.incorrect.len());
                    tokio::time::sleep(Duration::from_millis(SHAKE_MS as u64)).await;
                    player.poll_feedback();
                }
                redraw = true;
            }
            Ok(Activation::Advanced) => redraw = true,
            Ok(Activation::SectionCompleted { streak, .. }) => {
                println!("section complete!");
                if let Some(streak) = streak {
                    if streak.increased {
                        println!("streak: {} days", streak.current);
                    }
                }
                redraw = true;
            }
            Ok(Activation::CourseCompleted { streak }) => {
                println!("course complete!");
                if let Some(streak) = streak {
                    if streak.increased {
                        println!("streak: {} days", streak.current);
                    }
                }
                return Ok(());
            }
            Ok(Activation::Ignored) => {}
            Err(PlayerError::Remote(err)) => {
                eprintln!("could not reach the course service: {err}");
                eprintln!("press Enter to retry");
            }
            Err(err) => return Err(err.into()),
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_numbers_are_one_based() {
        let items = ["a", "b"];
        assert_eq!(nth(&items, 1), Some(&"a"));
        assert_eq!(nth(&items, 2), Some(&"b"));
        assert_eq!(nth(&items, 0), None);
        assert_eq!(nth(&items, 3), None);
    }

    async fn sample_player() -> LessonPlayer {
        let backend = sample_backend();
        let path = CourseSnapshot::from_json(SAMPLE_COURSE)
            .unwrap()
            .into_course_path()
            .unwrap();
        LessonPlayer::open(
            path,
            Arc::new(backend.clone()),
            Arc::new(backend),
            Clock::default_clock(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn zero_option_number_selects_nothing() {
        let mut player = sample_player().await;
        assert_eq!(player.activate().await.unwrap(), Activation::Advanced);

        let command = parse_command("0").unwrap();
        apply_command(&mut player, &command).unwrap();

        let BlockAssessment::Quiz(slot) = player.assessment() else {
            panic!("expected the quiz block");
        };
        assert!(slot.state.selected().is_none());
    }

    #[tokio::test]
    async fn zero_item_or_category_number_places_nothing() {
        let mut player = sample_player().await;
        // Walk to the drag-and-drop section.
        player.activate().await.unwrap();
        apply_command(&mut player, &parse_command("1").unwrap()).unwrap();
        player.activate().await.unwrap();
        player.activate().await.unwrap();

        apply_command(&mut player, &parse_command("0 1").unwrap()).unwrap();
        apply_command(&mut player, &parse_command("1 0").unwrap()).unwrap();

        let BlockAssessment::DragDrop(state) = player.assessment() else {
            panic!("expected the drag-and-drop block");
        };
        assert!(state.items().iter().all(|i| i.current_category().is_none()));
    }
}
