//! Glossa CLI
//!
//! Command-line surface for the bookmark learning lifecycle: add bookmarks,
//! report exercise outcomes, pick study sets and inspect progress.

use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use glossa_core::{
    BookmarkInput, EventSink, ExerciseReport, FrequencyList, NoWordStatistics, Storage,
    StudyConfig, StudyService, TracingSink, UpsertOutcome, WordStatistics,
};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Glossa - vocabulary bookmark learning
#[derive(Parser)]
#[command(name = "glossa")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CLI for the Glossa bookmark learning lifecycle")]
#[command(long_about = "Glossa tracks exercises on vocabulary bookmarks.\n\nFour correct answers in a row mark a word learned; a streak-driven scheduler decides when it comes back.")]
struct Cli {
    /// Directory holding glossa.db (defaults to the platform data directory)
    #[arg(long, global = true, env = "GLOSSA_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// JSON configuration file (GLOSSA_* variables are applied on top)
    #[arg(long, global = true, env = "GLOSSA_CONFIG")]
    config: Option<PathBuf>,

    /// Frequency list, one `language<TAB>term<TAB>rank` per line
    #[arg(long, global = true, env = "GLOSSA_FREQUENCY_LIST")]
    frequency_list: Option<PathBuf>,

    /// Log as JSON lines instead of text
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a bookmark (or refresh the translation of an existing one)
    Add {
        #[arg(long)]
        user: i64,
        /// Word or phrase as found in the text
        #[arg(long)]
        origin: String,
        #[arg(long)]
        origin_lang: String,
        #[arg(long)]
        translation: String,
        #[arg(long)]
        translation_lang: String,
        /// Sentence the word was found in
        #[arg(long, default_value = "")]
        context: String,
    },

    /// Report an exercise outcome; prints OK or FAIL
    Report {
        bookmark_id: i64,
        /// Correct, Wrong, Typo, Retry, "Too easy", "Show solution", "Asked for hint"
        outcome: String,
        /// Recognize, "Multiple choice", Translate, Matching, Audio, Spelling
        source: String,
        /// Solving time in milliseconds
        #[arg(default_value = "0")]
        solving_speed: String,
        /// Idempotency key; repeating it never records the exercise twice
        #[arg(long)]
        exercise_id: Option<String>,
    },

    /// Show the next bookmarks to study
    Study {
        #[arg(long)]
        user: i64,
        #[arg(long, default_value = "10")]
        count: usize,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Star a bookmark (always studied until learned)
    Star { bookmark_id: i64 },

    /// Remove the star from a bookmark
    Unstar { bookmark_id: i64 },

    /// Return a learned bookmark to the learning pool
    Unlearn { bookmark_id: i64 },

    /// Show one bookmark as JSON
    Show { bookmark_id: i64 },

    /// Show the exercise log of a bookmark
    Log { bookmark_id: i64 },

    /// Show study statistics for a user
    Stats {
        #[arg(long)]
        user: i64,
    },

    /// Count a user's outcomes between two dates (YYYY-MM-DD, both exclusive)
    Correctness {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },

    /// Import bookmarks from a JSON-lines file
    Import {
        /// One bookmark object per line
        file: PathBuf,
    },

    /// Create a consistent copy of the database
    Backup {
        /// Output file path for the backup
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let service = open_service(&cli)?;

    match cli.command {
        Commands::Add {
            user,
            origin,
            origin_lang,
            translation,
            translation_lang,
            context,
        } => run_add(
            &service,
            BookmarkInput {
                user_id: user,
                origin,
                origin_lang,
                translation,
                translation_lang,
                context,
            },
        ),
        Commands::Report {
            bookmark_id,
            outcome,
            source,
            solving_speed,
            exercise_id,
        } => run_report(
            &service,
            ExerciseReport {
                bookmark_id,
                outcome,
                source,
                solving_speed,
                exercise_id,
            },
        ),
        Commands::Study { user, count, json } => run_study(&service, user, count, json),
        Commands::Star { bookmark_id } => run_star(&service, bookmark_id, true),
        Commands::Unstar { bookmark_id } => run_star(&service, bookmark_id, false),
        Commands::Unlearn { bookmark_id } => run_unlearn(&service, bookmark_id),
        Commands::Show { bookmark_id } => run_show(&service, bookmark_id),
        Commands::Log { bookmark_id } => run_log(&service, bookmark_id),
        Commands::Stats { user } => run_stats(&service, user),
        Commands::Correctness { user, from, to } => run_correctness(&service, user, &from, &to),
        Commands::Import { file } => run_import(&service, &file),
        Commands::Backup { output } => run_backup(&service, &output),
    }
}

// ============================================================================
// SETUP
// ============================================================================

/// Initialize logging to stderr (stdout is for command output)
fn init_logging(json: bool) {
    let filter = EnvFilter::from_default_env().add_directive(Level::WARN.into());
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .with_target(false)
            .init();
    }
}

fn open_service(cli: &Cli) -> anyhow::Result<StudyService> {
    let config = match &cli.config {
        Some(path) => StudyConfig::from_json_file(path)?,
        None => StudyConfig::default(),
    }
    .with_env_overrides();

    let db_path = match &cli.data_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            Some(dir.join("glossa.db"))
        }
        None => None,
    };
    let storage = Arc::new(Storage::new(db_path)?);
    tracing::debug!(path = %storage.path().display(), "Storage opened");

    let statistics: Arc<dyn WordStatistics> = match &cli.frequency_list {
        Some(path) => Arc::new(FrequencyList::load(path)?),
        None => Arc::new(NoWordStatistics),
    };
    let events: Arc<dyn EventSink> = Arc::new(TracingSink);

    Ok(StudyService::from_parts(storage, statistics, events, config)?)
}

// ============================================================================
// COMMANDS
// ============================================================================

fn run_add(service: &StudyService, input: BookmarkInput) -> anyhow::Result<()> {
    let upserted = service.add_bookmark(&input)?;
    let b = &upserted.bookmark;

    let verb = match upserted.outcome {
        UpsertOutcome::Created => "Created".green().bold(),
        UpsertOutcome::Fetched => "Existing".yellow().bold(),
    };
    println!(
        "{} bookmark {}: {} → {}",
        verb,
        b.id.to_string().white().bold(),
        b.origin,
        b.translation
    );
    println!(
        "  {}: {}",
        "Fit for study".dimmed(),
        yes_no(b.fit_for_study)
    );
    Ok(())
}

fn run_report(service: &StudyService, report: ExerciseReport) -> anyhow::Result<()> {
    match service.report_outcome(&report) {
        Ok(outcome) => {
            println!("OK");
            tracing::info!(
                bookmark_id = outcome.bookmark.id,
                applied = outcome.applied,
                learned = outcome.bookmark.learned,
                phase = %outcome.schedule.phase,
                "Exercise reported"
            );
            Ok(())
        }
        Err(e) => {
            println!("FAIL");
            eprintln!("{}: {}", "error".red().bold(), e);
            std::process::exit(if e.is_retryable() { 75 } else { 1 });
        }
    }
}

fn run_study(service: &StudyService, user: i64, count: usize, json: bool) -> anyhow::Result<()> {
    let bookmarks = service.study_set(user, count)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&bookmarks)?);
        return Ok(());
    }

    println!("{}", "=== Study Set ===".cyan().bold());
    println!();
    if bookmarks.is_empty() {
        println!("{}", "Nothing to study.".dimmed());
        return Ok(());
    }
    for b in &bookmarks {
        let star = if b.starred { "*".yellow().bold() } else { " ".normal() };
        println!(
            "{} {:>6}  {} → {}  {}",
            star,
            b.id,
            b.origin.white().bold(),
            b.translation,
            truncate(&b.context, 50).dimmed()
        );
    }
    Ok(())
}

fn run_star(service: &StudyService, bookmark_id: i64, starred: bool) -> anyhow::Result<()> {
    let b = service.set_starred(bookmark_id, starred)?;
    println!(
        "Bookmark {} {} (fit for study: {})",
        b.id,
        if starred { "starred" } else { "unstarred" },
        yes_no(b.fit_for_study)
    );
    Ok(())
}

fn run_unlearn(service: &StudyService, bookmark_id: i64) -> anyhow::Result<()> {
    let b = service.unlearn(bookmark_id)?;
    println!(
        "Bookmark {} back in learning (fit for study: {})",
        b.id,
        yes_no(b.fit_for_study)
    );
    Ok(())
}

fn run_show(service: &StudyService, bookmark_id: i64) -> anyhow::Result<()> {
    let view = service.bookmark_view(bookmark_id)?;
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

fn run_log(service: &StudyService, bookmark_id: i64) -> anyhow::Result<()> {
    let log = service.exercise_log(bookmark_id)?;

    println!("{}", format!("=== Exercise Log: bookmark {} ===", bookmark_id).cyan().bold());
    println!();
    if log.is_empty() {
        println!("{}", "No exercises yet.".dimmed());
        return Ok(());
    }
    for exercise in log.iter() {
        let outcome = if exercise.outcome.is_correct() {
            exercise.outcome.to_string().green()
        } else if exercise.outcome.is_miss() {
            exercise.outcome.to_string().red()
        } else {
            exercise.outcome.to_string().yellow()
        };
        println!(
            "  {}  {:15} {:16} {:>7} ms",
            exercise.time.format("%Y-%m-%d %H:%M:%S"),
            outcome,
            exercise.source.to_string(),
            exercise.solving_speed_ms
        );
    }
    println!();
    println!("{}: {}", "Summary".white().bold(), log.summary());
    Ok(())
}

fn run_stats(service: &StudyService, user: i64) -> anyhow::Result<()> {
    let stats = service.user_stats(user)?;

    println!("{}", format!("=== Glossa Statistics: user {} ===", user).cyan().bold());
    println!();
    println!("{}: {}", "Bookmarks".white().bold(), stats.total_bookmarks);
    println!("{}: {}", "Starred".white().bold(), stats.starred);
    println!("{}: {}", "Fit for Study".white().bold(), stats.fit_for_study);
    println!("{}: {}", "Due for Review".white().bold(), stats.due_for_review);
    println!("{}: {}", "Learned".white().bold(), stats.learned);
    println!("{}: {}", "Exercises".white().bold(), stats.total_exercises);

    let accuracy = if stats.total_exercises > 0 {
        (stats.correct_exercises as f64 / stats.total_exercises as f64) * 100.0
    } else {
        0.0
    };
    println!("{}: {:.1}%", "Correct".white().bold(), accuracy);
    if let Some(last) = stats.last_exercise {
        println!("{}: {}", "Last Exercise".white().bold(), last.format("%Y-%m-%d %H:%M:%S"));
    }
    Ok(())
}

fn run_correctness(service: &StudyService, user: i64, from: &str, to: &str) -> anyhow::Result<()> {
    let counts = service.exercise_correctness(user, parse_day(from)?, parse_day(to)?)?;
    let total: i64 = counts.values().sum();

    println!("{}", "=== Exercise Correctness ===".cyan().bold());
    println!();
    if total == 0 {
        println!("{}", "No exercises in this window.".dimmed());
        return Ok(());
    }
    for (outcome, count) in &counts {
        let percentage = (*count as f64 / total as f64) * 100.0;
        println!("  {:15} {:>5} ({:>5.1}%)", outcome.to_string(), count, percentage);
    }
    println!();
    println!("{}: {}", "Total".white().bold(), total);
    Ok(())
}

fn run_import(service: &StudyService, file: &Path) -> anyhow::Result<()> {
    println!("{}", "=== Glossa Import ===".cyan().bold());
    println!();
    println!("Loading bookmarks from: {}", file.display());

    let reader = BufReader::new(std::fs::File::open(file)?);
    let mut created = 0;
    let mut existing = 0;
    let mut failed = 0;

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let result = serde_json::from_str::<BookmarkInput>(&line)
            .map_err(anyhow::Error::from)
            .and_then(|input| service.add_bookmark(&input).map_err(anyhow::Error::from));

        match result {
            Ok(upserted) => match upserted.outcome {
                UpsertOutcome::Created => created += 1,
                UpsertOutcome::Fetched => existing += 1,
            },
            Err(e) => {
                failed += 1;
                println!("  [line {}] {}: {}", i + 1, "FAIL".red(), e);
            }
        }
    }

    println!();
    println!(
        "Import complete: {} created, {} already present, {} failed",
        created.to_string().green(),
        existing,
        failed
    );
    Ok(())
}

fn run_backup(service: &StudyService, output: &Path) -> anyhow::Result<()> {
    println!("{}", "=== Glossa Backup ===".cyan().bold());
    println!();

    if output.exists() {
        anyhow::bail!("Refusing to overwrite existing file: {}", output.display());
    }
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    println!("  {} {}", "From:".dimmed(), service.storage().path().display());
    println!("  {}   {}", "To:".dimmed(), output.display());
    service.storage().backup_to(output)?;

    let file_size = std::fs::metadata(output)?.len();
    let size_display = if file_size >= 1024 * 1024 {
        format!("{:.2} MB", file_size as f64 / (1024.0 * 1024.0))
    } else if file_size >= 1024 {
        format!("{:.1} KB", file_size as f64 / 1024.0)
    } else {
        format!("{} bytes", file_size)
    };

    println!();
    println!("{} Backup written ({})", "Done.".green().bold(), size_display);
    Ok(())
}

// ============================================================================
// HELPERS
// ============================================================================

/// Midnight UTC of a YYYY-MM-DD date
fn parse_day(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| anyhow::anyhow!("Invalid date '{}' (expected YYYY-MM-DD): {}", s, e))?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| anyhow::anyhow!("Invalid date '{}'", s))
}

fn yes_no(value: bool) -> colored::ColoredString {
    if value { "yes".green() } else { "no".red() }
}

/// Truncate a string for display (UTF-8 safe)
fn truncate(s: &str, max_chars: usize) -> String {
    let s = s.replace('\n', " ");
    if s.chars().count() <= max_chars {
        s
    } else {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_day() {
        let dt = parse_day("2026-03-05").unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-03-05T00:00:00+00:00");
        assert!(parse_day("05/03/2026").is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("kurz", 10), "kurz");
        assert_eq!(truncate("Größenwahn", 5), "Größe...");
        assert_eq!(truncate("a\nb", 5), "a b");
    }

    #[test]
    fn test_cli_parses_report() {
        let cli = Cli::try_parse_from([
            "glossa",
            "--data-dir",
            "/tmp/glossa",
            "report",
            "12",
            "Too easy",
            "Audio",
            "NaN",
            "--exercise-id",
            "abc",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/glossa")));
        match cli.command {
            Commands::Report {
                bookmark_id,
                outcome,
                solving_speed,
                exercise_id,
                ..
            } => {
                assert_eq!(bookmark_id, 12);
                assert_eq!(outcome, "Too easy");
                assert_eq!(solving_speed, "NaN");
                assert_eq!(exercise_id.as_deref(), Some("abc"));
            }
            _ => panic!("expected report"),
        }
    }

    #[test]
    fn test_import_skips_bad_lines_and_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(Storage::new(Some(dir.path().join("glossa.db"))).unwrap());
        let service = StudyService::new(storage, StudyConfig::default()).unwrap();

        let file = dir.path().join("bookmarks.jsonl");
        std::fs::write(
            &file,
            concat!(
                r#"{"userId":1,"origin":"Hund","originLang":"de","translation":"dog","translationLang":"en","context":"Der Hund."}"#,
                "\n",
                "not json\n",
                r#"{"userId":1,"origin":"Hund","originLang":"de","translation":"dog","translationLang":"en","context":"Der Hund."}"#,
                "\n"
            ),
        )
        .unwrap();

        run_import(&service, &file).unwrap();
        assert_eq!(service.storage().bookmarks_for_user(1).unwrap().len(), 1);
    }
}
