mod app;
mod board;
mod config;
mod input;
mod ui;

use std::env;
use std::path::Path;

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, eyre, WrapErr};

use app::App;
use board::draft::DraftTray;
use board::drag::{DragSource, DropTarget};
use board::filter::{all_tags, CardFilter};
use board::service::{BoardError, CardEdit, CardInput, Change, MoveOutcome, TimerOutcome};
use board::storage::{find_board_dir, init_board, load_local_config, save_local_config, StorageError, BOARD_DIR};
use board::store::StoreError;
use board::timer::{self, format_duration, live_seconds, TimerState};
use board::{parse_tags, Card, CardId, ColumnId, ColumnRole, Priority};

#[derive(Parser)]
#[command(name = "focusboard", about = "A focus-first personal Kanban board")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize a new .focusboard/ board in the current directory
    Init {
        /// Board name (defaults to current directory name)
        #[arg(short, long)]
        name: Option<String>,
        /// Who you are on this board (saved to the gitignored local.toml)
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Add a new card
    Add {
        /// Card title
        title: String,
        /// Column id (defaults to the first column)
        #[arg(short, long)]
        column: Option<String>,
        /// Priority (low, medium, high)
        #[arg(short, long, default_value = "medium")]
        priority: Priority,
        /// Tags (comma-separated)
        #[arg(short, long, default_value = "")]
        tags: String,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Edit a card's fields
    Edit {
        card_id: String,
        #[arg(long)]
        title: Option<String>,
        /// New description (empty to clear)
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        priority: Option<Priority>,
        /// Replace tags (comma-separated, empty to clear)
        #[arg(short, long)]
        tags: Option<String>,
        #[arg(long, conflicts_with = "no_due")]
        due: Option<NaiveDate>,
        /// Remove the due date
        #[arg(long)]
        no_due: bool,
    },
    /// List cards by column
    List {
        /// Case-insensitive text search
        #[arg(short, long)]
        search: Option<String>,
        /// Only cards with any of these tags (repeatable)
        #[arg(short, long)]
        tag: Vec<String>,
        /// Due on or after (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Due on or before (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Show archived cards instead
        #[arg(long)]
        archived: bool,
    },
    /// Move a card to a column (appends unless --index is given)
    Move {
        card_id: String,
        column: String,
        /// Zero-based position in the target column
        #[arg(short, long)]
        index: Option<usize>,
    },
    /// Apply a raw drag intent, e.g. `overflow:7 column:done`
    Drag { source: DragSource, target: DropTarget },
    /// Archive a card
    Archive { card_id: String },
    /// Restore an archived card to the end of its column
    Unarchive { card_id: String },
    /// Park a card in the overflow tray
    Park { card_id: String },
    /// Bring a parked card back to its column
    Unpark { card_id: String },
    /// Toggle a card's timer, or `timer status`
    Timer { card: String },
    /// Delete cards
    Delete {
        #[arg(required = true)]
        card_ids: Vec<String>,
    },
    /// Manage columns
    Column {
        #[command(subcommand)]
        action: ColumnAction,
    },
    /// List all tags with card counts
    Tags,
    /// Check the board and stop timers that should not be running
    Doctor,
    /// Stream activity log to stdout (JSONL, one entry per line)
    Log,
}

#[derive(Subcommand)]
enum ColumnAction {
    /// Add a column after the last one
    Add { title: String },
    Rename { column: String, title: String },
    Hide { column: String },
    Show { column: String },
    /// Give a column the focus or done role (`none` clears it)
    Role { column: String, role: String },
}

fn main() {
    // Install color_eyre for unexpected panics/errors (developer bugs).
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let cwd = match env::current_dir() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: cannot determine current directory: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Command::Init { name, user }) => {
            let name = name.unwrap_or_else(|| {
                cwd.file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("My Board")
                    .to_string()
            });
            cmd_init(&cwd, &name, user)
        }
        Some(Command::Add {
            title,
            column,
            priority,
            tags,
            due,
            description,
        }) => {
            let input = CardInput {
                title,
                description,
                priority,
                due_date: due,
                tags: parse_tags(&tags),
            };
            cmd_add(&cwd, input, column.as_deref())
        }
        Some(Command::Edit {
            card_id,
            title,
            description,
            priority,
            tags,
            due,
            no_due,
        }) => {
            let edit = CardEdit {
                title,
                description: description.map(Some),
                priority,
                due_date: if no_due { Some(None) } else { due.map(Some) },
                tags: tags.as_deref().map(parse_tags),
            };
            cmd_edit(&cwd, &card_id, edit)
        }
        Some(Command::List {
            search,
            tag,
            from,
            to,
            archived,
        }) => {
            let filter = CardFilter {
                search: search.unwrap_or_default(),
                tags: tag,
                from,
                to,
            };
            cmd_list(&cwd, &filter, archived)
        }
        Some(Command::Move { card_id, column, index }) => cmd_move(&cwd, &card_id, &column, index),
        Some(Command::Drag { source, target }) => cmd_drag(&cwd, &source, &target),
        Some(Command::Archive { card_id }) => cmd_archive(&cwd, &card_id, true),
        Some(Command::Unarchive { card_id }) => cmd_archive(&cwd, &card_id, false),
        Some(Command::Park { card_id }) => cmd_park(&cwd, &card_id, true),
        Some(Command::Unpark { card_id }) => cmd_park(&cwd, &card_id, false),
        Some(Command::Timer { card }) if card == "status" => cmd_timer_status(&cwd),
        Some(Command::Timer { card }) => cmd_timer(&cwd, &card),
        Some(Command::Delete { card_ids }) => cmd_delete(&cwd, &card_ids),
        Some(Command::Column { action }) => cmd_column(&cwd, action),
        Some(Command::Tags) => cmd_tags(&cwd),
        Some(Command::Doctor) => cmd_doctor(&cwd),
        Some(Command::Log) => cmd_log(&cwd),
        None => cmd_tui(&cwd),
    };

    if let Err(e) = result {
        print_user_error(&e);
        std::process::exit(1);
    }
}

/// Print a user-friendly error message, with actionable hints for known error types.
fn print_user_error(error: &color_eyre::Report) {
    if let Some(board_err) = error.downcast_ref::<BoardError>() {
        match board_err {
            BoardError::Unauthorized => {
                eprintln!("error: no user is set for this board.");
                eprintln!("  Run `focusboard init --user <name>` or set FOCUSBOARD_USER.");
            }
            BoardError::CapacityExceeded { .. } => eprintln!("error: {board_err}"),
            BoardError::Validation(msg) => eprintln!("error: {msg}"),
            BoardError::Store(StoreError::Storage(e)) => print_storage_error(e),
            BoardError::Store(e) => eprintln!("error: {e}"),
        }
        return;
    }
    if let Some(StoreError::Storage(e)) = error.downcast_ref::<StoreError>() {
        print_storage_error(e);
        return;
    }
    if let Some(e) = error.downcast_ref::<StorageError>() {
        print_storage_error(e);
        return;
    }
    eprintln!("error: {error:#}");
}

fn print_storage_error(err: &StorageError) {
    match err {
        StorageError::NotFound(_) => {
            eprintln!("error: no focusboard found in this directory.");
            eprintln!("  Run `focusboard init` to create one.");
        }
        StorageError::InvalidCard { path, reason } => {
            eprintln!(
                "error: invalid card file: {}",
                path.file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or(&path.to_string_lossy())
            );
            eprintln!("  {reason}");
        }
        StorageError::InvalidSlug(slug) => {
            eprintln!("error: invalid column id: {slug:?}");
            eprintln!("  Column ids must match [a-z0-9][a-z0-9-]*");
        }
        StorageError::TomlDe(e) => {
            eprintln!("error: config file has invalid TOML syntax.");
            eprintln!("  {e}");
            eprintln!("  Run `focusboard doctor` to diagnose.");
        }
        StorageError::TomlSer(e) => {
            eprintln!("error: failed to save board config.");
            eprintln!("  {e}");
        }
        StorageError::Io(e) => {
            eprintln!("error: could not read or write board files.");
            eprintln!("  {e}");
        }
    }
}

fn cmd_init(cwd: &Path, name: &str, user: Option<String>) -> color_eyre::Result<()> {
    if cwd.join(BOARD_DIR).exists() {
        bail!("Board already exists in this directory.");
    }
    let board_dir = init_board(cwd, name)?;
    if let Some(user) = user {
        let mut local = load_local_config(&board_dir)?;
        local.user = Some(user);
        save_local_config(&board_dir, &local)?;
    }
    println!("Initialized focusboard '{}' in {}", name, board_dir.display());

    let service = app::open_board(cwd)?;
    match service.current_user() {
        Some(user) => {
            // open_board already seeded them
            let columns = service.snapshot()?.layout().columns().len();
            println!("Created {columns} columns for {user}: Todo, In Progress, Done and more.");
        }
        None => println!("No user found. Set FOCUSBOARD_USER or rerun with --user <name>."),
    }
    println!("Run `focusboard` to open the board, or `focusboard add \"Card title\"` to add cards.");
    Ok(())
}

/// Resolve a column by id, or by title ignoring case.
fn resolve_column(service: &App, column: &str) -> color_eyre::Result<ColumnId> {
    let snapshot = service.snapshot()?;
    snapshot
        .layout()
        .columns()
        .iter()
        .find(|c| c.id.as_str() == column || c.title.eq_ignore_ascii_case(column))
        .map(|c| c.id.clone())
        .ok_or_else(|| eyre!("Column '{column}' not found"))
}

fn cmd_add(cwd: &Path, input: CardInput, column: Option<&str>) -> color_eyre::Result<()> {
    let mut service = app::open_board(cwd)?;
    let column = match column {
        Some(column) => resolve_column(&service, column)?,
        None => service
            .snapshot()?
            .layout()
            .visible_columns()
            .first()
            .map(|c| c.id.clone())
            .ok_or_else(|| eyre!("The board has no visible columns"))?,
    };
    let id = service.create_card(input, &column, Utc::now())?;
    println!("Created card #{id} in {column}");
    Ok(())
}

fn cmd_edit(cwd: &Path, card_id: &str, edit: CardEdit) -> color_eyre::Result<()> {
    let mut service = app::open_board(cwd)?;
    match service.update_card(&CardId::new(card_id), edit, Utc::now())? {
        Change::Applied => println!("Updated card #{card_id}"),
        Change::Unchanged => println!("Nothing to change. Pass at least one field to edit."),
        Change::Ignored => println!("Card #{card_id} not found"),
    }
    Ok(())
}

fn print_card(card: &Card, now: chrono::DateTime<Utc>) {
    let age = board::age::format_age(card.created_at, now);
    let tags = if card.tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", card.tags.join(", "))
    };
    let due = card
        .due_date
        .map(|d| format!(" due {d}"))
        .unwrap_or_default();
    let seconds = live_seconds(card, now);
    let time = match timer::state(card) {
        TimerState::Running { since } => {
            format!("  ▶ {} since {}", format_duration(seconds), since.format("%H:%M UTC"))
        }
        TimerState::Stopped if seconds == 0 => String::new(),
        TimerState::Stopped => format!("  {}", format_duration(seconds)),
    };
    println!(
        "  {:>4} {:>4}  {}{}{}  {}{}",
        card.id,
        age,
        card.title,
        tags,
        due,
        card.priority.symbol(),
        time
    );
}

fn cmd_list(cwd: &Path, filter: &CardFilter, archived: bool) -> color_eyre::Result<()> {
    let service = app::open_board(cwd)?;
    let snapshot = service.snapshot()?;
    let now = Utc::now();

    if archived {
        let cards = snapshot.archived_cards();
        println!("\nArchive ({})", cards.len());
        println!("{}", "─".repeat(40));
        for card in cards {
            print_card(card, now);
        }
        println!();
        return Ok(());
    }

    let layout = snapshot.layout();
    for col in layout.columns() {
        let cards: Vec<&Card> = snapshot
            .column_cards(&col.id)
            .into_iter()
            .filter(|c| filter.matches(c))
            .collect();
        if cards.is_empty() && filter.is_active() {
            continue;
        }
        let marker = match layout.role_of(&col.id) {
            Some(ColumnRole::Focus) => format!(
                " [focus {}/{}]",
                snapshot.focus_count(),
                snapshot.capacity_guard().limit()
            ),
            Some(role) => format!(" [{}]", role.as_str()),
            None => String::new(),
        };
        let hidden = if col.hidden { " (hidden)" } else { "" };
        println!("\n{} ({}){marker}{hidden}", col.title, cards.len());
        println!("{}", "─".repeat(40));
        for card in cards {
            print_card(card, now);
        }
    }

    let parked: Vec<&Card> = snapshot
        .overflow_cards()
        .into_iter()
        .filter(|c| filter.matches(c))
        .collect();
    if !parked.is_empty() {
        println!("\nTray ({})", parked.len());
        println!("{}", "─".repeat(40));
        for card in parked {
            print_card(card, now);
        }
    }
    println!();
    Ok(())
}

fn report_move(outcome: &MoveOutcome) {
    match outcome {
        MoveOutcome::Moved {
            card_id,
            from,
            to,
            timer_stopped,
            celebrated,
        } => {
            println!("Moved card #{card_id}: {from} → {to}");
            if *timer_stopped {
                println!("Timer stopped.");
            }
            if *celebrated {
                println!("Done. Nice work!");
            }
        }
        MoveOutcome::Reordered { card_id, column } => println!("Reordered card #{card_id} in {column}"),
        MoveOutcome::Promoted { draft, card_id } => println!("Promoted {draft} to card #{card_id}"),
        MoveOutcome::Archived(id) => println!("Archived card #{id}"),
        MoveOutcome::Parked(id) => println!("Parked card #{id}"),
        MoveOutcome::Unchanged => println!("Nothing to do"),
        MoveOutcome::Ignored => println!("Nothing moved: card or target not found"),
    }
}

fn cmd_move(cwd: &Path, card_id: &str, column: &str, index: Option<usize>) -> color_eyre::Result<()> {
    let mut service = app::open_board(cwd)?;
    let column = resolve_column(&service, column)?;
    let id = CardId::new(card_id);
    let now = Utc::now();
    let outcome = match index {
        Some(index) => service.move_to_index(&id, &column, index, now)?,
        None => service.move_to_column(&id, &column, now)?,
    };
    report_move(&outcome);
    Ok(())
}

fn cmd_drag(cwd: &Path, source: &DragSource, target: &DropTarget) -> color_eyre::Result<()> {
    if matches!(source, DragSource::Draft(_)) {
        bail!("Drafts live only inside the interactive board");
    }
    let mut service = app::open_board(cwd)?;
    let outcome = service.move_card(&mut DraftTray::default(), source, target, Utc::now())?;
    report_move(&outcome);
    Ok(())
}

fn report_change(change: Change, card_id: &str, done: &str) {
    match change {
        Change::Applied => println!("{done} card #{card_id}"),
        Change::Unchanged => println!("Card #{card_id} is already in that state"),
        Change::Ignored => println!("Card #{card_id} not found"),
    }
}

fn cmd_archive(cwd: &Path, card_id: &str, archived: bool) -> color_eyre::Result<()> {
    let mut service = app::open_board(cwd)?;
    let change = service.toggle_archive(&CardId::new(card_id), archived, Utc::now())?;
    report_change(change, card_id, if archived { "Archived" } else { "Restored" });
    Ok(())
}

fn cmd_park(cwd: &Path, card_id: &str, overflowed: bool) -> color_eyre::Result<()> {
    let mut service = app::open_board(cwd)?;
    let change = service.set_overflow(&CardId::new(card_id), overflowed, Utc::now())?;
    report_change(change, card_id, if overflowed { "Parked" } else { "Unparked" });
    Ok(())
}

fn cmd_timer(cwd: &Path, card_id: &str) -> color_eyre::Result<()> {
    let mut service = app::open_board(cwd)?;
    match service.toggle_timer(&CardId::new(card_id), Utc::now())? {
        TimerOutcome::Started { card_id, stopped } => {
            for stop in stopped {
                println!("Stopped timer on card #{} (+{})", stop.card_id, format_duration(stop.credited));
            }
            println!("Started timer on card #{card_id}");
        }
        TimerOutcome::Stopped(stop) => {
            println!("Stopped timer on card #{} (+{})", stop.card_id, format_duration(stop.credited));
        }
        TimerOutcome::Ineligible => {
            bail!("Card #{card_id} is not in the focus column. Move it there first.")
        }
        TimerOutcome::Ignored => println!("Card #{card_id} not found"),
    }
    Ok(())
}

fn cmd_timer_status(cwd: &Path) -> color_eyre::Result<()> {
    let service = app::open_board(cwd)?;
    let snapshot = service.snapshot()?;
    match snapshot.running_card() {
        Some(card) => println!(
            "▶ #{} {}  {}",
            card.id,
            card.title,
            format_duration(live_seconds(card, Utc::now()))
        ),
        None => println!("No timer running"),
    }
    Ok(())
}

fn cmd_delete(cwd: &Path, card_ids: &[String]) -> color_eyre::Result<()> {
    let mut service = app::open_board(cwd)?;
    let ids: Vec<CardId> = card_ids.iter().map(|id| CardId::new(id.as_str())).collect();
    let deleted = service.delete_cards(&ids, Utc::now())?;
    println!("Deleted {deleted} of {} card(s)", ids.len());
    Ok(())
}

fn cmd_column(cwd: &Path, action: ColumnAction) -> color_eyre::Result<()> {
    let mut service = app::open_board(cwd)?;
    let now = Utc::now();
    let (column, change) = match action {
        ColumnAction::Add { title } => {
            let id = service.create_column(&title, now)?;
            println!("Created column '{title}' ({id})");
            return Ok(());
        }
        ColumnAction::Rename { column, title } => {
            let id = resolve_column(&service, &column)?;
            (column, service.rename_column(&id, &title, now)?)
        }
        ColumnAction::Hide { column } => {
            let id = resolve_column(&service, &column)?;
            (column, service.set_column_hidden(&id, true, now)?)
        }
        ColumnAction::Show { column } => {
            let id = resolve_column(&service, &column)?;
            (column, service.set_column_hidden(&id, false, now)?)
        }
        ColumnAction::Role { column, role } => {
            let role = match role.as_str() {
                "none" => None,
                other => Some(other.parse::<ColumnRole>().map_err(|e| eyre!(e))?),
            };
            let id = resolve_column(&service, &column)?;
            (column, service.set_column_role(&id, role, now)?)
        }
    };
    match change {
        Change::Applied => println!("Updated column '{column}'"),
        Change::Unchanged => println!("Column '{column}' already looks like that"),
        Change::Ignored => println!("Column '{column}' not found"),
    }
    Ok(())
}

fn cmd_tags(cwd: &Path) -> color_eyre::Result<()> {
    let service = app::open_board(cwd)?;
    let snapshot = service.snapshot()?;
    let tags = all_tags(snapshot.cards().iter().filter(|c| !c.archived));
    if tags.is_empty() {
        println!("No tags found.");
        return Ok(());
    }
    for (tag, count) in tags {
        println!("  {tag:<20} {count}");
    }
    Ok(())
}

fn cmd_doctor(cwd: &Path) -> color_eyre::Result<()> {
    let mut issues = 0u32;

    println!("\nfocusboard doctor\n");
    let mut service = app::open_board(cwd)?;
    println!(
        "  \u{2713} Board \"{}\" found at {}",
        service.store().name(),
        service.store().dir().display()
    );

    let Some(user) = service.current_user() else {
        println!("  \u{2717} No current user");
        println!("    \u{2192} Set FOCUSBOARD_USER or run `focusboard init --user <name>`");
        println!("\n1 issue(s) found.");
        return Ok(());
    };
    println!("  \u{2713} Signed in as {user}");

    let snapshot = service.snapshot()?;
    let layout = snapshot.layout();
    match layout.focus().and_then(|id| layout.column(id)) {
        Some(col) => println!("  \u{2713} Focus column: {}", col.title),
        None => {
            println!("  \u{2717} No focus column (need a `focus` role or at least 2 columns)");
            issues += 1;
        }
    }
    if let Some(col) = layout.done().and_then(|id| layout.column(id)) {
        println!("  \u{2713} Done column: {}", col.title);
    }

    let count = snapshot.focus_count();
    let limit = snapshot.capacity_guard().limit();
    if count > limit {
        println!("  \u{2717} Focus column holds {count} cards, over its capacity of {limit}");
        println!("    \u{2192} Move or park cards until it is back under the limit");
        issues += 1;
    } else {
        println!("  \u{2713} Focus column at {count}/{limit}");
    }

    let stopped = service.reconcile_timers(Utc::now())?;
    if stopped.is_empty() {
        println!("  \u{2713} Timers consistent");
    } else {
        for stop in &stopped {
            println!(
                "  \u{2192} Stopped stray timer on card #{} (+{})",
                stop.card_id,
                format_duration(stop.credited)
            );
        }
    }

    println!();
    if issues == 0 {
        println!("All checks passed.");
    } else {
        println!("{issues} issue(s) found.");
    }
    Ok(())
}

fn cmd_log(cwd: &Path) -> color_eyre::Result<()> {
    use std::io::{self, BufRead, BufWriter, ErrorKind, Write};

    let board_dir = find_board_dir(cwd)?;
    let log_path = board_dir.join("activity.log");

    let file = match std::fs::File::open(&log_path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e).wrap_err("failed to open activity.log"),
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for line in io::BufReader::new(file).lines() {
        let line = line.wrap_err("error reading activity.log")?;
        match writeln!(out, "{line}") {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::BrokenPipe => return Ok(()),
            Err(e) => return Err(e).wrap_err("error writing to stdout"),
        }
    }
    // BufWriter drops flush errors on drop; a closed pipe is a clean exit.
    if let Err(e) = out.flush() {
        if e.kind() != ErrorKind::BrokenPipe {
            return Err(e).wrap_err("error writing to stdout");
        }
    }
    Ok(())
}

fn cmd_tui(cwd: &Path) -> color_eyre::Result<()> {
    let mut terminal = ratatui::init();
    let result = app::run(&mut terminal, cwd);
    ratatui::restore();
    result
}
