//! `consensus` CLI — collect availability and confirm a group event's time.
//!
//! ## Usage
//!
//! ```sh
//! # Create the event record that availability is collected for
//! consensus init-event --event 7 --title "Study group"
//!
//! # Submit availability as instants (RFC 3339, or naive UTC)
//! consensus submit --event 7 --participant alice \
//!     --start 2026-03-16T09:00:00Z --end 2026-03-16T10:00:00Z
//!
//! # ...or as a local date plus one or more HH:MM-HH:MM slots
//! consensus submit --event 7 --participant bob --date 2026-03-16 \
//!     --slot 18:30-19:30 --slot 21:00-22:00 --timezone Asia/Seoul
//!
//! # List ranked candidates
//! consensus candidates --event 7 --limit 3
//!
//! # Confirm a candidate by its start/end, or force a custom time
//! consensus confirm --event 7 --start 2026-03-16T09:30:00Z --end 2026-03-16T10:00:00Z
//! consensus confirm-custom --event 7 --start 2026-03-16T14:00:00Z --end 2026-03-16T15:00:00Z
//!
//! # Show the confirmed outcome
//! consensus show --event 7
//! ```
//!
//! State lives in a JSON file (`--state`, or `CONSENSUS_STATE`). Log output
//! goes to stderr and is controlled by `RUST_LOG` or `--log-level`.

mod state;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use consensus_engine::local::{local_window, parse_date, parse_instant, parse_slot_range};
use consensus_engine::{
    rank_slots_with_min, CalendarEvent, EventId, EventStore, InMemoryEventStore, MergedSlot,
    ParticipantId, SchedulerError, SlotKey,
};
use serde::Serialize;

use crate::state::{StateFile, StateLock};

#[derive(Parser)]
#[command(
    name = "consensus",
    version,
    about = "Collect participant availability and confirm a group event time"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path of the JSON state file
    #[arg(long, env = "CONSENSUS_STATE", default_value = "consensus-state.json", global = true)]
    state: PathBuf,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the event record availability is collected for
    InitEvent {
        #[arg(long)]
        event: u64,
        #[arg(long)]
        title: String,
        #[arg(long)]
        place: Option<String>,
        /// Meeting link for online events
        #[arg(long)]
        link: Option<String>,
        /// Expected length of the event in minutes
        #[arg(long)]
        duration: Option<u32>,
        #[arg(long)]
        note: Option<String>,
    },
    /// Register a participant's availability
    Submit {
        #[arg(long)]
        event: u64,
        #[arg(long)]
        participant: String,
        /// Window start instant
        #[arg(long, requires = "end", conflicts_with = "date")]
        start: Option<String>,
        /// Window end instant
        #[arg(long, requires = "start")]
        end: Option<String>,
        /// Local date (YYYY-MM-DD) for --slot windows
        #[arg(long, requires = "slot")]
        date: Option<String>,
        /// Local HH:MM-HH:MM window on --date; repeatable
        #[arg(long, requires = "date")]
        slot: Vec<String>,
        /// IANA timezone for --date/--slot
        #[arg(long, default_value = "UTC")]
        timezone: String,
    },
    /// List ranked candidate slots
    Candidates {
        #[arg(long)]
        event: u64,
        /// Show at most this many candidates
        #[arg(long)]
        limit: Option<usize>,
        /// Hide candidates with fewer participants
        #[arg(long, default_value_t = 1)]
        min_participants: usize,
    },
    /// Confirm the candidate with exactly this start and end
    Confirm {
        #[arg(long)]
        event: u64,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },
    /// Confirm an arbitrary window, bypassing candidates
    ConfirmCustom {
        #[arg(long)]
        event: u64,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },
    /// Show the event's scheduling state and confirmed time
    Show {
        #[arg(long)]
        event: u64,
    },
}

/// One ranked candidate as printed by `candidates`.
#[derive(Serialize)]
struct CandidateView {
    rank: usize,
    start: String,
    end: String,
    duration_minutes: i64,
    participant_count: usize,
    participants: Vec<String>,
}

impl CandidateView {
    fn new(rank: usize, slot: &MergedSlot) -> Self {
        Self {
            rank,
            start: slot.start.to_rfc3339(),
            end: slot.end.to_rfc3339(),
            duration_minutes: slot.duration_minutes(),
            participant_count: slot.participant_count(),
            participants: slot.participants.iter().map(|p| p.to_string()).collect(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}

/// stderr subscriber; `RUST_LOG` wins over `--log-level`.
fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

/// Distinct exit codes per engine error kind, so scripts can tell them apart.
fn exit_code(err: &anyhow::Error) -> u8 {
    let kind = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<SchedulerError>());
    match kind {
        Some(
            SchedulerError::InvalidWindow { .. }
            | SchedulerError::InvalidTime(_)
            | SchedulerError::InvalidTimezone(_),
        ) => 3,
        Some(SchedulerError::UnknownEvent(_)) => 4,
        Some(SchedulerError::SlotNotFound { .. }) => 5,
        Some(SchedulerError::StoreUnavailable(_)) => 6,
        None => 1,
    }
}

fn run(cli: Cli) -> Result<()> {
    let lock = StateLock::acquire(&cli.state)?;
    let scheduler = StateFile::load(&cli.state, &lock)?.into_scheduler();

    let changed = match cli.command {
        Commands::InitEvent {
            event,
            title,
            place,
            link,
            duration,
            note,
        } => {
            let record = CalendarEvent {
                place,
                link,
                duration_minutes: duration,
                note,
                ..CalendarEvent::new(EventId(event), title)
            };
            if !create_event(scheduler.events(), &record).context("Failed to create event")? {
                anyhow::bail!("Event {} already exists", record.id);
            }
            print_json(&record)?;
            true
        }
        Commands::Submit {
            event,
            participant,
            start,
            end,
            date,
            slot,
            timezone,
        } => {
            let ranges = submitted_ranges(start, end, date, &slot, &timezone)?;
            let windows = scheduler
                .register_availability_batch(EventId(event), ParticipantId::new(participant), &ranges)
                .context("Failed to register availability")?;
            print_json(&windows)?;
            true
        }
        Commands::Candidates {
            event,
            limit,
            min_participants,
        } => {
            let candidates = scheduler.compute_candidates(EventId(event))?;
            let mut ranked = rank_slots_with_min(&candidates, min_participants);
            if let Some(limit) = limit {
                ranked.truncate(limit);
            }
            let views: Vec<CandidateView> = ranked
                .iter()
                .enumerate()
                .map(|(i, slot)| CandidateView::new(i + 1, slot))
                .collect();
            print_json(&views)?;
            false
        }
        Commands::Confirm { event, start, end } => {
            let key = SlotKey::new(parse_instant(&start)?, parse_instant(&end)?);
            let schedule = scheduler
                .confirm_slot(EventId(event), key)
                .context("Failed to confirm candidate")?;
            print_json(&schedule)?;
            true
        }
        Commands::ConfirmCustom { event, start, end } => {
            let schedule = scheduler
                .confirm_custom(EventId(event), parse_instant(&start)?, parse_instant(&end)?)
                .context("Failed to confirm custom window")?;
            print_json(&schedule)?;
            true
        }
        Commands::Show { event } => {
            let id = EventId(event);
            let view = serde_json::json!({
                "event_id": id,
                "state": scheduler.state(id)?,
                "confirmation": scheduler.confirmed_schedule(id)?,
            });
            print_json(&view)?;
            false
        }
    };

    if changed {
        StateFile::from_scheduler(scheduler)?.save(&cli.state, &lock)?;
    }
    Ok(())
}

/// Insert `record` unless an event with its id exists. Returns whether it
/// was inserted.
///
/// Store failures are lifted into [`SchedulerError`] so they exit with the
/// store-unavailable code like every other command.
fn create_event(
    events: &InMemoryEventStore,
    record: &CalendarEvent,
) -> std::result::Result<bool, SchedulerError> {
    if events.get_event(record.id)?.is_some() {
        return Ok(false);
    }
    events.insert_event(record.clone())?;
    Ok(true)
}

/// Resolve `submit` arguments into UTC ranges.
///
/// Either `--start/--end` or `--date` with one or more `--slot` values.
fn submitted_ranges(
    start: Option<String>,
    end: Option<String>,
    date: Option<String>,
    slots: &[String],
    timezone: &str,
) -> Result<Vec<(DateTime<Utc>, DateTime<Utc>)>> {
    match (start, end, date) {
        (Some(start), Some(end), None) => Ok(vec![(parse_instant(&start)?, parse_instant(&end)?)]),
        (None, None, Some(date)) => {
            let date = parse_date(&date)?;
            slots
                .iter()
                .map(|slot| -> Result<_> {
                    let (from, to) = parse_slot_range(slot)?;
                    Ok(local_window(date, from, to, timezone)?)
                })
                .collect()
        }
        _ => anyhow::bail!("Provide either --start and --end, or --date with --slot"),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
