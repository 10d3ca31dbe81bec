use bedside_core::audio::{self, Tone};
use bedside_core::*;
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "bedside")]
#[command(about = "Bedside ICU reference: patient beds, resuscitation timer and shift notes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List all beds (default)
    Beds,

    /// Make a bed the current bed
    Select {
        /// Bed id, e.g. 1-1
        bed: String,
    },

    /// Show a bed record with derived values and indices
    Show {
        /// Bed to show instead of the current one
        #[arg(long)]
        bed: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Set fields on the current bed and save, e.g. `set weight_kg=80 gas_exchange.fio2=40`
    Set {
        /// One or more key=value assignments
        #[arg(required = true)]
        assignments: Vec<String>,
    },

    /// Empty the current bed
    Clear,

    /// Empty every bed
    ResetAll {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Resuscitation timer
    Resus {
        #[command(subcommand)]
        command: ResusCommands,
    },

    /// Shift notes and reminders
    Notes {
        #[command(subcommand)]
        command: NoteCommands,
    },
}

#[derive(Subcommand)]
enum ResusCommands {
    /// Run the timer interactively
    Run {
        /// Start with the metronome off
        #[arg(long)]
        no_metronome: bool,
    },

    /// Run a session on a simulated clock and print the report
    Simulate {
        /// Session length in seconds
        #[arg(long)]
        seconds: u64,

        /// Record an adrenaline dose at this second (repeatable)
        #[arg(long = "adrenaline-at")]
        adrenaline_at: Vec<u64>,

        /// Record a shock at this second (repeatable)
        #[arg(long = "shock-at")]
        shock_at: Vec<u64>,

        /// Shock energy in joules
        #[arg(long)]
        joules: Option<f64>,

        /// Run without the metronome
        #[arg(long)]
        no_metronome: bool,

        /// Also write the event log as CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Print the final state as JSON instead of the report
        #[arg(long)]
        json: bool,
    },

    /// Write the timer sounds as WAV files
    Tones {
        /// Output directory
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum NoteCommands {
    /// Add a note (to the current bed unless --bed is given)
    Add {
        #[arg(long)]
        bed: Option<String>,

        /// Mark as high priority
        #[arg(long)]
        high: bool,

        /// Schedule a reminder this many minutes from now
        #[arg(long)]
        remind_in: Option<i64>,

        /// Note text
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// List notes
    List {
        #[arg(long)]
        bed: Option<String>,

        /// Include completed notes
        #[arg(long)]
        all: bool,
    },

    /// Mark a note as done
    Done { id: String },

    /// Mark a note as not done
    Reopen { id: String },

    /// Delete a note and its reminder
    Delete { id: String },

    /// Show reminders that are due now
    Due,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    bedside_core::logging::init_for_cli(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.validate()?;

    // Determine data directory
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    tracing::debug!("Using data directory {:?}", data_dir);
    let storage = FileStore::new(data_dir);

    match cli.command.unwrap_or(Commands::Beds) {
        Commands::Beds => cmd_beds(storage, &config),
        Commands::Select { bed } => cmd_select(storage, &config, &bed),
        Commands::Show { bed, json } => cmd_show(storage, &config, bed.as_deref(), json),
        Commands::Set { assignments } => cmd_set(storage, &config, &assignments),
        Commands::Clear => cmd_clear(storage, &config),
        Commands::ResetAll { yes } => cmd_reset_all(storage, &config, yes),
        Commands::Resus { command } => match command {
            ResusCommands::Run { no_metronome } => cmd_resus_run(&config, no_metronome),
            ResusCommands::Simulate {
                seconds,
                adrenaline_at,
                shock_at,
                joules,
                no_metronome,
                csv,
                json,
            } => cmd_resus_simulate(
                &config,
                SimulationPlan {
                    seconds,
                    adrenaline_at,
                    shock_at,
                    joules: joules.unwrap_or(f64::from(config.resuscitation.default_joules)),
                    metronome: !no_metronome && config.resuscitation.metronome_enabled,
                },
                csv.as_deref(),
                json,
            ),
            ResusCommands::Tones { out } => cmd_resus_tones(&out),
        },
        Commands::Notes { command } => cmd_notes(storage, &config, command),
    }
}

fn open_store(storage: FileStore, config: &Config) -> Result<PatientStore<FileStore>> {
    PatientStore::initialize(storage, &config.ward.beds)
}

// ============================================================================
// Beds
// ============================================================================

fn cmd_beds(storage: FileStore, config: &Config) -> Result<()> {
    let store = open_store(storage, config)?;

    println!(
        "  {:<6} {:<20} {:>4} {:<7} {:>7} {:>7} {:>6} {:>5} {:>5}",
        "BED", "NAME", "AGE", "SEX", "WEIGHT", "HEIGHT", "IBW", "BMI", "BSA"
    );
    for record in store.records() {
        let marker = if record.bed_id == store.selected_bed_id() {
            "*"
        } else {
            " "
        };
        let sex = if record.is_vacant() {
            "-".to_string()
        } else {
            format!("{:?}", record.sex).to_lowercase()
        };
        println!(
            "{} {:<6} {:<20} {:>4} {:<7} {:>7} {:>7} {:>6} {:>5} {:>5}",
            marker,
            record.bed_id,
            if record.name.is_empty() { "-" } else { &record.name },
            opt(record.age),
            sex,
            opt(record.weight_kg),
            opt(record.height_cm),
            opt(record.ideal_body_weight),
            opt(record.body_mass_index),
            opt(record.body_surface_area),
        );
    }

    Ok(())
}

fn cmd_select(storage: FileStore, config: &Config, bed: &str) -> Result<()> {
    let mut store = open_store(storage, config)?;

    if store.select_bed(bed)? {
        println!("✓ Selected bed {}", bed);
    } else {
        println!(
            "Unknown bed '{}' - selection unchanged ({})",
            bed,
            store.selected_bed_id()
        );
    }
    Ok(())
}

fn cmd_show(storage: FileStore, config: &Config, bed: Option<&str>, json: bool) -> Result<()> {
    let store = open_store(storage, config)?;

    let record = match bed {
        Some(id) => store
            .record(id)
            .ok_or_else(|| Error::Other(format!("Unknown bed '{}'", id)))?,
        None => store.current(),
    };
    let indices = BedIndices::from_record(record);

    if json {
        let value = serde_json::json!({
            "record": record,
            "indices": indices,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    display_record(record, &indices);
    Ok(())
}

fn cmd_set(storage: FileStore, config: &Config, assignments: &[String]) -> Result<()> {
    let mut store = open_store(storage, config)?;

    for assignment in assignments {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| Error::Other(format!("Expected key=value, got '{}'", assignment)))?;
        store.update_current(key, value)?;
    }
    store.save()?;

    let record = store.current();
    println!("✓ Saved bed {}", record.bed_id);
    if let Some(ibw) = record.ideal_body_weight {
        println!("  IBW: {} kg", ibw);
    }
    if let Some(bmi) = record.body_mass_index {
        println!("  BMI: {}", bmi);
    }
    if let Some(bsa) = record.body_surface_area {
        println!("  BSA: {} m²", bsa);
    }
    Ok(())
}

fn cmd_clear(storage: FileStore, config: &Config) -> Result<()> {
    let mut store = open_store(storage, config)?;
    store.clear_current_bed()?;
    println!("✓ Cleared bed {}", store.selected_bed_id());
    Ok(())
}

fn cmd_reset_all(storage: FileStore, config: &Config, yes: bool) -> Result<()> {
    if !yes {
        return Err(Error::Other(
            "Refusing to empty every bed without --yes".into(),
        ));
    }

    let mut store = open_store(storage, config)?;
    store.reset_all_beds()?;
    println!("✓ Emptied {} beds", store.records().len());
    Ok(())
}

fn display_record(record: &BedRecord, indices: &BedIndices) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  BED {}", record.bed_id);
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Name:    {}", if record.name.is_empty() { "-" } else { &record.name });
    println!("  Age:     {}", opt(record.age));
    println!("  Sex:     {:?}", record.sex);
    println!("  Weight:  {} kg", opt(record.weight_kg));
    println!("  Height:  {} cm", opt(record.height_cm));
    println!();
    println!("  IBW:     {} kg", opt(record.ideal_body_weight));
    println!("  BMI:     {}", opt(record.body_mass_index));
    println!("  BSA:     {} m²", opt(record.body_surface_area));

    let gas = &record.gas_exchange;
    println!();
    println!(
        "  Gas:     FiO2 {}%  PaO2 {}  PaCO2 {}  SaO2 {}%  Hb {}  SvO2 {}%",
        opt(gas.fio2),
        opt(gas.pao2),
        opt(gas.paco2),
        opt(gas.sao2),
        opt(gas.hb),
        opt(gas.svo2)
    );

    let vent = &record.ventilation.controlled;
    println!(
        "  Vent:    Vt {}  RR {}  PEEP {}  Pplat {}  Ppeak {}",
        opt(vent.vt),
        opt(vent.rr),
        opt(vent.peep),
        opt(vent.pplat),
        opt(vent.ppeak)
    );

    let hemo = &record.hemodynamics;
    println!(
        "  PiCCO:   CI {}  SVR {}  GEDI {}  ELWI {}  MAP {}  GEF {}",
        opt(hemo.ci),
        opt(hemo.svr),
        opt(hemo.gedi),
        opt(hemo.elwi),
        opt(hemo.map),
        opt(hemo.gef)
    );

    let renal = &record.renal;
    println!(
        "  Renal:   Creat {}  Urea {}  Urine/24h {}",
        opt(renal.creatinine),
        opt(renal.urea),
        opt(renal.urine_24h)
    );

    println!();
    if let Some(pf) = indices.pf_ratio {
        println!("  → P/F ratio: {:.1}", pf);
    }
    if let Some(rox) = indices.rox_index {
        println!("  → ROX index: {:.2}", rox);
    }
    if let Some(dp) = indices.driving_pressure {
        println!("  → Driving pressure: {:.1}", dp);
    }
    if let Some(cstat) = indices.static_compliance {
        println!("  → Static compliance: {:.1}", cstat);
    }
    if let Some(vt_kg) = indices.vt_per_kg_ibw {
        println!("  → Vt/kg IBW: {:.1}", vt_kg);
    }
    println!();
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".into())
}

// ============================================================================
// Resuscitation
// ============================================================================

/// Terminal host: rings the bell for tones; no vibration or wake lock
struct TerminalEffects;

impl PlatformEffects for TerminalEffects {
    fn resume_audio(&mut self) -> Result<()> {
        Ok(())
    }

    fn play(&mut self, tone: Tone) -> Result<()> {
        let mut err = io::stderr();
        match tone {
            Tone::Tick => err.write_all(b"\x07")?,
            Tone::Alarm => err.write_all(b"\x07\x07\x07")?,
        }
        err.flush()?;
        Ok(())
    }

    fn vibrate(&mut self, _pattern_ms: &[u32]) -> Result<()> {
        Err(Error::Unsupported("terminal cannot vibrate".into()))
    }

    fn acquire_wake_lock(&mut self) -> Result<()> {
        Err(Error::Unsupported("terminal has no wake lock".into()))
    }

    fn release_wake_lock(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, PartialEq)]
enum ResusAction {
    Toggle,
    Adrenaline,
    Shock(Option<f64>),
    Metronome,
    Reset,
    Note(String),
    Quit,
    Unknown(String),
}

fn parse_resus_action(line: &str) -> ResusAction {
    let line = line.trim();
    let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
    match head.to_lowercase().as_str() {
        "" | "p" => ResusAction::Toggle,
        "a" => ResusAction::Adrenaline,
        "s" => ResusAction::Shock(rest.trim().parse().ok()),
        "m" => ResusAction::Metronome,
        "r" => ResusAction::Reset,
        "n" if !rest.trim().is_empty() => ResusAction::Note(rest.trim().to_string()),
        "q" => ResusAction::Quit,
        _ => ResusAction::Unknown(line.to_string()),
    }
}

fn cmd_resus_run(config: &Config, no_metronome: bool) -> Result<()> {
    let mut settings = TimerSettings::from(&config.resuscitation);
    if no_metronome {
        settings.metronome_enabled = false;
    }
    let default_joules = f64::from(config.resuscitation.default_joules);
    let mut timer = ResuscitationTimer::new(settings, TerminalEffects, SystemClock);

    println!("─────────────────────────────────────────");
    println!("Enter/p  start/pause     a  adrenaline");
    println!("s [J]    shock           m  metronome");
    println!("n TEXT   note            r  reset");
    println!("q        quit and print the report");
    println!("─────────────────────────────────────────");

    // stdin is read on a helper thread; only this loop touches the timer
    let (tx, rx) = channel::<String>();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    timer.start();
    let mut last = Instant::now();
    let mut shown = String::new();

    'session: loop {
        loop {
            match rx.try_recv() {
                Ok(line) => match parse_resus_action(&line) {
                    ResusAction::Toggle => timer.toggle(),
                    ResusAction::Adrenaline => timer.record_adrenaline(),
                    ResusAction::Shock(joules) => {
                        timer.record_shock(joules.unwrap_or(default_joules))
                    }
                    ResusAction::Metronome => timer.toggle_metronome(),
                    ResusAction::Reset => timer.reset(),
                    ResusAction::Note(text) => timer.record_note(text),
                    ResusAction::Quit => break 'session,
                    ResusAction::Unknown(text) => println!("\nUnknown command: {}", text),
                },
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break 'session,
            }
        }

        let now = Instant::now();
        timer.advance(now - last);
        last = now;

        let status = status_line(&timer);
        if status != shown {
            print!("\r{}", status);
            io::stdout().flush()?;
            shown = status;
        }

        thread::sleep(Duration::from_millis(50));
    }

    timer.pause();
    println!("\n\n{}", timer.export_log());
    Ok(())
}

fn status_line<E: PlatformEffects, C: Clock>(timer: &ResuscitationTimer<E, C>) -> String {
    let last_event = timer
        .event_log()
        .first()
        .map(|e| format!("  | {}", e.message))
        .unwrap_or_default();
    format!(
        "{} {}  round {}  adr {}  shocks {}  metronome {}{}   ",
        if timer.is_running() { "▶" } else { "⏸" },
        timer.formatted_elapsed(),
        timer.round_count(),
        timer.adrenaline_count(),
        timer.shock_count(),
        if timer.metronome_active() { "on" } else { "off" },
        last_event
    )
}

struct SimulationPlan {
    seconds: u64,
    adrenaline_at: Vec<u64>,
    shock_at: Vec<u64>,
    joules: f64,
    metronome: bool,
}

fn cmd_resus_simulate(
    config: &Config,
    plan: SimulationPlan,
    csv: Option<&Path>,
    json: bool,
) -> Result<()> {
    let mut settings = TimerSettings::from(&config.resuscitation);
    settings.metronome_enabled = plan.metronome;

    let clock = ManualClock::new(Local::now());
    let mut timer = ResuscitationTimer::new(settings, NullEffects, clock.clone());
    timer.start();

    for second in 0..=plan.seconds {
        for _ in plan.adrenaline_at.iter().filter(|s| **s == second) {
            timer.record_adrenaline();
        }
        for _ in plan.shock_at.iter().filter(|s| **s == second) {
            timer.record_shock(plan.joules);
        }

        if second < plan.seconds {
            clock.advance(Duration::from_secs(1));
            timer.advance(Duration::from_secs(1));
        }
    }
    timer.pause();

    if let Some(path) = csv {
        let rows = timer.export_log_csv(path)?;
        eprintln!("Wrote {} events to {}", rows, path.display());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&timer.snapshot())?);
    } else {
        println!("{}", timer.export_log());
        println!("\nMetronome beats: {}", timer.beats_played());
    }
    Ok(())
}

fn cmd_resus_tones(out: &Path) -> Result<()> {
    for tone in [Tone::Tick, Tone::Alarm] {
        let path = out.join(format!("{}.wav", tone.name()));
        let samples = audio::synthesize(tone, audio::SAMPLE_RATE);
        audio::write_wav(&path, &samples, audio::SAMPLE_RATE)?;
        println!("✓ {} → {}", tone.name(), path.display());
    }
    Ok(())
}

// ============================================================================
// Notes
// ============================================================================

fn cmd_notes(storage: FileStore, config: &Config, command: NoteCommands) -> Result<()> {
    let mut notes = ShiftNotes::load(storage.clone());

    match command {
        NoteCommands::Add {
            bed,
            high,
            remind_in,
            text,
        } => {
            let store = open_store(storage, config)?;
            let bed_id = match bed {
                Some(bed) => store
                    .record(&bed)
                    .map(|r| r.bed_id.clone())
                    .ok_or_else(|| Error::Other(format!("Unknown bed '{}'", bed)))?,
                None => store.selected_bed_id().to_string(),
            };
            let priority = if high {
                NotePriority::High
            } else {
                NotePriority::Low
            };
            let reminder = remind_in
                .map(|minutes| reminder_time(Utc::now(), minutes))
                .transpose()?;

            let note = notes.add(&bed_id, &text.join(" "), priority, reminder)?;
            println!("✓ Note {} added to bed {}", short_id(&note), bed_id);
            if let Some(at) = note.reminder_time {
                println!("  Reminder at {}", at.with_timezone(&Local).format("%H:%M"));
            }
        }

        NoteCommands::List { bed, all } => {
            let listed: Vec<_> = notes
                .list()
                .iter()
                .filter(|n| bed.as_deref().map_or(true, |b| n.bed_id == b))
                .filter(|n| all || !n.completed)
                .collect();

            if listed.is_empty() {
                println!("No notes.");
            }
            for note in listed {
                display_note(note);
            }
        }

        NoteCommands::Done { id } => {
            let id = notes.resolve_id(&id)?;
            notes.set_completed(id, true)?;
            println!("✓ Note marked done");
        }

        NoteCommands::Reopen { id } => {
            let id = notes.resolve_id(&id)?;
            notes.set_completed(id, false)?;
            println!("✓ Note reopened");
        }

        NoteCommands::Delete { id } => {
            let id = notes.resolve_id(&id)?;
            notes.delete(id)?;
            println!("✓ Note deleted");
        }

        NoteCommands::Due => {
            let due = notes.reminders_mut().take_due(Utc::now())?;
            if due.is_empty() {
                println!("No reminders due.");
            }
            for reminder in due {
                println!("! {}: {}", reminder.title, reminder.body);
            }
        }
    }

    Ok(())
}

/// `minutes` from `now`; negative or out-of-range offsets are rejected
fn reminder_time(now: DateTime<Utc>, minutes: i64) -> Result<DateTime<Utc>> {
    let invalid = || Error::InvalidValue {
        field: "remind_in".into(),
        value: minutes.to_string(),
    };
    if minutes < 0 {
        return Err(invalid());
    }
    chrono::Duration::try_minutes(minutes)
        .and_then(|offset| now.checked_add_signed(offset))
        .ok_or_else(invalid)
}

fn short_id(note: &ShiftNote) -> String {
    note.id.to_string()[..8].to_string()
}

fn display_note(note: &ShiftNote) {
    let reminder = note
        .reminder_time
        .map(|at| format!("  (reminder {})", at.with_timezone(&Local).format("%H:%M")))
        .unwrap_or_default();
    println!(
        "[{}] {}  {:<5} {:<4} {}{}",
        if note.completed { "x" } else { " " },
        short_id(note),
        note.bed_id,
        match note.priority {
            NotePriority::High => "HIGH",
            NotePriority::Low => "low",
        },
        note.content,
        reminder
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resus_action() {
        assert_eq!(parse_resus_action(""), ResusAction::Toggle);
        assert_eq!(parse_resus_action("  P "), ResusAction::Toggle);
        assert_eq!(parse_resus_action("a"), ResusAction::Adrenaline);
        assert_eq!(parse_resus_action("s"), ResusAction::Shock(None));
        assert_eq!(parse_resus_action("s 150"), ResusAction::Shock(Some(150.0)));
        assert_eq!(parse_resus_action("s lots"), ResusAction::Shock(None));
        assert_eq!(parse_resus_action("m"), ResusAction::Metronome);
        assert_eq!(parse_resus_action("r"), ResusAction::Reset);
        assert_eq!(
            parse_resus_action("n airway secured"),
            ResusAction::Note("airway secured".into())
        );
        assert_eq!(parse_resus_action("n"), ResusAction::Unknown("n".into()));
        assert_eq!(parse_resus_action("q"), ResusAction::Quit);
        assert_eq!(parse_resus_action("x"), ResusAction::Unknown("x".into()));
    }

    #[test]
    fn test_reminder_time_bounds() {
        let now = Utc::now();
        assert_eq!(reminder_time(now, 0).unwrap(), now);
        assert_eq!(
            reminder_time(now, 30).unwrap(),
            now + chrono::Duration::minutes(30)
        );
        assert!(matches!(
            reminder_time(now, -1),
            Err(Error::InvalidValue { .. })
        ));
        assert!(matches!(
            reminder_time(now, i64::MAX / 2),
            Err(Error::InvalidValue { .. })
        ));
        assert!(reminder_time(now, i64::MAX).is_err());
    }
}
