#![forbid(unsafe_code)]
use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use shiftboard::{
    calendar::{self, DateWindow, WeekdaySet},
    config::{load_options, SchedulingOptions},
    io,
    model::{ShiftId, ShiftOccurrence, VolunteerId},
    notification::{prepare_reminder, LogNotifier, TextNotice},
    plan::{load_plan_from_file, ShiftPlan},
    recurrence,
    scheduler::{NewShift, Scheduler, SchedulingError},
    shift::checked_capacity,
    storage::JsonStore,
    Caller,
};
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// CLI de planification des créneaux bénévoles
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    /// Fichier JSON du tableau de créneaux
    #[arg(long, global = true, env = "SHIFTBOARD_BOARD", default_value = "board.json")]
    board: String,

    /// Fichier JSON d'options (max_attempts, reminder_days_before)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Surcharge du nombre de tentatives en cas de conflit
    #[arg(long, global = true)]
    max_attempts: Option<u32>,

    /// Identifiant de l'appelant (journalisé)
    #[arg(long = "as", global = true, default_value = "cli")]
    caller: String,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Créer un créneau
    CreateShift {
        #[arg(long)]
        name: String,
        /// ISO 8601 (UTC si pas de décalage)
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long, allow_hyphen_values = true)]
        capacity: i64,
        /// Jours de récurrence, ex. "Mo,We,Fr"
        #[arg(long, default_value = "")]
        days: String,
    },

    /// Générer les occurrences d'un créneau récurrent
    Plan {
        /// Plan JSON (sinon, options ci-dessous)
        #[arg(long, conflicts_with_all = ["name", "days", "from", "to", "start_time", "end_time", "capacity"])]
        file: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        days: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        /// HH:MM
        #[arg(long)]
        start_time: Option<String>,
        #[arg(long)]
        end_time: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        capacity: Option<i64>,
    },

    /// Importer des plans depuis un CSV
    ImportPlans {
        #[arg(long)]
        csv: String,
    },

    /// Inscrire un bénévole
    SignUp {
        #[arg(long)]
        shift_id: String,
        #[arg(long)]
        volunteer: String,
    },

    /// Désinscrire un bénévole
    Withdraw {
        #[arg(long)]
        shift_id: String,
        #[arg(long)]
        volunteer: String,
    },

    /// Modifier la capacité
    Capacity {
        #[arg(long)]
        shift_id: String,
        #[arg(long, allow_hyphen_values = true)]
        capacity: i64,
    },

    /// Déplacer un créneau
    Reschedule {
        #[arg(long)]
        shift_id: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },

    /// Supprimer un créneau
    Delete {
        #[arg(long)]
        shift_id: String,
        /// Annule les inscriptions en cascade
        #[arg(long)]
        force: bool,
    },

    /// Lister et optionnellement exporter
    List {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        out_json: Option<String>,
        #[arg(long)]
        out_csv: Option<String>,
    },

    /// Afficher les dates d'une récurrence sur une fenêtre
    Occurrences {
        #[arg(long)]
        days: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },

    /// Semaine ISO (lundi..dimanche) d'une date
    Week {
        #[arg(long)]
        date: String,
    },

    /// Générer un rappel texte pour un bénévole
    Remind {
        #[arg(long)]
        volunteer: String,
        #[arg(long)]
        days_before: Option<i64>,
        /// Instant de référence (défaut : maintenant)
        #[arg(long)]
        now: Option<String>,
        /// Fichier de sortie (texte brut)
        #[arg(long)]
        out: String,
    },
}

fn main() {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    let code = match run(cli) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {err:#}");
            // Code 2 = conflit transitoire, relancer plus tard
            match err.downcast_ref::<SchedulingError>() {
                Some(e) if e.is_transient() => 2,
                _ => 1,
            }
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<()> {
    let mut options = match &cli.config {
        Some(path) => load_options(path)?,
        None => SchedulingOptions::default(),
    };
    if let Some(n) = cli.max_attempts {
        options.max_attempts = n;
    }
    options.validate()?;

    let store = JsonStore::open(&cli.board)?;
    let scheduler = Scheduler::new(store)
        .with_notifier(LogNotifier::new(TextNotice))
        .with_options(options);
    let caller = Caller::admin(cli.caller.as_str());

    match cli.cmd {
        Commands::CreateShift {
            name,
            start,
            end,
            capacity,
            days,
        } => {
            let request = NewShift {
                name,
                start: calendar::parse_instant(&start)?,
                end: calendar::parse_instant(&end)?,
                capacity,
                days: days.parse()?,
            };
            let shift = scheduler.create_shift(&caller, request)?;
            println!("{}", shift.id());
        }
        Commands::Plan {
            file,
            name,
            days,
            from,
            to,
            start_time,
            end_time,
            capacity,
        } => {
            let plan = match file {
                Some(path) => load_plan_from_file(path)?,
                None => ShiftPlan {
                    name: name.context("--name is required")?,
                    days: days.unwrap_or_default().parse()?,
                    window: parse_window(
                        &from.context("--from is required")?,
                        &to.context("--to is required")?,
                    )?,
                    start_time: calendar::parse_time(
                        &start_time.context("--start-time is required")?,
                    )?,
                    end_time: calendar::parse_time(&end_time.context("--end-time is required")?)?,
                    capacity: checked_capacity(capacity.context("--capacity is required")?)?,
                },
            };
            for shift in scheduler.plan_shifts(&caller, &plan)? {
                println!("{}", shift.id());
            }
        }
        Commands::ImportPlans { csv } => {
            let plans = io::import_plans_csv(csv)?;
            let mut created = 0usize;
            for plan in &plans {
                created += scheduler.plan_shifts(&caller, plan)?.len();
            }
            println!("{created} shift(s) created from {} plan(s)", plans.len());
        }
        Commands::SignUp {
            shift_id,
            volunteer,
        } => {
            let shift =
                scheduler.sign_up(&caller, &ShiftId::new(shift_id), &VolunteerId::new(volunteer))?;
            print_shift(&shift);
        }
        Commands::Withdraw {
            shift_id,
            volunteer,
        } => {
            let shift =
                scheduler.withdraw(&caller, &ShiftId::new(shift_id), &VolunteerId::new(volunteer))?;
            print_shift(&shift);
        }
        Commands::Capacity { shift_id, capacity } => {
            let shift = scheduler.update_capacity(&caller, &ShiftId::new(shift_id), capacity)?;
            print_shift(&shift);
        }
        Commands::Reschedule {
            shift_id,
            start,
            end,
        } => {
            let shift = scheduler.reschedule(
                &caller,
                &ShiftId::new(shift_id),
                calendar::parse_instant(&start)?,
                calendar::parse_instant(&end)?,
            )?;
            print_shift(&shift);
        }
        Commands::Delete { shift_id, force } => {
            let cancelled = scheduler.delete(&caller, &ShiftId::new(shift_id), force)?;
            if !cancelled.is_empty() {
                let names: Vec<&str> = cancelled.iter().map(VolunteerId::as_str).collect();
                eprintln!("cancelled signups: {}", names.join(", "));
            }
            println!("deleted");
        }
        Commands::List {
            from,
            to,
            out_json,
            out_csv,
        } => {
            let shifts = match (from, to) {
                (Some(from), Some(to)) => scheduler.shifts_in(&parse_window(&from, &to)?)?,
                (None, None) => scheduler.shifts()?,
                _ => anyhow::bail!("--from and --to go together"),
            };
            if let Some(path) = out_json {
                io::export_shifts_json(path, &shifts)?;
            }
            if let Some(path) = out_csv {
                io::export_shifts_csv(path, &shifts)?;
            }
            for shift in &shifts {
                print_shift(shift);
            }
        }
        Commands::Occurrences { days, from, to } => {
            let rule: WeekdaySet = days.parse()?;
            let window = parse_window(&from, &to)?;
            for date in recurrence::occurrence_dates(rule, &window) {
                println!("{date} {}", calendar::day_symbol(chrono::Datelike::weekday(&date)));
            }
        }
        Commands::Week { date } => {
            let week = calendar::week_range(calendar::parse_date(&date)?)?;
            println!("{week}");
        }
        Commands::Remind {
            volunteer,
            days_before,
            now,
            out,
        } => {
            let now = match now {
                Some(raw) => calendar::parse_instant(&raw)?,
                None => Utc::now(),
            };
            let volunteer = VolunteerId::new(volunteer);
            let reminder = prepare_reminder(
                &scheduler.shifts()?,
                &volunteer,
                days_before.unwrap_or(scheduler.options().reminder_days_before),
                now,
                &TextNotice,
            )?;
            std::fs::write(&out, &reminder.content)
                .with_context(|| format!("writing {out}"))?;
            println!(
                "Reminder generated for {} (shift {}) at {}",
                reminder.volunteer,
                reminder.shift_id,
                reminder.notice_at.to_rfc3339()
            );
        }
    }
    Ok(())
}

fn parse_window(from: &str, to: &str) -> Result<DateWindow> {
    Ok(DateWindow::new(
        calendar::parse_date(from)?,
        calendar::parse_date(to)?,
    )?)
}

fn print_shift(s: &ShiftOccurrence) {
    let volunteers: Vec<&str> = s.volunteers().iter().map(VolunteerId::as_str).collect();
    println!(
        "{} | {} | {} → {} | {}/{} {} | {}",
        s.id(),
        s.name(),
        s.start().to_rfc3339(),
        s.end().to_rfc3339(),
        s.signed_up(),
        s.capacity(),
        s.state().as_str(),
        if volunteers.is_empty() {
            "-".to_string()
        } else {
            volunteers.join(",")
        }
    );
}
