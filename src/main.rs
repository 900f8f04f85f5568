//! totalgains - training progress KPIs, medals and nutrition targets

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use totalgains::config::Config;
use totalgains::db::{Database, LogEntry, ManualSet};
use totalgains::kpi::{
    self, Aggregation, Axis, ExerciseFilter, Metric, Period, SeriesPoint, percentage_change, period,
    relative_to_baseline,
};
use totalgains::medals::{Medal, MedalTotals};
use totalgains::nutrition::{
    ActivityInputs, BodyProfile, Cardio, Food, FoodNutrients, Goal, Sex, Unit, activity, calculator, units,
};
use totalgains::progress::{self, ClientProgress};
use totalgains::remote::{RemoteClient, Source};
use totalgains::tui::App;
use totalgains::workout::{self, UNGROUPED_MUSCLE, WorkoutSession, parse_date};

#[derive(Parser)]
#[command(name = "totalgains")]
#[command(author, version, about = "Training progress KPIs, medals and nutrition targets")]
struct Cli {
    #[command(flatten)]
    config: Config,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Where sessions are read from
#[derive(Args, Clone)]
struct SourceArgs {
    /// Remote client id; without it the offline log is used
    #[arg(short, long)]
    client: Option<String>,

    /// Max sessions to fetch from the backend
    #[arg(long, default_value = "200")]
    limit: u32,

    /// Use the cached sessions without contacting the backend
    #[arg(long)]
    offline: bool,
}

#[derive(Args, Clone)]
struct FilterArgs {
    /// Muscle group (TOTAL for all)
    #[arg(long)]
    muscle: Option<String>,

    /// Exercise name
    #[arg(long)]
    exercise: Option<String>,
}

impl FilterArgs {
    fn filter(&self) -> ExerciseFilter {
        ExerciseFilter::new(self.muscle.clone(), self.exercise.clone())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Open TUI dashboard
    Tui {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Log one set to the offline log
    Log {
        /// Exercise name (e.g., "Bench press")
        exercise: String,

        /// Reps performed
        #[arg(short, long)]
        reps: u32,

        /// Load in kg
        #[arg(short = 'w', long, default_value = "0")]
        load: f64,

        /// Muscle group
        #[arg(short, long, default_value = UNGROUPED_MUSCLE)]
        muscle: String,

        /// Routine name
        #[arg(long, default_value = "")]
        routine: String,

        /// Program week
        #[arg(long)]
        week: Option<u32>,

        /// Day index within the week
        #[arg(long)]
        day: Option<u32>,

        /// Target rep range, e.g. 8-12
        #[arg(short, long, value_parser = parse_rep_range)]
        target: Option<(u32, u32)>,

        /// Date (YYYY-MM-DD or RFC 3339), defaults to now
        #[arg(long)]
        date: Option<String>,

        /// Optional note
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Import sessions from a JSON export into the offline log
    Import {
        /// JSON file: array of sessions or { "workouts": [...] }
        file: std::path::PathBuf,
    },

    /// Fetch a client's sessions and refresh the local cache
    Sync {
        /// Remote client id
        client: String,

        #[arg(long, default_value = "200")]
        limit: u32,

        #[arg(short, long, value_enum, default_value_t = Period::All)]
        period: Period,
    },

    /// KPI series with percentage change
    Kpi {
        #[arg(short, long, value_enum, default_value_t = Metric::Volume)]
        metric: Metric,

        #[arg(short, long, value_enum, default_value_t = Period::All)]
        period: Period,

        /// One point per week, calendar date or session
        #[arg(short, long, value_enum, default_value_t = Axis::Week)]
        axis: Axis,

        #[command(flatten)]
        filter: FilterArgs,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Muscle balance, useful volume and compliance over a period
    Balance {
        #[arg(short, long, value_enum, default_value_t = Period::All)]
        period: Period,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Medal tiers for cumulative reps, load and volume
    Medals {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Coach overview: weekly trend, last session and RPE
    Progress {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Daily kcal, macros, water and steps
    Nutrition {
        #[arg(long)]
        age: f64,

        /// Bodyweight in kg
        #[arg(long)]
        weight: f64,

        /// Height in cm (or metres)
        #[arg(long)]
        height: f64,

        /// male / female (also hombre / mujer)
        #[arg(long, value_parser = parse_sex)]
        sex: Sex,

        /// bulk / maintain / cut (free text accepted)
        #[arg(long, value_parser = parse_goal, default_value = "maintain")]
        goal: Goal,

        /// Explicit activity factor; otherwise derived from activity flags
        #[arg(long, conflicts_with_all = ["steps", "cardio", "strength"])]
        factor: Option<f64>,

        /// Average daily steps
        #[arg(long)]
        steps: Option<u32>,

        #[arg(long, value_enum)]
        cardio: Option<Cardio>,

        /// Strength sessions per week
        #[arg(long)]
        strength: Option<u32>,
    },

    /// Food portions and recent foods
    Food {
        #[command(subcommand)]
        action: FoodAction,
    },

    /// Delete every offline log entry
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum FoodAction {
    /// Macros of a portion; remembers the food
    Portion {
        name: String,

        #[arg(long, default_value = "0")]
        kcal: f64,
        #[arg(long, default_value = "0")]
        protein: f64,
        #[arg(long, default_value = "0")]
        carbs: f64,
        #[arg(long, default_value = "0")]
        fat: f64,

        /// Amount in the chosen unit
        #[arg(short, long, default_value = "100")]
        amount: f64,

        #[arg(short, long, value_enum, default_value_t = Unit::Grams)]
        unit: Unit,

        /// The nutrient values are totals for this portion, not per 100 g
        #[arg(long)]
        totals: bool,
    },

    /// Total macros of a meal built from recent foods, items as name:amount[:unit]
    Meal {
        #[arg(required = true)]
        items: Vec<String>,
    },

    /// List recently used foods
    Recent,
}

fn parse_sex(raw: &str) -> Result<Sex, String> {
    Ok(Sex::parse(raw))
}

fn parse_goal(raw: &str) -> Result<Goal, String> {
    Ok(Goal::parse(raw))
}

fn parse_rep_range(raw: &str) -> Result<(u32, u32), String> {
    let (min, max) = raw
        .split_once('-')
        .ok_or_else(|| format!("expected MIN-MAX, got {raw}"))?;
    let min = min.trim().parse().map_err(|_| format!("invalid min in {raw}"))?;
    let max = max.trim().parse().map_err(|_| format!("invalid max in {raw}"))?;
    Ok((min, max))
}

/// `name:amount[:unit]`
fn parse_meal_item(raw: &str) -> Result<(String, f64, Unit)> {
    let mut parts = raw.split(':');
    let name = parts.next().unwrap_or_default().trim().to_string();
    let amount: f64 = parts
        .next()
        .context("missing amount")?
        .trim()
        .parse()
        .with_context(|| format!("invalid amount in {raw}"))?;
    let unit = match parts.next() {
        Some(u) => <Unit as ValueEnum>::from_str(u.trim(), true).map_err(|e| anyhow::anyhow!("{e}"))?,
        None => Unit::Grams,
    };
    if name.is_empty() {
        bail!("missing food name in {raw}");
    }
    Ok((name, amount, unit))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Offline log, cache or backend, depending on the source flags
async fn load_sessions(config: &Config, db: &Database, source: &SourceArgs, period: Period) -> Result<Vec<WorkoutSession>> {
    let Some(client) = &source.client else {
        return db.log_sessions();
    };
    if source.offline {
        return Ok(db.cached_sessions(client)?.unwrap_or_default());
    }

    let since = period.cutoff(Utc::now()).unwrap_or(DateTime::UNIX_EPOCH);
    let loaded = RemoteClient::new(config)
        .load_sessions(db, client, source.limit, since)
        .await?;
    match loaded.source {
        Source::Remote => {}
        Source::Cache => eprintln!("Backend unavailable, showing cached sessions"),
        Source::Empty => eprintln!("Backend unavailable and nothing cached"),
    }
    Ok(loaded.sessions)
}

#[derive(Serialize)]
struct KpiReport<'a> {
    metric: Metric,
    period: Period,
    axis: Axis,
    muscle: Option<&'a str>,
    exercise: Option<&'a str>,
    points: &'a [SeriesPoint],
    relative: Vec<f64>,
    change: f64,
}

#[derive(Serialize)]
struct BalanceReport {
    period: Period,
    sessions: usize,
    muscles: Vec<kpi::MuscleShare>,
    useful_volume: kpi::UsefulVolume,
    compliance: kpi::ComplianceTotal,
}

#[derive(Serialize)]
struct MedalReport {
    totals: MedalTotals,
    medals: Vec<Medal>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config;
    let json = cli.json;
    let db = Database::open(&config.db_path)?;

    match cli.command {
        Some(Commands::Tui { source, filter }) => {
            let sessions = load_sessions(&config, &db, &source, Period::All).await?;
            let mut app = App::new(db, source.client, sessions, filter.filter());
            app.run()?;
        }

        Some(Commands::Log { exercise, reps, load, muscle, routine, week, day, target, date, note }) => {
            let date = match date {
                Some(raw) => parse_date(&raw).with_context(|| format!("invalid date: {raw}"))?,
                None => Utc::now(),
            };
            let entry = db.log_set(ManualSet {
                date,
                routine,
                week,
                day,
                muscle,
                exercise,
                reps,
                load,
                target_reps: target,
                note,
            })?;
            println!(
                "Logged: {} set {} - {}x{} kg",
                entry.exercise, entry.set_index, entry.reps, entry.load
            );
        }

        Some(Commands::Import { file }) => {
            let raw = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let sessions = workout::sessions_from_json(&raw).with_context(|| format!("parsing {}", file.display()))?;
            let entries: Vec<LogEntry> = sessions.iter().flat_map(LogEntry::from_session).collect();
            let written = db.add_log_entries(&entries)?;
            info!(sessions = sessions.len(), sets = written, "import finished");
            println!("Imported {} sessions ({} sets)", sessions.len(), written);
        }

        Some(Commands::Sync { client, limit, period }) => {
            let since = period.cutoff(Utc::now()).unwrap_or(DateTime::UNIX_EPOCH);
            let sessions = RemoteClient::new(&config)
                .fetch_sessions(&client, limit, since)
                .await
                .with_context(|| format!("syncing client {client}"))?;
            db.cache_sessions(&client, &sessions)?;
            println!("Cached {} sessions for {}", sessions.len(), client);
        }

        Some(Commands::Kpi { metric, period, axis, filter, source }) => {
            let sessions = load_sessions(&config, &db, &source, period).await?;
            let sessions = kpi::filter_by_period(&sessions, period, Utc::now());

            if metric.aggregation() == Aggregation::Period {
                print_balance(period, &sessions, json)?;
                return Ok(());
            }

            let exercise_filter = filter.filter();
            let points = kpi::series(&sessions, metric, &exercise_filter, axis);
            let values: Vec<f64> = points.iter().map(|p| p.value).collect();
            let report = KpiReport {
                metric,
                period,
                axis,
                muscle: exercise_filter.muscle.as_deref(),
                exercise: exercise_filter.exercise.as_deref(),
                points: &points,
                relative: relative_to_baseline(&values),
                change: percentage_change(&values),
            };

            if json {
                print_json(&report)?;
            } else {
                println!("{} {} - {}", metric.icon(), metric.name(), period.label());
                println!("{}", metric.description());
                println!("{:-<50}", "");
                if points.is_empty() {
                    println!("No data for this period");
                }
                for (point, rel) in points.iter().zip(&report.relative) {
                    print!("{:>10} | {:>12} | {:>7.1}% | {} samples", point.label, metric.format(point.value), rel, point.samples);
                    if !point.exercises.is_empty() {
                        print!(" | {}", point.exercises.join(", "));
                    }
                    println!();
                }
                println!("{:-<50}", "");
                println!("Change: {:+.1}%", report.change);
            }
        }

        Some(Commands::Balance { period, source }) => {
            let sessions = load_sessions(&config, &db, &source, period).await?;
            let sessions = kpi::filter_by_period(&sessions, period, Utc::now());
            print_balance(period, &sessions, json)?;
        }

        Some(Commands::Medals { source }) => {
            let sessions = load_sessions(&config, &db, &source, Period::All).await?;
            let totals = MedalTotals::from_sessions(&sessions);
            let report = MedalReport { totals, medals: totals.medals() };

            if json {
                print_json(&report)?;
            } else {
                println!("Medals");
                println!("{:-<50}", "");
                for medal in &report.medals {
                    let next = medal
                        .tier
                        .next()
                        .map(|n| format!("next at {n:.0} ({:.0}%)", medal.progress * 100.0))
                        .unwrap_or_else(|| "top tier".to_string());
                    println!(
                        "{} {:<7} {:<11} {:>10.0} | {}",
                        medal.tier.icon,
                        medal.table.name(),
                        medal.tier.label,
                        medal.value,
                        next
                    );
                }
            }
        }

        Some(Commands::Progress { source }) => {
            let sessions = load_sessions(&config, &db, &source, Period::All).await?;
            let summary = ClientProgress::from_sessions(&sessions, Utc::now());

            if json {
                print_json(&summary)?;
            } else {
                let Some(last) = summary.last_session else {
                    println!("No sessions yet");
                    return Ok(());
                };
                println!("Client progress");
                println!("{:-<40}", "");
                println!(
                    "Trend: {:+.0}% ({})",
                    summary.trend,
                    progress::trend_direction(summary.trend)
                );
                println!(
                    "Volume: {:.0} kg this week, {:.0} kg last week",
                    summary.volume_this_week, summary.volume_last_week
                );
                println!("Sessions this week: {}", summary.sessions_this_week);
                println!(
                    "Last session: {} ({} days ago)",
                    last.format("%Y-%m-%d"),
                    summary.days_since_last.unwrap_or_default()
                );
                if let Some(rpe) = summary.last_rpe {
                    println!("Last RPE: {} - {}", rpe, progress::rpe_label(rpe));
                }
                if let Some(note) = &summary.last_rpe_note {
                    println!("Note: {}", note);
                }
            }
        }

        Some(Commands::Nutrition { age, weight, height, sex, goal, factor, steps, cardio, strength }) => {
            let factor = match factor {
                Some(f) => f,
                None if steps.is_none() && cardio.is_none() && strength.is_none() => calculator::DEFAULT_ACTIVITY_FACTOR,
                None => activity::compute(&ActivityInputs {
                    avg_daily_steps: steps.unwrap_or(0),
                    cardio: cardio.unwrap_or_default(),
                    strength_sessions_per_week: strength.unwrap_or(0),
                }),
            };
            let profile = BodyProfile { age, weight_kg: weight, height, sex };
            let plan = calculator::plan(&profile, goal, factor)
                .context("incomplete profile: age, weight and height must be positive")?;

            if json {
                print_json(&plan)?;
            } else {
                println!("Nutrition plan - {}", plan.goal.label());
                println!("{:-<40}", "");
                println!("BMR: {:.0} kcal | TDEE: {:.0} kcal (AF {:.3})", plan.bmr, plan.tdee, plan.activity_factor);
                for (label, day, diff) in [
                    ("Training day", &plan.training, plan.kcal_difference),
                    ("Rest day", &plan.rest, plan.kcal_difference_rest),
                ] {
                    println!(
                        "{}: {:.0} kcal ({:+.0}) | P {:.0} g  F {:.0} g  C {:.0} g | water {:.1} L",
                        label,
                        day.kcal,
                        diff,
                        day.macros.protein_g,
                        day.macros.fat_g,
                        day.macros.carbs_g,
                        day.water.liters()
                    );
                }
                println!("Steps: {}-{} per day", plan.steps.min, plan.steps.max);
            }
        }

        Some(Commands::Food { action }) => run_food(&db, action, json)?,

        Some(Commands::Clear { yes }) => {
            if !yes {
                bail!("refusing to clear the offline log without --yes");
            }
            let removed = db.clear_log()?;
            warn!(removed, "offline log cleared");
            println!("Removed {} log entries", removed);
        }

        None => {
            // Default: show TUI over the offline log
            let sessions = db.log_sessions()?;
            let mut app = App::new(db, None, sessions, ExerciseFilter::default());
            app.run()?;
        }
    }

    Ok(())
}

fn print_balance(period: Period, sessions: &[WorkoutSession], json: bool) -> Result<()> {
    let report = BalanceReport {
        period,
        sessions: sessions.len(),
        muscles: period::muscle_balance(sessions),
        useful_volume: period::useful_volume(sessions),
        compliance: period::compliance_total(sessions),
    };
    if json {
        return print_json(&report);
    }

    println!("Muscle balance - {} ({} sessions)", period.label(), report.sessions);
    println!("{:-<50}", "");
    for share in &report.muscles {
        println!(
            "{:<14} {:>10.0} kg {:>6.1}% {}",
            share.muscle,
            share.volume,
            share.share,
            period::share_bar(share.share)
        );
    }
    println!("{:-<50}", "");
    println!(
        "Useful volume: {:.0} / {:.0} kg ({:.1}%)",
        report.useful_volume.useful, report.useful_volume.total, report.useful_volume.percentage
    );
    println!(
        "Compliance: {}/{} sets ({:.1}%)",
        report.compliance.in_range, report.compliance.total, report.compliance.percentage
    );
    Ok(())
}

fn food_id(name: &str) -> String {
    name.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join("-")
}

fn run_food(db: &Database, action: FoodAction, json: bool) -> Result<()> {
    match action {
        FoodAction::Portion { name, kcal, protein, carbs, fat, amount, unit, totals } => {
            let given = FoodNutrients { kcal, protein, carbs, fat };
            let (per_100g, portion) = if totals {
                (units::per_100g_from_portion(&given, amount, unit), given)
            } else {
                (given, units::portion_macros(&given, amount, unit))
            };

            let food = Food { id: food_id(&name), name, nutrients: per_100g };
            db.remember_foods(std::slice::from_ref(&food))?;

            if json {
                print_json(&serde_json::json!({ "food": food, "portion": portion }))?;
            } else {
                println!(
                    "{} - {} {} ({:.0} g)",
                    food.name,
                    amount,
                    unit.label(),
                    unit.to_grams(amount)
                );
                print_nutrients("Portion", &portion);
                print_nutrients("Per 100 g", &food.nutrients);
            }
        }

        FoodAction::Meal { items } => {
            let recent = db.recent_foods()?;
            let mut total = FoodNutrients::default();
            let mut used = Vec::new();
            for raw in &items {
                let (name, amount, unit) = parse_meal_item(raw)?;
                let food = recent
                    .iter()
                    .find(|f| f.name.eq_ignore_ascii_case(&name) || f.id == food_id(&name))
                    .with_context(|| format!("{name} is not in recent foods; add it with `food portion` first"))?;
                let portion = units::portion_macros(&food.nutrients, amount, unit);
                total = total.add(&portion);
                used.push(food.clone());
            }
            db.remember_foods(&used)?;

            if json {
                print_json(&total)?;
            } else {
                print_nutrients("Meal total", &total);
            }
        }

        FoodAction::Recent => {
            let recent = db.recent_foods()?;
            if json {
                print_json(&recent)?;
            } else if recent.is_empty() {
                println!("No recent foods");
            } else {
                for food in &recent {
                    print_nutrients(&food.name, &food.nutrients);
                }
            }
        }
    }
    Ok(())
}

fn print_nutrients(label: &str, n: &FoodNutrients) {
    println!(
        "{:<20} {:>5.0} kcal | P {:>5.1} g  C {:>5.1} g  F {:>5.1} g",
        label, n.kcal, n.protein, n.carbs, n.fat
    );
}
