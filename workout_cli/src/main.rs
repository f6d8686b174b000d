use clap::{Args, Parser, Subcommand};
use std::io::{self, Read};
use std::path::PathBuf;
use workout_core::*;

#[derive(Parser)]
#[command(name = "wkgen")]
#[command(about = "Duration selection and response processing for AI-generated workouts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Use a specific config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log pipeline progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the supported workout durations
    Durations {
        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },

    /// Pick a canonical duration for a request
    Select {
        #[command(flatten)]
        request: RequestArgs,
    },

    /// Parse, normalize and validate a saved LLM response
    Process {
        /// Response file, or '-' for stdin
        #[arg(long)]
        input: String,

        #[command(flatten)]
        request: RequestArgs,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Request context flags; anything omitted comes from the config profile
#[derive(Args)]
struct RequestArgs {
    /// Requested duration in minutes
    #[arg(long)]
    duration: u32,

    /// Energy level today (1-10)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=10))]
    energy: Option<u8>,

    /// Fitness level (beginner, intermediate, advanced)
    #[arg(long)]
    fitness: Option<String>,

    /// Sore body area, repeatable
    #[arg(long = "sore")]
    sore: Vec<String>,

    /// Available equipment, repeatable
    #[arg(long)]
    equipment: Vec<String>,

    /// Workout focus
    #[arg(long)]
    focus: Option<String>,
}

impl RequestArgs {
    fn to_context(&self, profile: &ProfileConfig) -> Result<WorkoutRequestContext> {
        let mut ctx = profile.request_context(self.duration);

        if let Some(energy) = self.energy {
            ctx.energy_level = energy;
        }
        if let Some(ref fitness) = self.fitness {
            ctx.fitness_level = FitnessLevel::parse(fitness)
                .ok_or_else(|| Error::Other(format!("Unknown fitness level: {}", fitness)))?;
        }
        if !self.equipment.is_empty() {
            ctx.equipment = self.equipment.iter().map(|e| e.trim().to_string()).collect();
        }
        ctx.soreness_areas = self.sore.iter().map(|s| s.trim().to_string()).collect();
        if let Some(ref focus) = self.focus {
            ctx.focus = focus.clone();
        }

        Ok(ctx)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    workout_core::logging::init(cli.verbose);

    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Durations { json } => cmd_durations(json),
        Commands::Select { request } => cmd_select(&request.to_context(&config.profile)?),
        Commands::Process {
            input,
            request,
            json,
        } => cmd_process(&input, &request.to_context(&config.profile)?, &config, json),
    }
}

fn cmd_durations(json: bool) -> Result<()> {
    let catalog = get_default_catalog();
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid catalog".into()));
    }

    if json {
        let configs: Vec<&DurationConfig> = catalog.configs.values().collect();
        println!("{}", serde_json::to_string_pretty(&configs)?);
        return Ok(());
    }

    for config in catalog.configs.values() {
        println!(
            "{:>3} min  {:<12} warmup {} / main {} / cooldown {}  ({}% / {}% / {}%)  {:?}",
            config.duration_minutes,
            config.name,
            config.exercise_count.warmup,
            config.exercise_count.main,
            config.exercise_count.cooldown,
            config.time_allocation.warmup_pct,
            config.time_allocation.main_pct,
            config.time_allocation.cooldown_pct,
            config.complexity_tier,
        );
    }
    Ok(())
}

fn cmd_select(ctx: &WorkoutRequestContext) -> Result<()> {
    let result = select_duration_strategy(ctx);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn cmd_process(
    input: &str,
    ctx: &WorkoutRequestContext,
    config: &Config,
    json: bool,
) -> Result<()> {
    let raw = if input == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input)?
    };
    tracing::info!("Read {} bytes of response from {}", raw.len(), input);

    let report = process_response(ctx, &LlmResponse::Text(raw), &config.generation);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        display_report(&report);
    }
    Ok(())
}

fn display_report(report: &PipelineReport) {
    let workout = &report.workout;

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", workout.title);
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!(
        "  Duration: {} min ({})",
        report.duration.adjusted_duration_minutes, report.duration.config.name
    );
    if let Some(ref reason) = report.duration.adjustment_reason {
        println!("  {}", reason);
    }
    println!("  Parsed via: {}", report.parse_strategy);
    println!();

    for (_, phase) in workout.phases() {
        println!("  {} ({}s)", phase.name, phase.duration_seconds);
        for exercise in &phase.exercises {
            println!(
                "    → {} - {}s, {} x {}",
                exercise.name, exercise.duration_seconds, exercise.sets, exercise.reps
            );
        }
    }

    println!();
    println!(
        "  Fixes applied: {}  Issues found: {}",
        report.fixes_applied.len(),
        report.issues_found.len()
    );
    println!(
        "  Validation: {} (score {})",
        if report.validation.is_valid { "valid" } else { "invalid" },
        report.validation.score
    );
    for error in &report.validation.errors {
        println!("  ✗ {}: {}", error.field, error.message);
    }
    for warning in &report.validation.warnings {
        println!("  ! {}", warning.message);
    }
    println!(
        "  Scores: structure {} / completeness {} / consistency {}",
        report.scores.structure_score,
        report.scores.completeness_score,
        report.scores.consistency_score
    );
    println!();
}
