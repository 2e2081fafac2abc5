//! rq-core: risk quantification CLI.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use rq_common::{OutputFormat, SessionId, ThreatActorId, SCHEMA_VERSION};
use rq_config::{load_config, state_dir, ConfigSnapshot, LoadedConfig};
use rq_core::exit_codes::ExitCode;
use rq_core::log_event;
use rq_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage,
};
use rq_core::pipeline::{evaluate, persist, Scenario};
use rq_core::session::{DerivedSnapshot, DerivedState, FileStore};

#[derive(Parser, Debug)]
#[command(name = "rq-core")]
#[command(about = "Threat event frequency, total risk and control ROSI from a scenario file")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to risk_quant.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the derived-state store
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only report errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score a scenario and write the derived values
    Evaluate(EvaluateArgs),

    /// Inspect or reset the derived-state store
    State(StateArgs),

    /// Validate configuration and, optionally, a scenario
    Check(CheckArgs),

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// Scenario JSON file
    scenario: PathBuf,

    /// Threat actor to score instead of the scenario's selection
    #[arg(long)]
    actor: Option<String>,

    /// Do not write TEF, TotalLEF and TotalRisk to the state store
    #[arg(long)]
    no_persist: bool,
}

#[derive(Args, Debug)]
struct StateArgs {
    #[command(subcommand)]
    command: StateCommands,
}

#[derive(Subcommand, Debug)]
enum StateCommands {
    /// Print the stored derived values
    Show,
    /// Clear every stored derived value
    Reset,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Also parse and dry-run this scenario
    #[arg(long)]
    scenario: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let cli_level = if cli.global.quiet {
        Some(LogLevel::Error)
    } else if cli.global.verbose > 0 {
        Some(LogLevel::Warn.more_verbose(cli.global.verbose))
    } else {
        None
    };
    let cli_format = cli.global.format.is_machine().then_some(LogFormat::Jsonl);
    init_logging(&LogConfig::from_env(cli_level, cli_format));

    let ctx = LogContext::new(generate_run_id()).with_session_id(SessionId::new().to_string());

    let result = match &cli.command {
        Commands::Evaluate(args) => run_evaluate(&cli.global, args, &ctx),
        Commands::State(args) => run_state(&cli.global, args, &ctx),
        Commands::Check(args) => run_check(&cli.global, args, &ctx),
        Commands::Version => {
            print_version(&cli.global);
            Ok(ExitCode::Clean)
        }
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(err) => report_error(&cli.global, &err, &ctx),
    };
    std::process::exit(exit_code.as_i32());
}

fn load(global: &GlobalOpts, ctx: &LogContext) -> rq_common::Result<LoadedConfig> {
    match load_config(global.config.as_deref()) {
        Ok(loaded) => {
            log_event!(
                ctx,
                DEBUG,
                event_names::CONFIG_LOADED,
                Stage::Init,
                "configuration loaded",
                source = %loaded.source
            );
            Ok(loaded)
        }
        Err(e) => {
            log_event!(ctx, WARN, event_names::CONFIG_ERROR, Stage::Init, "configuration rejected", code = e.code());
            Err(rq_common::Error::InvalidConfig(e.to_string()))
        }
    }
}

fn open_state(global: &GlobalOpts, loaded: &LoadedConfig) -> DerivedState<FileStore> {
    let path = state_dir(global.state.as_deref()).join(&loaded.config.state_file);
    DerivedState::new(FileStore::new(path))
}

fn run_evaluate(
    global: &GlobalOpts,
    args: &EvaluateArgs,
    ctx: &LogContext,
) -> rq_common::Result<ExitCode> {
    let loaded = load(global, ctx)?;
    let scenario = Scenario::from_file(&args.scenario)?;
    log_event!(
        ctx,
        DEBUG,
        event_names::SCENARIO_LOADED,
        Stage::Load,
        "scenario loaded",
        path = %args.scenario.display()
    );

    let actor = args.actor.as_deref().map(ThreatActorId::from);
    let report = evaluate(&scenario, &loaded.config, actor.as_ref(), ctx)?
        .with_config(ConfigSnapshot::capture(&loaded));

    if !args.no_persist {
        let mut state = open_state(global, &loaded);
        persist(&report, &mut state, ctx)?;
    }

    match global.format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Md => print!("{}", report.to_markdown()),
        OutputFormat::Summary => println!("{}", report.summary_line()),
        OutputFormat::Exitcode => {}
    }

    Ok(if report.budget.status.is_over() {
        ExitCode::OverBudget
    } else {
        ExitCode::Clean
    })
}

fn run_state(global: &GlobalOpts, args: &StateArgs, ctx: &LogContext) -> rq_common::Result<ExitCode> {
    let loaded = load(global, ctx)?;
    let mut state = open_state(global, &loaded);
    let path = state.store().path().to_path_buf();

    match args.command {
        StateCommands::Show => {
            let snapshot = state.snapshot()?;
            print_state(global, &path, &snapshot)?;
        }
        StateCommands::Reset => {
            state.reset()?;
            log_event!(ctx, INFO, event_names::STATE_RESET, Stage::Persist, "derived state reset");
            print_state(global, &path, &DerivedSnapshot::default())?;
        }
    }
    Ok(ExitCode::Clean)
}

fn print_state(global: &GlobalOpts, path: &Path, snapshot: &DerivedSnapshot) -> rq_common::Result<()> {
    match global.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "path": path.display().to_string(),
            "state": snapshot,
        }))?,
        OutputFormat::Md => {
            println!("| Key | Value |\n|---|---|");
            println!("| TEF | {:.4} |", snapshot.tef);
            println!("| TotalLEF | {:.4} |", snapshot.total_lef);
            println!("| TotalRisk | {:.2} |", snapshot.total_risk);
            println!(
                "| Threat actor | {} |",
                snapshot.selected_threat_actor_id.as_ref().map_or("-", |id| id.as_str())
            );
        }
        OutputFormat::Summary => println!(
            "TEF={:.4} TotalLEF={:.4} TotalRisk={:.2} actor={}",
            snapshot.tef,
            snapshot.total_lef,
            snapshot.total_risk,
            snapshot.selected_threat_actor_id.as_ref().map_or("-", |id| id.as_str())
        ),
        OutputFormat::Exitcode => {}
    }
    Ok(())
}

fn run_check(global: &GlobalOpts, args: &CheckArgs, ctx: &LogContext) -> rq_common::Result<ExitCode> {
    let mut checks = Vec::new();
    let mut exit = ExitCode::Clean;

    let loaded = match load(global, ctx) {
        Ok(loaded) => {
            checks.push(serde_json::json!({
                "check": "config",
                "status": "ok",
                "source": loaded.source.to_string(),
                "path": loaded.path.as_ref().map(|p| p.display().to_string()),
                "hash": loaded.content_hash.clone(),
            }));
            Some(loaded)
        }
        Err(e) => {
            exit = ExitCode::ConfigError;
            checks.push(serde_json::json!({
                "check": "config",
                "status": "error",
                "error": e.to_string(),
            }));
            None
        }
    };

    if let (Some(path), Some(loaded)) = (&args.scenario, &loaded) {
        let outcome = Scenario::from_file(path)
            .and_then(|s| evaluate(&s, &loaded.config, None, ctx).map(|r| (s, r)));
        match outcome {
            Ok((scenario, report)) => checks.push(serde_json::json!({
                "check": "scenario",
                "status": "ok",
                "path": path.display().to_string(),
                "threat_actors": scenario.threat_actors.len(),
                "assets": scenario.assets.len(),
                "controls": scenario.controls.len(),
                "tef": report.derived.tef,
            })),
            Err(e) => {
                let err: rq_common::Error = e.into();
                exit = ExitCode::for_error(&err);
                checks.push(serde_json::json!({
                    "check": "scenario",
                    "status": "error",
                    "path": path.display().to_string(),
                    "error": err.to_string(),
                }));
            }
        }
    }

    match global.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "ok": exit == ExitCode::Clean,
            "checks": checks,
        }))?,
        OutputFormat::Exitcode => {}
        _ => {
            for check in &checks {
                let status = check["status"].as_str().unwrap_or("?");
                let name = check["check"].as_str().unwrap_or("?");
                match check["error"].as_str() {
                    Some(err) => println!("{name}: {status} ({err})"),
                    None => println!("{name}: {status}"),
                }
            }
        }
    }
    Ok(exit)
}

fn print_version(global: &GlobalOpts) {
    match global.format {
        OutputFormat::Json => {
            let info = serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "config_schema_version": rq_config::CONFIG_SCHEMA_VERSION,
                "rq_core_version": env!("CARGO_PKG_VERSION"),
            });
            // A json! value always serializes.
            if let Ok(text) = serde_json::to_string_pretty(&info) {
                println!("{text}");
            }
        }
        OutputFormat::Exitcode => {}
        _ => {
            println!("rq-core {}", env!("CARGO_PKG_VERSION"));
            println!("schema version: {SCHEMA_VERSION}");
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> rq_common::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report_error(global: &GlobalOpts, err: &rq_common::Error, ctx: &LogContext) -> ExitCode {
    let code = ExitCode::for_error(err);
    log_event!(
        ctx,
        WARN,
        event_names::COMMAND_FAILED,
        Stage::Report,
        "command failed",
        code = err.code(),
        exit = code.as_i32(),
        user_error = code.is_user_error()
    );
    match global.format {
        OutputFormat::Json => {
            let body = serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "error": err.to_json(),
                "exit_code": code.code_name(),
            });
            println!("{body}");
        }
        OutputFormat::Exitcode => {}
        _ => eprintln!("{}", err.format_human()),
    }
    code
}
