mod operator;
mod script;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use forge_debug::{
    AgentLoop, AgentLoopConfig, AgentLoopError, BreakpointKind, DebugConfig, DebugEvent,
    DebugSession, LoopOutcome, ResumeAction, StopReason, SubscriptionId,
};
use operator::{AutoContinueOperator, ConsoleOperator, Operator, QueueOperator};
use script::RunScript;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const EXIT_ABORTED: u8 = 3;

#[derive(Parser, Debug)]
#[command(name = "forge-debug-cli")]
#[command(about = "In-process debug host for the Forge agent loop")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Run(RunArgs),
    ShowConfig(ShowConfigArgs),
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    #[arg(long)]
    script: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long = "break-tool")]
    break_tools: Vec<String>,
    #[arg(long = "break-iteration")]
    break_iterations: Vec<usize>,
    #[arg(long = "break-tokens")]
    break_tokens: Vec<u64>,
    #[arg(long, action = ArgAction::SetTrue)]
    break_on_error: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    step: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    break_before_tool: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    break_after_tool: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    break_before_subagent: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    break_after_subagent: bool,
    #[arg(long)]
    max_rounds: Option<usize>,
    #[arg(long, action = ArgAction::SetTrue)]
    parallel_tool_calls: bool,
    #[arg(long, value_enum, default_value_t = ResumeMode::Auto)]
    resume_mode: ResumeMode,
    #[arg(long = "resume")]
    resume_actions: Vec<String>,
    #[arg(long, action = ArgAction::SetTrue)]
    event_json: bool,
}

#[derive(clap::Args, Debug)]
struct ShowConfigArgs {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ResumeMode {
    Auto,
    Console,
    Queue,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => run_command(args).await,
        Commands::ShowConfig(args) => show_config_command(args),
    };

    match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(1)
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run_command(args: RunArgs) -> Result<ExitCode, String> {
    let script = RunScript::load(&args.script)?;
    let config = apply_toggle_flags(load_config(args.config.as_deref())?, &args);
    let session = Arc::new(DebugSession::from_config(&config));
    register_breakpoints(&session, &args);

    let operator = build_operator(args.resume_mode, &args.resume_actions)?;
    let (subscription, event_task) = event_stream(&session, operator, args.event_json);

    let defaults = AgentLoopConfig::default();
    let agent = AgentLoop::new(
        session.clone(),
        Arc::new(script.model()),
        script.tool_registry(),
        AgentLoopConfig {
            max_rounds: args.max_rounds.unwrap_or(defaults.max_rounds),
            parallel_tool_calls: args.parallel_tool_calls,
        },
    );
    let result = agent.run(script.input.clone()).await;

    session.events().unsubscribe(subscription);
    event_task.await.map_err(|error| error.to_string())?;

    match result {
        Ok(outcome) => {
            print_run_summary(&outcome);
            Ok(ExitCode::SUCCESS)
        }
        Err(error @ AgentLoopError::Cancelled(_)) => {
            println!("status: aborted");
            println!("reason: {error}");
            print_tokens(&session);
            Ok(ExitCode::from(EXIT_ABORTED))
        }
        Err(error) => Err(error.to_string()),
    }
}

fn show_config_command(args: ShowConfigArgs) -> Result<ExitCode, String> {
    let config = load_config(args.config.as_deref())?;
    if args.json {
        let json = serde_json::to_string_pretty(&config).map_err(|error| error.to_string())?;
        println!("{json}");
    } else {
        let text = config.to_toml_string().map_err(|error| error.to_string())?;
        print!("{text}");
    }
    Ok(ExitCode::SUCCESS)
}

fn load_config(path: Option<&Path>) -> Result<DebugConfig, String> {
    let config = match path {
        Some(path) => DebugConfig::load_from_path(path).map_err(|error| error.to_string())?,
        None => DebugConfig::default(),
    };
    Ok(config.with_env_overrides())
}

/// Command-line toggles only ever switch a break on.
fn apply_toggle_flags(mut config: DebugConfig, args: &RunArgs) -> DebugConfig {
    let toggles = &mut config.tool_calls;
    toggles.break_before_tool_call |= args.break_before_tool;
    toggles.break_after_tool_call |= args.break_after_tool;
    toggles.break_before_subagent_call |= args.break_before_subagent;
    toggles.break_after_subagent_call |= args.break_after_subagent;
    config
}

fn register_breakpoints(session: &DebugSession, args: &RunArgs) {
    let registry = session.registry();
    for tool_name in &args.break_tools {
        registry.add(BreakpointKind::ByTool {
            tool_name: tool_name.clone(),
        });
    }
    for iteration in &args.break_iterations {
        registry.add(BreakpointKind::AtIteration {
            iteration: *iteration,
        });
    }
    for threshold in &args.break_tokens {
        registry.add(BreakpointKind::OnTokenThreshold {
            threshold: *threshold,
        });
    }
    if args.break_on_error {
        registry.add(BreakpointKind::OnError);
    }
    if args.step {
        registry.set_step_mode(true);
    }
}

fn build_operator(mode: ResumeMode, actions: &[String]) -> Result<Arc<dyn Operator>, String> {
    let operator: Arc<dyn Operator> = match mode {
        ResumeMode::Auto => {
            if is_interactive_terminal() {
                Arc::new(ConsoleOperator)
            } else {
                Arc::new(AutoContinueOperator)
            }
        }
        ResumeMode::Console => Arc::new(ConsoleOperator),
        ResumeMode::Queue => {
            let actions = actions
                .iter()
                .map(|value| {
                    ResumeAction::parse(value)
                        .ok_or_else(|| format!("unknown resume action '{value}'"))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Arc::new(QueueOperator::with_actions(actions))
        }
    };
    Ok(operator)
}

/// Prints every notification and answers hits through the resume controller.
/// The task ends once the subscription is removed and the backlog is drained.
fn event_stream(
    session: &DebugSession,
    operator: Arc<dyn Operator>,
    event_json: bool,
) -> (SubscriptionId, tokio::task::JoinHandle<()>) {
    let (subscription, mut rx) = session.events().channel();
    let controller = session.controller();
    let task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if event_json {
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(_) => print_event_text(&event),
                }
            } else {
                print_event_text(&event);
            }

            if matches!(
                event,
                DebugEvent::BreakpointHit(_) | DebugEvent::ToolCallBreakpointHit(_)
            ) {
                let action = operator.decide(&event).await;
                controller.resume(action);
            }
        }
    });
    (subscription, task)
}

fn print_event_text(event: &DebugEvent) {
    match event {
        DebugEvent::BreakpointsChanged => println!("[breakpoints] changed"),
        DebugEvent::BreakpointHit(hit) => println!(
            "[break] iteration={} breakpoint=\"{}\" tokens={} last_round={}",
            hit.iteration,
            hit.breakpoint.label,
            hit.usage.total(),
            hit.last_round_id.as_deref().unwrap_or("-")
        ),
        DebugEvent::ToolCallBreakpointHit(hit) => println!(
            "[break] {} tool={} call={} breakpoint=\"{}\"",
            hit.timing, hit.tool_name, hit.tool_call_id, hit.breakpoint.label
        ),
        DebugEvent::Resumed { action, target } => {
            println!("[resume] action={action} target={target}")
        }
    }
}

fn print_run_summary(outcome: &LoopOutcome) {
    println!(
        "status: {}",
        match outcome.stop_reason {
            StopReason::Completed => "completed",
            StopReason::RoundLimit => "round_limit",
        }
    );
    println!("rounds: {}", outcome.rounds);
    println!(
        "tokens: prompt={} completion={} total={}",
        outcome.usage.prompt_tokens,
        outcome.usage.completion_tokens,
        outcome.usage.total()
    );
}

fn print_tokens(session: &DebugSession) {
    let usage = session.usage().snapshot();
    println!(
        "tokens: prompt={} completion={} total={}",
        usage.prompt_tokens,
        usage.completion_tokens,
        usage.total()
    );
}

fn is_interactive_terminal() -> bool {
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}
