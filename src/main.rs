use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{CommandFactory, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use flowdeck_core::config::{AppConfig, ExecutionMode, ExecutorConfig, FailurePolicy};
use flowdeck_core::event::EventBus;
use flowdeck_core::types::{NodeStatus, WorkflowEvent};

use flowdeck_engine::{seed, GraphExecutor, StubProcessor, WorkflowGraph, WorkflowPlan, WorkflowRunner};

#[derive(Parser)]
#[command(name = "flowdeck", version, about = "Run AI and market-analysis workflow graphs")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "flowdeck.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in workflows
    List,
    /// Show a workflow's metadata, conversation and graph
    Show {
        /// Workflow id
        id: String,
    },
    /// Execute a workflow graph and print every node transition
    Run {
        /// Built-in workflow to run (defaults to 1)
        #[arg(short, long, conflicts_with = "graph")]
        workflow: Option<String>,
        /// Graph JSON file to run instead of a built-in workflow
        #[arg(short, long)]
        graph: Option<PathBuf>,
        #[command(flatten)]
        exec: ExecArgs,
    },
    /// Build a graph from a plan JSON file and execute it
    Plan {
        /// Plan file: {"description", "steps": [{"type", "input", "dependencies"}]}
        file: PathBuf,
        #[command(flatten)]
        exec: ExecArgs,
    },
    /// Check a graph JSON file and print its execution order
    Validate {
        file: PathBuf,
    },
    /// Show current configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Overrides applied on top of the `[executor]` and `[processor]` sections.
#[derive(clap::Args)]
struct ExecArgs {
    /// Start every node whose dependencies are done, not one at a time
    #[arg(long)]
    parallel: bool,
    /// Mark dependents of a failed node as blocked instead of running them
    #[arg(long)]
    skip_dependents: bool,
    /// Simulated processing delay per node, in milliseconds
    #[arg(long, env = "FLOWDECK_DELAY_MS")]
    delay_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Handle completions before config loading
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "flowdeck", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli.config)?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_filter())),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::List => {
            for wf in seed::workflows() {
                println!(
                    "{:>3}  {:<28} {:<10} {:>4}  {}",
                    wf.id,
                    wf.name,
                    format!("{:?}", wf.status).to_lowercase(),
                    wf.progress.map(|p| format!("{}%", p)).unwrap_or_default(),
                    wf.last_run
                );
            }
        }
        Commands::Show { id } => {
            let wf = seed::find(&id).ok_or_else(|| anyhow!("no workflow with id {}", id))?;
            println!("{} ({})", wf.name, wf.description);
            println!("assignee: {}  last run: {}", wf.assignee, wf.last_run);
            println!("prompt: {}\n", wf.prompt);
            for msg in &wf.chat_history {
                println!(
                    "[{} {:?}] {}",
                    msg.timestamp.format("%H:%M:%S"),
                    msg.role,
                    msg.content
                );
            }
            println!();
            print_graph(&seed::default_pipeline());
        }
        Commands::Run {
            workflow,
            graph,
            exec,
        } => {
            let graph = match graph {
                Some(path) => read_graph(&path)?,
                None => {
                    let id = workflow.unwrap_or_else(|| "1".to_string());
                    let wf = seed::find(&id).ok_or_else(|| anyhow!("no workflow with id {}", id))?;
                    info!(workflow = %wf.name, "Running built-in workflow");
                    seed::default_pipeline()
                }
            };
            execute(graph, &config, &exec).await?;
        }
        Commands::Plan { file, exec } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let plan = WorkflowPlan::from_json(&text)?;
            if !plan.description.is_empty() {
                println!("{}\n", plan.description);
            }
            execute(plan.to_graph()?, &config, &exec).await?;
        }
        Commands::Validate { file } => {
            let graph = read_graph(&file)?;
            graph.validate()?;
            println!(
                "{}: {} nodes, {} edges, valid",
                file.display(),
                graph.len(),
                graph.edges().len()
            );
            print_graph(&graph);
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Completions { .. } => unreachable!(),
    }

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    if path.exists() {
        Ok(AppConfig::load(path)?)
    } else {
        Ok(AppConfig::default())
    }
}

fn read_graph(path: &Path) -> anyhow::Result<WorkflowGraph> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(WorkflowGraph::from_json(&text)?)
}

/// Print nodes in execution order with their dependencies.
fn print_graph(graph: &WorkflowGraph) {
    let order = match graph.topological_order() {
        Ok(order) => order,
        Err(e) => {
            eprintln!("cannot order graph: {}", e);
            return;
        }
    };
    for (step, idx) in order.into_iter().enumerate() {
        let node = &graph.nodes()[idx];
        let deps: Vec<&str> = graph.dependencies_of(&node.id).into_iter().collect();
        println!(
            "{:>2}. [{}] {} ({}){}",
            step + 1,
            node.id,
            node.label,
            node.kind,
            if deps.is_empty() {
                String::new()
            } else {
                format!("  after {}", deps.join(", "))
            }
        );
    }
}

async fn execute(graph: WorkflowGraph, config: &AppConfig, args: &ExecArgs) -> anyhow::Result<()> {
    let mut exec_config: ExecutorConfig = config.executor.clone();
    if args.parallel {
        exec_config.mode = ExecutionMode::Parallel;
    }
    if args.skip_dependents {
        exec_config.failure_policy = FailurePolicy::SkipDependents;
    }
    let mut processor_config = config.processor.clone();
    if let Some(delay_ms) = args.delay_ms {
        processor_config.delay_ms = delay_ms;
    }

    let labels: Vec<(String, String)> = graph
        .nodes()
        .iter()
        .map(|n| (n.id.clone(), n.label.clone()))
        .collect();

    let event_bus = Arc::new(EventBus::default());
    let runner = WorkflowRunner::new(
        graph,
        GraphExecutor::new(exec_config),
        Arc::new(StubProcessor::from_config(&processor_config)),
        event_bus.clone(),
    );

    // Spawn event printer
    let mut rx = event_bus.subscribe();
    let print_handle = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event {
                WorkflowEvent::RunStarted { node_count, .. } => {
                    eprintln!("[run] {} nodes", node_count);
                }
                WorkflowEvent::NodeUpdated { update, .. } if update.status == NodeStatus::Idle => {}
                WorkflowEvent::NodeUpdated {
                    node_id, update, ..
                } => {
                    let label = labels
                        .iter()
                        .find(|(id, _)| *id == node_id)
                        .map(|(_, l)| l.as_str())
                        .unwrap_or("");
                    let detail = match (&update.result, &update.message) {
                        (Some(result), _) => result.summary(),
                        (None, Some(message)) => message.clone(),
                        (None, None) => String::new(),
                    };
                    eprintln!("[{}: {}] {} {}", node_id, label, update.status, detail);
                }
                WorkflowEvent::RunFinished { .. } => break,
            }
        }
    });

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();

    // Ctrl-C stops scheduling; in-flight nodes still finish
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Cancelling run...");
        cancel_clone.cancel();
    });

    let result = runner.run(&cancel).await;
    drop(runner);
    drop(event_bus);
    print_handle.await.ok();
    let report = result?;

    println!(
        "\n{} completed, {} failed, {} blocked, {} not started in {}ms",
        report.completed,
        report.failed,
        report.blocked,
        report.not_started(),
        report.elapsed_ms
    );
    for node in report.nodes.iter().filter(|n| n.status == NodeStatus::Completed) {
        if let Some(ref result) = node.result {
            println!("  {}: {}", node.id, serde_json::to_string(result)?);
        }
    }
    if report.cancelled {
        println!("run cancelled");
    }
    Ok(())
}
