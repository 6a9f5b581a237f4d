use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use weft_actions::ActionRegistry;
use weft_engine::Engine;
use weft_store::{Event, EventContext, InstanceStore, JsonDirStore};

/// weft - an event-driven workflow orchestrator
#[derive(Parser)]
#[command(name = "weft")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.weft)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Validate a workflow file
  Validate {
    /// Path to the workflow YAML file
    workflow_file: PathBuf,
  },

  /// Run a workflow once with an event payload read from stdin
  Run {
    /// Path to the workflow YAML file
    workflow_file: PathBuf,
  },

  /// Inspect persisted workflow instances
  Instances {
    #[command(subcommand)]
    command: InstanceCommands,
  },
}

#[derive(Subcommand)]
enum InstanceCommands {
  /// List all instances, newest first
  List,

  /// Show one instance by id
  Show { id: String },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .init();

  let cli = Cli::parse();

  let data_dir = cli.data_dir.unwrap_or_else(|| {
    dirs::home_dir()
      .unwrap_or_else(|| PathBuf::from("."))
      .join(".weft")
  });

  match cli.command {
    Commands::Validate { workflow_file } => validate(workflow_file),
    Commands::Run { workflow_file } => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run(workflow_file, data_dir))
    }
    Commands::Instances { command } => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(instances(command, data_dir))
    }
  }
}

fn validate(workflow_file: PathBuf) -> Result<()> {
  let def = weft_config::load_from_file(&workflow_file)
    .with_context(|| format!("failed to load workflow file: {}", workflow_file.display()))?;
  let workflow = weft_workflow::compile(&def).context("failed to compile workflow")?;

  println!(
    "OK: {} ({} steps, triggered by '{}')",
    workflow.name,
    workflow.steps.len(),
    workflow.event
  );
  Ok(())
}

async fn run(workflow_file: PathBuf, data_dir: PathBuf) -> Result<()> {
  let def = weft_config::load_from_file(&workflow_file)
    .with_context(|| format!("failed to load workflow file: {}", workflow_file.display()))?;
  let workflow = weft_workflow::compile(&def).context("failed to compile workflow")?;

  eprintln!(
    "Loaded workflow: {} (event: {})",
    workflow.name, workflow.event
  );

  let payload = read_payload_from_stdin()?;

  let store = Arc::new(JsonDirStore::new(data_dir.join("instances"))?);
  let engine = Engine::new(
    Arc::new(ActionRegistry::with_builtins()),
    store as Arc<dyn InstanceStore>,
  );

  let event_type = workflow.event.clone();
  engine.register_workflow(workflow);
  let workflow = engine
    .workflow_for_event(&event_type)
    .context("workflow not registered")?;

  let event =
    Event::new(event_type).with_payload(payload.as_object().cloned().unwrap_or_default());

  let instance_id = engine
    .execute(workflow, EventContext::seeded(event))
    .await
    .context("workflow execution failed")?;

  let instance = engine.instance(&instance_id).await?;
  println!("{}", serde_json::to_string_pretty(&instance)?);

  Ok(())
}

async fn instances(command: InstanceCommands, data_dir: PathBuf) -> Result<()> {
  let store = JsonDirStore::new(data_dir.join("instances"))?;

  match command {
    InstanceCommands::List => {
      let mut all = store.list().await?;
      all.sort_by(|a, b| b.start_time.cmp(&a.start_time));
      for instance in &all {
        let status = serde_json::to_value(instance.status)?;
        println!(
          "{}  {:<10}  {}  {}",
          instance.id,
          status.as_str().unwrap_or("unknown"),
          instance.start_time.to_rfc3339(),
          instance.workflow_name
        );
      }
    }
    InstanceCommands::Show { id } => {
      let instance = store.get(&id).await?;
      println!("{}", serde_json::to_string_pretty(&instance)?);
    }
  }

  Ok(())
}

fn read_payload_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    // No stdin pipe, use an empty payload
    Ok(serde_json::json!({}))
  } else {
    let mut input = String::new();
    io::stdin()
      .read_to_string(&mut input)
      .context("failed to read payload from stdin")?;

    if input.trim().is_empty() {
      Ok(serde_json::json!({}))
    } else {
      serde_json::from_str(&input).context("failed to parse payload JSON from stdin")
    }
  }
}
