// SPDX-License-Identifier: MIT OR Apache-2.0
//! `OrdoPlay` script runner.
//!
//! Loads a script document, starts one instance and fires events at it,
//! logging every action. Used to smoke test scripts outside the editor.
//! Exits non-zero when the script fails to load or any node fails.

mod config;
mod host;

use clap::Parser;
use config::{RunnerConfig, DEFAULT_LOG_FILTER};
use host::LoggingHost;
use ordoplay_script_graph::runtime::{EffectError, Instance};
use ordoplay_script_graph::{DocumentError, Script};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Runner config (RON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Script document; overrides the config
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Event to fire, repeatable; replaces the configured events
    #[arg(short, long = "event")]
    events: Vec<String>,

    /// Start in this state instead of the initial one
    #[arg(long)]
    start_state: Option<String>,

    /// Only load and validate the script
    #[arg(long)]
    check: bool,
}

impl Cli {
    /// Command-line values take precedence over the config
    fn apply(&self, mut config: RunnerConfig) -> RunnerConfig {
        if let Some(script) = &self.script {
            config.script = Some(script.clone());
        }
        if !self.events.is_empty() {
            config.events = self.events.clone();
        }
        if let Some(state) = &self.start_state {
            config.start_state = Some(state.clone());
        }
        config
    }
}

#[derive(Debug, Error)]
enum RunError {
    #[error("No script given; pass --script or set `script` in the config")]
    MissingScript,

    #[error("Failed to load script: {0}")]
    Document(#[from] DocumentError),

    #[error("Script has no state named '{0}'")]
    UnknownState(String),

    #[error("Cannot set variable '{name}': {source}")]
    Variable { name: String, source: EffectError },

    #[error("{0} node failure(s) during the run")]
    NodeFailures(usize),
}

fn init_logging(filter: &str) {
    let env_filter = filter
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .filter_map(|d| d.parse::<Directive>().ok())
        .fold(tracing_subscriber::EnvFilter::from_default_env(), |f, d| f.add_directive(d));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn run(config: &RunnerConfig, check_only: bool) -> Result<(), RunError> {
    let path = config.script.as_ref().ok_or(RunError::MissingScript)?;
    let script = Script::load(path)?;

    let issues = script.validate();
    for issue in &issues {
        tracing::warn!("{issue}");
    }
    tracing::info!(
        script = %script.name,
        states = script.state_count(),
        issues = issues.len(),
        "script validated"
    );
    if check_only {
        return Ok(());
    }

    let start = match &config.start_state {
        Some(name) => Some(
            script
                .state_by_name(name)
                .map(|s| s.id())
                .ok_or_else(|| RunError::UnknownState(name.clone()))?,
        ),
        None => None,
    };

    let mut instance = Instance::new(Arc::new(script));
    if let Some(state) = start {
        instance
            .set_current_state(state)
            .map_err(|_| RunError::UnknownState(config.start_state.clone().unwrap_or_default()))?;
    }
    for (name, value) in &config.variables {
        instance
            .set_variable(name, value.clone())
            .map_err(|source| RunError::Variable {
                name: name.clone(),
                source,
            })?;
    }

    let mut host = LoggingHost::default();
    let mut failures = 0;
    for event in &config.events {
        let output = instance.fire_event(event, &mut host);
        failures += output.diagnostics.len();
        tracing::info!(
            event = %event,
            executed = output.executed().count(),
            state = instance.current_state_name().unwrap_or("<none>"),
            "event fired"
        );
    }

    tracing::info!(
        events = config.events.len(),
        actions = host.actions,
        emitted = host.emitted.len(),
        state = instance.current_state_name().unwrap_or("<none>"),
        "run finished"
    );

    if failures > 0 {
        return Err(RunError::NodeFailures(failures));
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match RunnerConfig::resolve(cli.config.as_deref()) {
        Ok(config) => cli.apply(config),
        Err(e) => {
            init_logging(DEFAULT_LOG_FILTER);
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.log_filter);

    match run(&config, cli.check) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordoplay_script_graph::{Node, NodeKind, Value, ValueType, VariableDef};

    #[test]
    fn test_cli_overrides_config() {
        let config = RunnerConfig {
            script: Some(PathBuf::from("a.ron")),
            events: vec!["Start".into()],
            ..Default::default()
        };

        let cli = Cli::parse_from(["ordoplay_script", "-e", "Open", "--event", "Close"]);
        let merged = cli.apply(config.clone());
        assert_eq!(merged.script, Some(PathBuf::from("a.ron")));
        assert_eq!(merged.events, vec!["Open", "Close"]);

        let cli = Cli::parse_from(["ordoplay_script", "--script", "b.json", "--start-state", "Open"]);
        let merged = cli.apply(config);
        assert_eq!(merged.script, Some(PathBuf::from("b.json")));
        assert_eq!(merged.events, vec!["Start"]);
        assert_eq!(merged.start_state.as_deref(), Some("Open"));
    }

    #[test]
    fn test_missing_script() {
        assert!(matches!(
            run(&RunnerConfig::default(), false),
            Err(RunError::MissingScript)
        ));
    }

    #[test]
    fn test_run_script_file() {
        let mut script = Script::new("Door");
        script.declare_variable(VariableDef::new("speed", ValueType::Float));
        let closed = script.add_state("Closed");
        let open = script.add_state("Open");
        let start = script
            .add_node(closed, Node::new(NodeKind::EventReceiver { event: "Open".into() }))
            .unwrap();
        let switch = script
            .add_node(closed, Node::new(NodeKind::StateSwitch { target: Some(open) }))
            .unwrap();
        let out = script.node(start).unwrap().port_named("Out").unwrap().id();
        let input = script.node(switch).unwrap().port_named("In").unwrap().id();
        script.connect(start, out, switch, input).unwrap();

        let path = std::env::temp_dir().join(format!("runner-{}.ron", script.id().0));
        script.save(&path).unwrap();

        let mut config = RunnerConfig {
            script: Some(path.clone()),
            events: vec!["Open".into()],
            ..Default::default()
        };
        config.variables.insert("speed".into(), Value::Int(2));
        assert!(run(&config, false).is_ok());

        config.start_state = Some("Ajar".into());
        assert!(matches!(run(&config, false), Err(RunError::UnknownState(_))));

        config.start_state = None;
        config.variables.insert("mana".into(), Value::Int(1));
        assert!(matches!(run(&config, false), Err(RunError::Variable { .. })));

        let _ = std::fs::remove_file(path);
    }
}
