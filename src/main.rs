use std::ops::ControlFlow;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::mpsc;
use tokio::time::interval;

use raftsim::observe::{NullSink, StateSink, Visualizer};
use raftsim::{AdminCommand, Cluster, ClusterConfig};

#[derive(Parser)]
#[command(name = "raftsim")]
#[command(about = "Simulated Raft leader election between in-process nodes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a cluster and accept admin commands on stdin
    Run {
        /// Number of nodes (ignored when --config is given)
        #[arg(short, long, default_value_t = 5)]
        nodes: usize,

        /// JSON cluster configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// Do not draw the console view; log to stderr instead
        #[arg(long)]
        headless: bool,
    },

    /// Print the default configuration as JSON
    Config,
}

fn init_logging(headless: bool) {
    // The console view redraws the whole terminal, so keep stderr quiet
    // unless asked otherwise.
    let default_filter = if headless { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

/// Read admin commands on a blocking thread and forward them.
fn spawn_command_reader(tx: mpsc::UnboundedSender<AdminCommand>) {
    tokio::task::spawn_blocking(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                error!("Failed to create line editor: {e}");
                let _ = tx.send(AdminCommand::Quit);
                return;
            }
        };

        loop {
            match rl.readline("") {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(line.as_str());
                    match AdminCommand::parse(&line) {
                        Some(cmd) => {
                            let quit = cmd == AdminCommand::Quit;
                            if tx.send(cmd).is_err() || quit {
                                return;
                            }
                        }
                        None => warn!("Unrecognized command {line:?} (use: d <id>, r <id>, q)"),
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    let _ = tx.send(AdminCommand::Quit);
                    return;
                }
                Err(e) => {
                    error!("Failed to read command: {e}");
                    let _ = tx.send(AdminCommand::Quit);
                    return;
                }
            }
        }
    });
}

async fn run(config: ClusterConfig, headless: bool) -> Result<()> {
    let visualizer = Arc::new(Visualizer::new(config.log_window));
    let sink: Arc<dyn StateSink> = if headless {
        Arc::new(NullSink)
    } else {
        visualizer.clone()
    };

    let cluster = Cluster::new(&config, sink)?;
    let router = cluster.router();
    cluster.start();

    let (tx, mut commands) = mpsc::unbounded_channel();
    spawn_command_reader(tx);

    let mut refresh = interval(config.refresh_interval());
    loop {
        tokio::select! {
            cmd = commands.recv() => {
                let cmd = cmd.unwrap_or(AdminCommand::Quit);
                if let ControlFlow::Break(()) = cmd.apply(&router) {
                    break;
                }
            }
            _ = refresh.tick() => {
                if !headless {
                    visualizer.spin_once()?;
                }
            }
        }
    }

    info!("Shutting down cluster");
    cluster.shutdown().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            nodes,
            config,
            headless,
        } => {
            init_logging(headless);
            let config = match config {
                Some(path) => ClusterConfig::from_file(&path)?,
                None => ClusterConfig::with_nodes(nodes),
            };
            info!("Starting {} node cluster", config.node_ids.len());
            run(config, headless).await?;
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&ClusterConfig::default())?);
        }
    }

    Ok(())
}
