//! Binary switch command-line tool.
//!
//! Starts the driver on the given serial port, waits until the network has
//! been queried, then switches one device on or off.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use zwswitch::cli::{self, Cli, Mode};
use zwswitch::{
    Driver, Error, InitBarrier, InitState, Manager, NodeId, NodeRegistry, Options, SerialConfig,
    SwitchController, Watcher, telemetry,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let loaded = Options::load(&cli.config);
    let level = loaded
        .as_ref()
        .map_or("info", |(options, _)| options.log_level.as_str());
    if let Err(e) = telemetry::initialise(cli.verbose, level) {
        eprintln!("zwswitch: {e}");
    }

    let options = match loaded {
        Ok((options, dir)) => {
            tracing::debug!("configuration loaded from {}", dir.display());
            options
        }
        Err(e) => {
            tracing::error!("{e}, exiting");
            return ExitCode::FAILURE;
        }
    };

    match run(&cli, &options).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, options: &Options) -> anyhow::Result<()> {
    tracing::debug!(
        "driver options: poll interval {:?}, interval between polls {}, validate value changes {}, log dir {}",
        options.poll_interval(),
        options.interval_between_polls,
        options.validate_value_changes,
        options.log_dir.display()
    );

    let serial = SerialConfig::new(cli.port.as_str()).baud_rate(options.baud_rate);
    let mut manager = Manager::serial(serial);
    manager.set_command_timeout(options.command_timeout());

    let registry = NodeRegistry::new();
    let barrier = InitBarrier::new();
    let watcher = Watcher::new(registry.clone(), barrier.clone(), manager.commands())
        .cancel_on_node_added(cli.mode() == Mode::Interactive);
    manager.add_watcher(watcher)?;

    manager
        .add_driver()
        .await
        .with_context(|| format!("failed to start driver on {}", cli.port))?;
    tracing::info!("driver started on {}", cli.port);

    let controller = SwitchController::new(registry, manager.commands());
    let result = control(cli, &barrier, &controller).await;

    manager.remove_watcher();
    if let Err(e) = manager.remove_driver().await {
        tracing::warn!("failed to remove driver: {e}");
    }
    result
}

async fn control<D: Driver>(
    cli: &Cli,
    barrier: &InitBarrier,
    controller: &SwitchController<D>,
) -> anyhow::Result<()> {
    let state = match cli.init_timeout() {
        Some(timeout) => barrier
            .wait_timeout(timeout)
            .await
            .context("network was not queried in time")?,
        None => barrier.wait().await,
    };
    if state == InitState::Failed {
        return Err(Error::DriverFailed.into());
    }
    if let Some(network_id) = barrier.active_network() {
        tracing::info!("network {network_id:08x} ready");
    }

    match cli.mode() {
        Mode::Once(state) => switch(controller, cli.node, state).await,
        Mode::Repeat(initial) => {
            for state in cli::repeat_states(initial) {
                switch(controller, cli.node, state).await?;
                tokio::time::sleep(cli.repeat_interval()).await;
            }
            Ok(())
        }
        Mode::Interactive => interactive(controller, cli.node).await,
    }
}

async fn switch<D: Driver>(
    controller: &SwitchController<D>,
    node: NodeId,
    state: bool,
) -> anyhow::Result<()> {
    let outcome = controller
        .toggle(node, state)
        .await
        .with_context(|| format!("failed to switch node {node}"))?;

    if !outcome.matched() {
        tracing::warn!("node {node} has no binary switch");
        return Ok(());
    }
    if !outcome.accepted {
        tracing::warn!("node {node} did not accept the new state");
    }

    for (value, text) in controller.describe(node).await {
        println!("{value} = {text}");
    }
    Ok(())
}

async fn interactive<D: Driver>(controller: &SwitchController<D>, node: NodeId) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        for command in cli::commands(&line) {
            match command {
                Ok(state) => switch(controller, node, state).await?,
                Err(other) => {
                    eprintln!("unknown command '{other}', expected 'on' or 'off'");
                    return Ok(());
                }
            }
        }
    }
    Ok(())
}

