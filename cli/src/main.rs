//! CLI entrypoint for toolgate
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::{CommandFactory, Parser};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use toolgate_application::{
    CallerScope, CompositeObserver, InvocationObserver, LIST_TOOLS, RequestDispatcher,
    ToolInvoker, TracingObserver,
};
use toolgate_domain::{CallerId, InvokeError};
use toolgate_infrastructure::{
    CONFIG_PATH_VAR, ChildProcessConnector, ConfigLoader, EnvFeatureSwitch, FileConfig,
    JsonlInvocationLogger, Severity, ToolRegistry, serve_stdio,
};
use toolgate_presentation::{Cli, Command, ConsoleFormatter, OutputFormat, parse_arguments};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let _log_guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(ExitCode::SUCCESS);
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };
    check_config(&config)?;

    let Some(command) = cli.command.clone() else {
        Cli::command().print_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Command::Serve => serve(&config).await,
        Command::Call { tool, caller, args } => {
            let caller = parse_caller(&caller)?;
            let arguments = parse_arguments(&args).map_err(|e| anyhow!(e))?;
            let invoker = build_invoker(&config, server_config_path(&cli), cli.event_log.as_deref());

            let result = match scope_for(&config, &caller, invoker.clone()) {
                Some(scope) => scope.invoke(&tool, arguments).await,
                None => invoker.invoke(&tool, arguments, &caller).await,
            };
            invoker.shutdown().await;

            Ok(report(cli.output, &tool, result))
        }
        Command::List { caller } => {
            let caller = caller.as_deref().map(parse_caller).transpose()?;
            let invoker = build_invoker(&config, server_config_path(&cli), cli.event_log.as_deref());

            let scope = caller
                .as_ref()
                .and_then(|c| scope_for(&config, c, invoker.clone()));
            let listed = invoker.list_tools(caller.as_ref()).await;
            invoker.shutdown().await;

            match listed {
                Ok(mut tools) => {
                    if let Some(scope) = &scope {
                        tools.retain(|t| scope.allows(&t.name));
                    }
                    println!("{}", ConsoleFormatter::format_tools(cli.output, &tools));
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => Ok(report(cli.output, LIST_TOOLS, Err(e))),
            }
        }
    }
}

/// Initialize logging based on verbosity level.
///
/// Logs go to stderr, or to `log_file` when given; stdout carries results
/// and, in `serve` mode, the tool channel itself.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .with_context(|| format!("--log-file must name a file: {}", path.display()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Could not create log directory {}", dir.display()))?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer)
        .init();
    Ok(Some(guard))
}

/// Log every config issue; refuse to start on errors.
fn check_config(config: &FileConfig) -> Result<()> {
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            Severity::Warning => warn!("Config: {}", issue.message()),
            Severity::Error => tracing::error!("Config: {}", issue.message()),
        }
    }
    let errors = issues
        .iter()
        .filter(|i| i.severity == Severity::Error)
        .count();
    if errors > 0 {
        bail!("Configuration has {} error(s); see log output", errors);
    }
    Ok(())
}

fn parse_caller(raw: &str) -> Result<CallerId> {
    CallerId::new(raw).ok_or_else(|| anyhow!("--caller must not be blank"))
}

async fn serve(config: &FileConfig) -> Result<ExitCode> {
    let registry = ToolRegistry::from_config(&config.server.tools);
    if registry.is_empty() {
        warn!("No tools configured under [server.tools]; every call will fail");
    }
    info!(tools = ?registry.names(), "Tool registry ready");

    let dispatcher = RequestDispatcher::new(
        Arc::new(registry),
        Arc::new(config.server.to_allowlist()),
    )
    .with_server_info(config.server.server_info());

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping");
            on_signal.cancel();
        }
    });

    serve_stdio(&dispatcher, cancel)
        .await
        .context("Tool server transport failed")?;
    Ok(ExitCode::SUCCESS)
}

/// Config file the spawned server should load, so both sides agree on it.
fn server_config_path(cli: &Cli) -> Option<PathBuf> {
    if cli.no_config {
        return None;
    }
    cli.config
        .as_deref()
        .map(|path| std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()))
}

fn build_invoker(
    config: &FileConfig,
    server_config: Option<PathBuf>,
    event_log: Option<&Path>,
) -> Arc<ToolInvoker> {
    let tracing_observer: Arc<dyn InvocationObserver> = Arc::new(TracingObserver);
    let observer: Arc<dyn InvocationObserver> =
        match event_log.and_then(|path| JsonlInvocationLogger::new(path)) {
            Some(logger) => {
                let logger: Arc<dyn InvocationObserver> = Arc::new(logger);
                Arc::new(CompositeObserver::new(vec![tracing_observer, logger]))
            }
            None => tracing_observer,
        };

    let mut connector = ChildProcessConnector::new(config.client.command.as_str());
    if let Some(path) = server_config {
        connector = connector.with_env(CONFIG_PATH_VAR, path.display().to_string());
    }

    Arc::new(ToolInvoker::new(
        Arc::new(connector),
        config.client.to_invoker_settings(),
        Arc::new(EnvFeatureSwitch::new(config.client.enabled)),
        observer,
    ))
}

/// The caller's configured client-side scope, if it has one.
fn scope_for(
    config: &FileConfig,
    caller: &CallerId,
    invoker: Arc<ToolInvoker>,
) -> Option<CallerScope> {
    config.client.callers.contains_key(caller.as_str()).then(|| {
        CallerScope::from_allowlist(caller.clone(), &config.client.scope_allowlist(), invoker)
    })
}

fn report(format: OutputFormat, tool: &str, result: Result<Value, InvokeError>) -> ExitCode {
    match result {
        Ok(value) => {
            println!("{}", ConsoleFormatter::format_result(format, tool, &value));
            ExitCode::SUCCESS
        }
        Err(e) => {
            let rendered = ConsoleFormatter::format_error(format, tool, &e);
            match format {
                OutputFormat::Json => println!("{}", rendered),
                OutputFormat::Text => eprintln!("{}", rendered),
            }
            ExitCode::FAILURE
        }
    }
}
