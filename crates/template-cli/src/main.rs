use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::OnceLock,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use regex::Regex;
use template_contracts::{parse_contracts_str, template_contracts, PluginContracts};
use template_core::{
    cli::HelloFlags,
    config::PluginConfig,
    plugin::TracingContext,
    rest::HelloRequest,
    setup::{self, SetupInput},
    Surfaces,
};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_CONFIG_PATH: &str = ".kb/template/template.toml";

#[derive(Parser, Debug)]
#[command(
    name = "plugin-template",
    author,
    version,
    about = "Reference plugin with CLI, REST and setup surfaces"
)]
struct Cli {
    /// Sets the log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Plugin configuration file (defaults to .kb/template/template.toml when present).
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a hello message from the plugin template.
    Hello {
        /// Name to greet.
        #[arg(short, long)]
        name: Option<String>,
        /// Message replacing the default greeting.
        #[arg(short, long)]
        message: Option<String>,
        /// Emit JSON payload instead of formatted text.
        #[arg(long)]
        json: bool,
    },
    /// Invoke REST handlers locally, as the host would.
    Rest {
        #[command(subcommand)]
        command: RestCommands,
    },
    /// Inspect and validate contracts manifests.
    Contracts {
        #[command(subcommand)]
        command: ContractsCommands,
    },
    /// Create starter .kb assets and default config for the template plugin.
    Setup {
        /// Workspace root to seed.
        #[arg(long, value_name = "DIR", default_value = ".")]
        dir: PathBuf,
        /// Overwrite files that differ from the template defaults.
        #[arg(long)]
        force: bool,
        /// Report what would change without writing.
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand, Debug)]
enum RestCommands {
    /// GET /hello
    Hello {
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_name = "ID", default_value = "local")]
        request_id: String,
    },
}

#[derive(Subcommand, Debug)]
enum ContractsCommands {
    /// Dump the plugin's own manifest as JSON.
    Show,
    /// Validate a contracts manifest file and list every issue.
    Validate {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// List declared identifiers with their namespace.
    Ids,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;
    tracing::debug!(core = template_core::version(), "plugin-template starting");

    let contracts = template_contracts();
    let surfaces =
        Surfaces::bind(&contracts).context("plugin surfaces reference undeclared contract ids")?;

    match cli.command {
        Commands::Hello {
            name,
            message,
            json,
        } => handle_hello(&surfaces, cli.config.as_deref(), name, message, json),
        Commands::Rest { command } => handle_rest(&surfaces, cli.config.as_deref(), command),
        Commands::Contracts { command } => handle_contracts(&contracts, command),
        Commands::Setup {
            dir,
            force,
            dry_run,
        } => handle_setup(cli.config.as_deref(), &dir, force, dry_run).await,
    }
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .ok();
    Ok(())
}

fn handle_hello(
    surfaces: &Surfaces,
    config_path: Option<&Path>,
    name: Option<String>,
    message: Option<String>,
    json: bool,
) -> Result<()> {
    let config = load_plugin_config(config_path)?;
    let input = config.greeting_input(name, message);
    let flags = HelloFlags {
        name: input.name,
        message: input.message,
        json: json || config.output.json,
    };
    let mut ctx = TracingContext::new("cli", io::stdout().lock());
    surfaces.hello_command.run(&mut ctx, &flags)?;
    Ok(())
}

fn handle_rest(
    surfaces: &Surfaces,
    config_path: Option<&Path>,
    command: RestCommands,
) -> Result<()> {
    let config = load_plugin_config(config_path)?;
    match command {
        RestCommands::Hello { name, request_id } => {
            let route = &surfaces.hello_route;
            let (method, path) = route.endpoint();
            tracing::debug!(route = %route.id(), %method, path, "invoking REST handler");
            let ctx = TracingContext::new("rest", io::sink()).with_request_id(request_id);
            let response = route
                .handle(&ctx, hello_request(&config, name))
                .with_context(|| format!("{method} {path} rejected the request"))?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }
    Ok(())
}

fn handle_contracts(contracts: &PluginContracts, command: ContractsCommands) -> Result<()> {
    match command {
        ContractsCommands::Show => {
            println!("{}", serde_json::to_string_pretty(contracts)?);
        }
        ContractsCommands::Validate { file } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("failed to read contracts file {}", file.display()))?;
            let parsed = parse_contracts_str(&raw)
                .with_context(|| format!("{} failed validation", file.display()))?;
            println!(
                "contracts OK: {} ({} v{}, {} artifact(s), {} command(s), {} workflow(s), {} route(s))",
                file.display(),
                parsed.plugin_id,
                parsed.contracts_version,
                parsed.artifacts.len(),
                parsed.commands.as_ref().map_or(0, |c| c.len()),
                parsed.workflows.as_ref().map_or(0, |w| w.len()),
                parsed
                    .api
                    .as_ref()
                    .and_then(|api| api.rest.as_ref())
                    .map_or(0, |rest| rest.routes.len()),
            );
        }
        ContractsCommands::Ids => {
            let mut out = io::stdout().lock();
            for (id, artifact) in &contracts.artifacts {
                writeln!(out, "artifact  {id}  ({}, {})", artifact.kind, artifact.path_pattern)?;
            }
            for id in contracts.commands.iter().flat_map(|c| c.keys()) {
                writeln!(out, "command   {id}")?;
            }
            for id in contracts.workflows.iter().flat_map(|w| w.keys()) {
                writeln!(out, "workflow  {id}")?;
            }
            if let Some(rest) = contracts.api.as_ref().and_then(|api| api.rest.as_ref()) {
                for (id, route) in &rest.routes {
                    writeln!(
                        out,
                        "route     {id}  ({} {})",
                        route.method,
                        route.full_path(&rest.base_path)
                    )?;
                }
            }
        }
    }
    Ok(())
}

/// Builds the request the host would send, with the configured default name
/// filled in when the caller gives none.
fn hello_request(config: &PluginConfig, name: Option<String>) -> HelloRequest {
    HelloRequest {
        name: config.greeting_input(name, None).name,
    }
}

async fn handle_setup(
    config_path: Option<&Path>,
    dir: &Path,
    force: bool,
    dry_run: bool,
) -> Result<()> {
    let config = load_plugin_config(config_path)?;
    let plan = setup::plan(SetupInput { force }, &config)?;
    let ctx = TracingContext::new("setup", io::sink());
    let applied = setup::apply(&plan, dir, dry_run, &ctx)
        .await
        .with_context(|| format!("setup failed under {}", dir.display()))?;

    for op in &applied {
        println!("{:<12} {}", op.outcome.as_str(), op.target);
    }
    println!("{}", plan.message);
    if !plan.gitignore.is_empty() {
        println!("suggested .gitignore entries: {}", plan.gitignore.join(", "));
    }
    Ok(())
}

/// Loads the plugin config from `path`, or from the default location when it
/// exists. A missing default file yields the built-in defaults.
fn load_plugin_config(path: Option<&Path>) -> Result<PluginConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            if !default.exists() {
                return Ok(PluginConfig::default());
            }
            default
        }
    };
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let expanded = interpolate_env(&raw)?;
    let cfg = toml::from_str::<PluginConfig>(&expanded)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    Ok(cfg)
}

fn interpolate_env(input: &str) -> Result<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let regex = RE.get_or_init(|| Regex::new(r"\$\{([A-Z0-9_]+)(?::([^}]+))?\}").unwrap());
    let result = regex.replace_all(input, |caps: &regex::Captures| {
        let key = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(key).unwrap_or_else(|_| default.to_string())
    });
    Ok(result.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_placeholders_fall_back_to_defaults() {
        let raw = "[greeting]\ndefault_name = \"${TEMPLATE_TEST_UNSET_NAME:KB Labs}\"\n";
        let expanded = interpolate_env(raw).unwrap();
        let cfg: PluginConfig = toml::from_str(&expanded).unwrap();
        assert_eq!(cfg.greeting.default_name.as_deref(), Some("KB Labs"));
    }

    #[test]
    fn cli_parses_nested_commands() {
        let cli =
            Cli::try_parse_from(["plugin-template", "rest", "hello", "--name", "Dev"]).unwrap();
        match cli.command {
            Commands::Rest {
                command: RestCommands::Hello { name, request_id },
            } => {
                assert_eq!(name.as_deref(), Some("Dev"));
                assert_eq!(request_id, "local");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rest_requests_use_configured_default_name() {
        let mut config = PluginConfig::default();
        config.greeting.default_name = Some("KB Labs".into());

        assert_eq!(hello_request(&config, None).name.as_deref(), Some("KB Labs"));
        assert_eq!(
            hello_request(&config, Some("Dev".into())).name.as_deref(),
            Some("Dev")
        );
        assert_eq!(hello_request(&PluginConfig::default(), None).name, None);
    }

    #[test]
    fn missing_default_config_uses_defaults() {
        let cfg = load_plugin_config(None).unwrap();
        assert_eq!(cfg, PluginConfig::default());
    }
}
