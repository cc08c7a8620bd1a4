//! `folio` - operator command line for the workspace engine

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgGroup, ArgMatches, Command};
use folio_core::{EngineConfig, WorkspaceProvisioner};
use folio_model::{
    FolderTaxonomyBuilder, LifecycleStage, ProjectStatus, ProjectWorkspaceIdentity, TemplateVariant,
};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn identity_args(cmd: Command, required: bool) -> Command {
    cmd.arg(
        Arg::new("number")
            .long("number")
            .required(required)
            .help("Project number, e.g. TC2602001"),
    )
    .arg(
        Arg::new("name")
            .long("name")
            .required(required)
            .help("Project name"),
    )
    .arg(
        Arg::new("client")
            .long("client")
            .required(required)
            .help("Client abbreviation (1-3 characters)"),
    )
}

fn cli() -> Command {
    Command::new("folio")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Project workspace provisioning and lifecycle engine")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file (FOLIO_* variables override it)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(identity_args(
            Command::new("taxonomy")
                .about("Print the workspace folder taxonomy")
                .arg(
                    Arg::new("manifest")
                        .long("manifest")
                        .action(ArgAction::SetTrue)
                        .requires("number")
                        .help("Render the README manifest for a project instead"),
                ),
            false,
        ))
        .subcommand(identity_args(
            Command::new("create")
                .about("Provision a new workspace under Projetos Prospectados")
                .arg(
                    Arg::new("variant")
                        .long("variant")
                        .default_value("full")
                        .help("Template variant: full, simplified or visit"),
                )
                .arg(
                    Arg::new("timeout-secs")
                        .long("timeout-secs")
                        .value_parser(value_parser!(u64))
                        .help("Stop scheduling folder levels after this many seconds"),
                ),
            true,
        ))
        .subcommand(identity_args(
            Command::new("move")
                .about("Relocate a workspace to another lifecycle stage")
                .arg(
                    Arg::new("to")
                        .long("to")
                        .help("Target stage: prospected, active or finished"),
                )
                .arg(
                    Arg::new("status")
                        .long("status")
                        .help("ERP status deciding the stage, e.g. \"Em Execução\""),
                )
                .group(ArgGroup::new("target").args(["to", "status"]).required(true)),
            true,
        ))
        .subcommand(identity_args(
            Command::new("delete")
                .about("Remove a workspace")
                .arg(
                    Arg::new("force")
                        .long("force")
                        .action(ArgAction::SetTrue)
                        .help("Delete even if the workspace is past the Prospected stage"),
                ),
            true,
        ))
        .subcommand(identity_args(
            Command::new("locate").about("Show which stage holds a workspace"),
            true,
        ))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(matches: &ArgMatches) -> Result<EngineConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::new(),
    };
    config.apply_env()?;
    Ok(config)
}

fn arg<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing --{name}"))
}

fn identity(args: &ArgMatches) -> Result<ProjectWorkspaceIdentity> {
    Ok(ProjectWorkspaceIdentity::new(
        arg(args, "number")?,
        arg(args, "name")?,
        arg(args, "client")?,
    )?)
}

/// Stage named by `--to`, or derived from `--status`
fn target_stage(args: &ArgMatches) -> Result<LifecycleStage> {
    if let Some(status) = args.get_one::<String>("status") {
        let status: ProjectStatus = status.parse()?;
        tracing::debug!(status = %status, stage = %status.stage(), "stage derived from status");
        return Ok(status.stage());
    }
    Ok(arg(args, "to")?.parse()?)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(matches: ArgMatches) -> Result<ExitCode> {
    let Some((command, args)) = matches.subcommand() else {
        bail!("no command given");
    };

    if command == "taxonomy" {
        let entries = FolderTaxonomyBuilder::entries();
        if args.get_flag("manifest") {
            print!("{}", FolderTaxonomyBuilder::render_manifest(&identity(args)?, &entries));
        } else {
            let listing: Vec<_> = entries
                .iter()
                .map(|e| json!({ "path": e.path, "depth": e.depth(), "description": e.description }))
                .collect();
            print_json(&listing)?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config(&matches)?;
    let provisioner: WorkspaceProvisioner = config.build_provisioner()?;
    let identity = identity(args)?;

    match command {
        "create" => {
            let variant = TemplateVariant::parse_lenient(arg(args, "variant")?);
            let result = match args.get_one::<u64>("timeout-secs") {
                Some(secs) => {
                    let deadline = tokio::time::Instant::now() + Duration::from_secs(*secs);
                    provisioner.create_with_deadline(&identity, variant, deadline).await?
                }
                None => provisioner.create(&identity, variant).await?,
            };
            print_json(&result)?;
            if !result.is_complete() {
                tracing::warn!(
                    failed = result.failed.len(),
                    skipped = result.skipped.len(),
                    "workspace provisioned with failures"
                );
                return Ok(ExitCode::from(2));
            }
        }
        "move" => {
            let to = target_stage(args)?;
            let outcome = provisioner.move_to(&identity, to).await?;
            print_json(&outcome)?;
        }
        "delete" => {
            let (stage, _) = provisioner.locator().first_existing(&identity).await?;
            if !stage.permits_deletion() && !args.get_flag("force") {
                bail!("workspace is in '{stage}'; only prospected workspaces may be deleted (use --force)");
            }
            let report = provisioner.delete(&identity).await?;
            print_json(&report)?;
        }
        "locate" => {
            let found = provisioner.locator().all_existing(&identity).await?;
            let listing: Vec<_> = found
                .iter()
                .map(|(stage, path)| json!({ "stage": stage, "path": path }))
                .collect();
            print_json(&listing)?;
            if found.is_empty() {
                return Ok(ExitCode::FAILURE);
            }
        }
        other => bail!("unknown command '{other}'"),
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match run(matches).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
