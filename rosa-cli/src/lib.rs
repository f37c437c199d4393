//! rosa: command line tool for managed OpenShift clusters on AWS
//!
//! The binary is a thin wrapper around [`run`]; commands receive a
//! [`runtime::Runtime`] so they can be driven with in-memory clients.

pub mod api;
pub mod aws;
pub mod cli;
pub mod commands;
pub mod config;
pub mod interactive;
pub mod ocm;
pub mod output;
pub mod runtime;

use anyhow::Result;
use aws::AwsIamClient;
use clap::CommandFactory;
use cli::{Cli, Commands, CreateCommands, EditCommands, ListCommands, UpgradeCommands};
use config::Config;
use ocm::OcmApi;
use output::{OutputFormat, Reporter};
use runtime::Runtime;

async fn ocm_runtime(config: &Config) -> Result<Runtime> {
    let api = commands::auth::authenticated_client(config).await?;
    Ok(Runtime::new(Box::new(OcmApi::new(api))))
}

/// Execute a parsed command line
pub async fn run(cli: Cli) -> Result<()> {
    cli.command.validate()?;

    let mut config = Config::load()?;
    let format = cli
        .output
        .unwrap_or_else(|| OutputFormat::from_name(&config.default_output));

    match &cli.command {
        Commands::Create {
            command: CreateCommands::Machinepool(args),
        } => {
            let rt = ocm_runtime(&config).await?;
            commands::machinepool::create(&rt, args).await
        }
        Commands::Edit {
            command: EditCommands::Machinepool(args),
        } => {
            let rt = ocm_runtime(&config).await?;
            commands::machinepool::edit(&rt, args).await
        }
        Commands::List {
            command: ListCommands::Machinepools(args),
        } => {
            let rt = ocm_runtime(&config).await?;
            commands::machinepool::list(&rt, args, format).await
        }
        Commands::Upgrade {
            command: UpgradeCommands::OperatorRoles(args),
        } => {
            let iam = AwsIamClient::connect(cli.profile.as_deref(), cli.region.as_deref()).await;
            let rt = ocm_runtime(&config).await?.with_aws(Box::new(iam)).await?;
            commands::operator_roles::upgrade(&rt, args).await
        }
        Commands::Login(args) => commands::auth::login(args, &mut config, &Reporter::stdout()).await,
        Commands::Logout => commands::auth::logout(&mut config, &Reporter::stdout()),
        Commands::Completion { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "rosa", &mut std::io::stdout());
            Ok(())
        }
    }
}
