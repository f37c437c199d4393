//! Command-line arguments

use crate::output::OutputFormat;
use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use rosa_common::nodepool::validate_autoscaling;
use rosa_common::Mode;

#[derive(Parser, Debug)]
#[command(name = "rosa", author, version, about = "Command line tool for managed OpenShift on AWS", long_about = None)]
pub struct Cli {
    /// Enable debug mode
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use a specific AWS profile from your credential file
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// Use a specific AWS region, overriding the AWS_REGION environment variable
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a resource
    Create {
        #[command(subcommand)]
        command: CreateCommands,
    },
    /// Edit a specific resource
    Edit {
        #[command(subcommand)]
        command: EditCommands,
    },
    /// List all resources of a specific type
    List {
        #[command(subcommand)]
        command: ListCommands,
    },
    /// Upgrade a resource
    Upgrade {
        #[command(subcommand)]
        command: UpgradeCommands,
    },
    /// Log in to your Red Hat account
    Login(LoginArgs),
    /// Log out
    Logout,
    /// Generate completion scripts
    Completion {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

impl Commands {
    /// Checks that need no remote call, run before connecting
    pub fn validate(&self) -> Result<()> {
        match self {
            Commands::Create {
                command: CreateCommands::Machinepool(args),
            } => args.validate(),
            Commands::Edit {
                command: EditCommands::Machinepool(args),
            } => args.validate(),
            Commands::Upgrade {
                command: UpgradeCommands::OperatorRoles(args),
            } => args.validate(),
            _ => Ok(()),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum CreateCommands {
    /// Add machine pool to cluster
    #[command(visible_alias = "machinepools", alias = "machine-pool")]
    Machinepool(CreateMachinePoolArgs),
}

#[derive(Subcommand, Debug)]
pub enum EditCommands {
    /// Edit machine pool
    #[command(visible_alias = "machinepools", alias = "machine-pool")]
    Machinepool(EditMachinePoolArgs),
}

#[derive(Subcommand, Debug)]
pub enum ListCommands {
    /// List cluster machine pools
    #[command(visible_alias = "machinepool", alias = "machine-pools")]
    Machinepools(ListMachinePoolsArgs),
}

#[derive(Subcommand, Debug)]
pub enum UpgradeCommands {
    /// Upgrade operator IAM roles for a cluster
    #[command(visible_alias = "operator-role", alias = "operatorroles")]
    OperatorRoles(UpgradeOperatorRolesArgs),
}

#[derive(Args, Debug, Default)]
pub struct CreateMachinePoolArgs {
    /// Name or ID of the cluster to add the machine pool to
    #[arg(short, long)]
    pub cluster: String,

    /// Name for the machine pool
    #[arg(long)]
    pub name: Option<String>,

    /// Count of machines for this machine pool
    #[arg(long, allow_negative_numbers = true)]
    pub replicas: Option<i32>,

    /// Enable autoscaling for the machine pool
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub enable_autoscaling: Option<bool>,

    /// Minimum number of machines for the machine pool
    #[arg(long, allow_negative_numbers = true)]
    pub min_replicas: Option<i32>,

    /// Maximum number of machines for the machine pool
    #[arg(long, allow_negative_numbers = true)]
    pub max_replicas: Option<i32>,

    /// Instance type used by the machines of the pool
    #[arg(long)]
    pub instance_type: Option<String>,

    /// Deploy to multiple availability zones
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub multi_availability_zone: Option<bool>,

    /// Availability zone of the machine pool
    #[arg(long)]
    pub availability_zone: Option<String>,

    /// Subnet of the machine pool
    #[arg(long)]
    pub subnet: Option<String>,

    /// Enable interactive mode
    #[arg(short, long)]
    pub interactive: bool,
}

/// Replica flags whose values are known before prompting
fn validate_replica_flags(
    replicas: Option<i32>,
    autoscaling: Option<bool>,
    min_replicas: Option<i32>,
    max_replicas: Option<i32>,
) -> Result<()> {
    if replicas.is_some() && autoscaling == Some(true) {
        bail!("Replicas can't be set when autoscaling is enabled");
    }
    if replicas.is_some_and(|r| r < 0) {
        bail!("The number of machine pool replicas needs to be a non-negative integer");
    }
    validate_autoscaling(min_replicas, max_replicas)?;
    Ok(())
}

impl CreateMachinePoolArgs {
    pub fn validate(&self) -> Result<()> {
        validate_replica_flags(
            self.replicas,
            self.enable_autoscaling,
            self.min_replicas,
            self.max_replicas,
        )?;
        let bounds_set = self.min_replicas.is_some() || self.max_replicas.is_some();
        if bounds_set && (self.enable_autoscaling == Some(false) || self.replicas.is_some()) {
            bail!("Autoscaling must be enabled in order to set min and max replicas");
        }
        Ok(())
    }
}

#[derive(Args, Debug, Default)]
pub struct EditMachinePoolArgs {
    /// ID of the machine pool
    pub machinepool: String,

    /// Name or ID of the cluster
    #[arg(short, long)]
    pub cluster: String,

    /// Count of machines for this machine pool
    #[arg(long, allow_negative_numbers = true)]
    pub replicas: Option<i32>,

    /// Enable autoscaling for the machine pool
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub enable_autoscaling: Option<bool>,

    /// Minimum number of machines for the machine pool
    #[arg(long, allow_negative_numbers = true)]
    pub min_replicas: Option<i32>,

    /// Maximum number of machines for the machine pool
    #[arg(long, allow_negative_numbers = true)]
    pub max_replicas: Option<i32>,

    /// Enable interactive mode
    #[arg(short, long)]
    pub interactive: bool,
}

impl EditMachinePoolArgs {
    pub fn validate(&self) -> Result<()> {
        validate_replica_flags(
            self.replicas,
            self.enable_autoscaling,
            self.min_replicas,
            self.max_replicas,
        )
    }
}

#[derive(Args, Debug, Default)]
pub struct ListMachinePoolsArgs {
    /// Name or ID of the cluster
    #[arg(short, long)]
    pub cluster: String,
}

#[derive(Args, Debug, Default)]
pub struct UpgradeOperatorRolesArgs {
    /// Name or ID of the cluster
    #[arg(short, long)]
    pub cluster: String,

    /// How to perform the operation. Valid options are:
    /// auto: Resource changes will be automatic applied using the current AWS account.
    /// manual: Commands necessary to modify AWS resources will be output to be run manually.
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Version of OpenShift that the cluster will be upgraded to
    #[arg(long)]
    pub version: Option<String>,

    /// Automatically answer yes to confirm operation
    #[arg(short, long)]
    pub yes: bool,

    /// Enable interactive mode
    #[arg(short, long)]
    pub interactive: bool,
}

impl UpgradeOperatorRolesArgs {
    pub fn mode(&self) -> Result<Option<Mode>> {
        Ok(self.mode.as_deref().map(str::parse).transpose()?)
    }

    pub fn validate(&self) -> Result<()> {
        self.mode().map(|_| ())
    }
}

#[derive(Args, Debug, Default)]
pub struct LoginArgs {
    /// Access or refresh token; read from OCM_TOKEN when absent
    #[arg(short, long, env = "OCM_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// URL of the API gateway
    #[arg(long)]
    pub url: Option<String>,
}
