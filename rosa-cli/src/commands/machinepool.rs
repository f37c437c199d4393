//! Machine pool commands for hosted clusters

use crate::cli::{CreateMachinePoolArgs, EditMachinePoolArgs, ListMachinePoolsArgs};
use crate::output::OutputFormat;
use crate::runtime::Runtime;
use anyhow::{bail, Context, Result};
use rosa_common::{Cluster, NodePool, NodePoolAutoscaling};
use serde::Serialize;
use tabled::Tabled;

#[derive(Tabled, Serialize)]
struct MachinePoolRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "AUTOSCALING")]
    autoscaling: String,
    #[tabled(rename = "REPLICAS")]
    replicas: String,
    #[tabled(rename = "INSTANCE TYPE")]
    instance_type: String,
    #[tabled(rename = "AVAILABILITY ZONE")]
    availability_zone: String,
    #[tabled(rename = "SUBNET")]
    subnet: String,
}

impl From<&NodePool> for MachinePoolRow {
    fn from(pool: &NodePool) -> Self {
        Self {
            id: pool.id.clone(),
            autoscaling: if pool.autoscaling.is_some() { "Yes" } else { "No" }.to_string(),
            replicas: pool.size_display(),
            instance_type: pool
                .aws_node_pool
                .as_ref()
                .map(|aws| aws.instance_type.clone())
                .unwrap_or_default(),
            availability_zone: pool.availability_zone.clone().unwrap_or_default(),
            subnet: pool.subnet.clone().unwrap_or_default(),
        }
    }
}

/// Ready hosted cluster; machine pools of classic clusters are not handled here
async fn hosted_cluster(rt: &Runtime, key: &str) -> Result<Cluster> {
    let cluster = rt.fetch_cluster(key).await?;
    if !cluster.is_ready() {
        bail!("Cluster '{}' is not yet ready", key);
    }
    if !cluster.is_hosted() {
        bail!(
            "Cluster '{}' is not a hosted cluster, only machine pools of hosted clusters are supported",
            key
        );
    }
    Ok(cluster)
}

pub async fn create(rt: &Runtime, args: &CreateMachinePoolArgs) -> Result<()> {
    let key = args.cluster.as_str();
    let cluster = hosted_cluster(rt, key).await?;

    if args.multi_availability_zone.is_some() {
        bail!("Setting the `multi-availability-zone` flag is not yet supported for hosted clusters");
    }
    if args.availability_zone.is_some() {
        bail!("Setting the `availability-zone` flag is not yet supported for hosted clusters");
    }
    if args.subnet.is_some() {
        bail!("Setting the `subnet` flag is not yet supported for hosted clusters");
    }
    // the service names node pools of hosted clusters
    if args.name.is_some() {
        bail!("Setting the `name` is not supported for hosted clusters");
    }

    let mut autoscaling = args.enable_autoscaling.unwrap_or(false);
    if args.replicas.is_none() && !autoscaling && args.enable_autoscaling.is_none() && args.interactive
    {
        autoscaling = rt.prompter.get_bool("Enable autoscaling", autoscaling)?;
    }

    let mut builder = NodePool::builder();
    if autoscaling {
        if args.replicas.is_some() {
            bail!("Replicas can't be set when autoscaling is enabled");
        }
        let mut min_replicas = args.min_replicas.unwrap_or(0);
        if args.interactive || args.min_replicas.is_none() {
            min_replicas = rt.prompter.get_int("Min replicas", min_replicas)?;
        }
        let mut max_replicas = args.max_replicas.unwrap_or(0);
        if args.interactive || args.max_replicas.is_none() {
            max_replicas = rt.prompter.get_int("Max replicas", max_replicas)?;
        }
        builder = builder.autoscaling(NodePoolAutoscaling::new(min_replicas, max_replicas));
    } else {
        if args.min_replicas.is_some() || args.max_replicas.is_some() {
            bail!("Autoscaling must be enabled in order to set min and max replicas");
        }
        let mut replicas = args.replicas.unwrap_or(0);
        if args.interactive || args.replicas.is_none() {
            replicas = rt.prompter.get_int("Replicas", replicas)?;
        }
        builder = builder.replicas(replicas);
    }
    if let Some(instance_type) = &args.instance_type {
        builder = builder.instance_type(instance_type.as_str());
    }

    let node_pool = builder
        .build()
        .with_context(|| format!("Failed to create machine pool for hosted cluster '{}'", key))?;

    let created = rt
        .ocm
        .create_node_pool(&cluster.id, &node_pool)
        .await
        .with_context(|| format!("Failed to add machine pool to hosted cluster '{}'", key))?;

    rt.reporter.info(format!(
        "Machine pool '{}' created successfully on hosted cluster '{}'",
        created.id, key
    ));
    rt.reporter.info(format!(
        "To view all machine pools, run 'rosa list machinepools -c {}'",
        key
    ));
    Ok(())
}

/// Replica settings for an edited pool
#[derive(Debug, PartialEq)]
struct ReplicaSettings {
    autoscaling: bool,
    replicas: i32,
    min_replicas: i32,
    max_replicas: i32,
}

/// Merge flags, prompts and the existing pool; prompts default to current values
fn edit_replica_settings(
    rt: &Runtime,
    args: &EditMachinePoolArgs,
    existing: &NodePool,
) -> Result<ReplicaSettings> {
    let existing_autoscaling = existing.autoscaling;
    let bounds_set = args.min_replicas.is_some() || args.max_replicas.is_some();

    if bounds_set && args.enable_autoscaling != Some(true) && existing_autoscaling.is_none() {
        bail!(
            "Autoscaling is not enabled on machine pool '{}'. can't set min or max replicas",
            args.machinepool
        );
    }

    let autoscaling = match args.enable_autoscaling {
        Some(enabled) => enabled,
        None if args.interactive => rt
            .prompter
            .get_bool("Enable autoscaling", existing_autoscaling.is_some())?,
        None => existing_autoscaling.is_some(),
    };

    let mut settings = ReplicaSettings {
        autoscaling,
        replicas: args.replicas.unwrap_or(0),
        min_replicas: args.min_replicas.unwrap_or(0),
        max_replicas: args.max_replicas.unwrap_or(0),
    };

    if autoscaling {
        if args.min_replicas.is_none() && (args.interactive || args.max_replicas.is_none()) {
            let default = existing_autoscaling
                .and_then(|a| a.min_replica)
                .unwrap_or(0);
            settings.min_replicas = rt.prompter.get_int("Min replicas", default)?;
        }
        if args.max_replicas.is_none() && (args.interactive || args.min_replicas.is_none()) {
            let default = existing_autoscaling
                .and_then(|a| a.max_replica)
                .unwrap_or(0);
            settings.max_replicas = rt.prompter.get_int("Max replicas", default)?;
        }
    } else if args.interactive || args.replicas.is_none() {
        let default = args
            .replicas
            .unwrap_or_else(|| existing.replicas.unwrap_or(0));
        settings.replicas = rt.prompter.get_int("Replicas", default)?;
    }

    Ok(settings)
}

pub async fn edit(rt: &Runtime, args: &EditMachinePoolArgs) -> Result<()> {
    let key = args.cluster.as_str();
    let cluster = hosted_cluster(rt, key).await?;

    rt.reporter
        .debug(format!("Loading machine pool for hosted cluster '{}'", key));
    let existing = rt
        .ocm
        .node_pool(&cluster.id, &args.machinepool)
        .await
        .with_context(|| format!("Failed to get machine pools for hosted cluster '{}'", key))?
        .with_context(|| {
            format!(
                "Machine pool '{}' does not exist for hosted cluster '{}'",
                args.machinepool, key
            )
        })?;

    let settings = edit_replica_settings(rt, args, &existing)?;

    if (!settings.autoscaling && settings.replicas < 0)
        || (settings.autoscaling && args.min_replicas.is_some() && settings.min_replicas < 0)
    {
        bail!("The number of machine pool replicas needs to be a non-negative integer");
    }

    let mut builder = NodePool::builder().id(existing.id.as_str());
    if settings.autoscaling {
        // unset bounds keep their current value on the service side
        builder = builder.autoscaling(NodePoolAutoscaling {
            min_replica: (settings.min_replicas > 0).then_some(settings.min_replicas),
            max_replica: (settings.max_replicas > 0).then_some(settings.max_replicas),
        });
    } else {
        builder = builder.replicas(settings.replicas);
    }
    let node_pool = builder
        .build()
        .with_context(|| format!("Failed to update machine pool for hosted cluster '{}'", key))?;

    rt.reporter.debug(format!(
        "Updating machine pool '{}' on hosted cluster '{}'",
        node_pool.id, key
    ));
    rt.ocm
        .update_node_pool(&cluster.id, &node_pool)
        .await
        .with_context(|| {
            format!(
                "Failed to update machine pool '{}' on hosted cluster '{}'",
                node_pool.id, key
            )
        })?;

    rt.reporter.info(format!(
        "Updated machine pool '{}' on hosted cluster '{}'",
        node_pool.id, key
    ));
    Ok(())
}

pub async fn list(rt: &Runtime, args: &ListMachinePoolsArgs, format: OutputFormat) -> Result<()> {
    let key = args.cluster.as_str();
    let cluster = hosted_cluster(rt, key).await?;

    let pools = rt
        .ocm
        .node_pools(&cluster.id)
        .await
        .with_context(|| format!("Failed to get machine pools for hosted cluster '{}'", key))?;

    match format {
        OutputFormat::Table => rt
            .reporter
            .print_output(pools.iter().map(MachinePoolRow::from).collect(), format),
        _ => rt.reporter.print_single(&pools, format),
    }
}
