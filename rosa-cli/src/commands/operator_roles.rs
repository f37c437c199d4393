//! `upgrade operator-roles`: bring operator policies to the default version and
//! create operator roles required by the target cluster version

use crate::aws::commandbuilder::join_commands;
use crate::aws::{policies, roles, IamClient};
use crate::cli::UpgradeOperatorRolesArgs;
use crate::ocm::{events, OPERATOR_ROLE_POLICY_TYPE};
use crate::runtime::Runtime;
use anyhow::{anyhow, bail, Context, Result};
use rosa_common::sts::{self, CredRequests};
use rosa_common::{Cluster, Mode};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Values resolved before any change is made
struct UpgradePlan<'a> {
    cluster: &'a Cluster,
    account_id: &'a str,
    prefix: &'a str,
    path: &'a str,
    version: &'a str,
    templates: &'a BTreeMap<String, String>,
}

pub async fn upgrade(rt: &Runtime, args: &UpgradeOperatorRolesArgs) -> Result<()> {
    let mode_flag = args.mode()?;
    let key = args.cluster.as_str();

    let default_version = rt
        .ocm
        .default_version()
        .await
        .map_err(|err| anyhow!("Error getting latest default version: {:#}", err))?;

    let cluster = rt.fetch_cluster(key).await?;

    if let Some(version) = &args.version {
        let available = rt
            .ocm
            .available_upgrades(&cluster.version.id)
            .await
            .context("Failed to find available upgrades")?;
        if available.is_empty() {
            rt.reporter.warn("There are no available upgrades");
            return Ok(());
        }
        if !available.contains(version) {
            bail!("Expected a valid version to upgrade the cluster");
        }
    }

    let role_arn = cluster.sts()?.role_arn.clone();
    if cluster.operator_iam_roles().is_empty() {
        bail!(
            "Cluster '{}' doesn't have any operator roles associated with it",
            key
        );
    }
    let prefix = sts::account_role_prefix(&cluster)
        .with_context(|| format!("Error getting account role prefix for the cluster '{}'", key))?;
    let path = sts::account_role_path(&cluster)
        .with_context(|| format!("Expected a valid path for '{}'", role_arn))?;

    let iam = rt.iam()?;
    let account_id = rt.creator()?.account_id.as_str();

    if policies::account_roles_need_upgrade(iam, &prefix, &default_version).await? {
        bail!(
            "Account roles with prefix '{prefix}' need to be upgraded before operator roles. \
             Roles can be upgraded with the following command :\n\n\trosa upgrade account-roles --prefix {prefix}\n",
            prefix = prefix
        );
    }

    let cred_requests = rt
        .ocm
        .cred_requests(cluster.is_hosted())
        .await
        .context("Error getting operator credential request from OCM")?;

    let policy_upgrade_needed = policies::operator_policies_need_upgrade(
        iam,
        &prefix,
        account_id,
        &default_version,
        &cred_requests,
        &path,
    )
    .await?;

    let target_version = args
        .version
        .clone()
        .unwrap_or_else(|| cluster.version.raw_id.clone());
    let missing = sts::find_missing_operator_roles(&cluster, &cred_requests, &target_version)?;

    if missing.is_empty() && !policy_upgrade_needed {
        rt.reporter.info(format!(
            "Operator roles associated with the cluster '{}' are already up-to-date.",
            cluster.id
        ));
        return Ok(());
    }
    rt.reporter
        .info("Starting to upgrade the operator IAM roles and policies");

    let interactive = args.interactive || mode_flag.is_none();
    let templates = rt
        .ocm
        .policies(OPERATOR_ROLE_POLICY_TYPE)
        .await
        .context("Failed to get the operator role policy templates")?;

    let mode = if interactive {
        let options: Vec<&str> = Mode::ALL.iter().map(Mode::as_str).collect();
        let default = mode_flag.unwrap_or_default();
        rt.prompter
            .get_option(
                "Operator IAM role/policy upgrade mode",
                &options,
                default.as_str(),
            )?
            .parse::<Mode>()
            .context("Expected a valid operator IAM role upgrade mode")?
    } else {
        mode_flag.unwrap_or_default()
    };
    debug!("Upgrading operator roles in {} mode", mode);

    let plan = UpgradePlan {
        cluster: &cluster,
        account_id,
        prefix: &prefix,
        path: &path,
        version: &default_version,
        templates: &templates,
    };

    if policy_upgrade_needed {
        upgrade_policies(rt, iam, mode, args.yes, &plan, &cred_requests).await?;
    }

    if !missing.is_empty() {
        create_missing_roles(rt, iam, mode, args.yes, &plan, &missing).await?;
    }

    Ok(())
}

async fn upgrade_policies(
    rt: &Runtime,
    iam: &dyn IamClient,
    mode: Mode,
    yes: bool,
    plan: &UpgradePlan<'_>,
    cred_requests: &CredRequests,
) -> Result<()> {
    match mode {
        Mode::Auto => {
            let question = format!(
                "Upgrade the operator role policy to version {}?",
                plan.version
            );
            if !rt.confirm(yes, &question)? {
                return Ok(());
            }

            let result = policies::upgrade_operator_policies(
                &rt.reporter,
                iam,
                plan.account_id,
                plan.prefix,
                plan.templates,
                plan.version,
                cred_requests,
                plan.path,
            )
            .await;

            if let Err(err) = result {
                if format!("{:?}", err).contains("Throttling") {
                    let body = HashMap::from([
                        (events::RESPONSE.to_string(), events::FAILURE.to_string()),
                        (events::VERSION.to_string(), plan.version.to_string()),
                        (events::IS_THROTTLE.to_string(), "true".to_string()),
                    ]);
                    if let Err(log_err) = rt
                        .ocm
                        .log_event(events::UPGRADE_OPERATOR_ROLES_AUTO, body)
                        .await
                    {
                        debug!("Failed to log event: {:#}", log_err);
                    }
                }
                bail!("Error upgrading the operator policies: {:#}", err);
            }
        }
        Mode::Manual => {
            policies::write_policy_files(&rt.work_dir, plan.templates, cred_requests)
                .context("There was an error generating the policy files")?;

            if rt.reporter.is_terminal() {
                rt.reporter
                    .info("All policy files saved to the current directory");
                rt.reporter
                    .info("Run the following commands to upgrade the operator IAM policies:\n");
            }
            let commands = policies::operator_policy_commands(
                iam,
                plan.prefix,
                plan.account_id,
                plan.version,
                cred_requests,
                plan.path,
            )
            .await?;
            rt.reporter.emit(join_commands(&commands));
        }
    }

    Ok(())
}

async fn create_missing_roles(
    rt: &Runtime,
    iam: &dyn IamClient,
    mode: Mode,
    yes: bool,
    plan: &UpgradePlan<'_>,
    missing: &CredRequests,
) -> Result<()> {
    let mut to_create = CredRequests::new();
    for (cred_request, operator) in missing {
        let role_name = sts::operator_role_name(plan.cluster, operator)?;
        let existing = iam
            .role_arn(&role_name)
            .await
            .context("Error when detecting checking missing operator IAM roles")?;
        match existing {
            Some(arn) => debug!("Role '{}' already exists as '{}'", role_name, arn),
            None => {
                to_create.insert(cred_request.clone(), operator.clone());
            }
        }
    }

    if to_create.is_empty() {
        rt.reporter.info(
            "Missing roles/policies have already been created. Please continue with cluster upgrade process.",
        );
        return Ok(());
    }

    match mode {
        Mode::Auto => {
            for operator in to_create.values() {
                let role_name = sts::operator_role_name(plan.cluster, operator)?;
                if !rt.confirm(yes, &format!("Create the '{}' role?", role_name))? {
                    continue;
                }
                roles::create_operator_role(
                    &rt.reporter,
                    iam,
                    plan.cluster,
                    plan.account_id,
                    plan.prefix,
                    operator,
                    plan.templates,
                    plan.path,
                )
                .await?;
            }
            rt.reporter
                .wait_with_spinner("Waiting for operator roles to reconcile", rt.reconcile_delay)
                .await;
        }
        Mode::Manual => {
            roles::write_trust_policy_files(
                &rt.work_dir,
                plan.cluster,
                plan.account_id,
                &to_create,
                plan.templates,
            )
            .context("There was an error generating the policy files")?;

            let commands = roles::missing_role_commands(
                plan.cluster,
                plan.account_id,
                plan.prefix,
                &to_create,
                plan.path,
            )?;
            if rt.reporter.is_terminal() {
                rt.reporter
                    .info("Run the following commands to create the operator roles:\n");
            }
            rt.reporter.emit(join_commands(&commands));
        }
    }

    Ok(())
}
