//! Version checks and upgrades of account and operator role policies

use super::commandbuilder::{file_ref, AwsCommand};
use super::{IamClient, PolicySpec};
use crate::output::Reporter;
use anyhow::{Context, Result};
use rosa_common::sts::{self, tags, CredRequests};
use rosa_common::{version, StsOperator};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// True when any policy attached to the account roles with `prefix` carries a
/// version tag older than `version`.
///
/// Roles that do not exist and policies without the tag are ignored.
pub async fn account_roles_need_upgrade(
    iam: &dyn IamClient,
    prefix: &str,
    version: &str,
) -> Result<bool> {
    for suffix in sts::ACCOUNT_ROLE_SUFFIXES {
        let role_name = sts::account_role_name(prefix, suffix);
        if iam.role_arn(&role_name).await?.is_none() {
            debug!("Account role '{}' not found, skipping", role_name);
            continue;
        }

        for policy_arn in iam.attached_role_policies(&role_name).await? {
            let Some(policy_tags) = iam.policy_tags(&policy_arn).await? else {
                continue;
            };
            let Some(current) = policy_tags.get(tags::OPENSHIFT_VERSION) else {
                continue;
            };
            if version::is_policy_outdated(current, version)? {
                debug!(
                    "Policy '{}' of role '{}' is at version {}",
                    policy_arn, role_name, current
                );
                return Ok(true);
            }
        }
    }

    Ok(false)
}

/// True when an operator policy is missing, untagged or tagged with a version
/// older than `version`.
pub async fn operator_policies_need_upgrade(
    iam: &dyn IamClient,
    prefix: &str,
    account_id: &str,
    version: &str,
    cred_requests: &CredRequests,
    path: &str,
) -> Result<bool> {
    for operator in cred_requests.values() {
        let policy_arn =
            sts::operator_policy_arn(account_id, prefix, &operator.namespace, &operator.name, path);
        let current = iam
            .policy_tags(&policy_arn)
            .await?
            .and_then(|mut t| t.remove(tags::OPENSHIFT_VERSION));

        match current {
            Some(current) if !version::is_policy_outdated(&current, version)? => {}
            _ => {
                debug!("Operator policy '{}' needs an upgrade", policy_arn);
                return Ok(true);
            }
        }
    }

    Ok(false)
}

fn version_tags(version: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(tags::OPENSHIFT_VERSION.to_string(), version.to_string())])
}

fn new_policy_tags(prefix: &str, version: &str, operator: &StsOperator) -> BTreeMap<String, String> {
    let mut policy_tags = version_tags(version);
    policy_tags.insert(tags::ROLE_PREFIX.to_string(), prefix.to_string());
    policy_tags.insert(
        tags::OPERATOR_NAMESPACE.to_string(),
        operator.namespace.clone(),
    );
    policy_tags.insert(tags::OPERATOR_NAME.to_string(), operator.name.clone());
    policy_tags.insert(tags::RED_HAT_MANAGED.to_string(), "true".to_string());
    policy_tags
}

fn policy_document<'a>(policies: &'a BTreeMap<String, String>, cred_request: &str) -> Result<&'a str> {
    let key = sts::operator_policy_key(cred_request);
    policies
        .get(&key)
        .map(String::as_str)
        .with_context(|| format!("No policy template '{}' is available", key))
}

/// Create or re-version every operator policy and tag it with `version`
#[allow(clippy::too_many_arguments)]
pub async fn upgrade_operator_policies(
    reporter: &Reporter,
    iam: &dyn IamClient,
    account_id: &str,
    prefix: &str,
    policies: &BTreeMap<String, String>,
    version: &str,
    cred_requests: &CredRequests,
    path: &str,
) -> Result<()> {
    for (cred_request, operator) in cred_requests {
        let document = policy_document(policies, cred_request)?;
        let policy_arn =
            sts::operator_policy_arn(account_id, prefix, &operator.namespace, &operator.name, path);

        if iam.policy_tags(&policy_arn).await?.is_some() {
            iam.create_policy_version(&policy_arn, document).await?;
            iam.tag_policy(&policy_arn, &version_tags(version)).await?;
        } else {
            reporter.debug(format!("Creating policy '{}'", policy_arn));
            iam.create_policy(&PolicySpec {
                name: sts::operator_policy_name(prefix, &operator.namespace, &operator.name),
                path: path.to_string(),
                document: document.to_string(),
                tags: new_policy_tags(prefix, version, operator),
            })
            .await?;
        }

        reporter.info(format!(
            "Upgraded policy with ARN '{}' to version '{}'",
            policy_arn, version
        ));
    }

    Ok(())
}

/// File name of the permission policy document for a credential request
pub fn policy_file_name(cred_request: &str) -> String {
    format!("{}.json", sts::operator_policy_key(cred_request))
}

/// Save the operator permission policy documents into `dir`
pub fn write_policy_files(
    dir: &Path,
    policies: &BTreeMap<String, String>,
    cred_requests: &CredRequests,
) -> Result<()> {
    for cred_request in cred_requests.keys() {
        let document = policy_document(policies, cred_request)?;
        let file = dir.join(policy_file_name(cred_request));
        debug!("Saving '{}'", file.display());
        std::fs::write(&file, document)
            .with_context(|| format!("Failed to save policy file '{}'", file.display()))?;
    }
    Ok(())
}

/// `aws iam` commands that bring the operator policies to `version`.
///
/// Only reads IAM, to pick between a new policy and a new version.
pub async fn operator_policy_commands(
    iam: &dyn IamClient,
    prefix: &str,
    account_id: &str,
    version: &str,
    cred_requests: &CredRequests,
    path: &str,
) -> Result<Vec<String>> {
    let mut commands = Vec::new();

    for (cred_request, operator) in cred_requests {
        let policy_arn =
            sts::operator_policy_arn(account_id, prefix, &operator.namespace, &operator.name, path);
        let document = file_ref(&policy_file_name(cred_request));

        if iam.policy_tags(&policy_arn).await?.is_some() {
            commands.push(
                AwsCommand::iam("create-policy-version")
                    .param("policy-arn", &policy_arn)
                    .param("policy-document", &document)
                    .flag("set-as-default")
                    .build(),
            );
            commands.push(
                AwsCommand::iam("tag-policy")
                    .param("policy-arn", &policy_arn)
                    .tags(&version_tags(version))
                    .build(),
            );
        } else {
            commands.push(
                AwsCommand::iam("create-policy")
                    .param(
                        "policy-name",
                        sts::operator_policy_name(prefix, &operator.namespace, &operator.name),
                    )
                    .param("policy-document", &document)
                    .tags(&new_policy_tags(prefix, version, operator))
                    .param("path", path)
                    .build(),
            );
        }
    }

    Ok(commands)
}
