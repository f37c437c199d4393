//! Operator IAM roles: creation in auto mode, commands in manual mode

use super::commandbuilder::{file_ref, AwsCommand};
use super::{IamClient, RoleSpec};
use crate::output::Reporter;
use anyhow::{anyhow, Context, Result};
use rosa_common::sts::{self, tags, CredRequests};
use rosa_common::{Cluster, StsOperator};
use std::collections::BTreeMap;
use std::path::Path;

fn role_tags(cluster: &Cluster, operator: &StsOperator) -> BTreeMap<String, String> {
    BTreeMap::from([
        (tags::CLUSTER_ID.to_string(), cluster.id.clone()),
        (
            tags::OPERATOR_NAMESPACE.to_string(),
            operator.namespace.clone(),
        ),
        (tags::OPERATOR_NAME.to_string(), operator.name.clone()),
        (tags::RED_HAT_MANAGED.to_string(), "true".to_string()),
    ])
}

fn trust_policy(
    cluster: &Cluster,
    account_id: &str,
    operator: &StsOperator,
    policies: &BTreeMap<String, String>,
) -> Result<String> {
    let template = policies
        .get(sts::OPERATOR_TRUST_POLICY)
        .with_context(|| format!("No policy template '{}' is available", sts::OPERATOR_TRUST_POLICY))?;
    Ok(sts::operator_trust_policy(template, cluster, account_id, operator)?)
}

/// Role to create for an operator, trust policy rendered for the cluster
pub fn operator_role_spec(
    cluster: &Cluster,
    account_id: &str,
    operator: &StsOperator,
    policies: &BTreeMap<String, String>,
    path: &str,
) -> Result<RoleSpec> {
    Ok(RoleSpec {
        name: sts::operator_role_name(cluster, operator)?,
        path: path.to_string(),
        trust_policy: trust_policy(cluster, account_id, operator, policies)?,
        tags: role_tags(cluster, operator),
    })
}

/// Create the role of one operator and attach its permission policy
#[allow(clippy::too_many_arguments)]
pub async fn create_operator_role(
    reporter: &Reporter,
    iam: &dyn IamClient,
    cluster: &Cluster,
    account_id: &str,
    prefix: &str,
    operator: &StsOperator,
    policies: &BTreeMap<String, String>,
    path: &str,
) -> Result<()> {
    let role = operator_role_spec(cluster, account_id, operator, policies, path)?;
    let policy_arn =
        sts::operator_policy_arn(account_id, prefix, &operator.namespace, &operator.name, path);

    reporter.debug(format!("Creating role '{}'", role.name));
    let role_arn = iam.ensure_role(&role).await?;
    reporter.info(format!("Created role '{}' with ARN '{}'", role.name, role_arn));

    reporter.debug(format!(
        "Attaching permission policy '{}' to role '{}'",
        policy_arn, role.name
    ));
    iam.attach_role_policy(&role.name, &policy_arn)
        .await
        .map_err(|err| {
            anyhow!(
                "Failed to attach role policy. Check your prefix or run \
                 'rosa create account-roles' to create the necessary policies: {:#}",
                err
            )
        })
}

/// File name of the trust policy document for a credential request
pub fn trust_policy_file_name(cred_request: &str) -> String {
    format!("operator_{}_policy.json", cred_request)
}

/// Save the trust policy documents of the missing roles into `dir`
pub fn write_trust_policy_files(
    dir: &Path,
    cluster: &Cluster,
    account_id: &str,
    missing: &CredRequests,
    policies: &BTreeMap<String, String>,
) -> Result<()> {
    for (cred_request, operator) in missing {
        let document = trust_policy(cluster, account_id, operator, policies)?;
        let file = dir.join(trust_policy_file_name(cred_request));
        std::fs::write(&file, document)
            .with_context(|| format!("Failed to save policy file '{}'", file.display()))?;
    }
    Ok(())
}

/// `aws iam create-role` and `attach-role-policy` for every missing role
pub fn missing_role_commands(
    cluster: &Cluster,
    account_id: &str,
    prefix: &str,
    missing: &CredRequests,
    path: &str,
) -> Result<Vec<String>> {
    let mut commands = Vec::new();

    for (cred_request, operator) in missing {
        let role_name = sts::operator_role_name(cluster, operator)?;
        let policy_arn =
            sts::operator_policy_arn(account_id, prefix, &operator.namespace, &operator.name, path);

        commands.push(
            AwsCommand::iam("create-role")
                .param("role-name", &role_name)
                .param(
                    "assume-role-policy-document",
                    file_ref(&trust_policy_file_name(cred_request)),
                )
                .tags(&role_tags(cluster, operator))
                .param("path", path)
                .build(),
        );
        commands.push(
            AwsCommand::iam("attach-role-policy")
                .param("role-name", &role_name)
                .param("policy-arn", &policy_arn)
                .build(),
        );
    }

    Ok(commands)
}
