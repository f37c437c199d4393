//! AWS IAM access
//!
//! The reconciliation code only talks to [`IamClient`]; [`AwsIamClient`] is
//! the SDK-backed implementation.

pub mod commandbuilder;
pub mod policies;
pub mod roles;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_iam::types::Tag;
use rosa_common::Creator;
use std::collections::BTreeMap;
use tracing::debug;

/// IAM allows at most this many versions per managed policy
const MAX_POLICY_VERSIONS: usize = 5;

/// Role to create or update
#[derive(Debug, Clone, Default)]
pub struct RoleSpec {
    pub name: String,
    pub path: String,
    pub trust_policy: String,
    pub tags: BTreeMap<String, String>,
}

/// Managed policy to create
#[derive(Debug, Clone, Default)]
pub struct PolicySpec {
    pub name: String,
    pub path: String,
    pub document: String,
    pub tags: BTreeMap<String, String>,
}

/// IAM and STS operations used by the CLI
///
/// `caller_identity`, `role_arn`, `attached_role_policies` and `policy_tags`
/// are reads; every other method mutates IAM.
#[async_trait]
pub trait IamClient: Send + Sync {
    async fn caller_identity(&self) -> Result<Creator>;

    /// ARN of the role, `None` when it does not exist
    async fn role_arn(&self, role_name: &str) -> Result<Option<String>>;

    /// Create the role, or refresh its trust policy and tags when it exists
    async fn ensure_role(&self, role: &RoleSpec) -> Result<String>;

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()>;

    /// ARNs of the managed policies attached to the role (empty when the role is absent)
    async fn attached_role_policies(&self, role_name: &str) -> Result<Vec<String>>;

    /// Tags of a managed policy, `None` when the policy does not exist
    async fn policy_tags(&self, policy_arn: &str) -> Result<Option<BTreeMap<String, String>>>;

    async fn create_policy(&self, policy: &PolicySpec) -> Result<String>;

    /// Add a new default version, pruning the oldest one when IAM's limit is reached
    async fn create_policy_version(&self, policy_arn: &str, document: &str) -> Result<()>;

    async fn tag_policy(&self, policy_arn: &str, tags: &BTreeMap<String, String>) -> Result<()>;
}

/// SDK-backed IAM client
pub struct AwsIamClient {
    iam: aws_sdk_iam::Client,
    sts: aws_sdk_sts::Client,
}

impl AwsIamClient {
    /// Load credentials from the standard AWS chain
    pub async fn connect(profile: Option<&str>, region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = region {
            loader = loader.region(aws_sdk_iam::config::Region::new(region.to_string()));
        }
        let config = loader.load().await;

        Self {
            iam: aws_sdk_iam::Client::new(&config),
            sts: aws_sdk_sts::Client::new(&config),
        }
    }
}

fn to_tags(tags: &BTreeMap<String, String>) -> Result<Vec<Tag>> {
    tags.iter()
        .map(|(k, v)| {
            Tag::builder()
                .key(k)
                .value(v)
                .build()
                .with_context(|| format!("Invalid tag '{}'", k))
        })
        .collect()
}

#[async_trait]
impl IamClient for AwsIamClient {
    async fn caller_identity(&self) -> Result<Creator> {
        let identity = self
            .sts
            .get_caller_identity()
            .send()
            .await
            .context("Failed to get AWS caller identity")?;

        Ok(Creator {
            account_id: identity
                .account()
                .context("AWS caller identity has no account")?
                .to_string(),
            arn: identity.arn().unwrap_or_default().to_string(),
        })
    }

    async fn role_arn(&self, role_name: &str) -> Result<Option<String>> {
        match self.iam.get_role().role_name(role_name).send().await {
            Ok(output) => Ok(output.role().map(|role| role.arn().to_string())),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_no_such_entity_exception()) =>
            {
                Ok(None)
            }
            Err(err) => Err(err).with_context(|| format!("Failed to get role '{}'", role_name)),
        }
    }

    async fn ensure_role(&self, role: &RoleSpec) -> Result<String> {
        let tags = to_tags(&role.tags)?;

        if let Some(arn) = self.role_arn(&role.name).await? {
            debug!("Role '{}' exists, refreshing trust policy and tags", role.name);
            self.iam
                .update_assume_role_policy()
                .role_name(&role.name)
                .policy_document(&role.trust_policy)
                .send()
                .await
                .with_context(|| format!("Failed to update trust policy of role '{}'", role.name))?;
            self.iam
                .tag_role()
                .role_name(&role.name)
                .set_tags(Some(tags))
                .send()
                .await
                .with_context(|| format!("Failed to tag role '{}'", role.name))?;
            return Ok(arn);
        }

        let output = self
            .iam
            .create_role()
            .role_name(&role.name)
            .path(&role.path)
            .assume_role_policy_document(&role.trust_policy)
            .set_tags(Some(tags))
            .send()
            .await
            .with_context(|| format!("Failed to create role '{}'", role.name))?;

        output
            .role()
            .map(|r| r.arn().to_string())
            .with_context(|| format!("No ARN returned for role '{}'", role.name))
    }

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()> {
        self.iam
            .attach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .with_context(|| format!("Failed to attach '{}' to role '{}'", policy_arn, role_name))?;
        Ok(())
    }

    async fn attached_role_policies(&self, role_name: &str) -> Result<Vec<String>> {
        match self
            .iam
            .list_attached_role_policies()
            .role_name(role_name)
            .send()
            .await
        {
            Ok(output) => Ok(output
                .attached_policies()
                .iter()
                .filter_map(|p| p.policy_arn().map(str::to_string))
                .collect()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_no_such_entity_exception()) =>
            {
                Ok(Vec::new())
            }
            Err(err) => Err(err)
                .with_context(|| format!("Failed to list policies of role '{}'", role_name)),
        }
    }

    async fn policy_tags(&self, policy_arn: &str) -> Result<Option<BTreeMap<String, String>>> {
        match self.iam.list_policy_tags().policy_arn(policy_arn).send().await {
            Ok(output) => Ok(Some(
                output
                    .tags()
                    .iter()
                    .map(|t| (t.key().to_string(), t.value().to_string()))
                    .collect(),
            )),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_no_such_entity_exception()) =>
            {
                Ok(None)
            }
            Err(err) => {
                Err(err).with_context(|| format!("Failed to list tags of policy '{}'", policy_arn))
            }
        }
    }

    async fn create_policy(&self, policy: &PolicySpec) -> Result<String> {
        let output = self
            .iam
            .create_policy()
            .policy_name(&policy.name)
            .path(&policy.path)
            .policy_document(&policy.document)
            .set_tags(Some(to_tags(&policy.tags)?))
            .send()
            .await
            .with_context(|| format!("Failed to create policy '{}'", policy.name))?;

        output
            .policy()
            .and_then(|p| p.arn())
            .map(str::to_string)
            .with_context(|| format!("No ARN returned for policy '{}'", policy.name))
    }

    async fn create_policy_version(&self, policy_arn: &str, document: &str) -> Result<()> {
        let versions = self
            .iam
            .list_policy_versions()
            .policy_arn(policy_arn)
            .send()
            .await
            .with_context(|| format!("Failed to list versions of policy '{}'", policy_arn))?;

        if versions.versions().len() >= MAX_POLICY_VERSIONS {
            // version ids are "v<N>", lowest N is the oldest
            let oldest = versions
                .versions()
                .iter()
                .filter(|v| !v.is_default_version())
                .filter_map(|v| v.version_id())
                .min_by_key(|id| id.trim_start_matches('v').parse::<u32>().unwrap_or(u32::MAX));
            if let Some(version_id) = oldest {
                debug!("Deleting version '{}' of policy '{}'", version_id, policy_arn);
                self.iam
                    .delete_policy_version()
                    .policy_arn(policy_arn)
                    .version_id(version_id)
                    .send()
                    .await
                    .with_context(|| {
                        format!("Failed to delete version '{}' of '{}'", version_id, policy_arn)
                    })?;
            }
        }

        self.iam
            .create_policy_version()
            .policy_arn(policy_arn)
            .policy_document(document)
            .set_as_default(true)
            .send()
            .await
            .with_context(|| format!("Failed to create a new version of policy '{}'", policy_arn))?;
        Ok(())
    }

    async fn tag_policy(&self, policy_arn: &str, tags: &BTreeMap<String, String>) -> Result<()> {
        self.iam
            .tag_policy()
            .policy_arn(policy_arn)
            .set_tags(Some(to_tags(tags)?))
            .send()
            .await
            .with_context(|| format!("Failed to tag policy '{}'", policy_arn))?;
        Ok(())
    }
}
