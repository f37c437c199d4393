mod common;

use common::{
    calls, operator_policy_arn, runtime_with_iam, version_tag, Answer, Call, Calls, FakeIam,
    FakeOcm, ScriptedPrompter, ACCOUNT_ID,
};
use rosa_cli::cli::UpgradeOperatorRolesArgs;
use rosa_cli::commands::operator_roles;
use rosa_common::OperatorIamRole;
use tempfile::TempDir;

const EBS_ROLE: &str = "demo-p4x1-openshift-cluster-csi-drivers-ebs-cloud-credentials";

fn args(mode: Option<&str>) -> UpgradeOperatorRolesArgs {
    UpgradeOperatorRolesArgs {
        cluster: "demo".to_string(),
        mode: mode.map(str::to_string),
        yes: true,
        ..Default::default()
    }
}

fn ingress_policy() -> String {
    operator_policy_arn("openshift-ingress-operator", "cloud-credentials")
}

fn ebs_policy() -> String {
    operator_policy_arn("openshift-cluster-csi-drivers", "ebs-cloud-credentials")
}

#[tokio::test]
async fn test_auto_mode_upgrades_policies_and_creates_roles() {
    let recorded = Calls::default();
    let mut iam = FakeIam::new(&recorded, "4.12");
    iam.policy_tags.remove(&ebs_policy());
    let dir = TempDir::new().unwrap();
    let rt = runtime_with_iam(
        FakeOcm::new(&recorded),
        iam,
        ScriptedPrompter::default(),
        dir.path(),
    )
    .await;

    operator_roles::upgrade(&rt, &args(Some("auto"))).await.unwrap();

    assert_eq!(
        calls(&recorded),
        vec![
            Call::CreatePolicy("Demo-openshift-cluster-csi-drivers-ebs-cloud-credentials".to_string()),
            Call::CreatePolicyVersion(ingress_policy()),
            Call::TagPolicy(ingress_policy()),
            Call::EnsureRole(EBS_ROLE.to_string()),
            Call::AttachRolePolicy(EBS_ROLE.to_string(), ebs_policy()),
        ]
    );

    let output = rt.reporter.captured();
    assert!(output.contains(&"ℹ Starting to upgrade the operator IAM roles and policies".to_string()));
    assert!(output.contains(&format!(
        "ℹ Upgraded policy with ARN '{}' to version '4.13'",
        ingress_policy()
    )));
    assert!(output.contains(&format!(
        "ℹ Created role '{}' with ARN 'arn:aws:iam::{}:role/{}'",
        EBS_ROLE, ACCOUNT_ID, EBS_ROLE
    )));
}

#[tokio::test]
async fn test_manual_mode_makes_no_remote_changes() {
    let recorded = Calls::default();
    let mut iam = FakeIam::new(&recorded, "4.12");
    iam.policy_tags.remove(&ebs_policy());
    let dir = TempDir::new().unwrap();
    let rt = runtime_with_iam(
        FakeOcm::new(&recorded),
        iam,
        ScriptedPrompter::default(),
        dir.path(),
    )
    .await;

    operator_roles::upgrade(&rt, &args(Some("manual"))).await.unwrap();

    assert!(calls(&recorded).is_empty());

    let output = rt.reporter.captured().join("\n");
    assert!(output.contains(&format!(
        "aws iam create-policy-version \\\n\t--policy-arn {} \\\n\t--policy-document file://openshift_ingress_policy.json \\\n\t--set-as-default",
        ingress_policy()
    )));
    assert!(output.contains("aws iam create-policy \\\n\t--policy-name Demo-openshift-cluster-csi-drivers-ebs-cloud-credentials"));
    assert!(output.contains(&format!("aws iam create-role \\\n\t--role-name {}", EBS_ROLE)));
    assert!(output.contains("file://operator_ebs_policy.json"));
    assert!(output.contains(&format!(
        "aws iam attach-role-policy \\\n\t--role-name {} \\\n\t--policy-arn {}",
        EBS_ROLE,
        ebs_policy()
    )));

    assert!(dir.path().join("openshift_ingress_policy.json").exists());
    assert!(dir.path().join("openshift_ebs_policy.json").exists());
    let trust = std::fs::read_to_string(dir.path().join("operator_ebs_policy.json")).unwrap();
    assert!(trust.contains(&format!(
        "arn:aws:iam::{}:oidc-provider/oidc.example.com/c1",
        ACCOUNT_ID
    )));
    assert!(trust.contains(
        "system:serviceaccount:openshift-cluster-csi-drivers:ebs-cloud-credentials-sa"
    ));
}

#[tokio::test]
async fn test_mode_is_prompted_when_not_given() {
    let recorded = Calls::default();
    let iam = FakeIam::new(&recorded, "4.12");
    let dir = TempDir::new().unwrap();
    let prompter = ScriptedPrompter::new(vec![Answer::Choice("manual".to_string())]);
    let asked = prompter.asked.clone();
    let rt = runtime_with_iam(FakeOcm::new(&recorded), iam, prompter, dir.path()).await;

    operator_roles::upgrade(&rt, &args(None)).await.unwrap();

    assert_eq!(
        *asked.lock().unwrap(),
        vec!["Operator IAM role/policy upgrade mode"]
    );
    assert!(calls(&recorded).is_empty());
}

#[tokio::test]
async fn test_already_up_to_date() {
    let recorded = Calls::default();
    let iam = FakeIam::new(&recorded, "4.13");
    let mut ocm = FakeOcm::new(&recorded);
    ocm.cred_requests.remove("ebs");
    let dir = TempDir::new().unwrap();
    let rt = runtime_with_iam(ocm, iam, ScriptedPrompter::default(), dir.path()).await;

    operator_roles::upgrade(&rt, &args(Some("auto"))).await.unwrap();

    assert!(calls(&recorded).is_empty());
    assert_eq!(
        rt.reporter.captured(),
        vec!["ℹ Operator roles associated with the cluster 'c1' are already up-to-date."]
    );
}

#[tokio::test]
async fn test_missing_role_that_exists_in_iam_is_skipped() {
    let recorded = Calls::default();
    let mut iam = FakeIam::new(&recorded, "4.13");
    iam.roles.insert(
        EBS_ROLE.to_string(),
        format!("arn:aws:iam::{}:role/{}", ACCOUNT_ID, EBS_ROLE),
    );
    let dir = TempDir::new().unwrap();
    let rt = runtime_with_iam(
        FakeOcm::new(&recorded),
        iam,
        ScriptedPrompter::default(),
        dir.path(),
    )
    .await;

    operator_roles::upgrade(&rt, &args(Some("auto"))).await.unwrap();

    assert!(calls(&recorded).is_empty());
    let output = rt.reporter.captured();
    assert_eq!(
        output.last().unwrap(),
        "ℹ Missing roles/policies have already been created. Please continue with cluster upgrade process."
    );
}

#[tokio::test]
async fn test_outdated_account_roles_block_the_upgrade() {
    let recorded = Calls::default();
    let mut iam = FakeIam::new(&recorded, "4.12");
    let installer_policy = format!("arn:aws:iam::{}:policy/Demo-Installer-Role-Policy", ACCOUNT_ID);
    iam.policy_tags.insert(installer_policy, version_tag("4.12"));
    let dir = TempDir::new().unwrap();
    let rt = runtime_with_iam(
        FakeOcm::new(&recorded),
        iam,
        ScriptedPrompter::default(),
        dir.path(),
    )
    .await;

    let err = operator_roles::upgrade(&rt, &args(Some("auto"))).await.unwrap_err();

    let message = err.to_string();
    assert!(message.starts_with(
        "Account roles with prefix 'Demo' need to be upgraded before operator roles."
    ));
    assert!(message.contains("rosa upgrade account-roles --prefix Demo"));
    assert!(calls(&recorded).is_empty());
}

#[tokio::test]
async fn test_target_version_must_be_an_available_upgrade() {
    let recorded = Calls::default();
    let dir = TempDir::new().unwrap();
    let rt = runtime_with_iam(
        FakeOcm::new(&recorded),
        FakeIam::new(&recorded, "4.13"),
        ScriptedPrompter::default(),
        dir.path(),
    )
    .await;

    let upgrade = UpgradeOperatorRolesArgs {
        version: Some("4.14.0".to_string()),
        ..args(Some("auto"))
    };
    let err = operator_roles::upgrade(&rt, &upgrade).await.unwrap_err();
    assert_eq!(err.to_string(), "Expected a valid version to upgrade the cluster");
}

#[tokio::test]
async fn test_no_available_upgrades_is_not_an_error() {
    let recorded = Calls::default();
    let mut ocm = FakeOcm::new(&recorded);
    ocm.available_upgrades.clear();
    let dir = TempDir::new().unwrap();
    let rt = runtime_with_iam(
        ocm,
        FakeIam::new(&recorded, "4.12"),
        ScriptedPrompter::default(),
        dir.path(),
    )
    .await;

    let upgrade = UpgradeOperatorRolesArgs {
        version: Some("4.13.1".to_string()),
        ..args(Some("auto"))
    };
    operator_roles::upgrade(&rt, &upgrade).await.unwrap();

    assert_eq!(rt.reporter.captured(), vec!["⚠ There are no available upgrades"]);
    assert!(calls(&recorded).is_empty());
}

#[tokio::test]
async fn test_min_version_follows_target_version() {
    let recorded = Calls::default();
    let mut ocm = FakeOcm::new(&recorded);
    ocm.cred_requests.get_mut("ebs").unwrap().min_version = "4.13".to_string();
    let dir = TempDir::new().unwrap();

    // cluster is at 4.12.5, the ebs role only applies from 4.13
    let rt = runtime_with_iam(
        ocm,
        FakeIam::new(&recorded, "4.13"),
        ScriptedPrompter::default(),
        dir.path(),
    )
    .await;
    operator_roles::upgrade(&rt, &args(Some("auto"))).await.unwrap();
    assert!(calls(&recorded).is_empty());

    let mut ocm = FakeOcm::new(&recorded);
    ocm.cred_requests.get_mut("ebs").unwrap().min_version = "4.13".to_string();
    let rt = runtime_with_iam(
        ocm,
        FakeIam::new(&recorded, "4.13"),
        ScriptedPrompter::default(),
        dir.path(),
    )
    .await;
    let upgrade = UpgradeOperatorRolesArgs {
        version: Some("4.13.1".to_string()),
        ..args(Some("auto"))
    };
    operator_roles::upgrade(&rt, &upgrade).await.unwrap();
    assert_eq!(
        calls(&recorded),
        vec![
            Call::EnsureRole(EBS_ROLE.to_string()),
            Call::AttachRolePolicy(EBS_ROLE.to_string(), ebs_policy()),
        ]
    );
}

#[tokio::test]
async fn test_declined_role_is_not_created() {
    let recorded = Calls::default();
    let dir = TempDir::new().unwrap();
    let prompter = ScriptedPrompter::new(vec![Answer::Bool(false)]);
    let asked = prompter.asked.clone();
    let rt = runtime_with_iam(
        FakeOcm::new(&recorded),
        FakeIam::new(&recorded, "4.13"),
        prompter,
        dir.path(),
    )
    .await;

    let upgrade = UpgradeOperatorRolesArgs {
        yes: false,
        ..args(Some("auto"))
    };
    operator_roles::upgrade(&rt, &upgrade).await.unwrap();

    assert_eq!(
        *asked.lock().unwrap(),
        vec![format!("Create the '{}' role?", EBS_ROLE)]
    );
    assert!(calls(&recorded).is_empty());
}

#[tokio::test]
async fn test_attach_failure_stops_the_command() {
    let recorded = Calls::default();
    let mut iam = FakeIam::new(&recorded, "4.13");
    iam.fail_attach = true;
    let dir = TempDir::new().unwrap();
    let rt = runtime_with_iam(
        FakeOcm::new(&recorded),
        iam,
        ScriptedPrompter::default(),
        dir.path(),
    )
    .await;

    let err = operator_roles::upgrade(&rt, &args(Some("auto"))).await.unwrap_err();

    assert!(err
        .to_string()
        .starts_with("Failed to attach role policy. Check your prefix or run 'rosa create account-roles'"));
    assert_eq!(calls(&recorded), vec![Call::EnsureRole(EBS_ROLE.to_string())]);
}

#[tokio::test]
async fn test_throttling_is_reported_to_the_service() {
    let recorded = Calls::default();
    let mut iam = FakeIam::new(&recorded, "4.12");
    iam.fail_policy_version = Some("Throttling: Rate exceeded".to_string());
    let dir = TempDir::new().unwrap();
    let rt = runtime_with_iam(
        FakeOcm::new(&recorded),
        iam,
        ScriptedPrompter::default(),
        dir.path(),
    )
    .await;

    let err = operator_roles::upgrade(&rt, &args(Some("auto"))).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Error upgrading the operator policies: Throttling: Rate exceeded"
    );
    assert_eq!(
        calls(&recorded),
        vec![Call::LogEvent("ROSAUpgradeOperatorRolesModeAuto".to_string())]
    );
}

#[tokio::test]
async fn test_cluster_without_operator_roles() {
    let recorded = Calls::default();
    let mut ocm = FakeOcm::new(&recorded);
    let sts = ocm.clusters[0].aws.as_mut().unwrap().sts.as_mut().unwrap();
    sts.operator_iam_roles = Vec::<OperatorIamRole>::new();
    let dir = TempDir::new().unwrap();
    let rt = runtime_with_iam(
        ocm,
        FakeIam::new(&recorded, "4.13"),
        ScriptedPrompter::default(),
        dir.path(),
    )
    .await;

    let err = operator_roles::upgrade(&rt, &args(Some("auto"))).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cluster 'demo' doesn't have any operator roles associated with it"
    );
}
