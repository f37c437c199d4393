//! Authentication commands

use crate::api::{ApiClient, ClientError};
use crate::cli::LoginArgs;
use crate::config::{Config, TOKEN_ENV};
use crate::output::Reporter;
use anyhow::{bail, Context, Result};
use serde::Deserialize;

const TOKEN_PAGE: &str = "https://console.redhat.com/openshift/token/rosa";

#[derive(Debug, PartialEq)]
enum TokenKind {
    /// Offline token exchanged at the SSO for access tokens
    Refresh,
    Access,
}

#[derive(Deserialize)]
struct Account {
    username: String,
}

/// Use `token` as an offline token when the SSO accepts it, as an access token otherwise
async fn apply_token(api: &ApiClient, config: &Config, token: &str) -> Result<TokenKind> {
    match api.refresh(&config.token_url, &config.client_id, token).await {
        Ok(()) => Ok(TokenKind::Refresh),
        Err(ClientError::AuthFailed) => {
            api.set_token(token.to_string()).await;
            Ok(TokenKind::Access)
        }
        Err(e) => Err(e).context("Failed to reach the authentication service"),
    }
}

/// API client authenticated from `OCM_TOKEN` or the stored tokens
pub async fn authenticated_client(config: &Config) -> Result<ApiClient> {
    let api = ApiClient::new(&config.url)?;

    if let Ok(token) = std::env::var(TOKEN_ENV) {
        apply_token(&api, config, &token).await?;
    } else if let Some(refresh_token) = &config.refresh_token {
        api.refresh(&config.token_url, &config.client_id, refresh_token)
            .await
            .context("Failed to refresh the access token")?;
    } else if let Some(access_token) = &config.access_token {
        api.set_token(access_token.clone()).await;
    } else {
        bail!("Not logged in, run the 'rosa login' command");
    }

    Ok(api)
}

pub async fn login(args: &LoginArgs, config: &mut Config, reporter: &Reporter) -> Result<()> {
    if let Some(url) = &args.url {
        config.url = url.trim_end_matches('/').to_string();
    }

    let token = match &args.token {
        Some(token) => token.clone(),
        None => {
            reporter.info(format!(
                "To login to your Red Hat account, get an offline access token at {}",
                TOKEN_PAGE
            ));
            dialoguer::Password::new()
                .with_prompt("Copy the token and paste it here")
                .interact()?
        }
    };

    let api = ApiClient::new(&config.url)?;
    config.clear_tokens();
    match apply_token(&api, config, &token).await? {
        TokenKind::Refresh => config.refresh_token = Some(token),
        TokenKind::Access => config.access_token = Some(token),
    }

    let account: Account = api
        .get("/api/accounts_mgmt/v1/current_account")
        .await
        .context("Failed to get the current account")?;

    config.save()?;
    reporter.success(format!(
        "Logged in as '{}' on '{}'",
        account.username, config.url
    ));
    Ok(())
}

pub fn logout(config: &mut Config, reporter: &Reporter) -> Result<()> {
    if !config.is_logged_in() {
        reporter.info("Not logged in");
        return Ok(());
    }
    config.clear_tokens();
    config.save()?;
    reporter.success(format!("Logged out on '{}'", config.url));
    Ok(())
}
