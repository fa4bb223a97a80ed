use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

const DEFAULT_API_URL_ENV: &str = "LOOKER_AGENT_API_URL";
const DEFAULT_PROJECT_ENV: &str = "GCP_PROJECT_NAME";
const DEFAULT_INSTANCE_URL_ENV: &str = "LOOKER_INSTANCE_URL";
const DEFAULT_CLIENT_ID_ENV: &str = "LOOKER_CLIENT_ID";
const DEFAULT_CLIENT_SECRET_ENV: &str = "LOOKER_CLIENT_SECRET";
const DEFAULT_TOKEN_ENV: &str = "CHATTER_ACCESS_TOKEN";

/// Top-level settings, read from `config/chatter.toml`.
///
/// Each value can be written inline or named through an environment
/// variable (`*_env`). Inline values win.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatterSettings {
    /// Conversational analytics endpoint that receives the chat request.
    #[serde(default)]
    pub api_url: Option<String>,
    /// Variable holding the endpoint.
    #[serde(default)]
    pub api_url_env: Option<String>,
    /// Cloud project name, without the `projects/` prefix.
    #[serde(default)]
    pub gcp_project: Option<String>,
    /// Variable holding the project name.
    #[serde(default)]
    pub gcp_project_env: Option<String>,
    /// Looker instance and OAuth client, needed only by Looker agents.
    #[serde(default)]
    pub looker: LookerSettings,
    /// Variable holding the end-user bearer token.
    #[serde(default)]
    pub access_token_env: Option<String>,
    /// Agent catalog path. Relative paths resolve against the workspace.
    #[serde(default)]
    pub agents_file: Option<PathBuf>,
    /// Per-call timeout. No timeout when unset.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

/// The `[looker]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LookerSettings {
    /// Base URL of the Looker instance.
    #[serde(default)]
    pub instance_url: Option<String>,
    /// Variable holding the instance URL.
    #[serde(default)]
    pub instance_url_env: Option<String>,
    /// OAuth client id of the Looker API client.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Variable holding the client id.
    #[serde(default)]
    pub client_id_env: Option<String>,
    /// OAuth client secret. Prefer `client_secret_env` over writing it inline.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Variable holding the client secret.
    #[serde(default)]
    pub client_secret_env: Option<String>,
}

impl ChatterSettings {
    /// Reads `config/chatter.toml` under `workspace_root`, falling back to
    /// defaults (environment variables only) when the file is absent.
    pub fn load(workspace_root: &Path) -> Result<Self> {
        let config_path = workspace_root.join("config/chatter.toml");
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        toml::from_str(&raw).with_context(|| format!("failed to parse {}", config_path.display()))
    }

    /// Resolves the endpoint, project and Looker client into an
    /// [`ApiEnvironment`].
    pub fn resolve(&self) -> Result<ApiEnvironment> {
        let endpoint = resolve_value(&self.api_url, &self.api_url_env, DEFAULT_API_URL_ENV)
            .ok_or_else(|| anyhow!("agent API url is not configured (api_url or {DEFAULT_API_URL_ENV})"))?;
        let project_name =
            resolve_value(&self.gcp_project, &self.gcp_project_env, DEFAULT_PROJECT_ENV)
                .ok_or_else(|| anyhow!("GCP project is not configured (gcp_project or {DEFAULT_PROJECT_ENV})"))?;
        Ok(ApiEnvironment {
            endpoint,
            project_name,
            looker: self.looker.resolve(),
            timeout: self.request_timeout_secs.map(Duration::from_secs),
        })
    }

    /// Reads the bearer token from the configured environment variable.
    pub fn access_token(&self) -> Result<BearerToken> {
        let var = self.access_token_env.as_deref().unwrap_or(DEFAULT_TOKEN_ENV);
        let token = env::var(var)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("no access token found in ${var}"))?;
        Ok(BearerToken::new(token.trim()))
    }

    pub fn agents_path(&self, workspace_root: &Path) -> PathBuf {
        let path = self
            .agents_file
            .clone()
            .unwrap_or_else(|| PathBuf::from("agents.yaml"));
        if path.is_relative() {
            workspace_root.join(path)
        } else {
            path
        }
    }
}

impl LookerSettings {
    /// Returns credentials only when all three values resolve.
    fn resolve(&self) -> Option<LookerCredentials> {
        Some(LookerCredentials {
            instance_url: resolve_value(
                &self.instance_url,
                &self.instance_url_env,
                DEFAULT_INSTANCE_URL_ENV,
            )?,
            client_id: resolve_value(&self.client_id, &self.client_id_env, DEFAULT_CLIENT_ID_ENV)?,
            client_secret: resolve_value(
                &self.client_secret,
                &self.client_secret_env,
                DEFAULT_CLIENT_SECRET_ENV,
            )?,
        })
    }
}

/// Inline value, else the named variable, else the default variable.
fn resolve_value(inline: &Option<String>, var: &Option<String>, default_var: &str) -> Option<String> {
    if let Some(value) = inline {
        return Some(value.clone());
    }
    let var = var.as_deref().unwrap_or(default_var);
    env::var(var).ok().filter(|value| !value.trim().is_empty())
}

/// Static deployment context attached to every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEnvironment {
    pub endpoint: String,
    pub project_name: String,
    pub looker: Option<LookerCredentials>,
    pub timeout: Option<Duration>,
}

impl ApiEnvironment {
    /// Fully qualified project resource, `projects/<name>`.
    pub fn project_resource(&self) -> String {
        format!("projects/{}", self.project_name)
    }
}

/// Looker instance URI and OAuth client pair. This is deployment
/// configuration, not the end user's credential.
#[derive(Clone, PartialEq, Eq)]
pub struct LookerCredentials {
    pub instance_url: String,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for LookerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookerCredentials")
            .field("instance_url", &self.instance_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Opaque end-user bearer token, sent only as an `Authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}
