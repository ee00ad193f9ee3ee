use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

/// Verbs the default executor accepts when `KUBECTL_COMMANDS` is unset.
pub const DEFAULT_KUBECTL_COMMANDS: &[&str] = &[
    "get",
    "describe",
    "logs",
    "top",
    "explain",
    "api-resources",
    "api-versions",
    "cluster-info",
    "auth",
];

/// Typed configuration, resolved once at startup and shared as `Arc<Config>`.
#[derive(Clone, Debug)]
pub struct Config {
    // Slack
    pub slack_bot_token: String,
    /// Authorized conversation, by name or by id.
    pub slack_channel: String,
    /// Custom Web API endpoint (test servers, proxies).
    pub slack_api_url: Option<String>,
    /// Pre-provisioned bot id, only honoured together with `slack_api_url`.
    pub slack_bot_id: Option<String>,
    pub ping_interval: Duration,

    // Cluster / executor pass-through
    pub cluster_name: String,
    pub kubectl_enabled: bool,
    pub kubectl_restrict_access: bool,
    pub kubectl_default_namespace: String,
    pub kubectl_context: Option<String>,
    pub kubectl_commands: Vec<String>,
    pub kubectl_path: PathBuf,
    /// Upper bound on a single kubectl run.
    pub kubectl_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let slack_bot_token = env_str("SLACK_BOT_TOKEN").and_then(non_empty);
        let Some(slack_bot_token) = slack_bot_token else {
            return Err(Error::Config(
                "SLACK_BOT_TOKEN environment variable is required".to_string(),
            ));
        };
        let Some(slack_channel) = env_str("SLACK_CHANNEL").and_then(non_empty) else {
            return Err(Error::Config(
                "SLACK_CHANNEL environment variable is required".to_string(),
            ));
        };

        let slack_api_url = env_str("SLACK_API_URL").and_then(non_empty);
        let slack_bot_id = env_str("SLACK_BOT_ID").and_then(non_empty);
        let ping_interval =
            Duration::from_secs(env_u64("SLACK_PING_INTERVAL_SECS").unwrap_or(30).max(1));

        let cluster_name = env_str("CLUSTER_NAME")
            .and_then(non_empty)
            .unwrap_or_else(|| "not-configured".to_string());
        let kubectl_enabled = env_bool("KUBECTL_ENABLED").unwrap_or(false);
        let kubectl_restrict_access = env_bool("KUBECTL_RESTRICT_ACCESS").unwrap_or(false);
        let kubectl_default_namespace = env_str("KUBECTL_DEFAULT_NAMESPACE")
            .and_then(non_empty)
            .unwrap_or_else(|| "default".to_string());
        let kubectl_context = env_str("KUBECTL_CONTEXT").and_then(non_empty);

        let mut kubectl_commands = parse_csv_lower(env_str("KUBECTL_COMMANDS"));
        if kubectl_commands.is_empty() {
            kubectl_commands = DEFAULT_KUBECTL_COMMANDS
                .iter()
                .map(|s| s.to_string())
                .collect();
        }

        let kubectl_timeout =
            Duration::from_secs(env_u64("KUBECTL_TIMEOUT_SECS").unwrap_or(30).max(1));

        let kubectl_path = env_path("KUBECTL_PATH")
            .or_else(|| which_in_path("kubectl"))
            .unwrap_or_else(|| PathBuf::from("kubectl"));

        Ok(Self {
            slack_bot_token,
            slack_channel,
            slack_api_url,
            slack_bot_id,
            ping_interval,
            cluster_name,
            kubectl_enabled,
            kubectl_restrict_access,
            kubectl_default_namespace,
            kubectl_context,
            kubectl_commands,
            kubectl_path,
            kubectl_timeout,
        })
    }

    /// Bot id to use without calling `auth.test`.
    ///
    /// A pre-provisioned id only makes sense against a custom endpoint, where
    /// `auth.test` may not be served.
    pub fn preset_bot_id(&self) -> Option<&str> {
        match (&self.slack_api_url, &self.slack_bot_id) {
            (Some(_), Some(id)) => Some(id.as_str()),
            _ => None,
        }
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| parse_bool(&s))
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn parse_csv_lower(v: Option<String>) -> Vec<String> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn which_in_path(binary: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    for dir in env::split_paths(&path) {
        let candidate = dir.join(binary);
        if is_executable_file(&candidate) {
            return Some(candidate);
        }
    }
    None
}

fn is_executable_file(p: &Path) -> bool {
    if !p.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(md) = fs::metadata(p) {
            return (md.permissions().mode() & 0o111) != 0;
        }
    }
    true
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
pub(crate) fn test_config(channel: &str) -> Config {
    Config {
        slack_bot_token: "xoxb-test".to_string(),
        slack_channel: channel.to_string(),
        slack_api_url: None,
        slack_bot_id: None,
        ping_interval: Duration::from_secs(30),
        cluster_name: "test-cluster".to_string(),
        kubectl_enabled: true,
        kubectl_restrict_access: false,
        kubectl_default_namespace: "default".to_string(),
        kubectl_context: None,
        kubectl_commands: vec!["get".to_string()],
        kubectl_path: PathBuf::from("kubectl"),
        kubectl_timeout: Duration::from_secs(30),
    }
}
