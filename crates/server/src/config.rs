//! Server configuration: command-line values with `LAMBDA_INSPECTOR_*`
//! environment fallbacks.

use std::num::NonZeroUsize;

use url::Url;

/// Default bind host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default port.
pub const DEFAULT_PORT: u16 = 4599;

/// Default mount point for every inspector route.
pub const DEFAULT_MOUNT: &str = "/_extension/lambda-inspector";

/// Default upstream for proxied WebSocket sessions (the dashboard backend).
pub const DEFAULT_WS_FORWARD: &str = "ws://localhost:8501/";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {setting}: '{value}' ({reason})")]
    Invalid {
        setting: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(setting: &'static str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            setting,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Values supplied on the command line. `None` falls back to the
/// environment, then to the default.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub mount: Option<String>,
    pub ws_forward: Option<String>,
    pub executor_url: Option<String>,
    pub max_invocations: Option<usize>,
}

/// Resolved server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Route prefix, `/`-prefixed, no trailing slash (or exactly `/`).
    pub mount: String,
    /// Base URL proxied WebSocket paths are resolved against.
    pub ws_forward: Url,
    /// Execution backend for `POST /invoke`. Disabled when `None`.
    pub executor_url: Option<Url>,
    /// Retention cap for the invocation log. Unbounded when `None`.
    pub max_invocations: Option<NonZeroUsize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            mount: DEFAULT_MOUNT.to_string(),
            ws_forward: Url::parse(DEFAULT_WS_FORWARD).expect("default forward URL is valid"),
            executor_url: None,
            max_invocations: None,
        }
    }
}

impl ServerConfig {
    /// Resolve against the process environment.
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary environment lookup.
    pub fn resolve_with<F>(overrides: ConfigOverrides, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.is_empty());

        let host = overrides
            .host
            .or_else(|| env("LAMBDA_INSPECTOR_HOST"))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match overrides.port {
            Some(port) => port,
            None => match env("LAMBDA_INSPECTOR_PORT") {
                Some(raw) => raw.parse::<u16>().map_err(|e| {
                    ConfigError::invalid("LAMBDA_INSPECTOR_PORT", &raw, e.to_string())
                })?,
                None => DEFAULT_PORT,
            },
        };

        let mount = overrides
            .mount
            .or_else(|| env("LAMBDA_INSPECTOR_MOUNT"))
            .unwrap_or_else(|| DEFAULT_MOUNT.to_string());
        let mount = normalize_mount(&mount)?;

        let ws_forward_raw = overrides
            .ws_forward
            .or_else(|| env("LAMBDA_INSPECTOR_WS_FORWARD"))
            .unwrap_or_else(|| DEFAULT_WS_FORWARD.to_string());
        let ws_forward = parse_ws_forward(&ws_forward_raw)?;

        let executor_url = match overrides
            .executor_url
            .or_else(|| env("LAMBDA_INSPECTOR_EXECUTOR_URL"))
        {
            Some(raw) => Some(parse_http_url("executor URL", &raw)?),
            None => None,
        };

        let max_invocations = match overrides.max_invocations {
            Some(n) => Some(n.to_string()),
            None => env("LAMBDA_INSPECTOR_MAX_INVOCATIONS"),
        };
        let max_invocations = match max_invocations {
            Some(raw) => {
                let n = raw.parse::<usize>().map_err(|e| {
                    ConfigError::invalid("max invocations", &raw, e.to_string())
                })?;
                Some(NonZeroUsize::new(n).ok_or_else(|| {
                    ConfigError::invalid("max invocations", &raw, "must be greater than zero")
                })?)
            }
            None => None,
        };

        Ok(ServerConfig {
            host,
            port,
            mount,
            ws_forward,
            executor_url,
            max_invocations,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn normalize_mount(raw: &str) -> Result<String, ConfigError> {
    if !raw.starts_with('/') {
        return Err(ConfigError::invalid("mount", raw, "must start with '/'"));
    }
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() {
        Ok("/".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

fn parse_ws_forward(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::invalid("ws forward", raw, e.to_string()))?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(ConfigError::invalid(
            "ws forward",
            raw,
            format!("scheme must be ws or wss, got {other}"),
        )),
    }
}

fn parse_http_url(setting: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::invalid(setting, raw, e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::invalid(
            setting,
            raw,
            format!("scheme must be http or https, got {other}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(
        overrides: ConfigOverrides,
        env: &[(&str, &str)],
    ) -> Result<ServerConfig, ConfigError> {
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::resolve_with(overrides, |key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_without_flags_or_env() {
        let config = resolve(ConfigOverrides::default(), &[]).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr(), "127.0.0.1:4599");
    }

    #[test]
    fn env_fills_in_missing_flags() {
        let config = resolve(
            ConfigOverrides::default(),
            &[
                ("LAMBDA_INSPECTOR_PORT", "9000"),
                ("LAMBDA_INSPECTOR_WS_FORWARD", "ws://ui:8502/app/"),
                ("LAMBDA_INSPECTOR_MAX_INVOCATIONS", "500"),
                ("LAMBDA_INSPECTOR_EXECUTOR_URL", "http://executor:9001"),
            ],
        )
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.ws_forward.as_str(), "ws://ui:8502/app/");
        assert_eq!(config.max_invocations, NonZeroUsize::new(500));
        assert_eq!(
            config.executor_url.as_ref().map(Url::as_str),
            Some("http://executor:9001/")
        );
    }

    #[test]
    fn flags_win_over_env() {
        let overrides = ConfigOverrides {
            port: Some(7000),
            host: Some("0.0.0.0".to_string()),
            ..Default::default()
        };
        let config = resolve(overrides, &[("LAMBDA_INSPECTOR_PORT", "9000")]).unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let config = resolve(ConfigOverrides::default(), &[("LAMBDA_INSPECTOR_PORT", "")]).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn mount_is_normalized() {
        let with_slash = ConfigOverrides {
            mount: Some("/inspector/".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve(with_slash, &[]).unwrap().mount, "/inspector");

        let root = ConfigOverrides {
            mount: Some("/".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve(root, &[]).unwrap().mount, "/");

        let relative = ConfigOverrides {
            mount: Some("inspector".to_string()),
            ..Default::default()
        };
        assert!(resolve(relative, &[]).is_err());
    }

    #[test]
    fn rejects_non_websocket_forward_base() {
        let overrides = ConfigOverrides {
            ws_forward: Some("http://localhost:8501/".to_string()),
            ..Default::default()
        };
        let err = resolve(overrides, &[]).unwrap_err();
        assert!(err.to_string().contains("scheme must be ws or wss"));
    }

    #[test]
    fn rejects_zero_and_garbage_caps() {
        let zero = ConfigOverrides {
            max_invocations: Some(0),
            ..Default::default()
        };
        assert!(resolve(zero, &[]).is_err());
        assert!(resolve(
            ConfigOverrides::default(),
            &[("LAMBDA_INSPECTOR_MAX_INVOCATIONS", "lots")]
        )
        .is_err());
    }

    #[test]
    fn rejects_bad_port_env() {
        let err = resolve(
            ConfigOverrides::default(),
            &[("LAMBDA_INSPECTOR_PORT", "99999")],
        )
        .unwrap_err();
        assert!(err.to_string().contains("LAMBDA_INSPECTOR_PORT"));
    }
}
