//! Layered configuration: a TOML file (route table, per-service
//! timeouts, internal subnets, strict-mode flag) overridden by
//! environment variables, in the spirit of the pack's
//! `narayana-server::config_manager` layering convention.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use sentinel_core::RouteTable;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RATE_LIMIT_RPS: f64 = 20.0;
pub const DEFAULT_RATE_LIMIT_BURST: u32 = 50;

/// Upstream JSON response bodies are bounded to this many bytes (§5
/// resource limits); error bodies are truncated separately at read time.
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Name of the environment variable that, outside strict mode, carries
/// the hex-encoded 32-byte master key.
pub const MASTER_KEY_ENV: &str = "MASTER_KEY_ENV";

#[derive(Debug, Deserialize, Default)]
struct RouteSpec {
    upstream: String,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct RawSettings {
    port: Option<u16>,
    strict_mode: Option<bool>,
    internal_subnets: Option<String>,
    rate_limit_rps: Option<f64>,
    rate_limit_burst: Option<u32>,
    log_format: Option<String>,
    #[serde(default)]
    routes: BTreeMap<String, RouteSpec>,
    #[serde(default)]
    service_tokens: BTreeMap<String, String>,
    #[serde(default)]
    role_assignments: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

pub struct Settings {
    pub port: u16,
    pub strict_mode: bool,
    pub internal_subnets: Vec<ipnetwork::IpNetwork>,
    pub rate_limit_rps: f64,
    pub rate_limit_burst: u32,
    pub log_format: LogFormat,
    pub route_table: RouteTable,
    pub service_tokens: sentinel_core::ServiceTokens,
    /// Principal -> role, applied when a user is first created through the
    /// wallet-challenge flow. Empty unless the deployment configures it.
    pub role_assignments: BTreeMap<String, String>,
}

#[derive(Debug)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "configuration error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Parses a boolean the way the other bare environment variables in this
/// file do: `1`/`true`/`yes`/`on` and `0`/`false`/`no`/`off`, case-insensitive.
fn parse_bool_env(name: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError(format!("invalid boolean for {name}: '{other}'"))),
    }
}

/// Load settings from an optional TOML file (`SENTINEL_CONFIG` or
/// `--config`), overridden by `SENTINEL_*` environment variables, then
/// by an optional CLI `--port`.
///
/// `STRICT_MODE` and `INTERNAL_SUBNETS` are read directly, unprefixed, the
/// same way `MASTER_KEY_ENV` is read by `sentinel_envelope::EnvProvider` —
/// spec.md §6 names all three as bare environment variables. They still
/// fall back to the TOML file / `SENTINEL__`-prefixed layer when unset.
pub fn load(config_path: Option<&str>, port_override: Option<u16>) -> Result<Settings, ConfigError> {
    let path = config_path
        .map(str::to_string)
        .or_else(|| std::env::var("SENTINEL_CONFIG").ok());

    let mut builder = config::Config::builder();
    if let Some(path) = &path {
        builder = builder.add_source(config::File::with_name(path).required(false));
    }
    builder = builder.add_source(
        config::Environment::with_prefix("SENTINEL")
            .separator("__")
            .try_parsing(true),
    );

    let raw: RawSettings = builder
        .build()
        .map_err(|e| ConfigError(e.to_string()))?
        .try_deserialize()
        .unwrap_or_default();

    let port = port_override.or(raw.port).unwrap_or(DEFAULT_PORT);

    let strict_mode = match std::env::var("STRICT_MODE") {
        Ok(raw_value) => parse_bool_env("STRICT_MODE", &raw_value)?,
        Err(_) => raw.strict_mode.unwrap_or(false),
    };

    let internal_subnets_raw = std::env::var("INTERNAL_SUBNETS")
        .ok()
        .or(raw.internal_subnets);

    let internal_subnets = internal_subnets_raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<ipnetwork::IpNetwork>()
                .map_err(|e| ConfigError(format!("invalid CIDR '{s}': {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let log_format = match raw.log_format.as_deref() {
        Some("json") => LogFormat::Json,
        _ => LogFormat::Pretty,
    };

    let mut route_table = RouteTable::new(Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS));
    for (service, spec) in raw.routes {
        if strict_mode && !spec.upstream.starts_with("https://") {
            return Err(ConfigError(format!(
                "strict mode requires an https:// upstream for service '{service}', got '{}'",
                spec.upstream
            )));
        }
        let timeout = spec
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS));
        route_table = route_table.with_route_timeout(service, spec.upstream, timeout);
    }

    Ok(Settings {
        port,
        strict_mode,
        internal_subnets,
        rate_limit_rps: raw.rate_limit_rps.unwrap_or(DEFAULT_RATE_LIMIT_RPS),
        rate_limit_burst: raw.rate_limit_burst.unwrap_or(DEFAULT_RATE_LIMIT_BURST),
        log_format,
        route_table,
        service_tokens: raw.service_tokens,
        role_assignments: raw.role_assignments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_with_no_file_and_no_env() {
        let settings = load(Some("/nonexistent/sentinel.toml"), None).unwrap();
        assert_eq!(settings.port, DEFAULT_PORT);
        assert!(!settings.strict_mode);
        assert_eq!(settings.rate_limit_rps, DEFAULT_RATE_LIMIT_RPS);
    }

    #[test]
    fn cli_port_override_wins() {
        let settings = load(Some("/nonexistent/sentinel.toml"), Some(9999)).unwrap();
        assert_eq!(settings.port, 9999);
    }

    #[test]
    fn toml_file_populates_route_table_in_non_strict_mode() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        use std::io::Write;
        write!(
            file,
            r#"
            internal_subnets = "10.0.0.0/8, 127.0.0.1/32"

            [routes.sample]
            upstream = "http://localhost:9000"
            timeout_secs = 5
            "#
        )
        .unwrap();

        let settings = load(Some(file.path().to_str().unwrap()), None).unwrap();
        assert!(!settings.strict_mode);
        assert_eq!(settings.internal_subnets.len(), 2);
        let (base, timeout) = settings.route_table.resolve("sample").unwrap();
        assert_eq!(base, "http://localhost:9000");
        assert_eq!(timeout, Duration::from_secs(5));
    }

    #[test]
    fn strict_mode_rejects_non_https_upstream() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        use std::io::Write;
        write!(
            file,
            r#"
            strict_mode = true

            [routes.sample]
            upstream = "http://localhost:9000"
            "#
        )
        .unwrap();

        let err = load(Some(file.path().to_str().unwrap()), None).unwrap_err();
        assert!(err.0.contains("https"));
    }

    #[test]
    fn strict_mode_accepts_https_upstream() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        use std::io::Write;
        write!(
            file,
            r#"
            strict_mode = true
            internal_subnets = "10.0.0.0/8, 127.0.0.1/32"

            [routes.sample]
            upstream = "https://upstream.internal"
            timeout_secs = 5
            "#
        )
        .unwrap();

        let settings = load(Some(file.path().to_str().unwrap()), None).unwrap();
        assert!(settings.strict_mode);
        assert_eq!(settings.internal_subnets.len(), 2);
        let (base, timeout) = settings.route_table.resolve("sample").unwrap();
        assert_eq!(base, "https://upstream.internal");
        assert_eq!(timeout, Duration::from_secs(5));
    }

    // `STRICT_MODE`/`INTERNAL_SUBNETS` are process-global; serialize the
    // tests that set them so they don't clobber each other when the test
    // harness runs them concurrently.
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[test]
    fn bare_strict_mode_env_var_overrides_toml_and_enables_https_check() {
        let _guard = ENV_LOCK.lock().unwrap();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        use std::io::Write;
        write!(
            file,
            r#"
            strict_mode = false

            [routes.sample]
            upstream = "http://localhost:9000"
            "#
        )
        .unwrap();

        std::env::set_var("STRICT_MODE", "true");
        let err = load(Some(file.path().to_str().unwrap()), None).unwrap_err();
        std::env::remove_var("STRICT_MODE");
        assert!(err.0.contains("https"), "bare STRICT_MODE=true must win over the TOML value");
    }

    #[test]
    fn bare_internal_subnets_env_var_overrides_toml() {
        let _guard = ENV_LOCK.lock().unwrap();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        use std::io::Write;
        write!(file, r#"internal_subnets = "127.0.0.1/32""#).unwrap();

        std::env::set_var("INTERNAL_SUBNETS", "10.0.0.0/8, 192.168.0.0/16, 172.16.0.0/12");
        let settings = load(Some(file.path().to_str().unwrap()), None).unwrap();
        std::env::remove_var("INTERNAL_SUBNETS");
        assert_eq!(settings.internal_subnets.len(), 3);
    }

    #[test]
    fn invalid_bare_strict_mode_env_var_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("STRICT_MODE", "maybe");
        let err = load(Some("/nonexistent/sentinel.toml"), None).unwrap_err();
        std::env::remove_var("STRICT_MODE");
        assert!(err.0.contains("invalid boolean"));
    }
}
