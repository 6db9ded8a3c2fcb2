use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Ten years. Keeps token expiry well inside chrono's range.
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365 * 10;
/// A century. Keeps `now - retention` representable.
const MAX_RETENTION_DAYS: i64 = 365 * 100;

/// Which tasks `GET /tasks` returns to an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskListScope {
    /// Every live task, regardless of owner.
    All,
    /// Only the caller's own tasks.
    Owner,
}

impl FromStr for TaskListScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(TaskListScope::All),
            "owner" => Ok(TaskListScope::Owner),
            other => Err(format!("unknown task list scope '{}'", other)),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, reason } => write!(f, "{} is invalid: {}", key, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Application configuration, built once at startup and handed to the
/// credential service, the store and the sweeper.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub server_port: u16,
    pub server_host: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub store_timeout: Duration,
    pub sweep_interval: Duration,
    pub retention_days: i64,
    pub audit_log_path: PathBuf,
    pub task_list_scope: TaskListScope,
}

impl Default for Config {
    /// Local development defaults. `from_env` still insists on a real
    /// `DATABASE_URL` and `JWT_SECRET`.
    fn default() -> Self {
        Self {
            database_url: String::new(),
            database_max_connections: 10,
            server_port: 8080,
            server_host: "127.0.0.1".to_string(),
            jwt_secret: String::new(),
            token_ttl_hours: 72,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            store_timeout: Duration::from_secs(3),
            sweep_interval: Duration::from_secs(5 * 60),
            retention_days: 7,
            audit_log_path: PathBuf::from("background_task.log"),
            task_list_scope: TaskListScope::All,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: parsed(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            server_port: parsed("SERVER_PORT", defaults.server_port)?,
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            jwt_secret: required("JWT_SECRET")?,
            token_ttl_hours: bounded(
                "TOKEN_TTL_HOURS",
                defaults.token_ttl_hours,
                MAX_TOKEN_TTL_HOURS,
            )?,
            bcrypt_cost: hash_cost("BCRYPT_COST", defaults.bcrypt_cost)?,
            store_timeout: Duration::from_secs(positive("STORE_TIMEOUT_SECS", 3)? as u64),
            sweep_interval: Duration::from_secs(positive("SWEEP_INTERVAL_SECS", 300)? as u64),
            retention_days: bounded(
                "RETENTION_DAYS",
                defaults.retention_days,
                MAX_RETENTION_DAYS,
            )?,
            audit_log_path: env::var("AUDIT_LOG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.audit_log_path),
            task_list_scope: parsed("TASK_LIST_SCOPE", defaults.task_list_scope)?,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.token_ttl_hours)
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention_days)
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key)),
    }
}

fn parsed<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

fn positive(key: &'static str, default: i64) -> Result<i64, ConfigError> {
    let value = parsed(key, default)?;
    if value <= 0 {
        return Err(ConfigError::Invalid {
            key,
            reason: "must be greater than zero".into(),
        });
    }
    Ok(value)
}

fn bounded(key: &'static str, default: i64, max: i64) -> Result<i64, ConfigError> {
    let value = positive(key, default)?;
    if value > max {
        return Err(ConfigError::Invalid {
            key,
            reason: format!("must be at most {}", max),
        });
    }
    Ok(value)
}

fn hash_cost(key: &'static str, default: u32) -> Result<u32, ConfigError> {
    let value = parsed(key, default)?;
    if !(4..=31).contains(&value) {
        return Err(ConfigError::Invalid {
            key,
            reason: "must be between 4 and 31".into(),
        });
    }
    Ok(value)
}
