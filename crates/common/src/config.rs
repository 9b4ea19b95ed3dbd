use std::time::Duration;

use serde::Deserialize;

/// SMTP settings for the email channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailSettings {
    /// Sender address, also used as the SMTP username
    pub from: String,
    pub password: String,
    pub recipients: Vec<String>,
    pub smtp_host: String,
    pub smtp_port: u16,
}

/// Settings for the chat webhook channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatWebhookSettings {
    pub webhook_url: String,
}

/// Per-channel delivery settings. A channel without settings cannot be
/// delivered through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChannelSettings {
    pub email: Option<EmailSettings>,
    pub chat_webhook: Option<ChatWebhookSettings>,
}

/// Tuning for the background delivery worker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkerSettings {
    /// How long the scheduler waits for a batch before sweeping all pending records
    pub poll_interval: Duration,

    /// Capacity of the trigger queue, in batches
    pub queue_capacity: usize,

    /// Number of delivery passes per cycle
    pub max_attempts: u32,

    /// Upper bound on a single delivery attempt
    pub delivery_timeout: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            queue_capacity: 10,
            max_attempts: 3,
            delivery_timeout: Duration::from_secs(30),
        }
    }
}

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Environment name (e.g. "local", "dev", "production")
    pub environment: String,

    /// HTTP listen port
    pub port: u16,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 10)
    pub db_max_connections: u32,

    /// Shared API key required on the public API when set
    pub api_key: Option<String>,

    pub channels: ChannelSettings,

    pub worker: WorkerSettings,
}

impl AppConfig {
    /// Load configuration from environment variables, reading `.env` first.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let defaults = WorkerSettings::default();
        let worker = WorkerSettings {
            poll_interval: Duration::from_secs(parse_or(
                &var,
                "WORKER_POLL_INTERVAL_SECS",
                defaults.poll_interval.as_secs(),
            )?),
            queue_capacity: parse_or(&var, "WORKER_QUEUE_CAPACITY", defaults.queue_capacity)?,
            max_attempts: parse_or(&var, "WORKER_MAX_ATTEMPTS", defaults.max_attempts)?,
            delivery_timeout: Duration::from_secs(parse_or(
                &var,
                "DELIVERY_TIMEOUT_SECS",
                defaults.delivery_timeout.as_secs(),
            )?),
        };

        if worker.queue_capacity == 0 {
            anyhow::bail!("WORKER_QUEUE_CAPACITY must be at least 1");
        }
        if worker.max_attempts == 0 {
            anyhow::bail!("WORKER_MAX_ATTEMPTS must be at least 1");
        }
        if worker.poll_interval.is_zero() {
            anyhow::bail!("WORKER_POLL_INTERVAL_SECS must be at least 1");
        }
        if worker.delivery_timeout.is_zero() {
            anyhow::bail!("DELIVERY_TIMEOUT_SECS must be at least 1");
        }

        Ok(Self {
            environment: var("APP_ENV").unwrap_or_else(|| "local".to_string()),
            port: parse_or(&var, "PORT", 8080)?,
            database_url: var("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            db_max_connections: parse_or(&var, "DB_MAX_CONNECTIONS", 10)?,
            api_key: var("API_KEY"),
            channels: ChannelSettings {
                email: email_settings(&var)?,
                chat_webhook: var("CHAT_WEBHOOK_URL")
                    .map(|webhook_url| ChatWebhookSettings { webhook_url }),
            },
            worker,
        })
    }

    /// Local and dev environments get human-readable logs.
    pub fn is_dev_mode(&self) -> bool {
        self.environment.contains("local") || self.environment.contains("dev")
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid {}", key, std::any::type_name::<T>())),
        None => Ok(default),
    }
}

/// The email channel is configured only when a sender, a relay host and at
/// least one recipient are present.
fn email_settings<F>(var: &F) -> anyhow::Result<Option<EmailSettings>>
where
    F: Fn(&str) -> Option<String>,
{
    let recipients: Vec<String> = var("EMAIL_RECIPIENTS")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let (Some(from), Some(smtp_host)) = (var("EMAIL_FROM"), var("SMTP_HOST")) else {
        return Ok(None);
    };
    if recipients.is_empty() {
        return Ok(None);
    }

    Ok(Some(EmailSettings {
        from,
        password: var("EMAIL_PASSWORD").unwrap_or_default(),
        recipients,
        smtp_host,
        smtp_port: parse_or(var, "SMTP_PORT", 587)?,
    }))
}
