use std::path::Path;
use std::time::Duration;

use anyhow::Context;

const DEFAULT_BASE_PORT: u16 = 5000;
const DEFAULT_MAX_INSTANCES: u16 = 10;
const DEFAULT_MAX_RESERVATION_ATTEMPTS: usize = 10;
const DEFAULT_MAX_START_ATTEMPTS: u32 = 30;
const DEFAULT_START_POLL_INTERVAL_MS: u64 = 1000;

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse::<u64>().ok())
}

/// Pool and lifecycle limits, loaded once at startup and immutable
/// thereafter.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// First port of the pool.
    pub base_port: u16,
    /// Pool size; the valid range is `[base_port, base_port + max_instances)`.
    pub max_instances: u16,
    /// Upper bound on reservation candidates tried per request.
    pub max_reservation_attempts: usize,
    /// Upper bound on readiness probes per activation.
    pub max_start_attempts: u32,
    /// Sleep between readiness probes.
    pub start_poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_port: DEFAULT_BASE_PORT,
            max_instances: DEFAULT_MAX_INSTANCES,
            max_reservation_attempts: DEFAULT_MAX_RESERVATION_ATTEMPTS,
            max_start_attempts: DEFAULT_MAX_START_ATTEMPTS,
            start_poll_interval: Duration::from_millis(DEFAULT_START_POLL_INTERVAL_MS),
        }
    }
}

impl SessionConfig {
    /// Reads `VIZPORT_*` variables from the process environment, falling
    /// back to defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = env_u64("VIZPORT_BASE_PORT") {
            cfg.base_port = v.clamp(1024, 65000) as u16;
        }
        if let Some(v) = env_u64("VIZPORT_MAX_INSTANCES") {
            cfg.max_instances = v.clamp(1, 512) as u16;
        }
        if let Some(v) = env_u64("VIZPORT_MAX_RESERVATION_ATTEMPTS") {
            cfg.max_reservation_attempts = v.clamp(1, 100) as usize;
        }
        if let Some(v) = env_u64("VIZPORT_MAX_START_ATTEMPTS") {
            cfg.max_start_attempts = v.clamp(1, 600) as u32;
        }
        if let Some(v) = env_u64("VIZPORT_START_POLL_INTERVAL_MS") {
            cfg.start_poll_interval = Duration::from_millis(v.clamp(50, 60_000));
        }
        cfg.cap_to_port_space()
    }

    /// Loads `KEY=value` lines from an env file, where each value is a
    /// JSON scalar (`VIZPORT_BASE_PORT=5000`). Later files override
    /// earlier ones when merged by the caller.
    pub fn from_env_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_env_file(path)?;
        Ok(cfg.cap_to_port_space())
    }

    pub fn apply_env_file(&mut self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read env file {}", path.display()))?;

        for (lineno, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                anyhow::bail!("malformed line {} in {}", lineno + 1, path.display());
            };
            let value: serde_json::Value = serde_json::from_str(value.trim())
                .with_context(|| format!("parse value on line {} in {}", lineno + 1, path.display()))?;
            self.apply(key.trim(), &value);
        }
        Ok(())
    }

    fn apply(&mut self, key: &str, value: &serde_json::Value) {
        let Some(v) = value.as_u64() else {
            return;
        };
        match key {
            "VIZPORT_BASE_PORT" => self.base_port = v.clamp(1024, 65000) as u16,
            "VIZPORT_MAX_INSTANCES" => self.max_instances = v.clamp(1, 512) as u16,
            "VIZPORT_MAX_RESERVATION_ATTEMPTS" => {
                self.max_reservation_attempts = v.clamp(1, 100) as usize;
            }
            "VIZPORT_MAX_START_ATTEMPTS" => self.max_start_attempts = v.clamp(1, 600) as u32,
            "VIZPORT_START_POLL_INTERVAL_MS" => {
                self.start_poll_interval = Duration::from_millis(v.clamp(50, 60_000));
            }
            _ => {}
        }
    }

    fn cap_to_port_space(mut self) -> Self {
        // The pool must not run past the end of the TCP port space.
        let room = u16::MAX - self.base_port;
        if self.max_instances > room {
            self.max_instances = room;
        }
        self
    }

    /// The closed-open valid port range `[base_port, base_port + max_instances)`.
    pub fn valid_ports(&self) -> std::ops::Range<u16> {
        self.base_port..self.base_port + self.max_instances
    }
}
