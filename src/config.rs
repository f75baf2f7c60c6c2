use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::Display;
use std::str::FromStr;

use crate::error::{GraphError, GraphResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub port: u16,
    pub synthesize_actor_links: bool,
    pub infer_combat_sources: bool,
    pub cache_ttl_seconds: u64,
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3005,
            synthesize_actor_links: true,
            infer_combat_sources: true,
            cache_ttl_seconds: 60,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> GraphResult<Self> {
        Ok(Config {
            port: env_or("PORT", "3005")?,
            synthesize_actor_links: env_or("SYNTHESIZE_ACTOR_LINKS", "true")?,
            infer_combat_sources: env_or("INFER_COMBAT_SOURCES", "true")?,
            cache_ttl_seconds: env_or("CACHE_TTL_SECONDS", "60")?,
            max_body_bytes: env_or("MAX_BODY_BYTES", "10485760")?,
        })
    }
}

fn env_or<T>(name: &str, default: &str) -> GraphResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    parse_setting(name, &env::var(name).unwrap_or_else(|_| default.to_string()))
}

fn parse_setting<T>(name: &str, raw: &str) -> GraphResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| GraphError::Configuration(format!("{}={:?}: {}", name, raw, e)))
}
