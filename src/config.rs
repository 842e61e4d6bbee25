//! Client Configuration
//!
//! Everything the engine needs to know before connecting. Values come from
//! `SNAKE_*` environment variables with defaults for a guest session.

use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::core::ids::PlayerId;
use crate::game::snake::{PartialColors, SnakeColors};
use crate::network::latency::PROBE_INTERVAL;

/// Default game server endpoint.
pub const DEFAULT_SERVER_URL: &str = "wss://snakemp.duckdns.org/ws";

/// Display name used when none is configured.
pub const DEFAULT_PLAYER_NAME: &str = "anonymous";

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set to something unparseable.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name
        key: &'static str,
        /// Raw value
        value: String,
    },
}

/// Client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// WebSocket endpoint.
    pub server_url: String,
    /// Local player id.
    pub player_id: PlayerId,
    /// Access token sent in the connect URL. Empty for guests.
    pub access_token: String,
    /// Name shown to other players.
    pub display_name: String,
    /// Submit scores under the anonymous alias.
    pub anonymous: bool,
    /// Palette sent with `newPlayer`.
    pub colours: SnakeColors,
    /// Delay between a probe echo and the next probe.
    pub probe_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            player_id: PlayerId::random(),
            access_token: String::new(),
            display_name: DEFAULT_PLAYER_NAME.to_string(),
            anonymous: false,
            colours: SnakeColors::random(),
            probe_interval: PROBE_INTERVAL,
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let probe_interval = match get("SNAKE_PROBE_INTERVAL_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidValue {
                    key: "SNAKE_PROBE_INTERVAL_MS",
                    value: raw,
                })?,
            None => defaults.probe_interval,
        };

        let colours = PartialColors {
            body: get("SNAKE_COLOR_BODY"),
            head: get("SNAKE_COLOR_HEAD"),
            eyes: get("SNAKE_COLOR_EYES"),
        }
        .resolve();

        let server_url = get("SNAKE_SERVER_URL").unwrap_or(defaults.server_url);
        parse_server_url(&server_url)?;

        Ok(Self {
            server_url,
            player_id: get("SNAKE_PLAYER_ID")
                .map(PlayerId::from)
                .unwrap_or(defaults.player_id),
            access_token: get("SNAKE_ACCESS_TOKEN").unwrap_or_default(),
            display_name: get("SNAKE_PLAYER_NAME").unwrap_or(defaults.display_name),
            anonymous: get("SNAKE_ANONYMOUS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            colours,
            probe_interval,
        })
    }

    /// Set the local player.
    pub fn with_player(mut self, id: PlayerId, name: impl Into<String>) -> Self {
        self.player_id = id;
        self.display_name = name.into();
        self
    }

    /// Set the palette.
    pub fn with_colours(mut self, colours: SnakeColors) -> Self {
        self.colours = colours;
        self
    }

    /// Set the anonymous flag.
    pub fn with_anonymous(mut self, anonymous: bool) -> Self {
        self.anonymous = anonymous;
        self
    }

    /// URL to connect to, carrying the player id and access token as
    /// form-encoded query pairs.
    pub fn connect_url(&self) -> Result<String, ConfigError> {
        let mut url = parse_server_url(&self.server_url)?;
        url.query_pairs_mut()
            .append_pair("player_id", self.player_id.as_str())
            .append_pair("access_token", &self.access_token);
        Ok(url.into())
    }
}

fn parse_server_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|_| ConfigError::InvalidValue {
        key: "SNAKE_SERVER_URL",
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.display_name, "anonymous");
        assert!(!config.anonymous);
        assert_eq!(config.probe_interval, Duration::from_millis(5000));
        assert!(!config.player_id.as_str().is_empty());
        assert!(config.colours.body.starts_with("rgb("));
    }

    #[test]
    fn test_env_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("SNAKE_SERVER_URL", "ws://localhost:9000/ws"),
            ("SNAKE_PLAYER_ID", "user-7"),
            ("SNAKE_ACCESS_TOKEN", "tok"),
            ("SNAKE_PLAYER_NAME", "Sam"),
            ("SNAKE_ANONYMOUS", "1"),
            ("SNAKE_PROBE_INTERVAL_MS", "250"),
            ("SNAKE_COLOR_HEAD", "gold"),
        ]))
        .unwrap();

        assert_eq!(config.server_url, "ws://localhost:9000/ws");
        assert_eq!(config.player_id, PlayerId::new("user-7"));
        assert_eq!(config.display_name, "Sam");
        assert!(config.anonymous);
        assert_eq!(config.probe_interval, Duration::from_millis(250));
        assert_eq!(config.colours.head, "gold");
        assert!(config.colours.eyes.starts_with("rgb("));
    }

    #[test]
    fn test_bad_interval() {
        let err = ClientConfig::from_lookup(lookup(&[("SNAKE_PROBE_INTERVAL_MS", "soon")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "SNAKE_PROBE_INTERVAL_MS",
                value: "soon".into()
            }
        );
    }

    #[test]
    fn test_connect_url() {
        let config = ClientConfig {
            server_url: "ws://host/ws".into(),
            access_token: "a b&c".into(),
            ..ClientConfig::default()
        }
        .with_player(PlayerId::new("p1"), "P");

        assert_eq!(
            config.connect_url().unwrap(),
            "ws://host/ws?player_id=p1&access_token=a+b%26c"
        );
    }

    #[test]
    fn test_connect_url_existing_query() {
        let config = ClientConfig {
            server_url: "ws://host/ws?room=2".into(),
            ..ClientConfig::default()
        }
        .with_player(PlayerId::new("p1"), "P");
        assert_eq!(
            config.connect_url().unwrap(),
            "ws://host/ws?room=2&player_id=p1&access_token="
        );
    }

    #[test]
    fn test_bad_server_url() {
        let err = ClientConfig::from_lookup(lookup(&[("SNAKE_SERVER_URL", "not a url")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "SNAKE_SERVER_URL",
                value: "not a url".into()
            }
        );

        let config = ClientConfig {
            server_url: "::".into(),
            ..ClientConfig::default()
        };
        assert!(config.connect_url().is_err());
    }
}
