use std::{env, net::SocketAddr, time::Duration};

use thiserror::Error;

use crate::rpc::DuplicatePolicy;

pub const DEFAULT_RPC_PATH: &str = "/jsonRpc";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub bind_port: u16,
    pub rpc_path: String,
    pub request_timeout: Option<Duration>,
    pub reject_duplicate_services: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("RPC_PATH must start with '/'")]
    InvalidRpcPath,
    #[error("RPC_REQUEST_TIMEOUT_MS must be a positive integer")]
    InvalidRequestTimeout,
    #[error("RPC_REJECT_DUPLICATE_SERVICES must be one of: true, false, 1, 0")]
    InvalidDuplicateFlag,
    #[error("invalid bind address or port")]
    InvalidSocket,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());
        let bind_port = lookup("BIND_PORT")
            .map(|value| value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(8082);
        let rpc_path = lookup("RPC_PATH")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_RPC_PATH.to_string());
        if !rpc_path.starts_with('/') {
            return Err(ConfigError::InvalidRpcPath);
        }
        let request_timeout = lookup("RPC_REQUEST_TIMEOUT_MS")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(|value| {
                value
                    .parse::<u64>()
                    .ok()
                    .filter(|millis| *millis > 0)
                    .map(Duration::from_millis)
                    .ok_or(ConfigError::InvalidRequestTimeout)
            })
            .transpose()?;
        let reject_duplicate_services = lookup("RPC_REJECT_DUPLICATE_SERVICES")
            .map(|value| parse_flag(&value).ok_or(ConfigError::InvalidDuplicateFlag))
            .transpose()?
            .unwrap_or(false);

        let config = Self {
            bind_addr,
            bind_port,
            rpc_path,
            request_timeout,
            reject_duplicate_services,
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        if self.reject_duplicate_services {
            DuplicatePolicy::Reject
        } else {
            DuplicatePolicy::Replace
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn parse(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn parse_defaults() {
        let config = parse(&[]).expect("config should parse");
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.bind_port, 8082);
        assert_eq!(config.rpc_path, "/jsonRpc");
        assert_eq!(config.request_timeout, None);
        assert_eq!(config.duplicate_policy(), DuplicatePolicy::Replace);
    }

    #[test]
    fn invalid_port_fails() {
        let err = parse(&[("BIND_PORT", "99999")]).expect_err("expected invalid port");
        assert!(matches!(err, ConfigError::InvalidPort));
    }

    #[test]
    fn invalid_bind_addr_fails() {
        let err = parse(&[("BIND_ADDR", "not an address")]).expect_err("expected invalid socket");
        assert!(matches!(err, ConfigError::InvalidSocket));
    }

    #[test]
    fn rpc_path_must_be_absolute() {
        let config = parse(&[("RPC_PATH", " /rpc ")]).expect("config should parse");
        assert_eq!(config.rpc_path, "/rpc");

        let err = parse(&[("RPC_PATH", "rpc")]).expect_err("expected invalid path");
        assert!(matches!(err, ConfigError::InvalidRpcPath));
    }

    #[test]
    fn request_timeout_parses_millis() {
        let config = parse(&[("RPC_REQUEST_TIMEOUT_MS", "1500")]).expect("config should parse");
        assert_eq!(config.request_timeout, Some(Duration::from_millis(1500)));

        let err = parse(&[("RPC_REQUEST_TIMEOUT_MS", "0")]).expect_err("zero is rejected");
        assert!(matches!(err, ConfigError::InvalidRequestTimeout));
    }

    #[test]
    fn duplicate_flag_selects_reject_policy() {
        let config =
            parse(&[("RPC_REJECT_DUPLICATE_SERVICES", "TRUE")]).expect("config should parse");
        assert_eq!(config.duplicate_policy(), DuplicatePolicy::Reject);

        let err = parse(&[("RPC_REJECT_DUPLICATE_SERVICES", "maybe")])
            .expect_err("expected invalid flag");
        assert!(matches!(err, ConfigError::InvalidDuplicateFlag));
    }
}
