//! Configuration: the on-disk TOML model, its validation, and the
//! read-only runtime model the workers share.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::crypto::{base32_decode, random_string};
use crate::totp::Algo;

const DEF_NTHREADS: usize = 4;
const DEF_AUTH_PER_SECOND: u32 = 2;
const DEF_LOG_PATH: &str = "/tmp/totp_auth";
// One generation accepts the previous and next code as well, a 90 second
// window at the default 30 second period.
const DEF_GENERATIONS: u32 = 1;
const DEF_DIGITS: u32 = 6;
const DEF_PERIOD: u64 = 30;

const GENERATED_SECRET_LEN: usize = 32;

#[derive(Debug, Deserialize)]
pub struct FileConfig {
    #[serde(default = "default_nthreads")]
    pub nthreads: usize,
    #[serde(default = "default_auth_per_second")]
    pub auth_per_second: u32,
    pub secret: String,
    #[serde(rename = "log-path", default = "default_log_path")]
    pub log_path: PathBuf,
    #[serde(default)]
    pub webs: Vec<WebEntry>,
}

#[derive(Debug, Deserialize)]
pub struct WebEntry {
    pub hostname: String,
    pub template: String,
    #[serde(default = "default_generations")]
    pub totp_generations: u32,
    #[serde(default)]
    pub users: Vec<UserEntry>,
}

#[derive(Debug, Deserialize)]
pub struct UserEntry {
    pub username: String,
    pub password: String,
    pub totp: String,
    pub duration: u64,
    #[serde(default)]
    pub algorithm: Algo,
    #[serde(default = "default_digits")]
    pub digits: u32,
    #[serde(default = "default_period")]
    pub period: u64,
}

fn default_nthreads() -> usize {
    DEF_NTHREADS
}

fn default_auth_per_second() -> u32 {
    DEF_AUTH_PER_SECOND
}

fn default_log_path() -> PathBuf {
    PathBuf::from(DEF_LOG_PATH)
}

fn default_generations() -> u32 {
    DEF_GENERATIONS
}

fn default_digits() -> u32 {
    DEF_DIGITS
}

fn default_period() -> u64 {
    DEF_PERIOD
}

/// Per-user credential with the TOTP secret already decoded to bytes.
#[derive(Debug, Clone)]
pub struct Credential {
    pub password: String,
    pub secret: Vec<u8>,
    pub sduration: u64,
    pub digits: u32,
    pub period: u64,
    pub algorithm: Algo,
}

/// One protected host, keyed by the `Host` header value.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub webtemplate: String,
    pub totp_generations: u32,
    pub users: HashMap<String, Credential>,
}

/// Immutable after load; shared read-only across the worker pool.
#[derive(Debug)]
pub struct ServerConfig {
    pub webs: HashMap<String, HostConfig>,
    pub secret: Vec<u8>,
    pub nthreads: usize,
    pub auth_per_second: u32,
    pub log_path: PathBuf,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Parse(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Error reading config file: {e}"),
            ConfigError::Parse(e) => write!(f, "Error parsing config file: {e}"),
            ConfigError::Invalid(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

pub fn load<P: AsRef<Path>>(path: P) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    from_str(&content)
}

pub fn from_str(content: &str) -> Result<ServerConfig, ConfigError> {
    let file: FileConfig = toml::from_str(content)?;
    build(file)
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

/// Validates the file model and produces the runtime model. The cookie
/// secret is generated when the configured one is empty, so cookies do not
/// survive restarts unless a secret is supplied.
pub fn build(file: FileConfig) -> Result<ServerConfig, ConfigError> {
    if file.webs.is_empty() {
        return Err(invalid("'webs' must be an array of 1 or more elements"));
    }

    let mut webs = HashMap::new();
    for web in file.webs {
        let mut users = HashMap::new();
        for user in web.users {
            if !(6..=9).contains(&user.digits) {
                return Err(invalid(format!(
                    "user '{}': digits must be between 6 and 9 (included)",
                    user.username
                )));
            }
            if user.period == 0 {
                return Err(invalid(format!(
                    "user '{}': period must be bigger than zero",
                    user.username
                )));
            }
            let secret = base32_decode(&user.totp).ok_or_else(|| {
                invalid(format!(
                    "user '{}': totp is not a valid base32 secret",
                    user.username
                ))
            })?;

            users.insert(
                user.username,
                Credential {
                    password: user.password,
                    secret,
                    sduration: user.duration,
                    digits: user.digits,
                    period: user.period,
                    algorithm: user.algorithm,
                },
            );
        }

        webs.insert(
            web.hostname,
            HostConfig {
                webtemplate: web.template,
                totp_generations: web.totp_generations,
                users,
            },
        );
    }

    let secret = if file.secret.is_empty() {
        random_string(GENERATED_SECRET_LEN).into_bytes()
    } else {
        file.secret.into_bytes()
    };

    Ok(ServerConfig {
        webs,
        secret,
        nthreads: file.nthreads.max(1),
        auth_per_second: file.auth_per_second,
        log_path: file.log_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
secret = "server secret"

[[webs]]
hostname = "example.com"
template = "default"

[[webs.users]]
username = "alice"
password = "pw"
totp = "JBSWY3DPEHPK3PXP"
duration = 3600
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = from_str(MINIMAL).unwrap();
        assert_eq!(config.nthreads, 4);
        assert_eq!(config.auth_per_second, 2);
        assert_eq!(config.log_path, PathBuf::from("/tmp/totp_auth"));
        assert_eq!(config.secret, b"server secret");

        let host = &config.webs["example.com"];
        assert_eq!(host.webtemplate, "default");
        assert_eq!(host.totp_generations, 1);

        let alice = &host.users["alice"];
        assert_eq!(alice.digits, 6);
        assert_eq!(alice.period, 30);
        assert_eq!(alice.algorithm, Algo::Sha1);
        assert_eq!(alice.sduration, 3600);
        assert!(!alice.secret.is_empty());
    }

    #[test]
    fn test_missing_secret_is_an_error() {
        let err = from_str("[[webs]]\nhostname = \"h\"\ntemplate = \"t\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_empty_secret_generates_one() {
        let config = from_str(&MINIMAL.replace("server secret", "")).unwrap();
        assert!(!config.secret.is_empty());
    }

    #[test]
    fn test_empty_webs_rejected() {
        let err = from_str("secret = \"s\"\nwebs = []\n").unwrap_err();
        assert!(err.to_string().contains("1 or more"));
    }

    #[test]
    fn test_digit_range_enforced() {
        for (digits, ok) in [(5, false), (6, true), (9, true), (10, false)] {
            let content = format!("{MINIMAL}digits = {digits}\n");
            assert_eq!(from_str(&content).is_ok(), ok, "digits = {digits}");
        }
    }

    #[test]
    fn test_zero_period_rejected() {
        let err = from_str(&format!("{MINIMAL}period = 0\n")).unwrap_err();
        assert!(err.to_string().contains("period"));
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let content = format!("{MINIMAL}algorithm = \"md5\"\n");
        assert!(from_str(&content).is_err());
    }

    #[test]
    fn test_algorithm_names() {
        for (name, algo) in [
            ("sha1", Algo::Sha1),
            ("sha-256", Algo::Sha256),
            ("sha-512", Algo::Sha512),
        ] {
            let content = format!("{MINIMAL}algorithm = \"{name}\"\n");
            let config = from_str(&content).unwrap();
            assert_eq!(config.webs["example.com"].users["alice"].algorithm, algo);
        }
    }

    #[test]
    fn test_bad_base32_rejected() {
        let content = MINIMAL.replace("JBSWY3DPEHPK3PXP", "not base32!");
        let err = from_str(&content).unwrap_err();
        assert!(err.to_string().contains("base32"));
    }

    #[test]
    fn test_nthreads_clamped_to_one() {
        let config = from_str(&format!("nthreads = 0\n{MINIMAL}")).unwrap();
        assert_eq!(config.nthreads, 1);
    }
}
