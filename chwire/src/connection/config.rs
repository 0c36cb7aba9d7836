//! Connection configuration.
use percent_encoding::percent_decode_str;
use std::{borrow::Cow, env::var, fmt, time::Duration};

use crate::protocol::{CLIENT_NAME, SettingValue, Settings};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 9000;
const DEFAULT_DATABASE: &str = "default";
const DEFAULT_USER: &str = "default";

/// ClickHouse connection config.
#[derive(Clone, Debug)]
pub struct Config {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) database: String,
    pub(crate) user: String,
    pub(crate) password: String,
    pub(crate) connect_timeout: Duration,
    pub(crate) query_timeout: Duration,
    pub(crate) compression: bool,
    pub(crate) client_name: String,
    pub(crate) settings: Settings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            database: DEFAULT_DATABASE.into(),
            user: DEFAULT_USER.into(),
            password: String::new(),
            connect_timeout: Duration::from_secs(10),
            query_timeout: Duration::ZERO,
            compression: true,
            client_name: CLIENT_NAME.into(),
            settings: Settings::new(),
        }
    }
}

macro_rules! setter {
    ($($(#[$doc:meta])* $name:ident: $ty:ty,)*) => {
        $(
            $(#[$doc])*
            pub fn $name(mut self, $name: impl Into<$ty>) -> Self {
                self.$name = $name.into();
                self
            }
        )*
    };
}

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    setter! {
        host: String,
        port: u16,
        database: String,
        user: String,
        password: String,
        /// Timeout to establish the tcp connection, zero waits indefinitely.
        connect_timeout: Duration,
        /// Timeout of each read while waiting for the server, zero waits indefinitely.
        query_timeout: Duration,
        /// Ask the server to compress data blocks, and compress inserted blocks.
        compression: bool,
        /// Client name reported to the server.
        client_name: String,
        /// Settings sent with every query.
        settings: Settings,
    }

    /// Add a setting sent with every query.
    pub fn setting(mut self, name: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        self.settings.set(name, value);
        self
    }

    pub fn get_host(&self) -> &str {
        &self.host
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub fn get_database(&self) -> &str {
        &self.database
    }

    pub fn get_user(&self) -> &str {
        &self.user
    }

    pub fn get_settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns `host:port` of this config.
    pub fn address(&self) -> String {
        match self.host.contains(':') {
            true => format!("[{}]:{}", self.host, self.port),
            false => format!("{}:{}", self.host, self.port),
        }
    }

    /// Retrieve configuration from environment variable.
    ///
    /// It reads:
    /// - `CLICKHOUSE_HOST`
    /// - `CLICKHOUSE_PORT`
    /// - `CLICKHOUSE_DATABASE`
    /// - `CLICKHOUSE_USER`
    /// - `CLICKHOUSE_PASSWORD`
    ///
    /// Additionally, it also read `CLICKHOUSE_URL` to provide missing value from
    /// previous variables before fallback to default value.
    pub fn from_env() -> Config {
        let url = var("CLICKHOUSE_URL").ok().and_then(|e| Config::parse(&e).ok());

        macro_rules! env {
            ($name:literal,$or:ident,$def:expr) => {
                match (var($name), url.as_ref()) {
                    (Ok(ok), _) => ok,
                    (Err(_), Some(e)) => e.$or.clone(),
                    (Err(_), None) => $def.into(),
                }
            };
        }

        let host = env!("CLICKHOUSE_HOST", host, DEFAULT_HOST);
        let database = env!("CLICKHOUSE_DATABASE", database, DEFAULT_DATABASE);
        let user = env!("CLICKHOUSE_USER", user, DEFAULT_USER);
        let password = env!("CLICKHOUSE_PASSWORD", password, "");

        let port = match (var("CLICKHOUSE_PORT"), url.as_ref()) {
            (Ok(ok), _) => ok.parse().unwrap_or(DEFAULT_PORT),
            (Err(_), Some(e)) => e.port,
            (Err(_), None) => DEFAULT_PORT,
        };

        Self {
            host,
            port,
            database,
            user,
            password,
            ..url.unwrap_or_default()
        }
    }

    /// Parse config from url.
    ///
    /// The format is `clickhouse://[user[:password]@]host[:port][/database][?key=value&...]`.
    ///
    /// Query keys `connect_timeout` and `query_timeout` are in seconds, `compress`
    /// is `0` or `1`, and `client_name` names the client. Any other key is sent to
    /// the server as a setting.
    pub fn parse(url: &str) -> Result<Config, ParseError> {
        let (config, hosts) = Self::parse_inner(url)?;
        if hosts.len() > 1 {
            return Err(ParseError::new("multiple hosts in url"));
        }
        Ok(config)
    }

    /// Parse url with comma separated hosts, returns a config for each host.
    pub(crate) fn parse_hosts(url: &str) -> Result<Vec<Config>, ParseError> {
        let (config, hosts) = Self::parse_inner(url)?;
        Ok(hosts
            .into_iter()
            .map(|(host, port)| Config { host, port, ..config.clone() })
            .collect())
    }

    fn parse_inner(url: &str) -> Result<(Config, Vec<(String, u16)>), ParseError> {
        let mut config = Config::default();

        let Some((scheme, mut read)) = url.split_once("://") else {
            return Err(ParseError::new("scheme missing"));
        };
        if !matches!(scheme, "clickhouse" | "tcp") {
            return Err(ParseError::new(format!("unsupported scheme `{scheme}`")));
        }

        let mut query = "";
        if let Some((rest, q)) = read.split_once('?') {
            read = rest;
            query = q;
        }

        if let Some((rest, database)) = read.split_once('/') {
            read = rest;
            if !database.is_empty() {
                config.database = decode(database)?;
            }
        }

        if let Some((userinfo, rest)) = read.rsplit_once('@') {
            read = rest;
            match userinfo.split_once(':') {
                Some((user, password)) => {
                    config.user = decode(user)?;
                    config.password = decode(password)?;
                },
                None => config.user = decode(userinfo)?,
            }
        }

        if read.is_empty() {
            return Err(ParseError::new("host missing"));
        }
        let hosts = read.split(',').map(parse_host).collect::<Result<Vec<_>, _>>()?;
        if let Some((host, port)) = hosts.first() {
            config.host = host.clone();
            config.port = *port;
        }

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = decode(value)?;
            match key {
                "connect_timeout" => config.connect_timeout = parse_seconds(key, &value)?,
                "query_timeout" => config.query_timeout = parse_seconds(key, &value)?,
                "compress" => {
                    config.compression = match value.as_str() {
                        "1" | "true" => true,
                        "0" | "false" => false,
                        _ => return Err(ParseError::new("invalid compress, expected 0 or 1")),
                    }
                },
                "client_name" => config.client_name = value,
                _ => {
                    config.settings.set(decode(key)?, SettingValue::infer(&value));
                },
            }
        }

        Ok((config, hosts))
    }
}

fn parse_host(input: &str) -> Result<(String, u16), ParseError> {
    // ipv6 address in brackets
    let (host, port) = match input.strip_prefix('[') {
        Some(rest) => {
            let Some((host, rest)) = rest.split_once(']') else {
                return Err(ParseError::new("unclosed `[` in host"));
            };
            (host, rest.strip_prefix(':'))
        },
        None => match input.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (input, None),
        },
    };

    if host.is_empty() {
        return Err(ParseError::new("host missing"));
    }

    let port = match port {
        Some(port) => port.parse().map_err(|_| ParseError::new("invalid port"))?,
        None => DEFAULT_PORT,
    };

    Ok((host.to_owned(), port))
}

fn parse_seconds(key: &str, value: &str) -> Result<Duration, ParseError> {
    match value.parse::<f64>() {
        Ok(secs) if secs >= 0.0 && secs.is_finite() => Ok(Duration::from_secs_f64(secs)),
        _ => Err(ParseError::new(format!("invalid {key}, expected seconds"))),
    }
}

/// Percent decoding, malformed escapes are kept as is.
fn decode(input: &str) -> Result<String, ParseError> {
    percent_decode_str(input)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|_| ParseError::new("percent encoding is not utf8"))
}

impl std::str::FromStr for Config {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Error when parsing url.
pub struct ParseError {
    pub(crate) reason: Cow<'static, str>,
}

impl ParseError {
    pub(crate) fn new(reason: impl Into<Cow<'static, str>>) -> ParseError {
        ParseError { reason: reason.into() }
    }
}

impl std::error::Error for ParseError { }

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            return f.write_str(&self.reason)
        }
        write!(f, "failed to parse url: {}", self.reason)
    }
}

impl fmt::Debug for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
