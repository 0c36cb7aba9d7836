//! Load balancing over multiple servers.
use parking_lot::{Mutex, RwLock};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::{
    fmt,
    sync::{Arc, Weak},
    time::Duration,
};

use crate::{
    Config, Connection, Result,
    connection::{ParseError, with_timeout},
    types::TypeRegistry,
};

const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(5);

/// A set of servers with failover.
///
/// Every server starts enabled. [`actualize`][HostPool::actualize] pings all servers
/// and publishes the live ones as the new enabled list, [`acquire`][HostPool::acquire]
/// connects to a random enabled server.
///
/// Cloning `HostPool` shares the same host list.
#[derive(Clone)]
pub struct HostPool {
    inner: Arc<Inner>,
}

struct Inner {
    hosts: Vec<Config>,
    /// Indexes into `hosts`, replaced as a whole.
    enabled: RwLock<Arc<Vec<usize>>>,
    /// One sweep at a time.
    sweep: tokio::sync::Mutex<()>,
    rng: Mutex<StdRng>,
    registry: Arc<TypeRegistry>,
    ping_timeout: Duration,
}

impl HostPool {
    /// Create pool from a config per host.
    ///
    /// # Panics
    ///
    /// Panics if `hosts` is empty.
    pub fn new(hosts: Vec<Config>) -> HostPool {
        assert!(!hosts.is_empty(), "host pool requires at least one host");
        let enabled = (0..hosts.len()).collect();
        HostPool {
            inner: Arc::new(Inner {
                hosts,
                enabled: RwLock::new(Arc::new(enabled)),
                sweep: tokio::sync::Mutex::new(()),
                rng: Mutex::new(StdRng::from_entropy()),
                registry: Arc::new(TypeRegistry::new()),
                ping_timeout: DEFAULT_PING_TIMEOUT,
            }),
        }
    }

    /// Parse url with comma separated hosts.
    ///
    /// ```
    /// let pool = chwire::HostPool::parse("clickhouse://default@ch1:9000,ch2:9000/logs").unwrap();
    /// assert_eq!(pool.all_urls(), ["ch1:9000", "ch2:9000"]);
    /// ```
    pub fn parse(url: &str) -> Result<HostPool, ParseError> {
        Ok(Self::new(Config::parse_hosts(url)?))
    }

    /// Set the timeout of each ping in [`actualize`][HostPool::actualize].
    ///
    /// Only effective before the pool is cloned.
    pub fn with_ping_timeout(mut self, timeout: Duration) -> HostPool {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.ping_timeout = timeout;
        }
        self
    }

    /// Ping every host and publish the live ones, returns the number of live hosts.
    ///
    /// Concurrent calls wait for the running one, [`acquire`][HostPool::acquire] is
    /// never blocked by it.
    pub async fn actualize(&self) -> usize {
        let _sweep = self.inner.sweep.lock().await;

        let mut enabled = Vec::with_capacity(self.inner.hosts.len());
        for (i, config) in self.inner.hosts.iter().enumerate() {
            #[cfg(feature = "log")]
            log::debug!("pinging {}", config.address());
            if self.inner.ping(config).await {
                enabled.push(i);
            } else {
                #[cfg(feature = "log")]
                log::warn!("host is dead: {}", config.address());
            }
        }

        let live = enabled.len();
        *self.inner.enabled.write() = Arc::new(enabled);
        live
    }

    /// Connect to a random enabled host.
    pub async fn acquire(&self) -> Result<Connection> {
        let config = self.pick()?;
        Connection::connect_with_registry(config.clone(), self.inner.registry.clone()).await
    }

    fn pick(&self) -> Result<&Config, NoAvailableHost> {
        let enabled = self.snapshot();
        if enabled.is_empty() {
            return Err(NoAvailableHost { hosts: self.inner.hosts.len() });
        }
        let i = self.inner.rng.lock().gen_range(0..enabled.len());
        Ok(&self.inner.hosts[enabled[i]])
    }

    fn snapshot(&self) -> Arc<Vec<usize>> {
        self.inner.enabled.read().clone()
    }

    /// Address of every host.
    pub fn all_urls(&self) -> Vec<String> {
        self.inner.hosts.iter().map(Config::address).collect()
    }

    /// Address of the currently enabled hosts.
    pub fn enabled_urls(&self) -> Vec<String> {
        self.snapshot().iter().map(|&i| self.inner.hosts[i].address()).collect()
    }

    /// Address of the hosts excluded by the last [`actualize`][HostPool::actualize].
    pub fn disabled_urls(&self) -> Vec<String> {
        let enabled = self.snapshot();
        (0..self.inner.hosts.len())
            .filter(|i| !enabled.contains(i))
            .map(|i| self.inner.hosts[i].address())
            .collect()
    }

    pub fn has_disabled_urls(&self) -> bool {
        self.snapshot().len() != self.inner.hosts.len()
    }

    /// Run [`actualize`][HostPool::actualize] every `period` in a tokio task.
    ///
    /// The task stops once every clone of the pool is dropped.
    pub fn spawn_sweeper(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let pool = Arc::downgrade(&self.inner);
        tokio::spawn(sweep(pool, period))
    }
}

async fn sweep(pool: Weak<Inner>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // first tick completes immediately
    interval.tick().await;

    loop {
        interval.tick().await;
        let Some(inner) = pool.upgrade() else {
            return;
        };
        let _live = HostPool { inner }.actualize().await;
        #[cfg(feature = "log")]
        log::debug!("host sweep: {_live} live hosts");
    }
}

impl Inner {
    /// Connect, handshake and ping, all within `ping_timeout`.
    async fn ping(&self, config: &Config) -> bool {
        let config = config
            .clone()
            .connect_timeout(self.ping_timeout)
            .query_timeout(self.ping_timeout);

        let check = async {
            let mut conn = Connection::connect_with_registry(config, self.registry.clone()).await?;
            let alive = conn.ping(self.ping_timeout).await;
            let _ = conn.close().await;
            Ok::<_, crate::Error>(alive)
        };

        match with_timeout(self.ping_timeout, check).await {
            Ok(alive) => alive,
            Err(_err) => {
                #[cfg(feature = "log")]
                log::debug!("ping failed: {_err}");
                false
            },
        }
    }
}

impl fmt::Debug for HostPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostPool")
            .field("hosts", &self.all_urls())
            .field("enabled", &self.enabled_urls())
            .finish()
    }
}

/// Every host of a [`HostPool`] is disabled.
pub struct NoAvailableHost {
    hosts: usize,
}

impl std::error::Error for NoAvailableHost { }

impl fmt::Display for NoAvailableHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no available host, all {} hosts are disabled", self.hosts)
    }
}

impl fmt::Debug for NoAvailableHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
