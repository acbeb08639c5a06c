use std::sync::atomic::{AtomicUsize, Ordering};

use uuid::Uuid;

use crate::ProviderError;

/// Hands out one proxy endpoint per call.
#[async_trait::async_trait]
pub trait ProxyProvider: Send + Sync {
    async fn next_endpoint(&self) -> String;
}

/// Creates providers bound to a proxy group.
#[async_trait::async_trait]
pub trait ProxyPool: Send + Sync {
    async fn provider(&self, group: &str) -> Result<Box<dyn ProxyProvider>, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct PlatformProxySettings {
    pub password: Option<String>,
    pub hostname: String,
    pub port: u16,
}

impl Default for PlatformProxySettings {
    fn default() -> Self {
        Self {
            password: None,
            hostname: "proxy.apify.com".to_string(),
            port: 8000,
        }
    }
}

/// The hosting platform's rotating proxy. Every endpoint carries a fresh
/// session id, so each draw routes through a different exit address.
#[derive(Debug, Clone)]
pub struct PlatformProxyPool {
    settings: PlatformProxySettings,
}

impl PlatformProxyPool {
    pub fn new(settings: PlatformProxySettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl ProxyPool for PlatformProxyPool {
    async fn provider(&self, group: &str) -> Result<Box<dyn ProxyProvider>, ProviderError> {
        let password = self
            .settings
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                ProviderError::new(group, "no proxy password configured (permission denied)")
            })?;
        if group.is_empty() || !group.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ProviderError::new(group, "invalid proxy group name"));
        }
        Ok(Box::new(PlatformProxyProvider {
            group: group.to_string(),
            password: password.to_string(),
            hostname: self.settings.hostname.clone(),
            port: self.settings.port,
        }))
    }
}

struct PlatformProxyProvider {
    group: String,
    password: String,
    hostname: String,
    port: u16,
}

#[async_trait::async_trait]
impl ProxyProvider for PlatformProxyProvider {
    async fn next_endpoint(&self) -> String {
        let session = Uuid::new_v4().simple().to_string();
        format!(
            "http://groups-{},session-{}:{}@{}:{}",
            self.group, session, self.password, self.hostname, self.port
        )
    }
}

/// Operator-supplied proxy list, handed out round-robin regardless of group.
#[derive(Debug, Clone)]
pub struct StaticProxyPool {
    endpoints: Vec<String>,
}

impl StaticProxyPool {
    pub fn new(endpoints: Vec<String>) -> Self {
        Self { endpoints }
    }
}

#[async_trait::async_trait]
impl ProxyPool for StaticProxyPool {
    async fn provider(&self, group: &str) -> Result<Box<dyn ProxyProvider>, ProviderError> {
        if self.endpoints.is_empty() {
            return Err(ProviderError::new(group, "proxy list is empty"));
        }
        Ok(Box::new(RoundRobinProvider {
            endpoints: self.endpoints.clone(),
            next: AtomicUsize::new(0),
        }))
    }
}

struct RoundRobinProvider {
    endpoints: Vec<String>,
    next: AtomicUsize,
}

#[async_trait::async_trait]
impl ProxyProvider for RoundRobinProvider {
    async fn next_endpoint(&self) -> String {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.endpoints.len();
        self.endpoints[index].clone()
    }
}
