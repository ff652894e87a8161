//! Construction and memoization of the underlying `ureq::Agent`.
//!
//! # Design
//! One agent is built per distinct proxy URL the resolver hands back and is
//! reused for every later call through that proxy, so pooled connections
//! survive across calls. Setters that change how agents are built call
//! `invalidate`, which drops the memo; the next call rebuilds from the
//! current configuration. A caller-supplied agent bypasses all of this.
//!
//! Redirect policies need an agent that hands 3xx responses back unfollowed.
//! A caller-supplied agent that still follows redirects itself would skip
//! the policy and is rejected while one is installed.

use std::collections::HashMap;
use std::time::Duration;

use ureq::{Agent, Proxy};

use crate::config::RequestConfig;
use crate::error::{RequestError, Result};

#[derive(Default)]
pub struct Transport {
    agents: HashMap<Option<String>, Agent>,
    custom: Option<Agent>,
}

impl Transport {
    /// Agent to use for a request to `url`, building it on first use.
    pub fn agent_for(&mut self, config: &RequestConfig, url: &str) -> Result<Agent> {
        if let Some(agent) = &self.custom {
            if config.redirect_policy.is_some() && agent.config().max_redirects() != 0 {
                return Err(RequestError::InvalidArgument(
                    "a redirect policy requires a transport built with max_redirects(0)".to_string(),
                ));
            }
            return Ok(agent.clone());
        }

        let proxy = config.proxy.as_ref().and_then(|resolve| resolve(url));
        if let Some(agent) = self.agents.get(&proxy) {
            return Ok(agent.clone());
        }

        log::debug!("building http agent (proxy: {proxy:?}, timeout: {:?})", config.timeout);
        let agent = build_agent(config, proxy.as_deref())?;
        self.agents.insert(proxy, agent.clone());
        Ok(agent)
    }

    /// Use `agent` as-is for every subsequent call.
    pub fn set_custom(&mut self, agent: Agent) {
        self.custom = Some(agent);
        self.agents.clear();
    }

    /// Forget built agents so the next call picks up configuration changes.
    pub fn invalidate(&mut self) {
        self.agents.clear();
    }

    pub fn built(&self) -> usize {
        self.agents.len()
    }
}

fn build_agent(config: &RequestConfig, proxy: Option<&str>) -> Result<Agent> {
    let timeout = non_zero(config.timeout);
    let proxy = proxy.map(Proxy::new).transpose()?;

    let mut builder = Agent::config_builder()
        .http_status_as_error(false)
        .timeout_connect(timeout)
        .timeout_recv_response(timeout)
        .proxy(proxy);

    if let Some(tls) = &config.tls {
        builder = builder.tls_config(tls.clone());
    }
    if config.disable_connection_reuse {
        builder = builder
            .max_idle_connections(0)
            .max_idle_connections_per_host(0);
    }
    if config.redirect_policy.is_some() {
        builder = builder.max_redirects(0).max_redirects_will_error(false);
    }

    Ok(builder.build().new_agent())
}

fn non_zero(d: Duration) -> Option<Duration> {
    (!d.is_zero()).then_some(d)
}
