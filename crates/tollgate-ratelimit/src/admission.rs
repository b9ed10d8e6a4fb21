use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tollgate_config::RateLimitConfig;
use tollgate_core::KeyDetails;

use crate::{LimiterRegistry, RateLimitError};

/// Which bucket a draw was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Per API key
    Key,
    /// Per traced end customer
    User,
}

impl Scope {
    fn bucket_key(self, id: &str) -> String {
        match self {
            Self::Key => format!("key-{id}"),
            Self::User => format!("user-{id}"),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key => f.write_str("key"),
            Self::User => f.write_str("user"),
        }
    }
}

/// Decides whether an authenticated request may proceed
#[derive(Clone)]
pub struct AdmissionControl {
    registry: Arc<LimiterRegistry>,
    sweep_interval: Duration,
}

impl AdmissionControl {
    /// Build from the `[rate_limit]` section
    pub fn from_config(config: &RateLimitConfig) -> Result<Self, RateLimitError> {
        let idle_timeout = config
            .idle_timeout()
            .map_err(|e| RateLimitError::Config(e.to_string()))?;
        let sweep_interval = config
            .sweep_interval()
            .map_err(|e| RateLimitError::Config(e.to_string()))?;

        Ok(Self {
            registry: Arc::new(LimiterRegistry::new(idle_timeout)),
            sweep_interval,
        })
    }

    /// Shared bucket registry
    pub fn registry(&self) -> &Arc<LimiterRegistry> {
        &self.registry
    }

    /// Start idle eviction, stopping when `shutdown` fires
    pub fn spawn_sweeper(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        self.registry.spawn_sweeper(self.sweep_interval, shutdown)
    }

    /// Draw from the key bucket, then the end-customer bucket
    ///
    /// A limit of zero or an absent limit means the bucket is not enforced.
    /// The customer bucket is only consulted when a trace customer id is present.
    pub fn admit(
        &self,
        api_key: &str,
        details: &KeyDetails,
        trace_customer_id: Option<&str>,
    ) -> Result<(), RateLimitError> {
        if let Some(per_second) = details.key_rate_limit.and_then(NonZeroU32::new) {
            self.draw(Scope::Key, api_key, per_second)?;
        }

        if let (Some(customer), Some(per_second)) =
            (trace_customer_id, details.user_rate_limit.and_then(NonZeroU32::new))
        {
            self.draw(Scope::User, customer, per_second)?;
        }

        Ok(())
    }

    fn draw(&self, scope: Scope, id: &str, per_second: NonZeroU32) -> Result<(), RateLimitError> {
        self.registry
            .check(&scope.bucket_key(id), per_second)
            .map_err(|denied| {
                let retry_after = denied.wait.as_secs().max(1);
                tracing::debug!(%scope, retry_after, "request rejected by rate limiter");
                RateLimitError::Exceeded { scope, retry_after }
            })
    }
}
