use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};

use crate::api::LeadApi;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::sync::{LeadCache, Reconciler};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to one instant.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Collaborators shared by every controller, passed in explicitly.
#[derive(Clone)]
pub struct CrmContext {
    pub api: Arc<dyn LeadApi>,
    pub cache: Arc<LeadCache>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<ClientConfig>,
    timezone: FixedOffset,
}

impl CrmContext {
    pub fn new(api: Arc<dyn LeadApi>, config: ClientConfig) -> Result<Self> {
        Self::with_clock(api, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        api: Arc<dyn LeadApi>,
        config: ClientConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let timezone = config.timezone()?;
        Ok(Self {
            api,
            cache: Arc::new(LeadCache::new()),
            clock,
            config: Arc::new(config),
            timezone,
        })
    }

    #[must_use]
    pub fn timezone(&self) -> FixedOffset {
        self.timezone
    }

    /// Current time in the viewer's reference timezone.
    #[must_use]
    pub fn local_now(&self) -> DateTime<FixedOffset> {
        self.clock.now().with_timezone(&self.timezone)
    }

    #[must_use]
    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(
            Arc::clone(&self.api),
            Arc::clone(&self.cache),
            self.config.sync.activity_page_size,
        )
    }
}
