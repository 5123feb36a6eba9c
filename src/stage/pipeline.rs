use tracing::debug;

use crate::api::LeadApi;
use crate::config::ClientConfig;
use crate::types::Stage;

/// Ordered set of stages a lead can occupy. Any stage may follow any other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePipeline {
    stages: Vec<Stage>,
}

impl StagePipeline {
    #[must_use]
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// Prefer the server's pipeline, falling back to the configured one.
    pub async fn from_server_or_config(api: &dyn LeadApi, config: &ClientConfig) -> Self {
        match api.list_stages().await {
            Ok(stages) if !stages.is_empty() => Self::new(stages),
            Ok(_) => Self::new(config.stages.clone()),
            Err(e) => {
                debug!(error = %e, "stage list unavailable, using configured stages");
                Self::new(config.stages.clone())
            }
        }
    }

    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Stage> {
        let name = name.trim();
        self.stages.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn is_terminal(&self, name: &str) -> bool {
        self.find(name).is_some_and(|s| s.is_terminal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_is_case_insensitive() {
        let pipeline = StagePipeline::new(ClientConfig::default().stages);
        assert_eq!(pipeline.find(" Lost ").map(|s| s.name.as_str()), Some("lost"));
        assert!(pipeline.is_terminal("converted"));
        assert!(!pipeline.is_terminal("contacted"));
        assert!(pipeline.find("archived").is_none());
    }
}
