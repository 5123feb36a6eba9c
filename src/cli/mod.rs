mod auth;
mod commands;
pub mod credentials;
mod docs;
mod export;
mod lead;
pub mod pickers;
mod schedule;
mod showroom;
mod watch;

pub use auth::{run_auth_login, run_auth_logout};
pub use commands::{
    AuthCommands, DirectionArg, DocsCommands, FormatArg, LeadCommands, ScheduleCommands,
    ShowroomCommands,
};
pub use docs::{run_docs_delete, run_docs_list};
pub use export::run_export;
pub use lead::{run_lead_call, run_lead_note, run_lead_show, run_lead_stage, run_stages};
pub use schedule::{run_schedule_appointment, run_schedule_follow_up, run_schedule_show};
pub use showroom::{run_showroom_check_in, run_showroom_check_out, run_showroom_status};
pub use watch::run_watch;

use std::path::Path;
use std::sync::Arc;

use crate::api::HttpApi;
use crate::config::{ClientConfig, default_config_path};
use crate::context::CrmContext;

/// Load config and credentials and build the shared controller context.
pub fn init_context(config_path: Option<&Path>) -> anyhow::Result<CrmContext> {
    let config = load_config(config_path)?;
    let creds = credentials::load_credentials()?;
    let api = HttpApi::new(&creds.server_url, &creds.token, config.http_timeout())?;
    Ok(CrmContext::new(Arc::new(api), config)?)
}

pub fn load_config(config_path: Option<&Path>) -> anyhow::Result<ClientConfig> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => default_config_path()?,
    };
    ClientConfig::load(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()))
}
