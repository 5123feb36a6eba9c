use futures::stream::{self, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::context::CrmContext;
use crate::sync::PushEvent;

/// Load `lead_ids`, then apply newline-delimited push events from stdin.
///
/// Prints one line per event and each lead's final state when input ends.
pub async fn run_watch(ctx: &CrmContext, lead_ids: &[String]) -> anyhow::Result<()> {
    let reconciler = ctx.reconciler();
    for lead_id in lead_ids {
        reconciler.load(lead_id).await?;
    }

    let lines = BufReader::new(tokio::io::stdin()).lines();
    let events = stream::unfold(lines, |mut lines| async move {
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match serde_json::from_str::<PushEvent>(&line) {
                    Ok(event) => return Some((event, lines)),
                    Err(e) => warn!(error = %e, "skipping malformed push event"),
                },
                Ok(None) => return None,
                Err(e) => {
                    warn!(error = %e, "stopped reading push events");
                    return None;
                }
            }
        }
    });
    futures::pin_mut!(events);

    while let Some(event) = events.next().await {
        let lead_id = event.lead_id().to_string();
        match reconciler.handle_event(event).await {
            Ok(outcome) => println!("{lead_id}: {outcome:?}"),
            Err(e) => eprintln!("{lead_id}: failed to reconcile: {e}"),
        }
    }

    for lead_id in lead_ids {
        if let Some(lead) = ctx.cache.lead(lead_id) {
            println!(
                "{lead_id}: stage={} assigned_to={} activities={}",
                lead.stage,
                lead.assigned_to.as_deref().unwrap_or("-"),
                ctx.cache.activities(lead_id).len()
            );
        }
        ctx.cache.release(lead_id);
    }
    Ok(())
}
