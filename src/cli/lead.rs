use anyhow::bail;
use serde_json::json;

use super::pickers::{InquirePrompter, format_local, format_relative_time, pick_stage};
use crate::api::{CallDirection, CallLogRequest};
use crate::context::CrmContext;
use crate::stage::{
    ActivityComposer, CommitOutcome, NoteDraft, StageController, StagePipeline, TransitionOutcome,
};
use crate::types::{Activity, Lead};

const RECENT_ACTIVITY: usize = 10;

pub async fn run_stages(ctx: &CrmContext) -> anyhow::Result<()> {
    let pipeline = StagePipeline::from_server_or_config(ctx.api.as_ref(), &ctx.config).await;
    for (i, stage) in pipeline.stages().iter().enumerate() {
        let marker = if stage.is_terminal { "  [terminal]" } else { "" };
        println!("{:>2}. {}{marker}", i + 1, stage.name);
    }
    Ok(())
}

fn print_activity(activity: &Activity, ctx: &CrmContext) {
    let who = activity.user_name.as_deref().unwrap_or("system");
    let when = format_relative_time(&activity.created_at, ctx.clock.now());
    let text = if activity.is_note() {
        activity.note_content()
    } else {
        activity.description.as_str()
    };
    let indent = if activity.parent_id.is_some() { "    " } else { "  " };
    println!("{indent}{when:<16} {who:<16} {text}");
}

pub async fn run_lead_show(ctx: &CrmContext, lead_id: &str, json: bool) -> anyhow::Result<()> {
    let reconciler = ctx.reconciler();
    reconciler.load(lead_id).await?;
    let Some(lead) = ctx.cache.lead(lead_id) else {
        bail!("Lead '{lead_id}' could not be loaded");
    };
    let activities = ctx.cache.activities(lead_id);

    if json {
        let out = json!({ "lead": lead, "activities": activities });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("{} ({})", lead.full_name(), lead.id);
    println!("  Stage:       {}", lead.stage);
    if let Some(email) = &lead.email {
        println!("  Email:       {email}");
    }
    if let Some(phone) = &lead.phone {
        println!("  Phone:       {phone}");
    }
    println!(
        "  Assigned to: {}",
        lead.assigned_to.as_deref().unwrap_or("unassigned")
    );
    if let Some(secondary) = &lead.secondary_salesperson {
        println!("  Secondary:   {secondary}");
    }
    println!(
        "  Updated:     {}",
        format_local(&lead.updated_at, &ctx.timezone())
    );
    println!();

    if activities.is_empty() {
        println!("No activity yet.");
    } else {
        println!("Recent activity:");
        for activity in activities.iter().take(RECENT_ACTIVITY) {
            print_activity(activity, ctx);
        }
    }
    println!();
    Ok(())
}

fn print_transition(outcome: &TransitionOutcome) {
    match outcome {
        TransitionOutcome::Committed(lead) => {
            println!("{} is now '{}'.", lead.full_name(), lead.stage);
        }
        TransitionOutcome::Unchanged => println!("Lead is already in that stage."),
        TransitionOutcome::Cancelled => println!("Stage change cancelled."),
        TransitionOutcome::NeedsConfirmation(warning) => {
            println!("Warning: {}", warning.display_message());
            println!("Re-run with --confirm to proceed.");
        }
    }
}

pub async fn run_lead_stage(
    ctx: &CrmContext,
    lead_id: &str,
    stage: Option<String>,
    note: Option<String>,
    confirm: bool,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let lead: Lead = ctx.api.get_lead(lead_id).await?;
    let pipeline = StagePipeline::from_server_or_config(ctx.api.as_ref(), &ctx.config).await;

    let target = match stage {
        Some(s) => s,
        None if non_interactive => bail!("A target stage is required in non-interactive mode"),
        None => match pick_stage(pipeline.stages(), &lead.stage)? {
            Some(s) => s.name,
            None => return Ok(()),
        },
    };

    let mut controller = StageController::new(ctx.clone(), pipeline);

    let outcome = if non_interactive || note.is_some() || confirm {
        match controller.commit(&lead, &target, note).await? {
            TransitionOutcome::NeedsConfirmation(warning) if confirm => {
                println!("Warning: {}", warning.display_message());
                println!("Proceeding as requested.");
                controller.confirm().await?
            }
            other => other,
        }
    } else {
        let prompter = InquirePrompter {
            timezone: ctx.timezone(),
        };
        controller.request_transition(&lead, &target, &prompter).await?
    };

    print_transition(&outcome);
    if matches!(outcome, TransitionOutcome::NeedsConfirmation(_)) {
        bail!("Stage change not applied");
    }
    Ok(())
}

fn finish_activity(outcome: CommitOutcome<Activity>, what: &str) -> anyhow::Result<()> {
    match outcome {
        CommitOutcome::Committed(activity) => {
            println!("{what} recorded ({}).", activity.id);
            Ok(())
        }
        CommitOutcome::NeedsConfirmation(warning) => {
            println!("Warning: {}", warning.display_message());
            println!("Re-run with --confirm to proceed.");
            bail!("{what} not recorded")
        }
    }
}

pub async fn run_lead_note(
    ctx: &CrmContext,
    lead_id: &str,
    content: String,
    reply_to: Option<String>,
    mentions: Vec<String>,
    confirm: bool,
) -> anyhow::Result<()> {
    if reply_to.is_some() {
        // Reply targets are resolved to their thread parent from the timeline.
        ctx.reconciler().load(lead_id).await?;
    }

    let mut composer = ActivityComposer::new(ctx.clone(), lead_id);
    let draft = NoteDraft {
        content,
        reply_to,
        mentioned_user_ids: mentions,
    };

    if !confirm {
        let prompter = InquirePrompter {
            timezone: ctx.timezone(),
        };
        return match composer.add_note_interactive(draft, &prompter).await? {
            Some(activity) => {
                println!("Note recorded ({}).", activity.id);
                Ok(())
            }
            None => {
                println!("Note not added.");
                Ok(())
            }
        };
    }

    let outcome = match composer.add_note(draft).await? {
        CommitOutcome::NeedsConfirmation(warning) => {
            println!("Warning: {}", warning.display_message());
            composer.confirm_note().await?
        }
        committed => committed,
    };
    finish_activity(outcome, "Note")
}

pub async fn run_lead_call(
    ctx: &CrmContext,
    lead_id: &str,
    direction: CallDirection,
    outcome: Option<String>,
    duration_seconds: Option<u32>,
    notes: Option<String>,
    confirm: bool,
) -> anyhow::Result<()> {
    let mut composer = ActivityComposer::new(ctx.clone(), lead_id);
    let request = CallLogRequest {
        direction,
        outcome,
        duration_seconds,
        notes,
        confirm_skate: false,
    };

    let result = match composer.log_call(request).await? {
        CommitOutcome::NeedsConfirmation(warning) if confirm => {
            println!("Warning: {}", warning.display_message());
            composer.confirm_call().await?
        }
        other => other,
    };
    finish_activity(result, "Call")
}
