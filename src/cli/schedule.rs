use anyhow::bail;

use super::pickers::{format_local, parse_time};
use crate::context::CrmContext;
use crate::schedule::{BadgeColor, ScheduleController, ScheduleItem, ScheduleKind};
use crate::types::AppointmentStatus;

fn print_items(title: &str, items: &[ScheduleItem], ctx: &CrmContext) {
    println!("{title}:");
    if items.is_empty() {
        println!("  (none)");
        return;
    }
    let now = ctx.clock.now();
    for item in items {
        let kind = match item.kind {
            ScheduleKind::Appointment => "appointment",
            ScheduleKind::FollowUp => "follow-up",
        };
        let overdue = if item.scheduled_at < now { "  (overdue)" } else { "" };
        println!(
            "  {}  {kind:<12} {}  [{}]{overdue}",
            format_local(&item.scheduled_at, &ctx.timezone()),
            item.label,
            item.id
        );
    }
}

pub async fn run_schedule_show(ctx: &CrmContext, lead_id: &str, json: bool) -> anyhow::Result<()> {
    let mut controller = ScheduleController::new(ctx.clone(), lead_id);
    controller.refresh().await?;
    let summary = controller.summary().clone();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!();
    match summary.badge {
        Some(badge) => {
            let color = match badge.color {
                BadgeColor::Red => "red",
                BadgeColor::Green => "green",
            };
            println!("Today: {} due ({color})", badge.count);
        }
        None => println!("Nothing due today."),
    }
    println!();
    print_items("Today", &summary.today, ctx);
    println!();
    print_items("Upcoming", &summary.upcoming, ctx);
    println!();
    Ok(())
}

pub async fn run_schedule_appointment(
    ctx: &CrmContext,
    lead_id: &str,
    appointment_id: &str,
    status: Option<String>,
    reschedule: Option<String>,
) -> anyhow::Result<()> {
    let controller = ScheduleController::new(ctx.clone(), lead_id);
    controller.refresh().await?;

    let updated = match (status, reschedule) {
        (Some(status), None) => {
            let Some(status) = AppointmentStatus::parse(status.trim()) else {
                let valid: Vec<&str> = AppointmentStatus::ALL.iter().map(|s| s.as_str()).collect();
                bail!("Unknown status '{status}'. Valid: {}", valid.join(", "));
            };
            controller.set_appointment_status(appointment_id, status).await?
        }
        (None, Some(at)) => {
            let at = parse_time(&at)?;
            controller.reschedule_appointment(appointment_id, at).await?
        }
        _ => bail!("Pass exactly one of --status or --reschedule"),
    };

    println!(
        "Appointment {} is {} at {}.",
        updated.id,
        updated.status,
        format_local(&updated.scheduled_at, &ctx.timezone())
    );
    Ok(())
}

pub async fn run_schedule_follow_up(
    ctx: &CrmContext,
    lead_id: &str,
    follow_up_id: &str,
) -> anyhow::Result<()> {
    let controller = ScheduleController::new(ctx.clone(), lead_id);
    controller.refresh().await?;
    let updated = controller.complete_follow_up(follow_up_id).await?;
    println!("Follow-up {} completed.", updated.id);
    Ok(())
}
