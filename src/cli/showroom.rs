use anyhow::bail;

use super::pickers::{InquirePrompter, format_local, parse_time};
use crate::context::CrmContext;
use crate::showroom::{CheckInOutcome, CheckInTarget, CheckOut, ShowroomController, VisitState};
use crate::types::VisitOutcome;

pub async fn run_showroom_status(ctx: &CrmContext, lead_id: &str) -> anyhow::Result<()> {
    let mut controller = ShowroomController::new(ctx.clone(), lead_id);
    match controller.refresh().await? {
        VisitState::CheckedIn(visit) => {
            println!(
                "Checked in since {} (visit {}).",
                format_local(&visit.checked_in_at, &ctx.timezone()),
                visit.id
            );
            if let Some(appointment) = &visit.appointment_id {
                println!("Linked appointment: {appointment}");
            }
        }
        VisitState::None => println!("Not checked in."),
    }
    Ok(())
}

pub async fn run_showroom_check_in(
    ctx: &CrmContext,
    lead_id: &str,
    appointment: Option<String>,
    no_appointment: bool,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let mut controller = ShowroomController::new(ctx.clone(), lead_id);
    controller.refresh().await?;

    let target = match (appointment, no_appointment) {
        (Some(id), _) => CheckInTarget::Appointment(id),
        (None, true) => CheckInTarget::Unlinked,
        (None, false) => CheckInTarget::Auto,
    };

    let outcome = if non_interactive || target != CheckInTarget::Auto {
        controller.check_in(target).await?
    } else {
        let prompter = InquirePrompter {
            timezone: ctx.timezone(),
        };
        controller.check_in_interactive(&prompter).await?
    };

    match outcome {
        CheckInOutcome::CheckedIn(visit) => {
            match &visit.appointment_id {
                Some(appointment) => println!("Checked in (visit {}, appointment {appointment}).", visit.id),
                None => println!("Checked in (visit {}).", visit.id),
            }
            Ok(())
        }
        CheckInOutcome::AlreadyCheckedIn(visit) => {
            println!(
                "Already checked in since {} (visit {}).",
                format_local(&visit.checked_in_at, &ctx.timezone()),
                visit.id
            );
            Ok(())
        }
        CheckInOutcome::ChooseAppointment(candidates) => {
            println!("Several appointments could be linked:");
            for a in &candidates {
                println!(
                    "  {}  {}  [{}]",
                    a.id,
                    format_local(&a.scheduled_at, &ctx.timezone()),
                    a.status
                );
            }
            bail!("Re-run with --appointment <id> or --no-appointment")
        }
        CheckInOutcome::Cancelled => {
            println!("Check-in cancelled.");
            Ok(())
        }
    }
}

pub async fn run_showroom_check_out(
    ctx: &CrmContext,
    lead_id: &str,
    outcome: &str,
    notes: Option<String>,
    reschedule_at: Option<String>,
) -> anyhow::Result<()> {
    let Some(outcome) = VisitOutcome::parse(outcome.trim()) else {
        let valid: Vec<&str> = VisitOutcome::ALL.iter().map(|o| o.as_str()).collect();
        bail!("Unknown outcome '{outcome}'. Valid: {}", valid.join(", "));
    };
    let reschedule_at = reschedule_at.as_deref().map(parse_time).transpose()?;

    let mut controller = ShowroomController::new(ctx.clone(), lead_id);
    let visit_id = match controller.refresh().await? {
        VisitState::CheckedIn(visit) => visit.id.clone(),
        VisitState::None => bail!("Lead is not checked in"),
    };

    controller
        .check_out(
            &visit_id,
            CheckOut {
                outcome,
                notes,
                reschedule_at,
            },
        )
        .await?;
    println!("Checked out ({outcome}).");
    Ok(())
}
