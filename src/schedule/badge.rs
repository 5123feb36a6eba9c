use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::types::{Appointment, FollowUp, FollowUpStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    Appointment,
    FollowUp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleItem {
    pub kind: ScheduleKind,
    pub id: String,
    pub scheduled_at: DateTime<Utc>,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeColor {
    Red,
    Green,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub count: usize,
    pub color: BadgeColor,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScheduleSummary {
    pub today: Vec<ScheduleItem>,
    pub upcoming: Vec<ScheduleItem>,
    pub has_overdue: bool,
    /// Absent when nothing is due today.
    pub badge: Option<Badge>,
}

fn active_items(appointments: &[Appointment], follow_ups: &[FollowUp]) -> Vec<ScheduleItem> {
    let appointments = appointments
        .iter()
        .filter(|a| a.status.is_active())
        .map(|a| ScheduleItem {
            kind: ScheduleKind::Appointment,
            id: a.id.clone(),
            scheduled_at: a.scheduled_at,
            label: a
                .title
                .clone()
                .unwrap_or_else(|| format!("Appointment ({})", a.status)),
        });
    let follow_ups = follow_ups
        .iter()
        .filter(|f| f.status == FollowUpStatus::Pending)
        .map(|f| ScheduleItem {
            kind: ScheduleKind::FollowUp,
            id: f.id.clone(),
            scheduled_at: f.scheduled_at,
            label: f
                .notes
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "Follow-up".to_string()),
        });
    appointments.chain(follow_ups).collect()
}

/// Split active appointments and pending follow-ups into today and
/// upcoming, judged on `now`'s calendar in `now`'s timezone.
///
/// Items dated before today are in neither bucket.
pub fn summarize<Tz: TimeZone>(
    appointments: &[Appointment],
    follow_ups: &[FollowUp],
    now: &DateTime<Tz>,
) -> ScheduleSummary {
    let tz = now.timezone();
    let today_date = now.date_naive();
    let now_utc = now.with_timezone(&Utc);

    let mut today = Vec::new();
    let mut upcoming = Vec::new();
    for item in active_items(appointments, follow_ups) {
        let local_date = item.scheduled_at.with_timezone(&tz).date_naive();
        if local_date == today_date {
            today.push(item);
        } else if local_date > today_date {
            upcoming.push(item);
        }
    }

    today.sort_by_key(|i| i.scheduled_at);
    upcoming.sort_by_key(|i| i.scheduled_at);

    let has_overdue = today.iter().any(|i| i.scheduled_at < now_utc);
    let badge = (!today.is_empty()).then(|| Badge {
        count: today.len(),
        color: if has_overdue {
            BadgeColor::Red
        } else {
            BadgeColor::Green
        },
    });

    ScheduleSummary {
        today,
        upcoming,
        has_overdue,
        badge,
    }
}

/// The span of time over which a computed summary stays correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Validity {
    revision: u64,
    computed_at: DateTime<Utc>,
    /// Earliest today item not yet overdue. Once `now` passes it the badge turns red.
    holds_through: Option<DateTime<Utc>>,
    /// Start of the next local day. `None` when it cannot be resolved.
    day_ends: Option<DateTime<Utc>>,
}

impl Validity {
    fn covers(&self, revision: u64, now: DateTime<Utc>) -> bool {
        self.revision == revision
            && now >= self.computed_at
            && self.holds_through.is_none_or(|t| now <= t)
            && self.day_ends.is_some_and(|end| now < end)
    }
}

fn next_local_midnight<Tz: TimeZone>(now: &DateTime<Tz>) -> Option<DateTime<Utc>> {
    let midnight = now.date_naive().succ_opt()?.and_hms_opt(0, 0, 0)?;
    now.timezone()
        .from_local_datetime(&midnight)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}

/// Caches [`summarize`] until the schedule revision changes or `now`
/// crosses a point where the result could differ: a today item falling
/// due, or the local date rolling over.
#[derive(Debug, Default)]
pub struct ScheduleMemo {
    validity: Option<Validity>,
    summary: ScheduleSummary,
}

impl ScheduleMemo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<Tz: TimeZone>(
        &mut self,
        revision: u64,
        appointments: &[Appointment],
        follow_ups: &[FollowUp],
        now: &DateTime<Tz>,
    ) -> &ScheduleSummary {
        let now_utc = now.with_timezone(&Utc);
        if !self.validity.is_some_and(|v| v.covers(revision, now_utc)) {
            self.summary = summarize(appointments, follow_ups, now);
            self.validity = Some(Validity {
                revision,
                computed_at: now_utc,
                holds_through: self
                    .summary
                    .today
                    .iter()
                    .map(|i| i.scheduled_at)
                    .filter(|t| *t >= now_utc)
                    .min(),
                day_ends: next_local_midnight(now),
            });
        }
        &self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AppointmentStatus;
    use chrono::{Duration, FixedOffset};

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn appt(id: &str, when: &str, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: id.into(),
            lead_id: "l1".into(),
            scheduled_at: at(when),
            status,
            duration_minutes: 30,
            title: None,
        }
    }

    fn follow_up(id: &str, when: &str, status: FollowUpStatus) -> FollowUp {
        FollowUp {
            id: id.into(),
            lead_id: "l1".into(),
            scheduled_at: at(when),
            status,
            notes: None,
        }
    }

    fn now() -> DateTime<Utc> {
        at("2026-03-10T15:00:00Z")
    }

    #[test]
    fn test_past_items_outside_today_are_dropped() {
        let appointments = vec![appt("a1", "2026-03-09T18:00:00Z", AppointmentStatus::Scheduled)];
        let follow_ups = vec![follow_up("f1", "2026-02-01T09:00:00Z", FollowUpStatus::Pending)];
        let summary = summarize(&appointments, &follow_ups, &now());
        assert!(summary.today.is_empty());
        assert!(summary.upcoming.is_empty());
        assert_eq!(summary.badge, None);
    }

    #[test]
    fn test_overdue_today_is_red() {
        let appointments = vec![
            appt("a1", "2026-03-10T16:00:00Z", AppointmentStatus::Confirmed),
            appt("a2", "2026-03-10T09:00:00Z", AppointmentStatus::Scheduled),
        ];
        let summary = summarize(&appointments, &[], &now());
        assert_eq!(summary.today.len(), 2);
        assert_eq!(summary.today[0].id, "a2");
        assert_eq!(
            summary.badge,
            Some(Badge {
                count: 2,
                color: BadgeColor::Red
            })
        );
    }

    #[test]
    fn test_future_today_is_green_and_upcoming_sorted() {
        let appointments = vec![
            appt("a1", "2026-03-10T20:00:00Z", AppointmentStatus::InShowroom),
            appt("a2", "2026-03-14T09:00:00Z", AppointmentStatus::Scheduled),
            appt("a3", "2026-03-10T21:00:00Z", AppointmentStatus::Completed),
        ];
        let follow_ups = vec![
            follow_up("f1", "2026-03-11T09:00:00Z", FollowUpStatus::Pending),
            follow_up("f2", "2026-03-10T22:00:00Z", FollowUpStatus::Completed),
        ];
        let summary = summarize(&appointments, &follow_ups, &now());
        assert_eq!(summary.today.len(), 1);
        assert_eq!(summary.badge.unwrap().color, BadgeColor::Green);
        let upcoming: Vec<_> = summary.upcoming.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(upcoming, vec!["f1", "a2"]);
    }

    #[test]
    fn test_today_follows_viewer_timezone() {
        // 03:00 UTC on the 11th is still the 10th at UTC-5.
        let appointments = vec![appt("a1", "2026-03-11T03:00:00Z", AppointmentStatus::Scheduled)];
        let eastern = FixedOffset::west_opt(5 * 3600).unwrap();
        let summary = summarize(&appointments, &[], &now().with_timezone(&eastern));
        assert_eq!(summary.today.len(), 1);

        let summary = summarize(&appointments, &[], &now());
        assert!(summary.today.is_empty());
        assert_eq!(summary.upcoming.len(), 1);
    }

    #[test]
    fn test_memo_recomputes_on_revision_or_time() {
        let mut memo = ScheduleMemo::new();
        let appointments = vec![appt("a1", "2026-03-10T15:30:00Z", AppointmentStatus::Scheduled)];

        let summary = memo.get(1, &appointments, &[], &now());
        assert_eq!(summary.badge.unwrap().color, BadgeColor::Green);

        let later = now() + Duration::hours(1);
        let summary = memo.get(1, &appointments, &[], &later);
        assert_eq!(summary.badge.unwrap().color, BadgeColor::Red);

        let summary = memo.get(2, &[], &[], &later);
        assert_eq!(summary.badge, None);
    }

    #[test]
    fn test_memo_turns_red_within_the_same_minute() {
        let mut memo = ScheduleMemo::new();
        let appointments = vec![appt("a1", "2026-03-10T15:01:00Z", AppointmentStatus::Scheduled)];

        let due = at("2026-03-10T15:01:00Z");
        let summary = memo.get(1, &appointments, &[], &due);
        assert_eq!(summary.badge.unwrap().color, BadgeColor::Green);

        let past_due = at("2026-03-10T15:01:40Z");
        let cached = memo.get(1, &appointments, &[], &past_due).clone();
        assert_eq!(cached, summarize(&appointments, &[], &past_due));
        assert_eq!(cached.badge.unwrap().color, BadgeColor::Red);
    }

    #[test]
    fn test_memo_reused_while_nothing_falls_due() {
        let mut memo = ScheduleMemo::new();
        let appointments = vec![appt("a1", "2026-03-10T18:00:00Z", AppointmentStatus::Scheduled)];
        memo.get(1, &appointments, &[], &now());

        // Same revision, so the cached summary is returned without looking at the input.
        let summary = memo.get(1, &[], &[], &(now() + Duration::hours(2)));
        assert_eq!(summary.today.len(), 1);
    }

    #[test]
    fn test_memo_recomputes_at_local_midnight() {
        let mut memo = ScheduleMemo::new();
        let appointments = vec![appt("a1", "2026-03-11T10:00:00Z", AppointmentStatus::Scheduled)];

        let summary = memo.get(1, &appointments, &[], &at("2026-03-10T23:59:59Z"));
        assert!(summary.today.is_empty());
        assert_eq!(summary.upcoming.len(), 1);

        let summary = memo.get(1, &appointments, &[], &at("2026-03-11T00:00:00Z"));
        assert_eq!(summary.today.len(), 1);
        assert_eq!(summary.badge.unwrap().color, BadgeColor::Green);
    }

    #[test]
    fn test_memo_recomputes_when_clock_moves_back() {
        let mut memo = ScheduleMemo::new();
        let appointments = vec![appt("a1", "2026-03-10T14:00:00Z", AppointmentStatus::Scheduled)];
        assert_eq!(
            memo.get(1, &appointments, &[], &now()).badge.unwrap().color,
            BadgeColor::Red
        );

        let earlier = at("2026-03-10T13:00:00Z");
        assert_eq!(
            memo.get(1, &appointments, &[], &earlier).badge.unwrap().color,
            BadgeColor::Green
        );
    }
}
