//! `ComplianceReport`: SLA reporting against the 30-day statutory deadline
//! `ErasureStatus::days_until_deadline` already tracks — deadline math,
//! processing-time and delay accounting, all derived from this crate's
//! `ErasureStatus`.

use chrono::{DateTime, Utc};
use compliance_types::ErasureStatus;
use uuid::Uuid;

const RESPONSE_DEADLINE_DAYS: i64 = 30;

#[derive(Clone, Debug)]
pub struct ComplianceReport {
    pub request_id: Uuid,
    pub is_compliant: bool,
    pub deadline_met: bool,
    pub processing_time_hours: Option<i64>,
    pub delay_days: Option<i64>,
    pub days_until_deadline: i64,
}

/// Builds a [`ComplianceReport`] for a request's current status as of
/// `now`. Not executed yet: compliant iff the deadline hasn't passed.
/// Executed: compliant iff it completed at or before the deadline.
pub fn compliance_report_for(status: &ErasureStatus, now: DateTime<Utc>) -> ComplianceReport {
    let deadline = status.requested_at + chrono::Duration::days(RESPONSE_DEADLINE_DAYS);
    let days_until_deadline = status.days_until_deadline(now);

    let (is_compliant, delay_days, processing_time_hours) = match status.completed_at {
        Some(completed_at) => {
            let met = completed_at <= deadline;
            let delay = if met { None } else { Some((completed_at - deadline).num_days()) };
            let processing = (completed_at - status.requested_at).num_hours();
            (met, delay, Some(processing))
        }
        None => (now <= deadline, None, None),
    };

    ComplianceReport {
        request_id: status.request_id,
        is_compliant,
        deadline_met: is_compliant,
        processing_time_hours,
        delay_days,
        days_until_deadline,
    }
}
