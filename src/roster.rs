//! In-memory operations over a fetched candidate list.
//!
//! The backend owns the data; everything here works on the read-only
//! snapshot returned by `GET /users` — filtering for the admin table,
//! summary counts, and the accept/reject/refund decision mapping.

use crate::api::types::{AdminAction, Candidate, CandidateUpdate, PaymentStatus};
use chrono::NaiveDate;

/// Minimum query length before the free-text search applies.
const SEARCH_MIN_CHARS: usize = 2;

/// Admin table filter. All criteria are conjunctive.
#[derive(Debug, Clone, Default)]
pub struct RosterFilter {
    /// Restrict to a single college.
    pub college: Option<String>,
    /// Restrict to a payment status.
    pub payment_status: Option<PaymentStatus>,
    /// Registration date lower bound (inclusive, start of day).
    pub from: Option<NaiveDate>,
    /// Registration date upper bound (inclusive through end of day).
    pub to: Option<NaiveDate>,
    /// Free-text search over name, email, phone, college, and company.
    /// Ignored under two characters.
    pub search: Option<String>,
}

impl RosterFilter {
    /// Whether a candidate passes every criterion.
    #[must_use]
    pub fn matches(&self, candidate: &Candidate) -> bool {
        self.matches_college(candidate)
            && self.matches_status(candidate)
            && self.matches_date(candidate)
            && self.matches_search(candidate)
    }

    fn matches_college(&self, candidate: &Candidate) -> bool {
        self.college
            .as_ref()
            .map_or(true, |college| {
                candidate.college.as_deref() == Some(college.as_str())
            })
    }

    fn matches_status(&self, candidate: &Candidate) -> bool {
        self.payment_status
            .map_or(true, |status| candidate.payment_status == status)
    }

    fn matches_date(&self, candidate: &Candidate) -> bool {
        if self.from.is_none() && self.to.is_none() {
            return true;
        }
        // Records without a registration date are never excluded by the
        // range; the original admin table behaves the same way.
        let Some(registered) = candidate.registration_date else {
            return true;
        };
        if let Some(start) = self.from.and_then(|d| d.and_hms_opt(0, 0, 0)) {
            if registered < start.and_utc() {
                return false;
            }
        }
        if let Some(end) = self.to.and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999)) {
            if registered > end.and_utc() {
                return false;
            }
        }
        true
    }

    fn matches_search(&self, candidate: &Candidate) -> bool {
        let Some(query) = self.search.as_deref() else {
            return true;
        };
        if query.chars().count() < SEARCH_MIN_CHARS {
            return true;
        }
        let haystack = [
            candidate.name.as_str(),
            candidate.email.as_deref().unwrap_or(""),
            candidate.whatsapp_number.as_deref().unwrap_or(""),
            candidate.college.as_deref().unwrap_or(""),
            candidate.company_name.as_deref().unwrap_or(""),
        ]
        .join(" ")
        .to_lowercase();
        haystack.contains(&query.to_lowercase())
    }
}

/// Apply a filter, preserving the backend's ordering.
#[must_use]
pub fn filter<'a>(candidates: &'a [Candidate], filter: &RosterFilter) -> Vec<&'a Candidate> {
    candidates.iter().filter(|c| filter.matches(c)).collect()
}

/// Distinct college names, sorted, empty values dropped.
#[must_use]
pub fn colleges(candidates: &[Candidate]) -> Vec<String> {
    let mut names: Vec<String> = candidates
        .iter()
        .filter_map(|c| c.college.clone())
        .filter(|name| !name.is_empty())
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Status counts shown above the admin table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RosterSummary {
    /// Total records after filtering.
    pub total: usize,
    /// Records with payment confirmed.
    pub paid: usize,
    /// Records with payment still pending.
    pub pending: usize,
    /// Records with failed payment.
    pub failed: usize,
    /// Records with refunded payment.
    pub refunded: usize,
}

/// Count statuses over a candidate list.
#[must_use]
pub fn summarize<'a, I>(candidates: I) -> RosterSummary
where
    I: IntoIterator<Item = &'a Candidate>,
{
    let mut summary = RosterSummary::default();
    for candidate in candidates {
        summary.total += 1;
        match candidate.payment_status {
            PaymentStatus::Paid => summary.paid += 1,
            PaymentStatus::Pending => summary.pending += 1,
            PaymentStatus::Failed => summary.failed += 1,
            PaymentStatus::Refunded => summary.refunded += 1,
        }
    }
    summary
}

/// An admin's decision on a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminDecision {
    /// Accept the registration (mark paid).
    Accept,
    /// Reject the registration (mark failed).
    Reject,
    /// Refund the payment.
    Refund,
}

impl AdminDecision {
    /// The partial update body this decision sends to the backend.
    #[must_use]
    pub fn update(self) -> CandidateUpdate {
        match self {
            AdminDecision::Accept => CandidateUpdate {
                payment_status: PaymentStatus::Paid,
                admin_action: AdminAction::Accepted,
            },
            AdminDecision::Reject => CandidateUpdate {
                payment_status: PaymentStatus::Failed,
                admin_action: AdminAction::Rejected,
            },
            AdminDecision::Refund => CandidateUpdate {
                payment_status: PaymentStatus::Refunded,
                admin_action: AdminAction::Refunded,
            },
        }
    }
}

impl std::fmt::Display for AdminDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AdminDecision::Accept => "accept",
            AdminDecision::Reject => "reject",
            AdminDecision::Refund => "refund",
        };
        f.write_str(s)
    }
}

/// Merge an accepted update into the local snapshot.
///
/// Call only after the backend confirmed the update; a failed action must
/// leave local state untouched.
pub fn apply_update(candidate: &mut Candidate, update: &CandidateUpdate) {
    candidate.payment_status = update.payment_status;
    candidate.admin_action = Some(update.admin_action);
}
