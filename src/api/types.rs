//! Wire types for the registration backend.
//!
//! The backend speaks camelCase JSON. Everything here is a read-only
//! snapshot owned by the backend; the console never treats a fetched
//! candidate as authoritative.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payment status of a registration. Fixed set owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Payment initiated but not yet settled.
    #[default]
    Pending,
    /// Payment confirmed.
    Paid,
    /// Payment failed or was rejected.
    Failed,
    /// Payment was refunded.
    Refunded,
}

impl PaymentStatus {
    /// Returns true for the two states the poller treats as settled.
    #[must_use]
    pub fn is_settled(self) -> bool {
        matches!(self, PaymentStatus::Paid | PaymentStatus::Failed)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Failed => "Failed",
            PaymentStatus::Refunded => "Refunded",
        };
        f.write_str(s)
    }
}

/// Admin action recorded against a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminAction {
    /// Registration accepted by an admin.
    Accepted,
    /// Registration rejected by an admin.
    Rejected,
    /// Payment refunded by an admin.
    Refunded,
}

impl std::fmt::Display for AdminAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AdminAction::Accepted => "Accepted",
            AdminAction::Rejected => "Rejected",
            AdminAction::Refunded => "Refunded",
        };
        f.write_str(s)
    }
}

/// A registration record as returned by the backend.
///
/// All profile fields are optional on the wire; older records predate
/// several of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Candidate {
    /// Opaque backend identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Serial number assigned at registration.
    pub serial_no: Option<String>,
    /// Full name.
    pub name: String,
    /// Gender.
    pub gender: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// WhatsApp contact number.
    pub whatsapp_number: Option<String>,
    /// College name, for students.
    pub college: Option<String>,
    /// Company name, for working professionals.
    pub company_name: Option<String>,
    /// Course of study.
    pub course: Option<String>,
    /// Year of study.
    pub year: Option<String>,
    /// Whether the candidate is a student or working ("College"/"Working").
    pub college_or_working: Option<String>,
    /// Student id card image URL.
    pub student_id_card_url: Option<String>,
    /// Current payment status.
    pub payment_status: PaymentStatus,
    /// Payment amount in rupees.
    pub payment_amount: Option<f64>,
    /// Gateway payment identifier.
    pub payment_id: Option<String>,
    /// Gateway order identifier.
    pub order_id: Option<String>,
    /// Payment method reported by the gateway.
    pub payment_method: Option<String>,
    /// When the payment settled.
    pub payment_date: Option<DateTime<Utc>>,
    /// Gateway failure reason, when the payment failed.
    pub payment_failure_reason: Option<String>,
    /// When the registration was created.
    pub registration_date: Option<DateTime<Utc>>,
    /// Attendance flag, set on the event day.
    pub attendance: bool,
    /// Receipt number.
    pub receipt: Option<String>,
    /// Last admin action recorded against this registration.
    pub admin_action: Option<AdminAction>,
}

/// Partial update body for `PUT /users/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateUpdate {
    /// New payment status.
    pub payment_status: PaymentStatus,
    /// Admin action to record.
    pub admin_action: AdminAction,
}

/// Response of `GET /users/verify-payment/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyReport {
    /// Whether the id was recognized by the backend.
    pub success: bool,
    /// Snapshot of the registration, present when `success` is true.
    #[serde(default)]
    pub candidate: Option<Candidate>,
}

/// Response of `GET /admin/users/validate-token`.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateTokenResponse {
    /// The validated user.
    pub user: ValidatedUser,
}

/// User summary returned by token validation. The `role` here is
/// authoritative and supersedes any locally cached role.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidatedUser {
    /// Server-confirmed role.
    pub role: String,
}

/// Response of `GET /users`.
///
/// Known backend inconsistency: some deployments wrap the list in a
/// `candidates` field, others return a bare array. Both shapes are
/// accepted and normalized at this boundary.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UsersResponse {
    /// `{ "candidates": [...] }` shape.
    Wrapped {
        /// The candidate list.
        candidates: Vec<Candidate>,
    },
    /// Bare `[...]` shape.
    Bare(Vec<Candidate>),
}

impl UsersResponse {
    /// Normalize either response shape into the candidate list.
    #[must_use]
    pub fn into_candidates(self) -> Vec<Candidate> {
        match self {
            UsersResponse::Wrapped { candidates } | UsersResponse::Bare(candidates) => candidates,
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_from_wire() {
        let json = serde_json::json!({
            "_id": "665f1c2e9b1d8c0012ab34cd",
            "name": "Asha Rao",
            "whatsappNumber": "+91 9876543210",
            "college": "Gitam University",
            "paymentStatus": "Paid",
            "paymentAmount": 250.0,
            "paymentId": "pay_O4x2",
            "registrationDate": "2025-10-12T08:30:00Z",
            "attendance": false
        });
        let candidate: Candidate = serde_json::from_value(json).expect("should deserialize");
        assert_eq!(candidate.id, "665f1c2e9b1d8c0012ab34cd");
        assert_eq!(candidate.payment_status, PaymentStatus::Paid);
        assert_eq!(candidate.whatsapp_number.as_deref(), Some("+91 9876543210"));
        assert!(candidate.admin_action.is_none());
    }

    #[test]
    fn test_candidate_minimal_record() {
        // Older records carry almost nothing beyond the id and name.
        let json = serde_json::json!({ "_id": "abc", "name": "Ravi" });
        let candidate: Candidate = serde_json::from_value(json).expect("should deserialize");
        assert_eq!(candidate.payment_status, PaymentStatus::Pending);
        assert!(!candidate.attendance);
    }

    #[test]
    fn test_users_response_wrapped() {
        let json = serde_json::json!({
            "candidates": [{ "_id": "a", "name": "A" }, { "_id": "b", "name": "B" }]
        });
        let resp: UsersResponse = serde_json::from_value(json).expect("should deserialize");
        assert_eq!(resp.into_candidates().len(), 2);
    }

    #[test]
    fn test_users_response_bare() {
        let json = serde_json::json!([{ "_id": "a", "name": "A" }]);
        let resp: UsersResponse = serde_json::from_value(json).expect("should deserialize");
        let candidates = resp.into_candidates();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "a");
    }

    #[test]
    fn test_update_body_shape() {
        let update = CandidateUpdate {
            payment_status: PaymentStatus::Paid,
            admin_action: AdminAction::Accepted,
        };
        let json = serde_json::to_value(update).expect("should serialize");
        assert_eq!(
            json,
            serde_json::json!({ "paymentStatus": "Paid", "adminAction": "Accepted" })
        );
    }

    #[test]
    fn test_verify_report_without_candidate() {
        let report: VerifyReport =
            serde_json::from_value(serde_json::json!({ "success": false })).expect("should parse");
        assert!(!report.success);
        assert!(report.candidate.is_none());
    }

    #[test]
    fn test_validate_token_response() {
        let resp: ValidateTokenResponse =
            serde_json::from_value(serde_json::json!({ "user": { "role": "admin" } }))
                .expect("should parse");
        assert_eq!(resp.user.role, "admin");
    }
}
