pub mod progress;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle status of a withdrawal request.
///
/// The set is closed: every row in the `withdrawals` table carries exactly one
/// of these, and transitions between them are restricted to the table in
/// [`WithdrawalStatus::possible_next_statuses`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "withdrawal_status", rename_all = "snake_case")]
pub enum WithdrawalStatus {
    /// Corporate two-step approval entry state.
    WithdrawalRequest,
    /// Waiting for approval; the only state a member may cancel from.
    WithdrawalWait,
    AmlReview,
    /// AML screening flagged the withdrawal; held for compliance review.
    AmlIssue,
    Processing,
    Transferring,
    /// Corporate approver rejected the request.
    WithdrawalRejected,
    Success,
    Failed,
    AdminRejected,
    WithdrawalStopped,
    Archived,
}

use WithdrawalStatus::*;

/// Every status, in pipeline order. Handy for exhaustive checks.
pub const ALL_STATUSES: [WithdrawalStatus; 12] = [
    WithdrawalRequest,
    WithdrawalWait,
    AmlReview,
    AmlIssue,
    Processing,
    Transferring,
    WithdrawalRejected,
    Success,
    Failed,
    AdminRejected,
    WithdrawalStopped,
    Archived,
];

/// Class of the member that owns a withdrawal. Corporate members go through a
/// two-step approval (`withdrawal_request` first); individual members enter
/// the pipeline at `withdrawal_wait`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "member_type", rename_all = "snake_case")]
pub enum MemberType {
    Individual,
    Corporate,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown status: {0}")]
pub struct ParseStatusError(String);

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalRequest => "withdrawal_request",
            WithdrawalWait => "withdrawal_wait",
            AmlReview => "aml_review",
            AmlIssue => "aml_issue",
            Processing => "processing",
            Transferring => "transferring",
            WithdrawalRejected => "withdrawal_rejected",
            Success => "success",
            Failed => "failed",
            AdminRejected => "admin_rejected",
            WithdrawalStopped => "withdrawal_stopped",
            Archived => "archived",
        }
    }

    /// Korean display label shown in the admin console and member UI.
    pub fn label(&self) -> &'static str {
        match self {
            WithdrawalRequest => "출금 신청",
            WithdrawalWait => "출금 대기",
            AmlReview => "AML 심사 중",
            AmlIssue => "AML 이상 거래 검토",
            Processing => "출금 처리 중",
            Transferring => "전송 중",
            WithdrawalRejected => "출금 반려",
            Success => "출금 완료",
            Failed => "출금 실패",
            AdminRejected => "관리자 거부",
            WithdrawalStopped => "출금 정지",
            Archived => "보관 처리",
        }
    }

    /// Legal next states. Member-type-agnostic by design: whether a given
    /// endpoint is allowed for a particular member is checked separately at
    /// the transition boundary, so that `is_terminal(s)` holds exactly when
    /// this set is empty, for every member type.
    pub fn possible_next_statuses(&self) -> &'static [WithdrawalStatus] {
        match self {
            WithdrawalRequest => &[WithdrawalWait, WithdrawalRejected],
            WithdrawalWait => &[AmlReview, WithdrawalStopped],
            AmlReview => &[Processing, AmlIssue],
            AmlIssue => &[AdminRejected],
            Processing => &[Transferring, AdminRejected],
            Transferring => &[Success, Failed],
            WithdrawalRejected => &[Archived],
            Success | Failed | AdminRejected | WithdrawalStopped | Archived => &[],
        }
    }

    /// No further transition is defined from these states; rows become
    /// immutable on reaching one.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Success | Failed | AdminRejected | WithdrawalStopped | Archived
        )
    }

    /// Actively moving through the approval/AML/transfer pipeline.
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            WithdrawalRequest | WithdrawalWait | AmlReview | Processing | Transferring
        )
    }

    /// Rejected, flagged, stopped, or failed.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            AmlIssue | WithdrawalRejected | Failed | AdminRejected | WithdrawalStopped
        )
    }

    /// A member may cancel their own withdrawal only while it waits for
    /// approval.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, WithdrawalWait)
    }

    /// States that exist only in the corporate two-step approval flow.
    pub fn is_corporate_only(&self) -> bool {
        matches!(self, WithdrawalRequest | WithdrawalRejected | Archived)
    }

    /// Whether this status can legally appear on a row owned by `member_type`.
    pub fn is_valid_for(&self, member_type: MemberType) -> bool {
        match member_type {
            MemberType::Corporate => true,
            MemberType::Individual => !self.is_corporate_only(),
        }
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WithdrawalStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_STATUSES
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

impl MemberType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberType::Individual => "individual",
            MemberType::Corporate => "corporate",
        }
    }
}

impl fmt::Display for MemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberType {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "individual" => Ok(MemberType::Individual),
            "corporate" => Ok(MemberType::Corporate),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Display label for a raw status string. Unknown input comes back unchanged
/// rather than raising: the admin console renders whatever the backend sent,
/// and a stale or foreign status must not break the page.
pub fn label_for(raw: &str) -> &str {
    match WithdrawalStatus::from_str(raw) {
        Ok(status) => status.label(),
        Err(_) => raw,
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("no transition from terminal status {0}")]
    Terminal(WithdrawalStatus),

    #[error("illegal transition {from} -> {to}")]
    Illegal {
        from: WithdrawalStatus,
        to: WithdrawalStatus,
    },

    #[error("status {status} is not valid for {member_type} members")]
    NotValidForMemberType {
        status: WithdrawalStatus,
        member_type: MemberType,
    },
}

/// Validates one step of the lifecycle for a row owned by `member_type`.
///
/// The transition table itself is member-type-agnostic; this is the boundary
/// where corporate-only states are rejected for individual members.
pub fn validate_transition(
    from: WithdrawalStatus,
    to: WithdrawalStatus,
    member_type: MemberType,
) -> Result<(), TransitionError> {
    for status in [from, to] {
        if !status.is_valid_for(member_type) {
            return Err(TransitionError::NotValidForMemberType {
                status,
                member_type,
            });
        }
    }
    if from.is_terminal() {
        return Err(TransitionError::Terminal(from));
    }
    if !from.possible_next_statuses().contains(&to) {
        return Err(TransitionError::Illegal { from, to });
    }
    Ok(())
}

/// Entry state for a freshly submitted withdrawal.
pub fn initial_status(member_type: MemberType) -> WithdrawalStatus {
    match member_type {
        MemberType::Corporate => WithdrawalRequest,
        MemberType::Individual => WithdrawalWait,
    }
}
