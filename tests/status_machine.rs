use custodia::status::{
    initial_status, label_for, validate_transition, MemberType, TransitionError, WithdrawalStatus,
    ALL_STATUSES,
};
use pretty_assertions::assert_eq;

use WithdrawalStatus::*;

#[test]
fn transition_table_matches_lifecycle() {
    let expected: [(WithdrawalStatus, &[WithdrawalStatus]); 12] = [
        (WithdrawalRequest, &[WithdrawalWait, WithdrawalRejected]),
        (WithdrawalWait, &[AmlReview, WithdrawalStopped]),
        (AmlReview, &[Processing, AmlIssue]),
        (AmlIssue, &[AdminRejected]),
        (Processing, &[Transferring, AdminRejected]),
        (Transferring, &[Success, Failed]),
        (WithdrawalRejected, &[Archived]),
        (Success, &[]),
        (Failed, &[]),
        (AdminRejected, &[]),
        (WithdrawalStopped, &[]),
        (Archived, &[]),
    ];
    for (status, next) in expected {
        assert_eq!(status.possible_next_statuses(), next, "{status}");
    }
}

#[test]
fn terminal_statuses_have_empty_next_sets_for_every_member_type() {
    for status in ALL_STATUSES {
        // The next-state set is member-type independent, so the terminal
        // equivalence must hold regardless of who owns the row.
        assert_eq!(
            status.is_terminal(),
            status.possible_next_statuses().is_empty(),
            "{status}"
        );
    }
}

#[test]
fn cancellable_only_from_withdrawal_wait() {
    for status in ALL_STATUSES {
        assert_eq!(status.is_cancellable(), status == WithdrawalWait, "{status}");
    }
}

#[test]
fn aml_review_successors() {
    assert_eq!(
        AmlReview.possible_next_statuses(),
        &[Processing, AmlIssue]
    );
}

#[test]
fn labels() {
    assert_eq!(label_for("success"), "출금 완료");
    assert_eq!(WithdrawalStatus::Success.label(), "출금 완료");
    // Unknown input falls through unchanged; never an error.
    assert_eq!(label_for("unknown_status"), "unknown_status");
}

#[test]
fn corporate_only_states() {
    assert!(WithdrawalRequest.is_corporate_only());
    assert!(!WithdrawalRequest.is_valid_for(MemberType::Individual));
    assert!(WithdrawalRequest.is_valid_for(MemberType::Corporate));

    for status in [WithdrawalRequest, WithdrawalRejected, Archived] {
        assert!(status.is_corporate_only(), "{status}");
    }
    for status in ALL_STATUSES {
        assert_eq!(
            status.is_valid_for(MemberType::Individual),
            !status.is_corporate_only(),
            "{status}"
        );
    }
}

#[test]
fn in_progress_and_error_sets_are_disjoint() {
    for status in ALL_STATUSES {
        assert!(
            !(status.is_in_progress() && status.is_error()),
            "{status} is both in-progress and error"
        );
    }
}

#[test]
fn entry_state_depends_on_member_type() {
    assert_eq!(initial_status(MemberType::Individual), WithdrawalWait);
    assert_eq!(initial_status(MemberType::Corporate), WithdrawalRequest);
}

#[test]
fn every_legal_transition_validates_for_corporate() {
    for from in ALL_STATUSES {
        for to in from.possible_next_statuses() {
            assert_eq!(
                validate_transition(from, *to, MemberType::Corporate),
                Ok(()),
                "{from} -> {to}"
            );
        }
    }
}

#[test]
fn illegal_transitions_are_rejected() {
    assert_eq!(
        validate_transition(AmlReview, Success, MemberType::Individual),
        Err(TransitionError::Illegal {
            from: AmlReview,
            to: Success,
        })
    );
    assert_eq!(
        validate_transition(Success, Failed, MemberType::Corporate),
        Err(TransitionError::Terminal(Success))
    );
    assert_eq!(
        validate_transition(WithdrawalWait, AmlReview, MemberType::Individual),
        Ok(())
    );
}

#[test]
fn corporate_only_endpoints_rejected_for_individuals() {
    // Same step is legal for a corporate row.
    assert!(validate_transition(WithdrawalRejected, Archived, MemberType::Corporate).is_ok());
    assert_eq!(
        validate_transition(WithdrawalRejected, Archived, MemberType::Individual),
        Err(TransitionError::NotValidForMemberType {
            status: WithdrawalRejected,
            member_type: MemberType::Individual,
        })
    );
}

#[test]
fn wire_names_round_trip() {
    for status in ALL_STATUSES {
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, format!("\"{}\"", status.as_str()));
        let back: WithdrawalStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, status);
    }
}
