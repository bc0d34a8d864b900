//! Progress projection for withdrawal progress bars.
//!
//! Two mutually exclusive flow shapes exist. The normal flow walks five
//! stages to a completed transfer; the exception flow is the short AML-flag
//! path. This is the single canonical percentage model consumed by clients.

use serde::{Deserialize, Serialize};

use super::WithdrawalStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressFlow {
    Normal,
    Exception,
}

/// Rendering stages of the progress bar. Not every stage is a persisted
/// withdrawal status: `approval_pending` and `withdrawal_pending` are
/// intermediate display stages reported by the transfer pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    AmlReview,
    ApprovalPending,
    Processing,
    WithdrawalPending,
    Transferring,
    AmlIssue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub flow: ProgressFlow,
    pub step: u8,
    pub total_steps: u8,
    pub percent: u8,
}

const NORMAL_FLOW: [ProgressStage; 5] = [
    ProgressStage::AmlReview,
    ProgressStage::ApprovalPending,
    ProgressStage::Processing,
    ProgressStage::WithdrawalPending,
    ProgressStage::Transferring,
];

const EXCEPTION_FLOW: [ProgressStage; 2] = [ProgressStage::AmlReview, ProgressStage::AmlIssue];

impl Progress {
    fn at(flow: ProgressFlow, step: u8, total_steps: u8) -> Self {
        let percent = if step == 0 {
            0
        } else {
            ((step as u16 * 100) / total_steps as u16) as u8
        };
        Self {
            flow,
            step,
            total_steps,
            percent,
        }
    }

    /// Zero progress in the given flow. Used for statuses and stages with no
    /// position in the flow; never an error.
    fn none(flow: ProgressFlow) -> Self {
        let total = match flow {
            ProgressFlow::Normal => NORMAL_FLOW.len() as u8,
            ProgressFlow::Exception => EXCEPTION_FLOW.len() as u8,
        };
        Self::at(flow, 0, total)
    }
}

/// Position of a stage within a flow; 0% when the stage is not part of it.
pub fn stage_progress(flow: ProgressFlow, stage: ProgressStage) -> Progress {
    let stages: &[ProgressStage] = match flow {
        ProgressFlow::Normal => &NORMAL_FLOW,
        ProgressFlow::Exception => &EXCEPTION_FLOW,
    };
    match stages.iter().position(|s| *s == stage) {
        Some(idx) => Progress::at(flow, idx as u8 + 1, stages.len() as u8),
        None => Progress::none(flow),
    }
}

/// Projects a persisted withdrawal status into the canonical progress model.
///
/// An AML-flagged withdrawal renders in the exception flow; everything else
/// renders in the normal flow, with statuses outside it (rejections, stops,
/// pre-AML waiting states) at 0%.
pub fn project(status: WithdrawalStatus) -> Progress {
    match status {
        WithdrawalStatus::AmlIssue => {
            stage_progress(ProgressFlow::Exception, ProgressStage::AmlIssue)
        }
        WithdrawalStatus::AmlReview => {
            stage_progress(ProgressFlow::Normal, ProgressStage::AmlReview)
        }
        WithdrawalStatus::Processing => {
            stage_progress(ProgressFlow::Normal, ProgressStage::Processing)
        }
        WithdrawalStatus::Transferring | WithdrawalStatus::Success => {
            stage_progress(ProgressFlow::Normal, ProgressStage::Transferring)
        }
        _ => Progress::none(ProgressFlow::Normal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_flow_percentages() {
        assert_eq!(
            stage_progress(ProgressFlow::Normal, ProgressStage::AmlReview).percent,
            20
        );
        assert_eq!(
            stage_progress(ProgressFlow::Normal, ProgressStage::ApprovalPending).percent,
            40
        );
        assert_eq!(
            stage_progress(ProgressFlow::Normal, ProgressStage::Processing).percent,
            60
        );
        assert_eq!(
            stage_progress(ProgressFlow::Normal, ProgressStage::WithdrawalPending).percent,
            80
        );
        assert_eq!(
            stage_progress(ProgressFlow::Normal, ProgressStage::Transferring).percent,
            100
        );
    }

    #[test]
    fn exception_flow_percentages() {
        assert_eq!(
            stage_progress(ProgressFlow::Exception, ProgressStage::AmlReview).percent,
            50
        );
        assert_eq!(
            stage_progress(ProgressFlow::Exception, ProgressStage::AmlIssue).percent,
            100
        );
    }

    #[test]
    fn stage_outside_flow_is_zero() {
        assert_eq!(
            stage_progress(ProgressFlow::Exception, ProgressStage::Processing).percent,
            0
        );
        assert_eq!(
            stage_progress(ProgressFlow::Normal, ProgressStage::AmlIssue).percent,
            0
        );
    }

    #[test]
    fn aml_issue_projects_into_exception_flow() {
        let progress = project(WithdrawalStatus::AmlIssue);
        assert_eq!(progress.flow, ProgressFlow::Exception);
        assert_eq!(progress.percent, 100);
        assert_eq!(progress.total_steps, 2);
    }

    #[test]
    fn statuses_outside_both_flows_are_zero() {
        for status in [
            WithdrawalStatus::WithdrawalRequest,
            WithdrawalStatus::WithdrawalWait,
            WithdrawalStatus::AdminRejected,
            WithdrawalStatus::Archived,
        ] {
            assert_eq!(project(status).percent, 0, "{status}");
        }
    }
}
