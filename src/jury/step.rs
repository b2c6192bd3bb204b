//! 工作流状态机：完全由快照推出下一步
//!
//! 不依赖任何进度日志；重启后重新加载最新快照、再调用 `derive_step` 即可继续。

use std::fmt;

use crate::jury::CaseState;

/// 全员确信后，至少再合议这么多轮才出裁决
pub const MIN_DELIBERATION_STEPS: u32 = 3;
/// 合议轮数上限，超过后无条件出裁决
pub const MAX_DELIBERATION_STEPS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// 没有案件
    Empty,
    /// 有案件 id，但陪审团 / 笔录 / 证据游标尚未就绪
    EmptyCase,
    PresentingEvidence,
    AwaitingUtterance,
    AwaitingSentiment,
    AwaitingVerdict,
    Complete,
    /// 意料之外的组合；编排器丢弃案件重来
    Invalid,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::Empty => "EMPTY",
            Step::EmptyCase => "EMPTY_CASE",
            Step::PresentingEvidence => "PRESENTING_EVIDENCE",
            Step::AwaitingUtterance => "AWAITING_UTTERANCE",
            Step::AwaitingSentiment => "AWAITING_SENTIMENT",
            Step::AwaitingVerdict => "AWAITING_VERDICT",
            Step::Complete => "COMPLETE",
            Step::Invalid => "INVALID",
        };
        f.write_str(s)
    }
}

/// 按顺序匹配，第一条命中者胜出
pub fn derive_step(case: &CaseState) -> Step {
    if case.case_id.is_none() {
        return Step::Empty;
    }
    if case.evidence.is_none() || case.agents.is_none() || case.transcript.is_none() {
        return Step::EmptyCase;
    }
    if case.is_presenting_fragment() {
        return Step::PresentingEvidence;
    }
    let steps = case.num_deliberation_steps;
    if case.verdict.is_none()
        && ((case.all_jurors_are_certain() && steps > MIN_DELIBERATION_STEPS)
            || steps > MAX_DELIBERATION_STEPS)
    {
        return Step::AwaitingVerdict;
    }
    if case.is_deliberating() && case.verdict.is_none() {
        if case.has_latest_sentiment() || !case.has_latest_utterance() {
            return Step::AwaitingUtterance;
        }
        return Step::AwaitingSentiment;
    }
    if case.verdict.as_deref().is_some_and(|v| !v.is_empty()) {
        return Step::Complete;
    }
    Step::Invalid
}
