//! 案件快照 CaseState
//!
//! 由编排器独占。除 `num_deliberation_steps` 外的字段都会持久化，
//! 进程重启后重新加载即可由 `derive_step` 推出下一步。

use std::collections::HashSet;

use crate::jury::{AgentState, Statement};

/// 组庭期间的证据游标占位
pub const INITIAL_EVIDENCE: &str = "The court is being assembled...";
/// 证据呈现完毕、进入合议的标记
pub const DELIBERATION_EVIDENCE: &str = "The jury now goes into deliberation...";

/// 证据游标的下一位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextEvidence {
    Fragment(String),
    Deliberation,
    /// 当前游标不在笔录中，快照已不可用
    Lost,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseState {
    pub room: String,
    pub case_id: Option<String>,
    /// 证据游标：证据片段 / 空串（本轮无新证据）/ 合议标记 / None（未初始化）
    pub evidence: Option<String>,
    pub agents: Option<Vec<AgentState>>,
    pub verdict: Option<String>,
    /// 完整笔录，按空行切分为证据片段
    pub transcript: Option<String>,
    /// 合议轮数；不持久化，重启后从 0 计
    pub num_deliberation_steps: u32,
}

/// 笔录切分：按空行分段，去空白，丢弃空段与重复段
///
/// 证据游标按字面内容定位，每个片段必须唯一。
pub fn split_transcript(transcript: &str) -> Vec<String> {
    let normalized = transcript.replace("\r\n", "\n");
    let mut seen = HashSet::new();
    normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|s| !s.is_empty() && seen.insert(*s))
        .map(String::from)
        .collect()
}

impl CaseState {
    pub fn empty(room: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            ..Self::default()
        }
    }

    /// 换成新案件：新 id，其余字段清空
    pub fn reset_with_new_case(&mut self, case_id: String) {
        self.case_id = Some(case_id);
        self.evidence = None;
        self.agents = None;
        self.verdict = None;
        self.transcript = None;
        self.num_deliberation_steps = 0;
    }

    /// 丢弃当前案件（回到 EMPTY）
    pub fn discard(&mut self) {
        self.case_id = None;
        self.evidence = None;
        self.agents = None;
        self.verdict = None;
        self.transcript = None;
        self.num_deliberation_steps = 0;
    }

    pub fn agents(&self) -> &[AgentState] {
        self.agents.as_deref().unwrap_or(&[])
    }

    pub fn has_latest_sentiment(&self) -> bool {
        self.agents().iter().any(|a| !a.latest_sentiment.is_empty())
    }

    pub fn has_latest_utterance(&self) -> bool {
        self.agents().iter().any(|a| !a.latest_utterance.is_empty())
    }

    pub fn all_jurors_are_certain(&self) -> bool {
        self.agents().iter().all(AgentState::is_certain)
    }

    /// 游标是否为字面证据片段（非空、非合议标记）
    pub fn is_presenting_fragment(&self) -> bool {
        matches!(self.evidence.as_deref(), Some(e) if !e.is_empty() && e != DELIBERATION_EVIDENCE)
    }

    /// 游标处于合议阶段（空串或合议标记）
    pub fn is_deliberating(&self) -> bool {
        matches!(self.evidence.as_deref(), Some(e) if e.is_empty() || e == DELIBERATION_EVIDENCE)
    }

    /// 证据游标的下一位置
    pub fn next_evidence(&self) -> NextEvidence {
        let sections = split_transcript(self.transcript.as_deref().unwrap_or_default());
        let current = self.evidence.as_deref().unwrap_or_default();

        let next_index = if current == INITIAL_EVIDENCE {
            0
        } else {
            match sections.iter().position(|s| s == current) {
                Some(i) => i + 1,
                None => return NextEvidence::Lost,
            }
        };

        match sections.into_iter().nth(next_index) {
            Some(fragment) => NextEvidence::Fragment(fragment),
            None => NextEvidence::Deliberation,
        }
    }

    /// 上一位发言人的下标（latest_utterance 非空者）
    pub fn previous_speaker(&self) -> Option<usize> {
        self.agents()
            .iter()
            .position(|a| !a.latest_utterance.is_empty())
    }

    /// 上一次发言
    pub fn previous_statement(&self) -> Option<Statement> {
        self.previous_speaker().map(|i| {
            let a = &self.agents()[i];
            Statement::new(a.name.clone(), a.latest_utterance.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case_with_transcript(evidence: &str) -> CaseState {
        CaseState {
            case_id: Some("c1".into()),
            evidence: Some(evidence.into()),
            agents: Some(vec![]),
            transcript: Some("Opening\n\n\n\nWitness one\r\n\r\nClosing\n".into()),
            ..CaseState::empty("A")
        }
    }

    #[test]
    fn test_split_transcript_drops_blank_blocks() {
        assert_eq!(
            split_transcript("A\nB\n\n\n\nC\r\n\r\n  D  \n\n"),
            vec!["A\nB", "C", "D"]
        );
    }

    #[test]
    fn test_split_transcript_drops_repeated_blocks() {
        assert_eq!(
            split_transcript("Opening\n\nDEFENSE: No further questions.\n\nWitness two\n\nDEFENSE: No further questions.\n\nClosing"),
            vec!["Opening", "DEFENSE: No further questions.", "Witness two", "Closing"]
        );
    }

    #[test]
    fn test_repeated_block_still_reaches_deliberation() {
        let mut case = case_with_transcript(INITIAL_EVIDENCE);
        case.transcript = Some(
            "Opening\n\nDEFENSE: No further questions.\n\nWitness two\n\nDEFENSE: No further questions.\n\nClosing".into(),
        );

        let mut presented = Vec::new();
        for _ in 0..10 {
            match case.next_evidence() {
                NextEvidence::Fragment(f) => {
                    presented.push(f.clone());
                    case.evidence = Some(f);
                }
                NextEvidence::Deliberation => break,
                NextEvidence::Lost => panic!("cursor lost after {:?}", presented),
            }
        }
        assert_eq!(
            presented,
            vec!["Opening", "DEFENSE: No further questions.", "Witness two", "Closing"]
        );
        assert_eq!(case.next_evidence(), NextEvidence::Deliberation);
    }

    #[test]
    fn test_next_evidence_walks_the_transcript() {
        assert_eq!(
            case_with_transcript(INITIAL_EVIDENCE).next_evidence(),
            NextEvidence::Fragment("Opening".into())
        );
        assert_eq!(
            case_with_transcript("Opening").next_evidence(),
            NextEvidence::Fragment("Witness one".into())
        );
        assert_eq!(
            case_with_transcript("Closing").next_evidence(),
            NextEvidence::Deliberation
        );
        assert_eq!(
            case_with_transcript("Something else").next_evidence(),
            NextEvidence::Lost
        );
    }

    #[test]
    fn test_previous_statement() {
        let mut case = case_with_transcript("");
        let mut yoda = AgentState::new("Yoda", "d");
        yoda.latest_utterance = "Guilty he is.".into();
        case.agents = Some(vec![AgentState::new("Homer Simpson", "d"), yoda]);

        assert_eq!(case.previous_speaker(), Some(1));
        assert_eq!(
            case.previous_statement(),
            Some(Statement::new("Yoda", "Guilty he is."))
        );
        assert!(case.has_latest_utterance());
        assert!(!case.has_latest_sentiment());
    }

    #[test]
    fn test_reset_with_new_case() {
        let mut case = case_with_transcript("Opening");
        case.num_deliberation_steps = 7;
        case.verdict = Some("Guilty".into());
        case.reset_with_new_case("c2".into());
        assert_eq!(case.case_id.as_deref(), Some("c2"));
        assert!(case.evidence.is_none() && case.agents.is_none());
        assert!(case.verdict.is_none() && case.transcript.is_none());
        assert_eq!(case.num_deliberation_steps, 0);
        assert_eq!(case.room, "A");
    }
}
