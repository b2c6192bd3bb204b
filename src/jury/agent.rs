//! 陪审员状态 AgentState
//!
//! 每位陪审员独占自己的 AgentState：只有自己的行为（见 behavior.rs）会修改它，
//! 编排器与其他陪审员的 prompt 构造只读。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 有罪/无罪把握之差超过该值即视为「确信」
pub const CERTAINTY_MARGIN: i64 = 50;

/// 陪审员确信的方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leaning {
    Guilty,
    Innocent,
    Uncertain,
}

/// 陪审员的信念状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentState {
    pub name: String,
    pub description: String,
    /// 累积的证据摘要
    pub summary: String,
    /// 当前观点，每次更新整体覆盖
    pub beliefs: String,
    /// 有罪把握 [0,100]；与 innocent_percent 独立引出，不要求相加为 100
    pub guilty_percent: u32,
    pub innocent_percent: u32,
    /// 对其他陪审员的看法：姓名 -> 看法
    pub sentiments: BTreeMap<String, String>,
    pub mood: String,
    /// 发言意愿 [0,100]，仅对当前轮有效
    pub speak_eagerness: u32,
    /// 本轮对发言人的看法；非空表示本轮已听完
    pub latest_sentiment: String,
    /// 本轮发言；非空表示此人是当前发言人
    pub latest_utterance: String,
    /// 肖像引用，仅在 mood 变化时重新生成
    pub portrait_reference: String,
}

impl Default for AgentState {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            summary: String::new(),
            beliefs: "No opinions yet.".to_string(),
            guilty_percent: 50,
            innocent_percent: 50,
            sentiments: BTreeMap::new(),
            mood: String::new(),
            speak_eagerness: 0,
            latest_sentiment: String::new(),
            latest_utterance: String::new(),
            portrait_reference: String::new(),
        }
    }
}

impl AgentState {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    fn margin(&self) -> i64 {
        self.guilty_percent as i64 - self.innocent_percent as i64
    }

    /// |guilty - innocent| > 50
    pub fn is_certain(&self) -> bool {
        self.margin().abs() > CERTAINTY_MARGIN
    }

    pub fn leaning(&self) -> Leaning {
        let margin = self.margin();
        if margin > CERTAINTY_MARGIN {
            Leaning::Guilty
        } else if -margin > CERTAINTY_MARGIN {
            Leaning::Innocent
        } else {
            Leaning::Uncertain
        }
    }

    /// 清除本轮标记（latest_utterance / latest_sentiment）
    pub fn clear_round_markers(&mut self) {
        self.latest_utterance.clear();
        self.latest_sentiment.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn juror(guilty: u32, innocent: u32) -> AgentState {
        AgentState {
            guilty_percent: guilty,
            innocent_percent: innocent,
            ..AgentState::new("Yoda", "The wise Jedi master Yoda")
        }
    }

    #[test]
    fn test_certainty() {
        assert!(juror(80, 10).is_certain());
        assert!(juror(10, 80).is_certain());
        assert!(!juror(55, 45).is_certain());
        assert!(!juror(75, 25).is_certain());
        assert!(!juror(90, 90).is_certain());
    }

    #[test]
    fn test_leaning() {
        assert_eq!(juror(80, 10).leaning(), Leaning::Guilty);
        assert_eq!(juror(5, 60).leaning(), Leaning::Innocent);
        assert_eq!(juror(60, 40).leaning(), Leaning::Uncertain);
    }

    #[test]
    fn test_defaults_and_serde() {
        let a = AgentState::new("Yoda", "The wise Jedi master Yoda");
        assert_eq!(a.beliefs, "No opinions yet.");
        assert_eq!((a.guilty_percent, a.innocent_percent), (50, 50));

        // 旧快照缺字段时按默认值补齐
        let restored: AgentState =
            serde_json::from_str(r#"{"name":"Yoda","description":"d","mood":"calm"}"#).unwrap();
        assert_eq!(restored.mood, "calm");
        assert_eq!(restored.guilty_percent, 50);
    }
}
