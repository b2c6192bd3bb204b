//! 裁决计票

use crate::jury::{AgentState, Leaning};

pub const GUILTY: &str = "Guilty";
pub const NOT_GUILTY: &str = "Not guilty";
pub const UNDECIDED: &str = "Undecided";

/// 计票结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub guilty: usize,
    pub innocent: usize,
}

impl Tally {
    /// 只统计确信的陪审员
    pub fn count(agents: &[AgentState]) -> Self {
        agents.iter().fold(Tally { guilty: 0, innocent: 0 }, |mut t, a| {
            match a.leaning() {
                Leaning::Guilty => t.guilty += 1,
                Leaning::Innocent => t.innocent += 1,
                Leaning::Uncertain => {}
            }
            t
        })
    }

    /// 严格多数决定标签，平票为 Undecided
    pub fn label(&self) -> &'static str {
        use std::cmp::Ordering::*;
        match self.guilty.cmp(&self.innocent) {
            Greater => GUILTY,
            Less => NOT_GUILTY,
            Equal => UNDECIDED,
        }
    }
}

pub fn verdict_label(agents: &[AgentState]) -> &'static str {
    Tally::count(agents).label()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn juror(guilty: u32, innocent: u32) -> AgentState {
        AgentState {
            guilty_percent: guilty,
            innocent_percent: innocent,
            ..AgentState::new("J", "d")
        }
    }

    #[test]
    fn test_majority_guilty() {
        let agents = vec![
            juror(90, 5),
            juror(80, 10),
            juror(100, 0),
            juror(70, 15),
            juror(5, 90),
            juror(50, 50),
        ];
        let tally = Tally::count(&agents);
        assert_eq!(tally, Tally { guilty: 4, innocent: 1 });
        assert_eq!(tally.label(), GUILTY);
    }

    #[test]
    fn test_tie_is_undecided() {
        let agents = vec![
            juror(90, 5),
            juror(90, 5),
            juror(90, 5),
            juror(5, 90),
            juror(5, 90),
            juror(5, 90),
        ];
        assert_eq!(verdict_label(&agents), UNDECIDED);
    }

    #[test]
    fn test_uncertain_jurors_do_not_vote() {
        let agents = vec![juror(60, 40), juror(0, 80), juror(55, 50)];
        assert_eq!(verdict_label(&agents), NOT_GUILTY);
        assert_eq!(verdict_label(&[]), UNDECIDED);
    }
}
