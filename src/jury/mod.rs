//! 陪审团领域模型
//!
//! - agent / case：陪审员状态与案件快照
//! - behavior：陪审员的四种行为（听证据、听发言、评估发言意愿、发言）
//! - step：由快照推出下一步的纯函数
//! - verdict / speaker / roster：计票、选发言人、名单

pub mod agent;
pub mod behavior;
pub mod case;
pub mod prompts;
pub mod roster;
pub mod speaker;
pub mod step;
pub mod verdict;

pub use agent::{AgentState, Leaning, CERTAINTY_MARGIN};
pub use behavior::{opinion_key, JurorContext, Phase, Statement};
pub use case::{split_transcript, CaseState, NextEvidence, DELIBERATION_EVIDENCE, INITIAL_EVIDENCE};
pub use roster::{builtin_roster, canonical_room, fresh_jurors, resolve_roster, unique_rooms, MIN_JURORS};
pub use speaker::choose_speaker;
pub use step::{derive_step, Step, MAX_DELIBERATION_STEPS, MIN_DELIBERATION_STEPS};
pub use verdict::{verdict_label, Tally, GUILTY, NOT_GUILTY, UNDECIDED};
