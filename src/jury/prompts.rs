//! 陪审员与法庭的 prompt 模板

use crate::jury::{AgentState, Phase, Statement};

pub fn description(agent: &AgentState, phase: Phase) -> String {
    let mut prompt = format!(
        "You are {}. You are a member of a jury in a court case. ",
        agent.description
    );
    match phase {
        Phase::Deliberation => prompt.push_str(
            "The jury is now in deliberation and no further evidence will be presented. \
             You must now examine the evidence and argue your opinion and work towards a conclusive verdict.",
        ),
        Phase::Evidence => {
            prompt.push_str("Evidence is being presented and you are forming an opinion.")
        }
    }
    prompt
}

pub fn mood(agent: &AgentState) -> String {
    format!("Your current mood is: {}", agent.mood)
}

pub fn beliefs(agent: &AgentState) -> String {
    format!(
        "Summary of the evidence: {}\n\n\
         Your current opinions and beliefs about the court case are: {}\n\n\
         You are currently {}% sure that the defendant is guilty and {}% sure that the defendant is innocent.",
        agent.summary, agent.beliefs, agent.guilty_percent, agent.innocent_percent
    )
}

pub fn sentiments(agent: &AgentState) -> String {
    let mut prompt = String::from("Your current opinions about your fellow jury members are:\n");
    for (name, sentiment) in &agent.sentiments {
        prompt.push_str(&format!("* {}: {}\n", name, sentiment));
    }
    prompt
}

pub fn previous_statement(previous: Option<&Statement>) -> String {
    match previous {
        Some(s) if !s.text.is_empty() => format!("Previously {} said: {}", s.speaker, s.text),
        _ => String::new(),
    }
}

pub fn initial_mood(agent: &AgentState) -> String {
    format!(
        "{}\n\nWhat is your current mood? Respond in only one or two words.",
        description(agent, Phase::Evidence)
    )
}

pub fn first_impression(agent: &AgentState, other_description: &str) -> String {
    format!(
        "{}\n\n{}\n\nDescribe your opinion of your fellow jury member, {}.\n\n\
         Only base your opinion on their superficial appearance and mannerisms. \
         Respond in only one or two words.",
        description(agent, Phase::Evidence),
        mood(agent),
        other_description
    )
}

/// 听取证据；`template` 为字段回填模板，放在末尾
pub fn hear_evidence(agent: &AgentState, fragment: &str, template: &str) -> String {
    format!(
        "{}\n\n{}\n\n{}\n\nThe court says: {}\n\n\
         You are {}, in the signature voice of {}, describe your updated summary of all evidence (detailed), \
         mood (one word), beliefs (several bullet points), and certainty of guilt and innocence (percentages) \
         in the following format:\n{}",
        description(agent, Phase::Evidence),
        mood(agent),
        beliefs(agent),
        fragment,
        agent.description,
        agent.name,
        template
    )
}

/// 听取其他陪审员发言
pub fn hear_statement(agent: &AgentState, statement: &Statement, template: &str) -> String {
    format!(
        "{}\n\n{}\n\n{}\n\n{}\n\n{} says: {}\n\n\
         You are {}, given your previous beliefs and what {} said, in the signature voice of {}, \
         describe your updated mood (one word), new beliefs (several bullet points), updated certainty of \
         guilt and innocence (percentages), and updated opinion about the speaker {}'s views in relation \
         to your own beliefs (concise) in the following format (do not output anything else):\n{}",
        description(agent, Phase::Deliberation),
        mood(agent),
        sentiments(agent),
        beliefs(agent),
        statement.speaker,
        statement.text,
        agent.description,
        statement.speaker,
        agent.name,
        statement.speaker,
        template
    )
}

pub fn eagerness(agent: &AgentState, previous: Option<&Statement>, template: &str) -> String {
    format!(
        "{}\n\n{}\n\n{}\n\n{}\n\n{}\n\nHow eager are you to speak? Reply as a percentage in the following format:\n\n{}\n",
        description(agent, Phase::Deliberation),
        mood(agent),
        beliefs(agent),
        sentiments(agent),
        previous_statement(previous),
        template
    )
}

pub fn statement(agent: &AgentState, previous: Option<&Statement>) -> String {
    let mut prompt = format!(
        "{}\n\n{}\n\n{}\n\n{}\n\n{}\n",
        description(agent, Phase::Deliberation),
        mood(agent),
        sentiments(agent),
        beliefs(agent),
        previous_statement(previous)
    );
    match previous {
        Some(prev) => prompt.push_str(&format!(
            "You are {}, reply to {} with a single sentence statement. Refer to what you know and believe.",
            agent.description, prev.speaker
        )),
        None => prompt.push_str(&format!(
            "You are {}. Try to convince the jury about your opinions. Be brief (one or two sentences). \
             Refer to what you know and believe.",
            agent.description
        )),
    }
    prompt
}

/// 生成案件笔录；`examples` 为示例笔录全文（可为空）
pub fn transcript(examples: &[String]) -> String {
    let mut prompt = String::from(
        "Generate a fictional court case. The suspected crime should be something a bit funny and not violent. \
         Not too cutesy though. Generate a court transcript where the attorney and the prosecutor both \
         interrogate witnesses. Make the outcome of the case somewhat ambiguous. Include opening and closing \
         statements by both attorney and prosecutor. Start with a name for the case and the name of the \
         defendant. Make everything as short as possible.\n\n\
         Split the transcript into blocks of 2-5 lines each, separated by empty lines.",
    );
    if !examples.is_empty() {
        prompt.push_str(
            " Below are examples of the form (but don't use the content of the examples, instead invent new stories):",
        );
        for (i, example) in examples.iter().enumerate() {
            prompt.push_str(&format!("\n\nExample transcript {}:\n\n{}", i + 1, example.trim()));
        }
    }
    prompt
}

/// 陪审团主席总结，不点名个人，以 `label` 结尾
pub fn verdict(agents: &[AgentState], label: &str) -> String {
    let mut prompt = format!(
        "You are chairman of the jury. Summarize for the court the beliefs of the members of the jury \
         without mentioning individual jurors and end with the verdict {}.\n\nThe beliefs of the jury are:\n",
        label
    );
    for agent in agents {
        prompt.push_str(&format!("* {}: {}\n", agent.name, agent.beliefs));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_depends_on_phase() {
        let a = AgentState::new("Yoda", "The wise Jedi master Yoda");
        assert!(description(&a, Phase::Evidence).contains("forming an opinion"));
        assert!(description(&a, Phase::Deliberation).contains("in deliberation"));
    }

    #[test]
    fn test_previous_statement() {
        assert_eq!(previous_statement(None), "");
        let s = Statement::new("Yoda", "Guilty he is.");
        assert_eq!(previous_statement(Some(&s)), "Previously Yoda said: Guilty he is.");
    }

    #[test]
    fn test_structured_prompts_end_with_template() {
        let a = AgentState::new("Yoda", "The wise Jedi master Yoda");
        let template = "MOOD:\n\nBELIEFS:";
        assert!(hear_evidence(&a, "The pumpkin is gone.", template).ends_with(template));
        let s = Statement::new("Napoleon Bonaparte", "He did it.");
        assert!(hear_statement(&a, &s, template).ends_with(template));
        assert!(eagerness(&a, None, template).trim_end().ends_with(template));
    }

    #[test]
    fn test_verdict_lists_beliefs() {
        let mut a = AgentState::new("Yoda", "d");
        a.beliefs = "Guilty he is".into();
        let p = verdict(&[a], "Guilty");
        assert!(p.contains("end with the verdict Guilty."));
        assert!(p.contains("* Yoda: Guilty he is"));
    }
}
