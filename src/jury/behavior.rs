//! 陪审员行为：听证据、听发言、评估发言意愿、发言
//!
//! 每个操作只修改调用者自己的 AgentState。结构化更新解析失败时按「没听清」处理：
//! 保留原状态，只记日志；发言意愿解析失败则随机取值，避免沿用上一轮的旧值。

use futures_util::future::try_join_all;
use rand::Rng;

use crate::image::PortraitPainter;
use crate::jury::{prompts, AgentState};
use crate::llm::{LlmError, TextGenerator};
use crate::protocol::{field_key, format_prompt, generate_structured, ResponseField};

/// 合议所处阶段（影响 prompt 措辞）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Evidence,
    Deliberation,
}

/// 一次发言：发言人 + 内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub speaker: String,
    pub text: String,
}

impl Statement {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
        }
    }
}

/// 陪审员行为依赖的后端；内部均为 Arc，可廉价克隆进并发任务
#[derive(Clone)]
pub struct JurorContext {
    pub text: TextGenerator,
    pub painter: PortraitPainter,
    /// 结构化回复的最大生成次数
    pub structured_attempts: u32,
}

const SUMMARY: &str = "SUMMARY";
const MOOD: &str = "MOOD";
const BELIEFS: &str = "BELIEFS";
const GUILTY_PERCENT: &str = "GUILTY_PERCENT";
const INNOCENT_PERCENT: &str = "INNOCENT_PERCENT";
const SPEAK_EAGERNESS: &str = "SPEAK_EAGERNESS";

/// 对某位发言人看法的字段名
pub fn opinion_key(speaker: &str) -> String {
    format!("OPINION_ABOUT_{}", field_key(speaker))
}

impl AgentState {
    /// 初始心情（一两个词）并绘制肖像
    pub async fn set_initial_mood(&mut self, ctx: &JurorContext) -> Result<(), LlmError> {
        self.mood = ctx.text.generate(&prompts::initial_mood(self)).await?;
        self.portrait_reference = ctx.painter.paint(&self.name, &self.mood).await;
        Ok(())
    }

    /// 对其余每位陪审员形成第一印象（每对一个请求，并发）
    pub async fn form_first_impressions(
        &mut self,
        ctx: &JurorContext,
        others: &[(String, String)],
    ) -> Result<(), LlmError> {
        let me: &AgentState = self;
        let opinions = try_join_all(others.iter().map(|(name, description)| async move {
            let prompt = prompts::first_impression(me, description);
            ctx.text
                .generate(&prompt)
                .await
                .map(|opinion| (name.clone(), opinion))
        }))
        .await?;
        self.sentiments.extend(opinions);
        Ok(())
    }

    /// 听取一段证据（无发言人）
    pub async fn absorb_evidence(
        &mut self,
        ctx: &JurorContext,
        fragment: &str,
    ) -> Result<(), LlmError> {
        let fields = [
            ResponseField::text(SUMMARY),
            ResponseField::text(MOOD),
            ResponseField::text(BELIEFS),
            ResponseField::percent(GUILTY_PERCENT),
            ResponseField::percent(INNOCENT_PERCENT),
        ];
        let prompt = prompts::hear_evidence(self, fragment, &format_prompt(&fields));
        let old_mood = self.mood.clone();

        match generate_structured(&ctx.text, &prompt, &fields, ctx.structured_attempts).await? {
            Some(parsed) => {
                self.summary = parsed.text(SUMMARY).unwrap_or_default().to_string();
                self.apply_belief_update(&parsed);
            }
            None => tracing::warn!(
                juror = %self.name,
                "Failed to parse belief update, treating the evidence as misheard"
            ),
        }

        self.refresh_portrait(ctx, &old_mood).await;
        Ok(())
    }

    /// 听取另一位陪审员的发言，并更新对其的看法
    pub async fn absorb_statement(
        &mut self,
        ctx: &JurorContext,
        statement: &Statement,
    ) -> Result<(), LlmError> {
        let opinion = opinion_key(&statement.speaker);
        let fields = [
            ResponseField::text(MOOD),
            ResponseField::text(BELIEFS),
            ResponseField::percent(GUILTY_PERCENT),
            ResponseField::percent(INNOCENT_PERCENT),
            ResponseField::text(opinion.clone()),
        ];
        let prompt = prompts::hear_statement(self, statement, &format_prompt(&fields));
        let old_mood = self.mood.clone();

        match generate_structured(&ctx.text, &prompt, &fields, ctx.structured_attempts).await? {
            Some(parsed) => {
                self.apply_belief_update(&parsed);
                let view = parsed.text(&opinion).unwrap_or_default().to_string();
                self.sentiments
                    .insert(statement.speaker.clone(), view.clone());
                self.latest_sentiment = view;
            }
            None => tracing::warn!(
                juror = %self.name,
                speaker = %statement.speaker,
                "Failed to parse reaction, treating the statement as misheard"
            ),
        }

        self.refresh_portrait(ctx, &old_mood).await;
        Ok(())
    }

    /// 评估本轮发言意愿；解析失败时随机取 [0,100)
    pub async fn gauge_eagerness(
        &mut self,
        ctx: &JurorContext,
        previous: Option<&Statement>,
    ) -> Result<(), LlmError> {
        let fields = [ResponseField::percent(SPEAK_EAGERNESS)];
        let prompt = prompts::eagerness(self, previous, &format_prompt(&fields));

        self.speak_eagerness =
            match generate_structured(&ctx.text, &prompt, &fields, ctx.structured_attempts).await? {
                Some(parsed) => parsed.percent(SPEAK_EAGERNESS).unwrap_or(0).min(100),
                None => {
                    let coin = rand::thread_rng().gen_range(0..100);
                    tracing::warn!(
                        juror = %self.name,
                        eagerness = coin,
                        "Failed to parse speaking intent, tossing a coin"
                    );
                    coin
                }
            };
        Ok(())
    }

    /// 发言（非结构化），去掉首尾引号
    pub async fn produce_statement(
        &self,
        ctx: &JurorContext,
        previous: Option<&Statement>,
    ) -> Result<String, LlmError> {
        let utterance = ctx.text.generate(&prompts::statement(self, previous)).await?;
        Ok(utterance.trim().trim_matches('"').trim().to_string())
    }

    fn apply_belief_update(&mut self, parsed: &crate::protocol::ParsedFields) {
        if let Some(mood) = parsed.text(MOOD) {
            self.mood = mood.to_string();
        }
        if let Some(beliefs) = parsed.text(BELIEFS) {
            self.beliefs = beliefs.to_string();
        }
        if let Some(p) = parsed.percent(GUILTY_PERCENT) {
            self.guilty_percent = p.min(100);
        }
        if let Some(p) = parsed.percent(INNOCENT_PERCENT) {
            self.innocent_percent = p.min(100);
        }
    }

    async fn refresh_portrait(&mut self, ctx: &JurorContext, old_mood: &str) {
        if self.mood != old_mood {
            self.portrait_reference = ctx.painter.paint(&self.name, &self.mood).await;
        }
    }
}
