//! 房间编排：按 `derive_step` 一步步推进案件
//!
//! 每一步是一批相互独立的请求（fan-out），全部完成后（barrier）才持久化并进入下一步。
//! 批内任一请求的后端错误耗尽重试即中止整批：其余任务被取消，本批结果不写入存储。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::RosterEntry;
use crate::core::JuryError;
use crate::jury::{
    choose_speaker, derive_step, fresh_jurors, prompts, verdict_label, AgentState, CaseState,
    JurorContext, NextEvidence, Step, Tally, DELIBERATION_EVIDENCE, INITIAL_EVIDENCE,
};
use crate::llm::{LlmError, TextGenerator};
use crate::storage::{new_case_id, CaseStore, SnapshotUpdate};

/// 单个房间的编排器；独占该房间的 CaseState
pub struct Courtroom {
    room: String,
    roster: Vec<RosterEntry>,
    store: Arc<dyn CaseStore>,
    juror: JurorContext,
    /// 笔录与裁决总结用的后端
    narrator: TextGenerator,
    examples: Vec<String>,
    complete_pause: Duration,
    case: CaseState,
}

impl Courtroom {
    pub fn new(
        room: impl Into<String>,
        roster: Vec<RosterEntry>,
        store: Arc<dyn CaseStore>,
        juror: JurorContext,
        narrator: TextGenerator,
        examples: Vec<String>,
        complete_pause: Duration,
    ) -> Self {
        let room = room.into();
        Self {
            case: CaseState::empty(room.clone()),
            room,
            roster,
            store,
            juror,
            narrator,
            examples,
            complete_pause,
        }
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn case(&self) -> &CaseState {
        &self.case
    }

    /// 当前快照推出的下一步
    pub fn step(&self) -> Step {
        derive_step(&self.case)
    }

    /// 从存储加载房间最新快照；读取失败按空房间处理
    pub async fn load(&mut self) {
        match self.store.load_latest(&self.room).await {
            Ok(snapshot) => {
                self.case = snapshot.into_case_state(&self.room);
                tracing::info!(
                    room = %self.room,
                    case_id = ?self.case.case_id,
                    step = %self.step(),
                    "Loaded latest snapshot"
                );
            }
            Err(e) => {
                tracing::warn!(room = %self.room, error = %e, "Failed to load snapshot, starting empty");
                self.case = CaseState::empty(self.room.clone());
            }
        }
    }

    /// 加载快照后循环推进，直到 token 被取消或后端致命错误
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<(), JuryError> {
        self.load().await;
        loop {
            if shutdown.is_cancelled() {
                tracing::info!(room = %self.room, "Shutdown requested, leaving the court room");
                return Ok(());
            }
            if self.step() == Step::Complete && !self.complete_pause.is_zero() {
                tokio::select! {
                    _ = shutdown.cancelled() => continue,
                    _ = tokio::time::sleep(self.complete_pause) => {}
                }
            }
            self.advance().await?;
        }
    }

    /// 执行一步，返回执行的是哪一步
    pub async fn advance(&mut self) -> Result<Step, JuryError> {
        let step = self.step();
        tracing::debug!(room = %self.room, step = %step, "Advancing");
        match step {
            Step::Empty => self.open_case().await,
            Step::EmptyCase => self.assemble_court().await?,
            Step::PresentingEvidence => self.present_evidence().await?,
            Step::AwaitingUtterance => self.next_utterance().await?,
            Step::AwaitingSentiment => self.gather_sentiments().await?,
            Step::AwaitingVerdict => self.deliver_verdict().await?,
            Step::Complete => {
                tracing::info!(room = %self.room, case_id = ?self.case.case_id, "Case closed, starting a new one");
                self.case.discard();
            }
            Step::Invalid => {
                tracing::error!(
                    room = %self.room,
                    case_id = ?self.case.case_id,
                    "Unexpected case state, discarding case"
                );
                self.case.discard();
            }
        }
        Ok(step)
    }

    async fn open_case(&mut self) {
        let case_id = match self.store.create_case(&self.room).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(room = %self.room, error = %e, "Failed to create case in store, continuing unsaved");
                new_case_id()
            }
        };
        tracing::info!(room = %self.room, case_id = %case_id, "New case");
        self.case.reset_with_new_case(case_id);
    }

    /// 组庭与生成笔录并发进行，各自完成后立即持久化
    async fn assemble_court(&mut self) -> Result<(), JuryError> {
        let need_jury = self.case.agents.is_none();
        let need_transcript = self.case.transcript.is_none();

        let (agents, transcript) = tokio::try_join!(
            async {
                if need_jury {
                    self.assemble_jury().await.map(Some)
                } else {
                    Ok(None)
                }
            },
            async {
                if need_transcript {
                    self.write_transcript().await.map(Some)
                } else {
                    Ok(None)
                }
            },
        )?;

        if let Some(agents) = agents {
            self.case.agents = Some(agents);
        }
        if let Some(transcript) = transcript {
            self.case.transcript = Some(transcript);
        }
        if self.case.evidence.is_none() {
            self.case.evidence = Some(INITIAL_EVIDENCE.to_string());
            self.persist(SnapshotUpdate::evidence(INITIAL_EVIDENCE)).await;
        }
        Ok(())
    }

    async fn assemble_jury(&self) -> Result<Vec<AgentState>, JuryError> {
        tracing::info!(room = %self.room, jurors = self.roster.len(), "Assembling the jury");

        let jurors = fan_out(&self.juror, fresh_jurors(&self.roster), |_, mut juror, ctx| async move {
            juror.set_initial_mood(&ctx).await?;
            Ok::<_, LlmError>(juror)
        })
        .await?;

        let roster = Arc::new(self.roster.clone());
        let jurors = fan_out(&self.juror, jurors, move |i, mut juror, ctx| {
            let others: Vec<(String, String)> = roster
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, e)| (e.name.clone(), e.description.clone()))
                .collect();
            async move {
                juror.form_first_impressions(&ctx, &others).await?;
                Ok::<_, LlmError>(juror)
            }
        })
        .await?;

        self.dump_jurors(&jurors);
        self.persist(SnapshotUpdate::agents(&jurors)).await;
        Ok(jurors)
    }

    async fn write_transcript(&self) -> Result<String, JuryError> {
        tracing::info!(room = %self.room, "Writing the court transcript");
        let transcript = self
            .narrator
            .generate(&prompts::transcript(&self.examples))
            .await?;
        if crate::jury::split_transcript(&transcript).is_empty() {
            tracing::warn!(room = %self.room, "Generated transcript has no evidence blocks");
        }
        self.persist(SnapshotUpdate::transcript(transcript.clone())).await;
        Ok(transcript)
    }

    /// 游标前移；新游标是证据片段时全员听取
    async fn present_evidence(&mut self) -> Result<(), JuryError> {
        let fragment = match self.case.next_evidence() {
            NextEvidence::Fragment(fragment) => fragment,
            NextEvidence::Deliberation => {
                tracing::info!(room = %self.room, case_id = ?self.case.case_id, "The jury goes into deliberation");
                self.case.evidence = Some(DELIBERATION_EVIDENCE.to_string());
                self.persist(SnapshotUpdate::evidence(DELIBERATION_EVIDENCE)).await;
                return Ok(());
            }
            NextEvidence::Lost => {
                tracing::error!(
                    room = %self.room,
                    case_id = ?self.case.case_id,
                    "Evidence cursor not found in transcript, discarding case"
                );
                self.case.discard();
                return Ok(());
            }
        };

        tracing::info!(room = %self.room, evidence = %fragment, "Presenting evidence");
        let shared = Arc::new(fragment.clone());
        let agents = fan_out(&self.juror, self.case.agents().to_vec(), move |_, mut juror, ctx| {
            let fragment = Arc::clone(&shared);
            async move {
                juror.absorb_evidence(&ctx, &fragment).await?;
                Ok::<_, LlmError>(juror)
            }
        })
        .await?;

        self.dump_jurors(&agents);
        self.persist(SnapshotUpdate {
            evidence: Some(fragment.clone()),
            agents: Some(agents.clone()),
            ..SnapshotUpdate::default()
        })
        .await;
        self.case.evidence = Some(fragment);
        self.case.agents = Some(agents);
        Ok(())
    }

    async fn next_utterance(&mut self) -> Result<(), JuryError> {
        let previous_speaker = self.case.previous_speaker();
        let previous = self.case.previous_statement();

        let shared = Arc::new(previous.clone());
        let mut agents = fan_out(&self.juror, self.case.agents().to_vec(), move |_, mut juror, ctx| {
            let previous = Arc::clone(&shared);
            async move {
                juror.gauge_eagerness(&ctx, Option::as_ref(&previous)).await?;
                Ok::<_, LlmError>(juror)
            }
        })
        .await?;

        let chosen = {
            let mut rng = rand::thread_rng();
            choose_speaker(&agents, previous_speaker, &mut rng)
        };
        let Some(speaker) = chosen else {
            tracing::error!(room = %self.room, "No jurors to speak, discarding case");
            self.case.discard();
            return Ok(());
        };

        let utterance = agents[speaker]
            .produce_statement(&self.juror, previous.as_ref())
            .await?;
        tracing::info!(
            room = %self.room,
            juror = %agents[speaker].name,
            eagerness = agents[speaker].speak_eagerness,
            "{}",
            utterance
        );

        if let Some(prev) = previous_speaker {
            agents[prev].latest_utterance.clear();
        }
        agents[speaker].latest_utterance = utterance;
        for agent in agents.iter_mut() {
            agent.latest_sentiment.clear();
        }

        let mut update = SnapshotUpdate::agents(&agents);
        if self.case.evidence.as_deref() == Some(DELIBERATION_EVIDENCE) {
            self.case.evidence = Some(String::new());
            update.evidence = Some(String::new());
        }
        self.persist(update).await;
        self.case.agents = Some(agents);
        Ok(())
    }

    async fn gather_sentiments(&mut self) -> Result<(), JuryError> {
        let speaker = self.case.previous_speaker();
        let Some(statement) = self.case.previous_statement() else {
            return Ok(());
        };

        let shared = Arc::new(statement);
        let agents = fan_out(&self.juror, self.case.agents().to_vec(), move |i, mut juror, ctx| {
            let statement = Arc::clone(&shared);
            async move {
                if Some(i) != speaker {
                    juror.absorb_statement(&ctx, &statement).await?;
                }
                Ok::<_, LlmError>(juror)
            }
        })
        .await?;

        self.case.num_deliberation_steps += 1;
        tracing::info!(
            room = %self.room,
            step = self.case.num_deliberation_steps,
            "Deliberation round finished"
        );
        self.dump_jurors(&agents);
        self.persist(SnapshotUpdate::agents(&agents)).await;
        self.case.agents = Some(agents);
        Ok(())
    }

    async fn deliver_verdict(&mut self) -> Result<(), JuryError> {
        let tally = Tally::count(self.case.agents());
        let label = verdict_label(self.case.agents());
        tracing::info!(
            room = %self.room,
            guilty = tally.guilty,
            innocent = tally.innocent,
            verdict = label,
            "The jury has reached a verdict"
        );

        let summary = self
            .narrator
            .generate(&prompts::verdict(self.case.agents(), label))
            .await?;
        let verdict = if summary.is_empty() {
            label.to_string()
        } else {
            summary
        };

        let mut agents = self.case.agents().to_vec();
        for agent in agents.iter_mut() {
            agent.clear_round_markers();
        }

        tracing::info!(room = %self.room, "{}", verdict);
        self.persist(SnapshotUpdate {
            verdict: Some(verdict.clone()),
            agents: Some(agents.clone()),
            ..SnapshotUpdate::default()
        })
        .await;
        self.case.verdict = Some(verdict);
        self.case.agents = Some(agents);
        Ok(())
    }

    /// 写入失败只告警，不中断合议
    async fn persist(&self, update: SnapshotUpdate) {
        let Some(case_id) = self.case.case_id.as_deref() else {
            return;
        };
        if let Err(e) = self.store.save(&self.room, case_id, update).await {
            tracing::warn!(room = %self.room, case_id, error = %e, "Failed to persist snapshot");
        }
    }

    fn dump_jurors(&self, agents: &[AgentState]) {
        for agent in agents {
            tracing::debug!(
                room = %self.room,
                juror = %agent.name,
                mood = %agent.mood,
                guilty = agent.guilty_percent,
                innocent = agent.innocent_percent,
                eagerness = agent.speak_eagerness,
                beliefs = %agent.beliefs,
                "Juror state"
            );
        }
    }
}

/// 每位陪审员一个任务并发执行，全部完成后按原顺序返回；首个错误即取消其余任务
async fn fan_out<F, Fut>(
    ctx: &JurorContext,
    agents: Vec<AgentState>,
    f: F,
) -> Result<Vec<AgentState>, JuryError>
where
    F: Fn(usize, AgentState, JurorContext) -> Fut,
    Fut: Future<Output = Result<AgentState, LlmError>> + Send + 'static,
{
    let mut set = JoinSet::new();
    let mut slots: Vec<Option<AgentState>> = vec![None; agents.len()];
    for (i, agent) in agents.into_iter().enumerate() {
        let task = f(i, agent, ctx.clone());
        set.spawn(async move { task.await.map(|agent| (i, agent)) });
    }

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok((i, agent))) => slots[i] = Some(agent),
            Ok(Err(e)) => {
                set.abort_all();
                tracing::error!(error = %e, "Juror request failed, aborting batch");
                return Err(e.into());
            }
            Err(e) => {
                set.abort_all();
                return Err(e.into());
            }
        }
    }
    Ok(slots.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::image::{DisabledImageClient, PortraitPainter};
    use crate::llm::{MockLlmClient, RetryPolicy};

    fn ctx() -> JurorContext {
        JurorContext {
            text: TextGenerator::new(
                Arc::new(MockLlmClient::new()),
                RetryPolicy {
                    backoff: Duration::ZERO,
                    ..RetryPolicy::default()
                },
            ),
            painter: PortraitPainter::new(Arc::new(DisabledImageClient), 1),
            structured_attempts: 1,
        }
    }

    #[tokio::test]
    async fn test_fan_out_keeps_order() {
        let agents: Vec<AgentState> = ["A", "B", "C"]
            .iter()
            .map(|n| AgentState::new(*n, "d"))
            .collect();
        let out = fan_out(&ctx(), agents, |i, mut juror, _| async move {
            tokio::time::sleep(Duration::from_millis(10 * (3 - i as u64))).await;
            juror.speak_eagerness = i as u32;
            Ok::<_, LlmError>(juror)
        })
        .await
        .unwrap();
        let names: Vec<&str> = out.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(out[2].speak_eagerness, 2);
    }

    #[tokio::test]
    async fn test_fan_out_aborts_on_first_error() {
        let finished = Arc::new(AtomicU32::new(0));
        let agents = vec![AgentState::new("A", "d"), AgentState::new("B", "d")];
        let counter = Arc::clone(&finished);
        let result = fan_out(&ctx(), agents, move |i, juror, _| {
            let counter = Arc::clone(&counter);
            async move {
                if i == 0 {
                    return Err(LlmError::Network("down".into()));
                }
                tokio::time::sleep(Duration::from_secs(5)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, LlmError>(juror)
            }
        })
        .await;
        assert!(matches!(result, Err(JuryError::Llm(_))));
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }
}
