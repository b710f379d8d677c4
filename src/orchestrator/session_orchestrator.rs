//! 测验会话编排器 - 编排层
//!
//! ## 职责
//!
//! - 持有会话（唯一的写入者）和导航状态机
//! - 同步获取当前需要的题目；其余题目交给后台任务逐题生成
//! - 每次提交答案后保存进度，完成时保存测验记录
//!
//! ## 后台生成
//!
//! 后台任务按题号顺序逐题请求，成功的题目通过 mpsc 通道送回。
//! 编排器在每个操作前把通道里的题目并入会话，超过目标数的直接丢弃。
//! 会话本身不加锁。

use std::time::Duration;

use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::error::{AppResult, ConfigError, SessionError};
use crate::models::{Question, QuizConfig, QuizRecord, QuizSession};
use crate::services::QuestionGenerator;
use crate::storage::ProgressStore;
use crate::utils::logging;
use crate::workflow::{NavigationEvent, QuizNavigation, SubmitOutcome};

/// 后台请求之间的默认间隔
pub const DEFAULT_STAGGER: Duration = Duration::from_millis(500);

/// 会话阶段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    /// 尚未调用 `start`
    Idle,
    /// 正在同步获取当前题目
    Generating,
    /// 可以作答
    Ready,
    /// 当前题目获取失败，可以 `retry`
    Failed(String),
    Completed,
    Exited,
}

/// 后台生成任务；drop 时中止
struct BackgroundTask {
    handle: JoinHandle<()>,
    rx: UnboundedReceiver<Question>,
    finished: bool,
}

impl Drop for BackgroundTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// 测验会话编排器
pub struct SessionOrchestrator {
    session: QuizSession,
    navigation: QuizNavigation,
    generator: QuestionGenerator,
    store: ProgressStore,
    phase: SessionPhase,
    error: Option<String>,
    background: Option<BackgroundTask>,
    stagger: Duration,
}

impl SessionOrchestrator {
    /// 新建测验会话，配置无效时直接返回错误（不发任何请求）
    pub fn new(
        config: QuizConfig,
        generator: QuestionGenerator,
        store: ProgressStore,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_session(QuizSession::new(config), generator, store))
    }

    /// 重做已保存的测验，题目直接使用，不再生成
    pub fn replay(
        quiz: &QuizRecord,
        generator: QuestionGenerator,
        store: ProgressStore,
    ) -> Result<Self, SessionError> {
        if quiz.questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }

        Ok(Self::from_session(QuizSession::replaying(quiz), generator, store))
    }

    /// 从保存的未完成会话恢复；`start` 会补齐缺少的题目
    pub fn resume(
        mut session: QuizSession,
        generator: QuestionGenerator,
        store: ProgressStore,
    ) -> Result<Self, SessionError> {
        if session.completed {
            return Err(SessionError::Finished);
        }
        session.normalize();
        session.check_invariants().map_err(|reason| {
            warn!("会话 {} 数据不一致: {}", session.id, reason);
            SessionError::Corrupt(reason)
        })?;

        let navigation = QuizNavigation::resume(session.target_questions, session.answers.clone());
        Ok(Self {
            navigation,
            ..Self::from_session(session, generator, store)
        })
    }

    fn from_session(session: QuizSession, generator: QuestionGenerator, store: ProgressStore) -> Self {
        Self {
            navigation: QuizNavigation::new(session.target_questions),
            session,
            generator,
            store,
            phase: SessionPhase::Idle,
            error: None,
            background: None,
            stagger: DEFAULT_STAGGER,
        }
    }

    /// 设置后台请求间隔
    pub fn with_stagger(mut self, stagger: Duration) -> Self {
        self.stagger = stagger;
        self
    }

    /// 开始会话
    ///
    /// 当前位置还没有题目时同步生成，失败则进入 `Failed` 并返回错误。
    /// 成功后为剩余题目启动后台生成。
    pub async fn start(&mut self) -> AppResult<()> {
        if self.phase != SessionPhase::Idle {
            return Err(SessionError::AlreadyStarted.into());
        }
        logging::log_session_start(&self.session);
        self.prepare_current().await
    }

    /// 在 `Failed` 状态下重新获取当前题目
    pub async fn retry(&mut self) -> AppResult<()> {
        if !matches!(self.phase, SessionPhase::Failed(_)) {
            return Err(SessionError::NothingToRetry.into());
        }
        info!("🔄 重新生成第 {} 题", self.session.current_questions.len() + 1);
        self.prepare_current().await
    }

    async fn prepare_current(&mut self) -> AppResult<()> {
        if self.navigation.current_index() < self.session.current_questions.len() {
            self.phase = SessionPhase::Ready;
            self.ensure_background();
            return Ok(());
        }

        let number = self.session.current_questions.len() + 1;
        self.phase = SessionPhase::Generating;
        self.error = None;

        match self
            .generator
            .generate_one(&self.session.config.certificate_name, &self.session.config.language, number)
            .await
        {
            Ok(question) => {
                self.session.push_question(question);
                self.phase = SessionPhase::Ready;
                self.ensure_background();
                Ok(())
            }
            Err(e) => {
                error!("❌ 第 {} 题生成失败: {}", number, e);
                let message = e.to_string();
                self.error = Some(message.clone());
                self.phase = SessionPhase::Failed(message);
                Err(e.into())
            }
        }
    }

    /// 为剩余题目启动后台任务（已在运行或无需生成时跳过）
    fn ensure_background(&mut self) {
        if self.background.is_some() || self.session.remaining_to_acquire() == 0 {
            return;
        }

        let first = self.session.current_questions.len() + 1;
        let last = self.session.target_questions;
        let generator = self.generator.clone();
        let certificate_name = self.session.config.certificate_name.clone();
        let language = self.session.config.language.clone();
        let stagger = self.stagger;
        let (tx, rx) = mpsc::unbounded_channel();

        debug!("启动后台生成: 第 {}-{} 题", first, last);
        let handle = tokio::spawn(async move {
            for number in first..=last {
                sleep(stagger).await;
                match generator.generate_one(&certificate_name, &language, number).await {
                    Ok(question) => {
                        if tx.send(question).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("⚠️ 后台生成第 {} 题失败，跳过: {}", number, e),
                }
            }
            debug!("后台生成结束");
        });

        self.background = Some(BackgroundTask {
            handle,
            rx,
            finished: false,
        });
    }

    /// 把后台送回的题目并入会话，返回并入的数量
    pub fn poll_background(&mut self) -> usize {
        let Some(background) = self.background.as_mut() else {
            return 0;
        };

        let mut merged = 0;
        loop {
            match background.rx.try_recv() {
                Ok(question) => {
                    if self.session.push_question(question) {
                        merged += 1;
                    } else {
                        debug!("题目已达目标数，丢弃后台结果");
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    background.finished = true;
                    break;
                }
            }
        }
        merged
    }

    /// 暂选答案
    pub fn select_answer(&mut self, index: usize) {
        self.poll_background();
        if self.phase == SessionPhase::Ready {
            self.navigation.select_answer(index);
        }
    }

    /// 提交答案并保存进度；调用无效时返回 `None`
    pub async fn submit_answer(&mut self) -> Option<SubmitOutcome> {
        self.poll_background();
        if self.phase != SessionPhase::Ready {
            return None;
        }

        let outcome = self.navigation.submit_answer(&self.session.current_questions)?;
        if let Err(e) = self.session.record_answer(outcome.record.clone()) {
            error!("答题记录与会话不一致: {}", e);
            return None;
        }
        debug!(
            "第 {} 题作答: {} (得分 {})",
            self.session.answers.len(),
            if outcome.record.is_correct { "正确" } else { "错误" },
            outcome.score
        );

        self.persist().await;
        Some(outcome)
    }

    /// 进入下一题或完成测验
    ///
    /// 下一题还没有时同步请求；请求失败就等后台任务，后台结束后仍然没有
    /// 则把测验缩短为已获取的题数。
    pub async fn advance(&mut self) -> Option<NavigationEvent> {
        self.poll_background();
        if self.phase != SessionPhase::Ready || !self.navigation.has_answered() {
            return None;
        }

        let next = self.navigation.current_index() + 1;
        if next < self.navigation.target() && next >= self.session.current_questions.len() {
            self.acquire_question(next).await;
        }

        let event = self.navigation.advance()?;
        if let NavigationEvent::Completed(_) = &event {
            self.complete().await;
        }
        Some(event)
    }

    async fn acquire_question(&mut self, index: usize) {
        let number = self.session.current_questions.len() + 1;
        self.phase = SessionPhase::Generating;

        match self
            .generator
            .generate_one(&self.session.config.certificate_name, &self.session.config.language, number)
            .await
        {
            Ok(question) => {
                self.session.push_question(question);
            }
            Err(e) => {
                warn!("第 {} 题获取失败，等待后台生成: {}", index + 1, e);
                self.wait_for_background(index).await;
            }
        }
        self.poll_background();

        if self.session.current_questions.len() <= index {
            let acquired = self.session.current_questions.len();
            warn!(
                "⚠️ 无法获取第 {} 题，测验缩短为 {}/{} 题",
                index + 1,
                acquired,
                self.session.target_questions
            );
            self.navigation.truncate_target(acquired);
            // 配置中的题目数保持不变
            self.session.target_questions = self.navigation.target();
            self.background = None;
        }
        self.phase = SessionPhase::Ready;
    }

    /// 等待后台任务送来第 `index` 题，直到任务结束
    async fn wait_for_background(&mut self, index: usize) {
        let Some(background) = self.background.as_mut() else {
            return;
        };

        while self.session.current_questions.len() <= index {
            match background.rx.recv().await {
                Some(question) => {
                    self.session.push_question(question);
                }
                None => {
                    background.finished = true;
                    break;
                }
            }
        }
    }

    async fn complete(&mut self) {
        self.phase = SessionPhase::Completed;
        self.session.completed = true;
        self.background = None;

        if let Err(e) = self
            .store
            .save_completion(&self.session, self.session.source_quiz_id.as_deref())
            .await
        {
            error!("保存已完成的测验失败: {}", e);
        }
        logging::print_final_stats(&self.session);
    }

    /// 退出会话：保存进度（没有题目时跳过）、停止后台生成，返回最终快照
    pub async fn exit(&mut self) -> QuizSession {
        self.poll_background();
        self.background = None;

        if self.phase != SessionPhase::Completed {
            if !self.session.current_questions.is_empty() {
                self.persist().await;
            }
            self.phase = SessionPhase::Exited;
        }
        info!(
            "👋 退出测验: 已答 {}/{} 题",
            self.session.answers.len(),
            self.session.target_questions
        );
        self.session.clone()
    }

    /// 重新作答；题目必须已全部获取
    pub fn restart(&mut self) -> Result<(), SessionError> {
        self.poll_background();
        if matches!(self.phase, SessionPhase::Exited) {
            return Err(SessionError::Finished);
        }
        let remaining = self.session.remaining_to_acquire();
        if remaining > 0 || self.session.current_questions.is_empty() {
            return Err(SessionError::QuestionsPending {
                acquired: self.session.current_questions.len(),
                target: self.session.target_questions,
            });
        }

        self.session.reset_answers();
        self.navigation.restart();
        self.phase = SessionPhase::Ready;
        self.error = None;
        info!("🔁 重新开始测验");
        Ok(())
    }

    async fn persist(&self) {
        if let Err(e) = self.store.save_progress(&self.session).await {
            error!("保存进度失败: {}", e);
        }
    }

    // ========== 只读访问 ==========

    pub fn current_question(&self) -> Option<&Question> {
        self.session
            .current_questions
            .get(self.navigation.current_index())
    }

    /// 进度百分比
    pub fn progress(&self) -> f64 {
        self.navigation.progress_percent()
    }

    pub fn score(&self) -> usize {
        self.session.score
    }

    pub fn is_completed(&self) -> bool {
        self.phase == SessionPhase::Completed
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// 后台任务是否仍在生成
    pub fn is_preparing_questions(&self) -> bool {
        self.background
            .as_ref()
            .is_some_and(|b| !b.finished && !b.handle.is_finished())
    }

    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    pub fn navigation(&self) -> &QuizNavigation {
        &self.navigation
    }
}
