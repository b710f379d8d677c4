//! 答题导航状态机 - 流程层
//!
//! `Unanswered(i)` → `Answered(i)` → `Unanswered(i+1)` → … → `Completed`
//!
//! 不做任何 I/O；题目列表由调用方传入。非法调用一律忽略（返回 `None`），不报错。

use std::fmt;

use crate::models::{AnswerRecord, Question, OPTION_COUNT};

/// 导航状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Unanswered { index: usize },
    Answered { index: usize },
    Completed,
}

/// 提交答案的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub record: AnswerRecord,
    pub answers: Vec<AnswerRecord>,
    pub score: usize,
}

/// `advance` 产生的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    /// 进入下一题
    Moved { index: usize },
    /// 已完成，携带全部作答（包括最后一题）
    Completed(Vec<AnswerRecord>),
}

type CompletionCallback = Box<dyn FnMut(&[AnswerRecord]) + Send>;

/// 答题导航
pub struct QuizNavigation {
    state: NavState,
    target: usize,
    selected: Option<usize>,
    answers: Vec<AnswerRecord>,
    on_complete: Option<CompletionCallback>,
}

impl QuizNavigation {
    /// `target` 为本次测验的目标题数
    pub fn new(target: usize) -> Self {
        Self {
            state: NavState::Unanswered { index: 0 },
            target,
            selected: None,
            answers: Vec::new(),
            on_complete: None,
        }
    }

    /// 按已保存的作答恢复
    ///
    /// 所有题都已作答（但还没点"下一题"）时停在最后一题的已答状态。
    pub fn resume(target: usize, answers: Vec<AnswerRecord>) -> Self {
        let state = if answers.is_empty() {
            NavState::Unanswered { index: 0 }
        } else if answers.len() >= target {
            NavState::Answered {
                index: target.saturating_sub(1),
            }
        } else {
            NavState::Unanswered {
                index: answers.len(),
            }
        };

        let selected = match state {
            NavState::Answered { .. } => answers.last().map(|a| a.selected_answer),
            _ => None,
        };

        Self {
            state,
            target,
            selected,
            answers,
            on_complete: None,
        }
    }

    /// 设置完成回调
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&[AnswerRecord]) + Send + 'static,
    {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// 暂选一个选项；已作答、已完成或越界时忽略
    pub fn select_answer(&mut self, index: usize) {
        if matches!(self.state, NavState::Unanswered { .. }) && index < OPTION_COUNT {
            self.selected = Some(index);
        }
    }

    /// 提交当前选择
    ///
    /// 需要有选择、处于未作答状态、且当前位置已有题目。
    pub fn submit_answer(&mut self, questions: &[Question]) -> Option<SubmitOutcome> {
        let NavState::Unanswered { index } = self.state else {
            return None;
        };
        let selected = self.selected?;
        let question = questions.get(index)?;

        let record = AnswerRecord::for_question(question, selected);
        self.answers.push(record.clone());
        self.state = NavState::Answered { index };

        Some(SubmitOutcome {
            record,
            answers: self.answers.clone(),
            score: self.score(),
        })
    }

    /// 进入下一题或完成
    pub fn advance(&mut self) -> Option<NavigationEvent> {
        let NavState::Answered { index } = self.state else {
            return None;
        };

        if index + 1 >= self.target {
            self.state = NavState::Completed;
            if let Some(callback) = self.on_complete.as_mut() {
                callback(&self.answers);
            }
            return Some(NavigationEvent::Completed(self.answers.clone()));
        }

        self.state = NavState::Unanswered { index: index + 1 };
        self.selected = None;
        Some(NavigationEvent::Moved { index: index + 1 })
    }

    /// 回到第一题，清空作答
    pub fn restart(&mut self) {
        self.state = NavState::Unanswered { index: 0 };
        self.selected = None;
        self.answers.clear();
    }

    /// 无法再获取题目时缩短目标数，不会短于已到达的位置
    pub fn truncate_target(&mut self, acquired: usize) {
        let floor = match self.state {
            NavState::Completed => return,
            NavState::Unanswered { index } | NavState::Answered { index } => index + 1,
        };
        self.target = acquired.max(floor).min(self.target);
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    pub fn target(&self) -> usize {
        self.target
    }

    /// 当前题目下标；完成后停在最后一题
    pub fn current_index(&self) -> usize {
        match self.state {
            NavState::Unanswered { index } | NavState::Answered { index } => index,
            NavState::Completed => self.target.saturating_sub(1),
        }
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn has_answered(&self) -> bool {
        matches!(self.state, NavState::Answered { .. })
    }

    pub fn is_completed(&self) -> bool {
        self.state == NavState::Completed
    }

    pub fn is_last_question(&self) -> bool {
        self.current_index() + 1 >= self.target
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    pub fn score(&self) -> usize {
        self.answers.iter().filter(|a| a.is_correct).count()
    }

    /// 进度百分比：(当前下标 + 1) / 目标数
    pub fn progress_percent(&self) -> f64 {
        if self.target == 0 {
            return 0.0;
        }
        (self.current_index() + 1) as f64 / self.target as f64 * 100.0
    }

    /// 正确率（四舍五入到整数百分比）
    pub fn percentage(&self) -> u32 {
        if self.answers.is_empty() {
            return 0;
        }
        (self.score() as f64 / self.answers.len() as f64 * 100.0).round() as u32
    }
}

impl fmt::Debug for QuizNavigation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizNavigation")
            .field("state", &self.state)
            .field("target", &self.target)
            .field("selected", &self.selected)
            .field("answers", &self.answers.len())
            .finish()
    }
}
