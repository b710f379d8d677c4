//! 重试策略
//!
//! 每次尝试都套一层超时；失败后按 `base_backoff × 尝试次数` 线性退避。

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::warn;

use crate::error::GenerationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 首次失败后最多再试几次
    pub max_retries: u32,
    pub base_backoff: Duration,
    /// 单次尝试的超时
    pub timeout: Duration,
    /// 解析/校验失败是否也重试；为 false 时只重试网络与超时错误
    pub retry_invalid_responses: bool,
}

impl RetryPolicy {
    /// 单题生成：30 秒超时，最多重试 2 次
    pub fn single_question() -> Self {
        Self {
            max_retries: 2,
            base_backoff: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
            retry_invalid_responses: true,
        }
    }

    /// 批量生成：60 秒超时，最多重试 2 次
    pub fn batch() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            ..Self::single_question()
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// 第 `attempt` 次（从 1 开始）失败后的等待时间
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.base_backoff * attempt
    }

    fn should_retry(&self, err: &GenerationError) -> bool {
        self.retry_invalid_responses || err.is_transient()
    }

    /// 按策略执行 `op`，`op` 收到当前尝试次数（从 1 开始）
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, GenerationError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let result = match timeout(self.timeout, op(attempt)).await {
                Ok(result) => result,
                Err(_) => Err(GenerationError::Timeout {
                    timeout_secs: self.timeout.as_secs(),
                }),
            };

            let err = match result {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if attempt > self.max_retries || !self.should_retry(&err) {
                return Err(GenerationError::Exhausted {
                    attempts: attempt,
                    source: Box::new(err),
                });
            }

            let delay = self.backoff_for(attempt);
            warn!(
                "{} 失败 (尝试 {}/{}): {}，{} 毫秒后重试...",
                label,
                attempt,
                self.max_attempts(),
                err,
                delay.as_millis()
            );
            sleep(delay).await;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::single_question()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn backoff_grows_linearly() {
        let policy = RetryPolicy::single_question();
        assert_eq!(policy.backoff_for(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(2));
        assert_eq!(policy.max_attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let result = RetryPolicy::single_question()
            .run("测试", |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(GenerationError::Request("connection reset".into()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_attempts_time_out() {
        let policy = RetryPolicy {
            max_retries: 0,
            ..RetryPolicy::single_question()
        };
        let result: Result<(), _> = policy
            .run("测试", |_| async {
                sleep(Duration::from_secs(120)).await;
                Ok(())
            })
            .await;

        match result {
            Err(GenerationError::Exhausted { attempts, source }) => {
                assert_eq!(attempts, 1);
                assert!(matches!(*source, GenerationError::Timeout { timeout_secs: 30 }));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_responses_fail_fast_when_configured() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            retry_invalid_responses: false,
            ..RetryPolicy::single_question()
        };

        let result: Result<(), _> = policy
            .run("测试", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(GenerationError::InvalidFormat("选项数量为 3".into())) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
