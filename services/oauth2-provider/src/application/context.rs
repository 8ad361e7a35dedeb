//! 请求作用域对象
//!
//! 每次调用构造一次，显式向下传递：会话、已认证主体、授予的 scope、取消与超时信号。

use std::future::Future;
use std::time::Duration;

use idp_common::UserId;
use idp_errors::{AppError, AppResult};
use tokio_util::sync::CancellationToken;

use crate::domain::projection::Viewer;
use crate::domain::scope::Scopes;

#[derive(Debug, Clone)]
pub struct RequestContext {
    session_id: String,
    subject: UserId,
    scope: Scopes,
    cancellation: CancellationToken,
    timeout: Duration,
}

impl RequestContext {
    /// 匿名请求，只携带浏览器会话 ID
    pub fn new(session_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            session_id: session_id.into(),
            subject: UserId::NONE,
            scope: Scopes::empty(),
            cancellation: CancellationToken::new(),
            timeout,
        }
    }

    /// 已通过访问令牌认证的主体
    pub fn with_subject(mut self, subject: UserId, scope: Scopes) -> Self {
        self.subject = subject;
        self.scope = scope;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn subject(&self) -> UserId {
        self.subject
    }

    pub fn scope(&self) -> &Scopes {
        &self.scope
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn viewer(&self) -> Viewer<'_> {
        Viewer {
            user_id: self.subject,
            scope: &self.scope,
        }
    }

    /// 在超时与取消约束下执行一次持久化调用
    pub async fn run<T, F>(&self, call: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(AppError::cancelled("Request cancelled")),
            result = tokio::time::timeout(self.timeout, call) => match result {
                Ok(inner) => inner,
                Err(_) => Err(AppError::timeout(format!(
                    "Persistence call exceeded {}ms",
                    self.timeout.as_millis()
                ))),
            },
        }
    }
}
