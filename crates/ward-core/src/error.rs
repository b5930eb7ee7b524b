//! 错误定义模块

use thiserror::Error;

/// 病房系统统一错误类型
#[derive(Error, Debug)]
pub enum WardError {
    #[error("数据库错误: {0}")]
    Database(String),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("数据冲突: {0}")]
    Conflict(String),

    #[error("无效状态转换: 从 {from} 到 {event}")]
    InvalidStateTransition { from: String, event: String },

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

impl WardError {
    /// 是否属于客户端输入导致的错误
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            WardError::Validation(_)
                | WardError::NotFound(_)
                | WardError::Conflict(_)
                | WardError::InvalidStateTransition { .. }
        )
    }
}

/// 病房系统统一结果类型
pub type Result<T> = std::result::Result<T, WardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(WardError::Validation("bad".into()).is_client_error());
        assert!(WardError::Conflict("taken".into()).is_client_error());
        assert!(!WardError::Database("down".into()).is_client_error());
    }

    #[test]
    fn test_state_transition_message() {
        let err = WardError::InvalidStateTransition {
            from: "Done".into(),
            event: "Withdrawn".into(),
        };
        assert!(err.to_string().contains("Done"));
        assert!(err.to_string().contains("Withdrawn"));
    }
}
