use thiserror::Error;

/// Недопустимый таймаут. Возвращается до старта гонки
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("timeout must be non-negative, got {0}s")]
    NegativeTimeout(f64),
    #[error("timeout must be a finite number of seconds, got {0}")]
    InvalidSeconds(f64),
}

/// Ошибка work unit, выигравшего гонку
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WorkFailure<E> {
    #[error("work unit failed: {0}")]
    Error(E),
    #[error("work unit panicked: {0}")]
    Panic(String),
    #[error("work unit aborted: {0}")]
    Aborted(String),
}

/// Ошибка обработчика таймаута. Только логируется, в Outcome не попадает
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerFailure {
    #[error("timeout handler panicked: {0}")]
    Panic(String),
    #[error("timeout handler aborted: {0}")]
    Aborted(String),
}
