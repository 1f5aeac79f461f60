//! Гонка асинхронной задачи с таймаутом и кооперативной отменой
//!
//! # Features
//! - Ровно один результат на вызов: завершено, ошибка или таймаут
//! - Опциональный обработчик таймаута, вызывается изолированно и не более одного раза
//! - Контроллер отмены от вызывающего или собственный
//! - Work unit не прерывается принудительно, после таймаута его результат просто не наблюдается
//! - Паники в work unit возвращаются как ошибки

pub mod errors;
pub mod handle;
pub mod model;
pub mod race;

pub use errors::{ConfigError, HandlerFailure, WorkFailure};
pub use handle::{CancellationController, ControllerLease};
pub use model::{Outcome, RacePhase};
pub use race::{
    race_value_with_timeout, race_with_timeout, RaceConfig, TimeoutExt, TimeoutHandler, TimeoutSpec,
};
