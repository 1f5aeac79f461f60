use super::{
    errors::{ConfigError, HandlerFailure, WorkFailure},
    handle::{CancellationController, ControllerLease},
    model::{Outcome, RacePhase},
};
use std::{
    any::Any,
    convert::Infallible,
    fmt,
    future::Future,
    panic::AssertUnwindSafe,
    pin::pin,
    thread,
};
use futures::FutureExt;
use tokio::{
    task::JoinError,
    time::Duration,
};


pub type TimeoutHandler = Box<dyn FnOnce() + Send + 'static>;

/// Неотрицательный дедлайн гонки
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeoutSpec(Duration);

impl TimeoutSpec {
    pub const ZERO: TimeoutSpec = TimeoutSpec(Duration::ZERO);

    pub fn from_millis(millis: i64) -> Result<Self, ConfigError> {
        if millis < 0 {
            return Err(ConfigError::NegativeTimeout(millis as f64 / 1000.0));
        }
        Ok(Self(Duration::from_millis(millis as u64)))
    }

    pub fn from_secs_f64(secs: f64) -> Result<Self, ConfigError> {
        if secs < 0.0 {
            return Err(ConfigError::NegativeTimeout(secs));
        }
        Duration::try_from_secs_f64(secs)
            .map(Self)
            .map_err(|_| ConfigError::InvalidSeconds(secs))
    }

    #[inline]
    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl From<Duration> for TimeoutSpec {
    fn from(duration: Duration) -> Self {
        Self(duration)
    }
}


/// Конфигурация гонки
pub struct RaceConfig {
    pub timeout: TimeoutSpec,
    pub handler: Option<TimeoutHandler>,
    pub controller: Option<CancellationController>,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            timeout: TimeoutSpec::from(Duration::from_secs(30)),
            handler: None,
            controller: None,
        }
    }
}

impl fmt::Debug for RaceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RaceConfig")
            .field("timeout", &self.timeout)
            .field("handler", &self.handler.is_some())
            .field("controller", &self.controller)
            .finish()
    }
}

impl RaceConfig {
    pub fn new(timeout: impl Into<TimeoutSpec>) -> Self {
        Self {
            timeout: timeout.into(),
            ..Default::default()
        }
    }

    /// Вызывается не более одного раза и только при настоящем таймауте
    pub fn on_timeout<F>(mut self, handler: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Владельцем остается вызывающий, гонка только отменяет его
    pub fn with_controller(mut self, controller: CancellationController) -> Self {
        self.controller = Some(controller);
        self
    }
}


enum TimerExit {
    Elapsed,
    Disarmed,
}

enum Finished<T, E> {
    Inline(thread::Result<Result<T, E>>),
    Joined(Result<Result<T, E>, JoinError>),
}

enum Winner<T, E> {
    Work(Finished<T, E>),
    Timer,
}

async fn run_timer(controller: CancellationController, timeout: Duration) -> TimerExit {
    tokio::select! {
        biased;
        _ = controller.cancelled() => TimerExit::Disarmed,
        _ = tokio::time::sleep(timeout) => TimerExit::Elapsed,
    }
}

#[inline]
fn advance(from: RacePhase, to: RacePhase) -> RacePhase {
    debug_assert!(from.can_advance_to(to), "invalid race transition {from:?} -> {to:?}");
    tracing::trace!(?from, ?to, "race phase");
    to
}

/// Гонка `work` с `config.timeout`.
///
/// Work unit сначала опрашивается один раз на месте: уже готовый результат выигрывает
/// даже у нулевого таймаута. Иначе он запускается отдельной задачей и никогда не
/// прерывается: после таймаута продолжает работать в фоне, результат отбрасывается.
/// Когда побеждает work unit, контроллер отменяется, и таймер больше не сработает.
/// Когда побеждает таймер, обработчик запускается в blocking pool и дожидается
/// до возврата `TimedOut`; его ошибка только логируется.
///
/// Контроллер, отмененный до дедлайна, выключает таймер. Тогда гонка ждет work unit
/// без ограничения по времени.
pub async fn race_with_timeout<T, E, F>(work: F, config: RaceConfig) -> Outcome<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
    F: Future<Output = Result<T, E>> + Send + 'static,
{
    let RaceConfig { timeout, handler, controller } = config;
    let timeout = timeout.as_duration();
    let lease = ControllerLease::acquire(controller);

    tracing::debug!(
        ?timeout,
        owned_controller = lease.is_owned(),
        "race started"
    );

    let mut phase = RacePhase::Racing;

    // Уже готовый work unit выигрывает до старта таймера
    let mut work = Box::pin(work);
    let winner = match AssertUnwindSafe(work.as_mut()).catch_unwind().now_or_never() {
        Some(finished) => Winner::Work(Finished::Inline(finished)),
        None => {
            let mut work = tokio::spawn(work);
            let mut timer = pin!(run_timer(lease.controller().clone(), timeout));
            let mut timer_armed = true;

            loop {
                tokio::select! {
                    biased;
                    joined = &mut work => break Winner::Work(Finished::Joined(joined)),
                    exit = &mut timer, if timer_armed => match exit {
                        TimerExit::Elapsed => break Winner::Timer,
                        TimerExit::Disarmed => {
                            timer_armed = false;
                            tracing::warn!("controller cancelled before deadline, waiting on work unit alone");
                        }
                    },
                }
            }
        }
    };

    let outcome = match winner {
        Winner::Work(finished) => {
            phase = advance(phase, RacePhase::WorkWon);
            lease.controller().cancel();
            settle(finished)
        }
        Winner::Timer => {
            phase = advance(phase, RacePhase::TimerWon);
            if let Some(handler) = handler {
                if !lease.controller().is_cancelled() {
                    if let Err(failure) = invoke_handler(handler).await {
                        tracing::error!(error = %failure, "timeout handler failed");
                    }
                }
            }
            Outcome::TimedOut
        }
    };

    phase = advance(phase, RacePhase::Finalizing);
    lease.release();
    let phase = advance(phase, RacePhase::Done);
    debug_assert!(phase.is_terminal());

    tracing::debug!(
        completed = outcome.is_completed(),
        failed = outcome.is_failed(),
        timed_out = outcome.is_timed_out(),
        "race finished"
    );
    outcome
}

/// То же, что [`race_with_timeout`], для work unit без ошибок
pub async fn race_value_with_timeout<T, F>(work: F, config: RaceConfig) -> Outcome<T, Infallible>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    race_with_timeout(work.map(Ok::<T, Infallible>), config).await
}

/// Второй шаг: завершение уже замечено, теперь извлекаем результат или ошибку
fn settle<T, E>(finished: Finished<T, E>) -> Outcome<T, E> {
    match finished {
        Finished::Inline(Ok(result)) | Finished::Joined(Ok(result)) => match result {
            Ok(value) => Outcome::Completed(value),
            Err(error) => Outcome::Failed(WorkFailure::Error(error)),
        },
        Finished::Inline(Err(payload)) => Outcome::Failed(WorkFailure::Panic(panic_message(payload))),
        Finished::Joined(Err(join_err)) if join_err.is_panic() => {
            Outcome::Failed(WorkFailure::Panic(panic_message(join_err.into_panic())))
        }
        Finished::Joined(Err(join_err)) => Outcome::Failed(WorkFailure::Aborted(join_err.to_string())),
    }
}

async fn invoke_handler(handler: TimeoutHandler) -> Result<(), HandlerFailure> {
    tokio::task::spawn_blocking(handler).await.map_err(handler_failure)
}

fn handler_failure(join_err: JoinError) -> HandlerFailure {
    if join_err.is_panic() {
        HandlerFailure::Panic(panic_message(join_err.into_panic()))
    } else {
        HandlerFailure::Aborted(join_err.to_string())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}


/// `work.timeout_after(config).await`
pub trait TimeoutExt<T, E>: Future<Output = Result<T, E>> + Sized {
    fn timeout_after(self, config: RaceConfig) -> impl Future<Output = Outcome<T, E>> + Send;
}

impl<F, T, E> TimeoutExt<T, E> for F
where
    T: Send + 'static,
    E: Send + 'static,
    F: Future<Output = Result<T, E>> + Send + 'static,
{
    fn timeout_after(self, config: RaceConfig) -> impl Future<Output = Outcome<T, E>> + Send {
        race_with_timeout(self, config)
    }
}
