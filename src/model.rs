use super::errors::WorkFailure;

/// Результат одной гонки. Ровно один на вызов
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T, E> {
    Completed(T),
    Failed(WorkFailure<E>),
    TimedOut,
}

impl<T, E> Outcome<T, E> {
    #[inline]
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    #[inline]
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Outcome::TimedOut)
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            _ => None,
        }
    }

    /// Таймаут превращается в `Ok(None)`
    pub fn into_result(self) -> Result<Option<T>, WorkFailure<E>> {
        match self {
            Outcome::Completed(value) => Ok(Some(value)),
            Outcome::Failed(failure) => Err(failure),
            Outcome::TimedOut => Ok(None),
        }
    }

    /// Значение при завершении, `T::default()` при таймауте, ошибка пробрасывается
    pub fn unwrap_or_default(self) -> Result<T, WorkFailure<E>>
    where
        T: Default,
    {
        self.into_result().map(Option::unwrap_or_default)
    }
}


/// Машина состояний одного вызова:
/// `Racing -> {WorkWon, TimerWon} -> Finalizing -> Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RacePhase {
    Racing,
    WorkWon,
    TimerWon,
    Finalizing,
    Done,
}

impl RacePhase {
    pub fn can_advance_to(self, next: RacePhase) -> bool {
        use RacePhase::*;
        matches!(
            (self, next),
            (Racing, WorkWon)
                | (Racing, TimerWon)
                | (WorkWon, Finalizing)
                | (TimerWon, Finalizing)
                | (Finalizing, Done)
        )
    }

    #[inline]
    pub fn is_terminal(self) -> bool {
        self == RacePhase::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_follow_single_path() {
        assert!(RacePhase::Racing.can_advance_to(RacePhase::WorkWon));
        assert!(RacePhase::Racing.can_advance_to(RacePhase::TimerWon));
        assert!(RacePhase::TimerWon.can_advance_to(RacePhase::Finalizing));
        assert!(RacePhase::Finalizing.can_advance_to(RacePhase::Done));

        assert!(!RacePhase::WorkWon.can_advance_to(RacePhase::TimerWon));
        assert!(!RacePhase::Racing.can_advance_to(RacePhase::Done));
        assert!(!RacePhase::Done.can_advance_to(RacePhase::Racing));
        assert!(RacePhase::Done.is_terminal());
    }

    #[test]
    fn timeout_yields_default() {
        let outcome: Outcome<i32, String> = Outcome::TimedOut;
        assert_eq!(outcome.unwrap_or_default(), Ok(0));

        let failed: Outcome<i32, String> = Outcome::Failed(WorkFailure::Error("boom".into()));
        assert_eq!(failed.into_result(), Err(WorkFailure::Error("boom".to_string())));
    }
}
