use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};


/// Контроллер отмены таймера гонки.
/// Клоны разделяют одно состояние отмены
#[derive(Debug, Clone)]
pub struct CancellationController {
    token: CancellationToken,
}

impl CancellationController {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Идемпотентно
    #[inline]
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    #[inline]
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    #[inline]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Default for CancellationController {
    fn default() -> Self {
        Self::new()
    }
}


/// Контроллер одной гонки с пометкой владельца.
/// При release финализируется только `Owned`
#[derive(Debug)]
pub enum ControllerLease {
    Owned(CancellationController),
    Shared(CancellationController),
}

impl ControllerLease {
    pub fn acquire(supplied: Option<CancellationController>) -> Self {
        match supplied {
            Some(controller) => ControllerLease::Shared(controller),
            None => ControllerLease::Owned(CancellationController::new()),
        }
    }

    #[inline]
    pub fn controller(&self) -> &CancellationController {
        match self {
            ControllerLease::Owned(c) | ControllerLease::Shared(c) => c,
        }
    }

    #[inline]
    pub fn is_owned(&self) -> bool {
        matches!(self, ControllerLease::Owned(_))
    }

    /// Свой контроллер отменяется и освобождается, чужой остается вызывающему
    pub fn release(self) {
        match self {
            ControllerLease::Owned(controller) => {
                controller.cancel();
                tracing::trace!("owned controller released");
            }
            ControllerLease::Shared(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supplied_controller_is_shared() {
        let supplied = CancellationController::new();
        let lease = ControllerLease::acquire(Some(supplied.clone()));
        assert!(!lease.is_owned());

        lease.release();
        assert!(!supplied.is_cancelled(), "caller controller must survive release");
    }

    #[test]
    fn owned_controller_is_finalized() {
        let lease = ControllerLease::acquire(None);
        assert!(lease.is_owned());

        let observer = lease.controller().clone();
        lease.release();
        assert!(observer.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let controller = CancellationController::new();
        let remote = controller.clone();

        tokio::spawn(async move { remote.cancel() });
        controller.cancelled().await;
        assert!(controller.is_cancelled());
    }

    #[test]
    fn cancel_is_idempotent() {
        let controller = CancellationController::new();
        controller.cancel();
        controller.cancel();
        assert!(controller.is_cancelled());
        assert!(controller.token().is_cancelled());
    }
}
