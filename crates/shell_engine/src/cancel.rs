use std::{cell::Cell, rc::Rc};

use futures::{
    channel::oneshot,
    future::{self, FutureExt, Shared},
};

/// Cooperative cancellation signal handed to a running command.
///
/// Polling loops either check [`CancelToken::is_cancelled`] once per iteration or race
/// [`CancelToken::cancelled`] against their timer.
#[derive(Clone)]
pub struct CancelToken {
    flag: Rc<Cell<bool>>,
    signal: Shared<oneshot::Receiver<()>>,
}

impl CancelToken {
    /// Token that is never triggered.
    pub fn never() -> Self {
        let (_trigger, token) = cancel_pair();
        token
    }

    /// Returns whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.get()
    }

    /// Resolves once cancellation has been requested; stays pending otherwise.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        // A dropped trigger means the execution finished without being cancelled.
        if self.signal.clone().await.is_err() {
            future::pending::<()>().await;
        }
    }
}

/// Owning side of a [`CancelToken`], kept by the session for the active execution.
pub(crate) struct CancelTrigger {
    flag: Rc<Cell<bool>>,
    sender: Option<oneshot::Sender<()>>,
}

impl CancelTrigger {
    pub(crate) fn cancel(&mut self) {
        self.flag.set(true);
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(());
        }
    }
}

pub(crate) fn cancel_pair() -> (CancelTrigger, CancelToken) {
    let flag = Rc::new(Cell::new(false));
    let (sender, receiver) = oneshot::channel();
    (
        CancelTrigger {
            flag: flag.clone(),
            sender: Some(sender),
        },
        CancelToken {
            flag,
            signal: receiver.shared(),
        },
    )
}

#[cfg(test)]
mod tests {
    use futures::{executor::block_on, future::Either, pin_mut};

    use super::*;

    #[test]
    fn trigger_sets_flag_and_wakes_waiters() {
        let (mut trigger, token) = cancel_pair();
        let waiter = token.clone();
        assert!(!token.is_cancelled());
        trigger.cancel();
        assert!(token.is_cancelled());
        block_on(waiter.cancelled());
    }

    #[test]
    fn dropped_trigger_never_resolves() {
        let (trigger, token) = cancel_pair();
        drop(trigger);
        let cancelled = token.cancelled();
        let ready = future::ready(());
        pin_mut!(cancelled);
        let winner = block_on(future::select(cancelled, ready));
        assert!(matches!(winner, Either::Right(_)));
        assert!(!token.is_cancelled());
    }
}
