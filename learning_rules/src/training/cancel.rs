use std::sync::{
    Arc, Condvar, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use log::{info, warn};

/// A thread safe handle used to interrupt a training loop.
///
/// A *request* only asks the loop to stop, the loop then consults its [`Confirm`] hook at the
/// next batch boundary. While that hook is being asked, every other loop sharing the token
/// waits at its own next batch boundary. Once *cancelled*, every loop sharing the token stops.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Flags>,
}

#[derive(Debug, Default)]
struct Flags {
    requested: AtomicBool,
    cancelled: AtomicBool,
    /// Whether a loop is currently asking its hook.
    prompting: Mutex<bool>,
    answered: Condvar,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the loops sharing this token to confirm whether they should stop.
    pub fn request(&self) {
        self.inner.requested.store(true, Ordering::SeqCst);
    }

    /// Stops every loop sharing this token at its next batch boundary.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Waits until no loop is asking its hook, then consumes a pending request.
    ///
    /// # Returns
    /// A guard held while the caller asks its hook, `None` if there was no request or the
    /// token got cancelled meanwhile.
    pub(crate) fn open_prompt(&self) -> Option<Prompt<'_>> {
        let mut prompting = self.lock_prompting();
        while *prompting {
            prompting = self
                .inner
                .answered
                .wait(prompting)
                .unwrap_or_else(PoisonError::into_inner);
        }

        if self.is_cancelled() || !self.inner.requested.swap(false, Ordering::SeqCst) {
            return None;
        }

        *prompting = true;
        Some(Prompt { token: self })
    }

    fn lock_prompting(&self) -> MutexGuard<'_, bool> {
        self.inner
            .prompting
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// An open prompt, the loops sharing its token resume once it is dropped.
pub(crate) struct Prompt<'a> {
    token: &'a CancelToken,
}

impl Drop for Prompt<'_> {
    fn drop(&mut self) {
        *self.token.lock_prompting() = false;
        self.token.inner.answered.notify_all();
    }
}

/// Decides whether a requested interruption should stop the training.
pub trait Confirm: Send + Sync {
    fn confirm(&self) -> bool;
}

impl<F> Confirm for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn confirm(&self) -> bool {
        self()
    }
}

/// A [`CancelToken`] paired with the hook that confirms its requests.
pub struct Cancellation {
    token: CancelToken,
    confirm: Box<dyn Confirm>,
}

impl Cancellation {
    /// Creates a new `Cancellation`.
    ///
    /// # Arguments
    /// * `token` - The token shared with whoever requests the interruption.
    /// * `confirm` - Asked once per request, `true` cancels the token.
    pub fn new<C>(token: CancelToken, confirm: C) -> Self
    where
        C: Confirm + 'static,
    {
        Self {
            token,
            confirm: Box::new(confirm),
        }
    }

    /// Checks the token at a batch boundary.
    ///
    /// # Returns
    /// Whether the training loop must stop.
    pub(crate) fn should_stop(&self) -> bool {
        if self.token.is_cancelled() {
            return true;
        }

        let Some(_prompt) = self.token.open_prompt() else {
            return self.token.is_cancelled();
        };

        warn!("training interrupted, waiting for confirmation");

        if self.confirm.confirm() {
            self.token.cancel();
            info!("training cancelled");
            return true;
        }

        info!("resuming training");
        false
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Barrier, thread, time::Duration};

    use super::*;

    #[test]
    fn nothing_stops_without_a_request() {
        let cancellation = Cancellation::new(CancelToken::new(), || true);
        assert!(!cancellation.should_stop());
    }

    #[test]
    fn declined_requests_are_consumed() {
        let token = CancelToken::new();
        let cancellation = Cancellation::new(token.clone(), || false);

        token.request();

        assert!(!cancellation.should_stop());
        assert!(token.open_prompt().is_none());
        assert!(!token.is_cancelled());
    }

    #[test]
    fn confirmed_requests_cancel_every_clone() {
        let token = CancelToken::new();
        let first = Cancellation::new(token.clone(), || true);
        let second = Cancellation::new(token.clone(), || false);

        token.request();

        assert!(first.should_stop());
        assert!(second.should_stop());
        assert!(token.is_cancelled());
    }

    #[test]
    fn other_loops_wait_while_a_hook_is_asked() {
        let token = CancelToken::new();
        let asked = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));

        let (hook_asked, hook_release) = (Arc::clone(&asked), Arc::clone(&release));
        let asking = Cancellation::new(token.clone(), move || {
            hook_asked.wait();
            hook_release.wait();
            true
        });
        let waiting = Cancellation::new(token.clone(), || false);

        token.request();
        let first = thread::spawn(move || asking.should_stop());
        asked.wait();

        let second = thread::spawn(move || waiting.should_stop());
        thread::sleep(Duration::from_millis(50));
        assert!(!second.is_finished());

        release.wait();
        assert!(first.join().unwrap());
        assert!(second.join().unwrap());
    }
}
