use std::future::Future;
use std::sync::Mutex;

use tokio::sync::oneshot;

type Waiter = oneshot::Sender<Result<(), String>>;

/// Readiness of an external SDK that must be initialized once before use
pub enum ScriptLoadState {
    NotLoaded,
    /// A load is in flight; callers queued behind it are notified when it ends
    Loading(Vec<Waiter>),
    Loaded,
    Failed(String),
}

impl ScriptLoadState {
    pub fn name(&self) -> &'static str {
        match self {
            ScriptLoadState::NotLoaded => "not_loaded",
            ScriptLoadState::Loading(_) => "loading",
            ScriptLoadState::Loaded => "loaded",
            ScriptLoadState::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SdkLoadError {
    #[error("SDK failed to load: {0}")]
    Failed(String),
    #[error("SDK load was abandoned before finishing")]
    Cancelled,
}

/// Gate that runs an SDK's one-time load exactly once at a time
///
/// The first caller performs the load, concurrent callers wait for its outcome.
/// A failed load is not sticky: the next caller tries again.
pub struct SdkLoader {
    name: &'static str,
    state: Mutex<ScriptLoadState>,
}

enum Step {
    Ready,
    Wait(oneshot::Receiver<Result<(), String>>),
    Load,
}

impl SdkLoader {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(ScriptLoadState::NotLoaded),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.state
            .lock()
            .map(|state| matches!(*state, ScriptLoadState::Loaded))
            .unwrap_or(false)
    }

    pub fn state_name(&self) -> &'static str {
        self.state
            .lock()
            .map(|state| state.name())
            .unwrap_or("poisoned")
    }

    /// Last failure reason, if the most recent load failed
    pub fn failure(&self) -> Option<String> {
        match &*self.state.lock().ok()? {
            ScriptLoadState::Failed(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    pub async fn ensure_loaded<F, Fut>(&self, load: F) -> Result<(), SdkLoadError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), String>>,
    {
        let step = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| SdkLoadError::Failed("loader state poisoned".to_string()))?;
            match &mut *state {
                ScriptLoadState::Loaded => Step::Ready,
                ScriptLoadState::Loading(waiters) => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Step::Wait(rx)
                }
                ScriptLoadState::NotLoaded | ScriptLoadState::Failed(_) => {
                    *state = ScriptLoadState::Loading(Vec::new());
                    Step::Load
                }
            }
        };

        match step {
            Step::Ready => Ok(()),
            Step::Wait(rx) => match rx.await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(reason)) => Err(SdkLoadError::Failed(reason)),
                Err(_) => Err(SdkLoadError::Cancelled),
            },
            Step::Load => {
                tracing::info!(sdk = self.name, "Loading SDK");
                let mut guard = LoadGuard {
                    loader: self,
                    finished: false,
                };
                let outcome = load().await;
                guard.finish(outcome.clone());
                outcome.map_err(SdkLoadError::Failed)
            }
        }
    }

    fn complete(&self, outcome: Result<(), String>) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        let next = match &outcome {
            Ok(()) => ScriptLoadState::Loaded,
            Err(reason) => ScriptLoadState::Failed(reason.clone()),
        };
        let previous = std::mem::replace(&mut *state, next);
        drop(state);

        match &outcome {
            Ok(()) => tracing::info!(sdk = self.name, "SDK loaded"),
            Err(reason) => tracing::warn!(sdk = self.name, reason = %reason, "SDK load failed"),
        }

        if let ScriptLoadState::Loading(waiters) = previous {
            for waiter in waiters {
                let _ = waiter.send(outcome.clone());
            }
        }
    }
}

/// Marks the load failed if the loading future is dropped midway
struct LoadGuard<'a> {
    loader: &'a SdkLoader,
    finished: bool,
}

impl LoadGuard<'_> {
    fn finish(&mut self, outcome: Result<(), String>) {
        self.finished = true;
        self.loader.complete(outcome);
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.loader.complete(Err("load cancelled".to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_loads_once() {
        let loader = SdkLoader::new("test");
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            loader
                .ensure_loaded(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(loader.is_loaded());
        assert_eq!(loader.state_name(), "loaded");
    }

    #[tokio::test]
    async fn test_failure_is_retried() {
        let loader = SdkLoader::new("test");

        let result = loader
            .ensure_loaded(|| async { Err("missing app key".to_string()) })
            .await;
        assert_eq!(result, Err(SdkLoadError::Failed("missing app key".to_string())));
        assert_eq!(loader.state_name(), "failed");
        assert_eq!(loader.failure().as_deref(), Some("missing app key"));

        loader.ensure_loaded(|| async { Ok(()) }).await.unwrap();
        assert!(loader.is_loaded());
        assert!(loader.failure().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_load() {
        let loader = Arc::new(SdkLoader::new("test"));
        let calls = Arc::new(AtomicUsize::new(0));
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let first = {
            let loader = loader.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                loader
                    .ensure_loaded(|| async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        let _ = release_rx.await;
                        Ok(())
                    })
                    .await
            })
        };

        while loader.state_name() != "loading" {
            tokio::task::yield_now().await;
        }

        let mut second = tokio_test::task::spawn(loader.ensure_loaded(|| async { Ok(()) }));
        tokio_test::assert_pending!(second.poll());

        release_tx.send(()).unwrap();
        assert_eq!(first.await.unwrap(), Ok(()));
        assert_eq!(second.await, Ok(()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_load_does_not_stick() {
        let loader = SdkLoader::new("test");
        {
            let mut load = tokio_test::task::spawn(
                loader.ensure_loaded(|| std::future::pending::<Result<(), String>>()),
            );
            tokio_test::assert_pending!(load.poll());
        }

        assert_eq!(loader.state_name(), "failed");
        loader.ensure_loaded(|| async { Ok(()) }).await.unwrap();
        assert!(loader.is_loaded());
    }
}
