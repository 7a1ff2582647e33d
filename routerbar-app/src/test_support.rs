//! In-memory fetcher shared by the crate's tests.

use async_trait::async_trait;
use routerbar_core::Usage;
use routerbar_fetch::{FetchError, UsageFetcher};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted answer for one fetch.
#[derive(Clone)]
pub(crate) enum Reply {
    Usage(Usage),
    Unauthorized,
    Hang,
}

/// Answers fetches from a script; an exhausted script answers `Unauthorized`.
#[derive(Default)]
pub(crate) struct StubFetcher {
    replies: Mutex<VecDeque<Reply>>,
    calls: AtomicUsize,
    tokens: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub(crate) fn with(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl UsageFetcher for StubFetcher {
    async fn fetch_usage(&self, token: &str) -> Result<Usage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().unwrap().push(token.to_string());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Unauthorized);
        match reply {
            Reply::Usage(usage) => Ok(usage),
            Reply::Unauthorized => Err(FetchError::Unauthorized),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(FetchError::InvalidResponse("unreachable".to_string()))
            }
        }
    }
}
