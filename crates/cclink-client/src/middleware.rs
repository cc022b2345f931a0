//! Ordered inbound-message middleware.
//!
//! Each stage receives the decoded message and a [`Next`] continuation and
//! decides whether to proceed down the chain (onion composition: the first
//! stage's "before" code runs first, its "after" code last). A stage that
//! never invokes its continuation short-circuits the rest of the chain;
//! invoking a continuation more than once within one dispatch fails that
//! dispatch with [`DispatchError::NextCalledTwice`] — never a panic.

use std::sync::{Arc, Mutex};

use cclink_codec::Message;
use futures_util::future::BoxFuture;

/// Error type carried by user middleware stages.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can fail a single dispatch through the chain.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A continuation was invoked a second time within one dispatch.
    #[error("next() called more than once in a middleware stage")]
    NextCalledTwice,

    /// A middleware stage returned an error.
    #[error("middleware stage failed: {0}")]
    Stage(#[source] BoxError),
}

/// Future returned by a middleware stage.
pub type MiddlewareFuture = BoxFuture<'static, Result<(), DispatchError>>;

/// One middleware stage.
pub type Middleware = Arc<dyn Fn(Arc<Message>, Next) -> MiddlewareFuture + Send + Sync>;

/// Continuation handed to each stage.
///
/// `Next` is cloneable so stages can stash it, which is exactly why the
/// chain tracks a watermark: the second invocation for the same position is
/// rejected at runtime.
#[derive(Clone)]
pub struct Next {
    chain: Arc<[Middleware]>,
    message: Arc<Message>,
    index: usize,
    watermark: Arc<Mutex<i64>>,
}

impl Next {
    /// Proceed to the next stage (or finish the chain).
    pub async fn proceed(self) -> Result<(), DispatchError> {
        dispatch(self.chain, self.message, self.index, self.watermark).await
    }
}

/// Run a message through the whole chain.
///
/// An empty chain resolves immediately. The returned future settles only
/// once every stage that was reached has settled.
pub fn run(chain: Arc<[Middleware]>, message: Arc<Message>) -> MiddlewareFuture {
    dispatch(chain, message, 0, Arc::new(Mutex::new(-1)))
}

fn dispatch(
    chain: Arc<[Middleware]>,
    message: Arc<Message>,
    index: usize,
    watermark: Arc<Mutex<i64>>,
) -> MiddlewareFuture {
    Box::pin(async move {
        {
            let mut highest = watermark.lock().unwrap_or_else(|e| e.into_inner());
            if index as i64 <= *highest {
                return Err(DispatchError::NextCalledTwice);
            }
            *highest = index as i64;
        }

        let Some(stage) = chain.get(index).cloned() else {
            return Ok(());
        };
        let next = Next {
            chain,
            message: Arc::clone(&message),
            index: index + 1,
            watermark,
        };
        stage(message, next).await
    })
}
