/// Per-call retry driver around the refresh gate
use std::future::{poll_fn, Future};
use std::pin::pin;
use std::task::Poll;
use tracing::debug;

use crate::error::CallError;
use crate::gate::RefreshGate;

/// Run `call`, and if it reports [`CallError::AuthExpired`], wait for the gate
/// to refresh credentials and replay it once.
///
/// The retry flag is local to this invocation: a replayed call that is
/// rejected again returns `AuthExpired` to the caller instead of entering the
/// gate a second time.
///
/// Replays released by the same refresh start in join order: the replay is
/// polled once before the turn is handed to the next waiting caller.
pub async fn call_with_refresh<T, F, Fut>(gate: &RefreshGate, mut call: F) -> Result<T, CallError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CallError>>,
{
    match call().await {
        Err(CallError::AuthExpired) => {}
        other => return other,
    }

    let turn = gate.refresh().await?;
    debug!(behind = turn.remaining(), "Replaying call after credential refresh");

    let mut replay = pin!(call());
    let first = poll_fn(|cx| Poll::Ready(replay.as_mut().poll(cx))).await;
    turn.pass();

    match first {
        Poll::Ready(result) => result,
        Poll::Pending => replay.await,
    }
}
