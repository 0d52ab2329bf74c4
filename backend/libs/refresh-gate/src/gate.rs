/// Single-flight credential refresh gate
///
/// State transitions:
/// - Idle → Refreshing: first caller to find the gate idle claims it and runs the refresh
/// - Refreshing: later callers park a one-shot handle in the waiter queue
/// - Refreshing → Idle (success): the leader gets a [`ReplayTurn`]; each parked
///   caller receives its turn only after the one before it has handed it on,
///   so replays start in the order callers joined
/// - Refreshing → Idle (failure): every parked handle receives the error and the
///   re-authentication hook fires once
///
/// The idle check and the transition happen under one lock, so two callers can
/// never both become the refreshing leader.
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::error::RefreshError;

/// Performs the actual credential refresh call
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> Result<(), RefreshError>;
}

/// Side effect fired when the session cannot be recovered (e.g. send the user
/// back to the login entry point)
pub trait Reauthenticator: Send + Sync {
    fn reauthenticate(&self, reason: &RefreshError);
}

/// Closure-backed [`Reauthenticator`]
pub struct FnReauthenticator<F>(pub F);

impl<F> Reauthenticator for FnReauthenticator<F>
where
    F: Fn(&RefreshError) + Send + Sync,
{
    fn reauthenticate(&self, reason: &RefreshError) {
        (self.0)(reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePhase {
    Idle,
    Refreshing,
}

#[derive(Debug, Clone)]
pub struct RefreshGateConfig {
    /// Upper bound on one refresh call; elapsing counts as refresh failure
    pub refresh_timeout: Duration,
}

impl Default for RefreshGateConfig {
    fn default() -> Self {
        Self {
            refresh_timeout: Duration::from_secs(10),
        }
    }
}

type Waiter = oneshot::Sender<Result<ReplayTurn, RefreshError>>;

/// Right to replay after a successful refresh
///
/// Turns for one refresh are held one at a time, leader first, then parked
/// callers in join order. Dropping the turn hands it to the next caller, so a
/// holder should drop it as soon as its replay is under way.
pub struct ReplayTurn {
    next: VecDeque<Waiter>,
}

impl ReplayTurn {
    fn new(next: VecDeque<Waiter>) -> Self {
        Self { next }
    }

    /// Callers still waiting for their turn behind this one
    pub fn remaining(&self) -> usize {
        self.next.len()
    }

    /// Hand the turn to the next caller now
    pub fn pass(self) {}
}

impl std::fmt::Debug for ReplayTurn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayTurn")
            .field("remaining", &self.next.len())
            .finish()
    }
}

impl Drop for ReplayTurn {
    fn drop(&mut self) {
        while let Some(waiter) = self.next.pop_front() {
            let rest = std::mem::take(&mut self.next);
            match waiter.send(Ok(ReplayTurn::new(rest))) {
                Ok(()) => return,
                // Caller went away; take the queue back and skip it
                Err(unsent) => {
                    if let Ok(mut turn) = unsent {
                        self.next = std::mem::take(&mut turn.next);
                    }
                }
            }
        }
    }
}

enum GateState {
    Idle,
    Refreshing { waiters: VecDeque<Waiter> },
}

pub struct RefreshGate {
    config: RefreshGateConfig,
    state: Mutex<GateState>,
    refresher: Arc<dyn TokenRefresher>,
    reauthenticator: Arc<dyn Reauthenticator>,
    /// Set once the re-authentication hook has fired; re-armed by a
    /// successful refresh or `reset_session`
    reauth_fired: AtomicBool,
    refresh_calls: AtomicU64,
}

impl RefreshGate {
    pub fn new(
        config: RefreshGateConfig,
        refresher: Arc<dyn TokenRefresher>,
        reauthenticator: Arc<dyn Reauthenticator>,
    ) -> Self {
        Self {
            config,
            state: Mutex::new(GateState::Idle),
            refresher,
            reauthenticator,
            reauth_fired: AtomicBool::new(false),
            refresh_calls: AtomicU64::new(0),
        }
    }

    /// Wait until credentials have been refreshed.
    ///
    /// Exactly one concurrent caller performs the refresh; all others are
    /// suspended on a one-shot handle and released with the leader's outcome.
    /// On success the returned [`ReplayTurn`] must be dropped once the caller
    /// has re-issued its request, or later callers stay parked.
    pub async fn refresh(&self) -> Result<ReplayTurn, RefreshError> {
        let waiter = {
            let mut state = self.state.lock();
            match &mut *state {
                GateState::Idle => {
                    *state = GateState::Refreshing {
                        waiters: VecDeque::new(),
                    };
                    None
                }
                GateState::Refreshing { waiters } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push_back(tx);
                    debug!(queued = waiters.len(), "Refresh in flight, queued caller");
                    Some(rx)
                }
            }
        };

        match waiter {
            Some(rx) => rx.await.unwrap_or(Err(RefreshError::Abandoned)),
            None => self.lead_refresh().await,
        }
    }

    async fn lead_refresh(&self) -> Result<ReplayTurn, RefreshError> {
        let mut guard = LeaderGuard {
            gate: self,
            armed: true,
        };

        self.refresh_calls.fetch_add(1, Ordering::Relaxed);
        info!("Refreshing credentials");

        let outcome = match timeout(self.config.refresh_timeout, self.refresher.refresh()).await {
            Ok(result) => result,
            Err(_) => Err(RefreshError::Timeout(self.config.refresh_timeout)),
        };

        guard.armed = false;
        let waiters = self.release();

        match outcome {
            Ok(()) => {
                self.reauth_fired.store(false, Ordering::SeqCst);
                info!(waiters = waiters.len(), "Credential refresh succeeded, replaying queued calls");
                Ok(ReplayTurn::new(waiters))
            }
            Err(e) => {
                error!(waiters = waiters.len(), "Credential refresh failed: {}", e);
                for waiter in waiters {
                    let _ = waiter.send(Err(e.clone()));
                }
                self.fire_reauthentication(&e);
                Err(e)
            }
        }
    }

    /// Flip back to idle and hand over the waiter queue
    fn release(&self) -> VecDeque<Waiter> {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, GateState::Idle) {
            GateState::Refreshing { waiters } => waiters,
            GateState::Idle => VecDeque::new(),
        }
    }

    fn fire_reauthentication(&self, reason: &RefreshError) {
        if self.reauth_fired.swap(true, Ordering::SeqCst) {
            debug!("Re-authentication already triggered, skipping");
            return;
        }
        warn!("Session unrecoverable, triggering re-authentication: {}", reason);
        self.reauthenticator.reauthenticate(reason);
    }

    /// Re-arm the re-authentication hook after the user signed in again
    pub fn reset_session(&self) {
        self.reauth_fired.store(false, Ordering::SeqCst);
    }

    pub fn phase(&self) -> GatePhase {
        match &*self.state.lock() {
            GateState::Idle => GatePhase::Idle,
            GateState::Refreshing { .. } => GatePhase::Refreshing,
        }
    }

    /// Callers currently parked behind the in-flight refresh
    pub fn waiting(&self) -> usize {
        match &*self.state.lock() {
            GateState::Idle => 0,
            GateState::Refreshing { waiters } => waiters.len(),
        }
    }

    /// Total refresh calls issued (for monitoring)
    pub fn refresh_calls(&self) -> u64 {
        self.refresh_calls.load(Ordering::Relaxed)
    }
}

/// Resets the gate if the leader's future is dropped mid-refresh; parked
/// callers observe their handle closing and fail with `Abandoned`.
struct LeaderGuard<'a> {
    gate: &'a RefreshGate,
    armed: bool,
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let abandoned = self.gate.release();
            warn!(waiters = abandoned.len(), "Credential refresh abandoned");
        }
    }
}
