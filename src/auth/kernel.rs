//! The authorization kernel: per-session role state.
//!
//! Each active session owns an [`AuthKernel`], a tiny state machine that is
//! either `Loading` or `Ready(RoleSet)`. Sign-in builds a fresh kernel and
//! loads roles from the source of truth; an admin granting or revoking a role
//! reloads every live kernel for the affected user, so revocation takes
//! effect mid-session. Reloads carry a generation token: a reload that is
//! superseded by a newer one discards its result instead of publishing stale
//! roles. Any load failure or timeout settles on the empty role set.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Role, RoleSet};

/// Upper bound on a single role load. Past it the kernel fails closed.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(2);

/// Where role sets come from. The production implementation reads the
/// store; tests substitute scripted sources.
#[async_trait]
pub trait RoleSource: Send + Sync {
    async fn roles_for(&self, user_id: &str) -> Result<RoleSet>;
}

/// Loads roles from the synchronous [`Store`] without blocking the runtime.
pub struct StoreRoleSource {
    store: Arc<dyn Store>,
}

impl StoreRoleSource {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RoleSource for StoreRoleSource {
    async fn roles_for(&self, user_id: &str) -> Result<RoleSet> {
        let store = Arc::clone(&self.store);
        let user_id = user_id.to_string();
        let roles = tokio::task::spawn_blocking(move || store.list_roles(&user_id))
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))??;
        Ok(roles.into_iter().collect())
    }
}

#[derive(Debug, Clone)]
pub enum KernelState {
    Loading,
    Ready(RoleSet),
}

pub struct AuthKernel {
    user_id: String,
    source: Arc<dyn RoleSource>,
    load_timeout: Duration,
    generation: AtomicU64,
    // Serializes generation bumps against result publication so a settled
    // state can never be overwritten by an older load.
    publish: Mutex<()>,
    state: watch::Sender<KernelState>,
}

impl AuthKernel {
    fn new(user_id: String, source: Arc<dyn RoleSource>, load_timeout: Duration) -> Arc<Self> {
        let (state, _) = watch::channel(KernelState::Loading);
        Arc::new(Self {
            user_id,
            source,
            load_timeout,
            generation: AtomicU64::new(0),
            publish: Mutex::new(()),
            state,
        })
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn state(&self) -> KernelState {
        self.state.borrow().clone()
    }

    /// Effective capability check against the settled role set. While a
    /// load is in flight this answers false; callers that must not observe
    /// the loading window use [`wait_ready`](Self::wait_ready) first.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        match self.state() {
            KernelState::Ready(roles) => roles.grants(role),
            KernelState::Loading => false,
        }
    }

    /// Re-enters `Loading` and fetches the role set from the source.
    /// Returns the state the kernel settled on, which may come from a
    /// newer reload that superseded this one.
    pub async fn reload(&self) {
        let generation = self.begin_load();

        let roles = match timeout(self.load_timeout, self.source.roles_for(&self.user_id)).await {
            Ok(Ok(roles)) => roles,
            Ok(Err(e)) => {
                tracing::warn!(
                    user_id = %self.user_id,
                    "role load failed, failing closed to empty role set: {e}"
                );
                RoleSet::EMPTY
            }
            Err(_) => {
                tracing::warn!(
                    user_id = %self.user_id,
                    "role load timed out after {:?}, failing closed to empty role set",
                    self.load_timeout
                );
                RoleSet::EMPTY
            }
        };

        self.finish_load(generation, roles);
    }

    /// Waits for the kernel to settle and returns the role set.
    pub async fn wait_ready(&self) -> RoleSet {
        let mut rx = self.state.subscribe();
        loop {
            if let KernelState::Ready(roles) = *rx.borrow_and_update() {
                return roles;
            }
            if rx.changed().await.is_err() {
                // Kernel dropped mid-wait; nothing was granted.
                return RoleSet::EMPTY;
            }
        }
    }

    fn begin_load(&self) -> u64 {
        let _guard = self.publish.lock().unwrap_or_else(|e| e.into_inner());
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(KernelState::Loading);
        generation
    }

    fn finish_load(&self, generation: u64, roles: RoleSet) {
        let _guard = self.publish.lock().unwrap_or_else(|e| e.into_inner());
        if self.generation.load(Ordering::SeqCst) == generation {
            self.state.send_replace(KernelState::Ready(roles));
        }
    }
}

/// Owns the kernels for every live session.
pub struct AuthRegistry {
    source: Arc<dyn RoleSource>,
    load_timeout: Duration,
    kernels: Mutex<HashMap<String, Arc<AuthKernel>>>,
}

impl AuthRegistry {
    #[must_use]
    pub fn new(source: Arc<dyn RoleSource>, load_timeout: Duration) -> Self {
        Self {
            source,
            load_timeout,
            kernels: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<AuthKernel>>> {
        self.kernels.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Starts a fresh kernel for a session. Always reloads from the source
    /// of truth; a client-held role cache is never trusted across sign-ins.
    pub async fn begin_session(&self, session_id: &str, user_id: &str) -> Arc<AuthKernel> {
        let kernel = AuthKernel::new(
            user_id.to_string(),
            Arc::clone(&self.source),
            self.load_timeout,
        );
        self.lock()
            .insert(session_id.to_string(), Arc::clone(&kernel));
        kernel.reload().await;
        kernel
    }

    /// Returns the session's kernel, building one on demand (sessions
    /// outlive the process; kernels do not).
    pub async fn kernel_for(&self, session_id: &str, user_id: &str) -> Arc<AuthKernel> {
        let existing = self
            .lock()
            .get(session_id)
            .filter(|k| k.user_id() == user_id)
            .cloned();

        match existing {
            Some(kernel) => kernel,
            None => self.begin_session(session_id, user_id).await,
        }
    }

    pub fn end_session(&self, session_id: &str) {
        self.lock().remove(session_id);
    }

    /// Reloads every live kernel belonging to `user_id`. Called after a
    /// role grant or revocation so running sessions pick up the change.
    pub async fn roles_changed(&self, user_id: &str) {
        let targets: Vec<Arc<AuthKernel>> = self
            .lock()
            .values()
            .filter(|k| k.user_id() == user_id)
            .cloned()
            .collect();

        for kernel in targets {
            kernel.reload().await;
        }
    }
}
