use super::pending::PendingQueue;
use crate::restorer::{InterfaceRestorer, RestoreTimings};
use crate::visibility::{LauncherState, VisibilityController, VisibilitySettings};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tether_core::{
    HandleStore, LauncherView, Message, Result, SessionEnvelope, SessionRecord, SessionTransport,
    SurfaceController, TetherError, WindowStatePatch,
};
use tokio_util::task::TaskTracker;

type Listener = Arc<dyn Fn(&SessionRecord) + Send + Sync>;

/// Identifies a listener registered with [`SessionManager::on_record_changed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Where the manager is in handle acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerPhase {
    /// No acquisition has started yet
    Idle,
    /// A load-or-create sequence is running
    Acquiring,
    /// Acquisition finished; the record may still lack an id after a total failure
    Ready,
}

/// External collaborators injected into the manager.
pub struct Collaborators {
    pub handle_store: Arc<dyn HandleStore>,
    pub transport: Arc<dyn SessionTransport>,
    /// Tried once when creation on `transport` fails
    pub fallback_transport: Option<Arc<dyn SessionTransport>>,
    pub surfaces: Arc<dyn SurfaceController>,
    pub launcher: Arc<dyn LauncherView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerSettings {
    /// Deadline for each creation attempt
    pub create_timeout: Duration,
    pub visibility: VisibilitySettings,
    pub restore: RestoreTimings,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            create_timeout: Duration::from_secs(10),
            visibility: VisibilitySettings::default(),
            restore: RestoreTimings::default(),
        }
    }
}

struct ManagerState {
    record: SessionRecord,
    pending: PendingQueue,
    phase: ManagerPhase,
    /// Set once any acquisition has been started
    acquisition_triggered: bool,
    /// Successful acquisitions so far; keys the one-shot restore
    acquisitions: u64,
    current_thread_id: Option<String>,
    history: Vec<Message>,
}

enum PatchRoute {
    Remote(String),
    Queued { kick_initialize: bool },
}

impl ManagerState {
    fn route(&mut self, patch: WindowStatePatch) -> PatchRoute {
        if self.phase != ManagerPhase::Acquiring
            && let Some(id) = self.record.persisted_id()
        {
            return PatchRoute::Remote(id.to_string());
        }

        self.pending.enqueue(patch);
        let kick_initialize =
            self.phase != ManagerPhase::Acquiring && !self.acquisition_triggered;
        if kick_initialize {
            self.acquisition_triggered = true;
        }
        PatchRoute::Queued { kick_initialize }
    }
}

/// Owns the single session record of a page and keeps it in sync with the
/// remote store.
///
/// `SessionManager` is responsible for:
/// - Acquiring a session handle (load the stored one, or create a new one)
/// - Applying window-state patches optimistically and persisting them
/// - Queueing patches issued before a handle exists and replaying them in order
/// - Feeding the launcher visibility controller and the interface restorer
///
/// Construct it once, share the `Arc`, and call [`SessionManager::initialize`].
/// Methods that schedule background work must be called inside a Tokio runtime.
pub struct SessionManager {
    owner_id: String,
    handle_store: Arc<dyn HandleStore>,
    transport: Arc<dyn SessionTransport>,
    fallback_transport: Option<Arc<dyn SessionTransport>>,
    settings: ManagerSettings,
    visibility: Arc<VisibilityController>,
    restorer: InterfaceRestorer,
    state: Mutex<ManagerState>,
    listeners: RwLock<Vec<(ListenerId, Listener)>>,
    next_listener_id: AtomicU64,
    tasks: TaskTracker,
}

impl SessionManager {
    /// Creates a manager with an empty, id-less record.
    ///
    /// # Arguments
    ///
    /// * `owner_id` - Owning site / tenant sent on session creation
    /// * `collaborators` - Storage, transports and presentation hooks
    /// * `settings` - Timeouts and visibility/restore timings
    pub fn new(
        owner_id: impl Into<String>,
        collaborators: Collaborators,
        settings: ManagerSettings,
    ) -> Arc<Self> {
        let owner_id = owner_id.into();
        let visibility = Arc::new(VisibilityController::new(
            collaborators.launcher,
            Arc::clone(&collaborators.surfaces),
            settings.visibility.clone(),
        ));
        let restorer = InterfaceRestorer::new(
            collaborators.surfaces,
            Arc::clone(&visibility),
            settings.restore.clone(),
        );

        Arc::new(Self {
            state: Mutex::new(ManagerState {
                record: SessionRecord::transient(owner_id.clone()),
                pending: PendingQueue::new(),
                phase: ManagerPhase::Idle,
                acquisition_triggered: false,
                acquisitions: 0,
                current_thread_id: None,
                history: Vec::new(),
            }),
            owner_id,
            handle_store: collaborators.handle_store,
            transport: collaborators.transport,
            fallback_transport: collaborators.fallback_transport,
            settings,
            visibility,
            restorer,
            listeners: RwLock::new(Vec::new()),
            next_listener_id: AtomicU64::new(0),
            tasks: TaskTracker::new(),
        })
    }

    // ============================================================================
    // Acquisition
    // ============================================================================

    /// Acquires a session handle: loads the stored one, or creates a new one.
    ///
    /// Returns immediately if an acquisition is already running or the manager
    /// already holds a persisted record. After a total failure (ready without
    /// an id) a new call retries. Never fails: every error is recovered or
    /// logged, and the manager always ends up `Ready`.
    pub async fn initialize(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            match state.phase {
                ManagerPhase::Acquiring => {
                    tracing::debug!("[SessionManager] Acquisition already in progress");
                    return;
                }
                ManagerPhase::Ready if state.record.is_persisted() => {
                    tracing::debug!("[SessionManager] Already initialized");
                    return;
                }
                _ => {}
            }
            state.phase = ManagerPhase::Acquiring;
            state.acquisition_triggered = true;
        }

        let handle = match self.handle_store.probe().await {
            Ok(()) => match self.handle_store.load().await {
                Ok(handle) => handle.filter(|h| !h.is_empty()),
                Err(e) => {
                    tracing::warn!("[SessionManager] Failed to load stored handle: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!(
                    "[SessionManager] Handle store unavailable, skipping load: {}",
                    e
                );
                None
            }
        };

        match handle {
            Some(handle) => self.load_handle(&handle).await,
            None => self.create_new().await,
        }
    }

    /// Loads the session behind `handle`.
    ///
    /// Counts as an acquisition: returns immediately if one is already
    /// running, otherwise patches issued meanwhile are queued until it
    /// finishes. Any failure (expired handle or transport fault) falls
    /// through to [`SessionManager::create_new`].
    pub async fn load_existing(self: &Arc<Self>, handle: &str) {
        {
            let mut state = self.state.lock();
            if state.phase == ManagerPhase::Acquiring {
                tracing::debug!("[SessionManager] Acquisition already in progress");
                return;
            }
            state.phase = ManagerPhase::Acquiring;
            state.acquisition_triggered = true;
        }
        self.load_handle(handle).await;
    }

    async fn load_handle(self: &Arc<Self>, handle: &str) {
        tracing::info!("[SessionManager] Loading session {}", handle);

        match self.transport.get(handle).await {
            Ok(envelope) => {
                if let Err(e) = self.handle_store.save(handle).await {
                    tracing::warn!("[SessionManager] Failed to re-confirm handle: {}", e);
                }
                self.complete_acquisition(envelope);
            }
            Err(e) if e.is_not_found() => {
                tracing::info!(
                    "[SessionManager] Session {} expired, creating a new one",
                    handle
                );
                self.create_new().await;
            }
            Err(e) => {
                tracing::warn!(
                    "[SessionManager] Failed to load session {}, creating a new one: {}",
                    handle,
                    e
                );
                self.create_new().await;
            }
        }
    }

    /// Creates a new remote session.
    ///
    /// Forced: marks the acquisition in progress regardless of the current
    /// phase. The primary transport is tried first, then the fallback once.
    /// If both fail the manager still becomes `Ready` with its id-less record
    /// and keeps queued patches for a later retry.
    pub async fn create_new(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            state.phase = ManagerPhase::Acquiring;
            state.acquisition_triggered = true;
        }

        let envelope = match self.attempt_create(self.transport.as_ref()).await {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                tracing::warn!(
                    "[SessionManager] Session creation via {} failed: {}",
                    self.transport.name(),
                    e
                );
                match &self.fallback_transport {
                    Some(fallback) => match self.attempt_create(fallback.as_ref()).await {
                        Ok(envelope) => Some(envelope),
                        Err(e) => {
                            tracing::warn!(
                                "[SessionManager] Session creation via {} failed: {}",
                                fallback.name(),
                                e
                            );
                            None
                        }
                    },
                    None => None,
                }
            }
        };

        let Some(envelope) = envelope else {
            tracing::error!(
                "[SessionManager] Could not create a session, continuing without one"
            );
            self.state.lock().phase = ManagerPhase::Ready;
            self.publish();
            return;
        };

        if let Some(id) = envelope.session.persisted_id() {
            tracing::info!("[SessionManager] Created session {}", id);
            if let Err(e) = self.handle_store.save(id).await {
                tracing::warn!("[SessionManager] Failed to store session handle: {}", e);
            }
        }

        self.complete_acquisition(envelope);
    }

    async fn attempt_create(&self, transport: &dyn SessionTransport) -> Result<SessionEnvelope> {
        let deadline = self.settings.create_timeout;
        match tokio::time::timeout(deadline, transport.create(&self.owner_id)).await {
            Ok(result) => result,
            Err(_) => Err(TetherError::timeout(deadline)),
        }
    }

    /// Installs a freshly acquired record, drains the pending queue and runs
    /// the restorer.
    ///
    /// The drain happens under the same lock that installs the record, so no
    /// newly issued patch can be routed ahead of a queued one.
    fn complete_acquisition(self: &Arc<Self>, envelope: SessionEnvelope) {
        let mut remote = Vec::new();
        let mut opens_voice = false;

        let (acquisition, id, window) = {
            let mut state = self.state.lock();

            let mut record = envelope.session;
            if record.owner_id.is_empty() {
                record.owner_id = self.owner_id.clone();
            }
            let current_thread_id = match envelope.thread {
                Some(thread) => {
                    let id = thread.thread_id.clone();
                    record.insert_thread(thread);
                    Some(id)
                }
                None => record.latest_thread().map(|t| t.thread_id.clone()),
            };
            state.history = current_thread_id
                .as_deref()
                .and_then(|id| record.thread(id))
                .map(|t| t.messages.clone())
                .unwrap_or_default();
            state.current_thread_id = current_thread_id;
            state.record = record;
            state.phase = ManagerPhase::Ready;

            let Some(id) = state.record.persisted_id().map(str::to_string) else {
                tracing::warn!(
                    "[SessionManager] Acquired record has no id, keeping {} queued patch(es)",
                    state.pending.len()
                );
                drop(state);
                self.publish();
                return;
            };

            state.acquisitions += 1;
            let ManagerState {
                record, pending, ..
            } = &mut *state;
            let drained = pending.drain_into(|patch| {
                record.apply(&patch);
                opens_voice |= patch.opens_voice();
                remote.push(patch);
            });
            if drained > 0 {
                tracing::debug!(
                    "[SessionManager] Replaying {} queued patch(es) to {}",
                    drained,
                    id
                );
            }

            (state.acquisitions, id, state.record.window)
        };

        self.publish();
        if opens_voice {
            self.reinforce_voice_hidden();
        }
        for patch in remote {
            self.spawn_remote_patch(id.clone(), patch);
        }
        self.restorer.restore(acquisition, &window);
    }

    // ============================================================================
    // Patches
    // ============================================================================

    /// Merges `patch` into the record and persists it.
    ///
    /// The merge is applied and published synchronously. With a handle and no
    /// acquisition running, the remote call is scheduled in the background and
    /// its full record replaces the local one when it arrives. Otherwise the
    /// patch is queued (and the first ever patch kicks off `initialize()`).
    /// Remote failures are logged; the optimistic state is kept.
    pub fn request_patch(self: &Arc<Self>, patch: WindowStatePatch) {
        let route = {
            let mut state = self.state.lock();
            state.record.apply(&patch);
            state.route(patch)
        };

        self.publish();
        if patch.opens_voice() {
            self.reinforce_voice_hidden();
        }

        match route {
            PatchRoute::Remote(id) => self.spawn_remote_patch(id, patch),
            PatchRoute::Queued { kick_initialize } => {
                tracing::debug!("[SessionManager] No session handle yet, patch queued");
                if kick_initialize {
                    let this = Arc::clone(self);
                    self.tasks.spawn(async move { this.initialize().await });
                }
            }
        }
    }

    fn spawn_remote_patch(self: &Arc<Self>, handle: String, patch: WindowStatePatch) {
        let this = Arc::clone(self);
        self.tasks.spawn(async move {
            match this.transport.patch(&handle, &patch).await {
                Ok(envelope) => this.apply_remote(&handle, envelope),
                Err(e) => tracing::warn!(
                    "[SessionManager] Window-state patch for {} failed, keeping local state: {}",
                    handle,
                    e
                ),
            }
        });
    }

    /// Replaces the record with a server response for `handle`.
    ///
    /// Responses for a handle other than the current one are dropped.
    fn apply_remote(&self, handle: &str, envelope: SessionEnvelope) {
        {
            let mut state = self.state.lock();
            if state.record.persisted_id() != Some(handle) {
                tracing::debug!(
                    "[SessionManager] Dropping response for {}, session changed",
                    handle
                );
                return;
            }

            let mut record = envelope.session;
            if !record.is_persisted() {
                record.id = Some(handle.to_string());
            }
            if record.owner_id.is_empty() {
                record.owner_id = self.owner_id.clone();
            }
            if let Some(thread) = envelope.thread {
                record.insert_thread(thread);
            }
            state.record = record;
        }
        self.publish();
    }

    fn reinforce_voice_hidden(&self) {
        self.visibility.hide();
        self.visibility
            .reinforce_hidden(&self.visibility.settings().voice_hide_delays);
    }

    // ============================================================================
    // Threads and history
    // ============================================================================

    /// Clears the thread history remotely.
    ///
    /// The returned thread (or else the record's first thread) becomes the
    /// current one and the local history is emptied. Without a handle only
    /// the local history is emptied.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the remote clear fails; local state is
    /// left untouched in that case.
    pub async fn clear_history(&self) -> Result<SessionRecord> {
        let Some(handle) = self.current_handle() else {
            self.state.lock().history.clear();
            return Ok(self.current_record());
        };

        let envelope = self.transport.clear(&handle).await?;
        {
            let mut state = self.state.lock();
            let mut record = envelope.session;
            if !record.is_persisted() {
                record.id = Some(handle.clone());
            }
            if record.owner_id.is_empty() {
                record.owner_id = self.owner_id.clone();
            }
            let current = match envelope.thread {
                Some(thread) => {
                    let id = thread.thread_id.clone();
                    record.insert_thread(thread);
                    Some(id)
                }
                None => record.threads.first().map(|t| t.thread_id.clone()),
            };
            tracing::info!(
                "[SessionManager] History cleared, current thread {:?}",
                current
            );
            state.current_thread_id = current;
            state.history.clear();
            state.record = record;
        }
        self.publish();
        Ok(self.current_record())
    }

    pub fn current_thread_id(&self) -> Option<String> {
        self.state.lock().current_thread_id.clone()
    }

    pub fn local_history(&self) -> Vec<Message> {
        self.state.lock().history.clone()
    }

    /// Appends a message to the local history of the current thread.
    pub fn append_local_message(&self, message: Message) {
        self.state.lock().history.push(message);
    }

    // ============================================================================
    // Refresh / forget
    // ============================================================================

    /// Re-fetches the record from the remote store.
    ///
    /// A not-found response clears the stored handle and re-runs acquisition.
    /// Without a handle this runs acquisition directly.
    ///
    /// # Errors
    ///
    /// Returns transport errors other than not-found.
    pub async fn refresh(self: &Arc<Self>) -> Result<SessionRecord> {
        let Some(handle) = self.current_handle() else {
            self.initialize().await;
            return Ok(self.current_record());
        };

        match self.transport.get(&handle).await {
            Ok(envelope) => {
                self.apply_remote(&handle, envelope);
                Ok(self.current_record())
            }
            Err(e) if e.is_not_found() => {
                tracing::info!(
                    "[SessionManager] Session {} is gone, acquiring a new one",
                    handle
                );
                if let Err(e) = self.handle_store.clear().await {
                    tracing::warn!("[SessionManager] Failed to clear stored handle: {}", e);
                }
                {
                    let mut state = self.state.lock();
                    state.record.id = None;
                    state.phase = ManagerPhase::Idle;
                }
                self.initialize().await;
                Ok(self.current_record())
            }
            Err(e) => Err(e),
        }
    }

    /// Drops the stored handle and starts over with a fresh id-less record.
    ///
    /// # Errors
    ///
    /// Returns `TetherError::Storage` if the handle store cannot be cleared.
    pub async fn forget_session(&self) -> Result<()> {
        self.handle_store.clear().await?;
        self.visibility.cancel_scheduled();
        {
            let mut state = self.state.lock();
            state.record = SessionRecord::transient(self.owner_id.clone());
            state.pending = PendingQueue::new();
            state.phase = ManagerPhase::Idle;
            state.acquisition_triggered = false;
            state.current_thread_id = None;
            state.history.clear();
        }
        tracing::info!("[SessionManager] Session forgotten");
        self.publish();
        Ok(())
    }

    // ============================================================================
    // Observation
    // ============================================================================

    /// Returns a snapshot of the in-memory record.
    pub fn current_record(&self) -> SessionRecord {
        self.state.lock().record.clone()
    }

    fn current_handle(&self) -> Option<String> {
        self.state.lock().record.persisted_id().map(str::to_string)
    }

    pub fn phase(&self) -> ManagerPhase {
        self.state.lock().phase
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn visibility(&self) -> &Arc<VisibilityController> {
        &self.visibility
    }

    /// Registers a listener called with the record after every change.
    ///
    /// Listeners run outside the manager's lock and may call back into it.
    pub fn on_record_changed<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&SessionRecord) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Unregisters a listener. Returns false if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    fn publish(&self) {
        let record = self.current_record();
        self.visibility.observe(&record.window);

        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&record);
        }
    }

    // ============================================================================
    // Launcher
    // ============================================================================

    /// Shows the launcher if the decision rule allows it.
    pub fn ensure_launcher_visible(&self) -> bool {
        if self.visibility.desired_state() == LauncherState::Visible {
            self.visibility.show()
        } else {
            false
        }
    }

    /// Hides the launcher (ignored while pinned).
    pub fn hide_launcher(&self) -> bool {
        self.visibility.hide()
    }

    pub fn pin_launcher_visible(&self) {
        self.visibility.pin_visible();
    }

    pub fn release_launcher_pin(&self) {
        self.visibility.release_pin();
        self.visibility.evaluate();
    }

    /// Waits for every background task issued so far (remote patches and
    /// kicked-off acquisitions).
    pub async fn settle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;
