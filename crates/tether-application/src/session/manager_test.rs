use super::*;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize};
use tether_core::{MessageRole, Thread};
use tether_infrastructure::MemoryHandleStore;

// ============================================================================
// Mocks
// ============================================================================

/// In-memory session server that records every call.
struct MockTransport {
    name: &'static str,
    sessions: Mutex<HashMap<String, SessionRecord>>,
    next_ids: Mutex<VecDeque<String>>,
    failing: AtomicBool,
    get_delay: Option<Duration>,
    create_delay: Option<Duration>,
    clear_thread: Mutex<Option<Thread>>,
    get_calls: AtomicUsize,
    create_calls: AtomicUsize,
    clear_calls: AtomicUsize,
    patch_calls: Mutex<Vec<(String, WindowStatePatch)>>,
}

impl MockTransport {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            sessions: Mutex::new(HashMap::new()),
            next_ids: Mutex::new(VecDeque::new()),
            failing: AtomicBool::new(false),
            get_delay: None,
            create_delay: None,
            clear_thread: Mutex::new(None),
            get_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            clear_calls: AtomicUsize::new(0),
            patch_calls: Mutex::new(Vec::new()),
        }
    }

    fn failing(name: &'static str) -> Self {
        let transport = Self::new(name);
        transport.failing.store(true, Ordering::SeqCst);
        transport
    }

    fn with_session(self, record: SessionRecord) -> Self {
        let id = record.id.clone().unwrap_or_default();
        self.sessions.lock().insert(id, record);
        self
    }

    fn with_next_id(self, id: &str) -> Self {
        self.next_ids.lock().push_back(id.to_string());
        self
    }

    fn with_get_delay(mut self, delay: Duration) -> Self {
        self.get_delay = Some(delay);
        self
    }

    fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(TetherError::http_status(502, format!("{} is down", self.name)))
        } else {
            Ok(())
        }
    }

    fn creates(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    fn gets(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    fn patches(&self) -> Vec<(String, WindowStatePatch)> {
        self.patch_calls.lock().clone()
    }
}

#[async_trait]
impl SessionTransport for MockTransport {
    fn name(&self) -> &str {
        self.name
    }

    async fn get(&self, handle: &str) -> Result<SessionEnvelope> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.get_delay {
            tokio::time::sleep(delay).await;
        }
        self.check()?;
        self.sessions
            .lock()
            .get(handle)
            .cloned()
            .map(SessionEnvelope::new)
            .ok_or_else(|| TetherError::session_not_found(handle))
    }

    async fn create(&self, owner_id: &str) -> Result<SessionEnvelope> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        self.check()?;

        let id = self
            .next_ids
            .lock()
            .pop_front()
            .unwrap_or_else(|| format!("s{}", n));
        let thread = Thread::new(format!("t-{}", id));
        let record = SessionRecord {
            id: Some(id.clone()),
            owner_id: owner_id.to_string(),
            threads: vec![thread.clone()],
            ..SessionRecord::default()
        };
        self.sessions.lock().insert(id, record.clone());
        Ok(SessionEnvelope::new(record).with_thread(thread))
    }

    async fn patch(&self, handle: &str, patch: &WindowStatePatch) -> Result<SessionEnvelope> {
        self.patch_calls.lock().push((handle.to_string(), *patch));
        self.check()?;
        let mut sessions = self.sessions.lock();
        let record = sessions
            .get_mut(handle)
            .ok_or_else(|| TetherError::session_not_found(handle))?;
        record.apply(patch);
        Ok(SessionEnvelope::new(record.clone()))
    }

    async fn clear(&self, handle: &str) -> Result<SessionEnvelope> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let thread = self
            .clear_thread
            .lock()
            .clone()
            .unwrap_or_else(|| Thread::new("t-cleared"));
        let mut sessions = self.sessions.lock();
        let record = sessions
            .get_mut(handle)
            .ok_or_else(|| TetherError::session_not_found(handle))?;
        record.threads = vec![thread.clone()];
        Ok(SessionEnvelope::new(record.clone()).with_thread(thread))
    }
}

#[derive(Default)]
struct RecordingSurfaces {
    calls: Mutex<Vec<&'static str>>,
}

impl RecordingSurfaces {
    fn count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| **c == call).count()
    }
}

impl SurfaceController for RecordingSurfaces {
    fn open_text_surface(&self) {
        self.calls.lock().push("open_text");
    }
    fn minimize_text_surface(&self) {
        self.calls.lock().push("minimize_text");
    }
    fn open_voice_surface(&self) {
        self.calls.lock().push("open_voice");
    }
    fn minimize_voice_surface(&self) {
        self.calls.lock().push("minimize_voice");
    }
    fn activate_microphone(&self) {
        self.calls.lock().push("microphone");
    }
    fn text_surface_displayed(&self) -> bool {
        false
    }
    fn voice_surface_displayed(&self) -> bool {
        false
    }
}

#[derive(Default)]
struct RecordingLauncher {
    calls: Mutex<Vec<bool>>,
}

impl LauncherView for RecordingLauncher {
    fn set_launcher_visible(&self, visible: bool) {
        self.calls.lock().push(visible);
    }
}

struct Harness {
    manager: Arc<SessionManager>,
    store: Arc<MemoryHandleStore>,
    transport: Arc<MockTransport>,
    surfaces: Arc<RecordingSurfaces>,
    launcher: Arc<RecordingLauncher>,
}

fn harness(store: MemoryHandleStore, transport: MockTransport) -> Harness {
    harness_with_fallback(store, transport, None)
}

fn harness_with_fallback(
    store: MemoryHandleStore,
    transport: MockTransport,
    fallback: Option<Arc<MockTransport>>,
) -> Harness {
    let store = Arc::new(store);
    let transport = Arc::new(transport);
    let surfaces = Arc::new(RecordingSurfaces::default());
    let launcher = Arc::new(RecordingLauncher::default());
    let manager = SessionManager::new(
        "site-1",
        Collaborators {
            handle_store: store.clone(),
            transport: transport.clone(),
            fallback_transport: fallback.map(|f| f as Arc<dyn SessionTransport>),
            surfaces: surfaces.clone(),
            launcher: launcher.clone(),
        },
        ManagerSettings::default(),
    );
    Harness {
        manager,
        store,
        transport,
        surfaces,
        launcher,
    }
}

fn stored_session(id: &str, window: tether_core::WindowState) -> SessionRecord {
    SessionRecord {
        id: Some(id.to_string()),
        owner_id: "site-1".to_string(),
        threads: vec![Thread::new("t-old"), Thread::new("t-latest")],
        window,
    }
}

// ============================================================================
// Acquisition
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_initialize_twice_acquires_once() {
    let h = harness(
        MemoryHandleStore::new(),
        MockTransport::new("primary").with_create_delay(Duration::from_millis(300)),
    );

    let manager = h.manager.clone();
    let first = tokio::spawn(async move { manager.initialize().await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(h.manager.phase(), ManagerPhase::Acquiring);

    // Returns at once while the first call is still creating
    h.manager.initialize().await;
    assert_eq!(h.manager.phase(), ManagerPhase::Acquiring);

    first.await.unwrap();
    assert_eq!(h.transport.creates(), 1);
    assert_eq!(h.transport.gets(), 0);

    tokio::join!(h.manager.initialize(), h.manager.initialize());
    assert_eq!(h.transport.creates(), 1);

    // Ready with an id: further calls do nothing
    h.manager.initialize().await;
    assert_eq!(h.transport.creates(), 1);
    assert_eq!(h.manager.phase(), ManagerPhase::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_no_stored_handle_creates_and_stores_session() {
    let h = harness(
        MemoryHandleStore::new(),
        MockTransport::new("primary").with_next_id("s1"),
    );

    h.manager.initialize().await;

    assert_eq!(h.store.current().as_deref(), Some("s1"));
    assert_eq!(h.manager.current_record().persisted_id(), Some("s1"));
    assert_eq!(h.manager.visibility().state(), LauncherState::Visible);
    assert_eq!(*h.launcher.calls.lock(), vec![true]);
    assert_eq!(h.manager.current_thread_id().as_deref(), Some("t-s1"));
}

#[tokio::test(start_paused = true)]
async fn test_expired_handle_creates_exactly_once() {
    let h = harness(
        MemoryHandleStore::with_handle("s0"),
        MockTransport::new("primary").with_next_id("s1"),
    );

    h.manager.initialize().await;

    assert_eq!(h.transport.gets(), 1);
    assert_eq!(h.transport.creates(), 1);
    assert_eq!(h.manager.phase(), ManagerPhase::Ready);
    assert_eq!(h.manager.current_record().persisted_id(), Some("s1"));
    assert_eq!(h.store.current().as_deref(), Some("s1"));
}

#[tokio::test(start_paused = true)]
async fn test_stored_handle_is_loaded() {
    let h = harness(
        MemoryHandleStore::with_handle("s7"),
        MockTransport::new("primary").with_session(stored_session("s7", Default::default())),
    );

    h.manager.initialize().await;

    assert_eq!(h.transport.creates(), 0);
    assert_eq!(h.manager.current_record().persisted_id(), Some("s7"));
    assert_eq!(h.manager.current_thread_id().as_deref(), Some("t-latest"));
    assert_eq!(h.store.current().as_deref(), Some("s7"));
}

#[tokio::test(start_paused = true)]
async fn test_load_existing_holds_off_other_acquisitions() {
    let h = harness(
        MemoryHandleStore::new(),
        MockTransport::new("primary")
            .with_session(stored_session("s7", Default::default()))
            .with_get_delay(Duration::from_millis(500)),
    );

    let manager = h.manager.clone();
    let load = tokio::spawn(async move { manager.load_existing("s7").await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(h.manager.phase(), ManagerPhase::Acquiring);

    let patch = WindowStatePatch::new().text_open(true);
    h.manager.request_patch(patch);
    assert_eq!(h.manager.pending_len(), 1);
    h.manager.initialize().await;
    h.manager.load_existing("s7").await;

    load.await.unwrap();
    h.manager.settle().await;

    assert_eq!(h.transport.gets(), 1);
    assert_eq!(h.transport.creates(), 0);
    assert_eq!(h.transport.patches(), vec![("s7".to_string(), patch)]);
    assert_eq!(h.manager.pending_len(), 0);
    assert_eq!(h.manager.phase(), ManagerPhase::Ready);
    assert_eq!(h.store.current().as_deref(), Some("s7"));
}

#[tokio::test(start_paused = true)]
async fn test_load_transport_failure_falls_through_to_create() {
    let h = harness(
        MemoryHandleStore::with_handle("s7"),
        MockTransport::failing("primary"),
    );

    // get fails, then creation on the same transport fails too
    h.manager.initialize().await;
    assert_eq!(h.transport.gets(), 1);
    assert_eq!(h.transport.creates(), 1);
    assert_eq!(h.manager.phase(), ManagerPhase::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_store_skips_load() {
    let h = harness(
        MemoryHandleStore::unavailable(),
        MockTransport::new("primary"),
    );

    h.manager.initialize().await;

    assert_eq!(h.transport.gets(), 0);
    assert_eq!(h.transport.creates(), 1);
    assert!(h.manager.current_record().is_persisted());
}

#[tokio::test(start_paused = true)]
async fn test_fallback_used_when_primary_fails() {
    let fallback = Arc::new(MockTransport::new("fallback").with_next_id("f1"));
    let h = harness_with_fallback(
        MemoryHandleStore::new(),
        MockTransport::failing("primary"),
        Some(fallback.clone()),
    );

    h.manager.initialize().await;

    assert_eq!(h.transport.creates(), 1);
    assert_eq!(fallback.creates(), 1);
    assert_eq!(h.manager.current_record().persisted_id(), Some("f1"));
    assert_eq!(h.store.current().as_deref(), Some("f1"));
}

#[tokio::test(start_paused = true)]
async fn test_slow_primary_times_out_to_fallback() {
    let fallback = Arc::new(MockTransport::new("fallback").with_next_id("f1"));
    let h = harness_with_fallback(
        MemoryHandleStore::new(),
        MockTransport::new("primary").with_create_delay(Duration::from_secs(30)),
        Some(fallback.clone()),
    );

    let started = tokio::time::Instant::now();
    h.manager.initialize().await;

    assert!(started.elapsed() < Duration::from_secs(11));
    assert_eq!(fallback.creates(), 1);
    assert_eq!(h.manager.current_record().persisted_id(), Some("f1"));
}

#[tokio::test(start_paused = true)]
async fn test_total_failure_keeps_ui_usable_and_retries() {
    let fallback = Arc::new(MockTransport::failing("fallback"));
    let h = harness_with_fallback(
        MemoryHandleStore::new(),
        MockTransport::failing("primary"),
        Some(fallback.clone()),
    );

    h.manager
        .request_patch(WindowStatePatch::new().text_open(true));
    h.manager.settle().await;

    assert_eq!(h.manager.phase(), ManagerPhase::Ready);
    let record = h.manager.current_record();
    assert!(!record.is_persisted());
    assert!(record.window.text_open);
    assert_eq!(h.manager.pending_len(), 1);
    assert!(h.store.current().is_none());

    // The service comes back; an explicit initialize retries and drains
    h.transport.set_failing(false);
    h.manager.initialize().await;
    h.manager.settle().await;

    assert!(h.manager.current_record().is_persisted());
    assert_eq!(h.manager.pending_len(), 0);
    assert_eq!(h.transport.patches().len(), 1);
    assert!(h.manager.current_record().window.text_open);
}

// ============================================================================
// Patches
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_queued_patches_replay_in_order() {
    let h = harness(MemoryHandleStore::new(), MockTransport::new("primary"));
    let patches = [
        WindowStatePatch::new().text_open(true),
        WindowStatePatch::new().text_open(false).text_welcome(true),
        WindowStatePatch::new().text_open(true).text_open_window_up(true),
    ];

    for patch in patches {
        h.manager.request_patch(patch);
    }
    assert_eq!(h.manager.pending_len(), 3);
    assert!(h.transport.patches().is_empty());

    h.manager.settle().await;

    let sent: Vec<WindowStatePatch> = h.transport.patches().into_iter().map(|(_, p)| p).collect();
    assert_eq!(sent, patches);
    assert_eq!(h.manager.pending_len(), 0);

    let window = h.manager.current_record().window;
    assert!(window.text_open);
    assert!(window.text_welcome);
    assert!(window.text_open_window_up);
}

#[tokio::test(start_paused = true)]
async fn test_patch_is_applied_before_network() {
    let h = harness(MemoryHandleStore::new(), MockTransport::new("primary"));
    h.manager.initialize().await;

    h.manager
        .request_patch(WindowStatePatch::new().text_open(true));

    assert!(h.manager.current_record().window.text_open);
    assert!(h.transport.patches().is_empty());

    h.manager.settle().await;
    assert_eq!(h.transport.patches().len(), 1);
    assert!(h.manager.current_record().window.text_open);
}

#[tokio::test(start_paused = true)]
async fn test_pre_acquisition_patch_is_applied_immediately() {
    let h = harness(MemoryHandleStore::new(), MockTransport::new("primary"));

    h.manager
        .request_patch(WindowStatePatch::new().text_open(true));

    assert!(h.manager.current_record().window.text_open);
    assert!(!h.manager.current_record().is_persisted());
}

#[tokio::test(start_paused = true)]
async fn test_voice_patch_before_acquisition() {
    let h = harness(
        MemoryHandleStore::new(),
        MockTransport::new("primary").with_next_id("s2"),
    );
    let patch = WindowStatePatch::new()
        .voice_open(true)
        .voice_open_window_up(false);

    h.manager.request_patch(patch);
    h.manager.settle().await;

    assert_eq!(h.transport.patches(), vec![("s2".to_string(), patch)]);
    assert_eq!(h.manager.visibility().state(), LauncherState::Hidden);

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(h.manager.visibility().state(), LauncherState::Hidden);
    assert_eq!(h.surfaces.count("open_voice"), 1);
    assert_eq!(h.surfaces.count("minimize_voice"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_patch_keeps_optimistic_state() {
    let h = harness(MemoryHandleStore::new(), MockTransport::new("primary"));
    h.manager.initialize().await;
    h.transport.set_failing(true);

    h.manager
        .request_patch(WindowStatePatch::new().core_open(true));
    h.manager.settle().await;

    assert_eq!(h.transport.patches().len(), 1);
    assert!(h.manager.current_record().window.core_open);
}

#[tokio::test(start_paused = true)]
async fn test_response_for_other_session_is_dropped() {
    let h = harness(
        MemoryHandleStore::new(),
        MockTransport::new("primary").with_next_id("s1"),
    );
    h.manager.initialize().await;

    let stale = SessionRecord {
        id: Some("s-old".to_string()),
        window: tether_core::WindowState {
            voice_open: true,
            ..Default::default()
        },
        ..SessionRecord::default()
    };
    h.manager.apply_remote("s-old", SessionEnvelope::new(stale));

    let record = h.manager.current_record();
    assert_eq!(record.persisted_id(), Some("s1"));
    assert!(!record.window.voice_open);
}

// ============================================================================
// Restore and launcher
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_restore_runs_once_per_acquisition() {
    let window = tether_core::WindowState {
        text_open: true,
        text_open_window_up: true,
        ..Default::default()
    };
    let h = harness(
        MemoryHandleStore::with_handle("s7"),
        MockTransport::new("primary").with_session(stored_session("s7", window)),
    );
    let notifications = Arc::new(AtomicUsize::new(0));
    let counter = notifications.clone();
    h.manager.on_record_changed(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    h.manager.initialize().await;
    h.manager.initialize().await;
    h.manager
        .request_patch(WindowStatePatch::new().core_open(true));
    h.manager.settle().await;
    h.manager.refresh().await.unwrap();

    assert!(notifications.load(Ordering::SeqCst) >= 3);
    assert_eq!(h.surfaces.count("open_text"), 1);
    assert_eq!(h.surfaces.count("minimize_text"), 0);
    assert_eq!(h.manager.visibility().state(), LauncherState::Hidden);
}

#[tokio::test(start_paused = true)]
async fn test_launcher_transitions_are_debounced() {
    let h = harness(MemoryHandleStore::new(), MockTransport::new("primary"));
    h.manager.initialize().await;
    assert_eq!(h.manager.visibility().state(), LauncherState::Visible);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(h.manager.hide_launcher());
    assert!(!h.manager.ensure_launcher_visible());
    assert_eq!(h.manager.visibility().state(), LauncherState::Hidden);

    // The rejected show is reconciled once the debounce interval ends
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(h.manager.visibility().state(), LauncherState::Visible);
    assert!(!h.manager.ensure_launcher_visible());
    assert_eq!(*h.launcher.calls.lock(), vec![true, false, true]);
}

#[tokio::test(start_paused = true)]
async fn test_surface_opened_right_after_launcher_shows_hides_it() {
    let h = harness(MemoryHandleStore::new(), MockTransport::new("primary"));
    h.manager.initialize().await;
    assert_eq!(h.manager.visibility().state(), LauncherState::Visible);

    tokio::time::sleep(Duration::from_millis(100)).await;
    h.manager
        .request_patch(WindowStatePatch::new().text_open(true));
    h.manager.settle().await;
    assert_eq!(h.manager.visibility().state(), LauncherState::Visible);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(h.manager.current_record().window.text_open);
    assert_eq!(h.manager.visibility().state(), LauncherState::Hidden);
    assert_eq!(*h.launcher.calls.lock(), vec![true, false]);
}

#[tokio::test(start_paused = true)]
async fn test_pinned_launcher_survives_open_surface() {
    let h = harness(MemoryHandleStore::new(), MockTransport::new("primary"));
    h.manager.initialize().await;
    h.manager.pin_launcher_visible();

    tokio::time::sleep(Duration::from_millis(300)).await;
    h.manager
        .request_patch(WindowStatePatch::new().text_open(true));
    assert_eq!(h.manager.visibility().state(), LauncherState::Visible);

    h.manager.release_launcher_pin();
    assert_eq!(h.manager.visibility().state(), LauncherState::Hidden);
}

// ============================================================================
// History, refresh, forget
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_clear_history_switches_to_new_thread() {
    let h = harness(
        MemoryHandleStore::new(),
        MockTransport::new("primary").with_next_id("s1"),
    );
    *h.transport.clear_thread.lock() = Some(Thread::new("t-fresh"));
    h.manager.initialize().await;
    h.manager
        .append_local_message(Message::now(MessageRole::User, "hello"));
    assert_eq!(h.manager.local_history().len(), 1);

    let record = h.manager.clear_history().await.unwrap();

    assert_eq!(h.manager.current_thread_id().as_deref(), Some("t-fresh"));
    assert!(h.manager.local_history().is_empty());
    assert_eq!(record.threads.len(), 1);
    assert_eq!(h.transport.clear_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_clear_history_without_session_is_local() {
    let h = harness(MemoryHandleStore::new(), MockTransport::new("primary"));
    h.manager
        .append_local_message(Message::now(MessageRole::User, "hello"));

    h.manager.clear_history().await.unwrap();

    assert!(h.manager.local_history().is_empty());
    assert_eq!(h.transport.clear_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_after_expiry_reacquires() {
    let h = harness(
        MemoryHandleStore::new(),
        MockTransport::new("primary")
            .with_next_id("s1")
            .with_next_id("s2"),
    );
    h.manager.initialize().await;
    h.transport.sessions.lock().remove("s1");

    let record = h.manager.refresh().await.unwrap();

    assert_eq!(record.persisted_id(), Some("s2"));
    assert_eq!(h.store.current().as_deref(), Some("s2"));
    assert_eq!(h.transport.creates(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_forget_session_resets_state() {
    let h = harness(MemoryHandleStore::new(), MockTransport::new("primary"));
    h.manager.initialize().await;

    h.manager.forget_session().await.unwrap();

    assert!(h.store.current().is_none());
    assert!(!h.manager.current_record().is_persisted());
    assert_eq!(h.manager.phase(), ManagerPhase::Idle);
    assert!(h.manager.current_thread_id().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_removed_listener_is_not_called() {
    let h = harness(MemoryHandleStore::new(), MockTransport::new("primary"));
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let id = h.manager.on_record_changed(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    h.manager.initialize().await;
    let seen = calls.load(Ordering::SeqCst);
    assert!(seen >= 1);

    assert!(h.manager.remove_listener(id));
    assert!(!h.manager.remove_listener(id));
    h.manager
        .request_patch(WindowStatePatch::new().core_open(true));
    h.manager.settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), seen);
}
