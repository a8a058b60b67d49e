//! Top-level view selection and session-driven orchestration.
//!
//! `AppController` is the one place that decides between the login view and
//! the dashboard. It observes the session store, loads the dashboard data for
//! the live credential, routes uploads to the right workflow and forces a
//! logout whenever an authenticated read is rejected.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ClientError, ClientResult};
use crate::gateway::{AnalysisGateway, AuthGateway, HttpGateway, Task, UserProfile};
use crate::global;
use crate::presenter::{present_dashboard, present_upload, DashboardView, UploadView};
use crate::session::{Credential, FileCredentialStorage, SessionSnapshot, SessionStore};
use crate::upload::{AudioFile, UploadMode, UploadPhase, UploadWorkflow};


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginView {
    /// Generic failure text from the last login attempt.
    pub error: Option<String>,
    /// Anonymous analyzer available without an account.
    pub analyzer: UploadView,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardScreen {
    pub dashboard: DashboardView,
    /// True once both profile and tasks have loaded for the live credential.
    pub ready: bool,
    pub uploader: UploadView,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppView {
    Login(LoginView),
    Dashboard(DashboardScreen),
}

impl AppView {
    pub fn is_login(&self) -> bool {
        matches!(self, Self::Login(_))
    }
}

/// Dashboard data, tied to the session epoch it was fetched under.
#[derive(Debug, Default)]
struct DashboardState {
    epoch: Option<u64>,
    profile: Option<UserProfile>,
    tasks: Vec<Task>,
}

impl DashboardState {
    fn is_ready_for(&self, credential: &Credential) -> bool {
        self.epoch == Some(credential.epoch())
    }
}

pub struct AppController {
    session: SessionStore,
    auth: Arc<dyn AuthGateway>,
    anonymous_upload: UploadWorkflow,
    session_upload: UploadWorkflow,
    dashboard: Mutex<DashboardState>,
    session_events: Mutex<watch::Receiver<SessionSnapshot>>,
    login_error: Mutex<Option<String>>,
}

impl AppController {
    pub fn new(
        session: SessionStore,
        auth: Arc<dyn AuthGateway>,
        analysis: Arc<dyn AnalysisGateway>,
        upload_timeout: Duration,
    ) -> Self {
        let session_events = session.subscribe();

        Self {
            session,
            auth,
            anonymous_upload: UploadWorkflow::new(
                UploadMode::Anonymous,
                analysis.clone(),
                upload_timeout,
            ),
            session_upload: UploadWorkflow::new(UploadMode::Session, analysis, upload_timeout),
            dashboard: Mutex::new(DashboardState::default()),
            session_events: Mutex::new(session_events),
            login_error: Mutex::new(None),
        }
    }

    /// Wire the HTTP gateway and the file-backed session from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let storage = FileCredentialStorage::new(global::session_file()?);
        let session = SessionStore::open(storage, config.session.storage_key.clone());
        let gateway = Arc::new(HttpGateway::from_config(&config.api));

        info!("Using backend at {}", gateway.base_url());

        Ok(Self::new(
            session,
            gateway.clone(),
            gateway,
            config.api.upload_timeout(),
        ))
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub async fn current_view(&self) -> AppView {
        let snapshot = self.observe_session().await;

        match snapshot.credential {
            None => AppView::Login(LoginView {
                error: self.login_error.lock().await.clone(),
                analyzer: present_upload(
                    &self.anonymous_upload.snapshot().await,
                    UploadMode::Anonymous,
                ),
            }),
            Some(credential) => {
                let (dashboard, ready) = {
                    let state = self.dashboard.lock().await;
                    let ready = state.is_ready_for(&credential);
                    (present_dashboard(state.profile.as_ref(), &state.tasks), ready)
                };
                AppView::Dashboard(DashboardScreen {
                    dashboard,
                    ready,
                    uploader: present_upload(
                        &self.session_upload.snapshot().await,
                        UploadMode::Session,
                    ),
                })
            }
        }
    }

    /// Exchange credentials, start the session and load the dashboard.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<DashboardView> {
        *self.login_error.lock().await = None;

        let token = match self.auth.authenticate(username, password).await {
            Ok(token) => token,
            Err(e) => {
                *self.login_error.lock().await = Some(e.to_string());
                return Err(e);
            }
        };

        self.session.login(token);
        self.load_dashboard().await
    }

    /// Fetch profile and tasks together for the live credential.
    ///
    /// Both must succeed before the dashboard is ready. `AuthExpired` from
    /// either forces logout. Nothing is cached on failure, so calling this
    /// again retries both fetches.
    pub async fn load_dashboard(&self) -> ClientResult<DashboardView> {
        self.observe_session().await;
        let Some(credential) = self.session.credential() else {
            return Err(ClientError::AuthExpired);
        };

        let (profile, tasks) = tokio::join!(
            self.auth.fetch_profile(&credential),
            self.auth.fetch_tasks(&credential)
        );

        if !self.session.is_current(&credential) {
            debug!(
                "Discarding dashboard data for session epoch {}",
                credential.epoch()
            );
            return Err(ClientError::AuthExpired);
        }

        match (profile, tasks) {
            (Ok(profile), Ok(tasks)) => {
                info!(
                    "Dashboard loaded for {} ({} tasks)",
                    profile.username,
                    tasks.len()
                );
                let view = present_dashboard(Some(&profile), &tasks);
                *self.dashboard.lock().await = DashboardState {
                    epoch: Some(credential.epoch()),
                    profile: Some(profile),
                    tasks,
                };
                Ok(view)
            }
            (Err(e), _) | (_, Err(e)) => {
                if e == ClientError::AuthExpired {
                    self.session.expire(&credential);
                    self.observe_session().await;
                } else {
                    warn!("Dashboard load failed: {}", e);
                }
                Err(e)
            }
        }
    }

    /// End the session. Safe to call when already logged out.
    pub async fn logout(&self) -> bool {
        let ended = self.session.logout();
        self.observe_session().await;
        self.anonymous_upload.reset().await;
        ended
    }

    pub async fn active_upload_mode(&self) -> UploadMode {
        if self.observe_session().await.is_authenticated() {
            UploadMode::Session
        } else {
            UploadMode::Anonymous
        }
    }

    pub async fn select_file(&self, file: AudioFile) -> ClientResult<()> {
        let mode = self.active_upload_mode().await;
        self.workflow(mode).select_file(file).await
    }

    /// Submit the selected file through the workflow matching the session
    /// state. A stored meeting refreshes the task list on success.
    pub async fn submit_upload(&self) -> ClientResult<UploadView> {
        let snapshot = self.observe_session().await;
        let credential = snapshot.credential;
        let mode = if credential.is_some() {
            UploadMode::Session
        } else {
            UploadMode::Anonymous
        };
        let workflow = self.workflow(mode);

        let phase = workflow.submit(credential.as_ref()).await?;

        if phase == UploadPhase::Succeeded && mode == UploadMode::Session {
            if let Err(e) = self.load_dashboard().await {
                warn!("Task refresh after processing failed: {}", e);
            }
        }

        Ok(self.upload_view(mode).await)
    }

    pub async fn upload_view(&self, mode: UploadMode) -> UploadView {
        present_upload(&self.workflow(mode).snapshot().await, mode)
    }

    fn workflow(&self, mode: UploadMode) -> &UploadWorkflow {
        match mode {
            UploadMode::Anonymous => &self.anonymous_upload,
            UploadMode::Session => &self.session_upload,
        }
    }

    /// React to session changes since the last look: data fetched under a
    /// different credential is dropped and the session workflow is reset.
    async fn observe_session(&self) -> SessionSnapshot {
        let (changed, snapshot) = {
            let mut events = self.session_events.lock().await;
            let changed = events.has_changed().unwrap_or(false);
            let snapshot = events.borrow_and_update().clone();
            (changed, snapshot)
        };

        if changed {
            let live_epoch = snapshot.credential.as_ref().map(Credential::epoch);
            {
                let mut dashboard = self.dashboard.lock().await;
                if dashboard.epoch != live_epoch {
                    *dashboard = DashboardState::default();
                }
            }

            debug!(
                "Session changed (epoch {}, authenticated: {})",
                snapshot.epoch,
                snapshot.is_authenticated()
            );

            self.session_upload.reset().await;
            if snapshot.is_authenticated() {
                *self.login_error.lock().await = None;
            }
        }

        snapshot
    }
}
