//! The update client runtime.
//!
//! The client runs as a single task owning all session state. Callers talk
//! to it through a cloneable [`UpdaterHandle`]; checks, dialogs and restarts
//! run in spawned tasks that report back over the command channel, so the
//! state flags are only ever touched from the runtime loop. That is what
//! makes check requests collapse while one is in flight.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use feed::{Platform, UpdateFormat};

use crate::appimage::{AppImageOutcome, AppImageUpdater, EnvAppImageUpdater};
use crate::config::UpdateConfig;
use crate::error::{Result, UpdateError};
use crate::events::{QuitIntent, UpdaterEvent, UpdaterStatus};
use crate::hooks::{
    AppLifecycle, InstallChoice, NativeCheckOutcome, NativeUpdater, Notice,
    UnsupportedNativeUpdater, UserPrompt,
};
use crate::installer::{PkexecExecutor, PrivilegedCommand, PrivilegedExecutor};
use crate::linux;

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Host integration points the runtime calls out through.
#[derive(Clone)]
pub struct UpdaterHooks {
    pub prompt: Arc<dyn UserPrompt>,
    pub lifecycle: Arc<dyn AppLifecycle>,
    pub native: Arc<dyn NativeUpdater>,
    pub executor: Arc<dyn PrivilegedExecutor>,
    pub appimage: Arc<dyn AppImageUpdater>,
}

impl UpdaterHooks {
    /// Hooks with the stock platform integrations; only the UI seams are
    /// required.
    pub fn new(prompt: Arc<dyn UserPrompt>, lifecycle: Arc<dyn AppLifecycle>) -> Self {
        Self {
            prompt,
            lifecycle,
            native: Arc::new(UnsupportedNativeUpdater),
            executor: Arc::new(PkexecExecutor),
            appimage: Arc::new(EnvAppImageUpdater),
        }
    }

    pub fn native(mut self, native: Arc<dyn NativeUpdater>) -> Self {
        self.native = native;
        self
    }

    pub fn executor(mut self, executor: Arc<dyn PrivilegedExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn appimage(mut self, appimage: Arc<dyn AppImageUpdater>) -> Self {
        self.appimage = appimage;
        self
    }
}

/// Terminal outcome of one check cycle, reported by the spawned check task.
#[derive(Debug)]
enum CheckOutcome {
    /// The update has been applied (package installed, native update staged
    /// or AppImage rewritten); only the restart decision remains.
    Downloaded,
    NotAvailable,
    Failed(String),
}

#[derive(Debug)]
enum Command {
    Check { user_triggered: bool },
    CheckFinished(CheckOutcome),
    Install,
    InstallDeclined,
    InstallFinished,
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable front end to the update client runtime.
#[derive(Clone)]
pub struct UpdaterHandle {
    cmd_tx: mpsc::Sender<Command>,
    status_rx: watch::Receiver<UpdaterStatus>,
    event_tx: broadcast::Sender<UpdaterEvent>,
}

impl UpdaterHandle {
    /// Request an update check. While a check is in flight further requests
    /// are absorbed without changing the in-flight check.
    pub async fn check_for_updates(&self, user_triggered: bool) -> Result<()> {
        self.cmd_tx
            .send(Command::Check { user_triggered })
            .await
            .map_err(|_| UpdateError::Offline)
    }

    pub fn status(&self) -> UpdaterStatus {
        *self.status_rx.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<UpdaterStatus> {
        self.status_rx.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<UpdaterEvent> {
        self.event_tx.subscribe()
    }
}

/// Owns the runtime task; dropping it without [`shutdown`](Self::shutdown)
/// leaves the task running until the last handle goes away.
pub struct UpdateClient {
    handle: UpdaterHandle,
    task: JoinHandle<()>,
}

impl UpdateClient {
    pub fn spawn(config: UpdateConfig, hooks: UpdaterHooks) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (status_tx, status_rx) = watch::channel(UpdaterStatus::default());
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let runtime = Runtime {
            config: Arc::new(config),
            hooks,
            status: UpdaterStatus::default(),
            status_tx,
            event_tx: event_tx.clone(),
            cmd_tx: cmd_tx.clone(),
            scheduled: None,
        };
        let task = tokio::spawn(runtime.run(cmd_rx));

        let handle = UpdaterHandle {
            cmd_tx,
            status_rx,
            event_tx,
        };
        Self { handle, task }
    }

    pub fn handle(&self) -> UpdaterHandle {
        self.handle.clone()
    }

    pub async fn shutdown(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.handle
            .cmd_tx
            .send(Command::Shutdown(tx))
            .await
            .map_err(|_| UpdateError::Offline)?;
        rx.await.map_err(|_| UpdateError::Offline)?;
        self.task.await.map_err(|_| UpdateError::Offline)
    }
}

struct Runtime {
    config: Arc<UpdateConfig>,
    hooks: UpdaterHooks,
    status: UpdaterStatus,
    status_tx: watch::Sender<UpdaterStatus>,
    event_tx: broadcast::Sender<UpdaterEvent>,
    cmd_tx: mpsc::Sender<Command>,
    scheduled: Option<JoinHandle<()>>,
}

impl Runtime {
    async fn run(mut self, mut cmd_rx: mpsc::Receiver<Command>) {
        self.schedule_next_check();

        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                Command::Check { user_triggered } => self.on_check(user_triggered),
                Command::CheckFinished(outcome) => self.on_check_finished(outcome),
                Command::Install => self.on_install(),
                Command::InstallDeclined => {
                    info!(target: "updater", "restart deferred by user");
                    self.schedule_next_check();
                }
                Command::InstallFinished => {
                    self.status.update_pending = false;
                    self.publish_status();
                }
                Command::Shutdown(reply) => {
                    info!(target: "updater", "shutdown requested");
                    let _ = reply.send(());
                    break;
                }
            }
        }

        if let Some(task) = self.scheduled.take() {
            task.abort();
        }
        info!(target: "updater", "runtime loop exited");
    }

    fn on_check(&mut self, user_triggered: bool) {
        if self.status.update_pending {
            // An update is already applied; re-offer the restart instead of
            // checking again.
            debug!(target: "updater", "update already pending, re-offering restart");
            if let Some(task) = self.scheduled.take() {
                task.abort();
            }
            self.spawn_install_prompt();
            return;
        }
        if self.status.check_pending {
            debug!(target: "updater", "check already in flight");
            return;
        }

        if let Some(task) = self.scheduled.take() {
            task.abort();
        }
        self.status.check_pending = true;
        self.status.user_check_pending = user_triggered;
        self.publish_status();
        self.emit(UpdaterEvent::CheckingForUpdate);

        let config = Arc::clone(&self.config);
        let hooks = self.hooks.clone();
        let cmd_tx = self.cmd_tx.clone();
        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            let outcome = run_check(&config, &hooks, &event_tx).await;
            let _ = cmd_tx.send(Command::CheckFinished(outcome)).await;
        });
    }

    fn on_check_finished(&mut self, outcome: CheckOutcome) {
        let was_user_check = self.status.user_check_pending;
        self.status.check_pending = false;
        self.status.user_check_pending = false;

        match outcome {
            CheckOutcome::Downloaded => {
                self.status.update_pending = true;
                self.publish_status();
                self.emit(UpdaterEvent::UpdateDownloaded);
                self.spawn_install_prompt();
            }
            CheckOutcome::NotAvailable => {
                self.publish_status();
                self.emit(UpdaterEvent::UpdateNotAvailable);
                if was_user_check {
                    self.spawn_notice(Notice::NoUpdateAvailable);
                }
                self.schedule_next_check();
            }
            CheckOutcome::Failed(message) => {
                warn!(target: "updater", error = %message, "update check failed");
                self.publish_status();
                self.emit(UpdaterEvent::Error(message.clone()));
                if was_user_check {
                    self.spawn_notice(Notice::CheckFailed(message));
                }
                self.schedule_next_check();
            }
        }
    }

    fn on_install(&mut self) {
        let config = Arc::clone(&self.config);
        let hooks = self.hooks.clone();
        let cmd_tx = self.cmd_tx.clone();
        tokio::spawn(async move {
            run_restart(&config, &hooks).await;
            let _ = cmd_tx.send(Command::InstallFinished).await;
        });
    }

    fn spawn_install_prompt(&self) {
        let prompt = Arc::clone(&self.hooks.prompt);
        let cmd_tx = self.cmd_tx.clone();
        tokio::spawn(async move {
            let cmd = match prompt.ask_to_install().await {
                InstallChoice::InstallNow => Command::Install,
                InstallChoice::Later => Command::InstallDeclined,
            };
            let _ = cmd_tx.send(cmd).await;
        });
    }

    fn spawn_notice(&self, notice: Notice) {
        let prompt = Arc::clone(&self.hooks.prompt);
        tokio::spawn(async move {
            prompt.show_notice(notice).await;
        });
    }

    /// Arm the periodic background check, replacing any previous timer.
    fn schedule_next_check(&mut self) {
        if let Some(task) = self.scheduled.take() {
            task.abort();
        }
        let delay = self.config.check_interval;
        let cmd_tx = self.cmd_tx.clone();
        self.scheduled = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = cmd_tx
                .send(Command::Check {
                    user_triggered: false,
                })
                .await;
        }));
        debug!(target: "updater", delay_secs = delay.as_secs(), "scheduled next check");
    }

    fn publish_status(&self) {
        let _ = self.status_tx.send(self.status);
    }

    fn emit(&self, event: UpdaterEvent) {
        // No subscribers is fine; events are advisory.
        let _ = self.event_tx.send(event);
    }
}

/// One full check cycle, dispatched on the configured update format.
async fn run_check(
    config: &UpdateConfig,
    hooks: &UpdaterHooks,
    event_tx: &broadcast::Sender<UpdaterEvent>,
) -> CheckOutcome {
    let result = match config.format {
        UpdateFormat::Native => check_native(hooks).await,
        UpdateFormat::AppImage => check_appimage(hooks).await,
        UpdateFormat::Deb | UpdateFormat::Rpm => check_packaged(config, hooks, event_tx).await,
    };
    match result {
        Ok(outcome) => outcome,
        Err(err) => CheckOutcome::Failed(err.to_string()),
    }
}

async fn check_native(hooks: &UpdaterHooks) -> Result<CheckOutcome> {
    match hooks.native.check_for_updates().await? {
        NativeCheckOutcome::UpdateDownloaded => Ok(CheckOutcome::Downloaded),
        NativeCheckOutcome::UpdateNotAvailable => Ok(CheckOutcome::NotAvailable),
    }
}

async fn check_appimage(hooks: &UpdaterHooks) -> Result<CheckOutcome> {
    match hooks.appimage.update().await? {
        AppImageOutcome::Updated => Ok(CheckOutcome::Downloaded),
        AppImageOutcome::AlreadyCurrent => Ok(CheckOutcome::NotAvailable),
    }
}

async fn check_packaged(
    config: &UpdateConfig,
    hooks: &UpdaterHooks,
    event_tx: &broadcast::Sender<UpdaterEvent>,
) -> Result<CheckOutcome> {
    let client = linux::build_client(config)?;
    match linux::query_feed(&client, config).await? {
        linux::FeedAnswer::NotAvailable => Ok(CheckOutcome::NotAvailable),
        linux::FeedAnswer::Available { url } => {
            let _ = event_tx.send(UpdaterEvent::UpdateAvailable);
            linux::download_artifact(&client, config, &url).await?;

            // The package is installed as soon as it lands; the user is only
            // ever asked about the restart. On failure the downloaded file is
            // kept so a retry does not fetch it again.
            let linux_format = config
                .format
                .linux_format()
                .ok_or(UpdateError::Unsupported("format has no package manager"))?;
            let command = PrivilegedCommand::install(
                linux_format,
                &config.tmp_update_path,
                &config.product_name,
            )?;
            hooks.executor.run(&command).await?;
            if let Err(err) = tokio::fs::remove_file(&config.tmp_update_path).await {
                warn!(target: "updater", error = %err, "could not remove staged artifact");
            }
            Ok(CheckOutcome::Downloaded)
        }
    }
}

/// Offer the restart for an already applied update.
async fn run_restart(config: &UpdateConfig, hooks: &UpdaterHooks) {
    if !quit_approved(hooks).await {
        return;
    }
    match config.format {
        UpdateFormat::Native => hooks.lifecycle.quit_and_install().await,
        UpdateFormat::AppImage | UpdateFormat::Deb | UpdateFormat::Rpm => {
            // The update is already in place; installing is just a restart.
            if hooks.lifecycle.relaunch_supported() {
                hooks.lifecycle.relaunch().await;
            }
        }
    }
}

/// Run quit listeners; any of them may cancel the restart.
async fn quit_approved(hooks: &UpdaterHooks) -> bool {
    let intent = QuitIntent::new();
    hooks.lifecycle.before_quit(&intent).await;
    if intent.is_canceled() {
        info!(target: "updater", "install restart vetoed by quit listener");
        false
    } else {
        true
    }
}

/// The update format an app distributed for this platform uses when nothing
/// explicit is configured.
pub fn default_format_for(platform: Platform) -> UpdateFormat {
    match platform {
        Platform::Mac | Platform::Windows => UpdateFormat::Native,
        Platform::Linux => UpdateFormat::AppImage,
    }
}
