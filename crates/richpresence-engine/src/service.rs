use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use richpresence_ipc::{Activity, HandshakeConfig, IpcClient, IpcError, ShutdownHandle};
use richpresence_transport::{Discovery, LocalDiscovery};
use tracing::{debug, info, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::ConfigStore;
use crate::sampler::StateSampler;
use crate::snapshot::PresenceSnapshot;
use crate::worker::{Command, Worker, WorkerFlags};

/// Name of the background thread that owns the connection.
pub const WORKER_THREAD_NAME: &str = "presence-ipc";

/// Engine tuning that is not part of the user config.
#[derive(Debug, Clone)]
pub struct PresenceOptions {
    /// How often the worker drains inbound frames.
    pub poll_interval: Duration,
    /// How long `stop()` waits for the worker to clear and close before
    /// force-shutting the stream.
    pub stop_grace: Duration,
    /// Upper bound on one candidate's handshake round-trip.
    pub handshake_timeout: Duration,
}

impl Default for PresenceOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            stop_grace: Duration::from_secs(2),
            handshake_timeout: Duration::from_secs(5),
        }
    }
}

struct Running {
    commands: Sender<Command>,
    worker: JoinHandle<()>,
    flags: Arc<WorkerFlags>,
    shutdown: Option<ShutdownHandle>,
    pipe_index: Option<u8>,
}

/// Keeps the desktop presence in sync with the host.
///
/// The host calls [`start`](Self::start) once, then
/// [`on_tick`](Self::on_tick) from its own loop. Updates are rate-limited by
/// `updateIntervalSeconds` and only sent when the sampled snapshot changed.
/// Connection failures never reach the host: they are logged and the service
/// stops itself.
pub struct PresenceService<C: ConfigStore, D = LocalDiscovery, K = SystemClock>
where
    D: Discovery + Clone + 'static,
    K: Clock,
{
    config: C,
    discovery: D,
    clock: K,
    options: PresenceOptions,
    running: Option<Running>,
    last_snapshot: Option<PresenceSnapshot>,
    next_update: Option<Instant>,
    start_epoch_seconds: u64,
}

impl<C: ConfigStore> PresenceService<C> {
    /// Service using the platform discovery and the system clock.
    pub fn new(config: C) -> Self {
        Self::with_parts(
            config,
            LocalDiscovery::default(),
            SystemClock,
            PresenceOptions::default(),
        )
    }
}

impl<C, D, K> PresenceService<C, D, K>
where
    C: ConfigStore,
    D: Discovery + Clone + 'static,
    K: Clock,
{
    pub fn with_parts(config: C, discovery: D, clock: K, options: PresenceOptions) -> Self {
        Self {
            config,
            discovery,
            clock,
            options,
            running: None,
            last_snapshot: None,
            next_update: None,
            start_epoch_seconds: 0,
        }
    }

    /// Connect and start the keep-alive worker.
    ///
    /// Does nothing when already started or disabled. A missing application
    /// id or an absent desktop client is logged and leaves the service
    /// stopped.
    pub fn start(&mut self) {
        if self.running.is_some() {
            return;
        }

        let config = self.config.get();
        if !config.enabled {
            debug!("presence disabled in config");
            return;
        }

        let Some(application_id) = config.application_id() else {
            warn!("application id is not set; update applicationId in the config");
            return;
        };

        let mut client =
            IpcClient::new(self.discovery.clone()).with_handshake_config(HandshakeConfig {
                timeout: Some(self.options.handshake_timeout),
            });
        if !client.connect(application_id) {
            warn!("could not connect to Discord IPC; make sure the desktop app is running");
            return;
        }

        let pipe_index = client.pipe_index();
        let shutdown = match client.shutdown_handle() {
            Ok(handle) => Some(handle),
            Err(err) => {
                debug!(error = %err, "no shutdown handle for connection");
                None
            }
        };

        let (commands, inbox) = mpsc::channel();
        let flags = Arc::new(WorkerFlags::default());
        let worker = Worker::new(
            client,
            inbox,
            self.options.poll_interval,
            Arc::clone(&flags),
        );
        let worker = match thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker.run())
        {
            Ok(handle) => handle,
            Err(err) => {
                warn!(error = %err, "failed to spawn presence worker");
                return;
            }
        };

        self.start_epoch_seconds = self.clock.epoch_seconds();
        self.last_snapshot = None;
        self.next_update = None;
        self.running = Some(Running {
            commands,
            worker,
            flags,
            shutdown,
            pipe_index,
        });
        info!(pipe_index, "presence started");
    }

    /// Clear the presence (best-effort), close the connection and join the
    /// worker. Does nothing when not started.
    pub fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        let (ack, acked) = mpsc::channel();
        let graceful = running
            .commands
            .send(Command::Stop { clear: true, ack })
            .is_ok()
            && acked.recv_timeout(self.options.stop_grace).is_ok();

        if !graceful {
            running.flags.cancelled.store(true, Ordering::Release);
            if let Some(handle) = &running.shutdown {
                if let Err(err) = handle.shutdown() {
                    debug!(error = %err, "force shutdown failed");
                }
            }
        }

        drop(running.commands);
        if running.worker.join().is_err() {
            warn!("presence worker panicked");
        }
        debug!(graceful, "presence stopped");
    }

    /// Stop, then start with the current config (e.g. a new application id).
    pub fn restart(&mut self) {
        self.stop();
        self.start();
    }

    /// One host tick.
    ///
    /// Samples and sends at most once per update interval, and only when the
    /// snapshot changed since the last send.
    pub fn on_tick<S: StateSampler + ?Sized>(&mut self, sampler: &S) {
        let Some(running) = self.running.as_ref() else {
            return;
        };
        if running.flags.lost.load(Ordering::Acquire) {
            warn!("desktop client went away; stopping presence");
            self.stop();
            return;
        }

        let config = self.config.get();
        if !config.enabled {
            self.stop();
            return;
        }

        let now = self.clock.now();
        if self.next_update.is_some_and(|deadline| now < deadline) {
            return;
        }
        // Saturate on overflow; the gate must stay closed.
        self.next_update = Some(
            now.checked_add(config.update_interval())
                .unwrap_or_else(|| far_deadline(now)),
        );

        let snapshot = sampler.sample(&config);
        if self.last_snapshot.as_ref() == Some(&snapshot) {
            trace!("presence unchanged");
            return;
        }
        let activity = snapshot.to_activity(self.start_epoch_seconds);
        self.last_snapshot = Some(snapshot);

        if let Err(err) = self.send_activity(activity) {
            warn!(error = %err, "failed to update presence");
            self.stop();
        }
    }

    fn send_activity(&self, activity: Activity) -> richpresence_ipc::Result<()> {
        let running = self.running.as_ref().ok_or(IpcError::NotConnected)?;
        let (reply, replied) = mpsc::channel();
        running
            .commands
            .send(Command::SetActivity { activity, reply })
            .map_err(|_| IpcError::NotConnected)?;
        replied.recv().map_err(|_| IpcError::NotConnected)?
    }

    pub fn is_started(&self) -> bool {
        self.running.is_some()
    }

    /// Started and the connection has not been reported lost.
    pub fn is_connected(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.flags.lost.load(Ordering::Acquire))
    }

    pub fn pipe_index(&self) -> Option<u8> {
        self.running.as_ref().and_then(|running| running.pipe_index)
    }

    /// Last snapshot handed to the connection.
    pub fn last_snapshot(&self) -> Option<&PresenceSnapshot> {
        self.last_snapshot.as_ref()
    }
}

/// Latest deadline after `now` that `Instant` can represent.
fn far_deadline(now: Instant) -> Instant {
    let mut step = Duration::from_secs(u64::MAX);
    loop {
        if let Some(deadline) = now.checked_add(step) {
            return deadline;
        }
        if step.is_zero() {
            return now;
        }
        step /= 2;
    }
}

impl<C, D, K> Drop for PresenceService<C, D, K>
where
    C: ConfigStore,
    D: Discovery + Clone + 'static,
    K: Clock,
{
    fn drop(&mut self) {
        self.stop();
    }
}

impl<C, D, K> std::fmt::Debug for PresenceService<C, D, K>
where
    C: ConfigStore,
    D: Discovery + Clone + 'static,
    K: Clock,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceService")
            .field("started", &self.is_started())
            .field("connected", &self.is_connected())
            .field("pipe_index", &self.pipe_index())
            .finish_non_exhaustive()
    }
}
