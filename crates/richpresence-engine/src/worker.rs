//! The background thread that owns the IPC connection.
//!
//! The service talks to it only through [`Command`]s. Between commands it
//! drains whatever the desktop client has queued: pings are answered, a
//! `Close` frame or an error event ends the connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use richpresence_frame::Opcode;
use richpresence_ipc::{Activity, IpcClient, IpcError};
use richpresence_transport::Discovery;
use tracing::{debug, trace, warn};

pub(crate) enum Command {
    SetActivity {
        activity: Activity,
        reply: Sender<richpresence_ipc::Result<()>>,
    },
    Stop {
        clear: bool,
        ack: Sender<()>,
    },
}

/// Flags shared between the service and its worker.
#[derive(Debug, Default)]
pub(crate) struct WorkerFlags {
    /// Set by the service when the worker must exit without further I/O.
    pub cancelled: AtomicBool,
    /// Set by the worker when the connection ended on its own.
    pub lost: AtomicBool,
}

pub(crate) struct Worker<D: Discovery> {
    client: IpcClient<D>,
    commands: Receiver<Command>,
    poll_interval: Duration,
    flags: Arc<WorkerFlags>,
}

impl<D: Discovery> Worker<D> {
    pub(crate) fn new(
        client: IpcClient<D>,
        commands: Receiver<Command>,
        poll_interval: Duration,
        flags: Arc<WorkerFlags>,
    ) -> Self {
        Self {
            client,
            commands,
            poll_interval,
            flags,
        }
    }

    pub(crate) fn run(mut self) {
        let mut last_drain = Instant::now();
        loop {
            if self.flags.cancelled.load(Ordering::Acquire) {
                debug!("presence worker cancelled");
                break;
            }

            let wait = self.poll_interval.saturating_sub(last_drain.elapsed());
            match self.commands.recv_timeout(wait) {
                Ok(Command::SetActivity { activity, reply }) => {
                    let result = self.client.set_activity(&activity);
                    let failed = result.is_err();
                    let _ = reply.send(result);
                    if failed {
                        self.flags.lost.store(true, Ordering::Release);
                        break;
                    }
                }
                Ok(Command::Stop { clear, ack }) => {
                    if clear {
                        if let Err(err) = self.client.clear_activity() {
                            debug!(error = %err, "could not clear presence");
                        }
                    }
                    self.client.close();
                    let _ = ack.send(());
                    return;
                }
                Err(RecvTimeoutError::Timeout) => {
                    last_drain = Instant::now();
                    if let Err(err) = self.drain() {
                        warn!(error = %err, "desktop client connection lost");
                        self.flags.lost.store(true, Ordering::Release);
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.client.close();
    }

    /// Handle every frame that is already queued, without waiting for more.
    fn drain(&mut self) -> richpresence_ipc::Result<()> {
        while self.client.has_pending_data()? {
            if self.flags.cancelled.load(Ordering::Acquire) {
                return Ok(());
            }
            let frame = self.client.receive()?;
            match frame.opcode {
                Opcode::Ping => {
                    trace!(len = frame.payload.len(), "ping");
                    self.client.send_raw(Opcode::Pong, &frame.payload)?;
                }
                Opcode::Close => return Err(IpcError::from_close_payload(&frame.payload)),
                Opcode::Message => {
                    if let Some(err) = IpcError::from_error_event(&frame.payload) {
                        return Err(err);
                    }
                }
                other => trace!(opcode = %other, "ignoring frame"),
            }
        }
        Ok(())
    }
}
