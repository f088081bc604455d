//! A scripted stand-in for the Discord desktop client.
#![allow(dead_code)]

use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use richpresence_engine::{Config, ManualClock, PresenceOptions, PresenceService};
use richpresence_frame::{Frame, FrameReader, FrameWriter, Opcode};
use richpresence_transport::{channel_name, LocalDiscovery};
use serde_json::Value;

pub const APP_ID: &str = "1472653254188859422";
pub const START_EPOCH: u64 = 1_700_000_000;

const READY: &[u8] =
    br#"{"cmd":"DISPATCH","evt":"READY","data":{"v":1,"user":{"id":"7","username":"steve"}}}"#;

pub fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/rp-engine-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

pub fn test_options() -> PresenceOptions {
    PresenceOptions {
        poll_interval: Duration::from_millis(20),
        stop_grace: Duration::from_secs(1),
        handshake_timeout: Duration::from_secs(2),
    }
}

pub fn configured() -> Config {
    Config {
        application_id: APP_ID.into(),
        ..Config::default()
    }
}

/// Service wired to `fake` with a manual clock at [`START_EPOCH`].
pub fn service_for<C: richpresence_engine::ConfigStore>(
    fake: &FakeDiscord,
    config: C,
) -> (PresenceService<C, LocalDiscovery, ManualClock>, ManualClock) {
    let clock = ManualClock::new(START_EPOCH);
    let service =
        PresenceService::with_parts(config, fake.discovery(), clock.clone(), test_options());
    (service, clock)
}

pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) {
    let start = Instant::now();
    while !condition() {
        if start.elapsed() >= timeout {
            panic!("condition not met within {timeout:?}");
        }
        thread::sleep(Duration::from_millis(10));
    }
}

pub struct FakeDiscord {
    dir: PathBuf,
    path: PathBuf,
    frames: Receiver<Frame>,
    outbound: Arc<Mutex<Option<UnixStream>>>,
    connections: Arc<AtomicUsize>,
    stop: Arc<AtomicBool>,
    acceptor: Option<JoinHandle<()>>,
}

impl FakeDiscord {
    pub fn start(tag: &str) -> Self {
        Self::start_at(tag, 0)
    }

    /// Listen as candidate `index` in a fresh directory.
    pub fn start_at(tag: &str, index: u8) -> Self {
        let dir = unique_temp_dir(tag);
        let path = dir.join(channel_name(index));
        let listener = UnixListener::bind(&path).expect("fake peer should bind");

        let (tx, frames) = mpsc::channel();
        let outbound = Arc::new(Mutex::new(None));
        let connections = Arc::new(AtomicUsize::new(0));
        let stop = Arc::new(AtomicBool::new(false));

        let acceptor = {
            let outbound = Arc::clone(&outbound);
            let connections = Arc::clone(&connections);
            let stop = Arc::clone(&stop);
            thread::spawn(move || accept_loop(listener, tx, outbound, connections, stop))
        };

        Self {
            dir,
            path,
            frames,
            outbound,
            connections,
            stop,
            acceptor: Some(acceptor),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn discovery(&self) -> LocalDiscovery {
        LocalDiscovery::with_dir(&self.dir)
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn next_frame(&self, timeout: Duration) -> Option<Frame> {
        self.frames.recv_timeout(timeout).ok()
    }

    fn expect_frame(&self, opcode: Opcode) -> Frame {
        let frame = self
            .next_frame(Duration::from_secs(3))
            .unwrap_or_else(|| panic!("expected a {opcode} frame"));
        assert_eq!(frame.opcode, opcode, "unexpected frame {frame:?}");
        frame
    }

    /// Next frame must be a handshake; returns its JSON body.
    pub fn expect_handshake(&self) -> Value {
        let frame = self.expect_frame(Opcode::Handshake);
        serde_json::from_slice(&frame.payload).expect("handshake should be JSON")
    }

    /// Next frame must be a `SET_ACTIVITY` message; returns `args.activity`.
    pub fn expect_activity(&self) -> Value {
        let frame = self.expect_frame(Opcode::Message);
        let body: Value = serde_json::from_slice(&frame.payload).expect("message should be JSON");
        assert_eq!(body["cmd"], "SET_ACTIVITY");
        assert_eq!(body["args"]["pid"], std::process::id());
        body["args"]["activity"].clone()
    }

    pub fn expect_pong(&self) -> Frame {
        self.expect_frame(Opcode::Pong)
    }

    pub fn assert_quiet(&self, window: Duration) {
        if let Some(frame) = self.next_frame(window) {
            panic!("expected no frames, got {frame:?}");
        }
    }

    /// Push a frame to the most recent connection.
    pub fn send(&self, opcode: Opcode, payload: &[u8]) {
        let guard = self.outbound.lock().expect("outbound lock");
        let stream = guard.as_ref().expect("a client should be connected");
        FrameWriter::new(stream)
            .send(opcode, payload)
            .expect("fake peer write should succeed");
    }

    /// Drop the most recent connection without a `Close` frame.
    pub fn hang_up(&self) {
        if let Some(stream) = self.outbound.lock().expect("outbound lock").take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
    }
}

impl Drop for FakeDiscord {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = UnixStream::connect(&self.path);
        if let Some(acceptor) = self.acceptor.take() {
            let _ = acceptor.join();
        }
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

fn accept_loop(
    listener: UnixListener,
    tx: Sender<Frame>,
    outbound: Arc<Mutex<Option<UnixStream>>>,
    connections: Arc<AtomicUsize>,
    stop: Arc<AtomicBool>,
) {
    for incoming in listener.incoming() {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        let Ok(stream) = incoming else {
            continue;
        };
        let (Ok(reply), Ok(shared)) = (stream.try_clone(), stream.try_clone()) else {
            continue;
        };
        connections.fetch_add(1, Ordering::SeqCst);
        *outbound.lock().expect("outbound lock") = Some(shared);

        let tx = tx.clone();
        thread::spawn(move || serve(stream, reply, tx));
    }
}

fn serve(stream: UnixStream, reply: UnixStream, tx: Sender<Frame>) {
    let mut reader = FrameReader::new(stream);
    let Ok(hello) = reader.read_frame() else {
        return;
    };
    if tx.send(hello).is_err() {
        return;
    }
    if FrameWriter::new(reply).send(Opcode::Message, READY).is_err() {
        return;
    }
    while let Ok(frame) = reader.read_frame() {
        if tx.send(frame).is_err() {
            break;
        }
    }
}
