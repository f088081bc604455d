use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use richpresence_engine::{
    Config, HostState, PresenceOptions, PresenceService, ServerSession, SystemClock,
};
use serde::Serialize;
use tracing::info;

use crate::cmd::{discovery, RunArgs};
use crate::exit::{
    config_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS, TRANSPORT_ERROR, USAGE,
};
use crate::output::{or_dash, print_record, OutputFormat};

/// Host loop period; the service itself rate-limits updates.
const TICK: Duration = Duration::from_millis(50);

#[derive(Serialize)]
struct RunOutput {
    config: String,
    pipe_index: Option<u8>,
    host_state: String,
}

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let config = Config::load_or_create(&args.config)
        .map_err(|err| config_error("failed to load config", err))?;
    if !config.enabled {
        info!(path = %args.config.display(), "presence is disabled in config");
        return Ok(SUCCESS);
    }
    if config.application_id().is_none() {
        return Err(CliError::new(
            USAGE,
            format!(
                "applicationId is not set; edit {} and try again",
                args.config.display()
            ),
        ));
    }

    let state = host_state(&args);
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut service = PresenceService::with_parts(
        config,
        discovery(args.ipc_dir.as_ref()),
        SystemClock,
        PresenceOptions::default(),
    );
    service.start();
    if !service.is_started() {
        return Err(CliError::new(
            TRANSPORT_ERROR,
            "could not connect to Discord; make sure the desktop app is running",
        ));
    }

    let out = RunOutput {
        config: args.config.display().to_string(),
        pipe_index: service.pipe_index(),
        host_state: describe(&state),
    };
    print_record(
        &out,
        &[
            ("config", out.config.clone()),
            (
                "pipe_index",
                or_dash(out.pipe_index.map(|index| index.to_string()).as_deref()),
            ),
            ("host_state", out.host_state.clone()),
        ],
        format,
    );

    while running.load(Ordering::SeqCst) && service.is_started() {
        service.on_tick(&state);
        std::thread::sleep(TICK);
    }

    let lost = !service.is_started();
    service.stop();
    if lost {
        return Err(CliError::new(FAILURE, "desktop client went away"));
    }
    Ok(SUCCESS)
}

fn host_state(args: &RunArgs) -> HostState {
    if let Some(address) = &args.address {
        let mut session = ServerSession::new(address.trim());
        session.motd = args.motd.clone().unwrap_or_default();
        return HostState::Multiplayer(session);
    }
    match args.singleplayer {
        Some(dimension) => HostState::Singleplayer { dimension },
        None => HostState::Menu,
    }
}

fn describe(state: &HostState) -> String {
    match state {
        HostState::Menu => "menu".to_string(),
        HostState::Singleplayer { dimension } => format!("singleplayer ({dimension})"),
        HostState::Multiplayer(session) => format!("multiplayer ({})", session.address),
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
