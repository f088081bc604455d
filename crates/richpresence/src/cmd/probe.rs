use std::time::Duration;

use richpresence_ipc::{HandshakeConfig, IpcClient};
use serde::Serialize;

use crate::cmd::{discovery, ProbeArgs};
use crate::exit::{ipc_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{or_dash, print_record, OutputFormat};

#[derive(Serialize)]
struct ProbeOutput {
    connected: bool,
    pipe_index: Option<u8>,
    accepted_with: String,
    user: Option<String>,
}

pub fn run(args: ProbeArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_timeout(&args.timeout)?;
    let mut client = IpcClient::new(discovery(args.ipc_dir.as_ref()))
        .with_handshake_config(HandshakeConfig {
            timeout: Some(timeout),
        });

    let result = client
        .try_connect(args.app_id.trim())
        .map_err(|err| ipc_error("no desktop client accepted the handshake", err))?;

    let out = ProbeOutput {
        connected: true,
        pipe_index: client.pipe_index(),
        accepted_with: result.accepted_with.to_string(),
        user: result.user,
    };
    client.close();

    print_record(
        &out,
        &[
            ("connected", out.connected.to_string()),
            (
                "pipe_index",
                out.pipe_index
                    .map(|index| index.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            ("accepted_with", out.accepted_with.clone()),
            ("user", or_dash(out.user.as_deref())),
        ],
        format,
    );
    Ok(SUCCESS)
}

fn parse_timeout(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "timeout must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
