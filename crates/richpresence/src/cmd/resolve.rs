use richpresence_engine::{resolve_display_name, resolve_host, resolve_icon_key};
use serde::Serialize;

use crate::cmd::ResolveArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct ResolveOutput {
    address: String,
    host: String,
    display_name: String,
    icon_key: String,
}

pub fn run(args: ResolveArgs, format: OutputFormat) -> CliResult<i32> {
    let out = ResolveOutput {
        host: resolve_host(&args.address),
        display_name: resolve_display_name(&args.motd, &args.address),
        icon_key: resolve_icon_key(&args.address, &args.fallback_icon),
        address: args.address,
    };

    print_record(
        &out,
        &[
            ("address", out.address.clone()),
            ("host", out.host.clone()),
            ("display_name", out.display_name.clone()),
            ("icon_key", out.icon_key.clone()),
        ],
        format,
    );
    Ok(SUCCESS)
}
