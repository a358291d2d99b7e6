use hvaclink::server::Client;

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{server_error, CliResult, SUCCESS};
use crate::output::{print_packet, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let frame = args.frame.frame_config();
    let delimiters = frame.delimiters;

    let mut client =
        Client::connect_addr(args.addr, frame).map_err(|err| server_error("connect failed", err))?;
    client
        .send(&args.command, &args.data)
        .map_err(|err| server_error("send failed", err))?;

    if args.wait {
        // Unrecognised commands get no response; that surfaces as a timeout.
        let packet = client
            .recv(Some(wait_timeout))
            .map_err(|err| server_error("receive failed", err))?;
        print_packet(&packet, client.peer_addr(), &delimiters, format);
    }

    Ok(SUCCESS)
}
