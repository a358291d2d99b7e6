use hvaclink::server::{spawn_processor, Server, ServerHandle};
use hvaclink::zone::ZoneController;
use tracing::{debug, info, warn};

use crate::cmd::{parse_duration, ServeArgs};
use crate::exit::{io_error, server_error, status_code, CliError, CliResult, INTERNAL};

pub fn run(args: ServeArgs) -> CliResult<i32> {
    let reply_timeout = parse_duration(&args.reply_timeout)?;
    let config = args.server_config()?;

    let zones = ZoneController::with_set_temperature(args.set_temperature)
        .with_delimiters(config.frame.delimiters);
    let (processor, worker) = spawn_processor(zones, reply_timeout)
        .map_err(|err| io_error("processor start failed", err))?;
    debug!(reply_timeout = ?processor.reply_timeout(), "zone processor started");

    let mut server = match Server::bind(config, processor) {
        Ok(server) => server,
        Err(err) => {
            join_worker(worker);
            return Err(server_error("bind failed", err));
        }
    };
    install_ctrlc_handler(server.handle())?;
    info!(local_addr = %server.local_addr(), "serving thermostat zones");

    let result = server.run();
    let status = server.status();
    // The worker exits once its last client, owned by the server, is gone.
    drop(server);
    join_worker(worker);

    result.map_err(|err| server_error("server loop failed", err))?;
    info!(%status, "server stopped");
    Ok(status_code(status))
}

fn join_worker(worker: std::thread::JoinHandle<()>) {
    if worker.join().is_err() {
        warn!("zone processor thread panicked");
    }
}

fn install_ctrlc_handler(handle: ServerHandle) -> CliResult<()> {
    ctrlc::set_handler(move || handle.stop()).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })
}
