//! Boot hook: run once by the host after boot completion to put the control
//! node back to the user's last choice.

use std::{path::Path, process::ExitCode, sync::Arc};

use fastcharge::{
    config::{PREFS_PATH, RESOURCE_PATH},
    logging, BootRestorer, Config, Controller, JsonPrefs, LocalBus, Sysfs,
};
use log::{error, info, LevelFilter};

fn main() -> ExitCode {
    logging::init(LevelFilter::Info);
    info!("fastcharge boot hook starting");

    let config = match Config::load(Path::new(RESOURCE_PATH)) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("CFG: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("NODE: {}", config.node_path().display());

    let prefs = Arc::new(JsonPrefs::open(PREFS_PATH));
    let controller = Arc::new(Controller::new(
        config,
        Arc::new(Sysfs),
        prefs,
        Arc::new(LocalBus::new()),
    ));

    let caps = controller.capabilities();
    info!(
        "NODE: {} ({})",
        if caps.supported { "ok" } else { "missing" },
        if caps.writable { "writable" } else { "read-only" }
    );

    // A missing node is normal on unsupported devices; the host only cares
    // whether the hook itself could start.
    let out = BootRestorer::new(controller).on_boot_completed();
    info!("BOOT: done (desired {}, written {})", out.desired, out.written);
    ExitCode::SUCCESS
}
