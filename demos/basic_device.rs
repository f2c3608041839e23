//! Minimal device: connects, logs every state transition, handles a single
//! virtual pin write, and replies to it.

use std::env;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use blynklink::config::DeviceConfig;
use blynklink::{ConnectionState, Device};

fn main() {
    env_logger::init();

    let device = match env::args().nth(1) {
        Some(path) => {
            let config = DeviceConfig::from_file(&path)
                .unwrap_or_else(|e| panic!("failed to load {path}: {e}"));
            Device::with_config(config)
        }
        None => Device::begin(env::var("BLYNK_AUTH_TOKEN").unwrap_or_default()),
    }
    .expect("failed to set up device runtime");

    device.set_state_observer(Box::new(|state, reason| match state {
        ConnectionState::Authenticated => log::info!("authenticated"),
        ConnectionState::Disconnected => log::warn!("disconnected: {reason:?}"),
        _ => log::info!("state -> {state:?}"),
    }));

    let last_value = Arc::new(AtomicI32::new(0));
    let lv = last_value.clone();
    device
        .register_command_handler(
            "vw",
            Box::new(move |params, _| {
                if let Some(value) = params.argv.get(1).and_then(|s| s.parse::<i32>().ok()) {
                    lv.store(value, Ordering::SeqCst);
                    log::info!("virtual pin {:?} <- {value}", params.argv.first());
                }
            }),
            Box::new(()),
        )
        .expect("registering the vw handler cannot fail on a fresh device");

    if let Err(e) = device.run() {
        log::error!("runtime exited: {e}");
    }
}
