//! SetuLink - link bridge daemon.
//!
//! Opens the configured byte link, spins the protocol engine and reports
//! connection liveness and receive-path statistics.

use setu_link::clock::SystemClock;
use setu_link::config::Config;
use setu_link::node::Node;
use setu_link::transport::{SerialTransport, TcpTransport, Transport};
use setu_link::{Error, Result};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn open_link(config: &Config) -> Result<Box<dyn Transport>> {
    match config.link.link_type.as_str() {
        "serial" => {
            let port = config
                .link
                .port
                .as_deref()
                .ok_or_else(|| Error::Config("serial link requires port".to_string()))?;
            Ok(Box::new(SerialTransport::open(port, config.link.baud_rate)?))
        }
        "tcp" => {
            let address = config
                .link
                .address
                .as_deref()
                .ok_or_else(|| Error::Config("tcp link requires address".to_string()))?;
            Ok(Box::new(TcpTransport::connect(address)?))
        }
        other => Err(Error::Config(format!("Unknown link type: {}", other))),
    }
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("SetuLink v0.2.0 starting...");

    // Get config path from args or default
    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "/etc/setu-link.toml".to_string());

    log::info!("Using config: {}", config_path);
    let config = Config::load(&config_path)?;
    log::info!("Link: {}", config.link.link_type);

    let link = open_link(&config)?;
    let mut node = Node::new(link, Box::new(SystemClock::new()));

    // Set up shutdown signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);

    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    log::info!("SetuLink running. Press Ctrl-C to stop.");

    let status_interval = Duration::from_millis(config.daemon.status_interval_ms);
    let mut last_status = Instant::now();
    let mut was_connected = false;

    while running.load(Ordering::Relaxed) {
        match node.spin() {
            // Nothing pending; sleep briefly to avoid a busy loop.
            Ok(0) => thread::sleep(Duration::from_millis(2)),
            Ok(_) => {}
            Err(Error::LinkClosed) => {
                log::info!("Peer closed the link");
                break;
            }
            Err(e) => {
                log::error!("Link error: {}", e);
                return Err(e);
            }
        }

        if node.connected() != was_connected {
            was_connected = node.connected();
            if was_connected {
                log::info!("Device connected");
            } else {
                log::warn!("Device connection lost");
            }
        }

        if last_status.elapsed() >= status_interval {
            last_status = Instant::now();
            let counters = node.counters();
            log::info!(
                "Link stats: state_err={} invalid_size={} checksum={} malformed={} connected={}",
                counters.state,
                counters.invalid_size,
                counters.checksum,
                counters.malformed_message,
                node.connected()
            );
        }
    }

    // Shutdown
    log::info!("Shutting down...");
    node.shutdown()?;

    log::info!("SetuLink stopped");
    Ok(())
}
