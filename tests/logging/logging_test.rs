//! Subscriber installation for the `serve` and one-shot modes.

use std::io::Write;
use std::sync::{Arc, Mutex};

use geopothole::config::GeopotholeConfig;
use geopothole::logging::LoggingGuard;

#[test]
fn logging_guard_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<LoggingGuard>();
}

#[test]
fn init_production_creates_logs_dir_then_refuses_a_second_subscriber() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let logs_dir = tmp.path().join("nested").join("logs");
    assert!(!logs_dir.exists());

    // Only one global subscriber per process; this file owns it.
    let first = geopothole::logging::init_production(&logs_dir, "debug");
    assert!(logs_dir.exists(), "logs directory should be created");
    assert!(first.is_ok());

    let second = geopothole::logging::init_production(&logs_dir, "debug");
    assert!(second.is_err());

    // One-shot init tolerates an existing subscriber.
    geopothole::logging::init_cli("info");
}

/// Shared in-memory sink standing in for stderr.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("lock")).into_owned()
    }
}

#[test]
fn config_warnings_reach_the_startup_subscriber() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let config_path = tmp.path().join("absent.toml").display().to_string();
    let sink = Captured::default();
    let writer = sink.clone();

    let config = geopothole::logging::with_startup_logging(
        "info",
        move || writer.clone(),
        || {
            GeopotholeConfig::load_with(|key| match key {
                "GEOPOTHOLE_CONFIG_PATH" => Some(config_path.clone()),
                "GEOPOTHOLE_PORT" => Some("not-a-port".to_owned()),
                _ => None,
            })
        },
    )
    .expect("load");

    assert_eq!(config.server.port, 5000, "invalid override ignored");
    let logged = sink.text();
    assert!(logged.contains("ignoring invalid env override"), "{logged}");
    assert!(logged.contains("GEOPOTHOLE_PORT"), "{logged}");
}
