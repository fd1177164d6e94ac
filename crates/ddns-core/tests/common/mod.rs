//! Test doubles and common utilities for supervisor contract tests
//!
//! The doubles record every call so the tests can assert on what the
//! supervisor did without any network access.

#![allow(dead_code)]

use ddns_core::config::Configuration;
use ddns_core::error::{Error, Result};
use ddns_core::traits::{DdnsUpdater, HealthListener, IpDiscovery};
use ddns_core::{HealthState, ReconfigurationController, Scheduler, SharedConfig, UpdateCycle};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;

/// Discovery double returning a settable IP
pub struct StubDiscovery {
    ip: Mutex<IpAddr>,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
    call_count: AtomicUsize,
}

impl StubDiscovery {
    pub fn new(ip: IpAddr) -> Arc<Self> {
        Arc::new(Self {
            ip: Mutex::new(ip),
            failing: AtomicBool::new(false),
            delay: Mutex::new(None),
            call_count: AtomicUsize::new(0),
        })
    }

    pub fn set_ip(&self, ip: IpAddr) {
        *self.ip.lock().unwrap() = ip;
    }

    /// Make every following call fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delay every following call
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpDiscovery for StubDiscovery {
    async fn public_ip(&self) -> Result<IpAddr> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::network("API returned status: 503 Service Unavailable"));
        }
        Ok(*self.ip.lock().unwrap())
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Updater double recording every push
pub struct RecordingUpdater {
    pushes: Mutex<Vec<(String, IpAddr)>>,
    fail_with: Mutex<Option<u16>>,
    delay: Mutex<Option<Duration>>,
}

impl RecordingUpdater {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pushes: Mutex::new(Vec::new()),
            fail_with: Mutex::new(None),
            delay: Mutex::new(None),
        })
    }

    /// Answer every following push with this HTTP status (None = 200)
    pub fn set_failure(&self, status: Option<u16>) {
        *self.fail_with.lock().unwrap() = status;
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn update_call_count(&self) -> usize {
        self.pushes.lock().unwrap().len()
    }

    /// (ddns target, ip) of every push, in order
    pub fn pushes(&self) -> Vec<(String, IpAddr)> {
        self.pushes.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DdnsUpdater for RecordingUpdater {
    async fn push_update(&self, config: &Configuration, ip: IpAddr) -> Result<()> {
        self.pushes.lock().unwrap().push((config.ddns.clone(), ip));

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match *self.fail_with.lock().unwrap() {
            Some(status) => Err(Error::update(format!("status: {}", status))),
            None => Ok(()),
        }
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }
}

/// Listener double recording start/stop calls
pub struct MockListener {
    starts: Mutex<Vec<u16>>,
    stop_count: AtomicUsize,
    running: Mutex<Option<u16>>,
    refuse_port: Mutex<Option<u16>>,
}

impl MockListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            starts: Mutex::new(Vec::new()),
            stop_count: AtomicUsize::new(0),
            running: Mutex::new(None),
            refuse_port: Mutex::new(None),
        })
    }

    /// Fail to bind this port
    pub fn refuse(&self, port: u16) {
        *self.refuse_port.lock().unwrap() = Some(port);
    }

    pub fn starts(&self) -> Vec<u16> {
        self.starts.lock().unwrap().clone()
    }

    pub fn stop_count(&self) -> usize {
        self.stop_count.load(Ordering::SeqCst)
    }

    pub fn running_port(&self) -> Option<u16> {
        *self.running.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl HealthListener for MockListener {
    async fn start(&self, port: u16) -> Result<()> {
        self.starts.lock().unwrap().push(port);
        if *self.refuse_port.lock().unwrap() == Some(port) {
            return Err(Error::listener(format!("address 0.0.0.0:{} in use", port)));
        }
        *self.running.lock().unwrap() = Some(port);
        Ok(())
    }

    async fn stop(&self) {
        self.stop_count.fetch_add(1, Ordering::SeqCst);
        *self.running.lock().unwrap() = None;
    }
}

/// Parse an IP literal
pub fn ip(text: &str) -> IpAddr {
    text.parse().expect("valid IP literal")
}

/// The configuration used by most tests
pub fn test_config() -> Configuration {
    Configuration::new("a", "b", "x.example").with_interval(120)
}

/// A fully wired supervisor built from doubles
pub struct Harness {
    pub discovery: Arc<StubDiscovery>,
    pub updater: Arc<RecordingUpdater>,
    pub listener: Arc<MockListener>,
    pub config: SharedConfig,
    pub health: Arc<HealthState>,
    pub cycle: Arc<UpdateCycle>,
    pub scheduler: Arc<Scheduler>,
    pub controller: ReconfigurationController,
}

impl Harness {
    /// Wire everything; `active` is placed in the shared config slot
    pub fn new(discovered_ip: IpAddr, active: Option<Configuration>) -> Self {
        let discovery = StubDiscovery::new(discovered_ip);
        let updater = RecordingUpdater::new();
        let listener = MockListener::new();
        let config: SharedConfig = Arc::new(RwLock::new(active));
        let health = Arc::new(HealthState::new());

        let cycle = Arc::new(UpdateCycle::new(
            discovery.clone(),
            updater.clone(),
            config.clone(),
            health.clone(),
        ));
        let scheduler = Arc::new(Scheduler::new(cycle.clone()));
        let controller =
            ReconfigurationController::new(config.clone(), scheduler.clone(), listener.clone());

        Self {
            discovery,
            updater,
            listener,
            config,
            health,
            cycle,
            scheduler,
            controller,
        }
    }

    /// Harness whose config slot already holds [`test_config`]
    pub fn with_test_config(discovered_ip: IpAddr) -> Self {
        Self::new(discovered_ip, Some(test_config()))
    }
}
