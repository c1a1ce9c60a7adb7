//! Shared fixtures for interpreter tests

#![allow(dead_code)]

use async_trait::async_trait;
use huebot_core::{Composite, DeviceRef, DeviceState, Loop, LoopMode, Pause, Step, TimeOption, Transition};
use huebot_script::{
    Device, DeviceGateway, DeviceInput, DeviceMapper, Dispatch, GatewayError,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

/// Route interpreter logs to the test output; filter with `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// How the mock answers for a device
#[derive(Debug, Clone)]
pub enum Reply {
    /// Succeed immediately
    Done,
    /// Fail the apply
    Fail(GatewayError),
    /// Succeed, acknowledging after a delay
    Ack(Duration),
    /// Succeed, never acknowledging
    NeverAck,
    /// Take this long to apply
    Slow(Duration),
}

#[derive(Debug, Clone)]
pub struct Call {
    pub device: String,
    pub state: DeviceState,
    pub at: Duration,
}

/// Recording gateway with per-device scripted replies
pub struct MockGateway {
    started: Instant,
    replies: HashMap<String, Reply>,
    calls: Mutex<Vec<Call>>,
    in_flight: Mutex<HashMap<String, usize>>,
    max_in_flight: Mutex<HashMap<String, usize>>,
    unacked: Mutex<Vec<oneshot::Sender<Result<(), GatewayError>>>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            replies: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            in_flight: Mutex::new(HashMap::new()),
            max_in_flight: Mutex::new(HashMap::new()),
            unacked: Mutex::new(Vec::new()),
        }
    }

    /// Script the reply for a device label such as `light:Desk`
    pub fn reply(mut self, device: &str, reply: Reply) -> Self {
        self.replies.insert(device.to_string(), reply);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, device: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.device == device)
            .collect()
    }

    /// Highest number of concurrent applies seen for one device
    pub fn max_in_flight(&self, device: &str) -> usize {
        self.max_in_flight
            .lock()
            .unwrap()
            .get(device)
            .copied()
            .unwrap_or(0)
    }

    fn enter(&self, device: &str) {
        let mut in_flight = self.in_flight.lock().unwrap();
        let n = in_flight.entry(device.to_string()).or_insert(0);
        *n += 1;
        let mut max = self.max_in_flight.lock().unwrap();
        let m = max.entry(device.to_string()).or_insert(0);
        *m = (*m).max(*n);
    }

    fn leave(&self, device: &str) {
        if let Some(n) = self.in_flight.lock().unwrap().get_mut(device) {
            *n -= 1;
        }
    }
}

#[async_trait]
impl DeviceGateway for MockGateway {
    async fn apply(&self, device: &Device, state: &DeviceState) -> Result<Dispatch, GatewayError> {
        let label = device.to_string();
        self.calls.lock().unwrap().push(Call {
            device: label.clone(),
            state: state.clone(),
            at: self.started.elapsed(),
        });

        self.enter(&label);
        let reply = self.replies.get(&label).cloned().unwrap_or(Reply::Done);
        let result = match reply {
            Reply::Done => Ok(Dispatch::Done),
            Reply::Fail(e) => Err(e),
            Reply::Ack(delay) => {
                let (tx, rx) = oneshot::channel();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(Ok(()));
                });
                Ok(Dispatch::Pending(rx))
            }
            Reply::NeverAck => {
                let (tx, rx) = oneshot::channel();
                self.unacked.lock().unwrap().push(tx);
                Ok(Dispatch::Pending(rx))
            }
            Reply::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(Dispatch::Done)
            }
        };
        self.leave(&label);
        result
    }
}

/// Desk(1), Lamp(2), Shelf(3), group Office(1); inputs $1 = Desk, $2 = Lamp
pub fn mapper() -> DeviceMapper {
    DeviceMapper::new(vec![
        Device::light(1, "Desk"),
        Device::light(2, "Lamp"),
        Device::light(3, "Shelf"),
        Device::group(1, "Office"),
    ])
    .with_inputs(vec![
        DeviceInput::Light("Desk".into()),
        DeviceInput::Light("Lamp".into()),
    ])
    .unwrap()
}

pub fn light(name: &str) -> DeviceRef {
    DeviceRef::Light(name.to_string())
}

/// Transition turning the named lights on
pub fn on(names: &[&str]) -> Transition {
    Transition::new(DeviceState::new().with_on(true)).on(names.iter().map(|n| light(n)).collect())
}

pub fn leaf(t: Transition) -> Step {
    Step::Transition(t)
}

pub fn serial(steps: Vec<Step>) -> Composite {
    Composite::new(steps)
}

pub fn counted(n: u64) -> Loop {
    Loop::new(LoopMode::Counted(n))
}

pub fn after(seconds: f64) -> Pause {
    Pause::after(TimeOption::seconds(seconds))
}

pub fn before(seconds: f64) -> Pause {
    Pause::before(TimeOption::seconds(seconds))
}
