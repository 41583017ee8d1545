//! In-memory fieldbus: scripted register values per (host, slave, address),
//! injectable failures, and a log of every transaction with its start and end.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;

use fieldpoll::data_mgmt::process::{
    encode_energy, encode_flow, encode_temperature, EnergyEncoding,
};
use fieldpoll::helpers::StopTrigger;
use fieldpoll::readers::modbus_rtu_tcp::{
    Connector, EndpointKey, RegisterTransport, TransportError, TransportRegistry,
};
use fieldpoll::readers::protocol;

#[derive(Clone, Debug)]
pub struct Transaction {
    pub host: String,
    pub slave: u8,
    pub address: u16,
    pub start: Instant,
    pub end: Instant,
}

#[derive(Default)]
struct BusState {
    registers: Mutex<HashMap<(String, u8, u16), Vec<u16>>>,
    failing: Mutex<HashSet<(String, u8)>>,
    transactions: Mutex<Vec<Transaction>>,
    in_flight: Mutex<HashMap<String, usize>>,
    overlapped: AtomicBool,
    refuse: AtomicBool,
    connects: AtomicUsize,
    delay_ms: AtomicUsize,
    stop_after: Mutex<Option<(usize, StopTrigger)>>,
}

#[derive(Clone, Default)]
pub struct FakeBus {
    state: Arc<BusState>,
}

impl FakeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> Arc<TransportRegistry> {
        Arc::new(TransportRegistry::new(Arc::new(self.clone())))
    }

    pub fn set_registers(&self, host: &str, slave: u8, address: u16, registers: Vec<u16>) {
        self.state
            .registers
            .lock()
            .unwrap()
            .insert((host.to_string(), slave, address), registers);
    }

    pub fn set_temperature(&self, host: &str, slave: u8, celsius: f64) {
        self.set_registers(
            host,
            slave,
            protocol::TEMPERATURE.address,
            vec![encode_temperature(celsius), 0, 0],
        );
    }

    pub fn set_flow(&self, host: &str, slave: u8, lpm: f64) {
        self.set_registers(host, slave, protocol::FLOW.address, encode_flow(lpm).to_vec());
    }

    pub fn set_energy(&self, host: &str, slave: u8, kwh: f64, encoding: EnergyEncoding) {
        self.set_registers(
            host,
            slave,
            protocol::DEFAULT_ENERGY_REGISTER,
            encode_energy(kwh, encoding).to_vec(),
        );
    }

    /// Requests to this slave time out and break the connection
    pub fn fail_slave(&self, host: &str, slave: u8) {
        self.state
            .failing
            .lock()
            .unwrap()
            .insert((host.to_string(), slave));
    }

    pub fn refuse_connections(&self, refuse: bool) {
        self.state.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.state
            .delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    /// Fire `trigger` as soon as the `n`th transaction has completed
    pub fn stop_after(&self, n: usize, trigger: StopTrigger) {
        *self.state.stop_after.lock().unwrap() = Some((n, trigger));
    }

    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.state.transactions.lock().unwrap().clone()
    }

    /// Whether two transactions on one host were ever in flight together
    pub fn overlapped(&self) -> bool {
        self.state.overlapped.load(Ordering::SeqCst)
    }
}

impl Connector for FakeBus {
    fn connect<'a>(
        &'a self,
        endpoint: &'a EndpointKey,
    ) -> BoxFuture<'a, Result<Box<dyn RegisterTransport>, TransportError>> {
        Box::pin(async move {
            self.state.connects.fetch_add(1, Ordering::SeqCst);
            if self.state.refuse.load(Ordering::SeqCst) {
                return Err(TransportError::Connect {
                    endpoint: endpoint.clone(),
                    source: std::io::ErrorKind::ConnectionRefused.into(),
                });
            }
            Ok(Box::new(FakeTransport {
                host: endpoint.host.clone(),
                state: self.state.clone(),
                connected: true,
            }) as Box<dyn RegisterTransport>)
        })
    }
}

struct FakeTransport {
    host: String,
    state: Arc<BusState>,
    connected: bool,
}

impl RegisterTransport for FakeTransport {
    fn read_holding_registers(
        &mut self,
        slave: u8,
        address: u16,
        count: u16,
    ) -> BoxFuture<'_, Result<Vec<u16>, TransportError>> {
        Box::pin(async move {
            let start = Instant::now();
            {
                let mut in_flight = self.state.in_flight.lock().unwrap();
                let n = in_flight.entry(self.host.clone()).or_insert(0);
                *n += 1;
                if *n > 1 {
                    self.state.overlapped.store(true, Ordering::SeqCst);
                }
            }

            let delay = self.state.delay_ms.load(Ordering::SeqCst) as u64;
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            } else {
                tokio::task::yield_now().await;
            }

            let failing = self
                .state
                .failing
                .lock()
                .unwrap()
                .contains(&(self.host.clone(), slave));
            let stored = self
                .state
                .registers
                .lock()
                .unwrap()
                .get(&(self.host.clone(), slave, address))
                .cloned();

            *self
                .state
                .in_flight
                .lock()
                .unwrap()
                .get_mut(&self.host)
                .unwrap() -= 1;
            let completed = {
                let mut transactions = self.state.transactions.lock().unwrap();
                transactions.push(Transaction {
                    host: self.host.clone(),
                    slave,
                    address,
                    start,
                    end: Instant::now(),
                });
                transactions.len()
            };
            let mut stop_after = self.state.stop_after.lock().unwrap();
            if stop_after.as_ref().is_some_and(|(n, _)| *n == completed) {
                if let Some((_, trigger)) = stop_after.take() {
                    trigger.stop();
                }
            }
            drop(stop_after);

            if failing {
                self.connected = false;
                return Err(TransportError::Timeout(Duration::from_secs(3)));
            }
            match stored {
                Some(registers) => Ok(registers.into_iter().take(count as usize).collect()),
                None => Err(TransportError::Exception {
                    slave,
                    message: format!("IllegalDataAddress for register {:#06x}", address),
                }),
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
