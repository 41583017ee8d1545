//! A gateway stand-in answering Modbus RTU read-holding-registers frames on a
//! local TCP port. Runs on plain threads so blocking CLI tests can use it too.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

const READ_HOLDING_REGISTERS: u8 = 0x03;
const ILLEGAL_DATA_ADDRESS: u8 = 0x02;

/// CRC-16/MODBUS, transmitted low byte first
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for byte in data {
        crc ^= *byte as u16;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

#[derive(Default)]
struct State {
    registers: Mutex<HashMap<(u8, u16), Vec<u16>>>,
    requests: Mutex<Vec<[u8; 8]>>,
    drop_next: AtomicBool,
    connections: AtomicUsize,
}

#[derive(Clone)]
pub struct RtuResponder {
    port: u16,
    state: Arc<State>,
}

impl RtuResponder {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(State::default());

        let accept_state = state.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { return };
                accept_state.connections.fetch_add(1, Ordering::SeqCst);
                let state = accept_state.clone();
                thread::spawn(move || serve(stream, state));
            }
        });

        Self { port, state }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn set_registers(&self, slave: u8, address: u16, registers: Vec<u16>) {
        self.state
            .registers
            .lock()
            .unwrap()
            .insert((slave, address), registers);
    }

    /// Close the connection instead of answering the next request
    pub fn drop_next_request(&self) {
        self.state.drop_next.store(true, Ordering::SeqCst);
    }

    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Raw request frames received so far, CRC included
    pub fn requests(&self) -> Vec<[u8; 8]> {
        self.state.requests.lock().unwrap().clone()
    }
}

fn serve(mut stream: TcpStream, state: Arc<State>) {
    loop {
        let mut request = [0u8; 8];
        if stream.read_exact(&mut request).is_err() {
            return;
        }
        if crc16(&request[..6]).to_le_bytes() != [request[6], request[7]] {
            return;
        }
        state.requests.lock().unwrap().push(request);
        if state.drop_next.swap(false, Ordering::SeqCst) {
            return;
        }

        let slave = request[0];
        let function = request[1];
        let address = u16::from_be_bytes([request[2], request[3]]);
        let count = u16::from_be_bytes([request[4], request[5]]) as usize;

        let stored = state
            .registers
            .lock()
            .unwrap()
            .get(&(slave, address))
            .cloned();
        let mut response = match stored {
            Some(registers) if function == READ_HOLDING_REGISTERS && registers.len() >= count => {
                let mut frame = vec![slave, function, (count * 2) as u8];
                for register in &registers[..count] {
                    frame.extend_from_slice(&register.to_be_bytes());
                }
                frame
            }
            _ => vec![slave, function | 0x80, ILLEGAL_DATA_ADDRESS],
        };
        let crc = crc16(&response);
        response.extend_from_slice(&crc.to_le_bytes());

        if stream.write_all(&response).is_err() {
            return;
        }
    }
}
