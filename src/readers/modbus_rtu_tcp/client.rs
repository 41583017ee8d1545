use std::io;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_modbus::client::{rtu, Context, Reader};
use tokio_modbus::prelude::{Slave, SlaveContext};

use super::registry::{Connector, EndpointKey, RegisterTransport, TransportError};

/// Opens Modbus RTU sessions tunnelled through a TCP gateway
///
/// The gateways forward raw RTU frames (slave id, PDU, CRC-16) between the TCP
/// socket and the RS-485 line, so RTU framing is layered on the TCP stream.
pub struct RtuOverTcpConnector {
    io_timeout: Duration,
}

impl RtuOverTcpConnector {
    pub fn new(io_timeout: Duration) -> Self {
        Self { io_timeout }
    }
}

impl Connector for RtuOverTcpConnector {
    fn connect<'a>(
        &'a self,
        endpoint: &'a EndpointKey,
    ) -> BoxFuture<'a, Result<Box<dyn RegisterTransport>, TransportError>> {
        Box::pin(async move {
            let stream = match timeout(
                self.io_timeout,
                TcpStream::connect((endpoint.host.as_str(), endpoint.port)),
            )
            .await
            {
                Ok(Ok(stream)) => stream,
                Ok(Err(source)) => {
                    return Err(TransportError::Connect {
                        endpoint: endpoint.clone(),
                        source,
                    })
                }
                Err(_) => {
                    return Err(TransportError::ConnectTimeout {
                        endpoint: endpoint.clone(),
                    })
                }
            };
            if let Err(e) = stream.set_nodelay(true) {
                log::debug!("Could not set TCP_NODELAY for {}: {}", endpoint, e);
            }

            Ok(Box::new(ModbusRtuTransport {
                context: rtu::attach(stream),
                io_timeout: self.io_timeout,
                connected: true,
            }) as Box<dyn RegisterTransport>)
        })
    }
}

/// RTU client over one TCP connection
pub struct ModbusRtuTransport {
    context: Context,
    io_timeout: Duration,
    connected: bool,
}

impl RegisterTransport for ModbusRtuTransport {
    fn read_holding_registers(
        &mut self,
        slave: u8,
        address: u16,
        count: u16,
    ) -> BoxFuture<'_, Result<Vec<u16>, TransportError>> {
        Box::pin(async move {
            log::trace!(
                "Reading {} registers from address {:#06x} of slave {}",
                count,
                address,
                slave
            );
            self.context.set_slave(Slave(slave));

            let response = match timeout(
                self.io_timeout,
                self.context.read_holding_registers(address, count),
            )
            .await
            {
                Ok(response) => response,
                Err(_) => {
                    self.connected = false;
                    return Err(TransportError::Timeout(self.io_timeout));
                }
            };

            match response {
                Ok(Ok(registers)) => Ok(registers),
                Ok(Err(exception)) => Err(TransportError::Exception {
                    slave,
                    message: format!("{:?} for register {:#06x}", exception, address),
                }),
                Err(e) => {
                    self.connected = false;
                    Err(match e {
                        tokio_modbus::Error::Transport(source) => TransportError::Io(source),
                        other => TransportError::Io(io::Error::new(
                            io::ErrorKind::InvalidData,
                            other.to_string(),
                        )),
                    })
                }
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
