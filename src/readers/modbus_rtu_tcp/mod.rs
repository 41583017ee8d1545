pub mod client;
pub mod defaults;
pub mod registry;

pub use client::RtuOverTcpConnector;
pub use registry::{
    Connector, EndpointKey, EndpointLock, RegisterTransport, TransportError, TransportHandle,
    TransportRegistry,
};
