use std::net::SocketAddr;

use futures::StreamExt;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio_util::udp::UdpFramed;
use tracing::{error, info};

use crate::core::{Config, Error, Result};
use crate::protocol::{Datagram, PacketCodec};

/// Receives forwarder datagrams on a UDP socket and decodes them
pub struct PacketListener {
    framed: UdpFramed<PacketCodec>,
}

impl PacketListener {
    /// Binds the listener socket described by `config`
    pub async fn bind(config: &Config) -> Result<Self> {
        config.validate()?;
        let socket = open_socket(config)?;
        let framed = UdpFramed::new(socket, PacketCodec::new(config.max_datagram_size));
        Ok(PacketListener { framed })
    }

    /// Returns the local socket address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.framed.get_ref().local_addr()
            .map_err(|e| Error::network(format!("Failed to get local address: {}", e)))
    }

    /// Waits for the next datagram.
    ///
    /// Decode failures come back inside the datagram; only socket errors are
    /// returned as `Err`.
    pub async fn next_datagram(&mut self) -> Result<(Datagram, SocketAddr)> {
        match self.framed.next().await {
            Some(item) => item,
            None => Err(Error::network("socket stream closed")),
        }
    }

    /// Logs every received message until the socket fails
    pub async fn run(mut self) -> Result<()> {
        info!(addr = %self.local_addr()?, "listening for packet forwarder traffic");

        loop {
            let (datagram, peer) = self.next_datagram().await?;
            match &datagram.outcome {
                Ok(message) => message.log(),
                Err(e) => error!(
                    peer = %peer,
                    data = %hex::encode(&datagram.raw),
                    error = %e,
                    "protocol error"
                ),
            }
        }
    }
}

fn open_socket(config: &Config) -> Result<UdpSocket> {
    let domain = Domain::for_address(config.bind_addr);
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))
        .map_err(|e| Error::network(format!("Failed to create socket: {}", e)))?;
    socket.set_reuse_address(config.reuse_address)?;
    socket.set_recv_buffer_size(config.recv_buffer_size)?;
    socket.set_nonblocking(true)?;
    socket.bind(&config.bind_addr.into())
        .map_err(|e| Error::network(format!("Failed to bind socket: {}", e)))?;

    Ok(UdpSocket::from_std(socket.into())?)
}
