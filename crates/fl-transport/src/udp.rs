use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::thread;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use fl_core::{FrameDescriptor, NetworkSource, TransportConfig};
use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, info, warn};

use super::*;
use crate::packet::{Packet, HEADER_LEN};
use crate::protocol::{decode_message, encode_message};

/// Largest datagram the receiver reads.
const MAX_DATAGRAM: usize = 65_536;

/// Upper bound on fragments per frame accepted from the wire.
const MAX_FRAGMENTS: u32 = 1 << 20;

/// Sleep between empty reads while a poll still has time left.
const POLL_BACKOFF: Duration = Duration::from_millis(1);

fn parse_addr(addr: &str) -> Result<SocketAddr> {
    addr.parse()
        .map_err(|_| TransportError::CreateFailed(format!("invalid socket address {:?}", addr)))
}

fn open_socket(addr: SocketAddr, buffer_bytes: usize) -> Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;

    // Large frames arrive as bursts of thousands of datagrams.
    if let Err(e) = socket.set_recv_buffer_size(buffer_bytes) {
        warn!("Failed to set receive buffer to {} bytes: {}", buffer_bytes, e);
    }
    if let Err(e) = socket.set_send_buffer_size(buffer_bytes) {
        warn!("Failed to set send buffer to {} bytes: {}", buffer_bytes, e);
    }

    socket.bind(&addr.into())?;
    Ok(socket.into())
}

/// Frames pushed as fragmented datagrams from a sender to a fixed target.
pub struct UdpTransport {
    bind_addr: SocketAddr,
    target: Option<SocketAddr>,
    max_packet_size: usize,
    socket_buffer_bytes: usize,
}

impl UdpTransport {
    pub fn from_config(config: &TransportConfig) -> Result<Self> {
        let target = match &config.target {
            Some(target) => Some(parse_addr(target)?),
            None => None,
        };

        if config.max_packet_size <= HEADER_LEN {
            return Err(TransportError::CreateFailed(format!(
                "max_packet_size {} leaves no room for payload",
                config.max_packet_size
            )));
        }

        Ok(Self {
            bind_addr: parse_addr(&config.bind_address)?,
            target,
            max_packet_size: config.max_packet_size,
            socket_buffer_bytes: config.socket_buffer_bytes,
        })
    }
}

impl Transport for UdpTransport {
    fn create_sender(&self, name: &str) -> Result<Box<dyn VideoSender>> {
        let target = self
            .target
            .ok_or(TransportError::CreateFailed("no UDP target configured".into()))?;

        let socket = open_socket(self.bind_addr, self.socket_buffer_bytes)
            .map_err(|e| TransportError::CreateFailed(e.to_string()))?;
        socket.connect(target)?;

        info!("UDP sender {:?} streaming to {}", name, target);

        Ok(Box::new(UdpSender {
            name: name.to_string(),
            socket,
            max_payload: self.max_packet_size - HEADER_LEN,
            frame_id: 0,
        }))
    }

    fn create_receiver(&self, settings: &ReceiverSettings) -> Result<Box<dyn VideoReceiver>> {
        debug!(
            "UDP receiver settings: bandwidth={:?} color_format={:?} fields={}",
            settings.bandwidth, settings.color_format, settings.allow_video_fields
        );
        Ok(Box::new(UdpReceiver::new(self.socket_buffer_bytes)))
    }
}

pub struct UdpSender {
    name: String,
    socket: UdpSocket,
    max_payload: usize,
    frame_id: u32,
}

impl VideoSender for UdpSender {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, frame: &FrameDescriptor) -> Result<()> {
        let message = encode_message(frame)?;
        let count = message.len().div_ceil(self.max_payload);
        if count > MAX_FRAGMENTS as usize {
            return Err(TransportError::SendFailed(format!(
                "frame of {} bytes needs {} fragments",
                message.len(),
                count
            )));
        }

        for index in 0..count {
            let start = index * self.max_payload;
            let end = (start + self.max_payload).min(message.len());
            let packet = Packet::new(self.frame_id, index as u32, count as u32, message.slice(start..end));

            self.socket
                .send(&packet.to_bytes())
                .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        }

        debug!("Sent frame #{} in {} fragments ({} bytes)", self.frame_id, count, message.len());
        self.frame_id = self.frame_id.wrapping_add(1);
        Ok(())
    }
}

pub struct UdpReceiver {
    socket: Option<UdpSocket>,
    socket_buffer_bytes: usize,
    assembler: Assembler,
    buf: Vec<u8>,
}

impl UdpReceiver {
    pub fn new(socket_buffer_bytes: usize) -> Self {
        Self {
            socket: None,
            socket_buffer_bytes,
            assembler: Assembler::default(),
            buf: vec![0u8; MAX_DATAGRAM],
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Frames abandoned because a newer frame started before they completed.
    pub fn incomplete_frames(&self) -> u64 {
        self.assembler.incomplete
    }
}

impl VideoReceiver for UdpReceiver {
    fn connect(&mut self, source: &NetworkSource) -> Result<()> {
        let address = source
            .address
            .as_deref()
            .ok_or_else(|| TransportError::ConnectionFailed(format!("{} has no address", source.name)))?;
        let addr: SocketAddr = address
            .parse()
            .map_err(|_| TransportError::ConnectionFailed(format!("invalid address {:?}", address)))?;

        let socket = open_socket(addr, self.socket_buffer_bytes)
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        socket.set_nonblocking(true)?;

        info!("UDP receiver listening for {} on {}", source.name, addr);
        self.socket = Some(socket);
        self.assembler = Assembler::default();
        Ok(())
    }

    fn poll_frame(&mut self, timeout: Duration) -> Result<Option<FrameDescriptor>> {
        let socket = self.socket.as_ref().ok_or(TransportError::NotConnected)?;
        let deadline = Instant::now() + timeout;

        loop {
            match socket.recv_from(&mut self.buf) {
                Ok((len, _)) => {
                    let packet = match Packet::from_bytes(Bytes::copy_from_slice(&self.buf[..len])) {
                        Ok(packet) => packet,
                        Err(e) => {
                            debug!("Discarding malformed datagram: {}", e);
                            continue;
                        }
                    };

                    if let Some(message) = self.assembler.push(packet) {
                        match decode_message(message) {
                            Ok(frame) => return Ok(Some(frame)),
                            Err(e) => warn!("Discarding undecodable frame: {}", e),
                        }
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    thread::sleep((deadline - now).min(POLL_BACKOFF));
                }
                Err(e) => return Err(TransportError::ReceiveFailed(e.to_string())),
            }
        }
    }
}

/// Reassembles fragments of one frame at a time.
#[derive(Default)]
struct Assembler {
    frame_id: Option<u32>,
    fragments: Vec<Option<Bytes>>,
    received: usize,
    incomplete: u64,
}

fn is_newer(candidate: u32, current: u32) -> bool {
    (candidate.wrapping_sub(current) as i32) > 0
}

impl Assembler {
    fn push(&mut self, packet: Packet) -> Option<Bytes> {
        if packet.fragment_count > MAX_FRAGMENTS {
            return None;
        }

        match self.frame_id {
            Some(current) if current == packet.frame_id => {}
            Some(current) if !is_newer(packet.frame_id, current) => return None,
            _ => {
                if !self.fragments.is_empty() {
                    self.incomplete += 1;
                    debug!("Frame #{:?} incomplete, {} fragments received", self.frame_id, self.received);
                }
                self.frame_id = Some(packet.frame_id);
                self.fragments = vec![None; packet.fragment_count as usize];
                self.received = 0;
            }
        }

        // Completed frames leave `fragments` empty, so late duplicates fall out here.
        if packet.fragment_count as usize != self.fragments.len() {
            return None;
        }

        let slot = &mut self.fragments[packet.fragment_index as usize];
        if slot.is_none() {
            *slot = Some(packet.payload);
            self.received += 1;
        }

        if self.received < self.fragments.len() {
            return None;
        }

        let total = self.fragments.iter().flatten().map(Bytes::len).sum();
        let mut message = BytesMut::with_capacity(total);
        for fragment in self.fragments.drain(..).flatten() {
            message.extend_from_slice(&fragment);
        }
        self.received = 0;
        Some(message.freeze())
    }
}

/// Source list taken from configuration instead of network discovery.
pub struct StaticSourceFinder {
    sources: Vec<NetworkSource>,
}

impl StaticSourceFinder {
    pub fn new(sources: Vec<NetworkSource>) -> Self {
        Self { sources }
    }

    pub fn from_config(config: &TransportConfig) -> Self {
        Self::new(
            config
                .sources
                .iter()
                .map(|entry| NetworkSource::new(entry.name.clone()).with_address(entry.address.clone()))
                .collect(),
        )
    }
}

impl SourceFinder for StaticSourceFinder {
    fn current_sources(&self) -> Vec<NetworkSource> {
        self.sources.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fl_core::{FourCC, FrameRate};

    fn packet(frame_id: u32, index: u32, count: u32, payload: &'static [u8]) -> Packet {
        Packet::new(frame_id, index, count, Bytes::from_static(payload))
    }

    #[test]
    fn test_assembler_orders_fragments() {
        let mut assembler = Assembler::default();

        assert!(assembler.push(packet(7, 1, 3, b"cd")).is_none());
        assert!(assembler.push(packet(7, 0, 3, b"ab")).is_none());
        assert!(assembler.push(packet(7, 0, 3, b"ab")).is_none());
        assert_eq!(assembler.push(packet(7, 2, 3, b"e")).unwrap(), Bytes::from_static(b"abcde"));

        // Late duplicate of a completed frame.
        assert!(assembler.push(packet(7, 1, 3, b"cd")).is_none());
    }

    #[test]
    fn test_assembler_abandons_incomplete_frame() {
        let mut assembler = Assembler::default();

        assert!(assembler.push(packet(1, 0, 2, b"x")).is_none());
        assert_eq!(assembler.push(packet(2, 0, 1, b"y")).unwrap(), Bytes::from_static(b"y"));
        assert_eq!(assembler.incomplete, 1);

        // Stale fragment from the abandoned frame.
        assert!(assembler.push(packet(1, 1, 2, b"z")).is_none());
    }

    #[test]
    fn test_frame_id_wraps() {
        assert!(is_newer(0, u32::MAX));
        assert!(!is_newer(u32::MAX, 0));
    }

    #[test]
    fn test_udp_roundtrip_on_localhost() {
        let mut receiver = UdpReceiver::new(1 << 20);
        receiver
            .connect(&NetworkSource::new("HOST (cam)").with_address("127.0.0.1:0"))
            .unwrap();
        let addr = receiver.local_addr().unwrap();

        let config = TransportConfig {
            kind: fl_core::TransportKind::Udp,
            bind_address: "127.0.0.1:0".into(),
            target: Some(addr.to_string()),
            max_packet_size: 512,
            ..Default::default()
        };
        let transport = UdpTransport::from_config(&config).unwrap();
        let mut sender = transport.create_sender("cam").unwrap();

        let pixels: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        let frame = FrameDescriptor::new(32, 32, 128, FourCC::BGRA, pixels)
            .with_frame_rate(FrameRate::new(25, 1))
            .with_metadata("<meta/>");
        sender.send(&frame).unwrap();

        let received = receiver.poll_frame(Duration::from_secs(2)).unwrap().unwrap();
        assert_eq!(received.width, 32);
        assert_eq!(received.frame_rate, FrameRate::new(25, 1));
        assert_eq!(received.metadata.as_deref(), Some("<meta/>"));
        assert_eq!(received.data, frame.data);

        assert!(receiver.poll_frame(Duration::ZERO).unwrap().is_none());
    }

    #[test]
    fn test_sender_requires_target() {
        let transport = UdpTransport::from_config(&TransportConfig::default()).unwrap();
        assert!(transport.create_sender("cam").is_err());
    }

    #[test]
    fn test_receiver_requires_address() {
        let mut receiver = UdpReceiver::new(1 << 16);
        assert!(receiver.connect(&NetworkSource::new("HOST (cam)")).is_err());
        assert!(matches!(receiver.poll_frame(Duration::ZERO), Err(TransportError::NotConnected)));
    }
}
