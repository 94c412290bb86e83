use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Wire format of one UDP datagram carrying a slice of a frame message
#[derive(Debug, Clone)]
pub struct Packet {
    pub frame_id: u32,
    pub fragment_index: u32,
    pub fragment_count: u32,
    pub flags: u8,
    pub payload: Bytes,
}

pub const PACKET_VERSION: u8 = 1;
pub const HEADER_LEN: usize = 18;

// Packet flags
pub const FLAG_LAST_FRAGMENT: u8 = 0x01;

impl Packet {
    pub fn new(frame_id: u32, fragment_index: u32, fragment_count: u32, payload: Bytes) -> Self {
        let flags = if fragment_index + 1 == fragment_count {
            FLAG_LAST_FRAGMENT
        } else {
            0
        };

        Self {
            frame_id,
            fragment_index,
            fragment_count,
            flags,
            payload,
        }
    }

    /// Serialize packet to wire format
    /// Format: [version:1][frame:4][index:4][count:4][flags:1][payload_len:4][payload:N]
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.payload.len());

        buf.put_u8(PACKET_VERSION);
        buf.put_u32(self.frame_id);
        buf.put_u32(self.fragment_index);
        buf.put_u32(self.fragment_count);
        buf.put_u8(self.flags);
        buf.put_u32(self.payload.len() as u32);
        buf.put(self.payload.clone());

        buf.freeze()
    }

    /// Deserialize packet from wire format
    pub fn from_bytes(mut data: Bytes) -> Result<Self, String> {
        if data.len() < HEADER_LEN {
            return Err("Packet too short".into());
        }

        let version = data.get_u8();
        if version != PACKET_VERSION {
            return Err(format!("Unsupported packet version {}", version));
        }

        let frame_id = data.get_u32();
        let fragment_index = data.get_u32();
        let fragment_count = data.get_u32();
        let flags = data.get_u8();
        let payload_len = data.get_u32() as usize;

        if fragment_count == 0 || fragment_index >= fragment_count {
            return Err("Invalid fragment index".into());
        }

        if data.len() < payload_len {
            return Err("Incomplete payload".into());
        }

        let payload = data.split_to(payload_len);

        Ok(Self {
            frame_id,
            fragment_index,
            fragment_count,
            flags,
            payload,
        })
    }

    pub fn is_last(&self) -> bool {
        (self.flags & FLAG_LAST_FRAGMENT) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_serialization() {
        let payload = Bytes::from(vec![1, 2, 3, 4, 5]);
        let packet = Packet::new(42, 2, 3, payload.clone());

        let serialized = packet.to_bytes();
        assert_eq!(serialized.len(), HEADER_LEN + 5);

        let deserialized = Packet::from_bytes(serialized).unwrap();
        assert_eq!(deserialized.frame_id, 42);
        assert_eq!(deserialized.fragment_index, 2);
        assert_eq!(deserialized.fragment_count, 3);
        assert!(deserialized.is_last());
        assert_eq!(deserialized.payload, payload);
    }

    #[test]
    fn test_rejects_bad_packets() {
        assert!(Packet::from_bytes(Bytes::from_static(&[1, 2, 3])).is_err());

        let mut wire = Packet::new(1, 0, 1, Bytes::from_static(b"abc")).to_bytes().to_vec();
        wire[0] = 9;
        assert!(Packet::from_bytes(Bytes::from(wire.clone())).is_err());

        wire[0] = PACKET_VERSION;
        wire.truncate(HEADER_LEN + 1);
        assert_eq!(Packet::from_bytes(Bytes::from(wire)).unwrap_err(), "Incomplete payload");
    }
}
