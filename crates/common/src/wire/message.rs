//! Publication messages carried in the workspace log
//!
//! A [`Message`] is a union: exactly one of its variants is present on the wire.
//!
//! | Structure   | Tag  | Fields                                   |
//! |-------------|------|------------------------------------------|
//! | AeadBlock   | 0xC6 | IV 0xC8 (12 bytes), Ciphertext 0xCA      |
//! | Delta       | 0xC8 | UUID 0x478 (string), Binary 0x4B0        |
//! | DskRequest  | 0xCA | X25519Pub 0x578, Expiry 0x57A (natural)  |
//! | DskResponse | 0xCC | X25519Peer 0x57A, Ciphertext 0x57C       |
//! | DskAck      | 0xCE | X25519Peer 0x57A                         |

use super::tlv::{
    read_natural, required, skip_unknown, write_natural_tlv, write_tlv, TlvReader, WireError,
};

pub const TYPE_AEAD_BLOCK: u64 = 0xC6;
pub const TYPE_DELTA: u64 = 0xC8;
pub const TYPE_DSK_REQUEST: u64 = 0xCA;
pub const TYPE_DSK_RESPONSE: u64 = 0xCC;
pub const TYPE_DSK_ACK: u64 = 0xCE;

const TYPE_IV: u64 = 0xC8;
const TYPE_CIPHERTEXT: u64 = 0xCA;
const TYPE_UUID: u64 = 0x478;
const TYPE_BINARY: u64 = 0x4B0;
const TYPE_X25519_PUB: u64 = 0x578;
const TYPE_EXPIRY: u64 = 0x57A;
const TYPE_X25519_PEER: u64 = 0x57A;
const TYPE_DSK_CIPHERTEXT: u64 = 0x57C;

/// An AEAD-sealed log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AeadBlock {
    pub iv: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

/// An incremental update to one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    pub uuid: String,
    pub binary: Vec<u8>,
}

/// A request for the workspace content key, published through the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DskRequest {
    pub x25519_pub: Vec<u8>,
    /// Unix seconds after which the request should not be answered
    pub expiry: u64,
}

/// The responder's ephemeral public key and the wrapped content key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DskResponse {
    pub x25519_peer: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

/// Acknowledges that a content key was received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DskAck {
    pub x25519_peer: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    AeadBlock(AeadBlock),
    Delta(Delta),
    DskRequest(DskRequest),
    DskResponse(DskResponse),
    DskAck(DskAck),
}

impl AeadBlock {
    fn encode_value(&self, buf: &mut Vec<u8>) {
        write_tlv(buf, TYPE_IV, &self.iv);
        write_tlv(buf, TYPE_CIPHERTEXT, &self.ciphertext);
    }

    fn decode_value(value: &[u8], ignore_critical: bool) -> Result<Self, WireError> {
        let (mut iv, mut ciphertext) = (None, None);
        let mut reader = TlvReader::new(value);
        while let Some((typ, value)) = reader.next_field()? {
            match typ {
                TYPE_IV => iv = Some(value.to_vec()),
                TYPE_CIPHERTEXT => ciphertext = Some(value.to_vec()),
                other => skip_unknown(other, ignore_critical)?,
            }
        }
        Ok(Self {
            iv: required(iv, TYPE_IV)?,
            ciphertext: required(ciphertext, TYPE_CIPHERTEXT)?,
        })
    }
}

impl Delta {
    fn encode_value(&self, buf: &mut Vec<u8>) {
        write_tlv(buf, TYPE_UUID, self.uuid.as_bytes());
        write_tlv(buf, TYPE_BINARY, &self.binary);
    }

    fn decode_value(value: &[u8], ignore_critical: bool) -> Result<Self, WireError> {
        let (mut uuid, mut binary) = (None, None);
        let mut reader = TlvReader::new(value);
        while let Some((typ, value)) = reader.next_field()? {
            match typ {
                TYPE_UUID => {
                    let text =
                        std::str::from_utf8(value).map_err(|_| WireError::InvalidUtf8(TYPE_UUID))?;
                    uuid = Some(text.to_string());
                }
                TYPE_BINARY => binary = Some(value.to_vec()),
                other => skip_unknown(other, ignore_critical)?,
            }
        }
        Ok(Self {
            uuid: required(uuid, TYPE_UUID)?,
            binary: required(binary, TYPE_BINARY)?,
        })
    }
}

impl DskRequest {
    fn encode_value(&self, buf: &mut Vec<u8>) {
        write_tlv(buf, TYPE_X25519_PUB, &self.x25519_pub);
        write_natural_tlv(buf, TYPE_EXPIRY, self.expiry);
    }

    fn decode_value(value: &[u8], ignore_critical: bool) -> Result<Self, WireError> {
        let (mut x25519_pub, mut expiry) = (None, None);
        let mut reader = TlvReader::new(value);
        while let Some((typ, value)) = reader.next_field()? {
            match typ {
                TYPE_X25519_PUB => x25519_pub = Some(value.to_vec()),
                TYPE_EXPIRY => expiry = Some(read_natural(value)?),
                other => skip_unknown(other, ignore_critical)?,
            }
        }
        Ok(Self {
            x25519_pub: required(x25519_pub, TYPE_X25519_PUB)?,
            expiry: required(expiry, TYPE_EXPIRY)?,
        })
    }
}

impl DskResponse {
    fn encode_value(&self, buf: &mut Vec<u8>) {
        write_tlv(buf, TYPE_X25519_PEER, &self.x25519_peer);
        write_tlv(buf, TYPE_DSK_CIPHERTEXT, &self.ciphertext);
    }

    fn decode_value(value: &[u8], ignore_critical: bool) -> Result<Self, WireError> {
        let (mut x25519_peer, mut ciphertext) = (None, None);
        let mut reader = TlvReader::new(value);
        while let Some((typ, value)) = reader.next_field()? {
            match typ {
                TYPE_X25519_PEER => x25519_peer = Some(value.to_vec()),
                TYPE_DSK_CIPHERTEXT => ciphertext = Some(value.to_vec()),
                other => skip_unknown(other, ignore_critical)?,
            }
        }
        Ok(Self {
            x25519_peer: required(x25519_peer, TYPE_X25519_PEER)?,
            ciphertext: required(ciphertext, TYPE_DSK_CIPHERTEXT)?,
        })
    }

    /// Encode the bare response fields, as carried in a response entry's content
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_value(&mut buf);
        buf
    }

    /// Parse the bare response fields from a response entry's content
    pub fn decode(value: &[u8], ignore_critical: bool) -> Result<Self, WireError> {
        Self::decode_value(value, ignore_critical)
    }
}

impl DskAck {
    fn encode_value(&self, buf: &mut Vec<u8>) {
        write_tlv(buf, TYPE_X25519_PEER, &self.x25519_peer);
    }

    fn decode_value(value: &[u8], ignore_critical: bool) -> Result<Self, WireError> {
        let mut x25519_peer = None;
        let mut reader = TlvReader::new(value);
        while let Some((typ, value)) = reader.next_field()? {
            match typ {
                TYPE_X25519_PEER => x25519_peer = Some(value.to_vec()),
                other => skip_unknown(other, ignore_critical)?,
            }
        }
        Ok(Self {
            x25519_peer: required(x25519_peer, TYPE_X25519_PEER)?,
        })
    }
}

impl Message {
    pub fn tag(&self) -> u64 {
        match self {
            Message::AeadBlock(_) => TYPE_AEAD_BLOCK,
            Message::Delta(_) => TYPE_DELTA,
            Message::DskRequest(_) => TYPE_DSK_REQUEST,
            Message::DskResponse(_) => TYPE_DSK_RESPONSE,
            Message::DskAck(_) => TYPE_DSK_ACK,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut value = Vec::new();
        match self {
            Message::AeadBlock(inner) => inner.encode_value(&mut value),
            Message::Delta(inner) => inner.encode_value(&mut value),
            Message::DskRequest(inner) => inner.encode_value(&mut value),
            Message::DskResponse(inner) => inner.encode_value(&mut value),
            Message::DskAck(inner) => inner.encode_value(&mut value),
        }
        let mut buf = Vec::with_capacity(value.len() + 4);
        write_tlv(&mut buf, self.tag(), &value);
        buf
    }

    /// Parse a message from the content of a log entry
    pub fn decode(wire: &[u8], ignore_critical: bool) -> Result<Self, WireError> {
        let mut reader = TlvReader::new(wire);
        let mut message = None;
        while let Some((typ, value)) = reader.next_field()? {
            let parsed = match typ {
                TYPE_AEAD_BLOCK => Message::AeadBlock(AeadBlock::decode_value(value, ignore_critical)?),
                TYPE_DELTA => Message::Delta(Delta::decode_value(value, ignore_critical)?),
                TYPE_DSK_REQUEST => {
                    Message::DskRequest(DskRequest::decode_value(value, ignore_critical)?)
                }
                TYPE_DSK_RESPONSE => {
                    Message::DskResponse(DskResponse::decode_value(value, ignore_critical)?)
                }
                TYPE_DSK_ACK => Message::DskAck(DskAck::decode_value(value, ignore_critical)?),
                other => {
                    skip_unknown(other, ignore_critical)?;
                    continue;
                }
            };
            if message.replace(parsed).is_some() {
                return Err(WireError::AmbiguousMessage);
            }
        }
        message.ok_or(WireError::EmptyMessage)
    }

    pub fn as_delta(&self) -> Option<&Delta> {
        match self {
            Message::Delta(delta) => Some(delta),
            _ => None,
        }
    }
}

impl From<AeadBlock> for Message {
    fn from(block: AeadBlock) -> Self {
        Message::AeadBlock(block)
    }
}

impl From<Delta> for Message {
    fn from(delta: Delta) -> Self {
        Message::Delta(delta)
    }
}
