//! Request and response packets exchanged over a face
//!
//! An [`Interest`] asks for named data; a [`SignedData`] answers it. Response
//! entries are signed with the producer's Ed25519 identity key, and the public
//! key travels in the key locator so any receiver can check the signature.
//! Whether that key is *authorized* is a trust decision made elsewhere.

use std::time::Duration;

use super::name::{Name, TYPE_NAME};
use super::tlv::{
    read_natural, required, skip_unknown, write_natural_tlv, write_tlv, TlvReader, WireError,
};
use crate::crypto::{PublicKey, SecretKey, Signature};

pub const TYPE_INTEREST: u64 = 0x05;
pub const TYPE_DATA: u64 = 0x06;
const TYPE_CAN_BE_PREFIX: u64 = 0x21;
const TYPE_MUST_BE_FRESH: u64 = 0x12;
const TYPE_INTEREST_LIFETIME: u64 = 0x0C;
const TYPE_META_INFO: u64 = 0x14;
const TYPE_FRESHNESS_PERIOD: u64 = 0x19;
const TYPE_CONTENT: u64 = 0x15;
const TYPE_SIGNATURE_INFO: u64 = 0x16;
const TYPE_SIGNATURE_TYPE: u64 = 0x1B;
const TYPE_KEY_LOCATOR: u64 = 0x1C;
const TYPE_KEY_DIGEST: u64 = 0x1D;
const TYPE_SIGNATURE_VALUE: u64 = 0x17;
const TYPE_BLOB_FETCH: u64 = 0x1D44;
const TYPE_BLOB_DATA: u64 = 0x1D46;

/// SignatureType value for Ed25519
pub const SIGNATURE_ED25519: u64 = 5;

/// A request for data under a name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interest {
    pub name: Name,
    pub can_be_prefix: bool,
    pub must_be_fresh: bool,
    pub lifetime: Duration,
}

impl Interest {
    pub fn new(name: Name, lifetime: Duration) -> Self {
        Self {
            name,
            can_be_prefix: false,
            must_be_fresh: false,
            lifetime,
        }
    }

    pub fn can_be_prefix(mut self, value: bool) -> Self {
        self.can_be_prefix = value;
        self
    }

    pub fn must_be_fresh(mut self, value: bool) -> Self {
        self.must_be_fresh = value;
        self
    }

    /// Whether a data packet with `name` satisfies this interest
    pub fn matches(&self, name: &Name) -> bool {
        if self.can_be_prefix {
            self.name.is_prefix_of(name)
        } else {
            self.name == *name
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut value = Vec::new();
        self.name.encode_into(&mut value);
        if self.can_be_prefix {
            write_tlv(&mut value, TYPE_CAN_BE_PREFIX, &[]);
        }
        if self.must_be_fresh {
            write_tlv(&mut value, TYPE_MUST_BE_FRESH, &[]);
        }
        write_natural_tlv(
            &mut value,
            TYPE_INTEREST_LIFETIME,
            self.lifetime.as_millis() as u64,
        );
        let mut buf = Vec::with_capacity(value.len() + 4);
        write_tlv(&mut buf, TYPE_INTEREST, &value);
        buf
    }

    pub fn decode(wire: &[u8], ignore_critical: bool) -> Result<Self, WireError> {
        let value = TlvReader::new(wire).expect_single(TYPE_INTEREST, "interest")?;
        let mut name = None;
        let mut interest = Interest::new(Name::new(), Duration::ZERO);
        let mut lifetime = None;
        let mut reader = TlvReader::new(value);
        while let Some((typ, value)) = reader.next_field()? {
            match typ {
                TYPE_NAME => name = Some(Name::decode_value(value)?),
                TYPE_CAN_BE_PREFIX => interest.can_be_prefix = true,
                TYPE_MUST_BE_FRESH => interest.must_be_fresh = true,
                TYPE_INTEREST_LIFETIME => lifetime = Some(read_natural(value)?),
                other => skip_unknown(other, ignore_critical)?,
            }
        }
        interest.name = required(name, TYPE_NAME)?;
        // absent lifetime means the 4 s protocol default
        interest.lifetime = Duration::from_millis(lifetime.unwrap_or(4000));
        Ok(interest)
    }
}

/// A named, signed response entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedData {
    pub name: Name,
    pub freshness: Option<Duration>,
    pub content: Vec<u8>,
    pub signer: PublicKey,
    pub signature: Signature,
}

impl SignedData {
    /// Build and sign a data packet with `key`
    pub fn sign(name: Name, freshness: Option<Duration>, content: Vec<u8>, key: &SecretKey) -> Self {
        let signer = key.public();
        let signed = signed_portion(&name, freshness, &content, &signer);
        let signature = key.sign(&signed);
        Self {
            name,
            freshness,
            content,
            signer,
            signature,
        }
    }

    /// Check the signature against the key in the key locator
    pub fn verify(&self) -> Result<(), ed25519_dalek::SignatureError> {
        let signed = signed_portion(&self.name, self.freshness, &self.content, &self.signer);
        self.signer.verify(&signed, &self.signature)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut value = signed_portion(&self.name, self.freshness, &self.content, &self.signer);
        write_tlv(&mut value, TYPE_SIGNATURE_VALUE, &self.signature.to_bytes());
        let mut buf = Vec::with_capacity(value.len() + 4);
        write_tlv(&mut buf, TYPE_DATA, &value);
        buf
    }

    pub fn decode(wire: &[u8], ignore_critical: bool) -> Result<Self, WireError> {
        let value = TlvReader::new(wire).expect_single(TYPE_DATA, "data")?;
        let (mut name, mut freshness, mut content) = (None, None, None);
        let (mut signer, mut signature) = (None, None);
        let mut reader = TlvReader::new(value);
        while let Some((typ, value)) = reader.next_field()? {
            match typ {
                TYPE_NAME => name = Some(Name::decode_value(value)?),
                TYPE_META_INFO => freshness = decode_meta_info(value, ignore_critical)?,
                TYPE_CONTENT => content = Some(value.to_vec()),
                TYPE_SIGNATURE_INFO => signer = Some(decode_signature_info(value, ignore_critical)?),
                TYPE_SIGNATURE_VALUE => {
                    let sig = Signature::from_slice(value)
                        .map_err(|_| WireError::Invalid("signature value"))?;
                    signature = Some(sig);
                }
                other => skip_unknown(other, ignore_critical)?,
            }
        }
        Ok(Self {
            name: required(name, TYPE_NAME)?,
            freshness,
            content: content.unwrap_or_default(),
            signer: required(signer, TYPE_SIGNATURE_INFO)?,
            signature: required(signature, TYPE_SIGNATURE_VALUE)?,
        })
    }
}

fn signed_portion(
    name: &Name,
    freshness: Option<Duration>,
    content: &[u8],
    signer: &PublicKey,
) -> Vec<u8> {
    let mut buf = Vec::new();
    name.encode_into(&mut buf);

    let mut meta = Vec::new();
    if let Some(freshness) = freshness {
        write_natural_tlv(&mut meta, TYPE_FRESHNESS_PERIOD, freshness.as_millis() as u64);
    }
    write_tlv(&mut buf, TYPE_META_INFO, &meta);
    write_tlv(&mut buf, TYPE_CONTENT, content);

    let mut locator = Vec::new();
    write_tlv(&mut locator, TYPE_KEY_DIGEST, &signer.to_bytes());
    let mut info = Vec::new();
    write_natural_tlv(&mut info, TYPE_SIGNATURE_TYPE, SIGNATURE_ED25519);
    write_tlv(&mut info, TYPE_KEY_LOCATOR, &locator);
    write_tlv(&mut buf, TYPE_SIGNATURE_INFO, &info);
    buf
}

fn decode_meta_info(value: &[u8], ignore_critical: bool) -> Result<Option<Duration>, WireError> {
    let mut freshness = None;
    let mut reader = TlvReader::new(value);
    while let Some((typ, value)) = reader.next_field()? {
        match typ {
            TYPE_FRESHNESS_PERIOD => freshness = Some(Duration::from_millis(read_natural(value)?)),
            other => skip_unknown(other, ignore_critical)?,
        }
    }
    Ok(freshness)
}

fn decode_signature_info(value: &[u8], ignore_critical: bool) -> Result<PublicKey, WireError> {
    let (mut sig_type, mut key) = (None, None);
    let mut reader = TlvReader::new(value);
    while let Some((typ, value)) = reader.next_field()? {
        match typ {
            TYPE_SIGNATURE_TYPE => sig_type = Some(read_natural(value)?),
            TYPE_KEY_LOCATOR => {
                let digest = TlvReader::new(value).expect_single(TYPE_KEY_DIGEST, "key locator")?;
                let public =
                    PublicKey::try_from(digest).map_err(|_| WireError::Invalid("key locator"))?;
                key = Some(public);
            }
            other => skip_unknown(other, ignore_critical)?,
        }
    }
    if required(sig_type, TYPE_SIGNATURE_TYPE)? != SIGNATURE_ED25519 {
        return Err(WireError::Invalid("signature type"));
    }
    required(key, TYPE_KEY_LOCATOR)
}

/// Encapsulated blob-fetch command handed to a storage relay
///
/// Carries complete encoded data packets so the relay can serve them after
/// the producer goes offline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobCommand {
    pub data: Vec<Vec<u8>>,
}

impl BlobCommand {
    pub fn new(data: Vec<Vec<u8>>) -> Self {
        Self { data }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut value = Vec::new();
        for packet in &self.data {
            write_tlv(&mut value, TYPE_BLOB_DATA, packet);
        }
        let mut buf = Vec::with_capacity(value.len() + 4);
        write_tlv(&mut buf, TYPE_BLOB_FETCH, &value);
        buf
    }

    pub fn decode(wire: &[u8], ignore_critical: bool) -> Result<Self, WireError> {
        let value = TlvReader::new(wire).expect_single(TYPE_BLOB_FETCH, "blob command")?;
        let mut data = Vec::new();
        let mut reader = TlvReader::new(value);
        while let Some((typ, value)) = reader.next_field()? {
            match typ {
                TYPE_BLOB_DATA => data.push(value.to_vec()),
                other => skip_unknown(other, ignore_critical)?,
            }
        }
        Ok(Self { data })
    }
}
