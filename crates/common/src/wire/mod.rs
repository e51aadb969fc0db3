//! Binary TLV wire formats
//!
//! Tag numbers are fixed by deployed peers and must not change.

mod message;
mod name;
mod packet;
mod tlv;

pub use message::{
    AeadBlock, Delta, DskAck, DskRequest, DskResponse, Message, TYPE_AEAD_BLOCK, TYPE_DELTA,
    TYPE_DSK_ACK, TYPE_DSK_REQUEST, TYPE_DSK_RESPONSE,
};
pub use name::{Component, Name};
pub use packet::{BlobCommand, Interest, SignedData, SIGNATURE_ED25519};
pub use tlv::{
    is_critical, read_natural, read_var_number, write_natural, write_tlv, write_var_number,
    TlvReader, WireError,
};
