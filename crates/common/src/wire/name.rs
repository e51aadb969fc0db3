//! Hierarchical names used to address requests and response entries

use std::fmt;

use super::tlv::{read_natural, write_natural_tlv, write_tlv, TlvReader, WireError};

pub const TYPE_NAME: u64 = 0x07;
pub const TYPE_GENERIC: u64 = 0x08;
pub const TYPE_KEYWORD: u64 = 0x20;
pub const TYPE_VERSION: u64 = 0x36;

/// A single name component
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    Generic(Vec<u8>),
    Keyword(Vec<u8>),
    Version(u64),
    /// Any other component type, kept verbatim
    Other(u64, Vec<u8>),
}

impl Component {
    pub fn generic(value: impl AsRef<[u8]>) -> Self {
        Component::Generic(value.as_ref().to_vec())
    }

    pub fn keyword(value: impl AsRef<[u8]>) -> Self {
        Component::Keyword(value.as_ref().to_vec())
    }

    fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            Component::Generic(value) => write_tlv(buf, TYPE_GENERIC, value),
            Component::Keyword(value) => write_tlv(buf, TYPE_KEYWORD, value),
            Component::Version(version) => write_natural_tlv(buf, TYPE_VERSION, *version),
            Component::Other(typ, value) => write_tlv(buf, *typ, value),
        }
    }

    fn decode(typ: u64, value: &[u8]) -> Result<Self, WireError> {
        Ok(match typ {
            TYPE_GENERIC => Component::Generic(value.to_vec()),
            TYPE_KEYWORD => Component::Keyword(value.to_vec()),
            TYPE_VERSION => Component::Version(read_natural(value)?),
            other => Component::Other(other, value.to_vec()),
        })
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Generic(value) => write_escaped(f, value),
            Component::Keyword(value) => {
                f.write_str("32=")?;
                write_escaped(f, value)
            }
            Component::Version(version) => write!(f, "v={version}"),
            Component::Other(typ, value) => {
                write!(f, "{typ}=")?;
                write_escaped(f, value)
            }
        }
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, value: &[u8]) -> fmt::Result {
    for byte in value {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                write!(f, "{}", *byte as char)?
            }
            other => write!(f, "%{other:02X}")?,
        }
    }
    Ok(())
}

/// An ordered list of components
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(Vec<Component>);

impl Name {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a name of generic components from a `/a/b/c` path
    pub fn from_path(path: &str) -> Self {
        Name(
            path.split('/')
                .filter(|segment| !segment.is_empty())
                .map(Component::generic)
                .collect(),
        )
    }

    pub fn components(&self) -> &[Component] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Component> {
        self.0.get(index)
    }

    pub fn append(mut self, component: Component) -> Self {
        self.0.push(component);
        self
    }

    /// Append a version component
    pub fn with_version(self, version: u64) -> Self {
        self.append(Component::Version(version))
    }

    /// The version carried by the last component, if any
    pub fn version(&self) -> Option<u64> {
        match self.0.last() {
            Some(Component::Version(version)) => Some(*version),
            _ => None,
        }
    }

    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.0.len() <= other.0.len() && self.0.iter().zip(other.0.iter()).all(|(a, b)| a == b)
    }

    /// The first `len` components
    pub fn prefix(&self, len: usize) -> Name {
        Name(self.0.iter().take(len).cloned().collect())
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf);
        buf
    }

    pub(crate) fn encode_into(&self, buf: &mut Vec<u8>) {
        let mut value = Vec::new();
        for component in &self.0 {
            component.encode_into(&mut value);
        }
        write_tlv(buf, TYPE_NAME, &value);
    }

    /// Decode a complete Name TLV
    pub fn decode(wire: &[u8]) -> Result<Self, WireError> {
        let value = TlvReader::new(wire).expect_single(TYPE_NAME, "name")?;
        Self::decode_value(value)
    }

    pub(crate) fn decode_value(value: &[u8]) -> Result<Self, WireError> {
        let mut reader = TlvReader::new(value);
        let mut components = Vec::new();
        while let Some((typ, value)) = reader.next_field()? {
            components.push(Component::decode(typ, value)?);
        }
        Ok(Name(components))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for component in &self.0 {
            write!(f, "/{component}")?;
        }
        Ok(())
    }
}

impl From<Vec<Component>> for Name {
    fn from(components: Vec<Component>) -> Self {
        Name(components)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_name_display() {
        let name = Name::from_path("/ownly/team")
            .append(Component::generic("root"))
            .append(Component::keyword("DSK"))
            .append(Component::generic([0xAB, 0x01]))
            .with_version(7);
        assert_eq!(name.to_string(), "/ownly/team/root/32=DSK/%AB%01/v=7");
        assert_eq!(name.version(), Some(7));
    }

    #[test]
    fn test_name_encode_decode() {
        let name = Name::from_path("/a/b")
            .append(Component::keyword("DSK"))
            .with_version(1_700_000_000_000_000);
        let wire = name.encode();
        assert_eq!(wire[0], TYPE_NAME as u8);
        assert_eq!(Name::decode(&wire).unwrap(), name);
    }

    #[test]
    fn test_prefix_relationships() {
        let root = Name::from_path("/w/root");
        let request = root.clone().append(Component::keyword("DSK"));
        assert!(root.is_prefix_of(&request));
        assert!(!request.is_prefix_of(&root));
        assert_eq!(request.prefix(2), root);
        assert!(Name::new().is_prefix_of(&root));
    }
}
