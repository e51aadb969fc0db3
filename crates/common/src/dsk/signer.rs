use crate::crypto::SecretKey;
use crate::wire::Name;

/// Chooses the identity key that signs data produced under a name
pub trait SignerProvider: Send + Sync {
    fn suggest_signer(&self, name: &Name) -> Option<SecretKey>;
}

impl SignerProvider for SecretKey {
    fn suggest_signer(&self, _name: &Name) -> Option<SecretKey> {
        Some(self.clone())
    }
}

impl SignerProvider for Option<SecretKey> {
    fn suggest_signer(&self, _name: &Name) -> Option<SecretKey> {
        self.clone()
    }
}

/// Keys registered per name prefix; the longest matching prefix signs
#[derive(Debug, Clone, Default)]
pub struct Keychain {
    keys: Vec<(Name, SecretKey)>,
}

impl Keychain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, prefix: Name, key: SecretKey) {
        self.keys.retain(|(existing, _)| *existing != prefix);
        self.keys.push((prefix, key));
    }
}

impl SignerProvider for Keychain {
    fn suggest_signer(&self, name: &Name) -> Option<SecretKey> {
        self.keys
            .iter()
            .filter(|(prefix, _)| prefix.is_prefix_of(name))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, key)| key.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_keychain_longest_prefix() {
        let team = SecretKey::generate().unwrap();
        let root = SecretKey::generate().unwrap();
        let mut keychain = Keychain::new();
        keychain.insert(Name::from_path("/team"), team.clone());
        keychain.insert(Name::from_path("/team/root"), root.clone());

        let signer = keychain
            .suggest_signer(&Name::from_path("/team/root/x"))
            .unwrap();
        assert_eq!(signer.public(), root.public());

        let signer = keychain.suggest_signer(&Name::from_path("/team/chat")).unwrap();
        assert_eq!(signer.public(), team.public());

        assert!(keychain.suggest_signer(&Name::from_path("/other")).is_none());
    }
}
