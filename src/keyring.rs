//! Keyrings and the key-provider capability.

use crate::key::{Key, Passphrase};

/// Capability interface to the credential/key store.
///
/// Injected into [`crate::decrypt::MessageDecrypter`] at construction so
/// the pipeline never reaches for ambient key state.  Keys and the
/// passphrase are fetched fresh on every decryption call; the store may
/// rotate keys or re-derive the passphrase between calls.
pub trait KeyProvider {
    /// Private keys scoped to one address.
    ///
    /// Empty if no keys exist for that address, e.g. because the address
    /// was deleted or is external.
    fn address_keys(&self, address_id: &str) -> Vec<Key>;

    /// All private keys of the account.
    fn account_keys(&self) -> Vec<Key>;

    /// The passphrase unlocking the account's private keys.
    fn mailbox_passphrase(&self) -> Passphrase;
}

/// Returns the candidate decryption keys for an address.
///
/// Falls back to the full account key set when the address has no keys of
/// its own.  An empty result means the account itself has no usable keys;
/// that is a legitimate state, not an error.
pub fn resolve_address_keys(provider: &impl KeyProvider, address_id: &str) -> Vec<Key> {
    let keys = provider.address_keys(address_id);
    if keys.is_empty() {
        provider.account_keys()
    } else {
        keys
    }
}

/// An in-memory keyring.
///
/// Instances are constructed just for one engine operation and are
/// short-lived.
#[derive(Clone, Debug)]
pub struct Keyring<T> {
    keys: Vec<T>,
}

impl<T> Default for Keyring<T> {
    fn default() -> Self {
        Keyring { keys: Vec::new() }
    }
}

impl<T> Keyring<T> {
    /// New empty keyring.
    pub fn new() -> Keyring<T> {
        Default::default()
    }

    /// Add a key to the keyring.
    pub fn add(&mut self, key: T) {
        self.keys.push(key);
    }

    /// Number of keys in the keyring.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the keyring holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// All keys in the keyring, in insertion order.
    pub fn keys(&self) -> &[T] {
        &self.keys
    }
}

impl<T> FromIterator<T> for Keyring<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Keyring {
            keys: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestKeyProvider;

    #[test]
    fn test_resolve_address_keys() {
        let mut provider = TestKeyProvider::new("secret passphrase");
        provider.account_keys = vec![Key::new("account-key", "armor")];
        provider
            .address_keys
            .insert("addr-1".to_string(), vec![Key::new("addr-key", "armor")]);

        let keys = resolve_address_keys(&provider, "addr-1");
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].id, "addr-key");

        // Unknown address falls back to the account keys.
        let keys = resolve_address_keys(&provider, "addr-2");
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].id, "account-key");
    }

    #[test]
    fn test_resolve_no_keys_anywhere() {
        let provider = TestKeyProvider::new("secret passphrase");
        assert!(resolve_address_keys(&provider, "addr-1").is_empty());
    }

    #[test]
    fn test_keyring_add_keys() {
        let mut ring: Keyring<u32> = Keyring::new();
        assert!(ring.is_empty());
        ring.add(1);
        ring.add(2);
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.keys(), [1, 2]);
    }
}
