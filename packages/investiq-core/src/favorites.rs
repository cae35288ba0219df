//! Favorite stocks and coins.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::store::{load_json, save_json, KeyValueStore};
use crate::types::AssetKind;
use crate::Result;

/// Storage key of the favorites list.
pub const FAVORITES_KEY: &str = "investiq_favorites";

/// Favorite stock symbols and crypto ids, in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Favorites {
    #[serde(default)]
    pub stocks: Vec<String>,
    #[serde(default)]
    pub crypto: Vec<String>,
}

impl Favorites {
    fn list(&self, kind: AssetKind) -> &Vec<String> {
        match kind {
            AssetKind::Stock => &self.stocks,
            AssetKind::Crypto => &self.crypto,
        }
    }

    fn list_mut(&mut self, kind: AssetKind) -> &mut Vec<String> {
        match kind {
            AssetKind::Stock => &mut self.stocks,
            AssetKind::Crypto => &mut self.crypto,
        }
    }
}

/// Favorites backed by a key-value store.
pub struct FavoritesBook {
    store: Arc<dyn KeyValueStore>,
    favorites: Favorites,
}

impl FavoritesBook {
    /// Load favorites, starting empty if the stored value is missing or unreadable.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let favorites = match load_json::<Favorites>(store.as_ref(), FAVORITES_KEY) {
            Ok(found) => found.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Failed to load favorites: {}", e);
                Favorites::default()
            }
        };

        Self { store, favorites }
    }

    pub fn favorites(&self) -> &Favorites {
        &self.favorites
    }

    pub fn is_favorite(&self, id: &str, kind: AssetKind) -> bool {
        self.favorites.list(kind).iter().any(|f| f == id)
    }

    /// Add or remove `id`. Returns whether it is a favorite afterwards.
    pub fn toggle(&mut self, id: &str, kind: AssetKind) -> Result<bool> {
        let mut next = self.favorites.clone();
        let list = next.list_mut(kind);

        let now_favorite = if let Some(pos) = list.iter().position(|f| f == id) {
            list.remove(pos);
            false
        } else {
            list.push(id.to_string());
            true
        };

        self.commit(next)?;
        Ok(now_favorite)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.commit(Favorites::default())
    }

    fn commit(&mut self, next: Favorites) -> Result<()> {
        save_json(self.store.as_ref(), FAVORITES_KEY, &next)?;
        self.favorites = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::Error;

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(Error::Storage("read-only".into()))
        }

        fn remove(&self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_toggle_adds_and_removes() {
        let store = Arc::new(MemoryStore::new());
        let mut book = FavoritesBook::load(store.clone());

        assert!(book.toggle("AAPL", AssetKind::Stock).unwrap());
        assert!(book.toggle("bitcoin", AssetKind::Crypto).unwrap());
        assert!(book.is_favorite("AAPL", AssetKind::Stock));
        assert!(!book.is_favorite("AAPL", AssetKind::Crypto));

        assert!(!book.toggle("AAPL", AssetKind::Stock).unwrap());
        assert!(!book.is_favorite("AAPL", AssetKind::Stock));

        let reloaded = FavoritesBook::load(store);
        assert_eq!(reloaded.favorites().crypto, vec!["bitcoin".to_string()]);
        assert!(reloaded.favorites().stocks.is_empty());
    }

    #[test]
    fn test_clear() {
        let store = Arc::new(MemoryStore::new());
        let mut book = FavoritesBook::load(store);
        book.toggle("TCS", AssetKind::Stock).unwrap();

        book.clear().unwrap();
        assert_eq!(book.favorites(), &Favorites::default());
    }

    #[test]
    fn test_corrupt_value_starts_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(FAVORITES_KEY, "not json").unwrap();

        let book = FavoritesBook::load(store);
        assert_eq!(book.favorites(), &Favorites::default());
    }

    #[test]
    fn test_failed_save_keeps_state() {
        let mut book = FavoritesBook::load(Arc::new(FailingStore));

        assert!(book.toggle("AAPL", AssetKind::Stock).is_err());
        assert!(!book.is_favorite("AAPL", AssetKind::Stock));
    }
}
