//! A closed, static map from wire class names to typed constructors, plus
//! the reference-resolution cache an archive reader consults for back
//! references.

use std::collections::HashMap;

/// The target game a minimum encoded version applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Game {
    G1,
    G2,
}

struct ClassInfo<T> {
    min_version_g1: u16,
    min_version_g2: u16,
    constructor: fn() -> T,
}

/// Maps wire class-name strings to a constructor for the concrete type the
/// class represents, plus the minimum encoded version a writer should emit
/// per target game.
pub struct ObjectRegistry<T> {
    classes: HashMap<&'static str, ClassInfo<T>>,
}

impl<T> Default for ObjectRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ObjectRegistry<T> {
    pub fn new() -> Self {
        Self {
            classes: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        class_name: &'static str,
        min_version_g1: u16,
        min_version_g2: u16,
        constructor: fn() -> T,
    ) {
        self.classes.insert(
            class_name,
            ClassInfo {
                min_version_g1,
                min_version_g2,
                constructor,
            },
        );
    }

    pub fn construct(&self, class_name: &str) -> Option<T> {
        self.classes.get(class_name).map(|info| (info.constructor)())
    }

    pub fn is_registered(&self, class_name: &str) -> bool {
        self.classes.contains_key(class_name)
    }

    pub fn min_version(&self, class_name: &str, game: Game) -> Option<u16> {
        self.classes.get(class_name).map(|info| match game {
            Game::G1 => info.min_version_g1,
            Game::G2 => info.min_version_g2,
        })
    }
}

/// Objects constructed by an archive reader are shared; `index` is the
/// deduplication key a `"§"` back reference resolves through.
pub struct ObjectCache<T> {
    by_index: HashMap<u32, T>,
}

impl<T> Default for ObjectCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> ObjectCache<T> {
    pub fn new() -> Self {
        Self {
            by_index: HashMap::new(),
        }
    }

    pub fn get(&self, index: u32) -> Option<T> {
        self.by_index.get(&index).cloned()
    }

    pub fn insert(&mut self, index: u32, value: T) {
        self.by_index.insert(index, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_class_reports_per_game_min_version() {
        let mut registry: ObjectRegistry<u32> = ObjectRegistry::new();
        registry.register("zCVobLight", 0, 1, || 0);

        assert!(registry.is_registered("zCVobLight"));
        assert_eq!(registry.min_version("zCVobLight", Game::G1), Some(0));
        assert_eq!(registry.min_version("zCVobLight", Game::G2), Some(1));
    }

    #[test]
    fn unregistered_class_is_absent() {
        let registry: ObjectRegistry<u32> = ObjectRegistry::new();
        assert!(!registry.is_registered("zCUnknown"));
        assert_eq!(registry.construct("zCUnknown"), None);
        assert_eq!(registry.min_version("zCUnknown", Game::G1), None);
    }

    #[test]
    fn cache_resolves_by_index_only_after_insertion() {
        let mut cache: ObjectCache<String> = ObjectCache::new();
        assert_eq!(cache.get(1), None);
        cache.insert(1, "hello".to_string());
        assert_eq!(cache.get(1), Some("hello".to_string()));
        assert_eq!(cache.get(2), None);
    }
}
