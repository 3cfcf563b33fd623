//! On-demand materialization of a holder's backing container.

/// Backing container that is loaded on first access and can be evicted.
///
/// Loading itself is done by the holder; this type only tracks whether a
/// materialized copy exists.
#[derive(Debug)]
pub struct LazyContainer<B> {
    loaded: Option<B>,
    loads: usize,
}

impl<B> LazyContainer<B> {
    pub fn new() -> Self {
        Self {
            loaded: None,
            loads: 0,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// How many times a container has been installed by `fill`.
    pub fn load_count(&self) -> usize {
        self.loads
    }

    pub fn loaded(&self) -> Option<&B> {
        self.loaded.as_ref()
    }

    pub fn loaded_mut(&mut self) -> Option<&mut B> {
        self.loaded.as_mut()
    }

    /// Installs a freshly loaded container.
    pub fn fill(&mut self, backing: B) {
        self.loaded = Some(backing);
        self.loads += 1;
    }

    /// Drops the materialized container and returns it.
    pub fn evict(&mut self) -> Option<B> {
        self.loaded.take()
    }
}

impl<B: Default> LazyContainer<B> {
    /// Returns the materialized container, installing an empty one if
    /// nothing was loaded.
    pub fn force(&mut self) -> &mut B {
        self.loaded.get_or_insert_with(B::default)
    }
}

impl<B> Default for LazyContainer<B> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::LazyContainer;

    #[test]
    fn starts_unloaded_and_tracks_fills() {
        let mut container = LazyContainer::<Vec<u8>>::new();
        assert!(!container.is_loaded());
        assert!(container.loaded().is_none());

        container.fill(vec![1, 2]);
        assert!(container.is_loaded());
        assert_eq!(container.load_count(), 1);
        assert_eq!(container.force(), &mut vec![1, 2]);
    }

    #[test]
    fn evict_returns_contents_and_unloads() {
        let mut container = LazyContainer::new();
        container.fill(vec!["a"]);

        assert_eq!(container.evict(), Some(vec!["a"]));
        assert!(!container.is_loaded());
        assert_eq!(container.evict(), None);
    }
}
