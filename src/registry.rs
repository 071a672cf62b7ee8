//! Catalog of available sources, keyed by id.
//!
//! The registry is populated once at startup and read concurrently
//! afterwards. Registration is explicit (see `providers::register_builtin`);
//! nothing registers itself.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::errors::{IpEnrichError, Result};
use crate::sources::Source;

#[derive(Default)]
pub struct SourceRegistry {
    sources: RwLock<HashMap<String, Arc<dyn Source>>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> SourceRegistryBuilder {
        SourceRegistryBuilder::new()
    }

    pub fn register<S: Source + 'static>(&self, source: S) -> Result<()> {
        self.register_arc(Arc::new(source))
    }

    /// Add a shared source. A duplicate id is rejected and the existing
    /// entry is left untouched.
    pub fn register_arc(&self, source: Arc<dyn Source>) -> Result<()> {
        let mut sources = self.sources.write();
        let id = source.id().to_string();
        if sources.contains_key(&id) {
            return Err(IpEnrichError::DuplicateSource { id });
        }
        tracing::trace!(source = %id, "registered source");
        sources.insert(id, source);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Source>> {
        self.sources.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sources.read().contains_key(id)
    }

    /// Every source, ordered by display name (id breaks ties).
    pub fn all(&self) -> Vec<Arc<dyn Source>> {
        let mut all: Vec<_> = self.sources.read().values().cloned().collect();
        sort_by_name(&mut all);
        all
    }

    /// Registered ids in lexical order.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sources.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Resolve a requested subset.
    ///
    /// An empty request selects everything. Unknown ids are dropped (see
    /// `validate`) and repeated ids collapse to a single entry. The result
    /// is ordered by name regardless of request order.
    pub fn filter<S: AsRef<str>>(&self, requested: &[S]) -> Vec<Arc<dyn Source>> {
        if requested.is_empty() {
            return self.all();
        }

        let sources = self.sources.read();
        let mut seen = HashSet::new();
        let mut selected: Vec<_> = requested
            .iter()
            .map(AsRef::as_ref)
            .filter(|id| seen.insert(*id))
            .filter_map(|id| sources.get(id).cloned())
            .collect();
        drop(sources);

        sort_by_name(&mut selected);
        selected
    }

    /// Requested ids that are not registered, deduplicated, in request order.
    pub fn validate<S: AsRef<str>>(&self, requested: &[S]) -> Vec<String> {
        let sources = self.sources.read();
        let mut seen = HashSet::new();
        requested
            .iter()
            .map(AsRef::as_ref)
            .filter(|id| !sources.contains_key(*id))
            .filter(|id| seen.insert(*id))
            .map(str::to_string)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sources.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.read().is_empty()
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

fn sort_by_name(sources: &mut [Arc<dyn Source>]) {
    sources.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.id().cmp(b.id())));
}

/// Fluent construction, stopping at the first duplicate.
#[derive(Default)]
pub struct SourceRegistryBuilder {
    registry: SourceRegistry,
    error: Option<IpEnrichError>,
}

impl SourceRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source<S: Source + 'static>(self, source: S) -> Self {
        self.with_arc(Arc::new(source))
    }

    pub fn with_arc(mut self, source: Arc<dyn Source>) -> Self {
        if self.error.is_none()
            && let Err(e) = self.registry.register_arc(source)
        {
            self.error = Some(e);
        }
        self
    }

    pub fn build(self) -> Result<SourceRegistry> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.registry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::SourceResult;
    use crate::sources::SourceDescriptor;

    struct Stub(SourceDescriptor);

    impl Stub {
        fn new(id: &str, name: &str) -> Self {
            Stub(
                SourceDescriptor::builder(id, name, "https://stub.test/{ip}")
                    .build()
                    .unwrap(),
            )
        }
    }

    impl Source for Stub {
        fn descriptor(&self) -> &SourceDescriptor {
            &self.0
        }

        fn parse_response(&self, _body: &[u8], status_code: u16) -> Result<SourceResult> {
            Ok(SourceResult::empty(self, status_code))
        }
    }

    fn abc() -> SourceRegistry {
        SourceRegistry::builder()
            .with_source(Stub::new("c", "Charlie"))
            .with_source(Stub::new("a", "Alpha"))
            .with_source(Stub::new("b", "Bravo"))
            .build()
            .unwrap()
    }

    fn ids(sources: &[Arc<dyn Source>]) -> Vec<&str> {
        sources.iter().map(|s| s.id()).collect()
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = abc();
        let err = registry.register(Stub::new("a", "Other")).unwrap_err();
        assert!(matches!(err, IpEnrichError::DuplicateSource { ref id } if id == "a"));
        assert_eq!(registry.get("a").unwrap().name(), "Alpha");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn builder_surfaces_duplicates() {
        let result = SourceRegistry::builder()
            .with_source(Stub::new("a", "Alpha"))
            .with_source(Stub::new("a", "Alpha again"))
            .build();
        assert!(matches!(result, Err(IpEnrichError::DuplicateSource { .. })));
    }

    #[test]
    fn listing_is_sorted() {
        let registry = SourceRegistry::new();
        registry.register(Stub::new("zz", "Aardvark")).unwrap();
        registry.register(Stub::new("aa", "Zebra")).unwrap();
        assert_eq!(ids(&registry.all()), ["zz", "aa"]);
        assert_eq!(registry.ids(), ["aa", "zz"]);
    }

    #[test]
    fn empty_filter_means_all() {
        let registry = abc();
        let none: [&str; 0] = [];
        assert_eq!(ids(&registry.filter(&none)), ids(&registry.all()));
    }

    #[test]
    fn filter_drops_unknown_and_duplicates() {
        let registry = abc();
        let requested = ["a", "z", "a"];
        assert_eq!(ids(&registry.filter(&requested)), ["a"]);
        assert_eq!(registry.validate(&requested), ["z"]);
    }

    #[test]
    fn filter_orders_by_name_not_request() {
        let registry = abc();
        let requested = vec!["c".to_string(), "a".to_string()];
        assert_eq!(ids(&registry.filter(&requested)), ["a", "c"]);
        assert!(registry.validate(&requested).is_empty());
    }

    #[test]
    fn validate_dedupes_in_request_order() {
        let registry = abc();
        assert_eq!(registry.validate(&["y", "x", "y", "b"]), ["y", "x"]);
    }

    #[test]
    fn concurrent_lookups() {
        let registry = Arc::new(abc());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.filter(&["b", "c"]).len())
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 2);
        }
    }
}
