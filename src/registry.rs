// Resolves a URL to the extractor that claims its host.
use crate::model::ConfigError;
use crate::parser::{
    AgrofyExtractor, Extractor, FetchContext, MercadoMaquinasExtractor, TratoresExtractor,
    host_matches,
};
use std::sync::Arc;

pub struct ExtractorRegistry {
    extractors: Vec<Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Registry with every supported marketplace, in resolution order.
    pub fn with_default_sites(ctx: FetchContext) -> Result<Self, ConfigError> {
        Self::new()
            .register(Arc::new(AgrofyExtractor::new(ctx.clone())))?
            .register(Arc::new(MercadoMaquinasExtractor::new(ctx.clone())))?
            .register(Arc::new(TratoresExtractor::new(ctx)))
    }

    /// Appends an extractor. Hosts may not overlap: registering `example` next to
    /// `siteA.example` is rejected because both would claim `siteA.example` URLs.
    pub fn register(mut self, extractor: Arc<dyn Extractor>) -> Result<Self, ConfigError> {
        let host = extractor.host();
        if let Some(existing) = self
            .extractors
            .iter()
            .find(|e| hosts_overlap(e.host(), host))
        {
            return Err(ConfigError::Invalid {
                field: "extractors",
                reason: format!(
                    "host {} claimed by both {} and {}",
                    host,
                    existing.name(),
                    extractor.name()
                ),
            });
        }
        self.extractors.push(extractor);
        Ok(self)
    }

    /// First registered extractor whose `matches` accepts the URL.
    pub fn resolve(&self, url: &str) -> Option<Arc<dyn Extractor>> {
        self.extractors.iter().find(|e| e.matches(url)).cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }
}

/// True when one host equals the other or is a subdomain of it.
fn hosts_overlap(a: &str, b: &str) -> bool {
    host_matches(a, b) || host_matches(b, a)
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakePages, StubExtractor};

    fn default_registry() -> ExtractorRegistry {
        let ctx = FetchContext::new(Arc::new(FakePages::new()), None);
        ExtractorRegistry::with_default_sites(ctx).unwrap()
    }

    #[test]
    fn resolves_each_supported_site() {
        let registry = default_registry();
        assert_eq!(registry.names(), vec!["agrofy", "mercadomaquinas", "tratoresecolheitadeiras"]);

        let name = |url: &str| registry.resolve(url).map(|e| e.name());
        assert_eq!(name("https://www.agrofy.com.br/trator"), Some("agrofy"));
        assert_eq!(name("https://www.mercadomaquinas.com.br/a/1"), Some("mercadomaquinas"));
        assert_eq!(
            name("https://www.tratoresecolheitadeiras.com.br/p/2"),
            Some("tratoresecolheitadeiras")
        );
    }

    #[test]
    fn unknown_host_resolves_to_none() {
        assert!(default_registry().resolve("https://unknown.example/y").is_none());
        assert!(default_registry().resolve("").is_none());
    }

    #[test]
    fn each_host_resolves_to_its_own_extractor() {
        let registry = ExtractorRegistry::new()
            .register(Arc::new(StubExtractor::new("siteA.example", FakePages::new())))
            .unwrap()
            .register(Arc::new(StubExtractor::new("siteB.example", FakePages::new())))
            .unwrap();

        assert_eq!(registry.resolve("https://siteA.example/x").unwrap().host(), "siteA.example");
        assert_eq!(registry.resolve("https://www.siteB.example/x").unwrap().host(), "siteB.example");
        assert!(registry.resolve("https://siteC.example/x").is_none());
    }

    #[test]
    fn overlapping_hosts_are_rejected_in_either_order() {
        let specific_first = ExtractorRegistry::new()
            .register(Arc::new(StubExtractor::new("siteA.example", FakePages::new())))
            .unwrap()
            .register(Arc::new(StubExtractor::new("example", FakePages::new())));
        assert!(specific_first.is_err());

        let broad_first = ExtractorRegistry::new()
            .register(Arc::new(StubExtractor::new("example", FakePages::new())))
            .unwrap()
            .register(Arc::new(StubExtractor::new("siteA.example", FakePages::new())));
        assert!(broad_first.is_err());

        let unrelated = ExtractorRegistry::new()
            .register(Arc::new(StubExtractor::new("ample", FakePages::new())))
            .unwrap()
            .register(Arc::new(StubExtractor::new("example", FakePages::new())));
        assert!(unrelated.is_ok());
    }

    #[test]
    fn duplicate_host_is_rejected() {
        let err = ExtractorRegistry::new()
            .register(Arc::new(StubExtractor::new("siteA.example", FakePages::new())))
            .unwrap()
            .register(Arc::new(StubExtractor::new("sitea.example", FakePages::new())))
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::Invalid { field: "extractors", .. }));
    }
}
