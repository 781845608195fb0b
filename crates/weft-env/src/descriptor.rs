use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use smol_str::SmolStr;

use crate::sync::lock_recovering;
use crate::table::ParseTable;
use crate::{EnvError, Result};

/// Process-unique identity for one descriptor *instance*.
///
/// Replacing a language's descriptor allocates a new id, which is what lets
/// callers distinguish "reinitialized against the replacement" from
/// "reinitialized in place".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorId(u64);

impl DescriptorId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for DescriptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "descriptor#{}", self.0)
    }
}

/// Host-supplied callable producing a parse table on demand (the "table
/// provider function" of a dynamically-parsed language).
pub type ProviderFn = Arc<dyn Fn() -> Result<ParseTable> + Send + Sync>;

/// Everything needed to construct a [`LanguageDescriptor`].
#[derive(Clone, Default)]
pub struct DescriptorConfig {
    pub language: SmolStr,
    pub provider_function: Option<SmolStr>,
    pub provider: Option<ProviderFn>,
    pub table_dependencies: Vec<SmolStr>,
    pub services: Vec<SmolStr>,
}

impl DescriptorConfig {
    pub fn new(language: impl Into<SmolStr>) -> Self {
        Self {
            language: language.into(),
            ..Self::default()
        }
    }

    /// Declares a dynamic table provider: the named function, backed by the
    /// given callable.
    pub fn with_provider(mut self, function: impl Into<SmolStr>, provider: ProviderFn) -> Self {
        self.provider_function = Some(function.into());
        self.provider = Some(provider);
        self
    }

    /// Declares a dependency on an unmanaged parse table; registering a table
    /// under that name reinitializes this descriptor.
    pub fn depends_on_table(mut self, name: impl Into<SmolStr>) -> Self {
        self.table_dependencies.push(name.into());
        self
    }

    pub fn with_service(mut self, service: impl Into<SmolStr>) -> Self {
        self.services.push(service.into());
        self
    }
}

impl fmt::Debug for DescriptorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorConfig")
            .field("language", &self.language)
            .field("provider_function", &self.provider_function)
            .field("has_provider", &self.provider.is_some())
            .field("table_dependencies", &self.table_dependencies)
            .field("services", &self.services)
            .finish()
    }
}

/// One loaded language definition.
///
/// Descriptors are replaced, never mutated in place: re-registering a
/// language builds a fresh descriptor which absorbs the old one's active
/// services before the old one is notified to reinitialize against it.
pub struct LanguageDescriptor {
    id: DescriptorId,
    language: SmolStr,
    provider_function: Option<SmolStr>,
    provider: Option<ProviderFn>,
    table_dependencies: Vec<SmolStr>,
    services: Mutex<BTreeSet<SmolStr>>,
    cached_table: Mutex<Option<Arc<ParseTable>>>,
    generation: AtomicU64,
    reinitialized_against: Mutex<Option<DescriptorId>>,
}

impl LanguageDescriptor {
    /// Validates and constructs a descriptor. Malformed configurations fail
    /// with [`EnvError::BadDescriptor`].
    pub fn new(config: DescriptorConfig) -> Result<Self> {
        let bad = |reason: String| EnvError::BadDescriptor {
            language: config.language.clone(),
            reason,
        };

        if config.language.is_empty() {
            return Err(bad("language name is empty".to_string()));
        }
        match (&config.provider_function, &config.provider) {
            (Some(function), Some(_)) if function.is_empty() => {
                return Err(bad("table provider function name is empty".to_string()))
            }
            (Some(function), None) => {
                return Err(bad(format!(
                    "provider function `{function}` declared without a callable"
                )))
            }
            (None, Some(_)) => {
                return Err(bad(
                    "provider callable supplied without a function name".to_string(),
                ))
            }
            _ => {}
        }
        if config.table_dependencies.iter().any(|name| name.is_empty()) {
            return Err(bad("empty unmanaged-table dependency name".to_string()));
        }
        if config.services.iter().any(|name| name.is_empty()) {
            return Err(bad("empty service name".to_string()));
        }

        Ok(Self {
            id: DescriptorId::next(),
            language: config.language,
            provider_function: config.provider_function,
            provider: config.provider,
            table_dependencies: config.table_dependencies,
            services: Mutex::new(config.services.into_iter().collect()),
            cached_table: Mutex::new(None),
            generation: AtomicU64::new(0),
            reinitialized_against: Mutex::new(None),
        })
    }

    pub fn id(&self) -> DescriptorId {
        self.id
    }

    pub fn language(&self) -> &SmolStr {
        &self.language
    }

    pub fn provider_function(&self) -> Option<&SmolStr> {
        self.provider_function.as_ref()
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn depends_on(&self, table: &str) -> bool {
        self.table_dependencies.iter().any(|name| name == table)
    }

    /// Snapshot of the active services attached to this descriptor.
    pub fn active_services(&self) -> BTreeSet<SmolStr> {
        lock_recovering(&self.services, "descriptor services").clone()
    }

    pub fn add_service(&self, service: impl Into<SmolStr>) {
        lock_recovering(&self.services, "descriptor services").insert(service.into());
    }

    /// Copies the predecessor's active services into this descriptor.
    pub(crate) fn absorb_services_from(&self, old: &LanguageDescriptor) {
        let inherited = old.active_services();
        lock_recovering(&self.services, "descriptor services").extend(inherited);
    }

    /// Number of completed reinitializations.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Id of the descriptor this one was last reinitialized against, if any.
    pub fn reinitialized_against(&self) -> Option<DescriptorId> {
        *lock_recovering(&self.reinitialized_against, "descriptor reinit record")
    }

    /// Reinitializes this descriptor: refreshes the dynamically-provided
    /// parse table (if any) and bumps the generation. When the descriptor is
    /// being replaced, `successor` is the replacement.
    ///
    /// The generation is bumped only after a successful refresh, so callers
    /// observing a new generation also observe the refreshed table.
    pub fn reinitialize(&self, successor: Option<&LanguageDescriptor>) -> Result<()> {
        if let Some(provider) = &self.provider {
            let table = Arc::new(provider()?);
            *lock_recovering(&self.cached_table, "descriptor table cache") = Some(table);
        }
        if let Some(successor) = successor {
            *lock_recovering(&self.reinitialized_against, "descriptor reinit record") =
                Some(successor.id);
        }
        self.generation.fetch_add(1, Ordering::Release);
        tracing::debug!(
            target: "weft.env",
            language = %self.language,
            id = %self.id,
            successor = successor.map(|s| s.id.0),
            "descriptor reinitialized"
        );
        Ok(())
    }

    /// Produces the parse table via the provider function, caching the
    /// result. Fails with [`EnvError::NotAvailable`] when no provider is
    /// configured.
    pub fn provide_table(&self) -> Result<Arc<ParseTable>> {
        let provider = self.provider.as_ref().ok_or_else(|| EnvError::NotAvailable {
            language: self.language.clone(),
        })?;
        let table = Arc::new(provider()?);
        *lock_recovering(&self.cached_table, "descriptor table cache") = Some(table.clone());
        Ok(table)
    }

    /// The most recently provided table, if the provider has run.
    pub fn cached_table(&self) -> Option<Arc<ParseTable>> {
        lock_recovering(&self.cached_table, "descriptor table cache").clone()
    }
}

impl fmt::Debug for LanguageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageDescriptor")
            .field("id", &self.id)
            .field("language", &self.language)
            .field("provider_function", &self.provider_function)
            .field("table_dependencies", &self.table_dependencies)
            .field("generation", &self.generation())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_language_name() {
        let err = LanguageDescriptor::new(DescriptorConfig::new("")).unwrap_err();
        assert!(matches!(err, EnvError::BadDescriptor { .. }));
    }

    #[test]
    fn rejects_provider_function_without_callable() {
        let mut config = DescriptorConfig::new("L");
        config.provider_function = Some("open-table".into());
        let err = LanguageDescriptor::new(config).unwrap_err();
        assert!(matches!(err, EnvError::BadDescriptor { .. }));
    }

    #[test]
    fn reinitialize_refreshes_provider_table_and_generation() {
        let config = DescriptorConfig::new("L").with_provider(
            "open-table",
            Arc::new(|| Ok(ParseTable::new("L", vec![1]))),
        );
        let descriptor = LanguageDescriptor::new(config).unwrap();
        assert_eq!(descriptor.provider_function().map(SmolStr::as_str), Some("open-table"));
        assert_eq!(descriptor.generation(), 0);
        assert!(descriptor.cached_table().is_none());

        descriptor.reinitialize(None).unwrap();
        assert_eq!(descriptor.generation(), 1);
        assert_eq!(descriptor.cached_table().unwrap().grammar(), "L");
    }

    #[test]
    fn failed_reinitialize_does_not_bump_generation() {
        let config = DescriptorConfig::new("L").with_provider(
            "open-table",
            Arc::new(|| {
                Err(EnvError::NotAvailable {
                    language: "L".into(),
                })
            }),
        );
        let descriptor = LanguageDescriptor::new(config).unwrap();
        assert!(descriptor.reinitialize(None).is_err());
        assert_eq!(descriptor.generation(), 0);
    }

    #[test]
    fn provide_table_without_provider_is_not_available() {
        let descriptor = LanguageDescriptor::new(DescriptorConfig::new("L")).unwrap();
        assert!(matches!(
            descriptor.provide_table().unwrap_err(),
            EnvError::NotAvailable { .. }
        ));
    }
}
