use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use smol_str::SmolStr;

use crate::descriptor::{DescriptorConfig, LanguageDescriptor};
use crate::diagnostics::DiagnosticSink;
use crate::sync::lock_recovering;
use crate::table::ParseTable;
use crate::{EnvError, Result};

/// Resolves a language's parse table either lazily through the descriptor's
/// provider function or from an already-loaded managed table.
#[derive(Debug, Clone)]
pub enum ParseTableProvider {
    /// Defers to the descriptor's provider function; nothing is evaluated
    /// until [`ParseTableProvider::table`] is called.
    Dynamic(Arc<LanguageDescriptor>),
    Static(Arc<ParseTable>),
}

impl ParseTableProvider {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, ParseTableProvider::Dynamic(_))
    }

    pub fn table(&self) -> Result<Arc<ParseTable>> {
        match self {
            ParseTableProvider::Dynamic(descriptor) => descriptor.provide_table(),
            ParseTableProvider::Static(table) => Ok(table.clone()),
        }
    }
}

/// Language-keyed registries: descriptors, managed parse tables (owned by the
/// descriptor system), and unmanaged parse tables (registered ad hoc, e.g.
/// for embedded or test grammars).
///
/// Each map sits behind its own short-lived mutex; slow work (descriptor
/// reinitialization) always runs on a snapshot taken after the map lock is
/// released. These locks are internal and unrelated to the environment's
/// interpreter lock.
pub struct LanguageRegistry {
    descriptors: Mutex<HashMap<SmolStr, Arc<LanguageDescriptor>>>,
    managed: Mutex<HashMap<SmolStr, Arc<ParseTable>>>,
    unmanaged: Mutex<HashMap<SmolStr, Arc<ParseTable>>>,
    sink: Arc<dyn DiagnosticSink>,
}

impl LanguageRegistry {
    pub(crate) fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            descriptors: Mutex::new(HashMap::new()),
            managed: Mutex::new(HashMap::new()),
            unmanaged: Mutex::new(HashMap::new()),
            sink,
        }
    }

    /// Registers (or replaces) the descriptor for a language.
    ///
    /// On replacement the new descriptor absorbs the old one's active
    /// services before becoming visible, and the old descriptor is then
    /// reinitialized against the new one. The registration itself always
    /// takes effect; a failure reinitializing the *old* descriptor goes to
    /// the diagnostic sink, like the unmanaged-table fan-out.
    pub fn register_descriptor(&self, config: DescriptorConfig) -> Result<Arc<LanguageDescriptor>> {
        let descriptor = Arc::new(LanguageDescriptor::new(config)?);
        let language = descriptor.language().clone();

        let previous = {
            let mut descriptors = lock_recovering(&self.descriptors, "descriptor map");
            if let Some(old) = descriptors.get(&language) {
                descriptor.absorb_services_from(old);
            }
            descriptors.insert(language.clone(), descriptor.clone())
        };

        if let Some(old) = previous {
            tracing::info!(
                target: "weft.env.registry",
                language = %language,
                old = %old.id(),
                new = %descriptor.id(),
                "replacing language descriptor"
            );
            if let Err(err) = old.reinitialize(Some(&descriptor)) {
                self.sink.error(
                    &format!("reinitialization of replaced descriptor for `{language}` failed"),
                    &err,
                );
            }
        } else {
            tracing::info!(
                target: "weft.env.registry",
                language = %language,
                id = %descriptor.id(),
                "registered language descriptor"
            );
        }
        Ok(descriptor)
    }

    /// Current descriptor for a language, if registered.
    pub fn descriptor(&self, language: &str) -> Option<Arc<LanguageDescriptor>> {
        lock_recovering(&self.descriptors, "descriptor map")
            .get(language)
            .cloned()
    }

    /// Stores a managed parse table for a language; last write wins. Returns
    /// the shared handle.
    pub fn register_parse_table(
        &self,
        language: impl Into<SmolStr>,
        table: ParseTable,
    ) -> Arc<ParseTable> {
        let language = language.into();
        let table = Arc::new(table);
        lock_recovering(&self.managed, "managed table map").insert(language.clone(), table.clone());
        tracing::debug!(
            target: "weft.env.registry",
            language = %language,
            grammar = table.grammar(),
            "registered managed parse table"
        );
        table
    }

    /// Stores a parse table outside the descriptor system, then reinitializes
    /// every descriptor that declares a dependency on `name`.
    ///
    /// The descriptor set is snapshotted under a short-lived lock before the
    /// fan-out, so reinitialization (which may be slow) never runs with the
    /// map locked. One descriptor's failure is reported to the diagnostic
    /// sink and does not stop the others.
    pub fn register_unmanaged_parse_table(&self, name: impl Into<SmolStr>, table: ParseTable) {
        let name = name.into();
        let table = Arc::new(table);
        lock_recovering(&self.unmanaged, "unmanaged table map").insert(name.clone(), table);

        let snapshot: Vec<Arc<LanguageDescriptor>> =
            lock_recovering(&self.descriptors, "descriptor map")
                .values()
                .cloned()
                .collect();

        for descriptor in snapshot {
            if !descriptor.depends_on(&name) {
                continue;
            }
            if let Err(err) = descriptor.reinitialize(None) {
                self.sink.error(
                    &format!(
                        "reinitialization of `{}` after registering unmanaged table `{name}` failed",
                        descriptor.language()
                    ),
                    &err,
                );
            }
        }
    }

    pub fn unmanaged_parse_table(&self, name: &str) -> Option<Arc<ParseTable>> {
        lock_recovering(&self.unmanaged, "unmanaged table map")
            .get(name)
            .cloned()
    }

    /// The parse-table provider for a language: the descriptor's dynamic
    /// provider when one is declared, otherwise the managed table.
    ///
    /// Absence of both is a configuration bug and fails with
    /// [`EnvError::NotAvailable`].
    pub fn parse_table_provider(&self, language: &str) -> Result<ParseTableProvider> {
        if let Some(descriptor) = self.descriptor(language) {
            if descriptor.has_provider() {
                return Ok(ParseTableProvider::Dynamic(descriptor));
            }
        }
        if let Some(table) = lock_recovering(&self.managed, "managed table map").get(language) {
            return Ok(ParseTableProvider::Static(table.clone()));
        }
        Err(EnvError::NotAvailable {
            language: SmolStr::new(language),
        })
    }
}

impl std::fmt::Debug for LanguageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let languages: Vec<SmolStr> = lock_recovering(&self.descriptors, "descriptor map")
            .keys()
            .cloned()
            .collect();
        f.debug_struct("LanguageRegistry")
            .field("languages", &languages)
            .finish()
    }
}
