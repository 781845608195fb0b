use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;
use weft_terms::Term;

use crate::RewriteError;

/// A native operator: rewrites the current term or fails.
pub type Primitive = Arc<dyn Fn(&Term) -> crate::Result<Term> + Send + Sync>;

/// Lookup table of native operators, keyed by strategy name.
///
/// Libraries install into this table in a fixed order; a library may extend
/// entries established by an earlier one, so installation order is part of
/// the interpreter's configuration.
#[derive(Default)]
pub struct OperatorTable {
    entries: HashMap<SmolStr, Primitive>,
    libraries: Vec<&'static str>,
}

impl OperatorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<SmolStr>, primitive: Primitive) {
        self.entries.insert(name.into(), primitive);
    }

    pub fn get(&self, name: &str) -> Option<&Primitive> {
        self.entries.get(name)
    }

    pub fn has_library(&self, name: &str) -> bool {
        self.libraries.contains(&name)
    }

    pub(crate) fn record_library(&mut self, name: &'static str) {
        self.libraries.push(name);
    }

    /// Library names in installation order.
    pub fn libraries(&self) -> &[&'static str] {
        &self.libraries
    }
}

impl fmt::Debug for OperatorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("OperatorTable")
            .field("operators", &names)
            .field("libraries", &self.libraries)
            .finish()
    }
}

/// A fixed set of native operators installed into an [`OperatorTable`].
pub trait PrimitiveLibrary {
    fn name(&self) -> &'static str;

    fn install(&self, ops: &mut OperatorTable) -> crate::Result<()>;
}

fn fail(strategy: &str) -> RewriteError {
    RewriteError::StrategyFailed {
        strategy: SmolStr::new(strategy),
    }
}

/// Parsing-support operators: structural decomposition of terms.
pub struct ParseSupportLibrary;

impl ParseSupportLibrary {
    pub const NAME: &'static str = "parse-support";
}

impl PrimitiveLibrary for ParseSupportLibrary {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn install(&self, ops: &mut OperatorTable) -> crate::Result<()> {
        ops.register(
            "explode",
            Arc::new(|term: &Term| match term {
                Term::Appl(name, args) => Ok(Term::List(vec![
                    Term::Str(name.to_string()),
                    Term::List(args.clone()),
                ])),
                _ => Err(fail("explode")),
            }),
        );
        ops.register(
            "implode",
            Arc::new(|term: &Term| match term {
                Term::List(items) => match items.as_slice() {
                    [Term::Str(name), Term::List(args)] => {
                        Ok(Term::appl(name.as_str(), args.clone()))
                    }
                    _ => Err(fail("implode")),
                },
                _ => Err(fail("implode")),
            }),
        );
        ops.register(
            "term-size",
            Arc::new(|term: &Term| Ok(Term::Int(term.size() as i64))),
        );
        Ok(())
    }
}

/// Editor-support operators.
///
/// Must be installed after [`ParseSupportLibrary`]: `origin-explode` wraps the
/// `explode` operator that library establishes.
pub struct EditorSupportLibrary;

impl EditorSupportLibrary {
    pub const NAME: &'static str = "editor-support";
}

impl PrimitiveLibrary for EditorSupportLibrary {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn install(&self, ops: &mut OperatorTable) -> crate::Result<()> {
        if !ops.has_library(ParseSupportLibrary::NAME) {
            return Err(RewriteError::LibraryOrder {
                library: Self::NAME,
                requires: ParseSupportLibrary::NAME,
            });
        }
        let explode = ops
            .get("explode")
            .cloned()
            .ok_or(RewriteError::LibraryOrder {
                library: Self::NAME,
                requires: ParseSupportLibrary::NAME,
            })?;
        ops.register(
            "origin-explode",
            Arc::new(move |term: &Term| {
                let exploded = explode(term)?;
                Ok(Term::appl("Origin", vec![exploded]))
            }),
        );
        ops.register(
            "annotate",
            Arc::new(|term: &Term| Ok(Term::appl("Annotated", vec![term.clone()]))),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(libs: &[&dyn PrimitiveLibrary]) -> crate::Result<OperatorTable> {
        let mut ops = OperatorTable::new();
        for lib in libs {
            lib.install(&mut ops)?;
            ops.record_library(lib.name());
        }
        Ok(ops)
    }

    #[test]
    fn editor_support_requires_parse_support_first() {
        let err = table_with(&[&EditorSupportLibrary]).unwrap_err();
        assert!(matches!(err, RewriteError::LibraryOrder { .. }));
    }

    #[test]
    fn explode_implode_are_inverses_on_applications() {
        let ops = table_with(&[&ParseSupportLibrary]).unwrap();
        let term = Term::parse("Pair(1, 2)").unwrap();
        let exploded = ops.get("explode").unwrap()(&term).unwrap();
        let imploded = ops.get("implode").unwrap()(&exploded).unwrap();
        assert_eq!(imploded, term);
    }

    #[test]
    fn origin_explode_wraps_the_established_operator() {
        let ops = table_with(&[&ParseSupportLibrary, &EditorSupportLibrary]).unwrap();
        let out = ops.get("origin-explode").unwrap()(&Term::atom("Nil")).unwrap();
        assert_eq!(out, Term::parse("Origin([\"Nil\", []])").unwrap());
    }

    #[test]
    fn explode_fails_on_non_application() {
        let ops = table_with(&[&ParseSupportLibrary]).unwrap();
        assert!(ops.get("explode").unwrap()(&Term::Int(1)).is_err());
    }
}
