use std::collections::HashMap;

use smol_str::SmolStr;
use weft_terms::Term;

use crate::library::{OperatorTable, PrimitiveLibrary};
use crate::rules::{parse_definitions, Rule};
use crate::RewriteError;

/// The rewriting engine: loaded rules, installed operators, and the current
/// term.
///
/// By default strategy failures (a rule set that does not match, an unknown
/// strategy name) are absorbed: they are logged and reported as `Ok(false)`.
/// Embedders that want failures to propagate — the guarded environment does —
/// turn this off with [`Interpreter::set_catch_failures`].
#[derive(Debug)]
pub struct Interpreter {
    rules: HashMap<SmolStr, Vec<Rule>>,
    ops: OperatorTable,
    current: Term,
    catch_failures: bool,
}

/// The cloneable part of an interpreter: loaded rules, but not the current
/// term or operator table. Operator tables are rebuilt by re-installing
/// libraries so that install-order side effects are re-established.
#[derive(Debug, Clone, Default)]
pub struct InterpreterConfig {
    rules: HashMap<SmolStr, Vec<Rule>>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::from_config(InterpreterConfig::default())
    }

    pub fn from_config(config: InterpreterConfig) -> Self {
        Self {
            rules: config.rules,
            ops: OperatorTable::new(),
            current: Term::List(Vec::new()),
            catch_failures: true,
        }
    }

    pub fn configuration(&self) -> InterpreterConfig {
        InterpreterConfig {
            rules: self.rules.clone(),
        }
    }

    pub fn install_library(&mut self, library: &dyn PrimitiveLibrary) -> crate::Result<()> {
        library.install(&mut self.ops)?;
        self.ops.record_library(library.name());
        tracing::debug!(target: "weft.rewrite", library = library.name(), "installed library");
        Ok(())
    }

    pub fn operators(&self) -> &OperatorTable {
        &self.ops
    }

    /// Parses and appends strategy definitions; returns the number of rules
    /// loaded.
    pub fn load_definitions(&mut self, text: &str) -> crate::Result<usize> {
        let rules = parse_definitions(text)?;
        let count = rules.len();
        for rule in rules {
            self.rules.entry(rule.strategy.clone()).or_default().push(rule);
        }
        Ok(count)
    }

    pub fn current(&self) -> &Term {
        &self.current
    }

    pub fn set_current(&mut self, term: Term) {
        self.current = term;
    }

    pub fn catch_failures(&self) -> bool {
        self.catch_failures
    }

    pub fn set_catch_failures(&mut self, catch: bool) {
        self.catch_failures = catch;
    }

    /// Invokes a strategy against the current term.
    ///
    /// Rules registered under the name are tried in load order before native
    /// operators. On success the current term is replaced and `Ok(true)` is
    /// returned. Failure behavior depends on [`Interpreter::catch_failures`].
    pub fn invoke(&mut self, strategy: &str) -> crate::Result<bool> {
        match self.rewrite(strategy) {
            Ok(term) => {
                self.current = term;
                Ok(true)
            }
            Err(err)
                if self.catch_failures
                    && matches!(
                        err,
                        RewriteError::StrategyFailed { .. }
                            | RewriteError::UnknownStrategy { .. }
                    ) =>
            {
                tracing::warn!(
                    target: "weft.rewrite",
                    strategy,
                    error = %err,
                    "strategy failure absorbed"
                );
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    fn rewrite(&self, strategy: &str) -> crate::Result<Term> {
        if let Some(rules) = self.rules.get(strategy) {
            for rule in rules {
                if let Some(term) = rule.apply(&self.current)? {
                    return Ok(term);
                }
            }
            return Err(RewriteError::StrategyFailed {
                strategy: SmolStr::new(strategy),
            });
        }
        if let Some(primitive) = self.ops.get(strategy) {
            return primitive(&self.current);
        }
        Err(RewriteError::UnknownStrategy {
            strategy: SmolStr::new(strategy),
        })
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{EditorSupportLibrary, ParseSupportLibrary};

    fn engine_with_rules(defs: &str) -> Interpreter {
        let mut interp = Interpreter::new();
        interp.load_definitions(defs).unwrap();
        interp
    }

    #[test]
    fn invoke_applies_first_matching_rule() {
        let mut interp = engine_with_rules(
            "norm: Plus(?a, 0) -> ?a\nnorm: Plus(0, ?a) -> ?a\n",
        );
        interp.set_current(Term::parse("Plus(0, 7)").unwrap());
        assert!(interp.invoke("norm").unwrap());
        assert_eq!(interp.current(), &Term::Int(7));
    }

    #[test]
    fn absorbed_failure_leaves_current_term_intact() {
        let mut interp = engine_with_rules("norm: Plus(?a, 0) -> ?a\n");
        interp.set_current(Term::Int(3));
        assert!(!interp.invoke("norm").unwrap());
        assert!(!interp.invoke("no-such-strategy").unwrap());
        assert_eq!(interp.current(), &Term::Int(3));
    }

    #[test]
    fn uncaught_failure_propagates() {
        let mut interp = Interpreter::new();
        interp.set_catch_failures(false);
        let err = interp.invoke("missing").unwrap_err();
        assert!(matches!(err, RewriteError::UnknownStrategy { .. }));
    }

    #[test]
    fn rule_errors_propagate_even_when_catching() {
        let mut interp = engine_with_rules("bad: Nil -> ?x\n");
        interp.set_current(Term::atom("Nil"));
        let err = interp.invoke("bad").unwrap_err();
        assert!(matches!(err, RewriteError::UnboundVariable { .. }));
    }

    #[test]
    fn operators_resolve_after_rules() {
        let mut interp = Interpreter::new();
        interp.install_library(&ParseSupportLibrary).unwrap();
        interp.install_library(&EditorSupportLibrary).unwrap();
        interp.set_current(Term::parse("Pair(1, 2)").unwrap());
        assert!(interp.invoke("term-size").unwrap());
        assert_eq!(interp.current(), &Term::Int(3));
    }

    #[test]
    fn configuration_clones_rules_but_not_state() {
        let mut interp = engine_with_rules("id: ?x -> ?x\n");
        interp.set_current(Term::Int(9));
        let clone = Interpreter::from_config(interp.configuration());
        assert_eq!(clone.current(), &Term::List(Vec::new()));
        assert!(clone.rules.contains_key("id"));
        assert!(clone.operators().libraries().is_empty());
    }
}
