use std::collections::HashMap;

use smol_str::SmolStr;
use weft_terms::Term;

use crate::RewriteError;

/// A single named rewrite rule: when `lhs` matches the current term, the
/// bound variables are substituted into `rhs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub strategy: SmolStr,
    pub lhs: Term,
    pub rhs: Term,
}

impl Rule {
    /// Applies this rule to `term`, returning the rewritten term if the
    /// left-hand side matches.
    pub fn apply(&self, term: &Term) -> crate::Result<Option<Term>> {
        let mut bindings = HashMap::new();
        if !match_term(&self.lhs, term, &mut bindings) {
            return Ok(None);
        }
        substitute(&self.strategy, &self.rhs, &bindings).map(Some)
    }
}

/// Parses strategy definitions, one rule per line:
///
/// ```text
/// # comment
/// desugar: Plus(?a, ?b) -> Add(?a, ?b)
/// ```
pub fn parse_definitions(text: &str) -> crate::Result<Vec<Rule>> {
    let mut rules = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let (name, body) = trimmed.split_once(':').ok_or_else(|| {
            RewriteError::MalformedDefinition {
                line,
                reason: "missing `:` between strategy name and rule".to_string(),
            }
        })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(RewriteError::MalformedDefinition {
                line,
                reason: "empty strategy name".to_string(),
            });
        }
        let (lhs, rhs) = body.split_once("->").ok_or_else(|| {
            RewriteError::MalformedDefinition {
                line,
                reason: "missing `->` between rule sides".to_string(),
            }
        })?;
        let lhs = Term::parse(lhs.trim()).map_err(|err| RewriteError::MalformedDefinition {
            line,
            reason: format!("left-hand side: {err}"),
        })?;
        let rhs = Term::parse(rhs.trim()).map_err(|err| RewriteError::MalformedDefinition {
            line,
            reason: format!("right-hand side: {err}"),
        })?;
        rules.push(Rule {
            strategy: SmolStr::new(name),
            lhs,
            rhs,
        });
    }
    Ok(rules)
}

/// First-order matching: variables in `pattern` bind subterms of `term`.
/// A variable seen twice must bind equal subterms.
pub(crate) fn match_term(
    pattern: &Term,
    term: &Term,
    bindings: &mut HashMap<SmolStr, Term>,
) -> bool {
    match (pattern, term) {
        (Term::Var(name), _) => match bindings.get(name) {
            Some(bound) => bound == term,
            None => {
                bindings.insert(name.clone(), term.clone());
                true
            }
        },
        (Term::Appl(pn, pargs), Term::Appl(tn, targs)) => {
            pn == tn
                && pargs.len() == targs.len()
                && pargs
                    .iter()
                    .zip(targs)
                    .all(|(p, t)| match_term(p, t, bindings))
        }
        (Term::List(pitems), Term::List(titems)) => {
            pitems.len() == titems.len()
                && pitems
                    .iter()
                    .zip(titems)
                    .all(|(p, t)| match_term(p, t, bindings))
        }
        (Term::Str(a), Term::Str(b)) => a == b,
        (Term::Int(a), Term::Int(b)) => a == b,
        _ => false,
    }
}

fn substitute(
    strategy: &SmolStr,
    template: &Term,
    bindings: &HashMap<SmolStr, Term>,
) -> crate::Result<Term> {
    match template {
        Term::Var(name) => bindings
            .get(name)
            .cloned()
            .ok_or_else(|| RewriteError::UnboundVariable {
                strategy: strategy.clone(),
                variable: name.clone(),
            }),
        Term::Appl(name, args) => {
            let args = args
                .iter()
                .map(|arg| substitute(strategy, arg, bindings))
                .collect::<crate::Result<Vec<_>>>()?;
            Ok(Term::Appl(name.clone(), args))
        }
        Term::List(items) => {
            let items = items
                .iter()
                .map(|item| substitute(strategy, item, bindings))
                .collect::<crate::Result<Vec<_>>>()?;
            Ok(Term::List(items))
        }
        Term::Str(_) | Term::Int(_) => Ok(template.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(def: &str) -> Rule {
        parse_definitions(def).unwrap().remove(0)
    }

    #[test]
    fn parse_skips_comments_and_blanks() {
        let rules = parse_definitions("# header\n\nswap: Pair(?a, ?b) -> Pair(?b, ?a)\n").unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].strategy, "swap");
    }

    #[test]
    fn apply_binds_and_substitutes() {
        let r = rule("swap: Pair(?a, ?b) -> Pair(?b, ?a)");
        let term = Term::parse("Pair(1, 2)").unwrap();
        let out = r.apply(&term).unwrap().unwrap();
        assert_eq!(out, Term::parse("Pair(2, 1)").unwrap());
    }

    #[test]
    fn nonlinear_pattern_requires_equal_bindings() {
        let r = rule("dup: Pair(?a, ?a) -> ?a");
        assert!(r.apply(&Term::parse("Pair(1, 2)").unwrap()).unwrap().is_none());
        assert_eq!(
            r.apply(&Term::parse("Pair(3, 3)").unwrap()).unwrap(),
            Some(Term::Int(3))
        );
    }

    #[test]
    fn unbound_rhs_variable_is_an_error() {
        let r = rule("bad: Nil -> ?missing");
        let err = r.apply(&Term::atom("Nil")).unwrap_err();
        assert!(matches!(err, RewriteError::UnboundVariable { .. }));
    }

    #[test]
    fn malformed_definition_reports_line() {
        let err = parse_definitions("ok: A -> B\nnope").unwrap_err();
        assert!(matches!(
            err,
            RewriteError::MalformedDefinition { line: 2, .. }
        ));
    }
}
