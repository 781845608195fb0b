use std::fmt;

use smol_str::SmolStr;

/// A first-order term.
///
/// Constructor applications are keyed by name; nullary applications print
/// without parentheses. Variables (`?x`) only appear in rewrite-rule patterns,
/// never in fully evaluated terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Appl(SmolStr, Vec<Term>),
    List(Vec<Term>),
    Str(String),
    Int(i64),
    Var(SmolStr),
}

impl Term {
    pub fn appl(name: impl Into<SmolStr>, args: Vec<Term>) -> Self {
        Term::Appl(name.into(), args)
    }

    /// Nullary constructor application.
    pub fn atom(name: impl Into<SmolStr>) -> Self {
        Term::Appl(name.into(), Vec::new())
    }

    pub fn var(name: impl Into<SmolStr>) -> Self {
        Term::Var(name.into())
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Term::Var(_))
    }

    /// Total number of nodes in this term, including the root.
    pub fn size(&self) -> usize {
        match self {
            Term::Appl(_, args) | Term::List(args) => {
                1 + args.iter().map(Term::size).sum::<usize>()
            }
            Term::Str(_) | Term::Int(_) | Term::Var(_) => 1,
        }
    }

    /// Parses the textual term syntax. See the crate docs for the grammar.
    pub fn parse(input: &str) -> Result<Term, crate::TermError> {
        crate::parse::parse_term(input)
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Term]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Appl(name, args) if args.is_empty() => f.write_str(name),
            Term::Appl(name, args) => {
                write!(f, "{name}(")?;
                write_args(f, args)?;
                f.write_str(")")
            }
            Term::List(items) => {
                f.write_str("[")?;
                write_args(f, items)?;
                f.write_str("]")
            }
            Term::Str(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("\"")
            }
            Term::Int(n) => write!(f, "{n}"),
            Term::Var(name) => write!(f, "?{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_nullary_without_parens() {
        assert_eq!(Term::atom("Nil").to_string(), "Nil");
    }

    #[test]
    fn display_nested() {
        let t = Term::appl(
            "Pair",
            vec![
                Term::Int(1),
                Term::List(vec![Term::Str("a\"b".into()), Term::var("x")]),
            ],
        );
        assert_eq!(t.to_string(), "Pair(1, [\"a\\\"b\", ?x])");
    }

    #[test]
    fn only_variables_are_variables() {
        assert!(Term::var("x").is_var());
        assert!(!Term::atom("x").is_var());
        assert!(!Term::Str("x".into()).is_var());
    }

    #[test]
    fn size_counts_all_nodes() {
        let t = Term::appl("F", vec![Term::Int(1), Term::List(vec![Term::Int(2)])]);
        assert_eq!(t.size(), 4);
    }
}
