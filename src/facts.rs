//! Fact encoding for the declarative rule program.
//!
//! This module owns the mapping from domain entities to named, typed
//! predicates, and the textual rendering used as program source. Encoding a
//! well-formed entity cannot fail; malformed entities are a programming
//! error, not a runtime error.
//!
//! Rendering rules: numeric fields forward as bare numbers, timestamps
//! render as integer milliseconds since epoch, every other scalar renders as
//! a double-quoted string with `"` and `\` escaped.

use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use rand::Rng;
use regex::Regex;

use crate::issuer::Issuer;
use crate::path::{Hop, Path};
use crate::policy::Policy;
use crate::reading::{HopReading, ReadingValue};

/// Predicate name carrying the collection timestamp of a reading.
///
/// The validation prelude selects the latest reading per hop through this
/// predicate, so the name is part of the program contract.
pub const COLLECTED_DATE_PREDICATE: &str = "data_collected_date";

/// One argument of a ground predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactArg {
    /// Quoted string constant.
    Str(String),
    /// Bare integer constant.
    Int(i64),
}

impl fmt::Display for FactArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "\"{}\"", escape(s)),
            Self::Int(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for FactArg {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for FactArg {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<i64> for FactArg {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

/// A ground, variable-free statement: predicate name plus ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fact {
    /// Predicate name.
    pub name: String,
    /// Ordered arguments.
    pub args: Vec<FactArg>,
}

impl Fact {
    /// Creates a fact.
    #[must_use]
    pub fn new(name: impl Into<String>, args: Vec<FactArg>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Renders the fact as a program statement (with trailing period).
    #[must_use]
    pub fn statement(&self) -> String {
        format!("{self}.")
    }
}

impl fmt::Display for Fact {
    /// Renders the atom form, e.g. `contains("fp", "1-ff00:0:110")`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Renders a batch of facts as program source, one statement per line.
#[must_use]
pub fn render(facts: &[Fact]) -> String {
    facts
        .iter()
        .map(Fact::statement)
        .collect::<Vec<_>>()
        .join("\n")
}

/// `path("FP")`: the path subject.
#[must_use]
pub fn path_fact(path: &Path) -> Fact {
    Fact::new("path", vec![path.fingerprint.as_str().into()])
}

/// `hop("ISD-AS")`: one traversed AS.
#[must_use]
pub fn hop_fact(hop: &Hop) -> Fact {
    Fact::new("hop", vec![hop.isd_as.as_str().into()])
}

/// `contains("FP", "ISD-AS")`: hop membership in a path.
#[must_use]
pub fn contains_fact(path: &Path, hop: &Hop) -> Fact {
    Fact::new(
        "contains",
        vec![
            path.fingerprint.as_str().into(),
            hop.isd_as.as_str().into(),
        ],
    )
}

/// `collected("ISD-AS", "READING-ID")`: reading provenance.
#[must_use]
pub fn collected_fact(hop: &Hop, reading: &HopReading) -> Fact {
    Fact::new(
        "collected",
        vec![hop.isd_as.as_str().into(), reading.id.as_str().into()],
    )
}

/// Facts for one telemetry reading: the `data` subject, its collection
/// timestamp, its AS address, and one predicate per feed field.
#[must_use]
pub fn reading_facts(reading: &HopReading) -> Vec<Fact> {
    let id: FactArg = reading.id.as_str().into();

    let mut out = Vec::with_capacity(reading.fields.len() + 3);
    out.push(Fact::new("data", vec![id.clone()]));
    out.push(Fact::new(
        COLLECTED_DATE_PREDICATE,
        vec![id.clone(), reading.collected_at.timestamp_millis().into()],
    ));
    out.push(Fact::new(
        "isd_as",
        vec![id.clone(), reading.isd_as.as_str().into()],
    ));

    for (name, value) in &reading.fields {
        let arg = match value {
            ReadingValue::Integer(v) => FactArg::Int(*v),
            ReadingValue::Timestamp(t) => FactArg::Int(t.timestamp_millis()),
            ReadingValue::String(s) => FactArg::Str(s.clone()),
        };
        out.push(Fact::new(name.clone(), vec![id.clone(), arg]));
    }

    out
}

/// `issuer("ISSUER-ID")`: issuer as a meta-program subject.
#[must_use]
pub fn issuer_fact(issuer: &Issuer) -> Fact {
    Fact::new("issuer", vec![issuer.id.to_string().into()])
}

/// `policy("POLICY-ID")` and `has_issued("ISSUER-ID", "POLICY-ID")`:
/// policy as a meta-program subject.
#[must_use]
pub fn policy_facts(policy: &Policy) -> Vec<Fact> {
    vec![
        Fact::new("policy", vec![policy.id.to_string().into()]),
        Fact::new(
            "has_issued",
            vec![
                policy.issuer.id.to_string().into(),
                policy.id.to_string().into(),
            ],
        ),
    ]
}

/// `overrides("PID-A", "PID-B")`: the resolution goal atom asserting that
/// `a` has authority over `b`.
#[must_use]
pub fn overrides_atom(a: &Policy, b: &Policy) -> Fact {
    Fact::new(
        "overrides",
        vec![a.id.to_string().into(), b.id.to_string().into()],
    )
}

// ----------------------------------------------------------------------------
// Constant namespacing
// ----------------------------------------------------------------------------

/// Length of a generated namespace prefix token.
const PREFIX_LEN: usize = 6;

fn const_decl_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"#const\s+([a-z][A-Za-z0-9_]*)\s*=").expect("constant declaration regex")
    })
}

/// Rewrites symbolic constants so independently authored programs can be
/// merged without shadowing one another.
///
/// Two policies that coincidentally declare a constant of the same name
/// (e.g. `#const threshold = 10.`) must not silently share it once their
/// statements are concatenated. The namespacer assigns each program a fresh
/// prefix, unique within the batch, and rewrites every whole-word use of
/// each declared constant. Prefixes are scoped to one evaluation call and
/// never persisted.
#[derive(Debug, Default)]
pub struct ConstantNamespacer {
    used: HashSet<String>,
}

impl ConstantNamespacer {
    /// Creates a namespacer for one evaluation batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrites one program's declared constants under a fresh prefix.
    ///
    /// Programs that declare no constants come back unchanged.
    pub fn namespace(&mut self, statements: &str) -> String {
        let names: Vec<String> = const_decl_regex()
            .captures_iter(statements)
            .map(|c| c[1].to_string())
            .collect();
        if names.is_empty() {
            return statements.to_string();
        }

        let prefix = self.fresh_prefix();
        let mut out = statements.to_string();
        for name in names {
            let word = Regex::new(&format!(r"\b{}\b", regex::escape(&name)))
                .expect("constant name is a valid identifier");
            out = word
                .replace_all(&out, format!("{prefix}_{name}"))
                .into_owned();
        }
        out
    }

    /// Generates a prefix not yet used in this batch.
    ///
    /// Prefixes start with a lowercase letter so the rewritten identifier
    /// remains a valid symbolic constant.
    fn fresh_prefix(&mut self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let mut token = String::with_capacity(PREFIX_LEN);
            token.push(rng.gen_range(b'a'..=b'z') as char);
            for _ in 1..PREFIX_LEN {
                let c = match rng.gen_range(0u8..36) {
                    n @ 0..=25 => (b'a' + n) as char,
                    n => (b'0' + (n - 26)) as char,
                };
                token.push(c);
            }
            if self.used.insert(token.clone()) {
                return token;
            }
        }
    }
}
