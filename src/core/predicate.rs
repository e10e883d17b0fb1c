//! Activation predicates.
//!
//! Rules carry their conditions as data so the whole rule table can be
//! inspected before anything runs. One evaluator interprets every shape:
//!
//! ```toml
//! when = "always"
//! when = { enabled = "qt5" }
//! when = { all = [{ enabled = "qt5" }, { enabled = "python" }, { disabled = "python3" }] }
//! when = { equals = { option = "window-system", value = "x11" } }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::registry::OptionRegistry;
use crate::core::resolved::ResolvedOptions;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Predicate {
    #[default]
    Always,
    Enabled(String),
    Disabled(String),
    Equals {
        option: String,
        value: String,
    },
    /// Matches the host operating system captured in the snapshot.
    Os(String),
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
    /// Exactly one of the listed options is truthy.
    ExactlyOne(Vec<String>),
}

impl Predicate {
    pub fn enabled(id: impl Into<String>) -> Self {
        Predicate::Enabled(id.into())
    }

    pub fn disabled(id: impl Into<String>) -> Self {
        Predicate::Disabled(id.into())
    }

    pub fn is_always(&self) -> bool {
        matches!(self, Predicate::Always)
    }

    /// Evaluate against a single resolved snapshot.
    pub fn evaluate(&self, opts: &ResolvedOptions) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::Enabled(id) => opts.is_enabled(id),
            Predicate::Disabled(id) => !opts.is_enabled(id),
            Predicate::Equals { option, value } => {
                opts.get(option).is_some_and(|v| v.to_string() == *value)
            }
            Predicate::Os(os) => opts.platform().os == *os,
            Predicate::All(preds) => preds.iter().all(|p| p.evaluate(opts)),
            Predicate::Any(preds) => preds.iter().any(|p| p.evaluate(opts)),
            Predicate::Not(pred) => !pred.evaluate(opts),
            Predicate::ExactlyOne(ids) => ids.iter().filter(|id| opts.is_enabled(id)).count() == 1,
        }
    }

    /// Every option identifier this predicate reads, in first-seen order.
    pub fn options(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_options(&mut out);
        out
    }

    fn collect_options<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Predicate::Always | Predicate::Os(_) => {}
            Predicate::Enabled(id) | Predicate::Disabled(id) => push_unique(out, id),
            Predicate::Equals { option, .. } => push_unique(out, option),
            Predicate::ExactlyOne(ids) => ids.iter().for_each(|id| push_unique(out, id)),
            Predicate::All(preds) | Predicate::Any(preds) => {
                for pred in preds {
                    pred.collect_options(out);
                }
            }
            Predicate::Not(pred) => pred.collect_options(out),
        }
    }

    /// Check every referenced option against the registry.
    pub fn check(&self, registry: &OptionRegistry) -> Result<(), String> {
        match self {
            Predicate::Equals { option, value } => {
                let decl = registry
                    .get(option)
                    .ok_or_else(|| format!("unknown option `{}`", option))?;
                if !decl.accepts(value) {
                    return Err(format!("`{}` is not a valid value for option `{}`", value, option));
                }
                Ok(())
            }
            Predicate::All(preds) | Predicate::Any(preds) => {
                preds.iter().try_for_each(|p| p.check(registry))
            }
            Predicate::Not(pred) => pred.check(registry),
            _ => {
                for id in self.options() {
                    if registry.get(id).is_none() {
                        return Err(format!("unknown option `{}`", id));
                    }
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Always => f.write_str("always"),
            Predicate::Enabled(id) => f.write_str(id),
            Predicate::Disabled(id) => write!(f, "!{}", id),
            Predicate::Equals { option, value } => write!(f, "{} == {}", option, value),
            Predicate::Os(os) => write!(f, "os == {}", os),
            Predicate::All(preds) => write_joined(f, preds, " && "),
            Predicate::Any(preds) => write_joined(f, preds, " || "),
            Predicate::Not(pred) => write!(f, "!({})", pred),
            Predicate::ExactlyOne(ids) => write!(f, "exactly one of [{}]", ids.join(", ")),
        }
    }
}

fn push_unique<'a>(out: &mut Vec<&'a str>, id: &'a str) {
    if !out.contains(&id) {
        out.push(id);
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, preds: &[Predicate], sep: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, pred) in preds.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", pred)?;
    }
    f.write_str(")")
}
