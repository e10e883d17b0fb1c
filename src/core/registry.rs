//! Option registry - declaration and resolution of build options.
//!
//! The registry owns every option a recipe declares plus its deprecated
//! aliases. Resolution turns a user request into a [`ResolvedOptions`]
//! snapshot: aliases are rewritten to their canonical identifier (with a
//! non-fatal deprecation notice) and unrequested options take their default.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::core::errors::{RiggingError, ValidationError, ValidationKind};
use crate::core::option::{OptionDecl, OptionKind, OptionValue};
use crate::core::resolved::{Platform, ResolvedOptions};

/// A deprecated identifier pointing at its canonical replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub canonical: String,
    /// Requesting the alias truthy sets the canonical switch falsy.
    pub invert: bool,
}

/// Emitted when a request used a deprecated alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeprecationNotice {
    pub alias: String,
    pub canonical: String,
    pub invert: bool,
}

impl fmt::Display for DeprecationNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.invert {
            write!(
                f,
                "option `{}` is deprecated; use `--without {}` instead",
                self.alias, self.canonical
            )
        } else {
            write!(
                f,
                "option `{}` is deprecated; use `{}` instead",
                self.alias, self.canonical
            )
        }
    }
}

/// Requested option values, in the order the user gave them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionRequest {
    entries: Vec<(String, String)>,
}

impl OptionRequest {
    pub fn new() -> Self {
        OptionRequest::default()
    }

    /// Request `id = value`.
    pub fn set(mut self, id: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.push((id.into(), value.into()));
        self
    }

    pub fn enable(self, id: impl Into<String>) -> Self {
        self.set(id, "true")
    }

    pub fn disable(self, id: impl Into<String>) -> Self {
        self.set(id, "false")
    }

    /// Add a `KEY=VALUE` or bare `KEY` (meaning true) entry.
    pub fn push_entry(self, entry: &str) -> Self {
        match entry.split_once('=') {
            Some((id, value)) => self.set(id.trim(), value.trim()),
            None => self.enable(entry.trim()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The outcome of [`OptionRegistry::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub options: ResolvedOptions,
    pub notices: Vec<DeprecationNotice>,
}

/// The set of options a recipe declares.
#[derive(Debug, Clone, Default)]
pub struct OptionRegistry {
    options: Vec<OptionDecl>,
    index: HashMap<String, usize>,
    aliases: BTreeMap<String, Alias>,
}

impl OptionRegistry {
    pub fn new() -> Self {
        OptionRegistry::default()
    }

    /// Register an option. Identifiers are unique across options and aliases.
    pub fn register(&mut self, option: OptionDecl) -> Result<(), RiggingError> {
        if self.index.contains_key(&option.id) || self.aliases.contains_key(&option.id) {
            return Err(RiggingError::DuplicateOption { option: option.id });
        }
        if let Err(message) = validate_default(&option) {
            return Err(RiggingError::invalid_recipe(message));
        }
        self.index.insert(option.id.clone(), self.options.len());
        self.options.push(option);
        Ok(())
    }

    /// Register a deprecated alias for an already registered option.
    pub fn register_alias(
        &mut self,
        alias: impl Into<String>,
        canonical: impl Into<String>,
        invert: bool,
    ) -> Result<(), RiggingError> {
        let alias = alias.into();
        let canonical = canonical.into();

        if self.index.contains_key(&alias) || self.aliases.contains_key(&alias) {
            return Err(RiggingError::DuplicateOption { option: alias });
        }
        if self.aliases.contains_key(&canonical) {
            return Err(RiggingError::invalid_recipe(format!(
                "alias `{}` points at `{}`, which is itself an alias",
                alias, canonical
            )));
        }
        let decl = self.get(&canonical).ok_or_else(|| {
            RiggingError::invalid_recipe(format!(
                "alias `{}` points at unknown option `{}`",
                alias, canonical
            ))
        })?;
        if invert && !decl.is_switch() {
            return Err(RiggingError::invalid_recipe(format!(
                "alias `{}` inverts `{}`, which is not a switch",
                alias, canonical
            )));
        }

        self.aliases.insert(alias, Alias { canonical, invert });
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&OptionDecl> {
        self.index.get(id).map(|&i| &self.options[i])
    }

    pub fn alias(&self, id: &str) -> Option<&Alias> {
        self.aliases.get(id)
    }

    /// Options in declaration order.
    pub fn options(&self) -> &[OptionDecl] {
        &self.options
    }

    pub fn aliases(&self) -> impl Iterator<Item = (&str, &Alias)> {
        self.aliases.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Resolve a request against the host platform.
    pub fn resolve(&self, request: &OptionRequest) -> Result<Resolution, RiggingError> {
        self.resolve_on(request, Platform::host())
    }

    /// Resolve a request, capturing the given platform in the snapshot.
    pub fn resolve_on(
        &self,
        request: &OptionRequest,
        platform: Platform,
    ) -> Result<Resolution, RiggingError> {
        let mut assigned: BTreeMap<String, (OptionValue, String)> = BTreeMap::new();
        let mut notices = Vec::new();

        for (requested, raw) in request.iter() {
            let (canonical, invert) = if self.index.contains_key(requested) {
                (requested, false)
            } else if let Some(alias) = self.aliases.get(requested) {
                let notice = DeprecationNotice {
                    alias: requested.to_string(),
                    canonical: alias.canonical.clone(),
                    invert: alias.invert,
                };
                tracing::debug!("{}", notice);
                if !notices.contains(&notice) {
                    notices.push(notice);
                }
                (alias.canonical.as_str(), alias.invert)
            } else {
                return Err(RiggingError::UnknownOption {
                    option: requested.to_string(),
                    suggestions: self.suggest(requested),
                });
            };

            let decl = &self.options[self.index[canonical]];
            let mut value = decl.parse_value(raw)?;
            if invert {
                if let OptionValue::Switch(on) = value {
                    value = OptionValue::Switch(!on);
                }
            }

            if let Some((previous, source)) = assigned.get(canonical) {
                if *previous != value {
                    let mut ids = vec![source.clone()];
                    if source != requested {
                        ids.push(requested.to_string());
                    }
                    return Err(ValidationError::new(
                        ValidationKind::ConflictingRequest,
                        format!(
                            "`{}` requested as both {} and {}",
                            canonical, previous, value
                        ),
                        ids,
                    )
                    .into());
                }
                continue;
            }
            assigned.insert(canonical.to_string(), (value, requested.to_string()));
        }

        let requested = assigned.len();
        let mut values = BTreeMap::new();
        for decl in &self.options {
            let value = match assigned.remove(&decl.id) {
                Some((value, _)) => value,
                None => decl.default.clone(),
            };
            values.insert(decl.id.clone(), value);
        }

        tracing::debug!(
            "resolved {} options ({} requested)",
            values.len(),
            requested
        );

        Ok(Resolution {
            options: ResolvedOptions::new(values, platform),
            notices,
        })
    }

    fn suggest(&self, requested: &str) -> Vec<String> {
        let needle = requested
            .trim_start_matches("with-")
            .trim_start_matches("without-");
        self.options
            .iter()
            .map(|o| o.id.as_str())
            .chain(self.aliases.keys().map(String::as_str))
            .filter(|id| id.contains(needle) || needle.contains(*id) || shares_prefix(id, needle))
            .map(str::to_string)
            .collect()
    }
}

fn shares_prefix(a: &str, b: &str) -> bool {
    let common = a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count();
    let shortest = a.chars().count().min(b.chars().count());
    common >= 2 && common + 1 >= shortest
}

fn validate_default(option: &OptionDecl) -> Result<(), String> {
    match (&option.kind, &option.default) {
        (OptionKind::Switch, OptionValue::Switch(_)) => Ok(()),
        (OptionKind::Choice(choices), OptionValue::Choice(value))
            if choices.contains(value) =>
        {
            Ok(())
        }
        _ => Err(format!(
            "default `{}` is not valid for option `{}`",
            option.default, option.id
        )),
    }
}
