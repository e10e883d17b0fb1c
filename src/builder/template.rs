//! Placeholder expansion for recipe argument templates.
//!
//! `{name}` is replaced by the bound value; `{{` and `}}` produce literal
//! braces. Every placeholder must be bound: an unknown name is an error,
//! never an empty string.

use std::collections::BTreeMap;

use crate::core::errors::RiggingError;

#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    values: BTreeMap<String, String>,
}

impl TemplateContext {
    pub fn new() -> Self {
        TemplateContext::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn expand(&self, template: &str) -> Result<String, RiggingError> {
        let mut out = String::with_capacity(template.len());
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(unresolved(format!("{{{}", name), template));
                    }
                    match self.values.get(name.trim()) {
                        Some(value) => out.push_str(value),
                        None => return Err(unresolved(name, template)),
                    }
                }
                c => out.push(c),
            }
        }

        Ok(out)
    }
}

fn unresolved(placeholder: String, template: &str) -> RiggingError {
    RiggingError::UnresolvedPlaceholder {
        placeholder,
        template: template.to_string(),
    }
}
