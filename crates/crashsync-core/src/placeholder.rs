//! Environment placeholder expansion for config trees
//!
//! String leaves may reference environment variables as `${NAME}` or
//! `$NAME`, where the bare form takes every character up to the next `$`.
//! A leading `$$` escapes the token and yields it literally with one `$`
//! removed. Exactly one of the three rewrites applies per string, checked
//! in the order escape, braced, bare.

use crate::{Error, Result};
use regex::{Captures, Regex};
use serde_json::{Map, Value};

const ESCAPE_PATTERN: &str = r"\$(\$[^$]+)";
const BRACED_PATTERN: &str = r"\$\{([^${}]+)\}";
const BARE_PATTERN: &str = r"\$([^$]+)";

/// Compiled placeholder patterns
///
/// Build once and pass around; expansion itself is a pure function of the
/// value and the lookup it is given.
#[derive(Debug, Clone)]
pub struct PlaceholderExpander {
    escape: Regex,
    braced: Regex,
    bare: Regex,
}

impl PlaceholderExpander {
    pub fn new() -> Result<Self> {
        Ok(Self {
            escape: Regex::new(ESCAPE_PATTERN)?,
            braced: Regex::new(BRACED_PATTERN)?,
            bare: Regex::new(BARE_PATTERN)?,
        })
    }

    /// Expand a value tree, resolving names through `lookup`
    ///
    /// Object values and array elements are expanded recursively; keys and
    /// non-string scalars are left untouched. A name that `lookup` cannot
    /// resolve is an error.
    pub fn expand<F>(&self, value: Value, lookup: &F) -> Result<Value>
    where
        F: Fn(&str) -> Option<String>,
    {
        match value {
            Value::Object(map) => {
                let mut expanded = Map::with_capacity(map.len());
                for (key, child) in map {
                    expanded.insert(key, self.expand(child, lookup)?);
                }
                Ok(Value::Object(expanded))
            }
            Value::Array(items) => items
                .into_iter()
                .map(|item| self.expand(item, lookup))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Value::String(s) => self.expand_str(&s, lookup).map(Value::String),
            other => Ok(other),
        }
    }

    /// Expand a single string
    pub fn expand_str<F>(&self, s: &str, lookup: &F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.escape.is_match(s) {
            return Ok(self
                .escape
                .replace_all(s, |caps: &Captures| caps[1].to_string())
                .into_owned());
        }
        if self.braced.is_match(s) {
            return substitute(&self.braced, s, lookup);
        }
        if self.bare.is_match(s) {
            return substitute(&self.bare, s, lookup);
        }
        Ok(s.to_string())
    }
}

/// Replace every match of `re` with the looked-up value of its first group
fn substitute<F>(re: &Regex, s: &str, lookup: &F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for caps in re.captures_iter(s) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = lookup(name.as_str())
            .ok_or_else(|| Error::UnresolvedPlaceholder(name.as_str().to_string()))?;
        out.push_str(&s[last..whole.start()]);
        out.push_str(&value);
        last = whole.end();
    }
    out.push_str(&s[last..]);
    Ok(out)
}
