//! Suffix grammar: `<stem>(::<suffix>)*`
//!
//! Suffixes are peeled off the right end one at a time and collected in
//! left-to-right order, which is the order they are applied in.

use regex::Regex;

use crate::error::{Error, Result};

/// A directive string split into its stem and suffix chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split<'s> {
    /// The string with every trailing suffix removed
    pub stem: &'s str,
    /// Suffix names in application order
    pub suffixes: Vec<&'s str>,
}

/// Matcher for trailing `::name` tokens drawn from a fixed set of names
#[derive(Debug, Clone)]
pub struct SuffixGrammar {
    pattern: Option<Regex>,
}

impl SuffixGrammar {
    /// Build a grammar that recognises exactly `names`
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut names: Vec<&str> = names.into_iter().collect();
        if names.is_empty() {
            return Ok(Self { pattern: None });
        }
        names.sort_unstable();

        let alternatives: Vec<String> = names.into_iter().map(regex::escape).collect();
        let pattern = Regex::new(&format!(r"^(.+)::({})$", alternatives.join("|")))
            .map_err(|e| Error::internal(format!("invalid suffix pattern: {}", e)))?;

        Ok(Self {
            pattern: Some(pattern),
        })
    }

    /// Strip every trailing registered suffix from `input`
    pub fn split<'s>(&self, input: &'s str) -> Split<'s> {
        let mut stem = input;
        let mut suffixes = Vec::new();

        if let Some(pattern) = &self.pattern {
            while let Some(caps) = pattern.captures(stem) {
                let (Some(rest), Some(name)) = (caps.get(1), caps.get(2)) else {
                    break;
                };
                stem = rest.as_str();
                suffixes.push(name.as_str());
            }
        }

        // collected right-to-left, applied left-to-right
        suffixes.reverse();

        Split { stem, suffixes }
    }
}
