//! Key-value inputs source.
//!
//! Inputs come from a text file of `key = value` lines and from `key=value`
//! command-line overrides. A `#` starts a comment that runs to the end of the
//! line. A key may be defined more than once; the last definition wins, and
//! overrides are applied after the file, so the command line always wins.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use crate::error::BenchError;

/// Parsed inputs, keyed by name.
#[derive(Debug, Default, Clone)]
pub struct Inputs {
    entries: HashMap<String, Vec<String>>,
}

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the text of an inputs file.
    pub fn parse(text: &str) -> Result<Self, BenchError> {
        let mut inputs = Self::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = match raw.find('#') {
                Some(pos) => &raw[..pos],
                None => raw,
            }
            .trim();
            if line.is_empty() {
                continue;
            }
            inputs.define(line).map_err(|_| BenchError::MalformedInputs {
                line: idx + 1,
                text: raw.to_string(),
            })?;
        }
        Ok(inputs)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BenchError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "read inputs file");
        Self::parse(&text)
    }

    /// Whether a command-line argument reads as a `key=value` override.
    ///
    /// The key must start with a letter or `_` and hold only word characters or
    /// `.`, so a path such as `runs/a=b/inputs` is not an override.
    pub fn is_override(arg: &str) -> bool {
        let Some((key, _)) = arg.split_once('=') else {
            return false;
        };
        let mut chars = key.chars();
        chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    }

    /// Apply `key=value` overrides on top of what is already defined.
    pub fn apply_overrides<I, S>(&mut self, overrides: I) -> Result<(), BenchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for (idx, arg) in overrides.into_iter().enumerate() {
            let arg = arg.as_ref();
            self.define(arg).map_err(|_| BenchError::MalformedInputs {
                line: idx + 1,
                text: arg.to_string(),
            })?;
        }
        Ok(())
    }

    // `key = v1 v2 ...`; an empty key or an empty value list is malformed.
    fn define(&mut self, line: &str) -> Result<(), ()> {
        let (key, value) = line.split_once('=').ok_or(())?;
        let key = key.trim();
        let values: Vec<String> = value.split_whitespace().map(str::to_string).collect();
        if key.is_empty() || key.contains(char::is_whitespace) || values.is_empty() {
            return Err(());
        }
        self.entries.insert(key.to_string(), values);
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Raw values of `key`.
    pub fn values(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Required scalar value; a missing key is an error.
    pub fn get<V: FromStr>(&self, key: &str) -> Result<V, BenchError>
    where
        V::Err: std::fmt::Display,
    {
        self.query(key)?.ok_or_else(|| BenchError::MissingInput(key.to_string()))
    }

    /// Optional scalar value.
    pub fn query<V: FromStr>(&self, key: &str) -> Result<Option<V>, BenchError>
    where
        V::Err: std::fmt::Display,
    {
        let Some(values) = self.entries.get(key) else {
            return Ok(None);
        };
        if values.len() != 1 {
            return Err(BenchError::invalid(key, &values.join(" "), "expected a single value"));
        }
        values[0]
            .parse()
            .map(Some)
            .map_err(|e: V::Err| BenchError::invalid(key, &values[0], e))
    }

    /// Required flag. Accepts `1/0`, `true/false`, `yes/no`, `on/off`.
    pub fn get_bool(&self, key: &str) -> Result<bool, BenchError> {
        self.query_bool(key)?.ok_or_else(|| BenchError::MissingInput(key.to_string()))
    }

    pub fn query_bool(&self, key: &str) -> Result<Option<bool>, BenchError> {
        let Some(raw) = self.query::<String>(key)? else {
            return Ok(None);
        };
        match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "t" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "f" | "no" | "off" => Ok(Some(false)),
            _ => Err(BenchError::invalid(key, &raw, "expected a boolean")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_blank_lines() {
        let inputs = Inputs::parse(
            "# header\n\nwarmup_count = 3   # trailing\n  test_count=10\n",
        )
        .unwrap();
        assert_eq!(inputs.get::<usize>("warmup_count").unwrap(), 3);
        assert_eq!(inputs.get::<usize>("test_count").unwrap(), 10);
        assert!(!inputs.contains("header"));
    }

    #[test]
    fn last_definition_wins() {
        let mut inputs = Inputs::parse("epsilon = 1e-3\nepsilon = 1e-6\n").unwrap();
        assert_eq!(inputs.get::<f64>("epsilon").unwrap(), 1e-6);
        inputs.apply_overrides(["epsilon=0.5"]).unwrap();
        assert_eq!(inputs.get::<f64>("epsilon").unwrap(), 0.5);
    }

    #[test]
    fn malformed_line_reports_position() {
        let err = Inputs::parse("a = 1\njust words\n").unwrap_err();
        assert!(matches!(err, BenchError::MalformedInputs { line: 2, .. }));
        assert!(Inputs::parse("x =\n").is_err());
    }

    #[test]
    fn multi_value_key_is_not_a_scalar() {
        let inputs = Inputs::parse("sizes = 1 2 3").unwrap();
        assert_eq!(inputs.values("sizes").unwrap().len(), 3);
        assert!(inputs.get::<usize>("sizes").is_err());
    }

    #[test]
    fn boolean_forms() {
        let inputs = Inputs::parse("a = 1\nb = false\nc = On\nd = maybe").unwrap();
        assert!(inputs.get_bool("a").unwrap());
        assert!(!inputs.get_bool("b").unwrap());
        assert!(inputs.get_bool("c").unwrap());
        assert!(inputs.get_bool("d").is_err());
        assert!(matches!(inputs.get_bool("e"), Err(BenchError::MissingInput(_))));
        assert_eq!(inputs.query_bool("e").unwrap(), None);
    }

    #[test]
    fn override_needs_a_key_shaped_prefix() {
        assert!(Inputs::is_override("max_elements=1024"));
        assert!(Inputs::is_override("amrex.verbose=1"));
        assert!(Inputs::is_override("_x=1"));
        assert!(!Inputs::is_override("runs/a=b/inputs"));
        assert!(!Inputs::is_override("./inputs"));
        assert!(!Inputs::is_override("=1"));
        assert!(!Inputs::is_override("9lives=1"));
    }
}
