use std::{collections::VecDeque, str::FromStr};

use serde_json::Value;

use crate::foundation::error::{TilestackError, TilestackResult};

/// The remaining words of a command script, consumed front to back.
#[derive(Clone, Debug, Default)]
pub struct Arglist {
    args: VecDeque<String>,
}

impl Arglist {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Whether the next word exists and is not a `-flag`.
    pub fn next_is_non_flag(&self) -> bool {
        self.args.front().is_some_and(|a| !a.starts_with('-'))
    }

    pub fn shift(&mut self, what: &str) -> TilestackResult<String> {
        self.args
            .pop_front()
            .ok_or_else(|| TilestackError::usage(format!("missing argument: {what}")))
    }

    /// Next word parsed as `T`; `what` names the argument in errors.
    pub fn shift_parse<T>(&mut self, what: &str) -> TilestackResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let arg = self.shift(what)?;
        arg.parse()
            .map_err(|e| TilestackError::usage(format!("{what}: can't parse '{arg}': {e}")))
    }

    /// Next word as JSON, either inline or, failing that, the contents of the file it names.
    pub fn shift_json(&mut self, what: &str) -> TilestackResult<Value> {
        let arg = self.shift(what)?;
        match serde_json::from_str(&arg) {
            Ok(v) => Ok(v),
            Err(inline_err) => {
                let Ok(text) = std::fs::read_to_string(&arg) else {
                    return Err(TilestackError::usage(format!(
                        "{what}: can't parse '{arg}' as json: {inline_err}"
                    )));
                };
                serde_json::from_str(&text).map_err(|e| {
                    TilestackError::usage(format!("{what}: can't parse file '{arg}' as json: {e}"))
                })
            }
        }
    }

    /// Every word up to the next `-flag`.
    pub fn shift_until_flag(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while self.next_is_non_flag() {
            if let Some(a) = self.args.pop_front() {
                out.push(a);
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/tool/args.rs"]
mod tests;
