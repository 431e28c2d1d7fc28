//! Keyword specifications for gettext-style call sites.
//!
//! A spec names a function and says which of its (1-based) positional
//! arguments hold the message id, the plural id and the context, using the
//! xgettext syntax: `ngettext:1,2`, `pgettext:1c,2`.

use crate::catalog::MessageId;
use crate::error::ExtractError;
use std::collections::HashMap;
use std::str::FromStr;

/// Argument positions for one keyword.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeywordSpec {
    pub msgid: usize,
    pub plural: Option<usize>,
    pub context: Option<usize>,
}

impl Default for KeywordSpec {
    fn default() -> Self {
        Self {
            msgid: 1,
            plural: None,
            context: None,
        }
    }
}

impl KeywordSpec {
    /// Map a call's positional arguments onto a message id and context.
    ///
    /// `None` entries in `args` are arguments that are not string literals.
    /// Returns `None` when any argument the spec needs is missing or not a
    /// literal.
    pub fn select(&self, args: &[Option<String>]) -> Option<(MessageId, Option<String>)> {
        let arg = |pos: usize| args.get(pos - 1).cloned().flatten();

        let msgid = arg(self.msgid)?;
        let id = match self.plural {
            Some(pos) => MessageId::Plural {
                singular: msgid,
                plural: arg(pos)?,
            },
            None => MessageId::Singular(msgid),
        };
        let context = match self.context {
            Some(pos) => Some(arg(pos)?),
            None => None,
        };

        Some((id, context))
    }
}

/// Parse the argument list part of a keyword spec (`1c,2`).
fn parse_positions(spec: &str, positions: &str) -> Result<KeywordSpec, ExtractError> {
    let invalid = |reason: &str| ExtractError::InvalidKeyword {
        spec: spec.to_string(),
        reason: reason.to_string(),
    };

    let mut ids = Vec::new();
    let mut context = None;

    for part in positions.split(',') {
        let part = part.trim();
        let (digits, is_context) = match part.strip_suffix('c') {
            Some(digits) => (digits, true),
            None => (part, false),
        };
        let pos: usize = digits
            .parse()
            .map_err(|_| invalid("argument positions must be numbers"))?;
        if pos == 0 {
            return Err(invalid("argument positions start at 1"));
        }
        if is_context {
            if context.replace(pos).is_some() {
                return Err(invalid("more than one context argument"));
            }
        } else {
            ids.push(pos);
        }
    }

    match ids.as_slice() {
        [msgid] => Ok(KeywordSpec {
            msgid: *msgid,
            plural: None,
            context,
        }),
        [msgid, plural] => Ok(KeywordSpec {
            msgid: *msgid,
            plural: Some(*plural),
            context,
        }),
        [] => Err(invalid("missing message id argument")),
        _ => Err(invalid("at most two message id arguments are allowed")),
    }
}

/// Keyword name to spec lookup used by the extractors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Keywords {
    specs: HashMap<String, KeywordSpec>,
}

impl Keywords {
    /// Specs recognised when a project configures none.
    pub const DEFAULT_SPECS: &'static [&'static str] = &[
        "_",
        "gettext",
        "ngettext:1,2",
        "ugettext",
        "ungettext:1,2",
        "dgettext:2",
        "dngettext:2,3",
        "N_",
        "pgettext:1c,2",
        "npgettext:1c,2,3",
        "_lazy",
        "gettext_lazy",
        "ngettext_lazy:1,2",
        "pgettext_lazy:1c,2",
        "npgettext_lazy:1c,2,3",
    ];

    /// Build a keyword table from spec strings.
    pub fn parse<I, S>(specs: I) -> Result<Self, ExtractError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map = HashMap::new();
        for spec in specs {
            let (name, parsed) = parse_keyword(spec.as_ref())?;
            map.insert(name, parsed);
        }
        Ok(Self { specs: map })
    }

    pub fn get(&self, name: &str) -> Option<&KeywordSpec> {
        self.specs.get(name)
    }

}

impl Default for Keywords {
    fn default() -> Self {
        let specs = Self::DEFAULT_SPECS
            .iter()
            .filter_map(|spec| parse_keyword(spec).ok())
            .collect();
        Self { specs }
    }
}

impl FromStr for Keywords {
    type Err = ExtractError;

    /// Parse a whitespace separated list of specs.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.split_whitespace())
    }
}

/// Parse one `name[:positions]` keyword spec.
pub fn parse_keyword(spec: &str) -> Result<(String, KeywordSpec), ExtractError> {
    let spec = spec.trim();
    let (name, positions) = match spec.split_once(':') {
        Some((name, positions)) => (name, Some(positions)),
        None => (spec, None),
    };

    let valid_name = name
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '$');
    if !valid_name {
        return Err(ExtractError::InvalidKeyword {
            spec: spec.to_string(),
            reason: "keyword must be an identifier".to_string(),
        });
    }

    let parsed = match positions {
        Some(positions) => parse_positions(spec, positions)?,
        None => KeywordSpec::default(),
    };

    Ok((name.to_string(), parsed))
}
