//! In-memory message catalog, filled by the extractors and written by
//! [`crate::po::write_pot`].

use indexmap::IndexMap;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

/// The id of a message, with its plural form if it has one.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MessageId {
    Singular(String),
    Plural { singular: String, plural: String },
}

impl MessageId {
    /// The singular id, which is also the catalog key.
    pub fn msgid(&self) -> &str {
        match self {
            MessageId::Singular(id) => id,
            MessageId::Plural { singular, .. } => singular,
        }
    }

    pub fn plural(&self) -> Option<&str> {
        match self {
            MessageId::Singular(_) => None,
            MessageId::Plural { plural, .. } => Some(plural),
        }
    }

    pub fn is_plural(&self) -> bool {
        matches!(self, MessageId::Plural { .. })
    }

    fn texts(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.msgid()).chain(self.plural())
    }
}

/// A `path:line` reference to where a message was found.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    /// Path relative to the extraction root, with forward slashes.
    pub path: String,
    pub line: usize,
}

impl Location {
    pub fn new(path: impl Into<String>, line: usize) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.line)
    }
}

static PYTHON_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%(?:\((\w*)\))?([-#0 +]?(?:\*|\d+)?(?:\.(?:\*|\d+))?[hlL]?)([diouxXeEfFgGcrs%])")
        .unwrap()
});

/// Whether `text` contains a printf-style placeholder.
pub fn has_python_format(text: &str) -> bool {
    PYTHON_FORMAT.is_match(text)
}

/// One catalog entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub context: Option<String>,
    pub locations: Vec<Location>,
    pub auto_comments: Vec<String>,
    pub flags: BTreeSet<String>,
}

impl Message {
    pub const PYTHON_FORMAT: &'static str = "python-format";

    pub fn new(id: MessageId, context: Option<String>) -> Self {
        let mut message = Self {
            id,
            context,
            locations: Vec::new(),
            auto_comments: Vec::new(),
            flags: BTreeSet::new(),
        };
        message.update_flags();
        message
    }

    pub fn is_python_format(&self) -> bool {
        self.flags.contains(Self::PYTHON_FORMAT)
    }

    fn update_flags(&mut self) {
        if self.id.texts().any(has_python_format) {
            self.flags.insert(Self::PYTHON_FORMAT.to_string());
        }
    }
}

/// Header data written into the template's metadata entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogMetadata {
    pub project: String,
    pub version: String,
    pub msgid_bugs_address: String,
    /// Formatted as `YYYY-MM-DD HH:MM+ZZZZ`.
    pub creation_date: String,
    pub charset: String,
}

impl CatalogMetadata {
    pub const DATE_FORMAT: &'static str = "%Y-%m-%d %H:%M%z";

    /// Metadata stamped with the current local time.
    pub fn new(
        project: impl Into<String>,
        version: impl Into<String>,
        msgid_bugs_address: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            version: version.into(),
            msgid_bugs_address: msgid_bugs_address.into(),
            creation_date: jiff::Zoned::now()
                .strftime(Self::DATE_FORMAT)
                .to_string(),
            charset: "utf-8".to_string(),
        }
    }
}

impl Default for CatalogMetadata {
    fn default() -> Self {
        Self::new("PROJECT", "VERSION", "")
    }
}

type MessageKey = (String, Option<String>);

/// Messages keyed by `(msgid, context)` in first-seen order.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub metadata: CatalogMetadata,
    messages: IndexMap<MessageKey, Message>,
}

impl Catalog {
    pub fn new(metadata: CatalogMetadata) -> Self {
        Self {
            metadata,
            messages: IndexMap::new(),
        }
    }

    /// Add an occurrence of a message, merging with an existing entry.
    pub fn add(
        &mut self,
        id: MessageId,
        context: Option<String>,
        location: Location,
        auto_comments: Vec<String>,
    ) {
        let key = (id.msgid().to_string(), context.clone());
        let message = self
            .messages
            .entry(key)
            .or_insert_with(|| Message::new(id.clone(), context));

        if id.is_plural() && !message.id.is_plural() {
            message.id = id;
            message.update_flags();
        }
        if !message.locations.contains(&location) {
            message.locations.push(location);
        }
        for comment in auto_comments {
            if !message.auto_comments.contains(&comment) {
                message.auto_comments.push(comment);
            }
        }
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.values()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
