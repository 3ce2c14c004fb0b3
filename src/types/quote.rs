//! Quote contract and the concrete quote record returned by HTTP sources.

use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Anything the cache can store.
///
/// The cache only ever looks at [`id()`](Quote::id), which must be stable
/// for the lifetime of the value (it is the dedup key), and at
/// [`tags()`](Quote::tags).
pub trait Quote: Clone + Send + Sync + 'static {
    type Id: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    fn id(&self) -> Self::Id;

    /// Tags this quote is indexed under. Empty strings are ignored.
    fn tags(&self) -> &[String] {
        &[]
    }
}

/// A quote as returned by the bundled HTTP sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextQuote {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appeared_at: Option<String>,
}

impl TextQuote {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            author: None,
            tags: Vec::new(),
            source_url: None,
            appeared_at: None,
        }
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn appeared_at(mut self, at: impl Into<String>) -> Self {
        self.appeared_at = Some(at.into());
        self
    }
}

impl Quote for TextQuote {
    type Id = String;

    fn id(&self) -> String {
        self.id.clone()
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl fmt::Display for TextQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.author {
            Some(author) => write!(f, "\"{}\" ({author})", self.text),
            None => write!(f, "\"{}\"", self.text),
        }
    }
}
