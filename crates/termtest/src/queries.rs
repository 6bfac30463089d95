// SPDX-License-Identifier: MIT

//! Synchronous queries over the current node tree.
//!
//! `get_by_*` requires exactly one match; `query_by_*` returns the first
//! match in document order, or nothing, without failing. The async
//! counterparts live in [`wait`](crate::wait).

use std::sync::Arc;

use regex::Regex;

use crate::error::{Error, Result};
use crate::pty::ExitInfo;
use crate::session::{SessionInner, TermInstance};
use crate::tree::{Node, NodeId};

/// Text matcher: a substring or a regular expression.
#[derive(Debug, Clone)]
pub enum Matcher {
    Substring(String),
    Pattern(Regex),
}

impl Matcher {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Matcher::Substring(s) => text.contains(s.as_str()),
            Matcher::Pattern(re) => re.is_match(text),
        }
    }
}

impl std::fmt::Display for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Matcher::Substring(s) => write!(f, "{:?}", s),
            Matcher::Pattern(re) => write!(f, "/{}/", re),
        }
    }
}

impl From<&str> for Matcher {
    fn from(s: &str) -> Self {
        Matcher::Substring(s.to_string())
    }
}

impl From<String> for Matcher {
    fn from(s: String) -> Self {
        Matcher::Substring(s)
    }
}

impl From<Regex> for Matcher {
    fn from(re: Regex) -> Self {
        Matcher::Pattern(re)
    }
}

/// Handle to a node in the tree, usable for later event dispatch.
///
/// The text is captured at query time; the id stays valid across redraws
/// of the same logical line.
#[derive(Clone)]
pub struct Element {
    pub(crate) session: Arc<SessionInner>,
    id: NodeId,
    text: String,
}

impl Element {
    pub(crate) fn new(session: Arc<SessionInner>, node: &Node) -> Self {
        Element {
            session,
            id: node.id,
            text: node.text.clone(),
        }
    }

    /// Stable node identifier.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Text content at the time of the query.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the owning process has exited.
    pub fn has_exit(&self) -> bool {
        self.session.has_exit()
    }

    /// Exit code/signal of the owning process, once known.
    pub fn exit_info(&self) -> Option<ExitInfo> {
        self.session.exit_info()
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Element")
            .field("id", &self.id)
            .field("text", &self.text)
            .finish()
    }
}

impl TermInstance {
    /// Exactly one matching element, or an error.
    pub fn get_by_text(&self, matcher: impl Into<Matcher>) -> Result<Element> {
        self.get_by_text_matcher(&matcher.into())
    }

    /// The first matching element in document order, or `None`.
    pub fn query_by_text(&self, matcher: impl Into<Matcher>) -> Option<Element> {
        self.query_all_by_text(matcher).into_iter().next()
    }

    /// All matching elements; fails if there are none.
    pub fn get_all_by_text(&self, matcher: impl Into<Matcher>) -> Result<Vec<Element>> {
        let matcher = matcher.into();
        let found = self.query_all_by_text_matcher(&matcher);
        if found.is_empty() {
            return Err(Error::NotFound {
                matcher: matcher.to_string(),
                rendered: self.inner.render_text(),
            });
        }
        Ok(found)
    }

    /// All matching elements in document order, possibly empty.
    pub fn query_all_by_text(&self, matcher: impl Into<Matcher>) -> Vec<Element> {
        self.query_all_by_text_matcher(&matcher.into())
    }

    pub(crate) fn get_by_text_matcher(&self, matcher: &Matcher) -> Result<Element> {
        let mut found = self.query_all_by_text_matcher(matcher);
        match found.len() {
            1 => Ok(found.remove(0)),
            0 => Err(Error::NotFound {
                matcher: matcher.to_string(),
                rendered: self.inner.render_text(),
            }),
            count => Err(Error::MultipleElements {
                matcher: matcher.to_string(),
                count,
                rendered: self.inner.render_text(),
            }),
        }
    }

    fn query_all_by_text_matcher(&self, matcher: &Matcher) -> Vec<Element> {
        let st = self.inner.state.lock();
        st.tree
            .query(|n| matcher.matches(&n.text))
            .into_iter()
            .map(|n| Element::new(Arc::clone(&self.inner), n))
            .collect()
    }
}

#[cfg(test)]
#[path = "queries_tests.rs"]
mod tests;
