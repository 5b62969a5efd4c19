//! Element paths: structural identifiers for rendered elements.
//!
//! A path is a sequence of *parts*; each part is a sequence of element uids
//! inside one component. The first part usually walks
//! `storyboard / scene / component-instance`, the following parts walk the
//! elements rendered by that component:
//!
//! ```text
//! storyboard/scene/app:root-div/group/child-2
//! ```
//!
//! Paths are never mutated; `parent()` and `child()` build fresh values.
//! Uids are interned, so comparing and hashing a path is cheap.

use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;
use winnow::combinator::separated;
use winnow::prelude::*;
use winnow::token::take_while;

/// Global string interner for element uids.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// An interned element uid (`data-uid` in the source).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Uid(Spur);

impl Uid {
    /// Intern a uid string, or return the existing handle.
    pub fn intern(s: &str) -> Self {
        Uid(INTERNER.get_or_intern(s))
    }

    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type PathPart = SmallVec<[Uid; 4]>;

/// Ordered, immutable identifier of a node in the rendered tree.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ElementPath {
    parts: SmallVec<[PathPart; 2]>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathParseError {
    #[error("empty element path")]
    Empty,
    #[error("malformed element path '{input}'")]
    Malformed { input: String },
}

impl ElementPath {
    /// Build a path from explicit parts.
    pub fn new<S: AsRef<str>>(parts: &[&[S]]) -> Self {
        let parts = parts
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.iter().map(|uid| Uid::intern(uid.as_ref())).collect())
            .collect();
        Self { parts }
    }

    /// Build a single-part path from a sequence of uids.
    pub fn from_uids<S: AsRef<str>>(uids: &[S]) -> Self {
        Self::new(&[uids])
    }

    /// Parse `a/b/c:d/e` notation.
    pub fn parse(input: &str) -> Result<Self, PathParseError> {
        if input.is_empty() {
            return Err(PathParseError::Empty);
        }
        let mut rest = input;
        let parts = parse_parts
            .parse_next(&mut rest)
            .map_err(|_| PathParseError::Malformed {
                input: input.to_string(),
            })?;
        if !rest.is_empty() {
            return Err(PathParseError::Malformed {
                input: input.to_string(),
            });
        }
        Ok(Self {
            parts: parts
                .into_iter()
                .map(|part| part.into_iter().map(Uid::intern).collect())
                .collect(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// The uid of the element this path points at.
    pub fn last_uid(&self) -> Option<Uid> {
        self.parts.last().and_then(|part| part.last()).copied()
    }

    /// Total number of uids across all parts.
    pub fn depth(&self) -> usize {
        self.parts.iter().map(|part| part.len()).sum()
    }

    /// The storyboard is the single-uid root path.
    pub fn is_storyboard(&self) -> bool {
        self.parts.len() == 1 && self.parts[0].len() == 1
    }

    /// Parent path. The root element of a component part has the component
    /// instance (the last uid of the previous part) as its parent.
    pub fn parent(&self) -> Option<ElementPath> {
        let last = self.parts.last()?;
        let mut parts = self.parts.clone();
        if last.len() > 1 {
            if let Some(part) = parts.last_mut() {
                part.pop();
            }
        } else {
            parts.pop();
        }
        if parts.is_empty() {
            None
        } else {
            Some(Self { parts })
        }
    }

    /// Child path inside the same component part.
    pub fn child(&self, uid: Uid) -> ElementPath {
        let mut parts = self.parts.clone();
        match parts.last_mut() {
            Some(part) => part.push(uid),
            None => parts.push(smallvec::smallvec![uid]),
        }
        Self { parts }
    }

    /// Child path starting a new component part (`instance:root`).
    pub fn append_part(&self, uid: Uid) -> ElementPath {
        let mut parts = self.parts.clone();
        parts.push(smallvec::smallvec![uid]);
        Self { parts }
    }

    pub fn is_child_of(&self, other: &ElementPath) -> bool {
        self.parent().as_ref() == Some(other)
    }

    /// Strict descendant check (a path is not its own descendant).
    pub fn is_descendant_of(&self, ancestor: &ElementPath) -> bool {
        let n = ancestor.parts.len();
        if n == 0 || n > self.parts.len() || self == ancestor {
            return false;
        }
        if self.parts[..n - 1] != ancestor.parts[..n - 1] {
            return false;
        }
        let ours = &self.parts[n - 1];
        let theirs = &ancestor.parts[n - 1];
        ours.len() >= theirs.len() && ours[..theirs.len()] == theirs[..]
    }

    pub fn is_descendant_or_equal(&self, ancestor: &ElementPath) -> bool {
        self == ancestor || self.is_descendant_of(ancestor)
    }
}

/// Drop every path that has an ancestor in the same list.
pub fn filter_descendants(paths: &[ElementPath]) -> Vec<ElementPath> {
    paths
        .iter()
        .filter(|path| !paths.iter().any(|other| path.is_descendant_of(other)))
        .cloned()
        .collect()
}

fn parse_uid<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c != '/' && c != ':').parse_next(input)
}

fn parse_part<'a>(input: &mut &'a str) -> ModalResult<Vec<&'a str>> {
    separated(1.., parse_uid, '/').parse_next(input)
}

fn parse_parts<'a>(input: &mut &'a str) -> ModalResult<Vec<Vec<&'a str>>> {
    separated(1.., parse_part, ':').parse_next(input)
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            for (j, uid) in part.iter().enumerate() {
                if j > 0 {
                    f.write_str("/")?;
                }
                f.write_str(uid.as_str())?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{self}>")
    }
}

impl FromStr for ElementPath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ElementPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ElementPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ElementPath::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_roundtrip() {
        let path = ElementPath::parse("sb/scene/app:root/group/child").unwrap();
        assert_eq!(path.to_string(), "sb/scene/app:root/group/child");
        assert_eq!(path.depth(), 6);
        assert_eq!(path.last_uid().map(|u| u.as_str().to_string()), Some("child".into()));
    }

    #[test]
    fn parse_rejects_malformed() {
        assert_eq!(ElementPath::parse(""), Err(PathParseError::Empty));
        assert!(ElementPath::parse("a//b").is_err());
        assert!(ElementPath::parse("a:").is_err());
    }

    #[test]
    fn parent_crosses_part_boundary() {
        let path = ElementPath::parse("sb/scene/app:root").unwrap();
        assert_eq!(path.parent(), Some(ElementPath::parse("sb/scene/app").unwrap()));
        let storyboard = ElementPath::parse("sb").unwrap();
        assert!(storyboard.is_storyboard());
        assert_eq!(storyboard.parent(), None);
    }

    #[test]
    fn descendant_checks_are_structural() {
        let group = ElementPath::parse("sb/scene/app:root/group").unwrap();
        let child = group.child(Uid::intern("child"));
        assert!(child.is_descendant_of(&group));
        assert!(child.is_child_of(&group));
        assert!(!group.is_descendant_of(&group));
        // "root/groupie" shares a string prefix, not a path prefix
        let other = ElementPath::parse("sb/scene/app:root/groupie").unwrap();
        assert!(!other.is_descendant_of(&group));
        let component_root = ElementPath::parse("sb/scene/app:root").unwrap();
        let instance = ElementPath::parse("sb/scene/app").unwrap();
        assert!(component_root.is_descendant_of(&instance));
    }

    #[test]
    fn filter_descendants_keeps_outermost() {
        let a = ElementPath::parse("sb/a").unwrap();
        let b = ElementPath::parse("sb/a/b").unwrap();
        let c = ElementPath::parse("sb/c").unwrap();
        assert_eq!(filter_descendants(&[b, a.clone(), c.clone()]), vec![a, c]);
    }
}
