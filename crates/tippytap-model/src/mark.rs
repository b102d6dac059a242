//! Inline marks.

/// Kind of an inline mark.
///
/// Variant order is the nesting order used when a text node carries several
/// marks: earlier kinds wrap later ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MarkType {
    DiffAdded,
    DiffRemoved,
    Link,
    Strong,
    Em,
    Strike,
    Code,
}

impl MarkType {
    /// Name of the mark in the document model.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::DiffAdded => "diffAdded",
            Self::DiffRemoved => "diffRemoved",
            Self::Link => "link",
            Self::Strong => "strong",
            Self::Em => "em",
            Self::Strike => "strike",
            Self::Code => "code",
        }
    }

    /// Parse a mark name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "diffAdded" => Self::DiffAdded,
            "diffRemoved" => Self::DiffRemoved,
            "link" => Self::Link,
            "strong" => Self::Strong,
            "em" => Self::Em,
            "strike" => Self::Strike,
            "code" => Self::Code,
            _ => return None,
        })
    }
}

/// Inline formatting annotation attached to a run of text.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "camelCase"))]
pub enum Mark {
    /// Text inserted by an external change (diff view only).
    DiffAdded,
    /// Text removed by an external change (diff view only).
    DiffRemoved,
    Link {
        href: String,
        title: Option<String>,
    },
    Strong,
    Em,
    Strike,
    Code,
}

impl Mark {
    /// Create a link mark without a title.
    #[must_use]
    pub fn link(href: impl Into<String>) -> Self {
        Self::Link {
            href: href.into(),
            title: None,
        }
    }

    #[must_use]
    pub fn mark_type(&self) -> MarkType {
        match self {
            Self::DiffAdded => MarkType::DiffAdded,
            Self::DiffRemoved => MarkType::DiffRemoved,
            Self::Link { .. } => MarkType::Link,
            Self::Strong => MarkType::Strong,
            Self::Em => MarkType::Em,
            Self::Strike => MarkType::Strike,
            Self::Code => MarkType::Code,
        }
    }

    /// Add this mark to a set, keeping the set sorted by kind.
    ///
    /// A mark of the same kind already in the set is replaced.
    pub fn add_to_set(self, set: &mut Vec<Mark>) {
        let kind = self.mark_type();
        match set.binary_search_by_key(&kind, Mark::mark_type) {
            Ok(i) => set[i] = self,
            Err(i) => set.insert(i, self),
        }
    }

    /// Normalize a mark list into a set: sorted by kind, one mark per kind.
    #[must_use]
    pub fn normalize_set(marks: Vec<Mark>) -> Vec<Mark> {
        let mut set = Vec::with_capacity(marks.len());
        for mark in marks {
            mark.add_to_set(&mut set);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_names_round_trip() {
        for kind in [
            MarkType::DiffAdded,
            MarkType::DiffRemoved,
            MarkType::Link,
            MarkType::Strong,
            MarkType::Em,
            MarkType::Strike,
            MarkType::Code,
        ] {
            assert_eq!(MarkType::from_name(kind.name()), Some(kind));
        }
        assert_eq!(MarkType::from_name("underline"), None);
    }

    #[test]
    fn test_normalize_set_sorts_and_dedupes() {
        let set = Mark::normalize_set(vec![
            Mark::Code,
            Mark::Strong,
            Mark::link("a"),
            Mark::link("b"),
        ]);
        assert_eq!(set, vec![Mark::link("b"), Mark::Strong, Mark::Code]);
    }
}
