use std::fmt;

use serde::{
  Deserialize,
  Serialize
};

/// A tag identifier. The three priority tags and the due-date marker are
/// closed variants; anything else is a user-defined label.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
)]
#[serde(from = "String", into = "String")]
pub enum Tag {
  Urgent,
  Important,
  Forgettable,
  LimitedTime,
  Custom(String)
}

/// The tags offered in every tag picker, in display order.
pub const FIXED_TAGS: [Tag; 3] = [
  Tag::Urgent,
  Tag::Important,
  Tag::Forgettable,
];

impl Tag {
  pub fn parse(raw: &str) -> Self {
    match raw {
      | "urgent" => Tag::Urgent,
      | "important" => Tag::Important,
      | "forgettable" => Tag::Forgettable,
      | "limited_time" => Tag::LimitedTime,
      | other => Tag::Custom(other.to_string())
    }
  }

  pub fn id(&self) -> &str {
    match self {
      | Tag::Urgent => "urgent",
      | Tag::Important => "important",
      | Tag::Forgettable => "forgettable",
      | Tag::LimitedTime => "limited_time",
      | Tag::Custom(label) => label
    }
  }

  /// Identifiers that can never be used as a catalog label.
  pub fn is_reserved(raw: &str) -> bool {
    !matches!(Tag::parse(raw), Tag::Custom(_))
  }

  /// Display label of a fixed tag, `None` for the marker and custom labels.
  pub fn label(&self) -> Option<&'static str> {
    match self {
      | Tag::Urgent => Some("⚡ Urgent"),
      | Tag::Important => Some("⭐ Important"),
      | Tag::Forgettable => {
        Some("🧠 Forgettable")
      }
      | Tag::LimitedTime | Tag::Custom(_) => {
        None
      }
    }
  }

  /// Label with glyphs removed; custom tags keep their raw name.
  pub fn plain_label(&self) -> String {
    match self.label() {
      | Some(label) => {
        label
          .chars()
          .filter(|ch| ch.is_alphabetic())
          .collect()
      }
      | None => self.id().to_string()
    }
  }
}

impl From<String> for Tag {
  fn from(raw: String) -> Self {
    match Tag::parse(&raw) {
      | Tag::Custom(_) => Tag::Custom(raw),
      | fixed => fixed
    }
  }
}

impl From<Tag> for String {
  fn from(tag: Tag) -> Self {
    match tag {
      | Tag::Custom(label) => label,
      | fixed => fixed.id().to_string()
    }
  }
}

impl fmt::Display for Tag {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.id())
  }
}

/// Insertion-ordered set of tags without duplicates.
#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(from = "Vec<Tag>", into = "Vec<Tag>")]
pub struct TagSet(Vec<Tag>);

impl TagSet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn contains(&self, tag: &Tag) -> bool {
    self.0.contains(tag)
  }

  /// Returns whether the tag was newly added.
  pub fn insert(&mut self, tag: Tag) -> bool {
    if self.contains(&tag) {
      return false;
    }
    self.0.push(tag);
    true
  }

  /// Returns whether the tag was present.
  pub fn remove(&mut self, tag: &Tag) -> bool {
    let before = self.0.len();
    self.0.retain(|t| t != tag);
    self.0.len() != before
  }

  pub fn iter(
    &self
  ) -> std::slice::Iter<'_, Tag> {
    self.0.iter()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl From<Vec<Tag>> for TagSet {
  fn from(tags: Vec<Tag>) -> Self {
    tags.into_iter().collect()
  }
}

impl From<TagSet> for Vec<Tag> {
  fn from(set: TagSet) -> Self {
    set.0
  }
}

impl FromIterator<Tag> for TagSet {
  fn from_iter<I: IntoIterator<Item = Tag>>(
    iter: I
  ) -> Self {
    let mut set = TagSet::new();
    for tag in iter {
      set.insert(tag);
    }
    set
  }
}

impl<'a> IntoIterator for &'a TagSet {
  type IntoIter = std::slice::Iter<'a, Tag>;
  type Item = &'a Tag;

  fn into_iter(self) -> Self::IntoIter {
    self.0.iter()
  }
}
