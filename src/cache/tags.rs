//! Resource tags used to group cached queries for invalidation.

use std::fmt;

/// A resource category. Queries provide tags, mutations invalidate them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tag {
  DashboardMetrics,
  Products,
  Transaction,
}

impl Tag {
  pub const ALL: &'static [Tag] = &[Tag::DashboardMetrics, Tag::Products, Tag::Transaction];

  /// Tags whose cached data is derived from this tag's resource.
  ///
  /// Dashboard metrics embed low-stock products and transaction totals, and
  /// every transaction changes a product's stock on the server.
  pub fn dependents(self) -> &'static [Tag] {
    match self {
      Tag::DashboardMetrics => &[],
      Tag::Products => &[Tag::DashboardMetrics],
      Tag::Transaction => &[Tag::Products, Tag::DashboardMetrics],
    }
  }
}

impl fmt::Display for Tag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Tag::DashboardMetrics => "DashboardMetrics",
      Tag::Products => "Products",
      Tag::Transaction => "Transaction",
    };
    f.write_str(name)
  }
}

/// Expand a set of mutated tags with every dependent tag, deduplicated and sorted.
pub fn expand(tags: &[Tag]) -> Vec<Tag> {
  let mut expanded: Vec<Tag> = tags
    .iter()
    .flat_map(|tag| std::iter::once(*tag).chain(tag.dependents().iter().copied()))
    .collect();
  expanded.sort();
  expanded.dedup();
  expanded
}

/// Whether two tag sets share at least one tag.
pub fn intersects(a: &[Tag], b: &[Tag]) -> bool {
  a.iter().any(|tag| b.contains(tag))
}
