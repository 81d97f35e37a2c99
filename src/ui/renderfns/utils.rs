use crate::api::api_types::TransactionType;
use crate::derived::{self, LOW_STOCK_THRESHOLD};
use chrono::{DateTime, Local, Utc};
use ratatui::prelude::{Color, Rect};

/// Truncate a string to at most `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display color for a stock level
pub fn quantity_color(quantity: i64) -> Color {
  if quantity < derived::CRITICAL_STOCK_THRESHOLD {
    Color::Red
  } else if quantity <= LOW_STOCK_THRESHOLD * 2 {
    Color::Yellow
  } else {
    Color::Green
  }
}

pub fn transaction_type_color(kind: TransactionType) -> Color {
  match kind {
    TransactionType::Sale => Color::Green,
    TransactionType::Return => Color::Magenta,
  }
}

/// Local date and time, minute precision
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
  ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Area for an overlay pinned near the top-left of `area`
pub fn overlay_rect(area: Rect, width_pct: u16, height: u16) -> Rect {
  let width = (area.width * width_pct / 100).clamp(30.min(area.width), 60.min(area.width));
  Rect::new(
    area.x + 1.min(area.width),
    area.y + 1.min(area.height),
    width.min(area.width.saturating_sub(1)),
    height.min(area.height.saturating_sub(1)),
  )
}

/// Area of at most `width` x `height` centered in `area`
pub fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
  let width = width.min(area.width);
  let height = height.min(area.height);
  Rect::new(
    area.x + (area.width - width) / 2,
    area.y + (area.height - height) / 2,
    width,
    height,
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("crème brûlée", 8), "crème...");
  }

  #[test]
  fn test_quantity_color() {
    assert_eq!(quantity_color(0), Color::Red);
    assert_eq!(quantity_color(4), Color::Red);
    assert_eq!(quantity_color(5), Color::Yellow);
    assert_eq!(quantity_color(10), Color::Yellow);
    assert_eq!(quantity_color(11), Color::Green);
  }

  #[test]
  fn test_transaction_type_color() {
    assert_eq!(transaction_type_color(TransactionType::Sale), Color::Green);
    assert_eq!(transaction_type_color(TransactionType::Return), Color::Magenta);
  }

  #[test]
  fn test_centered_rect_fits_inside() {
    let area = Rect::new(0, 0, 40, 10);
    assert_eq!(centered_rect(area, 20, 4), Rect::new(10, 3, 20, 4));
    assert_eq!(centered_rect(area, 100, 100), area);
  }
}
