use crate::event::{Notice, NoticeKind};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const MAX_TOASTS: usize = 4;
const TOAST_WIDTH: u16 = 48;

/// Stack of short-lived notices in the bottom-right corner
#[derive(Debug)]
pub struct Toasts {
  items: VecDeque<(Notice, Instant)>,
  ttl: Duration,
}

impl Default for Toasts {
  fn default() -> Self {
    Self::new(Duration::from_secs(4))
  }
}

impl Toasts {
  pub fn new(ttl: Duration) -> Self {
    Self {
      items: VecDeque::new(),
      ttl,
    }
  }

  pub fn push(&mut self, notice: Notice) {
    if self.items.len() == MAX_TOASTS {
      self.items.pop_front();
    }
    self.items.push_back((notice, Instant::now()));
  }

  /// Drop expired toasts. Returns true if any were removed.
  pub fn prune(&mut self) -> bool {
    let before = self.items.len();
    let ttl = self.ttl;
    self.items.retain(|(_, shown)| shown.elapsed() < ttl);
    self.items.len() != before
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let width = TOAST_WIDTH.min(area.width);
    let mut bottom = area.y + area.height;

    for (notice, _) in self.items.iter().rev() {
      let (color, title) = match notice.kind {
        NoticeKind::Success => (Color::Green, " ok "),
        NoticeKind::Error => (Color::Red, " error "),
        NoticeKind::Info => (Color::Cyan, " info "),
      };

      // Rough wrap estimate plus borders
      let inner_width = width.saturating_sub(2).max(1) as usize;
      let lines = notice.message.chars().count().div_ceil(inner_width).max(1) as u16;
      let height = (lines + 2).min(6);
      if bottom < area.y + height {
        break;
      }
      bottom -= height;

      let toast_area = Rect::new(area.x + area.width - width, bottom, width, height);
      frame.render_widget(Clear, toast_area);
      frame.render_widget(
        Paragraph::new(notice.message.clone())
          .style(Style::default().fg(color))
          .wrap(Wrap { trim: true })
          .block(
            Block::default()
              .title(title)
              .borders(Borders::ALL)
              .border_style(Style::default().fg(color)),
          ),
        toast_area,
      );
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_expired_toasts_are_pruned() {
    let mut toasts = Toasts::new(Duration::ZERO);
    toasts.push(Notice::success("saved"));
    assert_eq!(toasts.len(), 1);
    assert!(toasts.prune());
    assert!(toasts.is_empty());
  }

  #[test]
  fn test_oldest_toast_dropped_when_full() {
    let mut toasts = Toasts::default();
    for i in 0..6 {
      toasts.push(Notice::info(format!("n{i}")));
    }
    assert_eq!(toasts.len(), MAX_TOASTS);
    assert!(!toasts.prune());
    assert_eq!(toasts.items.front().map(|(n, _)| n.message.as_str()), Some("n2"));
  }
}
