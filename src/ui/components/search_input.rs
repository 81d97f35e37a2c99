use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Events emitted by search input that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
  /// Filter text changed (on each keystroke, empty string on cancel)
  Changed(String),
  /// Editing finished, filter stays applied
  Submitted,
}

/// `/` filter bar for list views.
///
/// The filter persists after Enter and is shown as a one-line bar until
/// cleared with Esc.
#[derive(Debug, Clone, Default)]
pub struct SearchInput {
  input: TextInput,
  active: bool,
}

impl SearchInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn query(&self) -> &str {
    self.input.value()
  }

  /// Whether the bar needs a line on screen
  pub fn is_visible(&self) -> bool {
    self.active || !self.input.is_empty()
  }

  pub fn clear(&mut self) {
    self.active = false;
    self.input.clear();
  }

  /// Handle a key event. Call this regardless of active state; it handles activation too.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<SearchEvent> {
    if !self.active {
      return match key.code {
        KeyCode::Char('/') => {
          self.active = true;
          KeyResult::Handled
        }
        // Esc on an applied filter clears it before it can mean "back"
        KeyCode::Esc if !self.input.is_empty() => {
          self.input.clear();
          KeyResult::Event(SearchEvent::Changed(String::new()))
        }
        _ => KeyResult::NotHandled,
      };
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(_) => {
        self.active = false;
        KeyResult::Event(SearchEvent::Submitted)
      }
      InputResult::Cancelled => {
        self.clear();
        KeyResult::Event(SearchEvent::Changed(String::new()))
      }
      InputResult::Consumed => {
        KeyResult::Event(SearchEvent::Changed(self.input.value().to_string()))
      }
      // Swallow everything else while typing
      InputResult::NotHandled => KeyResult::Handled,
    }
  }

  /// Render the filter bar into a single-line area
  pub fn render(&self, frame: &mut Frame, area: Rect) {
    if !self.is_visible() {
      return;
    }

    let accent = if self.active {
      Color::Yellow
    } else {
      Color::DarkGray
    };

    let mut spans = vec![Span::styled(" /", Style::default().fg(accent).bold())];
    spans.extend(self.input.spans(self.active));
    if !self.active {
      spans.push(Span::styled(
        "  (esc to clear)",
        Style::default().fg(Color::DarkGray),
      ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
  }
}
