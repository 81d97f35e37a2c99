use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::ui::renderfns::centered_rect;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

const VISIBLE_CHOICES: usize = 5;

/// Events emitted by a form that the owning view needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
  Submitted,
  Cancelled,
}

/// One selectable entry of a choice field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
  pub id: String,
  pub label: String,
}

#[derive(Debug, Clone)]
enum FieldKind {
  Text,
  /// Typed text filters `options`; Up/Down pick among the matches
  Choice {
    options: Vec<ChoiceOption>,
    selected: usize,
  },
}

#[derive(Debug, Clone)]
struct FormField {
  label: &'static str,
  input: TextInput,
  kind: FieldKind,
}

impl FormField {
  fn matches(&self) -> Vec<&ChoiceOption> {
    match &self.kind {
      FieldKind::Text => Vec::new(),
      FieldKind::Choice { options, .. } => {
        let needle = self.input.value().trim().to_lowercase();
        options
          .iter()
          .filter(|o| needle.is_empty() || o.label.to_lowercase().contains(&needle))
          .collect()
      }
    }
  }

  fn selected_choice(&self) -> Option<&ChoiceOption> {
    match &self.kind {
      FieldKind::Choice { selected, .. } => self.matches().get(*selected).copied(),
      FieldKind::Text => None,
    }
  }

  fn move_choice(&mut self, delta: isize) {
    let count = self.matches().len();
    if let FieldKind::Choice { selected, .. } = &mut self.kind {
      if count == 0 {
        *selected = 0;
      } else {
        *selected = (*selected as isize + delta).rem_euclid(count as isize) as usize;
      }
    }
  }

  fn reset_choice(&mut self) {
    if let FieldKind::Choice { selected, .. } = &mut self.kind {
      *selected = 0;
    }
  }
}

/// Modal form with labelled single-line fields.
///
/// Tab/Shift-Tab (or Up/Down on text fields) move focus, Enter submits and
/// Esc cancels. The owning view validates on submit and reports problems
/// back through `set_error`.
#[derive(Debug, Clone)]
pub struct Form {
  title: String,
  fields: Vec<FormField>,
  focus: usize,
  error: Option<String>,
  submitting: bool,
}

impl Form {
  pub fn new(title: impl Into<String>) -> Self {
    Self {
      title: title.into(),
      fields: Vec::new(),
      focus: 0,
      error: None,
      submitting: false,
    }
  }

  pub fn text(mut self, label: &'static str, value: impl Into<String>) -> Self {
    self.fields.push(FormField {
      label,
      input: TextInput::with_value(value),
      kind: FieldKind::Text,
    });
    self
  }

  pub fn choice(mut self, label: &'static str, options: Vec<ChoiceOption>) -> Self {
    self.fields.push(FormField {
      label,
      input: TextInput::new(),
      kind: FieldKind::Choice {
        options,
        selected: 0,
      },
    });
    self
  }

  fn field(&self, label: &str) -> Option<&FormField> {
    self.fields.iter().find(|f| f.label == label)
  }

  /// Text of the field called `label`, empty if there is no such field
  pub fn value(&self, label: &str) -> &str {
    self.field(label).map(|f| f.input.value()).unwrap_or("")
  }

  /// Id of the highlighted option of the choice field called `label`
  pub fn choice_id(&self, label: &str) -> Option<&str> {
    self
      .field(label)
      .and_then(|f| f.selected_choice())
      .map(|o| o.id.as_str())
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  pub fn set_error(&mut self, error: Option<String>) {
    self.error = error;
  }

  pub fn is_submitting(&self) -> bool {
    self.submitting
  }

  /// While submitting, the form ignores input and shows a saving indicator
  pub fn set_submitting(&mut self, submitting: bool) {
    self.submitting = submitting;
  }

  fn move_focus(&mut self, delta: isize) {
    let count = self.fields.len() as isize;
    if count > 0 {
      self.focus = (self.focus as isize + delta).rem_euclid(count) as usize;
    }
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    if self.submitting {
      return KeyResult::Handled;
    }

    let on_choice = matches!(
      self.fields.get(self.focus).map(|f| &f.kind),
      Some(FieldKind::Choice { .. })
    );

    match key.code {
      KeyCode::Esc => return KeyResult::Event(FormEvent::Cancelled),
      KeyCode::Enter => return KeyResult::Event(FormEvent::Submitted),
      KeyCode::Tab => self.move_focus(1),
      KeyCode::BackTab => self.move_focus(-1),
      KeyCode::Down if on_choice => self.fields[self.focus].move_choice(1),
      KeyCode::Up if on_choice => self.fields[self.focus].move_choice(-1),
      KeyCode::Down => self.move_focus(1),
      KeyCode::Up => self.move_focus(-1),
      _ => {
        if let Some(field) = self.fields.get_mut(self.focus) {
          if field.input.handle_key(key) == InputResult::Consumed {
            field.reset_choice();
            self.error = None;
          }
        }
      }
    }
    KeyResult::Handled
  }

  fn field_lines(&self, field: &FormField, focused: bool) -> Vec<Line<'static>> {
    let label_style = if focused {
      Style::default().fg(Color::Yellow).bold()
    } else {
      Style::default().fg(Color::Gray)
    };

    let mut head = vec![Span::styled(format!("{:>12}: ", field.label), label_style)];
    head.extend(field.input.spans(focused));
    let mut lines = vec![Line::from(head)];

    if let FieldKind::Choice { selected, .. } = &field.kind {
      let matches = field.matches();
      if matches.is_empty() {
        lines.push(Line::styled(
          format!("{:>14}no matches", ""),
          Style::default().fg(Color::DarkGray),
        ));
      }
      // Keep the selection inside the visible window
      let start = selected.saturating_sub(VISIBLE_CHOICES - 1);
      for (i, option) in matches.iter().enumerate().skip(start).take(VISIBLE_CHOICES) {
        let style = if i == *selected {
          Style::default().fg(Color::Cyan).bg(Color::DarkGray)
        } else {
          Style::default().fg(Color::White)
        };
        let marker = if i == *selected { "> " } else { "  " };
        lines.push(Line::from(vec![
          Span::raw(format!("{:>12}", marker)),
          Span::styled(option.label.clone(), style),
        ]));
      }
    }

    lines
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();
    for (i, field) in self.fields.iter().enumerate() {
      lines.extend(self.field_lines(field, i == self.focus));
    }

    lines.push(Line::raw(""));
    if let Some(error) = &self.error {
      lines.push(Line::styled(
        error.clone(),
        Style::default().fg(Color::Red).bold(),
      ));
    }
    let hint = if self.submitting {
      Line::styled("Saving...", Style::default().fg(Color::Yellow))
    } else {
      Line::styled(
        "<tab> next  <enter> save  <esc> cancel",
        Style::default().fg(Color::DarkGray),
      )
    };
    lines.push(hint);

    let height = lines.len() as u16 + 2;
    let modal = centered_rect(area, 64, height);
    frame.render_widget(Clear, modal);

    let block = Block::default()
      .title(format!(" {} ", self.title))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Cyan));

    frame.render_widget(
      Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
      modal,
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn type_text(form: &mut Form, text: &str) {
    for c in text.chars() {
      form.handle_key(key(KeyCode::Char(c)));
    }
  }

  fn options() -> Vec<ChoiceOption> {
    ["PEN Blue pen", "PAD Notepad", "INK Refill"]
      .iter()
      .enumerate()
      .map(|(i, label)| ChoiceOption {
        id: format!("p-{i}"),
        label: label.to_string(),
      })
      .collect()
  }

  #[test]
  fn test_typing_goes_to_focused_field() {
    let mut form = Form::new("Add").text("Code", "").text("Quantity", "");
    type_text(&mut form, "A1");
    form.handle_key(key(KeyCode::Tab));
    type_text(&mut form, "5");

    assert_eq!(form.value("Code"), "A1");
    assert_eq!(form.value("Quantity"), "5");
    assert_eq!(form.value("Missing"), "");
  }

  #[test]
  fn test_enter_and_esc_emit_events() {
    let mut form = Form::new("Add").text("Code", "");
    assert_eq!(
      form.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(FormEvent::Submitted)
    );
    assert_eq!(
      form.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(FormEvent::Cancelled)
    );
  }

  #[test]
  fn test_choice_filters_and_selects() {
    let mut form = Form::new("Sale").choice("Product", options());
    assert_eq!(form.choice_id("Product"), Some("p-0"));

    form.handle_key(key(KeyCode::Down));
    assert_eq!(form.choice_id("Product"), Some("p-1"));

    type_text(&mut form, "ink");
    assert_eq!(form.choice_id("Product"), Some("p-2"));

    type_text(&mut form, "zzz");
    assert_eq!(form.choice_id("Product"), None);
  }

  #[test]
  fn test_submitting_blocks_input() {
    let mut form = Form::new("Add").text("Code", "A");
    form.set_submitting(true);
    assert_eq!(form.handle_key(key(KeyCode::Esc)), KeyResult::Handled);
    type_text(&mut form, "B");
    assert_eq!(form.value("Code"), "A");
  }

  #[test]
  fn test_editing_clears_error() {
    let mut form = Form::new("Add").text("Code", "");
    form.set_error(Some("Product Code is required.".to_string()));
    type_text(&mut form, "x");
    assert!(form.error().is_none());
  }
}
