use crate::auth::{AuthError, AuthGate};
use crate::ui::components::TextInput;
use crate::ui::renderfns::centered_rect;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use tracing::error;

/// Password prompt shown until the admin session is open
pub struct LoginView {
  auth: AuthGate,
  input: TextInput,
  error: Option<String>,
  /// Command to run once logged in
  next: &'static str,
}

impl LoginView {
  pub fn new(auth: AuthGate, next: &'static str) -> Self {
    Self {
      auth,
      input: TextInput::masked(),
      error: None,
      next,
    }
  }

  fn submit(&mut self) -> ViewAction {
    match self.auth.login(self.input.value()) {
      Ok(()) => ViewAction::Command(self.next),
      Err(AuthError::WrongPassword) => {
        self.input.clear();
        self.error = Some(AuthError::WrongPassword.to_string());
        ViewAction::None
      }
      Err(e) => {
        error!(error = %e, "failed to store session");
        self.error = Some(e.to_string());
        ViewAction::None
      }
    }
  }
}

impl View for LoginView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Enter => self.submit(),
      KeyCode::Esc => {
        self.input.clear();
        self.error = None;
        ViewAction::None
      }
      _ => {
        self.input.handle_key(key);
        ViewAction::None
      }
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let modal = centered_rect(area, 44, 7);
    frame.render_widget(Clear, modal);

    let mut password = vec![Span::styled("Password: ", Style::default().fg(Color::Yellow))];
    password.extend(self.input.spans(true));

    let status = match &self.error {
      Some(e) => Line::styled(e.clone(), Style::default().fg(Color::Red)),
      None => Line::styled("Enter to log in", Style::default().fg(Color::DarkGray)),
    };

    let block = Block::default()
      .title(" Admin Login ")
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Cyan));

    frame.render_widget(
      Paragraph::new(vec![Line::from(""), Line::from(password), Line::from(""), status])
        .block(block),
      modal,
    );
  }

  fn breadcrumb_label(&self) -> String {
    "Login".to_string()
  }

  fn captures_input(&self) -> bool {
    true
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("enter", "log in").with_priority(10),
      ShortcutInfo::new("ctrl-c", "quit").with_priority(90),
    ]
  }
}
