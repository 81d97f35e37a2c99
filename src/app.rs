use crate::api::CachedApiClient;
use crate::auth::AuthGate;
use crate::commands;
use crate::config::Config;
use crate::event::{Event, EventHandler, Notifier};
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult, Toasts};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{
  DashboardView, InventoryView, LoginView, ProductsView, TransactionsView,
};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::{stdout, Stdout};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Commands that open a root view
pub const VIEW_COMMANDS: &[&str] = &["dashboard", "products", "inventory", "transactions"];

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// `:` prompt, shown as an overlay while active
  command_input: CommandInput,

  toasts: Toasts,

  api: CachedApiClient,

  auth: AuthGate,

  config: Config,

  /// Replaced by the event handler's notifier once `run` starts
  notifier: Notifier,

  /// Root view to open at startup
  initial_view: &'static str,

  should_quit: bool,
}

impl App {
  pub fn new(
    config: Config,
    api: CachedApiClient,
    auth: AuthGate,
    initial_view: &'static str,
  ) -> Self {
    let (tx, _rx) = mpsc::unbounded_channel();

    Self {
      view_stack: Vec::new(),
      command_input: CommandInput::new(),
      toasts: Toasts::default(),
      api,
      auth,
      config,
      notifier: Notifier::new(tx),
      initial_view,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250));
    self.notifier = events.notifier();
    self.execute_command(self.initial_view);

    let result = self.event_loop(&mut terminal, &mut events).await;

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(
    &mut self,
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }
    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => {
        self.handle_key(key);
        if let Some(view) = self.view_stack.last_mut() {
          view.tick();
        }
      }
      Event::Tick => {
        for view in self.view_stack.iter_mut() {
          view.tick();
        }
        self.toasts.prune();
      }
      Event::Notice(notice) => self.toasts.push(notice),
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    match self.command_input.handle_key(key) {
      KeyResult::Event(CommandEvent::Submitted(cmd)) => {
        self.execute_command(&cmd);
        return;
      }
      KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
      KeyResult::NotHandled => {}
    }

    let captured = self
      .view_stack
      .last()
      .map(|v| v.captures_input())
      .unwrap_or(false);

    if key.code == KeyCode::Char(':') && !captured && self.auth.is_authenticated() {
      self.command_input.activate();
      return;
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::None,
    };

    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => {
        debug!(view = %view.breadcrumb_label(), "push view");
        self.view_stack.push(view);
      }
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else if key.code == KeyCode::Char('q') {
          self.should_quit = true;
        }
      }
      ViewAction::Command(cmd) => self.execute_command(cmd),
    }
  }

  fn execute_command(&mut self, input: &str) {
    let Some(cmd) = commands::find(input) else {
      self
        .notifier
        .error(format!("Unknown command: {}", input.trim()));
      return;
    };

    info!(command = cmd.name, "execute command");

    match cmd.name {
      "quit" => self.should_quit = true,
      "logout" => self.logout(),
      name => {
        if !self.auth.is_authenticated() {
          self.replace_root(Box::new(LoginView::new(self.auth.clone(), name)));
          return;
        }
        if let Some(view) = self.root_view(name) {
          self.replace_root(view);
        }
      }
    }
  }

  fn logout(&mut self) {
    if !self.auth.is_enabled() {
      self.notifier.info("Login is disabled; set I9S_ADMIN_PASSWORD to enable it");
      return;
    }

    if let Err(e) = self.auth.logout() {
      error!(error = %e, "logout failed");
      self.notifier.error(e.to_string());
      return;
    }

    self.api.clear_cache();
    self.replace_root(Box::new(LoginView::new(self.auth.clone(), "dashboard")));
    self.notifier.success("Logged out");
  }

  fn root_view(&self, name: &str) -> Option<Box<dyn View>> {
    let api = self.api.clone();
    let notifier = self.notifier.clone();
    let view: Box<dyn View> = match name {
      "dashboard" => Box::new(DashboardView::new(api)),
      "products" => Box::new(ProductsView::new(api, notifier)),
      "inventory" => Box::new(InventoryView::new(api, notifier)),
      "transactions" => Box::new(TransactionsView::new(api, notifier)),
      _ => return None,
    };
    Some(view)
  }

  fn replace_root(&mut self, view: Box<dyn View>) {
    self.view_stack.clear();
    self.view_stack.push(view);
  }

  // Accessors for UI rendering
  pub fn current_view(&self) -> Option<&dyn View> {
    self.view_stack.last().map(|v| v.as_ref())
  }

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn base_url(&self) -> &str {
    self.api.base_url()
  }

  pub fn title(&self) -> Option<&str> {
    self.config.title.as_deref()
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }

  pub fn toasts(&self) -> &Toasts {
    &self.toasts
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command_input
  }
}
