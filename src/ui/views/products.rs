use super::{list_title, refresh_status, render_message, split_search, step_selection, titled_block};
use crate::api::api_types::Product;
use crate::api::CachedApiClient;
use crate::cache::Tag;
use crate::derived;
use crate::event::Notifier;
use crate::query::{Mutation, Query, QueryState};
use crate::ui::components::{Form, FormEvent, KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{format_timestamp, quantity_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::ProductDetailView;
use crate::validation::{validate_new_product, ProductInput};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Cell, Row, Table, TableState};

/// Product catalog with search and a create form
pub struct ProductsView {
  api: CachedApiClient,
  notifier: Notifier,
  query: Query<Vec<Product>>,
  table_state: TableState,
  search: SearchInput,
  form: Option<Form>,
  create: Mutation<Product>,
}

impl ProductsView {
  pub fn new(api: CachedApiClient, notifier: Notifier) -> Self {
    let mut query = api.products_query();
    query.fetch();

    Self {
      api,
      notifier,
      query,
      table_state: TableState::default(),
      search: SearchInput::new(),
      form: None,
      create: Mutation::default(),
    }
  }

  fn visible(&self) -> Vec<&Product> {
    match self.query.data() {
      Some(products) => derived::search_products(products, self.search.query()),
      None => Vec::new(),
    }
  }

  fn selected(&self) -> Option<Product> {
    let idx = self.table_state.selected()?;
    self.visible().get(idx).map(|p| (*p).clone())
  }

  fn create_form() -> Form {
    Form::new("Add Product")
      .text("Code", "")
      .text("Name", "")
      .text("Description", "")
      .text("Row", "")
      .text("Quantity", "")
  }

  fn submit(&mut self) {
    if self.create.is_pending() {
      self.notifier.info("Still saving the previous change");
      return;
    }
    let Some(form) = self.form.as_mut() else {
      return;
    };

    let input = ProductInput {
      name: form.value("Name").to_string(),
      code: form.value("Code").to_string(),
      description: form.value("Description").to_string(),
      row: form.value("Row").to_string(),
      quantity: form.value("Quantity").to_string(),
    };

    match validate_new_product(&input) {
      Ok(product) => {
        form.set_submitting(true);
        let api = self.api.clone();
        self.create.start(async move {
          api
            .create_product(&product)
            .await
            .map_err(|e| e.to_string())
        });
      }
      Err(e) => {
        form.set_error(Some(e.to_string()));
        self.notifier.error(e.to_string());
      }
    }
  }

  fn handle_form_key(&mut self, key: KeyEvent) {
    let Some(form) = self.form.as_mut() else {
      return;
    };
    match form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted) => self.submit(),
      KeyResult::Event(FormEvent::Cancelled) => self.form = None,
      KeyResult::Handled | KeyResult::NotHandled => {}
    }
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let visible = self.visible();
    let len = visible.len();
    let block = titled_block(list_title("Products", &self.query, len));

    match self.query.state() {
      QueryState::Loading => {
        render_message(frame, area, block, "Loading products...".to_string(), Color::DarkGray);
        return;
      }
      QueryState::Error(e) => {
        render_message(
          frame,
          area,
          block,
          format!("Failed to load products: {}\n\nPress 'r' to retry.", e),
          Color::Red,
        );
        return;
      }
      QueryState::Ready(_) if len == 0 => {
        let text = if self.search.query().is_empty() {
          "No products yet. Press 'c' to add one."
        } else {
          "No products match the search."
        };
        render_message(frame, area, block, text.to_string(), Color::DarkGray);
        return;
      }
      QueryState::Ready(_) => {}
    }

    let rows: Vec<Row> = visible
      .iter()
      .map(|p| {
        Row::new(vec![
          Cell::from(p.code.clone()).style(Style::default().fg(Color::Cyan)),
          Cell::from(truncate(p.name.as_deref().unwrap_or("-"), 28)),
          Cell::from(truncate(p.description.as_deref().unwrap_or(""), 40))
            .style(Style::default().fg(Color::Gray)),
          Cell::from(p.quantity.to_string()).style(Style::default().fg(quantity_color(p.quantity))),
          Cell::from(format_timestamp(&p.created_at)).style(Style::default().fg(Color::DarkGray)),
        ])
      })
      .collect();

    let table = Table::new(
      rows,
      [
        Constraint::Length(12),
        Constraint::Percentage(30),
        Constraint::Min(20),
        Constraint::Length(6),
        Constraint::Length(17),
      ],
    )
    .header(
      Row::new(vec!["CODE", "NAME", "DESCRIPTION", "QTY", "ADDED"])
        .style(Style::default().fg(Color::Yellow).bold()),
    )
    .block(block)
    .row_highlight_style(
      Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

    ensure_valid_selection(&mut self.table_state, len);
    frame.render_stateful_widget(table, area, &mut self.table_state);
  }
}

impl View for ProductsView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.form.is_some() {
      self.handle_form_key(key);
      return ViewAction::None;
    }

    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(_)) => {
        self.table_state.select(Some(0));
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    let len = self.visible().len();
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => step_selection(&mut self.table_state, len, 1),
      KeyCode::Char('k') | KeyCode::Up => step_selection(&mut self.table_state, len, -1),
      KeyCode::Char('c') => self.form = Some(Self::create_form()),
      KeyCode::Char('r') => {
        if self.api.refresh(&[Tag::Products]) == 0 {
          self.query.refetch();
        }
      }
      KeyCode::Enter => {
        if let Some(product) = self.selected() {
          return ViewAction::Push(Box::new(ProductDetailView::new(
            product,
            self.api.clone(),
          )));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let (search_area, table_area) = split_search(area, self.search.is_visible());
    if let Some(bar) = search_area {
      self.search.render(frame, bar);
    }
    self.render_table(frame, table_area);

    if let Some(form) = &self.form {
      form.render(frame, area);
    }
  }

  fn breadcrumb_label(&self) -> String {
    "Products".to_string()
  }

  fn tick(&mut self) {
    self.query.poll();

    match self.create.poll() {
      Some(Ok(product)) => {
        self.notifier.success(format!("Product {} created", product.code));
        self.form = None;
      }
      Some(Err(e)) => {
        self.notifier.error(format!("Failed to create product: {}", e));
        if let Some(form) = self.form.as_mut() {
          form.set_submitting(false);
          form.set_error(Some(e));
        }
      }
      None => {}
    }
  }

  fn captures_input(&self) -> bool {
    self.form.is_some() || self.search.is_active()
  }

  fn status(&self) -> Option<String> {
    refresh_status(&self.query)
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "search").with_priority(20),
      ShortcutInfo::new("c", "add").with_priority(30),
      ShortcutInfo::new("enter", "details").with_priority(40),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
