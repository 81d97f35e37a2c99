use super::{list_title, refresh_status, render_message, split_search, step_selection, titled_block};
use crate::api::api_types::{Product, ProductPatch};
use crate::api::CachedApiClient;
use crate::cache::Tag;
use crate::derived;
use crate::event::Notifier;
use crate::query::{Mutation, Query, QueryState};
use crate::ui::components::{ConfirmDialog, Form, FormEvent, KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{format_timestamp, quantity_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::ProductDetailView;
use crate::validation::{validate_product_edit, ProductInput};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Cell, Row, Table, TableState};

/// Modal currently open over the table
enum Modal {
  Edit { product: Product, form: Form },
  Delete { product: Product, dialog: ConfirmDialog },
}

/// Stock table with edit and delete
pub struct InventoryView {
  api: CachedApiClient,
  notifier: Notifier,
  query: Query<Vec<Product>>,
  table_state: TableState,
  search: SearchInput,
  modal: Option<Modal>,
  /// Resolves to the success message
  write: Mutation<String>,
}

impl InventoryView {
  pub fn new(api: CachedApiClient, notifier: Notifier) -> Self {
    let mut query = api.products_query();
    query.fetch();

    Self {
      api,
      notifier,
      query,
      table_state: TableState::default(),
      search: SearchInput::new(),
      modal: None,
      write: Mutation::default(),
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

  fn edit_form(product: &Product) -> Form {
    let input = ProductInput::from_product(product);
    Form::new(format!("Edit {}", product.code))
      .text("Code", input.code)
      .text("Name", input.name)
      .text("Description", input.description)
      .text("Row", input.row)
      .text("Quantity", input.quantity)
  }

  fn submit_edit(&mut self) {
    if self.write.is_pending() {
      self.notifier.info("Still saving the previous change");
      return;
    }
    let Some(Modal::Edit { product, form }) = self.modal.as_mut() else {
      return;
    };

    let input = ProductInput {
      name: form.value("Name").to_string(),
      code: form.value("Code").to_string(),
      description: form.value("Description").to_string(),
      row: form.value("Row").to_string(),
      quantity: form.value("Quantity").to_string(),
    };

    let patch = match validate_product_edit(product, &input) {
      Ok(patch) => patch,
      Err(e) => {
        form.set_error(Some(e.to_string()));
        self.notifier.error(e.to_string());
        return;
      }
    };

    if patch == ProductPatch::default() {
      self.notifier.info("No changes to save");
      self.modal = None;
      return;
    }

    form.set_submitting(true);
    let api = self.api.clone();
    let product_id = product.product_id.clone();
    self.write.start(async move {
      let updated = api
        .edit_product(&product_id, &patch)
        .await
        .map_err(|e| e.to_string())?;
      Ok::<_, String>(format!("Product {} updated", updated.code))
    });
  }

  fn confirm_delete(&mut self) {
    if self.write.is_pending() {
      self.notifier.info("Still saving the previous change");
      return;
    }
    let Some(Modal::Delete { product, .. }) = self.modal.take() else {
      return;
    };

    let api = self.api.clone();
    self.write.start(async move {
      api
        .delete_product(&product.product_id)
        .await
        .map_err(|e| e.to_string())?;
      Ok::<_, String>(format!("Product {} deleted", product.code))
    });
  }

  fn handle_modal_key(&mut self, key: KeyEvent) {
    match self.modal.as_mut() {
      Some(Modal::Edit { form, .. }) => match form.handle_key(key) {
        KeyResult::Event(FormEvent::Submitted) => self.submit_edit(),
        KeyResult::Event(FormEvent::Cancelled) => self.modal = None,
        KeyResult::Handled | KeyResult::NotHandled => {}
      },
      Some(Modal::Delete { dialog, .. }) => match dialog.handle_key(key) {
        KeyResult::Event(true) => self.confirm_delete(),
        KeyResult::Event(false) => self.modal = None,
        KeyResult::Handled | KeyResult::NotHandled => {}
      },
      None => {}
    }
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let visible = self.visible();
    let len = visible.len();
    let block = titled_block(list_title("Inventory", &self.query, len));

    match self.query.state() {
      QueryState::Loading => {
        render_message(frame, area, block, "Loading inventory...".to_string(), Color::DarkGray);
        return;
      }
      QueryState::Error(e) => {
        render_message(
          frame,
          area,
          block,
          format!("Failed to load inventory: {}\n\nPress 'r' to retry.", e),
          Color::Red,
        );
        return;
      }
      QueryState::Ready(_) if len == 0 => {
        render_message(frame, area, block, "No products found.".to_string(), Color::DarkGray);
        return;
      }
      QueryState::Ready(_) => {}
    }

    let rows: Vec<Row> = visible
      .iter()
      .map(|p| {
        Row::new(vec![
          Cell::from(p.code.clone()).style(Style::default().fg(Color::Cyan)),
          Cell::from(truncate(p.name.as_deref().unwrap_or("-"), 24)),
          Cell::from(truncate(p.description.as_deref().unwrap_or(""), 32))
            .style(Style::default().fg(Color::Gray)),
          Cell::from(p.row.clone().unwrap_or_default()),
          Cell::from(p.quantity.to_string()).style(
            Style::default()
              .fg(quantity_color(p.quantity))
              .add_modifier(Modifier::BOLD),
          ),
          Cell::from(format_timestamp(&p.created_at)).style(Style::default().fg(Color::DarkGray)),
        ])
      })
      .collect();

    let table = Table::new(
      rows,
      [
        Constraint::Length(12),
        Constraint::Percentage(25),
        Constraint::Min(16),
        Constraint::Length(8),
        Constraint::Length(6),
        Constraint::Length(17),
      ],
    )
    .header(
      Row::new(vec!["CODE", "NAME", "DESCRIPTION", "ROW", "QTY", "CREATED"])
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

impl View for InventoryView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.modal.is_some() {
      self.handle_modal_key(key);
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
      KeyCode::Char('e') => {
        if let Some(product) = self.selected() {
          let form = Self::edit_form(&product);
          self.modal = Some(Modal::Edit { product, form });
        }
      }
      KeyCode::Char('d') => {
        if let Some(product) = self.selected() {
          let dialog = ConfirmDialog::new(
            "Delete Product",
            format!(
              "Delete {} ({})? This cannot be undone.",
              product.display_name(),
              product.code
            ),
          );
          self.modal = Some(Modal::Delete { product, dialog });
        }
      }
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

    match &self.modal {
      Some(Modal::Edit { form, .. }) => form.render(frame, area),
      Some(Modal::Delete { dialog, .. }) => dialog.render(frame, area),
      None => {}
    }
  }

  fn breadcrumb_label(&self) -> String {
    "Inventory".to_string()
  }

  fn tick(&mut self) {
    self.query.poll();

    match self.write.poll() {
      Some(Ok(message)) => {
        self.notifier.success(message);
        if matches!(self.modal, Some(Modal::Edit { .. })) {
          self.modal = None;
        }
      }
      Some(Err(e)) => {
        self.notifier.error(e.clone());
        if let Some(Modal::Edit { form, .. }) = self.modal.as_mut() {
          form.set_submitting(false);
          form.set_error(Some(e));
        }
      }
      None => {}
    }
  }

  fn captures_input(&self) -> bool {
    self.modal.is_some() || self.search.is_active()
  }

  fn status(&self) -> Option<String> {
    if self.write.is_pending() {
      return Some("saving... ".to_string());
    }
    refresh_status(&self.query)
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "search").with_priority(20),
      ShortcutInfo::new("e", "edit").with_priority(30),
      ShortcutInfo::new("d", "delete").with_priority(40),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
