use super::{list_title, refresh_status, render_message, split_search, step_selection, titled_block};
use crate::api::api_types::{Product, Transaction, TransactionType};
use crate::api::CachedApiClient;
use crate::cache::Tag;
use crate::derived::{self, TransactionTotals};
use crate::event::Notifier;
use crate::query::{Mutation, Query, QueryState};
use crate::ui::components::{ChoiceOption, Form, FormEvent, KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{format_timestamp, transaction_type_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::validation::validate_transaction;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Cell, Paragraph, Row, Table, TableState};

/// Transaction history with sale and return forms
pub struct TransactionsView {
  api: CachedApiClient,
  notifier: Notifier,
  query: Query<Vec<Transaction>>,
  /// Feeds the product picker of the forms
  products: Query<Vec<Product>>,
  table_state: TableState,
  search: SearchInput,
  form: Option<(TransactionType, Form)>,
  record: Mutation<Transaction>,
}

impl TransactionsView {
  pub fn new(api: CachedApiClient, notifier: Notifier) -> Self {
    let mut query = api.transactions_query();
    query.fetch();
    let mut products = api.products_query();
    products.fetch();

    Self {
      api,
      notifier,
      query,
      products,
      table_state: TableState::default(),
      search: SearchInput::new(),
      form: None,
      record: Mutation::default(),
    }
  }

  fn visible(&self) -> Vec<&Transaction> {
    match self.query.data() {
      Some(transactions) => derived::search_transactions(transactions, self.search.query()),
      None => Vec::new(),
    }
  }

  fn open_form(&mut self, kind: TransactionType) {
    let Some(products) = self.products.data() else {
      self.notifier.error("Products are still loading");
      return;
    };

    let options = products
      .iter()
      .map(|p| ChoiceOption {
        id: p.product_id.clone(),
        label: format!("{} - {} (qty {})", p.code, p.display_name(), p.quantity),
      })
      .collect();

    let title = match kind {
      TransactionType::Sale => "Add to Shop",
      TransactionType::Return => "Add to Store",
    };

    let form = Form::new(title)
      .choice("Product", options)
      .text("Quantity", "")
      .text("Remarks", "");
    self.form = Some((kind, form));
  }

  fn submit(&mut self) {
    if self.record.is_pending() {
      self.notifier.info("Still saving the previous change");
      return;
    }
    let Some((kind, form)) = self.form.as_mut() else {
      return;
    };
    let kind = *kind;

    let product = form.choice_id("Product").and_then(|id| {
      self
        .products
        .data()
        .and_then(|products| products.iter().find(|p| p.product_id == id))
    });

    match validate_transaction(kind, product, form.value("Quantity"), form.value("Remarks")) {
      Ok(transaction) => {
        form.set_submitting(true);
        let api = self.api.clone();
        self.record.start(async move {
          let recorded = match transaction.transaction_type {
            TransactionType::Sale => api.record_sale(&transaction).await,
            TransactionType::Return => api.record_return(&transaction).await,
          };
          recorded.map_err(|e| e.to_string())
        });
      }
      Err(e) => {
        form.set_error(Some(e.to_string()));
        self.notifier.error(e.to_string());
      }
    }
  }

  fn handle_form_key(&mut self, key: KeyEvent) {
    let Some((_, form)) = self.form.as_mut() else {
      return;
    };
    match form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted) => self.submit(),
      KeyResult::Event(FormEvent::Cancelled) => self.form = None,
      KeyResult::Handled | KeyResult::NotHandled => {}
    }
  }

  fn render_totals(&self, frame: &mut Frame, area: Rect) {
    let totals = self
      .query
      .data()
      .map(|all| TransactionTotals::from_transactions(all))
      .unwrap_or_default();

    let line = Line::from(vec![
      Span::styled(" Sold ", Style::default().fg(Color::Green)),
      Span::raw(totals.sale.to_string()),
      Span::styled("  Returned ", Style::default().fg(Color::Magenta)),
      Span::raw(totals.returned.to_string()),
      Span::styled("  Total ", Style::default().fg(Color::White).bold()),
      Span::raw(totals.total().to_string()),
      Span::styled(
        format!("  ({}% sales)", totals.sale_percentage()),
        Style::default().fg(Color::DarkGray),
      ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let visible = self.visible();
    let len = visible.len();
    let block = titled_block(list_title("Transactions", &self.query, len));

    match self.query.state() {
      QueryState::Loading => {
        render_message(
          frame,
          area,
          block,
          "Loading transactions...".to_string(),
          Color::DarkGray,
        );
        return;
      }
      QueryState::Error(e) => {
        render_message(
          frame,
          area,
          block,
          format!("Failed to load transactions: {}\n\nPress 'r' to retry.", e),
          Color::Red,
        );
        return;
      }
      QueryState::Ready(_) if len == 0 => {
        let text = if self.search.query().is_empty() {
          "No transactions yet. Press 's' to record a sale."
        } else {
          "No transactions match the search."
        };
        render_message(frame, area, block, text.to_string(), Color::DarkGray);
        return;
      }
      QueryState::Ready(_) => {}
    }

    let rows: Vec<Row> = visible
      .iter()
      .map(|tx| {
        let (name, code) = match &tx.product {
          Some(p) => (p.display_name().to_string(), p.code.clone()),
          None => ("(deleted product)".to_string(), "-".to_string()),
        };
        Row::new(vec![
          Cell::from(format_timestamp(&tx.date)).style(Style::default().fg(Color::DarkGray)),
          Cell::from(tx.transaction_type.as_str())
            .style(Style::default().fg(transaction_type_color(tx.transaction_type))),
          Cell::from(truncate(&name, 24)),
          Cell::from(code).style(Style::default().fg(Color::Cyan)),
          Cell::from(tx.quantity.to_string()),
          Cell::from(truncate(tx.remarks.as_deref().unwrap_or(""), 40))
            .style(Style::default().fg(Color::Gray)),
        ])
      })
      .collect();

    let table = Table::new(
      rows,
      [
        Constraint::Length(17),
        Constraint::Length(7),
        Constraint::Percentage(25),
        Constraint::Length(12),
        Constraint::Length(6),
        Constraint::Min(10),
      ],
    )
    .header(
      Row::new(vec!["DATE", "TYPE", "PRODUCT", "CODE", "QTY", "REMARKS"])
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

impl View for TransactionsView {
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
      KeyCode::Char('s') => self.open_form(TransactionType::Sale),
      KeyCode::Char('a') => self.open_form(TransactionType::Return),
      KeyCode::Char('r') => {
        if self.api.refresh(&[Tag::Transaction]) == 0 {
          self.query.refetch();
          self.products.refetch();
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let (search_area, rest) = split_search(area, self.search.is_visible());
    if let Some(bar) = search_area {
      self.search.render(frame, bar);
    }

    let [table_area, totals_area] =
      Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(rest);
    self.render_table(frame, table_area);
    self.render_totals(frame, totals_area);

    if let Some((_, form)) = &self.form {
      form.render(frame, area);
    }
  }

  fn breadcrumb_label(&self) -> String {
    "Transactions".to_string()
  }

  fn tick(&mut self) {
    self.query.poll();
    self.products.poll();

    match self.record.poll() {
      Some(Ok(tx)) => {
        let message = match tx.transaction_type {
          TransactionType::Sale => format!("Recorded sale of {}", tx.quantity),
          TransactionType::Return => format!("Recorded return of {}", tx.quantity),
        };
        self.notifier.success(message);
        self.form = None;
      }
      Some(Err(e)) => {
        self.notifier.error(format!("Failed to record transaction: {}", e));
        if let Some((_, form)) = self.form.as_mut() {
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
      ShortcutInfo::new("s", "sale").with_priority(30),
      ShortcutInfo::new("a", "return").with_priority(40),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
