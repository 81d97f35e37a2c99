use super::{refresh_status, render_message, titled_block};
use crate::api::api_types::{Product, Transaction};
use crate::api::CachedApiClient;
use crate::cache::Tag;
use crate::query::{Query, QueryState};
use crate::ui::renderfns::{format_timestamp, quantity_color, transaction_type_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};

/// One product's fields and its transaction history
pub struct ProductDetailView {
  api: CachedApiClient,
  /// Snapshot taken when the view was opened, replaced by fresher catalog data
  product: Product,
  deleted: bool,
  products: Query<Vec<Product>>,
  transactions: Query<Vec<Transaction>>,
}

impl ProductDetailView {
  pub fn new(product: Product, api: CachedApiClient) -> Self {
    let mut products = api.products_query();
    products.fetch();
    let mut transactions = api.transactions_query();
    transactions.fetch();

    Self {
      api,
      product,
      deleted: false,
      products,
      transactions,
    }
  }

  /// Follow edits and deletion of the product made elsewhere
  fn sync_product(&mut self) {
    let Some(products) = self.products.data() else {
      return;
    };
    match products
      .iter()
      .find(|p| p.product_id == self.product.product_id)
    {
      Some(fresh) => {
        self.product = fresh.clone();
        self.deleted = false;
      }
      None => self.deleted = true,
    }
  }

  fn history(&self) -> Vec<&Transaction> {
    self
      .transactions
      .data()
      .map(|all| {
        all
          .iter()
          .filter(|tx| tx.product_id.as_deref() == Some(self.product.product_id.as_str()))
          .collect()
      })
      .unwrap_or_default()
  }

  fn render_fields(&self, frame: &mut Frame, area: Rect) {
    let p = &self.product;
    let label = |text: &'static str| {
      Span::styled(format!("{:<13}", text), Style::default().fg(Color::Gray))
    };
    let or_dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    let mut lines = vec![
      Line::from(vec![
        label("Code"),
        Span::styled(p.code.clone(), Style::default().fg(Color::Cyan).bold()),
      ]),
      Line::from(vec![label("Name"), Span::raw(or_dash(&p.name))]),
      Line::from(vec![label("Row"), Span::raw(or_dash(&p.row))]),
      Line::from(vec![
        label("Quantity"),
        Span::styled(
          p.quantity.to_string(),
          Style::default().fg(quantity_color(p.quantity)).bold(),
        ),
      ]),
      Line::from(vec![label("Created"), Span::raw(format_timestamp(&p.created_at))]),
      Line::from(vec![
        label("Product ID"),
        Span::styled(p.product_id.clone(), Style::default().fg(Color::DarkGray)),
      ]),
      Line::from(""),
      Line::from(Span::styled("Description", Style::default().fg(Color::Gray))),
      Line::from(p.description.clone().unwrap_or_else(|| "(none)".to_string())),
    ];

    if self.deleted {
      lines.insert(
        0,
        Line::styled(
          "This product has been deleted.",
          Style::default().fg(Color::Red).bold(),
        ),
      );
    }

    let title = format!(" {} ", truncate(p.display_name(), 40));
    frame.render_widget(
      Paragraph::new(lines)
        .block(titled_block(title))
        .wrap(Wrap { trim: false }),
      area,
    );
  }

  fn render_history(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(" History ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    match self.transactions.state() {
      QueryState::Loading => {
        render_message(frame, area, block, "Loading history...".to_string(), Color::DarkGray);
        return;
      }
      QueryState::Error(e) => {
        render_message(
          frame,
          area,
          block,
          format!("Failed to load history: {}", e),
          Color::Red,
        );
        return;
      }
      QueryState::Ready(_) => {}
    }

    let history = self.history();
    if history.is_empty() {
      render_message(
        frame,
        area,
        block,
        "No transactions for this product.".to_string(),
        Color::DarkGray,
      );
      return;
    }

    let items: Vec<ListItem> = history
      .iter()
      .map(|tx| {
        ListItem::new(Line::from(vec![
          Span::styled(format_timestamp(&tx.date), Style::default().fg(Color::DarkGray)),
          Span::raw("  "),
          Span::styled(
            format!("{:<9}", tx.transaction_type.verb()),
            Style::default().fg(transaction_type_color(tx.transaction_type)),
          ),
          Span::styled(format!("{:>5}", tx.quantity), Style::default().bold()),
          Span::raw("  "),
          Span::styled(
            truncate(tx.remarks.as_deref().unwrap_or(""), 40),
            Style::default().fg(Color::Gray),
          ),
        ]))
      })
      .collect();

    frame.render_widget(List::new(items).block(block), area);
  }
}

impl View for ProductDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        if self.api.refresh(&[Tag::Products, Tag::Transaction]) == 0 {
          self.products.refetch();
          self.transactions.refetch();
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let [fields, history] =
      Layout::vertical([Constraint::Length(12), Constraint::Min(3)]).areas(area);
    self.render_fields(frame, fields);
    self.render_history(frame, history);
  }

  fn breadcrumb_label(&self) -> String {
    self.product.code.clone()
  }

  fn tick(&mut self) {
    if self.products.poll() {
      self.sync_product();
    }
    self.transactions.poll();
  }

  fn status(&self) -> Option<String> {
    refresh_status(&self.transactions)
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("r", "refresh").with_priority(20),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
