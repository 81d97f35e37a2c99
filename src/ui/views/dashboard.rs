use super::{refresh_status, render_message, titled_block};
use crate::api::api_types::DashboardMetrics;
use crate::api::CachedApiClient;
use crate::cache::Tag;
use crate::derived::{self, TransactionTotals};
use crate::query::{Query, QueryState};
use crate::ui::renderfns::{format_timestamp, transaction_type_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, Paragraph};

/// Overview of stock levels and sales, built from one metrics query
pub struct DashboardView {
  api: CachedApiClient,
  query: Query<DashboardMetrics>,
}

impl DashboardView {
  pub fn new(api: CachedApiClient) -> Self {
    let mut query = api.dashboard_query();
    query.fetch();
    Self { api, query }
  }

  fn card(title: &str, color: Color) -> Block<'static> {
    Block::default()
      .title(format!(" {} ", title))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(color))
  }

  fn render_low_stock(frame: &mut Frame, area: Rect, metrics: &DashboardMetrics) {
    let low = derived::low_stock(&metrics.low_products);
    let block = Self::card("Low Quantity Products", Color::Red);

    if low.is_empty() {
      render_message(
        frame,
        area,
        block,
        "All products are well stocked.".to_string(),
        Color::DarkGray,
      );
      return;
    }

    let items: Vec<ListItem> = low
      .iter()
      .map(|product| {
        let qty_style = if derived::is_critical(product) {
          Style::default().fg(Color::Red).bold()
        } else {
          Style::default().fg(Color::Yellow)
        };
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<10}", truncate(&product.code, 10)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(format!("{:<22}", truncate(product.display_name(), 22))),
          Span::styled(
            format!("{:<8}", truncate(product.row.as_deref().unwrap_or("-"), 8)),
            Style::default().fg(Color::DarkGray),
          ),
          Span::styled(format!("{:>5}", product.quantity), qty_style),
        ]))
      })
      .collect();

    frame.render_widget(List::new(items).block(block), area);
  }

  fn render_last_transactions(frame: &mut Frame, area: Rect, metrics: &DashboardMetrics) {
    let block = Self::card("Last Transactions", Color::Blue);

    if metrics.last_transactions.is_empty() {
      render_message(
        frame,
        area,
        block,
        "No transactions yet.".to_string(),
        Color::DarkGray,
      );
      return;
    }

    let items: Vec<ListItem> = metrics
      .last_transactions
      .iter()
      .map(|tx| {
        let name = tx
          .product
          .as_ref()
          .map(|p| p.display_name())
          .unwrap_or("(deleted product)");
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:>5} ", tx.quantity), Style::default().bold()),
          Span::raw(format!("{:<22}", truncate(name, 22))),
          Span::styled(
            format!("{:<9}", tx.transaction_type.verb()),
            Style::default().fg(transaction_type_color(tx.transaction_type)),
          ),
          Span::styled(format_timestamp(&tx.date), Style::default().fg(Color::DarkGray)),
        ]))
      })
      .collect();

    frame.render_widget(List::new(items).block(block), area);
  }

  fn render_totals(frame: &mut Frame, area: Rect, metrics: &DashboardMetrics) {
    let totals = TransactionTotals::from_metric_totals(&metrics.total_transactions_quantity);
    let block = Self::card("Total Transaction Quantity", Color::Green);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [numbers, gauge] =
      Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(inner);

    let lines = vec![
      Line::from(vec![
        Span::styled("Sale     ", Style::default().fg(Color::Green)),
        Span::raw(totals.sale.to_string()),
      ]),
      Line::from(vec![
        Span::styled("Return   ", Style::default().fg(Color::Magenta)),
        Span::raw(totals.returned.to_string()),
      ]),
      Line::from(vec![
        Span::styled("Total    ", Style::default().fg(Color::White).bold()),
        Span::raw(totals.total().to_string()),
      ]),
    ];
    frame.render_widget(Paragraph::new(lines), numbers);

    let pct = totals.sale_percentage();
    frame.render_widget(
      Gauge::default()
        .gauge_style(Style::default().fg(Color::Green).bg(Color::Magenta))
        .percent(pct.min(100) as u16)
        .label(format!("{}% sales", pct)),
      gauge,
    );
  }

  fn render_summary(frame: &mut Frame, area: Rect, metrics: &DashboardMetrics) {
    let low_count = derived::low_stock(&metrics.low_products).len();
    let critical = metrics
      .low_products
      .iter()
      .filter(|p| derived::is_critical(p))
      .count();

    let lines = vec![
      Line::from(vec![
        Span::styled("Products in stock   ", Style::default().fg(Color::Gray)),
        Span::styled(
          metrics.total_product_quantity.to_string(),
          Style::default().fg(Color::Cyan).bold(),
        ),
      ]),
      Line::from(vec![
        Span::styled("Low stock items     ", Style::default().fg(Color::Gray)),
        Span::styled(low_count.to_string(), Style::default().fg(Color::Yellow)),
      ]),
      Line::from(vec![
        Span::styled("Critical (< 5)      ", Style::default().fg(Color::Gray)),
        Span::styled(critical.to_string(), Style::default().fg(Color::Red)),
      ]),
    ];

    frame.render_widget(
      Paragraph::new(lines).block(Self::card("Total Summary", Color::Cyan)),
      area,
    );
  }
}

impl View for DashboardView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        if self.api.refresh(&[Tag::DashboardMetrics]) == 0 {
          self.query.refetch();
        }
      }
      KeyCode::Char('p') => return ViewAction::Command("products"),
      KeyCode::Char('i') => return ViewAction::Command("inventory"),
      KeyCode::Char('t') => return ViewAction::Command("transactions"),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let metrics = match self.query.state() {
      QueryState::Loading => {
        render_message(
          frame,
          area,
          titled_block(" Dashboard ".to_string()),
          "Loading dashboard...".to_string(),
          Color::DarkGray,
        );
        return;
      }
      QueryState::Error(e) => {
        render_message(
          frame,
          area,
          titled_block(" Dashboard (error) ".to_string()),
          format!("Failed to load dashboard: {}\n\nPress 'r' to retry.", e),
          Color::Red,
        );
        return;
      }
      QueryState::Ready(metrics) => metrics,
    };

    let [top, bottom] =
      Layout::vertical([Constraint::Percentage(55), Constraint::Percentage(45)]).areas(area);
    let [low, last] =
      Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(top);
    let [totals, summary] =
      Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(bottom);

    Self::render_low_stock(frame, low, &metrics);
    Self::render_last_transactions(frame, last, &metrics);
    Self::render_totals(frame, totals, &metrics);
    Self::render_summary(frame, summary, &metrics);
  }

  fn breadcrumb_label(&self) -> String {
    "Dashboard".to_string()
  }

  fn tick(&mut self) {
    self.query.poll();
  }

  fn status(&self) -> Option<String> {
    refresh_status(&self.query)
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("r", "refresh").with_priority(20),
      ShortcutInfo::new("p/i/t", "products/inventory/transactions").with_priority(30),
    ]
  }
}
