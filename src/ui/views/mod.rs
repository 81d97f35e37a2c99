mod dashboard;
mod inventory;
mod login;
mod product_detail;
mod products;
mod transactions;

pub use dashboard::DashboardView;
pub use inventory::InventoryView;
pub use login::LoginView;
pub use product_detail::ProductDetailView;
pub use products::ProductsView;
pub use transactions::TransactionsView;

use crate::query::{Query, QueryState};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Bordered block with a centered title, as used by every list
fn titled_block(title: String) -> Block<'static> {
  Block::default()
    .title(title)
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue))
}

/// Block title for a list backed by `query`, `shown` being the filtered row count
fn list_title<T>(label: &str, query: &Query<T>, shown: usize) -> String
where
  T: Send + Sync + 'static,
{
  match query.state() {
    QueryState::Loading => format!(" {} (loading...) ", label),
    QueryState::Error(_) => format!(" {} (error) ", label),
    QueryState::Ready(_) if query.is_fetching() => {
      format!(" {} ({}) (refreshing...) ", label, shown)
    }
    QueryState::Ready(_) if query.error().is_some() => {
      format!(" {} ({}) (stale: refresh failed) ", label, shown)
    }
    QueryState::Ready(_) => format!(" {} ({}) ", label, shown),
  }
}

/// Footer status while stale data is on screen
fn refresh_status<T>(query: &Query<T>) -> Option<String>
where
  T: Send + Sync + 'static,
{
  if query.data().is_some() && query.is_fetching() {
    Some("refreshing... ".to_string())
  } else {
    query.error().map(|e| format!("{} ", e))
  }
}

/// Centered message inside `block`, for loading, error and empty states
fn render_message(frame: &mut Frame, area: Rect, block: Block, text: String, color: Color) {
  let paragraph = Paragraph::new(text)
    .block(block)
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .style(Style::default().fg(color));
  frame.render_widget(paragraph, area);
}

/// Split off a one-line search bar when it is visible
fn split_search(area: Rect, visible: bool) -> (Option<Rect>, Rect) {
  if !visible {
    return (None, area);
  }
  let [bar, rest] = Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(area);
  (Some(bar), rest)
}

/// Move a table selection by `delta`, wrapping around
fn step_selection(state: &mut ratatui::widgets::TableState, len: usize, delta: isize) {
  if len == 0 {
    state.select(None);
    return;
  }
  let current = state.selected().unwrap_or(0) as isize;
  state.select(Some((current + delta).rem_euclid(len as isize) as usize));
}
