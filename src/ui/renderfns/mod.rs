pub mod footer;
pub mod header;
pub mod utils;

pub use footer::draw_footer;
pub use header::draw_header;
pub use utils::{
  centered_rect, format_timestamp, overlay_rect, quantity_color, transaction_type_color, truncate,
};
