//! Console surface: counter selection prompt and sample rendering.

mod render;
mod selector;

pub use render::{render_window, render_windows};
pub use selector::{CounterSelector, InvalidInput, ParseError, SelectError, Selection, Step};
