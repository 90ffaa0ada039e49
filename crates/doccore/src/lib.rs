pub mod document;
pub mod html;
pub mod import;
pub mod mark;
pub mod node;
pub mod sanitize;
pub mod transform;

pub use document::{Document, Located, TextPoint, TextSpan};
pub use html::{inner_html, to_html};
pub use import::from_html;
pub use mark::{Mark, MarkType, TextStyleAttrs};
pub use node::{Alignment, BlockAttrs, ListAttrs, ListKind, Node};
