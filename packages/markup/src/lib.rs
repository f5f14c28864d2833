//! # Sketchbook Markup
//!
//! Persisted form of a section: an XML-like markup string.
//!
//! ```text
//! <doc>
//!   <paragraph><font_size size="18pt">Hello World</font_size></paragraph>
//!   <diagram id="d1" kind="flowchart" source="A-&gt;B"/>
//! </doc>
//! ```
//!
//! Tag names are node and mark type ids. Marks wrap the text runs they cover.
//! Elements the schema does not know are kept verbatim as `unknown` leaves.

pub mod error;
pub mod parser;
pub mod serializer;
pub mod tokenizer;

pub use error::{format_error, ParseError, ParseResult};
pub use parser::{deserialize, parse_markup, Element, Markup, Parser};
pub use serializer::{serialize, Serializer};
pub use tokenizer::{tokenize, Token};
