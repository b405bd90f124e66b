//! # ticket-printer
//!
//! Plain-text ticket printing library - low-level printing capabilities only.
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - Fixed-width text layout (rule lines, centering, padding, wrapping)
//! - Codepage encoding of the text payload
//! - Network printing (raw TCP, port 9100)
//!
//! Business logic (WHAT to print) stays in application code:
//! - Kitchen / courier receipt rendering → order-hub
//!
//! ## Example
//!
//! ```ignore
//! use ticket_printer::{Codepage, NetworkPrinter, TicketBuilder};
//!
//! let mut builder = TicketBuilder::new(42);
//! builder.center("KITCHEN");
//! builder.sep_double();
//! builder.line("2x X-Burger");
//! let text = builder.build();
//!
//! let printer = NetworkPrinter::parse("192.168.1.100")?.with_codepage(Codepage::Latin1);
//! printer.print_text(&text).await?;
//! ```

mod builder;
mod encoding;
mod error;
mod printer;

// Re-exports
pub use builder::{TicketBuilder, is_rule_line};
pub use encoding::{Codepage, pad_text, text_width, truncate_text, wrap_text};
pub use error::{PrintError, PrintResult};
pub use printer::{DEFAULT_PORT, NetworkPrinter};
