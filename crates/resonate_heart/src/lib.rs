//! HEART: the textual form of a resonate program.
//!
//! HEART is a line-oriented, fully resolved dump of the IR. Every name is
//! qualified, every block is explicit and every constant is spelled out, so a
//! program can be printed, stored and read back without any context.
//!
//! ```text
//! #HEART 1
//!
//! processor Gain [[main: true]]
//! {
//!     output out stream float32;
//!     function run () -> void
//!     {
//!         @block_0:
//!             write out 0.5f;
//!             advance;
//!             return;
//!     }
//! }
//! ```
//!
//! [`to_heart`] and [`parse`] are inverses on canonical text. The round trip
//! doubles as a self-check of the cloning machinery, see
//! [`check_round_trip`].

#![warn(missing_docs)]

pub mod errors;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod roundtrip;
pub mod token;

pub use lexer::lex;
pub use parser::{parse, parse_file};
pub use printer::to_heart;
pub use roundtrip::{check_round_trip, program_hash};
pub use token::{HeartToken, Token};

/// The format version written to and required in the `#HEART` header.
pub const HEART_VERSION: u32 = 1;
