//! Declarative command-line argument matching.
//!
//! `argmatch` resolves a command line against a set of declared *handlers* —
//! alternative command forms, each describing its flags, value options,
//! typed options, repeatable prefix options, positional parameters and
//! optional catch-alls. The engine tokenizes `argv`, finds the first handler
//! the input fully satisfies (in descending priority), binds and converts
//! values, and invokes that handler's callback. When nothing matches, the
//! error from the attempt that got furthest through the input is reported,
//! which keeps mutually exclusive command forms cheap to express: declare
//! one handler per form and let resolution pick.
//!
//! # Features
//!
//! - **Declarative registration**: handlers are plain [`HandlerSpec`] /
//!   [`CommonSpec`] data, validated eagerly at build time
//! - **Mutually exclusive forms**: priority-ordered candidates with
//!   furthest-progress error selection
//! - **Common handlers**: shared option sets applied across the primaries
//!   they accept
//! - **getopt dialect**: short clusters (`-abc`), attached values (`-ofile`),
//!   long options with `=` or separate values, optional GNU ordering
//! - **Usage rendering**: column-aligned, width-wrapped documentation of
//!   one or many alternatives, plus an implicit `--help` handler
//!
//! # Example
//!
//! ```rust
//! use argmatch::{ArgOrder, HandlerSpec, Matcher, Outcome, Param};
//!
//! let matcher = Matcher::builder()
//!     .handler(
//!         HandlerSpec::new("serve")
//!             .doc("serve the bundle directory over HTTP")
//!             .param(Param::option("host").default("127.0.0.1"))
//!             .param(Param::int_option("port").alias("p").default(8080)),
//!         |args| {
//!             let host = args.get_str("host").unwrap_or_default().to_string();
//!             let port = args.get_int("port").unwrap_or_default();
//!             Ok((host, port))
//!         },
//!     )
//!     .build()?;
//!
//! match matcher.process(["-p", "9000"], ArgOrder::Free)? {
//!     Outcome::Done((host, port)) => {
//!         assert_eq!(host, "127.0.0.1");
//!         assert_eq!(port, 9000);
//!     }
//!     Outcome::Help(text) => println!("{text}"),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod attempt;
mod bindings;
mod definition;
mod error;
mod matcher;
mod mode;
mod schema;
mod token;
mod usage;

pub use bindings::Bindings;
pub use error::{DefinitionError, ProcessError, UsageError};
pub use matcher::{ArgOrder, Matcher, MatcherBuilder, Outcome};
pub use schema::{CommonSpec, HandlerSpec, Param, Value};
pub use usage::{Usage, UsageOptions};
