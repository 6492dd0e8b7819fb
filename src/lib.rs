//! CLI API kit - declarative argument binding and command dispatch
//!
//! `cliapi` turns a set of declared APIs into a command line application.
//! Every API is a type with commands; every command declares its arguments
//! as typed slots. At run time the raw tokens are tokenized, an API and a
//! command are selected, the slots are bound and the command is invoked.
//! Anything that goes wrong on the user's side ends in help output and an
//! exit code.
//!
//! - **`args`** - tokenizing raw tokens into keyless, flag and value tokens
//! - **`metadata`** - API, command and slot descriptors, the exported set
//! - **`binder`** - slot binding, value parsers and argument holders
//! - **`dispatch`** - API/command selection, invocation and escalation
//! - **`help`** - usage syntax, help pages and the built-in `help`,
//!   `version` and `about` APIs
//! - **`config`** - application settings
//!
//! # Features
//!
//! ```toml
//! [dependencies]
//! # Default: config, discovery and help
//! cliapi = "0.1"
//! # Bare engine with plain help output
//! cliapi = { version = "0.1", default-features = false }
//! ```
//!
//! - **`config`** - load [`CliConfig`](config::CliConfig) from TOML
//! - **`discovery`** - link-time API registration with `inventory`
//! - **`help`** - coloured help with table layout
//!
//! # Example
//!
//! ```
//! use cliapi::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Default)]
//! struct MathApi;
//!
//! impl CliApi for MathApi {}
//!
//! # tokio_test::block_on(async {
//! let (output, buffer) = Output::buffer();
//! let apis = ApiSet::new(vec![ApiDescriptor::builder::<MathApi>("math")
//!     .method(
//!         MethodDescriptor::new("sum")
//!             .arg(arg::custom_list::<i32>("numbers").keyless(0).required())
//!             .exit_code(0, "The sum was printed")
//!             .run(|mut call: Call| {
//!                 let numbers: Vec<i32> = call.take("numbers")?;
//!                 call.output().write_line(&numbers.iter().sum::<i32>().to_string())?;
//!                 Ok(())
//!             }),
//!     )
//!     .build()])?;
//!
//! let app = CliApp::new(apis)
//!     .with_parser::<i32, _>(|_, _, value| value.parse().map_err(|e| format!("{e}")))
//!     .with_output(output);
//!
//! assert_eq!(app.run(&["1", "2", "3"], &CancellationToken::new()).await?, 0);
//! assert_eq!(buffer.contents(), "6\n");
//! # Ok::<(), CliError>(())
//! # }).unwrap();
//! ```

#![warn(missing_docs)]

pub mod args;
pub mod binder;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod help;
pub mod metadata;

/// Typed slot constructors for API properties and command parameters
pub mod arg {
    pub use crate::metadata::slot::{custom, custom_list, flag, holder, json, json_list, text, text_list};
}

pub use error::{CliError, CliResult};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::arg;
    pub use crate::binder::ParserRegistry;
    pub use crate::config::CliConfig;
    pub use crate::dispatch::{ApiErrorHandler, Call, CliApiContext, CliApp, HelpProvider, Helper, Output};
    pub use crate::error::{CliError, CliResult};
    pub use crate::help::AppInfo;
    pub use crate::metadata::{
        ApiDescriptor, ApiSet, ArgumentHolder, CliApi, MethodDescriptor, Outcome, PropertySet, ValidationError,
    };
}
