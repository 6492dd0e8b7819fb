//! Command resolution, invocation and escalation.
//!
//! [`CliApp::run`] handles one chunk: tokenize, select the API, bind its
//! properties, select the method, bind the parameters, invoke, dispose.
//! Every recoverable failure is captured on the [`CliApiContext`] and
//! handed to the escalation chain, which always produces an exit code.
//! [`CliApp::run_multi`] runs dash-delimited chunks strictly in order.

mod app;
mod call;
mod chain;
mod context;
mod escalation;
mod resolve;

pub use app::CliApp;
pub use call::{Call, CallError, Output, OutputBuffer, Services};
pub use chain::split_chunks;
pub use context::CliApiContext;
pub use escalation::{ApiErrorHandler, HelpProvider, Helper};
