// Library root
// -----------
// The binary (`main.rs`) wires these modules together; everything with
// behaviour lives here so it can be tested without a terminal or server.
//
// Module responsibilities:
// - `api`: wire types and the blocking HTTP client for the hypermedia API.
// - `session`: the config file holding the session token and root link.
// - `ui`: terminal prompts and the action selector.
// - `auth`: login and signup flows.
// - `navigate`: one navigation step, from fetch to dispatch.
// - `config`: command-line arguments and their defaults.
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod navigate;
pub mod session;
pub mod ui;

#[cfg(test)]
mod testing;
