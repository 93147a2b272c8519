// Library root
// -----------
// The binary (`main.rs`) only parses flags and hands over to `ui`; all of
// the work lives in these modules.
//
// Module responsibilities:
// - `registry` / `dispatch`: commands keyed by selector and the rules for
//   feeding one command's output into the next.
// - `merge`: joins activities' GPS tracks into one `MergedTrace`.
// - `elevation`: fills in altitude through a cached remote lookup.
// - `api`, `auth`: tracker HTTP client and token file.
// - `commands`, `render`, `view`, `console`, `ui`: the menu and what it shows.
pub mod api;
pub mod auth;
pub mod commands;
pub mod config;
pub mod console;
pub mod dispatch;
pub mod elevation;
pub mod merge;
pub mod model;
pub mod registry;
pub mod render;
pub mod ui;
pub mod view;
