//! Object storage file browser.
//!
//! Lists a bucket through a [`services::StorageClient`], filters and folds
//! the listing into a tree, and turns user gestures into storage calls and
//! events. Hosts call [`state::BrowserSession::render`] once per UI cycle and
//! draw the returned [`workspace::view::Frame`].

pub mod logging;
pub mod services;
pub mod state;
pub mod workspace;
