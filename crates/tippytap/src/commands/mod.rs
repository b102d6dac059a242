//! CLI command implementations.

pub(crate) mod diff;
pub(crate) mod fmt;
pub(crate) mod render;
pub(crate) mod toc;
pub(crate) mod watch;

pub(crate) use diff::DiffArgs;
pub(crate) use fmt::FmtArgs;
pub(crate) use render::RenderArgs;
pub(crate) use toc::TocArgs;
pub(crate) use watch::WatchArgs;
