//! # TCG Printer
//!
//! Watches a folder for trading-card images, normalizes each one to the
//! card print geometry (750×1050 at 300 DPI by default), and prints it,
//! holding files in a retry queue while the printer is busy.
//!
//! # Architecture: One File at a Time
//!
//! ```text
//! watch folder ──▶ Deduplicator ──▶ Transformer ──▶ printer ready? ──yes──▶ submit ──▶ poll until done
//!                                                        │
//!                                                        no
//!                                                        ▼
//!                                                   RetryQueue ──(every retry_interval, FIFO)──▶ again
//! ```
//!
//! Processing is serialized: transform, submit, and job polling run on the
//! control loop for one file before the next event is taken. The printer
//! handles one job at a time anyway, and a single loop keeps the retry
//! queue free of locking. Every blocking step is bounded: job polling by
//! `job_timeout_secs`, each printing-system command by `command_timeout_secs`.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `config.toml` loading, stock-default merge, validation, `gen-config` text |
//! | [`naming`] | `print_<name>` artifacts, job titles, extension checks |
//! | [`imaging`] | Fill-and-crop transform, print enhancement, DPI-tagged encoding |
//! | [`watch`] | notify binding, event deduplication, backlog scan |
//! | [`printer`] | Printing-system trait, CUPS binding, job lifecycle |
//! | [`queue`] | Bounded FIFO retry queue with per-file attempt cap |
//! | [`errors`] | Rolling session error record |
//! | [`pipeline`] | Orchestrator: backlog, events, retry sweep, shutdown |
//! | [`testcard`] | Synthetic card for transformer and printer checks |
//! | [`output`] | CLI output formatting |
//! | [`logging`] | Console and file log setup |
//!
//! # Design Decisions
//!
//! ## Fill, Never Letterbox
//!
//! Cards print edge to edge, so a white border from fit-inside scaling would
//! show on the stock. Sources are scaled to cover the canvas and then
//! center-cropped. Sources already within 0.1 of the card aspect ratio are
//! stretched instead, since the distortion is smaller than what a crop
//! would cut away.
//!
//! ## Absence Means Done
//!
//! The printing system forgets jobs once they finish, so a job missing from
//! the active listing is reported as completed. A job removed by someone
//! else looks the same; see [`printer::job`].
//!
//! ## Command-Line Printing Tools
//!
//! The CUPS binding drives `lp`, `lpstat`, `cancel`, and `lpadmin` rather
//! than linking libcups. Nothing to build against, and the same commands
//! work on Linux and macOS.

pub mod config;
pub mod errors;
pub mod imaging;
pub mod logging;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod printer;
pub mod queue;
pub mod testcard;
pub mod watch;
