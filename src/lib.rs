//! # vaultsync - Content Package Sync
//!
//! vaultsync keeps a local content checkout (a folder with `jcr_root` and
//! `META-INF/vault/filter.xml`) in step with a remote content repository.
//! Changes travel as content packages through the server's package manager:
//! a push stages the included files into a package and installs it, a pull
//! has the server build a package from the filter and applies it locally,
//! copying only changed files and removing files deleted on the server.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vaultsync::{Config, VaultSync};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sync = VaultSync::builder().config(Config::default()).build()?;
//!     let entries = sync.push("./ui.apps/jcr_root/apps/myproj".as_ref()).await?;
//!     println!("Pushed {} paths", entries.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Progress reporting
//!
//! ```rust,ignore
//! use vaultsync::callbacks::SinkBuilder;
//!
//! let sink = SinkBuilder::new()
//!     .on_progress(|phase| eprintln!("{}", phase))
//!     .on_failure(|e| eprintln!("failed: {}", e))
//!     .build();
//! let sync = VaultSync::builder().sink(sink).build()?;
//! ```

pub mod cache;
pub mod callbacks;
pub mod config;
pub mod error;
pub mod exclusion;
pub mod filter;
pub mod logging;
pub mod package;
pub mod packmgr;
pub mod paths;
pub mod reconcile;
pub mod status;
pub mod sync;
pub mod types;
pub mod validation;

// Re-export commonly used types and functions
pub use cache::{SyncLocks, TimestampCache};
pub use callbacks::{LoggingSink, NoStatusSink, SinkBuilder, StatusSink};
pub use config::{Config, MarkerFolderRemoval, Preferences};
pub use error::{SyncError, SyncResult};
pub use filter::{Filter, FilterRule, RuleKind};
pub use packmgr::{HttpPackageManager, PackageManager};
pub use status::{build_sync_status_list, DirectoryLister};
pub use sync::{VaultSync, VaultSyncBuilder};
pub use types::{SyncEntry, SyncPhase, SyncSummary, SyncVerdict};

// vim: ts=4
