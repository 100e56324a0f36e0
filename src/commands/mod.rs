pub mod annotate;
pub mod checkin;
pub mod checkout;
pub mod diff;
pub mod get;
pub mod serve;
pub mod status;
pub mod undo_checkout;
pub mod update;
pub mod version;

pub use annotate::*;
pub use checkin::*;
pub use checkout::*;
pub use diff::*;
pub use get::*;
pub use serve::*;
pub use status::*;
pub use undo_checkout::*;
pub use update::*;
pub use version::*;
