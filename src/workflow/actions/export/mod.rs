mod action;
pub mod format;
pub mod worker;

pub use action::ExportAction;
