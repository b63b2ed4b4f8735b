mod action;
pub mod models;

pub use action::HttpRequestAction;
