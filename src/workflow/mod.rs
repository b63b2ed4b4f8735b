pub mod actions;
pub mod consts;
pub mod edge;
pub mod jsonpath;
pub mod node;
pub mod template;
mod workflow;

pub use workflow::Workflow;
