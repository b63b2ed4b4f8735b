mod edge;
mod environment;
mod flow;
mod node;

pub use edge::EdgeModel;
pub use environment::{Environment, EnvironmentVariable};
pub use flow::FlowModel;
pub use node::NodeModel;
