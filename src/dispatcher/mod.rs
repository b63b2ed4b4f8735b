mod dispatcher;

pub use dispatcher::{execute_node, trigger_next_nodes};
