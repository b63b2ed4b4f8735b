mod context;
mod proxy;
mod sinks;

#[cfg(test)]
pub(crate) mod testing;

pub use context::{Collaborators, Context};
pub use proxy::{HttpProxy, ProxyRequest, ProxyResponse, ReqwestProxy};
pub use sinks::{ChannelSink, ConfigSink, EnvironmentSink, ExportSink, ExportedFile, FsExportSink, MemEnvironmentStore, NoopSink, ResultSink};

pub type RunId = String;
