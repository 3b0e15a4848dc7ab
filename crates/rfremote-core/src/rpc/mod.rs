pub mod encoding;
mod models;

pub use models::{
    ExecutionRequest, ExecutionResponse, OptionValue, PackagedSuite, RpcFault, RunOptions,
};
