mod protocol;
mod routes;
mod server;
mod state;

pub use protocol::{
    ErrorPayload, GraphCreateRequest, GraphCreateResponse, GraphRunRequest, GraphRunResult,
    GraphStateResponse, RunAcceptedResponse, ToolDescription,
};
pub use server::{build_router, GatewayServer};
pub use state::AppState;
