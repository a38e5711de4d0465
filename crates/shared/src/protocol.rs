use serde::{Deserialize, Serialize};

/// 2xx body of both mutation endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptedReply {
    pub message: String,
}

/// Non-2xx body of both mutation endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReply {
    pub detail: String,
}
