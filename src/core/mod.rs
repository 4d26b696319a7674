//! 核心编排层：分类、审批门、分派表、线程状态与主控流程

pub mod builder;
pub mod classification;
pub mod classifier;
pub mod error;
pub mod gate;
pub mod orchestrator;
pub mod router;
pub mod state;
pub mod thread_lock;

pub use builder::{build_supervisor, create_llm_from_config, SupervisorBuilder};
pub use classification::{
    ApprovalRequest, ApprovalResponse, Classification, ClassificationType, SuspensionPayload,
    UserResponse,
};
pub use classifier::{Classifier, WEB_SEARCH_LOGIC};
pub use error::{Degradation, OrchestratorError, StoreError};
pub use gate::OVERRIDE_LOGIC;
pub use orchestrator::{Supervisor, DEGRADED_REPLY};
pub use router::{route, route_tag};
pub use state::{
    ApprovalRecord, ConversationState, ThreadPhase, TurnFlags, TurnOutcome, TurnReport,
};
pub use thread_lock::ThreadLocks;
