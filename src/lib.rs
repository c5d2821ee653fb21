// Compliance evidence backend
// Module re-exports

pub mod classifier;
pub mod commands;
pub mod db;
pub mod engine;
pub mod models;
pub mod security;
pub mod server;
pub mod storage;
pub mod utils;

// Re-export commonly used types
pub use models::{
    AuditEvent, CheckStatus, Company, ComplianceCheck, Control, ControlStatus, Evidence,
    EvidenceStatus, Role, User,
};

pub use classifier::{Classifier, ClassifierConfig, ControlKind, OfflineClassifier, VisionClient};
pub use db::{get_db_path, init_db, Database};
pub use engine::{ComplianceEngine, EngineError};
pub use server::{router, AppState};
pub use storage::MediaStore;
