pub mod emitter;
pub mod export;
pub mod query;
pub mod taxonomy;

pub use emitter::{AuditDiagnostic, AuditEventEmitter, AuditOutcome, DiagnosticSink, LogDiagnostics};
pub use export::AuditExport;
pub use query::{AuditFilters, AuditPage, AuditQueryService, QueryError};
pub use taxonomy::AuditActionType;
