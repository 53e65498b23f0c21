use chrono::Utc;

use crate::api::types::AuditAction;
use crate::audit::query::QueryError;

const HEADER: [&str; 9] = [
    "date",
    "user",
    "email",
    "action",
    "description",
    "module",
    "ip",
    "user_agent",
    "system",
];

/// Rows returned by the export endpoint plus the file name to offer.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditExport {
    pub rows: Vec<AuditAction>,
    pub suggested_filename: String,
}

impl AuditExport {
    pub fn new(rows: Vec<AuditAction>, filename: String) -> Self {
        let suggested_filename = if filename.trim().is_empty() {
            format!("audit-export-{}.csv", Utc::now().format("%Y-%m-%d"))
        } else {
            filename
        };
        Self {
            rows,
            suggested_filename,
        }
    }

    pub fn to_csv(&self) -> Result<String, QueryError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(HEADER)
            .map_err(|e| QueryError::Export(e.to_string()))?;
        for row in &self.rows {
            let created_at = row.created_at.to_rfc3339();
            writer
                .write_record([
                    created_at.as_str(),
                    row.user.name.as_str(),
                    row.user.email.as_str(),
                    row.action.as_tag(),
                    row.description.as_str(),
                    row.module.as_deref().unwrap_or(""),
                    row.ip_address.as_deref().unwrap_or(""),
                    row.user_agent.as_deref().unwrap_or(""),
                    if row.is_system_action { "yes" } else { "no" },
                ])
                .map_err(|e| QueryError::Export(e.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| QueryError::Export(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| QueryError::Export(e.to_string()))
    }

    /// Renders the rows and hands them to the browser as a file download.
    #[cfg(target_arch = "wasm32")]
    pub fn download(&self) -> Result<(), QueryError> {
        let csv = self.to_csv()?;
        crate::utils::download::trigger_csv_download(&self.suggested_filename, &csv)
            .map_err(QueryError::Export)
    }
}
