use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::activity::{ActivityMirror, NewActivity};
use crate::api::types::AuditAction;
use crate::audit::query::{AuditQueryService, QueryError};
use crate::audit::taxonomy::AuditActionType;
use crate::utils::runtime::spawn_local;

/// What happened to one audit submission. The emitter always resolves to one
/// of these; a failed write never reaches the caller as an error.
#[derive(Debug, Clone, PartialEq)]
pub enum AuditOutcome {
    Delivered(AuditAction),
    Failed {
        action: AuditActionType,
        reason: String,
    },
}

impl AuditOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, AuditOutcome::Delivered(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditDiagnostic {
    pub action: AuditActionType,
    pub description: String,
    pub error: QueryError,
    pub at: DateTime<Utc>,
}

/// Where failed audit writes are reported.
pub trait DiagnosticSink {
    fn record(&self, diagnostic: &AuditDiagnostic);
}

pub struct LogDiagnostics;

impl DiagnosticSink for LogDiagnostics {
    fn record(&self, diagnostic: &AuditDiagnostic) {
        log::warn!(
            "audit write dropped: action={} description={:?} error={}",
            diagnostic.action,
            diagnostic.description,
            diagnostic.error
        );
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEvent {
    pub user_id: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    pub product_id: String,
    pub quantity: f64,
    pub unit_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleEvent {
    pub amount: f64,
    pub products: Vec<SaleLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StockChangeKind {
    Increase,
    Decrease,
    Correction,
}

impl StockChangeKind {
    pub fn action(&self) -> AuditActionType {
        match self {
            StockChangeKind::Increase => AuditActionType::EntreeStock,
            StockChangeKind::Decrease => AuditActionType::SortieStock,
            StockChangeKind::Correction => AuditActionType::CorrectionStock,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockChange {
    pub product_id: String,
    pub product_name: String,
    pub quantity: f64,
    pub change: StockChangeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanEvent {
    pub barcode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCreated {
    pub product_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEvent {
    pub amount: f64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterEvent {
    pub register_id: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleView {
    pub module: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEvent {
    pub report_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataExportEvent {
    pub dataset: String,
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
}

/// Structured input plus the submission time, as stored in audit metadata.
fn metadata_for<T: Serialize>(input: &T) -> Value {
    let timestamp = Utc::now().to_rfc3339();
    match serde_json::to_value(input) {
        Ok(Value::Object(mut map)) => {
            map.insert("timestamp".into(), Value::String(timestamp));
            Value::Object(map)
        }
        Ok(other) => json!({ "input": other, "timestamp": timestamp }),
        Err(_) => json!({ "timestamp": timestamp }),
    }
}

fn amount(value: f64) -> String {
    format!("{:.2}", value)
}

/// Fire-and-forget audit logger.
///
/// Each submission lands in the activity mirror right away and is then
/// written through [`AuditQueryService::write`]. Write failures go to the
/// diagnostic sink and are otherwise dropped.
#[derive(Clone)]
pub struct AuditEventEmitter {
    audit: AuditQueryService,
    mirror: ActivityMirror,
    diagnostics: Rc<dyn DiagnosticSink>,
    actor: Rc<RefCell<Option<String>>>,
}

impl AuditEventEmitter {
    pub fn new(audit: AuditQueryService, mirror: ActivityMirror) -> Self {
        Self::with_diagnostics(audit, mirror, Rc::new(LogDiagnostics))
    }

    pub fn with_diagnostics(
        audit: AuditQueryService,
        mirror: ActivityMirror,
        diagnostics: Rc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            audit,
            mirror,
            diagnostics,
            actor: Rc::new(RefCell::new(None)),
        }
    }

    pub fn mirror(&self) -> &ActivityMirror {
        &self.mirror
    }

    /// User id attached to local activity entries.
    pub fn set_actor(&self, user_id: Option<String>) {
        *self.actor.borrow_mut() = user_id;
    }

    pub async fn submit(
        &self,
        action: AuditActionType,
        description: impl Into<String>,
        metadata: Value,
    ) -> AuditOutcome {
        let description = description.into();
        let local = self.mirror.record(NewActivity {
            user_id: self.actor.borrow().clone(),
            metadata: (!metadata.is_null()).then(|| metadata.clone()),
            ..NewActivity::new(action.activity_kind(), action.module(), description.clone())
        });

        let metadata = (!metadata.is_null()).then_some(metadata);
        match self.audit.write(action, &description, metadata).await {
            Ok(created) => {
                log::debug!("audit action {} stored as {}", action, created.id);
                self.mirror.acknowledge(created.id.clone());
                AuditOutcome::Delivered(created)
            }
            Err(error) => {
                let reason = error.to_string();
                self.diagnostics.record(&AuditDiagnostic {
                    action,
                    description,
                    error,
                    at: Utc::now(),
                });
                log::debug!("local activity {} kept without server copy", local.id);
                AuditOutcome::Failed { action, reason }
            }
        }
    }

    /// Runs `call` on a detached task so the caller never waits on the write.
    /// The task is not tied to any view and keeps running after navigation.
    pub fn fire_and_forget<F, Fut>(&self, call: F)
    where
        F: FnOnce(AuditEventEmitter) -> Fut,
        Fut: Future<Output = AuditOutcome> + 'static,
    {
        let pending = call(self.clone());
        spawn_local(async move {
            let _ = pending.await;
        });
    }

    pub async fn log_login(&self, session: &SessionEvent) -> AuditOutcome {
        self.set_actor(Some(session.user_id.clone()));
        let description = format!(
            "{} - User: {}",
            AuditActionType::Connexion.label(),
            session.username
        );
        self.submit(AuditActionType::Connexion, description, metadata_for(session))
            .await
    }

    pub async fn log_logout(&self, session: &SessionEvent) -> AuditOutcome {
        let description = format!(
            "{} - User: {}",
            AuditActionType::Deconnexion.label(),
            session.username
        );
        let outcome = self
            .submit(AuditActionType::Deconnexion, description, metadata_for(session))
            .await;
        self.set_actor(None);
        outcome
    }

    pub async fn log_sale(&self, sale: &SaleEvent) -> AuditOutcome {
        let description = format!(
            "{} - Amount: {}",
            AuditActionType::Vente.label(),
            amount(sale.amount)
        );
        self.submit(AuditActionType::Vente, description, metadata_for(sale))
            .await
    }

    pub async fn log_stock_change(&self, change: &StockChange) -> AuditOutcome {
        let action = change.change.action();
        let description = format!(
            "{} - Product: {} - Quantity: {}",
            action.label(),
            change.product_name,
            change.quantity
        );
        self.submit(action, description, metadata_for(change)).await
    }

    pub async fn log_scan(&self, scan: &ScanEvent) -> AuditOutcome {
        let target = scan.product_name.as_deref().unwrap_or(&scan.barcode);
        let description = format!("{} - {}", AuditActionType::ScanProduit.label(), target);
        self.submit(AuditActionType::ScanProduit, description, metadata_for(scan))
            .await
    }

    pub async fn log_product_created(&self, product: &ProductCreated) -> AuditOutcome {
        let description = format!(
            "{} - {}",
            AuditActionType::CreationProduit.label(),
            product.name
        );
        self.submit(
            AuditActionType::CreationProduit,
            description,
            metadata_for(product),
        )
        .await
    }

    pub async fn log_payment(&self, payment: &PaymentEvent) -> AuditOutcome {
        let description = format!(
            "{} - Amount: {} - Method: {}",
            AuditActionType::Paiement.label(),
            amount(payment.amount),
            payment.method
        );
        self.submit(AuditActionType::Paiement, description, metadata_for(payment))
            .await
    }

    pub async fn log_register_opened(&self, register: &RegisterEvent) -> AuditOutcome {
        let description = format!(
            "{} - Opening float: {}",
            AuditActionType::OuvertureCaisse.label(),
            amount(register.amount)
        );
        self.submit(
            AuditActionType::OuvertureCaisse,
            description,
            metadata_for(register),
        )
        .await
    }

    pub async fn log_register_closed(&self, register: &RegisterEvent) -> AuditOutcome {
        let description = format!(
            "{} - Closing amount: {}",
            AuditActionType::FermetureCaisse.label(),
            amount(register.amount)
        );
        self.submit(
            AuditActionType::FermetureCaisse,
            description,
            metadata_for(register),
        )
        .await
    }

    pub async fn log_module_view(&self, view: &ModuleView) -> AuditOutcome {
        let description = format!(
            "{} - {}",
            AuditActionType::ConsultationModule.label(),
            view.module
        );
        self.submit(
            AuditActionType::ConsultationModule,
            description,
            metadata_for(view),
        )
        .await
    }

    pub async fn log_report(&self, report: &ReportEvent) -> AuditOutcome {
        let description = format!(
            "{} - {}",
            AuditActionType::GenerationRapport.label(),
            report.report_type
        );
        self.submit(
            AuditActionType::GenerationRapport,
            description,
            metadata_for(report),
        )
        .await
    }

    pub async fn log_data_export(&self, export: &DataExportEvent) -> AuditOutcome {
        let description = format!(
            "{} - {} ({})",
            AuditActionType::ExportDonnees.label(),
            export.dataset,
            export.format
        );
        self.submit(
            AuditActionType::ExportDonnees,
            description,
            metadata_for(export),
        )
        .await
    }
}
