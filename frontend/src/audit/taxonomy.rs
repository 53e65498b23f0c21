use serde::{Deserialize, Serialize};

use crate::activity::ActivityKind;

/// Closed set of action tags the audit store accepts. Tags the server adds
/// later deserialize as `Other` instead of failing the whole page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditActionType {
    Connexion,
    Deconnexion,
    Vente,
    EntreeStock,
    SortieStock,
    CorrectionStock,
    ScanProduit,
    CreationProduit,
    Paiement,
    OuvertureCaisse,
    FermetureCaisse,
    ConsultationModule,
    GenerationRapport,
    ExportDonnees,
    #[serde(other, rename = "AUTRE")]
    Other,
}

impl AuditActionType {
    pub const ALL: [AuditActionType; 14] = [
        AuditActionType::Connexion,
        AuditActionType::Deconnexion,
        AuditActionType::Vente,
        AuditActionType::EntreeStock,
        AuditActionType::SortieStock,
        AuditActionType::CorrectionStock,
        AuditActionType::ScanProduit,
        AuditActionType::CreationProduit,
        AuditActionType::Paiement,
        AuditActionType::OuvertureCaisse,
        AuditActionType::FermetureCaisse,
        AuditActionType::ConsultationModule,
        AuditActionType::GenerationRapport,
        AuditActionType::ExportDonnees,
    ];

    pub fn as_tag(&self) -> &'static str {
        match self {
            AuditActionType::Connexion => "CONNEXION",
            AuditActionType::Deconnexion => "DECONNEXION",
            AuditActionType::Vente => "VENTE",
            AuditActionType::EntreeStock => "ENTREE_STOCK",
            AuditActionType::SortieStock => "SORTIE_STOCK",
            AuditActionType::CorrectionStock => "CORRECTION_STOCK",
            AuditActionType::ScanProduit => "SCAN_PRODUIT",
            AuditActionType::CreationProduit => "CREATION_PRODUIT",
            AuditActionType::Paiement => "PAIEMENT",
            AuditActionType::OuvertureCaisse => "OUVERTURE_CAISSE",
            AuditActionType::FermetureCaisse => "FERMETURE_CAISSE",
            AuditActionType::ConsultationModule => "CONSULTATION_MODULE",
            AuditActionType::GenerationRapport => "GENERATION_RAPPORT",
            AuditActionType::ExportDonnees => "EXPORT_DONNEES",
            AuditActionType::Other => "AUTRE",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AuditActionType::Connexion => "Login",
            AuditActionType::Deconnexion => "Logout",
            AuditActionType::Vente => "Sale completed",
            AuditActionType::EntreeStock => "Stock in",
            AuditActionType::SortieStock => "Stock out",
            AuditActionType::CorrectionStock => "Stock correction",
            AuditActionType::ScanProduit => "Product scan",
            AuditActionType::CreationProduit => "Product created",
            AuditActionType::Paiement => "Payment",
            AuditActionType::OuvertureCaisse => "Cash register opened",
            AuditActionType::FermetureCaisse => "Cash register closed",
            AuditActionType::ConsultationModule => "Module viewed",
            AuditActionType::GenerationRapport => "Report generated",
            AuditActionType::ExportDonnees => "Data export",
            AuditActionType::Other => "Other",
        }
    }

    /// Module the action is filed under in the local activity feed.
    pub fn module(&self) -> &'static str {
        match self {
            AuditActionType::Connexion | AuditActionType::Deconnexion => "auth",
            AuditActionType::Vente => "sales",
            AuditActionType::EntreeStock
            | AuditActionType::SortieStock
            | AuditActionType::CorrectionStock => "inventory",
            AuditActionType::ScanProduit => "scanner",
            AuditActionType::CreationProduit => "products",
            AuditActionType::Paiement => "payments",
            AuditActionType::OuvertureCaisse | AuditActionType::FermetureCaisse => "cash_register",
            AuditActionType::ConsultationModule => "navigation",
            AuditActionType::GenerationRapport => "reports",
            AuditActionType::ExportDonnees => "exports",
            AuditActionType::Other => "system",
        }
    }

    pub fn activity_kind(&self) -> ActivityKind {
        match self {
            AuditActionType::Connexion => ActivityKind::Login,
            AuditActionType::Deconnexion => ActivityKind::Logout,
            AuditActionType::Vente => ActivityKind::Sale,
            AuditActionType::EntreeStock => ActivityKind::StockIn,
            AuditActionType::SortieStock => ActivityKind::StockOut,
            AuditActionType::CorrectionStock => ActivityKind::StockAdjustment,
            AuditActionType::ScanProduit => ActivityKind::Scan,
            AuditActionType::CreationProduit => ActivityKind::ProductCreate,
            AuditActionType::Paiement => ActivityKind::Payment,
            AuditActionType::OuvertureCaisse => ActivityKind::RegisterOpen,
            AuditActionType::FermetureCaisse => ActivityKind::RegisterClose,
            AuditActionType::ConsultationModule => ActivityKind::View,
            AuditActionType::GenerationRapport => ActivityKind::Report,
            AuditActionType::ExportDonnees => ActivityKind::Export,
            AuditActionType::Other => ActivityKind::System,
        }
    }
}

impl std::fmt::Display for AuditActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}
