//! Transaction atomique pour l'import d'une voïvodie
//!
//! Points adresse, blocs de phrases, jetons uniques et checksum du fichier
//! sont écrits dans une seule transaction : un échec ne laisse rien de partiel.

use anyhow::{Context, Result};
use deadpool_postgres::{Object, Transaction};
use tracing::{error, info};

/// Statut d'un import de voïvodie
#[derive(Debug, Clone, PartialEq)]
pub enum ImportStatus {
    Committed,
    RolledBack,
}

/// Bilan de la transaction d'une voïvodie
#[derive(Debug)]
pub struct ProvinceOutcome {
    pub province: String,
    pub points_written: u64,
    pub sectors_written: usize,
    pub errors: Vec<String>,
    pub status: ImportStatus,
}

/// Transaction d'import d'une voïvodie
pub struct ProvinceImport<'a> {
    transaction: Transaction<'a>,
    province: String,
    points_written: u64,
    sectors_written: usize,
    errors: Vec<String>,
}

impl<'a> ProvinceImport<'a> {
    /// Démarre la transaction ; `client` doit vivre jusqu'au commit
    pub async fn begin(client: &'a mut Object, province: &str) -> Result<Self> {
        let transaction = client
            .transaction()
            .await
            .context("Failed to begin transaction")?;

        info!(province = %province, "Starting province import transaction");

        Ok(Self {
            transaction,
            province: province.to_string(),
            points_written: 0,
            sectors_written: 0,
            errors: Vec::new(),
        })
    }

    pub fn transaction(&self) -> &Transaction<'a> {
        &self.transaction
    }

    pub fn province(&self) -> &str {
        &self.province
    }

    pub fn record_points(&mut self, count: u64) {
        self.points_written += count;
    }

    pub fn record_sectors(&mut self, count: usize) {
        self.sectors_written += count;
    }

    pub fn points_written(&self) -> u64 {
        self.points_written
    }

    /// Enregistre une erreur non fatale
    pub fn record_error(&mut self, error: String) {
        self.errors.push(error);
    }

    pub async fn commit(self) -> Result<ProvinceOutcome> {
        self.transaction
            .commit()
            .await
            .context("Failed to commit transaction")?;

        info!(
            province = %self.province,
            points = self.points_written,
            sectors = self.sectors_written,
            errors = self.errors.len(),
            "Province import committed"
        );

        Ok(ProvinceOutcome {
            province: self.province,
            points_written: self.points_written,
            sectors_written: self.sectors_written,
            errors: self.errors,
            status: ImportStatus::Committed,
        })
    }

    /// Annule la transaction (également annulée si elle est droppée)
    pub async fn rollback(self, reason: &str) -> ProvinceOutcome {
        error!(
            province = %self.province,
            reason = %reason,
            points_attempted = self.points_written,
            "Rolling back province import"
        );

        if let Err(e) = self.transaction.rollback().await {
            error!(error = %e, "Explicit rollback failed (will rollback on drop anyway)");
        }

        let mut errors = self.errors;
        errors.push(reason.to_string());
        ProvinceOutcome {
            province: self.province,
            points_written: 0,
            sectors_written: 0,
            errors,
            status: ImportStatus::RolledBack,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_status_equality() {
        assert_eq!(ImportStatus::Committed, ImportStatus::Committed);
        assert_ne!(ImportStatus::Committed, ImportStatus::RolledBack);
    }

    #[test]
    fn test_outcome_debug() {
        let outcome = ProvinceOutcome {
            province: "OPOLSKIE".to_string(),
            points_written: 100,
            sectors_written: 4,
            errors: vec![],
            status: ImportStatus::Committed,
        };
        let debug_str = format!("{:?}", outcome);
        assert!(debug_str.contains("OPOLSKIE"));
        assert!(debug_str.contains("100"));
    }
}
