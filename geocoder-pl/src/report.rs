//! Rapport d'import
//!
//! Collecte les compteurs d'une commande (fichiers, bâtiments, points
//! adresse, appels au géocodeur) et les erreurs non fatales.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use sektor::{ContainmentStats, MatchStats};
use serde::Serialize;

/// Statut global de l'import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImportStatus {
    Success,
    /// Import réussi avec des erreurs non fatales
    PartialSuccess,
    Failed,
}

/// Niveau de sévérité des erreurs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorLevel {
    /// Fichier abandonné
    Fatal,
    /// Enregistrement ignoré
    Error,
}

/// Erreur d'import avec contexte
#[derive(Debug, Clone, Serialize)]
pub struct ImportError {
    pub level: ErrorLevel,
    /// Fichier d'entrée concerné
    pub input: Option<String>,
    /// Enregistrement concerné (numéro de ligne ou identifiant)
    pub record: Option<String>,
    pub message: String,
}

impl ImportError {
    pub fn record(input: &str, record: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: ErrorLevel::Error,
            input: Some(input.to_string()),
            record: Some(record.into()),
            message: message.into(),
        }
    }
}

/// Compteurs d'une voïvodie
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProvinceStats {
    pub imported: usize,
    pub dropped: usize,
    pub inside: usize,
    pub resolved: usize,
    pub invalid: usize,
    pub unknown_region: usize,
    pub assigned: usize,
    pub unassigned: usize,
}

/// Rapport complet d'une commande
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub command: String,
    pub duration_secs: f64,
    pub status: ImportStatus,

    pub inputs_processed: usize,
    /// Fichiers déjà importés (checksum identique)
    pub inputs_skipped: usize,
    pub inputs_failed: usize,

    pub buildings_imported: usize,
    pub buildings_skipped: usize,

    pub points_imported: usize,
    /// Enregistrements sans voïvodie, powiat ou gmina
    pub points_dropped: usize,
    pub points_invalid: usize,
    /// Points relocalisés par le géocodeur
    pub points_resolved: usize,
    pub points_assigned: usize,
    pub geocoder_calls: usize,
    pub geocoder_failures: usize,

    pub by_province: BTreeMap<String, ProvinceStats>,
    pub errors: Vec<ImportError>,
}

impl ImportReport {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            duration_secs: 0.0,
            status: ImportStatus::Success,
            inputs_processed: 0,
            inputs_skipped: 0,
            inputs_failed: 0,
            buildings_imported: 0,
            buildings_skipped: 0,
            points_imported: 0,
            points_dropped: 0,
            points_invalid: 0,
            points_resolved: 0,
            points_assigned: 0,
            geocoder_calls: 0,
            geocoder_failures: 0,
            by_province: BTreeMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn record_input_success(&mut self) {
        self.inputs_processed += 1;
    }

    pub fn record_input_skipped(&mut self) {
        self.inputs_skipped += 1;
    }

    pub fn record_input_failure(&mut self, input: &str, message: &str) {
        self.inputs_processed += 1;
        self.inputs_failed += 1;
        self.errors.push(ImportError {
            level: ErrorLevel::Fatal,
            input: Some(input.to_string()),
            record: None,
            message: message.to_string(),
        });
    }

    /// Enregistre un enregistrement ignoré
    pub fn record_error(&mut self, error: ImportError) {
        self.errors.push(error);
    }

    pub fn record_buildings(&mut self, imported: usize, skipped: usize) {
        self.buildings_imported += imported;
        self.buildings_skipped += skipped;
    }

    pub fn record_points(&mut self, province: &str, imported: usize, dropped: usize) {
        self.points_imported += imported;
        self.points_dropped += dropped;
        let stats = self.by_province.entry(province.to_string()).or_default();
        stats.imported += imported;
        stats.dropped += dropped;
    }

    pub fn record_containment(&mut self, province: &str, containment: &ContainmentStats) {
        self.points_invalid += containment.invalid;
        self.points_resolved += containment.resolved;
        self.geocoder_calls += containment.geocoder_calls;
        self.geocoder_failures += containment.geocoder_failures;
        let stats = self.by_province.entry(province.to_string()).or_default();
        stats.inside += containment.inside;
        stats.resolved += containment.resolved;
        stats.invalid += containment.invalid;
        stats.unknown_region += containment.unknown_region;
    }

    pub fn record_matching(&mut self, province: &str, matching: &MatchStats) {
        self.points_assigned += matching.assigned;
        let stats = self.by_province.entry(province.to_string()).or_default();
        stats.assigned += matching.assigned;
        stats.unassigned += matching.unassigned;
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self) {
        let has_fatal = self.errors.iter().any(|e| e.level == ErrorLevel::Fatal);
        let has_errors = !self.errors.is_empty();
        let has_success = self.inputs_processed > self.inputs_failed || self.inputs_skipped > 0;

        self.status = if has_errors && has_success {
            ImportStatus::PartialSuccess
        } else if has_fatal || has_errors {
            ImportStatus::Failed
        } else {
            ImportStatus::Success
        };
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("IMPORT REPORT - {}", self.command);
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);

        println!("\n--- SUMMARY ---");
        println!(
            "Inputs: {} processed, {} skipped, {} failed",
            self.inputs_processed, self.inputs_skipped, self.inputs_failed
        );
        if self.buildings_imported > 0 || self.buildings_skipped > 0 {
            println!(
                "Buildings: {} imported, {} skipped",
                self.buildings_imported, self.buildings_skipped
            );
        }
        if self.points_imported > 0 || self.points_dropped > 0 {
            println!(
                "Points: {} imported, {} dropped, {} outside gmina, {} relocated, {} assigned",
                self.points_imported,
                self.points_dropped,
                self.points_invalid,
                self.points_resolved,
                self.points_assigned
            );
            println!(
                "Geocoder: {} calls, {} failures",
                self.geocoder_calls, self.geocoder_failures
            );
        }

        if !self.by_province.is_empty() {
            println!("\n--- BY PROVINCE ---");
            for (province, s) in &self.by_province {
                println!(
                    "  {}: {} imported, {} invalid, {} relocated, {} assigned, {} unassigned",
                    province, s.imported, s.invalid, s.resolved, s.assigned, s.unassigned
                );
            }
        }

        if !self.errors.is_empty() {
            println!("\n--- ERRORS ({}) ---", self.errors.len());
            for e in self.errors.iter().take(20) {
                let location = match (&e.input, &e.record) {
                    (Some(i), Some(r)) => format!("[{}:{}]", i, r),
                    (Some(i), None) => format!("[{}]", i),
                    (None, Some(r)) => format!("[{}]", r),
                    _ => String::new(),
                };
                println!("  {:?} {} {}", e.level, location, e.message);
            }
            if self.errors.len() > 20 {
                println!("  ... and {} more", self.errors.len() - 20);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        Ok(())
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {} buildings, {} points ({} assigned), {} errors",
            self.command,
            self.buildings_imported,
            self.points_imported,
            self.points_assigned,
            self.errors.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_report() {
        let report = ImportReport::new("import-points");
        assert_eq!(report.status, ImportStatus::Success);
        assert_eq!(report.inputs_processed, 0);
        assert!(report.by_province.is_empty());
    }

    #[test]
    fn test_record_province_counters() {
        let mut report = ImportReport::new("import-points");
        report.record_points("OPOLSKIE", 10, 2);
        report.record_containment(
            "OPOLSKIE",
            &ContainmentStats {
                inside: 7,
                resolved: 1,
                invalid: 2,
                geocoder_calls: 3,
                geocoder_failures: 1,
                unknown_region: 0,
            },
        );
        report.record_matching(
            "OPOLSKIE",
            &MatchStats {
                points: 10,
                assigned: 6,
                unassigned: 2,
                skipped_invalid: 2,
                ..MatchStats::default()
            },
        );

        assert_eq!(report.points_imported, 10);
        assert_eq!(report.points_dropped, 2);
        assert_eq!(report.points_resolved, 1);
        assert_eq!(report.geocoder_calls, 3);
        assert_eq!(report.points_assigned, 6);
        let s = &report.by_province["OPOLSKIE"];
        assert_eq!((s.inside, s.invalid, s.assigned, s.unassigned), (7, 2, 6, 2));
    }

    #[test]
    fn test_finalize_success() {
        let mut report = ImportReport::new("import-buildings");
        report.record_input_success();
        report.finalize();
        assert_eq!(report.status, ImportStatus::Success);
    }

    #[test]
    fn test_finalize_partial_success() {
        let mut report = ImportReport::new("import-buildings");
        report.record_input_success();
        report.record_error(ImportError::record("BDOT_02.ndjson", "line 4", "degenerate outline"));
        report.finalize();
        assert_eq!(report.status, ImportStatus::PartialSuccess);
    }

    #[test]
    fn test_finalize_failed() {
        let mut report = ImportReport::new("import-points");
        report.record_input_failure("PRG_opolskie.ndjson", "connection reset");
        report.finalize();
        assert_eq!(report.status, ImportStatus::Failed);
        assert_eq!(report.inputs_failed, 1);
    }

    #[test]
    fn test_save_and_summary() {
        let mut report = ImportReport::new("import-points");
        report.record_points("MAZOWIECKIE", 100, 0);
        let summary = report.summary();
        assert!(summary.contains("100 points"));

        let path = std::env::temp_dir().join(format!("geocoder-pl-report-{}.json", std::process::id()));
        report.save_to_file(&path).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["points_imported"], 100);
        assert_eq!(json["by_province"]["MAZOWIECKIE"]["imported"], 100);
        std::fs::remove_file(&path).ok();
    }
}
