use shared::{ActivityItem, DiagnosisResult, ScanResult};
use uuid::Uuid;

use crate::db::dynamodb_repository::DynamoDbRepository;
use crate::storage::s3_service::S3Service;

/// Number of entries shown on the dashboard.
pub const RECENT_ACTIVITY_LIMIT: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Failed to save scan result")]
    SaveScan,
    #[error("Failed to save diagnosis result")]
    SaveDiagnosis,
    #[error("Failed to load scan history")]
    LoadScans,
    #[error("Failed to load diagnosis history")]
    LoadDiagnoses,
    #[error("Failed to load recent activity")]
    LoadActivity,
}

#[derive(Clone)]
pub struct HistoryService {
    db_repo: DynamoDbRepository,
    s3_service: S3Service,
}

impl HistoryService {
    pub fn new(db_repo: DynamoDbRepository, s3_service: S3Service) -> Self {
        Self {
            db_repo,
            s3_service,
        }
    }

    /// Returns the stored object key, or an empty string when the image
    /// could not be decoded or uploaded.
    pub async fn store_scan_image(
        &self,
        user_id: Uuid,
        image_base64: &str,
        mime_type: Option<&str>,
    ) -> String {
        match self
            .s3_service
            .store_scan_image(user_id, image_base64, mime_type)
            .await
        {
            Ok(key) => key,
            Err(e) => {
                log::warn!("Failed to store scan image for {}: {}", user_id, e);
                String::new()
            }
        }
    }

    pub async fn record_scan(&self, scan: &ScanResult) -> Result<(), HistoryError> {
        self.db_repo.create_scan_result(scan).await.map_err(|e| {
            log::error!("Error saving scan result {}: {:?}", scan.id, e);
            HistoryError::SaveScan
        })?;
        log::info!("Saved scan result {} for user {}", scan.id, scan.user_id);
        Ok(())
    }

    pub async fn record_diagnosis(&self, diagnosis: &DiagnosisResult) -> Result<(), HistoryError> {
        self.db_repo
            .create_diagnosis_result(diagnosis)
            .await
            .map_err(|e| {
                log::error!("Error saving diagnosis result {}: {:?}", diagnosis.id, e);
                HistoryError::SaveDiagnosis
            })?;
        log::info!(
            "Saved diagnosis result {} for user {}",
            diagnosis.id,
            diagnosis.user_id
        );
        Ok(())
    }

    pub async fn recent_scans(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ScanResult>, HistoryError> {
        self.db_repo
            .get_user_scan_results(user_id, limit)
            .await
            .map_err(|e| {
                log::error!("Error loading scans for {}: {:?}", user_id, e);
                HistoryError::LoadScans
            })
    }

    pub async fn recent_diagnoses(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<DiagnosisResult>, HistoryError> {
        self.db_repo
            .get_user_diagnosis_results(user_id, limit)
            .await
            .map_err(|e| {
                log::error!("Error loading diagnoses for {}: {:?}", user_id, e);
                HistoryError::LoadDiagnoses
            })
    }

    pub async fn recent_activity(&self, user_id: Uuid) -> Result<Vec<ActivityItem>, HistoryError> {
        let (scans, diagnoses) = futures::join!(
            self.db_repo
                .get_user_scan_results(user_id, RECENT_ACTIVITY_LIMIT),
            self.db_repo
                .get_user_diagnosis_results(user_id, RECENT_ACTIVITY_LIMIT)
        );

        match (scans, diagnoses) {
            (Ok(scans), Ok(diagnoses)) => {
                Ok(merge_recent(scans, diagnoses, RECENT_ACTIVITY_LIMIT))
            }
            (Err(e), _) | (_, Err(e)) => {
                log::error!("Error loading recent activity for {}: {:?}", user_id, e);
                Err(HistoryError::LoadActivity)
            }
        }
    }
}

/// Interleaves both histories newest first and keeps the first `limit`.
pub fn merge_recent(
    scans: Vec<ScanResult>,
    diagnoses: Vec<DiagnosisResult>,
    limit: usize,
) -> Vec<ActivityItem> {
    let mut items: Vec<ActivityItem> = scans
        .into_iter()
        .map(ActivityItem::Scan)
        .chain(diagnoses.into_iter().map(ActivityItem::Diagnosis))
        .collect();
    items.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    items.truncate(limit);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use shared::{DiagnosisRequest, DiagnosisResponse, MedicineInfo};

    fn scan(minutes_ago: i64) -> ScanResult {
        let mut scan = ScanResult::new(
            Uuid::nil(),
            String::new(),
            MedicineInfo {
                medicine_name: format!("scan-{}", minutes_ago),
                description: String::new(),
                uses: String::new(),
                side_effects: String::new(),
                dosage: String::new(),
            },
        );
        scan.created_at = Utc::now() - Duration::minutes(minutes_ago);
        scan
    }

    fn diagnosis(minutes_ago: i64) -> DiagnosisResult {
        let mut diagnosis = DiagnosisResult::new(
            Uuid::nil(),
            DiagnosisRequest {
                symptoms: format!("diagnosis-{}", minutes_ago),
                diet: String::new(),
                location: String::new(),
            },
            DiagnosisResponse {
                possible_diseases: Vec::new(),
                recommendations: String::new(),
            },
        );
        diagnosis.created_at = Utc::now() - Duration::minutes(minutes_ago);
        diagnosis
    }

    #[test]
    fn activity_is_newest_first_and_limited() {
        let scans = vec![scan(1), scan(5), scan(9)];
        let diagnoses = vec![diagnosis(2), diagnosis(3), diagnosis(7)];

        let merged = merge_recent(scans, diagnoses, RECENT_ACTIVITY_LIMIT);

        assert_eq!(merged.len(), 5);
        let order: Vec<ActivityKind> = merged.iter().map(kind).collect();
        assert_eq!(
            order,
            vec![
                ActivityKind::Scan,
                ActivityKind::Diagnosis,
                ActivityKind::Diagnosis,
                ActivityKind::Scan,
                ActivityKind::Diagnosis,
            ]
        );
        assert!(
            merged
                .windows(2)
                .all(|pair| pair[0].created_at() >= pair[1].created_at())
        );
    }

    #[test]
    fn activity_with_no_history_is_empty() {
        assert!(merge_recent(Vec::new(), Vec::new(), RECENT_ACTIVITY_LIMIT).is_empty());
    }

    #[derive(Debug, PartialEq)]
    enum ActivityKind {
        Scan,
        Diagnosis,
    }

    fn kind(item: &ActivityItem) -> ActivityKind {
        match item {
            ActivityItem::Scan(_) => ActivityKind::Scan,
            ActivityItem::Diagnosis(_) => ActivityKind::Diagnosis,
        }
    }
}
