use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use shared_database::ClinicRepository;
use shared_models::auth::Actor;
use shared_models::records::{LabReport, NewLabReport};
use shared_models::EntityId;

use crate::models::{
    check_date_order, required_text, Attachment, CreateLabReportRequest, FileUpload, RecordError,
    StoredFile, UpdateLabReportRequest,
};
use crate::services::access::{readable_record, writable_record};
use crate::services::storage::FileStorage;

pub struct LabReportService {
    repository: Arc<dyn ClinicRepository>,
    storage: Arc<FileStorage>,
}

impl LabReportService {
    pub fn new(repository: Arc<dyn ClinicRepository>, storage: Arc<FileStorage>) -> Self {
        Self {
            repository,
            storage,
        }
    }

    pub async fn list_for_record(
        &self,
        record_id: EntityId,
        actor: &Actor,
    ) -> Result<Vec<LabReport>, RecordError> {
        readable_record(self.repository.as_ref(), record_id, actor).await?;
        Ok(self.repository.list_lab_reports(record_id).await?)
    }

    pub async fn create_report(
        &self,
        record_id: EntityId,
        request: CreateLabReportRequest,
        actor: &Actor,
    ) -> Result<LabReport, RecordError> {
        let test_name = required_text(&request.test_name, "Test name")?;
        check_date_order(request.test_date, request.report_date, "Lab report")?;

        // Fail fast before writing anything to disk.
        writable_record(self.repository.as_ref(), record_id, actor).await?;

        let stored = self.store_upload(request.file.as_ref()).await?;
        let file = stored.as_ref();

        let result = self
            .repository
            .insert_lab_report(NewLabReport {
                medical_record_id: record_id,
                test_name,
                test_results: request.test_results,
                test_date: request.test_date,
                report_date: request.report_date,
                file_url: file.map(|f| f.path.clone()),
                file_name: file.map(|f| f.file_name.clone()),
                file_type: file.map(|f| f.file_type.clone()),
                file_size: file.map(|f| f.size),
                created_at: Utc::now(),
            })
            .await
            .map_err(RecordError::from);

        let report = self.discard_on_error(result, stored).await?;
        info!("Lab report {} added to record {}", report.id, record_id);
        Ok(report)
    }

    pub async fn get_report(&self, report_id: EntityId, actor: &Actor) -> Result<LabReport, RecordError> {
        let report = self.find_report(report_id).await?;
        readable_record(self.repository.as_ref(), report.medical_record_id, actor).await?;
        Ok(report)
    }

    pub async fn update_report(
        &self,
        report_id: EntityId,
        request: UpdateLabReportRequest,
        actor: &Actor,
    ) -> Result<LabReport, RecordError> {
        let test_name = request
            .test_name
            .as_deref()
            .map(|t| required_text(t, "Test name"))
            .transpose()?;

        let mut report = self.find_report(report_id).await?;
        writable_record(self.repository.as_ref(), report.medical_record_id, actor).await?;

        if let Some(name) = test_name {
            report.test_name = name;
        }
        if let Some(results) = request.test_results {
            report.test_results = Some(results);
        }
        if let Some(date) = request.test_date {
            report.test_date = date;
        }
        if let Some(date) = request.report_date {
            report.report_date = Some(date);
        }
        check_date_order(report.test_date, report.report_date, "Lab report")?;

        let stored = self.store_upload(request.file.as_ref()).await?;
        let replaced = match &stored {
            Some(file) => {
                let previous = report.file_url.replace(file.path.clone());
                report.file_name = Some(file.file_name.clone());
                report.file_type = Some(file.file_type.clone());
                report.file_size = Some(file.size);
                previous
            }
            None => None,
        };

        let result = match self.repository.update_lab_report(&report).await {
            Ok(Some(report)) => Ok(report),
            Ok(None) => Err(RecordError::LabReportNotFound),
            Err(err) => Err(err.into()),
        };

        let report = self.discard_on_error(result, stored).await?;
        if let Some(previous) = replaced {
            self.storage.delete_all(&[previous]).await;
        }
        Ok(report)
    }

    pub async fn delete_report(&self, report_id: EntityId, actor: &Actor) -> Result<(), RecordError> {
        let report = self.find_report(report_id).await?;
        writable_record(self.repository.as_ref(), report.medical_record_id, actor).await?;

        if !self.repository.delete_lab_report(report_id).await? {
            return Err(RecordError::LabReportNotFound);
        }

        if let Some(path) = report.file_url {
            self.storage.delete_all(&[path]).await;
        }
        info!("Lab report {} deleted by user {}", report_id, actor.id);
        Ok(())
    }

    pub async fn download(&self, report_id: EntityId, actor: &Actor) -> Result<Attachment, RecordError> {
        let report = self.get_report(report_id, actor).await?;
        let path = report.file_url.ok_or(RecordError::NoAttachment)?;

        let bytes = self.storage.read(&path).await?;
        Ok(Attachment {
            file_name: report.file_name.unwrap_or_else(|| "lab-report".to_string()),
            file_type: report
                .file_type
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            bytes,
        })
    }

    async fn find_report(&self, report_id: EntityId) -> Result<LabReport, RecordError> {
        self.repository
            .find_lab_report(report_id)
            .await?
            .ok_or(RecordError::LabReportNotFound)
    }

    async fn store_upload(&self, upload: Option<&FileUpload>) -> Result<Option<StoredFile>, RecordError> {
        match upload {
            Some(upload) => self.storage.store(upload).await.map(Some),
            None => Ok(None),
        }
    }

    /// A file written for a row that was never saved is removed again.
    async fn discard_on_error<T>(
        &self,
        result: Result<T, RecordError>,
        stored: Option<StoredFile>,
    ) -> Result<T, RecordError> {
        if result.is_err() {
            if let Some(stored) = stored {
                warn!("Removing upload {} after failed write", stored.path);
                self.storage.delete_all(&[stored.path]).await;
            }
        }
        result
    }
}
