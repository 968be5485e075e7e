use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};

use shared_utils::extractor::auth_middleware;
use shared_utils::AppState;

use crate::handlers;
use crate::models::MAX_UPLOAD_BODY;
use crate::services::lab_reports::LabReportService;
use crate::services::records::MedicalRecordService;
use crate::services::storage::FileStorage;

#[derive(Clone)]
pub struct RecordsState {
    pub app: AppState,
    pub storage: Arc<FileStorage>,
}

impl RecordsState {
    pub fn new(app: AppState, storage: Arc<FileStorage>) -> Self {
        Self { app, storage }
    }

    pub fn records(&self) -> MedicalRecordService {
        MedicalRecordService::new(
            self.app.repository.clone(),
            self.app.directory.clone(),
            self.storage.clone(),
        )
    }

    pub fn lab_reports(&self) -> LabReportService {
        LabReportService::new(self.app.repository.clone(), self.storage.clone())
    }
}

/// Mounted under `/api/medical-records`.
pub fn medical_record_routes(state: RecordsState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/",
            get(handlers::list_records).post(handlers::create_record),
        )
        .route(
            "/{record_id}",
            get(handlers::get_record)
                .put(handlers::update_record)
                .delete(handlers::delete_record),
        )
        .route(
            "/{record_id}/prescriptions",
            get(handlers::list_prescriptions).post(handlers::add_prescription),
        )
        .route(
            "/{record_id}/lab-reports",
            get(handlers::list_lab_reports)
                .post(handlers::create_lab_report)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY)),
        )
        .layer(middleware::from_fn_with_state(
            state.app.config.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}

/// Mounted under `/api/prescriptions`.
pub fn prescription_routes(state: RecordsState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/{prescription_id}",
            get(handlers::get_prescription)
                .put(handlers::update_prescription)
                .delete(handlers::delete_prescription),
        )
        .layer(middleware::from_fn_with_state(
            state.app.config.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}

/// Mounted under `/api/lab-reports`.
pub fn lab_report_routes(state: RecordsState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/{report_id}",
            get(handlers::get_lab_report)
                .put(handlers::update_lab_report)
                .delete(handlers::delete_lab_report)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY)),
        )
        .route("/{report_id}/file", get(handlers::download_lab_report))
        .layer(middleware::from_fn_with_state(
            state.app.config.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
