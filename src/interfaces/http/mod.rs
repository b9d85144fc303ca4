use crate::application::{MarketAnalysisUseCase, RelevantNaicsUseCase};
use crate::domain::error::AppError;
use crate::domain::naics::{
    AggregateResult, AnalysisQuery, DataQualityReport, RelevantSectorSet,
};
use crate::infrastructure::csv::{ANNOTATED_FILE_NAME, SUMMARY_FILE_NAME};
use actix_cors::Cors;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::http::StatusCode;
use actix_web::{dev::Server, get, post, web, App, HttpResponse, HttpServer, Responder};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, Mutex};

const MAX_LOG_ENTRIES: usize = 100;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

pub struct HttpState {
    pub relevant_naics: Arc<RelevantNaicsUseCase>,
    pub analysis: Arc<MarketAnalysisUseCase>,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevantNaicsRequest {
    #[serde(default)]
    pub user_description: Option<String>,
    #[serde(default)]
    pub size_threshold: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevantNaicsResponse {
    pub relevant_two_digit_codes: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub run_id: u64,
    pub relevant_codes: RelevantSectorSet,
    pub results: Vec<AggregateResult>,
    pub total_addressable_firms: u64,
    pub warnings: DataQualityReport,
}

fn error_status(err: &AppError) -> StatusCode {
    match err {
        AppError::InputValidation(_) => StatusCode::BAD_REQUEST,
        AppError::Classification(_) => StatusCode::BAD_GATEWAY,
        AppError::Cancelled(_) | AppError::NoAnalysis => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &AppError) -> HttpResponse {
    HttpResponse::build(error_status(err)).json(json!({ "error": err.to_string() }))
}

fn csv_attachment(file_name: &str, body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(file_name.to_string())],
        })
        .body(body)
}

#[post("/relevant-naics")]
async fn relevant_naics(
    data: web::Data<HttpState>,
    req: web::Json<RelevantNaicsRequest>,
) -> impl Responder {
    let description = req.user_description.as_deref().unwrap_or_default();
    if description.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({ "error": "Missing userDescription" }));
    }

    match data
        .relevant_naics
        .execute(description, req.size_threshold)
        .await
    {
        Ok(codes) => {
            add_log(
                &data.logs,
                "INFO",
                "Classifier",
                &format!("Relevant codes: {}", codes.join(", ")),
            );
            HttpResponse::Ok().json(RelevantNaicsResponse {
                relevant_two_digit_codes: codes,
            })
        }
        Err(e) => {
            add_log(
                &data.logs,
                "ERROR",
                "Classifier",
                &format!("Classification failed: {}", e),
            );
            HttpResponse::InternalServerError().json(json!({ "error": e.to_string() }))
        }
    }
}

#[post("/analyze")]
async fn analyze(data: web::Data<HttpState>, req: web::Json<AnalysisQuery>) -> impl Responder {
    add_log(
        &data.logs,
        "INFO",
        "Analysis",
        &format!("Analyzing (size_threshold={})", req.size_threshold),
    );

    match data.analysis.run(req.into_inner()).await {
        Ok(outcome) => {
            let total_addressable_firms = outcome.total_addressable_firms();
            HttpResponse::Ok().json(AnalyzeResponse {
                run_id: outcome.run_id,
                relevant_codes: outcome.relevant_codes,
                results: outcome.results,
                total_addressable_firms,
                warnings: outcome.warnings,
            })
        }
        Err(e) => {
            add_log(
                &data.logs,
                "ERROR",
                "Analysis",
                &format!("Analysis failed: {}", e),
            );
            error_response(&e)
        }
    }
}

#[get("/export/summary")]
async fn export_summary(data: web::Data<HttpState>) -> impl Responder {
    match data.analysis.export_summary() {
        Ok(body) => csv_attachment(SUMMARY_FILE_NAME, body),
        Err(e) => error_response(&e),
    }
}

#[get("/export/annotated")]
async fn export_annotated(data: web::Data<HttpState>) -> impl Responder {
    match data.analysis.export_annotated() {
        Ok(body) => csv_attachment(ANNOTATED_FILE_NAME, body),
        Err(e) => error_response(&e),
    }
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> impl Responder {
    let logs = data
        .logs
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    HttpResponse::Ok().json(&*logs)
}

pub fn add_log_entry(
    logs: &Mutex<Vec<LogEntry>>,
    level: &str,
    source: &str,
    message: &str,
) -> LogEntry {
    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    match level {
        "ERROR" => tracing::error!(source, "{}", message),
        "WARN" => tracing::warn!(source, "{}", message),
        _ => tracing::info!(source, "{}", message),
    }

    let mut logs = logs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    logs.push(entry.clone());
    if logs.len() > MAX_LOG_ENTRIES {
        logs.remove(0);
    }
    entry
}

pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    add_log_entry(logs, level, source, message);
}

/// Routes mounted under `/api`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(relevant_naics)
            .service(analyze)
            .service(export_summary)
            .service(export_annotated)
            .service(health)
            .service(get_logs),
    );
}

pub fn start_server(state: HttpState, host: &str, port: u16) -> std::io::Result<Server> {
    let state = web::Data::new(state);

    let server = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((host, port))?
    .run();

    Ok(server)
}
