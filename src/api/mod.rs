pub mod export;
pub mod share;

use axum::{
    Router,
    extract::{Json, Path, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::core::{
    Assumptions, InputError, Preset, SimulationReport, SimulatorInputs, Spouse, StochasticOptions,
    ValidationReport, check_ranges, default_inputs, project, run_simulation, validate,
};
use export::{ExportKind, export_file_name, to_csv, to_json};

pub const MAX_API_ITERATIONS: u32 = 20_000;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
enum ApiPreset {
    #[serde(alias = "Conservative", alias = "CONSERVATIVE")]
    Conservative,
    #[serde(alias = "Base", alias = "BASE")]
    Base,
    #[serde(alias = "Aggressive", alias = "AGGRESSIVE")]
    Aggressive,
}

impl From<ApiPreset> for Preset {
    fn from(value: ApiPreset) -> Self {
        match value {
            ApiPreset::Conservative => Preset::Conservative,
            ApiPreset::Base => Preset::Base,
            ApiPreset::Aggressive => Preset::Aggressive,
        }
    }
}

impl From<Preset> for ApiPreset {
    fn from(value: Preset) -> Self {
        match value {
            Preset::Conservative => ApiPreset::Conservative,
            Preset::Base => ApiPreset::Base,
            Preset::Aggressive => ApiPreset::Aggressive,
        }
    }
}

// Missing fields keep the default household's value. `preset` is applied
// before the explicit overrides.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct InputPayload {
    preset: Option<ApiPreset>,
    stochastic: Option<bool>,
    iterations: Option<u32>,
    seed: Option<u64>,
    base_url: Option<String>,

    applicant_age: Option<u32>,
    gender: Option<crate::core::Gender>,
    spouse: Option<Spouse>,
    children_ages: Option<Vec<u32>>,
    retire_age: Option<u32>,
    death_age_primary: Option<u32>,
    death_age_spouse: Option<u32>,

    current_gross_income: Option<f64>,
    salary_growth_rate: Option<f64>,
    savings_now: Option<f64>,
    annual_private_saving: Option<f64>,
    expected_return: Option<f64>,
    volatility: Option<f64>,
    inflation_rate: Option<f64>,

    basic_pension_full_amount: Option<f64>,
    basic_pension_coverage: Option<f64>,
    earnings_related_factor: Option<f64>,
    avg_standard_remuneration: Option<f64>,
    survivor_benefit_rate: Option<f64>,
    survivor_benefit_min_years: Option<u32>,

    private_annuity_start_age: Option<u32>,
    private_annuity_annual: Option<f64>,
    whole_life_death_benefit: Option<f64>,
    term_life_death_benefit: Option<f64>,

    current_annual_spending: Option<f64>,
    retire_spending_ratio: Option<f64>,
    child_cost_per_year: Option<f64>,
    mortgage_annual: Option<f64>,
    mortgage_until_age: Option<u32>,
}

#[derive(Debug)]
struct ApiRequest {
    inputs: SimulatorInputs,
    stochastic: Option<StochasticOptions>,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PresetResponse {
    name: ApiPreset,
    description: &'static str,
    expected_return: f64,
    inflation_rate: f64,
    salary_growth_rate: f64,
    volatility: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DefaultsResponse {
    inputs: SimulatorInputs,
    assumptions: Assumptions,
    presets: Vec<PresetResponse>,
}

#[derive(Debug, Serialize)]
struct ShareResponse {
    token: String,
    url: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request body: {0}")]
    Payload(String),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("{0}")]
    BadRequest(String),
    #[error("nothing to load")]
    ShareNotFound,
    #[error("not found")]
    NotFound,
    #[error("simulation worker failed: {0}")]
    Worker(String),
    #[error("could not serialize response: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Payload(_) | ApiError::Input(_) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::ShareNotFound | ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Worker(_) | ApiError::Serialization(_) => {
                error!(error = %self, "request failed");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
            }
        };
        warn!(error = %self, status = status.as_u16(), "request rejected");
        error_response(status, &self.to_string())
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn router() -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/defaults", get(defaults_handler))
        .route("/api/project", post(project_handler))
        .route("/api/validate", post(validate_handler))
        .route("/api/export/csv", post(export_csv_handler))
        .route("/api/export/json", post(export_json_handler))
        .route("/api/share", post(share_handler))
        .route("/api/share/:token", get(share_lookup_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "lifeplan HTTP API listening");
    info!("local access: http://127.0.0.1:{port}/api/health");

    axum::serve(listener, router()).await
}

async fn not_found_handler() -> Response {
    ApiError::NotFound.into_response()
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn defaults_handler() -> Response {
    json_response(StatusCode::OK, defaults_response())
}

async fn project_handler(payload: Result<Json<InputPayload>, JsonRejection>) -> ApiResult<Response> {
    let request = api_request_from_extracted(payload)?;
    log_warnings(&validate(&request.inputs));

    let report = tokio::task::spawn_blocking(move || build_project_response(&request))
        .await
        .map_err(|e| ApiError::Worker(e.to_string()))?;
    Ok(json_response(StatusCode::OK, report))
}

async fn validate_handler(payload: Result<Json<InputPayload>, JsonRejection>) -> ApiResult<Response> {
    let request = api_request_from_extracted(payload)?;
    let report = validate(&request.inputs);
    log_warnings(&report);
    Ok(json_response(StatusCode::OK, report))
}

async fn export_csv_handler(
    payload: Result<Json<InputPayload>, JsonRejection>,
) -> ApiResult<Response> {
    let request = api_request_from_extracted(payload)?;
    let body = to_csv(&project(&request.inputs));
    Ok(attachment_response(ExportKind::Csv, body))
}

async fn export_json_handler(
    payload: Result<Json<InputPayload>, JsonRejection>,
) -> ApiResult<Response> {
    let request = api_request_from_extracted(payload)?;
    let body = to_json(&project(&request.inputs), &request.inputs)?;
    Ok(attachment_response(ExportKind::Json, body))
}

async fn share_handler(payload: Result<Json<InputPayload>, JsonRejection>) -> ApiResult<Response> {
    let request = api_request_from_extracted(payload)?;
    Ok(json_response(
        StatusCode::OK,
        share_response(&request.inputs, &request.base_url),
    ))
}

async fn share_lookup_handler(Path(token): Path<String>) -> ApiResult<Response> {
    let inputs = decode_share_token(&token)?;
    Ok(json_response(StatusCode::OK, inputs))
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn attachment_response(kind: ExportKind, body: String) -> Response {
    let file_name = export_file_name(kind, Utc::now().date_naive());
    let disposition = format!("attachment; filename=\"{file_name}\"");
    let mut response = with_cache_control((
        [(header::CONTENT_TYPE, HeaderValue::from_static(kind.content_type()))],
        body,
    ));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

fn log_warnings(report: &ValidationReport) {
    for warning in &report.warnings {
        warn!(field = warning.field, "{}", warning.message);
    }
}

fn api_request_from_extracted(
    payload: Result<Json<InputPayload>, JsonRejection>,
) -> ApiResult<ApiRequest> {
    let Json(payload) = payload.map_err(|rejection| ApiError::Payload(rejection.body_text()))?;
    api_request_from_payload(payload)
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> ApiResult<ApiRequest> {
    let payload = serde_json::from_str::<InputPayload>(json)
        .map_err(|e| ApiError::Payload(format!("invalid JSON payload: {e}")))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: InputPayload) -> ApiResult<ApiRequest> {
    let mut inputs = default_inputs();
    if let Some(preset) = payload.preset {
        Preset::from(preset).apply(&mut inputs);
    }

    if let Some(v) = payload.applicant_age {
        inputs.applicant_age = v;
    }
    if let Some(v) = payload.gender {
        inputs.gender = v;
    }
    if let Some(v) = payload.spouse {
        inputs.spouse = v;
    }
    if let Some(v) = payload.children_ages {
        inputs.children_ages = v;
    }
    if let Some(v) = payload.retire_age {
        inputs.retire_age = v;
    }
    if payload.death_age_primary.is_some() {
        inputs.death_age_primary = payload.death_age_primary;
    }
    if payload.death_age_spouse.is_some() {
        inputs.death_age_spouse = payload.death_age_spouse;
    }

    if let Some(v) = payload.current_gross_income {
        inputs.current_gross_income = v;
    }
    if let Some(v) = payload.salary_growth_rate {
        inputs.salary_growth_rate = v;
    }
    if let Some(v) = payload.savings_now {
        inputs.savings_now = v;
    }
    if let Some(v) = payload.annual_private_saving {
        inputs.annual_private_saving = v;
    }
    if let Some(v) = payload.expected_return {
        inputs.expected_return = v;
    }
    if let Some(v) = payload.volatility {
        inputs.volatility = v;
    }
    if let Some(v) = payload.inflation_rate {
        inputs.inflation_rate = v;
    }

    if let Some(v) = payload.basic_pension_full_amount {
        inputs.basic_pension_full_amount = v;
    }
    if let Some(v) = payload.basic_pension_coverage {
        inputs.basic_pension_coverage = v;
    }
    if let Some(v) = payload.earnings_related_factor {
        inputs.earnings_related_factor = v;
    }
    if let Some(v) = payload.avg_standard_remuneration {
        inputs.avg_standard_remuneration = v;
    }
    if let Some(v) = payload.survivor_benefit_rate {
        inputs.survivor_benefit_rate = v;
    }
    if let Some(v) = payload.survivor_benefit_min_years {
        inputs.survivor_benefit_min_years = v;
    }

    if let Some(v) = payload.private_annuity_start_age {
        inputs.private_annuity_start_age = v;
    }
    if let Some(v) = payload.private_annuity_annual {
        inputs.private_annuity_annual = v;
    }
    if let Some(v) = payload.whole_life_death_benefit {
        inputs.whole_life_death_benefit = v;
    }
    if let Some(v) = payload.term_life_death_benefit {
        inputs.term_life_death_benefit = v;
    }

    if let Some(v) = payload.current_annual_spending {
        inputs.current_annual_spending = v;
    }
    if let Some(v) = payload.retire_spending_ratio {
        inputs.retire_spending_ratio = v;
    }
    if let Some(v) = payload.child_cost_per_year {
        inputs.child_cost_per_year = v;
    }
    if let Some(v) = payload.mortgage_annual {
        inputs.mortgage_annual = v;
    }
    if payload.mortgage_until_age.is_some() {
        inputs.mortgage_until_age = payload.mortgage_until_age;
    }

    check_ranges(&inputs)?;

    let mut options = StochasticOptions::from_assumptions(&Assumptions::default());
    if let Some(v) = payload.iterations {
        if v > MAX_API_ITERATIONS {
            return Err(ApiError::BadRequest(format!(
                "iterations must be <= {MAX_API_ITERATIONS}"
            )));
        }
        options.iterations = v;
    }
    if let Some(v) = payload.seed {
        options.seed = v;
    }
    let stochastic = payload.stochastic.unwrap_or(false).then_some(options);

    Ok(ApiRequest {
        inputs,
        stochastic,
        base_url: payload.base_url.unwrap_or_else(|| "/".to_string()),
    })
}

fn build_project_response(request: &ApiRequest) -> SimulationReport {
    run_simulation(&request.inputs, request.stochastic)
}

fn defaults_response() -> DefaultsResponse {
    DefaultsResponse {
        inputs: default_inputs(),
        assumptions: Assumptions::default(),
        presets: Preset::ALL
            .into_iter()
            .map(|preset| {
                let values = preset.values();
                PresetResponse {
                    name: preset.into(),
                    description: preset.description(),
                    expected_return: values.expected_return,
                    inflation_rate: values.inflation_rate,
                    salary_growth_rate: values.salary_growth_rate,
                    volatility: values.volatility,
                }
            })
            .collect(),
    }
}

fn share_response(inputs: &SimulatorInputs, base_url: &str) -> ShareResponse {
    ShareResponse {
        token: share::encode(inputs),
        url: share::share_url(base_url, inputs),
    }
}

fn decode_share_token(token: &str) -> ApiResult<SimulatorInputs> {
    share::decode(token).ok_or(ApiError::ShareNotFound)
}
