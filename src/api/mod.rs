use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    CoinsuranceRates, DrugCost, PlanParameters, SimulationResult, project_with_rates,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DrugPayload {
    name: String,
    #[serde(alias = "cost", alias = "monthly_cost")]
    monthly_cost: f64,
}

/// JSON clients send a list; query strings carry the compact `NAME:COST,...` form.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DrugListPayload {
    List(Vec<DrugPayload>),
    Encoded(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    drugs: Option<DrugListPayload>,
    initial_coverage_limit: Option<f64>,
    catastrophic_coverage_limit: Option<f64>,
    #[serde(alias = "coverageGapDiscountPercent")]
    coverage_gap_discount: Option<f64>,
    initial_coinsurance: Option<f64>,
    catastrophic_coinsurance: Option<f64>,
}

#[derive(Parser, Debug)]
#[command(
    name = "coverage-gap",
    about = "Twelve-month Part D out-of-pocket projector (initial coverage, coverage gap, catastrophic coverage)"
)]
struct Cli {
    #[arg(
        long = "drug",
        value_name = "NAME:COST",
        value_parser = parse_drug_arg,
        required = true,
        help = "Drug and its full monthly retail cost; repeat for each drug"
    )]
    drugs: Vec<DrugCost>,
    #[arg(
        long,
        default_value_t = 4660.0,
        help = "Cumulative retail spend that ends initial coverage"
    )]
    initial_coverage_limit: f64,
    #[arg(
        long,
        default_value_t = 7400.0,
        help = "Cumulative retail spend that starts catastrophic coverage"
    )]
    catastrophic_coverage_limit: f64,
    #[arg(
        long,
        default_value_t = 75.0,
        help = "Discount applied in the coverage gap in percent"
    )]
    coverage_gap_discount: f64,
    #[arg(
        long,
        default_value_t = 25.0,
        help = "Patient coinsurance during initial coverage in percent"
    )]
    initial_coinsurance: f64,
    #[arg(
        long,
        default_value_t = 5.0,
        help = "Patient coinsurance during catastrophic coverage in percent"
    )]
    catastrophic_coinsurance: f64,
}

#[derive(Debug)]
struct ApiRequest {
    drugs: Vec<DrugCost>,
    plan: PlanParameters,
    rates: CoinsuranceRates,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    drugs: Vec<DrugCost>,
    initial_coverage_limit: f64,
    catastrophic_coverage_limit: f64,
    coverage_gap_discount_percent: f64,
    initial_coinsurance_rate: f64,
    catastrophic_coinsurance_rate: f64,
    #[serde(flatten)]
    result: SimulationResult,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn parse_drug_arg(raw: &str) -> Result<DrugCost, String> {
    let Some((name, cost)) = raw.rsplit_once(':') else {
        return Err(format!("drug `{raw}` must be written as NAME:COST"));
    };

    let name = name.trim();
    if name.is_empty() {
        return Err(format!("drug `{raw}` is missing a name"));
    }

    let monthly_cost = cost
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("drug `{name}` has an invalid monthly cost `{cost}`: {e}"))?;

    Ok(DrugCost::new(name, monthly_cost))
}

fn parse_drug_list(raw: &str) -> Result<Vec<DrugCost>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_drug_arg)
        .collect()
}

fn build_request(cli: Cli) -> Result<ApiRequest, String> {
    if cli.drugs.is_empty() {
        return Err("--drug must be given at least once".to_string());
    }

    for drug in &cli.drugs {
        if !drug.monthly_cost.is_finite() || drug.monthly_cost <= 0.0 {
            return Err(format!("--drug {}: monthly cost must be > 0", drug.name));
        }
    }

    for (name, limit) in [
        ("--initial-coverage-limit", cli.initial_coverage_limit),
        ("--catastrophic-coverage-limit", cli.catastrophic_coverage_limit),
    ] {
        if !limit.is_finite() || limit <= 0.0 {
            return Err(format!("{name} must be > 0"));
        }
    }

    if cli.catastrophic_coverage_limit <= cli.initial_coverage_limit {
        return Err(
            "--catastrophic-coverage-limit must be > --initial-coverage-limit".to_string(),
        );
    }

    for (name, percent) in [
        ("--coverage-gap-discount", cli.coverage_gap_discount),
        ("--initial-coinsurance", cli.initial_coinsurance),
        ("--catastrophic-coinsurance", cli.catastrophic_coinsurance),
    ] {
        if !(0.0..=100.0).contains(&percent) {
            return Err(format!("{name} must be between 0 and 100"));
        }
    }

    Ok(ApiRequest {
        drugs: cli.drugs,
        plan: PlanParameters {
            initial_coverage_limit: cli.initial_coverage_limit,
            catastrophic_coverage_limit: cli.catastrophic_coverage_limit,
            coverage_gap_discount_percent: cli.coverage_gap_discount,
        },
        rates: CoinsuranceRates {
            initial: cli.initial_coinsurance / 100.0,
            catastrophic: cli.catastrophic_coinsurance / 100.0,
        },
    })
}

fn run_projection(request: ApiRequest) -> Result<ProjectResponse, String> {
    let result = project_with_rates(&request.drugs, &request.plan, &request.rates)
        .map_err(|e| e.to_string())?;

    Ok(ProjectResponse {
        initial_coverage_limit: request.plan.initial_coverage_limit,
        catastrophic_coverage_limit: request.plan.catastrophic_coverage_limit,
        coverage_gap_discount_percent: request.plan.coverage_gap_discount_percent,
        initial_coinsurance_rate: request.rates.initial,
        catastrophic_coinsurance_rate: request.rates.catastrophic,
        drugs: request.drugs,
        result,
    })
}

/// One-shot projection from command-line arguments, rendered as pretty JSON.
pub fn run_cli<I, T>(args: I) -> Result<String, String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let rendered = e.to_string();
            let message = rendered.trim_end();
            return Err(message.strip_prefix("error: ").unwrap_or(message).to_string());
        }
    };
    let response = run_projection(build_request(cli)?)?;
    serde_json::to_string_pretty(&response).map_err(|e| format!("failed to render projection: {e}"))
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router();

    let listener = TcpListener::bind(addr).await?;
    log::info!("coverage gap API listening on http://{addr}");
    log::info!("Local access: http://127.0.0.1:{port}/api/project");

    axum::serve(listener, app).await
}

fn router() -> Router {
    Router::new()
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .fallback(not_found_handler)
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(
    payload: Result<Query<ProjectPayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => project_handler_impl(payload),
        Err(rejection) => malformed_payload_response(&rejection.body_text()),
    }
}

async fn project_post_handler(
    payload: Result<Json<ProjectPayload>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(payload)) => project_handler_impl(payload),
        Err(rejection) => malformed_payload_response(&rejection.body_text()),
    }
}

fn malformed_payload_response(detail: &str) -> Response {
    log::warn!("malformed projection request: {detail}");
    error_response(StatusCode::BAD_REQUEST, detail)
}

fn project_handler_impl(payload: ProjectPayload) -> Response {
    let response = api_request_from_payload(payload).and_then(run_projection);
    match response {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => {
            log::warn!("rejected projection request: {msg}");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: ProjectPayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();

    match payload.drugs {
        Some(DrugListPayload::List(drugs)) => {
            cli.drugs = drugs
                .into_iter()
                .map(|drug| DrugCost::new(drug.name.trim(), drug.monthly_cost))
                .collect();
            if let Some(drug) = cli.drugs.iter().find(|drug| drug.name.is_empty()) {
                return Err(format!(
                    "drugs: every drug needs a name (cost {})",
                    drug.monthly_cost
                ));
            }
        }
        Some(DrugListPayload::Encoded(raw)) => {
            cli.drugs = parse_drug_list(&raw)?;
        }
        None => {}
    }

    if let Some(v) = payload.initial_coverage_limit {
        cli.initial_coverage_limit = v;
    }
    if let Some(v) = payload.catastrophic_coverage_limit {
        cli.catastrophic_coverage_limit = v;
    }
    if let Some(v) = payload.coverage_gap_discount {
        cli.coverage_gap_discount = v;
    }
    if let Some(v) = payload.initial_coinsurance {
        cli.initial_coinsurance = v;
    }
    if let Some(v) = payload.catastrophic_coinsurance {
        cli.catastrophic_coinsurance = v;
    }

    build_request(cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        drugs: Vec::new(),
        initial_coverage_limit: 4_660.0,
        catastrophic_coverage_limit: 7_400.0,
        coverage_gap_discount: 75.0,
        initial_coinsurance: 25.0,
        catastrophic_coinsurance: 5.0,
    }
}
