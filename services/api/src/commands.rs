use crate::cli::DataArgs;
use crate::infra::build_service;
use assessment_engine::assembly::AssemblyBlueprint;
use assessment_engine::config::EngineConfig;
use assessment_engine::error::AppError;
use assessment_engine::router::{assembly_response, ScoreRequest};
use assessment_engine::{AssessmentService, SessionReport};
use clap::Args;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// JSON file holding `session` and `answers`, shaped like the HTTP score request
    pub(crate) request: PathBuf,
    #[command(flatten)]
    pub(crate) data: DataArgs,
}

#[derive(Args, Debug)]
pub(crate) struct AssembleArgs {
    /// JSON blueprint tagged with `kind` (`standard` or `job_fit`)
    pub(crate) blueprint: PathBuf,
    #[command(flatten)]
    pub(crate) data: DataArgs,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let service = build_service(&EngineConfig::from_env()?, &args.data)?;
    let request: ScoreRequest = read_json(&args.request)?;
    let report = score_request(&service, request)?;
    print_json(&report)
}

pub(crate) fn run_assemble(args: AssembleArgs) -> Result<(), AppError> {
    let service = build_service(&EngineConfig::from_env()?, &args.data)?;
    let blueprint: AssemblyBlueprint = read_json(&args.blueprint)?;
    let response = assembly_response(&service, &blueprint)?;
    print_json(&response)
}

fn score_request(
    service: &AssessmentService,
    request: ScoreRequest,
) -> Result<SessionReport, AppError> {
    let answers = service.prepare_answers(request.answers)?;
    Ok(service.complete_session(&request.session, &answers))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|err| AppError::Io(std::io::Error::from(err)))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::Io(std::io::Error::from(err)))?;
    println!("{rendered}");
    Ok(())
}
