//! Referral endpoints.

use axum::Json;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use campus_ledger_types::{ReferralInfo, StudentId};

use super::dto::{
    ApiResponse, ApplyReferralRequest, ApplyReferralResponse, ReferralRecordResponse,
    RegisterStudentRequest, StudentResponse,
};
use super::extract::{StudentIdentity, ValidJson};
use super::{AppState, blocking};
use crate::error::ApiError;

/// `POST /students`
pub async fn register_student(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterStudentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<StudentResponse>>), ApiError> {
    let ledger = state.referrals;
    let student = blocking(move || ledger.register_student(&req.name)).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::data(student.into()))))
}

/// `GET /referral`
pub async fn get_referral_info(
    State(state): State<AppState>,
    StudentIdentity(student_id): StudentIdentity,
) -> Result<Json<ApiResponse<ReferralInfo>>, ApiError> {
    let ledger = state.referrals;
    let info = blocking(move || ledger.get_referral_info(student_id)).await?;
    Ok(Json(ApiResponse::data(info)))
}

/// `POST /referral/apply`
pub async fn apply_referral_code(
    State(state): State<AppState>,
    StudentIdentity(student_id): StudentIdentity,
    ValidJson(req): ValidJson<ApplyReferralRequest>,
) -> Result<Json<ApiResponse<ApplyReferralResponse>>, ApiError> {
    let ledger = state.referrals;
    let student = blocking(move || ledger.apply_referral_code(student_id, &req.code)).await?;
    Ok(Json(ApiResponse::with_message(
        "Referral code applied successfully",
        ApplyReferralResponse { is_premium_unlocked: student.is_premium_unlocked },
    )))
}

/// `POST /referral/credit/{referee_id}`
pub async fn credit_referral(
    State(state): State<AppState>,
    referee: Result<Path<u64>, PathRejection>,
) -> Result<Json<ApiResponse<ReferralRecordResponse>>, ApiError> {
    let Path(referee) = referee?;
    let referee = StudentId::new(referee);
    let ledger = state.referrals;
    let record = blocking(move || ledger.credit_referral(referee)).await?;
    Ok(Json(ApiResponse::data(record.into())))
}
