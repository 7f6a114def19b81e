use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse},
};
use thiserror::Error;

use crate::{
    auth::{AuthService, AuthServiceImpl},
    config::Config,
    player::{PlayerService, PlayerServiceImpl},
    registration::{RegistrationService, RegistrationServiceImpl},
    report::{ReportService, ReportServiceImpl},
    session::SessionKeys,
    settings::{SettingsService, SettingsServiceImpl},
    store::BankStore,
    transfer::{TransferService, TransferServiceImpl},
    views,
};

pub type ArcAuthService = Arc<Box<dyn AuthService + Send + Sync + 'static>>;
pub type ArcPlayerService = Arc<Box<dyn PlayerService + Send + Sync + 'static>>;
pub type ArcRegistrationService = Arc<Box<dyn RegistrationService + Send + Sync + 'static>>;
pub type ArcTransferService = Arc<Box<dyn TransferService + Send + Sync + 'static>>;
pub type ArcReportService = Arc<Box<dyn ReportService + Send + Sync + 'static>>;
pub type ArcSettingsService = Arc<Box<dyn SettingsService + Send + Sync + 'static>>;

#[derive(Clone)]
pub struct AppState {
    pub auth_service: ArcAuthService,
    pub player_service: ArcPlayerService,
    pub registration_service: ArcRegistrationService,
    pub transfer_service: ArcTransferService,
    pub report_service: ArcReportService,
    pub settings_service: ArcSettingsService,

    pub session_keys: Arc<SessionKeys>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{0}")]
    Authentication(String),

    #[error("the limit of {0} players has been reached")]
    Capacity(usize),

    #[error("cannot transfer money to the same player")]
    SameAccount,

    #[error("insufficient funds: balance is {balance}, requested {requested}")]
    InsufficientFunds { balance: i64, requested: i64 },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("the amount must be a positive integer")]
    InvalidAmount,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn bad_request<T, R>(msg: T) -> ServiceResult<R>
    where
        T: Into<String>,
    {
        Err(ServiceError::BadRequest(msg.into()))
    }

    pub fn authentication<T, R>(msg: T) -> ServiceResult<R>
    where
        T: Into<String>,
    {
        Err(ServiceError::Authentication(msg.into()))
    }

    pub fn not_found<T, R>(msg: T) -> ServiceResult<R>
    where
        T: Into<String>,
    {
        Err(ServiceError::NotFound(msg.into()))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Capacity(_) => StatusCode::CONFLICT,
            ServiceError::SameAccount
            | ServiceError::InsufficientFunds { .. }
            | ServiceError::InvalidAmount
            | ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::http::Response<axum::body::Body> {
        let status = self.status();
        let msg = match self {
            ServiceError::Internal(msg) => {
                log::error!("Internal error: {}", msg);
                "Something went wrong".to_string()
            }
            other => other.to_string(),
        };
        (status, Html(views::error_page(status, &msg))).into_response()
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

pub fn construct_app(config: &Config) -> ServiceResult<AppState> {
    let store = Arc::new(BankStore::new(config.initial_balance));

    let auth_service: ArcAuthService = Arc::new(Box::new(AuthServiceImpl::new(
        store.clone(),
        &config.admin_password,
        config.bcrypt_cost,
    )?));

    let player_service: ArcPlayerService = Arc::new(Box::new(PlayerServiceImpl::new(store.clone())));

    let registration_service: ArcRegistrationService = Arc::new(Box::new(
        RegistrationServiceImpl::new(store.clone(), config.max_accounts, config.bcrypt_cost),
    ));

    let transfer_service: ArcTransferService =
        Arc::new(Box::new(TransferServiceImpl::new(store.clone())));

    let report_service: ArcReportService = Arc::new(Box::new(ReportServiceImpl::new(store.clone())));

    let settings_service: ArcSettingsService = Arc::new(Box::new(SettingsServiceImpl::new(store)));

    Ok(AppState {
        auth_service,
        player_service,
        registration_service,
        transfer_service,
        report_service,
        settings_service,
        session_keys: Arc::new(SessionKeys::new(&config.session_secret)),
    })
}
