use axum::{
    Form, Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::{debug, info};
use serde::Deserialize;

use crate::{
    app::{AppState, ServiceError, ServiceResult},
    session::{AdminSession, PlayerSession, Role, Session},
    store::{PlayerId, RegistrationId},
    views,
};

pub fn router(app: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/admin/login", get(admin_login_page).post(admin_login))
        .route("/player/register", get(register_page).post(register))
        .route("/player/login", get(player_login_page).post(player_login))
        .route("/admin/dashboard", get(admin_dashboard))
        .route("/player/dashboard", get(player_dashboard))
        .route("/admin/approve/{id}", post(approve))
        .route("/admin/reject/{id}", post(reject))
        .route("/admin/transfer", get(transfer_page).post(transfer))
        .route("/admin/report", get(report))
        .route("/admin/settings", get(settings_page).post(update_settings))
        .route("/admin/reset", post(reset))
        .route("/logout", get(logout))
        .with_state(app)
}

pub async fn run(
    app: AppState,
    address: &str,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(address).await?;

    info!("HTTP server listening on {}", address);
    axum::serve(listener, router(app))
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("HTTP server shut down gracefully");
    Ok(())
}

fn notice(error: &ServiceError) -> String {
    match error {
        ServiceError::Authentication(msg) | ServiceError::BadRequest(msg) => msg.clone(),
        ServiceError::Capacity(max) => format!("The maximum of {} players has been reached!", max),
        ServiceError::SameAccount => "You cannot transfer money to the same player!".to_string(),
        ServiceError::InsufficientFunds { .. } => "Insufficient funds!".to_string(),
        ServiceError::NotFound(what) => format!("Not found: {}", what),
        ServiceError::InvalidAmount => "The amount must be a positive whole number".to_string(),
        ServiceError::Internal(_) => "Something went wrong".to_string(),
    }
}

/// Turns a failed operation into a flash notice and a redirect to `to`.
/// Internal errors are not the user's fault and get an error page instead.
fn recover(app: &AppState, session: Session, error: ServiceError, to: &str) -> Response {
    if let ServiceError::Internal(_) = error {
        return error.into_response();
    }
    session
        .error(notice(&error))
        .redirect(&app.session_keys, to)
}

async fn index(State(app): State<AppState>, mut session: Session) -> Response {
    match session.role {
        Role::Admin => session.redirect(&app.session_keys, "/admin/dashboard"),
        Role::Player(_) => session.redirect(&app.session_keys, "/player/dashboard"),
        Role::Guest => {
            let flash = session.take_flash();
            session.render(&app.session_keys, views::landing(flash.as_ref()))
        }
    }
}

async fn admin_login_page(State(app): State<AppState>, mut session: Session) -> Response {
    let flash = session.take_flash();
    session.render(&app.session_keys, views::admin_login(flash.as_ref()))
}

#[derive(Deserialize)]
struct AdminLoginForm {
    #[serde(default)]
    password: String,
}

async fn admin_login(
    State(app): State<AppState>,
    session: Session,
    Form(form): Form<AdminLoginForm>,
) -> Response {
    match app.auth_service.login_admin(&form.password) {
        Ok(()) => session
            .with_role(Role::Admin)
            .redirect(&app.session_keys, "/admin/dashboard"),
        Err(ServiceError::Authentication(_)) => {
            recover(&app, session, ServiceError::Authentication("Wrong password!".into()), "/admin/login")
        }
        Err(e) => recover(&app, session, e, "/admin/login"),
    }
}

async fn register_page(State(app): State<AppState>, mut session: Session) -> Response {
    let flash = session.take_flash();
    session.render(&app.session_keys, views::player_register(flash.as_ref()))
}

#[derive(Deserialize)]
struct RegisterForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    password: String,
}

async fn register(
    State(app): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    match app.registration_service.submit(&form.name, &form.password) {
        Ok(_) => session
            .success("Request sent! Wait for the administrator's approval.")
            .redirect(&app.session_keys, "/"),
        Err(e @ ServiceError::Capacity(_)) => recover(&app, session, e, "/"),
        Err(e) => recover(&app, session, e, "/player/register"),
    }
}

async fn player_login_page(
    State(app): State<AppState>,
    mut session: Session,
) -> ServiceResult<Response> {
    let players = app.player_service.get_players()?;
    let flash = session.take_flash();
    Ok(session.render(&app.session_keys, views::player_login(flash.as_ref(), &players)))
}

#[derive(Deserialize)]
struct PlayerLoginForm {
    #[serde(default)]
    player_id: String,
    #[serde(default)]
    password: String,
}

async fn player_login(
    State(app): State<AppState>,
    session: Session,
    Form(form): Form<PlayerLoginForm>,
) -> Response {
    let result = form
        .player_id
        .parse::<PlayerId>()
        .map_err(|_| ServiceError::Authentication("Wrong credentials".into()))
        .and_then(|player_id| app.auth_service.login_player(player_id, &form.password));

    match result {
        Ok(player) => session
            .with_role(Role::Player(player.id))
            .redirect(&app.session_keys, "/player/dashboard"),
        Err(ServiceError::Authentication(_)) => recover(
            &app,
            session,
            ServiceError::Authentication("Wrong credentials!".into()),
            "/player/login",
        ),
        Err(e) => recover(&app, session, e, "/player/login"),
    }
}

async fn admin_dashboard(
    State(app): State<AppState>,
    AdminSession(mut session): AdminSession,
) -> ServiceResult<Response> {
    let players = app.player_service.get_players()?;
    let pending = app.registration_service.list_pending()?;
    let transactions = app.transfer_service.get_transactions()?;
    let total_balance = app.player_service.total_balance()?;

    let dashboard = views::AdminDashboard {
        players: &players,
        pending: &pending,
        transactions: &transactions,
        total_balance,
    };
    let flash = session.take_flash();
    Ok(session.render(
        &app.session_keys,
        views::admin_dashboard(flash.as_ref(), &dashboard),
    ))
}

async fn player_dashboard(
    State(app): State<AppState>,
    PlayerSession {
        mut session,
        player_id,
    }: PlayerSession,
) -> ServiceResult<Response> {
    let Some(player) = app.player_service.get_player(player_id)? else {
        info!("Session for removed player {} cleared", player_id);
        return Ok(session
            .with_role(Role::Guest)
            .error("Account not found!")
            .redirect(&app.session_keys, "/"));
    };

    let history = app.player_service.get_history(player_id)?;
    let players = app.player_service.get_players()?;
    let flash = session.take_flash();
    Ok(session.render(
        &app.session_keys,
        views::player_dashboard(flash.as_ref(), &player, &history, &players),
    ))
}

async fn approve(
    State(app): State<AppState>,
    AdminSession(session): AdminSession,
    Path(id): Path<String>,
) -> ServiceResult<Response> {
    let approved = match id.parse::<RegistrationId>() {
        Ok(id) => app.registration_service.approve(id)?,
        Err(_) => {
            debug!("Approve ignored, malformed registration id {:?}", id);
            None
        }
    };
    let session = match approved {
        Some(player) => session.success(format!("Player {} approved!", player.name)),
        None => session,
    };
    Ok(session.redirect(&app.session_keys, "/admin/dashboard"))
}

async fn reject(
    State(app): State<AppState>,
    AdminSession(session): AdminSession,
    Path(id): Path<String>,
) -> ServiceResult<Response> {
    let rejected = match id.parse::<RegistrationId>() {
        Ok(id) => app.registration_service.reject(id)?,
        Err(_) => {
            debug!("Reject ignored, malformed registration id {:?}", id);
            None
        }
    };
    let session = match rejected {
        Some(registration) => {
            session.success(format!("Request from {} rejected.", registration.name))
        }
        None => session,
    };
    Ok(session.redirect(&app.session_keys, "/admin/dashboard"))
}

async fn transfer_page(
    State(app): State<AppState>,
    AdminSession(mut session): AdminSession,
) -> ServiceResult<Response> {
    let players = app.player_service.get_players()?;
    let flash = session.take_flash();
    Ok(session.render(
        &app.session_keys,
        views::transfer_form(flash.as_ref(), &players),
    ))
}

#[derive(Deserialize)]
struct TransferForm {
    #[serde(default)]
    from_player: String,
    #[serde(default)]
    to_player: String,
    #[serde(default)]
    amount: String,
    #[serde(default)]
    reason: String,
}

impl TransferForm {
    fn parse(&self) -> ServiceResult<(PlayerId, PlayerId, i64)> {
        let from = self
            .from_player
            .parse::<PlayerId>()
            .map_err(|_| ServiceError::NotFound("sending player".into()))?;
        let to = self
            .to_player
            .parse::<PlayerId>()
            .map_err(|_| ServiceError::NotFound("receiving player".into()))?;
        let amount = self
            .amount
            .trim()
            .parse::<i64>()
            .map_err(|_| ServiceError::InvalidAmount)?;
        if self.reason.trim().is_empty() {
            return ServiceError::bad_request("Please enter a reason for the transfer");
        }
        Ok((from, to, amount))
    }
}

async fn transfer(
    State(app): State<AppState>,
    AdminSession(session): AdminSession,
    Form(form): Form<TransferForm>,
) -> Response {
    let result = form.parse().and_then(|(from, to, amount)| {
        app.transfer_service
            .transfer(from, to, amount, &form.reason)
    });

    match result {
        Ok(transaction) => session
            .success(format!("Transfer of €{} completed!", transaction.amount))
            .redirect(&app.session_keys, "/admin/dashboard"),
        Err(e) => recover(&app, session, e, "/admin/transfer"),
    }
}

async fn report(
    State(app): State<AppState>,
    AdminSession(mut session): AdminSession,
) -> ServiceResult<Response> {
    let report = app.report_service.settlement_report()?;
    let flash = session.take_flash();
    Ok(session.render(&app.session_keys, views::report(flash.as_ref(), &report)))
}

async fn settings_page(
    State(app): State<AppState>,
    AdminSession(mut session): AdminSession,
) -> ServiceResult<Response> {
    let settings = app.settings_service.get_settings()?;
    let flash = session.take_flash();
    Ok(session.render(
        &app.session_keys,
        views::settings(flash.as_ref(), &settings),
    ))
}

#[derive(Deserialize)]
struct SettingsForm {
    #[serde(default)]
    initial_balance: String,
}

async fn update_settings(
    State(app): State<AppState>,
    AdminSession(session): AdminSession,
    Form(form): Form<SettingsForm>,
) -> Response {
    let result = form
        .initial_balance
        .trim()
        .parse::<i64>()
        .map_err(|_| ServiceError::BadRequest("The initial balance must be a whole number".into()))
        .and_then(|value| app.settings_service.update_initial_balance(value));

    match result {
        Ok(()) => session
            .success("Settings saved!")
            .redirect(&app.session_keys, "/admin/dashboard"),
        Err(e) => recover(&app, session, e, "/admin/settings"),
    }
}

async fn reset(
    State(app): State<AppState>,
    AdminSession(session): AdminSession,
) -> ServiceResult<Response> {
    app.settings_service.reset_all()?;
    Ok(session
        .success("All data has been deleted!")
        .redirect(&app.session_keys, "/admin/dashboard"))
}

async fn logout(State(app): State<AppState>) -> Response {
    Session::guest()
        .success("Logged out successfully!")
        .redirect(&app.session_keys, "/")
}
