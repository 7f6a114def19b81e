use std::sync::Arc;

use log::{debug, info};
use validator::Validate;

use crate::{
    app::{ServiceError, ServiceResult},
    store::{BankStore, PendingRegistration, Player, RegistrationId},
};

pub const MIN_PASSWORD_LENGTH: usize = 4;
/// bcrypt hashes at most 72 bytes including its NUL terminator.
pub const MAX_PASSWORD_BYTES: usize = 71;

#[derive(Validate)]
struct RegistrationRequest {
    #[validate(length(min = 1, max = 64))]
    name: String,
    #[validate(length(min = 4))]
    password: String,
}

pub trait RegistrationService {
    fn submit(&self, name: &str, password: &str) -> ServiceResult<PendingRegistration>;
    /// Turns a pending registration into a player. `None` if the id is unknown.
    fn approve(&self, id: RegistrationId) -> ServiceResult<Option<Player>>;
    /// Discards a pending registration. `None` if the id is unknown.
    fn reject(&self, id: RegistrationId) -> ServiceResult<Option<PendingRegistration>>;
    fn list_pending(&self) -> ServiceResult<Vec<PendingRegistration>>;
}

pub struct RegistrationServiceImpl {
    store: Arc<BankStore>,
    max_accounts: usize,
    bcrypt_cost: u32,
}

impl RegistrationServiceImpl {
    pub fn new(store: Arc<BankStore>, max_accounts: usize, bcrypt_cost: u32) -> Self {
        Self {
            store,
            max_accounts,
            bcrypt_cost,
        }
    }

    fn check_capacity(&self, account_count: usize) -> ServiceResult<()> {
        if account_count >= self.max_accounts {
            return Err(ServiceError::Capacity(self.max_accounts));
        }
        Ok(())
    }
}

fn validate_request(name: &str, password: &str) -> ServiceResult<RegistrationRequest> {
    let request = RegistrationRequest {
        name: name.trim().to_string(),
        password: password.to_string(),
    };
    if let Err(e) = request.validate() {
        let fields = e.field_errors();
        if fields.contains_key("name") {
            return ServiceError::bad_request("Name must be between 1 and 64 characters");
        }
        return ServiceError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ));
    }
    if request.password.len() > MAX_PASSWORD_BYTES {
        return ServiceError::bad_request(format!(
            "Password must be at most {} bytes long",
            MAX_PASSWORD_BYTES
        ));
    }
    Ok(request)
}

impl RegistrationService for RegistrationServiceImpl {
    fn submit(&self, name: &str, password: &str) -> ServiceResult<PendingRegistration> {
        let request = validate_request(name, password)?;

        // Fail fast before paying for the hash; re-checked under the write lock.
        self.check_capacity(self.store.read(|state| state.account_count())?)?;

        let password_hash = bcrypt::non_truncating_hash(&request.password, self.bcrypt_cost)
            .map_err(|e| match e {
                bcrypt::BcryptError::Truncation(_) => {
                    ServiceError::BadRequest("Password is too long".to_string())
                }
                e => ServiceError::Internal(format!("failed to hash password: {}", e)),
            })?;

        let registration = self.store.write(|state| {
            self.check_capacity(state.account_count())?;
            let registration = PendingRegistration {
                id: state.allocate_registration_id(),
                name: request.name,
                password_hash,
                submitted_at: chrono::Local::now(),
            };
            state.pending.insert(registration.id, registration.clone());
            Ok::<_, ServiceError>(registration)
        })??;

        info!(
            "Registration {} submitted for {}",
            registration.id, registration.name
        );
        Ok(registration)
    }

    fn approve(&self, id: RegistrationId) -> ServiceResult<Option<Player>> {
        let player = self.store.write(|state| {
            let registration = state.pending.remove(&id)?;
            let balance = state.settings.initial_balance;
            Some(state.create_player(registration.name, registration.password_hash, balance))
        })?;

        match &player {
            Some(player) => info!(
                "Registration {} approved as player {} ({}) with balance {}",
                id, player.id, player.name, player.balance
            ),
            None => debug!("Approve ignored, registration {} not found", id),
        }
        Ok(player)
    }

    fn reject(&self, id: RegistrationId) -> ServiceResult<Option<PendingRegistration>> {
        let registration = self.store.write(|state| state.pending.remove(&id))?;

        match &registration {
            Some(registration) => info!("Registration {} ({}) rejected", id, registration.name),
            None => debug!("Reject ignored, registration {} not found", id),
        }
        Ok(registration)
    }

    fn list_pending(&self) -> ServiceResult<Vec<PendingRegistration>> {
        self.store
            .read(|state| state.pending.values().cloned().collect())
    }
}
