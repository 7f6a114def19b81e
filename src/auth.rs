use std::sync::Arc;

use log::{info, warn};

use crate::{
    app::{ServiceError, ServiceResult},
    store::{BankStore, Player, PlayerId},
};

pub trait AuthService {
    fn login_admin(&self, password: &str) -> ServiceResult<()>;
    fn login_player(&self, player_id: PlayerId, password: &str) -> ServiceResult<Player>;
}

pub struct AuthServiceImpl {
    store: Arc<BankStore>,
    admin_password_hash: String,
}

impl AuthServiceImpl {
    pub fn new(store: Arc<BankStore>, admin_password: &str, bcrypt_cost: u32) -> ServiceResult<Self> {
        let admin_password_hash = bcrypt::non_truncating_hash(admin_password, bcrypt_cost)
            .map_err(|e| ServiceError::Internal(format!("failed to hash admin password: {}", e)))?;
        Ok(Self {
            store,
            admin_password_hash,
        })
    }
}

// Stored hashes are made without truncation, so a password too long to hash cannot match.
fn verify_password(password: &str, hash: &str) -> ServiceResult<bool> {
    match bcrypt::non_truncating_verify(password, hash) {
        Ok(matches) => Ok(matches),
        Err(bcrypt::BcryptError::Truncation(_)) => Ok(false),
        Err(e) => Err(ServiceError::Internal(format!(
            "failed to verify password: {}",
            e
        ))),
    }
}

impl AuthService for AuthServiceImpl {
    fn login_admin(&self, password: &str) -> ServiceResult<()> {
        if !verify_password(password, &self.admin_password_hash)? {
            warn!("Failed admin login attempt");
            return ServiceError::authentication("Wrong password");
        }
        info!("Admin logged in");
        Ok(())
    }

    fn login_player(&self, player_id: PlayerId, password: &str) -> ServiceResult<Player> {
        let Some(player) = self
            .store
            .read(|state| state.players.get(&player_id).cloned())?
        else {
            warn!("Login attempt for unknown player {}", player_id);
            return ServiceError::authentication("Wrong credentials");
        };

        if !verify_password(password, &player.password_hash)? {
            warn!("Failed login attempt for player {} ({})", player.id, player.name);
            return ServiceError::authentication("Wrong credentials");
        }

        info!("Player {} ({}) logged in", player.id, player.name);
        Ok(player)
    }
}
