use std::{collections::BTreeMap, sync::Mutex};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::app::{ServiceError, ServiceResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(u64);

impl PlayerId {
    pub fn new(id: u64) -> Self {
        PlayerId(id)
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PlayerId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(PlayerId)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(u64);

impl RegistrationId {
    pub fn new(id: u64) -> Self {
        RegistrationId(id)
    }
}

impl std::fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RegistrationId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(RegistrationId)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub password_hash: String,
    pub balance: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingRegistration {
    pub id: RegistrationId,
    pub name: String,
    pub password_hash: String,
    pub submitted_at: DateTime<Local>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub timestamp: DateTime<Local>,
    pub from_id: PlayerId,
    pub from_name: String,
    pub to_id: PlayerId,
    pub to_name: String,
    pub amount: i64,
    pub reason: String,
}

impl Transaction {
    pub fn involves(&self, player_id: PlayerId) -> bool {
        self.from_id == player_id || self.to_id == player_id
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settings {
    pub initial_balance: i64,
}

/// Every table of the bank. Only reachable through [`BankStore`], which holds
/// it behind a single lock.
#[derive(Debug)]
pub struct BankState {
    pub players: BTreeMap<PlayerId, Player>,
    pub pending: BTreeMap<RegistrationId, PendingRegistration>,
    pub transactions: Vec<Transaction>,
    pub settings: Settings,
    next_player_id: u64,
    next_registration_id: u64,
}

impl BankState {
    pub fn new(initial_balance: i64) -> Self {
        Self {
            players: BTreeMap::new(),
            pending: BTreeMap::new(),
            transactions: Vec::new(),
            settings: Settings { initial_balance },
            next_player_id: 1,
            next_registration_id: 1,
        }
    }

    // Counters survive `clear`, so ids are never handed out twice.
    pub fn allocate_player_id(&mut self) -> PlayerId {
        let id = PlayerId(self.next_player_id);
        self.next_player_id += 1;
        id
    }

    pub fn allocate_registration_id(&mut self) -> RegistrationId {
        let id = RegistrationId(self.next_registration_id);
        self.next_registration_id += 1;
        id
    }

    pub fn create_player(&mut self, name: String, password_hash: String, balance: i64) -> Player {
        let id = self.allocate_player_id();
        let player = Player {
            id,
            name,
            password_hash,
            balance,
        };
        self.players.insert(id, player.clone());
        player
    }

    pub fn account_count(&self) -> usize {
        self.players.len() + self.pending.len()
    }

    pub fn total_balance(&self) -> i64 {
        self.players.values().map(|p| p.balance).sum()
    }

    pub fn clear(&mut self) {
        self.players.clear();
        self.pending.clear();
        self.transactions.clear();
    }
}

pub struct BankStore {
    state: Mutex<BankState>,
}

impl BankStore {
    pub fn new(initial_balance: i64) -> Self {
        Self {
            state: Mutex::new(BankState::new(initial_balance)),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&BankState) -> R) -> ServiceResult<R> {
        let state = self
            .state
            .lock()
            .map_err(|_| ServiceError::Internal("bank state lock poisoned".into()))?;
        Ok(f(&state))
    }

    /// Runs `f` with exclusive access, so a check and the mutation depending
    /// on it cannot interleave with another request.
    pub fn write<R>(&self, f: impl FnOnce(&mut BankState) -> R) -> ServiceResult<R> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ServiceError::Internal("bank state lock poisoned".into()))?;
        Ok(f(&mut state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_not_reused_after_clear() {
        let mut state = BankState::new(100);
        let first = state.allocate_player_id();
        let registration = state.allocate_registration_id();
        state.clear();
        assert_ne!(state.allocate_player_id(), first);
        assert_ne!(state.allocate_registration_id(), registration);
    }

    #[test]
    fn test_clear_keeps_settings() {
        let store = BankStore::new(250);
        store
            .write(|state| {
                state.create_player("Alice".to_string(), String::new(), 250);
                state.clear();
            })
            .unwrap();
        let (count, initial_balance) = store
            .read(|state| (state.account_count(), state.settings.initial_balance))
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(initial_balance, 250);
    }

    #[test]
    fn test_player_id_parse() {
        assert_eq!(" 7 ".parse::<PlayerId>().ok(), Some(PlayerId::new(7)));
        assert!("player_7".parse::<PlayerId>().is_err());
    }
}
