use std::sync::Arc;

use log::{info, warn};

use crate::{
    app::{ServiceError, ServiceResult},
    config::MAX_INITIAL_BALANCE,
    store::{BankStore, Settings},
};

pub trait SettingsService {
    fn get_settings(&self) -> ServiceResult<Settings>;
    /// Only affects players approved from now on.
    fn update_initial_balance(&self, initial_balance: i64) -> ServiceResult<()>;
    /// Drops every player, pending registration and transaction. Settings stay.
    fn reset_all(&self) -> ServiceResult<()>;
}

pub struct SettingsServiceImpl {
    store: Arc<BankStore>,
}

impl SettingsServiceImpl {
    pub fn new(store: Arc<BankStore>) -> Self {
        Self { store }
    }
}

impl SettingsService for SettingsServiceImpl {
    fn get_settings(&self) -> ServiceResult<Settings> {
        self.store.read(|state| state.settings)
    }

    fn update_initial_balance(&self, initial_balance: i64) -> ServiceResult<()> {
        if !(-MAX_INITIAL_BALANCE..=MAX_INITIAL_BALANCE).contains(&initial_balance) {
            warn!("Initial balance {} refused, out of range", initial_balance);
            return ServiceError::bad_request(format!(
                "The initial balance must be between -{} and {}",
                MAX_INITIAL_BALANCE, MAX_INITIAL_BALANCE
            ));
        }
        let previous = self.store.write(|state| {
            std::mem::replace(&mut state.settings.initial_balance, initial_balance)
        })?;
        info!(
            "Initial balance changed from {} to {}",
            previous, initial_balance
        );
        Ok(())
    }

    fn reset_all(&self) -> ServiceResult<()> {
        let (players, pending, transactions) = self.store.write(|state| {
            let counts = (
                state.players.len(),
                state.pending.len(),
                state.transactions.len(),
            );
            state.clear();
            counts
        })?;
        warn!(
            "Bank reset: removed {} players, {} pending registrations and {} transactions",
            players, pending, transactions
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        report::{ReportService, ReportServiceImpl},
        store::Transaction,
    };

    #[test]
    fn test_update_initial_balance_is_not_retroactive() {
        let store = Arc::new(BankStore::new(100));
        let alice = store
            .write(|s| s.create_player("Alice".into(), String::new(), 100))
            .unwrap();
        let service = SettingsServiceImpl::new(store.clone());

        service.update_initial_balance(500).unwrap();
        assert_eq!(service.get_settings().unwrap().initial_balance, 500);
        assert_eq!(
            store.read(|s| s.players[&alice.id].balance).unwrap(),
            100
        );
    }

    #[test]
    fn test_initial_balance_out_of_range_is_refused() {
        let store = Arc::new(BankStore::new(100));
        store
            .write(|s| s.create_player("Alice".into(), String::new(), 100))
            .unwrap();
        let service = SettingsServiceImpl::new(store.clone());

        for value in [i64::MIN, i64::MAX, MAX_INITIAL_BALANCE + 1, -MAX_INITIAL_BALANCE - 1] {
            assert!(matches!(
                service.update_initial_balance(value),
                Err(ServiceError::BadRequest(_))
            ));
        }
        assert_eq!(service.get_settings().unwrap().initial_balance, 100);

        service.update_initial_balance(-MAX_INITIAL_BALANCE).unwrap();
        let report = ReportServiceImpl::new(store).settlement_report().unwrap();
        assert_eq!(report.total_to_receive, 100 + MAX_INITIAL_BALANCE);
    }

    #[test]
    fn test_reset_all_empties_tables() {
        let store = Arc::new(BankStore::new(100));
        store
            .write(|s| {
                let alice = s.create_player("Alice".into(), String::new(), 100);
                let bob = s.create_player("Bob".into(), String::new(), 100);
                let id = s.allocate_registration_id();
                s.pending.insert(
                    id,
                    crate::store::PendingRegistration {
                        id,
                        name: "Carol".into(),
                        password_hash: String::new(),
                        submitted_at: chrono::Local::now(),
                    },
                );
                s.transactions.push(Transaction {
                    timestamp: chrono::Local::now(),
                    from_id: alice.id,
                    from_name: alice.name,
                    to_id: bob.id,
                    to_name: bob.name,
                    amount: 1,
                    reason: "x".into(),
                });
            })
            .unwrap();
        let service = SettingsServiceImpl::new(store.clone());
        service.update_initial_balance(80).unwrap();

        service.reset_all().unwrap();
        let counts = store
            .read(|s| (s.players.len(), s.pending.len(), s.transactions.len()))
            .unwrap();
        assert_eq!(counts, (0, 0, 0));
        assert_eq!(service.get_settings().unwrap().initial_balance, 80);
    }
}
