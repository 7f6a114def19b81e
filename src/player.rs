use std::sync::Arc;

use crate::{
    app::ServiceResult,
    store::{BankStore, Player, PlayerId, Transaction},
};

pub trait PlayerService {
    fn get_player(&self, player_id: PlayerId) -> ServiceResult<Option<Player>>;
    fn get_players(&self) -> ServiceResult<Vec<Player>>;
    /// Transfers the player took part in, oldest first.
    fn get_history(&self, player_id: PlayerId) -> ServiceResult<Vec<Transaction>>;
    /// Sum of all balances, i.e. the money in circulation.
    fn total_balance(&self) -> ServiceResult<i64>;
}

pub struct PlayerServiceImpl {
    store: Arc<BankStore>,
}

impl PlayerServiceImpl {
    pub fn new(store: Arc<BankStore>) -> Self {
        Self { store }
    }
}

impl PlayerService for PlayerServiceImpl {
    fn get_player(&self, player_id: PlayerId) -> ServiceResult<Option<Player>> {
        self.store.read(|state| state.players.get(&player_id).cloned())
    }

    fn get_players(&self) -> ServiceResult<Vec<Player>> {
        self.store
            .read(|state| state.players.values().cloned().collect())
    }

    fn get_history(&self, player_id: PlayerId) -> ServiceResult<Vec<Transaction>> {
        self.store.read(|state| {
            state
                .transactions
                .iter()
                .filter(|t| t.involves(player_id))
                .cloned()
                .collect()
        })
    }

    fn total_balance(&self) -> ServiceResult<i64> {
        self.store.read(|state| state.total_balance())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(from: &Player, to: &Player, amount: i64) -> Transaction {
        Transaction {
            timestamp: chrono::Local::now(),
            from_id: from.id,
            from_name: from.name.clone(),
            to_id: to.id,
            to_name: to.name.clone(),
            amount,
            reason: "test".to_string(),
        }
    }

    #[test]
    fn test_history_filters_by_id_not_name() {
        let store = Arc::new(BankStore::new(100));
        let service = PlayerServiceImpl::new(store.clone());
        let (alice, bob, other_alice) = store
            .write(|s| {
                let alice = s.create_player("Alice".into(), String::new(), 100);
                let bob = s.create_player("Bob".into(), String::new(), 100);
                let other_alice = s.create_player("Alice".into(), String::new(), 100);
                s.transactions.push(record(&alice, &bob, 10));
                s.transactions.push(record(&bob, &other_alice, 5));
                (alice, bob, other_alice)
            })
            .unwrap();

        assert_eq!(service.get_history(alice.id).unwrap().len(), 1);
        assert_eq!(service.get_history(bob.id).unwrap().len(), 2);
        let history = service.get_history(other_alice.id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].amount, 5);
    }

    #[test]
    fn test_players_and_total() {
        let store = Arc::new(BankStore::new(100));
        let service = PlayerServiceImpl::new(store.clone());
        assert_eq!(service.total_balance().unwrap(), 0);

        let bob = store
            .write(|s| {
                s.create_player("Alice".into(), String::new(), 70);
                s.create_player("Bob".into(), String::new(), -20)
            })
            .unwrap();

        assert_eq!(service.get_players().unwrap().len(), 2);
        assert_eq!(service.total_balance().unwrap(), 50);
        assert_eq!(service.get_player(bob.id).unwrap().map(|p| p.balance), Some(-20));
        assert_eq!(service.get_player(PlayerId::new(1000)).unwrap(), None);
    }
}
