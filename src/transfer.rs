use std::sync::Arc;

use log::{info, warn};

use crate::{
    app::{ServiceError, ServiceResult},
    store::{BankState, BankStore, PlayerId, Transaction},
};

pub trait TransferService {
    fn transfer(
        &self,
        from: PlayerId,
        to: PlayerId,
        amount: i64,
        reason: &str,
    ) -> ServiceResult<Transaction>;
    /// The whole log, oldest first.
    fn get_transactions(&self) -> ServiceResult<Vec<Transaction>>;
}

pub struct TransferServiceImpl {
    store: Arc<BankStore>,
}

impl TransferServiceImpl {
    pub fn new(store: Arc<BankStore>) -> Self {
        Self { store }
    }
}

/// Checks run in a fixed order and nothing is mutated unless all of them pass.
fn apply_transfer(
    state: &mut BankState,
    from: PlayerId,
    to: PlayerId,
    amount: i64,
    reason: &str,
) -> ServiceResult<Transaction> {
    if from == to {
        return Err(ServiceError::SameAccount);
    }
    let Some(from_player) = state.players.get(&from) else {
        return ServiceError::not_found(format!("player {}", from));
    };
    let Some(to_player) = state.players.get(&to) else {
        return ServiceError::not_found(format!("player {}", to));
    };
    if amount < 1 {
        return Err(ServiceError::InvalidAmount);
    }
    if from_player.balance < amount {
        return Err(ServiceError::InsufficientFunds {
            balance: from_player.balance,
            requested: amount,
        });
    }
    let Some(credited) = to_player.balance.checked_add(amount) else {
        return ServiceError::bad_request(format!("the balance of {} cannot hold {}", to, amount));
    };

    let transaction = Transaction {
        timestamp: chrono::Local::now(),
        from_id: from,
        from_name: from_player.name.clone(),
        to_id: to,
        to_name: to_player.name.clone(),
        amount,
        reason: reason.trim().to_string(),
    };

    if let Some(player) = state.players.get_mut(&from) {
        player.balance -= amount;
    }
    if let Some(player) = state.players.get_mut(&to) {
        player.balance = credited;
    }
    state.transactions.push(transaction.clone());
    Ok(transaction)
}

impl TransferService for TransferServiceImpl {
    fn transfer(
        &self,
        from: PlayerId,
        to: PlayerId,
        amount: i64,
        reason: &str,
    ) -> ServiceResult<Transaction> {
        let result = self
            .store
            .write(|state| apply_transfer(state, from, to, amount, reason))?;

        match &result {
            Ok(t) => info!(
                "Transferred {} from {} ({}) to {} ({}): {}",
                t.amount, t.from_name, t.from_id, t.to_name, t.to_id, t.reason
            ),
            Err(e) => warn!("Transfer of {} from {} to {} refused: {}", amount, from, to, e),
        }
        result
    }

    fn get_transactions(&self) -> ServiceResult<Vec<Transaction>> {
        self.store.read(|state| state.transactions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Player;

    fn setup(balances: &[i64]) -> (Arc<BankStore>, TransferServiceImpl, Vec<Player>) {
        let store = Arc::new(BankStore::new(100));
        let players = store
            .write(|s| {
                balances
                    .iter()
                    .enumerate()
                    .map(|(i, b)| s.create_player(format!("player{}", i), String::new(), *b))
                    .collect()
            })
            .unwrap();
        (store.clone(), TransferServiceImpl::new(store), players)
    }

    fn balances(store: &BankStore) -> Vec<i64> {
        store
            .read(|s| s.players.values().map(|p| p.balance).collect())
            .unwrap()
    }

    #[test]
    fn test_transfer_moves_money_and_logs() {
        let (store, service, players) = setup(&[100, 100]);
        let t = service
            .transfer(players[0].id, players[1].id, 30, " gift ")
            .expect("transfer failed");
        assert_eq!(t.from_name, "player0");
        assert_eq!(t.to_name, "player1");
        assert_eq!(t.amount, 30);
        assert_eq!(t.reason, "gift");
        assert_eq!(balances(&store), vec![70, 130]);
        assert_eq!(service.get_transactions().unwrap(), vec![t]);
    }

    #[test]
    fn test_transfer_is_zero_sum() {
        let (store, service, players) = setup(&[100, 40, 7]);
        let before: i64 = balances(&store).iter().sum();
        let moves = [(0, 1, 25), (1, 2, 60), (2, 0, 1), (0, 2, 76)];
        for (from, to, amount) in moves {
            service
                .transfer(players[from].id, players[to].id, amount, "move")
                .expect("transfer failed");
            assert_eq!(balances(&store).iter().sum::<i64>(), before);
        }
        assert_eq!(service.get_transactions().unwrap().len(), moves.len());
    }

    #[test]
    fn test_same_account_always_fails() {
        let (store, service, players) = setup(&[100]);
        for amount in [0, 1, 100, 1_000] {
            assert_eq!(
                service.transfer(players[0].id, players[0].id, amount, "self"),
                Err(ServiceError::SameAccount)
            );
        }
        // Checked before existence as well.
        assert_eq!(
            service.transfer(PlayerId::new(77), PlayerId::new(77), 1, "self"),
            Err(ServiceError::SameAccount)
        );
        assert_eq!(balances(&store), vec![100]);
    }

    #[test]
    fn test_insufficient_funds_leaves_balances() {
        let (store, service, players) = setup(&[50, 100]);
        assert_eq!(
            service.transfer(players[0].id, players[1].id, 51, "too much"),
            Err(ServiceError::InsufficientFunds {
                balance: 50,
                requested: 51
            })
        );
        assert_eq!(balances(&store), vec![50, 100]);
        assert!(service.get_transactions().unwrap().is_empty());

        // The whole balance can be spent.
        assert!(service.transfer(players[0].id, players[1].id, 50, "all").is_ok());
        assert_eq!(balances(&store), vec![0, 150]);
    }

    #[test]
    fn test_unknown_player_and_invalid_amount() {
        let (store, service, players) = setup(&[100, 100]);
        assert!(matches!(
            service.transfer(players[0].id, PlayerId::new(99), 10, "ghost"),
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.transfer(PlayerId::new(99), players[0].id, 10, "ghost"),
            Err(ServiceError::NotFound(_))
        ));
        for amount in [0, -5] {
            assert_eq!(
                service.transfer(players[0].id, players[1].id, amount, "nothing"),
                Err(ServiceError::InvalidAmount)
            );
        }
        assert_eq!(balances(&store), vec![100, 100]);
    }

    #[test]
    fn test_credit_overflow_is_refused() {
        let (store, service, players) = setup(&[100, i64::MAX - 10]);
        assert!(matches!(
            service.transfer(players[0].id, players[1].id, 11, "overflow"),
            Err(ServiceError::BadRequest(_))
        ));
        assert_eq!(balances(&store), vec![100, i64::MAX - 10]);
        assert!(service.get_transactions().unwrap().is_empty());
    }

    #[test]
    fn test_existing_debt_blocks_any_transfer() {
        let (_store, service, players) = setup(&[-10, 100]);
        assert!(matches!(
            service.transfer(players[0].id, players[1].id, 1, "debt"),
            Err(ServiceError::InsufficientFunds { .. })
        ));
    }
}
