use std::sync::Arc;

use crate::{
    app::ServiceResult,
    store::{BankStore, PlayerId},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Settlement {
    /// The player ends up with more than they started with.
    Receives(i64),
    /// The player lost money and has to pay the difference.
    Pays(i64),
    Even,
}

impl Settlement {
    pub fn from_delta(delta: i64) -> Self {
        match delta {
            d if d > 0 => Settlement::Receives(d),
            d if d < 0 => Settlement::Pays(-d),
            _ => Settlement::Even,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementLine {
    pub player_id: PlayerId,
    pub name: String,
    pub balance: i64,
    pub delta: i64,
    pub settlement: Settlement,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementReport {
    pub initial_balance: i64,
    pub lines: Vec<SettlementLine>,
    pub total_to_receive: i64,
    pub total_to_pay: i64,
}

pub trait ReportService {
    fn settlement_report(&self) -> ServiceResult<SettlementReport>;
}

pub struct ReportServiceImpl {
    store: Arc<BankStore>,
}

impl ReportServiceImpl {
    pub fn new(store: Arc<BankStore>) -> Self {
        Self { store }
    }
}

impl ReportService for ReportServiceImpl {
    fn settlement_report(&self) -> ServiceResult<SettlementReport> {
        self.store.read(|state| {
            let initial_balance = state.settings.initial_balance;
            let lines: Vec<SettlementLine> = state
                .players
                .values()
                .map(|p| {
                    let delta = p.balance - initial_balance;
                    SettlementLine {
                        player_id: p.id,
                        name: p.name.clone(),
                        balance: p.balance,
                        delta,
                        settlement: Settlement::from_delta(delta),
                    }
                })
                .collect();

            let mut total_to_receive = 0;
            let mut total_to_pay = 0;
            for line in &lines {
                match line.settlement {
                    Settlement::Receives(amount) => total_to_receive += amount,
                    Settlement::Pays(amount) => total_to_pay += amount,
                    Settlement::Even => {}
                }
            }

            SettlementReport {
                initial_balance,
                lines,
                total_to_receive,
                total_to_pay,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settlement_classification() {
        assert_eq!(Settlement::from_delta(30), Settlement::Receives(30));
        assert_eq!(Settlement::from_delta(-30), Settlement::Pays(30));
        assert_eq!(Settlement::from_delta(0), Settlement::Even);
    }

    #[test]
    fn test_report_against_current_initial_balance() {
        let store = Arc::new(BankStore::new(100));
        store
            .write(|s| {
                s.create_player("Alice".into(), String::new(), 70);
                s.create_player("Bob".into(), String::new(), 130);
                s.create_player("Carol".into(), String::new(), 100);
            })
            .unwrap();
        let service = ReportServiceImpl::new(store.clone());

        let report = service.settlement_report().unwrap();
        assert_eq!(report.initial_balance, 100);
        let settlements: Vec<_> = report
            .lines
            .iter()
            .map(|l| (l.name.as_str(), l.settlement))
            .collect();
        assert_eq!(
            settlements,
            vec![
                ("Alice", Settlement::Pays(30)),
                ("Bob", Settlement::Receives(30)),
                ("Carol", Settlement::Even),
            ]
        );
        assert_eq!(report.total_to_pay, 30);
        assert_eq!(report.total_to_receive, 30);

        // Derived on every call, so a settings change shows up immediately.
        store.write(|s| s.settings.initial_balance = 50).unwrap();
        let report = service.settlement_report().unwrap();
        assert!(
            report
                .lines
                .iter()
                .all(|l| matches!(l.settlement, Settlement::Receives(_)))
        );
    }
}
