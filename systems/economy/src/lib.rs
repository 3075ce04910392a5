#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Coin ledger that funds cannon placement.
//!
//! Every balance mutation broadcasts [`Event::CoinsChanged`]. Coins may be set
//! aside with a [`Hold`] while a placement preview is pending; held coins stay
//! in the balance but are no longer available to other purchases. A reset
//! bumps the ledger epoch so holds taken before it can never be committed.

use cannon_defence_core::Event;
use thiserror::Error;
use tracing::debug;

/// Errors reported by [`Ledger`] operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LedgerError {
    /// The available balance cannot cover the requested amount.
    #[error("requested {requested} coins but only {available} are available")]
    Insufficient {
        /// Amount the caller attempted to spend or hold.
        requested: u32,
        /// Coins available when the request was made.
        available: u32,
    },
    /// The hold was taken before the most recent reset.
    #[error("hold was invalidated by a ledger reset")]
    StaleHold,
}

/// Coins set aside for a pending purchase.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "holds must be committed or released"]
pub struct Hold {
    amount: u32,
    epoch: u32,
}

impl Hold {
    /// Coins covered by the hold.
    #[must_use]
    pub const fn amount(&self) -> u32 {
        self.amount
    }
}

/// Authoritative coin balance of a level.
#[derive(Debug)]
pub struct Ledger {
    balance: u32,
    starting: u32,
    held: u32,
    epoch: u32,
}

impl Ledger {
    /// Creates a ledger holding `starting` coins.
    #[must_use]
    pub const fn new(starting: u32) -> Self {
        Self {
            balance: starting,
            starting,
            held: 0,
            epoch: 0,
        }
    }

    /// Coins owned, including those set aside by holds.
    #[must_use]
    pub const fn balance(&self) -> u32 {
        self.balance
    }

    /// Coins not covered by an outstanding hold.
    #[must_use]
    pub const fn available(&self) -> u32 {
        self.balance.saturating_sub(self.held)
    }

    /// Coins currently covered by outstanding holds.
    #[must_use]
    pub const fn held(&self) -> u32 {
        self.held
    }

    /// Balance restored by [`Ledger::reset`].
    #[must_use]
    pub const fn starting(&self) -> u32 {
        self.starting
    }

    /// Reports whether `amount` coins are available.
    #[must_use]
    pub const fn has_enough(&self, amount: u32) -> bool {
        amount <= self.available()
    }

    /// Credits `amount` coins.
    pub fn add(&mut self, amount: u32, out: &mut Vec<Event>) {
        self.balance = self.balance.saturating_add(amount);
        debug!(amount, balance = self.balance, "coins added");
        self.notify(out);
    }

    /// Debits `amount` coins, leaving the balance untouched on failure.
    pub fn spend(&mut self, amount: u32, out: &mut Vec<Event>) -> Result<(), LedgerError> {
        self.ensure_available(amount)?;
        self.balance -= amount;
        debug!(amount, balance = self.balance, "coins spent");
        self.notify(out);
        Ok(())
    }

    /// Sets `amount` coins aside for a later [`Ledger::commit`].
    pub fn hold(&mut self, amount: u32) -> Result<Hold, LedgerError> {
        self.ensure_available(amount)?;
        self.held += amount;
        Ok(Hold {
            amount,
            epoch: self.epoch,
        })
    }

    /// Debits the coins covered by `hold`.
    pub fn commit(&mut self, hold: Hold, out: &mut Vec<Event>) -> Result<(), LedgerError> {
        if hold.epoch != self.epoch {
            return Err(LedgerError::StaleHold);
        }
        self.held -= hold.amount;
        self.balance -= hold.amount;
        debug!(amount = hold.amount, balance = self.balance, "hold committed");
        self.notify(out);
        Ok(())
    }

    /// Returns the coins covered by `hold` to the available balance.
    ///
    /// Holds from before the last reset are discarded silently.
    pub fn release_hold(&mut self, hold: Hold) {
        if hold.epoch == self.epoch {
            self.held -= hold.amount;
        }
    }

    /// Restores the starting balance and invalidates every outstanding hold.
    pub fn reset(&mut self, out: &mut Vec<Event>) {
        self.balance = self.starting;
        self.held = 0;
        self.epoch = self.epoch.wrapping_add(1);
        debug!(balance = self.balance, "ledger reset");
        self.notify(out);
    }

    fn ensure_available(&self, amount: u32) -> Result<(), LedgerError> {
        if self.has_enough(amount) {
            Ok(())
        } else {
            Err(LedgerError::Insufficient {
                requested: amount,
                available: self.available(),
            })
        }
    }

    fn notify(&self, out: &mut Vec<Event>) {
        out.push(Event::CoinsChanged {
            balance: self.balance,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spend_debits_and_notifies() {
        let mut ledger = Ledger::new(100);
        let mut events = Vec::new();

        ledger.spend(40, &mut events).unwrap();

        assert_eq!(ledger.balance(), 60);
        assert_eq!(events, vec![Event::CoinsChanged { balance: 60 }]);
    }

    #[test]
    fn overspend_fails_without_side_effects() {
        let mut ledger = Ledger::new(30);
        let mut events = Vec::new();

        let error = ledger.spend(50, &mut events).unwrap_err();

        assert_eq!(
            error,
            LedgerError::Insufficient {
                requested: 50,
                available: 30,
            }
        );
        assert_eq!(ledger.balance(), 30);
        assert!(events.is_empty());
    }

    #[test]
    fn holds_reduce_available_but_not_balance() {
        let mut ledger = Ledger::new(100);
        let mut events = Vec::new();

        let hold = ledger.hold(70).unwrap();
        assert_eq!(ledger.balance(), 100);
        assert_eq!(ledger.available(), 30);
        assert!(ledger.spend(40, &mut events).is_err());

        ledger.release_hold(hold);
        assert_eq!(ledger.available(), 100);
        assert!(events.is_empty());
    }

    #[test]
    fn commit_debits_held_coins() {
        let mut ledger = Ledger::new(100);
        let mut events = Vec::new();

        let hold = ledger.hold(60).unwrap();
        ledger.commit(hold, &mut events).unwrap();

        assert_eq!(ledger.balance(), 40);
        assert_eq!(ledger.held(), 0);
        assert_eq!(events, vec![Event::CoinsChanged { balance: 40 }]);
    }

    #[test]
    fn reset_invalidates_outstanding_holds() {
        let mut ledger = Ledger::new(100);
        let mut events = Vec::new();

        let hold = ledger.hold(50).unwrap();
        ledger.add(25, &mut events);
        ledger.reset(&mut events);

        assert_eq!(ledger.balance(), 100);
        assert_eq!(ledger.available(), 100);
        assert_eq!(ledger.commit(hold, &mut events), Err(LedgerError::StaleHold));
        assert_eq!(ledger.balance(), 100);
        assert_eq!(
            events,
            vec![
                Event::CoinsChanged { balance: 125 },
                Event::CoinsChanged { balance: 100 },
            ]
        );
    }

    #[test]
    fn add_saturates() {
        let mut ledger = Ledger::new(u32::MAX - 1);
        let mut events = Vec::new();
        ledger.add(10, &mut events);
        assert_eq!(ledger.balance(), u32::MAX);
    }
}
