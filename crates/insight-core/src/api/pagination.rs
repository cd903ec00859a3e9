use tracing::debug;

use crate::error::InsightError;
use crate::types::{Transaction, TransactionPage};

use super::client::{join_addresses, InsightClient};

/// Window width used when walking a full transaction history.
pub const PAGE_SIZE: u64 = 50;

/// Half-open index range `[from, to)` of an `addrs/{..}/txs` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub from: u64,
    pub to: u64,
}

impl PageWindow {
    pub const FIRST: PageWindow = PageWindow {
        from: 0,
        to: PAGE_SIZE,
    };

    pub fn new(from: u64, to: u64) -> Self {
        Self { from, to }
    }

    /// Shift both ends forward by [`PAGE_SIZE`].
    pub fn advance(self) -> Self {
        Self {
            from: self.from.saturating_add(PAGE_SIZE),
            to: self.to.saturating_add(PAGE_SIZE),
        }
    }
}

impl Default for PageWindow {
    fn default() -> Self {
        Self::FIRST
    }
}

impl InsightClient {
    /// One window of the transactions touching any of `addresses`.
    pub async fn get_transactions_for_addresses<S: AsRef<str>>(
        &self,
        addresses: &[S],
        window: PageWindow,
    ) -> Result<TransactionPage, InsightError> {
        let joined = join_addresses(addresses)?;
        if window.from > window.to {
            return Err(InsightError::Param(format!(
                "page start {} is after its end {}",
                window.from, window.to
            )));
        }
        let path = format!("addrs/{joined}/txs?from={}&to={}", window.from, window.to);
        self.get_decoded(&path, "TransactionPage", TransactionPage::from_json)
            .await
    }

    /// Every transaction touching any of `addresses`, fetched in
    /// [`PAGE_SIZE`] windows and concatenated in server order.
    pub async fn get_all_transactions_for_addresses<S: AsRef<str>>(
        &self,
        addresses: &[S],
    ) -> Result<Vec<Transaction>, InsightError> {
        self.get_all_transactions_for_addresses_from(addresses, PageWindow::FIRST)
            .await
    }

    /// Like [`get_all_transactions_for_addresses`], starting at `window`.
    ///
    /// Stops once the server reports an effective end at or beyond its
    /// total. Any failed page aborts the whole listing.
    ///
    /// [`get_all_transactions_for_addresses`]: Self::get_all_transactions_for_addresses
    pub async fn get_all_transactions_for_addresses_from<S: AsRef<str>>(
        &self,
        addresses: &[S],
        window: PageWindow,
    ) -> Result<Vec<Transaction>, InsightError> {
        if window.from >= window.to {
            return Err(InsightError::Param(format!(
                "page window [{}, {}) is empty",
                window.from, window.to
            )));
        }

        let mut window = window;
        let mut transactions = Vec::new();
        loop {
            let page = self.get_transactions_for_addresses(addresses, window).await?;
            debug!(
                from = page.from,
                to = page.to,
                total = page.total_items,
                items = page.items.len(),
                "fetched transaction page"
            );
            let done = page.to >= page.total_items;
            transactions.extend(page.items);
            if done {
                return Ok(transactions);
            }
            window = window.advance();
        }
    }
}
