//! Downstream subscribers of a concatenated view.

use livelist_model::{ChangeEvent, Result, Transaction};

/// Receives the transactions of a view.
///
/// The default [`on_transaction`](ViewListener::on_transaction) brackets the
/// events with [`begin`](ViewListener::begin) and [`end`](ViewListener::end).
/// Any error is returned to whoever mutated the source.
pub trait ViewListener<E> {
    fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    fn on_event(&mut self, _event: &ChangeEvent<E>) -> Result<()> {
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        Ok(())
    }

    fn on_transaction(&mut self, transaction: &Transaction<E>) -> Result<()> {
        self.begin()?;
        for event in transaction {
            self.on_event(event)?;
        }
        self.end()
    }
}

/// Adapts a closure over whole transactions into a [`ViewListener`].
pub struct FnListener<F>(pub F);

impl<E, F> ViewListener<E> for FnListener<F>
where
    F: FnMut(&Transaction<E>) -> Result<()>,
{
    fn on_transaction(&mut self, transaction: &Transaction<E>) -> Result<()> {
        (self.0)(transaction)
    }
}

/// Records every transaction and keeps a materialized copy of the view.
#[derive(Debug, Clone)]
pub struct Recorder<E> {
    transactions: Vec<Transaction<E>>,
    current: Option<Transaction<E>>,
    mirror: Vec<E>,
}

impl<E> Default for Recorder<E> {
    fn default() -> Self {
        Self {
            transactions: Vec::new(),
            current: None,
            mirror: Vec::new(),
        }
    }
}

impl<E> Recorder<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completed transactions, oldest first.
    pub fn transactions(&self) -> &[Transaction<E>] {
        &self.transactions
    }

    pub fn last(&self) -> Option<&Transaction<E>> {
        self.transactions.last()
    }

    /// All recorded events across transactions, in delivery order.
    pub fn events(&self) -> impl Iterator<Item = &ChangeEvent<E>> + '_ {
        self.transactions.iter().flat_map(Transaction::iter)
    }

    /// The view contents as replayed from the recorded events.
    pub fn mirror(&self) -> &[E] {
        &self.mirror
    }

    /// Forget recorded transactions, keeping the mirror.
    pub fn clear(&mut self) {
        self.transactions.clear();
    }
}

impl<E: Clone> ViewListener<E> for Recorder<E> {
    fn begin(&mut self) -> Result<()> {
        self.current = Some(Transaction::new());
        Ok(())
    }

    fn on_event(&mut self, event: &ChangeEvent<E>) -> Result<()> {
        event.apply_to(&mut self.mirror)?;
        self.current
            .get_or_insert_with(Transaction::new)
            .push(event.clone());
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if let Some(transaction) = self.current.take() {
            self.transactions.push(transaction);
        }
        Ok(())
    }
}
