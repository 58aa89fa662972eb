/// An opaque capability handed to repository calls that must be grouped into
/// one atomic unit (cascade delete of a recurrence; "delete override, create
/// exception").
///
/// Deliberately empty: `calvirt-domain`/`calvirt-engine` never inspect a
/// transaction context, they only thread it through -- the concrete backend
/// downcasts its own handle out of the trait object. This mirrors
/// `shuriken_db::db::transaction::with_transaction`'s closure-scoped
/// transaction but generalized to a handle, since this crate must not depend
/// on any concrete database crate to describe the contract.
///
/// Lifecycle (`active -> committed | rolled-back`) is owned entirely by the
/// caller; the engine never commits or rolls back a transaction itself (see
/// `spec.md` §5).
pub trait TransactionContext: Send + Sync {
    /// Lets a concrete backend recover its own handle type out of the trait
    /// object, e.g. `tx.as_any().downcast_ref::<PgTransaction>()`.
    fn as_any(&self) -> &dyn std::any::Any;
}
