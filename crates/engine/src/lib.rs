//! Settlement engine for shared trip expenses.
//!
//! The pure part of the crate validates expense splits ([`validate_split`]),
//! folds a trip's expenses into net balances ([`trip_balances`]) and turns
//! those balances into pairwise ledger deltas ([`LedgerPatch`]). [`Engine`]
//! wires them to an injected [`TripStore`] and [`MemberDirectory`].
pub use balances::{TripBalances, trip_balances};
pub use error::{EngineError, StoreSource};
pub use ids::{ExpenseId, MemberId, TripId};
pub use ledger::{GlobalLedger, LedgerPatch};
pub use money::MoneyCents;
pub use ops::{Engine, EngineBuilder, EngineConfig, ExpenseDraft, LedgerLine, LedgerView, TripCreated};
pub use session::{Session, SessionContext};
pub use split::{DEFAULT_SPLIT_TOLERANCE, ValidatedSplit, split_evenly, validate_split};
pub use store::{
    MemberDirectory, MemoryStore, StoreError, StoreOp, StoreResult, StoreSnapshot, TripStore,
    UserDocument,
};
pub use trip::{Expense, Member, Trip, TripStatus};

mod balances;
mod error;
mod ids;
mod ledger;
mod money;
mod ops;
mod session;
mod split;
pub mod store;
mod trip;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
