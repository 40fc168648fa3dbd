//! Pure domain types. No IO, no framework types.

mod money;
mod transfer;
mod wallet;

pub use money::{Currency, Money};
pub use transfer::{TransferId, TransferRecord, TransferStatus};
pub use wallet::{Wallet, WalletId};
