//! Domain types: chains, arguments, auxiliary info and coercion

pub mod argument;
pub mod chain;
pub mod coerce;
pub mod info;

pub use argument::{ArgValue, Argument, ArgumentModel, ArgumentModelError};
pub use chain::Chain;
pub use coerce::{coerce, coerce_value, Coercer, CoercionError, NativeValue, Structured};
pub use info::{AuxiliaryInfo, InfoEntry, InfoFamily, InfoFormat, InfoGroup};
