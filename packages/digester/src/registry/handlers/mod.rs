//! Built-in rules.

mod call;
mod create;
mod next;
mod property;

pub use call::{CallMethodRule, CallParamRule};
pub use create::{FactoryCreateRule, ObjectCreateRule, ObjectCreationFactory};
pub use next::SetNextRule;
pub use property::{SetPropertiesRule, SetPropertyRule};
