//! Pattern registry and the rule system.
//!
//! Rules are bound to nesting patterns such as `config/servers/server` or
//! `*/server`. The digester looks up the rules matching every element it
//! sees and fires their hooks; the built-in rules in [`handlers`] create
//! objects, set properties, call methods and link children to parents.

mod core;
mod handler;
pub mod handlers;
mod types;

pub use core::Rules;
pub use handler::{Rule, RuleSet};
pub use types::{
    Attributes, BodyTextStack, MatchTracker, ObjectStack, Param, ParamFrame, ParamStack,
};
