// Business logic services layer
//
// Reusable pieces of the reconciliation engine that do not depend on a
// particular report layout.

pub mod classify;
pub mod normalize;
pub mod tally;
