// Join Operators Module
//
// Joins are cross products filtered afterwards by the residual predicate, so
// the only join operator is the lazy nested loop.

mod nested_loop;

pub use self::nested_loop::NestedLoopJoin;
