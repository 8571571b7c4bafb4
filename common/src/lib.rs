//! Small, dependency-light primitives shared by `arrayd-core` and `arrayd-server`.

pub mod state_machine;
