mod build_tests;
mod check_tests;
mod common;
mod consolidate_tests;
mod plan_tests;
