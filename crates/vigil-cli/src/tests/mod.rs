//! Test suites for the Vigil CLI runtime.

mod support;
