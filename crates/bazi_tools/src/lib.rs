#![forbid(unsafe_code)]

pub mod chart_cli;
