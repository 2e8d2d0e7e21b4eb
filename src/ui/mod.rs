//! UI layer: the scripted replay front end and its text report.

pub mod replay;
pub mod report;
