//! The hazard catalog under the harness

mod polarity;
