//! Timeout guard and leak detector, alone and composed

mod guard;
mod leaks;
