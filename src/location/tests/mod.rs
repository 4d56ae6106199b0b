//! Unit tests for the location module.

mod listing;
