//! Shared test support and end-to-end pipeline tests.
