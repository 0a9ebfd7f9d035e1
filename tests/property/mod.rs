//! Property-based tests for freezing and fingerprint determinism

mod determinism;
