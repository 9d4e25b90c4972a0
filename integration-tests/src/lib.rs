//! End-to-end scenarios for the assembled service live in `tests/`.
