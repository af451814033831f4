//! # Kernel synchronization primitives
//!
//! The single mutual-exclusion primitive used by the memory subsystem: a
//! busy-waiting [`SpinLock`] with an RAII guard. Critical sections in this
//! workspace are tiny (a counter read-modify-write or a list-head swap), so
//! brief spinning beats any blocking scheme; there is no scheduler to yield
//! to at the layers where these locks run.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod spin_lock;

pub use spin_lock::{SpinLock, SpinLockGuard};
