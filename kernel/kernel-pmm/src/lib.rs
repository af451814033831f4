//! # Physical Memory Manager
//!
//! Reference-counted allocator for 4 KiB physical page frames, the layer the
//! virtual memory subsystem sits on. It tracks which frames are free, hands
//! them out one at a time, and lets several owners share one frame (e.g.
//! copy-on-write mappings) by deferring reclamation until the last owner
//! releases it.
//!
//! ## Architecture Overview
//!
//! Two cooperating pieces of state with independent lock domains:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              FrameAllocator                         │
//! │                                                     │
//! │  ┌──────────────────────┐  ┌─────────────────────┐  │
//! │  │ Reference-Count Table│  │ Free Stack          │  │
//! │  │ one SpinLock<u32>    │  │ head + index links, │  │
//! │  │ per frame            │  │ one SpinLock total  │  │
//! │  └──────────────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Count locks are per frame, so updates to distinct frames never contend.
//! The free stack serializes on its single lock, which is fine: pushes and
//! pops are O(1) head swaps. Neither lock is ever taken while the other is
//! held, so there is no ordering to get wrong.
//!
//! ## Frame Lifecycle
//!
//! ```text
//! RESERVED (count=1, boot) ──release──▶ FREE (count=0, on stack)
//!                                        │  ▲
//!                                 allocate  │ last free
//!                                        ▼  │
//!                      ALLOCATED (count=1) ──add_ref──▶ SHARED (count>1)
//! ```
//!
//! Every frame starts at count 1, owned by the boot identity; initialization
//! releases the usable range through the ordinary free path, which both
//! seeds the free stack and drives the counts to 0. Frames below the kernel
//! image never get released and stay reserved forever.
//!
//! ## Usage
//!
//! ```ignore
//! use kernel_pmm::{FrameAllocator, HhdmPhysMapper, PhysMemoryLayout};
//!
//! let layout = PhysMemoryLayout::new(kernel_end, phys_top)?;
//! let pmm = FrameAllocator::new(layout, HhdmPhysMapper::new(HHDM_BASE));
//!
//! let frame = pmm.allocate()?;       // count == 1
//! pmm.add_ref(frame);                // share it: count == 2
//! pmm.free(frame);                   // still live elsewhere
//! pmm.free(frame);                   // last owner: reclaimed
//! ```
//!
//! Exhaustion is the only recoverable failure ([`OutOfFrames`]). Everything
//! else (misaligned or out-of-range frees, double frees, count overflow) is
//! a caller bug and panics with a diagnostic rather than corrupting the
//! pool.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code, clippy::cast_possible_truncation)]

extern crate alloc;

mod free_list;
mod refcount;

pub mod frame_alloc;
pub mod layout;
pub mod phys_mapper;

pub use frame_alloc::{FrameAllocator, OutOfFrames, POISON_ALLOC, POISON_FREE};
pub use layout::{LayoutError, PhysMemoryLayout};
pub use phys_mapper::{HhdmPhysMapper, PhysMapper};
