//! Peripheral drivers for the i.MX RT 10xx chip family.
//!
//! Covers the pieces the LPSPI stack needs: the clock controller module
//! (CCM), the eDMA controller and its multiplexer, and the LPSPI serial
//! peripheral itself.

#![no_std]

pub mod ccm;
pub mod dma;
pub mod lpspi;
