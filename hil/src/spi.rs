// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Interfaces for SPI controller (master) and peripheral (slave)
//! communication.
//!
//! We use the terms master/slave in some situations because the term
//! peripheral can also refer to a hardware peripheral (e.g., memory-mapped
//! I/O devices in ARM are called peripherals).
//!
//! Transfers are split-phase: `read_write_bytes` returns immediately and the
//! driver calls the client's `read_write_done` from interrupt context once
//! the bytes have moved. Either buffer may be absent: a missing read buffer
//! discards incoming bytes, a missing write buffer clocks out fill data
//! (master) or tristates the data-out pin (slave).

use crate::ErrorCode;

/// Data order defines the order of bits sent over the wire: most significant
/// first, or least significant first.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DataOrder {
    /// Send the most significant bit first.
    MSBFirst,
    /// Send the least significant bit first.
    LSBFirst,
}

/// Clock polarity (CPOL) defines whether the SPI clock is high or low when
/// idle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClockPolarity {
    /// The clock is low when the SPI bus is not active. This is CPOL = 0.
    IdleLow,
    /// The clock is high when the SPI bus is not active. This is CPOL = 1.
    IdleHigh,
}

/// Clock phase (CPHA) defines whether to sample and send data on a leading or
/// trailing clock edge.
///
/// Consult a SPI reference on how CPHA interacts with CPOL.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClockPhase {
    /// Sample on the leading clock edge. This is CPHA = 0.
    SampleLeading,
    /// Sample on the trailing clock edge. This is CPHA = 1.
    SampleTrailing,
}

/// Trait for clients of a SPI bus in master mode.
pub trait SpiMasterClient {
    /// Callback issued when a transfer completes.
    ///
    /// The buffers passed to [`SpiMaster::read_write_bytes`] are returned
    /// here, along with the number of bytes moved and the transfer status.
    /// `status` is `Err(ErrorCode::CANCEL)` for an aborted transfer and
    /// `Err(ErrorCode::FAIL)` if data was lost mid-transfer.
    fn read_write_done(
        &self,
        write_buffer: Option<&'static mut [u8]>,
        read_buffer: Option<&'static mut [u8]>,
        len: usize,
        status: Result<(), ErrorCode>,
    );
}

/// Trait for interacting with SPI peripheral devices at a byte or buffer
/// level, when the hardware is the bus master.
///
/// Configuration calls (rate, polarity, phase, chip select) apply to
/// subsequent transfers and must not be issued while a transfer is in
/// flight.
pub trait SpiMaster<'a> {
    /// Chip select identifier, specific to a controller implementation.
    type ChipSelect: Copy;

    /// Set up the peripheral for master operation.
    fn init(&self) -> Result<(), ErrorCode>;

    /// Register the completion client.
    fn set_client(&self, client: &'a dyn SpiMasterClient);

    /// Returns `true` while a transfer is in flight.
    fn is_busy(&self) -> bool;

    /// Perform an asynchronous read/write operation.
    ///
    /// At least one of `write_buffer` and `read_buffer` must be present, and
    /// `len` bytes will be clocked in each provided direction. On error the
    /// buffers are handed back immediately with the reason:
    /// `BUSY` if a transfer is in flight, `INVAL` if `len` does not satisfy
    /// the frame-size rules or both buffers are absent, `SIZE` if `len`
    /// exceeds a buffer.
    fn read_write_bytes(
        &self,
        write_buffer: Option<&'static mut [u8]>,
        read_buffer: Option<&'static mut [u8]>,
        len: usize,
    ) -> Result<
        (),
        (
            ErrorCode,
            Option<&'static mut [u8]>,
            Option<&'static mut [u8]>,
        ),
    >;

    /// Synchronously write a single byte, discarding the response.
    fn write_byte(&self, val: u8) -> Result<(), ErrorCode>;

    /// Synchronously read a single byte, writing fill data.
    fn read_byte(&self) -> Result<u8, ErrorCode>;

    /// Synchronously exchange a single byte.
    fn read_write_byte(&self, val: u8) -> Result<u8, ErrorCode>;

    /// Select the chip select line to assert for subsequent transfers.
    fn specify_chip_select(&self, cs: Self::ChipSelect) -> Result<(), ErrorCode>;

    /// Set the clock rate in Hz. Returns the actual rate set, which does not
    /// exceed the requested rate.
    fn set_rate(&self, rate: u32) -> Result<u32, ErrorCode>;
    fn get_rate(&self) -> u32;

    fn set_polarity(&self, polarity: ClockPolarity) -> Result<(), ErrorCode>;
    fn get_polarity(&self) -> ClockPolarity;

    fn set_phase(&self, phase: ClockPhase) -> Result<(), ErrorCode>;
    fn get_phase(&self) -> ClockPhase;

    /// Hold the chip select line asserted across subsequent transfers
    /// (continuous chip select).
    fn hold_low(&self);

    /// Deassert the chip select line at the end of each transfer.
    fn release_low(&self);
}

/// Trait for clients of a SPI bus in peripheral (slave) mode.
pub trait SpiSlaveClient {
    /// Callback issued when the master asserts this peripheral's chip select.
    fn chip_selected(&self);

    /// Callback issued when a transfer completes. Mirrors
    /// [`SpiMasterClient::read_write_done`].
    fn read_write_done(
        &self,
        write_buffer: Option<&'static mut [u8]>,
        read_buffer: Option<&'static mut [u8]>,
        len: usize,
        status: Result<(), ErrorCode>,
    );
}

/// Trait for responding to transfers initiated by a remote bus master.
pub trait SpiSlave<'a> {
    /// Set up the peripheral for slave operation.
    fn init(&self) -> Result<(), ErrorCode>;

    /// Returns `true` if a client is registered.
    fn has_client(&self) -> bool;

    /// Register (or clear) the completion client.
    fn set_client(&self, client: Option<&'a dyn SpiSlaveClient>);

    /// Queue buffers for the next transfer clocked by the remote master.
    ///
    /// An absent `write_buffer` tristates the data-out pin; an absent
    /// `read_buffer` discards incoming bytes. The same validation rules as
    /// [`SpiMaster::read_write_bytes`] apply.
    fn read_write_bytes(
        &self,
        write_buffer: Option<&'static mut [u8]>,
        read_buffer: Option<&'static mut [u8]>,
        len: usize,
    ) -> Result<
        (),
        (
            ErrorCode,
            Option<&'static mut [u8]>,
            Option<&'static mut [u8]>,
        ),
    >;

    fn set_polarity(&self, polarity: ClockPolarity) -> Result<(), ErrorCode>;
    fn get_polarity(&self) -> ClockPolarity;

    fn set_phase(&self, phase: ClockPhase) -> Result<(), ErrorCode>;
    fn get_phase(&self) -> ClockPhase;
}
