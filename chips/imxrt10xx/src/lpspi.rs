//! Low Power Serial Peripheral Interface (LPSPI).
//!
//! Supports controller (master) and peripheral (slave) operation. A transfer
//! moves `len` bytes in each direction; either buffer may be absent. Missing
//! transmit data is replaced with a configurable fill byte (master) or masks
//! the data-out pin (slave), and missing receive data is discarded without
//! entering the receive FIFO.
//!
//! Three execution strategies share one hardware setup path:
//!
//! - busy-wait, used for the synchronous single-byte operations,
//! - interrupt driven, filling and draining the FIFOs from `handle_interrupt`,
//! - eDMA driven, used automatically for 8-bit frames once the board assigns
//!   DMA channels with `set_tx_dma_channel` / `set_rx_dma_channel`.
//!
//! At most one transfer is in flight per instance. Completion is signaled
//! through the `hil::spi` client callbacks from interrupt context.

use core::cell::Cell;
use core::cmp;

use hil::platform::ClockInterface;
use hil::spi::{self, ClockPhase, ClockPolarity, DataOrder};
use hil::utilities::cells::{OptionalCell, TakeCell};
use hil::utilities::StaticRef;
use hil::ErrorCode;
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::registers::{ReadOnly, ReadWrite, WriteOnly};
use tock_registers::{register_bitfields, register_structs};

use crate::ccm;
use crate::dma;

register_structs! {
    /// LPSPI registers.
    LpspiRegisters {
        /// Version ID Register
        (0x00 => verid: ReadOnly<u32>),
        /// Parameter Register
        (0x04 => param: ReadOnly<u32, PARAM::Register>),
        (0x08 => _reserved0),
        /// Control Register
        (0x10 => cr: ReadWrite<u32, CR::Register>),
        /// Status Register
        (0x14 => sr: ReadWrite<u32, SR::Register>),
        /// Interrupt Enable Register
        (0x18 => ier: ReadWrite<u32, IER::Register>),
        /// DMA Enable Register
        (0x1C => der: ReadWrite<u32, DER::Register>),
        /// Configuration Register 0
        (0x20 => cfgr0: ReadWrite<u32, CFGR0::Register>),
        /// Configuration Register 1
        (0x24 => cfgr1: ReadWrite<u32, CFGR1::Register>),
        (0x28 => _reserved1),
        /// Data Match Register 0
        (0x30 => dmr0: ReadWrite<u32>),
        /// Data Match Register 1
        (0x34 => dmr1: ReadWrite<u32>),
        (0x38 => _reserved2),
        /// Clock Configuration Register
        (0x40 => ccr: ReadWrite<u32, CCR::Register>),
        (0x44 => _reserved3),
        /// FIFO Control Register
        (0x58 => fcr: ReadWrite<u32, FCR::Register>),
        /// FIFO Status Register
        (0x5C => fsr: ReadOnly<u32, FSR::Register>),
        /// Transmit Command Register
        (0x60 => tcr: ReadWrite<u32, TCR::Register>),
        /// Transmit Data Register
        (0x64 => tdr: WriteOnly<u32>),
        (0x68 => _reserved4),
        /// Receive Status Register
        (0x70 => rsr: ReadOnly<u32, RSR::Register>),
        /// Receive Data Register
        (0x74 => rdr: ReadOnly<u32>),
        (0x78 => @END),
    }
}

register_bitfields![u32,
    PARAM [
        /// Number of PCS pins supported
        PCSNUM OFFSET(16) NUMBITS(8) [],
        /// Receive FIFO size, expressed as 2^RXFIFO words
        RXFIFO OFFSET(8) NUMBITS(8) [],
        /// Transmit FIFO size, expressed as 2^TXFIFO words
        TXFIFO OFFSET(0) NUMBITS(8) []
    ],

    CR [
        /// Reset Receive FIFO
        RRF OFFSET(9) NUMBITS(1) [],
        /// Reset Transmit FIFO
        RTF OFFSET(8) NUMBITS(1) [],
        /// Debug Enable
        DBGEN OFFSET(3) NUMBITS(1) [],
        /// Doze Mode Enable
        DOZEN OFFSET(2) NUMBITS(1) [],
        /// Software Reset, resets all registers except this one
        RST OFFSET(1) NUMBITS(1) [],
        /// Module Enable
        MEN OFFSET(0) NUMBITS(1) []
    ],

    SR [
        /// Module Busy Flag
        MBF OFFSET(24) NUMBITS(1) [],
        /// Data Match Flag
        DMF OFFSET(13) NUMBITS(1) [],
        /// Receive Error Flag (receive FIFO overflow)
        REF OFFSET(12) NUMBITS(1) [],
        /// Transmit Error Flag (transmit FIFO underrun)
        TEF OFFSET(11) NUMBITS(1) [],
        /// Transfer Complete Flag
        TCF OFFSET(10) NUMBITS(1) [],
        /// Frame Complete Flag
        FCF OFFSET(9) NUMBITS(1) [],
        /// Word Complete Flag
        WCF OFFSET(8) NUMBITS(1) [],
        /// Receive Data Flag
        RDF OFFSET(1) NUMBITS(1) [],
        /// Transmit Data Flag
        TDF OFFSET(0) NUMBITS(1) []
    ],

    IER [
        /// Data Match Interrupt Enable
        DMIE OFFSET(13) NUMBITS(1) [],
        /// Receive Error Interrupt Enable
        REIE OFFSET(12) NUMBITS(1) [],
        /// Transmit Error Interrupt Enable
        TEIE OFFSET(11) NUMBITS(1) [],
        /// Transfer Complete Interrupt Enable
        TCIE OFFSET(10) NUMBITS(1) [],
        /// Frame Complete Interrupt Enable
        FCIE OFFSET(9) NUMBITS(1) [],
        /// Word Complete Interrupt Enable
        WCIE OFFSET(8) NUMBITS(1) [],
        /// Receive Data Interrupt Enable
        RDIE OFFSET(1) NUMBITS(1) [],
        /// Transmit Data Interrupt Enable
        TDIE OFFSET(0) NUMBITS(1) []
    ],

    DER [
        /// Receive Data DMA Enable
        RDDE OFFSET(1) NUMBITS(1) [],
        /// Transmit Data DMA Enable
        TDDE OFFSET(0) NUMBITS(1) []
    ],

    CFGR0 [
        /// Receive Data Match Only
        RDMO OFFSET(9) NUMBITS(1) [],
        /// Circular FIFO Enable
        CIRFIFO OFFSET(8) NUMBITS(1) [],
        /// Host Request Select
        HRSEL OFFSET(2) NUMBITS(1) [],
        /// Host Request Polarity
        HRPOL OFFSET(1) NUMBITS(1) [],
        /// Host Request Enable
        HREN OFFSET(0) NUMBITS(1) []
    ],

    CFGR1 [
        /// PCS Configuration
        PCSCFG OFFSET(27) NUMBITS(1) [],
        /// Output Config; retain or tristate the data line between frames
        OUTCFG OFFSET(26) NUMBITS(1) [],
        /// Pin Configuration
        PINCFG OFFSET(24) NUMBITS(2) [
            SdiInSdoOut = 0,
            SdiInSdiOut = 1,
            SdoInSdoOut = 2,
            SdoInSdiOut = 3
        ],
        /// Match Configuration
        MATCFG OFFSET(16) NUMBITS(3) [],
        /// Peripheral Chip Select Polarity, one bit per PCS, set = active high
        PCSPOL OFFSET(8) NUMBITS(4) [],
        /// No Stall; when set, FIFO underrun or overrun is a transfer error
        /// instead of a clock stall
        NOSTALL OFFSET(3) NUMBITS(1) [],
        /// Automatic PCS generation
        AUTOPCS OFFSET(2) NUMBITS(1) [],
        /// Sample Point; delayed sampling of incoming data
        SAMPLE OFFSET(1) NUMBITS(1) [],
        /// Master Mode
        MASTER OFFSET(0) NUMBITS(1) []
    ],

    CCR [
        /// SCK-to-PCS Delay
        SCKPCS OFFSET(24) NUMBITS(8) [],
        /// PCS-to-SCK Delay
        PCSSCK OFFSET(16) NUMBITS(8) [],
        /// Delay Between Transfers
        DBT OFFSET(8) NUMBITS(8) [],
        /// SCK Divider; SCK period is (SCKDIV + 2) prescaled clock cycles
        SCKDIV OFFSET(0) NUMBITS(8) []
    ],

    FCR [
        /// Receive FIFO Watermark; RDF asserts when the count exceeds this
        RXWATER OFFSET(16) NUMBITS(4) [],
        /// Transmit FIFO Watermark; TDF asserts at or below this count
        TXWATER OFFSET(0) NUMBITS(4) []
    ],

    FSR [
        /// Receive FIFO word count
        RXCOUNT OFFSET(16) NUMBITS(5) [],
        /// Transmit FIFO word count
        TXCOUNT OFFSET(0) NUMBITS(5) []
    ],

    TCR [
        /// Clock Polarity
        CPOL OFFSET(31) NUMBITS(1) [
            IdleLow = 0,
            IdleHigh = 1
        ],
        /// Clock Phase
        CPHA OFFSET(30) NUMBITS(1) [
            SampleLeading = 0,
            SampleTrailing = 1
        ],
        /// Prescaler Value, an index into the functional clock divide table
        PRESCALE OFFSET(27) NUMBITS(3) [],
        /// Peripheral Chip Select
        PCS OFFSET(24) NUMBITS(2) [],
        /// LSB First
        LSBF OFFSET(23) NUMBITS(1) [],
        /// Byte Swap within each transmit and receive word
        BYSW OFFSET(22) NUMBITS(1) [],
        /// Continuous Transfer; keeps PCS asserted between frames
        CONT OFFSET(21) NUMBITS(1) [],
        /// Continuing Command; clearing it ends a continuous transfer
        CONTC OFFSET(20) NUMBITS(1) [],
        /// Receive Data Mask; received data is discarded
        RXMSK OFFSET(19) NUMBITS(1) [],
        /// Transmit Data Mask; no data is loaded from the transmit FIFO
        TXMSK OFFSET(18) NUMBITS(1) [],
        /// Transfer Width (single, dual, or quad bit transfer)
        WIDTH OFFSET(16) NUMBITS(2) [],
        /// Frame Size in bits, minus one
        FRAMESZ OFFSET(0) NUMBITS(12) []
    ],

    RSR [
        /// Receive FIFO is empty
        RXEMPTY OFFSET(1) NUMBITS(1) [],
        /// Next receive word is the start of a frame
        SOF OFFSET(0) NUMBITS(1) []
    ]
];

const LPSPI1_BASE: StaticRef<LpspiRegisters> =
    unsafe { StaticRef::new(0x4039_4000 as *const LpspiRegisters) };
const LPSPI2_BASE: StaticRef<LpspiRegisters> =
    unsafe { StaticRef::new(0x4039_8000 as *const LpspiRegisters) };
const LPSPI3_BASE: StaticRef<LpspiRegisters> =
    unsafe { StaticRef::new(0x4039_C000 as *const LpspiRegisters) };
const LPSPI4_BASE: StaticRef<LpspiRegisters> =
    unsafe { StaticRef::new(0x403A_0000 as *const LpspiRegisters) };

/// Functional clock divide values selected by TCR\[PRESCALE\].
const PRESCALER_VALUES: [u32; 8] = [1, 2, 4, 8, 16, 32, 64, 128];

/// Largest DMA major loop count without channel linking.
const DMA_MAX_ITERATIONS: usize = 0x7FFF;

/// Peripheral chip select lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChipSelect {
    Pcs0 = 0,
    Pcs1 = 1,
    Pcs2 = 2,
    Pcs3 = 3,
}

/// Delay kinds programmable in the clock configuration register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferDelay {
    /// From PCS assertion to the first SCK edge.
    PcsToSck,
    /// From the last SCK edge to PCS deassertion.
    LastSckToPcs,
    /// Between the end of one transfer and the start of the next.
    BetweenTransfers,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TransferState {
    /// No transfer in flight.
    Idle,
    /// A transfer is in flight.
    Busy,
    /// A transfer is in flight and has lost data. Resolves to `Idle` when the
    /// transfer completes and the loss is reported to the client.
    Error,
}

/// Returns `true` if `len` is compatible with the configured frame size.
///
/// Frames up to 32 bits must repeat evenly into `len`. Larger frames span
/// multiple FIFO words: when the frame is a whole number of words, `len`
/// must hold whole frames; otherwise only a single frame can be described.
fn valid_transfer_len(len: usize, frame_bits: u32, has_tx: bool, has_rx: bool) -> bool {
    if len == 0 || (!has_tx && !has_rx) {
        return false;
    }
    let bytes_per_frame = frame_bits.div_ceil(8) as usize;
    if bytes_per_frame <= 4 {
        len % bytes_per_frame == 0
    } else if bytes_per_frame % 4 != 0 {
        len == bytes_per_frame
    } else {
        len % bytes_per_frame == 0
    }
}

/// Number of FIFO words a transfer of `len` bytes occupies.
///
/// Each frame takes `bytes_per_frame / 4` words, rounded up: the final word
/// of a frame wider than a word may carry fewer than four bytes.
fn words_per_transfer(len: usize, bytes_per_frame: usize) -> usize {
    (len / bytes_per_frame) * bytes_per_frame.div_ceil(4)
}

/// Receive watermark for the words still expected, or `None` when the
/// current watermark needs no change.
///
/// Once fewer words remain than the watermark, RDF would never assert
/// again; the watermark has to drop below the remaining count so the final
/// partial batch still raises it.
fn trimmed_rx_watermark(read_words_remaining: usize, current: usize) -> Option<usize> {
    if read_words_remaining <= current {
        Some(read_words_remaining.saturating_sub(1))
    } else {
        None
    }
}

/// Bytes moved by a DMA transfer whose major loop has `iterations_remaining`
/// left. DMA transfers move one byte per iteration.
fn dma_bytes_transferred(len: usize, iterations_remaining: u16) -> usize {
    len.saturating_sub(iterations_remaining as usize)
}

/// Pack up to four bytes into a FIFO word.
///
/// Bytes fill the word from the least significant byte up. With `byte_swap`
/// the order is reversed.
fn combine_write_data(bytes: &[u8], byte_swap: bool) -> u32 {
    let mut word: u32 = 0;
    if byte_swap {
        for &byte in bytes {
            word = (word << 8) | byte as u32;
        }
    } else {
        for (i, &byte) in bytes.iter().enumerate() {
            word |= (byte as u32) << (8 * i);
        }
    }
    word
}

/// Unpack a FIFO word into up to four bytes. Inverse of
/// `combine_write_data`.
fn separate_read_data(word: u32, bytes: &mut [u8], byte_swap: bool) {
    let count = bytes.len();
    for (i, byte) in bytes.iter_mut().enumerate() {
        let shift = if byte_swap { 8 * (count - 1 - i) } else { 8 * i };
        *byte = (word >> shift) as u8;
    }
}

/// Find the prescaler index and SCK divider that produce the baud rate
/// closest to `rate` without exceeding it.
///
/// Returns `(prescale, sckdiv, actual)`. When even the slowest setting is
/// above `rate`, the slowest setting is returned.
fn closest_baud(src_clock: u32, rate: u32) -> (u32, u32, u32) {
    let mut best_prescale = 7u32;
    let mut best_sckdiv = 255u32;
    let mut best_actual = src_clock / (PRESCALER_VALUES[7] * 257);
    let mut best_diff = u32::MAX;
    for (prescale, &divide) in PRESCALER_VALUES.iter().enumerate() {
        for sckdiv in 0..=255u32 {
            let actual = src_clock / (divide * (sckdiv + 2));
            if actual <= rate && rate - actual < best_diff {
                best_diff = rate - actual;
                best_prescale = prescale as u32;
                best_sckdiv = sckdiv;
                best_actual = actual;
                if best_diff == 0 {
                    return (best_prescale, best_sckdiv, best_actual);
                }
            }
        }
    }
    (best_prescale, best_sckdiv, best_actual)
}

/// Find the delay scaler whose delay is closest to `delay_ns` without going
/// under it.
///
/// `divided_clock` is the functional clock after the TCR prescaler. The
/// between-transfers delay counts one extra cycle; callers pass that as
/// `additional_scaler`. Returns `(scaler, actual_ns)`, saturating at the
/// largest scaler when the request is out of range.
fn closest_delay(divided_clock: u32, delay_ns: u32, additional_scaler: u32) -> (u32, u32) {
    let real = |scaler: u32| -> u64 {
        1_000_000_000u64 * (scaler as u64 + 1 + additional_scaler as u64) / divided_clock as u64
    };
    let initial = real(0);
    if initial >= delay_ns as u64 {
        return (0, initial as u32);
    }
    let mut best_scaler = 255u32;
    let mut best_real = real(255);
    for scaler in 1..255u32 {
        let actual = real(scaler);
        if actual >= delay_ns as u64 && actual < best_real {
            best_scaler = scaler;
            best_real = actual;
        }
    }
    (best_scaler, best_real as u32)
}

/// An LPSPI instance.
pub struct Lpspi<'a> {
    registers: StaticRef<LpspiRegisters>,
    clock: LpspiClock<'a>,
    ccm: &'a ccm::Ccm,

    master_client: OptionalCell<&'a dyn spi::SpiMasterClient>,
    slave_client: OptionalCell<&'a dyn spi::SpiSlaveClient>,

    state: Cell<TransferState>,
    tx_buffer: TakeCell<'static, [u8]>,
    rx_buffer: TakeCell<'static, [u8]>,
    /// Total byte count of the transfer in flight.
    transfer_size: Cell<usize>,
    /// Bytes not yet pushed into the transmit FIFO.
    tx_remaining: Cell<usize>,
    /// Bytes not yet pulled out of the receive FIFO. Zero for the whole
    /// transfer when receive data is discarded.
    rx_remaining: Cell<usize>,
    /// FIFO words not yet written. Tracks transmit progress in word units so
    /// the fill loop can bound how far it runs ahead of the reader.
    write_words_remaining: Cell<usize>,
    /// FIFO words not yet read.
    read_words_remaining: Cell<usize>,
    /// A continuous transfer ends with a command write that clears CONTC.
    /// Set when that write could not happen from the fill loop because the
    /// transmit FIFO was full.
    write_tcr_in_isr: Cell<bool>,

    chip_select: Cell<ChipSelect>,
    hold_pcs: Cell<bool>,
    byte_swap: Cell<bool>,
    frame_bits: Cell<u32>,
    baud_rate: Cell<u32>,
    dummy_byte: Cell<u8>,
    error_count: Cell<u32>,

    tx_dma_channel: OptionalCell<&'static dma::DmaChannel>,
    rx_dma_channel: OptionalCell<&'static dma::DmaChannel>,
    tx_dma_source: dma::DmaHardwareSource,
    rx_dma_source: dma::DmaHardwareSource,
    tx_dma_done: Cell<bool>,
    rx_dma_done: Cell<bool>,
    dma_in_flight: Cell<bool>,
}

impl<'a> Lpspi<'a> {
    pub const fn new_lpspi1(ccm: &'a ccm::Ccm) -> Self {
        Lpspi::new(
            LPSPI1_BASE,
            ccm,
            ccm::PeripheralClock::ccgr1(ccm, ccm::HCLK1::LPSPI1),
            dma::DmaHardwareSource::Lpspi1Transfer,
            dma::DmaHardwareSource::Lpspi1Receive,
        )
    }

    pub const fn new_lpspi2(ccm: &'a ccm::Ccm) -> Self {
        Lpspi::new(
            LPSPI2_BASE,
            ccm,
            ccm::PeripheralClock::ccgr1(ccm, ccm::HCLK1::LPSPI2),
            dma::DmaHardwareSource::Lpspi2Transfer,
            dma::DmaHardwareSource::Lpspi2Receive,
        )
    }

    pub const fn new_lpspi3(ccm: &'a ccm::Ccm) -> Self {
        Lpspi::new(
            LPSPI3_BASE,
            ccm,
            ccm::PeripheralClock::ccgr1(ccm, ccm::HCLK1::LPSPI3),
            dma::DmaHardwareSource::Lpspi3Transfer,
            dma::DmaHardwareSource::Lpspi3Receive,
        )
    }

    pub const fn new_lpspi4(ccm: &'a ccm::Ccm) -> Self {
        Lpspi::new(
            LPSPI4_BASE,
            ccm,
            ccm::PeripheralClock::ccgr1(ccm, ccm::HCLK1::LPSPI4),
            dma::DmaHardwareSource::Lpspi4Transfer,
            dma::DmaHardwareSource::Lpspi4Receive,
        )
    }

    const fn new(
        base: StaticRef<LpspiRegisters>,
        ccm: &'a ccm::Ccm,
        clock_gate: ccm::PeripheralClock<'a>,
        tx_dma_source: dma::DmaHardwareSource,
        rx_dma_source: dma::DmaHardwareSource,
    ) -> Self {
        Lpspi {
            registers: base,
            clock: LpspiClock(clock_gate),
            ccm,
            master_client: OptionalCell::empty(),
            slave_client: OptionalCell::empty(),
            state: Cell::new(TransferState::Idle),
            tx_buffer: TakeCell::empty(),
            rx_buffer: TakeCell::empty(),
            transfer_size: Cell::new(0),
            tx_remaining: Cell::new(0),
            rx_remaining: Cell::new(0),
            write_words_remaining: Cell::new(0),
            read_words_remaining: Cell::new(0),
            write_tcr_in_isr: Cell::new(false),
            chip_select: Cell::new(ChipSelect::Pcs0),
            hold_pcs: Cell::new(false),
            byte_swap: Cell::new(false),
            frame_bits: Cell::new(8),
            baud_rate: Cell::new(500_000),
            dummy_byte: Cell::new(0x00),
            error_count: Cell::new(0),
            tx_dma_channel: OptionalCell::empty(),
            rx_dma_channel: OptionalCell::empty(),
            tx_dma_source,
            rx_dma_source,
            tx_dma_done: Cell::new(false),
            rx_dma_done: Cell::new(false),
            dma_in_flight: Cell::new(false),
        }
    }

    /// Returns the interface that controls this instance's clock gate.
    pub fn clock(&self) -> &(impl ClockInterface + '_) {
        &self.clock
    }

    /// Assign a DMA channel for transmit.
    ///
    /// Once both channels are assigned, transfers with 8-bit frames move
    /// through DMA instead of the transmit and receive interrupts.
    pub fn set_tx_dma_channel(&'static self, dma_channel: &'static dma::DmaChannel) {
        dma_channel.set_client(self, self.tx_dma_source);
        dma_channel.set_interrupt_on_completion(true);
        dma_channel.set_disable_on_completion(true);
        // The transmit data register never changes address.
        unsafe { dma_channel.set_destination(&self.registers.tdr as *const _ as *const u8) };
        self.tx_dma_channel.set(dma_channel);
    }

    /// Assign a DMA channel for receive.
    pub fn set_rx_dma_channel(&'static self, dma_channel: &'static dma::DmaChannel) {
        dma_channel.set_client(self, self.rx_dma_source);
        dma_channel.set_interrupt_on_completion(true);
        dma_channel.set_disable_on_completion(true);
        // The receive data register never changes address.
        unsafe { dma_channel.set_source(&self.registers.rdr as *const _ as *const u8) };
        self.rx_dma_channel.set(dma_channel);
    }

    /// Number of slave FIFO underruns and overruns observed since boot.
    pub fn error_count(&self) -> u32 {
        self.error_count.get()
    }

    /// Bytes moved so far by the transfer in flight, or zero when idle.
    ///
    /// Progress follows the receive side when receive data is kept, since
    /// transmit runs ahead by up to a FIFO's depth.
    pub fn bytes_transferred(&self) -> usize {
        if self.state.get() == TransferState::Idle {
            return 0;
        }
        if self.dma_in_flight.get() {
            // The byte counters only move at completion under DMA; the
            // major loop count in the channel tracks live progress.
            let channel = if self.rx_buffer.is_some() {
                &self.rx_dma_channel
            } else {
                &self.tx_dma_channel
            };
            let remaining = channel.map_or(0, |channel| channel.iterations_remaining());
            return dma_bytes_transferred(self.transfer_size.get(), remaining);
        }
        let remaining = if self.rx_buffer.is_some() {
            self.rx_remaining.get()
        } else {
            self.tx_remaining.get()
        };
        self.transfer_size.get() - remaining
    }

    /// Swap byte order within each FIFO word of subsequent transfers.
    pub fn set_byte_swap(&self, swap: bool) {
        self.byte_swap.set(swap);
    }

    /// Set the fill byte clocked out when a transfer has no transmit buffer.
    pub fn set_dummy_byte(&self, byte: u8) {
        self.dummy_byte.set(byte);
    }

    /// Set the frame size in bits for subsequent transfers.
    ///
    /// Frames from 8 to 4096 bits are supported. Transfer lengths must
    /// satisfy `valid_transfer_len` for the configured size.
    pub fn set_frame_size(&self, bits: u32) -> Result<(), ErrorCode> {
        if !(8..=4096).contains(&bits) {
            return Err(ErrorCode::INVAL);
        }
        if self.state.get() != TransferState::Idle {
            return Err(ErrorCode::BUSY);
        }
        self.frame_bits.set(bits);
        self.registers.tcr.modify(TCR::FRAMESZ.val(bits - 1));
        Ok(())
    }

    /// Configured frame size in bits.
    pub fn get_frame_size(&self) -> u32 {
        self.frame_bits.get()
    }

    /// Shift data most or least significant bit first.
    pub fn set_bit_order(&self, order: DataOrder) -> Result<(), ErrorCode> {
        if self.state.get() != TransferState::Idle {
            return Err(ErrorCode::BUSY);
        }
        match order {
            DataOrder::MSBFirst => self.registers.tcr.modify(TCR::LSBF::CLEAR),
            DataOrder::LSBFirst => self.registers.tcr.modify(TCR::LSBF::SET),
        }
        Ok(())
    }

    pub fn get_bit_order(&self) -> DataOrder {
        if self.registers.tcr.is_set(TCR::LSBF) {
            DataOrder::LSBFirst
        } else {
            DataOrder::MSBFirst
        }
    }

    /// Program one of the three PCS/SCK delays, in nanoseconds.
    ///
    /// Returns the actual delay, which is at least the requested delay
    /// unless the request exceeds the longest programmable delay.
    pub fn set_delay_ns(&self, delay: TransferDelay, delay_ns: u32) -> Result<u32, ErrorCode> {
        if self.state.get() != TransferState::Idle {
            return Err(ErrorCode::BUSY);
        }
        let src_clock = self.ccm.lpspi_clock_frequency();
        if src_clock == 0 {
            return Err(ErrorCode::FAIL);
        }
        let prescale = self.registers.tcr.read(TCR::PRESCALE) as usize;
        let divided_clock = src_clock / PRESCALER_VALUES[prescale];
        let additional_scaler = matches!(delay, TransferDelay::BetweenTransfers) as u32;
        let (scaler, actual) = closest_delay(divided_clock, delay_ns, additional_scaler);
        // The clock configuration register is writable only while disabled.
        self.set_enable(false);
        match delay {
            TransferDelay::PcsToSck => self.registers.ccr.modify(CCR::PCSSCK.val(scaler)),
            TransferDelay::LastSckToPcs => self.registers.ccr.modify(CCR::SCKPCS.val(scaler)),
            TransferDelay::BetweenTransfers => self.registers.ccr.modify(CCR::DBT.val(scaler)),
        }
        self.set_enable(true);
        Ok(actual)
    }

    /// Abort the transfer in flight, if any.
    ///
    /// Interrupts and DMA requests are disabled, the transfer machinery is
    /// reset, and the client receives its buffers back with
    /// `Err(ErrorCode::CANCEL)` and the number of bytes already moved.
    pub fn abort_transfer(&self) {
        self.registers.ier.set(0);
        self.registers.der.set(0);
        self.tx_dma_channel.map(|channel| channel.disable());
        self.rx_dma_channel.map(|channel| channel.disable());

        let transferred = self.bytes_transferred();
        self.reset_preserving_config();

        self.tx_remaining.set(0);
        self.rx_remaining.set(0);
        self.write_words_remaining.set(0);
        self.read_words_remaining.set(0);
        self.write_tcr_in_isr.set(false);
        self.tx_dma_done.set(false);
        self.rx_dma_done.set(false);
        self.dma_in_flight.set(false);

        let was_active = self.state.get() != TransferState::Idle;
        self.state.set(TransferState::Idle);
        let tx = self.tx_buffer.take();
        let rx = self.rx_buffer.take();
        if was_active {
            if self.registers.cfgr1.is_set(CFGR1::MASTER) {
                self.master_client.map(|client| {
                    client.read_write_done(tx, rx, transferred, Err(ErrorCode::CANCEL))
                });
            } else {
                self.slave_client.map(|client| {
                    client.read_write_done(tx, rx, transferred, Err(ErrorCode::CANCEL))
                });
            }
        }
    }

    /// Service an LPSPI interrupt for this instance.
    pub fn handle_interrupt(&self) {
        if self.state.get() == TransferState::Idle {
            // Spurious; drop any stale flags.
            self.clear_status();
            return;
        }
        if self.registers.cfgr1.is_set(CFGR1::MASTER) {
            self.handle_interrupt_master();
        } else {
            self.handle_interrupt_slave();
        }
    }

    fn set_enable(&self, enable: bool) {
        if enable {
            self.registers.cr.modify(CR::MEN::SET);
        } else {
            self.registers.cr.modify(CR::MEN::CLEAR);
        }
    }

    /// Software reset. Clears all registers except CR, then clears CR,
    /// leaving the module disabled.
    fn reset(&self) {
        self.registers.cr.modify(CR::RST::SET);
        self.registers.cr.modify(CR::RTF::SET + CR::RRF::SET);
        self.registers.cr.set(0);
    }

    /// Software reset that carries the configuration registers across.
    fn reset_preserving_config(&self) {
        let cfgr1 = self.registers.cfgr1.get();
        let ccr = self.registers.ccr.get();
        let fcr = self.registers.fcr.get();
        let tcr = self.registers.tcr.get();
        self.reset();
        self.registers.cfgr1.set(cfgr1);
        self.registers.ccr.set(ccr);
        self.registers.fcr.set(fcr);
        self.set_enable(true);
        self.registers.tcr.set(tcr);
        self.registers.tcr.modify(
            TCR::CONT::CLEAR + TCR::CONTC::CLEAR + TCR::RXMSK::CLEAR + TCR::TXMSK::CLEAR,
        );
    }

    fn flush_fifos(&self) {
        self.registers.cr.modify(CR::RTF::SET + CR::RRF::SET);
    }

    fn clear_status(&self) {
        self.registers.sr.write(
            SR::WCF::SET + SR::FCF::SET + SR::TCF::SET + SR::TEF::SET + SR::REF::SET + SR::DMF::SET,
        );
    }

    fn tx_fifo_count(&self) -> usize {
        self.registers.fsr.read(FSR::TXCOUNT) as usize
    }

    fn rx_fifo_count(&self) -> usize {
        self.registers.fsr.read(FSR::RXCOUNT) as usize
    }

    fn fifo_size(&self) -> usize {
        1 << self.registers.param.read(PARAM::TXFIFO)
    }

    fn bytes_per_frame(&self) -> usize {
        self.frame_bits.get().div_ceil(8) as usize
    }

    /// Fill byte replicated across a FIFO word.
    fn dummy_word(&self) -> u32 {
        let byte = self.dummy_byte.get() as u32;
        byte | byte << 8 | byte << 16 | byte << 24
    }

    fn source_clock(&self) -> Result<u32, ErrorCode> {
        let src_clock = self.ccm.lpspi_clock_frequency();
        if src_clock == 0 {
            Err(ErrorCode::FAIL)
        } else {
            Ok(src_clock)
        }
    }

    /// Shared entry checks for all strategies. Returns the error code to
    /// hand back, if any.
    fn check_transfer(&self, has_tx: bool, has_rx: bool, len: usize) -> Option<ErrorCode> {
        if !valid_transfer_len(len, self.frame_bits.get(), has_tx, has_rx) {
            Some(ErrorCode::INVAL)
        } else if self.state.get() != TransferState::Idle {
            Some(ErrorCode::BUSY)
        } else {
            None
        }
    }

    /// Reconfigure the module edges shared by every transfer start: stall on
    /// FIFO pressure, empty FIFOs, no stale flags, no stale interrupts.
    fn prepare_transfer_hardware(&self) {
        self.set_enable(false);
        self.registers.cfgr1.modify(CFGR1::NOSTALL::CLEAR);
        self.set_enable(true);
        self.flush_fifos();
        self.clear_status();
        self.registers.ier.set(0);
    }

    /// Load per-transfer counters and park the buffers.
    fn stage_transfer(
        &self,
        tx: Option<&'static mut [u8]>,
        rx: Option<&'static mut [u8]>,
        len: usize,
    ) {
        let words = words_per_transfer(len, self.bytes_per_frame());
        self.transfer_size.set(len);
        self.tx_remaining.set(len);
        self.rx_remaining.set(if rx.is_some() { len } else { 0 });
        self.write_words_remaining.set(words);
        self.read_words_remaining.set(words);
        self.write_tcr_in_isr.set(false);
        self.tx_buffer.put(tx);
        self.rx_buffer.put(rx);
    }

    /// Synchronous transfer over borrowed buffers. Used by the single-byte
    /// operations; spins on FIFO status the whole way.
    fn transfer_blocking(
        &self,
        tx: Option<&[u8]>,
        mut rx: Option<&mut [u8]>,
        len: usize,
    ) -> Result<(), ErrorCode> {
        if let Some(reason) = self.check_transfer(tx.is_some(), rx.is_some(), len) {
            return Err(reason);
        }
        if self.registers.sr.is_set(SR::MBF) {
            return Err(ErrorCode::BUSY);
        }

        let fifo_size = self.fifo_size();
        let bytes_per_word = cmp::min(self.bytes_per_frame(), 4);
        let byte_swap = self.byte_swap.get();
        let hold_pcs = self.hold_pcs.get();

        self.prepare_transfer_hardware();
        self.registers.tcr.modify(
            TCR::CONT.val(hold_pcs as u32)
                + TCR::CONTC::CLEAR
                + TCR::RXMSK.val(rx.is_none() as u32)
                + TCR::TXMSK::CLEAR
                + TCR::PCS.val(self.chip_select.get() as u32),
        );

        let mut tx_remaining = len;
        let mut rx_remaining = if rx.is_some() { len } else { 0 };
        while tx_remaining > 0 {
            let bytes_each_write = cmp::min(bytes_per_word, tx_remaining);
            while self.tx_fifo_count() == fifo_size {}
            let offset = len - tx_remaining;
            let word = match tx {
                Some(buffer) => {
                    combine_write_data(&buffer[offset..offset + bytes_each_write], byte_swap)
                }
                None => self.dummy_word(),
            };
            self.registers.tdr.set(word);
            tx_remaining -= bytes_each_write;

            if let Some(ref mut buffer) = rx {
                while self.rx_fifo_count() > 0 && rx_remaining > 0 {
                    let word = self.registers.rdr.get();
                    let bytes_each_read = cmp::min(bytes_per_word, rx_remaining);
                    let offset = len - rx_remaining;
                    separate_read_data(
                        word,
                        &mut buffer[offset..offset + bytes_each_read],
                        byte_swap,
                    );
                    rx_remaining -= bytes_each_read;
                }
            }
        }

        if hold_pcs {
            // Queue the frame-ending command behind the data words.
            while self.tx_fifo_count() == fifo_size {}
            self.registers.tcr.modify(TCR::CONTC::CLEAR);
        }

        match rx {
            Some(ref mut buffer) => {
                while rx_remaining > 0 {
                    while self.rx_fifo_count() == 0 {}
                    let word = self.registers.rdr.get();
                    let bytes_each_read = cmp::min(bytes_per_word, rx_remaining);
                    let offset = len - rx_remaining;
                    separate_read_data(
                        word,
                        &mut buffer[offset..offset + bytes_each_read],
                        byte_swap,
                    );
                    rx_remaining -= bytes_each_read;
                }
            }
            None => while !self.registers.sr.is_set(SR::TCF) {},
        }
        Ok(())
    }

    /// Start an interrupt-driven master transfer. The buffers have already
    /// been validated and staged.
    fn read_write_bytes_interrupt(&self) {
        let fifo_size = self.fifo_size();
        let has_rx = self.rx_buffer.is_some();

        let (tx_watermark, rx_watermark) = if fifo_size == 1 {
            (0, 0)
        } else {
            (1, fifo_size - 2)
        };
        self.registers.fcr.write(
            FCR::TXWATER.val(tx_watermark as u32) + FCR::RXWATER.val(rx_watermark as u32),
        );

        self.prepare_transfer_hardware();
        self.registers.tcr.modify(
            TCR::CONT.val(self.hold_pcs.get() as u32)
                + TCR::CONTC::CLEAR
                + TCR::RXMSK.val(!has_rx as u32)
                + TCR::TXMSK::CLEAR
                + TCR::PCS.val(self.chip_select.get() as u32),
        );
        // The command word shares the transmit FIFO with data; let it drain
        // so the fill loop sees true FIFO occupancy.
        while self.tx_fifo_count() != 0 {}

        self.fill_tx_fifo();

        if has_rx {
            if let Some(watermark) =
                trimmed_rx_watermark(self.read_words_remaining.get(), rx_watermark)
            {
                self.registers.fcr.modify(FCR::RXWATER.val(watermark as u32));
            }
            self.registers.ier.write(IER::RDIE::SET);
        } else {
            self.registers.ier.write(IER::TDIE::SET);
        }
    }

    /// Push transmit words until the FIFO fills, the transfer is fully
    /// written, or writing further would overrun the receive FIFO.
    fn fill_tx_fifo(&self) {
        let fifo_size = self.fifo_size();
        let bytes_per_word = cmp::min(self.bytes_per_frame(), 4);
        let byte_swap = self.byte_swap.get();

        while self.tx_fifo_count() < fifo_size {
            if self.rx_buffer.is_some()
                && self.read_words_remaining.get() - self.write_words_remaining.get() >= fifo_size
            {
                break;
            }
            let tx_remaining = self.tx_remaining.get();
            let bytes_each_write = cmp::min(bytes_per_word, tx_remaining);
            let offset = self.transfer_size.get() - tx_remaining;
            let word = self.tx_buffer.map_or(self.dummy_word(), |buffer| {
                combine_write_data(&buffer[offset..offset + bytes_each_write], byte_swap)
            });
            self.registers.tdr.set(word);
            self.write_words_remaining
                .set(self.write_words_remaining.get() - 1);
            self.tx_remaining.set(tx_remaining - bytes_each_write);

            if self.tx_remaining.get() == 0 {
                if self.hold_pcs.get() {
                    if self.tx_fifo_count() < fifo_size {
                        self.registers.tcr.modify(TCR::CONTC::CLEAR);
                        self.write_tcr_in_isr.set(false);
                    } else {
                        // No room for the ending command; retry from the
                        // interrupt handler.
                        self.write_tcr_in_isr.set(true);
                    }
                }
                break;
            }
        }
    }

    fn handle_interrupt_master(&self) {
        let fifo_size = self.fifo_size();
        let bytes_per_word = cmp::min(self.bytes_per_frame(), 4);
        let byte_swap = self.byte_swap.get();

        if self.rx_buffer.is_some() && self.rx_remaining.get() > 0 {
            self.registers.ier.modify(IER::RDIE::CLEAR);
            while self.rx_fifo_count() > 0 && self.rx_remaining.get() > 0 {
                let word = self.registers.rdr.get();
                self.read_words_remaining
                    .set(self.read_words_remaining.get() - 1);
                let rx_remaining = self.rx_remaining.get();
                let bytes_each_read = cmp::min(bytes_per_word, rx_remaining);
                let offset = self.transfer_size.get() - rx_remaining;
                self.rx_buffer.map(|buffer| {
                    separate_read_data(
                        word,
                        &mut buffer[offset..offset + bytes_each_read],
                        byte_swap,
                    )
                });
                self.rx_remaining.set(rx_remaining - bytes_each_read);
            }
            if self.rx_remaining.get() > 0 {
                self.registers.ier.modify(IER::RDIE::SET);
            }
        }

        if self.rx_buffer.is_some() {
            if let Some(watermark) = trimmed_rx_watermark(
                self.read_words_remaining.get(),
                self.registers.fcr.read(FCR::RXWATER) as usize,
            ) {
                self.registers.fcr.modify(FCR::RXWATER.val(watermark as u32));
            }
        }

        if self.tx_remaining.get() > 0 {
            self.fill_tx_fifo();
        } else if self.write_tcr_in_isr.get()
            && self.hold_pcs.get()
            && self.tx_fifo_count() < fifo_size
        {
            self.registers.tcr.modify(TCR::CONTC::CLEAR);
            self.write_tcr_in_isr.set(false);
        }

        if self.tx_remaining.get() == 0
            && self.rx_remaining.get() == 0
            && !self.write_tcr_in_isr.get()
        {
            if self.rx_buffer.is_none() {
                // Nothing to read back; finished once the shifter is idle.
                if self.registers.sr.is_set(SR::TCF) {
                    self.complete_master(Ok(()));
                } else {
                    self.registers.ier.write(IER::TCIE::SET);
                }
            } else {
                self.complete_master(Ok(()));
            }
        }
    }

    fn complete_master(&self, status: Result<(), ErrorCode>) {
        self.registers.ier.set(0);
        self.state.set(TransferState::Idle);
        let tx = self.tx_buffer.take();
        let rx = self.rx_buffer.take();
        let len = self.transfer_size.get();
        self.master_client
            .map(|client| client.read_write_done(tx, rx, len, status));
    }

    /// Push transmit words until the FIFO fills or the transfer is fully
    /// written. The slave variant has no receive-overrun guard; the remote
    /// master sets the pace.
    fn fill_tx_fifo_slave(&self) {
        let fifo_size = self.fifo_size();
        let bytes_per_word = cmp::min(self.bytes_per_frame(), 4);
        let byte_swap = self.byte_swap.get();

        while self.tx_fifo_count() < fifo_size {
            let tx_remaining = self.tx_remaining.get();
            let bytes_each_write = cmp::min(bytes_per_word, tx_remaining);
            let offset = self.transfer_size.get() - tx_remaining;
            let word = self.tx_buffer.map_or(0, |buffer| {
                combine_write_data(&buffer[offset..offset + bytes_each_write], byte_swap)
            });
            self.registers.tdr.set(word);
            self.write_words_remaining
                .set(self.write_words_remaining.get() - 1);
            self.tx_remaining.set(tx_remaining - bytes_each_write);
            if self.tx_remaining.get() == 0 {
                break;
            }
        }
    }

    fn handle_interrupt_slave(&self) {
        let bytes_per_word = cmp::min(self.bytes_per_frame(), 4);
        let byte_swap = self.byte_swap.get();

        if self.rx_buffer.is_some() {
            while self.rx_fifo_count() > 0 {
                let word = self.registers.rdr.get();
                self.read_words_remaining
                    .set(self.read_words_remaining.get() - 1);
                let rx_remaining = self.rx_remaining.get();
                let bytes_each_read = cmp::min(bytes_per_word, rx_remaining);
                let offset = self.transfer_size.get() - rx_remaining;
                self.rx_buffer.map(|buffer| {
                    separate_read_data(
                        word,
                        &mut buffer[offset..offset + bytes_each_read],
                        byte_swap,
                    )
                });
                self.rx_remaining.set(rx_remaining - bytes_each_read);

                // Refill transmit in lockstep so the shifter is never
                // starved while the master keeps clocking.
                if self.tx_remaining.get() > 0 && self.tx_buffer.is_some() {
                    let tx_remaining = self.tx_remaining.get();
                    let bytes_each_write = cmp::min(bytes_per_word, tx_remaining);
                    let offset = self.transfer_size.get() - tx_remaining;
                    let word = self.tx_buffer.map_or(0, |buffer| {
                        combine_write_data(&buffer[offset..offset + bytes_each_write], byte_swap)
                    });
                    self.registers.tdr.set(word);
                    self.tx_remaining.set(tx_remaining - bytes_each_write);
                }
                if self.rx_remaining.get() == 0 {
                    break;
                }
            }
            if let Some(watermark) = trimmed_rx_watermark(
                self.read_words_remaining.get(),
                self.registers.fcr.read(FCR::RXWATER) as usize,
            ) {
                self.registers.fcr.modify(FCR::RXWATER.val(watermark as u32));
            }
        } else if self.tx_remaining.get() > 0 && self.tx_buffer.is_some() {
            self.fill_tx_fifo_slave();
        }

        // FIFO underrun or overrun. With stalling disabled in slave mode the
        // transfer keeps running, but data was lost if the corresponding
        // direction carried real data.
        if self.registers.sr.is_set(SR::TEF) && self.registers.ier.is_set(IER::TEIE) {
            self.registers.sr.write(SR::TEF::SET);
            if self.tx_buffer.is_some() {
                self.state.set(TransferState::Error);
            }
            self.error_count.set(self.error_count.get() + 1);
        }
        if self.registers.sr.is_set(SR::REF) && self.registers.ier.is_set(IER::REIE) {
            self.registers.sr.write(SR::REF::SET);
            if self.rx_buffer.is_some() {
                self.state.set(TransferState::Error);
            }
            self.error_count.set(self.error_count.get() + 1);
        }

        if self.tx_remaining.get() == 0 && self.rx_remaining.get() == 0 {
            if self.rx_buffer.is_none() {
                // Transmit only: wait for the last frame to leave the FIFO.
                if self.registers.sr.is_set(SR::FCF) && self.tx_fifo_count() == 0 {
                    self.complete_slave();
                } else {
                    self.registers.sr.write(SR::FCF::SET);
                    self.registers.ier.modify(IER::FCIE::SET);
                    self.registers
                        .ier
                        .modify(IER::TDIE::CLEAR + IER::RDIE::CLEAR);
                }
            } else {
                self.complete_slave();
            }
        }
    }

    fn complete_slave(&self) {
        let status = if self.state.get() == TransferState::Error {
            Err(ErrorCode::FAIL)
        } else {
            Ok(())
        };
        self.registers.ier.set(0);
        self.state.set(TransferState::Idle);
        let tx = self.tx_buffer.take();
        let rx = self.rx_buffer.take();
        let len = self.transfer_size.get();
        self.slave_client
            .map(|client| client.read_write_done(tx, rx, len, status));
    }

    /// Start a DMA-driven master transfer. The buffers have already been
    /// validated and staged, minus the DMA endpoint programming done here.
    fn read_write_bytes_dma(
        &self,
        tx: Option<&'static mut [u8]>,
        rx: Option<&'static mut [u8]>,
        len: usize,
    ) {
        self.transfer_size.set(len);
        self.tx_remaining.set(len);
        self.rx_remaining.set(if rx.is_some() { len } else { 0 });
        self.write_tcr_in_isr.set(false);

        let fifo_size = self.fifo_size();
        // Keep the transmit request asserted except when the FIFO is full,
        // and drain receive a byte at a time.
        self.registers.fcr.write(
            FCR::TXWATER.val((fifo_size - 1) as u32) + FCR::RXWATER.val(0),
        );

        self.prepare_transfer_hardware();
        self.registers.tcr.modify(
            TCR::CONT.val(self.hold_pcs.get() as u32)
                + TCR::CONTC::CLEAR
                + TCR::RXMSK.val(rx.is_none() as u32)
                + TCR::TXMSK::CLEAR
                + TCR::PCS.val(self.chip_select.get() as u32),
        );
        while self.tx_fifo_count() != 0 {}

        self.tx_dma_done.set(false);
        self.rx_dma_done.set(rx.is_none());
        self.dma_in_flight.set(true);

        // Receive channel first, so it is armed before any data shifts in.
        if let Some(buffer) = rx {
            self.rx_dma_channel.map(|channel| unsafe {
                channel.set_destination_buffer(&mut buffer[..len]);
            });
            self.rx_buffer.put(Some(buffer));
            self.registers.der.modify(DER::RDDE::SET);
            self.rx_dma_channel.map(|channel| channel.enable());
        } else {
            self.rx_buffer.put(None);
        }

        match tx {
            Some(buffer) => {
                self.tx_dma_channel.map(|channel| unsafe {
                    channel.set_source_buffer(&buffer[..len]);
                });
                self.tx_buffer.put(Some(buffer));
            }
            None => {
                // Clock the fill byte out `len` times from a fixed address.
                self.tx_dma_channel.map(|channel| unsafe {
                    channel.set_source::<u8>(self.dummy_byte.as_ptr() as *const u8);
                    channel.set_transfer_iterations(len as u16);
                });
                self.tx_buffer.put(None);
            }
        }
        self.registers.der.modify(DER::TDDE::SET);
        self.tx_dma_channel.map(|channel| channel.enable());
    }

    /// Wrap up a DMA transfer once every armed channel has reported in.
    fn dma_transfer_finished(&self) {
        if !(self.tx_dma_done.get() && self.rx_dma_done.get()) {
            return;
        }
        self.registers.der.set(0);
        if self.hold_pcs.get() {
            // Queue the frame-ending command behind any data still in the
            // transmit FIFO.
            while self.tx_fifo_count() == self.fifo_size() {}
            self.registers.tcr.modify(TCR::CONTC::CLEAR);
        }
        if self.rx_buffer.is_none() {
            // The DMA only filled the FIFO; wait for the shifter to drain.
            while !self.registers.sr.is_set(SR::TCF) {}
        }
        self.tx_remaining.set(0);
        self.rx_remaining.set(0);
        self.dma_in_flight.set(false);
        self.complete_master(Ok(()));
    }

    fn dma_transfer_failed(&self) {
        self.registers.der.set(0);
        self.tx_dma_channel.map(|channel| channel.disable());
        self.rx_dma_channel.map(|channel| channel.disable());
        self.reset_preserving_config();
        self.tx_remaining.set(0);
        self.rx_remaining.set(0);
        self.tx_dma_done.set(false);
        self.rx_dma_done.set(false);
        self.dma_in_flight.set(false);
        self.complete_master(Err(ErrorCode::FAIL));
    }

    /// `true` when this transfer can ride the DMA channels instead of the
    /// transmit and receive interrupts.
    fn dma_capable(&self, has_rx: bool, len: usize) -> bool {
        self.frame_bits.get() == 8
            && len <= DMA_MAX_ITERATIONS
            && self.tx_dma_channel.is_some()
            && (!has_rx || self.rx_dma_channel.is_some())
    }

    fn master_init(&self) -> Result<(), ErrorCode> {
        if !self.clock.is_enabled() {
            self.clock.enable();
        }
        let src_clock = self.source_clock()?;
        self.reset();

        // All CFGR1 fields besides MASTER keep their reset values: PCS
        // active low, SDI in / SDO out, stall on FIFO pressure.
        self.registers.cfgr1.write(CFGR1::MASTER::SET);

        let (prescale, sckdiv, actual) = closest_baud(src_clock, self.baud_rate.get());
        self.baud_rate.set(actual);
        // Default delays of two SCK periods each.
        let delay_ns = (2_000_000_000u64 / actual as u64) as u32;
        let divided_clock = src_clock / PRESCALER_VALUES[prescale as usize];
        let (pcssck, _) = closest_delay(divided_clock, delay_ns, 0);
        let (dbt, _) = closest_delay(divided_clock, delay_ns, 1);
        self.registers.ccr.write(
            CCR::SCKDIV.val(sckdiv)
                + CCR::PCSSCK.val(pcssck)
                + CCR::SCKPCS.val(pcssck)
                + CCR::DBT.val(dbt),
        );
        self.registers
            .fcr
            .write(FCR::TXWATER.val(0) + FCR::RXWATER.val(0));
        self.set_enable(true);
        self.registers.tcr.write(
            TCR::FRAMESZ.val(self.frame_bits.get() - 1)
                + TCR::PRESCALE.val(prescale)
                + TCR::PCS.val(self.chip_select.get() as u32),
        );
        Ok(())
    }

    fn slave_init(&self) -> Result<(), ErrorCode> {
        if !self.clock.is_enabled() {
            self.clock.enable();
        }
        self.reset();
        self.registers.cfgr1.write(CFGR1::MASTER::CLEAR);
        self.registers
            .fcr
            .write(FCR::TXWATER.val(0) + FCR::RXWATER.val(0));
        self.set_enable(true);
        self.registers
            .tcr
            .write(TCR::FRAMESZ.val(self.frame_bits.get() - 1));
        Ok(())
    }

    fn set_polarity_impl(&self, polarity: ClockPolarity) -> Result<(), ErrorCode> {
        if self.state.get() != TransferState::Idle {
            return Err(ErrorCode::BUSY);
        }
        match polarity {
            ClockPolarity::IdleLow => self.registers.tcr.modify(TCR::CPOL::IdleLow),
            ClockPolarity::IdleHigh => self.registers.tcr.modify(TCR::CPOL::IdleHigh),
        }
        Ok(())
    }

    fn get_polarity_impl(&self) -> ClockPolarity {
        if self.registers.tcr.is_set(TCR::CPOL) {
            ClockPolarity::IdleHigh
        } else {
            ClockPolarity::IdleLow
        }
    }

    fn set_phase_impl(&self, phase: ClockPhase) -> Result<(), ErrorCode> {
        if self.state.get() != TransferState::Idle {
            return Err(ErrorCode::BUSY);
        }
        match phase {
            ClockPhase::SampleLeading => self.registers.tcr.modify(TCR::CPHA::SampleLeading),
            ClockPhase::SampleTrailing => self.registers.tcr.modify(TCR::CPHA::SampleTrailing),
        }
        Ok(())
    }

    fn get_phase_impl(&self) -> ClockPhase {
        if self.registers.tcr.is_set(TCR::CPHA) {
            ClockPhase::SampleTrailing
        } else {
            ClockPhase::SampleLeading
        }
    }
}

impl<'a> spi::SpiMaster<'a> for Lpspi<'a> {
    type ChipSelect = ChipSelect;

    fn init(&self) -> Result<(), ErrorCode> {
        self.master_init()
    }

    fn set_client(&self, client: &'a dyn spi::SpiMasterClient) {
        self.master_client.set(client);
    }

    fn is_busy(&self) -> bool {
        self.state.get() != TransferState::Idle
    }

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
    > {
        if write_buffer.as_ref().is_some_and(|buffer| buffer.len() < len)
            || read_buffer.as_ref().is_some_and(|buffer| buffer.len() < len)
        {
            return Err((ErrorCode::SIZE, write_buffer, read_buffer));
        }
        if let Some(reason) =
            self.check_transfer(write_buffer.is_some(), read_buffer.is_some(), len)
        {
            return Err((reason, write_buffer, read_buffer));
        }
        self.state.set(TransferState::Busy);
        if self.dma_capable(read_buffer.is_some(), len) {
            self.read_write_bytes_dma(write_buffer, read_buffer, len);
        } else {
            self.stage_transfer(write_buffer, read_buffer, len);
            self.read_write_bytes_interrupt();
        }
        Ok(())
    }

    fn write_byte(&self, val: u8) -> Result<(), ErrorCode> {
        let tx = [val];
        self.transfer_blocking(Some(&tx), None, 1)
    }

    fn read_byte(&self) -> Result<u8, ErrorCode> {
        let mut rx = [0u8; 1];
        self.transfer_blocking(None, Some(&mut rx), 1)?;
        Ok(rx[0])
    }

    fn read_write_byte(&self, val: u8) -> Result<u8, ErrorCode> {
        let tx = [val];
        let mut rx = [0u8; 1];
        self.transfer_blocking(Some(&tx), Some(&mut rx), 1)?;
        Ok(rx[0])
    }

    fn specify_chip_select(&self, cs: Self::ChipSelect) -> Result<(), ErrorCode> {
        if self.state.get() != TransferState::Idle {
            return Err(ErrorCode::BUSY);
        }
        self.chip_select.set(cs);
        Ok(())
    }

    fn set_rate(&self, rate: u32) -> Result<u32, ErrorCode> {
        if rate == 0 {
            return Err(ErrorCode::INVAL);
        }
        if self.state.get() != TransferState::Idle {
            return Err(ErrorCode::BUSY);
        }
        let src_clock = self.source_clock()?;
        let (prescale, sckdiv, actual) = closest_baud(src_clock, rate);
        // The clock configuration register is writable only while disabled.
        self.set_enable(false);
        self.registers.ccr.modify(CCR::SCKDIV.val(sckdiv));
        self.set_enable(true);
        self.registers.tcr.modify(TCR::PRESCALE.val(prescale));
        self.baud_rate.set(actual);
        Ok(actual)
    }

    fn get_rate(&self) -> u32 {
        self.baud_rate.get()
    }

    fn set_polarity(&self, polarity: ClockPolarity) -> Result<(), ErrorCode> {
        self.set_polarity_impl(polarity)
    }

    fn get_polarity(&self) -> ClockPolarity {
        self.get_polarity_impl()
    }

    fn set_phase(&self, phase: ClockPhase) -> Result<(), ErrorCode> {
        self.set_phase_impl(phase)
    }

    fn get_phase(&self) -> ClockPhase {
        self.get_phase_impl()
    }

    fn hold_low(&self) {
        self.hold_pcs.set(true);
    }

    fn release_low(&self) {
        self.hold_pcs.set(false);
    }
}

impl<'a> spi::SpiSlave<'a> for Lpspi<'a> {
    fn init(&self) -> Result<(), ErrorCode> {
        self.slave_init()
    }

    fn has_client(&self) -> bool {
        self.slave_client.is_some()
    }

    fn set_client(&self, client: Option<&'a dyn spi::SpiSlaveClient>) {
        // The hardware has no chip-select assertion event, so
        // `SpiSlaveClient::chip_selected` is never generated; clients learn
        // of activity through `read_write_done`.
        match client {
            Some(client) => self.slave_client.set(client),
            None => self.slave_client.clear(),
        }
    }

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
    > {
        if write_buffer.as_ref().is_some_and(|buffer| buffer.len() < len)
            || read_buffer.as_ref().is_some_and(|buffer| buffer.len() < len)
        {
            return Err((ErrorCode::SIZE, write_buffer, read_buffer));
        }
        if let Some(reason) =
            self.check_transfer(write_buffer.is_some(), read_buffer.is_some(), len)
        {
            return Err((reason, write_buffer, read_buffer));
        }
        self.state.set(TransferState::Busy);

        let has_tx = write_buffer.is_some();
        let has_rx = read_buffer.is_some();
        self.stage_transfer(write_buffer, read_buffer, len);
        if !has_tx {
            self.tx_remaining.set(0);
        }

        let fifo_size = self.fifo_size();
        let (tx_watermark, rx_watermark) = if fifo_size == 1 {
            (0, 0)
        } else {
            (1, fifo_size - 2)
        };
        self.registers.fcr.write(
            FCR::TXWATER.val(tx_watermark as u32) + FCR::RXWATER.val(rx_watermark as u32),
        );

        self.flush_fifos();
        self.clear_status();
        self.registers.ier.set(0);
        self.registers.tcr.modify(
            TCR::CONT::CLEAR
                + TCR::CONTC::CLEAR
                + TCR::RXMSK.val(!has_rx as u32)
                + TCR::TXMSK.val(!has_tx as u32)
                + TCR::PCS.val(self.chip_select.get() as u32),
        );
        while self.tx_fifo_count() != 0 {}

        if has_tx {
            self.fill_tx_fifo_slave();
        }
        if has_rx {
            if let Some(watermark) =
                trimmed_rx_watermark(self.read_words_remaining.get(), rx_watermark)
            {
                self.registers.fcr.modify(FCR::RXWATER.val(watermark as u32));
            }
            self.registers.ier.write(IER::RDIE::SET);
        } else {
            self.registers.ier.write(IER::TDIE::SET);
        }
        if has_rx {
            self.registers.ier.modify(IER::REIE::SET);
        }
        if has_tx {
            self.registers.ier.modify(IER::TEIE::SET);
        }
        Ok(())
    }

    fn set_polarity(&self, polarity: ClockPolarity) -> Result<(), ErrorCode> {
        self.set_polarity_impl(polarity)
    }

    fn get_polarity(&self) -> ClockPolarity {
        self.get_polarity_impl()
    }

    fn set_phase(&self, phase: ClockPhase) -> Result<(), ErrorCode> {
        self.set_phase_impl(phase)
    }

    fn get_phase(&self) -> ClockPhase {
        self.get_phase_impl()
    }
}

impl dma::DmaClient for Lpspi<'_> {
    fn transfer_complete(&self, result: dma::Result) {
        match result {
            Ok(source) if source == self.tx_dma_source => {
                self.tx_dma_done.set(true);
                self.dma_transfer_finished();
            }
            Ok(source) if source == self.rx_dma_source => {
                self.rx_dma_done.set(true);
                self.dma_transfer_finished();
            }
            Err(source) if source == self.tx_dma_source || source == self.rx_dma_source => {
                self.dma_transfer_failed();
            }
            _ => panic!("DMA channel has reference to the wrong DMA client"),
        }
    }
}

struct LpspiClock<'a>(ccm::PeripheralClock<'a>);

impl ClockInterface for LpspiClock<'_> {
    fn is_enabled(&self) -> bool {
        self.0.is_enabled()
    }

    fn enable(&self) {
        self.0.enable();
    }

    fn disable(&self) {
        self.0.disable();
    }
}

#[cfg(test)]
mod tests {
    use super::{
        closest_baud, closest_delay, combine_write_data, dma_bytes_transferred,
        separate_read_data, trimmed_rx_watermark, valid_transfer_len, words_per_transfer,
    };

    #[test]
    fn combine_packs_words_from_the_low_byte() {
        assert_eq!(combine_write_data(&[0xAA], false), 0x0000_00AA);
        assert_eq!(combine_write_data(&[0x11, 0x22], false), 0x0000_2211);
        assert_eq!(
            combine_write_data(&[0x11, 0x22, 0x33, 0x44], false),
            0x4433_2211
        );
    }

    #[test]
    fn combine_byte_swap_reverses_order() {
        assert_eq!(combine_write_data(&[0xAA], true), 0x0000_00AA);
        assert_eq!(combine_write_data(&[0x11, 0x22], true), 0x0000_1122);
        assert_eq!(
            combine_write_data(&[0x11, 0x22, 0x33, 0x44], true),
            0x1122_3344
        );
    }

    #[test]
    fn separate_mirrors_combine() {
        for swap in [false, true] {
            for width in 1..=4usize {
                let source = [0x9A, 0x3C, 0x5E, 0x71];
                let word = combine_write_data(&source[..width], swap);
                let mut sink = [0u8; 4];
                separate_read_data(word, &mut sink[..width], swap);
                assert_eq!(sink[..width], source[..width]);
            }
        }
    }

    #[test]
    fn transfer_length_must_hold_whole_frames() {
        // 8-bit frames allow any nonzero length.
        assert!(valid_transfer_len(1, 8, true, true));
        assert!(valid_transfer_len(37, 8, true, false));
        // 16-bit frames need an even number of bytes.
        assert!(valid_transfer_len(4, 16, true, true));
        assert!(!valid_transfer_len(3, 16, true, true));
        // 32-bit frames repeat per word.
        assert!(valid_transfer_len(8, 32, false, true));
        assert!(!valid_transfer_len(6, 32, false, true));
        // Frames wider than a word but not word-aligned describe exactly
        // one frame.
        assert!(valid_transfer_len(6, 48, true, true));
        assert!(!valid_transfer_len(12, 48, true, true));
        // Word-aligned wide frames repeat.
        assert!(valid_transfer_len(16, 64, true, true));
        assert!(!valid_transfer_len(12, 64, true, true));
    }

    #[test]
    fn transfer_length_rejects_empty_descriptors() {
        assert!(!valid_transfer_len(0, 8, true, true));
        assert!(!valid_transfer_len(4, 8, false, false));
    }

    #[test]
    fn word_count_includes_short_final_words() {
        // Byte-wide frames occupy one word each.
        assert_eq!(words_per_transfer(5, 1), 5);
        // Two 16-bit frames share a word with nothing left over.
        assert_eq!(words_per_transfer(6, 2), 3);
        assert_eq!(words_per_transfer(8, 4), 2);
        // A 48-bit frame is a full word plus a two-byte word.
        assert_eq!(words_per_transfer(6, 6), 2);
        assert_eq!(words_per_transfer(16, 8), 4);
    }

    #[test]
    fn word_counters_drain_exactly() {
        // Walk the counters the way the FIFO fill and drain loops do: a
        // 48-bit frame moves one four-byte word then one two-byte word.
        let bytes_per_frame = 6usize;
        let len = 6usize;
        let bytes_per_word = bytes_per_frame.min(4);
        let mut words = words_per_transfer(len, bytes_per_frame);
        let mut remaining = len;
        while remaining > 0 {
            remaining -= bytes_per_word.min(remaining);
            words -= 1;
        }
        assert_eq!(remaining, 0);
        assert_eq!(words, 0);
    }

    #[test]
    fn watermark_trims_to_the_remaining_words() {
        // Plenty of words left: leave the watermark alone.
        assert_eq!(trimmed_rx_watermark(16, 14), None);
        // At or below the watermark: drop it below the remaining count.
        assert_eq!(trimmed_rx_watermark(14, 14), Some(13));
        assert_eq!(trimmed_rx_watermark(2, 14), Some(1));
        // A single remaining word must assert RDF as soon as it lands.
        assert_eq!(trimmed_rx_watermark(1, 14), Some(0));
        assert_eq!(trimmed_rx_watermark(0, 14), Some(0));
    }

    #[test]
    fn dma_progress_follows_the_major_loop() {
        assert_eq!(dma_bytes_transferred(256, 256), 0);
        assert_eq!(dma_bytes_transferred(256, 100), 156);
        assert_eq!(dma_bytes_transferred(256, 0), 256);
        // A stale count larger than the transfer clamps to no progress.
        assert_eq!(dma_bytes_transferred(4, 9), 0);
    }

    #[test]
    fn baud_search_finds_exact_divisors() {
        let (prescale, sckdiv, actual) = closest_baud(8_000_000, 1_000_000);
        assert_eq!(prescale, 0);
        assert_eq!(sckdiv, 6);
        assert_eq!(actual, 1_000_000);
    }

    #[test]
    fn baud_search_never_exceeds_the_request() {
        for rate in [300_000, 930_000, 7_777_777] {
            let (_, _, actual) = closest_baud(132_000_000, rate);
            assert!(actual <= rate);
            assert!(actual > 0);
        }
    }

    #[test]
    fn baud_search_saturates_at_the_slowest_setting() {
        // 8 MHz / (128 * 257) is the floor; ask for less.
        let (prescale, sckdiv, actual) = closest_baud(8_000_000, 10);
        assert_eq!(prescale, 7);
        assert_eq!(sckdiv, 255);
        assert_eq!(actual, 8_000_000 / (128 * 257));
    }

    #[test]
    fn delay_search_rounds_up() {
        // 1 MHz divided clock: one scaler step per microsecond.
        assert_eq!(closest_delay(1_000_000, 0, 0), (0, 1_000));
        assert_eq!(closest_delay(1_000_000, 5_000, 0), (4, 5_000));
        assert_eq!(closest_delay(1_000_000, 4_300, 0), (4, 5_000));
        // The between-transfers delay counts one extra cycle.
        assert_eq!(closest_delay(1_000_000, 0, 1), (0, 2_000));
    }

    #[test]
    fn delay_search_saturates_at_the_largest_scaler() {
        let (scaler, actual) = closest_delay(1_000_000, 1_000_000, 0);
        assert_eq!(scaler, 255);
        assert_eq!(actual, 256_000);
    }
}
