//! Direct Memory Access (DMA) channels and multiplexer.
//!
//! Each of the 32 eDMA channels is routed to a hardware request source
//! through the DMAMUX. A peripheral driver claims a channel with
//! `set_client()`, programs the memory and register endpoints, and enables
//! the channel; the channel raises `DmaClient::transfer_complete` when the
//! major loop finishes or errors out.
//!
//! Implementation assumptions:
//!
//! - No minor loop mapping; addresses do not change on minor loop runs.
//! - 32 DMA channels are exposed. This holds for nearly all i.MX RT 10xx
//!   chips, except for the 1011.

use core::cell::Cell;
use core::mem;

use hil::utilities::cells::OptionalCell;
use hil::utilities::StaticRef;
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::registers::{ReadOnly, ReadWrite, WriteOnly};
use tock_registers::{register_bitfields, register_structs};

use crate::ccm;

/// DMA multiplexer.
///
/// Routes hardware request sources to DMA channels. A detail of
/// `DmaChannel`.
#[repr(C)]
struct DmaMultiplexerRegisters {
    /// Channel configuration registers, one per channel.
    chcfg: [ReadWrite<u32, ChannelConfiguration::Register>; 32],
}

const DMA_MUX_BASE: StaticRef<DmaMultiplexerRegisters> =
    unsafe { StaticRef::new(0x400E_C000 as *const DmaMultiplexerRegisters) };

register_bitfields![u32,
    /// A channel must be disabled (ENBL clear) before its source is changed.
    /// Assigning one source to multiple channels is unpredictable, even for
    /// disabled channels.
    ChannelConfiguration [
        /// Enables this mux channel. The DMA engine has its own, separate
        /// channel enables.
        ENBL OFFSET(31) NUMBITS(1) [],
        /// Enables periodic triggering from a PIT channel (channels 0-3 only).
        TRIG OFFSET(30) NUMBITS(1) [],
        /// Channel always on; asserts a request on every trigger.
        A_ON OFFSET(29) NUMBITS(1) [],
        /// Hardware request source routed to this channel. See the DMA mux
        /// mapping table in the reference manual.
        SOURCE OFFSET(0) NUMBITS(7) []
    ]
];

#[repr(C, align(32))]
struct TransferControlDescriptor {
    saddr: ReadWrite<u32>,
    soff: ReadWrite<u16>, // Signed number
    attr: ReadWrite<u16, TransferAttributes::Register>,
    nbytes: ReadWrite<u32>, // Assumes minor loop mapping is disabled (EMLM = 0)
    slast: ReadWrite<u32>,  // Signed number
    daddr: ReadWrite<u32>,
    doff: ReadWrite<u16>, // Signed number
    citer: ReadWrite<u16>,
    dlast_sga: ReadWrite<u32>, // Signed number
    csr: ReadWrite<u16, ControlAndStatus::Register>,
    biter: ReadWrite<u16>,
}

impl TransferControlDescriptor {
    fn reset(&self) {
        self.saddr.set(0);
        self.soff.set(0);
        self.attr.set(0);
        self.nbytes.set(0);
        self.slast.set(0);
        self.daddr.set(0);
        self.doff.set(0);
        self.citer.set(0);
        self.dlast_sga.set(0);
        self.csr.set(0);
        self.biter.set(0);
    }
}

const _STATIC_ASSERT_TCD_32_BYTES: [u32; 1] =
    [0; (32 == mem::size_of::<TransferControlDescriptor>()) as usize];

register_bitfields![u16,
    TransferAttributes [
        SMOD OFFSET(11) NUMBITS(5) [],
        SSIZE OFFSET(8) NUMBITS(3) [],
        DMOD OFFSET(3) NUMBITS(5) [],
        DSIZE OFFSET(0) NUMBITS(3) []
    ],

    ControlAndStatus [
        /// Bandwidth control; throttles DMA bus usage.
        BWC OFFSET(14) NUMBITS(2) [
            NoStalls = 0b00,
            FourCycles = 0b10,
            EightCycles = 0b11
        ],
        /// Major loop link channel number; zero disables linking.
        MAJORLINKCH OFFSET(8) NUMBITS(5) [],
        /// Channel done. Must be clear to write MAJORELINK or ESG.
        DONE OFFSET(7) NUMBITS(1) [],
        /// Channel active
        ACTIVE OFFSET(6) NUMBITS(1) [],
        /// Enable channel-to-channel linking on major loop completion.
        MAJORELINK OFFSET(5) NUMBITS(1) [],
        /// Enable scatter/gather.
        ESG OFFSET(4) NUMBITS(1) [],
        /// Hardware clears ERQ when the major iteration count reaches zero.
        DREQ OFFSET(3) NUMBITS(1) [],
        /// Interrupt when the major count is half complete.
        INTHALF OFFSET(2) NUMBITS(1) [],
        /// Interrupt when the major count is complete.
        INTMAJOR OFFSET(1) NUMBITS(1) [],
        /// Channel start; hardware clears this once execution begins.
        START OFFSET(0) NUMBITS(1) []
    ]
];

/// Channel priority registers. Not laid out in channel order; the pattern
/// is 3, 2, 1, 0, 7, 6, 5, 4, 11, 10, 9, 8, ... for all channels < 32.
#[repr(transparent)]
struct ChannelPriorityRegisters([ReadWrite<u8, ChannelPriority::Register>; 32]);

register_structs! {
    /// DMA registers.
    DmaRegisters {
        /// Control Register
        (0x000 => cr: ReadWrite<u32, Control::Register>),
        /// Error Status Register
        (0x004 => es: ReadOnly<u32, ErrorStatus::Register>),
        (0x008 => _reserved0),
        /// Enable Request Register
        (0x00C => erq: ReadWrite<u32>),
        (0x010 => _reserved1),
        /// Enable Error Interrupt Register
        (0x014 => eei: ReadWrite<u32>),
        /// Clear Enable Error Interrupt Register
        (0x018 => ceei: WriteOnly<u8, MemoryMappedChannel::Register>),
        /// Set Enable Error Interrupt Register
        (0x019 => seei: WriteOnly<u8, MemoryMappedChannel::Register>),
        /// Clear Enable Request Register
        (0x01A => cerq: WriteOnly<u8, MemoryMappedChannel::Register>),
        /// Set Enable Request Register
        (0x01B => serq: WriteOnly<u8, MemoryMappedChannel::Register>),
        /// Clear DONE Status Bit Register
        (0x01C => cdne: WriteOnly<u8, MemoryMappedChannel::Register>),
        /// Set START Bit Register
        (0x01D => ssrt: WriteOnly<u8, MemoryMappedChannel::Register>),
        /// Clear Error Register
        (0x01E => cerr: WriteOnly<u8, MemoryMappedChannel::Register>),
        /// Clear Interrupt Request Register
        (0x01F => cint: WriteOnly<u8, MemoryMappedChannel::Register>),
        (0x020 => _reserved2),
        /// Interrupt Request Register
        (0x024 => int: ReadWrite<u32>),
        (0x028 => _reserved3),
        /// Error Register
        (0x02C => err: ReadWrite<u32>),
        (0x030 => _reserved4),
        /// Hardware Request Status Register
        (0x034 => hrs: ReadOnly<u32>),
        (0x038 => _reserved5),
        /// Enable Asynchronous Request in Stop Register
        (0x044 => ears: ReadWrite<u32>),
        (0x048 => _reserved6),
        (0x0100 => dchpri: ChannelPriorityRegisters),
        (0x0120 => _reserved7),
        (0x1000 => tcd: [TransferControlDescriptor; 32]),
        (0x1400 => @END),
    }
}

register_bitfields![u8,
    /// Used in DCHPRI registers.
    ChannelPriority [
        /// Allow this channel to be suspended by a higher priority channel.
        ECP OFFSET(7) NUMBITS(1) [],
        /// Prevent this channel from suspending lower priority channels.
        DPA OFFSET(6) NUMBITS(1) [],
        /// Channel current group priority (read-only).
        GRPPRI OFFSET(4) NUMBITS(2) [],
        /// Channel arbitration priority.
        CHPRI OFFSET(0) NUMBITS(4) []
    ],
    /// Generic bitband register for CEEI, SEEI, CERQ, SERQ, ...
    MemoryMappedChannel [
        /// NoOp; disables all other bits in this register.
        NOOP OFFSET(7) NUMBITS(1) [],
        /// Perform this register's operation on all 32 channels.
        ALL OFFSET(6) NUMBITS(1) [],
        /// The channel to act on.
        CHANNEL OFFSET(0) NUMBITS(5) []
    ]
];

register_bitfields![u32,
    Control [
        /// DMA active status.
        ACTIVE OFFSET(31) NUMBITS(1) [],
        /// Cancel the active transfer.
        CX OFFSET(17) NUMBITS(1) [],
        /// Cancel the active transfer, recording the error status.
        ECX OFFSET(16) NUMBITS(1) [],
        /// Channel group 1 priority under fixed group arbitration.
        GRP1PRI OFFSET(10) NUMBITS(1) [],
        /// Channel group 0 priority under fixed group arbitration.
        GRP0PRI OFFSET(8) NUMBITS(1) [],
        /// Enable minor loop mapping; redefines TCD NBYTES when set.
        EMLM OFFSET(7) NUMBITS(1) [],
        /// Continuous link mode.
        CLM OFFSET(6) NUMBITS(1) [],
        /// Stall the start of any new channel. Executing channels may
        /// complete.
        HALT OFFSET(5) NUMBITS(1) [],
        /// Any error sets HALT. Software must clear HALT.
        HOE OFFSET(4) NUMBITS(1) [],
        /// Round robin arbitration among groups.
        ERGA OFFSET(3) NUMBITS(1) [],
        /// Round robin arbitration among channels within a group.
        ERCA OFFSET(2) NUMBITS(1) [],
        /// Stall new channels while in debug mode.
        EDBG OFFSET(1) NUMBITS(1) []
    ],
    ErrorStatus [
        /// At least one ERR bit is set.
        VLD OFFSET(31) NUMBITS(1) [],
        /// Last recorded entry was a canceled transfer.
        ECX OFFSET(16) NUMBITS(1) [],
        /// Group priorities are not unique.
        GPE OFFSET(15) NUMBITS(1) [],
        /// Channel priorities within a group are not unique.
        CPE OFFSET(14) NUMBITS(1) [],
        /// Channel number of the last recorded error.
        ERRCHN OFFSET(8) NUMBITS(5) [],
        /// TCD SADDR is inconsistent with SSIZE.
        SAE OFFSET(7) NUMBITS(1) [],
        /// TCD SOFF is inconsistent with SSIZE.
        SOE OFFSET(6) NUMBITS(1) [],
        /// TCD DADDR is inconsistent with DSIZE.
        DAE OFFSET(5) NUMBITS(1) [],
        /// TCD DOFF is inconsistent with DSIZE.
        DOE OFFSET(4) NUMBITS(1) [],
        /// NBYTES/CITER configuration error.
        NCE OFFSET(3) NUMBITS(1) [],
        /// Scatter/gather configuration error.
        SGE OFFSET(2) NUMBITS(1) [],
        /// Source bus error.
        SBE OFFSET(1) NUMBITS(1) [],
        /// Destination bus error.
        DBE OFFSET(0) NUMBITS(1) []
    ]
];

const DMA_BASE: StaticRef<DmaRegisters> =
    unsafe { StaticRef::new(0x400E_8000 as *const DmaRegisters) };

/// A DMA channel.
///
/// `DmaChannel` can coordinate the transfer of data between buffers and
/// peripherals without processor intervention.
pub struct DmaChannel {
    base: StaticRef<DmaRegisters>,
    mux: StaticRef<DmaMultiplexerRegisters>,
    channel: usize,
    client: OptionalCell<&'static dyn DmaClient>,
    hardware_source: Cell<Option<DmaHardwareSource>>,
}

/// Describes a type that can be transferred via DMA.
///
/// This trait is sealed and cannot be implemented outside of this crate,
/// though it may be used outside of it.
pub trait DmaElement: private::Sealed {
    /// Identifier for the transfer size, as used in TCD\[SSIZE\] and
    /// TCD\[DSIZE\].
    #[doc(hidden)] // Crate implementation detail
    const DATA_TRANSFER_ID: u16;
}

mod private {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
}

impl DmaElement for u8 {
    const DATA_TRANSFER_ID: u16 = 0;
}

impl DmaElement for u16 {
    const DATA_TRANSFER_ID: u16 = 1;
}

impl DmaElement for u32 {
    const DATA_TRANSFER_ID: u16 = 2;
}

impl DmaChannel {
    /// Allocate a new DMA channel.
    ///
    /// Channels 0 through 3 are the only channels capable of periodic
    /// transfers. Consider reserving those for that use case.
    pub(crate) const fn new(channel: usize) -> Self {
        DmaChannel {
            base: DMA_BASE,
            mux: DMA_MUX_BASE,
            channel,
            client: OptionalCell::empty(),
            hardware_source: Cell::new(None),
        }
    }

    /// Reset the DMA channel's TCD.
    fn reset_tcd(&self) {
        self.base.tcd[self.channel].reset();
    }

    /// Set the client using this DMA channel.
    ///
    /// This should be invoked by the client itself.
    pub(crate) fn set_client(&self, client: &'static dyn DmaClient, source: DmaHardwareSource) {
        self.client.set(client);
        self.trigger_from_hardware(source);
    }

    /// Route this DMA channel's requests from a hardware source.
    fn trigger_from_hardware(&self, source: DmaHardwareSource) {
        let chcfg = &self.mux.chcfg[self.channel];
        chcfg.set(0);
        chcfg.write(
            ChannelConfiguration::ENBL::SET + ChannelConfiguration::SOURCE.val(source as u32),
        );
        self.hardware_source.set(Some(source));
    }

    /// Returns `true` if this DMA channel is actively receiving a hardware
    /// signal.
    ///
    /// The hardware signal comes from the associated peripheral, indicating
    /// a request for transfer. It must deassert before the channel is
    /// disabled. Returns `false` if the channel is disabled or has no
    /// associated hardware source.
    pub fn is_hardware_signaling(&self) -> bool {
        self.base.hrs.get() & (1 << self.channel) != 0
    }

    /// Enables this DMA channel.
    pub fn enable(&self) {
        self.base
            .serq
            .write(MemoryMappedChannel::CHANNEL.val(self.channel as u8));
    }

    /// Disables this DMA channel.
    pub fn disable(&self) {
        self.base
            .cerq
            .write(MemoryMappedChannel::CHANNEL.val(self.channel as u8));
    }

    /// Clear the interrupt associated with this DMA channel.
    fn clear_interrupt(&self) {
        self.base
            .cint
            .write(MemoryMappedChannel::CHANNEL.val(self.channel as u8));
    }

    /// Returns `true` if this DMA channel generated an interrupt.
    pub fn is_interrupt(&self) -> bool {
        self.base.int.get() & (1 << self.channel) != 0
    }

    /// Returns `true` if this DMA channel has completed its transfer.
    pub fn is_complete(&self) -> bool {
        self.base.tcd[self.channel]
            .csr
            .is_set(ControlAndStatus::DONE)
    }

    /// Clears the completion of this DMA channel.
    fn clear_complete(&self) {
        self.base
            .cdne
            .write(MemoryMappedChannel::CHANNEL.val(self.channel as u8));
    }

    /// Returns `true` if this DMA channel is in an error state.
    pub fn is_error(&self) -> bool {
        self.base.err.get() & (1 << self.channel) != 0
    }

    /// Clears the error flag for this channel.
    fn clear_error(&self) {
        self.base
            .cerr
            .write(MemoryMappedChannel::CHANNEL.val(self.channel as u8));
    }

    /// Returns `true` if this DMA channel is in an active transfer.
    pub fn is_active(&self) -> bool {
        self.base.tcd[self.channel]
            .csr
            .is_set(ControlAndStatus::ACTIVE)
    }

    /// Set a buffer of data as the source of a DMA transfer.
    ///
    /// Safety: caller is responsible for ensuring the buffer's lifetime is
    /// valid for the life of the transfer.
    pub unsafe fn set_source_buffer<T: DmaElement>(&self, buffer: &[T]) {
        let tcd = &self.base.tcd[self.channel];
        tcd.saddr.set(buffer.as_ptr() as u32);
        tcd.soff.set(mem::size_of::<T>() as u16);
        tcd.attr.modify(
            TransferAttributes::SSIZE.val(T::DATA_TRANSFER_ID) + TransferAttributes::SMOD.val(0),
        );
        tcd.nbytes.set(mem::size_of::<T>() as u32);
        tcd.slast
            .set((-((buffer.len() * mem::size_of::<T>()) as i32)) as u32);
        let iterations: u16 = buffer.len() as u16;
        tcd.biter.set(iterations);
        tcd.citer.set(iterations);
    }

    /// Set a buffer of data as the destination of a DMA receive.
    ///
    /// Safety: caller is responsible for ensuring the buffer's lifetime is
    /// valid for the life of the transfer.
    pub unsafe fn set_destination_buffer<T: DmaElement>(&self, buffer: &mut [T]) {
        let tcd = &self.base.tcd[self.channel];
        tcd.daddr.set(buffer.as_mut_ptr() as u32);
        tcd.doff.set(mem::size_of::<T>() as u16);
        tcd.attr.modify(
            TransferAttributes::DSIZE.val(T::DATA_TRANSFER_ID) + TransferAttributes::DMOD.val(0),
        );
        tcd.nbytes.set(mem::size_of::<T>() as u32);
        tcd.dlast_sga
            .set((-((buffer.len() * mem::size_of::<T>()) as i32)) as u32);
        let iterations: u16 = buffer.len() as u16;
        tcd.biter.set(iterations);
        tcd.citer.set(iterations);
    }

    /// Set the source of a DMA transfer to a fixed address, typically a
    /// peripheral register.
    ///
    /// Safety: caller responsible for ensuring the pointer's lifetime is
    /// valid for the transfer.
    pub unsafe fn set_source<T: DmaElement>(&self, source: *const T) {
        let tcd = &self.base.tcd[self.channel];
        tcd.saddr.set(source as u32);
        tcd.soff.set(0);
        tcd.attr.modify(
            TransferAttributes::SSIZE.val(T::DATA_TRANSFER_ID) + TransferAttributes::SMOD.val(0),
        );
        tcd.nbytes.set(mem::size_of::<T>() as u32);
        tcd.slast.set(0);
    }

    /// Set the destination of a DMA transfer to a fixed address, typically a
    /// peripheral register.
    ///
    /// Safety: caller responsible for ensuring the pointer's lifetime is
    /// valid for the transfer.
    pub unsafe fn set_destination<T: DmaElement>(&self, dest: *const T) {
        let tcd = &self.base.tcd[self.channel];
        tcd.daddr.set(dest as u32);
        tcd.doff.set(0);
        tcd.attr.modify(
            TransferAttributes::DSIZE.val(T::DATA_TRANSFER_ID) + TransferAttributes::DMOD.val(0),
        );
        tcd.nbytes.set(mem::size_of::<T>() as u32);
        tcd.dlast_sga.set(0);
    }

    /// Major loop iterations left in the current transfer.
    ///
    /// Hardware decrements the count as each iteration completes, so this
    /// tracks the progress of an active transfer. Reads the full count
    /// programmed by the endpoint setters once the transfer is done.
    pub fn iterations_remaining(&self) -> u16 {
        self.base.tcd[self.channel].citer.get()
    }

    /// Set the major loop iteration count directly.
    ///
    /// The buffer endpoint setters derive the count from the buffer length.
    /// Use this when both endpoints are fixed addresses.
    pub(crate) fn set_transfer_iterations(&self, iterations: u16) {
        let tcd = &self.base.tcd[self.channel];
        tcd.biter.set(iterations);
        tcd.citer.set(iterations);
    }

    /// Configures the DMA channel to automatically disable when the transfer
    /// completes.
    pub fn set_disable_on_completion(&self, dreq: bool) {
        self.base.tcd[self.channel]
            .csr
            .modify(ControlAndStatus::DREQ.val(dreq as u16));
    }

    /// Configures the DMA channel to interrupt when complete, or when there
    /// is an error.
    pub fn set_interrupt_on_completion(&self, intr: bool) {
        self.base.tcd[self.channel]
            .csr
            .modify(ControlAndStatus::INTMAJOR.val(intr as u16));
        if intr {
            self.base
                .seei
                .write(MemoryMappedChannel::CHANNEL.val(self.channel as u8));
        } else {
            self.base
                .ceei
                .write(MemoryMappedChannel::CHANNEL.val(self.channel as u8));
        }
    }

    /// Handle an interrupt.
    ///
    /// Assumes the caller established that this channel was the source of
    /// the interrupt or error (see `is_interrupt()` and `is_error()`).
    pub fn handle_interrupt(&self) {
        self.clear_interrupt();
        let result = match self.hardware_source.get() {
            Some(source) if self.is_error() => {
                self.clear_error();
                self.clear_complete();
                self.disable();
                Err(source)
            }
            Some(source) => {
                self.clear_complete();
                Ok(source)
            }
            // Interrupt on an unclaimed channel; nothing to deliver.
            None => return,
        };
        self.client.map(|client| client.transfer_complete(result));
    }
}

/// Indicates success or failure when executing a DMA transfer
///
/// An `Ok(source)` describes a successful DMA transfer to / from the
/// hardware source. An `Err(source)` describes a failed DMA transfer.
pub type Result = core::result::Result<DmaHardwareSource, DmaHardwareSource>;

/// A type that responds to DMA completion events
pub trait DmaClient {
    /// Handle the completion of a DMA transfer, which either succeeded or
    /// failed.
    fn transfer_complete(&self, result: Result);
}

/// DMA hardware request sources.
///
/// Extend this to add support for more DMA-powered peripherals. The numbers
/// come from the DMA mux chapter of the reference manual (iMXRT1060RM,
/// Rev 2).
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum DmaHardwareSource {
    Lpspi1Receive = 13,
    Lpspi1Transfer = 14,
    Lpspi2Receive = 77,
    Lpspi2Transfer = 78,
    Lpspi3Receive = 15,
    Lpspi3Transfer = 16,
    Lpspi4Receive = 79,
    Lpspi4Transfer = 80,
}

/// The DMA peripheral exposes DMA channels.
pub struct Dma<'a> {
    /// The DMA channels
    pub channels: [DmaChannel; 32],
    /// DMA clock gate
    clock_gate: ccm::PeripheralClock<'a>,
    /// DMA registers.
    registers: StaticRef<DmaRegisters>,
}

impl<'a> Dma<'a> {
    /// Create a DMA peripheral.
    pub const fn new(ccm: &'a ccm::Ccm) -> Self {
        Dma {
            channels: DMA_CHANNELS,
            clock_gate: ccm::PeripheralClock::ccgr5(ccm, ccm::HCLK5::DMA),
            registers: DMA_BASE,
        }
    }

    /// Returns the interface that controls the DMA clock
    pub fn clock(&self) -> &(impl hil::platform::ClockInterface + '_) {
        &self.clock_gate
    }

    /// Reset all DMA transfer control descriptors.
    ///
    /// Reset the descriptors shortly after system initialization, before
    /// using any DMA channel.
    pub fn reset_tcds(&self) {
        for channel in &self.channels {
            channel.reset_tcd();
        }
    }

    /// Returns a DMA channel that has an error.
    ///
    /// Faster than scanning all channels for an error flag. If more than one
    /// channel has an error there is no guarantee which is returned first;
    /// keep calling, and clearing errors, until this returns `None`.
    pub fn error_channel(&self) -> Option<&DmaChannel> {
        let es = self.registers.es.extract();
        es.is_set(ErrorStatus::VLD).then(|| {
            let idx = es.read(ErrorStatus::ERRCHN) as usize;
            &self.channels[idx]
        })
    }
}

/// Helper constant for allocating DMA channels.
const DMA_CHANNELS: [DmaChannel; 32] = [
    DmaChannel::new(0),
    DmaChannel::new(1),
    DmaChannel::new(2),
    DmaChannel::new(3),
    DmaChannel::new(4),
    DmaChannel::new(5),
    DmaChannel::new(6),
    DmaChannel::new(7),
    DmaChannel::new(8),
    DmaChannel::new(9),
    DmaChannel::new(10),
    DmaChannel::new(11),
    DmaChannel::new(12),
    DmaChannel::new(13),
    DmaChannel::new(14),
    DmaChannel::new(15),
    DmaChannel::new(16),
    DmaChannel::new(17),
    DmaChannel::new(18),
    DmaChannel::new(19),
    DmaChannel::new(20),
    DmaChannel::new(21),
    DmaChannel::new(22),
    DmaChannel::new(23),
    DmaChannel::new(24),
    DmaChannel::new(25),
    DmaChannel::new(26),
    DmaChannel::new(27),
    DmaChannel::new(28),
    DmaChannel::new(29),
    DmaChannel::new(30),
    DmaChannel::new(31),
];
