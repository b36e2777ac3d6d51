use hil::platform::ClockInterface;
use hil::utilities::StaticRef;
use tock_registers::interfaces::{ReadWriteable, Readable};
use tock_registers::registers::{ReadOnly, ReadWrite};
use tock_registers::{register_bitfields, register_structs};

register_structs! {
    /// Clock Controller Module
    CcmRegisters {
        /// CCM Control Register
        (0x000 => ccr: ReadWrite<u32, CCR::Register>),
        (0x004 => _reserved0),
        /// CCM Status Register
        (0x008 => csr: ReadOnly<u32, CSR::Register>),
        /// CCM Clock Switcher Register
        (0x00C => ccsr: ReadWrite<u32>),
        /// CCM Arm Clock Root Register
        (0x010 => cacrr: ReadWrite<u32>),
        /// CCM Bus Clock Divider Register
        (0x014 => cbcdr: ReadWrite<u32>),
        /// CCM Bus Clock Multiplexer Register
        (0x018 => cbcmr: ReadWrite<u32, CBCMR::Register>),
        /// CCM Serial Clock Multiplexer Register 1
        (0x01C => cscmr1: ReadWrite<u32>),
        /// CCM Serial Clock Multiplexer Register 2
        (0x020 => cscmr2: ReadWrite<u32>),
        /// CCM Serial Clock Divider Register 1
        (0x024 => cscdr1: ReadWrite<u32>),
        /// CCM Clock Divider Register
        (0x028 => cs1cdr: ReadWrite<u32>),
        /// CCM Clock Divider Register
        (0x02C => cs2cdr: ReadWrite<u32>),
        /// CCM D1 Clock Divider Register
        (0x030 => cdcdr: ReadWrite<u32>),
        (0x034 => _reserved1),
        /// CCM Serial Clock Divider Register 2
        (0x038 => cscdr2: ReadWrite<u32>),
        /// CCM Serial Clock Divider Register 3
        (0x03C => cscdr3: ReadWrite<u32>),
        (0x040 => _reserved2),
        /// CCM Divider Handshake In-Process Register
        (0x048 => cdhipr: ReadOnly<u32>),
        (0x04C => _reserved3),
        /// CCM Low Power Control Register
        (0x054 => clpcr: ReadWrite<u32, CLPCR::Register>),
        /// CCM Interrupt Status Register
        (0x058 => cisr: ReadWrite<u32>),
        /// CCM Interrupt Mask Register
        (0x05C => cimr: ReadWrite<u32>),
        /// CCM Clock Output Source Register
        (0x060 => ccosr: ReadWrite<u32>),
        /// CCM General Purpose Register
        (0x064 => cgpr: ReadWrite<u32>),
        /// CCM Clock Gating Registers
        (0x068 => ccgr: [ReadWrite<u32, CCGR::Register>; 8]),
        /// CCM Module Enable Overide Register
        (0x088 => cmeor: ReadWrite<u32>),
        (0x08C => @END),
    }
}

register_bitfields![u32,
    CCR [
        /// Enable for REG_BYPASS_COUNTER
        RBC_EN OFFSET(27) NUMBITS(1) [],
        /// Counter for analog_reg_bypass
        REG_BYPASS_COUNT OFFSET(21) NUMBITS(6) [],
        /// On chip oscillator enable bit
        COSC_EN OFFSET(12) NUMBITS(1) [],
        /// Oscillator ready counter value
        OSCNT OFFSET(0) NUMBITS(8) []
    ],
    CSR [
        // Status indication of on board oscillator
        COSC_READY OFFSET(5) NUMBITS(1) [],
        // Status indication of CAMP2
        CAMP2_READY OFFSET(3) NUMBITS(1) [],
        // Status of the value of CCM_REF_EN_B output of ccm
        REF_EN_B OFFSET(0) NUMBITS(1) []
    ],

    CBCMR [
        /// Selector for lpspi clock multiplexer
        LPSPI_CLK_SEL OFFSET(4) NUMBITS(2) [
            Pll3Pfd1 = 0,
            Pll3Pfd0 = 1,
            Pll2 = 2,
            Pll2Pfd2 = 3
        ],
        /// Divider for LPSPI. Divider should be updated when output clock is gated.
        LPSPI_PODF OFFSET(26) NUMBITS(3) []
    ],

    CLPCR [
        LPM OFFSET(0) NUMBITS(2) []
    ],

    // Supports all clock gate registers
    CCGR [
        CG15 OFFSET(30) NUMBITS(2) [],
        CG14 OFFSET(28) NUMBITS(2) [],
        CG13 OFFSET(26) NUMBITS(2) [],
        CG12 OFFSET(24) NUMBITS(2) [],
        CG11 OFFSET(22) NUMBITS(2) [],
        CG10 OFFSET(20) NUMBITS(2) [],
        CG9 OFFSET(18) NUMBITS(2) [],
        CG8 OFFSET(16) NUMBITS(2) [],
        CG7 OFFSET(14) NUMBITS(2) [],
        CG6 OFFSET(12) NUMBITS(2) [],
        CG5 OFFSET(10) NUMBITS(2) [],
        CG4 OFFSET(8) NUMBITS(2) [],
        CG3 OFFSET(6) NUMBITS(2) [],
        CG2 OFFSET(4) NUMBITS(2) [],
        CG1 OFFSET(2) NUMBITS(2) [],
        CG0 OFFSET(0) NUMBITS(2) []
    ],
];

const CCM_BASE: StaticRef<CcmRegisters> =
    unsafe { StaticRef::new(0x400FC000 as *const CcmRegisters) };

pub struct Ccm {
    registers: StaticRef<CcmRegisters>,
}

/// Source selections for the LPSPI clock root.
///
/// The root feeds all four LPSPI instances; the selected PLL output is
/// divided by LPSPI_PODF before it reaches the peripherals.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum LpspiClockSelection {
    /// PLL3 PFD1 (664.62 MHz)
    Pll3Pfd1 = 0,
    /// PLL3 PFD0 (720 MHz)
    Pll3Pfd0 = 1,
    /// PLL2 (528 MHz)
    Pll2 = 2,
    /// PLL2 PFD2 (396 MHz)
    Pll2Pfd2 = 3,
}

impl Ccm {
    pub const fn new() -> Ccm {
        Ccm {
            registers: CCM_BASE,
        }
    }

    pub fn set_low_power_mode(&self) {
        self.registers.clpcr.modify(CLPCR::LPM.val(0b00 as u32));
    }

    // LPSPI1 clock

    pub fn is_enabled_lpspi1_clock(&self) -> bool {
        self.registers.ccgr[1].is_set(CCGR::CG0)
    }

    pub fn enable_lpspi1_clock(&self) {
        self.registers.ccgr[1].modify(CCGR::CG0.val(0b11 as u32))
    }

    pub fn disable_lpspi1_clock(&self) {
        self.registers.ccgr[1].modify(CCGR::CG0::CLEAR)
    }

    // LPSPI2 clock

    pub fn is_enabled_lpspi2_clock(&self) -> bool {
        self.registers.ccgr[1].is_set(CCGR::CG1)
    }

    pub fn enable_lpspi2_clock(&self) {
        self.registers.ccgr[1].modify(CCGR::CG1.val(0b11 as u32))
    }

    pub fn disable_lpspi2_clock(&self) {
        self.registers.ccgr[1].modify(CCGR::CG1::CLEAR)
    }

    // LPSPI3 clock

    pub fn is_enabled_lpspi3_clock(&self) -> bool {
        self.registers.ccgr[1].is_set(CCGR::CG2)
    }

    pub fn enable_lpspi3_clock(&self) {
        self.registers.ccgr[1].modify(CCGR::CG2.val(0b11 as u32))
    }

    pub fn disable_lpspi3_clock(&self) {
        self.registers.ccgr[1].modify(CCGR::CG2::CLEAR)
    }

    // LPSPI4 clock

    pub fn is_enabled_lpspi4_clock(&self) -> bool {
        self.registers.ccgr[1].is_set(CCGR::CG3)
    }

    pub fn enable_lpspi4_clock(&self) {
        self.registers.ccgr[1].modify(CCGR::CG3.val(0b11 as u32))
    }

    pub fn disable_lpspi4_clock(&self) {
        self.registers.ccgr[1].modify(CCGR::CG3::CLEAR)
    }

    // LPSPI clock root
    //
    // The divider must only be changed while all four LPSPI clock gates are
    // off.

    pub fn set_lpspi_clock_selection(&self, selection: LpspiClockSelection) {
        let selection = match selection {
            LpspiClockSelection::Pll3Pfd1 => CBCMR::LPSPI_CLK_SEL::Pll3Pfd1,
            LpspiClockSelection::Pll3Pfd0 => CBCMR::LPSPI_CLK_SEL::Pll3Pfd0,
            LpspiClockSelection::Pll2 => CBCMR::LPSPI_CLK_SEL::Pll2,
            LpspiClockSelection::Pll2Pfd2 => CBCMR::LPSPI_CLK_SEL::Pll2Pfd2,
        };
        self.registers.cbcmr.modify(selection);
    }

    /// Set the LPSPI clock root divider. The hardware divides by
    /// `divider + 1`.
    pub fn set_lpspi_clock_divider(&self, divider: u32) {
        self.registers.cbcmr.modify(CBCMR::LPSPI_PODF.val(divider));
    }

    /// Frequency of the LPSPI functional clock, in Hz.
    ///
    /// Derived from the selected PLL output and the LPSPI_PODF divider,
    /// assuming the PLLs run at their nominal rates.
    pub fn lpspi_clock_frequency(&self) -> u32 {
        use CBCMR::LPSPI_CLK_SEL::Value;
        let source: u32 = match self.registers.cbcmr.read_as_enum(CBCMR::LPSPI_CLK_SEL) {
            Some(Value::Pll3Pfd1) => 664_615_384,
            Some(Value::Pll3Pfd0) => 720_000_000,
            Some(Value::Pll2) => 528_000_000,
            Some(Value::Pll2Pfd2) => 396_000_000,
            None => 0,
        };
        source / (self.registers.cbcmr.read(CBCMR::LPSPI_PODF) + 1)
    }

    // DMA clock

    /// Enable the DMA clock gate
    pub fn enable_dma_clock(&self) {
        self.registers.ccgr[5].modify(CCGR::CG3.val(0b11));
    }

    /// Disable the DMA clock gate
    pub fn disable_dma_clock(&self) {
        self.registers.ccgr[5].modify(CCGR::CG3.val(0b00));
    }

    /// Indicates if the DMA clock gate is enabled
    pub fn is_enabled_dma_clock(&self) -> bool {
        self.registers.ccgr[5].read(CCGR::CG3) != 0
    }
}

enum ClockGate {
    CCGR1(HCLK1),
    CCGR5(HCLK5),
}

/// A peripheral clock gate
///
/// `PeripheralClock` provides a LPCG API for controlling peripheral
/// clock gates.
pub struct PeripheralClock<'a> {
    ccm: &'a Ccm,
    clock_gate: ClockGate,
}

impl<'a> PeripheralClock<'a> {
    pub const fn ccgr1(ccm: &'a Ccm, gate: HCLK1) -> Self {
        Self {
            ccm,
            clock_gate: ClockGate::CCGR1(gate),
        }
    }
    pub const fn ccgr5(ccm: &'a Ccm, gate: HCLK5) -> Self {
        Self {
            ccm,
            clock_gate: ClockGate::CCGR5(gate),
        }
    }
}

pub enum HCLK1 {
    LPSPI1,
    LPSPI2,
    LPSPI3,
    LPSPI4, // and others ...
}

pub enum HCLK5 {
    DMA, // and others ...
}

impl ClockInterface for PeripheralClock<'_> {
    fn is_enabled(&self) -> bool {
        match self.clock_gate {
            ClockGate::CCGR1(ref v) => match v {
                HCLK1::LPSPI1 => self.ccm.is_enabled_lpspi1_clock(),
                HCLK1::LPSPI2 => self.ccm.is_enabled_lpspi2_clock(),
                HCLK1::LPSPI3 => self.ccm.is_enabled_lpspi3_clock(),
                HCLK1::LPSPI4 => self.ccm.is_enabled_lpspi4_clock(),
            },
            ClockGate::CCGR5(ref v) => match v {
                HCLK5::DMA => self.ccm.is_enabled_dma_clock(),
            },
        }
    }

    fn enable(&self) {
        match self.clock_gate {
            ClockGate::CCGR1(ref v) => match v {
                HCLK1::LPSPI1 => self.ccm.enable_lpspi1_clock(),
                HCLK1::LPSPI2 => self.ccm.enable_lpspi2_clock(),
                HCLK1::LPSPI3 => self.ccm.enable_lpspi3_clock(),
                HCLK1::LPSPI4 => self.ccm.enable_lpspi4_clock(),
            },
            ClockGate::CCGR5(ref v) => match v {
                HCLK5::DMA => self.ccm.enable_dma_clock(),
            },
        }
    }

    fn disable(&self) {
        match self.clock_gate {
            ClockGate::CCGR1(ref v) => match v {
                HCLK1::LPSPI1 => self.ccm.disable_lpspi1_clock(),
                HCLK1::LPSPI2 => self.ccm.disable_lpspi2_clock(),
                HCLK1::LPSPI3 => self.ccm.disable_lpspi3_clock(),
                HCLK1::LPSPI4 => self.ccm.disable_lpspi4_clock(),
            },
            ClockGate::CCGR5(ref v) => match v {
                HCLK5::DMA => self.ccm.disable_dma_clock(),
            },
        }
    }
}
