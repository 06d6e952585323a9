//! Panel variants
//!
//! A panel variant supplies what differs between display controllers: the
//! init command lists, chip-select and reset handling, and a few capability
//! flags. Every method of [`Panel`] has a default, so a variant only writes
//! the parts it needs to change.
//!
//! Two variants ship with the crate:
//!
//! - [`CommandListPanel`] - plays static command lists, default pin handling
//! - [`NullPanel`] - stands in where no panel is fitted

use embedded_hal::delay::DelayNs;

use crate::command::DEFAULT_MAX_RECORDS;
use crate::config::Config;
use crate::gpio::Gpio;

/// List index reserved for the post-reset sequence
///
/// Init enumeration stops before reaching it.
pub const RESET_LIST_INDEX: u8 = 0xFF;

/// RST held high before and after the pulse, in milliseconds
pub const RESET_SETTLE_MS: u32 = 64;

/// RST held low, in milliseconds
pub const RESET_LOW_MS: u32 = 4;

/// Preferred direction for fast readback
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FastReadDir {
    /// No fast readback
    #[default]
    Nothing,
    /// Read row by row
    Horizontal,
    /// Read column by column
    Vertical,
}

/// Extension points of a panel variant
///
/// The pin hooks receive the device configuration and GPIO access. Override
/// them when chip select or reset is wired through something other than a
/// plain GPIO (an IO expander, a CS shared with another device, ...).
pub trait Panel {
    /// Init command list number `list`, or `None` past the last one
    ///
    /// Lists are requested from 0 upward until `None`. Index
    /// [`RESET_LIST_INDEX`] is the optional post-reset sequence.
    fn init_commands(&self, list: u8) -> Option<&'static [u8]> {
        let _ = list;
        None
    }

    /// Preferred readback direction
    fn fastread_dir(&self) -> FastReadDir {
        FastReadDir::Nothing
    }

    /// Record ceiling for each init list
    ///
    /// A list that reaches it without a terminator fails `init`.
    fn max_init_records(&self) -> usize {
        DEFAULT_MAX_RECORDS
    }

    /// Whether `init` may run at all
    fn can_init(&self) -> bool {
        true
    }

    /// Whether bus acquire/release reach the bus
    fn bus_control(&self) -> bool {
        true
    }

    /// Whether the controller can be read back
    fn is_readable(&self, config: &Config) -> bool {
        config.readable
    }

    /// Whether the bus is shared with another subsystem
    fn is_bus_shared(&self, config: &Config) -> bool {
        config.bus_shared
    }

    /// Prepare the CS pin: configure as output, deselected (high)
    fn init_cs<G: Gpio>(&mut self, config: &Config, gpio: &mut G) {
        if let Some(pin) = config.pin_cs {
            gpio.write(pin, true);
            gpio.set_output(pin);
        }
    }

    /// Drive CS; `false` selects the controller
    fn cs_control<G: Gpio>(&mut self, config: &Config, gpio: &mut G, level: bool) {
        if let Some(pin) = config.pin_cs {
            gpio.write(pin, level);
        }
    }

    /// Prepare the RST pin: configure as output, released (high)
    fn init_rst<G: Gpio>(&mut self, config: &Config, gpio: &mut G) {
        if let Some(pin) = config.pin_rst {
            gpio.write(pin, true);
            gpio.set_output(pin);
        }
    }

    /// Pulse RST low and bring it back high
    ///
    /// When the variant provides a post-reset list, that list's delays replace
    /// the final settle time.
    fn reset<G: Gpio, D: DelayNs>(&mut self, config: &Config, gpio: &mut G, delay: &mut D) {
        let Some(pin) = config.pin_rst else {
            return;
        };
        gpio.write(pin, true);
        delay.delay_ms(RESET_SETTLE_MS);
        gpio.write(pin, false);
        delay.delay_ms(RESET_LOW_MS);
        gpio.write(pin, true);
        if self.init_commands(RESET_LIST_INDEX).is_none() {
            delay.delay_ms(RESET_SETTLE_MS);
        }
    }
}

/// Variant backed by static command lists
///
/// ## Example
///
/// ```
/// use panel_device::{CommandListPanel, Panel};
///
/// static SLEEP_OUT: [u8; 6] = [0x01, 0x11, 0x02, 0x80, 120, 0xFF];
/// static INIT: [u8; 6] = [0x02, 0x3A, 0x55, 0x01, 0x29, 0xFF];
///
/// static LISTS: [&[u8]; 2] = [&SLEEP_OUT, &INIT];
///
/// let panel = CommandListPanel::new(&LISTS);
/// assert!(panel.init_commands(1).is_some());
/// assert!(panel.init_commands(2).is_none());
/// ```
#[derive(Clone, Copy, Debug)]
pub struct CommandListPanel {
    lists: &'static [&'static [u8]],
    reset_list: Option<&'static [u8]>,
    fastread: FastReadDir,
    max_records: usize,
}

impl CommandListPanel {
    /// Variant that plays `lists` in order
    pub const fn new(lists: &'static [&'static [u8]]) -> Self {
        Self {
            lists,
            reset_list: None,
            fastread: FastReadDir::Nothing,
            max_records: DEFAULT_MAX_RECORDS,
        }
    }

    /// Add a post-reset list
    pub const fn with_reset_list(mut self, list: &'static [u8]) -> Self {
        self.reset_list = Some(list);
        self
    }

    /// Set the readback direction hint
    pub const fn with_fastread_dir(mut self, dir: FastReadDir) -> Self {
        self.fastread = dir;
        self
    }

    /// Set the record ceiling applied to each list
    pub const fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }
}

impl Panel for CommandListPanel {
    fn init_commands(&self, list: u8) -> Option<&'static [u8]> {
        if list == RESET_LIST_INDEX {
            return self.reset_list;
        }
        self.lists.get(usize::from(list)).copied()
    }

    fn fastread_dir(&self) -> FastReadDir {
        self.fastread
    }

    fn max_init_records(&self) -> usize {
        self.max_records
    }
}

/// Variant for an empty panel slot
///
/// Cannot be initialized, never touches pins or the bus, reports itself as
/// neither readable nor shared.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullPanel;

impl Panel for NullPanel {
    fn can_init(&self) -> bool {
        false
    }

    fn bus_control(&self) -> bool {
        false
    }

    fn is_readable(&self, _config: &Config) -> bool {
        false
    }

    fn is_bus_shared(&self, _config: &Config) -> bool {
        false
    }

    fn init_cs<G: Gpio>(&mut self, _config: &Config, _gpio: &mut G) {}

    fn cs_control<G: Gpio>(&mut self, _config: &Config, _gpio: &mut G, _level: bool) {}

    fn init_rst<G: Gpio>(&mut self, _config: &Config, _gpio: &mut G) {}

    fn reset<G: Gpio, D: DelayNs>(&mut self, _config: &Config, _gpio: &mut G, _delay: &mut D) {}
}
