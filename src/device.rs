//! Panel device lifecycle
//!
//! [`Device`] ties a [`Panel`] variant to its collaborators: the bus it talks
//! over, the GPIO that drives its pins, and optionally a backlight and a touch
//! sensor. It owns the init sequence, the brightness polarity, the active
//! rotation and the touch calibration.
//!
//! Lifecycle:
//!
//! ```text
//! Uninitialized -> BusAcquired -> Reset -> CommandsSent -> Ready
//!       ^                                                    |
//!       +------------ release_bus / set_config / failure ----+
//! ```
//!
//! `Reset` is skipped when `init` is called without a hardware reset.

use embedded_hal::delay::DelayNs;

use crate::affine::{Affine, Calibration};
use crate::bus::Bus;
use crate::command::{CommandList, CommandSink, Playback};
use crate::config::Config;
use crate::error::{CalibrationError, Error};
use crate::gpio::Gpio;
use crate::light::Light;
use crate::panel::{FastReadDir, Panel, RESET_LIST_INDEX};
use crate::rotation::{apply_rotation, combine_rotation, swaps_axes};
use crate::touch::{Touch, TouchPoint};

type DeviceResult<T, E> = core::result::Result<T, Error<E>>;

/// Poll interval while waiting for a calibration tap
pub const CALIBRATION_POLL_MS: u32 = 10;

/// Widest word `write_command`/`write_data`/`read_data` move at once, in bytes
pub const MAX_WORD_BYTES: u8 = 4;

/// Where the device is in its lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LifecycleState {
    /// Nothing done yet, or torn down
    #[default]
    Uninitialized,
    /// The bus is claimed
    BusAcquired,
    /// The hardware reset pulse (and post-reset list) ran
    Reset,
    /// Every init list was played
    CommandsSent,
    /// The panel is ready for drawing
    Ready,
}

/// User interaction for [`Device::touch_calibrate`]
///
/// The device asks for one target at a time and waits for a tap on it.
pub trait CalibrationPrompt {
    /// Draw target `index` (0 to 3) at screen position (x, y)
    ///
    /// Coordinates are in the calibration frame (the panel seen through its
    /// `offset_rotation`).
    fn show_target(&mut self, index: usize, x: u16, y: u16);

    /// Polled between touch reads; return false to abandon the calibration
    fn keep_waiting(&mut self) -> bool {
        true
    }
}

/// Panel device
///
/// Collaborators are borrowed and may be swapped at any time; swapping never
/// re-runs initialization.
pub struct Device<'a, P, B, G>
where
    P: Panel,
    B: Bus,
    G: Gpio,
{
    panel: P,
    config: Config,
    gpio: G,
    bus: Option<&'a mut B>,
    light: Option<&'a mut dyn Light>,
    touch: Option<&'a mut dyn Touch>,
    state: LifecycleState,
    bus_acquired: bool,
    in_transaction: bool,
    /// A data byte is pending its 16-bit partner
    has_align_data: bool,
    rotation: u8,
    internal_rotation: u8,
    affine: Affine,
}

impl<'a, P, B, G> Device<'a, P, B, G>
where
    P: Panel,
    B: Bus,
    G: Gpio,
{
    /// Create a device with no collaborators attached
    pub fn new(panel: P, config: Config, gpio: G) -> Self {
        Self {
            panel,
            config,
            gpio,
            bus: None,
            light: None,
            touch: None,
            state: LifecycleState::Uninitialized,
            bus_acquired: false,
            in_transaction: false,
            has_align_data: false,
            rotation: 0,
            internal_rotation: combine_rotation(0, config.offset_rotation),
            affine: Affine::IDENTITY,
        }
    }

    /// Current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replace the configuration
    ///
    /// The device drops back to [`LifecycleState::Uninitialized`]; call
    /// [`init`](Self::init) again before drawing.
    ///
    /// # Errors
    ///
    /// `Error::TransactionActive` while a bus transaction is open.
    pub fn set_config(&mut self, config: Config) -> DeviceResult<(), B::Error> {
        if self.in_transaction {
            return Err(Error::TransactionActive);
        }
        self.config = config;
        self.internal_rotation = combine_rotation(self.rotation, config.offset_rotation);
        self.has_align_data = false;
        self.state = LifecycleState::Uninitialized;
        Ok(())
    }

    /// Panel variant
    pub fn panel(&self) -> &P {
        &self.panel
    }

    /// Panel variant, mutably
    pub fn panel_mut(&mut self) -> &mut P {
        &mut self.panel
    }

    /// Lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Whether `init` completed
    pub fn is_ready(&self) -> bool {
        self.state == LifecycleState::Ready
    }

    /// Give back the panel variant and GPIO
    pub fn into_parts(self) -> (P, G) {
        (self.panel, self.gpio)
    }

    // Collaborators

    /// Attach a bus, replacing any previous one
    ///
    /// An acquisition or transaction on the previous bus is forgotten, not
    /// released. If the previous bus was claimed the device drops back to
    /// [`LifecycleState::Uninitialized`].
    pub fn set_bus(&mut self, bus: &'a mut B) {
        self.forget_bus();
        self.bus = Some(bus);
    }

    /// Detach the bus
    ///
    /// Same state rules as [`set_bus`](Self::set_bus).
    pub fn clear_bus(&mut self) -> Option<&'a mut B> {
        self.forget_bus();
        self.bus.take()
    }

    fn forget_bus(&mut self) {
        if self.bus_acquired {
            self.bus_acquired = false;
            self.state = LifecycleState::Uninitialized;
        }
        self.in_transaction = false;
        self.has_align_data = false;
    }

    /// Attached bus
    pub fn bus_mut(&mut self) -> Option<&mut B> {
        self.bus.as_deref_mut()
    }

    /// Attach a backlight, replacing any previous one
    pub fn set_light(&mut self, light: &'a mut dyn Light) {
        self.light = Some(light);
    }

    /// Detach the backlight
    pub fn clear_light(&mut self) -> Option<&'a mut dyn Light> {
        self.light.take()
    }

    /// Attached backlight
    pub fn light_mut(&mut self) -> Option<&mut (dyn Light + 'a)> {
        self.light.as_deref_mut()
    }

    /// Attach a touch sensor, replacing any previous one
    pub fn set_touch(&mut self, touch: &'a mut dyn Touch) {
        self.touch = Some(touch);
    }

    /// Detach the touch sensor
    pub fn clear_touch(&mut self) -> Option<&'a mut dyn Touch> {
        self.touch.take()
    }

    /// Attached touch sensor
    pub fn touch_mut(&mut self) -> Option<&mut (dyn Touch + 'a)> {
        self.touch.as_deref_mut()
    }

    // Lifecycle

    /// Bring the panel up
    ///
    /// Claims the bus, prepares CS and RST, optionally pulses reset and plays
    /// the post-reset list, then plays init lists 0, 1, 2, ... until the
    /// variant runs out. On any failure the bus is released and the device is
    /// left [`Uninitialized`](LifecycleState::Uninitialized).
    ///
    /// # Errors
    ///
    /// * `Error::PanelUnavailable` - the variant cannot be initialized
    /// * `Error::NoBus` - no bus attached
    /// * `Error::CommandListUnterminated` - a list is missing its terminator
    /// * `Error::Bus` - a transfer failed
    pub fn init<D: DelayNs>(
        &mut self,
        use_reset: bool,
        delay: &mut D,
    ) -> DeviceResult<(), B::Error> {
        if !self.panel.can_init() {
            log::warn!("panel variant cannot be initialized");
            self.state = LifecycleState::Uninitialized;
            return Err(Error::PanelUnavailable);
        }
        if self.bus.is_none() {
            self.state = LifecycleState::Uninitialized;
            return Err(Error::NoBus);
        }

        log::debug!("panel init (reset: {})", use_reset);
        let result = self.run_init(use_reset, delay);
        if let Err(ref e) = result {
            log::warn!("panel init failed: {:?}", e);
            self.abort_init();
        }
        result
    }

    fn run_init<D: DelayNs>(
        &mut self,
        use_reset: bool,
        delay: &mut D,
    ) -> DeviceResult<(), B::Error> {
        self.init_bus()?;
        self.state = LifecycleState::BusAcquired;

        self.panel.init_cs(&self.config, &mut self.gpio);
        self.panel.init_rst(&self.config, &mut self.gpio);
        if let Some(pin) = self.config.pin_busy {
            self.gpio.set_input(pin);
        }

        if use_reset {
            self.panel.reset(&self.config, &mut self.gpio, delay);
            if let Some(list) = self.panel.init_commands(RESET_LIST_INDEX) {
                let opened = self.open_transaction()?;
                self.play_list(RESET_LIST_INDEX, list, delay)?;
                if opened {
                    self.end_transaction()?;
                }
            }
            self.state = LifecycleState::Reset;
            log::debug!("panel reset done");
        }

        let opened = self.open_transaction()?;
        for index in 0..RESET_LIST_INDEX {
            let Some(list) = self.panel.init_commands(index) else {
                break;
            };
            self.play_list(index, list, delay)?;
        }
        self.state = LifecycleState::CommandsSent;
        if opened {
            self.end_transaction()?;
        }

        self.state = LifecycleState::Ready;
        log::debug!("panel ready");
        Ok(())
    }

    /// Begin a transaction unless the caller already holds one
    ///
    /// Returns whether this call opened it.
    fn open_transaction(&mut self) -> DeviceResult<bool, B::Error> {
        if self.in_transaction {
            return Ok(false);
        }
        self.begin_transaction()?;
        Ok(true)
    }

    fn play_list<D: DelayNs>(
        &mut self,
        index: u8,
        list: &[u8],
        delay: &mut D,
    ) -> DeviceResult<(), B::Error> {
        let max_records = self.panel.max_init_records();
        let mut sink = Sequencer {
            device: self,
            delay,
        };
        match CommandList::with_max_records(list, max_records).play(&mut sink)? {
            Playback::Completed { records } => {
                log::debug!("init list {} played ({} records)", index, records);
                Ok(())
            }
            Playback::Truncated { records } => Err(Error::CommandListUnterminated {
                list: index,
                records,
            }),
        }
    }

    fn abort_init(&mut self) {
        if self.in_transaction {
            self.in_transaction = false;
            if let Some(bus) = self.bus.as_deref_mut() {
                let _ = bus.end_transaction();
            }
        }
        if self.bus_acquired {
            self.bus_acquired = false;
            if let Some(bus) = self.bus.as_deref_mut() {
                let _ = bus.release();
            }
        }
        self.has_align_data = false;
        self.state = LifecycleState::Uninitialized;
    }

    /// Claim the bus
    ///
    /// Does nothing if already claimed, or if the variant does not control
    /// the bus.
    ///
    /// # Errors
    ///
    /// `Error::NoBus` without a bus, `Error::Bus` if the claim fails.
    pub fn init_bus(&mut self) -> DeviceResult<(), B::Error> {
        if !self.panel.bus_control() || self.bus_acquired {
            return Ok(());
        }
        let bus = self.bus.as_deref_mut().ok_or(Error::NoBus)?;
        bus.init().map_err(Error::Bus)?;
        self.bus_acquired = true;
        if self.state == LifecycleState::Uninitialized {
            self.state = LifecycleState::BusAcquired;
        }
        Ok(())
    }

    /// Free the bus and drop back to [`LifecycleState::Uninitialized`]
    ///
    /// Does nothing unless the bus was claimed through
    /// [`init_bus`](Self::init_bus) or [`init`](Self::init). An open
    /// transaction is closed first.
    ///
    /// # Errors
    ///
    /// `Error::Bus` if closing or releasing fails.
    pub fn release_bus(&mut self) -> DeviceResult<(), B::Error> {
        if !self.panel.bus_control() || !self.bus_acquired {
            return Ok(());
        }
        if self.in_transaction {
            self.end_transaction()?;
        }
        if let Some(bus) = self.bus.as_deref_mut() {
            bus.release().map_err(Error::Bus)?;
        }
        self.bus_acquired = false;
        self.state = LifecycleState::Uninitialized;
        log::debug!("bus released");
        Ok(())
    }

    /// Open a bus transaction; nested calls do nothing
    ///
    /// # Errors
    ///
    /// `Error::NoBus` without a bus, `Error::Bus` if the bus refuses.
    pub fn begin_transaction(&mut self) -> DeviceResult<(), B::Error> {
        if self.in_transaction {
            return Ok(());
        }
        let bus = self.bus.as_deref_mut().ok_or(Error::NoBus)?;
        bus.begin_transaction().map_err(Error::Bus)?;
        self.in_transaction = true;
        Ok(())
    }

    /// Close the open bus transaction; does nothing if none is open
    ///
    /// # Errors
    ///
    /// `Error::Bus` if the bus fails to flush.
    pub fn end_transaction(&mut self) -> DeviceResult<(), B::Error> {
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;
        match self.bus.as_deref_mut() {
            Some(bus) => bus.end_transaction().map_err(Error::Bus),
            None => Ok(()),
        }
    }

    /// Whether a transaction is open
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    // Transfers

    /// Send one command with its arguments, framed by chip select
    ///
    /// # Errors
    ///
    /// `Error::NoBus` or `Error::Bus`. CS is released either way.
    pub fn send_command(&mut self, opcode: u8, args: &[u8]) -> DeviceResult<(), B::Error> {
        self.panel.cs_control(&self.config, &mut self.gpio, false);
        let result = self.write_framed(opcode, args);
        self.panel.cs_control(&self.config, &mut self.gpio, true);
        result
    }

    fn write_framed(&mut self, opcode: u8, args: &[u8]) -> DeviceResult<(), B::Error> {
        self.write_command(u32::from(opcode), 1)?;
        for &arg in args {
            self.write_data(u32::from(arg), 1)?;
        }
        Ok(())
    }

    /// Write the low `len` bytes of `data` as a command word
    ///
    /// `len` is capped at [`MAX_WORD_BYTES`]. With `dlen_16bit`, a one-byte
    /// command goes out as a 16-bit word (`data << 8`) and a pending
    /// alignment byte is flushed first.
    ///
    /// # Errors
    ///
    /// `Error::NoBus` or `Error::Bus`.
    pub fn write_command(&mut self, data: u32, len: u8) -> DeviceResult<(), B::Error> {
        let bus = self.bus.as_deref_mut().ok_or(Error::NoBus)?;
        let mut len = len.min(MAX_WORD_BYTES);
        let mut data = data;
        if self.config.dlen_16bit {
            if self.has_align_data {
                bus.write_data(0, 8).map_err(Error::Bus)?;
                self.has_align_data = false;
            }
            if len == 1 {
                len = 2;
                data <<= 8;
            }
        }
        bus.write_command(data, len * 8).map_err(Error::Bus)
    }

    /// Write the low `len` bytes of `data` as a data word
    ///
    /// `len` is capped at [`MAX_WORD_BYTES`]. With `dlen_16bit`, an odd byte
    /// count leaves the stream half a word out; the next command pads it.
    ///
    /// # Errors
    ///
    /// `Error::NoBus` or `Error::Bus`.
    pub fn write_data(&mut self, data: u32, len: u8) -> DeviceResult<(), B::Error> {
        let bus = self.bus.as_deref_mut().ok_or(Error::NoBus)?;
        let len = len.min(MAX_WORD_BYTES);
        bus.write_data(data, len * 8).map_err(Error::Bus)?;
        if self.config.dlen_16bit && len & 1 != 0 {
            self.has_align_data = !self.has_align_data;
        }
        Ok(())
    }

    /// Read `len` bytes as one word, after the configured dummy bits
    ///
    /// # Errors
    ///
    /// `Error::NotReadable` if the panel cannot be read, `Error::NoBus` or
    /// `Error::Bus` otherwise.
    pub fn read_data(&mut self, len: u8) -> DeviceResult<u32, B::Error> {
        if !self.panel.is_readable(&self.config) {
            return Err(Error::NotReadable);
        }
        let bus = self.bus.as_deref_mut().ok_or(Error::NoBus)?;
        let len = len.min(MAX_WORD_BYTES);
        bus.begin_read(self.config.dummy_read_bits).map_err(Error::Bus)?;
        let value = bus.read_data(len * 8);
        let end = bus.end_read();
        let value = value.map_err(Error::Bus)?;
        end.map_err(Error::Bus)?;
        Ok(value)
    }

    /// Level of the busy pin; false when none is configured
    pub fn is_busy(&mut self) -> bool {
        match self.config.pin_busy {
            Some(pin) => self.gpio.read(pin),
            None => false,
        }
    }

    // Variant queries

    /// Whether the panel can be read back
    pub fn is_readable(&self) -> bool {
        self.panel.is_readable(&self.config)
    }

    /// Whether the bus is shared with another subsystem
    pub fn is_bus_shared(&self) -> bool {
        self.panel.is_bus_shared(&self.config)
    }

    /// Preferred readback direction
    pub fn fastread_dir(&self) -> FastReadDir {
        self.panel.fastread_dir()
    }

    // Geometry

    /// Select rotation 0 to 7 (higher bits are ignored)
    pub fn set_rotation(&mut self, rotation: u8) {
        self.rotation = rotation & 7;
        self.internal_rotation = combine_rotation(self.rotation, self.config.offset_rotation);
    }

    /// Rotation selected by the user
    pub fn rotation(&self) -> u8 {
        self.rotation
    }

    /// Rotation sent to the controller (user rotation plus `offset_rotation`)
    pub fn internal_rotation(&self) -> u8 {
        self.internal_rotation
    }

    /// Visible width in the current rotation
    pub fn width(&self) -> u16 {
        if swaps_axes(self.internal_rotation) {
            self.config.panel_height
        } else {
            self.config.panel_width
        }
    }

    /// Visible height in the current rotation
    pub fn height(&self) -> u16 {
        if swaps_axes(self.internal_rotation) {
            self.config.panel_width
        } else {
            self.config.panel_height
        }
    }

    // Backlight

    /// Prepare the backlight at `brightness`; false without a backlight
    pub fn init_light(&mut self, brightness: u8) -> bool {
        let level = self.light_level(brightness);
        self.light.as_deref_mut().is_some_and(|light| light.init(level))
    }

    /// Set backlight brightness, 0 (off) to 255 (full)
    ///
    /// With `invert` configured the level is sent as `255 - brightness`.
    /// Without a backlight this does nothing.
    pub fn set_brightness(&mut self, brightness: u8) {
        let level = self.light_level(brightness);
        if let Some(light) = self.light.as_deref_mut() {
            light.set_brightness(level);
        }
    }

    fn light_level(&self, brightness: u8) -> u8 {
        if self.config.invert {
            255 - brightness
        } else {
            brightness
        }
    }

    // Touch

    /// Prepare the touch sensor; false without one or if it did not respond
    pub fn init_touch(&mut self) -> bool {
        self.touch.as_deref_mut().is_some_and(|touch| touch.init())
    }

    /// Read up to `points.len()` samples as screen coordinates
    ///
    /// Samples go through the calibration transform, then the current
    /// rotation. Returns the number of points written; 0 when nothing touches
    /// the panel or no sensor is attached.
    pub fn get_touch(&mut self, points: &mut [TouchPoint]) -> usize {
        let count = self.get_touch_raw(points);
        let (width, height) = (self.width(), self.height());
        for point in points.iter_mut().take(count) {
            self.affine.convert(core::slice::from_mut(point));
            (point.x, point.y) = apply_rotation(point.x, point.y, width, height, self.rotation);
        }
        count
    }

    /// Read up to `points.len()` uncorrected samples
    pub fn get_touch_raw(&mut self, points: &mut [TouchPoint]) -> usize {
        match self.touch.as_deref_mut() {
            Some(touch) => touch.read_raw(points).min(points.len()),
            None => 0,
        }
    }

    /// Active calibration transform
    pub fn affine(&self) -> Affine {
        self.affine
    }

    /// Replace the calibration transform
    pub fn set_affine(&mut self, affine: Affine) {
        self.affine = affine;
    }

    /// Solve and apply a calibration from four raw readings
    ///
    /// `parameters` is `[x0, y0, ..., x3, y3]` in anchor order (see
    /// [`affine`](crate::affine)), laid out on the panel as seen through
    /// `offset_rotation`. The active transform is kept on failure.
    ///
    /// # Errors
    ///
    /// `CalibrationError::Singular` for degenerate readings.
    pub fn set_calibrate(&mut self, parameters: &[u16; 8]) -> Result<(), CalibrationError> {
        let (width, height) = self.config.rotated_panel_size();
        self.affine = Affine::calibrate(parameters, width, height)?;
        Ok(())
    }

    /// Run an interactive four-point calibration
    ///
    /// For each anchor the prompt shows a target, then the device waits for a
    /// press followed by a release and keeps the last pressed sample. The
    /// solved transform is applied and returned.
    ///
    /// # Errors
    ///
    /// * `Error::NoTouch` - no sensor attached
    /// * `Error::CalibrationAborted` - the prompt stopped waiting
    /// * `Error::Calibration` - the readings were degenerate
    pub fn touch_calibrate<C, D>(
        &mut self,
        prompt: &mut C,
        delay: &mut D,
    ) -> DeviceResult<Affine, B::Error>
    where
        C: CalibrationPrompt,
        D: DelayNs,
    {
        if self.touch.is_none() {
            return Err(Error::NoTouch);
        }
        let (width, height) = self.config.rotated_panel_size();
        let mut calibration = Calibration::new();
        while let Some((x, y)) = calibration.next_anchor(width, height) {
            prompt.show_target(calibration.len(), x, y);
            let sample = self.wait_for_tap(prompt, delay)?;
            log::debug!(
                "calibration point {} raw ({}, {})",
                calibration.len(),
                sample.x,
                sample.y
            );
            calibration.push(sample);
        }
        let affine = calibration.solve(width, height)?;
        self.affine = affine;
        Ok(affine)
    }

    fn wait_for_tap<C, D>(
        &mut self,
        prompt: &mut C,
        delay: &mut D,
    ) -> DeviceResult<TouchPoint, B::Error>
    where
        C: CalibrationPrompt,
        D: DelayNs,
    {
        let mut sample = [TouchPoint::default()];
        let mut pressed = None;
        loop {
            if !prompt.keep_waiting() {
                return Err(Error::CalibrationAborted);
            }
            if self.get_touch_raw(&mut sample) > 0 {
                pressed = Some(sample[0]);
            } else if let Some(point) = pressed {
                return Ok(point);
            }
            delay.delay_ms(CALIBRATION_POLL_MS);
        }
    }
}

/// Plays command lists through a device, using the caller's delay
struct Sequencer<'s, 'a, P, B, G, D>
where
    P: Panel,
    B: Bus,
    G: Gpio,
{
    device: &'s mut Device<'a, P, B, G>,
    delay: &'s mut D,
}

impl<P, B, G, D> CommandSink for Sequencer<'_, '_, P, B, G, D>
where
    P: Panel,
    B: Bus,
    G: Gpio,
    D: DelayNs,
{
    type Error = Error<B::Error>;

    fn send_command(&mut self, opcode: u8, args: &[u8]) -> Result<(), Self::Error> {
        self.device.send_command(opcode, args)
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}
