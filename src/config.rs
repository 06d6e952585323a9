//! Device configuration types and builder

pub use crate::error::BuilderError;

/// Highest valid `offset_rotation` value
///
/// Values 4 to 7 are the mirrored counterparts of 0 to 3.
pub const MAX_OFFSET_ROTATION: u8 = 7;

/// Panel device configuration
///
/// A plain value type: it is copied into the device, never shared. Pins set
/// to `None` are unused and the default pin handling skips them.
///
/// Use [`Builder`] to get a validated `Config`; [`Config::default`] matches a
/// 240x240 controller with no pins assigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Chip-select pin number
    pub pin_cs: Option<u16>,
    /// Reset pin number
    pub pin_rst: Option<u16>,
    /// Busy pin number
    pub pin_busy: Option<u16>,
    /// Maximum image width the controller memory can hold
    pub memory_width: u16,
    /// Maximum image height the controller memory can hold
    pub memory_height: u16,
    /// Visible width of the panel
    pub panel_width: u16,
    /// Visible height of the panel
    pub panel_height: u16,
    /// X offset of the visible area inside controller memory
    pub offset_x: u16,
    /// Y offset of the visible area inside controller memory
    pub offset_y: u16,
    /// Rotation offset, 0 to 7 (4 to 7 are vertically mirrored)
    pub offset_rotation: u8,
    /// Dummy bits clocked before a pixel readout
    pub dummy_read_pixel: u8,
    /// Dummy bits clocked before a data readout
    pub dummy_read_bits: u8,
    /// Whether the controller can be read back
    pub readable: bool,
    /// Inverted brightness polarity (e.g. IPS panels)
    pub invert: bool,
    /// Red/blue channel order (true = RGB, false = BGR)
    pub rgb_order: bool,
    /// Transmit words as 16-bit units
    pub dlen_16bit: bool,
    /// The bus is shared with another subsystem (e.g. an SD card)
    pub bus_shared: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pin_cs: None,
            pin_rst: None,
            pin_busy: None,
            memory_width: 240,
            memory_height: 240,
            panel_width: 240,
            panel_height: 240,
            offset_x: 0,
            offset_y: 0,
            offset_rotation: 0,
            dummy_read_pixel: 8,
            dummy_read_bits: 1,
            readable: true,
            invert: false,
            rgb_order: false,
            dlen_16bit: false,
            bus_shared: true,
        }
    }
}

impl Config {
    /// Check the geometry invariants
    ///
    /// [`Builder::build`] always runs this; call it directly when a `Config` is
    /// assembled by hand. A config that fails here is unsupported.
    ///
    /// # Errors
    ///
    /// - `BuilderError::PanelExceedsMemory` if the visible area is larger than memory
    /// - `BuilderError::OffsetOutOfRange` if the offset pushes the panel past memory
    /// - `BuilderError::InvalidOffsetRotation` if `offset_rotation > 7`
    pub fn validate(&self) -> Result<(), BuilderError> {
        if self.panel_width > self.memory_width || self.panel_height > self.memory_height {
            return Err(BuilderError::PanelExceedsMemory {
                panel_width: self.panel_width,
                panel_height: self.panel_height,
                memory_width: self.memory_width,
                memory_height: self.memory_height,
            });
        }
        let right = u32::from(self.offset_x) + u32::from(self.panel_width);
        let bottom = u32::from(self.offset_y) + u32::from(self.panel_height);
        if right > u32::from(self.memory_width) || bottom > u32::from(self.memory_height) {
            return Err(BuilderError::OffsetOutOfRange {
                offset_x: self.offset_x,
                offset_y: self.offset_y,
            });
        }
        if self.offset_rotation > MAX_OFFSET_ROTATION {
            return Err(BuilderError::InvalidOffsetRotation(self.offset_rotation));
        }
        Ok(())
    }

    /// Visible size as seen through `offset_rotation`
    ///
    /// Odd rotations swap width and height.
    pub fn rotated_panel_size(&self) -> (u16, u16) {
        if self.offset_rotation & 1 != 0 {
            (self.panel_height, self.panel_width)
        } else {
            (self.panel_width, self.panel_height)
        }
    }
}

/// Builder for constructing device configuration
///
/// # Example
///
/// ```rust
/// use panel_device::Builder;
///
/// let config = match Builder::new()
///     .memory_size(240, 320)
///     .panel_size(240, 280)
///     .offset(0, 20)
///     .pin_cs(5)
///     .pin_rst(4)
///     .invert(true)
///     .build()
/// {
///     Ok(config) => config,
///     Err(_) => return,
/// };
/// assert_eq!(config.panel_height, 280);
/// assert_eq!(config.pin_busy, None);
/// ```
#[must_use]
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    /// Create a new Builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chip-select pin
    pub fn pin_cs(mut self, pin: u16) -> Self {
        self.config.pin_cs = Some(pin);
        self
    }

    /// Set the reset pin
    pub fn pin_rst(mut self, pin: u16) -> Self {
        self.config.pin_rst = Some(pin);
        self
    }

    /// Set the busy pin
    pub fn pin_busy(mut self, pin: u16) -> Self {
        self.config.pin_busy = Some(pin);
        self
    }

    /// Set the controller memory size
    pub fn memory_size(mut self, width: u16, height: u16) -> Self {
        self.config.memory_width = width;
        self.config.memory_height = height;
        self
    }

    /// Set the visible panel size
    pub fn panel_size(mut self, width: u16, height: u16) -> Self {
        self.config.panel_width = width;
        self.config.panel_height = height;
        self
    }

    /// Set the offset of the visible area inside memory
    pub fn offset(mut self, x: u16, y: u16) -> Self {
        self.config.offset_x = x;
        self.config.offset_y = y;
        self
    }

    /// Set the rotation offset (0 to 7)
    pub fn offset_rotation(mut self, rotation: u8) -> Self {
        self.config.offset_rotation = rotation;
        self
    }

    /// Set dummy read lengths in bits (pixel readout, data readout)
    pub fn dummy_read(mut self, pixel_bits: u8, data_bits: u8) -> Self {
        self.config.dummy_read_pixel = pixel_bits;
        self.config.dummy_read_bits = data_bits;
        self
    }

    /// Set whether the controller can be read back
    pub fn readable(mut self, value: bool) -> Self {
        self.config.readable = value;
        self
    }

    /// Set inverted brightness polarity
    pub fn invert(mut self, value: bool) -> Self {
        self.config.invert = value;
        self
    }

    /// Set RGB (true) or BGR (false) channel order
    pub fn rgb_order(mut self, value: bool) -> Self {
        self.config.rgb_order = value;
        self
    }

    /// Force 16-bit transmit words
    pub fn dlen_16bit(mut self, value: bool) -> Self {
        self.config.dlen_16bit = value;
        self
    }

    /// Set whether the bus is shared with another subsystem
    pub fn bus_shared(mut self, value: bool) -> Self {
        self.config.bus_shared = value;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// See [`Config::validate`].
    pub fn build(self) -> Result<Config, BuilderError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_panel_fits_memory() {
        let config = Config::default();
        assert!(config.panel_width <= config.memory_width);
        assert!(config.panel_height <= config.memory_height);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_pins_unused() {
        let config = Config::default();
        assert_eq!(config.pin_cs, None);
        assert_eq!(config.pin_rst, None);
        assert_eq!(config.pin_busy, None);
        assert!(config.bus_shared);
        assert!(config.readable);
    }

    #[test]
    fn test_builder_rejects_wide_panel() {
        let result = Builder::new()
            .memory_size(240, 320)
            .panel_size(320, 240)
            .build();
        assert_eq!(
            result,
            Err(BuilderError::PanelExceedsMemory {
                panel_width: 320,
                panel_height: 240,
                memory_width: 240,
                memory_height: 320,
            })
        );
    }

    #[test]
    fn test_builder_rejects_offset_past_memory() {
        let result = Builder::new()
            .memory_size(240, 320)
            .panel_size(240, 240)
            .offset(0, 81)
            .build();
        assert_eq!(
            result,
            Err(BuilderError::OffsetOutOfRange {
                offset_x: 0,
                offset_y: 81
            })
        );
    }

    #[test]
    fn test_builder_accepts_offset_at_edge() {
        let config = Builder::new()
            .memory_size(240, 320)
            .panel_size(240, 240)
            .offset(0, 80)
            .build()
            .unwrap();
        assert_eq!(config.offset_y, 80);
    }

    #[test]
    fn test_builder_rejects_rotation_eight() {
        let result = Builder::new().offset_rotation(8).build();
        assert_eq!(result, Err(BuilderError::InvalidOffsetRotation(8)));
    }

    #[test]
    fn test_rotated_panel_size_swaps_on_odd() {
        let config = Builder::new()
            .memory_size(240, 320)
            .panel_size(135, 240)
            .offset_rotation(3)
            .build()
            .unwrap();
        assert_eq!(config.rotated_panel_size(), (240, 135));
        let config = Config {
            offset_rotation: 4,
            ..config
        };
        assert_eq!(config.rotated_panel_size(), (135, 240));
    }
}
