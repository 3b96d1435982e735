//! Rendering-backend abstraction. The engine never talks to a real graphics
//! stack; it draws through these traits and the backend decides what a frame
//! surface, a font, or an image asset actually is.

use anyhow::Result;

/// Number of discrete volume-bar images, one per level 0..=10.
pub const VOLUME_ASSET_COUNT: usize = 11;

/// Asset name for one volume level, part of the backend contract
/// (`volume_0` .. `volume_10`).
pub fn volume_asset_name(level: u8) -> String {
    debug_assert!(usize::from(level) < VOLUME_ASSET_COUNT);
    format!("volume_{level}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 0xFF)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Position {
        Position {
            x: self.x + self.width / 2,
            y: self.y + self.height / 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// Opaque image reference minted by [`Backend::load_image_asset`]. Only
/// meaningful to the backend that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHandle(pub u32);

/// One double-buffered frame surface. Drawing calls paint the back buffer;
/// `present` flips it to the screen and may block on the backend's vsync.
pub trait Surface: Send {
    fn size(&self) -> (u32, u32);

    /// Wipe the back buffer to the transparent background.
    fn clear(&mut self) -> Result<()>;

    fn fill_rect(&mut self, region: Region, color: Color) -> Result<()>;

    fn draw_text(
        &mut self,
        text: &str,
        position: Position,
        align: TextAlign,
        color: Color,
    ) -> Result<()>;

    fn blit(&mut self, image: ImageHandle, position: Position) -> Result<()>;

    fn present(&mut self) -> Result<()>;
}

/// Factory side of the backend: owns surface creation and asset resolution.
pub trait Backend {
    fn create_surface(&mut self) -> Result<Box<dyn Surface>>;

    fn load_image_asset(&mut self, name: &str) -> Result<ImageHandle>;
}
