//! Authorization popup placement

use crate::models::HandshakeError;
use crate::settings::HandshakeSettings;

const WINDOW_CHROME: &str = concat!(
    "toolbar=no, location=no, directories=no, status=no, ",
    "menubar=no, resizable=no, copyhistory=no"
);

/// Size and position of the authorization window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupGeometry {
    pub width: u32,
    pub height: u32,
    pub top: u32,
    pub left: u32,
}

impl PopupGeometry {
    /// Center a `width` x `height` window on the screen
    ///
    /// A window larger than the screen is pinned to the top-left corner.
    #[must_use]
    pub fn centered(screen_width: u32, screen_height: u32, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            top: screen_height.saturating_sub(height) / 2,
            left: screen_width.saturating_sub(width) / 2,
        }
    }

    #[must_use]
    pub fn from_settings(settings: &HandshakeSettings) -> Self {
        Self::centered(
            settings.screen_width,
            settings.screen_height,
            settings.popup_width,
            settings.popup_height,
        )
    }

    /// Window features for a chrome-less, fixed-size child window
    #[must_use]
    pub fn features(&self) -> String {
        format!(
            "{WINDOW_CHROME}, width={}, height={}, top={}, left={}",
            self.width, self.height, self.top, self.left
        )
    }
}

/// Opens the authorization URL in a child window
///
/// Implementations that drive a real window pass [`PopupGeometry::features`]
/// as its feature string.
pub trait PopupOpener: Send + Sync {
    /// # Errors
    ///
    /// Returns `HandshakeError::Popup` if the window cannot be opened.
    fn open(&self, url: &str, geometry: &PopupGeometry) -> Result<(), HandshakeError>;
}

/// Opener for headless runs: logs the URL for the user to open by hand
pub struct LoggingPopupOpener;

impl PopupOpener for LoggingPopupOpener {
    fn open(&self, url: &str, geometry: &PopupGeometry) -> Result<(), HandshakeError> {
        log::info!("🔗 Open {url} to continue authorization");
        log::debug!("Authorization window features: {}", geometry.features());
        Ok(())
    }
}
