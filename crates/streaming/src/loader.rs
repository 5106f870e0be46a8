use image::RgbaImage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    Network(String),
    Status(u16),
    Decode(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Network(msg) => write!(f, "network error: {msg}"),
            LoadError::Status(code) => write!(f, "unexpected http status {code}"),
            LoadError::Decode(msg) => write!(f, "image decode failed: {msg}"),
        }
    }
}

impl std::error::Error for LoadError {}

/// Host-provided asynchronous image fetcher.
///
/// `load` must return immediately. The host later reports the outcome for
/// `request` (bytes or an error) back to whoever issued it; completions may
/// arrive in any order.
pub trait ImageLoader {
    fn load(&mut self, request: crate::Request, url: &str);
}

/// Decodes PNG/JPEG bytes into straight-alpha RGBA.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, LoadError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| LoadError::Decode(e.to_string()))
}
