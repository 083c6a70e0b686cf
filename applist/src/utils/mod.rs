pub mod fs;
pub use fs::*;

pub mod html;
pub use html::*;

use base64::Engine;

pub fn base64_bytes(data: &[u8]) -> String {
    let eng = base64::engine::general_purpose::STANDARD;
    eng.encode(data)
}

pub fn unbase64(s: &str) -> Option<Vec<u8>> {
    let eng = base64::engine::general_purpose::STANDARD;
    eng.decode(s).ok()
}
