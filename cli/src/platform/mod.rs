//! Real desktop backends.

use autosweep_core::{InputInjector, ScreenCapture};

#[cfg(windows)]
mod win32;

pub type Screen = Box<dyn ScreenCapture>;
pub type Mouse = Box<dyn InputInjector>;

#[cfg(windows)]
pub fn desktop() -> anyhow::Result<(Screen, Mouse)> {
    Ok((Box::new(win32::GdiScreen), Box::new(win32::SendInputMouse)))
}

#[cfg(not(windows))]
pub fn desktop() -> anyhow::Result<(Screen, Mouse)> {
    anyhow::bail!("playing on the real desktop is only supported on Windows, try `simulate`")
}
