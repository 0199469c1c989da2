use std::ffi::c_void;

use autosweep_core::{
    InputInjector, PixelBlock, PixelRect, Result, Rgb, ScreenCapture, ScreenPoint, SweepError,
};
use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Gdi::{
    BI_RGB, BITMAPINFO, BITMAPINFOHEADER, BitBlt, CreateCompatibleDC, CreateDIBSection,
    DIB_RGB_COLORS, DeleteDC, DeleteObject, GetDC, HGDIOBJ, ReleaseDC, SRCCOPY, SelectObject,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    INPUT, INPUT_0, INPUT_MOUSE, MOUSE_EVENT_FLAGS, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP,
    MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP, MOUSEINPUT, SendInput,
};
use windows::Win32::UI::WindowsAndMessaging::SetCursorPos;

/// Copies screen pixels through a top-down 32-bit DIB section.
pub struct GdiScreen;

impl ScreenCapture for GdiScreen {
    fn capture(&mut self, rect: PixelRect) -> Result<PixelBlock> {
        let fail = |reason: &str| SweepError::Capture {
            rect,
            reason: reason.to_string(),
        };
        let width = i32::try_from(rect.width).map_err(|_| fail("width out of range"))?;
        let height = i32::try_from(rect.height).map_err(|_| fail("height out of range"))?;

        unsafe {
            let screen_dc = GetDC(HWND(0));
            if screen_dc.0 == 0 {
                return Err(fail("GetDC failed"));
            }
            let memory_dc = CreateCompatibleDC(screen_dc);
            if memory_dc.0 == 0 {
                ReleaseDC(HWND(0), screen_dc);
                return Err(fail("CreateCompatibleDC failed"));
            }

            let mut bitmap_info = BITMAPINFO::default();
            bitmap_info.bmiHeader = BITMAPINFOHEADER {
                biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width,
                biHeight: -height,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            };

            let mut bits: *mut c_void = std::ptr::null_mut();
            let dib = match CreateDIBSection(
                memory_dc,
                &bitmap_info,
                DIB_RGB_COLORS,
                &mut bits,
                None,
                0,
            ) {
                Ok(bitmap) => bitmap,
                Err(err) => {
                    DeleteDC(memory_dc);
                    ReleaseDC(HWND(0), screen_dc);
                    return Err(fail(&format!("CreateDIBSection failed: {}", err)));
                }
            };
            let dib_object: HGDIOBJ = dib.into();
            let previous = SelectObject(memory_dc, dib_object);

            let copied = BitBlt(
                memory_dc, 0, 0, width, height, screen_dc, rect.x, rect.y, SRCCOPY,
            );
            let pixels = if copied.is_ok() && !bits.is_null() {
                // BGRA, rows top to bottom
                let raw = std::slice::from_raw_parts(bits as *const u8, rect.area() * 4);
                Some(
                    raw.chunks_exact(4)
                        .map(|px| Rgb::new(px[2], px[1], px[0]))
                        .collect::<Vec<_>>(),
                )
            } else {
                None
            };

            SelectObject(memory_dc, previous);
            DeleteObject(dib_object);
            DeleteDC(memory_dc);
            ReleaseDC(HWND(0), screen_dc);

            match (pixels, copied) {
                (Some(pixels), _) => PixelBlock::new(rect, pixels),
                (None, Err(err)) => Err(fail(&format!("BitBlt failed: {}", err))),
                (None, Ok(())) => Err(fail("DIB section has no pixel buffer")),
            }
        }
    }
}

/// Moves the cursor and sends a press and release through `SendInput`.
pub struct SendInputMouse;

impl SendInputMouse {
    fn click(&self, at: ScreenPoint, down: MOUSE_EVENT_FLAGS, up: MOUSE_EVENT_FLAGS) {
        unsafe {
            if let Err(err) = SetCursorPos(at.x, at.y) {
                log::warn!("could not move cursor to {:?}: {}", at, err);
                return;
            }
            let inputs = [mouse_input(down), mouse_input(up)];
            let sent = SendInput(&inputs, std::mem::size_of::<INPUT>() as i32);
            if sent as usize != inputs.len() {
                log::warn!("only {} of {} mouse events were sent", sent, inputs.len());
            }
        }
    }
}

fn mouse_input(flags: MOUSE_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dwFlags: flags,
                ..Default::default()
            },
        },
    }
}

impl InputInjector for SendInputMouse {
    fn primary_click(&mut self, at: ScreenPoint) {
        self.click(at, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP);
    }

    fn secondary_click(&mut self, at: ScreenPoint) {
        self.click(at, MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP);
    }
}
