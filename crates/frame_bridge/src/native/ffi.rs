//! `extern "C"` binding to the native `rendering` library
//!
//! The library hands out heap pointers for renderers and frames and expects
//! each one back through `drop_instance` exactly once. Pointers are carried as
//! [`RawHandle`] addresses; the null check happens here, at the boundary.

#![allow(unsafe_code)]

use std::ffi::{c_uchar, c_uint, c_void};

use super::{Channel, HandleKind, NativeError, NativeRenderer, RawHandle};
use crate::scene::SceneId;

#[link(name = "rendering")]
extern "C" {
    fn get_renderer(scene: c_uint) -> *mut c_void;
    fn render_scene(renderer: *mut c_void) -> *mut c_void;
    fn get_width(frame: *mut c_void) -> c_uint;
    fn get_height(frame: *mut c_void) -> c_uint;
    fn get_value(frame: *mut c_void, x: c_uint, y: c_uint, c: c_uint) -> c_uchar;
    fn get_data(frame: *mut c_void) -> *const c_uchar;
    fn drop_instance(instance: *mut c_void);
}

/// [`NativeRenderer`] backed by the linked `rendering` library
///
/// The library keeps no global state between handles, so calls on different
/// handles may run concurrently. Same-handle serialization is the caller's
/// job (the renderer cache does it).
#[derive(Debug, Default)]
pub struct FfiEngine {
    bulk_access: bool,
}

impl FfiEngine {
    /// Binding that marshals through `get_value` only
    pub const fn new() -> Self {
        Self { bulk_access: false }
    }

    /// Also expose `get_data` as a bulk accessor
    #[must_use]
    pub const fn with_bulk_access(mut self) -> Self {
        self.bulk_access = true;
        self
    }

    fn ptr(handle: RawHandle) -> *mut c_void {
        handle.addr() as *mut c_void
    }

    fn handle(ptr: *mut c_void, kind: HandleKind) -> Result<RawHandle, NativeError> {
        RawHandle::from_addr(ptr as usize).ok_or(NativeError::NullHandle(kind))
    }
}

impl NativeRenderer for FfiEngine {
    fn create_renderer(&self, scene: SceneId) -> Result<RawHandle, NativeError> {
        // SAFETY: plain integer argument, the library owns the returned pointer
        let ptr = unsafe { get_renderer(scene.get()) };
        Self::handle(ptr, HandleKind::Renderer)
    }

    fn render(&self, renderer: RawHandle) -> Result<RawHandle, NativeError> {
        // SAFETY: `renderer` came from `get_renderer` and has not been released
        let ptr = unsafe { render_scene(Self::ptr(renderer)) };
        Self::handle(ptr, HandleKind::Frame)
    }

    fn frame_width(&self, frame: RawHandle) -> u32 {
        // SAFETY: `frame` came from `render_scene` and has not been released
        unsafe { get_width(Self::ptr(frame)) }
    }

    fn frame_height(&self, frame: RawHandle) -> u32 {
        // SAFETY: as above
        unsafe { get_height(Self::ptr(frame)) }
    }

    fn frame_channel(
        &self,
        frame: RawHandle,
        x: u32,
        y: u32,
        channel: Channel,
    ) -> Result<u8, NativeError> {
        // SAFETY: live frame; the marshaller keeps x and y inside the reported size
        Ok(unsafe { get_value(Self::ptr(frame), x, y, channel.index()) })
    }

    fn copy_frame(&self, frame: RawHandle, dst: &mut [u8]) -> Result<bool, NativeError> {
        if !self.bulk_access {
            return Ok(false);
        }
        // SAFETY: live frame
        let data = unsafe { get_data(Self::ptr(frame)) };
        if data.is_null() {
            return Err(NativeError::RenderFailed("get_data returned null".to_string()));
        }
        // SAFETY: the library stores width * height RGBA8 pixels contiguously and
        // `dst` was sized from the same width and height
        let src = unsafe { std::slice::from_raw_parts(data, dst.len()) };
        dst.copy_from_slice(src);
        Ok(true)
    }

    fn release(&self, handle: RawHandle) {
        // SAFETY: every handle reaches here exactly once, via its owning guard
        unsafe { drop_instance(Self::ptr(handle)) }
    }
}
