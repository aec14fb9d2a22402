//! Render device hooks
//!
//! Hooks EndScene and Reset on the device vtable. Every EndScene fires the
//! registered render callbacks before the game's own EndScene runs; every
//! Reset fires the reset callbacks first.
//!
//! Callbacks may restore the hooks from inside a callback (self-destruct
//! does this). The original function pointer is read before any callback
//! runs, and the callback list is snapshotted, so that is safe.

use std::ffi::c_void;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use gwtb_sdk::{Device, IDirect3DDevice9};
use parking_lot::{Mutex, RwLock};
use slotmap::{new_key_type, SlotMap};

use super::vtable::{create_vtable_hook, remove_vtable_hook, VTableHookKey};
use super::HookError;
use crate::modules::panic_message;

/// IDirect3DDevice9::Reset
pub const RESET_INDEX: usize = 16;
/// IDirect3DDevice9::EndScene
pub const END_SCENE_INDEX: usize = 42;

type EndSceneFn = unsafe extern "system" fn(*mut IDirect3DDevice9) -> i32;
type ResetFn = unsafe extern "system" fn(*mut IDirect3DDevice9, *mut c_void) -> i32;

const D3D_OK: i32 = 0;

new_key_type! {
    /// Key for registered render/reset callbacks
    pub struct RenderCallbackKey;
}

/// Callback invoked with the device
pub type RenderCallback = Arc<dyn Fn(Device) + Send + Sync>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum CallbackKind {
    Render,
    Reset,
}

static CALLBACKS: LazyLock<RwLock<SlotMap<RenderCallbackKey, (CallbackKind, RenderCallback)>>> =
    LazyLock::new(|| RwLock::new(SlotMap::with_key()));

struct InstalledHooks {
    end_scene: VTableHookKey,
    reset: VTableHookKey,
    end_scene_original: EndSceneFn,
    reset_original: ResetFn,
}

static INSTALLED: LazyLock<Mutex<Option<InstalledHooks>>> = LazyLock::new(|| Mutex::new(None));

/// Frame counter (increments every EndScene)
static FRAME_COUNT: AtomicU64 = AtomicU64::new(0);

/// Last frame's callback time (nanoseconds)
static LAST_FRAME_TIME_NS: AtomicU64 = AtomicU64::new(0);

/// Register a callback to run on every EndScene
pub fn register_render_callback<F>(callback: F) -> RenderCallbackKey
where
    F: Fn(Device) + Send + Sync + 'static,
{
    CALLBACKS
        .write()
        .insert((CallbackKind::Render, Arc::new(callback)))
}

/// Register a callback to run before every device Reset
pub fn register_reset_callback<F>(callback: F) -> RenderCallbackKey
where
    F: Fn(Device) + Send + Sync + 'static,
{
    CALLBACKS
        .write()
        .insert((CallbackKind::Reset, Arc::new(callback)))
}

/// Unregister a callback
///
/// # Returns
/// `true` if the callback was found and removed
pub fn unregister_callback(key: RenderCallbackKey) -> bool {
    CALLBACKS.write().remove(key).is_some()
}

pub fn frame_count() -> u64 {
    FRAME_COUNT.load(Ordering::Relaxed)
}

pub fn last_frame_time_ns() -> u64 {
    LAST_FRAME_TIME_NS.load(Ordering::Relaxed)
}

pub fn is_installed() -> bool {
    INSTALLED.lock().is_some()
}

/// Install the EndScene and Reset hooks
///
/// # Safety
/// `vtable` must point at a live IDirect3DDevice9 vtable.
pub unsafe fn install(vtable: NonNull<*const ()>) -> Result<(), HookError> {
    let mut installed = INSTALLED.lock();
    if installed.is_some() {
        return Err(HookError::AlreadyInstalled("render device"));
    }

    let vtable = vtable.as_ptr() as *mut *const ();
    let (end_scene, end_scene_original) = create_vtable_hook(
        "EndScene",
        vtable,
        END_SCENE_INDEX,
        end_scene_detour as *const (),
    )?;
    let (reset, reset_original) =
        match create_vtable_hook("Reset", vtable, RESET_INDEX, reset_detour as *const ()) {
            Ok(hook) => hook,
            Err(e) => {
                let _ = remove_vtable_hook(end_scene);
                return Err(e);
            }
        };

    *installed = Some(InstalledHooks {
        end_scene,
        reset,
        end_scene_original: std::mem::transmute::<*const (), EndSceneFn>(end_scene_original),
        reset_original: std::mem::transmute::<*const (), ResetFn>(reset_original),
    });
    Ok(())
}

/// Put the original EndScene and Reset back.
///
/// Returns `false` when nothing was installed.
pub fn restore() -> bool {
    let Some(hooks) = INSTALLED.lock().take() else {
        return false;
    };
    for key in [hooks.end_scene, hooks.reset] {
        if let Err(e) = remove_vtable_hook(key) {
            tracing::error!("Failed to restore render hook: {}", e);
        }
    }
    tracing::info!("Render hooks restored");
    true
}

fn snapshot(kind: CallbackKind) -> Vec<RenderCallback> {
    CALLBACKS
        .read()
        .values()
        .filter(|(k, _)| *k == kind)
        .map(|(_, callback)| callback.clone())
        .collect()
}

fn fire(kind: CallbackKind, device: Device) {
    for callback in snapshot(kind) {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(device))) {
            tracing::error!("Render callback panicked: {}", panic_message(payload.as_ref()));
        }
    }
}

/// Run the render callbacks for one frame
pub fn on_render(device: Device) {
    let start = std::time::Instant::now();
    FRAME_COUNT.fetch_add(1, Ordering::Relaxed);

    fire(CallbackKind::Render, device);

    let elapsed = start.elapsed().as_nanos() as u64;
    LAST_FRAME_TIME_NS.store(elapsed, Ordering::Relaxed);

    // Anything near a full 60Hz frame is worth knowing about
    if elapsed > 16_000_000 {
        tracing::debug!(
            "Render callbacks took {}ms (frame {})",
            elapsed / 1_000_000,
            FRAME_COUNT.load(Ordering::Relaxed)
        );
    }
}

/// Run the reset callbacks
pub fn on_reset(device: Device) {
    fire(CallbackKind::Reset, device);
}

unsafe extern "system" fn end_scene_detour(device: *mut IDirect3DDevice9) -> i32 {
    let original = INSTALLED.lock().as_ref().map(|h| h.end_scene_original);
    if let Some(device) = Device::from_raw(device as *mut c_void) {
        on_render(device);
    }
    match original {
        Some(end_scene) => end_scene(device),
        None => D3D_OK,
    }
}

unsafe extern "system" fn reset_detour(
    device: *mut IDirect3DDevice9,
    params: *mut c_void,
) -> i32 {
    let original = INSTALLED.lock().as_ref().map(|h| h.reset_original);
    if let Some(device) = Device::from_raw(device as *mut c_void) {
        on_reset(device);
    }
    match original {
        Some(reset) => reset(device, params),
        None => D3D_OK,
    }
}
