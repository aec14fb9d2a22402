//! VTable hooks via pointer replacement
//!
//! Used for the render device: the device vtable is shared by every device
//! instance, so swapping a slot redirects every call.

use parking_lot::RwLock;
use slotmap::{new_key_type, SlotMap};
use std::sync::LazyLock;

use super::HookError;

new_key_type! {
    /// Handle for a vtable hook
    pub struct VTableHookKey;
}

/// Storage for a vtable hook
struct VTableHookEntry {
    /// Address of the vtable slot
    slot_address: *mut *const (),

    /// Original function pointer
    original: *const (),

    /// Debug name
    name: String,
}

// SAFETY: entries are only dereferenced while the registry lock is held
unsafe impl Send for VTableHookEntry {}
unsafe impl Sync for VTableHookEntry {}

/// Global vtable hook registry
static VTABLE_HOOKS: LazyLock<RwLock<SlotMap<VTableHookKey, VTableHookEntry>>> =
    LazyLock::new(|| RwLock::new(SlotMap::with_key()));

/// Write a function pointer into a vtable slot.
///
/// The page is made writable for the write only; its previous protection
/// is put back when the guard drops.
unsafe fn write_slot(slot: *mut *const (), value: *const ()) -> Result<(), HookError> {
    let _guard = region::protect_with_handle(
        slot as *const u8,
        std::mem::size_of::<usize>(),
        region::Protection::READ_WRITE,
    )
    .map_err(|e| HookError::MemoryProtection(e.to_string()))?;

    std::ptr::write_volatile(slot, value);
    Ok(())
}

/// Hook a virtual table entry by vtable address
///
/// # Safety
/// - `vtable` must be a valid vtable pointer
/// - `vtable_index` must be a valid index into the vtable
/// - `new_fn` must have a compatible signature with the original
///
/// # Returns
/// A key to manage the hook, and the original function pointer
pub unsafe fn create_vtable_hook(
    name: &str,
    vtable: *mut *const (),
    vtable_index: usize,
    new_fn: *const (),
) -> Result<(VTableHookKey, *const ()), HookError> {
    if vtable.is_null() {
        return Err(HookError::InvalidAddress(0));
    }

    let slot = vtable.add(vtable_index);
    let original = *slot;
    if original.is_null() {
        return Err(HookError::InvalidAddress(slot as usize));
    }

    tracing::debug!(
        "Creating vtable hook '{}': vtable={:x}, slot[{}]={:x}, original={:x}",
        name,
        vtable as usize,
        vtable_index,
        slot as usize,
        original as usize
    );

    write_slot(slot, new_fn)?;

    let entry = VTableHookEntry {
        slot_address: slot,
        original,
        name: name.to_string(),
    };

    let key = VTABLE_HOOKS.write().insert(entry);

    tracing::info!("Created vtable hook '{}' at index {}", name, vtable_index);

    Ok((key, original))
}

/// Put the original pointer back and forget the hook
pub fn remove_vtable_hook(key: VTableHookKey) -> Result<(), HookError> {
    let mut hooks = VTABLE_HOOKS.write();
    let entry = hooks.get(key).ok_or(HookError::NotFound)?;

    // SAFETY: the slot belonged to a live vtable when the hook was created
    unsafe { write_slot(entry.slot_address, entry.original)? };

    let entry = hooks.remove(key).ok_or(HookError::NotFound)?;
    tracing::info!("Removed vtable hook '{}'", entry.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn first() -> u32 {
        1
    }

    extern "C" fn second() -> u32 {
        2
    }

    extern "C" fn replacement() -> u32 {
        99
    }

    fn call(slot: *const ()) -> u32 {
        let f: extern "C" fn() -> u32 = unsafe { std::mem::transmute(slot) };
        f()
    }

    #[test]
    fn test_hook_create_and_remove() {
        let mut table: Box<[*const (); 2]> = Box::new([first as *const (), second as *const ()]);
        let vtable = table.as_mut_ptr();

        let (key, original) =
            unsafe { create_vtable_hook("test", vtable, 1, replacement as *const ()).unwrap() };

        assert_eq!(call(original), 2);
        assert_eq!(call(table[1]), 99);
        assert_eq!(call(table[0]), 1);

        remove_vtable_hook(key).unwrap();
        assert_eq!(call(table[1]), 2);
        assert!(matches!(remove_vtable_hook(key), Err(HookError::NotFound)));
    }

    #[test]
    fn test_null_vtable_is_rejected() {
        let result = unsafe {
            create_vtable_hook("null", std::ptr::null_mut(), 0, replacement as *const ())
        };
        assert!(matches!(result, Err(HookError::InvalidAddress(0))));
    }
}
