//! Native guest provider
//!
//! Loads the guest from a shared library and implements [`GuestRuntime`]
//! over its C entry points. The guest calls back through plain C function
//! pointers with no user data, so callbacks land in a process-wide inbox that
//! the active tick drains before returning.

use crate::config::BridgeConfig;
use crate::error::{MirrorError, Result};
use crate::ffi::*;
use crate::logger::guest_logger;
use crate::runtime::{GuestRuntime, InboundEntity, InboundSink, SpawnRequest};
use libloading::{Library, Symbol};
use parking_lot::{const_mutex, Mutex};
use std::ffi::{c_void, CString};
use std::path::{Path, PathBuf};
use void_scene::Entity;

/// A structural command copied out of guest memory
enum InboundMessage {
    Create(Vec<(TemplateRef, Vec<InbuiltData>)>),
    Update(Vec<(GuestEntityId, Vec<InbuiltData>)>),
    Destroy(Vec<GuestEntityId>),
}

static INBOX: Mutex<Vec<InboundMessage>> = const_mutex(Vec::new());

/// Held for the whole of a native tick so two guests never share the inbox
static TICK_GATE: Mutex<()> = const_mutex(());

unsafe fn copy_batch<H: Copy>(data: *const FfiEntityData<H>, count: usize) -> Vec<(H, Vec<InbuiltData>)> {
    if data.is_null() || count == 0 {
        return Vec::new();
    }
    std::slice::from_raw_parts(data, count)
        .iter()
        .map(|entry| {
            let records = if entry.data.is_null() || entry.len == 0 {
                Vec::new()
            } else {
                std::slice::from_raw_parts(entry.data, entry.len).to_vec()
            };
            (entry.handle, records)
        })
        .collect()
}

unsafe extern "C" fn on_create(data: *const FfiCreateData, count: usize) {
    let batch = copy_batch(data, count);
    INBOX.lock().push(InboundMessage::Create(batch));
}

unsafe extern "C" fn on_update(data: *const FfiUpdateData, count: usize) {
    let batch = copy_batch(data, count);
    INBOX.lock().push(InboundMessage::Update(batch));
}

unsafe extern "C" fn on_destroy(ids: *const GuestEntityId, count: usize) {
    let ids = if ids.is_null() || count == 0 {
        Vec::new()
    } else {
        std::slice::from_raw_parts(ids, count).to_vec()
    };
    INBOX.lock().push(InboundMessage::Destroy(ids));
}

fn views<H: Copy>(batch: &[(H, Vec<InbuiltData>)]) -> Vec<InboundEntity<'_, H>> {
    batch
        .iter()
        .map(|(handle, records)| InboundEntity {
            handle: *handle,
            records,
        })
        .collect()
}

/// Forward drained messages in the order the guest issued them
/// Drop callbacks fired outside a tick. Returns how many batches were lost.
fn discard_stray() -> usize {
    let stray = std::mem::take(&mut *INBOX.lock());
    if !stray.is_empty() {
        log::warn!(
            "Discarding {} callback batches the guest sent outside tick",
            stray.len()
        );
    }
    stray.len()
}

fn dispatch(messages: Vec<InboundMessage>, sink: &mut dyn InboundSink) {
    for message in messages {
        match message {
            InboundMessage::Create(batch) => sink.create(&views(&batch)),
            InboundMessage::Update(batch) => sink.update(&views(&batch)),
            InboundMessage::Destroy(ids) => sink.destroy(&ids),
        }
    }
}

/// A guest running in a loaded shared library
pub struct NativeGuest {
    context: *mut c_void,
    register_fn: RegisterFn,
    spawn_fn: SpawnFn,
    tick_fn: TickFn,
    unload_fn: UnloadFn,
    path: PathBuf,
    // Keeps the entry points above valid; dropped last
    _library: Library,
}

impl NativeGuest {
    /// Load, construct and initialize the guest described by `config`
    pub fn load(config: &BridgeConfig) -> Result<Self> {
        let path = config.library.as_path();

        let library = unsafe {
            Library::new(path).map_err(|e| MirrorError::load_error(path, e.to_string()))?
        };

        let symbols = &config.symbols;
        let construct: ConstructFn = unsafe { lookup(&library, path, &symbols.construct)? };
        let load: LoadFn = unsafe { lookup(&library, path, &symbols.load)? };
        let init: InitFn = unsafe { lookup(&library, path, &symbols.init)? };
        let register_fn: RegisterFn = unsafe { lookup(&library, path, &symbols.register)? };
        let spawn_fn: SpawnFn = unsafe { lookup(&library, path, &symbols.spawn)? };
        let tick_fn: TickFn = unsafe { lookup(&library, path, &symbols.tick)? };
        let unload_fn: UnloadFn = unsafe { lookup(&library, path, &symbols.unload)? };

        let base_path = CString::new(config.base_path.to_string_lossy().as_bytes())
            .map_err(|e| MirrorError::Config(format!("base_path: {}", e)))?;

        unsafe { construct() };
        let context = unsafe { load(guest_logger) };
        if context.is_null() {
            return Err(MirrorError::transport(format!(
                "'{}' returned no context from {}",
                path.display(),
                symbols.load
            )));
        }

        unsafe { init(context, base_path.as_ptr(), on_create, on_update, on_destroy) };

        log::info!("Loaded guest module '{}'", path.display());

        Ok(Self {
            context,
            register_fn,
            spawn_fn,
            tick_fn,
            unload_fn,
            path: path.to_path_buf(),
            _library: library,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Resolve an entry point and copy the function pointer out
unsafe fn lookup<T: Copy>(library: &Library, path: &Path, name: &str) -> Result<T> {
    let symbol: Symbol<T> = library
        .get(name.as_bytes())
        .map_err(|_| MirrorError::symbol_not_found(path.display().to_string(), name))?;
    Ok(*symbol)
}

impl GuestRuntime for NativeGuest {
    fn register(&mut self, family_id: i32, templates: &[Entity]) -> Result<()> {
        let handles: Vec<EntityMirror> = templates.iter().copied().map(EntityMirror::from).collect();
        let family = FfiTemplateFamily {
            family_id,
            handles: handles.as_ptr(),
            length: handles.len(),
        };
        unsafe { (self.register_fn)(self.context, family) };
        Ok(())
    }

    fn spawn(&mut self, request: &SpawnRequest<'_>) -> GuestEntityId {
        let raw = unsafe {
            (self.spawn_fn)(
                self.context,
                EntityMirror::from(request.host),
                request.components.as_ptr(),
                request.components.len(),
                request.custom.as_ptr(),
                request.custom.len(),
                request.custom_state.as_ptr(),
                request.custom_state.len(),
            )
        };
        GuestEntityId::new(raw)
    }

    fn tick(&mut self, sink: &mut dyn InboundSink) -> Result<()> {
        let _gate = TICK_GATE.lock();
        discard_stray();

        unsafe { (self.tick_fn)(self.context) };

        let messages = std::mem::take(&mut *INBOX.lock());
        dispatch(messages, sink);
        Ok(())
    }
}

impl Drop for NativeGuest {
    fn drop(&mut self) {
        unsafe { (self.unload_fn)(self.context) };
        log::info!("Unloaded guest module '{}'", self.path.display());
    }
}
