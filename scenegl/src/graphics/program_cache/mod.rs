//! Program cache
//!
//! Maps structural program keys to linked programs. Programs live in an arena
//! and drawables hold generation-checked [`ProgramHandle`]s; every
//! [`ProgramCache::acquire`] must be paired with one [`ProgramCache::release`].
//! The use count of an entry equals the number of outstanding acquires, and
//! the GPU program is destroyed as soon as it drops to zero.

#[cfg(test)]
mod tests;

use hashbrown::HashMap;

use super::device::GraphicsDevice;
use super::program::{CompiledProgram, ProgramError};
use crate::shader_gen::{ProgramKey, ProgramSource, ShaderOptions, synthesize_key};

/// Generation-checked reference to a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle {
    index: u32,
    generation: u32,
}

impl ProgramHandle {
    /// Arena slot; stable while the handle is live, used as the draw sort key
    pub fn index(self) -> u32 {
        self.index
    }
}

/// Error type for handle misuse
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProgramCacheError {
    #[error("program handle {0:?} refers to a destroyed program")]
    StaleHandle(ProgramHandle),
    #[error("program handle {0:?} was not issued by this cache")]
    UnknownHandle(ProgramHandle),
}

/// Cache counters since creation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub compiles: u64,
    pub failures: u64,
    pub destroyed: u64,
}

struct CacheEntry {
    key: ProgramKey,
    source: ProgramSource,
    program: CompiledProgram,
    use_count: u32,
}

struct Slot {
    generation: u32,
    entry: Option<CacheEntry>,
}

/// Use-counted cache of linked programs
pub struct ProgramCache {
    options: ShaderOptions,
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_key: HashMap<ProgramKey, u32>,
    stats: CacheStats,
}

impl ProgramCache {
    /// Create an empty cache. `options` stay fixed for the cache's lifetime.
    pub fn new(options: ShaderOptions) -> Self {
        Self {
            options,
            slots: Vec::new(),
            free: Vec::new(),
            by_key: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn options(&self) -> &ShaderOptions {
        &self.options
    }

    /// Acquire the program for `key`, synthesizing and linking it on a miss
    pub fn acquire<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        key: &ProgramKey,
    ) -> Result<ProgramHandle, ProgramError> {
        self.acquire_with(device, key, synthesize_key)
    }

    /// Acquire with a custom source builder.
    ///
    /// `build` only runs on a miss; a hit never re-synthesizes.
    pub fn acquire_with<D, F>(
        &mut self,
        device: &mut D,
        key: &ProgramKey,
        build: F,
    ) -> Result<ProgramHandle, ProgramError>
    where
        D: GraphicsDevice + ?Sized,
        F: FnOnce(&ProgramKey, &ShaderOptions) -> ProgramSource,
    {
        if let Some(&index) = self.by_key.get(key) {
            let slot = &mut self.slots[index as usize];
            if let Some(entry) = slot.entry.as_mut() {
                entry.use_count += 1;
                self.stats.hits += 1;
                return Ok(ProgramHandle {
                    index,
                    generation: slot.generation,
                });
            }
        }

        let source = build(key, &self.options);
        tracing::debug!(
            "Creating program {key} ({} + {} lines)",
            source.vertex.len(),
            source.fragment.len()
        );
        let program = match CompiledProgram::link(device, &source) {
            Ok(program) => program,
            Err(e) => {
                self.stats.failures += 1;
                match &e {
                    ProgramError::Compile { stage, log } => {
                        tracing::error!("program {key}: {stage} shader failed to compile:\n{log}")
                    }
                    ProgramError::Link { log } => {
                        tracing::error!("program {key}: link failed:\n{log}")
                    }
                    ProgramError::Device(msg) => {
                        tracing::error!("program {key}: device error: {msg}")
                    }
                }
                return Err(e);
            }
        };
        self.stats.compiles += 1;

        let entry = CacheEntry {
            key: key.clone(),
            source,
            program,
            use_count: 1,
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize].entry = Some(entry);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                (self.slots.len() - 1) as u32
            }
        };
        self.by_key.insert(key.clone(), index);
        Ok(ProgramHandle {
            index,
            generation: self.slots[index as usize].generation,
        })
    }

    /// Drop one use of `handle`; destroys the program when unused
    pub fn release<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        handle: ProgramHandle,
    ) -> Result<(), ProgramCacheError> {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            let e = ProgramCacheError::UnknownHandle(handle);
            tracing::warn!("release ignored: {e}");
            return Err(e);
        };
        let entry = match slot.entry.as_mut() {
            Some(entry) if slot.generation == handle.generation => entry,
            _ => {
                let e = ProgramCacheError::StaleHandle(handle);
                tracing::warn!("release ignored: {e}");
                return Err(e);
            }
        };
        entry.use_count -= 1;
        if entry.use_count > 0 {
            return Ok(());
        }

        if let Some(entry) = slot.entry.take() {
            slot.generation = slot.generation.wrapping_add(1);
            device.delete_program(entry.program.id);
            self.by_key.remove(&entry.key);
            self.free.push(handle.index);
            self.stats.destroyed += 1;
            tracing::info!(
                "Destroyed program {} ({} programs live)",
                entry.key,
                self.by_key.len()
            );
        }
        Ok(())
    }

    fn entry(&self, handle: ProgramHandle) -> Option<&CacheEntry> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    /// Linked program behind a live handle
    pub fn get(&self, handle: ProgramHandle) -> Option<&CompiledProgram> {
        self.entry(handle).map(|e| &e.program)
    }

    pub fn key(&self, handle: ProgramHandle) -> Option<&ProgramKey> {
        self.entry(handle).map(|e| &e.key)
    }

    pub fn source(&self, handle: ProgramHandle) -> Option<&ProgramSource> {
        self.entry(handle).map(|e| &e.source)
    }

    pub fn use_count(&self, handle: ProgramHandle) -> Option<u32> {
        self.entry(handle).map(|e| e.use_count)
    }

    /// Use count of the entry for `key`, zero when absent
    pub fn use_count_for_key(&self, key: &ProgramKey) -> u32 {
        self.by_key
            .get(key)
            .and_then(|&index| self.slots[index as usize].entry.as_ref())
            .map_or(0, |e| e.use_count)
    }

    pub fn contains(&self, key: &ProgramKey) -> bool {
        self.by_key.contains_key(key)
    }

    /// Number of live programs
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Destroy every program regardless of use counts; outstanding handles
    /// become stale
    pub fn clear<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(entry) = slot.entry.take() {
                device.delete_program(entry.program.id);
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                self.stats.destroyed += 1;
            }
        }
        self.by_key.clear();
    }
}
